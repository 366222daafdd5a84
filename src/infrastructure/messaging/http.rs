use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;

use super::{Delivery, InviteContact, MessagingService};
use crate::domain::error::{AppError, Result};

#[derive(Serialize)]
struct InviteRequest<'a> {
    sender: &'a str,
    occupant_id: i64,
    property_name: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    full_name: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    email: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    phone: Option<&'a str>,
}

/// Posts invitations to an external messaging endpoint as JSON.
pub struct HttpMessagingClient {
    client: reqwest::Client,
    endpoint: url::Url,
    api_token: Option<String>,
    sender: String,
}

impl HttpMessagingClient {
    pub fn new(endpoint: &str, api_token: Option<String>, sender: &str) -> Result<Self> {
        let endpoint = url::Url::parse(endpoint).map_err(|e| {
            AppError::ConfigError(format!("Invalid messaging endpoint '{}': {}", endpoint, e))
        })?;

        Ok(Self {
            client: reqwest::Client::builder()
                .timeout(Duration::from_secs(30))
                .build()
                .unwrap_or_else(|_| reqwest::Client::new()),
            endpoint,
            api_token,
            sender: sender.to_string(),
        })
    }
}

#[async_trait]
impl MessagingService for HttpMessagingClient {
    async fn send_invite(&self, contact: &InviteContact) -> Result<Delivery> {
        let body = InviteRequest {
            sender: &self.sender,
            occupant_id: contact.occupant_id,
            property_name: &contact.property_name,
            full_name: contact.full_name.as_deref(),
            email: contact.email.as_deref(),
            phone: contact.phone.as_deref(),
        };

        let mut request = self.client.post(self.endpoint.clone()).json(&body);
        if let Some(token) = &self.api_token {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .map_err(|e| AppError::MessagingError(format!("Request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(AppError::MessagingError(format!(
                "API error ({}): {}",
                status, text
            )));
        }

        Ok(Delivery::Sent)
    }
}
