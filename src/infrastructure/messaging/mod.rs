pub mod http;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::domain::error::Result;

/// Who to invite and how to reach them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InviteContact {
    pub occupant_id: i64,
    pub property_id: i64,
    pub unit_id: Option<i64>,
    pub property_name: String,
    pub full_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
}

impl InviteContact {
    pub fn is_reachable(&self) -> bool {
        self.email.is_some() || self.phone.is_some()
    }
}

/// What happened to an invite that did not fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    Sent,
    /// Recorded locally only; the occupant received nothing
    NotDelivered,
}

#[async_trait]
pub trait MessagingService: Send + Sync {
    async fn send_invite(&self, contact: &InviteContact) -> Result<Delivery>;
}

/// Messenger used when no delivery endpoint is configured.
pub struct LogOnlyMessenger;

#[async_trait]
impl MessagingService for LogOnlyMessenger {
    async fn send_invite(&self, contact: &InviteContact) -> Result<Delivery> {
        info!(
            occupant_id = contact.occupant_id,
            property = %contact.property_name,
            "Invite not delivered: no messaging endpoint configured"
        );
        Ok(Delivery::NotDelivered)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_log_only_messenger_never_reports_sent() {
        let contact = InviteContact {
            occupant_id: 1,
            property_id: 1,
            unit_id: None,
            property_name: "Residenza Sole".into(),
            full_name: None,
            email: Some("mario@example.com".into()),
            phone: None,
        };
        let delivery = LogOnlyMessenger.send_invite(&contact).await.unwrap();
        assert_eq!(delivery, Delivery::NotDelivered);
    }
}
