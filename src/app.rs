use std::sync::{Arc, Mutex};

use actix_web::web;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::application::use_cases::canonical_vocabulary::Vocabulary;
use crate::application::use_cases::import_orchestrator::ImportOrchestrator;
use crate::application::use_cases::invitation_dispatcher::InvitationDispatcher;
use crate::domain::error::{AppError, Result};
use crate::infrastructure::config::{AppConfig, ConfigService, MessagingConfig};
use crate::infrastructure::db::sqlite::SqliteStore;
use crate::infrastructure::messaging::http::HttpMessagingClient;
use crate::infrastructure::messaging::{LogOnlyMessenger, MessagingService};
use crate::infrastructure::storage::{BlobStore, LocalBlobStore};
use crate::interfaces::http::{add_log, start_server, HttpState, LogEntry, SessionRegistry};

pub async fn run() -> std::io::Result<()> {
    let config = AppConfig::load().map_err(to_io)?;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.log_filter.as_str()));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();

    let logs: Arc<Mutex<Vec<LogEntry>>> = Arc::new(Mutex::new(Vec::new()));

    let state = build_state(&config, Arc::clone(&logs)).await.map_err(to_io)?;

    info!(
        host = %config.http.host,
        port = config.http.port,
        "Onboarding API listening"
    );
    add_log(
        &logs,
        "INFO",
        "Startup",
        &format!("Listening on {}:{}", config.http.host, config.http.port),
    );

    start_server(state, &config.http.host, config.http.port)?.await
}

async fn build_state(
    config: &AppConfig,
    logs: Arc<Mutex<Vec<LogEntry>>>,
) -> Result<web::Data<HttpState>> {
    let store = Arc::new(SqliteStore::init(&config.database.url).await?);
    info!(url = %config.database.url, "Database ready");

    let archive: Option<Arc<dyn BlobStore>> = if config.archive.enabled {
        Some(Arc::new(LocalBlobStore::new(config.archive.dir.clone())))
    } else {
        None
    };

    let messenger = build_messenger(&config.messaging)?;

    Ok(web::Data::new(HttpState {
        store: Arc::clone(&store),
        orchestrator: Arc::new(ImportOrchestrator::new(store, config.import.clone())),
        dispatcher: Arc::new(InvitationDispatcher::new(messenger, config.import.clone())),
        archive,
        vocabulary: Vocabulary::default(),
        sessions: SessionRegistry::new(
            config.http.max_sessions,
            config.http.session_idle_timeout(),
        ),
        logs,
    }))
}

fn build_messenger(messaging: &MessagingConfig) -> Result<Arc<dyn MessagingService>> {
    let Some(endpoint) = messaging.endpoint.as_deref() else {
        warn!("No messaging endpoint configured; invites will only be logged");
        return Ok(Arc::new(LogOnlyMessenger));
    };

    // A missing keyring backend only costs the bearer token
    let token = ConfigService::default()
        .messaging_token(messaging)
        .unwrap_or_else(|e| {
            warn!(error = %e, "Messaging token unavailable");
            None
        });

    let client = HttpMessagingClient::new(endpoint, token, &messaging.sender)?;
    Ok(Arc::new(client))
}

fn to_io(err: AppError) -> std::io::Error {
    std::io::Error::new(std::io::ErrorKind::Other, err.to_string())
}
