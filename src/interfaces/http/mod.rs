use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use actix_cors::Cors;
use actix_web::{
    delete, dev::Server, get, http::StatusCode, post, put, web, App, HttpRequest, HttpResponse,
    HttpServer, Responder,
};
use chrono::Local;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::application::use_cases::canonical_vocabulary::Vocabulary;
use crate::application::use_cases::file_ingestor::{DeclaredType, FileFormat};
use crate::application::use_cases::import_orchestrator::ImportOrchestrator;
use crate::application::use_cases::import_session::ImportSession;
use crate::application::use_cases::invitation_dispatcher::InvitationDispatcher;
use crate::domain::error::{AppError, Result};
use crate::domain::import::{CanonicalField, ColumnMapping, ImportStage, MappingOverrides};
use crate::infrastructure::db::sqlite::SqliteStore;
use crate::infrastructure::storage::BlobStore;

const OWNER_HEADER: &str = "X-Owner-Id";
const MAX_UPLOAD_BYTES: usize = 32 * 1024 * 1024;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct LogEntry {
    pub time: String,
    pub level: String,
    pub source: String,
    pub message: String,
}

type SessionHandle = Arc<tokio::sync::Mutex<ImportSession>>;

struct SessionEntry {
    handle: SessionHandle,
    touched: Instant,
}

/// Open import sessions, bounded by count and idle time.
///
/// Sessions whose lock is held are never evicted. Past the cap, failed
/// sessions go first, then the least recently used completed one.
pub struct SessionRegistry {
    entries: Mutex<HashMap<Uuid, SessionEntry>>,
    max_sessions: usize,
    idle_timeout: Duration,
}

impl SessionRegistry {
    pub fn new(max_sessions: usize, idle_timeout: Duration) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            max_sessions: max_sessions.max(1),
            idle_timeout,
        }
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, HashMap<Uuid, SessionEntry>>> {
        self.entries
            .lock()
            .map_err(|_| AppError::Internal("Session registry is unavailable".to_string()))
    }

    pub fn get(&self, id: &Uuid) -> Result<SessionHandle> {
        let mut entries = self.lock()?;
        let entry = entries
            .get_mut(id)
            .ok_or_else(|| AppError::NotFound(format!("Import session {}", id)))?;
        entry.touched = Instant::now();
        Ok(Arc::clone(&entry.handle))
    }

    pub fn insert(&self, session: ImportSession) -> Result<Uuid> {
        let now = Instant::now();
        let mut entries = self.lock()?;
        self.evict(&mut entries, now);

        let id = Uuid::new_v4();
        entries.insert(
            id,
            SessionEntry {
                handle: Arc::new(tokio::sync::Mutex::new(session)),
                touched: now,
            },
        );
        Ok(id)
    }

    pub fn remove(&self, id: &Uuid) -> Result<()> {
        self.lock()?.remove(id);
        Ok(())
    }

    fn evict(&self, entries: &mut HashMap<Uuid, SessionEntry>, now: Instant) {
        let idle_timeout = self.idle_timeout;
        entries.retain(|id, entry| {
            let idle = now.saturating_duration_since(entry.touched) >= idle_timeout;
            let keep = !idle || entry.handle.try_lock().is_err();
            if !keep {
                debug!(session_id = %id, "Evicted idle import session");
            }
            keep
        });

        while entries.len() >= self.max_sessions {
            let Some(id) = eviction_candidate(entries) else {
                warn!(
                    open = entries.len(),
                    "Session cap reached with every session still in progress"
                );
                break;
            };
            entries.remove(&id);
            debug!(session_id = %id, "Evicted import session over the cap");
        }
    }
}

#[cfg(test)]
impl SessionRegistry {
    fn len(&self) -> usize {
        self.entries.lock().map(|e| e.len()).unwrap_or(0)
    }

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn contains(&self, id: &Uuid) -> bool {
        self.entries
            .lock()
            .map(|e| e.contains_key(id))
            .unwrap_or(false)
    }
}

fn eviction_candidate(entries: &HashMap<Uuid, SessionEntry>) -> Option<Uuid> {
    entries
        .iter()
        .filter_map(|(id, entry)| {
            let session = entry.handle.try_lock().ok()?;
            let rank = match session.stage() {
                ImportStage::CommitFailed | ImportStage::Idle => 0,
                ImportStage::Completed => 1,
                _ => return None,
            };
            Some((rank, entry.touched, *id))
        })
        .min_by_key(|(rank, touched, _)| (*rank, *touched))
        .map(|(_, _, id)| id)
}

pub struct HttpState {
    pub store: Arc<SqliteStore>,
    pub orchestrator: Arc<ImportOrchestrator>,
    pub dispatcher: Arc<InvitationDispatcher>,
    pub archive: Option<Arc<dyn BlobStore>>,
    pub vocabulary: Vocabulary,
    pub sessions: SessionRegistry,
    pub logs: Arc<Mutex<Vec<LogEntry>>>,
}

impl HttpState {
    fn new_session(&self) -> ImportSession {
        let session = ImportSession::new(self.vocabulary.clone());
        match &self.archive {
            Some(archive) => session.with_archive(Arc::clone(archive)),
            None => session,
        }
    }

    fn session(&self, id: &Uuid) -> Result<SessionHandle> {
        self.sessions.get(id)
    }
}

#[derive(Deserialize)]
pub struct UploadQuery {
    #[serde(default)]
    pub file_name: Option<String>,
}

#[derive(Deserialize)]
pub struct OverrideRequest {
    pub header: String,
    #[serde(default)]
    pub field: Option<CanonicalField>,
}

#[derive(Deserialize)]
pub struct OwnerRequest {
    pub id: String,
    #[serde(default)]
    pub display_name: Option<String>,
}

#[derive(Serialize)]
pub struct SessionResponse {
    pub session_id: Uuid,
    pub stage: ImportStage,
    pub format: Option<FileFormat>,
    pub rows: usize,
    pub headers: Vec<String>,
    pub mapping: ColumnMapping,
}

#[derive(Serialize)]
pub struct MappingResponse {
    pub stage: ImportStage,
    pub mapping: ColumnMapping,
    pub overrides: MappingOverrides,
}

fn status_for(error: &AppError) -> StatusCode {
    match error {
        AppError::FormatError(_) => StatusCode::UNPROCESSABLE_ENTITY,
        AppError::AuthorizationError(_) => StatusCode::UNAUTHORIZED,
        AppError::ValidationError(_) => StatusCode::BAD_REQUEST,
        AppError::NotFound(_) => StatusCode::NOT_FOUND,
        AppError::InvalidState(_) => StatusCode::CONFLICT,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn error_response(logs: &Mutex<Vec<LogEntry>>, context: &str, e: &AppError) -> HttpResponse {
    let status = status_for(e);
    if status.is_server_error() {
        error!(error = %e, "{}", context);
        add_log(logs, "ERROR", "HttpApi", &format!("{}: {}", context, e));
    } else {
        add_log(logs, "WARN", "HttpApi", &format!("{}: {}", context, e));
    }
    HttpResponse::build(status).body(e.to_string())
}

fn declared_type(req: &HttpRequest, query: &UploadQuery) -> DeclaredType {
    let from_name = query
        .file_name
        .as_deref()
        .map(DeclaredType::from_hint)
        .unwrap_or_default();
    if from_name != DeclaredType::Unknown {
        return from_name;
    }

    req.headers()
        .get(actix_web::http::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(DeclaredType::from_hint)
        .unwrap_or_default()
}

#[post("/imports")]
async fn create_import(
    data: web::Data<HttpState>,
    req: HttpRequest,
    query: web::Query<UploadQuery>,
    body: web::Bytes,
) -> impl Responder {
    let declared = declared_type(&req, &query);
    add_log(
        &data.logs,
        "INFO",
        "HttpApi",
        &format!(
            "Upload received: {} bytes (file_name={:?})",
            body.len(),
            query.file_name
        ),
    );

    let mut session = data.new_session();
    let mapping = match session
        .load_file(&body, declared, query.file_name.as_deref())
        .await
    {
        Ok(mapping) => mapping,
        Err(e) => return error_response(&data.logs, "Upload rejected", &e),
    };

    let response = SessionResponse {
        session_id: Uuid::nil(),
        stage: session.stage(),
        format: session.format(),
        rows: session.row_count(),
        headers: session.headers().to_vec(),
        mapping,
    };

    match data.sessions.insert(session) {
        Ok(session_id) => {
            info!(%session_id, rows = response.rows, "Import session opened");
            HttpResponse::Created().json(SessionResponse {
                session_id,
                ..response
            })
        }
        Err(e) => error_response(&data.logs, "Upload rejected", &e),
    }
}

#[get("/imports/{id}/mapping")]
async fn get_mapping(data: web::Data<HttpState>, path: web::Path<Uuid>) -> impl Responder {
    let handle = match data.session(&path) {
        Ok(handle) => handle,
        Err(e) => return error_response(&data.logs, "Mapping lookup failed", &e),
    };
    let session = handle.lock().await;

    match session.mapping() {
        Ok(mapping) => HttpResponse::Ok().json(MappingResponse {
            stage: session.stage(),
            mapping,
            overrides: session.overrides().clone(),
        }),
        Err(e) => error_response(&data.logs, "Mapping lookup failed", &e),
    }
}

#[put("/imports/{id}/overrides")]
async fn put_override(
    data: web::Data<HttpState>,
    path: web::Path<Uuid>,
    req: web::Json<OverrideRequest>,
) -> impl Responder {
    let handle = match data.session(&path) {
        Ok(handle) => handle,
        Err(e) => return error_response(&data.logs, "Override rejected", &e),
    };
    let mut session = handle.lock().await;

    match session.set_override(&req.header, req.field) {
        Ok(mapping) => {
            add_log(
                &data.logs,
                "INFO",
                "HttpApi",
                &format!("Override: '{}' -> {:?}", req.header, req.field),
            );
            HttpResponse::Ok().json(MappingResponse {
                stage: session.stage(),
                mapping,
                overrides: session.overrides().clone(),
            })
        }
        Err(e) => error_response(&data.logs, "Override rejected", &e),
    }
}

#[delete("/imports/{id}/overrides/{header}")]
async fn delete_override(
    data: web::Data<HttpState>,
    path: web::Path<(Uuid, String)>,
) -> impl Responder {
    let (id, header) = path.into_inner();
    let handle = match data.session(&id) {
        Ok(handle) => handle,
        Err(e) => return error_response(&data.logs, "Override removal failed", &e),
    };
    let mut session = handle.lock().await;

    match session.clear_override(&header) {
        Ok(false) => error_response(
            &data.logs,
            "Override removal failed",
            &AppError::NotFound(format!("Override for '{}'", header)),
        ),
        Ok(true) => match session.mapping() {
            Ok(mapping) => HttpResponse::Ok().json(MappingResponse {
                stage: session.stage(),
                mapping,
                overrides: session.overrides().clone(),
            }),
            Err(e) => error_response(&data.logs, "Override removal failed", &e),
        },
        Err(e) => error_response(&data.logs, "Override removal failed", &e),
    }
}

#[get("/imports/{id}/preview")]
async fn get_preview(data: web::Data<HttpState>, path: web::Path<Uuid>) -> impl Responder {
    let handle = match data.session(&path) {
        Ok(handle) => handle,
        Err(e) => return error_response(&data.logs, "Preview failed", &e),
    };
    let mut session = handle.lock().await;

    match session.preview() {
        Ok(preview) => HttpResponse::Ok().json(preview),
        Err(e) => error_response(&data.logs, "Preview failed", &e),
    }
}

#[post("/imports/{id}/commit")]
async fn commit_import(
    data: web::Data<HttpState>,
    path: web::Path<Uuid>,
    req: HttpRequest,
) -> impl Responder {
    let owner_id = req
        .headers()
        .get(OWNER_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    let handle = match data.session(&path) {
        Ok(handle) => handle,
        Err(e) => return error_response(&data.logs, "Commit failed", &e),
    };
    let mut session = handle.lock().await;

    match session.commit(&data.orchestrator, owner_id.as_deref()).await {
        Ok(summary) => {
            add_log(
                &data.logs,
                "INFO",
                "HttpApi",
                &format!(
                    "Import committed: {} properties, {} units, {} occupants, {} errors, {} skipped",
                    summary.properties_created,
                    summary.units_created,
                    summary.occupants_created,
                    summary.errors.len(),
                    summary.skipped.len()
                ),
            );
            HttpResponse::Ok().json(summary)
        }
        Err(e) => error_response(&data.logs, "Commit failed", &e),
    }
}

#[post("/imports/{id}/invites")]
async fn dispatch_invites(data: web::Data<HttpState>, path: web::Path<Uuid>) -> impl Responder {
    let handle = match data.session(&path) {
        Ok(handle) => handle,
        Err(e) => return error_response(&data.logs, "Invite dispatch failed", &e),
    };

    let contacts = match handle.lock().await.take_invites() {
        Ok(contacts) => contacts,
        Err(e) => return error_response(&data.logs, "Invite dispatch failed", &e),
    };

    // Runs on its own task so a dropped request does not cut the fan-out short
    let report = match Arc::clone(&data.dispatcher).spawn(contacts).await {
        Ok(report) => report,
        Err(e) => {
            let e = AppError::Internal(format!("Invite dispatch task failed: {}", e));
            return error_response(&data.logs, "Invite dispatch failed", &e);
        }
    };
    add_log(
        &data.logs,
        "INFO",
        "HttpApi",
        &format!(
            "Invites: {} sent, {} not delivered, {} failed, {} without contact",
            report.sent, report.not_delivered, report.failed, report.skipped_no_contact
        ),
    );
    HttpResponse::Ok().json(report)
}

#[delete("/imports/{id}")]
async fn discard_import(data: web::Data<HttpState>, path: web::Path<Uuid>) -> impl Responder {
    let handle = match data.session(&path) {
        Ok(handle) => handle,
        Err(e) => return error_response(&data.logs, "Discard failed", &e),
    };

    // A held lock means a commit is running
    let discarded = match handle.try_lock() {
        Ok(mut session) => session.discard(),
        Err(_) => Err(AppError::InvalidState(
            "Cannot discard while a commit is running".to_string(),
        )),
    };

    match discarded.and_then(|_| data.sessions.remove(&path)) {
        Ok(()) => HttpResponse::NoContent().finish(),
        Err(e) => error_response(&data.logs, "Discard failed", &e),
    }
}

#[post("/owners")]
async fn register_owner(data: web::Data<HttpState>, req: web::Json<OwnerRequest>) -> impl Responder {
    let id = req.id.trim();
    if id.is_empty() {
        return error_response(
            &data.logs,
            "Owner registration failed",
            &AppError::ValidationError("Owner id is empty".to_string()),
        );
    }

    match data.store.register_owner(id, req.display_name.as_deref()).await {
        Ok(()) => HttpResponse::Created().finish(),
        Err(e) => error_response(&data.logs, "Owner registration failed", &e),
    }
}

#[get("/logs")]
async fn get_logs(data: web::Data<HttpState>) -> impl Responder {
    match data.logs.lock() {
        Ok(logs) => HttpResponse::Ok().json(&*logs),
        Err(_) => HttpResponse::InternalServerError().body("Log buffer is unavailable"),
    }
}

pub fn add_log_entry(
    logs: &Mutex<Vec<LogEntry>>,
    level: &str,
    source: &str,
    message: &str,
) -> LogEntry {
    let entry = LogEntry {
        time: Local::now().format("%H:%M:%S").to_string(),
        level: level.to_string(),
        source: source.to_string(),
        message: message.to_string(),
    };
    if let Ok(mut logs) = logs.lock() {
        logs.push(entry.clone());
        if logs.len() > 100 {
            logs.remove(0);
        }
    }
    entry
}

pub fn add_log(logs: &Mutex<Vec<LogEntry>>, level: &str, source: &str, message: &str) {
    add_log_entry(logs, level, source, message);
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.app_data(web::PayloadConfig::new(MAX_UPLOAD_BYTES)).service(
        web::scope("/api")
            .service(create_import)
            .service(get_mapping)
            .service(put_override)
            .service(delete_override)
            .service(get_preview)
            .service(commit_import)
            .service(dispatch_invites)
            .service(discard_import)
            .service(register_owner)
            .service(get_logs),
    );
}

pub fn start_server(state: web::Data<HttpState>, host: &str, port: u16) -> std::io::Result<Server> {
    let server = HttpServer::new(move || {
        let cors = Cors::permissive(); // Local operator console

        App::new()
            .wrap(cors)
            .app_data(state.clone())
            .configure(configure)
    })
    .bind((host, port))?
    .run();

    Ok(server)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::import::ImportSummary;
    use crate::domain::import_config::ImportConfig;
    use crate::infrastructure::messaging::LogOnlyMessenger;
    use actix_web::test;

    const UPLOAD: &str = "Condominio;Unità;Nome;Email\n\
        Residenza Sole;A1;Mario;mario@example.com\n\
        Residenza Sole;A2;Lucia;lucia@example.com\n";

    async fn state() -> web::Data<HttpState> {
        let store = Arc::new(SqliteStore::init("sqlite::memory:").await.unwrap());
        let config = ImportConfig::default();
        web::Data::new(HttpState {
            store: Arc::clone(&store),
            orchestrator: Arc::new(ImportOrchestrator::new(store, config.clone())),
            dispatcher: Arc::new(InvitationDispatcher::new(Arc::new(LogOnlyMessenger), config)),
            archive: None,
            vocabulary: Vocabulary::default(),
            sessions: SessionRegistry::new(64, Duration::from_secs(3600)),
            logs: Arc::new(Mutex::new(Vec::new())),
        })
    }

    #[derive(Deserialize)]
    struct Created {
        session_id: Uuid,
        rows: usize,
    }

    #[actix_web::test]
    async fn test_status_mapping() {
        assert_eq!(status_for(&AppError::FormatError("x".into())), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(status_for(&AppError::AuthorizationError("x".into())), StatusCode::UNAUTHORIZED);
        assert_eq!(status_for(&AppError::InvalidState("x".into())), StatusCode::CONFLICT);
        assert_eq!(
            status_for(&AppError::PersistenceError("x".into())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[actix_web::test]
    async fn test_upload_commit_and_invite_flow() {
        let data = state().await;
        let app = test::init_service(App::new().app_data(data.clone()).configure(configure)).await;

        let req = test::TestRequest::post()
            .uri("/api/owners")
            .set_json(serde_json::json!({ "id": "owner-1" }))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::CREATED);

        let req = test::TestRequest::post()
            .uri("/api/imports?file_name=export.csv")
            .set_payload(UPLOAD)
            .to_request();
        let created: Created = test::call_and_read_body_json(&app, req).await;
        assert_eq!(created.rows, 2);

        let commit = || {
            test::TestRequest::post()
                .uri(&format!("/api/imports/{}/commit", created.session_id))
                .insert_header((OWNER_HEADER, "owner-1"))
                .to_request()
        };
        assert_eq!(test::call_service(&app, commit()).await.status(), StatusCode::CONFLICT);

        let req = test::TestRequest::get()
            .uri(&format!("/api/imports/{}/preview", created.session_id))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);

        let summary: ImportSummary = test::call_and_read_body_json(&app, commit()).await;
        assert_eq!(summary.properties_created, 1);
        assert_eq!(summary.units_created, 2);
        assert_eq!(summary.occupants_created, 2);

        let invites = || {
            test::TestRequest::post()
                .uri(&format!("/api/imports/{}/invites", created.session_id))
                .to_request()
        };
        let report: serde_json::Value = test::call_and_read_body_json(&app, invites()).await;
        assert_eq!(report["sent"], 0);
        assert_eq!(report["not_delivered"], 2);

        assert_eq!(test::call_service(&app, invites()).await.status(), StatusCode::CONFLICT);
    }

    #[actix_web::test]
    async fn test_commit_without_owner_is_unauthorized() {
        let data = state().await;
        let app = test::init_service(App::new().app_data(data.clone()).configure(configure)).await;

        let req = test::TestRequest::post()
            .uri("/api/imports?file_name=export.csv")
            .set_payload(UPLOAD)
            .to_request();
        let created: Created = test::call_and_read_body_json(&app, req).await;

        let req = test::TestRequest::get()
            .uri(&format!("/api/imports/{}/preview", created.session_id))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);

        let req = test::TestRequest::post()
            .uri(&format!("/api/imports/{}/commit", created.session_id))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::UNAUTHORIZED);
    }

    #[actix_web::test]
    async fn test_declared_workbook_with_text_body_is_unprocessable() {
        let data = state().await;
        let app = test::init_service(App::new().app_data(data.clone()).configure(configure)).await;

        let req = test::TestRequest::post()
            .uri("/api/imports?file_name=export.xlsx")
            .set_payload(UPLOAD)
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert!(data.sessions.is_empty());
    }

    #[actix_web::test]
    async fn test_unknown_session_is_not_found() {
        let data = state().await;
        let app = test::init_service(App::new().app_data(data.clone()).configure(configure)).await;

        let req = test::TestRequest::get()
            .uri(&format!("/api/imports/{}/preview", Uuid::new_v4()))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NOT_FOUND);
    }

    #[actix_web::test]
    async fn test_discard_removes_session() {
        let data = state().await;
        let app = test::init_service(App::new().app_data(data.clone()).configure(configure)).await;

        let req = test::TestRequest::post()
            .uri("/api/imports?file_name=export.csv")
            .set_payload(UPLOAD)
            .to_request();
        let created: Created = test::call_and_read_body_json(&app, req).await;

        let req = test::TestRequest::delete()
            .uri(&format!("/api/imports/{}", created.session_id))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NO_CONTENT);
        assert!(data.sessions.is_empty());
    }

    async fn session_in(content: &[u8], declared: DeclaredType) -> ImportSession {
        let mut session = ImportSession::default();
        let _ = session.load_file(content, declared, None).await;
        session
    }

    #[actix_web::test]
    async fn test_failed_session_is_evicted_first_over_the_cap() {
        let registry = SessionRegistry::new(2, Duration::from_secs(3600));

        let failed = registry
            .insert(session_in(b"PK\x03\x04 broken", DeclaredType::Workbook).await)
            .unwrap();
        let active = registry
            .insert(session_in(UPLOAD.as_bytes(), DeclaredType::Text).await)
            .unwrap();
        let newest = registry
            .insert(session_in(UPLOAD.as_bytes(), DeclaredType::Text).await)
            .unwrap();

        assert_eq!(registry.len(), 2);
        assert!(!registry.contains(&failed));
        assert!(registry.contains(&active));
        assert!(registry.contains(&newest));
    }

    #[actix_web::test]
    async fn test_in_progress_sessions_survive_the_cap() {
        let registry = SessionRegistry::new(1, Duration::from_secs(3600));

        let first = registry
            .insert(session_in(UPLOAD.as_bytes(), DeclaredType::Text).await)
            .unwrap();
        registry
            .insert(session_in(UPLOAD.as_bytes(), DeclaredType::Text).await)
            .unwrap();

        assert!(registry.contains(&first));
        assert_eq!(registry.len(), 2);
    }

    #[actix_web::test]
    async fn test_idle_sessions_are_evicted() {
        let registry = SessionRegistry::new(64, Duration::ZERO);

        let stale = registry
            .insert(session_in(UPLOAD.as_bytes(), DeclaredType::Text).await)
            .unwrap();
        let busy = registry
            .insert(session_in(UPLOAD.as_bytes(), DeclaredType::Text).await)
            .unwrap();
        let handle = registry.get(&busy).unwrap();
        let _guard = handle.lock().await;

        let fresh = registry
            .insert(session_in(UPLOAD.as_bytes(), DeclaredType::Text).await)
            .unwrap();

        assert!(!registry.contains(&stale));
        assert!(registry.contains(&busy));
        assert!(registry.contains(&fresh));
        assert!(matches!(registry.get(&stale), Err(AppError::NotFound(_))));
    }
}
