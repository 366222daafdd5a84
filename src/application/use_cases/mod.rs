pub mod canonical_vocabulary;
pub mod file_ingestor;
pub mod grouper;
pub mod import_orchestrator;
pub mod import_session;
pub mod invitation_dispatcher;
pub mod row_normalizer;
pub mod schema_inference;
