pub mod use_cases;

pub use use_cases::canonical_vocabulary::Vocabulary;
pub use use_cases::file_ingestor::{DeclaredType, FileFormat, ParsedFile};
pub use use_cases::import_orchestrator::ImportOrchestrator;
pub use use_cases::import_session::{ImportPreview, ImportSession};
pub use use_cases::invitation_dispatcher::{DispatchReport, InvitationDispatcher};
