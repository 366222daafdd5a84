pub mod error;
pub mod import_config;

// Bulk onboarding import domain
pub mod import;
