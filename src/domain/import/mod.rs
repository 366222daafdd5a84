// ============================================================
// IMPORT DOMAIN LAYER
// ============================================================
// Core types for the bulk onboarding import
// No I/O, no async

mod canonical_field;
mod column_mapping;
mod import_stage;
mod import_summary;
mod normalized_row;
mod property_group;
mod source_row;

pub use canonical_field::CanonicalField;
pub use column_mapping::{ColumnBinding, ColumnMapping, MappingOrigin, MappingOverrides};
pub use import_stage::ImportStage;
pub use import_summary::{CommittedRow, ImportSummary, RowError, RowOutcome, SkippedRow};
pub use normalized_row::{
    FieldError, NormalizedFields, NormalizedRow, PaymentStatus, RowStatus,
};
pub use property_group::PropertyGroup;
pub use source_row::SourceRow;
