// ============================================================
// IMPORT SUMMARY
// ============================================================
// Per-row outcomes and their single reduction into a summary

use serde::{Deserialize, Serialize};

/// Row-level failure surfaced to the operator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowError {
    pub row_index: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    pub reason: String,
}

impl RowError {
    pub fn new(row_index: usize, field: Option<&str>, reason: impl Into<String>) -> Self {
        Self {
            row_index,
            field: field.map(str::to_string),
            reason: reason.into(),
        }
    }
}

/// Row removed before grouping because its grouping key was unresolved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedRow {
    pub row_index: usize,
    pub reason: String,
}

/// Store references of an occupant created for a row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommittedRow {
    pub row_index: usize,
    pub property_id: i64,
    pub unit_id: Option<i64>,
    pub occupant_id: i64,
}

/// One observable step of a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RowOutcome {
    PropertyCreated { property_id: i64 },
    UnitCreated { row_index: usize, unit_id: i64 },
    /// Exactly one per row that reached validation or commit
    Row(std::result::Result<CommittedRow, RowError>),
    Skipped(SkippedRow),
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportSummary {
    pub properties_created: usize,
    pub units_created: usize,
    pub occupants_created: usize,
    pub errors: Vec<RowError>,
    #[serde(default)]
    pub skipped: Vec<SkippedRow>,
    #[serde(default)]
    pub committed: Vec<CommittedRow>,
}

impl ImportSummary {
    pub fn from_outcomes<I>(outcomes: I) -> Self
    where
        I: IntoIterator<Item = RowOutcome>,
    {
        let mut summary = outcomes
            .into_iter()
            .fold(ImportSummary::default(), |mut acc, outcome| {
                match outcome {
                    RowOutcome::PropertyCreated { .. } => acc.properties_created += 1,
                    RowOutcome::UnitCreated { .. } => acc.units_created += 1,
                    RowOutcome::Row(Ok(committed)) => {
                        acc.occupants_created += 1;
                        acc.committed.push(committed);
                    }
                    RowOutcome::Row(Err(error)) => acc.errors.push(error),
                    RowOutcome::Skipped(skipped) => acc.skipped.push(skipped),
                }
                acc
            });

        summary.errors.sort_by_key(|e| e.row_index);
        summary.skipped.sort_by_key(|s| s.row_index);
        summary.committed.sort_by_key(|c| c.row_index);
        summary
    }

    /// Rows accounted for: created occupants, failures and skips.
    pub fn rows_attempted(&self) -> usize {
        self.occupants_created + self.errors.len() + self.skipped.len()
    }

    pub fn is_reconciled(&self, data_rows: usize) -> bool {
        self.rows_attempted() == data_rows
    }
}
