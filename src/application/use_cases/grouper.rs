//! Hierarchical grouping of normalized rows into property aggregates.

use std::collections::HashMap;

use crate::domain::import::{
    NormalizedRow, PropertyGroup, RowError, RowOutcome, RowStatus, SkippedRow,
};

/// Cluster valid rows by exact property name, keeping first-seen group order
/// and original row order inside each group.
pub fn group(rows: &[NormalizedRow]) -> Vec<PropertyGroup> {
    let mut groups: Vec<PropertyGroup> = Vec::new();
    let mut positions: HashMap<&str, usize> = HashMap::new();

    for row in rows.iter().filter(|r| r.status() == RowStatus::Valid) {
        let Some(name) = row.property_name() else {
            continue;
        };

        let pos = *positions.entry(name).or_insert_with(|| {
            groups.push(PropertyGroup::new(name.to_string()));
            groups.len() - 1
        });
        groups[pos].rows.push(row.clone());
    }

    groups
}

/// Outcomes for rows that never reach the store: invalid rows become
/// errors, rows without a grouping key become skips.
pub fn excluded_outcomes(rows: &[NormalizedRow]) -> Vec<RowOutcome> {
    rows.iter()
        .filter_map(|row| match row.status() {
            RowStatus::Valid => None,
            RowStatus::Invalid => Some(RowOutcome::Row(Err(RowError::new(
                row.row_index,
                row.errors.first().map(|e| e.field.as_str()),
                row.error_reason().unwrap_or_default(),
            )))),
            RowStatus::Skipped => Some(RowOutcome::Skipped(SkippedRow {
                row_index: row.row_index,
                reason: row.skip_reason.clone().unwrap_or_default(),
            })),
        })
        .collect()
}
