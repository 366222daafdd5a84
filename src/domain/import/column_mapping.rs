// ============================================================
// COLUMN MAPPING
// ============================================================
// Source column → canonical field bindings and session overrides

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::CanonicalField;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MappingOrigin {
    Inferred,
    Override,
}

/// Binding of one source column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnBinding {
    /// Column position in the source file
    pub index: usize,

    /// Header text as it appeared in the file
    pub header: String,

    /// Target field, `None` when the column is unmapped
    pub field: Option<CanonicalField>,

    pub origin: MappingOrigin,
}

/// Positional mapping for every column of a file.
///
/// A canonical field is bound by at most one column.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnMapping {
    pub bindings: Vec<ColumnBinding>,
}

impl ColumnMapping {
    pub fn new(mut bindings: Vec<ColumnBinding>) -> Self {
        bindings.sort_by_key(|b| b.index);
        let mut mapping = Self { bindings };
        mapping.enforce_unique_fields();
        mapping
    }

    /// Column currently bound to `field`.
    pub fn column_for(&self, field: CanonicalField) -> Option<usize> {
        self.bindings
            .iter()
            .find(|b| b.field == Some(field))
            .map(|b| b.index)
    }

    pub fn field_for_column(&self, index: usize) -> Option<CanonicalField> {
        self.bindings
            .iter()
            .find(|b| b.index == index)
            .and_then(|b| b.field)
    }

    pub fn is_mapped(&self, field: CanonicalField) -> bool {
        self.column_for(field).is_some()
    }

    pub fn unmapped_headers(&self) -> Vec<&str> {
        self.bindings
            .iter()
            .filter(|b| b.field.is_none())
            .map(|b| b.header.as_str())
            .collect()
    }

    /// Header → field view, for display. Duplicate header text keeps the last column.
    pub fn as_header_map(&self) -> BTreeMap<String, Option<CanonicalField>> {
        self.bindings
            .iter()
            .map(|b| (b.header.clone(), b.field))
            .collect()
    }

    /// Keep one column per field: overrides beat inference, then the later column wins.
    fn enforce_unique_fields(&mut self) {
        for field in CanonicalField::ALL {
            let claimants: Vec<usize> = self
                .bindings
                .iter()
                .enumerate()
                .filter(|(_, b)| b.field == Some(field))
                .map(|(pos, _)| pos)
                .collect();
            if claimants.len() < 2 {
                continue;
            }

            let winner = claimants
                .iter()
                .copied()
                .filter(|&pos| self.bindings[pos].origin == MappingOrigin::Override)
                .last()
                .or_else(|| claimants.last().copied());

            for pos in claimants {
                if Some(pos) != winner {
                    self.bindings[pos].field = None;
                }
            }
        }
    }
}

/// Explicit user corrections for the current import session.
///
/// Keyed by the trimmed header text. A `None` value forces the column to unmapped.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MappingOverrides {
    entries: BTreeMap<String, Option<CanonicalField>>,
}

impl MappingOverrides {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, header: &str, field: Option<CanonicalField>) {
        self.entries.insert(header.trim().to_string(), field);
    }

    pub fn remove(&mut self, header: &str) -> bool {
        self.entries.remove(header.trim()).is_some()
    }

    pub fn get(&self, header: &str) -> Option<Option<CanonicalField>> {
        self.entries.get(header.trim()).copied()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn entries(&self) -> &BTreeMap<String, Option<CanonicalField>> {
        &self.entries
    }

    /// Layer the overrides on top of an inferred mapping.
    pub fn apply(&self, inferred: &ColumnMapping) -> ColumnMapping {
        let bindings = inferred
            .bindings
            .iter()
            .map(|b| match self.get(&b.header) {
                Some(field) => ColumnBinding {
                    index: b.index,
                    header: b.header.clone(),
                    field,
                    origin: MappingOrigin::Override,
                },
                None => b.clone(),
            })
            .collect();

        ColumnMapping::new(bindings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn inferred(index: usize, header: &str, field: Option<CanonicalField>) -> ColumnBinding {
        ColumnBinding {
            index,
            header: header.to_string(),
            field,
            origin: MappingOrigin::Inferred,
        }
    }

    #[test]
    fn test_later_column_wins_duplicate_field() {
        let mapping = ColumnMapping::new(vec![
            inferred(0, "Email", Some(CanonicalField::Email)),
            inferred(1, "Mail", Some(CanonicalField::Email)),
        ]);
        assert_eq!(mapping.column_for(CanonicalField::Email), Some(1));
        assert_eq!(mapping.field_for_column(0), None);
    }

    #[test]
    fn test_override_wins_over_inference() {
        let base = ColumnMapping::new(vec![
            inferred(0, "Nome", Some(CanonicalField::Name)),
            inferred(1, "Referente", None),
        ]);
        let mut overrides = MappingOverrides::new();
        overrides.set("Referente", Some(CanonicalField::Name));

        let mapping = overrides.apply(&base);
        assert_eq!(mapping.column_for(CanonicalField::Name), Some(1));
        assert_eq!(mapping.field_for_column(0), None);
        assert_eq!(mapping.bindings[1].origin, MappingOrigin::Override);
    }

    #[test]
    fn test_override_can_unmap_column() {
        let base = ColumnMapping::new(vec![inferred(0, "Piano", Some(CanonicalField::Floor))]);
        let mut overrides = MappingOverrides::new();
        overrides.set(" Piano ", None);

        let mapping = overrides.apply(&base);
        assert!(!mapping.is_mapped(CanonicalField::Floor));
        assert_eq!(mapping.unmapped_headers(), vec!["Piano"]);
    }

    #[test]
    fn test_remove_override_restores_inference() {
        let base = ColumnMapping::new(vec![inferred(0, "Piano", Some(CanonicalField::Floor))]);
        let mut overrides = MappingOverrides::new();
        overrides.set("Piano", None);
        assert!(overrides.remove("Piano"));
        assert_eq!(overrides.apply(&base), base);
    }
}
