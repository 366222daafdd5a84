//! Schema inference: source headers → canonical fields.
//!
//! Pure and deterministic. Each header is normalized and looked up in the
//! session vocabulary; when several columns resolve to the same field the
//! column with the higher index keeps it.

use tracing::debug;

use super::canonical_vocabulary::{normalize_header, Vocabulary};
use crate::domain::import::{ColumnBinding, ColumnMapping, MappingOrigin};

pub fn infer(headers: &[String], vocabulary: &Vocabulary) -> ColumnMapping {
    let bindings = headers
        .iter()
        .enumerate()
        .map(|(index, header)| ColumnBinding {
            index,
            header: header.clone(),
            field: vocabulary.lookup(&normalize_header(header)),
            origin: MappingOrigin::Inferred,
        })
        .collect();

    let mapping = ColumnMapping::new(bindings);

    debug!(
        columns = headers.len(),
        unmapped = mapping.unmapped_headers().len(),
        "Inferred column mapping"
    );

    mapping
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::import::CanonicalField;

    fn headers(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_infer_italian_export() {
        let h = headers(&[
            "Appartamento",
            "Condòmino",
            "Email",
            "Telefono",
            "IBAN",
            "Condominio",
        ]);
        let mapping = infer(&h, &Vocabulary::default());

        assert_eq!(mapping.column_for(CanonicalField::UnitCode), Some(0));
        assert_eq!(mapping.column_for(CanonicalField::Name), Some(1));
        assert_eq!(mapping.column_for(CanonicalField::Email), Some(2));
        assert_eq!(mapping.column_for(CanonicalField::Phone), Some(3));
        assert_eq!(mapping.column_for(CanonicalField::PropertyName), Some(5));
        assert_eq!(mapping.unmapped_headers(), vec!["IBAN"]);
    }

    #[test]
    fn test_infer_is_deterministic() {
        let h = headers(&["Nome", "Cognome", "Mail", "Email", "Piano", "Mq", "Unit"]);
        let vocab = Vocabulary::default();
        assert_eq!(infer(&h, &vocab), infer(&h, &vocab));
    }

    #[test]
    fn test_later_header_wins_duplicate_field() {
        let h = headers(&["Email", "Nome", "E-mail"]);
        for _ in 0..3 {
            let mapping = infer(&h, &Vocabulary::default());
            assert_eq!(mapping.column_for(CanonicalField::Email), Some(2));
            assert_eq!(mapping.field_for_column(0), None);
        }
    }

    #[test]
    fn test_empty_header_list() {
        let mapping = infer(&[], &Vocabulary::default());
        assert!(mapping.bindings.is_empty());
    }
}
