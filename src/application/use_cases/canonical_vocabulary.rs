// Centralized header synonym table for the onboarding import.
//
// Goal: keep spreadsheet header matching flexible without scattering synonym lists.

use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

use crate::domain::import::CanonicalField;

// NOTE:
// - Synonyms are matched against a normalized header (see `normalize_header`).
// - Matching is exact on the normalized text; no prefix/suffix heuristics.
// - A synonym must belong to exactly one field.

pub const NAME_SYNONYMS: &[&str] = &["nome", "name", "condòmino", "nominativo", "first name"];

pub const SURNAME_SYNONYMS: &[&str] = &["cognome", "surname", "last name"];

pub const EMAIL_SYNONYMS: &[&str] = &["email", "mail", "e-mail", "indirizzo email"];

pub const PHONE_SYNONYMS: &[&str] = &["telefono", "phone", "telephone", "cellulare", "mobile"];

pub const UNIT_CODE_SYNONYMS: &[&str] = &[
    "unità",
    "unit",
    "appartamento",
    "apartment",
    "flat",
    "codice unità",
    "unit code",
];

pub const FLOOR_SYNONYMS: &[&str] = &["piano", "floor", "level"];

pub const INTERNAL_NUMBER_SYNONYMS: &[&str] = &["interno", "internal", "int.", "internal number"];

pub const SIZE_SQM_SYNONYMS: &[&str] = &["mq", "size", "metri quadri", "superficie", "sqm"];

pub const PAYMENT_STATUS_SYNONYMS: &[&str] =
    &["stato pagamento", "payment", "stato", "payment status"];

pub const PROPERTY_NAME_SYNONYMS: &[&str] = &[
    "condominio",
    "condominium",
    "condominium name",
    "stabile",
    "property",
    "property name",
    "nome condominio",
];

/// Trim, lowercase, drop diacritics, turn punctuation into spaces and collapse runs.
pub fn normalize_header(s: &str) -> String {
    let folded: String = s
        .trim()
        .nfd()
        .filter(|c| !is_combining_mark(*c))
        .flat_map(char::to_lowercase)
        .map(|c| if c.is_alphanumeric() { c } else { ' ' })
        .collect();

    folded.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Canonical vocabulary for one import session.
///
/// Built from the fixed synonym table; passed explicitly to schema inference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Vocabulary {
    entries: Vec<(CanonicalField, Vec<String>)>,
}

impl Default for Vocabulary {
    fn default() -> Self {
        let table: [(CanonicalField, &[&str]); 10] = [
            (CanonicalField::Name, NAME_SYNONYMS),
            (CanonicalField::Surname, SURNAME_SYNONYMS),
            (CanonicalField::Email, EMAIL_SYNONYMS),
            (CanonicalField::Phone, PHONE_SYNONYMS),
            (CanonicalField::UnitCode, UNIT_CODE_SYNONYMS),
            (CanonicalField::Floor, FLOOR_SYNONYMS),
            (CanonicalField::InternalNumber, INTERNAL_NUMBER_SYNONYMS),
            (CanonicalField::SizeSqm, SIZE_SQM_SYNONYMS),
            (CanonicalField::PaymentStatus, PAYMENT_STATUS_SYNONYMS),
            (CanonicalField::PropertyName, PROPERTY_NAME_SYNONYMS),
        ];

        Self::from_table(&table)
    }
}

impl Vocabulary {
    pub fn from_table(table: &[(CanonicalField, &[&str])]) -> Self {
        let entries = table
            .iter()
            .map(|(field, synonyms)| {
                (
                    *field,
                    synonyms.iter().map(|s| normalize_header(s)).collect(),
                )
            })
            .collect();

        Self { entries }
    }

    /// First field whose synonym list holds the normalized header.
    pub fn lookup(&self, normalized_header: &str) -> Option<CanonicalField> {
        if normalized_header.is_empty() {
            return None;
        }
        self.entries
            .iter()
            .find(|(_, synonyms)| synonyms.iter().any(|s| s == normalized_header))
            .map(|(field, _)| *field)
    }

    pub fn synonyms(&self, field: CanonicalField) -> &[String] {
        self.entries
            .iter()
            .find(|(f, _)| *f == field)
            .map(|(_, s)| s.as_slice())
            .unwrap_or(&[])
    }
}
