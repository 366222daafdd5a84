//! Row normalization and validation.
//!
//! Every source row becomes exactly one `NormalizedRow`, independent of the
//! others. Field failures mark the row invalid but keep it for reporting; a
//! row without a resolvable property name is the only one marked skipped.

use std::str::FromStr;

use bigdecimal::{BigDecimal, Zero};
use once_cell::sync::Lazy;
use regex::Regex;
use validator::ValidateEmail;

use super::canonical_vocabulary::normalize_header;
use crate::domain::import::{
    CanonicalField, ColumnMapping, FieldError, NormalizedFields, NormalizedRow, PaymentStatus,
    SourceRow,
};

static PHONE_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\+?[0-9][0-9 ()./-]{5,}$").unwrap());

static AREA_UNIT_SUFFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\s*(m2|m²|mq|sqm)\.?$").unwrap());

const PAID_SYNONYMS: &[&str] = &["pagato", "in regola", "regolare", "paid", "ok"];
const PENDING_SYNONYMS: &[&str] = &["da pagare", "in attesa", "pending", "unpaid"];
const OVERDUE_SYNONYMS: &[&str] = &["moroso", "insoluto", "scaduto", "overdue", "late"];

pub fn normalize(row: &SourceRow, mapping: &ColumnMapping) -> NormalizedRow {
    let mut fields = NormalizedFields::default();
    let mut errors = Vec::new();

    let raw = |field: CanonicalField| {
        mapping
            .column_for(field)
            .and_then(|column| row.value_at(column))
            .map(str::trim)
            .filter(|v| !v.is_empty())
    };

    fields.name = raw(CanonicalField::Name).map(str::to_string);
    fields.surname = raw(CanonicalField::Surname).map(str::to_string);
    fields.floor = raw(CanonicalField::Floor).map(str::to_string);
    fields.internal_number = raw(CanonicalField::InternalNumber).map(str::to_string);
    fields.property_name = raw(CanonicalField::PropertyName).map(str::to_string);

    if let Some(value) = raw(CanonicalField::Email) {
        let email = value.to_lowercase();
        if email.validate_email() {
            fields.email = Some(email);
        } else {
            errors.push(FieldError {
                field: CanonicalField::Email,
                reason: format!("'{}' is not a valid email address", value),
            });
        }
    }

    if let Some(value) = raw(CanonicalField::Phone) {
        match normalize_phone(value) {
            Some(phone) => fields.phone = Some(phone),
            None => errors.push(FieldError {
                field: CanonicalField::Phone,
                reason: format!("'{}' is not a valid phone number", value),
            }),
        }
    }

    fields.unit_code = raw(CanonicalField::UnitCode)
        .map(normalize_unit_code)
        .filter(|code| !code.is_empty());

    // Unusable sizes are dropped, never reported
    fields.size_sqm = raw(CanonicalField::SizeSqm)
        .and_then(parse_decimal)
        .filter(|size| *size >= BigDecimal::zero());

    if let Some(value) = raw(CanonicalField::PaymentStatus) {
        match parse_payment_status(value) {
            Some(status) => fields.payment_status = Some(status),
            None => errors.push(FieldError {
                field: CanonicalField::PaymentStatus,
                reason: format!("'{}' is not a recognized payment status", value),
            }),
        }
    }

    let skip_reason = if !mapping.is_mapped(CanonicalField::PropertyName) {
        Some("property_name column is not mapped".to_string())
    } else if fields.property_name.is_none() {
        Some("property_name is empty".to_string())
    } else {
        None
    };

    NormalizedRow {
        row_index: row.index,
        fields,
        errors,
        skip_reason,
    }
}

/// Uppercase and keep only `A-Z0-9`. Idempotent.
pub fn normalize_unit_code(raw: &str) -> String {
    raw.to_uppercase()
        .chars()
        .filter(|c| c.is_ascii_uppercase() || c.is_ascii_digit())
        .collect()
}

fn normalize_phone(raw: &str) -> Option<String> {
    if !PHONE_PATTERN.is_match(raw) {
        return None;
    }
    let digits: String = raw.chars().filter(|c| c.is_ascii_digit()).collect();
    if raw.starts_with('+') {
        Some(format!("+{}", digits))
    } else {
        Some(digits)
    }
}

/// Locale-aware decimal parsing.
///
/// Accepts `1.234,5`, `1,234.5`, `56,5`, `56.5` and an optional area suffix.
/// When both separators occur the last one is the decimal mark; a lone comma
/// is a decimal mark; repeated single separators are thousands marks.
pub fn parse_decimal(raw: &str) -> Option<BigDecimal> {
    let trimmed = AREA_UNIT_SUFFIX.replace(raw.trim(), "");
    let compact: String = trimmed
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '\'')
        .collect();
    if compact.is_empty() {
        return None;
    }

    let dots = compact.matches('.').count();
    let commas = compact.matches(',').count();

    let canonical = match (compact.rfind('.'), compact.rfind(',')) {
        (Some(dot), Some(comma)) if comma > dot => compact.replace('.', "").replace(',', "."),
        (Some(_), Some(_)) => compact.replace(',', ""),
        (None, Some(_)) if commas == 1 => compact.replace(',', "."),
        (None, Some(_)) => compact.replace(',', ""),
        (Some(_), None) if dots > 1 => compact.replace('.', ""),
        _ => compact,
    };

    if !canonical
        .chars()
        .all(|c| c.is_ascii_digit() || c == '.' || c == '-' || c == '+')
    {
        return None;
    }

    BigDecimal::from_str(&canonical).ok()
}

pub fn parse_payment_status(raw: &str) -> Option<PaymentStatus> {
    let key = normalize_header(raw);
    let matches = |list: &[&str]| list.iter().any(|s| normalize_header(s) == key);

    if matches(PAID_SYNONYMS) {
        Some(PaymentStatus::Paid)
    } else if matches(PENDING_SYNONYMS) {
        Some(PaymentStatus::Pending)
    } else if matches(OVERDUE_SYNONYMS) {
        Some(PaymentStatus::Overdue)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::use_cases::canonical_vocabulary::Vocabulary;
    use crate::application::use_cases::schema_inference::infer;
    use crate::domain::import::RowStatus;

    fn source(headers: &[&str], values: &[&str]) -> (SourceRow, ColumnMapping) {
        let headers: Vec<String> = headers.iter().map(|s| s.to_string()).collect();
        let mapping = infer(&headers, &Vocabulary::default());
        let row = SourceRow::new(
            0,
            &headers,
            values.iter().map(|s| s.to_string()).collect(),
        );
        (row, mapping)
    }

    #[test]
    fn test_unit_code_normalization() {
        assert_eq!(normalize_unit_code("a-1"), "A1");
        assert_eq!(normalize_unit_code(" A1 "), "A1");
        assert_eq!(normalize_unit_code("a1"), "A1");
        assert_eq!(normalize_unit_code("Scala B / 12"), "SCALAB12");
    }

    #[test]
    fn test_unit_code_normalization_is_idempotent() {
        for raw in ["a-1", " A1 ", "int. 3/b", "Ünit 7", "", "---"] {
            let once = normalize_unit_code(raw);
            assert_eq!(normalize_unit_code(&once), once);
        }
    }

    #[test]
    fn test_parse_decimal_locales() {
        let d = |s: &str| BigDecimal::from_str(s).unwrap();
        assert_eq!(parse_decimal("56,5"), Some(d("56.5")));
        assert_eq!(parse_decimal("56.5"), Some(d("56.5")));
        assert_eq!(parse_decimal("1.234,5"), Some(d("1234.5")));
        assert_eq!(parse_decimal("1,234.5"), Some(d("1234.5")));
        assert_eq!(parse_decimal("1.234.567"), Some(d("1234567")));
        assert_eq!(parse_decimal("85 mq"), Some(d("85")));
        assert_eq!(parse_decimal("n/d"), None);
        assert_eq!(parse_decimal(""), None);
    }

    #[test]
    fn test_valid_row() {
        let (row, mapping) = source(
            &["Condominio", "Unità", "Nome", "Email", "Telefono", "Mq"],
            &["Residenza Sole", "a-1", " Mario ", "Mario@Example.com", "+39 333 123 4567", "56,5"],
        );
        let normalized = normalize(&row, &mapping);

        assert_eq!(normalized.status(), RowStatus::Valid);
        assert_eq!(normalized.fields.property_name.as_deref(), Some("Residenza Sole"));
        assert_eq!(normalized.fields.unit_code.as_deref(), Some("A1"));
        assert_eq!(normalized.fields.name.as_deref(), Some("Mario"));
        assert_eq!(normalized.fields.email.as_deref(), Some("mario@example.com"));
        assert_eq!(normalized.fields.phone.as_deref(), Some("+393331234567"));
        assert_eq!(normalized.fields.size_sqm, Some(BigDecimal::from_str("56.5").unwrap()));
    }

    #[test]
    fn test_invalid_email_marks_row_invalid() {
        let (row, mapping) = source(&["Condominio", "Email"], &["Residenza Sole", "invalid-email"]);
        let normalized = normalize(&row, &mapping);

        assert_eq!(normalized.status(), RowStatus::Invalid);
        assert_eq!(normalized.errors[0].field, CanonicalField::Email);
        assert!(normalized.error_reason().unwrap().contains("email"));
    }

    #[test]
    fn test_bad_size_is_absent_not_invalid() {
        let (row, mapping) = source(&["Condominio", "Mq"], &["Residenza Sole", "-12"]);
        let normalized = normalize(&row, &mapping);
        assert!(normalized.is_valid());
        assert_eq!(normalized.fields.size_sqm, None);

        let (row, mapping) = source(&["Condominio", "Mq"], &["Residenza Sole", "circa cento"]);
        let normalized = normalize(&row, &mapping);
        assert!(normalized.is_valid());
        assert_eq!(normalized.fields.size_sqm, None);
    }

    #[test]
    fn test_missing_property_name_is_skipped() {
        let (row, mapping) = source(&["Condominio", "Nome"], &["  ", "Mario"]);
        assert_eq!(normalize(&row, &mapping).status(), RowStatus::Skipped);

        let (row, mapping) = source(&["Nome", "Email"], &["Mario", "invalid-email"]);
        let normalized = normalize(&row, &mapping);
        assert_eq!(normalized.status(), RowStatus::Skipped);
        assert_eq!(
            normalized.skip_reason.as_deref(),
            Some("property_name column is not mapped")
        );
    }

    #[test]
    fn test_payment_status_synonyms() {
        assert_eq!(parse_payment_status("In regola"), Some(PaymentStatus::Paid));
        assert_eq!(parse_payment_status("MOROSO"), Some(PaymentStatus::Overdue));
        assert_eq!(parse_payment_status("da pagare"), Some(PaymentStatus::Pending));
        assert_eq!(parse_payment_status("forse"), None);
    }

    #[test]
    fn test_unrecognized_payment_status_is_field_error() {
        let (row, mapping) = source(&["Condominio", "Stato pagamento"], &["Residenza Sole", "forse"]);
        let normalized = normalize(&row, &mapping);
        assert_eq!(normalized.errors[0].field, CanonicalField::PaymentStatus);
    }

    #[test]
    fn test_empty_unit_code_is_absent() {
        let (row, mapping) = source(&["Condominio", "Unità"], &["Residenza Sole", "--"]);
        assert_eq!(normalize(&row, &mapping).fields.unit_code, None);
    }
}
