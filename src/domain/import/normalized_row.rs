// ============================================================
// NORMALIZED ROW
// ============================================================
// Typed, validated view of one source row

use bigdecimal::BigDecimal;
use serde::{Deserialize, Serialize};

use super::CanonicalField;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Paid,
    Pending,
    Overdue,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Paid => "paid",
            PaymentStatus::Pending => "pending",
            PaymentStatus::Overdue => "overdue",
        }
    }
}

/// Canonical values of a row. Absent or unmapped fields are `None`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NormalizedFields {
    pub name: Option<String>,
    pub surname: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub unit_code: Option<String>,
    pub floor: Option<String>,
    pub internal_number: Option<String>,
    pub size_sqm: Option<BigDecimal>,
    pub payment_status: Option<PaymentStatus>,
    pub property_name: Option<String>,
}

impl NormalizedFields {
    pub fn full_name(&self) -> Option<String> {
        let parts: Vec<&str> = [self.name.as_deref(), self.surname.as_deref()]
            .into_iter()
            .flatten()
            .collect();
        if parts.is_empty() {
            None
        } else {
            Some(parts.join(" "))
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    pub field: CanonicalField,
    pub reason: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RowStatus {
    Valid,
    Invalid,
    /// No grouping key; removed from grouping and commit
    Skipped,
}

/// Result of normalizing one source row. Built once, never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedRow {
    pub row_index: usize,
    pub fields: NormalizedFields,
    pub errors: Vec<FieldError>,
    pub skip_reason: Option<String>,
}

impl NormalizedRow {
    pub fn status(&self) -> RowStatus {
        if self.skip_reason.is_some() {
            RowStatus::Skipped
        } else if self.errors.is_empty() {
            RowStatus::Valid
        } else {
            RowStatus::Invalid
        }
    }

    pub fn is_valid(&self) -> bool {
        self.status() == RowStatus::Valid
    }

    /// Property name of a non-skipped row.
    pub fn property_name(&self) -> Option<&str> {
        self.fields.property_name.as_deref()
    }

    /// All field reasons folded into one line.
    pub fn error_reason(&self) -> Option<String> {
        if self.errors.is_empty() {
            return None;
        }
        Some(
            self.errors
                .iter()
                .map(|e| format!("{}: {}", e.field, e.reason))
                .collect::<Vec<_>>()
                .join("; "),
        )
    }
}
