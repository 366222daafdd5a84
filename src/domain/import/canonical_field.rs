// ============================================================
// CANONICAL FIELDS
// ============================================================
// Fixed internal attribute identifiers, independent of source headers

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::domain::error::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CanonicalField {
    Name,
    Surname,
    Email,
    Phone,
    UnitCode,
    Floor,
    InternalNumber,
    SizeSqm,
    PaymentStatus,
    PropertyName,
}

impl CanonicalField {
    pub const ALL: [CanonicalField; 10] = [
        CanonicalField::Name,
        CanonicalField::Surname,
        CanonicalField::Email,
        CanonicalField::Phone,
        CanonicalField::UnitCode,
        CanonicalField::Floor,
        CanonicalField::InternalNumber,
        CanonicalField::SizeSqm,
        CanonicalField::PaymentStatus,
        CanonicalField::PropertyName,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CanonicalField::Name => "name",
            CanonicalField::Surname => "surname",
            CanonicalField::Email => "email",
            CanonicalField::Phone => "phone",
            CanonicalField::UnitCode => "unit_code",
            CanonicalField::Floor => "floor",
            CanonicalField::InternalNumber => "internal_number",
            CanonicalField::SizeSqm => "size_sqm",
            CanonicalField::PaymentStatus => "payment_status",
            CanonicalField::PropertyName => "property_name",
        }
    }
}

impl fmt::Display for CanonicalField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CanonicalField {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = s.trim().to_ascii_lowercase();
        CanonicalField::ALL
            .iter()
            .copied()
            .find(|f| f.as_str() == key)
            .ok_or_else(|| AppError::ValidationError(format!("Unknown canonical field: {}", s)))
    }
}
