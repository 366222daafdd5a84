pub mod sqlite;

use async_trait::async_trait;
use bigdecimal::BigDecimal;
use serde::{Deserialize, Serialize};

use crate::domain::error::Result;
use crate::domain::import::{NormalizedRow, PaymentStatus};

pub type EntityId = i64;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewProperty {
    pub owner_id: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewUnit {
    pub property_id: EntityId,
    pub unit_code: String,
    pub floor: Option<String>,
    pub internal_number: Option<String>,
    pub size_sqm: Option<BigDecimal>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewOccupant {
    pub property_id: EntityId,
    pub unit_id: Option<EntityId>,
    pub name: Option<String>,
    pub surname: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub payment_status: Option<PaymentStatus>,
}

impl NewUnit {
    /// Unit attributes of a row; `None` when the row carries no unit code.
    pub fn from_row(property_id: EntityId, row: &NormalizedRow) -> Option<Self> {
        let unit_code = row.fields.unit_code.clone()?;
        Some(Self {
            property_id,
            unit_code,
            floor: row.fields.floor.clone(),
            internal_number: row.fields.internal_number.clone(),
            size_sqm: row.fields.size_sqm.clone(),
        })
    }
}

impl NewOccupant {
    pub fn from_row(property_id: EntityId, unit_id: Option<EntityId>, row: &NormalizedRow) -> Self {
        Self {
            property_id,
            unit_id,
            name: row.fields.name.clone(),
            surname: row.fields.surname.clone(),
            email: row.fields.email.clone(),
            phone: row.fields.phone.clone(),
            payment_status: row.fields.payment_status,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "entity_type", rename_all = "snake_case")]
pub enum NewEntity {
    Property(NewProperty),
    Unit(NewUnit),
    Occupant(NewOccupant),
}

impl NewEntity {
    pub fn kind(&self) -> &'static str {
        match self {
            NewEntity::Property(_) => "property",
            NewEntity::Unit(_) => "unit",
            NewEntity::Occupant(_) => "occupant",
        }
    }
}

/// Relational store receiving the imported hierarchy.
///
/// Every `create` is its own unit of work; the importer never asks for a
/// transaction spanning several entities.
#[async_trait]
pub trait PropertyStore: Send + Sync {
    async fn authorize_owner(&self, owner_id: &str) -> Result<bool>;
    async fn create(&self, entity: NewEntity) -> Result<EntityId>;
}
