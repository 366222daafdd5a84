use std::str::FromStr;

use async_trait::async_trait;
use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
    Pool, Sqlite,
};

use super::{EntityId, NewEntity, NewOccupant, NewProperty, NewUnit, PropertyStore};
use crate::domain::error::{AppError, Result};

const SCHEMA: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS owners (
        id TEXT PRIMARY KEY,
        display_name TEXT,
        created_at DATETIME DEFAULT CURRENT_TIMESTAMP
    )",
    "CREATE TABLE IF NOT EXISTS properties (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        owner_id TEXT NOT NULL REFERENCES owners(id),
        name TEXT NOT NULL,
        created_at DATETIME DEFAULT CURRENT_TIMESTAMP
    )",
    "CREATE TABLE IF NOT EXISTS units (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        property_id INTEGER NOT NULL REFERENCES properties(id),
        unit_code TEXT NOT NULL,
        floor TEXT,
        internal_number TEXT,
        size_sqm TEXT,
        created_at DATETIME DEFAULT CURRENT_TIMESTAMP
    )",
    "CREATE TABLE IF NOT EXISTS occupants (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        property_id INTEGER NOT NULL REFERENCES properties(id),
        unit_id INTEGER REFERENCES units(id),
        name TEXT,
        surname TEXT,
        email TEXT,
        phone TEXT,
        payment_status TEXT,
        created_at DATETIME DEFAULT CURRENT_TIMESTAMP
    )",
    "CREATE INDEX IF NOT EXISTS idx_units_property ON units(property_id)",
    "CREATE INDEX IF NOT EXISTS idx_occupants_property ON occupants(property_id)",
];

pub struct SqliteStore {
    pool: Pool<Sqlite>,
}

impl SqliteStore {
    pub async fn init(database_url: &str) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(database_url)
            .map_err(|e| {
                AppError::ConfigError(format!("Failed to parse connection string: {}", e))
            })?
            .create_if_missing(true)
            .foreign_keys(true);

        // In-memory databases live per connection
        let max_connections = if database_url.contains(":memory:") { 1 } else { 5 };

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(options)
            .await
            .map_err(|e| AppError::PersistenceError(format!("Failed to connect: {}", e)))?;

        for statement in SCHEMA {
            sqlx::query(statement)
                .execute(&pool)
                .await
                .map_err(|e| AppError::PersistenceError(format!("Failed to create schema: {}", e)))?;
        }

        Ok(Self { pool })
    }

    pub async fn register_owner(&self, owner_id: &str, display_name: Option<&str>) -> Result<()> {
        sqlx::query("INSERT OR IGNORE INTO owners (id, display_name) VALUES (?, ?)")
            .bind(owner_id)
            .bind(display_name)
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::PersistenceError(format!("Failed to register owner: {}", e)))?;
        Ok(())
    }

    async fn insert_property(&self, property: &NewProperty) -> Result<EntityId> {
        let result = sqlx::query("INSERT INTO properties (owner_id, name) VALUES (?, ?)")
            .bind(&property.owner_id)
            .bind(&property.name)
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::PersistenceError(format!("Failed to create property: {}", e)))?;

        Ok(result.last_insert_rowid())
    }

    async fn insert_unit(&self, unit: &NewUnit) -> Result<EntityId> {
        let result = sqlx::query(
            "INSERT INTO units (property_id, unit_code, floor, internal_number, size_sqm)
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(unit.property_id)
        .bind(&unit.unit_code)
        .bind(&unit.floor)
        .bind(&unit.internal_number)
        .bind(unit.size_sqm.as_ref().map(|s| s.to_string()))
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::PersistenceError(format!("Failed to create unit: {}", e)))?;

        Ok(result.last_insert_rowid())
    }

    async fn insert_occupant(&self, occupant: &NewOccupant) -> Result<EntityId> {
        let result = sqlx::query(
            "INSERT INTO occupants (property_id, unit_id, name, surname, email, phone, payment_status)
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(occupant.property_id)
        .bind(occupant.unit_id)
        .bind(&occupant.name)
        .bind(&occupant.surname)
        .bind(&occupant.email)
        .bind(&occupant.phone)
        .bind(occupant.payment_status.map(|s| s.as_str()))
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::PersistenceError(format!("Failed to create occupant: {}", e)))?;

        Ok(result.last_insert_rowid())
    }
}

#[async_trait]
impl PropertyStore for SqliteStore {
    async fn authorize_owner(&self, owner_id: &str) -> Result<bool> {
        let found: Option<String> = sqlx::query_scalar("SELECT id FROM owners WHERE id = ?")
            .bind(owner_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::PersistenceError(format!("Failed to look up owner: {}", e)))?;

        Ok(found.is_some())
    }

    async fn create(&self, entity: NewEntity) -> Result<EntityId> {
        match &entity {
            NewEntity::Property(property) => self.insert_property(property).await,
            NewEntity::Unit(unit) => self.insert_unit(unit).await,
            NewEntity::Occupant(occupant) => self.insert_occupant(occupant).await,
        }
    }
}
