//! Import Orchestrator
//!
//! Commits property groups to the relational store:
//! - one property per group, then units and occupants row by row
//! - every entity create is its own unit of work with a bounded timeout
//! - failures are captured per row and never abort the run
//! - independent groups are committed on a bounded worker pool

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use crate::domain::error::{AppError, Result};
use crate::domain::import::{CommittedRow, ImportSummary, PropertyGroup, RowError, RowOutcome};
use crate::domain::import_config::ImportConfig;
use crate::infrastructure::db::{
    EntityId, NewEntity, NewOccupant, NewProperty, NewUnit, PropertyStore,
};

pub struct ImportOrchestrator {
    store: Arc<dyn PropertyStore>,
    config: ImportConfig,
}

impl ImportOrchestrator {
    pub fn new(store: Arc<dyn PropertyStore>, config: ImportConfig) -> Self {
        Self { store, config }
    }

    /// Commit all groups for `owner_id`.
    ///
    /// A missing or unknown owner is fatal and nothing is written. Otherwise
    /// the summary reflects exactly what was attempted and what succeeded.
    pub async fn commit(
        &self,
        groups: Vec<PropertyGroup>,
        owner_id: Option<&str>,
    ) -> Result<ImportSummary> {
        let outcomes = self.commit_outcomes(groups, owner_id).await?;
        Ok(ImportSummary::from_outcomes(outcomes))
    }

    /// Same as `commit`, returning the raw outcomes before reduction.
    pub async fn commit_outcomes(
        &self,
        groups: Vec<PropertyGroup>,
        owner_id: Option<&str>,
    ) -> Result<Vec<RowOutcome>> {
        let owner = self.authorize(owner_id).await?;

        info!(
            groups = groups.len(),
            owner = %owner,
            "Committing import"
        );

        let timeout = self.config.entity_timeout();
        let permits = Arc::new(Semaphore::new(self.config.max_concurrent_groups));
        let mut tasks: JoinSet<(usize, Vec<RowOutcome>)> = JoinSet::new();
        let mut group_rows: Vec<Vec<usize>> = Vec::with_capacity(groups.len());

        for (position, group) in groups.into_iter().enumerate() {
            group_rows.push(group.row_indices());

            let store = Arc::clone(&self.store);
            let permits = Arc::clone(&permits);
            let owner = owner.clone();

            tasks.spawn(async move {
                // The semaphore is never closed
                let _permit = permits.acquire_owned().await.ok();
                let outcomes = commit_group(store.as_ref(), &owner, group, timeout).await;
                (position, outcomes)
            });
        }

        let mut per_group: Vec<Option<Vec<RowOutcome>>> = vec![None; group_rows.len()];
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((position, outcomes)) => per_group[position] = Some(outcomes),
                Err(e) => warn!(error = %e, "Group commit task aborted"),
            }
        }

        // A task that died still owes one outcome per row
        let outcomes = per_group
            .into_iter()
            .zip(group_rows)
            .flat_map(|(outcomes, rows)| {
                outcomes.unwrap_or_else(|| {
                    rows.into_iter()
                        .map(|row_index| {
                            RowOutcome::Row(Err(RowError::new(
                                row_index,
                                None,
                                "commit task aborted before this row completed",
                            )))
                        })
                        .collect()
                })
            })
            .collect();

        Ok(outcomes)
    }

    async fn authorize(&self, owner_id: Option<&str>) -> Result<String> {
        let owner = owner_id
            .map(str::trim)
            .filter(|o| !o.is_empty())
            .ok_or_else(|| AppError::AuthorizationError("Owner id is missing".to_string()))?;

        let verdict = tokio::time::timeout(
            self.config.entity_timeout(),
            self.store.authorize_owner(owner),
        )
        .await;

        match verdict {
            Ok(Ok(true)) => Ok(owner.to_string()),
            Ok(Ok(false)) => Err(AppError::AuthorizationError(format!(
                "Owner '{}' is not authorized to import",
                owner
            ))),
            Ok(Err(e)) => Err(AppError::AuthorizationError(format!(
                "Owner '{}' could not be verified: {}",
                owner, e
            ))),
            Err(_) => Err(AppError::AuthorizationError(format!(
                "Owner '{}' could not be verified in time",
                owner
            ))),
        }
    }
}

async fn commit_group(
    store: &dyn PropertyStore,
    owner: &str,
    group: PropertyGroup,
    timeout: Duration,
) -> Vec<RowOutcome> {
    let mut outcomes = Vec::with_capacity(group.rows.len() + 1);

    let property = NewEntity::Property(NewProperty {
        owner_id: owner.to_string(),
        name: group.property_name.clone(),
    });

    let property_id = match create_with_timeout(store, property, timeout).await {
        Ok(id) => {
            outcomes.push(RowOutcome::PropertyCreated { property_id: id });
            id
        }
        Err(e) => {
            warn!(property = %group.property_name, error = %e, "Property create failed");
            let reason = format!("property '{}' could not be created: {}", group.property_name, e);
            outcomes.extend(group.rows.iter().map(|row| {
                RowOutcome::Row(Err(RowError::new(
                    row.row_index,
                    Some("property_name"),
                    reason.clone(),
                )))
            }));
            return outcomes;
        }
    };

    // Units are keyed by normalized code; only successful creates are reused
    let mut units: HashMap<String, EntityId> = HashMap::new();

    for row in &group.rows {
        let unit_id = match NewUnit::from_row(property_id, row) {
            None => None,
            Some(unit) => match units.get(&unit.unit_code) {
                Some(id) => Some(*id),
                None => {
                    let code = unit.unit_code.clone();
                    match create_with_timeout(store, NewEntity::Unit(unit), timeout).await {
                        Ok(id) => {
                            units.insert(code, id);
                            outcomes.push(RowOutcome::UnitCreated {
                                row_index: row.row_index,
                                unit_id: id,
                            });
                            Some(id)
                        }
                        Err(e) => {
                            warn!(row = row.row_index, unit = %code, error = %e, "Unit create failed");
                            outcomes.push(RowOutcome::Row(Err(RowError::new(
                                row.row_index,
                                Some("unit_code"),
                                format!("unit '{}' could not be created: {}", code, e),
                            ))));
                            continue;
                        }
                    }
                }
            },
        };

        let occupant = NewEntity::Occupant(NewOccupant::from_row(property_id, unit_id, row));
        match create_with_timeout(store, occupant, timeout).await {
            Ok(occupant_id) => outcomes.push(RowOutcome::Row(Ok(CommittedRow {
                row_index: row.row_index,
                property_id,
                unit_id,
                occupant_id,
            }))),
            Err(e) => {
                warn!(row = row.row_index, error = %e, "Occupant create failed");
                outcomes.push(RowOutcome::Row(Err(RowError::new(
                    row.row_index,
                    None,
                    format!("occupant could not be created: {}", e),
                ))));
            }
        }
    }

    debug!(
        property = %group.property_name,
        property_id,
        units = units.len(),
        "Group committed"
    );

    outcomes
}

async fn create_with_timeout(
    store: &dyn PropertyStore,
    entity: NewEntity,
    timeout: Duration,
) -> Result<EntityId> {
    let kind = entity.kind();
    match tokio::time::timeout(timeout, store.create(entity)).await {
        Ok(result) => result,
        Err(_) => Err(AppError::Timeout(format!(
            "{} create exceeded {}ms",
            kind,
            timeout.as_millis()
        ))),
    }
}
