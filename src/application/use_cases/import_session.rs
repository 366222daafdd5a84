//! Import Session
//!
//! Wizard state for a single upload: load → map → preview → commit. Each
//! session owns its vocabulary, its overrides and its parsed rows, so two
//! runs never share mapping state.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use serde::Serialize;
use tracing::{info, warn};

use super::canonical_vocabulary::Vocabulary;
use super::file_ingestor::{self, DeclaredType, FileFormat, ParsedFile};
use super::grouper;
use super::import_orchestrator::ImportOrchestrator;
use super::row_normalizer;
use super::schema_inference;
use crate::domain::error::{AppError, Result};
use crate::domain::import::{
    CanonicalField, ColumnMapping, ImportStage, ImportSummary, MappingOverrides, NormalizedRow,
    PropertyGroup, RowError, RowOutcome, RowStatus, SkippedRow,
};
use crate::infrastructure::messaging::InviteContact;
use crate::infrastructure::storage::BlobStore;

#[derive(Debug, Clone, Serialize)]
pub struct GroupPreview {
    pub property_name: String,
    pub rows: usize,
    pub units: usize,
}

/// What a commit would do with the current mapping.
#[derive(Debug, Clone, Serialize)]
pub struct ImportPreview {
    pub total_rows: usize,
    pub valid_rows: usize,
    pub invalid_rows: usize,
    pub skipped_rows: usize,
    pub groups: Vec<GroupPreview>,
    pub errors: Vec<RowError>,
    pub skipped: Vec<SkippedRow>,
    pub unmapped_headers: Vec<String>,
}

pub struct ImportSession {
    stage: ImportStage,
    vocabulary: Vocabulary,
    archive: Option<Arc<dyn BlobStore>>,
    file: Option<ParsedFile>,
    inferred: Option<ColumnMapping>,
    overrides: MappingOverrides,
    normalized: Vec<NormalizedRow>,
    summary: Option<ImportSummary>,
    archived_at: Option<String>,
    invites_dispatched: bool,
}

impl Default for ImportSession {
    fn default() -> Self {
        Self::new(Vocabulary::default())
    }
}

impl ImportSession {
    pub fn new(vocabulary: Vocabulary) -> Self {
        Self {
            stage: ImportStage::Idle,
            vocabulary,
            archive: None,
            file: None,
            inferred: None,
            overrides: MappingOverrides::new(),
            normalized: Vec::new(),
            summary: None,
            archived_at: None,
            invites_dispatched: false,
        }
    }

    pub fn with_archive(mut self, archive: Arc<dyn BlobStore>) -> Self {
        self.archive = Some(archive);
        self
    }

    pub fn stage(&self) -> ImportStage {
        self.stage
    }

    pub fn summary(&self) -> Option<&ImportSummary> {
        self.summary.as_ref()
    }

    pub fn overrides(&self) -> &MappingOverrides {
        &self.overrides
    }

    pub fn format(&self) -> Option<FileFormat> {
        self.file.as_ref().map(|f| f.format)
    }

    pub fn headers(&self) -> &[String] {
        self.file.as_ref().map(|f| f.headers.as_slice()).unwrap_or(&[])
    }

    pub fn row_count(&self) -> usize {
        self.file.as_ref().map(ParsedFile::row_count).unwrap_or(0)
    }

    pub fn archived_at(&self) -> Option<&str> {
        self.archived_at.as_deref()
    }

    /// Parse the upload and infer a mapping. A format failure ends the session.
    pub async fn load_file(
        &mut self,
        bytes: &[u8],
        declared: DeclaredType,
        file_name: Option<&str>,
    ) -> Result<ColumnMapping> {
        self.expect_stage(ImportStage::Idle, "load a file")?;

        let parsed = match file_ingestor::parse(bytes, declared) {
            Ok(parsed) => parsed,
            Err(e) => {
                warn!(error = %e, "Upload rejected");
                self.stage = ImportStage::CommitFailed;
                return Err(e);
            }
        };
        self.stage = ImportStage::FileLoaded;

        if let Some(archive) = &self.archive {
            match archive.archive(bytes, file_name).await {
                Ok(location) => self.archived_at = Some(location),
                Err(e) => warn!(error = %e, "Upload archival failed; continuing"),
            }
        }

        let inferred = schema_inference::infer(&parsed.headers, &self.vocabulary);
        info!(
            rows = parsed.row_count(),
            unmapped = inferred.unmapped_headers().len(),
            "Mapping ready"
        );

        self.file = Some(parsed);
        self.inferred = Some(inferred);
        self.stage = ImportStage::MappingReady;

        self.mapping()
    }

    /// Inferred mapping with the session overrides layered on top.
    pub fn mapping(&self) -> Result<ColumnMapping> {
        let inferred = self
            .inferred
            .as_ref()
            .ok_or_else(|| AppError::InvalidState("No file loaded".to_string()))?;
        Ok(self.overrides.apply(inferred))
    }

    pub fn set_override(&mut self, header: &str, field: Option<CanonicalField>) -> Result<ColumnMapping> {
        self.ensure_overrides_open()?;

        if !self.headers().iter().any(|h| h.trim() == header.trim()) {
            return Err(AppError::ValidationError(format!(
                "Unknown column header '{}'",
                header
            )));
        }

        self.overrides.set(header, field);
        self.invalidate_preview();
        self.mapping()
    }

    pub fn clear_override(&mut self, header: &str) -> Result<bool> {
        self.ensure_overrides_open()?;

        let removed = self.overrides.remove(header);
        if removed {
            self.invalidate_preview();
        }
        Ok(removed)
    }

    pub fn preview(&mut self) -> Result<ImportPreview> {
        if !self.stage.can_preview() {
            return Err(self.illegal("preview"));
        }

        let mapping = self.mapping()?;
        let normalized = self.normalize_all(&mapping);
        let groups = grouper::group(&normalized);

        let mut errors = Vec::new();
        let mut skipped = Vec::new();
        for outcome in grouper::excluded_outcomes(&normalized) {
            match outcome {
                RowOutcome::Row(Err(e)) => errors.push(e),
                RowOutcome::Skipped(s) => skipped.push(s),
                _ => {}
            }
        }

        let count = |status: RowStatus| normalized.iter().filter(|r| r.status() == status).count();
        let preview = ImportPreview {
            total_rows: normalized.len(),
            valid_rows: count(RowStatus::Valid),
            invalid_rows: count(RowStatus::Invalid),
            skipped_rows: count(RowStatus::Skipped),
            groups: groups.iter().map(group_preview).collect(),
            errors,
            skipped,
            unmapped_headers: mapping
                .unmapped_headers()
                .into_iter()
                .map(str::to_string)
                .collect(),
        };

        self.normalized = normalized;
        self.stage = ImportStage::Previewed;
        Ok(preview)
    }

    /// Commit the current rows. Only a fatal precondition keeps the run from
    /// reaching `Completed`.
    pub async fn commit(
        &mut self,
        orchestrator: &ImportOrchestrator,
        owner_id: Option<&str>,
    ) -> Result<ImportSummary> {
        if !self.stage.can_commit() {
            return Err(self.illegal("commit"));
        }

        let mapping = self.mapping()?;
        let normalized = self.normalize_all(&mapping);
        let groups: Vec<PropertyGroup> = grouper::group(&normalized);
        let excluded = grouper::excluded_outcomes(&normalized);

        self.stage = ImportStage::Committing;
        self.normalized = normalized;

        let committed = match orchestrator.commit_outcomes(groups, owner_id).await {
            Ok(outcomes) => outcomes,
            Err(e) => {
                warn!(error = %e, "Commit aborted");
                self.stage = ImportStage::CommitFailed;
                return Err(e);
            }
        };

        let summary = ImportSummary::from_outcomes(excluded.into_iter().chain(committed));
        info!(
            properties = summary.properties_created,
            units = summary.units_created,
            occupants = summary.occupants_created,
            errors = summary.errors.len(),
            skipped = summary.skipped.len(),
            "Import completed"
        );

        self.stage = ImportStage::Completed;
        self.summary = Some(summary.clone());
        Ok(summary)
    }

    /// Drop every in-memory artifact and return to `Idle`.
    pub fn discard(&mut self) -> Result<()> {
        if !self.stage.can_discard() {
            return Err(self.illegal("discard"));
        }

        self.stage = ImportStage::Idle;
        self.file = None;
        self.inferred = None;
        self.overrides = MappingOverrides::new();
        self.normalized.clear();
        self.summary = None;
        self.archived_at = None;
        self.invites_dispatched = false;
        Ok(())
    }

    /// Contacts for every occupant created by the completed commit.
    pub fn committed_occupants(&self) -> Result<Vec<InviteContact>> {
        let summary = match (&self.stage, &self.summary) {
            (ImportStage::Completed, Some(summary)) => summary,
            _ => return Err(self.illegal("list committed occupants")),
        };

        let rows: HashMap<usize, &NormalizedRow> =
            self.normalized.iter().map(|r| (r.row_index, r)).collect();

        let contacts = summary
            .committed
            .iter()
            .filter_map(|c| {
                let row = rows.get(&c.row_index)?;
                Some(InviteContact {
                    occupant_id: c.occupant_id,
                    property_id: c.property_id,
                    unit_id: c.unit_id,
                    property_name: row.property_name().unwrap_or_default().to_string(),
                    full_name: row.fields.full_name(),
                    email: row.fields.email.clone(),
                    phone: row.fields.phone.clone(),
                })
            })
            .collect();

        Ok(contacts)
    }

    /// Contacts for the single invite dispatch a completed import allows.
    pub fn take_invites(&mut self) -> Result<Vec<InviteContact>> {
        let contacts = self.committed_occupants()?;
        if self.invites_dispatched {
            return Err(AppError::InvalidState(
                "Invites were already dispatched for this import".to_string(),
            ));
        }
        self.invites_dispatched = true;
        Ok(contacts)
    }

    fn normalize_all(&self, mapping: &ColumnMapping) -> Vec<NormalizedRow> {
        let Some(file) = &self.file else {
            return Vec::new();
        };
        file.rows
            .iter()
            .map(|row| row_normalizer::normalize(row, mapping))
            .collect()
    }

    fn ensure_overrides_open(&self) -> Result<()> {
        if self.stage.accepts_overrides() {
            Ok(())
        } else {
            Err(self.illegal("change the mapping"))
        }
    }

    fn invalidate_preview(&mut self) {
        if self.stage == ImportStage::Previewed {
            self.stage = ImportStage::MappingReady;
        }
    }

    fn expect_stage(&self, expected: ImportStage, action: &str) -> Result<()> {
        if self.stage == expected {
            Ok(())
        } else {
            Err(self.illegal(action))
        }
    }

    fn illegal(&self, action: &str) -> AppError {
        AppError::InvalidState(format!("Cannot {} while session is {:?}", action, self.stage))
    }
}

fn group_preview(group: &PropertyGroup) -> GroupPreview {
    let units: BTreeSet<&str> = group
        .rows
        .iter()
        .filter_map(|r| r.fields.unit_code.as_deref())
        .collect();

    GroupPreview {
        property_name: group.property_name.clone(),
        rows: group.rows.len(),
        units: units.len(),
    }
}
