use serde::{Deserialize, Serialize};

/// Wizard stage of one import session.
///
/// `Idle → FileLoaded → MappingReady → Previewed → Committing → Completed`,
/// with `CommitFailed` reached only through a fatal precondition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImportStage {
    Idle,
    FileLoaded,
    MappingReady,
    Previewed,
    Committing,
    Completed,
    CommitFailed,
}

impl ImportStage {
    pub fn is_terminal(&self) -> bool {
        matches!(self, ImportStage::Completed | ImportStage::CommitFailed)
    }

    /// Stages in which the mapping may still be corrected.
    pub fn accepts_overrides(&self) -> bool {
        matches!(self, ImportStage::MappingReady | ImportStage::Previewed)
    }

    pub fn can_preview(&self) -> bool {
        matches!(self, ImportStage::MappingReady | ImportStage::Previewed)
    }

    /// Only a previewed mapping is committed.
    pub fn can_commit(&self) -> bool {
        matches!(self, ImportStage::Previewed)
    }

    /// In-memory state can be dropped without external side effects.
    pub fn can_discard(&self) -> bool {
        !matches!(self, ImportStage::Committing)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overrides_frozen_once_committing() {
        assert!(ImportStage::Previewed.accepts_overrides());
        assert!(!ImportStage::Committing.accepts_overrides());
        assert!(!ImportStage::Completed.accepts_overrides());
    }

    #[test]
    fn test_terminal_stages() {
        assert!(ImportStage::Completed.is_terminal());
        assert!(ImportStage::CommitFailed.is_terminal());
        assert!(!ImportStage::Committing.is_terminal());
        assert!(!ImportStage::Committing.can_discard());
    }

    #[test]
    fn test_commit_requires_preview() {
        assert!(ImportStage::MappingReady.can_preview());
        assert!(!ImportStage::MappingReady.can_commit());
        assert!(ImportStage::Previewed.can_commit());
        assert!(!ImportStage::Completed.can_preview());
    }
}
