//! Persistence options for [`TurnState`](crate::TurnState).

use serde::{Deserialize, Serialize};

/// How a save treats the version tag it carries.
#[non_exhaustive]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictPolicy {
    /// Every save overwrites whatever is stored.
    #[default]
    LastWriterWins,
    /// A save fails with a conflict if the record changed since it was read.
    Strict,
}

/// Options for one state slot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StateSettings {
    /// Version-tag handling on save.
    pub conflict_policy: ConflictPolicy,
    /// Also save when the chain fails. Never applies to cancelled turns.
    pub save_on_fault: bool,
}

impl StateSettings {
    /// Settings with the [`ConflictPolicy::Strict`] policy.
    pub fn strict() -> Self {
        Self {
            conflict_policy: ConflictPolicy::Strict,
            ..Self::default()
        }
    }
}
