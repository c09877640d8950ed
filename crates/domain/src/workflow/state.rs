//! Workflow activation state.

use serde::{Deserialize, Serialize};

/// Whether a workflow's triggers are live.
///
/// State transitions:
/// ```text
/// Inactive ──activate (needs ≥1 node)──► Active
///    ▲                                     │
///    └────────────── deactivate ───────────┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum WorkflowState {
    #[default]
    Inactive,
    Active,
}

impl WorkflowState {
    pub fn from_active(active: bool) -> Self {
        if active {
            WorkflowState::Active
        } else {
            WorkflowState::Inactive
        }
    }

    pub fn is_active(&self) -> bool {
        matches!(self, WorkflowState::Active)
    }

    /// Returns the state name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            WorkflowState::Inactive => "Inactive",
            WorkflowState::Active => "Active",
        }
    }
}

impl std::fmt::Display for WorkflowState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
