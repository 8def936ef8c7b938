//! Reconciliation run state machine
//!
//! A run progresses through:
//! COLLECTING → RESOLVING → RECONCILING → APPLYING → COMPLETED
//!
//! and may end early in CANCELLED (before APPLYING) or FAILED.

use crate::types::RunSummary;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Run workflow state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RunState {
    /// Adapters fanned out, waiting for every call to settle
    Collecting,
    /// Collapsing the batch to one record per identity
    Resolving,
    /// Comparing observed identities with the store snapshot
    Reconciling,
    /// Writing the plan inside one transaction
    Applying,
    Completed,
    Cancelled,
    Failed,
}

impl RunState {
    pub fn as_str(self) -> &'static str {
        match self {
            RunState::Collecting => "COLLECTING",
            RunState::Resolving => "RESOLVING",
            RunState::Reconciling => "RECONCILING",
            RunState::Applying => "APPLYING",
            RunState::Completed => "COMPLETED",
            RunState::Cancelled => "CANCELLED",
            RunState::Failed => "FAILED",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        [
            RunState::Collecting,
            RunState::Resolving,
            RunState::Reconciling,
            RunState::Applying,
            RunState::Completed,
            RunState::Cancelled,
            RunState::Failed,
        ]
        .into_iter()
        .find(|state| state.as_str() == s)
    }

    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            RunState::Completed | RunState::Cancelled | RunState::Failed
        )
    }
}

/// State transition event
#[derive(Debug, Clone, Serialize)]
pub struct StateTransition {
    pub run_id: Uuid,
    pub old_state: RunState,
    pub new_state: RunState,
    pub transitioned_at: DateTime<Utc>,
}

/// One reconciliation run (in-memory state, mirrored to `sync_runs`)
#[derive(Debug, Clone, Serialize)]
pub struct SyncRun {
    pub run_id: Uuid,
    pub state: RunState,
    pub summary: RunSummary,
    /// Failure reason when the run ended in FAILED
    pub error: Option<String>,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
}

impl SyncRun {
    pub fn new() -> Self {
        Self {
            run_id: Uuid::new_v4(),
            state: RunState::Collecting,
            summary: RunSummary::default(),
            error: None,
            started_at: Utc::now(),
            ended_at: None,
        }
    }

    /// Transition to new state
    pub fn transition_to(&mut self, new_state: RunState) -> StateTransition {
        let transition = StateTransition {
            run_id: self.run_id,
            old_state: self.state,
            new_state,
            transitioned_at: Utc::now(),
        };
        self.state = new_state;

        if new_state.is_terminal() {
            self.ended_at = Some(transition.transitioned_at);
        }

        transition
    }

    /// Mark the run failed with a reason
    pub fn fail(&mut self, error: impl Into<String>) -> StateTransition {
        self.error = Some(error.into());
        self.transition_to(RunState::Failed)
    }

    pub fn is_terminal(&self) -> bool {
        self.state.is_terminal()
    }
}

impl Default for SyncRun {
    fn default() -> Self {
        Self::new()
    }
}
