//! Job entity model, DTOs, and the lifecycle state machine.

use boltzq_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::FromRow;

/// Job lifecycle status, stored as lowercase text.
///
/// The only legal path is `pending -> running -> {completed | failed}`;
/// the two terminal states absorb.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum JobStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

impl JobStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    /// Completed and failed are terminal.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    /// Whether `self -> next` is a legal lifecycle transition.
    pub fn can_transition_to(self, next: JobStatus) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Running)
                | (Self::Running, Self::Completed)
                | (Self::Running, Self::Failed)
        )
    }
}

/// A row from the `jobs` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Job {
    pub id: DbId,
    pub name: String,
    pub status: JobStatus,
    /// Opaque nested document describing the prediction request; written
    /// verbatim to the tool's YAML input file.
    pub inputs: Value,
    /// Flat object of scalar prediction parameters.
    pub params: Value,
    /// Merged metrics record; set only on successful completion when
    /// artifacts were found.
    pub metrics: Option<Value>,
    /// Full captured tool output, written once at the terminal transition.
    pub logs: Option<String>,
    /// Prediction artifact directory, set only on success.
    pub results_path: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// Fields required to create a new pending job.
#[derive(Debug, Clone)]
pub struct NewJob {
    pub name: String,
    pub inputs: Value,
    pub params: Value,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
