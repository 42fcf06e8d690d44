//! Migration run entity and its status state machine

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::ParseError;

/// Identifier of a migration run.
///
/// A UUID v7, so ids are opaque but time-ordered: sorting run ids sorts
/// runs by start time, and the id doubles as the mapping-store label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RunId(Uuid);

impl RunId {
    /// Mint a fresh, time-ordered run id
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RunId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for RunId {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self).map_err(|_| ParseError {
            kind: "run id",
            value: s.to_string(),
        })
    }
}

/// Run status enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    /// Run is enumerating and fanning out work
    #[default]
    Started,

    /// All items accounted for; counts are final
    Completed,

    /// Operator asked for cancellation; workers are draining
    CancelRequested,

    /// Queues drained after a cancellation request
    Cancelled,
}

impl std::fmt::Display for RunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RunStatus::Started => write!(f, "started"),
            RunStatus::Completed => write!(f, "completed"),
            RunStatus::CancelRequested => write!(f, "cancel_requested"),
            RunStatus::Cancelled => write!(f, "cancelled"),
        }
    }
}

impl std::str::FromStr for RunStatus {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "started" => Ok(RunStatus::Started),
            "completed" => Ok(RunStatus::Completed),
            "cancel_requested" => Ok(RunStatus::CancelRequested),
            "cancelled" => Ok(RunStatus::Cancelled),
            _ => Err(ParseError {
                kind: "run status",
                value: s.to_string(),
            }),
        }
    }
}

/// One batch migration of a domain, identified by its label.
///
/// Persisted independently of the queues so operators can query progress
/// and history after the workers have fully detached. Mutated only by the
/// orchestrator and the completion monitor; immutable once terminal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MigrationRun {
    /// Run identifier, also the mapping-store label
    pub id: RunId,

    /// Domain this run migrates (alerts, locations, ...)
    pub domain: String,

    /// Opaque serialized enumeration criteria
    pub filter: serde_json::Value,

    /// Current status
    pub status: RunStatus,

    /// Legacy's estimate of how many records match the filter
    pub estimated_count: u64,

    /// Records migrated so far; authoritative only once completed
    pub migrated_count: u64,

    /// Hard per-item failures, best-effort under concurrent workers
    pub failed_count: u64,

    /// When the run started
    pub started_at: DateTime<Utc>,

    /// When the run reached a terminal status
    pub ended_at: Option<DateTime<Utc>>,
}

impl MigrationRun {
    /// Create a new run in `Started` state
    pub fn new(domain: impl Into<String>, filter: serde_json::Value, estimated_count: u64) -> Self {
        Self {
            id: RunId::new(),
            domain: domain.into(),
            filter,
            status: RunStatus::Started,
            estimated_count,
            migrated_count: 0,
            failed_count: 0,
            started_at: Utc::now(),
            ended_at: None,
        }
    }

    /// Mark the run completed with the authoritative migrated count
    pub fn complete(&mut self, migrated_count: u64) {
        self.status = RunStatus::Completed;
        self.migrated_count = migrated_count;
        self.ended_at = Some(Utc::now());
    }

    /// Request cancellation. Idempotent; returns whether the status changed.
    pub fn request_cancel(&mut self) -> bool {
        match self.status {
            RunStatus::Started => {
                self.status = RunStatus::CancelRequested;
                true
            }
            _ => false,
        }
    }

    /// Final sweep after the queues drained for a cancel-requested run
    pub fn mark_cancelled(&mut self) {
        self.status = RunStatus::Cancelled;
        self.ended_at = Some(Utc::now());
    }

    /// A run is active while it still owns queued work
    pub fn is_active(&self) -> bool {
        matches!(self.status, RunStatus::Started | RunStatus::CancelRequested)
    }

    /// Workers drop items for a run that is cancelling or cancelled
    pub fn is_cancelling(&self) -> bool {
        matches!(self.status, RunStatus::CancelRequested | RunStatus::Cancelled)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self.status, RunStatus::Completed | RunStatus::Cancelled)
    }
}
