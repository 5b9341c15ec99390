//! Record types stored by a [`CheckpointStore`](crate::CheckpointStore).
//!
//! A *run* is one invocation of a graph runner; a *step* is the outcome of one
//! node execution within one superstep of that run. Steps are upserted keyed by
//! `(run_id, superstep, node)`, so replaying a superstep overwrites its earlier
//! records instead of duplicating them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Lifecycle status of a recorded run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    /// Run is still executing supersteps
    Running,
    /// Run reached a fixed point and produced outputs
    Completed,
    /// Run aborted because a node failed
    Failed,
    /// Run stopped at an interrupt node awaiting a response
    Paused,
}

/// Top-level record for one runner invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunRecord {
    /// Unique run identifier (uuid v4, assigned by the runner)
    pub run_id: String,
    /// Structural fingerprint of the graph that was executed
    pub graph_fingerprint: String,
    /// Parent run id when this run was a nested graph or a map item
    pub parent_run_id: Option<String>,
    /// Current status
    pub status: RunStatus,
    /// When the run was created
    pub created_at: DateTime<Utc>,
    /// When the status last changed
    pub updated_at: DateTime<Utc>,
}

/// Outcome of one node execution within one superstep.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepRecord {
    /// Run this step belongs to
    pub run_id: String,
    /// Superstep index within the run (0-based)
    pub superstep: usize,
    /// Name of the node that executed
    pub node: String,
    /// Values the node wrote, keyed by value name
    pub outputs: HashMap<String, serde_json::Value>,
    /// Whether the node completed without error
    pub ok: bool,
    /// Error message when `ok` is false
    pub error: Option<String>,
    /// When this step was recorded
    pub recorded_at: DateTime<Utc>,
}

/// Filter for [`list_runs`](crate::CheckpointStore::list_runs).
///
/// All fields are optional; an empty filter matches every run.
#[derive(Debug, Clone, Default)]
pub struct RunFilter {
    /// Only runs with this status
    pub status: Option<RunStatus>,
    /// Only runs created at or after this instant
    pub created_after: Option<DateTime<Utc>>,
    /// Only runs created at or before this instant
    pub created_before: Option<DateTime<Utc>>,
    /// Maximum number of runs to return (newest first)
    pub limit: Option<usize>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_status_serializes_snake_case() {
        let s = serde_json::to_string(&RunStatus::Paused).unwrap();
        assert_eq!(s, "\"paused\"");
    }

    #[test]
    fn step_record_round_trips() {
        let step = StepRecord {
            run_id: "r1".into(),
            superstep: 2,
            node: "double".into(),
            outputs: HashMap::from([("y".to_string(), serde_json::json!(10))]),
            ok: true,
            error: None,
            recorded_at: Utc::now(),
        };
        let json = serde_json::to_string(&step).unwrap();
        let back: StepRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(back.node, "double");
        assert_eq!(back.outputs["y"], serde_json::json!(10));
    }
}
