//! Extensible checkpoint storage trait for custom backend implementations.
//!
//! This module defines [`CheckpointStore`] — the abstraction the weft runner
//! uses to persist run progress. The runner calls the store only at run and
//! superstep boundaries, and treats every store failure as non-fatal: no
//! scheduling decision depends on the store answering, it exists for
//! durability and post-hoc inspection.
//!
//! # Implementing a backend
//!
//! Backends need four capabilities:
//!
//! - `create_run` — register a new run record
//! - `save_step` — upsert one node outcome keyed by `(run, superstep, node)`
//! - `get_state` / `get_steps` — fold or list recorded steps, optionally
//!   bounded to a superstep
//! - `list_runs` — enumerate runs filtered by status and creation time
//!
//! ```rust,ignore
//! use weft_checkpoint::{CheckpointStore, RunRecord, StepRecord, RunFilter, RunStatus};
//! use async_trait::async_trait;
//!
//! pub struct PostgresStore { pool: sqlx::PgPool }
//!
//! #[async_trait]
//! impl CheckpointStore for PostgresStore {
//!     async fn save_step(&self, step: StepRecord) -> weft_checkpoint::Result<()> {
//!         sqlx::query(
//!             "INSERT INTO steps (run_id, superstep, node, outputs, ok)
//!              VALUES ($1, $2, $3, $4, $5)
//!              ON CONFLICT (run_id, superstep, node) DO UPDATE
//!              SET outputs = $4, ok = $5"
//!         )
//!         // ...bind and execute...
//!         # ;
//!         Ok(())
//!     }
//!     // ... other methods ...
//! }
//! ```
//!
//! All implementations must be `Send + Sync`; each run id is an independent
//! history and concurrent writers for different runs must not interfere.

use crate::error::Result;
use crate::records::{RunFilter, RunRecord, RunStatus, StepRecord};
use async_trait::async_trait;
use std::collections::HashMap;

/// Storage backend for run and step records.
#[async_trait]
pub trait CheckpointStore: Send + Sync {
    /// Register a new run. Fails if the run id already exists.
    async fn create_run(&self, run: RunRecord) -> Result<()>;

    /// Update the status of an existing run.
    async fn set_run_status(&self, run_id: &str, status: RunStatus) -> Result<()>;

    /// Upsert one step record. The `(run_id, superstep, node)` triple is the
    /// key; saving the same triple twice replaces the earlier record.
    async fn save_step(&self, step: StepRecord) -> Result<()>;

    /// Fold all recorded steps of a run into the latest value map.
    ///
    /// Steps are folded in `(superstep, node)` order, later writes to a value
    /// name shadowing earlier ones. When `up_to_superstep` is given, steps of
    /// later supersteps are excluded, reconstructing the state as of that
    /// superstep boundary.
    async fn get_state(
        &self,
        run_id: &str,
        up_to_superstep: Option<usize>,
    ) -> Result<HashMap<String, serde_json::Value>>;

    /// List step records of a run ordered by `(superstep, node)`, optionally
    /// bounded to a single superstep.
    async fn get_steps(&self, run_id: &str, superstep: Option<usize>) -> Result<Vec<StepRecord>>;

    /// List runs matching the filter, newest first.
    async fn list_runs(&self, filter: RunFilter) -> Result<Vec<RunRecord>>;
}
