//! In-memory checkpoint storage for development and testing.
//!
//! [`InMemoryCheckpointStore`] is the reference [`CheckpointStore`]
//! implementation: all records live in a thread-safe map, nothing survives a
//! restart. Use it in tests and single-process tools; production deployments
//! that need durability should implement the trait over a real database.

use crate::error::{CheckpointError, Result};
use crate::records::{RunFilter, RunRecord, RunStatus, StepRecord};
use crate::store::CheckpointStore;
use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Default)]
struct Inner {
    runs: HashMap<String, RunRecord>,
    // (superstep, node) -> step, per run
    steps: HashMap<String, HashMap<(usize, String), StepRecord>>,
}

/// Thread-safe, ephemeral checkpoint store.
#[derive(Clone, Default)]
pub struct InMemoryCheckpointStore {
    inner: Arc<RwLock<Inner>>,
}

impl InMemoryCheckpointStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop every record. Intended for test isolation.
    pub async fn clear(&self) {
        let mut inner = self.inner.write().await;
        inner.runs.clear();
        inner.steps.clear();
    }

    /// Number of runs currently recorded.
    pub async fn run_count(&self) -> usize {
        self.inner.read().await.runs.len()
    }
}

#[async_trait]
impl CheckpointStore for InMemoryCheckpointStore {
    async fn create_run(&self, run: RunRecord) -> Result<()> {
        let mut inner = self.inner.write().await;
        if inner.runs.contains_key(&run.run_id) {
            return Err(CheckpointError::Invalid(format!(
                "run '{}' already exists",
                run.run_id
            )));
        }
        inner.steps.insert(run.run_id.clone(), HashMap::new());
        inner.runs.insert(run.run_id.clone(), run);
        Ok(())
    }

    async fn set_run_status(&self, run_id: &str, status: RunStatus) -> Result<()> {
        let mut inner = self.inner.write().await;
        let run = inner
            .runs
            .get_mut(run_id)
            .ok_or_else(|| CheckpointError::RunNotFound(run_id.to_string()))?;
        run.status = status;
        run.updated_at = Utc::now();
        Ok(())
    }

    async fn save_step(&self, step: StepRecord) -> Result<()> {
        let mut inner = self.inner.write().await;
        let steps = inner
            .steps
            .get_mut(&step.run_id)
            .ok_or_else(|| CheckpointError::RunNotFound(step.run_id.clone()))?;
        steps.insert((step.superstep, step.node.clone()), step);
        Ok(())
    }

    async fn get_state(
        &self,
        run_id: &str,
        up_to_superstep: Option<usize>,
    ) -> Result<HashMap<String, serde_json::Value>> {
        let steps = self.get_steps(run_id, None).await?;
        let mut state = HashMap::new();
        for step in steps {
            if up_to_superstep.map_or(false, |bound| step.superstep > bound) {
                continue;
            }
            for (name, value) in step.outputs {
                state.insert(name, value);
            }
        }
        Ok(state)
    }

    async fn get_steps(&self, run_id: &str, superstep: Option<usize>) -> Result<Vec<StepRecord>> {
        let inner = self.inner.read().await;
        let steps = inner
            .steps
            .get(run_id)
            .ok_or_else(|| CheckpointError::RunNotFound(run_id.to_string()))?;
        let mut out: Vec<StepRecord> = steps
            .values()
            .filter(|s| superstep.map_or(true, |n| s.superstep == n))
            .cloned()
            .collect();
        out.sort_by(|a, b| (a.superstep, &a.node).cmp(&(b.superstep, &b.node)));
        Ok(out)
    }

    async fn list_runs(&self, filter: RunFilter) -> Result<Vec<RunRecord>> {
        let inner = self.inner.read().await;
        let mut runs: Vec<RunRecord> = inner
            .runs
            .values()
            .filter(|r| filter.status.map_or(true, |s| r.status == s))
            .filter(|r| filter.created_after.map_or(true, |t| r.created_at >= t))
            .filter(|r| filter.created_before.map_or(true, |t| r.created_at <= t))
            .cloned()
            .collect();
        runs.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        if let Some(limit) = filter.limit {
            runs.truncate(limit);
        }
        Ok(runs)
    }
}
