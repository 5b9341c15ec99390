//! Run event sideband.
//!
//! Observers receive a stream of [`RunEvent`]s as a run progresses —
//! lifecycle, per-node execution, gate decisions, cache hits. Observer
//! failures are contained: a panicking observer is logged and skipped, never
//! allowed to abort the run.

use crate::node::RouteDecision;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use tracing::warn;
use weft_checkpoint::RunStatus;

/// Everything a run reports as it happens.
#[derive(Debug, Clone)]
pub enum RunEvent {
    /// A run began.
    RunStarted {
        /// Run identifier.
        run_id: String,
        /// Parent run when this is a nested or mapped run.
        parent_run_id: Option<String>,
        /// Graph name.
        graph: String,
        /// Structural fingerprint of the graph.
        fingerprint: String,
    },
    /// A superstep's ready batch was computed.
    SuperstepStarted {
        /// Run identifier.
        run_id: String,
        /// Superstep index, from 0.
        superstep: usize,
        /// Nodes about to execute, in declaration order.
        batch: Vec<String>,
    },
    /// A node began executing.
    NodeStarted {
        /// Run identifier.
        run_id: String,
        /// Node name.
        node: String,
        /// Superstep index.
        superstep: usize,
    },
    /// A node finished successfully.
    NodeFinished {
        /// Run identifier.
        run_id: String,
        /// Node name.
        node: String,
        /// Superstep index.
        superstep: usize,
        /// Names of the values it produced.
        outputs: Vec<String>,
    },
    /// A node failed.
    NodeFailed {
        /// Run identifier.
        run_id: String,
        /// Node name.
        node: String,
        /// Superstep index.
        superstep: usize,
        /// The failure message.
        message: String,
    },
    /// A gate decided.
    RouteDecided {
        /// Run identifier.
        run_id: String,
        /// Gate name.
        gate: String,
        /// The recorded decision.
        decision: RouteDecision,
    },
    /// A cacheable node was served from the result cache.
    CacheHit {
        /// Run identifier.
        run_id: String,
        /// Node name.
        node: String,
    },
    /// An interrupt node paused the run.
    RunPaused {
        /// Run identifier.
        run_id: String,
        /// The interrupt node awaiting a response.
        node: String,
    },
    /// The run reached a terminal status.
    RunFinished {
        /// Run identifier.
        run_id: String,
        /// Terminal status.
        status: RunStatus,
        /// Supersteps executed.
        supersteps: usize,
    },
}

/// Receives [`RunEvent`]s. Implementations must tolerate concurrent calls
/// when the concurrent scheduler is in use.
pub trait RunObserver: Send + Sync {
    /// Called once per event, in emission order per run.
    fn on_event(&self, event: &RunEvent);
}

/// Default observer: forwards events to `tracing` at debug level.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl RunObserver for TracingObserver {
    fn on_event(&self, event: &RunEvent) {
        tracing::debug!(?event, "run event");
    }
}

/// The set of observers attached to a runner; emission isolates panics.
#[derive(Clone, Default)]
pub(crate) struct ObserverSet {
    observers: Vec<Arc<dyn RunObserver>>,
}

impl ObserverSet {
    pub(crate) fn new(observers: Vec<Arc<dyn RunObserver>>) -> Self {
        Self { observers }
    }

    pub(crate) fn emit(&self, event: RunEvent) {
        for observer in &self.observers {
            let result = catch_unwind(AssertUnwindSafe(|| observer.on_event(&event)));
            if result.is_err() {
                warn!(?event, "run observer panicked; skipping it for this event");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Counting(AtomicUsize);
    impl RunObserver for Counting {
        fn on_event(&self, _event: &RunEvent) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    struct Panicking;
    impl RunObserver for Panicking {
        fn on_event(&self, _event: &RunEvent) {
            panic!("observer bug");
        }
    }

    #[test]
    fn panicking_observer_does_not_poison_the_set() {
        let counting = Arc::new(Counting(AtomicUsize::new(0)));
        let set = ObserverSet::new(vec![Arc::new(Panicking), counting.clone()]);
        set.emit(RunEvent::CacheHit {
            run_id: "r".into(),
            node: "n".into(),
        });
        // the observer after the panicking one still ran
        assert_eq!(counting.0.load(Ordering::SeqCst), 1);
    }
}
