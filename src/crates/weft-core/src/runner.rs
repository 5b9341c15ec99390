//! The run loop.
//!
//! A [`Runner`] drives a graph to a fixed point: compute the ready batch,
//! execute it behind the superstep barrier, merge every task's outputs in
//! declaration order with version bumps, repeat until no node is ready. The
//! two schedulers differ only in how a batch executes, never in what merges.
//!
//! The runner also owns the run-level policies — what to do when a node
//! fails, when caller values collide with produced names, how many
//! supersteps to tolerate before declaring a runaway loop — plus the
//! optional checkpoint store, result cache, and observer set.
//!
//! # Example
//!
//! ```rust,ignore
//! let runner = Runner::concurrent().with_max_concurrency(8);
//! let result = runner
//!     .run(&graph, RunOptions::new().input("x", json!(5)))
//!     .await?;
//! assert_eq!(result.outputs["z"], json!(30));
//! ```

use crate::cache::NodeCache;
use crate::error::{GraphError, Result};
use crate::events::{ObserverSet, RunEvent, RunObserver};
use crate::graph::Graph;
use crate::inputs::suggest;
use crate::node::{MapMode, NodeOutcome};
use crate::scheduler::prepare_ready_batch;
use crate::state::ExecutionState;
use crate::superstep::{execute_batch, TaskResult};
use chrono::Utc;
use futures::future::BoxFuture;
use futures::stream::{self, StreamExt};
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};
use uuid::Uuid;
use weft_checkpoint::{CheckpointStore, RunRecord, RunStatus, StepRecord};

/// How a superstep's batch executes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SchedulerKind {
    /// One task at a time, in declaration order. Fully deterministic.
    #[default]
    Sequential,
    /// All tasks of a batch in flight at once, optionally bounded by
    /// [`Runner::with_max_concurrency`].
    Concurrent,
}

/// What happens when a node returns an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ErrorPolicy {
    /// Finish merging the current superstep's siblings, then abort the run
    /// with the failure and the partial state.
    #[default]
    Raise,
    /// Record the failure, finish the current superstep, and stop scheduling
    /// further supersteps; the run result reports `Failed`.
    Continue,
}

/// What happens when a caller-supplied value shares a name with a produced
/// (non-seed) value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CollisionPolicy {
    /// Accept silently; the producer overwrites it on first execution.
    #[default]
    Ignore,
    /// Accept, but log a warning.
    Warn,
    /// Reject the run.
    Error,
}

/// Per-run options.
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Caller-supplied values, injected into state before superstep 0.
    pub inputs: HashMap<String, Value>,
    /// Explicit cycle entry node, when seed values alone are ambiguous.
    pub entrypoint: Option<String>,
    /// Responses for interrupt nodes, keyed by node name. Forwarded to
    /// nested runs.
    pub responses: HashMap<String, Value>,
    /// Per-run output selection; overrides the graph view's selection.
    pub selection: Option<Vec<String>>,
    /// Per-run superstep cap; overrides the runner's setting.
    pub max_supersteps: Option<usize>,
}

impl RunOptions {
    /// Empty options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Supply one input value.
    pub fn input(mut self, name: impl Into<String>, value: Value) -> Self {
        self.inputs.insert(name.into(), value);
        self
    }

    /// Supply many input values.
    pub fn inputs(mut self, values: impl IntoIterator<Item = (String, Value)>) -> Self {
        self.inputs.extend(values);
        self
    }

    /// Pick the cycle entry node explicitly.
    pub fn entrypoint(mut self, node: impl Into<String>) -> Self {
        self.entrypoint = Some(node.into());
        self
    }

    /// Answer an interrupt node, so a rerun sails past it.
    pub fn respond(mut self, node: impl Into<String>, value: Value) -> Self {
        self.responses.insert(node.into(), value);
        self
    }

    /// Restrict this run's outputs to the named values.
    pub fn select(mut self, outputs: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.selection = Some(outputs.into_iter().map(Into::into).collect());
        self
    }

    /// Cap this run's supersteps, overriding the runner's setting.
    pub fn max_supersteps(mut self, max: usize) -> Self {
        self.max_supersteps = Some(max);
        self
    }
}

/// One line of the run log.
#[derive(Debug, Clone)]
pub struct StepTrace {
    /// Superstep index.
    pub superstep: usize,
    /// Node that executed.
    pub node: String,
    /// Whether it succeeded.
    pub ok: bool,
    /// Names of the values it wrote.
    pub outputs: Vec<String>,
    /// Failure message when `ok` is false.
    pub error: Option<String>,
    /// Wall time the invocation took.
    pub elapsed: Duration,
}

/// What a run produced.
#[derive(Debug, Clone)]
pub struct RunResult {
    /// Unique run identifier.
    pub run_id: String,
    /// Terminal status.
    pub status: RunStatus,
    /// Final values, filtered by the graph view's selection when set.
    pub outputs: HashMap<String, Value>,
    /// Failure message when `status` is `Failed` under the continue policy.
    pub error: Option<String>,
    /// The interrupt node awaiting a response when `status` is `Paused`.
    pub paused_at: Option<String>,
    /// Supersteps executed.
    pub supersteps: usize,
    /// Per-node execution log, in merge order.
    pub log: Vec<StepTrace>,
}

/// Frozen per-run configuration shared across nested and mapped runs.
pub(crate) struct RunConfig {
    pub(crate) scheduler: SchedulerKind,
    pub(crate) max_supersteps: usize,
    pub(crate) max_concurrency: Option<usize>,
    pub(crate) limiter: Option<Arc<Semaphore>>,
    pub(crate) error_policy: ErrorPolicy,
    pub(crate) observers: ObserverSet,
    pub(crate) cache: Option<Arc<NodeCache>>,
    pub(crate) store: Option<Arc<dyn CheckpointStore>>,
    pub(crate) responses: HashMap<String, Value>,
}

/// Executes graphs. Cheap to construct; configuration is builder-style.
pub struct Runner {
    scheduler: SchedulerKind,
    max_supersteps: usize,
    max_concurrency: Option<usize>,
    error_policy: ErrorPolicy,
    collision_policy: CollisionPolicy,
    observers: Vec<Arc<dyn RunObserver>>,
    cache: Option<Arc<NodeCache>>,
    store: Option<Arc<dyn CheckpointStore>>,
}

impl Default for Runner {
    fn default() -> Self {
        Self {
            scheduler: SchedulerKind::default(),
            max_supersteps: 1000,
            max_concurrency: None,
            error_policy: ErrorPolicy::default(),
            collision_policy: CollisionPolicy::default(),
            observers: Vec::new(),
            cache: None,
            store: None,
        }
    }
}

impl Runner {
    /// Runner with the default (sequential) scheduler.
    pub fn new() -> Self {
        Self::default()
    }

    /// Runner with the sequential scheduler.
    pub fn sequential() -> Self {
        Self::default()
    }

    /// Runner with the concurrent scheduler.
    pub fn concurrent() -> Self {
        Self {
            scheduler: SchedulerKind::Concurrent,
            ..Self::default()
        }
    }

    /// Cap on supersteps before the run is declared a runaway loop.
    pub fn with_max_supersteps(mut self, max: usize) -> Self {
        self.max_supersteps = max;
        self
    }

    /// Bound in-flight tasks (and map items). Concurrent scheduler only.
    pub fn with_max_concurrency(mut self, max: usize) -> Self {
        self.max_concurrency = Some(max);
        self
    }

    /// Set the node failure policy.
    pub fn on_error(mut self, policy: ErrorPolicy) -> Self {
        self.error_policy = policy;
        self
    }

    /// Set the caller-value collision policy.
    pub fn on_collision(mut self, policy: CollisionPolicy) -> Self {
        self.collision_policy = policy;
        self
    }

    /// Attach an observer; events fan out to every attached observer.
    pub fn observer(mut self, observer: Arc<dyn RunObserver>) -> Self {
        self.observers.push(observer);
        self
    }

    /// Attach a shared node result cache.
    pub fn with_cache(mut self, cache: Arc<NodeCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Attach a checkpoint store; run and step records are written as the
    /// run progresses. Store failures are logged and never abort a run.
    pub fn with_store(mut self, store: Arc<dyn CheckpointStore>) -> Self {
        self.store = Some(store);
        self
    }

    fn config(
        &self,
        responses: HashMap<String, Value>,
        max_supersteps: Option<usize>,
    ) -> Result<Arc<RunConfig>> {
        if self.scheduler == SchedulerKind::Sequential && self.max_concurrency.is_some() {
            return Err(GraphError::IncompatibleRunner(
                "a concurrency limit requires the concurrent scheduler".to_string(),
            ));
        }
        Ok(Arc::new(RunConfig {
            scheduler: self.scheduler,
            max_supersteps: max_supersteps.unwrap_or(self.max_supersteps),
            max_concurrency: self.max_concurrency,
            limiter: self.max_concurrency.map(|n| Arc::new(Semaphore::new(n))),
            error_policy: self.error_policy,
            observers: ObserverSet::new(self.observers.clone()),
            cache: self.cache.clone(),
            store: self.store.clone(),
            responses,
        }))
    }

    /// Run `graph` to a fixed point.
    pub async fn run(&self, graph: &Graph, options: RunOptions) -> Result<RunResult> {
        let view = match &options.selection {
            Some(outputs) => graph.select(outputs.clone())?,
            None => graph.clone(),
        };
        let cfg = self.config(options.responses, options.max_supersteps)?;
        validate_run_inputs(
            &view,
            &options.inputs,
            options.entrypoint.as_deref(),
            self.collision_policy,
        )?;
        run_graph(cfg, view, options.inputs, None).await
    }

    /// Run `graph` once per mapped item, returning per-item results in item
    /// order.
    ///
    /// `mapped` pairs each broadcast parameter with its list of per-item
    /// values; parameter order fixes the cartesian nesting under
    /// [`MapMode::Product`] (first parameter outermost). `shared` values go
    /// to every item unchanged.
    pub async fn map(
        &self,
        graph: &Graph,
        mapped: Vec<(String, Vec<Value>)>,
        mode: MapMode,
        shared: HashMap<String, Value>,
    ) -> Result<Vec<RunResult>> {
        if graph.contains_interrupt() {
            return Err(GraphError::IncompatibleRunner(
                "mapped runs cannot contain interrupt nodes; run items individually instead"
                    .to_string(),
            ));
        }
        let cfg = self.config(HashMap::new(), None)?;
        map_graph(cfg, graph.clone(), mapped, mode, shared, None).await
    }
}

/// Reject malformed caller values before any state exists.
fn validate_run_inputs(
    graph: &Graph,
    inputs: &HashMap<String, Value>,
    entrypoint: Option<&str>,
    collision_policy: CollisionPolicy,
) -> Result<()> {
    // known names: everything consumed or produced anywhere in the graph
    let mut known: HashSet<&str> = HashSet::new();
    for node in graph.nodes() {
        known.extend(node.inputs().iter().map(String::as_str));
        known.extend(node.outputs().iter().map(String::as_str));
    }
    let structural_seeds: HashSet<&str> = graph
        .analysis()
        .spec
        .seeds
        .iter()
        .map(String::as_str)
        .collect();

    for name in inputs.keys() {
        if !known.contains(name.as_str()) {
            let suggestion = suggest(name, known.iter().copied());
            let hint = suggestion
                .map(|s| format!(" (did you mean '{s}'?)"))
                .unwrap_or_default();
            return Err(GraphError::config(format!(
                "unknown input '{name}'{hint}: no node in graph '{}' consumes or produces it",
                graph.name()
            )));
        }
        if !graph.producers_of(name).is_empty() && !structural_seeds.contains(name.as_str()) {
            match collision_policy {
                CollisionPolicy::Ignore => {}
                CollisionPolicy::Warn => warn!(
                    value = %name,
                    "caller-supplied value collides with a produced name and will be overwritten"
                ),
                CollisionPolicy::Error => {
                    return Err(GraphError::config(format!(
                        "input '{name}' collides with a value produced by '{}'",
                        graph.producers_of(name).join(", ")
                    )))
                }
            }
        }
    }

    let spec = graph.input_spec();
    for required in &spec.required {
        if !inputs.contains_key(required) {
            let suggestion = suggest(required, inputs.keys().map(String::as_str));
            return Err(GraphError::missing_input(required.as_str(), suggestion));
        }
    }

    validate_cycle_entries(graph, inputs, entrypoint)
}

/// Per run, every cycle must have exactly one satisfiable way in.
fn validate_cycle_entries(
    graph: &Graph,
    inputs: &HashMap<String, Value>,
    entrypoint: Option<&str>,
) -> Result<()> {
    let mut entrypoint_seen = false;
    for cycle in &graph.analysis().cycles {
        let mut candidates: Vec<_> = cycle.entries.iter().collect();
        if let Some(entry) = entrypoint {
            // gates carry no outputs, so every cycle member is a candidate
            if cycle.nodes.iter().any(|n| n == entry) {
                candidates.retain(|c| c.node == entry);
                entrypoint_seen = true;
            }
        }

        let satisfied: Vec<_> = candidates
            .iter()
            .filter(|c| {
                c.seed_params.iter().all(|p| {
                    inputs.contains_key(p)
                        || graph.bound().contains_key(p)
                        || graph
                            .node(&c.node)
                            .map_or(false, |n| n.has_default(p))
                })
            })
            .collect();

        if satisfied.is_empty() {
            // a lone candidate gets the precise missing-seed diagnostic;
            // several get the full menu
            if let [only] = candidates.as_slice() {
                let missing = only
                    .seed_params
                    .iter()
                    .find(|p| !inputs.contains_key(*p) && !graph.bound().contains_key(*p));
                if let Some(name) = missing {
                    let suggestion = suggest(name, inputs.keys().map(String::as_str));
                    return Err(GraphError::missing_input(name.clone(), suggestion));
                }
            }
            let alternatives: Vec<String> = candidates
                .iter()
                .map(|c| format!("{} (needs {})", c.node, c.seed_params.join(", ")))
                .collect();
            return Err(GraphError::config(format!(
                "cycle {} has no satisfiable entry point; seed one of: {}",
                cycle.nodes.join("/"),
                alternatives.join("; ")
            )));
        }

        // candidates with identical seed sets are interchangeable, not
        // ambiguous
        let distinct: HashSet<&[String]> = satisfied
            .iter()
            .map(|c| c.seed_params.as_slice())
            .collect();
        if distinct.len() > 1 {
            return Err(GraphError::AmbiguousEntry {
                alternatives: satisfied.iter().map(|c| c.node.clone()).collect(),
            });
        }
    }

    if let Some(entry) = entrypoint {
        if !entrypoint_seen {
            return Err(GraphError::config(format!(
                "entrypoint '{entry}' is not an entry candidate of any cycle in graph '{}'",
                graph.name()
            )));
        }
    }
    Ok(())
}

/// Mutable bookkeeping of one run in flight.
struct RunProgress {
    status: RunStatus,
    error: Option<String>,
    paused_at: Option<String>,
    log: Vec<StepTrace>,
    /// Pending raise-policy failure; aborts the run once siblings merged.
    failed: Option<(String, String)>,
}

/// Drive one graph to its fixed point. Boxed because nested graph nodes
/// recurse back into this from the superstep executor.
pub(crate) fn run_graph(
    cfg: Arc<RunConfig>,
    graph: Graph,
    inputs: HashMap<String, Value>,
    parent_run_id: Option<String>,
) -> BoxFuture<'static, Result<RunResult>> {
    Box::pin(async move {
        let run_id = Uuid::new_v4().to_string();
        info!(run_id = %run_id, graph = %graph.name(), "starting run");
        if let Some(store) = &cfg.store {
            let now = Utc::now();
            let record = RunRecord {
                run_id: run_id.clone(),
                graph_fingerprint: graph.fingerprint().to_string(),
                parent_run_id: parent_run_id.clone(),
                status: RunStatus::Running,
                created_at: now,
                updated_at: now,
            };
            if let Err(error) = store.create_run(record).await {
                warn!(%error, run_id = %run_id, "checkpoint store rejected run record");
            }
        }
        cfg.observers.emit(RunEvent::RunStarted {
            run_id: run_id.clone(),
            parent_run_id,
            graph: graph.name().to_string(),
            fingerprint: graph.fingerprint().to_string(),
        });

        let mut state = ExecutionState::seed(inputs);
        let mut progress = RunProgress {
            status: RunStatus::Completed,
            error: None,
            paused_at: None,
            log: Vec::new(),
            failed: None,
        };
        let mut supersteps = 0;

        loop {
            let batch = prepare_ready_batch(&graph, &mut state);
            if batch.is_empty() {
                break;
            }
            if supersteps == cfg.max_supersteps {
                if let Some(store) = &cfg.store {
                    if let Err(error) = store.set_run_status(&run_id, RunStatus::Failed).await {
                        warn!(%error, run_id = %run_id, "failed to update run status");
                    }
                }
                cfg.observers.emit(RunEvent::RunFinished {
                    run_id: run_id.clone(),
                    status: RunStatus::Failed,
                    supersteps,
                });
                return Err(GraphError::InfiniteLoop {
                    max_supersteps: cfg.max_supersteps,
                    still_ready: batch,
                });
            }
            let superstep = supersteps;
            debug!(run_id = %run_id, superstep, batch = ?batch, "superstep ready");
            cfg.observers.emit(RunEvent::SuperstepStarted {
                run_id: run_id.clone(),
                superstep,
                batch: batch.clone(),
            });

            let results = execute_batch(&cfg, &run_id, &graph, &state, &batch, superstep).await;
            merge_results(&cfg, &run_id, &graph, &mut state, results, superstep, &mut progress)
                .await;
            supersteps += 1;

            if let Some((node, message)) = progress.failed.take() {
                if let Some(store) = &cfg.store {
                    if let Err(error) = store.set_run_status(&run_id, RunStatus::Failed).await {
                        warn!(%error, run_id = %run_id, "failed to update run status");
                    }
                }
                cfg.observers.emit(RunEvent::RunFinished {
                    run_id: run_id.clone(),
                    status: RunStatus::Failed,
                    supersteps,
                });
                return Err(GraphError::NodeFailed {
                    node,
                    message,
                    partial: state.values().clone(),
                });
            }
            if progress.status != RunStatus::Completed {
                break;
            }
        }

        let outputs = collect_outputs(&graph, &state);
        if let Some(store) = &cfg.store {
            if let Err(error) = store.set_run_status(&run_id, progress.status).await {
                warn!(%error, run_id = %run_id, "failed to update run status");
            }
        }
        cfg.observers.emit(RunEvent::RunFinished {
            run_id: run_id.clone(),
            status: progress.status,
            supersteps,
        });
        info!(run_id = %run_id, status = ?progress.status, supersteps, "run finished");

        Ok(RunResult {
            run_id,
            status: progress.status,
            outputs,
            error: progress.error,
            paused_at: progress.paused_at,
            supersteps,
            log: progress.log,
        })
    })
}

/// Merge a superstep's results into state, in batch (declaration) order.
/// Every write bumps a version; decisions and execution records land here
/// and nowhere else.
async fn merge_results(
    cfg: &Arc<RunConfig>,
    run_id: &str,
    graph: &Graph,
    state: &mut ExecutionState,
    results: Vec<TaskResult>,
    superstep: usize,
    progress: &mut RunProgress,
) {
    for result in results {
        let TaskResult {
            node: name,
            input_versions,
            outcome,
            elapsed,
        } = result;
        match outcome {
            Ok(NodeOutcome::Outputs(mut raw)) => {
                let mut produced = HashMap::new();
                if let Some(node) = graph.node(&name) {
                    // declared output order keeps version assignment stable
                    for output in node.outputs() {
                        if let Some(value) = raw.remove(output) {
                            state.set(output.clone(), value.clone());
                            produced.insert(output.clone(), value);
                        }
                    }
                }
                state.record_execution(&name, input_versions, superstep);
                cfg.observers.emit(RunEvent::NodeFinished {
                    run_id: run_id.to_string(),
                    node: name.clone(),
                    superstep,
                    outputs: produced.keys().cloned().collect(),
                });
                save_step(cfg, run_id, superstep, &name, produced.clone(), true, None).await;
                progress.log.push(StepTrace {
                    superstep,
                    node: name,
                    ok: true,
                    outputs: produced.into_keys().collect(),
                    error: None,
                    elapsed,
                });
            }
            Ok(NodeOutcome::Decision(decision)) => {
                state.record_execution(&name, input_versions, superstep);
                state.record_decision(&name, decision.clone());
                cfg.observers.emit(RunEvent::RouteDecided {
                    run_id: run_id.to_string(),
                    gate: name.clone(),
                    decision,
                });
                save_step(cfg, run_id, superstep, &name, HashMap::new(), true, None).await;
                progress.log.push(StepTrace {
                    superstep,
                    node: name,
                    ok: true,
                    outputs: Vec::new(),
                    error: None,
                    elapsed,
                });
            }
            Ok(NodeOutcome::Pause) => {
                // no execution record: a rerun with a response re-reaches it
                cfg.observers.emit(RunEvent::RunPaused {
                    run_id: run_id.to_string(),
                    node: name.clone(),
                });
                save_step(cfg, run_id, superstep, &name, HashMap::new(), true, None).await;
                progress.status = RunStatus::Paused;
                progress.paused_at = Some(name.clone());
                progress.log.push(StepTrace {
                    superstep,
                    node: name,
                    ok: true,
                    outputs: Vec::new(),
                    error: None,
                    elapsed,
                });
            }
            Err(error) => {
                let message = error.to_string();
                cfg.observers.emit(RunEvent::NodeFailed {
                    run_id: run_id.to_string(),
                    node: name.clone(),
                    superstep,
                    message: message.clone(),
                });
                save_step(
                    cfg,
                    run_id,
                    superstep,
                    &name,
                    HashMap::new(),
                    false,
                    Some(message.clone()),
                )
                .await;
                progress.log.push(StepTrace {
                    superstep,
                    node: name.clone(),
                    ok: false,
                    outputs: Vec::new(),
                    error: Some(message.clone()),
                    elapsed,
                });
                match cfg.error_policy {
                    ErrorPolicy::Raise => {
                        if progress.failed.is_none() {
                            progress.failed = Some((name, message));
                        }
                    }
                    ErrorPolicy::Continue => {
                        progress.status = RunStatus::Failed;
                        if progress.error.is_none() {
                            progress.error = Some(format!("node '{name}' failed: {message}"));
                        }
                    }
                }
            }
        }
    }
}

async fn save_step(
    cfg: &Arc<RunConfig>,
    run_id: &str,
    superstep: usize,
    node: &str,
    outputs: HashMap<String, Value>,
    ok: bool,
    error: Option<String>,
) {
    let Some(store) = &cfg.store else { return };
    let record = StepRecord {
        run_id: run_id.to_string(),
        superstep,
        node: node.to_string(),
        outputs,
        ok,
        error,
        recorded_at: Utc::now(),
    };
    if let Err(error) = store.save_step(record).await {
        warn!(%error, run_id, node, "failed to record step");
    }
}

/// Final values of a run, honoring the view's output selection.
fn collect_outputs(graph: &Graph, state: &ExecutionState) -> HashMap<String, Value> {
    graph
        .output_names()
        .into_iter()
        .filter_map(|name| state.get(&name).map(|v| (name, v.clone())))
        .collect()
}

/// Run a graph once per mapped item. Items run as independent child runs
/// against fully isolated state; results come back in item order even though
/// completion order is free.
pub(crate) fn map_graph(
    cfg: Arc<RunConfig>,
    graph: Graph,
    mapped: Vec<(String, Vec<Value>)>,
    mode: MapMode,
    shared: HashMap<String, Value>,
    parent_run_id: Option<String>,
) -> BoxFuture<'static, Result<Vec<RunResult>>> {
    Box::pin(async move {
        if mapped.is_empty() {
            return Err(GraphError::config(
                "map requires at least one mapped parameter",
            ));
        }
        let combos = build_combinations(&mapped, mode, &shared)?;
        let map_id = parent_run_id.unwrap_or_else(|| Uuid::new_v4().to_string());
        debug!(map_id = %map_id, items = combos.len(), "starting mapped runs");

        let width = match cfg.scheduler {
            SchedulerKind::Sequential => 1,
            SchedulerKind::Concurrent => cfg.max_concurrency.unwrap_or_else(|| combos.len().max(1)),
        };

        let mut slots: Vec<Option<RunResult>> = Vec::new();
        slots.resize_with(combos.len(), || None);
        let mut items = stream::iter(combos.into_iter().enumerate().map(|(index, inputs)| {
            let cfg = Arc::clone(&cfg);
            let graph = graph.clone();
            let parent = Some(map_id.clone());
            async move { (index, run_graph(cfg, graph, inputs, parent).await) }
        }))
        .buffer_unordered(width);

        while let Some((index, result)) = items.next().await {
            slots[index] = Some(result?);
        }
        Ok(slots.into_iter().flatten().collect())
    })
}

/// Expand mapped parameter lists into per-item input maps.
///
/// Zip pairs same-index elements and insists on one shared length. Product
/// nests in declared parameter order, first parameter outermost: `a=[1,2]`,
/// `b=[10,20]` yields `a1b10, a1b20, a2b10, a2b20`.
fn build_combinations(
    mapped: &[(String, Vec<Value>)],
    mode: MapMode,
    shared: &HashMap<String, Value>,
) -> Result<Vec<HashMap<String, Value>>> {
    match mode {
        MapMode::Zip => {
            let len = mapped[0].1.len();
            for (param, items) in mapped {
                if items.len() != len {
                    return Err(GraphError::config(format!(
                        "zip map length mismatch: '{}' has {} items but '{param}' has {}",
                        mapped[0].0,
                        len,
                        items.len()
                    )));
                }
            }
            Ok((0..len)
                .map(|i| {
                    let mut inputs = shared.clone();
                    for (param, items) in mapped {
                        inputs.insert(param.clone(), items[i].clone());
                    }
                    inputs
                })
                .collect())
        }
        MapMode::Product => {
            let mut combos = vec![shared.clone()];
            for (param, items) in mapped {
                let mut next = Vec::with_capacity(combos.len() * items.len());
                for combo in &combos {
                    for item in items {
                        let mut inputs = combo.clone();
                        inputs.insert(param.clone(), item.clone());
                        next.push(inputs);
                    }
                }
                combos = next;
            }
            Ok(combos)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn zip_combinations_pair_by_index() {
        let mapped = vec![
            ("a".to_string(), vec![json!(1), json!(2)]),
            ("b".to_string(), vec![json!(10), json!(20)]),
        ];
        let combos = build_combinations(&mapped, MapMode::Zip, &HashMap::new()).unwrap();
        assert_eq!(combos.len(), 2);
        assert_eq!(combos[0]["a"], json!(1));
        assert_eq!(combos[0]["b"], json!(10));
        assert_eq!(combos[1]["a"], json!(2));
        assert_eq!(combos[1]["b"], json!(20));
    }

    #[test]
    fn zip_length_mismatch_is_an_error() {
        let mapped = vec![
            ("a".to_string(), vec![json!(1), json!(2)]),
            ("b".to_string(), vec![json!(10)]),
        ];
        let err = build_combinations(&mapped, MapMode::Zip, &HashMap::new()).unwrap_err();
        assert!(err.to_string().contains("length mismatch"));
    }

    #[test]
    fn product_is_first_parameter_outermost() {
        let mapped = vec![
            ("a".to_string(), vec![json!(1), json!(2), json!(3)]),
            ("b".to_string(), vec![json!(10), json!(20)]),
        ];
        let combos = build_combinations(&mapped, MapMode::Product, &HashMap::new()).unwrap();
        let pairs: Vec<(i64, i64)> = combos
            .iter()
            .map(|c| (c["a"].as_i64().unwrap(), c["b"].as_i64().unwrap()))
            .collect();
        assert_eq!(
            pairs,
            [(1, 10), (1, 20), (2, 10), (2, 20), (3, 10), (3, 20)]
        );
    }

    #[test]
    fn shared_values_reach_every_combination() {
        let mapped = vec![("a".to_string(), vec![json!(1), json!(2)])];
        let shared = HashMap::from([("k".to_string(), json!("shared"))]);
        let combos = build_combinations(&mapped, MapMode::Zip, &shared).unwrap();
        assert!(combos.iter().all(|c| c["k"] == json!("shared")));
    }
}
