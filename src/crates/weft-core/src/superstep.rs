//! Superstep execution.
//!
//! A superstep is a strict barrier: every task's inputs are frozen from the
//! pre-superstep state before anything runs, tasks execute (serially or
//! concurrently, per the scheduler), and nothing a task writes is visible to
//! its siblings — the runner merges all outputs afterwards. The two
//! executors are therefore observationally interchangeable for any batch of
//! independent tasks.
//!
//! Nested graph nodes recurse into the runner here, which is why invocation
//! goes through a boxed future.

use crate::cache::NodeCache;
use crate::error::{GraphError, Result};
use crate::events::RunEvent;
use crate::graph::Graph;
use crate::node::{GraphNode, InputMap, Node, NodeOutcome, OutputMap};
use crate::runner::{map_graph, run_graph, RunConfig, SchedulerKind};
use crate::state::ExecutionState;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::debug;
use weft_checkpoint::RunStatus;

/// Outcome of one task, paired with the input versions it executed against.
pub(crate) struct TaskResult {
    pub(crate) node: String,
    pub(crate) input_versions: HashMap<String, u64>,
    pub(crate) outcome: Result<NodeOutcome>,
    pub(crate) elapsed: Duration,
}

/// Execute a prepared batch against a frozen state snapshot. Results come
/// back in batch (declaration) order under both schedulers.
pub(crate) async fn execute_batch(
    cfg: &Arc<RunConfig>,
    run_id: &str,
    graph: &Graph,
    state: &ExecutionState,
    batch: &[String],
    superstep: usize,
) -> Vec<TaskResult> {
    // freeze every task's inputs before anything executes
    let mut tasks = Vec::with_capacity(batch.len());
    for name in batch {
        let Some(node) = graph.node(name) else { continue };
        let Some((inputs, versions)) = state.snapshot_inputs(graph.bound(), node) else {
            continue;
        };
        tasks.push((name.clone(), node.clone(), inputs, versions));
    }

    match cfg.scheduler {
        SchedulerKind::Sequential => {
            let mut results = Vec::with_capacity(tasks.len());
            for (name, node, inputs, versions) in tasks {
                let started = Instant::now();
                let outcome = invoke(cfg, run_id, &node, inputs, superstep).await;
                results.push(TaskResult {
                    node: name,
                    input_versions: versions,
                    outcome,
                    elapsed: started.elapsed(),
                });
            }
            results
        }
        SchedulerKind::Concurrent => {
            let futures = tasks.into_iter().map(|(name, node, inputs, versions)| {
                let cfg = Arc::clone(cfg);
                let run_id = run_id.to_string();
                async move {
                    // the limiter bounds leaf invocations; a nested graph
                    // draws permits at its own leaves, so holding one across
                    // the recursion would starve the child run
                    let _permit = match &cfg.limiter {
                        Some(limiter) if !matches!(node, Node::Graph(_)) => {
                            limiter.acquire().await.ok()
                        }
                        _ => None,
                    };
                    let started = Instant::now();
                    let outcome = invoke(&cfg, &run_id, &node, inputs, superstep).await;
                    TaskResult {
                        node: name,
                        input_versions: versions,
                        outcome,
                        elapsed: started.elapsed(),
                    }
                }
            });
            // join_all keeps batch order regardless of completion order
            futures::future::join_all(futures).await
        }
    }
}

/// Dispatch one invocation by node kind.
async fn invoke(
    cfg: &Arc<RunConfig>,
    run_id: &str,
    node: &Node,
    inputs: InputMap,
    superstep: usize,
) -> Result<NodeOutcome> {
    let name = node.name().to_string();
    cfg.observers.emit(RunEvent::NodeStarted {
        run_id: run_id.to_string(),
        node: name.clone(),
        superstep,
    });
    match node {
        Node::Function(f) => {
            if node.cacheable() {
                if let Some(cache) = &cfg.cache {
                    let key = NodeCache::key(&node.fingerprint(), &inputs);
                    if let Some(outputs) = cache.get(&key) {
                        debug!(node = %name, "serving cached result");
                        cfg.observers.emit(RunEvent::CacheHit {
                            run_id: run_id.to_string(),
                            node: name,
                        });
                        return Ok(NodeOutcome::Outputs(outputs));
                    }
                    let outputs = f.invoke(inputs).await?;
                    cache.put(key, outputs.clone());
                    return Ok(NodeOutcome::Outputs(outputs));
                }
            }
            Ok(NodeOutcome::Outputs(f.invoke(inputs).await?))
        }
        Node::Route(r) => Ok(NodeOutcome::Decision(r.decide(inputs)?)),
        Node::IfElse(g) => Ok(NodeOutcome::Decision(g.decide(inputs)?)),
        Node::Interrupt(i) => Ok(i.invoke(cfg.responses.get(&name).cloned())),
        Node::Graph(g) => invoke_nested(cfg, run_id, g, inputs).await,
    }
}

/// Run a nested graph node: one recursive run, or one run per mapped item.
async fn invoke_nested(
    cfg: &Arc<RunConfig>,
    run_id: &str,
    node: &GraphNode,
    mut inputs: InputMap,
) -> Result<NodeOutcome> {
    let name = &node.signature.name;
    let Some(map_over) = &node.map_over else {
        let result = run_graph(
            Arc::clone(cfg),
            node.graph.clone(),
            inputs,
            Some(run_id.to_string()),
        )
        .await?;
        return match result.status {
            RunStatus::Paused => Ok(NodeOutcome::Pause),
            RunStatus::Failed => Err(GraphError::node_failed(
                name,
                result
                    .error
                    .unwrap_or_else(|| "nested run failed".to_string()),
            )),
            _ => Ok(NodeOutcome::Outputs(result.outputs)),
        };
    };

    // mapped: split list-valued parameters out of the resolved inputs
    let mut mapped = Vec::with_capacity(map_over.params.len());
    for param in &map_over.params {
        let value = inputs.remove(param).ok_or_else(|| {
            GraphError::node_failed(name, format!("map-over parameter '{param}' was not supplied"))
        })?;
        let serde_json::Value::Array(items) = value else {
            return Err(GraphError::node_failed(
                name,
                format!("map-over parameter '{param}' must be an array of per-item values"),
            ));
        };
        mapped.push((param.clone(), items));
    }

    let results = map_graph(
        Arc::clone(cfg),
        node.graph.clone(),
        mapped,
        map_over.mode,
        inputs,
        Some(run_id.to_string()),
    )
    .await?;

    // aggregate every output into an item-ordered list
    let mut outputs = OutputMap::with_capacity(node.signature.outputs.len());
    for output in &node.signature.outputs {
        let values: Vec<serde_json::Value> = results
            .iter()
            .map(|r| r.outputs.get(output).cloned().unwrap_or(serde_json::Value::Null))
            .collect();
        outputs.insert(output.clone(), serde_json::Value::Array(values));
    }
    Ok(NodeOutcome::Outputs(outputs))
}
