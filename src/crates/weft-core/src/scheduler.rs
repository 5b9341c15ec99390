//! Ready-batch computation.
//!
//! Before each superstep the scheduler walks the nodes in declaration order
//! and picks every node that is simultaneously:
//!
//! 1. **activated** — no gate controls it, or some controlling gate's
//!    current decision names it;
//! 2. **fed** — every input resolves from state, bound values, or defaults;
//! 3. **due** — it has never run, or some input's version moved since its
//!    last execution.
//!
//! Staleness skips a parameter when the node is its own sole producer: a
//! self-loop `f(x) -> x` would otherwise re-trigger itself forever. That
//! exemption is suspended for gate-controlled nodes, whose re-execution is
//! the gate's call.
//!
//! Gates that have themselves gone stale get their recorded decision cleared
//! first, so a superseded verdict cannot activate targets one superstep too
//! long.

use crate::graph::Graph;
use crate::node::Node;
use crate::state::ExecutionState;
use tracing::trace;

/// Compute the nodes to execute this superstep, in declaration order. An
/// empty batch means the run has reached its fixed point.
pub(crate) fn prepare_ready_batch(graph: &Graph, state: &mut ExecutionState) -> Vec<String> {
    // 1. stale gates lose their recorded decision before activation is read
    for name in graph.order() {
        let node = match graph.node(name) {
            Some(n) if n.is_gate() => n,
            _ => continue,
        };
        if state.decision(name).is_some() && is_stale(graph, state, node) {
            trace!(gate = %name, "clearing superseded gate decision");
            state.clear_decision(name);
        }
    }

    // 2. declaration-order scan
    let mut batch = Vec::new();
    for name in graph.order() {
        let Some(node) = graph.node(name) else { continue };
        if !is_activated(graph, state, name)
            || state.snapshot_inputs(graph.bound(), node).is_none()
        {
            continue;
        }
        if !state.has_run(name) || is_stale(graph, state, node) {
            batch.push(name.clone());
        }
    }
    batch
}

/// Whether `name` is allowed to run: ungated, or named by a controlling
/// gate's current decision.
fn is_activated(graph: &Graph, state: &ExecutionState, name: &str) -> bool {
    let gates = graph.controlling_gates(name);
    if gates.is_empty() {
        return true;
    }
    gates
        .iter()
        .any(|gate| state.decision(gate).map_or(false, |d| d.activates(name)))
}

/// Whether any of `node`'s inputs moved since its last recorded execution.
fn is_stale(graph: &Graph, state: &ExecutionState, node: &Node) -> bool {
    let Some(record) = state.record(node.name()) else {
        return false;
    };
    let gated = !graph.controlling_gates(node.name()).is_empty();
    node.inputs().iter().any(|input| {
        if !gated && self_fed(graph, node, input) {
            return false;
        }
        let recorded = record.input_versions.get(input).copied().unwrap_or(0);
        state.version(input) != recorded
    })
}

/// Sole Producer Rule: the node both produces and consumes `input`, and no
/// other node produces it.
fn self_fed(graph: &Graph, node: &Node, input: &str) -> bool {
    node.outputs().iter().any(|o| o == input) && graph.is_sole_producer(node.name(), input)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::Graph;
    use crate::node::{FunctionNode, IfElseNode, Node, RouteDecision, END};
    use serde_json::json;
    use std::collections::HashMap;

    fn func(name: &str, inputs: &[&str], outputs: &[&str]) -> Node {
        let mut b = FunctionNode::builder(name);
        for i in inputs {
            b = b.input(*i);
        }
        for o in outputs {
            b = b.output(*o);
        }
        b.sync(|_| Ok(json!(0))).build().unwrap()
    }

    fn mark_ran(state: &mut ExecutionState, graph: &Graph, name: &str, superstep: usize) {
        let node = graph.node(name).unwrap();
        let (_, versions) = state.snapshot_inputs(graph.bound(), node).unwrap();
        state.record_execution(name, versions, superstep);
    }

    #[test]
    fn pipeline_frontier_advances_with_availability() {
        let graph = Graph::builder("pipeline")
            .node(func("double", &["x"], &["y"]))
            .node(func("triple", &["y"], &["z"]))
            .build()
            .unwrap();
        let mut state = ExecutionState::seed([("x".to_string(), json!(5))]);

        assert_eq!(prepare_ready_batch(&graph, &mut state), ["double"]);

        mark_ran(&mut state, &graph, "double", 0);
        state.set("y", json!(10));
        assert_eq!(prepare_ready_batch(&graph, &mut state), ["triple"]);

        mark_ran(&mut state, &graph, "triple", 1);
        state.set("z", json!(30));
        assert!(prepare_ready_batch(&graph, &mut state).is_empty());
    }

    #[test]
    fn gated_node_waits_for_an_activating_decision() {
        let graph = Graph::builder("gated")
            .node(IfElseNode::new("check", ["count"], "step", END, |i| {
                Ok(i["count"].as_i64().unwrap_or(0) < 3)
            }))
            .node(func("step", &["count"], &["count"]))
            .build()
            .unwrap();
        let mut state = ExecutionState::seed([("count".to_string(), json!(0))]);

        // only the gate is ready; step awaits a decision
        assert_eq!(prepare_ready_batch(&graph, &mut state), ["check"]);

        mark_ran(&mut state, &graph, "check", 0);
        state.record_decision("check", RouteDecision::Target("step".into()));
        assert_eq!(prepare_ready_batch(&graph, &mut state), ["step"]);

        // END decision activates nothing
        state.record_decision("check", RouteDecision::End);
        assert!(prepare_ready_batch(&graph, &mut state).is_empty());
    }

    #[test]
    fn ungated_self_loop_runs_exactly_once() {
        let graph = Graph::builder("loop")
            .node(func("step", &["state"], &["state"]))
            .build()
            .unwrap();
        let mut state = ExecutionState::seed([("state".to_string(), json!(0))]);

        assert_eq!(prepare_ready_batch(&graph, &mut state), ["step"]);
        mark_ran(&mut state, &graph, "step", 0);
        state.set("state", json!(1));

        // its own write does not re-trigger it
        assert!(prepare_ready_batch(&graph, &mut state).is_empty());
    }

    #[test]
    fn gated_self_loop_keeps_retriggering() {
        let graph = Graph::builder("counter")
            .node(IfElseNode::new("check", ["count"], "step", END, |i| {
                Ok(i["count"].as_i64().unwrap_or(0) < 3)
            }))
            .node(func("step", &["count"], &["count"]))
            .build()
            .unwrap();
        let mut state = ExecutionState::seed([("count".to_string(), json!(0))]);

        mark_ran(&mut state, &graph, "check", 0);
        state.record_decision("check", RouteDecision::Target("step".into()));
        mark_ran(&mut state, &graph, "step", 1);
        state.set("count", json!(1));

        // gate's decision is now stale (count moved) and gets cleared, so
        // only the gate itself re-runs
        let batch = prepare_ready_batch(&graph, &mut state);
        assert_eq!(batch, ["check"]);
        assert!(state.decision("check").is_none());

        // fresh decision re-activates the (stale, gate-controlled) step
        state.record_decision("check", RouteDecision::Target("step".into()));
        mark_ran(&mut state, &graph, "check", 2);
        assert_eq!(prepare_ready_batch(&graph, &mut state), ["step"]);
    }

    #[test]
    fn bound_values_feed_readiness() {
        let graph = Graph::builder("pipeline")
            .node(func("double", &["x"], &["y"]))
            .build()
            .unwrap()
            .bind("x", json!(5))
            .unwrap();
        let mut state = ExecutionState::new();
        assert_eq!(prepare_ready_batch(&graph, &mut state), ["double"]);

        // bound values are constant; once run, nothing re-triggers
        let (_, versions) = state
            .snapshot_inputs(graph.bound(), graph.node("double").unwrap())
            .unwrap();
        assert_eq!(versions, HashMap::from([("x".to_string(), 0)]));
        state.record_execution("double", versions, 0);
        assert!(prepare_ready_batch(&graph, &mut state).is_empty());
    }
}
