//! Cyclic graphs: gated loops, self-loops, seed values, entry
//! disambiguation, and runaway-loop detection.

use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use weft_core::{
    FunctionNode, Graph, GraphError, IfElseNode, RunEvent, RunObserver, RunOptions, RunStatus,
    Runner, END,
};

/// check(count) routes to increment while count < limit; increment bumps
/// count and re-feeds the gate.
fn counter_graph(limit: i64, increments: Arc<AtomicUsize>) -> Graph {
    Graph::builder("counter")
        .node(IfElseNode::new("check", ["count"], "increment", END, move |i| {
            Ok(i["count"].as_i64().unwrap_or(0) < limit)
        }))
        .node(
            FunctionNode::builder("increment")
                .input("count")
                .output("count")
                .sync(move |i| {
                    increments.fetch_add(1, Ordering::SeqCst);
                    Ok(json!(i["count"].as_i64().unwrap_or(0) + 1))
                })
                .build()
                .unwrap(),
        )
        .build()
        .unwrap()
}

#[tokio::test]
async fn gated_loop_counts_to_the_limit() {
    let increments = Arc::new(AtomicUsize::new(0));
    let graph = counter_graph(3, increments.clone());
    let result = Runner::new()
        .run(&graph, RunOptions::new().input("count", json!(0)))
        .await
        .unwrap();
    assert_eq!(result.status, RunStatus::Completed);
    assert_eq!(result.outputs["count"], json!(3));
    // gate-controlled loop body re-executes once per activation, no more
    assert_eq!(increments.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn gated_loop_with_satisfied_limit_never_enters() {
    let increments = Arc::new(AtomicUsize::new(0));
    let graph = counter_graph(3, increments.clone());
    let result = Runner::new()
        .run(&graph, RunOptions::new().input("count", json!(7)))
        .await
        .unwrap();
    assert_eq!(result.outputs["count"], json!(7));
    assert_eq!(increments.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn ungated_self_loop_executes_exactly_once() {
    let calls = Arc::new(AtomicUsize::new(0));
    let seen = calls.clone();
    let graph = Graph::builder("accumulate")
        .node(
            FunctionNode::builder("fold")
                .input("state")
                .output("state")
                .sync(move |i| {
                    seen.fetch_add(1, Ordering::SeqCst);
                    Ok(json!(i["state"].as_i64().unwrap_or(0) + 100))
                })
                .build()
                .unwrap(),
        )
        .build()
        .unwrap();
    let result = Runner::new()
        .run(&graph, RunOptions::new().input("state", json!(1)))
        .await
        .unwrap();
    // its own write does not make it stale
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(result.outputs["state"], json!(101));
}

#[tokio::test]
async fn cycle_without_a_seed_is_rejected() {
    let graph = counter_graph(3, Arc::new(AtomicUsize::new(0)));
    let err = Runner::new().run(&graph, RunOptions::new()).await.unwrap_err();
    assert!(matches!(err, GraphError::MissingInput { .. }), "got {err:?}");
}

fn ping_pong() -> Graph {
    Graph::builder("ping_pong")
        .node(
            FunctionNode::builder("ping")
                .input("pong_value")
                .output("ping_value")
                .sync(|i| Ok(json!(i["pong_value"].as_i64().unwrap_or(0) + 1)))
                .build()
                .unwrap(),
        )
        .node(
            FunctionNode::builder("pong")
                .input("ping_value")
                .output("pong_value")
                .sync(|i| Ok(json!(i["ping_value"].as_i64().unwrap_or(0) + 1)))
                .build()
                .unwrap(),
        )
        .build()
        .unwrap()
}

#[tokio::test]
async fn unseeded_cycle_enumerates_its_entry_points() {
    let err = Runner::new()
        .run(&ping_pong(), RunOptions::new())
        .await
        .unwrap_err();
    let message = err.to_string();
    assert!(message.contains("ping (needs pong_value)"), "got {message}");
    assert!(message.contains("pong (needs ping_value)"), "got {message}");
}

#[tokio::test]
async fn seeds_satisfying_multiple_entries_are_ambiguous() {
    let err = Runner::new()
        .run(
            &ping_pong(),
            RunOptions::new()
                .input("ping_value", json!(0))
                .input("pong_value", json!(0)),
        )
        .await
        .unwrap_err();
    match err {
        GraphError::AmbiguousEntry { alternatives } => {
            assert_eq!(alternatives, ["ping", "pong"]);
        }
        other => panic!("expected AmbiguousEntry, got {other:?}"),
    }
}

#[tokio::test]
async fn explicit_entrypoint_resolves_the_ambiguity() {
    // with both seeds and an entrypoint the run is admitted; the ungated
    // two-node cycle then has no terminating gate, which is the loop guard's
    // job to catch
    let err = Runner::new()
        .with_max_supersteps(10)
        .run(
            &ping_pong(),
            RunOptions::new()
                .input("ping_value", json!(0))
                .input("pong_value", json!(0))
                .entrypoint("ping"),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, GraphError::InfiniteLoop { .. }), "got {err:?}");
}

#[tokio::test]
async fn runaway_loop_reports_still_ready_nodes() {
    let err = Runner::new()
        .with_max_supersteps(10)
        .run(
            &ping_pong(),
            RunOptions::new().input("pong_value", json!(0)),
        )
        .await
        .unwrap_err();
    match err {
        GraphError::InfiniteLoop {
            max_supersteps,
            still_ready,
        } => {
            assert_eq!(max_supersteps, 10);
            assert!(!still_ready.is_empty());
        }
        other => panic!("expected InfiniteLoop, got {other:?}"),
    }
}

struct TerminalStatus(Mutex<Option<RunStatus>>);

impl RunObserver for TerminalStatus {
    fn on_event(&self, event: &RunEvent) {
        if let RunEvent::RunFinished { status, .. } = event {
            if let Ok(mut last) = self.0.lock() {
                *last = Some(*status);
            }
        }
    }
}

#[tokio::test]
async fn runaway_loop_still_notifies_observers() {
    let terminal = Arc::new(TerminalStatus(Mutex::new(None)));
    let err = Runner::new()
        .with_max_supersteps(5)
        .observer(terminal.clone())
        .run(
            &ping_pong(),
            RunOptions::new().input("pong_value", json!(0)),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, GraphError::InfiniteLoop { .. }), "got {err:?}");
    assert_eq!(*terminal.0.lock().unwrap(), Some(RunStatus::Failed));
}

#[tokio::test]
async fn per_run_superstep_cap_overrides_runner_setting() {
    let err = Runner::new()
        .with_max_supersteps(1000)
        .run(
            &ping_pong(),
            RunOptions::new()
                .input("pong_value", json!(0))
                .max_supersteps(4),
        )
        .await
        .unwrap_err();
    match err {
        GraphError::InfiniteLoop { max_supersteps, .. } => assert_eq!(max_supersteps, 4),
        other => panic!("expected InfiniteLoop, got {other:?}"),
    }
}

#[tokio::test]
async fn entrypoint_must_name_an_entry_candidate() {
    let graph = counter_graph(3, Arc::new(AtomicUsize::new(0)));
    let err = Runner::new()
        .run(
            &graph,
            RunOptions::new()
                .input("count", json!(0))
                .entrypoint("nowhere"),
        )
        .await
        .unwrap_err();
    assert!(err.to_string().contains("not an entry candidate"), "got {err}");

    // the gate sits outside the data cycle, so it cannot be an entry either
    let graph = counter_graph(3, Arc::new(AtomicUsize::new(0)));
    let err = Runner::new()
        .run(
            &graph,
            RunOptions::new().input("count", json!(0)).entrypoint("check"),
        )
        .await
        .unwrap_err();
    assert!(err.to_string().contains("not an entry candidate"), "got {err}");
}

#[tokio::test]
async fn gated_loop_behaves_identically_under_the_concurrent_scheduler() {
    let increments = Arc::new(AtomicUsize::new(0));
    let graph = counter_graph(5, increments.clone());
    let result = Runner::concurrent()
        .run(&graph, RunOptions::new().input("count", json!(0)))
        .await
        .unwrap();
    assert_eq!(result.outputs["count"], json!(5));
    assert_eq!(increments.load(Ordering::SeqCst), 5);
}
