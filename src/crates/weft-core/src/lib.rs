//! # weft-core
//!
//! A dataflow graph execution engine. Nodes declare named inputs and
//! outputs; wiring is inferred by matching names (or declared explicitly);
//! a runner executes the graph to a fixed point under bulk-synchronous
//! supersteps.
//!
//! ## Core ideas
//!
//! - **Name matching** — an output called `y` feeds every input called `y`.
//!   No manual wiring for the common case.
//! - **Supersteps** — each round, every node whose inputs are available and
//!   fresh executes against a frozen snapshot; outputs merge atomically
//!   afterwards. The sequential and concurrent schedulers are
//!   interchangeable.
//! - **Versions, not values** — staleness is tracked by monotonically
//!   bumped versions, so writing an equal value still re-triggers
//!   consumers, and a node is never re-run for its own sole-produced
//!   self-feedback.
//! - **Cycles and gates** — routing gates decide which targets run; cycles
//!   are entered through caller-supplied seed values and terminated by a
//!   gate deciding [`END`](node::END).
//! - **Composition** — a whole graph wraps into a single node of a parent
//!   graph, optionally mapped over per-item inputs.
//!
//! ## Quick start
//!
//! ```rust,ignore
//! use weft_core::{FunctionNode, Graph, Runner, RunOptions};
//! use serde_json::json;
//!
//! let graph = Graph::builder("pipeline")
//!     .node(
//!         FunctionNode::builder("double")
//!             .input("x")
//!             .output("y")
//!             .sync(|i| Ok(json!(i["x"].as_i64().unwrap_or(0) * 2)))
//!             .build()?,
//!     )
//!     .node(
//!         FunctionNode::builder("triple")
//!             .input("y")
//!             .output("z")
//!             .sync(|i| Ok(json!(i["y"].as_i64().unwrap_or(0) * 3)))
//!             .build()?,
//!     )
//!     .build()?;
//!
//! let result = Runner::new()
//!     .run(&graph, RunOptions::new().input("x", json!(5)))
//!     .await?;
//! assert_eq!(result.outputs["z"], json!(30));
//! ```

pub mod cache;
pub mod error;
pub mod events;
pub mod graph;
pub mod inputs;
pub mod node;
pub mod runner;

mod scheduler;
mod state;
mod superstep;

pub use cache::NodeCache;
pub use error::{GraphError, Result};
pub use events::{RunEvent, RunObserver, TracingObserver};
pub use graph::{Edge, EdgeKind, Graph, GraphBuilder};
pub use inputs::{EntryCandidate, InputSpec};
pub use node::{
    FunctionNode, GraphNode, IfElseNode, InterruptNode, MapMode, Node, RouteDecision, RouteNode,
    END,
};
pub use runner::{
    CollisionPolicy, ErrorPolicy, RunOptions, RunResult, Runner, SchedulerKind, StepTrace,
};
pub use weft_checkpoint::RunStatus;
