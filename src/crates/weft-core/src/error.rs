//! Error types and error handling for graph construction and execution.
//!
//! Construction-time problems ([`GraphError::GraphConfig`]) always abort before
//! a graph value exists; run-time problems carry enough context for the caller
//! to act — a missing input names the exact `bind` call that would fix it, a
//! node failure carries whatever partial outputs had merged before the abort.
//!
//! # Error taxonomy
//!
//! ```text
//! GraphError
//! ├── GraphConfig        - Structural violation at construction time
//! ├── MissingInput       - Required or seed value absent at run time
//! ├── AmbiguousEntry     - Several cycle entry points satisfiable at once
//! ├── IncompatibleRunner - Graph needs a capability the runner lacks
//! ├── InfiniteLoop       - Superstep cap exhausted with nodes still ready
//! ├── NodeFailed         - A node's own logic raised
//! ├── Checkpoint         - Store passthrough (only surfaced by direct store use)
//! └── Serialization      - serde_json passthrough
//! ```
//!
//! # Examples
//!
//! ```rust
//! use weft_core::error::GraphError;
//!
//! let err = GraphError::missing_input("count", Some("cont"));
//! let msg = err.to_string();
//! assert!(msg.contains("count"));
//! assert!(msg.contains("cont"));
//! ```

use std::collections::HashMap;
use thiserror::Error;

/// Convenience result type using [`GraphError`].
pub type Result<T> = std::result::Result<T, GraphError>;

/// All errors raised by graph construction, validation, and execution.
#[derive(Error, Debug)]
pub enum GraphError {
    /// Construction-time structural violation.
    ///
    /// Duplicate node names, conflicting producers, inconsistent defaults,
    /// invalid identifiers, malformed explicit edges. No partial graph is
    /// ever returned after this error.
    #[error("Invalid graph configuration: {0}")]
    GraphConfig(String),

    /// A required or seed input was absent at run time.
    ///
    /// `suggestion` is populated when a caller-supplied name is within small
    /// edit distance of the missing one.
    #[error("Missing required input '{name}'{}; supply it in the run values or call graph.bind(\"{name}\", value)", suggestion.as_ref().map(|s| format!(" (did you mean '{s}'?)")).unwrap_or_default())]
    MissingInput {
        /// The absent parameter name
        name: String,
        /// Closest caller-supplied name, if any is plausibly a typo
        suggestion: Option<String>,
    },

    /// More than one cycle entry point is satisfiable with different
    /// parameter sets, so the engine cannot tell which branch the caller
    /// intends to seed.
    #[error("Ambiguous cycle entry: the supplied values satisfy multiple entry points with different seeds ({}); supply values for exactly one, or pass an explicit entrypoint", alternatives.join(", "))]
    AmbiguousEntry {
        /// Human-readable "entry point (needs a, b)" descriptions
        alternatives: Vec<String>,
    },

    /// The graph requires a capability the chosen runner does not have.
    #[error("Incompatible runner: {0}")]
    IncompatibleRunner(String),

    /// The superstep cap was exhausted while nodes were still ready.
    #[error("Graph did not reach a fixed point within {max_supersteps} supersteps (nodes still ready: {}); raise max_supersteps or check the graph's gates for a missing END route", still_ready.join(", "))]
    InfiniteLoop {
        /// The configured cap
        max_supersteps: usize,
        /// Nodes that were still ready when the cap was hit
        still_ready: Vec<String>,
    },

    /// A node's own logic failed.
    ///
    /// `partial` holds every value that had merged into state before the
    /// abort, so callers can inspect partial progress.
    #[error("Node '{node}' execution failed: {message}")]
    NodeFailed {
        /// Name of the node that failed
        node: String,
        /// Error message from node logic
        message: String,
        /// Values merged before the failure
        partial: HashMap<String, serde_json::Value>,
    },

    /// Checkpoint store error (surfaced only from direct store calls; the
    /// runner itself swallows store failures).
    #[error("Checkpoint error: {0}")]
    Checkpoint(#[from] weft_checkpoint::CheckpointError),

    /// JSON serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl GraphError {
    /// Create a construction-time configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::GraphConfig(message.into())
    }

    /// Create a missing-input error with an optional typo suggestion.
    pub fn missing_input(name: impl Into<String>, suggestion: Option<impl Into<String>>) -> Self {
        Self::MissingInput {
            name: name.into(),
            suggestion: suggestion.map(Into::into),
        }
    }

    /// Create a node failure without partial output context.
    pub fn node_failed(node: impl Into<String>, message: impl Into<String>) -> Self {
        Self::NodeFailed {
            node: node.into(),
            message: message.into(),
            partial: HashMap::new(),
        }
    }
}
