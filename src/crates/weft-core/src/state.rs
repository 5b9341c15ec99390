//! Versioned execution state.
//!
//! A run owns one [`ExecutionState`]: the current value of every produced
//! (or caller-supplied) name, a monotonic version per name, a per-node
//! record of the input versions it last executed against, and the latest
//! decision of every gate. Staleness is version comparison, never value
//! comparison: writing an equal value still bumps the version and still
//! re-triggers consumers.

use crate::node::{InputMap, Node, RouteDecision};
use std::collections::HashMap;

/// What one node last executed against.
#[derive(Debug, Clone, Default)]
pub struct ExecutionRecord {
    /// Version of every input at the time of execution; constants (bound
    /// values and defaults) are recorded as version 0.
    pub input_versions: HashMap<String, u64>,
    /// Superstep the execution happened in.
    pub superstep: usize,
}

/// An input value resolved for one invocation.
#[derive(Debug, Clone)]
pub struct ResolvedInput {
    /// The value handed to the node.
    pub value: serde_json::Value,
    /// Its version: a state version, or 0 for bound values and defaults.
    pub version: u64,
}

/// Mutable state of one run.
#[derive(Debug, Clone, Default)]
pub struct ExecutionState {
    values: HashMap<String, serde_json::Value>,
    versions: HashMap<String, u64>,
    records: HashMap<String, ExecutionRecord>,
    decisions: HashMap<String, RouteDecision>,
}

impl ExecutionState {
    /// Empty state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inject caller-supplied values before the first superstep. Each enters
    /// at version 1, exactly as if a node had produced it.
    pub fn seed(values: impl IntoIterator<Item = (String, serde_json::Value)>) -> Self {
        let mut state = Self::default();
        for (name, value) in values {
            state.set(name, value);
        }
        state
    }

    /// Current value of `name`, if present.
    pub fn get(&self, name: &str) -> Option<&serde_json::Value> {
        self.values.get(name)
    }

    /// Current version of `name`; 0 means never written.
    pub fn version(&self, name: &str) -> u64 {
        self.versions.get(name).copied().unwrap_or(0)
    }

    /// Write a value and bump its version. Equal values still bump.
    pub fn set(&mut self, name: impl Into<String>, value: serde_json::Value) {
        let name = name.into();
        *self.versions.entry(name.clone()).or_insert(0) += 1;
        self.values.insert(name, value);
    }

    /// Whether `node` has executed at least once this run.
    pub fn has_run(&self, node: &str) -> bool {
        self.records.contains_key(node)
    }

    /// The record of `node`'s last execution, if any.
    pub fn record(&self, node: &str) -> Option<&ExecutionRecord> {
        self.records.get(node)
    }

    /// Record that `node` executed against the given input versions.
    pub fn record_execution(
        &mut self,
        node: impl Into<String>,
        input_versions: HashMap<String, u64>,
        superstep: usize,
    ) {
        self.records.insert(
            node.into(),
            ExecutionRecord {
                input_versions,
                superstep,
            },
        );
    }

    /// The latest recorded decision of `gate`, if any.
    pub fn decision(&self, gate: &str) -> Option<&RouteDecision> {
        self.decisions.get(gate)
    }

    /// Record a gate decision.
    pub fn record_decision(&mut self, gate: impl Into<String>, decision: RouteDecision) {
        self.decisions.insert(gate.into(), decision);
    }

    /// Drop a gate's decision; used when the gate goes stale so its old
    /// verdict cannot activate anyone.
    pub fn clear_decision(&mut self, gate: &str) {
        self.decisions.remove(gate);
    }

    /// Resolve one input for `node`: run state first, then the view's bound
    /// values, then the node's declared default. `None` means unavailable.
    pub fn resolve_input(
        &self,
        bound: &HashMap<String, serde_json::Value>,
        node: &Node,
        name: &str,
    ) -> Option<ResolvedInput> {
        if let Some(value) = self.values.get(name) {
            return Some(ResolvedInput {
                value: value.clone(),
                version: self.version(name),
            });
        }
        if let Some(value) = bound.get(name) {
            return Some(ResolvedInput {
                value: value.clone(),
                version: 0,
            });
        }
        node.default_for(name).map(|value| ResolvedInput {
            value: value.clone(),
            version: 0,
        })
    }

    /// Resolve every input of `node`, or `None` if any is unavailable.
    /// Returns the values and the version map to record on execution.
    pub fn snapshot_inputs(
        &self,
        bound: &HashMap<String, serde_json::Value>,
        node: &Node,
    ) -> Option<(InputMap, HashMap<String, u64>)> {
        let mut values = InputMap::with_capacity(node.inputs().len());
        let mut versions = HashMap::with_capacity(node.inputs().len());
        for input in node.inputs() {
            let resolved = self.resolve_input(bound, node, input)?;
            versions.insert(input.clone(), resolved.version);
            values.insert(input.clone(), resolved.value);
        }
        Some((values, versions))
    }

    /// Names currently present in state, with values; consumed when
    /// extracting run outputs.
    pub fn values(&self) -> &HashMap<String, serde_json::Value> {
        &self.values
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::FunctionNode;
    use serde_json::json;

    #[test]
    fn equal_writes_still_bump_versions() {
        let mut state = ExecutionState::new();
        state.set("x", json!(5));
        assert_eq!(state.version("x"), 1);
        state.set("x", json!(5));
        assert_eq!(state.version("x"), 2);
        assert_eq!(state.get("x"), Some(&json!(5)));
    }

    #[test]
    fn seeded_values_enter_at_version_one() {
        let state = ExecutionState::seed([("x".to_string(), json!(1))]);
        assert_eq!(state.version("x"), 1);
        assert_eq!(state.version("missing"), 0);
    }

    #[test]
    fn resolution_prefers_state_over_bound_over_default() {
        let node = FunctionNode::builder("n")
            .input("p")
            .output("q")
            .default_value("p", json!("default"))
            .sync(|_| Ok(json!(0)))
            .build()
            .unwrap();
        let bound = HashMap::from([("p".to_string(), json!("bound"))]);

        let mut state = ExecutionState::new();
        let resolved = state.resolve_input(&bound, &node, "p").unwrap();
        assert_eq!(resolved.value, json!("bound"));
        assert_eq!(resolved.version, 0);

        let resolved = state.resolve_input(&HashMap::new(), &node, "p").unwrap();
        assert_eq!(resolved.value, json!("default"));

        state.set("p", json!("produced"));
        let resolved = state.resolve_input(&bound, &node, "p").unwrap();
        assert_eq!(resolved.value, json!("produced"));
        assert_eq!(resolved.version, 1);
    }

    #[test]
    fn snapshot_fails_when_an_input_is_missing() {
        let node = FunctionNode::builder("n")
            .input("a")
            .input("b")
            .output("c")
            .sync(|_| Ok(json!(0)))
            .build()
            .unwrap();
        let mut state = ExecutionState::new();
        state.set("a", json!(1));
        assert!(state.snapshot_inputs(&HashMap::new(), &node).is_none());
        state.set("b", json!(2));
        let (values, versions) = state.snapshot_inputs(&HashMap::new(), &node).unwrap();
        assert_eq!(values["a"], json!(1));
        assert_eq!(versions["b"], 1);
    }
}
