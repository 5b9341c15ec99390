//! Graph construction and wiring.
//!
//! A [`Graph`] is a set of named [`Node`]s plus edges. By default the wiring
//! is inferred by name: a data edge exists wherever one node's output name
//! equals another node's input name. Explicit edge mode turns inference off
//! and requires every data edge to be declared by hand.
//!
//! Construction validates the whole structure up front — duplicate
//! producers, gate targets that name no node, inconsistent defaults — so a
//! graph that builds successfully is a graph the runner can execute without
//! structural surprises.
//!
//! Graphs are cheaply cloneable: the structure lives behind an `Arc`, and
//! [`bind`](Graph::bind) / [`select`](Graph::select) produce lightweight
//! views that share it.
//!
//! # Example
//!
//! ```rust
//! use weft_core::node::FunctionNode;
//! use weft_core::graph::Graph;
//! use serde_json::json;
//!
//! let graph = Graph::builder("pipeline")
//!     .node(
//!         FunctionNode::builder("double")
//!             .input("x")
//!             .output("y")
//!             .sync(|i| Ok(json!(i["x"].as_i64().unwrap_or(0) * 2)))
//!             .build()
//!             .unwrap(),
//!     )
//!     .node(
//!         FunctionNode::builder("triple")
//!             .input("y")
//!             .output("z")
//!             .sync(|i| Ok(json!(i["y"].as_i64().unwrap_or(0) * 3)))
//!             .build()
//!             .unwrap(),
//!     )
//!     .build()
//!     .unwrap();
//!
//! assert_eq!(graph.producers_of("y"), ["double"]);
//! ```

use crate::error::{GraphError, Result};
use crate::inputs::{analyze_inputs, InputAnalysis, InputSpec};
use crate::node::{Node, END};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::Arc;

/// The two edge kinds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EdgeKind {
    /// Carries the named value from producer to consumer.
    Data(String),
    /// Gate-to-target activation; carries no value.
    Control,
}

/// A directed edge between two named nodes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Edge {
    /// Producing (or gating) node.
    pub source: String,
    /// Consuming (or gated) node.
    pub target: String,
    /// Data or control.
    pub kind: EdgeKind,
}

/// Immutable structure shared by every view of a graph.
#[derive(Debug)]
pub(crate) struct GraphCore {
    pub(crate) name: String,
    pub(crate) nodes: HashMap<String, Node>,
    /// Declaration order; drives deterministic scheduling and merging.
    pub(crate) order: Vec<String>,
    pub(crate) edges: Vec<Edge>,
    /// Value name -> producing node names, in declaration order.
    pub(crate) producers: HashMap<String, Vec<String>>,
    /// Node name -> gates whose target set names it.
    pub(crate) controlling_gates: HashMap<String, Vec<String>>,
    pub(crate) analysis: InputAnalysis,
    fingerprint: String,
}

/// A dataflow graph: nodes wired by name matching (or explicit edges), plus
/// this view's bound values and output selection.
#[derive(Debug, Clone)]
pub struct Graph {
    core: Arc<GraphCore>,
    bound: HashMap<String, serde_json::Value>,
    selection: Option<Vec<String>>,
}

impl Graph {
    /// Start building a graph with the given name.
    pub fn builder(name: impl Into<String>) -> GraphBuilder {
        GraphBuilder {
            name: name.into(),
            nodes: Vec::new(),
            explicit_edges: None,
        }
    }

    /// Graph name.
    pub fn name(&self) -> &str {
        &self.core.name
    }

    /// Node names in declaration order.
    pub fn order(&self) -> &[String] {
        &self.core.order
    }

    /// Look up a node by name.
    pub fn node(&self, name: &str) -> Option<&Node> {
        self.core.nodes.get(name)
    }

    /// Nodes in declaration order.
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.core.order.iter().filter_map(|n| self.core.nodes.get(n))
    }

    /// All edges (data and control).
    pub fn edges(&self) -> &[Edge] {
        &self.core.edges
    }

    /// Names of the nodes that produce `value`, in declaration order.
    pub fn producers_of(&self, value: &str) -> &[String] {
        self.core
            .producers
            .get(value)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Whether `node` is the only producer of `value`.
    pub fn is_sole_producer(&self, node: &str, value: &str) -> bool {
        matches!(self.producers_of(value), [only] if only == node)
    }

    /// Gates whose declared target set names `node`.
    pub fn controlling_gates(&self, node: &str) -> &[String] {
        self.core
            .controlling_gates
            .get(node)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Pre-bind a value: every run of this view sees it without the caller
    /// passing it. Fails if no node consumes `name`.
    pub fn bind(&self, name: impl Into<String>, value: serde_json::Value) -> Result<Graph> {
        let name = name.into();
        let consumed = self
            .nodes()
            .any(|n| n.inputs().iter().any(|i| *i == name));
        if !consumed {
            return Err(GraphError::config(format!(
                "cannot bind '{name}': no node in graph '{}' consumes it",
                self.core.name
            )));
        }
        let mut view = self.clone();
        view.bound.insert(name, value);
        Ok(view)
    }

    /// Remove a binding, if present.
    pub fn unbind(&self, name: &str) -> Graph {
        let mut view = self.clone();
        view.bound.remove(name);
        view
    }

    /// Values bound on this view.
    pub fn bound(&self) -> &HashMap<String, serde_json::Value> {
        &self.bound
    }

    /// Restrict run results to the named values. Fails if a name is never
    /// produced in the graph.
    pub fn select(&self, outputs: impl IntoIterator<Item = impl Into<String>>) -> Result<Graph> {
        let outputs: Vec<String> = outputs.into_iter().map(Into::into).collect();
        for name in &outputs {
            if !self.core.producers.contains_key(name) {
                return Err(GraphError::config(format!(
                    "cannot select '{name}': no node in graph '{}' produces it",
                    self.core.name
                )));
            }
        }
        let mut view = self.clone();
        view.selection = Some(outputs);
        Ok(view)
    }

    /// This view's output selection, if any.
    pub fn selection(&self) -> Option<&[String]> {
        self.selection.as_deref()
    }

    /// Names this view exposes as outputs: the selection if set, otherwise
    /// every produced value name, sorted.
    pub fn output_names(&self) -> Vec<String> {
        match &self.selection {
            Some(sel) => sel.clone(),
            None => {
                let mut names: Vec<String> = self.core.producers.keys().cloned().collect();
                names.sort();
                names
            }
        }
    }

    /// Classify this view's external inputs, with bound names carved out of
    /// the structural categories.
    pub fn input_spec(&self) -> InputSpec {
        let mut spec = self.core.analysis.spec.clone();
        if self.bound.is_empty() {
            return spec;
        }
        let mut bound: Vec<String> = Vec::new();
        for names in [&mut spec.required, &mut spec.optional, &mut spec.seeds] {
            names.retain(|n| {
                if self.bound.contains_key(n) {
                    bound.push(n.clone());
                    false
                } else {
                    true
                }
            });
        }
        bound.sort();
        spec.bound = bound;
        spec
    }

    /// Structural input analysis, before bindings are carved out.
    pub(crate) fn analysis(&self) -> &InputAnalysis {
        &self.core.analysis
    }

    /// A declared default for `param` on any consuming node. Build-time
    /// validation guarantees all consumers agree, so one is representative.
    pub fn default_for(&self, param: &str) -> Option<&serde_json::Value> {
        self.nodes().find_map(|n| n.default_for(param))
    }

    /// Whether any node requires an asynchronous execution context.
    pub fn requires_async(&self) -> bool {
        self.nodes().any(Node::requires_async)
    }

    /// Whether this graph (recursively) contains an interrupt node.
    pub fn contains_interrupt(&self) -> bool {
        self.nodes().any(Node::contains_interrupt)
    }

    /// Structural fingerprint: a stable hex digest over node fingerprints
    /// and the edge set, independent of declaration order, bindings, and
    /// output selection.
    pub fn fingerprint(&self) -> &str {
        &self.core.fingerprint
    }
}

/// Builder for [`Graph`]. Nodes accumulate; all structural validation
/// happens in [`build`](Self::build).
pub struct GraphBuilder {
    name: String,
    nodes: Vec<Node>,
    /// `None` = inferred wiring; `Some` = explicit data edges only.
    explicit_edges: Option<Vec<(String, String, String)>>,
}

impl GraphBuilder {
    /// Add a node.
    pub fn node(mut self, node: Node) -> Self {
        self.nodes.push(node);
        self
    }

    /// Switch off inference: only edges declared with
    /// [`edge`](Self::edge) exist.
    pub fn explicit_edges(mut self) -> Self {
        self.explicit_edges.get_or_insert_with(Vec::new);
        self
    }

    /// Declare a data edge `source --value--> target` (explicit mode only;
    /// implies [`explicit_edges`](Self::explicit_edges)).
    pub fn edge(
        mut self,
        source: impl Into<String>,
        target: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        self.explicit_edges
            .get_or_insert_with(Vec::new)
            .push((source.into(), target.into(), value.into()));
        self
    }

    /// Validate the structure and build the graph.
    pub fn build(self) -> Result<Graph> {
        validate_graph_name(&self.name)?;

        let mut order = Vec::with_capacity(self.nodes.len());
        let mut nodes: HashMap<String, Node> = HashMap::with_capacity(self.nodes.len());
        for node in self.nodes {
            let name = node.name().to_string();
            validate_node_name(&name)?;
            for value in node.inputs().iter().chain(node.outputs()) {
                validate_value_name(&name, value)?;
            }
            if nodes.insert(name.clone(), node).is_some() {
                return Err(GraphError::config(format!(
                    "duplicate node name '{name}' in graph '{}'",
                    self.name
                )));
            }
            order.push(name);
        }
        if order.is_empty() {
            return Err(GraphError::config(format!("graph '{}' has no nodes", self.name)));
        }

        let producers = build_producers(&self.name, &nodes, &order)?;
        let edges = match &self.explicit_edges {
            None => infer_edges(&nodes, &order, &producers),
            Some(declared) => resolve_explicit_edges(&self.name, &nodes, declared)?,
        };
        let (edges, controlling_gates) = add_control_edges(&self.name, &nodes, &order, edges)?;

        validate_defaults(&nodes, &order)?;
        validate_nested_names(&nodes, &order, &producers)?;

        let analysis = analyze_inputs(&nodes, &order, &edges, &producers, &controlling_gates);
        let fingerprint = compute_fingerprint(&nodes, &order, &edges);

        Ok(Graph {
            core: Arc::new(GraphCore {
                name: self.name,
                nodes,
                order,
                edges,
                producers,
                controlling_gates,
                analysis,
                fingerprint,
            }),
            bound: HashMap::new(),
            selection: None,
        })
    }
}

fn validate_graph_name(name: &str) -> Result<()> {
    if name.is_empty()
        || name
            .chars()
            .any(|c| c.is_whitespace() || c == '/' || c == ':')
    {
        return Err(GraphError::config(format!(
            "invalid graph name '{name}': must be non-empty and free of whitespace, '/', and ':'"
        )));
    }
    Ok(())
}

fn validate_node_name(name: &str) -> Result<()> {
    let mut chars = name.chars();
    let valid = matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_');
    if !valid {
        return Err(GraphError::config(format!(
            "invalid node name '{name}': must start with a letter or '_' and contain only letters, digits, and '_'"
        )));
    }
    if name == END {
        return Err(GraphError::config(format!(
            "'{END}' is the terminal routing sentinel and cannot name a node"
        )));
    }
    Ok(())
}

fn validate_value_name(node: &str, value: &str) -> Result<()> {
    let mut chars = value.chars();
    let valid = matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_');
    if !valid {
        return Err(GraphError::config(format!(
            "node '{node}' declares invalid value name '{value}': must start with a letter or '_' and contain only letters, digits, and '_'"
        )));
    }
    Ok(())
}

/// Map each value name to its producers. Two producers are tolerated only
/// when both are targets of one single-target gate, so at most one can run
/// on any pass.
fn build_producers(
    graph: &str,
    nodes: &HashMap<String, Node>,
    order: &[String],
) -> Result<HashMap<String, Vec<String>>> {
    let mut producers: HashMap<String, Vec<String>> = HashMap::new();
    for name in order {
        for output in nodes[name].outputs() {
            producers.entry(output.clone()).or_default().push(name.clone());
        }
    }
    for (value, names) in &producers {
        match names.as_slice() {
            [_] => {}
            [a, b] if exclusive_pair(nodes, order, a, b) => {}
            _ => {
                return Err(GraphError::config(format!(
                    "value '{value}' in graph '{graph}' has multiple producers ({}); producers must be unique unless both are targets of one single-target gate",
                    names.join(", ")
                )))
            }
        }
    }
    Ok(producers)
}

/// Whether some single-target gate's candidate set contains both nodes,
/// making them mutually exclusive on any pass.
fn exclusive_pair(nodes: &HashMap<String, Node>, order: &[String], a: &str, b: &str) -> bool {
    order.iter().any(|name| {
        nodes[name]
            .gate_targets()
            .map_or(false, |(targets, single)| {
                single && targets.contains(&a) && targets.contains(&b)
            })
    })
}

/// Inferred wiring: a data edge wherever an output name equals an input
/// name, self-loops included.
fn infer_edges(
    nodes: &HashMap<String, Node>,
    order: &[String],
    producers: &HashMap<String, Vec<String>>,
) -> Vec<Edge> {
    let mut edges = Vec::new();
    for name in order {
        for input in nodes[name].inputs() {
            if let Some(sources) = producers.get(input) {
                for source in sources {
                    edges.push(Edge {
                        source: source.clone(),
                        target: name.clone(),
                        kind: EdgeKind::Data(input.clone()),
                    });
                }
            }
        }
    }
    edges
}

/// Explicit wiring: check every declared edge against the signatures.
fn resolve_explicit_edges(
    graph: &str,
    nodes: &HashMap<String, Node>,
    declared: &[(String, String, String)],
) -> Result<Vec<Edge>> {
    let mut edges = Vec::with_capacity(declared.len());
    for (source, target, value) in declared {
        let src = nodes.get(source).ok_or_else(|| {
            GraphError::config(format!("edge source '{source}' is not a node in graph '{graph}'"))
        })?;
        let tgt = nodes.get(target).ok_or_else(|| {
            GraphError::config(format!("edge target '{target}' is not a node in graph '{graph}'"))
        })?;
        if !src.outputs().iter().any(|o| o == value) {
            return Err(GraphError::config(format!(
                "edge '{source}' --{value}--> '{target}': '{source}' does not produce '{value}'"
            )));
        }
        if !tgt.inputs().iter().any(|i| i == value) {
            return Err(GraphError::config(format!(
                "edge '{source}' --{value}--> '{target}': '{target}' does not consume '{value}'"
            )));
        }
        edges.push(Edge {
            source: source.clone(),
            target: target.clone(),
            kind: EdgeKind::Data(value.clone()),
        });
    }
    Ok(edges)
}

/// Append control edges gate -> target and build the controlling-gate map.
fn add_control_edges(
    graph: &str,
    nodes: &HashMap<String, Node>,
    order: &[String],
    mut edges: Vec<Edge>,
) -> Result<(Vec<Edge>, HashMap<String, Vec<String>>)> {
    let mut controlling: HashMap<String, Vec<String>> = HashMap::new();
    for name in order {
        let Some((targets, _)) = nodes[name].gate_targets() else {
            continue;
        };
        for target in targets {
            if target == END {
                continue;
            }
            if !nodes.contains_key(target) {
                return Err(GraphError::config(format!(
                    "gate '{name}' in graph '{graph}' targets '{target}', which is not a node"
                )));
            }
            edges.push(Edge {
                source: name.clone(),
                target: target.to_string(),
                kind: EdgeKind::Control,
            });
            controlling
                .entry(target.to_string())
                .or_default()
                .push(name.clone());
        }
    }
    Ok((edges, controlling))
}

/// All consumers that declare a default for the same parameter must agree.
fn validate_defaults(nodes: &HashMap<String, Node>, order: &[String]) -> Result<()> {
    let mut seen: HashMap<&str, (&str, &serde_json::Value)> = HashMap::new();
    for name in order {
        let node = &nodes[name];
        for input in node.inputs() {
            let Some(default) = node.default_for(input) else {
                continue;
            };
            match seen.get(input.as_str()) {
                Some((other, existing)) if *existing != default => {
                    return Err(GraphError::config(format!(
                        "parameter '{input}' has conflicting defaults: {existing} on '{other}' vs {default} on '{name}'"
                    )))
                }
                Some(_) => {}
                None => {
                    seen.insert(input, (name, default));
                }
            }
        }
    }
    Ok(())
}

/// A nested graph node's name must not shadow a value produced by a sibling,
/// or name matching becomes ambiguous to read.
fn validate_nested_names(
    nodes: &HashMap<String, Node>,
    order: &[String],
    producers: &HashMap<String, Vec<String>>,
) -> Result<()> {
    for name in order {
        if !matches!(nodes[name], Node::Graph(_)) {
            continue;
        }
        if let Some(others) = producers.get(name.as_str()) {
            if others.iter().any(|o| o != name) {
                return Err(GraphError::config(format!(
                    "nested graph node '{name}' collides with a value of the same name produced by a sibling node"
                )));
            }
        }
    }
    Ok(())
}

/// Digest over sorted `name:node-fingerprint` pairs plus the sorted edge
/// set. Declaration order, bindings, and selection do not participate.
fn compute_fingerprint(nodes: &HashMap<String, Node>, order: &[String], edges: &[Edge]) -> String {
    let mut node_parts: Vec<String> = order
        .iter()
        .map(|name| format!("{name}:{}", nodes[name].fingerprint()))
        .collect();
    node_parts.sort();

    let mut edge_parts: Vec<String> = edges
        .iter()
        .map(|e| match &e.kind {
            EdgeKind::Data(value) => format!("{}>{}:{}", e.source, e.target, value),
            EdgeKind::Control => format!("{}>{}:#control", e.source, e.target),
        })
        .collect();
    edge_parts.sort();

    let mut hasher = Sha256::new();
    for part in node_parts.iter().chain(edge_parts.iter()) {
        hasher.update(part.as_bytes());
        hasher.update(b"\n");
    }
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::{FunctionNode, IfElseNode, RouteDecision, RouteNode};
    use serde_json::json;

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

    fn pipeline() -> Graph {
        Graph::builder("pipeline")
            .node(func("double", &["x"], &["y"]))
            .node(func("triple", &["y"], &["z"]))
            .build()
            .unwrap()
    }

    #[test]
    fn inference_wires_outputs_to_matching_inputs() {
        let g = pipeline();
        assert!(g.edges().contains(&Edge {
            source: "double".into(),
            target: "triple".into(),
            kind: EdgeKind::Data("y".into()),
        }));
        assert_eq!(g.producers_of("y"), ["double"]);
        assert!(g.is_sole_producer("double", "y"));
    }

    #[test]
    fn self_loop_is_inferred() {
        let g = Graph::builder("loop")
            .node(func("step", &["state"], &["state"]))
            .build()
            .unwrap();
        assert!(g.edges().contains(&Edge {
            source: "step".into(),
            target: "step".into(),
            kind: EdgeKind::Data("state".into()),
        }));
    }

    #[test]
    fn duplicate_producers_are_rejected() {
        let err = Graph::builder("dup")
            .node(func("a", &[], &["v"]))
            .node(func("b", &[], &["v"]))
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("multiple producers"));
    }

    #[test]
    fn gate_exclusive_producers_are_allowed() {
        let g = Graph::builder("branch")
            .node(IfElseNode::new("pick", ["flag"], "a", "b", |i| {
                Ok(i["flag"].as_bool().unwrap_or(false))
            }))
            .node(func("a", &["flag"], &["v"]))
            .node(func("b", &["flag"], &["v"]))
            .build()
            .unwrap();
        assert_eq!(g.producers_of("v"), ["a", "b"]);
    }

    #[test]
    fn gate_targeting_unknown_node_is_rejected() {
        let err = Graph::builder("bad")
            .node(RouteNode::single("route", ["x"], ["missing"], |_| {
                Ok(RouteDecision::End)
            }))
            .node(func("src", &[], &["x"]))
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("not a node"));
    }

    #[test]
    fn control_edges_and_controlling_gates() {
        let g = Graph::builder("gated")
            .node(func("seed", &[], &["count"]))
            .node(IfElseNode::new("check", ["count"], "step", crate::node::END, |i| {
                Ok(i["count"].as_i64().unwrap_or(0) < 3)
            }))
            .node(func("step", &["count"], &["stepped"]))
            .build()
            .unwrap();
        assert_eq!(g.controlling_gates("step"), ["check"]);
        assert!(g.controlling_gates("seed").is_empty());
        assert!(g.edges().contains(&Edge {
            source: "check".into(),
            target: "step".into(),
            kind: EdgeKind::Control,
        }));
    }

    #[test]
    fn conflicting_defaults_are_rejected() {
        let a = FunctionNode::builder("a")
            .input("p")
            .output("q")
            .default_value("p", json!(1))
            .sync(|_| Ok(json!(0)))
            .build()
            .unwrap();
        let b = FunctionNode::builder("b")
            .input("p")
            .output("r")
            .default_value("p", json!(2))
            .sync(|_| Ok(json!(0)))
            .build()
            .unwrap();
        let err = Graph::builder("conflict").node(a).node(b).build().unwrap_err();
        assert!(err.to_string().contains("conflicting defaults"));
    }

    #[test]
    fn bind_unknown_parameter_fails() {
        let g = pipeline();
        assert!(g.bind("nope", json!(1)).is_err());
        let bound = g.bind("x", json!(5)).unwrap();
        assert_eq!(bound.bound()["x"], json!(5));
        // the original view is untouched
        assert!(g.bound().is_empty());
    }

    #[test]
    fn select_unproduced_value_fails() {
        let g = pipeline();
        assert!(g.select(["nope"]).is_err());
        let view = g.select(["z"]).unwrap();
        assert_eq!(view.output_names(), ["z"]);
    }

    #[test]
    fn explicit_edges_disable_inference() {
        let g = Graph::builder("explicit")
            .node(func("double", &["x"], &["y"]))
            .node(func("triple", &["y"], &["z"]))
            .explicit_edges()
            .build()
            .unwrap();
        // no declared edges, so no data edges despite matching names
        assert!(g.edges().iter().all(|e| e.kind == EdgeKind::Control));
    }

    #[test]
    fn explicit_edge_must_match_signatures() {
        let err = Graph::builder("explicit")
            .node(func("double", &["x"], &["y"]))
            .node(func("triple", &["y"], &["z"]))
            .edge("double", "triple", "w")
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("does not produce"));
    }

    #[test]
    fn fingerprint_ignores_declaration_order_and_bindings() {
        let a = pipeline();
        let b = Graph::builder("pipeline")
            .node(func("triple", &["y"], &["z"]))
            .node(func("double", &["x"], &["y"]))
            .build()
            .unwrap();
        assert_eq!(a.fingerprint(), b.fingerprint());

        let bound = a.bind("x", json!(5)).unwrap();
        assert_eq!(a.fingerprint(), bound.fingerprint());
        let selected = a.select(["z"]).unwrap();
        assert_eq!(a.fingerprint(), selected.fingerprint());
    }

    #[test]
    fn fingerprint_changes_when_structure_changes() {
        let a = pipeline();
        let b = Graph::builder("pipeline")
            .node(func("double", &["x"], &["y"]))
            .node(func("triple", &["y"], &["z"]))
            .node(func("extra", &["z"], &["w"]))
            .build()
            .unwrap();
        assert_ne!(a.fingerprint(), b.fingerprint());
    }

    #[test]
    fn end_cannot_name_a_node() {
        let err = Graph::builder("bad")
            .node(func("END", &[], &["v"]))
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("sentinel"));
    }

    #[test]
    fn value_names_must_be_identifiers() {
        let err = Graph::builder("bad")
            .node(func("a", &[], &["a b/c"]))
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("invalid value name"), "got {err}");

        let err = Graph::builder("bad")
            .node(func("a", &["1st"], &["v"]))
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("invalid value name"), "got {err}");
    }
}
