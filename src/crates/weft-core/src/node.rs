//! Node contract and the five node variants.
//!
//! Every executable unit in a weft graph is a [`Node`] — a closed enum over
//! five kinds, matched exhaustively by the executor so a forgotten variant is
//! a compile error rather than a runtime surprise:
//!
//! - [`FunctionNode`] — plain computation (sync, async, or a finite sequence
//!   producer drained eagerly into an array)
//! - [`RouteNode`] — gate with an ordered candidate target set, single- or
//!   multi-target routing
//! - [`IfElseNode`] — two-way gate over a boolean condition
//! - [`GraphNode`] — a nested graph run through the same runner machinery,
//!   optionally mapped over broadcast inputs
//! - [`InterruptNode`] — pauses the run until a response value is supplied
//!
//! There is no runtime reflection: a node's inputs, outputs, defaults, and
//! type tags are declared up front in a [`NodeSignature`], recorded once by
//! the builder. The signature (plus an optional implementation tag) is what
//! the structural fingerprint hashes.
//!
//! # Example
//!
//! ```rust
//! use weft_core::node::FunctionNode;
//! use serde_json::json;
//!
//! let double = FunctionNode::builder("double")
//!     .input("x")
//!     .output("y")
//!     .sync(|inputs| Ok(json!(inputs["x"].as_i64().unwrap_or(0) * 2)))
//!     .build()
//!     .unwrap();
//!
//! assert_eq!(double.name(), "double");
//! assert_eq!(double.inputs(), ["x"]);
//! ```

use crate::error::{GraphError, Result};
use crate::graph::Graph;
use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::Arc;

/// Terminal routing sentinel. A gate that decides `END` activates nothing.
pub const END: &str = "END";

/// Resolved input values handed to a node invocation, keyed by input name.
pub type InputMap = HashMap<String, serde_json::Value>;

/// Values produced by a node invocation, keyed by output name.
pub type OutputMap = HashMap<String, serde_json::Value>;

/// A gate's routing decision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RouteDecision {
    /// Terminate this branch; activates no target.
    End,
    /// Activate a single target node.
    Target(String),
    /// Activate several targets at once (multi-target [`RouteNode`] only).
    Targets(Vec<String>),
}

impl RouteDecision {
    /// Whether this decision names `node` as an active target.
    pub fn activates(&self, node: &str) -> bool {
        match self {
            RouteDecision::End => false,
            RouteDecision::Target(t) => t == node,
            RouteDecision::Targets(ts) => ts.iter().any(|t| t == node),
        }
    }
}

/// Broadcast mode for a mapped [`GraphNode`] or [`Runner::map`](crate::runner::Runner::map).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MapMode {
    /// Pair same-index elements across parallel lists; all lists must share
    /// one length.
    Zip,
    /// Full cartesian product across the mapped parameters, first parameter
    /// outermost.
    Product,
}

/// Map-over annotation on a [`GraphNode`]: which inputs are broadcast per
/// item, and how combinations are formed.
#[derive(Debug, Clone)]
pub struct MapOver {
    /// Input parameters whose values are lists of per-item values.
    pub params: Vec<String>,
    /// Zip or cartesian combination mode.
    pub mode: MapMode,
}

/// Which half of a signature a rename touched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenameKind {
    /// An input parameter was renamed.
    Input,
    /// An output value was renamed.
    Output,
}

/// One entry in a node's append-only rename chain.
///
/// Renames are ordinary data: the builder appends entries and applies them in
/// order when the signature is finalized, and diagnostics echo the whole
/// chain so a failed lookup can be traced through every step.
#[derive(Debug, Clone)]
pub struct Rename {
    /// Input or output rename.
    pub kind: RenameKind,
    /// Name before this entry.
    pub old: String,
    /// Name after this entry.
    pub new: String,
}

impl std::fmt::Display for Rename {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let kind = match self.kind {
            RenameKind::Input => "input",
            RenameKind::Output => "output",
        };
        write!(f, "{} {} -> {}", kind, self.old, self.new)
    }
}

/// Explicit, declared description of a node: the redesign of the source
/// system's runtime signature reflection.
///
/// Everything the scheduler needs to know about a node without invoking it
/// lives here — ordered input names, output names, per-input defaults,
/// best-effort type tags, capability flags, and the rename chain that
/// produced the final names.
#[derive(Debug, Clone)]
pub struct NodeSignature {
    /// Unique name within the owning graph.
    pub name: String,
    /// Ordered input parameter names (post-rename).
    pub inputs: Vec<String>,
    /// Output value names (post-rename); empty for side-effect-only nodes.
    pub outputs: Vec<String>,
    /// Per-input default values.
    pub defaults: HashMap<String, serde_json::Value>,
    /// Best-effort type tags for inputs, e.g. `"number"`.
    pub input_types: HashMap<String, String>,
    /// Best-effort type tags for outputs.
    pub output_types: HashMap<String, String>,
    /// Whether invocation requires an asynchronous execution context.
    pub is_async: bool,
    /// Whether results may be served from the node result cache.
    pub cacheable: bool,
    /// Caller-supplied implementation identity, folded into the fingerprint
    /// to distinguish bodies with identical declared signatures.
    pub impl_tag: String,
    /// Append-only rename history, for diagnostics.
    pub renames: Vec<Rename>,
}

impl NodeSignature {
    fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            inputs: Vec::new(),
            outputs: Vec::new(),
            defaults: HashMap::new(),
            input_types: HashMap::new(),
            output_types: HashMap::new(),
            is_async: false,
            cacheable: false,
            impl_tag: String::new(),
            renames: Vec::new(),
        }
    }

    /// Format the rename chain for error messages.
    fn chain_description(&self) -> String {
        if self.renames.is_empty() {
            "no renames applied".to_string()
        } else {
            format!(
                "rename chain: {}",
                self.renames
                    .iter()
                    .map(|r| r.to_string())
                    .collect::<Vec<_>>()
                    .join(", ")
            )
        }
    }

    /// Map a raw invocation result onto this signature's output names.
    ///
    /// - zero outputs: the result is discarded (side-effect node)
    /// - one output: the result is that output's value
    /// - several outputs: the result must be an array of matching arity
    ///   (positional) or an object containing every output name
    fn distribute(&self, raw: serde_json::Value) -> Result<OutputMap> {
        match self.outputs.len() {
            0 => Ok(OutputMap::new()),
            1 => Ok(OutputMap::from([(self.outputs[0].clone(), raw)])),
            n => match raw {
                serde_json::Value::Array(items) if items.len() == n => Ok(self
                    .outputs
                    .iter()
                    .cloned()
                    .zip(items)
                    .collect()),
                serde_json::Value::Object(mut map)
                    if self.outputs.iter().all(|o| map.contains_key(o)) =>
                {
                    Ok(self
                        .outputs
                        .iter()
                        .map(|o| (o.clone(), map.remove(o).unwrap_or(serde_json::Value::Null)))
                        .collect())
                }
                other => Err(GraphError::node_failed(
                    &self.name,
                    format!(
                        "expected {n} outputs ({}) as an array of {n} or an object with those keys, got: {other}",
                        self.outputs.join(", ")
                    ),
                )),
            },
        }
    }

    /// Stable hex digest over the declared signature and implementation tag.
    fn fingerprint(&self, kind: &str, extra: &[String]) -> String {
        let mut hasher = Sha256::new();
        hasher.update(kind.as_bytes());
        hasher.update(b"|");
        hasher.update(self.name.as_bytes());
        hasher.update(b"|in:");
        hasher.update(self.inputs.join(",").as_bytes());
        hasher.update(b"|out:");
        hasher.update(self.outputs.join(",").as_bytes());
        let mut defaults: Vec<_> = self.defaults.iter().collect();
        defaults.sort_by(|a, b| a.0.cmp(b.0));
        for (k, v) in defaults {
            hasher.update(b"|def:");
            hasher.update(k.as_bytes());
            hasher.update(b"=");
            hasher.update(v.to_string().as_bytes());
        }
        hasher.update(b"|tag:");
        hasher.update(self.impl_tag.as_bytes());
        for item in extra {
            hasher.update(b"|");
            hasher.update(item.as_bytes());
        }
        format!("{:x}", hasher.finalize())
    }
}

/// Synchronous function body.
pub type SyncFn = Arc<dyn Fn(InputMap) -> Result<serde_json::Value> + Send + Sync>;

/// Asynchronous function body.
pub type AsyncFn = Arc<dyn Fn(InputMap) -> BoxFuture<'static, Result<serde_json::Value>> + Send + Sync>;

/// Lazy finite sequence body; the engine drains the iterator eagerly and the
/// collected array becomes the node's output value.
pub type SequenceFn =
    Arc<dyn Fn(InputMap) -> Result<Box<dyn Iterator<Item = serde_json::Value> + Send>> + Send + Sync>;

/// Router body for a [`RouteNode`].
pub type RouterFn = Arc<dyn Fn(InputMap) -> Result<RouteDecision> + Send + Sync>;

/// Condition body for an [`IfElseNode`].
pub type ConditionFn = Arc<dyn Fn(InputMap) -> Result<bool> + Send + Sync>;

/// The three execution contracts a function body can have, fixed at build
/// time so the scheduler never probes at call time.
#[derive(Clone)]
pub enum FnBody {
    /// Produces one value synchronously.
    Sync(SyncFn),
    /// Produces one value after awaiting external work.
    Async(AsyncFn),
    /// Produces a finite sequence of values, materialized eagerly.
    Sequence(SequenceFn),
}

impl std::fmt::Debug for FnBody {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let kind = match self {
            FnBody::Sync(_) => "Sync",
            FnBody::Async(_) => "Async",
            FnBody::Sequence(_) => "Sequence",
        };
        f.write_str(kind)
    }
}

/// Plain computation node.
#[derive(Debug, Clone)]
pub struct FunctionNode {
    /// Declared signature.
    pub signature: NodeSignature,
    body: FnBody,
}

impl FunctionNode {
    /// Start building a function node with the given name.
    pub fn builder(name: impl Into<String>) -> FunctionNodeBuilder {
        FunctionNodeBuilder {
            signature: NodeSignature::new(name),
            body: None,
        }
    }

    /// Node name.
    pub fn name(&self) -> &str {
        &self.signature.name
    }

    /// Declared input names.
    pub fn inputs(&self) -> &[String] {
        &self.signature.inputs
    }

    /// Invoke the body with resolved inputs and map the result onto the
    /// declared outputs. Sequence bodies are drained here.
    pub async fn invoke(&self, inputs: InputMap) -> Result<OutputMap> {
        let raw = match &self.body {
            FnBody::Sync(f) => f(inputs)?,
            FnBody::Async(f) => f(inputs).await?,
            FnBody::Sequence(f) => serde_json::Value::Array(f(inputs)?.collect()),
        };
        self.signature.distribute(raw)
    }
}

/// Builder for [`FunctionNode`]. Records the explicit signature once at
/// definition time; the rename chain is applied when [`build`](Self::build)
/// finalizes the signature.
pub struct FunctionNodeBuilder {
    signature: NodeSignature,
    body: Option<FnBody>,
}

impl FunctionNodeBuilder {
    /// Append an input parameter.
    pub fn input(mut self, name: impl Into<String>) -> Self {
        self.signature.inputs.push(name.into());
        self
    }

    /// Append an output value name.
    pub fn output(mut self, name: impl Into<String>) -> Self {
        self.signature.outputs.push(name.into());
        self
    }

    /// Declare a default value for an input.
    pub fn default_value(mut self, input: impl Into<String>, value: serde_json::Value) -> Self {
        self.signature.defaults.insert(input.into(), value);
        self
    }

    /// Attach a best-effort type tag to an input.
    pub fn input_type(mut self, input: impl Into<String>, tag: impl Into<String>) -> Self {
        self.signature.input_types.insert(input.into(), tag.into());
        self
    }

    /// Attach a best-effort type tag to an output.
    pub fn output_type(mut self, output: impl Into<String>, tag: impl Into<String>) -> Self {
        self.signature.output_types.insert(output.into(), tag.into());
        self
    }

    /// Mark results of this node as cacheable.
    pub fn cacheable(mut self, cacheable: bool) -> Self {
        self.signature.cacheable = cacheable;
        self
    }

    /// Set the implementation identity folded into the fingerprint.
    pub fn impl_tag(mut self, tag: impl Into<String>) -> Self {
        self.signature.impl_tag = tag.into();
        self
    }

    /// Append an input rename to the chain.
    pub fn rename_input(mut self, old: impl Into<String>, new: impl Into<String>) -> Self {
        self.signature.renames.push(Rename {
            kind: RenameKind::Input,
            old: old.into(),
            new: new.into(),
        });
        self
    }

    /// Append an output rename to the chain.
    pub fn rename_output(mut self, old: impl Into<String>, new: impl Into<String>) -> Self {
        self.signature.renames.push(Rename {
            kind: RenameKind::Output,
            old: old.into(),
            new: new.into(),
        });
        self
    }

    /// Use a synchronous body.
    pub fn sync<F>(mut self, f: F) -> Self
    where
        F: Fn(InputMap) -> Result<serde_json::Value> + Send + Sync + 'static,
    {
        self.body = Some(FnBody::Sync(Arc::new(f)));
        self
    }

    /// Use an asynchronous body. Marks the node as requiring async execution.
    pub fn run_async<F>(mut self, f: F) -> Self
    where
        F: Fn(InputMap) -> BoxFuture<'static, Result<serde_json::Value>> + Send + Sync + 'static,
    {
        self.body = Some(FnBody::Async(Arc::new(f)));
        self.signature.is_async = true;
        self
    }

    /// Use a sequence-producing body; the sequence is drained eagerly into an
    /// array at invocation time.
    pub fn sequence<F, I>(mut self, f: F) -> Self
    where
        F: Fn(InputMap) -> Result<I> + Send + Sync + 'static,
        I: Iterator<Item = serde_json::Value> + Send + 'static,
    {
        self.body = Some(FnBody::Sequence(Arc::new(move |inputs| {
            f(inputs).map(|iter| Box::new(iter) as Box<dyn Iterator<Item = serde_json::Value> + Send>)
        })));
        self
    }

    /// Finalize the signature (applying the rename chain) and build the node.
    pub fn build(mut self) -> Result<Node> {
        let body = self.body.ok_or_else(|| {
            GraphError::config(format!(
                "node '{}' has no body; call .sync(), .run_async(), or .sequence() before .build()",
                self.signature.name
            ))
        })?;
        apply_renames(&mut self.signature)?;
        Ok(Node::Function(FunctionNode {
            signature: self.signature,
            body,
        }))
    }
}

/// Apply the recorded rename chain to the declared names, in order.
fn apply_renames(signature: &mut NodeSignature) -> Result<()> {
    for i in 0..signature.renames.len() {
        let rename = signature.renames[i].clone();
        let names = match rename.kind {
            RenameKind::Input => &signature.inputs,
            RenameKind::Output => &signature.outputs,
        };
        let idx = names.iter().position(|n| *n == rename.old).ok_or_else(|| {
            GraphError::config(format!(
                "node '{}': cannot apply rename '{}': no such name at that point in the chain ({})",
                signature.name,
                rename,
                signature.chain_description()
            ))
        })?;
        match rename.kind {
            RenameKind::Input => signature.inputs[idx] = rename.new.clone(),
            RenameKind::Output => signature.outputs[idx] = rename.new.clone(),
        }
        if rename.kind == RenameKind::Input {
            if let Some(default) = signature.defaults.remove(&rename.old) {
                signature.defaults.insert(rename.new.clone(), default);
            }
            if let Some(tag) = signature.input_types.remove(&rename.old) {
                signature.input_types.insert(rename.new.clone(), tag);
            }
        } else if let Some(tag) = signature.output_types.remove(&rename.old) {
            signature.output_types.insert(rename.new.clone(), tag);
        }
    }
    Ok(())
}

/// Gate with an ordered candidate target set.
#[derive(Clone)]
pub struct RouteNode {
    /// Declared signature; outputs are always empty (a gate carries no data).
    pub signature: NodeSignature,
    /// Ordered candidate targets: node names or [`END`].
    pub targets: Vec<String>,
    /// Whether the router may activate several targets at once.
    pub multi: bool,
    router: RouterFn,
}

impl std::fmt::Debug for RouteNode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RouteNode")
            .field("name", &self.signature.name)
            .field("targets", &self.targets)
            .field("multi", &self.multi)
            .finish()
    }
}

impl RouteNode {
    /// Build a single-target routing gate.
    pub fn single<F>(
        name: impl Into<String>,
        inputs: impl IntoIterator<Item = impl Into<String>>,
        targets: impl IntoIterator<Item = impl Into<String>>,
        router: F,
    ) -> Node
    where
        F: Fn(InputMap) -> Result<RouteDecision> + Send + Sync + 'static,
    {
        Self::new(name, inputs, targets, false, router)
    }

    /// Build a multi-target routing gate.
    pub fn multi<F>(
        name: impl Into<String>,
        inputs: impl IntoIterator<Item = impl Into<String>>,
        targets: impl IntoIterator<Item = impl Into<String>>,
        router: F,
    ) -> Node
    where
        F: Fn(InputMap) -> Result<RouteDecision> + Send + Sync + 'static,
    {
        Self::new(name, inputs, targets, true, router)
    }

    fn new<F>(
        name: impl Into<String>,
        inputs: impl IntoIterator<Item = impl Into<String>>,
        targets: impl IntoIterator<Item = impl Into<String>>,
        multi: bool,
        router: F,
    ) -> Node
    where
        F: Fn(InputMap) -> Result<RouteDecision> + Send + Sync + 'static,
    {
        let mut signature = NodeSignature::new(name);
        signature.inputs = inputs.into_iter().map(Into::into).collect();
        Node::Route(RouteNode {
            signature,
            targets: targets.into_iter().map(Into::into).collect(),
            multi,
            router: Arc::new(router),
        })
    }

    /// Invoke the router and validate the decision against the declared
    /// target set and routing arity.
    pub fn decide(&self, inputs: InputMap) -> Result<RouteDecision> {
        let decision = (self.router)(inputs)?;
        let check = |t: &String| -> Result<()> {
            if t != END && !self.targets.iter().any(|c| c == t) {
                return Err(GraphError::node_failed(
                    &self.signature.name,
                    format!(
                        "router decided undeclared target '{t}'; declared candidates: {}",
                        self.targets.join(", ")
                    ),
                ));
            }
            Ok(())
        };
        match &decision {
            RouteDecision::End => {}
            RouteDecision::Target(t) => check(t)?,
            RouteDecision::Targets(ts) => {
                if !self.multi {
                    return Err(GraphError::node_failed(
                        &self.signature.name,
                        "router returned multiple targets but this gate is single-target",
                    ));
                }
                for t in ts {
                    check(t)?;
                }
            }
        }
        Ok(decision)
    }
}

/// Two-way gate over a boolean condition.
#[derive(Clone)]
pub struct IfElseNode {
    /// Declared signature; outputs are always empty.
    pub signature: NodeSignature,
    /// Target when the condition is true (node name or [`END`]).
    pub then_target: String,
    /// Target when the condition is false (node name or [`END`]).
    pub else_target: String,
    condition: ConditionFn,
}

impl std::fmt::Debug for IfElseNode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IfElseNode")
            .field("name", &self.signature.name)
            .field("then_target", &self.then_target)
            .field("else_target", &self.else_target)
            .finish()
    }
}

impl IfElseNode {
    /// Build a two-way gate.
    pub fn new<F>(
        name: impl Into<String>,
        inputs: impl IntoIterator<Item = impl Into<String>>,
        then_target: impl Into<String>,
        else_target: impl Into<String>,
        condition: F,
    ) -> Node
    where
        F: Fn(InputMap) -> Result<bool> + Send + Sync + 'static,
    {
        let mut signature = NodeSignature::new(name);
        signature.inputs = inputs.into_iter().map(Into::into).collect();
        Node::IfElse(IfElseNode {
            signature,
            then_target: then_target.into(),
            else_target: else_target.into(),
            condition: Arc::new(condition),
        })
    }

    /// Evaluate the condition into a routing decision.
    pub fn decide(&self, inputs: InputMap) -> Result<RouteDecision> {
        let target = if (self.condition)(inputs)? {
            &self.then_target
        } else {
            &self.else_target
        };
        if target == END {
            Ok(RouteDecision::End)
        } else {
            Ok(RouteDecision::Target(target.clone()))
        }
    }

    /// Both candidate targets, in then/else order.
    pub fn targets(&self) -> [&str; 2] {
        [&self.then_target, &self.else_target]
    }
}

/// A whole graph embedded as one node of a parent graph.
///
/// The wrapped graph is exclusively owned; invocation recursively runs it
/// through the same runner machinery against a fresh child state. A
/// map-over annotation instead runs it once per broadcast item, each item
/// against its own fully isolated state, and aggregates every output into an
/// order-preserving list.
#[derive(Debug, Clone)]
pub struct GraphNode {
    /// Derived signature: inputs are the wrapped graph's external inputs,
    /// outputs its produced (or selected) value names.
    pub signature: NodeSignature,
    /// The wrapped graph.
    pub graph: Graph,
    /// Optional per-item broadcast annotation.
    pub map_over: Option<MapOver>,
}

impl GraphNode {
    /// Wrap `graph` as a node named `name`.
    ///
    /// The signature is derived from the wrapped graph: required and seed
    /// parameters become inputs, optional parameters become defaulted inputs,
    /// and the graph's selected (or all produced) value names become outputs.
    pub fn new(name: impl Into<String>, graph: Graph) -> Result<Node> {
        Self::build(name, graph, None)
    }

    /// Wrap `graph` as a mapped node: each of `params` carries a list of
    /// per-item values, combined per `mode`, and every output becomes a list
    /// aggregated in item order.
    pub fn mapped(
        name: impl Into<String>,
        graph: Graph,
        params: impl IntoIterator<Item = impl Into<String>>,
        mode: MapMode,
    ) -> Result<Node> {
        Self::build(
            name,
            graph,
            Some(MapOver {
                params: params.into_iter().map(Into::into).collect(),
                mode,
            }),
        )
    }

    fn build(name: impl Into<String>, graph: Graph, map_over: Option<MapOver>) -> Result<Node> {
        let name = name.into();
        let spec = graph.input_spec();
        let mut signature = NodeSignature::new(&name);
        signature.inputs.extend(spec.required.iter().cloned());
        signature.inputs.extend(spec.seeds.iter().cloned());
        for param in &spec.optional {
            signature.inputs.push(param.clone());
            if let Some(default) = graph.default_for(param) {
                signature.defaults.insert(param.clone(), default.clone());
            }
        }
        signature.outputs = graph.output_names();
        signature.is_async = graph.requires_async();
        if let Some(map_over) = &map_over {
            for param in &map_over.params {
                if !signature.inputs.iter().any(|i| i == param) {
                    return Err(GraphError::config(format!(
                        "graph node '{name}': map-over parameter '{param}' is not an external input of the wrapped graph"
                    )));
                }
            }
            if map_over.params.is_empty() {
                return Err(GraphError::config(format!(
                    "graph node '{name}': map-over requires at least one parameter"
                )));
            }
            if graph.contains_interrupt() {
                return Err(GraphError::config(format!(
                    "graph node '{name}': a mapped graph cannot contain interrupt nodes"
                )));
            }
        }
        Ok(Node::Graph(GraphNode {
            signature,
            graph,
            map_over,
        }))
    }
}

/// Pause point awaiting an externally supplied response.
///
/// When a response for the designated output has been provided, invocation
/// returns it as a normal output; otherwise the node signals
/// [`NodeOutcome::Pause`] — the one variant whose result is a state-machine
/// signal rather than data.
#[derive(Debug, Clone)]
pub struct InterruptNode {
    /// Declared signature; exactly one output (the response value name).
    pub signature: NodeSignature,
}

impl InterruptNode {
    /// Build an interrupt node that pauses the run until `output` is
    /// supplied via the run options.
    pub fn new(
        name: impl Into<String>,
        inputs: impl IntoIterator<Item = impl Into<String>>,
        output: impl Into<String>,
    ) -> Node {
        let mut signature = NodeSignature::new(name);
        signature.inputs = inputs.into_iter().map(Into::into).collect();
        signature.outputs = vec![output.into()];
        Node::Interrupt(InterruptNode { signature })
    }

    /// The designated response output name.
    pub fn output(&self) -> &str {
        &self.signature.outputs[0]
    }

    /// Resolve to outputs when a response is present, otherwise pause.
    pub fn invoke(&self, response: Option<serde_json::Value>) -> NodeOutcome {
        match response {
            Some(value) => NodeOutcome::Outputs(OutputMap::from([(self.output().to_string(), value)])),
            None => NodeOutcome::Pause,
        }
    }
}

/// Result of one node invocation, as seen by the superstep executor.
#[derive(Debug, Clone)]
pub enum NodeOutcome {
    /// Normal data outputs to merge into state.
    Outputs(OutputMap),
    /// A gate's routing decision to record.
    Decision(RouteDecision),
    /// An interrupt node with no supplied response; the run pauses.
    Pause,
}

/// Closed union over the five node kinds.
///
/// The executors match this exhaustively; adding a kind is a compile-time
/// event across the whole engine.
#[derive(Debug, Clone)]
pub enum Node {
    /// Plain computation.
    Function(FunctionNode),
    /// Routing gate with a candidate target set.
    Route(RouteNode),
    /// Two-way boolean gate.
    IfElse(IfElseNode),
    /// Nested graph.
    Graph(GraphNode),
    /// Pause point.
    Interrupt(InterruptNode),
}

impl Node {
    /// The declared signature of any variant.
    pub fn signature(&self) -> &NodeSignature {
        match self {
            Node::Function(n) => &n.signature,
            Node::Route(n) => &n.signature,
            Node::IfElse(n) => &n.signature,
            Node::Graph(n) => &n.signature,
            Node::Interrupt(n) => &n.signature,
        }
    }

    /// Node name, unique within a graph.
    pub fn name(&self) -> &str {
        &self.signature().name
    }

    /// Ordered input parameter names.
    pub fn inputs(&self) -> &[String] {
        &self.signature().inputs
    }

    /// Output value names; empty for gates and side-effect-only nodes.
    pub fn outputs(&self) -> &[String] {
        &self.signature().outputs
    }

    /// Whether `input` has a declared default.
    pub fn has_default(&self, input: &str) -> bool {
        self.signature().defaults.contains_key(input)
    }

    /// Declared default for `input`, if any.
    pub fn default_for(&self, input: &str) -> Option<&serde_json::Value> {
        self.signature().defaults.get(input)
    }

    /// Best-effort type tag for an input.
    pub fn input_type(&self, input: &str) -> Option<&str> {
        self.signature().input_types.get(input).map(String::as_str)
    }

    /// Best-effort type tag for an output.
    pub fn output_type(&self, output: &str) -> Option<&str> {
        self.signature().output_types.get(output).map(String::as_str)
    }

    /// Whether this node is a gate (Route or IfElse).
    pub fn is_gate(&self) -> bool {
        matches!(self, Node::Route(_) | Node::IfElse(_))
    }

    /// For gates: the declared candidate targets and whether routing is
    /// single-target. `None` for non-gates.
    pub fn gate_targets(&self) -> Option<(Vec<&str>, bool)> {
        match self {
            Node::Route(n) => Some((n.targets.iter().map(String::as_str).collect(), !n.multi)),
            Node::IfElse(n) => Some((n.targets().to_vec(), true)),
            _ => None,
        }
    }

    /// Whether invocation requires an asynchronous execution context.
    pub fn requires_async(&self) -> bool {
        self.signature().is_async
    }

    /// Whether this node participates in the node result cache.
    pub fn cacheable(&self) -> bool {
        matches!(self, Node::Function(_)) && self.signature().cacheable
    }

    /// Whether this node (or, for graph nodes, its wrapped graph) contains
    /// an interrupt.
    pub fn contains_interrupt(&self) -> bool {
        match self {
            Node::Interrupt(_) => true,
            Node::Graph(n) => n.graph.contains_interrupt(),
            _ => false,
        }
    }

    /// Structural fingerprint: a stable hex digest over the node's name and
    /// implementation identity, independent of runtime state.
    pub fn fingerprint(&self) -> String {
        match self {
            Node::Function(n) => n.signature.fingerprint("function", &[]),
            Node::Route(n) => {
                let extra = vec![
                    format!("targets:{}", n.targets.join(",")),
                    format!("multi:{}", n.multi),
                ];
                n.signature.fingerprint("route", &extra)
            }
            Node::IfElse(n) => {
                let extra = vec![format!("then:{}", n.then_target), format!("else:{}", n.else_target)];
                n.signature.fingerprint("if_else", &extra)
            }
            Node::Graph(n) => {
                let mut extra = vec![format!("subgraph:{}", n.graph.fingerprint())];
                if let Some(map_over) = &n.map_over {
                    extra.push(format!("map_over:{}:{:?}", map_over.params.join(","), map_over.mode));
                }
                n.signature.fingerprint("graph", &extra)
            }
            Node::Interrupt(n) => n.signature.fingerprint("interrupt", &[]),
        }
    }
}
