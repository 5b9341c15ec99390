//! Input classification and cycle entry analysis.
//!
//! At build time every graph is analyzed once:
//!
//! - parameters no node produces are **external** — required when any
//!   consumer lacks a default, optional when every consumer has one
//! - strongly connected components of the data-edge subgraph locate cycles;
//!   a parameter produced and consumed inside the same cycle is a **seed**,
//!   which the caller supplies to break the cycle on the first pass
//! - each cycle's **entry candidates** are its non-gate members together
//!   with the seed parameters they would need; the runner checks per run
//!   that exactly one candidate parameter set is satisfiable
//!
//! Control edges never participate here: a gate pointing back into a cycle
//! does not make its inputs seeds.

use crate::graph::{Edge, EdgeKind};
use crate::node::Node;
use std::collections::{HashMap, HashSet};

/// External-input classification of a graph, as reported by
/// [`Graph::input_spec`](crate::graph::Graph::input_spec).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InputSpec {
    /// Must be supplied by the caller every run.
    pub required: Vec<String>,
    /// Consumed but defaulted everywhere; the caller may override.
    pub optional: Vec<String>,
    /// Produced inside a cycle; supplied once to break the cycle.
    pub seeds: Vec<String>,
    /// Already satisfied by [`Graph::bind`](crate::graph::Graph::bind) on
    /// this view.
    pub bound: Vec<String>,
}

/// One node a run could start a cycle from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryCandidate {
    /// Candidate node name.
    pub node: String,
    /// Inputs this node consumes that are produced within its own cycle;
    /// sorted. These must come from the caller (or defaults) to start.
    pub seed_params: Vec<String>,
}

/// One cycle (strongly connected component with a back edge).
#[derive(Debug, Clone)]
pub struct CycleInfo {
    /// Member node names, in declaration order.
    pub nodes: Vec<String>,
    /// Non-gate members as potential entry points.
    pub entries: Vec<EntryCandidate>,
}

/// Build-time analysis shared by every view of a graph.
#[derive(Debug, Clone)]
pub struct InputAnalysis {
    /// Structural classification; `bound` is always empty here.
    pub spec: InputSpec,
    /// Every cycle found in the data-edge subgraph.
    pub cycles: Vec<CycleInfo>,
}

pub(crate) fn analyze_inputs(
    nodes: &HashMap<String, Node>,
    order: &[String],
    edges: &[Edge],
    producers: &HashMap<String, Vec<String>>,
    _controlling_gates: &HashMap<String, Vec<String>>,
) -> InputAnalysis {
    let sccs = cyclic_components(order, edges);

    // value -> cycles it seeds; computed from data edges internal to a cycle
    let mut seed_set: HashSet<String> = HashSet::new();
    let mut cycles = Vec::with_capacity(sccs.len());
    for members in &sccs {
        let member_set: HashSet<&str> = members.iter().map(String::as_str).collect();
        let mut entries = Vec::new();
        for name in members {
            let node = &nodes[name];
            let mut seed_params: Vec<String> = node
                .inputs()
                .iter()
                .filter(|input| {
                    producers
                        .get(*input)
                        .map_or(false, |ps| ps.iter().any(|p| member_set.contains(p.as_str())))
                })
                .cloned()
                .collect();
            seed_params.sort();
            seed_params.dedup();
            seed_set.extend(seed_params.iter().cloned());
            if !node.is_gate() {
                entries.push(EntryCandidate {
                    node: name.clone(),
                    seed_params,
                });
            }
        }
        cycles.push(CycleInfo {
            nodes: members.clone(),
            entries,
        });
    }

    // external params: consumed but never produced
    let mut required: Vec<String> = Vec::new();
    let mut optional: Vec<String> = Vec::new();
    let mut seen: HashSet<&str> = HashSet::new();
    let mut defaulted_everywhere: HashMap<&str, bool> = HashMap::new();
    for name in order {
        let node = &nodes[name];
        for input in node.inputs() {
            if producers.contains_key(input) {
                continue;
            }
            let entry = defaulted_everywhere.entry(input).or_insert(true);
            *entry = *entry && node.has_default(input);
            seen.insert(input);
        }
    }
    for input in seen {
        if defaulted_everywhere[input] {
            optional.push(input.to_string());
        } else {
            required.push(input.to_string());
        }
    }
    required.sort();
    optional.sort();
    let mut seeds: Vec<String> = seed_set.into_iter().collect();
    seeds.sort();

    InputAnalysis {
        spec: InputSpec {
            required,
            optional,
            seeds,
            bound: Vec::new(),
        },
        cycles,
    }
}

/// Strongly connected components of the data-edge subgraph that actually
/// contain a cycle: size above one, or a single node with a self edge.
/// Members come back in declaration order.
fn cyclic_components(order: &[String], edges: &[Edge]) -> Vec<Vec<String>> {
    let index_of: HashMap<&str, usize> = order
        .iter()
        .enumerate()
        .map(|(i, n)| (n.as_str(), i))
        .collect();
    let mut adjacency: Vec<Vec<usize>> = vec![Vec::new(); order.len()];
    let mut self_edge = vec![false; order.len()];
    for edge in edges {
        if !matches!(edge.kind, EdgeKind::Data(_)) {
            continue;
        }
        let (s, t) = (index_of[edge.source.as_str()], index_of[edge.target.as_str()]);
        if s == t {
            self_edge[s] = true;
        }
        adjacency[s].push(t);
    }

    let mut tarjan = Tarjan {
        adjacency: &adjacency,
        index: vec![None; order.len()],
        lowlink: vec![0; order.len()],
        on_stack: vec![false; order.len()],
        stack: Vec::new(),
        next_index: 0,
        components: Vec::new(),
    };
    for v in 0..order.len() {
        if tarjan.index[v].is_none() {
            tarjan.visit(v);
        }
    }

    let mut result = Vec::new();
    for component in tarjan.components {
        if component.len() > 1 || self_edge[component[0]] {
            let mut members: Vec<usize> = component;
            members.sort();
            result.push(members.into_iter().map(|i| order[i].clone()).collect());
        }
    }
    result
}

struct Tarjan<'a> {
    adjacency: &'a [Vec<usize>],
    index: Vec<Option<usize>>,
    lowlink: Vec<usize>,
    on_stack: Vec<bool>,
    stack: Vec<usize>,
    next_index: usize,
    components: Vec<Vec<usize>>,
}

impl Tarjan<'_> {
    fn visit(&mut self, v: usize) {
        self.index[v] = Some(self.next_index);
        self.lowlink[v] = self.next_index;
        self.next_index += 1;
        self.stack.push(v);
        self.on_stack[v] = true;

        for i in 0..self.adjacency[v].len() {
            let w = self.adjacency[v][i];
            if self.index[w].is_none() {
                self.visit(w);
                self.lowlink[v] = self.lowlink[v].min(self.lowlink[w]);
            } else if self.on_stack[w] {
                self.lowlink[v] = self.lowlink[v].min(self.index[w].unwrap_or(0));
            }
        }

        if Some(self.lowlink[v]) == self.index[v] {
            let mut component = Vec::new();
            while let Some(w) = self.stack.pop() {
                self.on_stack[w] = false;
                component.push(w);
                if w == v {
                    break;
                }
            }
            self.components.push(component);
        }
    }
}

/// Closest candidate under a small edit-distance budget, for "did you mean"
/// hints on missing inputs.
pub(crate) fn suggest<'a>(name: &str, candidates: impl Iterator<Item = &'a str>) -> Option<String> {
    // at least 2 so a transposition typo (distance 2 under Levenshtein)
    // still gets a hint on short names
    let budget = (name.len() / 3).max(2).min(3);
    candidates
        .map(|c| (edit_distance(name, c), c))
        .filter(|(d, _)| *d > 0 && *d <= budget)
        .min_by_key(|(d, _)| *d)
        .map(|(_, c)| c.to_string())
}

fn edit_distance(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let mut previous: Vec<usize> = (0..=b.len()).collect();
    let mut current = vec![0; b.len() + 1];
    for (i, ca) in a.iter().enumerate() {
        current[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let substitution = previous[j] + usize::from(ca != cb);
            current[j + 1] = substitution.min(previous[j + 1] + 1).min(current[j] + 1);
        }
        std::mem::swap(&mut previous, &mut current);
    }
    previous[b.len()]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::Graph;
    use crate::node::{FunctionNode, IfElseNode, Node, END};
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

    #[test]
    fn linear_pipeline_has_one_required_input() {
        let g = Graph::builder("pipeline")
            .node(func("double", &["x"], &["y"]))
            .node(func("triple", &["y"], &["z"]))
            .build()
            .unwrap();
        let spec = g.input_spec();
        assert_eq!(spec.required, ["x"]);
        assert!(spec.optional.is_empty());
        assert!(spec.seeds.is_empty());
    }

    #[test]
    fn defaulted_external_input_is_optional() {
        let node = FunctionNode::builder("scale")
            .input("x")
            .input("factor")
            .output("y")
            .default_value("factor", json!(2))
            .sync(|_| Ok(json!(0)))
            .build()
            .unwrap();
        let g = Graph::builder("g").node(node).build().unwrap();
        let spec = g.input_spec();
        assert_eq!(spec.required, ["x"]);
        assert_eq!(spec.optional, ["factor"]);
    }

    #[test]
    fn self_loop_parameter_is_a_seed() {
        let g = Graph::builder("loop")
            .node(func("step", &["count"], &["count"]))
            .build()
            .unwrap();
        let spec = g.input_spec();
        assert_eq!(spec.seeds, ["count"]);
        assert!(spec.required.is_empty());
        let cycles = &g.analysis().cycles;
        assert_eq!(cycles.len(), 1);
        assert_eq!(
            cycles[0].entries,
            [EntryCandidate {
                node: "step".into(),
                seed_params: vec!["count".into()],
            }]
        );
    }

    #[test]
    fn two_node_cycle_seeds_both_internal_values() {
        let g = Graph::builder("pingpong")
            .node(func("ping", &["pong_value"], &["ping_value"]))
            .node(func("pong", &["ping_value"], &["pong_value"]))
            .build()
            .unwrap();
        let spec = g.input_spec();
        assert_eq!(spec.seeds, ["ping_value", "pong_value"]);
        let cycles = &g.analysis().cycles;
        assert_eq!(cycles.len(), 1);
        assert_eq!(cycles[0].nodes, ["ping", "pong"]);
        assert_eq!(cycles[0].entries.len(), 2);
    }

    #[test]
    fn gates_are_not_entry_candidates() {
        let g = Graph::builder("gated_loop")
            .node(IfElseNode::new("check", ["count"], "step", END, |i| {
                Ok(i["count"].as_i64().unwrap_or(0) < 3)
            }))
            .node(func("step", &["count"], &["count"]))
            .build()
            .unwrap();
        let cycles = &g.analysis().cycles;
        assert_eq!(cycles.len(), 1);
        let names: Vec<&str> = cycles[0].entries.iter().map(|e| e.node.as_str()).collect();
        assert_eq!(names, ["step"]);
    }

    #[test]
    fn control_edges_do_not_create_cycles() {
        // gate loops back over the pipeline via control only
        let g = Graph::builder("restart")
            .node(func("work", &["task"], &["report"]))
            .node(IfElseNode::new("retry", ["report"], "work", END, |_| Ok(false)))
            .build()
            .unwrap();
        assert!(g.analysis().cycles.is_empty());
        assert_eq!(g.input_spec().required, ["task"]);
    }

    #[test]
    fn binding_moves_a_parameter_to_bound() {
        let g = Graph::builder("pipeline")
            .node(func("double", &["x"], &["y"]))
            .build()
            .unwrap()
            .bind("x", json!(5))
            .unwrap();
        let spec = g.input_spec();
        assert!(spec.required.is_empty());
        assert_eq!(spec.bound, ["x"]);
    }

    #[test]
    fn suggestion_finds_near_miss() {
        assert_eq!(
            suggest("valeu", ["value", "count"].into_iter()),
            Some("value".to_string())
        );
        assert_eq!(suggest("zzzz", ["value", "count"].into_iter()), None);
        // exact match is not a suggestion
        assert_eq!(suggest("value", ["value"].into_iter()), None);
    }

    #[test]
    fn edit_distance_basics() {
        assert_eq!(edit_distance("kitten", "sitting"), 3);
        assert_eq!(edit_distance("", "abc"), 3);
        assert_eq!(edit_distance("same", "same"), 0);
    }
}
