//! Graph patches.
//!
//! A patch only appends nodes, appends edges and removes attack edges; it
//! never rewrites the content of an existing node. Applying a patch returns a
//! new graph.

use serde::{Deserialize, Serialize};

use crate::abduce::Hypothesis;
use crate::argumentation::enforce::{AfEdit, DEFENDER_ID};
use crate::model::{Edge, EdgeKind, Node, NodeId, NodeOrigin, StrictGraph};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Patch {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub add_nodes: Vec<Node>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub add_edges: Vec<Edge>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub remove_edges: Vec<Edge>,
    /// The attack-graph edits this patch realizes.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub af_edits: Vec<AfEdit>,
    /// Hypothesis atoms as TPTP axioms.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fol_hypotheses: Vec<String>,
}

/// First id of the form `prefix`, `prefix2`, `prefix3`, … not used in the graph.
fn fresh_id(strict: &StrictGraph, taken: &[Node], prefix: &str, numbered: bool) -> NodeId {
    let used = |id: &str| strict.graph.contains(id) || taken.iter().any(|n| n.id.as_str() == id);
    if !numbered && !used(prefix) {
        return NodeId::new(prefix);
    }
    let mut n = if numbered { 1 } else { 2 };
    loop {
        let id = format!("{prefix}{n}");
        if !used(&id) {
            return NodeId::new(id);
        }
        n += 1;
    }
}

impl Patch {
    /// Realize attack-graph edits on the strict graph. The defender argument
    /// becomes a content-free node with [`NodeOrigin::Defender`].
    pub fn from_af_edits(strict: &StrictGraph, edits: &[AfEdit]) -> Self {
        let mut patch = Patch {
            af_edits: edits.to_vec(),
            ..Default::default()
        };
        let mut defender: Option<NodeId> = None;
        for edit in edits {
            match edit {
                AfEdit::AddAttack { source, target } => {
                    patch.add_edges.push(Edge::attack(source.clone(), target.clone()));
                }
                AfEdit::RemoveAttack { source, target } => {
                    patch.remove_edges.push(Edge::attack(source.clone(), target.clone()));
                }
                AfEdit::Defend { target } => {
                    let id = match &defender {
                        Some(id) => id.clone(),
                        None => {
                            let id = fresh_id(strict, &patch.add_nodes, DEFENDER_ID, false);
                            let mut node = Node::new(id.clone());
                            node.origin = NodeOrigin::Defender;
                            node.rationale =
                                Some("Defender argument added by attack-graph enforcement".into());
                            patch.add_nodes.push(node);
                            defender = Some(id.clone());
                            id
                        }
                    };
                    patch.add_edges.push(Edge::attack(id, target.clone()));
                }
            }
        }
        patch
    }

    /// One fact node carrying the hypothesis, supporting `target`.
    pub fn from_hypothesis(strict: &StrictGraph, target: &NodeId, hypothesis: &Hypothesis) -> Self {
        let id = fresh_id(strict, &[], "H", true);
        let mut node = Node::new(id.clone());
        node.conclusion = Some(hypothesis.statement());
        node.origin = NodeOrigin::Hypothesis;
        node.rationale = Some(format!("Added by abduction to support {target}"));
        Patch {
            add_nodes: vec![node],
            add_edges: vec![Edge::support(id, target.clone())],
            fol_hypotheses: hypothesis.tptp.clone(),
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.add_nodes.is_empty() && self.add_edges.is_empty() && self.remove_edges.is_empty()
    }

    /// Only support edges and new nodes: attack-graph acceptance of existing
    /// arguments is expected to stay put.
    pub fn is_support_only(&self) -> bool {
        self.remove_edges.is_empty() && self.add_edges.iter().all(|e| e.kind == EdgeKind::Support)
    }

    /// The patched copy of `strict`.
    pub fn apply(&self, strict: &StrictGraph) -> StrictGraph {
        let mut out = strict.clone();
        out.graph.edges.retain(|e| {
            !self
                .remove_edges
                .iter()
                .any(|r| r.source == e.source && r.target == e.target && r.kind == e.kind)
        });
        out.graph.nodes.extend(self.add_nodes.iter().cloned());
        for edge in &self.add_edges {
            let exists = out
                .graph
                .edges
                .iter()
                .any(|e| e.source == edge.source && e.target == edge.target && e.kind == edge.kind);
            if !exists {
                out.graph.edges.push(edge.clone());
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fol::prover::{ProofOutcome, ProofStatus};
    use crate::model::{ArgumentGraph, Atom, Lexicon, Term};
    use std::time::Duration;

    fn mutual() -> StrictGraph {
        let graph = ArgumentGraph {
            nodes: vec![Node::new("A"), Node::new("B")],
            edges: vec![Edge::attack("A", "B"), Edge::attack("B", "A")],
        };
        StrictGraph::new("", graph, Lexicon::new())
    }

    #[test]
    fn defender_is_materialized_once() {
        let strict = mutual();
        let edits = vec![
            AfEdit::Defend { target: NodeId::new("B") },
            AfEdit::RemoveAttack {
                source: NodeId::new("B"),
                target: NodeId::new("A"),
            },
        ];
        let patch = Patch::from_af_edits(&strict, &edits);
        assert_eq!(patch.add_nodes.len(), 1);
        assert_eq!(patch.add_nodes[0].origin, NodeOrigin::Defender);
        let patched = patch.apply(&strict);
        assert_eq!(patched.graph.nodes.len(), 3);
        assert!(patched.graph.edges.contains(&Edge::attack("DEF", "B")));
        assert!(!patched.graph.edges.contains(&Edge::attack("B", "A")));
        // The input graph is untouched.
        assert_eq!(strict.graph.edges.len(), 2);
    }

    #[test]
    fn defender_id_avoids_collisions() {
        let mut strict = mutual();
        strict.graph.nodes.push(Node::new("DEF"));
        let patch = Patch::from_af_edits(&strict, &[AfEdit::Defend { target: NodeId::new("B") }]);
        assert_eq!(patch.add_nodes[0].id.as_str(), "DEF2");
    }

    #[test]
    fn hypothesis_becomes_supporting_fact() {
        let strict = mutual();
        let h = Hypothesis {
            atoms: vec![Atom::new("raining", vec![Term::constant("city")])],
            trivial: false,
            entailment: ProofOutcome::new(ProofStatus::Proved, Duration::ZERO),
            consistency: ProofOutcome::new(ProofStatus::Satisfiable, Duration::ZERO),
            tptp: vec!["fof(hyp_1, axiom, raining(city)).".into()],
        };
        let patch = Patch::from_hypothesis(&strict, &NodeId::new("A"), &h);
        assert!(patch.is_support_only());
        let node = &patch.add_nodes[0];
        assert_eq!(node.id.as_str(), "H1");
        assert!(node.is_fact());
        assert_eq!(node.origin, NodeOrigin::Hypothesis);
        assert_eq!(patch.add_edges, vec![Edge::support("H1", "A")]);
    }
}
