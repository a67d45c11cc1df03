//! Issue detection over a validated strict graph.
//!
//! Detectors run in a fixed order and each may report any number of issues:
//!
//! 1. `unsupported_inference`: an inference step rejected by the AF view, or
//!    whose conclusion the prover refutes from the exported axioms
//! 2. `circular_support`: strongly connected components of the support
//!    relation (support edges plus premise references)
//! 3. `edge_mismatch`: support edges whose rationale reads like an attack
//!    (refute, contradict, however)
//! 4. `contradiction_unresolved`: complementary accepted atoms with no attack
//!    between their nodes, and mutual attacks where neither side is defeated
//! 5. `weak_scheme_instantiation`: scheme-tagged rules whose backing
//!    requirements have no matching premise content
//! 6. `goal_unreachable`: the goal is not accepted, unless already reported
//!    as an unsupported inference
//!
//! Finding an issue says nothing about whether a repair exists.

use std::collections::{BTreeSet, HashMap};
use std::fmt;

use petgraph::algo::tarjan_scc;
use petgraph::graph::{DiGraph, NodeIndex};
use serde::{Deserialize, Serialize};

use crate::argumentation::{Acceptance, AcceptanceView, AttackGraph, Semantics};
use crate::config::{MendConfig, SchemeRequirement};
use crate::error::{ExportError, MendResult};
use crate::fol::prover::{ProofOutcome, ProofTask, Prover};
use crate::fol::{FolExporter, GoalSelection, NamedFormula, closed_statement};
use crate::model::{Atom, Node, NodeId, Premise, Statement, StrictGraph};
use crate::validate;

// ---------------------------------------------------------------------------
// Issues
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueKind {
    UnsupportedInference,
    CircularSupport,
    EdgeMismatch,
    ContradictionUnresolved,
    WeakSchemeInstantiation,
    GoalUnreachable,
}

impl fmt::Display for IssueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::UnsupportedInference => "unsupported_inference",
            Self::CircularSupport => "circular_support",
            Self::EdgeMismatch => "edge_mismatch",
            Self::ContradictionUnresolved => "contradiction_unresolved",
            Self::WeakSchemeInstantiation => "weak_scheme_instantiation",
            Self::GoalUnreachable => "goal_unreachable",
        };
        f.write_str(s)
    }
}

/// What a detector observed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Evidence {
    Inference {
        af_rejected: bool,
        /// Entailment check of the conclusion; absent when no check ran.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        fol: Option<ProofOutcome>,
        no_premises: bool,
    },
    Cycle {
        nodes: Vec<NodeId>,
    },
    EdgeRationale {
        source: NodeId,
        target: NodeId,
        rationale: String,
        cue: String,
    },
    ConflictingAtoms {
        atom: Atom,
        positive: NodeId,
        negative: NodeId,
    },
    MutualAttack {
        first: NodeId,
        second: NodeId,
    },
    MissingBacking {
        scheme: String,
        missing: Vec<String>,
    },
    GoalRejected {
        semantics: Semantics,
        acceptance: Acceptance,
        extension_count: usize,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Issue {
    /// `I-001`, `I-002`, … in detection order.
    pub id: String,
    pub kind: IssueKind,
    pub targets: Vec<NodeId>,
    pub evidence: Evidence,
    pub detector: String,
    pub notes: String,
}

impl Issue {
    pub fn primary_target(&self) -> Option<&NodeId> {
        self.targets.first()
    }

    /// Unsupported because the AF view rejects the node.
    pub fn is_af_rejection(&self) -> bool {
        matches!(
            self.evidence,
            Evidence::Inference {
                af_rejected: true,
                ..
            }
        )
    }
}

/// Everything the detectors saw, plus their issues.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Diagnosis {
    pub goal: GoalSelection,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub acceptance: Option<AcceptanceView>,
    /// Why the AF view is missing.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub af_inconclusive: Option<String>,
    pub issues: Vec<Issue>,
    /// Inference steps whose entailment check was unknown or unavailable.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fol_unverified: Vec<NodeId>,
}

impl Diagnosis {
    pub fn is_clean(&self) -> bool {
        self.issues.is_empty()
    }

    pub fn of_kind(&self, kind: IssueKind) -> impl Iterator<Item = &Issue> {
        self.issues.iter().filter(move |i| i.kind == kind)
    }
}

/// The AF projection and its acceptance view under the configured reading.
pub fn acceptance_view(strict: &StrictGraph, config: &MendConfig) -> (AttackGraph, Result<AcceptanceView, String>) {
    let af = AttackGraph::from_strict(strict);
    let view = AcceptanceView::compute(
        &af,
        config.semantics,
        config.acceptance,
        config.limits.max_search_arguments,
    )
    .map_err(|e| e.to_string());
    (af, view)
}

// ---------------------------------------------------------------------------
// Diagnoser
// ---------------------------------------------------------------------------

pub struct Diagnoser<'a> {
    config: &'a MendConfig,
    prover: &'a dyn Prover,
}

struct Findings {
    issues: Vec<Issue>,
}

impl Findings {
    fn push(
        &mut self,
        kind: IssueKind,
        targets: Vec<NodeId>,
        evidence: Evidence,
        detector: &str,
        notes: String,
    ) {
        let id = format!("I-{:03}", self.issues.len() + 1);
        tracing::info!(issue = %id, %kind, targets = ?targets, "issue detected");
        self.issues.push(Issue {
            id,
            kind,
            targets,
            evidence,
            detector: detector.to_string(),
            notes,
        });
    }
}

impl<'a> Diagnoser<'a> {
    pub fn new(config: &'a MendConfig, prover: &'a dyn Prover) -> Self {
        Self { config, prover }
    }

    pub fn diagnose(&self, strict: &StrictGraph, goal: Option<&NodeId>) -> MendResult<Diagnosis> {
        validate::check(strict).map_err(|source| ExportError::Invalid { source })?;

        let selection = GoalSelection::resolve(strict, goal);
        if let Some(g) = selection.goal().filter(|g| !strict.graph.contains(g.as_str())) {
            return Err(ExportError::UnknownGoal { goal: g.to_string() }.into());
        }

        let (af, view) = acceptance_view(strict, self.config);
        let (view, af_inconclusive) = match view {
            Ok(v) => (Some(v), None),
            Err(reason) => {
                tracing::warn!(%reason, "AF acceptance inconclusive; AF detectors skipped");
                (None, Some(reason))
            }
        };
        let axioms = FolExporter::new(self.config.fol_mode).axioms(strict);

        let mut findings = Findings { issues: Vec::new() };
        let fol_unverified =
            self.unsupported_inferences(strict, &af, view.as_ref(), &axioms, &mut findings);
        circular_support(strict, &mut findings);
        edge_mismatches(strict, &mut findings);
        contradictions(strict, &af, view.as_ref(), &mut findings);
        weak_schemes(strict, &self.config.schemes, &mut findings);
        if let (Some(goal), Some(view)) = (selection.goal(), view.as_ref()) {
            goal_reachability(goal, &af, view, &mut findings);
        }

        tracing::info!(
            issues = findings.issues.len(),
            goal = ?selection.goal(),
            "diagnosis complete"
        );
        Ok(Diagnosis {
            goal: selection,
            acceptance: view,
            af_inconclusive,
            issues: findings.issues,
            fol_unverified,
        })
    }

    /// Returns the steps whose FOL check was undecided.
    fn unsupported_inferences(
        &self,
        strict: &StrictGraph,
        af: &AttackGraph,
        view: Option<&AcceptanceView>,
        axioms: &[NamedFormula],
        findings: &mut Findings,
    ) -> Vec<NodeId> {
        let mut unverified = Vec::new();
        for node in strict
            .graph
            .nodes
            .iter()
            .filter(|n| n.is_inference_step() && !n.is_implicit_rule())
        {
            let Some(conclusion) = &node.conclusion else { continue };
            let af_rejected = view.is_some_and(|v| {
                af.contains(node.id.as_str()) && !v.is_accepted(node.id.as_str())
            });

            let task = ProofTask::entailment(
                format!("support_{}", node.id),
                axioms,
                closed_statement(conclusion),
            );
            let outcome = self.prover.prove(&task, self.config.prover.timeout());
            let fol_failed = outcome.status.is_refuted();
            if !fol_failed && !outcome.status.is_proved() {
                unverified.push(node.id.clone());
            }

            if af_rejected || fol_failed {
                let no_premises = node.premises.is_empty();
                let reason = match (af_rejected, fol_failed) {
                    (true, true) => "rejected by the AF view and not entailed",
                    (true, false) => "rejected by the AF view",
                    _ if no_premises => "no premises provided and not entailed",
                    _ => "premises do not entail the conclusion",
                };
                findings.push(
                    IssueKind::UnsupportedInference,
                    vec![node.id.clone()],
                    Evidence::Inference {
                        af_rejected,
                        fol: Some(outcome),
                        no_premises,
                    },
                    "inference_support",
                    format!("Inference {} lacks support: {reason}", node.id),
                );
            }
        }
        unverified
    }
}

// ---------------------------------------------------------------------------
// Circular support
// ---------------------------------------------------------------------------

fn circular_support(strict: &StrictGraph, findings: &mut Findings) {
    let mut graph: DiGraph<NodeId, ()> = DiGraph::new();
    let mut index: HashMap<&NodeId, NodeIndex> = HashMap::new();
    for node in &strict.graph.nodes {
        index.insert(&node.id, graph.add_node(node.id.clone()));
    }
    let mut link = |from: &NodeId, to: &NodeId| {
        if let (Some(&a), Some(&b)) = (index.get(from), index.get(to)) {
            graph.update_edge(a, b, ());
        }
    };
    for edge in strict.graph.supports() {
        link(&edge.source, &edge.target);
    }
    for node in &strict.graph.nodes {
        for target in node.references() {
            link(target, &node.id);
        }
    }

    let mut cycles: Vec<Vec<NodeId>> = tarjan_scc(&graph)
        .into_iter()
        .filter(|scc| scc.len() > 1)
        .map(|scc| {
            let mut members: Vec<NodeId> = scc.iter().map(|&i| graph[i].clone()).collect();
            members.sort();
            members
        })
        .collect();
    cycles.sort();

    for members in cycles {
        let names: Vec<&str> = members.iter().map(NodeId::as_str).collect();
        findings.push(
            IssueKind::CircularSupport,
            members.clone(),
            Evidence::Cycle {
                nodes: members.clone(),
            },
            "cycle_detection",
            format!("Circular support among {}", names.join(", ")),
        );
    }
}

// ---------------------------------------------------------------------------
// Edge typing
// ---------------------------------------------------------------------------

/// Words in an edge rationale that signal an attack.
const ATTACK_CUES: &[&str] = &["refute", "contradict", "however"];

fn edge_mismatches(strict: &StrictGraph, findings: &mut Findings) {
    for edge in strict.graph.supports() {
        let Some(rationale) = &edge.rationale else { continue };
        let lowered = rationale.to_lowercase();
        let Some(cue) = ATTACK_CUES.iter().find(|c| lowered.contains(*c)) else {
            continue;
        };
        findings.push(
            IssueKind::EdgeMismatch,
            vec![edge.source.clone(), edge.target.clone()],
            Evidence::EdgeRationale {
                source: edge.source.clone(),
                target: edge.target.clone(),
                rationale: rationale.clone(),
                cue: cue.to_string(),
            },
            "edge_typing",
            format!(
                "Edge {} -> {} is typed as support but its rationale suggests an attack",
                edge.source, edge.target
            ),
        );
    }
}

// ---------------------------------------------------------------------------
// Contradictions
// ---------------------------------------------------------------------------

/// Atoms a node asserts: its conclusion and inline premises.
fn asserted_atoms(node: &Node) -> impl Iterator<Item = &Atom> {
    node.conclusion
        .iter()
        .chain(node.premises.iter().filter_map(Premise::statement))
        .flat_map(|s| s.atoms.iter())
}

fn contradictions(
    strict: &StrictGraph,
    af: &AttackGraph,
    view: Option<&AcceptanceView>,
    findings: &mut Findings,
) {
    let Some(view) = view else { return };
    let accepted: Vec<&Node> = strict
        .graph
        .nodes
        .iter()
        .filter(|n| view.is_accepted(n.id.as_str()))
        .collect();

    let mut reported: BTreeSet<(NodeId, NodeId)> = BTreeSet::new();
    for (i, a) in accepted.iter().enumerate() {
        for b in &accepted[i + 1..] {
            if af.has_attack(a.id.as_str(), b.id.as_str()) || af.has_attack(b.id.as_str(), a.id.as_str()) {
                continue;
            }
            let clash = asserted_atoms(a)
                .find(|x| asserted_atoms(b).any(|y| x.contradicts(y)))
                .cloned();
            let Some(atom) = clash else { continue };
            if !reported.insert((a.id.clone(), b.id.clone())) {
                continue;
            }
            let (positive, negative) = if atom.negated {
                (b.id.clone(), a.id.clone())
            } else {
                (a.id.clone(), b.id.clone())
            };
            let shown = if atom.negated { atom.clone().negate() } else { atom.clone() };
            findings.push(
                IssueKind::ContradictionUnresolved,
                vec![a.id.clone(), b.id.clone()],
                Evidence::ConflictingAtoms {
                    atom: shown.clone(),
                    positive,
                    negative,
                },
                "contradiction_detection",
                format!(
                    "Nodes {} and {} are both accepted but disagree on {shown}",
                    a.id, b.id
                ),
            );
        }
    }

    let mut mutual: Vec<(NodeId, NodeId)> = af
        .attacks()
        .into_iter()
        .filter(|(s, t)| s < t && af.has_attack(t.as_str(), s.as_str()))
        .map(|(s, t)| (s.clone(), t.clone()))
        .collect();
    mutual.sort();
    for (first, second) in mutual {
        if view.is_defeated(first.as_str()) || view.is_defeated(second.as_str()) {
            continue;
        }
        findings.push(
            IssueKind::ContradictionUnresolved,
            vec![first.clone(), second.clone()],
            Evidence::MutualAttack {
                first: first.clone(),
                second: second.clone(),
            },
            "mutual_attack_detection",
            format!("Nodes {first} and {second} attack each other and neither is defeated"),
        );
    }
}

// ---------------------------------------------------------------------------
// Weak schemes
// ---------------------------------------------------------------------------

/// Lowercased text of everything that can back a rule: its node's premises
/// (inline and referenced) and the rule's antecedents.
fn backing_text(strict: &StrictGraph, node: &Node) -> String {
    let mut parts: Vec<String> = Vec::new();
    let mut add = |s: &Statement| {
        if let Some(t) = &s.text {
            parts.push(t.to_lowercase());
        }
        parts.extend(s.atoms.iter().map(|a| a.to_string().to_lowercase()));
    };
    for p in &node.premises {
        match p {
            Premise::Statement(s) => add(s),
            Premise::Reference { target } => {
                if let Some(s) = strict.graph.resolve_reference(target) {
                    add(s);
                }
            }
        }
    }
    if let Some(rule) = &node.rule {
        rule.antecedents.iter().for_each(&mut add);
    }
    parts.join(" ")
}

fn weak_schemes(
    strict: &StrictGraph,
    table: &crate::config::SchemeTable,
    findings: &mut Findings,
) {
    for node in &strict.graph.nodes {
        let Some(rule) = &node.rule else { continue };
        let Some(scheme) = &rule.scheme else { continue };
        let Some(requirements) = table.get(&scheme.to_lowercase()) else {
            tracing::debug!(node = %node.id, %scheme, "scheme has no backing requirements");
            continue;
        };
        let text = backing_text(strict, node);
        let missing: Vec<String> = requirements
            .iter()
            .filter(|r: &&SchemeRequirement| {
                !r.keywords.iter().any(|k| text.contains(&k.to_lowercase()))
            })
            .map(|r| r.label.clone())
            .collect();
        if missing.is_empty() {
            continue;
        }
        findings.push(
            IssueKind::WeakSchemeInstantiation,
            vec![node.id.clone()],
            Evidence::MissingBacking {
                scheme: scheme.clone(),
                missing: missing.clone(),
            },
            "scheme_analysis",
            format!("Scheme '{scheme}' lacks backing for: {}", missing.join("; ")),
        );
    }
}

// ---------------------------------------------------------------------------
// Goal reachability
// ---------------------------------------------------------------------------

fn goal_reachability(goal: &NodeId, af: &AttackGraph, view: &AcceptanceView, findings: &mut Findings) {
    let already = findings.issues.iter().any(|i| {
        i.kind == IssueKind::UnsupportedInference && i.primary_target() == Some(goal)
    });
    if already || !af.contains(goal.as_str()) || view.is_accepted(goal.as_str()) {
        return;
    }
    findings.push(
        IssueKind::GoalUnreachable,
        vec![goal.clone()],
        Evidence::GoalRejected {
            semantics: view.semantics,
            acceptance: view.acceptance,
            extension_count: view.extension_count,
        },
        "goal_reachability",
        format!(
            "Goal {goal} is not accepted under {} semantics",
            view.semantics
        ),
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fol::horn::HornProver;
    use crate::fol::prover::NoProver;
    use crate::model::{ArgumentGraph, Edge, Lexicon, Rule, Term};

    fn stmt(pred: &str, args: &[&str]) -> Statement {
        let terms = args
            .iter()
            .map(|a| {
                if a.chars().next().is_some_and(char::is_uppercase) {
                    Term::variable(*a)
                } else {
                    Term::constant(*a)
                }
            })
            .collect();
        Statement::from_atoms(vec![Atom::new(pred, terms)])
    }

    fn rule(ants: Vec<Statement>, cons: Vec<Statement>) -> Rule {
        Rule {
            name: "r".into(),
            strict: false,
            antecedents: ants,
            consequents: cons,
            exceptions: Vec::new(),
            scheme: None,
        }
    }

    fn strict(nodes: Vec<Node>, edges: Vec<Edge>) -> StrictGraph {
        let graph = ArgumentGraph { nodes, edges };
        let mut lexicon = Lexicon::new();
        for pred in graph.predicate_arities().keys() {
            lexicon.ensure(pred);
        }
        StrictGraph::new("", graph, lexicon)
    }

    fn fact(id: &str, s: Statement) -> Node {
        let mut n = Node::new(id);
        n.conclusion = Some(s);
        n
    }

    fn step(id: &str, premise: Option<&str>, r: Rule, conclusion: Statement) -> Node {
        let mut n = Node::new(id);
        if let Some(p) = premise {
            n.premises.push(Premise::Reference { target: NodeId::new(p) });
        }
        n.rule = Some(r);
        n.conclusion = Some(conclusion);
        n
    }

    fn diagnose(graph: &StrictGraph, config: &MendConfig, goal: Option<&str>) -> Diagnosis {
        let prover = HornProver::default();
        let goal = goal.map(NodeId::new);
        Diagnoser::new(config, &prover)
            .diagnose(graph, goal.as_ref())
            .unwrap()
    }

    fn rain_rule() -> Rule {
        rule(vec![stmt("raining", &["X"])], vec![stmt("wet", &["X"])])
    }

    #[test]
    fn supported_inference_is_clean() {
        let g = strict(
            vec![
                fact("F1", stmt("raining", &["city"])),
                step("S1", Some("F1"), rain_rule(), stmt("wet", &["city"])),
            ],
            vec![],
        );
        let d = diagnose(&g, &MendConfig::default(), None);
        assert!(d.is_clean(), "unexpected issues: {:?}", d.issues);
        assert_eq!(d.goal.goal(), Some(&NodeId::new("S1")));
    }

    #[test]
    fn missing_premise_is_unsupported() {
        let g = strict(vec![step("S1", None, rain_rule(), stmt("wet", &["city"]))], vec![]);
        let d = diagnose(&g, &MendConfig::default(), None);
        let issues: Vec<&Issue> = d.of_kind(IssueKind::UnsupportedInference).collect();
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].id, "I-001");
        assert!(!issues[0].is_af_rejection());
        assert!(matches!(
            issues[0].evidence,
            Evidence::Inference { no_premises: true, .. }
        ));
        assert!(d.of_kind(IssueKind::GoalUnreachable).next().is_none());
    }

    #[test]
    fn mutual_attack_blocks_goal_under_grounded() {
        let g = strict(
            vec![
                fact("A", stmt("safe", &["plan"])),
                fact("B", Statement::from_atoms(vec![Atom::new("safe", vec![Term::constant("plan")]).negate()])),
            ],
            vec![Edge::attack("A", "B"), Edge::attack("B", "A")],
        );
        let d = diagnose(&g, &MendConfig::default(), Some("A"));
        assert!(d.acceptance.as_ref().unwrap().accepted.is_empty());
        let kinds: Vec<IssueKind> = d.issues.iter().map(|i| i.kind).collect();
        assert_eq!(
            kinds,
            vec![IssueKind::ContradictionUnresolved, IssueKind::GoalUnreachable]
        );
        assert!(matches!(d.issues[0].evidence, Evidence::MutualAttack { .. }));
    }

    #[test]
    fn unattacked_contradiction_is_reported() {
        let g = strict(
            vec![
                fact("A", stmt("safe", &["plan"])),
                fact("B", Statement::from_atoms(vec![Atom::new("safe", vec![Term::constant("plan")]).negate()])),
            ],
            vec![],
        );
        let config = MendConfig {
            prover: crate::config::ProverConfig {
                backend: crate::config::ProverBackend::None,
                ..Default::default()
            },
            ..MendConfig::default()
        };
        let prover = NoProver::new("off");
        let d = Diagnoser::new(&config, &prover).diagnose(&g, None).unwrap();
        assert_eq!(d.issues.len(), 1);
        match &d.issues[0].evidence {
            Evidence::ConflictingAtoms { positive, negative, .. } => {
                assert_eq!(positive.as_str(), "A");
                assert_eq!(negative.as_str(), "B");
            }
            other => panic!("unexpected evidence {other:?}"),
        }
    }

    #[test]
    fn support_cycle_is_detected() {
        let g = strict(
            vec![
                step("S1", Some("S2"), rain_rule(), stmt("wet", &["city"])),
                step("S2", Some("S1"), rain_rule(), stmt("wet", &["town"])),
            ],
            vec![],
        );
        let d = diagnose(&g, &MendConfig::default(), Some("S1"));
        let cycle: Vec<&Issue> = d.of_kind(IssueKind::CircularSupport).collect();
        assert_eq!(cycle.len(), 1);
        assert_eq!(cycle[0].targets, vec![NodeId::new("S1"), NodeId::new("S2")]);
    }

    #[test]
    fn weak_scheme_lists_missing_backing() {
        let mut r = rain_rule();
        r.scheme = Some("causal".into());
        let mut premise = stmt("raining", &["city"]);
        premise.text = Some("A study shows rain".into());
        let mut s1 = step("S1", None, r, stmt("wet", &["city"]));
        s1.premises.push(Premise::Statement(premise));
        let g = strict(vec![s1], vec![]);
        let d = diagnose(&g, &MendConfig::default(), None);
        let weak: Vec<&Issue> = d.of_kind(IssueKind::WeakSchemeInstantiation).collect();
        assert_eq!(weak.len(), 1);
        match &weak[0].evidence {
            Evidence::MissingBacking { missing, .. } => {
                assert_eq!(missing, &vec!["Are there confounding factors?".to_string()]);
            }
            other => panic!("unexpected evidence {other:?}"),
        }
    }

    #[test]
    fn support_edge_with_attacking_rationale_is_flagged() {
        let g = strict(
            vec![
                fact("F1", stmt("raining", &["city"])),
                step("S1", Some("F1"), rain_rule(), stmt("wet", &["city"])),
                fact("F2", stmt("dry", &["city"])),
            ],
            vec![
                Edge::support("F1", "S1").with_rationale("rain explains the wet streets"),
                Edge::support("F2", "S1").with_rationale("However, the streets were dry"),
                Edge::attack("F2", "F1").with_rationale("this refutes the rain report"),
            ],
        );
        let d = diagnose(&g, &MendConfig::default(), Some("S1"));
        let mismatched: Vec<&Issue> = d.of_kind(IssueKind::EdgeMismatch).collect();
        assert_eq!(mismatched.len(), 1);
        assert_eq!(mismatched[0].targets, vec![NodeId::new("F2"), NodeId::new("S1")]);
        match &mismatched[0].evidence {
            Evidence::EdgeRationale { cue, .. } => assert_eq!(cue, "however"),
            other => panic!("unexpected evidence {other:?}"),
        }
    }

    #[test]
    fn unknown_goal_is_an_error() {
        let g = strict(vec![fact("F1", stmt("raining", &["city"]))], vec![]);
        let prover = HornProver::default();
        let config = MendConfig::default();
        let err = Diagnoser::new(&config, &prover)
            .diagnose(&g, Some(&NodeId::new("nope")))
            .unwrap_err();
        assert!(err.to_string().contains("nope"));
    }
}
