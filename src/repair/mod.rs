//! Repair orchestration.
//!
//! Each issue is routed to a strategy:
//!
//! | issue                                      | strategy                  |
//! |--------------------------------------------|---------------------------|
//! | `goal_unreachable`                         | AF enforcement            |
//! | `unsupported_inference`, AF-rejected       | AF enforcement            |
//! | `unsupported_inference`, not entailed      | abduction                 |
//! | `weak_scheme_instantiation`                | abduction                 |
//! | `contradiction_unresolved` on the goal     | AF enforcement (goal)     |
//! | `circular_support`, other contradictions   | none                      |
//!
//! Every candidate patch is re-verified on the patched graph. Each repair
//! carries both an AF and a FOL check; the one that does not apply to the
//! patch kind says so explicitly.

pub mod patch;

use std::time::Duration;

use serde::{Deserialize, Serialize};

pub use patch::Patch;

use crate::abduce::{AbductionOutcome, AbductionProblem, Abducer};
use crate::argumentation::enforce::{
    self, Certificate, EnforcementOutcome, EnforcementTask, hard_attacks,
};
use crate::argumentation::{Acceptance, AcceptanceView, AttackGraph, Semantics};
use crate::config::MendConfig;
use crate::diagnose::{Diagnosis, Evidence, Issue, IssueKind};
use crate::fol::prover::{ProofStatus, ProofTask, Prover};
use crate::fol::{FolExporter, closed_statement};
use crate::model::{NodeId, StrictGraph};

// ---------------------------------------------------------------------------
// Verification
// ---------------------------------------------------------------------------

/// Result of one verification dimension.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Check {
    Passed,
    Failed { reason: String },
    Inconclusive { reason: String },
    Unavailable { reason: String },
    /// The check does not apply to this kind of patch.
    NotApplicable { reason: String },
}

impl Check {
    pub fn is_passed(&self) -> bool {
        matches!(self, Self::Passed)
    }
}

/// Acceptance of one node before and after a patch under one semantics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AcceptanceChange {
    pub node: NodeId,
    pub semantics: Semantics,
    /// `None` when acceptance could not be decided.
    pub before: Option<bool>,
    pub after: Option<bool>,
}

impl AcceptanceChange {
    pub fn changed(&self) -> bool {
        self.before != self.after
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Verification {
    pub semantics: Semantics,
    pub acceptance: Acceptance,
    /// Configured semantics, re-checked on the patched attack graph.
    pub af: Check,
    /// Entailment and consistency, re-checked on the patched graph.
    pub fol: Check,
    /// Target and goal acceptance under every semantics.
    pub impact: Vec<AcceptanceChange>,
    /// AF edit sets are optimal relative to the searched pool.
    pub af_optimal: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub certificate: Option<Certificate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prover_ms: Option<u64>,
}

// ---------------------------------------------------------------------------
// Repairs
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    /// Minimal edits of the attack graph.
    Af,
    /// Abduced premises.
    Abduction,
    None,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Repair {
    /// `R-001`, `R-002`, … across all issues.
    pub id: String,
    pub issue_id: String,
    pub strategy: Strategy,
    pub target: NodeId,
    pub patch: Patch,
    pub cost: usize,
    /// The hypothesis restates the goal it supports.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub trivial: bool,
    pub verification: Verification,
}

/// Why an issue ended without repairs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RepairStatus {
    Repaired { count: usize },
    /// The target already meets the goal of the strategy.
    AlreadySatisfied,
    NoRepairFound { reason: String },
    Inconclusive { reason: String },
    Unavailable { reason: String },
    NotAttempted { reason: String },
}

/// Outcome of one strategy on one issue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IssueResolution {
    pub issue_id: String,
    pub strategy: Strategy,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<NodeId>,
    pub status: RepairStatus,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RepairReport {
    pub resolutions: Vec<IssueResolution>,
    pub repairs: Vec<Repair>,
}

// ---------------------------------------------------------------------------
// Orchestrator
// ---------------------------------------------------------------------------

pub struct RepairEngine<'a> {
    config: &'a MendConfig,
    prover: &'a dyn Prover,
}

/// Strategies to run for an issue, each with its target.
fn dispatch(issue: &Issue, goal: Option<&NodeId>) -> Vec<(Strategy, Option<NodeId>)> {
    let target = issue.primary_target().cloned();
    match issue.kind {
        IssueKind::GoalUnreachable => vec![(Strategy::Af, target)],
        IssueKind::UnsupportedInference => {
            let mut out = Vec::new();
            if let Evidence::Inference { af_rejected, fol, .. } = &issue.evidence {
                if *af_rejected {
                    out.push((Strategy::Af, target.clone()));
                }
                if fol.as_ref().is_some_and(|o| o.status.is_refuted()) {
                    out.push((Strategy::Abduction, target));
                }
            }
            out
        }
        IssueKind::WeakSchemeInstantiation => vec![(Strategy::Abduction, target)],
        IssueKind::ContradictionUnresolved => match goal.filter(|g| issue.targets.contains(g)) {
            Some(g) => vec![(Strategy::Af, Some(g.clone()))],
            None => vec![(Strategy::None, None)],
        },
        IssueKind::CircularSupport | IssueKind::EdgeMismatch => vec![(Strategy::None, None)],
    }
}

impl<'a> RepairEngine<'a> {
    pub fn new(config: &'a MendConfig, prover: &'a dyn Prover) -> Self {
        Self { config, prover }
    }

    fn timeout(&self) -> Duration {
        self.config.prover.timeout()
    }

    pub fn repair(&self, strict: &StrictGraph, diagnosis: &Diagnosis) -> RepairReport {
        let goal = diagnosis.goal.goal();
        let mut report = RepairReport::default();
        for issue in &diagnosis.issues {
            for (strategy, target) in dispatch(issue, goal) {
                let (status, candidates) = match (&strategy, &target) {
                    (Strategy::Af, Some(t)) => self.enforce(strict, issue, t, goal),
                    (Strategy::Abduction, Some(t)) => self.abduce(strict, issue, t, goal),
                    (Strategy::None, _) => (
                        RepairStatus::NotAttempted {
                            reason: no_strategy_reason(issue.kind).into(),
                        },
                        Vec::new(),
                    ),
                    (_, None) => (
                        RepairStatus::NotAttempted {
                            reason: "issue has no target node".into(),
                        },
                        Vec::new(),
                    ),
                };
                let status = match status {
                    RepairStatus::Repaired { .. } => RepairStatus::Repaired {
                        count: candidates.len(),
                    },
                    other => other,
                };
                tracing::info!(issue = %issue.id, ?strategy, ?status, "issue processed");
                for mut repair in candidates {
                    repair.id = format!("R-{:03}", report.repairs.len() + 1);
                    report.repairs.push(repair);
                }
                report.resolutions.push(IssueResolution {
                    issue_id: issue.id.clone(),
                    strategy,
                    target,
                    status,
                });
            }
        }
        report
    }

    fn enforce(
        &self,
        strict: &StrictGraph,
        issue: &Issue,
        target: &NodeId,
        goal: Option<&NodeId>,
    ) -> (RepairStatus, Vec<Repair>) {
        let af = AttackGraph::from_strict(strict);
        let hard = hard_attacks(strict);
        let task = EnforcementTask {
            goal: target,
            semantics: self.config.semantics,
            acceptance: self.config.acceptance,
            search_limit: self.config.limits.max_search_arguments,
            hard: &hard,
        };
        let outcome = match enforce::enforce(&af, &task, &self.config.enforcement) {
            Ok(o) => o,
            Err(e) => {
                return (
                    RepairStatus::NotAttempted {
                        reason: e.to_string(),
                    },
                    Vec::new(),
                );
            }
        };
        match outcome {
            EnforcementOutcome::AlreadyAccepted => (RepairStatus::AlreadySatisfied, Vec::new()),
            EnforcementOutcome::Repaired {
                edits,
                cost,
                alternatives,
                certificate,
            } => {
                let repairs: Vec<Repair> = std::iter::once(edits)
                    .chain(alternatives)
                    .map(|edits| {
                        let patch = Patch::from_af_edits(strict, &edits);
                        let verification =
                            self.verify_af_patch(strict, &patch, target, goal, certificate.clone());
                        Repair {
                            id: String::new(),
                            issue_id: issue.id.clone(),
                            strategy: Strategy::Af,
                            target: target.clone(),
                            patch,
                            cost,
                            trivial: false,
                            verification,
                        }
                    })
                    .collect();
                (RepairStatus::Repaired { count: repairs.len() }, repairs)
            }
            EnforcementOutcome::NoRepair {
                ceiling, pool_size, ..
            } => (
                RepairStatus::NoRepairFound {
                    reason: format!(
                        "no edit set of size ≤ {ceiling} from a pool of {pool_size} candidates"
                    ),
                },
                Vec::new(),
            ),
            EnforcementOutcome::Inconclusive { reason } => {
                (RepairStatus::Inconclusive { reason }, Vec::new())
            }
        }
    }

    fn abduce(
        &self,
        strict: &StrictGraph,
        issue: &Issue,
        target: &NodeId,
        goal: Option<&NodeId>,
    ) -> (RepairStatus, Vec<Repair>) {
        let exporter = FolExporter::new(self.config.fol_mode);
        let problem = match AbductionProblem::for_node(strict, target, &exporter) {
            Ok(p) => p,
            Err(e) => {
                return (
                    RepairStatus::NotAttempted {
                        reason: e.to_string(),
                    },
                    Vec::new(),
                );
            }
        };
        let outcome = Abducer::new(self.prover, &self.config.abduction, self.timeout())
            .with_trivial_policy(self.config.trivial_hypotheses)
            .abduce(&problem);
        match outcome {
            AbductionOutcome::AlreadyEntailed => (RepairStatus::AlreadySatisfied, Vec::new()),
            AbductionOutcome::Found { hypotheses, .. } => {
                let repairs: Vec<Repair> = hypotheses
                    .iter()
                    .map(|h| {
                        let patch = Patch::from_hypothesis(strict, target, h);
                        let verification = self.verify_fol_patch(strict, &patch, target, goal);
                        Repair {
                            id: String::new(),
                            issue_id: issue.id.clone(),
                            strategy: Strategy::Abduction,
                            target: target.clone(),
                            patch,
                            cost: h.cardinality(),
                            trivial: h.trivial,
                            verification,
                        }
                    })
                    .collect();
                (RepairStatus::Repaired { count: repairs.len() }, repairs)
            }
            AbductionOutcome::NotFound { tried, max_atoms } => (
                RepairStatus::NoRepairFound {
                    reason: format!(
                        "none of {tried} hypotheses of at most {max_atoms} atoms verified"
                    ),
                },
                Vec::new(),
            ),
            AbductionOutcome::Inconclusive { tried, undecided } => (
                RepairStatus::Inconclusive {
                    reason: format!("{undecided} of {tried} prover calls were undecided"),
                },
                Vec::new(),
            ),
            AbductionOutcome::Unavailable { reason } => {
                (RepairStatus::Unavailable { reason }, Vec::new())
            }
        }
    }

    // -- verification -------------------------------------------------------

    fn view(&self, strict: &StrictGraph, semantics: Semantics) -> Result<AcceptanceView, String> {
        AcceptanceView::compute(
            &AttackGraph::from_strict(strict),
            semantics,
            self.config.acceptance,
            self.config.limits.max_search_arguments,
        )
        .map_err(|e| e.to_string())
    }

    fn impact(
        &self,
        before: &StrictGraph,
        after: &StrictGraph,
        nodes: &[&NodeId],
    ) -> Vec<AcceptanceChange> {
        let mut out = Vec::new();
        for semantics in [Semantics::Grounded, Semantics::Preferred, Semantics::Stable] {
            let b = self.view(before, semantics).ok();
            let a = self.view(after, semantics).ok();
            for node in nodes {
                out.push(AcceptanceChange {
                    node: (*node).clone(),
                    semantics,
                    before: b.as_ref().map(|v| v.is_accepted(node.as_str())),
                    after: a.as_ref().map(|v| v.is_accepted(node.as_str())),
                });
            }
        }
        out
    }

    fn watched<'n>(target: &'n NodeId, goal: Option<&'n NodeId>) -> Vec<&'n NodeId> {
        let mut nodes = vec![target];
        if let Some(g) = goal.filter(|g| *g != target) {
            nodes.push(g);
        }
        nodes
    }

    fn verify_af_patch(
        &self,
        strict: &StrictGraph,
        patch: &Patch,
        target: &NodeId,
        goal: Option<&NodeId>,
        certificate: Certificate,
    ) -> Verification {
        let patched = patch.apply(strict);
        let af = match self.view(&patched, self.config.semantics) {
            Ok(v) if v.is_accepted(target.as_str()) => Check::Passed,
            Ok(_) => Check::Failed {
                reason: format!("{target} is still not accepted after the edits"),
            },
            Err(reason) => Check::Inconclusive { reason },
        };
        Verification {
            semantics: self.config.semantics,
            acceptance: self.config.acceptance,
            af,
            fol: Check::NotApplicable {
                reason: "attack-graph edits do not change the first-order axioms".into(),
            },
            impact: self.impact(strict, &patched, &Self::watched(target, goal)),
            af_optimal: true,
            certificate: Some(certificate),
            prover_ms: None,
        }
    }

    fn verify_fol_patch(
        &self,
        strict: &StrictGraph,
        patch: &Patch,
        target: &NodeId,
        goal: Option<&NodeId>,
    ) -> Verification {
        let patched = patch.apply(strict);
        let exporter = FolExporter::new(self.config.fol_mode);
        let axioms = exporter.axioms(&patched);
        let conclusion = patched
            .graph
            .node(target.as_str())
            .and_then(|n| n.conclusion.as_ref());

        let (fol, prover_ms) = match conclusion {
            None => (
                Check::NotApplicable {
                    reason: format!("{target} has no conclusion"),
                },
                None,
            ),
            Some(c) => {
                let entail = self.prover.prove(
                    &ProofTask::entailment(format!("verify_{target}"), &axioms, closed_statement(c)),
                    self.timeout(),
                );
                let consistent = self.prover.prove(
                    &ProofTask::inconsistency(format!("verify_{target}_consistency"), &axioms),
                    self.timeout(),
                );
                let check = match (&entail.status, &consistent.status) {
                    (ProofStatus::Unavailable { reason }, _) | (_, ProofStatus::Unavailable { reason }) => {
                        Check::Unavailable {
                            reason: reason.clone(),
                        }
                    }
                    (_, ProofStatus::Proved) => Check::Failed {
                        reason: "patched axioms are inconsistent".into(),
                    },
                    (ProofStatus::Proved, _) => Check::Passed,
                    (ProofStatus::Unknown { reason }, _) => Check::Inconclusive {
                        reason: reason.clone(),
                    },
                    _ => Check::Failed {
                        reason: format!("{target} is not entailed after the patch"),
                    },
                };
                (check, Some(entail.elapsed_ms + consistent.elapsed_ms))
            }
        };

        let before = self.view(strict, self.config.semantics);
        let after = self.view(&patched, self.config.semantics);
        let af = match (before, after) {
            (Ok(b), Ok(a)) => {
                let (was, is) = (b.is_accepted(target.as_str()), a.is_accepted(target.as_str()));
                if was && !is {
                    Check::Failed {
                        reason: format!("{target} lost acceptance"),
                    }
                } else {
                    Check::Passed
                }
            }
            (Err(reason), _) | (_, Err(reason)) => Check::Inconclusive { reason },
        };

        Verification {
            semantics: self.config.semantics,
            acceptance: self.config.acceptance,
            af,
            fol,
            impact: self.impact(strict, &patched, &Self::watched(target, goal)),
            af_optimal: false,
            certificate: None,
            prover_ms,
        }
    }
}

fn no_strategy_reason(kind: IssueKind) -> &'static str {
    match kind {
        IssueKind::CircularSupport => "support cycles are reported, never broken automatically",
        IssueKind::EdgeMismatch => "edge kinds are reported, never retyped automatically",
        IssueKind::ContradictionUnresolved => "contradiction does not involve the goal",
        _ => "no strategy applies",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnose::Diagnoser;
    use crate::fol::horn::HornProver;
    use crate::model::{ArgumentGraph, Atom, Edge, Lexicon, Node, Rule, Statement, Term};

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

    fn strict(nodes: Vec<Node>, edges: Vec<Edge>) -> StrictGraph {
        let graph = ArgumentGraph { nodes, edges };
        let mut lexicon = Lexicon::new();
        for pred in graph.predicate_arities().keys() {
            lexicon.ensure(pred);
        }
        StrictGraph::new("", graph, lexicon)
    }

    fn run(graph: &StrictGraph, config: &MendConfig, goal: Option<&str>) -> RepairReport {
        let prover = HornProver::default();
        let goal = goal.map(NodeId::new);
        let diagnosis = Diagnoser::new(config, &prover)
            .diagnose(graph, goal.as_ref())
            .unwrap();
        RepairEngine::new(config, &prover).repair(graph, &diagnosis)
    }

    #[test]
    fn missing_premise_is_repaired_by_abduction() {
        let mut step = Node::new("S1");
        step.rule = Some(Rule {
            name: "r".into(),
            strict: false,
            antecedents: vec![stmt("raining", &["X"])],
            consequents: vec![stmt("wet", &["X"])],
            exceptions: Vec::new(),
            scheme: None,
        });
        step.conclusion = Some(stmt("wet", &["city"]));
        let g = strict(vec![step], vec![]);
        let report = run(&g, &MendConfig::default(), None);

        assert_eq!(report.resolutions.len(), 1);
        assert_eq!(report.resolutions[0].strategy, Strategy::Abduction);
        let first = &report.repairs[0];
        assert_eq!(first.id, "R-001");
        assert_eq!(first.cost, 1);
        assert!(!first.trivial);
        assert!(first.verification.fol.is_passed());
        assert!(first.verification.af.is_passed());
        assert!(first.patch.is_support_only());
        // Support-only patches leave acceptance alone.
        assert!(first.verification.impact.iter().all(|c| !c.changed()));
    }

    #[test]
    fn mutual_attack_goal_is_repaired_structurally() {
        let a = {
            let mut n = Node::new("A");
            n.conclusion = Some(stmt("safe", &["plan"]));
            n
        };
        let b = {
            let mut n = Node::new("B");
            n.conclusion = Some(stmt("risky", &["plan"]));
            n
        };
        let g = strict(vec![a, b], vec![Edge::attack("A", "B"), Edge::attack("B", "A")]);
        let report = run(&g, &MendConfig::default(), Some("A"));

        let af: Vec<&Repair> = report
            .repairs
            .iter()
            .filter(|r| r.strategy == Strategy::Af)
            .collect();
        assert!(!af.is_empty());
        assert!(af.iter().all(|r| r.cost == 1 && r.verification.af.is_passed()));
        assert!(matches!(af[0].verification.fol, Check::NotApplicable { .. }));
        assert!(af[0].verification.certificate.is_some());
    }

    #[test]
    fn cycles_are_not_repaired() {
        let mk = |id: &str, dep: &str, c: &str| {
            let mut n = Node::new(id);
            n.premises.push(crate::model::Premise::Reference { target: NodeId::new(dep) });
            n.rule = Some(Rule {
                name: "r".into(),
                strict: false,
                antecedents: vec![stmt("p", &["X"])],
                consequents: vec![stmt("p", &["X"])],
                exceptions: Vec::new(),
                scheme: None,
            });
            n.conclusion = Some(stmt("p", &[c]));
            n
        };
        let g = strict(vec![mk("S1", "S2", "a"), mk("S2", "S1", "b")], vec![]);
        let report = run(&g, &MendConfig::default(), Some("S1"));
        let cycle = report
            .resolutions
            .iter()
            .find(|r| r.strategy == Strategy::None)
            .unwrap();
        assert!(matches!(cycle.status, RepairStatus::NotAttempted { .. }));
    }
}
