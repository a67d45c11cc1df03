//! Abduction: smallest ground hypothesis sets that make a goal provable.
//!
//! Candidates are ground atoms over the graph's signature, enumerated in a
//! fixed order: predicates alphabetically, arguments drawn from the goal's
//! constants before any other constant. Single atoms are tried first; pairs
//! are drawn from the head of the single-atom list only when no single atom
//! succeeds. A hypothesis is accepted when the prover proves the goal from
//! axioms ∪ H and fails to prove `$false` from the same set.

use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::config::{AbductionConfig, TrivialHypotheses};
use crate::error::ExportError;
use crate::fol::export::ExportResult;
use crate::fol::prover::{ProofOutcome, ProofStatus, ProofTask, Prover};
use crate::fol::{FolExporter, Formula, NamedFormula, closed_statement, tptp};
use crate::model::{Atom, NodeId, Statement, StrictGraph, Term, TermKind};

// ---------------------------------------------------------------------------
// Signature
// ---------------------------------------------------------------------------

/// Predicates with arities, the constants seen, and the goal's anchors.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Signature {
    pub predicates: BTreeMap<String, usize>,
    pub constants: BTreeSet<Term>,
    /// Constants of the goal, in order of first occurrence.
    pub anchors: Vec<Term>,
}

impl Signature {
    pub fn new(strict: &StrictGraph, goal: &Statement) -> Self {
        let mut predicates = BTreeMap::new();
        for (pred, arities) in strict.graph.predicate_arities() {
            if let Some(&max) = arities.iter().max() {
                predicates.insert(pred, max);
            }
        }
        let mut constants = BTreeSet::new();
        for node in &strict.graph.nodes {
            node.visit_statements(|_, s| {
                for a in &s.atoms {
                    constants.extend(a.args.iter().filter(|t| is_constant(t)).cloned());
                }
            });
        }
        let mut anchors: Vec<Term> = Vec::new();
        for t in goal.atoms.iter().flat_map(|a| &a.args) {
            if is_constant(t) && !anchors.contains(t) {
                anchors.push(t.clone());
                constants.insert(t.clone());
            }
        }
        Self {
            predicates,
            constants,
            anchors,
        }
    }

    /// Single-atom candidates in enumeration order, before any cap.
    ///
    /// Predicates of arity above two are not enumerated.
    pub fn single_candidates(&self) -> Vec<Atom> {
        let others: Vec<&Term> = self
            .constants
            .iter()
            .filter(|c| !self.anchors.contains(c))
            .collect();
        let ordered: Vec<&Term> = self.anchors.iter().chain(others.iter().copied()).collect();

        let mut out = Vec::new();
        let mut seen = HashSet::new();
        let mut push = |atom: Atom| {
            if seen.insert(atom.clone()) {
                out.push(atom);
            }
        };
        for (pred, &arity) in &self.predicates {
            match arity {
                0 => push(Atom::new(pred.clone(), Vec::new())),
                1 => {
                    for c in &ordered {
                        push(Atom::new(pred.clone(), vec![(*c).clone()]));
                    }
                }
                2 => {
                    for a in &self.anchors {
                        for b in &ordered {
                            push(Atom::new(pred.clone(), vec![a.clone(), (*b).clone()]));
                        }
                    }
                    for a in &ordered {
                        for b in &ordered {
                            push(Atom::new(pred.clone(), vec![(*a).clone(), (*b).clone()]));
                        }
                    }
                }
                _ => {}
            }
        }
        out
    }
}

fn is_constant(t: &Term) -> bool {
    !matches!(t.kind, TermKind::Variable | TermKind::Action)
}

// ---------------------------------------------------------------------------
// Problem
// ---------------------------------------------------------------------------

/// Axioms, the goal statement to entail, and the candidate signature.
#[derive(Debug, Clone)]
pub struct AbductionProblem {
    pub target: NodeId,
    pub axioms: Vec<NamedFormula>,
    pub goal: Statement,
    pub signature: Signature,
}

impl AbductionProblem {
    /// Abduce for `target`'s conclusion against the whole graph's axioms.
    pub fn for_node(strict: &StrictGraph, target: &NodeId, exporter: &FolExporter) -> ExportResult<Self> {
        let node = strict
            .graph
            .node(target.as_str())
            .ok_or_else(|| ExportError::UnknownGoal {
                goal: target.to_string(),
            })?;
        let goal = node
            .conclusion
            .clone()
            .ok_or_else(|| ExportError::GoalWithoutConclusion {
                goal: target.to_string(),
            })?;
        let signature = Signature::new(strict, &goal);
        Ok(Self {
            target: target.clone(),
            axioms: exporter.axioms(strict),
            goal,
            signature,
        })
    }

    fn goal_formula(&self) -> Formula {
        closed_statement(&self.goal)
    }

    /// Ground literals already asserted as axioms.
    fn known_facts(&self) -> HashSet<Atom> {
        self.axioms
            .iter()
            .filter_map(|a| a.formula.as_literal())
            .filter(|a| a.is_ground())
            .cloned()
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Outcome
// ---------------------------------------------------------------------------

/// A verified hypothesis set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Hypothesis {
    pub atoms: Vec<Atom>,
    /// Some atom restates the goal itself.
    pub trivial: bool,
    pub entailment: ProofOutcome,
    pub consistency: ProofOutcome,
    /// The hypothesis atoms as TPTP axioms.
    pub tptp: Vec<String>,
}

impl Hypothesis {
    pub fn cardinality(&self) -> usize {
        self.atoms.len()
    }

    /// Conjunction of the atoms, as the content of a new fact node.
    pub fn statement(&self) -> Statement {
        let text: Vec<String> = self.atoms.iter().map(Atom::to_string).collect();
        Statement::from_atoms(self.atoms.clone()).with_text(text.join(" and "))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum AbductionOutcome {
    /// The goal is provable without hypotheses.
    AlreadyEntailed,
    Found {
        hypotheses: Vec<Hypothesis>,
        tried: usize,
    },
    /// Every candidate up to the size ceiling was refuted.
    NotFound { tried: usize, max_atoms: usize },
    /// No success, and some prover calls were undecided.
    Inconclusive { tried: usize, undecided: usize },
    Unavailable { reason: String },
}

// ---------------------------------------------------------------------------
// Search
// ---------------------------------------------------------------------------

enum Verdict {
    Accepted(Hypothesis),
    Rejected,
    Undecided,
}

pub struct Abducer<'a> {
    prover: &'a dyn Prover,
    config: &'a AbductionConfig,
    timeout: Duration,
    trivial: TrivialHypotheses,
}

impl<'a> Abducer<'a> {
    pub fn new(prover: &'a dyn Prover, config: &'a AbductionConfig, timeout: Duration) -> Self {
        Self {
            prover,
            config,
            timeout,
            trivial: TrivialHypotheses::default(),
        }
    }

    pub fn with_trivial_policy(mut self, trivial: TrivialHypotheses) -> Self {
        self.trivial = trivial;
        self
    }

    pub fn abduce(&self, problem: &AbductionProblem) -> AbductionOutcome {
        let goal = problem.goal_formula();
        let baseline = self.prover.prove(
            &ProofTask::entailment(format!("baseline_{}", problem.target), &problem.axioms, goal.clone()),
            self.timeout,
        );
        match baseline.status {
            ProofStatus::Unavailable { reason } => return AbductionOutcome::Unavailable { reason },
            ProofStatus::Proved => return AbductionOutcome::AlreadyEntailed,
            _ => {}
        }

        let known = problem.known_facts();
        let mut singles = problem.signature.single_candidates();
        singles.retain(|a| !known.contains(a));
        singles.truncate(self.config.max_single_candidates);

        let limit = self.config.max_repairs_per_issue.max(1);
        let mut found: Vec<Hypothesis> = Vec::new();
        let mut tried = 0usize;
        let mut undecided = 0usize;

        for atom in &singles {
            if found.len() >= limit {
                break;
            }
            tried += 1;
            match self.verify(problem, &goal, std::slice::from_ref(atom)) {
                Ok(Verdict::Accepted(h)) => self.keep(h, &mut found),
                Ok(Verdict::Rejected) => {}
                Ok(Verdict::Undecided) => undecided += 1,
                Err(reason) => return AbductionOutcome::Unavailable { reason },
            }
        }

        if found.is_empty() && self.config.effective_max_atoms() >= 2 {
            let pool = &singles[..singles.len().min(self.config.pair_pool)];
            'pairs: for i in 0..pool.len() {
                for j in (i + 1)..pool.len() {
                    if found.len() >= limit {
                        break 'pairs;
                    }
                    tried += 1;
                    let pair = [pool[i].clone(), pool[j].clone()];
                    match self.verify(problem, &goal, &pair) {
                        Ok(Verdict::Accepted(h)) => {
                            let h = match self.minimize(problem, &goal, h) {
                                Ok(h) => h,
                                Err(reason) => return AbductionOutcome::Unavailable { reason },
                            };
                            if !found.iter().any(|f| f.atoms == h.atoms) {
                                self.keep(h, &mut found);
                            }
                        }
                        Ok(Verdict::Rejected) => {}
                        Ok(Verdict::Undecided) => undecided += 1,
                        Err(reason) => return AbductionOutcome::Unavailable { reason },
                    }
                }
            }
        }

        tracing::debug!(
            target = %problem.target,
            tried,
            found = found.len(),
            undecided,
            "abduction search finished"
        );
        if !found.is_empty() {
            AbductionOutcome::Found {
                hypotheses: found,
                tried,
            }
        } else if undecided > 0 {
            AbductionOutcome::Inconclusive { tried, undecided }
        } else {
            AbductionOutcome::NotFound {
                tried,
                max_atoms: self.config.effective_max_atoms(),
            }
        }
    }

    fn keep(&self, h: Hypothesis, found: &mut Vec<Hypothesis>) {
        if h.trivial && self.trivial == TrivialHypotheses::Suppress {
            tracing::info!(hypothesis = ?h.tptp, "trivial hypothesis suppressed");
            return;
        }
        found.push(h);
    }

    /// Entailment then consistency for axioms ∪ `atoms`.
    ///
    /// `Err` carries the reason the prover is unavailable.
    fn verify(&self, problem: &AbductionProblem, goal: &Formula, atoms: &[Atom]) -> Result<Verdict, String> {
        let hyps: Vec<NamedFormula> = atoms
            .iter()
            .enumerate()
            .map(|(i, a)| NamedFormula::axiom(format!("hyp_{}", i + 1), Formula::Literal(a.clone())))
            .collect();
        let mut axioms = problem.axioms.clone();
        axioms.extend(hyps.iter().cloned());

        let entailment = self
            .prover
            .prove(&ProofTask::entailment("abduce", &axioms, goal.clone()), self.timeout);
        match &entailment.status {
            ProofStatus::Unavailable { reason } => return Err(reason.clone()),
            ProofStatus::Proved => {}
            ProofStatus::Unknown { .. } => return Ok(Verdict::Undecided),
            _ => return Ok(Verdict::Rejected),
        }

        let consistency = self
            .prover
            .prove(&ProofTask::inconsistency("abduce_consistency", &axioms), self.timeout);
        match &consistency.status {
            ProofStatus::Unavailable { reason } => return Err(reason.clone()),
            ProofStatus::Proved => return Ok(Verdict::Rejected),
            _ => {}
        }

        Ok(Verdict::Accepted(Hypothesis {
            atoms: atoms.to_vec(),
            trivial: atoms.iter().any(|a| problem.goal.atoms.contains(a)),
            entailment,
            consistency,
            tptp: hyps.iter().map(tptp::fof).collect(),
        }))
    }

    /// Drop atoms whose removal keeps the hypothesis verified.
    fn minimize(&self, problem: &AbductionProblem, goal: &Formula, mut h: Hypothesis) -> Result<Hypothesis, String> {
        let mut i = 0;
        while h.atoms.len() > 1 && i < h.atoms.len() {
            let mut rest = h.atoms.clone();
            rest.remove(i);
            match self.verify(problem, goal, &rest)? {
                Verdict::Accepted(smaller) => h = smaller,
                _ => i += 1,
            }
        }
        Ok(h)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fol::horn::HornProver;
    use crate::fol::prover::NoProver;
    use crate::model::{ArgumentGraph, Lexicon, Node, Premise, Rule};

    fn atom(pred: &str, args: &[&str]) -> Atom {
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
        Atom::new(pred, terms)
    }

    fn stmt(pred: &str, args: &[&str]) -> Statement {
        Statement::from_atoms(vec![atom(pred, args)])
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

    fn graph(nodes: Vec<Node>) -> StrictGraph {
        let graph = ArgumentGraph {
            nodes,
            edges: Vec::new(),
        };
        let mut lexicon = Lexicon::new();
        for pred in graph.predicate_arities().keys() {
            lexicon.ensure(pred);
        }
        StrictGraph::new("", graph, lexicon)
    }

    fn missing_premise() -> StrictGraph {
        let mut step = Node::new("S1");
        step.rule = Some(rule(vec![stmt("raining", &["X"])], vec![stmt("wet", &["X"])]));
        step.conclusion = Some(stmt("wet", &["city"]));
        graph(vec![step])
    }

    fn abduce(strict: &StrictGraph, target: &str, config: &AbductionConfig) -> AbductionOutcome {
        let problem =
            AbductionProblem::for_node(strict, &NodeId::new(target), &FolExporter::default()).unwrap();
        let prover = HornProver::default();
        Abducer::new(&prover, config, Duration::from_secs(5)).abduce(&problem)
    }

    #[test]
    fn anchors_come_first() {
        let strict = missing_premise();
        let goal = stmt("wet", &["city"]);
        let mut sig = Signature::new(&strict, &goal);
        sig.constants.insert(Term::constant("attic"));
        let singles = sig.single_candidates();
        assert_eq!(singles[0], atom("raining", &["city"]));
        assert_eq!(singles[1], atom("raining", &["attic"]));
    }

    #[test]
    fn finds_missing_premise() {
        let outcome = abduce(&missing_premise(), "S1", &AbductionConfig::default());
        let AbductionOutcome::Found { hypotheses, .. } = outcome else {
            panic!("expected a hypothesis, got {outcome:?}");
        };
        assert_eq!(hypotheses[0].atoms, vec![atom("raining", &["city"])]);
        assert_eq!(hypotheses[0].cardinality(), 1);
        assert!(!hypotheses[0].trivial);
        assert!(hypotheses[0].tptp[0].starts_with("fof(hyp_1, axiom, raining(city))"));
        // The goal itself is a valid but trivial hypothesis.
        assert!(hypotheses.iter().any(|h| h.trivial));
    }

    #[test]
    fn trivial_hypotheses_can_be_suppressed() {
        let strict = missing_premise();
        let problem =
            AbductionProblem::for_node(&strict, &NodeId::new("S1"), &FolExporter::default()).unwrap();
        let prover = HornProver::default();
        let config = AbductionConfig::default();
        let outcome = Abducer::new(&prover, &config, Duration::from_secs(5))
            .with_trivial_policy(TrivialHypotheses::Suppress)
            .abduce(&problem);
        let AbductionOutcome::Found { hypotheses, .. } = outcome else {
            panic!("expected a hypothesis");
        };
        assert!(hypotheses.iter().all(|h| !h.trivial));
    }

    #[test]
    fn pair_hypotheses_are_minimal() {
        let mut step = Node::new("S1");
        step.rule = Some(rule(
            vec![Statement::from_atoms(vec![
                atom("raining", &["X"]),
                atom("outside", &["X"]),
            ])],
            vec![stmt("wet", &["X"])],
        ));
        step.conclusion = Some(stmt("wet", &["city"]));
        let strict = graph(vec![step]);
        let config = AbductionConfig {
            max_repairs_per_issue: 5,
            ..AbductionConfig::default()
        };
        let outcome = abduce(&strict, "S1", &config);
        let AbductionOutcome::Found { hypotheses, .. } = outcome else {
            panic!("expected hypotheses");
        };
        // The goal alone succeeds as a single, so no pairs are searched.
        assert!(hypotheses.iter().all(|h| h.cardinality() == 1 && h.trivial));

        let config = AbductionConfig {
            max_repairs_per_issue: 5,
            ..AbductionConfig::default()
        };
        let problem =
            AbductionProblem::for_node(&strict, &NodeId::new("S1"), &FolExporter::default()).unwrap();
        let prover = HornProver::default();
        let outcome = Abducer::new(&prover, &config, Duration::from_secs(5))
            .with_trivial_policy(TrivialHypotheses::Suppress)
            .abduce(&problem);
        let AbductionOutcome::Found { hypotheses, .. } = outcome else {
            panic!("expected hypotheses");
        };
        assert_eq!(
            hypotheses[0].atoms,
            vec![atom("outside", &["city"]), atom("raining", &["city"])]
        );
    }

    #[test]
    fn entailed_goal_needs_no_hypothesis() {
        let mut fact = Node::new("F1");
        fact.conclusion = Some(stmt("raining", &["city"]));
        let mut step = Node::new("S1");
        step.premises.push(Premise::Reference {
            target: NodeId::new("F1"),
        });
        step.rule = Some(rule(vec![stmt("raining", &["X"])], vec![stmt("wet", &["X"])]));
        step.conclusion = Some(stmt("wet", &["city"]));
        let strict = graph(vec![fact, step]);
        assert_eq!(
            abduce(&strict, "S1", &AbductionConfig::default()),
            AbductionOutcome::AlreadyEntailed
        );
    }

    #[test]
    fn inconsistent_hypotheses_are_rejected() {
        let mut denial = Node::new("F1");
        denial.conclusion = Some(Statement::from_atoms(vec![atom("raining", &["city"]).negate()]));
        let mut step = Node::new("S1");
        step.rule = Some(rule(vec![stmt("raining", &["X"])], vec![stmt("wet", &["X"])]));
        step.conclusion = Some(stmt("wet", &["city"]));
        let strict = graph(vec![denial, step]);
        let outcome = abduce(&strict, "S1", &AbductionConfig::default());
        let AbductionOutcome::Found { hypotheses, .. } = outcome else {
            panic!("expected the trivial hypothesis");
        };
        assert!(hypotheses.iter().all(|h| h.atoms != vec![atom("raining", &["city"])]));
    }

    #[test]
    fn missing_prover_is_unavailable() {
        let strict = missing_premise();
        let problem =
            AbductionProblem::for_node(&strict, &NodeId::new("S1"), &FolExporter::default()).unwrap();
        let prover = NoProver::new("off");
        let config = AbductionConfig::default();
        let outcome = Abducer::new(&prover, &config, Duration::from_secs(1)).abduce(&problem);
        assert!(matches!(outcome, AbductionOutcome::Unavailable { .. }));
    }
}
