//! Property tests for the attack-graph semantics, enforcement and abduction.

use std::collections::BTreeSet;
use std::time::Duration;

use proptest::prelude::*;

use argmend::abduce::{AbductionOutcome, AbductionProblem, Abducer};
use argmend::argumentation::enforce::{
    EnforcementOutcome, EnforcementTask, apply_edits, candidate_pool, combinations, enforce,
};
use argmend::argumentation::{Acceptance, AcceptanceView, AttackGraph, Semantics};
use argmend::config::{AbductionConfig, EnforcementConfig};
use argmend::fol::horn::HornProver;
use argmend::fol::prover::{ProofTask, Prover};
use argmend::fol::{FolExporter, FolMode, NamedFormula, closed_statement};
use argmend::model::{ArgumentGraph, Atom, Lexicon, Node, NodeId, Rule, Statement, StrictGraph, Term};

const LIMIT: usize = 16;

fn arb_af() -> impl Strategy<Value = AttackGraph> {
    (1usize..6).prop_flat_map(|n| {
        prop::collection::vec((0..n, 0..n), 0..(n * 2)).prop_map(move |pairs| {
            let args = (0..n).map(|i| NodeId::new(format!("a{i}")));
            let attacks = pairs
                .into_iter()
                .filter(|(s, t)| s != t)
                .map(|(s, t)| (NodeId::new(format!("a{s}")), NodeId::new(format!("a{t}"))));
            AttackGraph::from_parts(args, attacks)
        })
    })
}

fn accepted(af: &AttackGraph, goal: &NodeId) -> bool {
    AcceptanceView::compute(af, Semantics::Grounded, Acceptance::Credulous, LIMIT)
        .map(|v| v.is_accepted(goal.as_str()))
        .unwrap_or(false)
}

proptest! {
    /// The grounded extension is contained in every preferred extension,
    /// and every stable extension is preferred.
    #[test]
    fn grounded_within_preferred_and_stable_is_preferred(af in arb_af()) {
        let grounded = af.grounded();
        let preferred = af.preferred(LIMIT).unwrap();
        prop_assert!(!preferred.is_empty());
        for ext in &preferred {
            prop_assert!(grounded.is_subset(ext));
        }
        for ext in af.stable(LIMIT).unwrap() {
            prop_assert!(preferred.contains(&ext));
        }
    }

    /// Without attacks every argument is accepted under every semantics.
    #[test]
    fn attack_free_graph_accepts_everything(n in 1usize..8) {
        let args: Vec<NodeId> = (0..n).map(|i| NodeId::new(format!("a{i}"))).collect();
        let af = AttackGraph::from_parts(args.clone(), Vec::new());
        let all: BTreeSet<NodeId> = args.into_iter().collect();
        prop_assert_eq!(&af.grounded(), &all);
        prop_assert_eq!(af.preferred(LIMIT).unwrap(), vec![all.clone()]);
        prop_assert_eq!(af.stable(LIMIT).unwrap(), vec![all]);
    }

    /// A reported repair works, and no smaller edit set from the same pool does.
    #[test]
    fn enforcement_is_minimal_over_its_pool(af in arb_af()) {
        let goal = NodeId::new("a0");
        let hard = BTreeSet::new();
        let task = EnforcementTask {
            goal: &goal,
            semantics: Semantics::Grounded,
            acceptance: Acceptance::Credulous,
            search_limit: LIMIT,
            hard: &hard,
        };
        let config = EnforcementConfig::default();
        match enforce(&af, &task, &config).unwrap() {
            EnforcementOutcome::AlreadyAccepted => prop_assert!(accepted(&af, &goal)),
            EnforcementOutcome::Repaired { edits, cost, .. } => {
                prop_assert_eq!(edits.len(), cost);
                prop_assert!(accepted(&apply_edits(&af, &edits), &goal));
                let pool = candidate_pool(&af, &task, &config);
                for k in 0..cost {
                    for combo in combinations(pool.len(), k) {
                        let smaller: Vec<_> = combo.iter().map(|&i| pool[i].clone()).collect();
                        prop_assert!(!accepted(&apply_edits(&af, &smaller), &goal));
                    }
                }
            }
            EnforcementOutcome::NoRepair { .. } | EnforcementOutcome::Inconclusive { .. } => {}
        }
    }

    /// Enforcing again on the repaired graph is a no-op.
    #[test]
    fn enforcement_is_idempotent(af in arb_af()) {
        let goal = NodeId::new("a0");
        let hard = BTreeSet::new();
        let task = EnforcementTask {
            goal: &goal,
            semantics: Semantics::Grounded,
            acceptance: Acceptance::Credulous,
            search_limit: LIMIT,
            hard: &hard,
        };
        let config = EnforcementConfig::default();
        if let EnforcementOutcome::Repaired { edits, .. } = enforce(&af, &task, &config).unwrap() {
            let repaired = apply_edits(&af, &edits);
            prop_assert_eq!(
                enforce(&repaired, &task, &config).unwrap(),
                EnforcementOutcome::AlreadyAccepted
            );
        }
    }

    /// Every abduced hypothesis, added to the axioms, entails the goal
    /// without making them inconsistent.
    #[test]
    fn abduced_hypotheses_entail_the_goal(
        target in prop::sample::select(vec!["city", "park", "road"]),
        extra in prop::sample::select(vec!["dry", "cold", "windy"]),
    ) {
        let strict = rain_graph(target, extra);
        let prover = HornProver::default();
        let exporter = FolExporter::new(FolMode::Classical);
        let problem = AbductionProblem::for_node(&strict, &NodeId::new("S1"), &exporter).unwrap();
        let config = AbductionConfig::default();
        let outcome = Abducer::new(&prover, &config, Duration::from_secs(1)).abduce(&problem);

        let hypotheses = match outcome {
            AbductionOutcome::Found { hypotheses, .. } => hypotheses,
            other => return Err(TestCaseError::fail(format!("no hypothesis: {other:?}"))),
        };
        for h in hypotheses {
            let mut axioms = exporter.axioms(&strict);
            axioms.extend(h.atoms.iter().enumerate().map(|(i, a)| {
                NamedFormula::axiom(format!("hyp_{i}"), closed_statement(&Statement::from_atoms(vec![a.clone()])))
            }));
            let proof = prover.prove(
                &ProofTask::entailment("check", &axioms, closed_statement(&problem.goal)),
                Duration::from_secs(1),
            );
            prop_assert!(proof.status.is_proved());
            let contradiction = prover.prove(
                &ProofTask::inconsistency("check_consistency", &axioms),
                Duration::from_secs(1),
            );
            prop_assert!(!contradiction.status.is_proved());
        }
    }
}

/// `raining(X) ⇒ wet(X)` concluding `wet(target)`, plus an unrelated fact.
fn rain_graph(target: &str, extra: &str) -> StrictGraph {
    let stmt = |pred: &str, term: Term| Statement::from_atoms(vec![Atom::new(pred, vec![term])]);
    let mut step = Node::new("S1");
    step.rule = Some(Rule {
        name: "rain wets".into(),
        strict: false,
        antecedents: vec![stmt("raining", Term::variable("X"))],
        consequents: vec![stmt("wet", Term::variable("X"))],
        exceptions: Vec::new(),
        scheme: None,
    });
    step.conclusion = Some(stmt("wet", Term::constant(target)));
    let mut fact = Node::new("F1");
    fact.conclusion = Some(stmt(extra, Term::constant(target)));

    let graph = ArgumentGraph {
        nodes: vec![fact, step],
        edges: Vec::new(),
    };
    let mut lexicon = Lexicon::new();
    for pred in graph.predicate_arities().keys() {
        lexicon.ensure(pred);
    }
    StrictGraph::new("", graph, lexicon)
}
