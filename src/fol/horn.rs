//! Built-in forward-chaining prover.
//!
//! Axioms are read as clauses `body ⇒ head` over literals, where both sides
//! are conjunctions and negated literals are ordinary literals of opposite
//! polarity. Saturation is naive bottom-up evaluation; head variables that
//! the body leaves unbound range over every constant in the problem.
//!
//! Proofs are always sound. Non-proofs are reported as `Satisfiable` only
//! when every axiom was understood and no rule body contains a negated
//! literal: on that fragment the axioms are Horn clauses and saturation is
//! complete. Otherwise the answer is `Unknown`.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::time::{Duration, Instant};

use crate::model::{Atom, Term, TermKind};

use super::prover::{ProofOutcome, ProofStatus, ProofTask, Prover};
use super::{Formula, NamedFormula};

const DEFAULT_MAX_FACTS: usize = 50_000;

#[derive(Debug, Clone)]
pub struct HornProver {
    max_facts: usize,
}

impl Default for HornProver {
    fn default() -> Self {
        Self {
            max_facts: DEFAULT_MAX_FACTS,
        }
    }
}

impl HornProver {
    pub fn with_max_facts(max_facts: usize) -> Self {
        Self { max_facts }
    }

    fn decide(&self, task: &ProofTask, deadline: Instant) -> ProofStatus {
        let Some(conjecture) = task.conjecture() else {
            return ProofStatus::Unknown {
                reason: "problem has no conjecture".into(),
            };
        };
        let base = KnowledgeBase::from_axioms(&task.problem.axioms);
        let limits = Limits {
            deadline,
            max_facts: self.max_facts,
        };

        let closure = match base.saturate(&[], &limits) {
            Ok(c) => c,
            Err(status) => return status,
        };
        if closure.contradictory() {
            return ProofStatus::Proved;
        }
        if matches!(conjecture, Formula::False) {
            return base.non_proof();
        }

        let Some(goal) = Goal::from_formula(conjecture) else {
            return ProofStatus::Unknown {
                reason: "conjecture is outside the supported fragment".into(),
            };
        };

        match goal {
            Goal::Ground(literals) => {
                for lit in &literals {
                    if closure.facts.contains(lit) {
                        continue;
                    }
                    match base.saturate(std::slice::from_ref(&lit.clone().negate()), &limits) {
                        Ok(c) if c.contradictory() => continue,
                        Ok(_) => {}
                        Err(status) => return status,
                    }
                    if let [only] = literals.as_slice() {
                        match base.saturate(std::slice::from_ref(only), &limits) {
                            Ok(c) if c.contradictory() => return ProofStatus::Disproved,
                            Ok(_) => {}
                            Err(status) => return status,
                        }
                    }
                    return base.non_proof();
                }
                ProofStatus::Proved
            }
            Goal::Existential(pattern) => {
                let mut found = Vec::new();
                closure.matches(&pattern, 0, &mut HashMap::new(), &mut found, 1);
                if found.is_empty() {
                    if pattern.iter().any(|a| a.negated) {
                        ProofStatus::Unknown {
                            reason: "negated existential conjecture".into(),
                        }
                    } else {
                        base.non_proof()
                    }
                } else {
                    ProofStatus::Proved
                }
            }
        }
    }
}

impl Prover for HornProver {
    fn name(&self) -> &str {
        "horn"
    }

    fn prove(&self, task: &ProofTask, timeout: Duration) -> ProofOutcome {
        let start = Instant::now();
        let status = self.decide(task, start + timeout);
        tracing::trace!(task = %task.name, ?status, "horn prover finished");
        ProofOutcome::new(status, start.elapsed())
    }
}

// ---------------------------------------------------------------------------
// Clauses
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
struct Clause {
    body: Vec<Atom>,
    head: Vec<Atom>,
}

struct Limits {
    deadline: Instant,
    max_facts: usize,
}

#[derive(Debug, Default)]
struct KnowledgeBase {
    clauses: Vec<Clause>,
    domain: BTreeSet<Term>,
    /// Every axiom was translated and no body literal is negated.
    complete: bool,
}

impl KnowledgeBase {
    fn from_axioms(axioms: &[NamedFormula]) -> Self {
        let mut kb = KnowledgeBase {
            complete: true,
            ..Default::default()
        };
        for axiom in axioms {
            match clause_of(&axiom.formula) {
                Some(clause) => {
                    for atom in clause.body.iter().chain(&clause.head) {
                        kb.domain
                            .extend(atom.args.iter().filter(|t| !t.is_variable()).cloned());
                    }
                    if clause.body.iter().any(|a| a.negated) {
                        kb.complete = false;
                    }
                    kb.clauses.push(clause);
                }
                None => {
                    tracing::debug!(axiom = %axiom.name, "axiom outside the Horn fragment ignored");
                    kb.complete = false;
                }
            }
        }
        kb
    }

    fn non_proof(&self) -> ProofStatus {
        if self.complete {
            ProofStatus::Satisfiable
        } else {
            ProofStatus::Unknown {
                reason: "axioms fall outside the complete Horn fragment".into(),
            }
        }
    }

    /// Saturate the clauses plus `extra` ground literals.
    fn saturate(&self, extra: &[Atom], limits: &Limits) -> Result<Closure, ProofStatus> {
        let mut closure = Closure::default();
        let mut domain: Vec<Term> = self.domain.iter().cloned().collect();
        for atom in extra {
            for t in &atom.args {
                if !domain.contains(t) {
                    domain.push(t.clone());
                }
            }
            closure.insert(atom.clone());
        }

        loop {
            if Instant::now() >= limits.deadline {
                return Err(ProofStatus::Unknown {
                    reason: "timed out during saturation".into(),
                });
            }
            let mut derived = Vec::new();
            for clause in &self.clauses {
                let mut bindings = Vec::new();
                closure.matches(&clause.body, 0, &mut HashMap::new(), &mut bindings, usize::MAX);
                for binding in bindings {
                    for head in &clause.head {
                        instantiate(head, &binding, &domain, &mut derived);
                    }
                }
            }
            let mut changed = false;
            for atom in derived {
                changed |= closure.insert(atom);
            }
            if closure.facts.len() > limits.max_facts {
                return Err(ProofStatus::Unknown {
                    reason: format!("saturation exceeded {} facts", limits.max_facts),
                });
            }
            if !changed {
                return Ok(closure);
            }
        }
    }
}

/// Read a closed axiom as a clause.
fn clause_of(formula: &Formula) -> Option<Clause> {
    match formula {
        Formula::Forall(_, body) => clause_of(body),
        Formula::Implies(body, head) => Some(Clause {
            body: literals(body)?,
            head: literals(head)?,
        }),
        other => Some(Clause {
            body: Vec::new(),
            head: literals(other)?,
        }),
    }
}

fn literals(formula: &Formula) -> Option<Vec<Atom>> {
    match formula {
        Formula::Literal(a) => Some(vec![a.clone()]),
        Formula::Not(inner) => match inner.as_ref() {
            Formula::Literal(a) => Some(vec![a.clone().negate()]),
            _ => None,
        },
        Formula::And(parts) => {
            let mut out = Vec::new();
            for p in parts {
                out.extend(literals(p)?);
            }
            Some(out)
        }
        _ => None,
    }
}

fn substitute(atom: &Atom, binding: &HashMap<String, Term>) -> Atom {
    let mut out = atom.clone();
    for t in &mut out.args {
        if !t.is_variable() {
            continue;
        }
        if let Some(value) = binding.get(&t.name) {
            *t = value.clone();
        }
    }
    out
}

/// Ground `head` under `binding`, enumerating the domain for unbound
/// variables.
fn instantiate(head: &Atom, binding: &HashMap<String, Term>, domain: &[Term], out: &mut Vec<Atom>) {
    let partial = substitute(head, binding);
    let free: Vec<String> = partial
        .args
        .iter()
        .filter(|t| t.is_variable())
        .map(|t| t.name.clone())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();
    if free.is_empty() {
        out.push(partial);
        return;
    }
    let mut assignment = HashMap::new();
    enumerate(&partial, &free, 0, domain, &mut assignment, out);
}

fn enumerate(
    atom: &Atom,
    free: &[String],
    i: usize,
    domain: &[Term],
    assignment: &mut HashMap<String, Term>,
    out: &mut Vec<Atom>,
) {
    if i == free.len() {
        out.push(substitute(atom, assignment));
        return;
    }
    for value in domain {
        assignment.insert(free[i].clone(), value.clone());
        enumerate(atom, free, i + 1, domain, assignment, out);
    }
    assignment.remove(&free[i]);
}

// ---------------------------------------------------------------------------
// Closure
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
struct Closure {
    facts: HashSet<Atom>,
    by_predicate: HashMap<(String, bool), Vec<Atom>>,
    contradiction: bool,
}

impl Closure {
    fn insert(&mut self, atom: Atom) -> bool {
        if self.facts.contains(&atom) {
            return false;
        }
        if self.facts.contains(&atom.clone().negate()) {
            self.contradiction = true;
        }
        self.by_predicate
            .entry((atom.predicate.clone(), atom.negated))
            .or_default()
            .push(atom.clone());
        self.facts.insert(atom);
        true
    }

    fn contradictory(&self) -> bool {
        self.contradiction
    }

    /// Collect up to `limit` bindings under which every pattern literal is a
    /// known fact.
    fn matches(
        &self,
        pattern: &[Atom],
        i: usize,
        binding: &mut HashMap<String, Term>,
        out: &mut Vec<HashMap<String, Term>>,
        limit: usize,
    ) {
        if out.len() >= limit {
            return;
        }
        let Some(lit) = pattern.get(i) else {
            out.push(binding.clone());
            return;
        };
        let Some(candidates) = self.by_predicate.get(&(lit.predicate.clone(), lit.negated)) else {
            return;
        };
        for fact in candidates {
            if fact.args.len() != lit.args.len() {
                continue;
            }
            let mut added = Vec::new();
            let mut ok = true;
            for (p, f) in lit.args.iter().zip(&fact.args) {
                if p.is_variable() {
                    match binding.get(&p.name) {
                        Some(bound) if bound != f => {
                            ok = false;
                            break;
                        }
                        Some(_) => {}
                        None => {
                            binding.insert(p.name.clone(), f.clone());
                            added.push(p.name.clone());
                        }
                    }
                } else if p != f {
                    ok = false;
                    break;
                }
            }
            if ok {
                self.matches(pattern, i + 1, binding, out, limit);
            }
            for name in added {
                binding.remove(&name);
            }
            if out.len() >= limit {
                return;
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Goals
// ---------------------------------------------------------------------------

enum Goal {
    /// Conjunction of ground literals; universals replaced by fresh constants.
    Ground(Vec<Atom>),
    /// Conjunction with existentially quantified variables.
    Existential(Vec<Atom>),
}

impl Goal {
    fn from_formula(formula: &Formula) -> Option<Goal> {
        match formula {
            Formula::Forall(vars, body) => {
                let binding: HashMap<String, Term> = vars
                    .iter()
                    .map(|v| {
                        let fresh = Term {
                            kind: TermKind::Constant,
                            name: format!("sk_{}", v.to_lowercase()),
                            sort: None,
                        };
                        (v.clone(), fresh)
                    })
                    .collect();
                let lits = match body.as_ref() {
                    Formula::Exists(..) => return None,
                    Formula::Forall(..) => match Goal::from_formula(body)? {
                        Goal::Ground(lits) | Goal::Existential(lits) => lits,
                    },
                    other => literals(other)?,
                };
                let lits: Vec<Atom> = lits.iter().map(|a| substitute(a, &binding)).collect();
                Some(Goal::classify(lits))
            }
            Formula::Exists(_, body) => Some(Goal::Existential(literals(body)?)),
            other => Some(Goal::classify(literals(other)?)),
        }
    }

    fn classify(lits: Vec<Atom>) -> Goal {
        if lits.iter().all(Atom::is_ground) {
            Goal::Ground(lits)
        } else {
            Goal::Existential(lits)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lit(pred: &str, args: &[&str]) -> Formula {
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
        Formula::Literal(Atom::new(pred, terms))
    }

    fn rule(body: Formula, head: Formula) -> Formula {
        let f = Formula::Implies(Box::new(body), Box::new(head));
        let vars = f.free_variables();
        Formula::forall(vars, f)
    }

    fn prove(axioms: Vec<Formula>, conjecture: Formula) -> ProofStatus {
        let axioms: Vec<NamedFormula> = axioms
            .into_iter()
            .enumerate()
            .map(|(i, f)| NamedFormula::axiom(format!("a{i}"), f))
            .collect();
        let task = ProofTask::entailment("t", &axioms, conjecture);
        HornProver::default()
            .prove(&task, Duration::from_secs(5))
            .status
    }

    #[test]
    fn modus_ponens_is_proved() {
        let axioms = vec![
            rule(lit("raining", &["X"]), lit("wet", &["X"])),
            lit("raining", &["city"]),
        ];
        assert_eq!(prove(axioms, lit("wet", &["city"])), ProofStatus::Proved);
    }

    #[test]
    fn missing_premise_is_satisfiable() {
        let axioms = vec![rule(lit("raining", &["X"]), lit("wet", &["X"]))];
        assert_eq!(prove(axioms, lit("wet", &["city"])), ProofStatus::Satisfiable);
    }

    #[test]
    fn consistency_check_finds_contradiction() {
        let axioms = vec![
            rule(lit("raining", &["X"]), lit("wet", &["X"])),
            lit("raining", &["city"]),
            lit("wet", &["city"]).negate(),
        ];
        let axioms_only = axioms.clone();
        assert_eq!(prove(axioms, Formula::False), ProofStatus::Proved);
        assert_eq!(
            prove(axioms_only[..2].to_vec(), Formula::False),
            ProofStatus::Satisfiable
        );
    }

    #[test]
    fn negative_conjecture_uses_refutation() {
        let axioms = vec![
            rule(lit("raining", &["X"]), lit("wet", &["X"])),
            lit("wet", &["city"]).negate(),
        ];
        assert_eq!(
            prove(axioms.clone(), lit("raining", &["city"]).negate()),
            ProofStatus::Proved
        );
        assert_eq!(prove(axioms, lit("raining", &["city"])), ProofStatus::Disproved);
    }

    #[test]
    fn negated_antecedents_make_non_proofs_unknown() {
        let axioms = vec![rule(
            Formula::And(vec![
                lit("raining", &["X"]),
                lit("covered", &["X"]).negate(),
            ]),
            lit("wet", &["X"]),
        )];
        assert!(matches!(
            prove(axioms, lit("wet", &["city"])),
            ProofStatus::Unknown { .. }
        ));
    }

    #[test]
    fn universal_and_existential_goals() {
        let axioms = vec![
            Formula::forall(["X".to_string()].into(), lit("mortal", &["X"])),
            lit("human", &["socrates"]),
        ];
        let all = Formula::forall(["Y".to_string()].into(), lit("mortal", &["Y"]));
        assert_eq!(prove(axioms.clone(), all), ProofStatus::Proved);
        let some = Formula::Exists(vec!["Y".into()], Box::new(lit("human", &["Y"])));
        assert_eq!(prove(axioms.clone(), some), ProofStatus::Proved);
        // One human does not make everything human.
        let every = Formula::forall(["Y".to_string()].into(), lit("human", &["Y"]));
        assert_ne!(prove(axioms, every), ProofStatus::Proved);
    }

    #[test]
    fn saturation_limit_is_unknown() {
        let axioms: Vec<NamedFormula> = (0..10)
            .map(|i| NamedFormula::axiom(format!("f{i}"), lit("p", &[&format!("c{i}")])))
            .collect();
        let task = ProofTask::entailment("t", &axioms, lit("q", &["c0"]));
        let status = HornProver::with_max_facts(3)
            .prove(&task, Duration::from_secs(5))
            .status;
        assert!(matches!(status, ProofStatus::Unknown { .. }));
    }
}
