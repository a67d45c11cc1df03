//! First-order view of a strict graph.
//!
//! A strict graph is translated into a [`FolProblem`]: named axioms plus an
//! optional conjecture. Problems are rendered to TPTP `fof` text for external
//! provers ([`prover::EProver`]) or handed structurally to the built-in
//! [`horn::HornProver`].

pub mod export;
pub mod horn;
pub mod prover;
pub mod tptp;

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::model::{Atom, QuantifierKind, Statement, TermKind};

pub use export::{FolExporter, GoalSelection};
pub use prover::{ProofOutcome, ProofStatus, ProofTask, Prover};

/// How rule exceptions are treated during translation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FolMode {
    /// Exceptions are ignored; rules are plain implications.
    #[default]
    Classical,
    /// Each exception becomes a negated guard on the rule's antecedents.
    Defeasible,
}

impl fmt::Display for FolMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Classical => write!(f, "classical"),
            Self::Defeasible => write!(f, "defeasible"),
        }
    }
}

/// First-order formula over strict-graph atoms.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Formula {
    /// A literal; the atom's `negated` flag carries its polarity.
    Literal(Atom),
    Not(Box<Formula>),
    And(Vec<Formula>),
    Or(Vec<Formula>),
    Implies(Box<Formula>, Box<Formula>),
    Forall(Vec<String>, Box<Formula>),
    Exists(Vec<String>, Box<Formula>),
    /// Falsity; used as the conjecture of consistency checks.
    False,
}

impl Formula {
    /// Conjunction that collapses the trivial cases.
    pub fn conjoin(mut parts: Vec<Formula>) -> Formula {
        match parts.len() {
            0 => Formula::And(Vec::new()),
            1 => parts.remove(0),
            _ => Formula::And(parts),
        }
    }

    pub fn negate(self) -> Formula {
        match self {
            Formula::Literal(atom) => Formula::Literal(atom.negate()),
            Formula::Not(inner) => *inner,
            other => Formula::Not(Box::new(other)),
        }
    }

    /// Wrap in a universal closure over `vars`, if any.
    pub fn forall(vars: BTreeSet<String>, body: Formula) -> Formula {
        if vars.is_empty() {
            body
        } else {
            Formula::Forall(vars.into_iter().collect(), Box::new(body))
        }
    }

    /// Free variables, by name.
    pub fn free_variables(&self) -> BTreeSet<String> {
        let mut out = BTreeSet::new();
        self.collect_free(&mut Vec::new(), &mut out);
        out
    }

    fn collect_free(&self, bound: &mut Vec<String>, out: &mut BTreeSet<String>) {
        match self {
            Formula::Literal(atom) => {
                for term in &atom.args {
                    if term.kind == TermKind::Variable && !bound.contains(&term.name) {
                        out.insert(term.name.clone());
                    }
                }
            }
            Formula::Not(inner) => inner.collect_free(bound, out),
            Formula::And(parts) | Formula::Or(parts) => {
                for p in parts {
                    p.collect_free(bound, out);
                }
            }
            Formula::Implies(a, b) => {
                a.collect_free(bound, out);
                b.collect_free(bound, out);
            }
            Formula::Forall(vars, body) | Formula::Exists(vars, body) => {
                let mark = bound.len();
                bound.extend(vars.iter().cloned());
                body.collect_free(bound, out);
                bound.truncate(mark);
            }
            Formula::False => {}
        }
    }

    /// The literal, if this formula is one.
    pub fn as_literal(&self) -> Option<&Atom> {
        match self {
            Formula::Literal(atom) => Some(atom),
            _ => None,
        }
    }
}

impl fmt::Display for Formula {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&tptp::render(self))
    }
}

/// Translate a statement into a formula.
///
/// Atoms are conjoined; explicit quantifiers wrap the conjunction innermost
/// first. A statement without atoms becomes a 0-ary proposition named after
/// its text.
pub fn statement_formula(statement: &Statement) -> Formula {
    if !statement.has_atoms() {
        let text = statement.text.as_deref().unwrap_or("");
        return Formula::Literal(Atom::new(tptp::text_proposition(text), Vec::new()));
    }
    let mut body = Formula::conjoin(
        statement
            .atoms
            .iter()
            .cloned()
            .map(Formula::Literal)
            .collect(),
    );
    for q in statement.quantifiers.iter().rev() {
        body = match q.kind {
            QuantifierKind::Forall => Formula::Forall(vec![q.var.clone()], Box::new(body)),
            QuantifierKind::Exists => Formula::Exists(vec![q.var.clone()], Box::new(body)),
        };
    }
    body
}

/// Universal closure of a statement's formula.
pub fn closed_statement(statement: &Statement) -> Formula {
    let body = statement_formula(statement);
    let vars = body.free_variables();
    Formula::forall(vars, body)
}

/// Role of a named formula in a problem.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Axiom,
    Conjecture,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Axiom => write!(f, "axiom"),
            Self::Conjecture => write!(f, "conjecture"),
        }
    }
}

/// A named `fof` entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamedFormula {
    pub name: String,
    pub role: Role,
    pub formula: Formula,
}

impl NamedFormula {
    pub fn axiom(name: impl Into<String>, formula: Formula) -> Self {
        Self {
            name: name.into(),
            role: Role::Axiom,
            formula,
        }
    }

    pub fn conjecture(formula: Formula) -> Self {
        Self {
            name: "goal".into(),
            role: Role::Conjecture,
            formula,
        }
    }
}

/// Axioms plus an optional conjecture.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FolProblem {
    pub axioms: Vec<NamedFormula>,
    pub conjecture: Option<NamedFormula>,
}

impl FolProblem {
    /// Replace the conjecture, keeping the axioms.
    pub fn with_conjecture(&self, formula: Formula) -> Self {
        Self {
            axioms: self.axioms.clone(),
            conjecture: Some(NamedFormula::conjecture(formula)),
        }
    }

    /// Append extra axioms (e.g. abduced hypotheses).
    pub fn with_axioms(&self, extra: impl IntoIterator<Item = NamedFormula>) -> Self {
        let mut out = self.clone();
        out.axioms.extend(extra);
        out
    }

    pub fn to_tptp(&self) -> String {
        tptp::render_problem(self)
    }
}
