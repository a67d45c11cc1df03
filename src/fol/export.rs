//! Strict graph → first-order problem.
//!
//! Axioms, in emission order:
//! - `rule_<id>`: one universally closed implication per rule, explicit or
//!   implicit. In defeasible mode every exception is conjoined, negated, to
//!   the antecedents.
//! - `fact_<id>`: the conclusion of every fact node.
//! - `prem_<id>_<i>`: inline premises of nodes that carry neither rule nor
//!   conclusion.
//! - `orphan_<n>`: inline premises that no node concludes, deduplicated.
//!
//! No axiom restates a node's own premises-imply-conclusion shortcut; a step
//! is only derivable through its rule.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::error::ExportError;
use crate::model::{NodeId, Rule, StatementKey, StrictGraph};
use crate::validate;

use super::{FolMode, FolProblem, Formula, NamedFormula, closed_statement, statement_formula};

pub type ExportResult<T> = std::result::Result<T, ExportError>;

/// How the conjecture was chosen.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum GoalSelection {
    /// Named by the caller or recorded on the graph.
    Explicit { goal: NodeId },
    /// The only inference step not used as a premise elsewhere.
    Automatic { goal: NodeId },
    /// Several unreferenced inference steps; no conjecture emitted.
    Ambiguous { candidates: Vec<NodeId> },
    /// No inference step at all.
    None,
}

impl GoalSelection {
    /// Resolve the goal: `explicit`, then the graph's recorded goal, then the
    /// unique unreferenced inference step.
    pub fn resolve(strict: &StrictGraph, explicit: Option<&NodeId>) -> Self {
        if let Some(goal) = explicit.or(strict.goal.as_ref()) {
            return Self::Explicit { goal: goal.clone() };
        }
        let candidates = goal_candidates(strict);
        match candidates.len() {
            0 => Self::None,
            1 => Self::Automatic {
                goal: candidates[0].clone(),
            },
            _ => Self::Ambiguous { candidates },
        }
    }

    pub fn goal(&self) -> Option<&NodeId> {
        match self {
            Self::Explicit { goal } | Self::Automatic { goal } => Some(goal),
            _ => None,
        }
    }
}

/// Inference steps that no other node references as a premise.
pub fn goal_candidates(strict: &StrictGraph) -> Vec<NodeId> {
    let referenced = strict.graph.referenced_ids();
    strict
        .graph
        .nodes
        .iter()
        .filter(|n| n.is_inference_step() && !n.is_implicit_rule())
        .filter(|n| !referenced.contains(&n.id))
        .map(|n| n.id.clone())
        .collect()
}

/// An exported problem and the goal it conjectures.
#[derive(Debug, Clone)]
pub struct FolExport {
    pub problem: FolProblem,
    pub goal: GoalSelection,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct FolExporter {
    mode: FolMode,
}

impl FolExporter {
    pub fn new(mode: FolMode) -> Self {
        Self { mode }
    }

    pub fn mode(&self) -> FolMode {
        self.mode
    }

    /// Export the graph, conjecturing the resolved goal's conclusion.
    ///
    /// The graph must pass read-only validation first.
    pub fn export(&self, strict: &StrictGraph, goal: Option<&NodeId>) -> ExportResult<FolExport> {
        validate::check(strict).map_err(|source| ExportError::Invalid { source })?;

        let selection = GoalSelection::resolve(strict, goal);
        let mut problem = FolProblem {
            axioms: self.axioms(strict),
            conjecture: None,
        };
        if let Some(goal) = selection.goal() {
            let node = strict
                .graph
                .node(goal.as_str())
                .ok_or_else(|| ExportError::UnknownGoal {
                    goal: goal.to_string(),
                })?;
            let conclusion =
                node.conclusion
                    .as_ref()
                    .ok_or_else(|| ExportError::GoalWithoutConclusion {
                        goal: goal.to_string(),
                    })?;
            problem.conjecture = Some(NamedFormula::conjecture(closed_statement(conclusion)));
        }
        tracing::debug!(
            axioms = problem.axioms.len(),
            goal = ?selection.goal(),
            mode = %self.mode,
            "exported FOL problem"
        );
        Ok(FolExport {
            problem,
            goal: selection,
        })
    }

    /// All axioms of the graph, without a conjecture.
    pub fn axioms(&self, strict: &StrictGraph) -> Vec<NamedFormula> {
        let graph = &strict.graph;
        let mut axioms = Vec::new();

        for node in &graph.nodes {
            let Some(rule) = &node.rule else { continue };
            match self.rule_formula(rule) {
                Some(f) => axioms.push(NamedFormula::axiom(format!("rule_{}", node.id), f)),
                None => tracing::debug!(node = %node.id, "rule without consequents skipped"),
            }
        }

        let mut emitted: BTreeSet<StatementKey> = BTreeSet::new();
        for node in graph.nodes.iter().filter(|n| n.is_fact()) {
            if let Some(c) = &node.conclusion {
                emitted.insert(c.key());
                axioms.push(NamedFormula::axiom(
                    format!("fact_{}", node.id),
                    closed_statement(c),
                ));
            }
        }

        for node in graph
            .nodes
            .iter()
            .filter(|n| n.rule.is_none() && n.conclusion.is_none())
        {
            for (i, stmt) in node.premises.iter().filter_map(|p| p.statement()).enumerate() {
                emitted.insert(stmt.key());
                axioms.push(NamedFormula::axiom(
                    format!("prem_{}_{}", node.id, i),
                    closed_statement(stmt),
                ));
            }
        }

        let concluded: BTreeSet<StatementKey> = graph
            .nodes
            .iter()
            .filter_map(|n| n.conclusion.as_ref())
            .map(|c| c.key())
            .collect();
        let mut orphans = 0usize;
        for node in graph.nodes.iter().filter(|n| n.conclusion.is_some()) {
            for stmt in node.premises.iter().filter_map(|p| p.statement()) {
                let key = stmt.key();
                if concluded.contains(&key) || !emitted.insert(key) {
                    continue;
                }
                orphans += 1;
                axioms.push(NamedFormula::axiom(
                    format!("orphan_{orphans}"),
                    closed_statement(stmt),
                ));
            }
        }
        axioms
    }

    /// Universally closed formula for a rule; `None` when it has no
    /// consequents.
    pub fn rule_formula(&self, rule: &Rule) -> Option<Formula> {
        if rule.consequents.is_empty() {
            return None;
        }
        let mut antecedents: Vec<Formula> = rule.antecedents.iter().map(statement_formula).collect();
        if self.mode == FolMode::Defeasible {
            antecedents.extend(rule.exceptions.iter().map(|e| statement_formula(e).negate()));
        }
        let consequent = Formula::conjoin(rule.consequents.iter().map(statement_formula).collect());
        let body = if antecedents.is_empty() {
            consequent
        } else {
            Formula::Implies(
                Box::new(Formula::conjoin(antecedents)),
                Box::new(consequent),
            )
        };
        let vars = body.free_variables();
        Some(Formula::forall(vars, body))
    }
}
