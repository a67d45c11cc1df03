//! Minimal-edit search (AF enforcement).
//!
//! Given a goal argument and a semantics reading, find the lowest-cardinality
//! edit set from a restricted candidate pool after which the goal is
//! accepted. The pool is:
//!
//! - `goal → x` for each attacker `x` of the goal not already attacked by it
//! - one abstract defender argument, wired to attack any attacker of the goal
//!   (each wiring costs one edit; the defender itself is free)
//! - optionally, attacks from other grounded arguments onto the goal's attackers
//! - optionally, deletion of attacks on the goal (hard edges excluded unless
//!   explicitly allowed)
//!
//! Edit sets are enumerated by increasing size, so the first success is
//! optimal relative to the pool; the [`Certificate`] records that every
//! smaller set was checked.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::config::EnforcementConfig;
use crate::error::ArgumentationError;
use crate::model::{AttackKind, EdgeKind, NodeId, StrictGraph};

use super::{AcceptanceView, Acceptance, AfResult, AttackGraph, Semantics};

/// Id of the abstract defender argument.
pub const DEFENDER_ID: &str = "DEF";

/// One edit of the attack graph.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum AfEdit {
    AddAttack { source: NodeId, target: NodeId },
    RemoveAttack { source: NodeId, target: NodeId },
    /// Wire the defender argument to attack `target`.
    Defend { target: NodeId },
}

impl fmt::Display for AfEdit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AfEdit::AddAttack { source, target } => write!(f, "+att({source},{target})"),
            AfEdit::RemoveAttack { source, target } => write!(f, "-att({source},{target})"),
            AfEdit::Defend { target } => write!(f, "+att({DEFENDER_ID},{target})"),
        }
    }
}

/// Apply `edits` to a copy of `af`.
pub fn apply_edits(af: &AttackGraph, edits: &[AfEdit]) -> AttackGraph {
    let mut out = af.clone();
    for edit in edits {
        match edit {
            AfEdit::AddAttack { source, target } => {
                out.add_attack(source, target);
            }
            AfEdit::RemoveAttack { source, target } => {
                out.remove_attack(source, target);
            }
            AfEdit::Defend { target } => {
                let def = NodeId::new(DEFENDER_ID);
                out.add_argument(def.clone());
                out.add_attack(&def, target);
            }
        }
    }
    out
}

/// Attack edges whose endpoints' conclusions directly contradict.
pub fn hard_attacks(strict: &StrictGraph) -> BTreeSet<(NodeId, NodeId)> {
    let graph = &strict.graph;
    graph
        .edges
        .iter()
        .filter(|e| e.kind == EdgeKind::Attack && e.attack_kind != Some(AttackKind::Undercut))
        .filter(|e| {
            let source = graph.node(e.source.as_str());
            let target = graph.node(e.target.as_str());
            let (Some(s), Some(t)) = (source, target) else {
                return false;
            };
            let (Some(sc), Some(tc)) = (&s.conclusion, &t.conclusion) else {
                return false;
            };
            sc.atoms
                .iter()
                .any(|a| tc.atoms.iter().any(|b| a.contradicts(b)))
        })
        .map(|e| (e.source.clone(), e.target.clone()))
        .collect()
}

/// What enforcement is asked to do.
#[derive(Debug, Clone)]
pub struct EnforcementTask<'a> {
    pub goal: &'a NodeId,
    pub semantics: Semantics,
    pub acceptance: Acceptance,
    pub search_limit: usize,
    pub hard: &'a BTreeSet<(NodeId, NodeId)>,
}

/// Evidence of optimality relative to the candidate pool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Certificate {
    pub pool_size: usize,
    /// Every edit set of these sizes was checked and failed.
    pub sizes_exhausted: Vec<usize>,
    pub checked: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum EnforcementOutcome {
    AlreadyAccepted,
    Repaired {
        edits: Vec<AfEdit>,
        cost: usize,
        /// Other optimal edit sets of the same cost.
        alternatives: Vec<Vec<AfEdit>>,
        certificate: Certificate,
    },
    /// Search exhausted within the ceiling.
    NoRepair {
        ceiling: usize,
        pool_size: usize,
        checked: usize,
    },
    /// Acceptance could not be decided for some candidate.
    Inconclusive { reason: String },
}

/// The restricted candidate pool, in deterministic order.
pub fn candidate_pool(
    af: &AttackGraph,
    task: &EnforcementTask<'_>,
    config: &EnforcementConfig,
) -> Vec<AfEdit> {
    let goal = task.goal;
    let attackers: Vec<NodeId> = af
        .attackers_of(goal.as_str())
        .into_iter()
        .filter(|x| *x != goal)
        .cloned()
        .collect();
    let mut pool = Vec::new();
    for x in &attackers {
        if !af.has_attack(goal.as_str(), x.as_str()) {
            pool.push(AfEdit::AddAttack {
                source: goal.clone(),
                target: x.clone(),
            });
        }
    }
    for x in &attackers {
        pool.push(AfEdit::Defend { target: x.clone() });
    }
    if config.third_party_attacks {
        let grounded = af.grounded();
        for y in grounded.iter().filter(|y| *y != goal) {
            for x in attackers.iter().filter(|x| *x != y) {
                if !af.has_attack(y.as_str(), x.as_str()) {
                    pool.push(AfEdit::AddAttack {
                        source: y.clone(),
                        target: x.clone(),
                    });
                }
            }
        }
    }
    if config.allow_deletions {
        for x in &attackers {
            let hard = task.hard.contains(&(x.clone(), goal.clone()));
            if !hard || config.allow_hard_deletions {
                pool.push(AfEdit::RemoveAttack {
                    source: x.clone(),
                    target: goal.clone(),
                });
            }
        }
    }
    pool
}

fn goal_accepted(af: &AttackGraph, task: &EnforcementTask<'_>) -> AfResult<bool> {
    let view = AcceptanceView::compute(af, task.semantics, task.acceptance, task.search_limit)?;
    Ok(view.is_accepted(task.goal.as_str()))
}

/// Search for the cheapest edit set making the goal accepted.
pub fn enforce(
    af: &AttackGraph,
    task: &EnforcementTask<'_>,
    config: &EnforcementConfig,
) -> AfResult<EnforcementOutcome> {
    if !af.contains(task.goal.as_str()) {
        return Err(ArgumentationError::UnknownArgument {
            id: task.goal.to_string(),
        });
    }
    match goal_accepted(af, task) {
        Ok(true) => return Ok(EnforcementOutcome::AlreadyAccepted),
        Ok(false) => {}
        Err(e) => {
            return Ok(EnforcementOutcome::Inconclusive {
                reason: e.to_string(),
            });
        }
    }

    let pool = candidate_pool(af, task, config);
    let mut checked = 0usize;
    let mut exhausted = vec![0];
    let ceiling = config.max_edits.min(pool.len());
    for k in 1..=ceiling {
        let mut successes: Vec<Vec<AfEdit>> = Vec::new();
        for combo in combinations(pool.len(), k) {
            let edits: Vec<AfEdit> = combo.iter().map(|&i| pool[i].clone()).collect();
            checked += 1;
            match goal_accepted(&apply_edits(af, &edits), task) {
                Ok(true) => {
                    successes.push(edits);
                    if successes.len() > config.max_alternatives {
                        break;
                    }
                }
                Ok(false) => {}
                Err(e) => {
                    return Ok(EnforcementOutcome::Inconclusive {
                        reason: e.to_string(),
                    });
                }
            }
        }
        if !successes.is_empty() {
            let edits = successes.remove(0);
            tracing::info!(
                goal = %task.goal,
                semantics = %task.semantics,
                cost = k,
                checked,
                "AF enforcement found a repair"
            );
            return Ok(EnforcementOutcome::Repaired {
                edits,
                cost: k,
                alternatives: successes,
                certificate: Certificate {
                    pool_size: pool.len(),
                    sizes_exhausted: exhausted,
                    checked,
                },
            });
        }
        exhausted.push(k);
    }
    tracing::debug!(goal = %task.goal, pool = pool.len(), checked, "AF enforcement exhausted");
    Ok(EnforcementOutcome::NoRepair {
        ceiling: config.max_edits,
        pool_size: pool.len(),
        checked,
    })
}

/// Index combinations of size `k` from `0..n`, in lexicographic order.
pub fn combinations(n: usize, k: usize) -> Vec<Vec<usize>> {
    fn go(start: usize, n: usize, k: usize, current: &mut Vec<usize>, out: &mut Vec<Vec<usize>>) {
        if current.len() == k {
            out.push(current.clone());
            return;
        }
        for i in start..n {
            current.push(i);
            go(i + 1, n, k, current, out);
            current.pop();
        }
    }
    let mut out = Vec::new();
    if k <= n {
        go(0, n, k, &mut Vec::with_capacity(k), &mut out);
    }
    out
}
