//! Abstract argumentation: attack-graph projection and extension semantics.
//!
//! The strict graph is projected to a pair (Arguments, Attacks). Arguments
//! are node ids minus implicit-rule nodes without atoms of their own;
//! attacks are the attack edges among surviving arguments. Support edges are
//! not part of the projection.
//!
//! # Semantics
//!
//! - **Grounded**: least fixed point of the characteristic function, iterated
//!   from the empty set. Unique.
//! - **Preferred**: maximal admissible sets. Computed by backtracking over the
//!   arguments the grounded labelling leaves undecided, with conflict-freeness
//!   pruning and cut-off of branches already covered by a found extension.
//!   Exhaustive, so bounded by `limits.max_search_arguments` (at most 64).
//! - **Stable**: preferred extensions that attack every outside argument.
//!
//! The minimal-edit search lives in [`enforce`].

pub mod enforce;

use std::collections::{BTreeSet, HashMap};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ArgumentationError;
use crate::model::{NodeId, StrictGraph};

pub type AfResult<T> = std::result::Result<T, ArgumentationError>;

// ---------------------------------------------------------------------------
// Semantics selection
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Semantics {
    #[default]
    Grounded,
    Preferred,
    Stable,
}

impl fmt::Display for Semantics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Semantics::Grounded => write!(f, "grounded"),
            Semantics::Preferred => write!(f, "preferred"),
            Semantics::Stable => write!(f, "stable"),
        }
    }
}

impl std::str::FromStr for Semantics {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "grounded" => Ok(Semantics::Grounded),
            "preferred" => Ok(Semantics::Preferred),
            "stable" => Ok(Semantics::Stable),
            other => Err(format!("unknown semantics `{other}`")),
        }
    }
}

/// Reading of multi-extension semantics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Acceptance {
    /// In at least one extension.
    #[default]
    Credulous,
    /// In every extension (and at least one exists).
    Skeptical,
}

// ---------------------------------------------------------------------------
// Attack graph
// ---------------------------------------------------------------------------

/// Abstract argumentation framework over node ids.
#[derive(Debug, Clone, PartialEq)]
pub struct AttackGraph {
    arguments: Vec<NodeId>,
    index: HashMap<NodeId, usize>,
    /// `attackers[i]` = indices attacking argument `i`.
    attackers: Vec<Vec<usize>>,
    /// `targets[i]` = indices attacked by argument `i`.
    targets: Vec<Vec<usize>>,
}

impl AttackGraph {
    /// Project a strict graph.
    pub fn from_strict(strict: &StrictGraph) -> Self {
        let arguments: Vec<NodeId> = strict
            .graph
            .nodes
            .iter()
            .filter(|n| !(n.is_implicit_rule() && !n.has_own_atoms()))
            .map(|n| n.id.clone())
            .collect();
        let attacks = strict
            .graph
            .attacks()
            .map(|e| (e.source.clone(), e.target.clone()));
        Self::from_parts(arguments, attacks)
    }

    /// Build from arguments and attacks; attacks touching unknown arguments
    /// are ignored, duplicates collapse.
    pub fn from_parts(
        arguments: impl IntoIterator<Item = NodeId>,
        attacks: impl IntoIterator<Item = (NodeId, NodeId)>,
    ) -> Self {
        let mut af = Self {
            arguments: Vec::new(),
            index: HashMap::new(),
            attackers: Vec::new(),
            targets: Vec::new(),
        };
        for a in arguments {
            af.add_argument(a);
        }
        for (s, t) in attacks {
            af.add_attack(&s, &t);
        }
        af
    }

    pub fn add_argument(&mut self, id: NodeId) -> usize {
        if let Some(&i) = self.index.get(&id) {
            return i;
        }
        let i = self.arguments.len();
        self.index.insert(id.clone(), i);
        self.arguments.push(id);
        self.attackers.push(Vec::new());
        self.targets.push(Vec::new());
        i
    }

    /// Returns `false` when an endpoint is unknown or the attack exists.
    pub fn add_attack(&mut self, source: &NodeId, target: &NodeId) -> bool {
        let (Some(&s), Some(&t)) = (self.index.get(source), self.index.get(target)) else {
            return false;
        };
        if self.targets[s].contains(&t) {
            return false;
        }
        self.targets[s].push(t);
        self.attackers[t].push(s);
        true
    }

    pub fn remove_attack(&mut self, source: &NodeId, target: &NodeId) -> bool {
        let (Some(&s), Some(&t)) = (self.index.get(source), self.index.get(target)) else {
            return false;
        };
        let before = self.targets[s].len();
        self.targets[s].retain(|&x| x != t);
        self.attackers[t].retain(|&x| x != s);
        before != self.targets[s].len()
    }

    pub fn len(&self) -> usize {
        self.arguments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.arguments.is_empty()
    }

    pub fn arguments(&self) -> &[NodeId] {
        &self.arguments
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    pub fn has_attack(&self, source: &str, target: &str) -> bool {
        match (self.index.get(source), self.index.get(target)) {
            (Some(&s), Some(&t)) => self.targets[s].contains(&t),
            _ => false,
        }
    }

    pub fn attackers_of(&self, id: &str) -> Vec<&NodeId> {
        self.index
            .get(id)
            .map(|&i| self.attackers[i].iter().map(|&a| &self.arguments[a]).collect())
            .unwrap_or_default()
    }

    /// All attacks as id pairs, in argument order.
    pub fn attacks(&self) -> Vec<(&NodeId, &NodeId)> {
        self.targets
            .iter()
            .enumerate()
            .flat_map(|(s, ts)| ts.iter().map(move |&t| (s, t)))
            .map(|(s, t)| (&self.arguments[s], &self.arguments[t]))
            .collect()
    }

    pub fn attack_count(&self) -> usize {
        self.targets.iter().map(Vec::len).sum()
    }

    /// ASPARTIX/APX rendering: `arg(a).` and `att(a,b).` facts.
    pub fn to_apx(&self) -> String {
        let mut out = String::new();
        for a in &self.arguments {
            out.push_str(&format!("arg({}).\n", apx_name(a)));
        }
        for (s, t) in self.attacks() {
            out.push_str(&format!("att({},{}).\n", apx_name(s), apx_name(t)));
        }
        out
    }

    fn ids(&self, set: &[bool]) -> BTreeSet<NodeId> {
        set.iter()
            .enumerate()
            .filter(|(_, in_set)| **in_set)
            .map(|(i, _)| self.arguments[i].clone())
            .collect()
    }

    fn attacked_by(&self, set: &[bool]) -> Vec<bool> {
        let mut out = vec![false; self.len()];
        for (s, in_set) in set.iter().enumerate() {
            if *in_set {
                for &t in &self.targets[s] {
                    out[t] = true;
                }
            }
        }
        out
    }

    fn grounded_mask(&self) -> Vec<bool> {
        let mut current = vec![false; self.len()];
        loop {
            let defeated = self.attacked_by(&current);
            let next: Vec<bool> = (0..self.len())
                .map(|a| self.attackers[a].iter().all(|&b| defeated[b]))
                .collect();
            if next == current {
                return current;
            }
            current = next;
        }
    }

    // -----------------------------------------------------------------------
    // Semantics
    // -----------------------------------------------------------------------

    /// The grounded extension.
    pub fn grounded(&self) -> BTreeSet<NodeId> {
        self.ids(&self.grounded_mask())
    }

    /// All preferred extensions, in a deterministic order.
    pub fn preferred(&self, limit: usize) -> AfResult<Vec<BTreeSet<NodeId>>> {
        Ok(self
            .preferred_masks(limit)?
            .iter()
            .map(|m| self.ids(m))
            .collect())
    }

    /// All stable extensions (possibly none).
    pub fn stable(&self, limit: usize) -> AfResult<Vec<BTreeSet<NodeId>>> {
        Ok(self
            .preferred_masks(limit)?
            .into_iter()
            .filter(|m| {
                let hit = self.attacked_by(m);
                (0..self.len()).all(|a| m[a] || hit[a])
            })
            .map(|m| self.ids(&m))
            .collect())
    }

    pub fn extensions(&self, semantics: Semantics, limit: usize) -> AfResult<Vec<BTreeSet<NodeId>>> {
        match semantics {
            Semantics::Grounded => Ok(vec![self.grounded()]),
            Semantics::Preferred => self.preferred(limit),
            Semantics::Stable => self.stable(limit),
        }
    }

    fn preferred_masks(&self, limit: usize) -> AfResult<Vec<Vec<bool>>> {
        let grounded = self.grounded_mask();
        let out = self.attacked_by(&grounded);
        let undecided: Vec<usize> = (0..self.len())
            .filter(|&a| !grounded[a] && !out[a])
            .collect();
        let limit = limit.min(MAX_UNDECIDED);
        if undecided.len() > limit {
            return Err(ArgumentationError::SearchLimit {
                undecided: undecided.len(),
                limit,
            });
        }

        let mut search = UndecidedSearch::new(self, &undecided);
        let open = (0..undecided.len())
            .filter(|&i| search.conflicts[i] & bit(i) == 0)
            .fold(0u64, |acc, i| acc | bit(i));
        search.run(0, 0, open);

        Ok(search
            .found
            .iter()
            .map(|&m| {
                let mut mask = grounded.clone();
                for (i, &a) in undecided.iter().enumerate() {
                    if m & bit(i) != 0 {
                        mask[a] = true;
                    }
                }
                mask
            })
            .collect())
    }
}

// ---------------------------------------------------------------------------
// Preferred search
// ---------------------------------------------------------------------------

/// Undecided arguments are packed into one word.
const MAX_UNDECIDED: usize = 64;

fn bit(i: usize) -> u64 {
    1u64 << i
}

/// Backtracking over the undecided arguments, as bitmasks over their
/// positions.
///
/// The grounded extension neither attacks nor is attacked by an undecided
/// argument, so admissibility of `grounded ∪ M` only depends on attacks among
/// the undecided ones. A branch is cut as soon as everything it could still
/// reach is contained in a set already found.
struct UndecidedSearch {
    /// Arguments each position attacks or is attacked by (itself included
    /// when self-attacking).
    conflicts: Vec<u64>,
    attackers: Vec<u64>,
    targets: Vec<u64>,
    /// Admissible sets, none contained in another.
    found: Vec<u64>,
}

impl UndecidedSearch {
    fn new(af: &AttackGraph, undecided: &[usize]) -> Self {
        let position: HashMap<usize, usize> = undecided
            .iter()
            .enumerate()
            .map(|(i, &a)| (a, i))
            .collect();
        let pack = |indices: &[usize]| {
            indices
                .iter()
                .filter_map(|x| position.get(x))
                .fold(0u64, |acc, &i| acc | bit(i))
        };
        let attackers: Vec<u64> = undecided.iter().map(|&a| pack(&af.attackers[a])).collect();
        let targets: Vec<u64> = undecided.iter().map(|&a| pack(&af.targets[a])).collect();
        let conflicts = attackers.iter().zip(&targets).map(|(a, t)| a | t).collect();
        Self {
            conflicts,
            attackers,
            targets,
            found: Vec::new(),
        }
    }

    /// `open` holds the positions from `pos` on that can still join
    /// `current` without a conflict.
    fn run(&mut self, pos: usize, current: u64, open: u64) {
        let reach = current | open;
        if self.found.iter().any(|&f| reach & !f == 0) {
            return;
        }
        if pos == self.conflicts.len() {
            if self.is_admissible(current) {
                self.found.retain(|&f| f & !current != 0);
                self.found.push(current);
            }
            return;
        }
        let rest = open & !bit(pos);
        if open & bit(pos) != 0 {
            self.run(pos + 1, current | bit(pos), rest & !self.conflicts[pos]);
        }
        self.run(pos + 1, current, rest);
    }

    fn is_admissible(&self, set: u64) -> bool {
        let members = || (0..self.conflicts.len()).filter(move |&i| set & bit(i) != 0);
        let defeated = members().fold(0u64, |acc, i| acc | self.targets[i]);
        members().all(|i| self.attackers[i] & !defeated == 0)
    }
}

fn apx_name(id: &NodeId) -> String {
    id.as_str().to_lowercase()
}

// ---------------------------------------------------------------------------
// Acceptance
// ---------------------------------------------------------------------------

/// Accepted and defeated arguments under one semantics reading.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AcceptanceView {
    pub semantics: Semantics,
    pub acceptance: Acceptance,
    pub accepted: BTreeSet<NodeId>,
    /// Attacked by the grounded extension, or by every extension.
    pub defeated: BTreeSet<NodeId>,
    pub extension_count: usize,
}

impl AcceptanceView {
    pub fn compute(
        af: &AttackGraph,
        semantics: Semantics,
        acceptance: Acceptance,
        limit: usize,
    ) -> AfResult<Self> {
        let extensions = af.extensions(semantics, limit)?;
        let attacked: Vec<BTreeSet<NodeId>> = extensions
            .iter()
            .map(|ext| {
                ext.iter()
                    .flat_map(|a| {
                        af.attacks()
                            .into_iter()
                            .filter(move |(s, _)| *s == a)
                            .map(|(_, t)| t.clone())
                    })
                    .collect()
            })
            .collect();
        let accepted = match (semantics, acceptance) {
            (Semantics::Grounded, _) | (_, Acceptance::Credulous) => {
                extensions.iter().flatten().cloned().collect()
            }
            (_, Acceptance::Skeptical) => intersect(&extensions),
        };
        Ok(Self {
            semantics,
            acceptance,
            accepted,
            defeated: intersect(&attacked),
            extension_count: extensions.len(),
        })
    }

    pub fn is_accepted(&self, id: &str) -> bool {
        self.accepted.contains(id)
    }

    pub fn is_defeated(&self, id: &str) -> bool {
        self.defeated.contains(id)
    }
}

fn intersect(sets: &[BTreeSet<NodeId>]) -> BTreeSet<NodeId> {
    let mut iter = sets.iter();
    let Some(first) = iter.next() else {
        return BTreeSet::new();
    };
    iter.fold(first.clone(), |acc, s| acc.intersection(s).cloned().collect())
}

/// Serializable summary of every semantics for the report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtensionSummary {
    pub arguments: Vec<NodeId>,
    pub attacks: Vec<(NodeId, NodeId)>,
    pub grounded: BTreeSet<NodeId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preferred: Option<Vec<BTreeSet<NodeId>>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stable: Option<Vec<BTreeSet<NodeId>>>,
    /// Why preferred/stable were not computed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inconclusive: Option<String>,
}

impl ExtensionSummary {
    pub fn compute(af: &AttackGraph, limit: usize) -> Self {
        let (preferred, stable, inconclusive) = match (af.preferred(limit), af.stable(limit)) {
            (Ok(p), Ok(s)) => (Some(p), Some(s), None),
            (Err(e), _) | (_, Err(e)) => {
                tracing::warn!(error = %e, "preferred/stable search skipped");
                (None, None, Some(e.to_string()))
            }
        };
        Self {
            arguments: af.arguments().to_vec(),
            attacks: af
                .attacks()
                .into_iter()
                .map(|(s, t)| (s.clone(), t.clone()))
                .collect(),
            grounded: af.grounded(),
            preferred,
            stable,
            inconclusive,
        }
    }
}
