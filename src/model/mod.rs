//! Strict graph model: typed terms, atoms, statements, rules, nodes and edges.
//!
//! Everything here is produced by the compiler from untrusted input and is
//! treated as immutable afterwards. Repairs never mutate a [`StrictGraph`] in
//! place; they build a patched copy (see [`crate::repair::patch`]).
//!
//! - [`Term`] / [`Atom`] / [`Statement`]: the propositional content
//! - [`Rule`]: strict or defeasible inference licence with exception guards
//! - [`Node`] / [`Premise`]: argument steps; premises are a tagged union of
//!   inline statements and references to other nodes' conclusions
//! - [`Edge`]: support or attack relations between nodes
//! - [`Lexicon`]: canonical predicate → surface examples

pub mod lexicon;

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

pub use lexicon::Lexicon;

/// Version tag written into every compiled graph.
pub const STRICT_VERSION: &str = "argmend-strict/1";

// ---------------------------------------------------------------------------
// Node ids
// ---------------------------------------------------------------------------

/// Stable node identifier assigned by the compiler.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(String);

impl NodeId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for NodeId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl std::borrow::Borrow<str> for NodeId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

// ---------------------------------------------------------------------------
// Terms and atoms
// ---------------------------------------------------------------------------

/// Kind tag for a [`Term`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TermKind {
    Constant,
    Variable,
    Action,
    Number,
    String,
}

impl fmt::Display for TermKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Constant => write!(f, "constant"),
            Self::Variable => write!(f, "variable"),
            Self::Action => write!(f, "action"),
            Self::Number => write!(f, "number"),
            Self::String => write!(f, "string"),
        }
    }
}

/// A typed argument of an atom.
///
/// Identity is `(kind, name)`; the optional sort is carried along but does not
/// participate in equality or hashing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Term {
    pub kind: TermKind,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sort: Option<String>,
}

impl Term {
    pub fn constant(name: impl Into<String>) -> Self {
        Self {
            kind: TermKind::Constant,
            name: name.into(),
            sort: None,
        }
    }

    pub fn variable(name: impl Into<String>) -> Self {
        Self {
            kind: TermKind::Variable,
            name: name.into(),
            sort: None,
        }
    }

    pub fn is_variable(&self) -> bool {
        self.kind == TermKind::Variable
    }
}

impl PartialEq for Term {
    fn eq(&self, other: &Self) -> bool {
        self.kind == other.kind && self.name == other.name
    }
}

impl Eq for Term {}

impl PartialOrd for Term {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Term {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        (self.kind, &self.name).cmp(&(other.kind, &other.name))
    }
}

impl Hash for Term {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.kind.hash(state);
        self.name.hash(state);
    }
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            TermKind::String => write!(f, "\"{}\"", self.name),
            _ => f.write_str(&self.name),
        }
    }
}

/// A predicate applied to an ordered list of terms, optionally negated.
///
/// Two atoms are structurally equal iff predicate, arity, argument sequence and
/// polarity all match.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Atom {
    pub predicate: String,
    #[serde(default)]
    pub args: Vec<Term>,
    #[serde(default)]
    pub negated: bool,
}

impl Atom {
    pub fn new(predicate: impl Into<String>, args: Vec<Term>) -> Self {
        Self {
            predicate: predicate.into(),
            args,
            negated: false,
        }
    }

    pub fn negate(mut self) -> Self {
        self.negated = !self.negated;
        self
    }

    pub fn arity(&self) -> usize {
        self.args.len()
    }

    pub fn is_ground(&self) -> bool {
        !self.args.iter().any(Term::is_variable)
    }

    /// Same predicate and arguments, opposite polarity.
    pub fn contradicts(&self, other: &Atom) -> bool {
        self.predicate == other.predicate
            && self.args == other.args
            && self.negated != other.negated
    }
}

impl fmt::Display for Atom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.negated {
            write!(f, "~")?;
        }
        write!(f, "{}", self.predicate)?;
        if !self.args.is_empty() {
            let args: Vec<String> = self.args.iter().map(|t| t.to_string()).collect();
            write!(f, "({})", args.join(","))?;
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Statements
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuantifierKind {
    Forall,
    Exists,
}

/// An explicit quantifier binding on a statement.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Quantifier {
    pub kind: QuantifierKind,
    pub var: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sort: Option<String>,
}

/// Byte span into the original source text.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TextSpan {
    pub start: usize,
    pub end: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

/// A conjunction of atoms with optional source text and quantifier bindings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Statement {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default)]
    pub atoms: Vec<Atom>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub quantifiers: Vec<Quantifier>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub span: Option<TextSpan>,
}

/// Structural identity of a statement: its quantifier prefix and canonical
/// atoms (with term kinds), in order.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StatementKey(String);

impl Statement {
    pub fn from_atoms(atoms: Vec<Atom>) -> Self {
        Self {
            text: None,
            atoms,
            quantifiers: Vec::new(),
            span: None,
        }
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    pub fn key(&self) -> StatementKey {
        let mut key = String::new();
        for q in &self.quantifiers {
            let kind = match q.kind {
                QuantifierKind::Forall => "forall",
                QuantifierKind::Exists => "exists",
            };
            key.push_str(&format!("{kind} {}. ", q.var));
        }
        let parts: Vec<String> = self
            .atoms
            .iter()
            .map(|a| {
                let args: Vec<String> = a.args.iter().map(|t| format!("{}:{}", t.kind, t.name)).collect();
                let sign = if a.negated { "~" } else { "" };
                format!("{sign}{}({})", a.predicate, args.join(","))
            })
            .collect();
        key.push_str(&parts.join(" & "));
        StatementKey(key)
    }

    pub fn has_atoms(&self) -> bool {
        !self.atoms.is_empty()
    }

    pub fn variables(&self) -> BTreeSet<String> {
        self.atoms
            .iter()
            .flat_map(|a| a.args.iter())
            .filter(|t| t.is_variable())
            .map(|t| t.name.clone())
            .collect()
    }

    pub fn is_negated(&self) -> bool {
        self.atoms.iter().any(|a| a.negated)
    }
}

impl fmt::Display for Statement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.atoms.is_empty() {
            return write!(f, "\"{}\"", self.text.as_deref().unwrap_or(""));
        }
        let parts: Vec<String> = self.atoms.iter().map(|a| a.to_string()).collect();
        write!(f, "{}", parts.join(" & "))
    }
}

// ---------------------------------------------------------------------------
// Rules
// ---------------------------------------------------------------------------

/// An inference licence: antecedents ⇒ consequents unless an exception holds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rule {
    pub name: String,
    #[serde(default)]
    pub strict: bool,
    #[serde(default)]
    pub antecedents: Vec<Statement>,
    #[serde(default)]
    pub consequents: Vec<Statement>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub exceptions: Vec<Statement>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scheme: Option<String>,
}

impl Rule {
    pub fn antecedent_atoms(&self) -> usize {
        self.antecedents.iter().map(|s| s.atoms.len()).sum()
    }

    pub fn consequent_atoms(&self) -> usize {
        self.consequents.iter().map(|s| s.atoms.len()).sum()
    }
}

// ---------------------------------------------------------------------------
// Nodes
// ---------------------------------------------------------------------------

/// A premise is either an inline statement or a reference to another node's
/// conclusion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum Premise {
    #[serde(rename = "Stmt")]
    Statement(Statement),
    #[serde(rename = "Ref")]
    Reference {
        #[serde(rename = "ref")]
        target: NodeId,
    },
}

impl Premise {
    pub fn statement(&self) -> Option<&Statement> {
        match self {
            Premise::Statement(s) => Some(s),
            Premise::Reference { .. } => None,
        }
    }

    pub fn reference(&self) -> Option<&NodeId> {
        match self {
            Premise::Statement(_) => None,
            Premise::Reference { target } => Some(target),
        }
    }
}

/// Who put a node into the graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum NodeOrigin {
    /// Asserted by the argument's author (via the extraction source).
    #[default]
    Authored,
    /// Synthesized rule node standing in for an inferred-but-unstated rule.
    ImplicitRule { backs: NodeId },
    /// Fact node added by a content repair (abduction).
    Hypothesis,
    /// Abstract defender argument added by a structural repair.
    Defender,
}

/// One argument step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub id: NodeId,
    #[serde(default)]
    pub premises: Vec<Premise>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rule: Option<Rule>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conclusion: Option<Statement>,
    /// Implicit-rule node that licenses this step, when the author gave none.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backed_by: Option<NodeId>,
    #[serde(default)]
    pub origin: NodeOrigin,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub span: Option<TextSpan>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rationale: Option<String>,
}

impl Node {
    pub fn new(id: impl Into<NodeId>) -> Self {
        Self {
            id: id.into(),
            premises: Vec::new(),
            rule: None,
            conclusion: None,
            backed_by: None,
            origin: NodeOrigin::Authored,
            span: None,
            rationale: None,
        }
    }

    /// No premises and no rule.
    pub fn is_fact(&self) -> bool {
        self.premises.is_empty() && self.rule.is_none()
    }

    /// Has a conclusion derived from premises and/or a rule.
    pub fn is_inference_step(&self) -> bool {
        self.conclusion.is_some() && (!self.premises.is_empty() || self.rule.is_some())
    }

    /// Has premises and a conclusion: must be licensed by some rule.
    pub fn is_inference_capable(&self) -> bool {
        !self.premises.is_empty() && self.conclusion.is_some()
    }

    pub fn is_implicit_rule(&self) -> bool {
        matches!(self.origin, NodeOrigin::ImplicitRule { .. })
    }

    /// Atoms carried by the node itself (conclusion and inline premises),
    /// excluding rule content.
    pub fn has_own_atoms(&self) -> bool {
        self.conclusion.as_ref().is_some_and(Statement::has_atoms)
            || self
                .premises
                .iter()
                .filter_map(Premise::statement)
                .any(Statement::has_atoms)
    }

    pub fn references(&self) -> impl Iterator<Item = &NodeId> {
        self.premises.iter().filter_map(Premise::reference)
    }

    /// Visit every statement of the node with its relative path.
    pub fn visit_statements<'a>(&'a self, mut f: impl FnMut(StatementSlot, &'a Statement)) {
        for (i, p) in self.premises.iter().enumerate() {
            if let Premise::Statement(s) = p {
                f(StatementSlot::Premise(i), s);
            }
        }
        if let Some(rule) = &self.rule {
            for (i, s) in rule.antecedents.iter().enumerate() {
                f(StatementSlot::Antecedent(i), s);
            }
            for (i, s) in rule.consequents.iter().enumerate() {
                f(StatementSlot::Consequent(i), s);
            }
            for (i, s) in rule.exceptions.iter().enumerate() {
                f(StatementSlot::Exception(i), s);
            }
        }
        if let Some(c) = &self.conclusion {
            f(StatementSlot::Conclusion, c);
        }
    }

    pub fn visit_statements_mut(&mut self, mut f: impl FnMut(StatementSlot, &mut Statement)) {
        for (i, p) in self.premises.iter_mut().enumerate() {
            if let Premise::Statement(s) = p {
                f(StatementSlot::Premise(i), s);
            }
        }
        if let Some(rule) = &mut self.rule {
            for (i, s) in rule.antecedents.iter_mut().enumerate() {
                f(StatementSlot::Antecedent(i), s);
            }
            for (i, s) in rule.consequents.iter_mut().enumerate() {
                f(StatementSlot::Consequent(i), s);
            }
            for (i, s) in rule.exceptions.iter_mut().enumerate() {
                f(StatementSlot::Exception(i), s);
            }
        }
        if let Some(c) = &mut self.conclusion {
            f(StatementSlot::Conclusion, c);
        }
    }
}

/// Where a statement sits inside a node; renders as a path suffix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatementSlot {
    Premise(usize),
    Antecedent(usize),
    Consequent(usize),
    Exception(usize),
    Conclusion,
}

impl fmt::Display for StatementSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Premise(i) => write!(f, "premises[{i}]"),
            Self::Antecedent(i) => write!(f, "rule.antecedents[{i}]"),
            Self::Consequent(i) => write!(f, "rule.consequents[{i}]"),
            Self::Exception(i) => write!(f, "rule.exceptions[{i}]"),
            Self::Conclusion => write!(f, "conclusion"),
        }
    }
}

// ---------------------------------------------------------------------------
// Edges
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgeKind {
    Support,
    Attack,
}

impl fmt::Display for EdgeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Support => write!(f, "support"),
            Self::Attack => write!(f, "attack"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttackKind {
    Rebut,
    Undercut,
}

/// A directed support or attack relation between two nodes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Edge {
    pub source: NodeId,
    pub target: NodeId,
    pub kind: EdgeKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attack_kind: Option<AttackKind>,
    /// Free-text justification the author attached to the relation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rationale: Option<String>,
}

impl Edge {
    pub fn support(source: impl Into<NodeId>, target: impl Into<NodeId>) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
            kind: EdgeKind::Support,
            attack_kind: None,
            rationale: None,
        }
    }

    pub fn attack(source: impl Into<NodeId>, target: impl Into<NodeId>) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
            kind: EdgeKind::Attack,
            attack_kind: None,
            rationale: None,
        }
    }

    pub fn with_rationale(mut self, rationale: impl Into<String>) -> Self {
        self.rationale = Some(rationale.into());
        self
    }

    pub fn with_attack_kind(mut self, kind: AttackKind) -> Self {
        self.attack_kind = Some(kind);
        self
    }

    pub fn is_attack(&self) -> bool {
        self.kind == EdgeKind::Attack
    }
}

impl fmt::Display for Edge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({} -> {})", self.kind, self.source, self.target)
    }
}

// ---------------------------------------------------------------------------
// Graphs
// ---------------------------------------------------------------------------

/// Nodes (unique ids) and edges between them.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ArgumentGraph {
    #[serde(default)]
    pub nodes: Vec<Node>,
    #[serde(default)]
    pub edges: Vec<Edge>,
}

impl ArgumentGraph {
    pub fn node(&self, id: &str) -> Option<&Node> {
        self.nodes.iter().find(|n| n.id.as_str() == id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.node(id).is_some()
    }

    /// Id → node lookup table for repeated access.
    pub fn index(&self) -> HashMap<&str, &Node> {
        self.nodes.iter().map(|n| (n.id.as_str(), n)).collect()
    }

    pub fn attacks(&self) -> impl Iterator<Item = &Edge> {
        self.edges.iter().filter(|e| e.kind == EdgeKind::Attack)
    }

    pub fn supports(&self) -> impl Iterator<Item = &Edge> {
        self.edges.iter().filter(|e| e.kind == EdgeKind::Support)
    }

    /// Ids of nodes referenced as a premise by some other node.
    pub fn referenced_ids(&self) -> BTreeSet<&NodeId> {
        self.nodes.iter().flat_map(Node::references).collect()
    }

    /// The statement a reference premise stands for: the target's conclusion.
    pub fn resolve_reference(&self, target: &NodeId) -> Option<&Statement> {
        self.node(target.as_str()).and_then(|n| n.conclusion.as_ref())
    }

    /// The node whose rule licenses `node`'s inference: the node itself when
    /// it carries a rule, its `backed_by` rule node, or a referenced rule-only
    /// node.
    pub fn rule_backing<'a>(&'a self, node: &'a Node) -> Option<&'a NodeId> {
        if node.rule.is_some() {
            return Some(&node.id);
        }
        let is_rule_node =
            |id: &NodeId| self.node(id.as_str()).is_some_and(|n| n.rule.is_some());
        if let Some(b) = node.backed_by.as_ref().filter(|b| is_rule_node(b)) {
            return Some(b);
        }
        node.references().find(|id| {
            self.node(id.as_str())
                .is_some_and(|n| n.rule.is_some() && n.conclusion.is_none())
        })
    }

    /// Predicate → set of arities observed anywhere in the graph.
    pub fn predicate_arities(&self) -> BTreeMap<String, BTreeSet<usize>> {
        let mut out: BTreeMap<String, BTreeSet<usize>> = BTreeMap::new();
        for node in &self.nodes {
            node.visit_statements(|_, s| {
                for a in &s.atoms {
                    out.entry(a.predicate.clone()).or_default().insert(a.arity());
                }
            });
        }
        out
    }

    /// Constant names appearing in any atom.
    pub fn constants(&self) -> BTreeSet<String> {
        let mut out = BTreeSet::new();
        for node in &self.nodes {
            node.visit_statements(|_, s| {
                for a in &s.atoms {
                    for t in &a.args {
                        if t.kind == TermKind::Constant {
                            out.insert(t.name.clone());
                        }
                    }
                }
            });
        }
        out
    }
}

/// The compiled container: version, source, graph, lexicon and goal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrictGraph {
    pub version: String,
    #[serde(default)]
    pub source_text: String,
    pub graph: ArgumentGraph,
    pub lexicon: Lexicon,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub goal: Option<NodeId>,
}

impl StrictGraph {
    pub fn new(source_text: impl Into<String>, graph: ArgumentGraph, lexicon: Lexicon) -> Self {
        Self {
            version: STRICT_VERSION.to_string(),
            source_text: source_text.into(),
            graph,
            lexicon,
            goal: None,
        }
    }

    pub fn with_goal(mut self, goal: impl Into<NodeId>) -> Self {
        self.goal = Some(goal.into());
        self
    }

    pub fn implicit_rule_count(&self) -> usize {
        self.graph.nodes.iter().filter(|n| n.is_implicit_rule()).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn term_identity_ignores_sort() {
        let mut a = Term::constant("city");
        a.sort = Some("place".into());
        let b = Term::constant("city");
        assert_eq!(a, b);
        assert_ne!(Term::constant("X"), Term::variable("X"));
    }

    #[test]
    fn atoms_contradict_only_on_opposite_polarity() {
        let wet = Atom::new("wet", vec![Term::constant("city")]);
        let dry = wet.clone().negate();
        assert!(wet.contradicts(&dry));
        assert!(!wet.contradicts(&wet));
        let other = Atom::new("wet", vec![Term::constant("town")]).negate();
        assert!(!wet.contradicts(&other));
    }

    #[test]
    fn node_classification() {
        let mut fact = Node::new("F1");
        fact.conclusion = Some(Statement::from_atoms(vec![Atom::new("raining", vec![])]));
        assert!(fact.is_fact());
        assert!(!fact.is_inference_step());

        let mut step = Node::new("S1");
        step.premises.push(Premise::Reference { target: "F1".into() });
        step.conclusion = Some(Statement::from_atoms(vec![Atom::new("wet", vec![])]));
        assert!(step.is_inference_capable());
        assert!(step.is_inference_step());
    }

    #[test]
    fn premise_serializes_as_tagged_union() {
        let p = Premise::Reference { target: "F1".into() };
        let json = serde_json::to_string(&p).unwrap();
        assert_eq!(json, r#"{"kind":"Ref","ref":"F1"}"#);
        let back: Premise = serde_json::from_str(&json).unwrap();
        assert_eq!(back, p);
    }

    #[test]
    fn statement_key_is_structural() {
        let a = Statement::from_atoms(vec![Atom::new("p", vec![Term::constant("a")])])
            .with_text("P holds of a");
        let b = Statement::from_atoms(vec![Atom::new("p", vec![Term::constant("a")])]);
        assert_eq!(a.key(), b.key());
    }

    #[test]
    fn statement_key_tracks_quantifiers() {
        let atom = || Atom::new("flies", vec![Term::variable("X")]);
        let quantified = |kind| {
            let mut s = Statement::from_atoms(vec![atom()]);
            s.quantifiers.push(Quantifier {
                kind,
                var: "X".into(),
                sort: None,
            });
            s
        };
        let bare = Statement::from_atoms(vec![atom()]);
        let every = quantified(QuantifierKind::Forall);
        let some = quantified(QuantifierKind::Exists);
        assert_ne!(bare.key(), every.key());
        assert_ne!(every.key(), some.key());
        assert_eq!(some.key(), quantified(QuantifierKind::Exists).key());

        let number = Statement::from_atoms(vec![Atom::new(
            "age",
            vec![Term {
                kind: TermKind::Number,
                name: "42".into(),
                sort: None,
            }],
        )]);
        let constant = Statement::from_atoms(vec![Atom::new("age", vec![Term::constant("42")])]);
        assert_ne!(number.key(), constant.key());
    }
}
