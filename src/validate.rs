//! Strict-graph validator.
//!
//! Re-checks the graph invariants at any time:
//!
//! 1. lexicon completeness (every atom predicate is a key with examples)
//! 2. reference resolution (premise refs and edge endpoints exist)
//! 3. no self-loops
//! 4. unique node ids
//! 5. no derivability gap (inference-capable nodes are rule-backed)
//!
//! plus a single arity per predicate and a known goal. Source text that
//! denies a universal ("not all", "not every") also expects the goal to
//! conclude a negated, existentially quantified statement; a goal of another
//! shape is a warning. [`Validator::validate`]
//! may auto-patch lexicon gaps, multi-arity predicates and derivability gaps
//! (each patch is logged and recorded); it never deletes author content.
//! [`check`] is the read-only form used before every export.

use std::collections::{BTreeMap, HashSet};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::compile::synthesize_implicit_rule;
use crate::config::{PolicyConfig, Resolution};
use crate::error::ValidationError;
use crate::model::{Node, QuantifierKind, StatementSlot, StrictGraph};

pub type ValidationResult<T> = std::result::Result<T, ValidationError>;

// ---------------------------------------------------------------------------
// Report
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Error,
    Warning,
}

/// One finding of a validation pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationIssue {
    pub code: String,
    pub path: String,
    pub message: String,
    pub severity: Severity,
    /// Description of the auto-patch applied, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fix_applied: Option<String>,
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.code, self.path, self.message)?;
        if let Some(fix) = &self.fix_applied {
            write!(f, " (fixed: {fix})")?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub issues: Vec<ValidationIssue>,
}

impl ValidationReport {
    pub fn warnings(&self) -> impl Iterator<Item = &ValidationIssue> {
        self.issues.iter().filter(|i| i.severity == Severity::Warning)
    }

    pub fn patches(&self) -> impl Iterator<Item = &ValidationIssue> {
        self.issues.iter().filter(|i| i.fix_applied.is_some())
    }

    pub fn is_clean(&self) -> bool {
        self.issues.is_empty()
    }

    fn warn(&mut self, code: &str, path: String, message: String) {
        self.issues.push(ValidationIssue {
            code: code.to_string(),
            path,
            message,
            severity: Severity::Warning,
            fix_applied: None,
        });
    }

    fn patched(&mut self, code: &str, path: String, message: String, fix: String) {
        tracing::warn!(code, path = %path, fix = %fix, "auto-patched strict graph");
        self.issues.push(ValidationIssue {
            code: code.to_string(),
            path,
            message,
            severity: Severity::Warning,
            fix_applied: Some(fix),
        });
    }
}

fn node_path(i: usize) -> String {
    format!("graph.nodes[{i}]")
}

fn slot_path(i: usize, slot: StatementSlot, atom: usize) -> String {
    format!("graph.nodes[{i}].{slot}.atoms[{atom}]")
}

// ---------------------------------------------------------------------------
// Validator
// ---------------------------------------------------------------------------

/// Validator parameterized by the auto-patch policy.
pub struct Validator<'a> {
    policy: &'a PolicyConfig,
}

impl<'a> Validator<'a> {
    pub fn new(policy: &'a PolicyConfig) -> Self {
        Self { policy }
    }

    /// Check and (per policy) patch `strict` in place.
    pub fn validate(&self, strict: &mut StrictGraph) -> ValidationResult<ValidationReport> {
        let mut report = ValidationReport::default();
        check_structure(strict)?;
        self.patch_multi_arity(strict, &mut report)?;
        patch_derivability(strict, &mut report);
        self.patch_lexicon(strict, &mut report)?;
        structural_warnings(strict, &mut report);
        not_all_goal_shape(strict, &mut report);
        Ok(report)
    }

    fn patch_multi_arity(
        &self,
        strict: &mut StrictGraph,
        report: &mut ValidationReport,
    ) -> ValidationResult<()> {
        // First arity seen (in visit order) keeps the base key.
        let mut first_arity: BTreeMap<String, usize> = BTreeMap::new();
        let mut clashes: BTreeMap<String, Vec<usize>> = BTreeMap::new();
        for node in &strict.graph.nodes {
            node.visit_statements(|_, s| {
                for a in &s.atoms {
                    let first = *first_arity.entry(a.predicate.clone()).or_insert(a.arity());
                    if first != a.arity() {
                        let seen = clashes.entry(a.predicate.clone()).or_default();
                        if !seen.contains(&a.arity()) {
                            seen.push(a.arity());
                        }
                    }
                }
            });
        }
        if clashes.is_empty() {
            return Ok(());
        }
        if self.policy.multi_arity_predicate == Resolution::Raise {
            let (predicate, extra) = clashes.into_iter().next().unwrap_or_default();
            let mut arities = vec![first_arity.get(&predicate).copied().unwrap_or_default()];
            arities.extend(extra);
            let arities: Vec<String> = arities.iter().map(usize::to_string).collect();
            return Err(ValidationError::MultiArityPredicate {
                predicate,
                arities: arities.join(", "),
            });
        }
        let taken: HashSet<String> = strict.graph.predicate_arities().into_keys().collect();
        let mut renames: BTreeMap<(String, usize), String> = BTreeMap::new();
        for (pred, arities) in &clashes {
            for &arity in arities {
                let mut key = format!("{pred}_{arity}");
                let mut n = 2;
                while taken.contains(&key) {
                    key = format!("{pred}_{arity}_{n}");
                    n += 1;
                }
                renames.insert((pred.clone(), arity), key);
            }
        }
        for (i, node) in strict.graph.nodes.iter_mut().enumerate() {
            node.visit_statements_mut(|slot, s| {
                for (j, a) in s.atoms.iter_mut().enumerate() {
                    if let Some(new_key) = renames.get(&(a.predicate.clone(), a.arity())) {
                        report.patched(
                            "multi_arity_predicate",
                            slot_path(i, slot, j),
                            format!("predicate `{}` reused with arity {}", a.predicate, a.arity()),
                            format!("renamed to `{new_key}`"),
                        );
                        a.predicate = new_key.clone();
                    }
                }
            });
        }
        for ((pred, _), new_key) in &renames {
            let examples = strict
                .lexicon
                .examples(pred)
                .map(<[String]>::to_vec)
                .unwrap_or_default();
            for ex in examples {
                strict.lexicon.insert(new_key.clone(), ex);
            }
        }
        Ok(())
    }

    fn patch_lexicon(
        &self,
        strict: &mut StrictGraph,
        report: &mut ValidationReport,
    ) -> ValidationResult<()> {
        let mut missing: Vec<(String, String)> = Vec::new();
        for (i, node) in strict.graph.nodes.iter().enumerate() {
            node.visit_statements(|slot, s| {
                for (j, a) in s.atoms.iter().enumerate() {
                    let complete = strict
                        .lexicon
                        .examples(&a.predicate)
                        .is_some_and(|ex| !ex.is_empty());
                    if !complete && !missing.iter().any(|(p, _)| p == &a.predicate) {
                        missing.push((a.predicate.clone(), slot_path(i, slot, j)));
                    }
                }
            });
        }
        for (predicate, path) in missing {
            if self.policy.missing_lexicon == Resolution::Raise {
                return Err(ValidationError::MissingLexicon { predicate, path });
            }
            strict.lexicon.ensure(&predicate);
            report.patched(
                "missing_lexicon",
                path,
                format!("predicate `{predicate}` missing from lexicon"),
                format!("added lexicon entry `{predicate}`"),
            );
        }
        Ok(())
    }
}

/// Invariants that are never auto-patched.
fn check_structure(strict: &StrictGraph) -> ValidationResult<()> {
    let graph = &strict.graph;
    let mut seen = HashSet::new();
    for node in &graph.nodes {
        if !seen.insert(node.id.as_str()) {
            return Err(ValidationError::DuplicateNodeId {
                id: node.id.to_string(),
            });
        }
    }
    for (i, node) in graph.nodes.iter().enumerate() {
        for (j, p) in node.premises.iter().enumerate() {
            let Some(target) = p.reference() else { continue };
            let path = format!("{}.premises[{j}]", node_path(i));
            if target == &node.id {
                return Err(ValidationError::SelfLoop {
                    node: node.id.to_string(),
                    path,
                });
            }
            if !seen.contains(target.as_str()) {
                return Err(ValidationError::DanglingReference {
                    target: target.to_string(),
                    path,
                });
            }
        }
        if let Some(b) = node.backed_by.as_ref().filter(|b| !seen.contains(b.as_str())) {
            return Err(ValidationError::DanglingReference {
                target: b.to_string(),
                path: format!("{}.backed_by", node_path(i)),
            });
        }
    }
    for (k, edge) in graph.edges.iter().enumerate() {
        let path = format!("graph.edges[{k}]");
        for end in [&edge.source, &edge.target] {
            if !seen.contains(end.as_str()) {
                return Err(ValidationError::DanglingReference {
                    target: end.to_string(),
                    path: path.clone(),
                });
            }
        }
        if edge.source == edge.target {
            return Err(ValidationError::SelfLoop {
                node: edge.source.to_string(),
                path,
            });
        }
    }
    if let Some(goal) = strict.goal.as_ref().filter(|g| !seen.contains(g.as_str())) {
        return Err(ValidationError::UnknownGoal {
            goal: goal.to_string(),
        });
    }
    Ok(())
}

fn gap_nodes(strict: &StrictGraph) -> Vec<usize> {
    strict
        .graph
        .nodes
        .iter()
        .enumerate()
        .filter(|(_, n)| n.is_inference_capable() && strict.graph.rule_backing(n).is_none())
        .map(|(i, _)| i)
        .collect()
}

fn patch_derivability(strict: &mut StrictGraph, report: &mut ValidationReport) {
    for i in gap_nodes(strict) {
        let rule_node = synthesize_implicit_rule(&strict.graph, &strict.graph.nodes[i]);
        let rule_id = rule_node.id.clone();
        let id = strict.graph.nodes[i].id.clone();
        strict.graph.nodes[i].backed_by = Some(rule_id.clone());
        strict.graph.nodes.push(rule_node);
        report.patched(
            "derivability_gap",
            node_path(i),
            format!("node `{id}` has premises and a conclusion but no rule"),
            format!("synthesized implicit rule `{rule_id}`"),
        );
    }
}

fn structural_warnings(strict: &StrictGraph, report: &mut ValidationReport) {
    let graph = &strict.graph;
    for (i, node) in graph.nodes.iter().enumerate() {
        if let Some(rule) = &node.rule {
            if rule.antecedent_atoms() == 0 && !node.is_implicit_rule() {
                report.warn(
                    "rule_incomplete",
                    format!("{}.rule", node_path(i)),
                    format!("rule `{}` has no antecedent atoms", rule.name),
                );
            }
            if rule.consequent_atoms() == 0 {
                report.warn(
                    "rule_incomplete",
                    format!("{}.rule", node_path(i)),
                    format!("rule `{}` has no consequent atoms", rule.name),
                );
            }
        }
    }
    let index = graph.index();
    for (k, edge) in graph.edges.iter().enumerate() {
        for end in [&edge.source, &edge.target] {
            let contentful = index.get(end.as_str()).is_some_and(|n| has_content(n));
            if !contentful {
                report.warn(
                    "edge_without_content",
                    format!("graph.edges[{k}]"),
                    format!("{edge}: node `{end}` has neither conclusion atoms nor a rule"),
                );
            }
        }
    }
}

/// Phrases that deny a universal claim.
const NOT_ALL_CUES: &[&str] = &["not all", "not every"];

fn not_all_goal_shape(strict: &StrictGraph, report: &mut ValidationReport) {
    let text = strict.source_text.to_lowercase();
    if !NOT_ALL_CUES.iter().any(|cue| text.contains(cue)) {
        return;
    }
    let Some(goal) = &strict.goal else {
        report.warn(
            "not_all_goal_shape",
            "goal".to_string(),
            "source text says `not all` but no goal is selected".to_string(),
        );
        return;
    };
    let Some((i, node)) = strict
        .graph
        .nodes
        .iter()
        .enumerate()
        .find(|(_, n)| &n.id == goal)
    else {
        return;
    };
    let path = format!("{}.conclusion", node_path(i));
    let Some(conclusion) = node.conclusion.as_ref().filter(|c| c.has_atoms()) else {
        report.warn(
            "not_all_goal_shape",
            path,
            format!("goal `{goal}` has no conclusion for `not all` source text"),
        );
        return;
    };
    let mut missing = Vec::new();
    if !conclusion.atoms.iter().any(|a| a.negated) {
        missing.push("a negated atom");
    }
    if !conclusion
        .quantifiers
        .iter()
        .any(|q| q.kind == QuantifierKind::Exists)
    {
        missing.push("an existential quantifier");
    }
    if !missing.is_empty() {
        report.warn(
            "not_all_goal_shape",
            path,
            format!(
                "goal `{goal}` should conclude `some X is not ...` but lacks {}",
                missing.join(" and ")
            ),
        );
    }
}

fn has_content(node: &Node) -> bool {
    node.rule.is_some() || node.conclusion.as_ref().is_some_and(|c| c.has_atoms())
}

/// Read-only validation: every invariant must already hold.
pub fn check(strict: &StrictGraph) -> ValidationResult<()> {
    check_structure(strict)?;
    if let Some((predicate, arities)) = strict
        .graph
        .predicate_arities()
        .into_iter()
        .find(|(_, a)| a.len() > 1)
    {
        let arities: Vec<String> = arities.iter().map(usize::to_string).collect();
        return Err(ValidationError::MultiArityPredicate {
            predicate,
            arities: arities.join(", "),
        });
    }
    if let Some(&i) = gap_nodes(strict).first() {
        return Err(ValidationError::DerivabilityGap {
            node: strict.graph.nodes[i].id.to_string(),
        });
    }
    for (i, node) in strict.graph.nodes.iter().enumerate() {
        let mut missing = None;
        node.visit_statements(|slot, s| {
            for (j, a) in s.atoms.iter().enumerate() {
                let ok = strict
                    .lexicon
                    .examples(&a.predicate)
                    .is_some_and(|ex| !ex.is_empty());
                if !ok && missing.is_none() {
                    missing = Some((a.predicate.clone(), slot_path(i, slot, j)));
                }
            }
        });
        if let Some((predicate, path)) = missing {
            return Err(ValidationError::MissingLexicon { predicate, path });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Atom, Edge, Lexicon, Premise, Statement, Term};

    fn stmt(pred: &str, arg: &str) -> Statement {
        Statement::from_atoms(vec![Atom::new(pred, vec![Term::constant(arg)])])
    }

    fn two_step_graph() -> StrictGraph {
        let mut fact = Node::new("F1");
        fact.conclusion = Some(stmt("raining", "city"));
        let mut step = Node::new("S1");
        step.premises.push(Premise::Reference { target: "F1".into() });
        step.conclusion = Some(stmt("wet", "city"));
        let graph = crate::model::ArgumentGraph {
            nodes: vec![fact, step],
            edges: vec![Edge::support("F1", "S1")],
        };
        StrictGraph::new("", graph, Lexicon::new())
    }

    #[test]
    fn auto_patches_lexicon_and_derivability() {
        let mut strict = two_step_graph();
        let policy = PolicyConfig::default();
        let report = Validator::new(&policy).validate(&mut strict).unwrap();
        assert!(strict.lexicon.contains("raining"));
        assert!(strict.lexicon.contains("wet"));
        assert_eq!(strict.implicit_rule_count(), 1);
        let backing = strict.graph.node("S1").unwrap().backed_by.clone();
        assert_eq!(backing, Some("IR_S1".into()));
        assert!(report.patches().count() >= 3);
        check(&strict).unwrap();
    }

    #[test]
    fn raise_policy_reports_missing_lexicon() {
        let mut strict = two_step_graph();
        let policy = PolicyConfig {
            missing_lexicon: Resolution::Raise,
            ..Default::default()
        };
        let err = Validator::new(&policy).validate(&mut strict).unwrap_err();
        assert!(matches!(err, ValidationError::MissingLexicon { .. }));
    }

    #[test]
    fn dangling_and_self_loops_are_never_patched() {
        let mut strict = two_step_graph();
        strict.graph.edges.push(Edge::attack("S1", "S9"));
        let err = Validator::new(&PolicyConfig::default())
            .validate(&mut strict)
            .unwrap_err();
        assert!(matches!(err, ValidationError::DanglingReference { ref target, .. } if target == "S9"));

        let mut strict = two_step_graph();
        strict.graph.edges.push(Edge::attack("S1", "S1"));
        let err = check(&strict).unwrap_err();
        assert!(matches!(err, ValidationError::SelfLoop { .. }));
    }

    #[test]
    fn duplicate_ids_fail() {
        let mut strict = two_step_graph();
        strict.graph.nodes.push(Node::new("F1"));
        assert!(matches!(
            check(&strict).unwrap_err(),
            ValidationError::DuplicateNodeId { .. }
        ));
    }

    #[test]
    fn multi_arity_is_split_into_suffixed_keys() {
        let mut strict = two_step_graph();
        let mut other = Node::new("F2");
        other.conclusion = Some(Statement::from_atoms(vec![Atom::new(
            "raining",
            vec![Term::constant("city"), Term::constant("today")],
        )]));
        strict.graph.nodes.push(other);
        Validator::new(&PolicyConfig::default())
            .validate(&mut strict)
            .unwrap();
        let f2 = strict.graph.node("F2").unwrap();
        assert_eq!(f2.conclusion.as_ref().unwrap().atoms[0].predicate, "raining_2");
        check(&strict).unwrap();
    }

    fn bird_graph(conclusion: Statement) -> StrictGraph {
        let mut node = Node::new("F1");
        node.conclusion = Some(conclusion);
        let graph = crate::model::ArgumentGraph {
            nodes: vec![node],
            edges: Vec::new(),
        };
        StrictGraph::new("Not all birds can fly.", graph, Lexicon::new()).with_goal("F1")
    }

    fn goal_shape_warnings(strict: &mut StrictGraph) -> Vec<ValidationIssue> {
        Validator::new(&PolicyConfig::default())
            .validate(strict)
            .unwrap()
            .warnings()
            .filter(|w| w.code == "not_all_goal_shape")
            .cloned()
            .collect()
    }

    #[test]
    fn not_all_text_expects_negated_existential_goal() {
        let flies = || Atom::new("can_fly", vec![Term::variable("X")]);

        let mut plain = bird_graph(Statement::from_atoms(vec![flies()]));
        let warnings = goal_shape_warnings(&mut plain);
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].message.contains("a negated atom and an existential quantifier"));

        let mut shaped = Statement::from_atoms(vec![flies().negate()]);
        shaped.quantifiers.push(crate::model::Quantifier {
            kind: QuantifierKind::Exists,
            var: "X".into(),
            sort: None,
        });
        let mut good = bird_graph(shaped);
        assert!(goal_shape_warnings(&mut good).is_empty());

        let mut unrelated = two_step_graph();
        assert!(goal_shape_warnings(&mut unrelated).is_empty());
    }

    #[test]
    fn unknown_goal_fails() {
        let strict = two_step_graph().with_goal("S7");
        assert!(matches!(
            check(&strict).unwrap_err(),
            ValidationError::UnknownGoal { .. }
        ));
    }
}
