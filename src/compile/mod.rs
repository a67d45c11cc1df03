//! Soft → strict compiler.
//!
//! Turns an untrusted [`SoftIr`] into a validated [`StrictGraph`]:
//!
//! - canonical predicate keys through the project [`AliasTable`]
//!   (arity is part of identity; clashes mint suffixed keys)
//! - stable ids in three disjoint namespaces: `F#` facts, `S#` inference
//!   nodes, `IR_<node>` synthesized rules
//! - reference resolution and structural dedup of statements
//! - implicit-rule synthesis for premises ⇒ conclusion steps with no rule
//!
//! Contract violations fail with a typed [`CompileError`] unless the policy
//! says to auto-patch; every auto-patch is logged and recorded in the
//! [`CompileReport`].

pub mod alias;
pub mod canonical;
pub mod select;

use std::collections::{BTreeSet, HashMap};

use serde::{Deserialize, Serialize};

use crate::config::{MendConfig, Resolution};
use crate::error::CompileError;
use crate::model::{
    ArgumentGraph, Atom, AttackKind, Edge, EdgeKind, Lexicon, Node, NodeId, NodeOrigin, Premise,
    Quantifier, QuantifierKind, Rule, Statement, StatementKey, StrictGraph, TextSpan,
};
use crate::soft::{
    Polarity, SoftEdge, SoftGoal, SoftGraph, SoftIr, SoftNode, SoftPremise, SoftQuantifier,
    SoftRule, SoftSpan, SoftStatement,
};
use crate::validate::{ValidationReport, Validator};

pub use alias::AliasTable;

pub type CompileResult<T> = std::result::Result<T, CompileError>;

// ---------------------------------------------------------------------------
// Report
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PatchKind {
    MintedArityKey,
    DroppedReference,
    DroppedEdge,
    DroppedAttackKind,
    DroppedGoal,
    ImplicitRule,
}

/// One deterministic repair of the input applied by the compiler.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AutoPatch {
    pub kind: PatchKind,
    pub path: String,
    pub detail: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CompileReport {
    pub patches: Vec<AutoPatch>,
    pub implicit_rules: usize,
    pub statements_unified: usize,
    pub validation: ValidationReport,
}

impl CompileReport {
    fn patch(&mut self, kind: PatchKind, path: String, detail: String) {
        tracing::warn!(?kind, path = %path, detail = %detail, "compiler auto-patch");
        self.patches.push(AutoPatch { kind, path, detail });
    }

    /// Patches plus validator fixes: the "error count" of best-of-k selection.
    pub fn error_count(&self) -> usize {
        self.patches
            .iter()
            .filter(|p| p.kind != PatchKind::ImplicitRule)
            .count()
            + self.validation.patches().count()
    }
}

/// A compiled graph with its report.
#[derive(Debug, Clone)]
pub struct Compiled {
    pub strict: StrictGraph,
    pub report: CompileReport,
}

// ---------------------------------------------------------------------------
// Compiler
// ---------------------------------------------------------------------------

/// Compiles soft graphs against a shared alias table.
pub struct Compiler<'a> {
    config: &'a MendConfig,
    aliases: &'a AliasTable,
}

/// Per-compilation scratch state.
#[derive(Default)]
struct Session {
    report: CompileReport,
    /// Working copy of the caller's table, absorbed back on success.
    aliases: AliasTable,
    interned: HashMap<StatementKey, Statement>,
    used_keys: BTreeSet<String>,
}

impl<'a> Compiler<'a> {
    pub fn new(config: &'a MendConfig, aliases: &'a AliasTable) -> Self {
        Self { config, aliases }
    }

    pub fn compile(&self, soft: &SoftIr) -> CompileResult<Compiled> {
        let mut session = Session {
            aliases: self.aliases.snapshot(),
            ..Session::default()
        };
        let nodes = &soft.graph.nodes;

        // Provisional id → stable id.
        let mut ids: HashMap<String, NodeId> = HashMap::new();
        let mut assigned: Vec<NodeId> = Vec::with_capacity(nodes.len());
        let (mut facts, mut steps) = (0usize, 0usize);
        for (i, node) in nodes.iter().enumerate() {
            let id = if node.premises.is_empty() && node.rule.is_none() {
                facts += 1;
                NodeId::new(format!("F{facts}"))
            } else {
                steps += 1;
                NodeId::new(format!("S{steps}"))
            };
            let provisional = node.id.clone().unwrap_or_else(|| format!("#{i}"));
            if ids.insert(provisional.clone(), id.clone()).is_some() {
                return Err(CompileError::DuplicateProvisionalId { id: provisional });
            }
            assigned.push(id);
        }

        let mut graph = ArgumentGraph::default();
        for (i, soft_node) in nodes.iter().enumerate() {
            let node = self.lower_node(soft_node, i, &assigned[i], &ids, &mut session)?;
            graph.nodes.push(node);
        }
        graph.edges = self.lower_edges(&soft.graph.edges, &ids, &mut session)?;

        // Referenced rule-only nodes back their dependants; every other gap
        // gets an implicit rule appended after the authored nodes.
        let rule_only: BTreeSet<NodeId> = graph
            .nodes
            .iter()
            .filter(|n| n.rule.is_some() && n.conclusion.is_none())
            .map(|n| n.id.clone())
            .collect();
        let mut pending = Vec::new();
        for node in graph.nodes.iter_mut() {
            if !node.is_inference_capable() || node.rule.is_some() {
                continue;
            }
            let found = node.references().find(|r| rule_only.contains(*r)).cloned();
            if let Some(backing) = found {
                node.backed_by = Some(backing);
                continue;
            }
            pending.push(node.id.clone());
        }
        for id in &pending {
            let Some(idx) = graph.nodes.iter().position(|n| &n.id == id) else {
                continue;
            };
            let rule_node = synthesize_implicit_rule(&graph, &graph.nodes[idx]);
            tracing::info!(node = %id, rule = %rule_node.id, "synthesized implicit rule");
            session.report.patch(
                PatchKind::ImplicitRule,
                format!("graph.nodes[{idx}]"),
                format!("node `{id}` backed by `{}`", rule_node.id),
            );
            graph.nodes[idx].backed_by = Some(rule_node.id.clone());
            graph.nodes.push(rule_node);
            session.report.implicit_rules += 1;
        }

        let mut lexicon = Lexicon::new();
        for key in &session.used_keys {
            if let Some(entry) = session.aliases.entry(key) {
                for ex in entry.examples {
                    lexicon.insert(key.clone(), ex);
                }
            }
            lexicon.ensure(key);
        }

        let mut strict = StrictGraph::new(soft.source_text.clone(), graph, lexicon);
        strict.goal = self.resolve_goal(soft.goal.as_ref(), &ids, &strict.graph, &mut session);

        let validation = Validator::new(&self.config.policy).validate(&mut strict)?;
        session.report.validation = validation;
        self.aliases.absorb(&session.aliases);
        tracing::debug!(
            nodes = strict.graph.nodes.len(),
            edges = strict.graph.edges.len(),
            implicit = session.report.implicit_rules,
            unified = session.report.statements_unified,
            "compiled soft graph"
        );
        Ok(Compiled {
            strict,
            report: session.report,
        })
    }

    fn lower_node(
        &self,
        soft: &SoftNode,
        index: usize,
        id: &NodeId,
        ids: &HashMap<String, NodeId>,
        session: &mut Session,
    ) -> CompileResult<Node> {
        let path = format!("graph.nodes[{index}]");
        let mut node = Node::new(id.clone());
        for (j, premise) in soft.premises.iter().enumerate() {
            let ppath = format!("{path}.premises[{j}]");
            match premise {
                SoftPremise::Statement(s) => {
                    let stmt = self.lower_statement(s, &ppath, session)?;
                    node.premises.push(Premise::Statement(stmt));
                }
                SoftPremise::Ref(r) => {
                    let Some(target) = self.resolve(&r.target, &ppath, ids, session)? else {
                        continue;
                    };
                    if &target == id {
                        return Err(CompileError::SelfLoop {
                            path: ppath,
                            node: id.to_string(),
                        });
                    }
                    node.premises.push(Premise::Reference { target });
                }
            }
        }
        if let Some(rule) = &soft.rule {
            node.rule = Some(self.lower_rule(rule, id, &format!("{path}.rule"), session)?);
        }
        if let Some(c) = &soft.conclusion {
            node.conclusion = Some(self.lower_statement(c, &format!("{path}.conclusion"), session)?);
        }
        node.span = soft.span.as_ref().and_then(lower_span);
        node.rationale = soft.rationale.clone();
        Ok(node)
    }

    fn lower_rule(
        &self,
        rule: &SoftRule,
        owner: &NodeId,
        path: &str,
        session: &mut Session,
    ) -> CompileResult<Rule> {
        let mut lower_all = |list: &[SoftStatement], field: &str| -> CompileResult<Vec<Statement>> {
            list.iter()
                .enumerate()
                .map(|(k, s)| self.lower_statement(s, &format!("{path}.{field}[{k}]"), session))
                .collect()
        };
        Ok(Rule {
            name: rule.name.clone().unwrap_or_else(|| format!("rule_{owner}")),
            strict: rule.strict,
            antecedents: lower_all(&rule.antecedents, "antecedents")?,
            consequents: lower_all(&rule.consequents, "consequents")?,
            exceptions: lower_all(&rule.exceptions, "exceptions")?,
            scheme: rule
                .scheme
                .as_ref()
                .map(|s| s.trim().to_lowercase())
                .filter(|s| !s.is_empty()),
        })
    }

    fn lower_statement(
        &self,
        soft: &SoftStatement,
        path: &str,
        session: &mut Session,
    ) -> CompileResult<Statement> {
        let mut args: Vec<_> = soft.args.iter().map(canonical::type_term).collect();
        let mut surface = soft.pred.as_str();
        let factored;
        if self.config.policy.factor_entities {
            if let Some((rest, entity)) = canonical::factor_entity(surface) {
                factored = rest;
                surface = &factored;
                args.insert(0, crate::model::Term::constant(entity));
            }
        }
        let mint = self.config.policy.arity_mismatch == Resolution::AutoPatch;
        let proposal = session
            .aliases
            .propose(surface, args.len(), mint)
            .map_err(|clash| CompileError::ArityMismatch {
                path: path.to_string(),
                predicate: clash.key,
                expected: clash.expected,
                found: clash.found,
            })?;
        if let Some(base) = &proposal.minted_from {
            session.report.patch(
                PatchKind::MintedArityKey,
                path.to_string(),
                format!("`{base}` is bound to another arity; minted `{}`", proposal.key),
            );
        }
        session.used_keys.insert(proposal.key.clone());

        let mut atom = Atom::new(proposal.key, args);
        atom.negated = soft.polarity == Polarity::Neg;
        let span = soft.span.as_ref().and_then(lower_span);
        let text = soft
            .text
            .clone()
            .or_else(|| soft.span.as_ref().and_then(|s| s.text.clone()))
            .filter(|t| !t.trim().is_empty());
        let quantifiers = soft
            .quantifiers
            .iter()
            .filter_map(|q| lower_quantifier(q, path))
            .collect();
        let stmt = Statement {
            text,
            atoms: vec![atom],
            quantifiers,
            span,
        };

        let key = stmt.key();
        if let Some(existing) = session.interned.get(&key) {
            session.report.statements_unified += 1;
            return Ok(existing.clone());
        }
        session.interned.insert(key, stmt.clone());
        Ok(stmt)
    }

    /// Resolve a provisional id; `Ok(None)` means dropped under the permissive policy.
    fn resolve(
        &self,
        provisional: &str,
        path: &str,
        ids: &HashMap<String, NodeId>,
        session: &mut Session,
    ) -> CompileResult<Option<NodeId>> {
        if let Some(id) = ids.get(provisional.trim()) {
            return Ok(Some(id.clone()));
        }
        match self.config.policy.dangling_reference {
            Resolution::Raise => Err(CompileError::DanglingReference {
                path: path.to_string(),
                target: provisional.to_string(),
            }),
            Resolution::AutoPatch => {
                session.report.patch(
                    PatchKind::DroppedReference,
                    path.to_string(),
                    format!("no node named `{provisional}`; reference dropped"),
                );
                Ok(None)
            }
        }
    }

    fn lower_edges(
        &self,
        edges: &[SoftEdge],
        ids: &HashMap<String, NodeId>,
        session: &mut Session,
    ) -> CompileResult<Vec<Edge>> {
        let mut out: Vec<Edge> = Vec::with_capacity(edges.len());
        for (k, soft) in edges.iter().enumerate() {
            let path = format!("graph.edges[{k}]");
            let Some((kind, implied)) = parse_edge_kind(&soft.kind) else {
                session.report.patch(
                    PatchKind::DroppedEdge,
                    path,
                    format!("unknown edge kind `{}`", soft.kind),
                );
                continue;
            };
            let source = self.resolve(&soft.source, &format!("{path}.source"), ids, session)?;
            let target = self.resolve(&soft.target, &format!("{path}.target"), ids, session)?;
            let (Some(source), Some(target)) = (source, target) else {
                continue;
            };
            if source == target {
                return Err(CompileError::SelfLoop {
                    path,
                    node: source.to_string(),
                });
            }
            let mut edge = Edge {
                source,
                target,
                kind,
                attack_kind: None,
                rationale: soft.rationale.clone().filter(|r| !r.trim().is_empty()),
            };
            if kind == EdgeKind::Attack {
                let requested = soft.attack_kind.as_deref().or(implied);
                edge.attack_kind = match requested.map(|s| s.trim().to_lowercase()).as_deref() {
                    None => None,
                    Some("rebut") => Some(AttackKind::Rebut),
                    Some("undercut") => Some(AttackKind::Undercut),
                    Some(other) => {
                        session.report.patch(
                            PatchKind::DroppedAttackKind,
                            path.clone(),
                            format!("attack subkind `{other}` kept as a plain attack"),
                        );
                        None
                    }
                };
            }
            let duplicate = out.iter().any(|e| {
                e.source == edge.source
                    && e.target == edge.target
                    && e.kind == edge.kind
                    && e.attack_kind == edge.attack_kind
            });
            if !duplicate {
                out.push(edge);
            }
        }
        Ok(out)
    }

    fn resolve_goal(
        &self,
        goal: Option<&SoftGoal>,
        ids: &HashMap<String, NodeId>,
        graph: &ArgumentGraph,
        session: &mut Session,
    ) -> Option<NodeId> {
        let requested = goal?.node_id.trim();
        if let Some(id) = ids.get(requested) {
            return Some(id.clone());
        }
        if graph.contains(requested) {
            return Some(NodeId::new(requested));
        }
        session.report.patch(
            PatchKind::DroppedGoal,
            "goal".to_string(),
            format!("goal `{requested}` names no node; goal left unselected"),
        );
        None
    }
}

fn parse_edge_kind(kind: &str) -> Option<(EdgeKind, Option<&'static str>)> {
    match kind.trim().to_lowercase().as_str() {
        "support" | "supports" => Some((EdgeKind::Support, None)),
        "attack" | "attacks" => Some((EdgeKind::Attack, None)),
        "rebut" | "rebuts" => Some((EdgeKind::Attack, Some("rebut"))),
        "undercut" | "undercuts" => Some((EdgeKind::Attack, Some("undercut"))),
        "undermine" | "undermines" => Some((EdgeKind::Attack, Some("undermine"))),
        _ => None,
    }
}

fn lower_span(span: &SoftSpan) -> Option<TextSpan> {
    match (span.start, span.end) {
        (Some(start), Some(end)) if start <= end => Some(TextSpan {
            start,
            end,
            text: span.text.clone(),
        }),
        _ => None,
    }
}

fn lower_quantifier(q: &SoftQuantifier, path: &str) -> Option<Quantifier> {
    let kind = match q.kind.trim().to_lowercase().as_str() {
        "forall" | "all" | "every" | "universal" => QuantifierKind::Forall,
        "exists" | "some" | "existential" => QuantifierKind::Exists,
        other => {
            tracing::warn!(path, kind = other, "ignoring unknown quantifier");
            return None;
        }
    };
    Some(Quantifier {
        kind,
        var: q.var.trim().to_string(),
        sort: q.sort.clone(),
    })
}

// ---------------------------------------------------------------------------
// Implicit rules
// ---------------------------------------------------------------------------

/// Build the `IR_<node>` rule node licensing `node`'s premises ⇒ conclusion.
///
/// Antecedents are the inline premise statements plus the conclusions of
/// referenced nodes; the consequent is the node's conclusion.
pub fn synthesize_implicit_rule(graph: &ArgumentGraph, node: &Node) -> Node {
    let antecedents: Vec<Statement> = node
        .premises
        .iter()
        .filter_map(|p| match p {
            Premise::Statement(s) => Some(s.clone()),
            Premise::Reference { target } => graph.resolve_reference(target).cloned(),
        })
        .collect();
    let rule_id = NodeId::new(format!("IR_{}", node.id));
    let mut rule_node = Node::new(rule_id.clone());
    rule_node.rule = Some(Rule {
        name: rule_id.to_string(),
        strict: false,
        antecedents,
        consequents: node.conclusion.iter().cloned().collect(),
        exceptions: Vec::new(),
        scheme: None,
    });
    rule_node.origin = NodeOrigin::ImplicitRule {
        backs: node.id.clone(),
    };
    rule_node.rationale = Some(format!("implicit rule licensing {}", node.id));
    rule_node
}

// ---------------------------------------------------------------------------
// Lowering strict → soft
// ---------------------------------------------------------------------------

/// Render a strict graph as soft input that recompiles to the same graph.
///
/// Implicit-rule nodes are dropped (the compiler re-synthesizes them) and
/// canonical keys are used as predicate surfaces.
pub fn lower_to_soft(strict: &StrictGraph) -> SoftIr {
    let stmt = |s: &Statement| -> Vec<SoftStatement> {
        s.atoms
            .iter()
            .map(|a| SoftStatement {
                pred: a.predicate.clone(),
                args: a.args.iter().map(canonical::lower_term).collect(),
                polarity: if a.negated { Polarity::Neg } else { Polarity::Pos },
                text: s.text.clone(),
                span: s.span.as_ref().map(|sp| SoftSpan {
                    text: sp.text.clone(),
                    start: Some(sp.start),
                    end: Some(sp.end),
                }),
                quantifiers: s
                    .quantifiers
                    .iter()
                    .map(|q| SoftQuantifier {
                        kind: match q.kind {
                            QuantifierKind::Forall => "forall".into(),
                            QuantifierKind::Exists => "exists".into(),
                        },
                        var: q.var.clone(),
                        sort: q.sort.clone(),
                    })
                    .collect(),
            })
            .collect()
    };
    let first = |s: &Statement| stmt(s).into_iter().next();
    let all = |list: &[Statement]| list.iter().flat_map(|s| stmt(s)).collect::<Vec<_>>();

    let nodes = strict
        .graph
        .nodes
        .iter()
        .filter(|n| !n.is_implicit_rule())
        .map(|n| SoftNode {
            id: Some(n.id.to_string()),
            premises: n
                .premises
                .iter()
                .flat_map(|p| match p {
                    Premise::Statement(s) => stmt(s)
                        .into_iter()
                        .map(SoftPremise::Statement)
                        .collect::<Vec<_>>(),
                    Premise::Reference { target } => vec![SoftPremise::reference(target.as_str())],
                })
                .collect(),
            rule: n.rule.as_ref().map(|r| SoftRule {
                name: Some(r.name.clone()),
                strict: r.strict,
                antecedents: all(&r.antecedents),
                consequents: all(&r.consequents),
                exceptions: all(&r.exceptions),
                scheme: r.scheme.clone(),
            }),
            conclusion: n.conclusion.as_ref().and_then(first),
            span: n.span.as_ref().map(|sp| SoftSpan {
                text: sp.text.clone(),
                start: Some(sp.start),
                end: Some(sp.end),
            }),
            rationale: n.rationale.clone(),
        })
        .collect();
    let edges = strict
        .graph
        .edges
        .iter()
        .map(|e| SoftEdge {
            source: e.source.to_string(),
            target: e.target.to_string(),
            kind: e.kind.to_string(),
            attack_kind: e.attack_kind.map(|k| match k {
                AttackKind::Rebut => "rebut".to_string(),
                AttackKind::Undercut => "undercut".to_string(),
            }),
            rationale: e.rationale.clone(),
        })
        .collect();
    SoftIr {
        version: strict.version.clone(),
        source_text: strict.source_text.clone(),
        graph: SoftGraph { nodes, edges },
        metadata: Default::default(),
        goal: strict.goal.as_ref().map(|g| SoftGoal {
            node_id: g.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LimitsConfig;

    fn soft(json: &str) -> SoftIr {
        SoftIr::from_json(json, &LimitsConfig::default()).unwrap()
    }

    fn rain_soft() -> SoftIr {
        soft(
            r#"{"source_text": "It rains in the city, so the city is wet.",
                "graph": {"nodes": [
                    {"id": "rain", "conclusion": {"pred": "is raining", "args": ["city"]}},
                    {"id": "wet", "premises": [{"kind": "Ref", "ref": "rain"}],
                     "conclusion": {"pred": "is wet", "args": ["city"]}}
                ], "edges": [{"source": "rain", "target": "wet", "kind": "support"}]},
                "goal": {"node_id": "wet"}}"#,
        )
    }

    fn compile_with(cfg: &MendConfig, ir: &SoftIr) -> CompileResult<Compiled> {
        let aliases = AliasTable::new();
        Compiler::new(cfg, &aliases).compile(ir)
    }

    #[test]
    fn assigns_disjoint_id_namespaces() {
        let out = compile_with(&MendConfig::default(), &rain_soft()).unwrap();
        let ids: Vec<&str> = out.strict.graph.nodes.iter().map(|n| n.id.as_str()).collect();
        assert_eq!(ids, vec!["F1", "S1", "IR_S1"]);
        assert_eq!(out.strict.goal.as_ref().map(NodeId::as_str), Some("S1"));
        assert_eq!(out.strict.graph.edges, vec![Edge::support("F1", "S1")]);
        assert!(out.strict.lexicon.contains("raining"));
        assert!(out.strict.lexicon.contains("wet"));
    }

    #[test]
    fn synthesizes_implicit_rule_from_referenced_conclusions() {
        let out = compile_with(&MendConfig::default(), &rain_soft()).unwrap();
        assert_eq!(out.report.implicit_rules, 1);
        let ir = out.strict.graph.node("IR_S1").unwrap();
        let rule = ir.rule.as_ref().unwrap();
        assert_eq!(rule.antecedents[0].to_string(), "raining(city)");
        assert_eq!(rule.consequents[0].to_string(), "wet(city)");
        assert!(matches!(&ir.origin, NodeOrigin::ImplicitRule { backs } if backs.as_str() == "S1"));
        crate::validate::check(&out.strict).unwrap();
    }

    #[test]
    fn referenced_rule_node_backs_the_step() {
        let ir = soft(
            r#"{"graph": {"nodes": [
                {"id": "r", "rule": {"name": "rain makes wet",
                    "antecedents": [{"pred": "raining", "args": ["X"]}],
                    "consequents": [{"pred": "wet", "args": ["X"]}]}},
                {"id": "f", "conclusion": {"pred": "raining", "args": ["city"]}},
                {"id": "s", "premises": [{"kind": "Ref", "ref": "f"}, {"kind": "Ref", "ref": "r"}],
                 "conclusion": {"pred": "wet", "args": ["city"]}}
            ], "edges": []}}"#,
        );
        let out = compile_with(&MendConfig::default(), &ir).unwrap();
        assert_eq!(out.report.implicit_rules, 0);
        let step = out.strict.graph.node("S2").unwrap();
        assert_eq!(step.backed_by.as_ref().map(NodeId::as_str), Some("S1"));
    }

    #[test]
    fn dangling_reference_raises_by_default() {
        let ir = soft(
            r#"{"graph": {"nodes": [
                {"id": "s", "premises": [{"kind": "Ref", "ref": "ghost"}],
                 "conclusion": {"pred": "wet", "args": ["city"]}}
            ], "edges": []}}"#,
        );
        let err = compile_with(&MendConfig::default(), &ir).unwrap_err();
        assert!(matches!(
            err,
            CompileError::DanglingReference { ref target, ref path }
                if target == "ghost" && path == "graph.nodes[0].premises[0]"
        ));
    }

    #[test]
    fn dangling_reference_is_dropped_under_auto_patch() {
        let mut cfg = MendConfig::default();
        cfg.policy.dangling_reference = Resolution::AutoPatch;
        let ir = soft(
            r#"{"graph": {"nodes": [
                {"id": "a", "conclusion": {"pred": "wet", "args": ["city"]}}
            ], "edges": [{"source": "a", "target": "ghost", "kind": "attack"}]}}"#,
        );
        let out = compile_with(&cfg, &ir).unwrap();
        assert!(out.strict.graph.edges.is_empty());
        assert!(out.report.patches.iter().any(|p| p.kind == PatchKind::DroppedReference));
    }

    #[test]
    fn duplicate_provisional_ids_are_rejected() {
        let ir = soft(r#"{"graph": {"nodes": [{"id": "a"}, {"id": "a"}], "edges": []}}"#);
        let err = compile_with(&MendConfig::default(), &ir).unwrap_err();
        assert!(matches!(err, CompileError::DuplicateProvisionalId { .. }));
    }

    #[test]
    fn self_loop_edge_is_rejected() {
        let ir = soft(
            r#"{"graph": {"nodes": [{"id": "a"}],
                "edges": [{"source": "a", "target": "a", "kind": "attack"}]}}"#,
        );
        let err = compile_with(&MendConfig::default(), &ir).unwrap_err();
        assert!(matches!(err, CompileError::SelfLoop { .. }));
    }

    #[test]
    fn arity_clash_mints_or_raises_per_policy() {
        let ir = soft(
            r#"{"graph": {"nodes": [
                {"conclusion": {"pred": "likes", "args": ["ann", "bob"]}},
                {"conclusion": {"pred": "likes", "args": ["ann"]}}
            ], "edges": []}}"#,
        );
        let out = compile_with(&MendConfig::default(), &ir).unwrap();
        let f2 = out.strict.graph.node("F2").unwrap();
        assert_eq!(f2.conclusion.as_ref().unwrap().atoms[0].predicate, "likes_1");

        let mut cfg = MendConfig::default();
        cfg.policy.arity_mismatch = Resolution::Raise;
        let err = compile_with(&cfg, &ir).unwrap_err();
        assert!(matches!(err, CompileError::ArityMismatch { expected: 2, found: 1, .. }));
    }

    #[test]
    fn unifies_structurally_identical_statements() {
        let ir = soft(
            r#"{"graph": {"nodes": [
                {"conclusion": {"pred": "is raining", "args": ["city"], "text": "it rains"}},
                {"premises": [{"pred": "raining", "args": ["city"]}],
                 "conclusion": {"pred": "wet", "args": ["city"]}}
            ], "edges": []}}"#,
        );
        let out = compile_with(&MendConfig::default(), &ir).unwrap();
        assert_eq!(out.report.statements_unified, 1);
        let s1 = out.strict.graph.node("S1").unwrap();
        let premise = s1.premises[0].statement().unwrap();
        assert_eq!(premise.text.as_deref(), Some("it rains"));
    }

    #[test]
    fn quantifiers_keep_statements_apart() {
        let ir = soft(
            r#"{"graph": {"nodes": [
                {"conclusion": {"pred": "flies", "args": ["X"],
                    "quantifiers": [{"kind": "forall", "var": "X"}]}},
                {"conclusion": {"pred": "flies", "args": ["X"],
                    "quantifiers": [{"kind": "exists", "var": "X"}]}},
                {"conclusion": {"pred": "flies", "args": ["X"],
                    "quantifiers": [{"kind": "exists", "var": "X"}]}}
            ], "edges": []}}"#,
        );
        let out = compile_with(&MendConfig::default(), &ir).unwrap();
        assert_eq!(out.report.statements_unified, 1);
        let kinds: Vec<QuantifierKind> = out
            .strict
            .graph
            .nodes
            .iter()
            .filter_map(|n| n.conclusion.as_ref())
            .map(|c| c.quantifiers[0].kind)
            .collect();
        assert_eq!(
            kinds,
            vec![QuantifierKind::Forall, QuantifierKind::Exists, QuantifierKind::Exists]
        );
    }

    #[test]
    fn failed_compile_leaves_alias_table_untouched() {
        let aliases = AliasTable::new();
        let broken = soft(
            r#"{"graph": {"nodes": [
                {"id": "a", "conclusion": {"pred": "is flooded", "args": ["city"]}}
            ], "edges": [{"source": "a", "target": "a", "kind": "attack"}]}}"#,
        );
        let cfg = MendConfig::default();
        assert!(Compiler::new(&cfg, &aliases).compile(&broken).is_err());
        assert_eq!(aliases.len(), 0);
        assert!(aliases.entry("flooded").is_none());

        Compiler::new(&cfg, &aliases).compile(&rain_soft()).unwrap();
        assert!(aliases.entry("raining").is_some());
        assert!(aliases.entry("wet").is_some());
    }

    #[test]
    fn edge_rationale_survives_compilation() {
        let ir = soft(
            r#"{"graph": {"nodes": [
                {"id": "a", "conclusion": {"pred": "raining", "args": ["city"]}},
                {"id": "b", "conclusion": {"pred": "dry", "args": ["city"]}}
            ], "edges": [{"source": "b", "target": "a", "kind": "support",
                          "rationale": "However, the streets are dry"}]}}"#,
        );
        let out = compile_with(&MendConfig::default(), &ir).unwrap();
        let edge = &out.strict.graph.edges[0];
        assert_eq!(edge.rationale.as_deref(), Some("However, the streets are dry"));
        let lowered = lower_to_soft(&out.strict);
        assert_eq!(lowered.graph.edges[0].rationale, edge.rationale);
    }

    #[test]
    fn factors_proper_noun_subjects_into_constants() {
        let ir = soft(r#"{"graph": {"nodes": [{"conclusion": {"pred": "Paris is wet"}}], "edges": []}}"#);
        let out = compile_with(&MendConfig::default(), &ir).unwrap();
        let c = out.strict.graph.node("F1").unwrap().conclusion.clone().unwrap();
        assert_eq!(c.to_string(), "wet(paris)");
    }

    #[test]
    fn recompiling_a_strict_graph_is_idempotent() {
        let first = compile_with(&MendConfig::default(), &rain_soft()).unwrap();
        let seeded = AliasTable::from_strict(&first.strict);
        let lowered = lower_to_soft(&first.strict);
        let second = Compiler::new(&MendConfig::default(), &seeded)
            .compile(&lowered)
            .unwrap();
        assert_eq!(second.strict, first.strict);
        assert_eq!(second.strict.implicit_rule_count(), first.strict.implicit_rule_count());
        assert_eq!(second.strict.lexicon, first.strict.lexicon);
    }
}
