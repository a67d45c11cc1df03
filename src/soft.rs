//! Permissive ("soft") input graph as emitted by the extraction source.
//!
//! Nothing here is trusted. [`SoftIr::from_json`] rejects non-object payloads,
//! caps node/edge counts, strips control characters and truncates long
//! strings before the payload is deserialized into typed soft structures.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::LimitsConfig;
use crate::error::InputError;

pub type InputResult<T> = std::result::Result<T, InputError>;

// ---------------------------------------------------------------------------
// Soft types
// ---------------------------------------------------------------------------

/// Source span as reported by the extractor; every part is optional.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SoftSpan {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end: Option<usize>,
}

/// A term argument: a bare string/number, or an explicitly typed object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SoftTerm {
    Plain(String),
    Number(serde_json::Number),
    Typed {
        value: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        kind: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        sort: Option<String>,
    },
}

impl SoftTerm {
    pub fn value(&self) -> String {
        match self {
            SoftTerm::Plain(s) => s.clone(),
            SoftTerm::Number(n) => n.to_string(),
            SoftTerm::Typed { value, .. } => value.clone(),
        }
    }
}

impl From<&str> for SoftTerm {
    fn from(s: &str) -> Self {
        SoftTerm::Plain(s.to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Polarity {
    #[default]
    Pos,
    Neg,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SoftQuantifier {
    pub kind: String,
    pub var: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sort: Option<String>,
}

/// One free-form predicate application.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SoftStatement {
    pub pred: String,
    #[serde(default)]
    pub args: Vec<SoftTerm>,
    #[serde(default)]
    pub polarity: Polarity,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub span: Option<SoftSpan>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub quantifiers: Vec<SoftQuantifier>,
}

impl SoftStatement {
    pub fn new(pred: &str, args: &[&str]) -> Self {
        Self {
            pred: pred.to_string(),
            args: args.iter().map(|a| SoftTerm::from(*a)).collect(),
            polarity: Polarity::Pos,
            text: None,
            span: None,
            quantifiers: Vec::new(),
        }
    }

    pub fn negated(mut self) -> Self {
        self.polarity = Polarity::Neg;
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SoftRule {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default)]
    pub strict: bool,
    #[serde(default)]
    pub antecedents: Vec<SoftStatement>,
    #[serde(default)]
    pub consequents: Vec<SoftStatement>,
    #[serde(default)]
    pub exceptions: Vec<SoftStatement>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scheme: Option<String>,
}

/// `{"kind": "Ref", "ref": "<id>"}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SoftRef {
    #[serde(default = "ref_kind")]
    pub kind: String,
    #[serde(rename = "ref")]
    pub target: String,
}

fn ref_kind() -> String {
    "Ref".to_string()
}

/// Premises arrive either as inline statements or as references.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SoftPremise {
    Ref(SoftRef),
    Statement(SoftStatement),
}

impl SoftPremise {
    pub fn reference(target: &str) -> Self {
        SoftPremise::Ref(SoftRef {
            kind: ref_kind(),
            target: target.to_string(),
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SoftNode {
    /// Provisional id; the compiler assigns stable ids.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default)]
    pub premises: Vec<SoftPremise>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rule: Option<SoftRule>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conclusion: Option<SoftStatement>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub span: Option<SoftSpan>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rationale: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SoftEdge {
    pub source: String,
    pub target: String,
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attack_kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rationale: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SoftGraph {
    #[serde(default)]
    pub nodes: Vec<SoftNode>,
    #[serde(default)]
    pub edges: Vec<SoftEdge>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SoftGoal {
    pub node_id: String,
}

/// The full soft payload.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SoftIr {
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub source_text: String,
    #[serde(default)]
    pub graph: SoftGraph,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub goal: Option<SoftGoal>,
}

// ---------------------------------------------------------------------------
// Untrusted-input guards
// ---------------------------------------------------------------------------

impl SoftIr {
    /// Parse and sanitize a payload from JSON text.
    pub fn from_json(text: &str, limits: &LimitsConfig) -> InputResult<Self> {
        let value: Value = serde_json::from_str(text).map_err(|e| InputError::Malformed {
            message: e.to_string(),
        })?;
        Self::from_value(value, limits)
    }

    /// Sanitize an already-parsed payload.
    pub fn from_value(mut value: Value, limits: &LimitsConfig) -> InputResult<Self> {
        if !value.is_object() {
            return Err(InputError::NotAnObject);
        }
        check_counts(&value, limits)?;
        sanitize_value(&mut value, limits.max_string_len);
        serde_json::from_value(value).map_err(|e| InputError::Malformed {
            message: e.to_string(),
        })
    }

    pub fn from_file(path: &std::path::Path, limits: &LimitsConfig) -> InputResult<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| InputError::Io {
            path: path.display().to_string(),
            source: e,
        })?;
        Self::from_json(&text, limits)
    }

    pub fn goal_id(&self) -> Option<&str> {
        self.goal.as_ref().map(|g| g.node_id.as_str())
    }
}

fn check_counts(value: &Value, limits: &LimitsConfig) -> InputResult<()> {
    let graph = value.get("graph");
    let count = |key: &str| {
        graph
            .and_then(|g| g.get(key))
            .and_then(Value::as_array)
            .map_or(0, Vec::len)
    };
    let nodes = count("nodes");
    if nodes > limits.max_nodes {
        return Err(InputError::TooManyNodes {
            count: nodes,
            max: limits.max_nodes,
        });
    }
    let edges = count("edges");
    if edges > limits.max_edges {
        return Err(InputError::TooManyEdges {
            count: edges,
            max: limits.max_edges,
        });
    }
    Ok(())
}

/// Strip control characters from every string in the tree and truncate the
/// values. Keys are stripped but kept whole.
fn sanitize_value(value: &mut Value, max_len: usize) {
    match value {
        Value::String(s) => *s = sanitize_str(s, max_len),
        Value::Array(items) => items.iter_mut().for_each(|v| sanitize_value(v, max_len)),
        Value::Object(map) => {
            let entries: Vec<(String, Value)> = std::mem::take(map).into_iter().collect();
            for (k, mut v) in entries {
                sanitize_value(&mut v, max_len);
                map.insert(sanitize_str(&k, usize::MAX), v);
            }
        }
        _ => {}
    }
}

pub fn sanitize_str(s: &str, max_len: usize) -> String {
    s.chars()
        .map(|c| if c == '\n' || c == '\t' || c == '\r' { ' ' } else { c })
        .filter(|c| !c.is_control())
        .take(max_len)
        .collect()
}
