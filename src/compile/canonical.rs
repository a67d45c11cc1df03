//! Predicate canonicalization, entity factoring and term typing.
//!
//! All functions here are pure and deterministic. [`canonical_key`] is
//! idempotent: applying it to its own output returns the same key.

use std::sync::LazyLock;

use regex::Regex;
use unicode_normalization::UnicodeNormalization;

use crate::model::{Term, TermKind};
use crate::soft::SoftTerm;

/// Tokens dropped from the front of a predicate surface form.
const LEADING_STOP_TOKENS: &[&str] = &[
    "it", "there", "is", "are", "was", "were", "be", "being", "been", "the", "a", "an",
];

/// Tokens that mark a clear boundary after a proper-noun subject.
const SUBJECT_BOUNDARY: &[&str] = &[
    "is", "are", "was", "were", "has", "have", "had", "can", "will", "does", "did", "should",
    "must", "may",
];

static VARIABLE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[XYZWUV]\d*$").unwrap());

static NUMBER_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^-?\d+(\.\d+)?$").unwrap());

fn tokens(surface: &str) -> Vec<String> {
    let folded: String = surface.nfkc().collect::<String>().to_lowercase();
    let cleaned: String = folded
        .chars()
        .filter(|c| *c != '\'' && *c != '\u{2019}')
        .map(|c| if c.is_alphanumeric() { c } else { ' ' })
        .collect();
    cleaned.split_whitespace().map(str::to_string).collect()
}

/// Canonical predicate key for a surface form.
///
/// Lowercases, removes apostrophes, turns every separator run into a single
/// underscore and strips leading articles/auxiliaries. A surface made only of
/// stop tokens keeps them; an empty surface becomes `unnamed`.
pub fn canonical_key(surface: &str) -> String {
    let toks = tokens(surface);
    if toks.is_empty() {
        return "unnamed".to_string();
    }
    let start = toks
        .iter()
        .position(|t| !LEADING_STOP_TOKENS.contains(&t.as_str()))
        .unwrap_or(0);
    toks[start..].join("_")
}

/// Canonical constant name: same folding as predicates, no stop-token stripping.
pub fn canonical_constant(surface: &str) -> String {
    let toks = tokens(surface);
    if toks.is_empty() {
        return "unnamed".to_string();
    }
    toks.join("_")
}

/// Split `"Paris is wet"` into (`"is wet"`, `"paris"`).
///
/// Applies only when a leading run of capitalized words (not itself a stop
/// word) is followed by an auxiliary verb and at least one more word.
pub fn factor_entity(surface: &str) -> Option<(String, String)> {
    let words: Vec<&str> = surface.split_whitespace().collect();
    let first = words.first()?;
    if LEADING_STOP_TOKENS.contains(&first.to_lowercase().as_str()) {
        return None;
    }
    let run = words
        .iter()
        .take_while(|w| w.chars().next().is_some_and(char::is_uppercase))
        .count();
    if run == 0 || run + 1 >= words.len() {
        return None;
    }
    if !SUBJECT_BOUNDARY.contains(&words[run].to_lowercase().as_str()) {
        return None;
    }
    let entity = canonical_constant(&words[..run].join(" "));
    Some((words[run..].join(" "), entity))
}

/// Type a soft term by its shape; an explicit `kind` wins.
pub fn type_term(term: &SoftTerm) -> Term {
    let sort = match term {
        SoftTerm::Typed {
            value,
            kind: Some(kind),
            sort,
        } => {
            if let Some(kind) = parse_kind(kind) {
                let name = match kind {
                    TermKind::Constant | TermKind::Action => canonical_constant(value),
                    _ => value.trim().to_string(),
                };
                return Term {
                    kind,
                    name,
                    sort: sort.clone(),
                };
            }
            sort.clone()
        }
        SoftTerm::Typed { sort, .. } => sort.clone(),
        _ => None,
    };
    let raw = term.value();
    let raw = raw.trim();
    let (kind, name) = if VARIABLE_RE.is_match(raw) {
        (TermKind::Variable, raw.to_string())
    } else if NUMBER_RE.is_match(raw) {
        (TermKind::Number, raw.to_string())
    } else if raw.len() >= 2 && raw.starts_with('"') && raw.ends_with('"') {
        (TermKind::String, raw[1..raw.len() - 1].to_string())
    } else {
        (TermKind::Constant, canonical_constant(raw))
    };
    Term { kind, name, sort }
}

fn parse_kind(kind: &str) -> Option<TermKind> {
    match kind.trim().to_lowercase().as_str() {
        "constant" | "const" | "entity" => Some(TermKind::Constant),
        "variable" | "var" => Some(TermKind::Variable),
        "action" => Some(TermKind::Action),
        "number" | "num" => Some(TermKind::Number),
        "string" | "str" => Some(TermKind::String),
        _ => None,
    }
}

/// Soft rendering of a typed term that re-types to the same term.
pub fn lower_term(term: &Term) -> SoftTerm {
    SoftTerm::Typed {
        value: term.name.clone(),
        kind: Some(term.kind.to_string()),
        sort: term.sort.clone(),
    }
}
