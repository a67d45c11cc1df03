//! Engine configuration, persisted as TOML.
//!
//! Every field has a serde default so a partial (or empty) file is valid.
//! Policies decide, per input-contract failure mode, whether the compiler
//! auto-patches (and logs) or raises a typed error.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::argumentation::{Acceptance, Semantics};
use crate::error::ConfigError;
use crate::fol::FolMode;

pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Top-level configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MendConfig {
    /// Argumentation semantics used for acceptance and enforcement.
    #[serde(default)]
    pub semantics: Semantics,
    /// Credulous or skeptical reading of multi-extension semantics.
    #[serde(default)]
    pub acceptance: Acceptance,
    #[serde(default)]
    pub fol_mode: FolMode,
    /// Whether a hypothesis identical to the goal is reported (flagged) or dropped.
    #[serde(default)]
    pub trivial_hypotheses: TrivialHypotheses,
    #[serde(default)]
    pub policy: PolicyConfig,
    #[serde(default)]
    pub limits: LimitsConfig,
    #[serde(default)]
    pub enforcement: EnforcementConfig,
    #[serde(default)]
    pub abduction: AbductionConfig,
    #[serde(default)]
    pub prover: ProverConfig,
    #[serde(default = "default_schemes")]
    pub schemes: SchemeTable,
}

impl Default for MendConfig {
    fn default() -> Self {
        Self {
            semantics: Semantics::default(),
            acceptance: Acceptance::default(),
            fol_mode: FolMode::default(),
            trivial_hypotheses: TrivialHypotheses::default(),
            policy: PolicyConfig::default(),
            limits: LimitsConfig::default(),
            enforcement: EnforcementConfig::default(),
            abduction: AbductionConfig::default(),
            prover: ProverConfig::default(),
            schemes: default_schemes(),
        }
    }
}

impl MendConfig {
    /// Load from a TOML file.
    pub fn load(path: &Path) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.display().to_string(),
            source: e,
        })?;
        Self::from_toml(&content, &path.display().to_string())
    }

    /// Parse from TOML text; `origin` names the source in errors.
    pub fn from_toml(content: &str, origin: &str) -> ConfigResult<Self> {
        toml::from_str(content).map_err(|e| ConfigError::Parse {
            path: origin.to_string(),
            message: e.to_string(),
        })
    }

    /// Save to a TOML file.
    pub fn save(&self, path: &Path) -> ConfigResult<()> {
        let content = toml::to_string_pretty(self).map_err(|e| ConfigError::Parse {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::Write {
                path: parent.display().to_string(),
                source: e,
            })?;
        }
        std::fs::write(path, content).map_err(|e| ConfigError::Write {
            path: path.display().to_string(),
            source: e,
        })
    }
}

// ---------------------------------------------------------------------------
// Policies
// ---------------------------------------------------------------------------

/// How an input-contract failure is resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Resolution {
    /// Repair the input deterministically and log the patch.
    AutoPatch,
    /// Fail with a typed error naming the offending path.
    Raise,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolicyConfig {
    #[serde(default = "auto_patch")]
    pub missing_lexicon: Resolution,
    #[serde(default = "raise")]
    pub dangling_reference: Resolution,
    #[serde(default = "auto_patch")]
    pub arity_mismatch: Resolution,
    #[serde(default = "auto_patch")]
    pub multi_arity_predicate: Resolution,
    /// Split proper-noun-headed predicates into predicate + constant.
    #[serde(default = "default_true")]
    pub factor_entities: bool,
}

fn auto_patch() -> Resolution {
    Resolution::AutoPatch
}
fn raise() -> Resolution {
    Resolution::Raise
}
fn default_true() -> bool {
    true
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            missing_lexicon: auto_patch(),
            dangling_reference: raise(),
            arity_mismatch: auto_patch(),
            multi_arity_predicate: auto_patch(),
            factor_entities: true,
        }
    }
}

// ---------------------------------------------------------------------------
// Limits
// ---------------------------------------------------------------------------

/// Caps applied to untrusted input and to exhaustive searches.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LimitsConfig {
    #[serde(default = "default_max_nodes")]
    pub max_nodes: usize,
    #[serde(default = "default_max_edges")]
    pub max_edges: usize,
    /// Surface strings longer than this (in chars) are truncated.
    #[serde(default = "default_max_string_len")]
    pub max_string_len: usize,
    /// Largest undecided core searched exhaustively for preferred/stable.
    #[serde(default = "default_max_search_arguments")]
    pub max_search_arguments: usize,
}

fn default_max_nodes() -> usize {
    512
}
fn default_max_edges() -> usize {
    4096
}
fn default_max_string_len() -> usize {
    2048
}
fn default_max_search_arguments() -> usize {
    24
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_nodes: default_max_nodes(),
            max_edges: default_max_edges(),
            max_string_len: default_max_string_len(),
            max_search_arguments: default_max_search_arguments(),
        }
    }
}

// ---------------------------------------------------------------------------
// Enforcement
// ---------------------------------------------------------------------------

/// Candidate pool and ceiling for the minimal-edit search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnforcementConfig {
    #[serde(default = "default_max_edits")]
    pub max_edits: usize,
    /// Offer deletion of existing attacks on the goal.
    #[serde(default)]
    pub allow_deletions: bool,
    /// Also offer deleting edges marked hard (explicit contradictions).
    #[serde(default)]
    pub allow_hard_deletions: bool,
    /// Offer attacks from other accepted arguments onto the goal's attackers.
    #[serde(default)]
    pub third_party_attacks: bool,
    /// How many alternative optimal edit sets to report.
    #[serde(default = "default_alternatives")]
    pub max_alternatives: usize,
}

fn default_max_edits() -> usize {
    2
}
fn default_alternatives() -> usize {
    3
}

impl Default for EnforcementConfig {
    fn default() -> Self {
        Self {
            max_edits: default_max_edits(),
            allow_deletions: false,
            allow_hard_deletions: false,
            third_party_attacks: false,
            max_alternatives: default_alternatives(),
        }
    }
}

// ---------------------------------------------------------------------------
// Abduction
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AbductionConfig {
    /// Hypothesis size ceiling; values above 2 are clamped.
    #[serde(default = "default_max_atoms")]
    pub max_atoms: usize,
    #[serde(default = "default_single_cap")]
    pub max_single_candidates: usize,
    /// Pairs are drawn from the first `pair_pool` single candidates.
    #[serde(default = "default_pair_pool")]
    pub pair_pool: usize,
    #[serde(default = "default_repairs_per_issue")]
    pub max_repairs_per_issue: usize,
}

fn default_max_atoms() -> usize {
    2
}
fn default_single_cap() -> usize {
    50
}
fn default_pair_pool() -> usize {
    20
}
fn default_repairs_per_issue() -> usize {
    3
}

impl AbductionConfig {
    pub fn effective_max_atoms(&self) -> usize {
        self.max_atoms.clamp(1, 2)
    }
}

impl Default for AbductionConfig {
    fn default() -> Self {
        Self {
            max_atoms: default_max_atoms(),
            max_single_candidates: default_single_cap(),
            pair_pool: default_pair_pool(),
            max_repairs_per_issue: default_repairs_per_issue(),
        }
    }
}

// ---------------------------------------------------------------------------
// Prover
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProverBackend {
    /// External E prover, located via `path` or `PATH`.
    #[default]
    Eprover,
    /// In-process ground Horn saturation.
    Horn,
    /// No prover; FOL checks report unavailable.
    None,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProverConfig {
    #[serde(default)]
    pub backend: ProverBackend,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_timeout_ms() -> u64 {
    3000
}

impl ProverConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl Default for ProverConfig {
    fn default() -> Self {
        Self {
            backend: ProverBackend::default(),
            path: None,
            timeout_ms: default_timeout_ms(),
        }
    }
}

// ---------------------------------------------------------------------------
// Trivial hypotheses
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrivialHypotheses {
    /// Report the hypothesis with `trivial = true`.
    #[default]
    Flag,
    /// Drop it from the repair list (still logged).
    Suppress,
}

// ---------------------------------------------------------------------------
// Scheme backing table
// ---------------------------------------------------------------------------

/// One backing requirement of an argumentation scheme.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchemeRequirement {
    /// Critical question the backing answers.
    pub label: String,
    /// Any of these (case-insensitive) in premise content counts as backing.
    pub keywords: Vec<String>,
}

/// Scheme name → backing requirements.
pub type SchemeTable = BTreeMap<String, Vec<SchemeRequirement>>;

fn requirement(label: &str, keywords: &[&str]) -> SchemeRequirement {
    SchemeRequirement {
        label: label.to_string(),
        keywords: keywords.iter().map(|k| k.to_string()).collect(),
    }
}

pub fn default_schemes() -> SchemeTable {
    let mut table = SchemeTable::new();
    table.insert(
        "causal".into(),
        vec![
            requirement(
                "Is there evidence for the causal link?",
                &["evidence", "study", "data", "mechanism"],
            ),
            requirement(
                "Are there confounding factors?",
                &["confound", "control", "alternative"],
            ),
        ],
    );
    table.insert(
        "authority".into(),
        vec![
            requirement(
                "Is the authority credible?",
                &["expert", "credible", "qualified"],
            ),
            requirement(
                "Is this within the authority's domain?",
                &["domain", "field", "specialist"],
            ),
        ],
    );
    table.insert(
        "analogy".into(),
        vec![
            requirement(
                "Are the cases sufficiently similar?",
                &["similar", "alike", "comparable"],
            ),
            requirement(
                "Are there relevant differences?",
                &["difference", "differ", "unlike"],
            ),
        ],
    );
    table.insert(
        "example".into(),
        vec![
            requirement(
                "Is the example representative?",
                &["representative", "typical", "sample"],
            ),
            requirement("Are there counter-examples?", &["counter", "exception"]),
        ],
    );
    table
}
