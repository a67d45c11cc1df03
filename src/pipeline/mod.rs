//! End-to-end processing of one soft graph.
//!
//! Stages run strictly in sequence, each consuming the previous stage's
//! validated output:
//!
//! compile → validate → AF view → FOL export → diagnose → repair
//!
//! The only state shared across runs is the caller's [`AliasTable`].

use std::borrow::Cow;

use serde::{Deserialize, Serialize};

use crate::argumentation::{AttackGraph, ExtensionSummary};
use crate::compile::select::{CandidateScore, Selection, select_best};
use crate::compile::{AliasTable, CompileReport, Compiled, Compiler};
use crate::config::MendConfig;
use crate::diagnose::{Diagnoser, Diagnosis};
use crate::error::MendResult;
use crate::fol::prover::{self, Prover};
use crate::fol::{FolExporter, GoalSelection};
use crate::model::StrictGraph;
use crate::repair::{RepairEngine, RepairReport};
use crate::soft::{SoftGoal, SoftIr};

/// The first-order view of the graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FolSummary {
    pub goal: GoalSelection,
    pub axioms: usize,
    /// The full problem in TPTP syntax.
    pub tptp: String,
}

/// How best-of-k selection went.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectionSummary {
    pub winner: usize,
    pub score: CandidateScore,
    pub candidates: Vec<Result<CandidateScore, String>>,
}

/// Everything the presentation layer needs, read-only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MendReport {
    pub strict: StrictGraph,
    pub compile: CompileReport,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selection: Option<SelectionSummary>,
    pub extensions: ExtensionSummary,
    pub fol: FolSummary,
    pub diagnosis: Diagnosis,
    pub repairs: RepairReport,
}

pub struct Pipeline {
    config: MendConfig,
    prover: Box<dyn Prover>,
    goal: Option<String>,
}

impl Pipeline {
    /// Pipeline with the prover named by the configuration.
    pub fn new(config: MendConfig) -> Self {
        let prover = prover::from_config(&config.prover);
        Self::with_prover(config, prover)
    }

    pub fn with_prover(config: MendConfig, prover: Box<dyn Prover>) -> Self {
        Self {
            config,
            prover,
            goal: None,
        }
    }

    /// Override the input's goal with a provisional (soft) node id.
    pub fn with_goal(mut self, goal: impl Into<String>) -> Self {
        self.goal = Some(goal.into());
        self
    }

    pub fn config(&self) -> &MendConfig {
        &self.config
    }

    pub fn prover(&self) -> &dyn Prover {
        self.prover.as_ref()
    }

    fn with_goal_override<'s>(&self, soft: &'s SoftIr) -> Cow<'s, SoftIr> {
        match &self.goal {
            Some(goal) => {
                let mut owned = soft.clone();
                owned.goal = Some(SoftGoal {
                    node_id: goal.clone(),
                });
                Cow::Owned(owned)
            }
            None => Cow::Borrowed(soft),
        }
    }

    /// Compile and validate only.
    pub fn compile(&self, soft: &SoftIr, aliases: &AliasTable) -> MendResult<Compiled> {
        let soft = self.with_goal_override(soft);
        Ok(Compiler::new(&self.config, aliases).compile(&soft)?)
    }

    pub fn run(&self, soft: &SoftIr, aliases: &AliasTable) -> MendResult<MendReport> {
        let compiled = self.compile(soft, aliases)?;
        self.analyze(compiled, None)
    }

    /// Compile every candidate independently and keep the best.
    pub fn select(&self, candidates: &[SoftIr], aliases: &AliasTable) -> MendResult<Selection> {
        let candidates: Vec<SoftIr> = candidates
            .iter()
            .map(|c| self.with_goal_override(c).into_owned())
            .collect();
        Ok(select_best(&candidates, &self.config, aliases)?)
    }

    pub fn run_best_of(&self, candidates: &[SoftIr], aliases: &AliasTable) -> MendResult<MendReport> {
        let selection = self.select(candidates, aliases)?;
        let summary = SelectionSummary {
            winner: selection.winner,
            score: selection.score,
            candidates: selection.candidates,
        };
        self.analyze(selection.compiled, Some(summary))
    }

    /// The stages after compilation.
    pub fn analyze(&self, compiled: Compiled, selection: Option<SelectionSummary>) -> MendResult<MendReport> {
        let Compiled { strict, report } = compiled;

        let af = AttackGraph::from_strict(&strict);
        let extensions = ExtensionSummary::compute(&af, self.config.limits.max_search_arguments);
        tracing::info!(
            arguments = af.len(),
            attacks = af.attack_count(),
            grounded = extensions.grounded.len(),
            "attack graph projected"
        );

        let export = FolExporter::new(self.config.fol_mode).export(&strict, None)?;
        let fol = FolSummary {
            goal: export.goal.clone(),
            axioms: export.problem.axioms.len(),
            tptp: export.problem.to_tptp(),
        };

        let diagnosis = Diagnoser::new(&self.config, self.prover.as_ref()).diagnose(&strict, None)?;
        let repairs = RepairEngine::new(&self.config, self.prover.as_ref()).repair(&strict, &diagnosis);
        tracing::info!(
            issues = diagnosis.issues.len(),
            repairs = repairs.repairs.len(),
            prover = self.prover.name(),
            "pipeline finished"
        );

        Ok(MendReport {
            strict,
            compile: report,
            selection,
            extensions,
            fol,
            diagnosis,
            repairs,
        })
    }
}
