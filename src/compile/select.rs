//! Best-of-k selection over independently compiled candidates.
//!
//! Each candidate compiles against its own snapshot of the alias table, so
//! candidates share no mutable state. The winner is the lowest
//! (error count, implicit-rule count, predicate count) triple, ties broken by
//! candidate index; only the winner's aliases are absorbed into the table.

use serde::{Deserialize, Serialize};

use crate::config::MendConfig;
use crate::error::CompileError;
use crate::soft::SoftIr;

use super::{AliasTable, Compiled, Compiler};

/// Lexicographic quality score of a compiled candidate; lower is better.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CandidateScore {
    pub errors: usize,
    pub implicit_rules: usize,
    pub predicates: usize,
}

impl CandidateScore {
    pub fn of(compiled: &Compiled) -> Self {
        Self {
            errors: compiled.report.error_count(),
            implicit_rules: compiled.strict.implicit_rule_count(),
            predicates: compiled.strict.lexicon.len(),
        }
    }
}

/// Outcome of one candidate.
#[derive(Debug)]
pub struct CandidateResult {
    pub index: usize,
    pub result: Result<(Compiled, CandidateScore), CompileError>,
}

#[derive(Debug)]
pub struct Selection {
    pub winner: usize,
    pub compiled: Compiled,
    pub score: CandidateScore,
    /// Scores (or failures) of every candidate, in input order.
    pub candidates: Vec<Result<CandidateScore, String>>,
}

/// Compile every candidate in parallel and pick the best.
///
/// Returns the last candidate's error when all candidates fail.
pub fn select_best(
    candidates: &[SoftIr],
    config: &MendConfig,
    aliases: &AliasTable,
) -> Result<Selection, CompileError> {
    use rayon::prelude::*;

    let results: Vec<(CandidateResult, AliasTable)> = candidates
        .par_iter()
        .enumerate()
        .map(|(index, soft)| {
            let local = aliases.snapshot();
            let result = Compiler::new(config, &local).compile(soft).map(|c| {
                let score = CandidateScore::of(&c);
                (c, score)
            });
            (CandidateResult { index, result }, local)
        })
        .collect();

    let mut summary = Vec::with_capacity(results.len());
    let mut best: Option<(CandidateScore, usize)> = None;
    for (cand, _) in &results {
        match &cand.result {
            Ok((_, score)) => {
                summary.push(Ok(*score));
                if best.is_none_or(|(s, _)| *score < s) {
                    best = Some((*score, cand.index));
                }
            }
            Err(e) => {
                tracing::debug!(candidate = cand.index, error = %e, "candidate failed to compile");
                summary.push(Err(e.to_string()));
            }
        }
    }

    let Some((score, winner)) = best else {
        let last = results.into_iter().last().map(|(c, _)| c.result);
        return match last {
            Some(Err(e)) => Err(e),
            _ => Err(CompileError::NoCandidates),
        };
    };

    let mut compiled = None;
    for (cand, local) in results {
        if cand.index == winner {
            aliases.absorb(&local);
            compiled = cand.result.ok().map(|(c, _)| c);
        }
    }
    let compiled = compiled.ok_or(CompileError::NoCandidates)?;
    tracing::info!(winner, ?score, "selected best-of-k candidate");
    Ok(Selection {
        winner,
        compiled,
        score,
        candidates: summary,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LimitsConfig;

    fn soft(json: &str) -> SoftIr {
        SoftIr::from_json(json, &LimitsConfig::default()).unwrap()
    }

    #[test]
    fn prefers_fewer_implicit_rules_then_fewer_predicates() {
        let with_gap = soft(
            r#"{"graph": {"nodes": [
                {"id": "f", "conclusion": {"pred": "raining", "args": ["city"]}},
                {"id": "s", "premises": [{"kind": "Ref", "ref": "f"}],
                 "conclusion": {"pred": "wet", "args": ["city"]}}
            ], "edges": []}}"#,
        );
        let with_rule = soft(
            r#"{"graph": {"nodes": [
                {"id": "f", "conclusion": {"pred": "raining", "args": ["city"]}},
                {"id": "s", "premises": [{"kind": "Ref", "ref": "f"}],
                 "rule": {"antecedents": [{"pred": "raining", "args": ["X"]}],
                          "consequents": [{"pred": "wet", "args": ["X"]}]},
                 "conclusion": {"pred": "wet", "args": ["city"]}}
            ], "edges": []}}"#,
        );
        let broken = soft(
            r#"{"graph": {"nodes": [{"premises": [{"kind": "Ref", "ref": "nope"}],
                "conclusion": {"pred": "wet", "args": ["city"]}}], "edges": []}}"#,
        );
        let aliases = AliasTable::new();
        let sel = select_best(
            &[with_gap, broken, with_rule],
            &MendConfig::default(),
            &aliases,
        )
        .unwrap();
        assert_eq!(sel.winner, 2);
        assert_eq!(sel.score.implicit_rules, 0);
        assert!(sel.candidates[1].is_err());
        assert!(aliases.entry("wet").is_some());
    }

    #[test]
    fn empty_candidate_list_is_an_error() {
        let err = select_best(&[], &MendConfig::default(), &AliasTable::new()).unwrap_err();
        assert!(matches!(err, CompileError::NoCandidates));
    }
}
