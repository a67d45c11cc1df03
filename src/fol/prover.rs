//! Prover seam.
//!
//! A [`Prover`] answers one entailment or consistency question per call and
//! never fails: problems it cannot decide come back as
//! [`ProofStatus::Unknown`], a missing backend as [`ProofStatus::Unavailable`].

use std::io::Write as _;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::sync::LazyLock;
use std::time::{Duration, Instant};

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::config::{ProverBackend, ProverConfig};

use super::horn::HornProver;
use super::{FolProblem, Formula, NamedFormula};

static SZS_STATUS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"SZS status\s+([A-Za-z]+)").unwrap());

const EPROVER_BINARY: &str = "eprover";
const POLL_INTERVAL: Duration = Duration::from_millis(20);

/// Verdict of a single prover call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ProofStatus {
    /// The conjecture follows from the axioms.
    Proved,
    /// The negation of the conjecture follows.
    Disproved,
    /// Axioms plus negated conjecture have a model: not entailed.
    Satisfiable,
    Unknown { reason: String },
    Unavailable { reason: String },
}

impl ProofStatus {
    pub fn is_proved(&self) -> bool {
        matches!(self, Self::Proved)
    }

    /// Definitely not entailed.
    pub fn is_refuted(&self) -> bool {
        matches!(self, Self::Disproved | Self::Satisfiable)
    }

    pub fn is_unavailable(&self) -> bool {
        matches!(self, Self::Unavailable { .. })
    }

    /// Map an SZS status word.
    pub fn from_szs(word: &str) -> Self {
        match word {
            "Theorem" | "Unsatisfiable" | "ContradictoryAxioms" => Self::Proved,
            "CounterTheorem" => Self::Disproved,
            "CounterSatisfiable" | "Satisfiable" => Self::Satisfiable,
            other => Self::Unknown {
                reason: format!("SZS status {other}"),
            },
        }
    }
}

/// Result of a prover call with timing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProofOutcome {
    #[serde(flatten)]
    pub status: ProofStatus,
    pub elapsed_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transcript: Option<String>,
}

impl ProofOutcome {
    pub fn new(status: ProofStatus, elapsed: Duration) -> Self {
        Self {
            status,
            elapsed_ms: u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX),
            transcript: None,
        }
    }

    pub fn with_transcript(mut self, transcript: String) -> Self {
        self.transcript = Some(transcript);
        self
    }
}

/// A named problem with a conjecture.
#[derive(Debug, Clone)]
pub struct ProofTask {
    pub name: String,
    pub problem: FolProblem,
}

impl ProofTask {
    /// Do `axioms` entail `conjecture`?
    pub fn entailment(name: impl Into<String>, axioms: &[NamedFormula], conjecture: Formula) -> Self {
        Self {
            name: name.into(),
            problem: FolProblem {
                axioms: axioms.to_vec(),
                conjecture: Some(NamedFormula::conjecture(conjecture)),
            },
        }
    }

    /// Are `axioms` inconsistent? `Proved` means they derive falsity.
    pub fn inconsistency(name: impl Into<String>, axioms: &[NamedFormula]) -> Self {
        Self::entailment(name, axioms, Formula::False)
    }

    pub fn conjecture(&self) -> Option<&Formula> {
        self.problem.conjecture.as_ref().map(|c| &c.formula)
    }
}

pub trait Prover: Send + Sync {
    fn name(&self) -> &str;

    fn prove(&self, task: &ProofTask, timeout: Duration) -> ProofOutcome;

    /// Whether calls can produce anything but `Unavailable`.
    fn is_available(&self) -> bool {
        true
    }
}

/// Build the configured prover. A missing E binary yields a [`NoProver`]
/// that reports the lookup failure.
pub fn from_config(config: &ProverConfig) -> Box<dyn Prover> {
    match config.backend {
        ProverBackend::Eprover => match EProver::locate(config.path.as_deref()) {
            Some(p) => Box::new(p),
            None => {
                tracing::warn!("eprover not found; FOL checks will be reported unavailable");
                Box::new(NoProver::new("eprover binary not found"))
            }
        },
        ProverBackend::Horn => Box::new(HornProver::default()),
        ProverBackend::None => Box::new(NoProver::new("prover disabled by configuration")),
    }
}

// ---------------------------------------------------------------------------
// No prover
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct NoProver {
    reason: String,
}

impl NoProver {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

impl Prover for NoProver {
    fn name(&self) -> &str {
        "none"
    }

    fn prove(&self, _task: &ProofTask, _timeout: Duration) -> ProofOutcome {
        ProofOutcome::new(
            ProofStatus::Unavailable {
                reason: self.reason.clone(),
            },
            Duration::ZERO,
        )
    }

    fn is_available(&self) -> bool {
        false
    }
}

// ---------------------------------------------------------------------------
// E prover
// ---------------------------------------------------------------------------

/// External E prover driven through a temporary TPTP file.
#[derive(Debug, Clone)]
pub struct EProver {
    binary: PathBuf,
}

impl EProver {
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    /// Use `explicit` when given, otherwise search `PATH`.
    pub fn locate(explicit: Option<&Path>) -> Option<Self> {
        if let Some(path) = explicit {
            return path.is_file().then(|| Self::new(path));
        }
        let paths = std::env::var_os("PATH")?;
        std::env::split_paths(&paths)
            .map(|dir| dir.join(EPROVER_BINARY))
            .find(|candidate| candidate.is_file())
            .map(Self::new)
    }

    pub fn binary(&self) -> &Path {
        &self.binary
    }

    fn run(&self, task: &ProofTask, timeout: Duration) -> std::io::Result<ProofStatusWithOutput> {
        let mut input = tempfile::Builder::new()
            .prefix("argmend-")
            .suffix(".p")
            .tempfile()?;
        input.write_all(task.problem.to_tptp().as_bytes())?;
        input.flush()?;
        let output = tempfile::NamedTempFile::new()?;

        let cpu_limit = timeout.as_secs().max(1);
        let mut child = Command::new(&self.binary)
            .arg("--auto")
            .arg("--tstp-format")
            .arg(format!("--cpu-limit={cpu_limit}"))
            .arg(input.path())
            .stdout(Stdio::from(output.reopen()?))
            .stderr(Stdio::null())
            .spawn()?;

        if supervise(&mut child, Instant::now() + timeout)? == Finished::TimedOut {
            return Ok(ProofStatusWithOutput {
                status: ProofStatus::Unknown {
                    reason: format!("timed out after {} ms", timeout.as_millis()),
                },
                transcript: String::new(),
            });
        }

        let transcript = std::fs::read_to_string(output.path())?;
        let status = SZS_STATUS
            .captures(&transcript)
            .and_then(|c| c.get(1))
            .map(|m| ProofStatus::from_szs(m.as_str()))
            .unwrap_or_else(|| ProofStatus::Unknown {
                reason: "no SZS status in prover output".into(),
            });
        Ok(ProofStatusWithOutput { status, transcript })
    }
}

/// The parts of a child process the deadline loop drives.
trait Supervised {
    /// `true` once the process has exited.
    fn poll_exit(&mut self) -> std::io::Result<bool>;
    fn terminate(&mut self) -> std::io::Result<()>;
    fn reap(&mut self) -> std::io::Result<()>;
}

impl Supervised for Child {
    fn poll_exit(&mut self) -> std::io::Result<bool> {
        self.try_wait().map(|status| status.is_some())
    }

    fn terminate(&mut self) -> std::io::Result<()> {
        self.kill()
    }

    fn reap(&mut self) -> std::io::Result<()> {
        self.wait().map(drop)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Finished {
    Exited,
    TimedOut,
}

/// Poll `child` until it exits or `deadline` passes. On timeout or a failed
/// poll the process is killed and reaped before returning.
fn supervise(child: &mut impl Supervised, deadline: Instant) -> std::io::Result<Finished> {
    loop {
        match child.poll_exit() {
            Ok(true) => return Ok(Finished::Exited),
            Ok(false) if Instant::now() >= deadline => {
                let _ = child.terminate();
                let _ = child.reap();
                return Ok(Finished::TimedOut);
            }
            Ok(false) => std::thread::sleep(POLL_INTERVAL),
            Err(e) => {
                let _ = child.terminate();
                let _ = child.reap();
                return Err(e);
            }
        }
    }
}

struct ProofStatusWithOutput {
    status: ProofStatus,
    transcript: String,
}

impl Prover for EProver {
    fn name(&self) -> &str {
        EPROVER_BINARY
    }

    fn prove(&self, task: &ProofTask, timeout: Duration) -> ProofOutcome {
        let start = Instant::now();
        match self.run(task, timeout) {
            Ok(result) => {
                tracing::debug!(task = %task.name, status = ?result.status, "eprover finished");
                ProofOutcome::new(result.status, start.elapsed()).with_transcript(result.transcript)
            }
            Err(e) => {
                tracing::warn!(task = %task.name, error = %e, "failed to run eprover");
                ProofOutcome::new(
                    ProofStatus::Unavailable {
                        reason: format!("failed to run {}: {e}", self.binary.display()),
                    },
                    start.elapsed(),
                )
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn szs_words_map_to_statuses() {
        assert_eq!(ProofStatus::from_szs("Theorem"), ProofStatus::Proved);
        assert_eq!(ProofStatus::from_szs("Unsatisfiable"), ProofStatus::Proved);
        assert_eq!(ProofStatus::from_szs("CounterTheorem"), ProofStatus::Disproved);
        assert_eq!(ProofStatus::from_szs("CounterSatisfiable"), ProofStatus::Satisfiable);
        assert!(matches!(ProofStatus::from_szs("GaveUp"), ProofStatus::Unknown { .. }));
    }

    #[test]
    fn missing_binary_is_not_located() {
        let dir = tempfile::tempdir().unwrap();
        assert!(EProver::locate(Some(&dir.path().join("eprover"))).is_none());
    }

    #[test]
    fn unrunnable_binary_reports_unavailable() {
        let prover = EProver::new("/nonexistent/eprover");
        let task = ProofTask::inconsistency("t", &[]);
        let outcome = prover.prove(&task, Duration::from_millis(100));
        assert!(outcome.status.is_unavailable());
    }

    #[cfg(unix)]
    #[test]
    fn slow_binary_times_out_as_unknown() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let binary = dir.path().join("eprover");
        std::fs::write(&binary, "#!/bin/sh\nsleep 5\n").unwrap();
        std::fs::set_permissions(&binary, std::fs::Permissions::from_mode(0o755)).unwrap();

        let prover = EProver::locate(Some(&binary)).unwrap();
        let task = ProofTask::inconsistency("t", &[]);
        let started = Instant::now();
        let outcome = prover.prove(&task, Duration::from_millis(300));
        assert!(
            matches!(&outcome.status, ProofStatus::Unknown { reason } if reason.contains("timed out")),
            "unexpected status {:?}",
            outcome.status
        );
        assert!(started.elapsed() < Duration::from_secs(4));
    }

    /// A process whose status can never be read.
    #[derive(Default)]
    struct UnpollableChild {
        terminated: bool,
        reaped: bool,
    }

    impl Supervised for UnpollableChild {
        fn poll_exit(&mut self) -> std::io::Result<bool> {
            Err(std::io::Error::other("status unavailable"))
        }

        fn terminate(&mut self) -> std::io::Result<()> {
            self.terminated = true;
            Ok(())
        }

        fn reap(&mut self) -> std::io::Result<()> {
            self.reaped = true;
            Ok(())
        }
    }

    #[test]
    fn failed_poll_kills_and_reaps_the_child() {
        let mut child = UnpollableChild::default();
        let err = supervise(&mut child, Instant::now() + Duration::from_secs(5)).unwrap_err();
        assert_eq!(err.to_string(), "status unavailable");
        assert!(child.terminated && child.reaped);
    }

    #[test]
    fn disabled_backend_is_unavailable() {
        let config = ProverConfig {
            backend: ProverBackend::None,
            ..ProverConfig::default()
        };
        let prover = from_config(&config);
        assert!(!prover.is_available());
        let outcome = prover.prove(&ProofTask::inconsistency("t", &[]), Duration::from_secs(1));
        assert!(outcome.status.is_unavailable());
    }

    #[test]
    fn outcome_serializes_flat() {
        let outcome = ProofOutcome::new(ProofStatus::Proved, Duration::from_millis(12));
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["status"], "proved");
        assert_eq!(json["elapsed_ms"], 12);
    }
}
