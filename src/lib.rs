// thiserror's #[error("...{field}...")] format strings reference struct fields,
// but the compiler doesn't see through the derive macro and reports false positives.
#![allow(unused_assignments)]

//! # argmend
//!
//! Diagnosis and repair of argument graphs extracted from natural language.
//!
//! ## Architecture
//!
//! - **Soft input** (`soft`): the untrusted JSON graph produced by an extractor
//! - **Compiler** (`compile`): canonical predicates, stable ids, implicit rules, best-of-k
//! - **Validator** (`validate`): the strict graph contract
//! - **Argumentation** (`argumentation`): grounded/preferred/stable semantics and
//!   minimal-edit enforcement
//! - **First-order logic** (`fol`): TPTP export and prover backends
//! - **Abduction** (`abduce`): minimal missing premises via the prover
//! - **Diagnostics** (`diagnose`): unsupported inferences, cycles, contradictions,
//!   weak schemes, unreachable goals
//! - **Repair** (`repair`): strategy dispatch, patches, verification
//! - **Pipeline** (`pipeline`): all of the above, in order
//!
//! ## Library usage
//!
//! ```no_run
//! use argmend::compile::AliasTable;
//! use argmend::config::MendConfig;
//! use argmend::pipeline::Pipeline;
//! use argmend::soft::SoftIr;
//!
//! let config = MendConfig::default();
//! let soft = SoftIr::from_file("argument.json".as_ref(), &config.limits).unwrap();
//! let report = Pipeline::new(config).run(&soft, &AliasTable::new()).unwrap();
//! println!("{} issues", report.diagnosis.issues.len());
//! ```

pub mod abduce;
pub mod argumentation;
pub mod compile;
pub mod config;
pub mod diagnose;
pub mod error;
pub mod fol;
pub mod model;
pub mod pipeline;
pub mod repair;
pub mod soft;
pub mod validate;
