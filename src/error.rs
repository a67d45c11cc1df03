//! Rich diagnostic error types for argmend.
//!
//! Each subsystem defines its own error type with miette `#[diagnostic]` derives,
//! providing error codes, help text, and the offending graph path so callers know
//! exactly which part of the input violated the contract.
//!
//! Tool unavailability, timeouts and exhausted searches are deliberately *not*
//! errors: they surface as values (`ProofStatus::Unavailable`,
//! `ProofStatus::Unknown`, `EnforcementOutcome::NoRepair`).

use miette::Diagnostic;
use thiserror::Error;

/// Top-level error type for argmend.
///
/// Each variant wraps a subsystem-specific error, preserving the full diagnostic
/// chain (error codes, help text, paths) through to the user.
#[derive(Debug, Error, Diagnostic)]
pub enum MendError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Input(#[from] InputError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Compile(#[from] CompileError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Export(#[from] ExportError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Argumentation(#[from] ArgumentationError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Config(#[from] ConfigError),
}

/// Convenience alias used throughout the crate.
pub type MendResult<T> = std::result::Result<T, MendError>;

// ---------------------------------------------------------------------------
// Input errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum InputError {
    #[error("malformed input payload: {message}")]
    #[diagnostic(
        code(argmend::input::malformed),
        help(
            "The extraction source must supply a JSON object with a `graph` \
             containing `nodes` and `edges`. Check the payload against the soft \
             graph schema."
        )
    )]
    Malformed { message: String },

    #[error("input payload is not a JSON object")]
    #[diagnostic(
        code(argmend::input::not_an_object),
        help("Wrap the graph in a top-level object: {{\"graph\": {{\"nodes\": [], \"edges\": []}}}}.")
    )]
    NotAnObject,

    #[error("input graph has {count} nodes, exceeding the limit of {max}")]
    #[diagnostic(
        code(argmend::input::too_many_nodes),
        help("Raise `limits.max_nodes` in the configuration or split the argument.")
    )]
    TooManyNodes { count: usize, max: usize },

    #[error("input graph has {count} edges, exceeding the limit of {max}")]
    #[diagnostic(
        code(argmend::input::too_many_edges),
        help("Raise `limits.max_edges` in the configuration or split the argument.")
    )]
    TooManyEdges { count: usize, max: usize },

    #[error("I/O error on {path}: {source}")]
    #[diagnostic(
        code(argmend::input::io),
        help("Check that the file exists and is readable (or writable for outputs).")
    )]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("serialization error: {message}")]
    #[diagnostic(
        code(argmend::input::serde),
        help("The stored data could not be encoded or decoded as JSON.")
    )]
    Serialization { message: String },
}

// ---------------------------------------------------------------------------
// Compile errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum CompileError {
    #[error("dangling reference at {path}: no node with id \"{target}\"")]
    #[diagnostic(
        code(argmend::compile::dangling_reference),
        help(
            "A premise reference or edge endpoint names a node that does not exist. \
             Fix the extraction output, or set `policy.dangling_reference = \"auto_patch\"` \
             to drop such references (each drop is logged)."
        )
    )]
    DanglingReference { path: String, target: String },

    #[error("arity mismatch at {path}: predicate \"{predicate}\" has arity {expected}, used with {found}")]
    #[diagnostic(
        code(argmend::compile::arity_mismatch),
        help(
            "Arity is part of predicate identity. Either make the usages agree, or \
             set `policy.arity_mismatch = \"auto_patch\"` to mint a suffixed key."
        )
    )]
    ArityMismatch {
        path: String,
        predicate: String,
        expected: usize,
        found: usize,
    },

    #[error("duplicate provisional node id \"{id}\"")]
    #[diagnostic(
        code(argmend::compile::duplicate_id),
        help("Provisional ids must be unique so references resolve unambiguously.")
    )]
    DuplicateProvisionalId { id: String },

    #[error("self-loop at {path}: node \"{node}\" points at itself")]
    #[diagnostic(
        code(argmend::compile::self_loop),
        help("An edge or premise reference may not connect a node to itself.")
    )]
    SelfLoop { path: String, node: String },

    #[error("no candidate graph compiled")]
    #[diagnostic(
        code(argmend::compile::no_candidates),
        help("Best-of-k selection needs at least one soft graph.")
    )]
    NoCandidates,

    #[error(transparent)]
    #[diagnostic(transparent)]
    Validation(#[from] ValidationError),
}

// ---------------------------------------------------------------------------
// Validation errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Error, Diagnostic)]
pub enum ValidationError {
    #[error("predicate \"{predicate}\" at {path} is not in the lexicon")]
    #[diagnostic(
        code(argmend::validate::missing_lexicon),
        help(
            "Every atom predicate must be a lexicon key. Add the entry, or keep the \
             default `policy.missing_lexicon = \"auto_patch\"`."
        )
    )]
    MissingLexicon { predicate: String, path: String },

    #[error("dangling reference at {path}: no node with id \"{target}\"")]
    #[diagnostic(
        code(argmend::validate::dangling_reference),
        help("References and edge endpoints must name existing node ids.")
    )]
    DanglingReference { target: String, path: String },

    #[error("self-loop at {path} on node \"{node}\"")]
    #[diagnostic(
        code(argmend::validate::self_loop),
        help("Remove the edge; a node cannot support or attack itself.")
    )]
    SelfLoop { node: String, path: String },

    #[error("duplicate node id \"{id}\"")]
    #[diagnostic(
        code(argmend::validate::duplicate_id),
        help("Node ids must be unique within a graph.")
    )]
    DuplicateNodeId { id: String },

    #[error("node \"{node}\" has premises and a conclusion but no rule backing it")]
    #[diagnostic(
        code(argmend::validate::derivability_gap),
        help(
            "Give the node an explicit rule, reference a rule node, or let the \
             validator synthesize an implicit rule."
        )
    )]
    DerivabilityGap { node: String },

    #[error("predicate \"{predicate}\" is used with multiple arities: {arities}")]
    #[diagnostic(
        code(argmend::validate::multi_arity),
        help(
            "Arity is part of predicate identity. Rename one usage or set \
             `policy.multi_arity_predicate = \"auto_patch\"` to mint suffixed keys."
        )
    )]
    MultiArityPredicate { predicate: String, arities: String },

    #[error("goal \"{goal}\" does not name a node in the graph")]
    #[diagnostic(
        code(argmend::validate::unknown_goal),
        help("Pick the goal from the node ids of the compiled graph.")
    )]
    UnknownGoal { goal: String },
}

// ---------------------------------------------------------------------------
// Export errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum ExportError {
    #[error("goal \"{goal}\" does not name a node in the graph")]
    #[diagnostic(
        code(argmend::fol::unknown_goal),
        help("Pass a goal id that exists in the strict graph.")
    )]
    UnknownGoal { goal: String },

    #[error("goal \"{goal}\" has no conclusion to use as a conjecture")]
    #[diagnostic(
        code(argmend::fol::goal_without_conclusion),
        help("Only nodes with a conclusion statement can be proved.")
    )]
    GoalWithoutConclusion { goal: String },

    #[error("graph failed validation before export: {source}")]
    #[diagnostic(
        code(argmend::fol::invalid_graph),
        help("Exports require a graph that satisfies every strict-graph invariant.")
    )]
    Invalid {
        #[source]
        source: ValidationError,
    },
}

// ---------------------------------------------------------------------------
// Argumentation errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum ArgumentationError {
    #[error("argument \"{id}\" is not part of the attack graph")]
    #[diagnostic(
        code(argmend::af::unknown_argument),
        help(
            "Implicit-rule nodes without atoms are excluded from the projection. \
             Pick an authored node id."
        )
    )]
    UnknownArgument { id: String },

    #[error("{undecided} undecided arguments exceed the exhaustive search limit of {limit}")]
    #[diagnostic(
        code(argmend::af::search_limit),
        help("Raise `limits.max_search_arguments`; results beyond the limit are inconclusive.")
    )]
    SearchLimit { undecided: usize, limit: usize },
}

// ---------------------------------------------------------------------------
// Config errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum ConfigError {
    #[error("failed to read config: {path}")]
    #[diagnostic(
        code(argmend::config::read),
        help("Ensure the config file exists and is valid TOML.")
    )]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config {path}: {message}")]
    #[diagnostic(
        code(argmend::config::parse),
        help("Check the TOML syntax and the field names against `MendConfig`.")
    )]
    Parse { path: String, message: String },

    #[error("failed to write config: {path}")]
    #[diagnostic(
        code(argmend::config::write),
        help("Ensure you have write permissions to the target directory.")
    )]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },
}
