//! argmend CLI: diagnose and repair argument graphs.

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use miette::{IntoDiagnostic, Result};

use argmend::argumentation::{AttackGraph, ExtensionSummary, Semantics};
use argmend::compile::{AliasTable, Compiled};
use argmend::config::{MendConfig, ProverBackend};
use argmend::diagnose::Diagnoser;
use argmend::fol::FolExporter;
use argmend::pipeline::{MendReport, Pipeline};
use argmend::soft::SoftIr;

#[derive(Parser)]
#[command(name = "argmend", version, about = "Argument graph diagnosis and repair")]
struct Cli {
    /// TOML configuration file.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Goal node (provisional id from the input graph).
    #[arg(long, global = true)]
    goal: Option<String>,

    /// Argumentation semantics: grounded, preferred or stable.
    #[arg(long, global = true)]
    semantics: Option<Semantics>,

    /// Prover backend: eprover, horn or none.
    #[arg(long, global = true, value_parser = parse_backend)]
    prover: Option<ProverBackend>,

    /// Persistent predicate alias table (JSON). Created if missing.
    #[arg(long, global = true)]
    alias_table: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile a soft graph into a strict graph and print it with the compile report.
    Compile {
        /// Soft graph JSON. Several files are compiled as best-of-k candidates.
        #[arg(required = true)]
        inputs: Vec<PathBuf>,
    },

    /// Print grounded, preferred and stable extensions.
    Extensions { input: PathBuf },

    /// Print the first-order problem in TPTP syntax.
    ExportFol { input: PathBuf },

    /// Detect issues without repairing them.
    Diagnose { input: PathBuf },

    /// Run the full pipeline and print the report.
    Repair {
        /// Soft graph JSON. Several files are compiled as best-of-k candidates.
        #[arg(required = true)]
        inputs: Vec<PathBuf>,
    },
}

fn parse_backend(s: &str) -> std::result::Result<ProverBackend, String> {
    match s.trim().to_lowercase().as_str() {
        "eprover" | "e" => Ok(ProverBackend::Eprover),
        "horn" => Ok(ProverBackend::Horn),
        "none" => Ok(ProverBackend::None),
        other => Err(format!("unknown prover `{other}` (expected eprover, horn or none)")),
    }
}

fn main() -> Result<()> {
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .unicode(true)
                .context_lines(3)
                .build(),
        )
    }))
    .ok();

    // Reports go to stdout; logs stay on stderr.
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => MendConfig::load(path)?,
        None => MendConfig::default(),
    };
    if let Some(semantics) = cli.semantics {
        config.semantics = semantics;
    }
    if let Some(backend) = cli.prover {
        config.prover.backend = backend;
    }

    let aliases = load_aliases(cli.alias_table.as_deref())?;
    let mut pipeline = Pipeline::new(config);
    if let Some(goal) = &cli.goal {
        pipeline = pipeline.with_goal(goal.clone());
    }

    match cli.command {
        Commands::Compile { inputs } => {
            let compiled = if inputs.len() == 1 {
                let soft = read_soft(&inputs[0], pipeline.config())?;
                pipeline.compile(&soft, &aliases)?
            } else {
                let candidates = read_all(&inputs, pipeline.config())?;
                let selection = pipeline.select(&candidates, &aliases)?;
                eprintln!("selected candidate {} of {}", selection.winner + 1, inputs.len());
                selection.compiled
            };
            let Compiled { strict, report } = compiled;
            print_json(&serde_json::json!({ "strict": strict, "report": report }))?;
        }

        Commands::Extensions { input } => {
            let soft = read_soft(&input, pipeline.config())?;
            let compiled = pipeline.compile(&soft, &aliases)?;
            let af = AttackGraph::from_strict(&compiled.strict);
            let summary =
                ExtensionSummary::compute(&af, pipeline.config().limits.max_search_arguments);
            print_json(&summary)?;
        }

        Commands::ExportFol { input } => {
            let soft = read_soft(&input, pipeline.config())?;
            let compiled = pipeline.compile(&soft, &aliases)?;
            let export = FolExporter::new(pipeline.config().fol_mode)
                .export(&compiled.strict, None)?;
            print!("{}", export.problem.to_tptp());
        }

        Commands::Diagnose { input } => {
            let soft = read_soft(&input, pipeline.config())?;
            let compiled = pipeline.compile(&soft, &aliases)?;
            let diagnosis =
                Diagnoser::new(pipeline.config(), pipeline.prover()).diagnose(&compiled.strict, None)?;
            print_json(&diagnosis)?;
        }

        Commands::Repair { inputs } => {
            let report: MendReport = if inputs.len() == 1 {
                let soft = read_soft(&inputs[0], pipeline.config())?;
                pipeline.run(&soft, &aliases)?
            } else {
                let candidates = read_all(&inputs, pipeline.config())?;
                pipeline.run_best_of(&candidates, &aliases)?
            };
            print_json(&report)?;
        }
    }

    if let Some(path) = &cli.alias_table {
        aliases.save(path)?;
    }
    Ok(())
}

fn load_aliases(path: Option<&Path>) -> Result<AliasTable> {
    match path {
        Some(path) if path.exists() => Ok(AliasTable::load(path)?),
        _ => Ok(AliasTable::new()),
    }
}

fn read_soft(path: &Path, config: &MendConfig) -> Result<SoftIr> {
    Ok(SoftIr::from_file(path, &config.limits)?)
}

fn read_all(paths: &[PathBuf], config: &MendConfig) -> Result<Vec<SoftIr>> {
    paths.iter().map(|p| read_soft(p, config)).collect()
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    let text = serde_json::to_string_pretty(value).into_diagnostic()?;
    println!("{text}");
    Ok(())
}
