// Football CDF - command line
//
//   football-cdf to-cdf   --events E --lineup L [--matches M] --out DIR
//   football-cdf to-graph --tables DIR --out DIR
//   football-cdf convert  --root OPEN_DATA --out DIR
//
// Single-match flags or --root (a StatsBomb open-data checkout) for batches.

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use football_cdf::io::{self, MatchFiles, MATCH_SHEET_FILE};
use football_cdf::batch::graph_digest;
use football_cdf::{
    export, BatchSummary, GraphSerializer, PipelineConfig, SourceDocuments, SourceToCdfMapper, TaxonomyRegistry,
};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{error, info};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

// ============================================================================
// ARGUMENTS
// ============================================================================

#[derive(Parser, Debug)]
#[command(name = "football-cdf", version, about = "StatsBomb open data to CDF tables and CDF-LD graphs")]
struct Cli {
    /// Pipeline config (JSON); unset keys keep their defaults
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Keep administrative marker events (half start/end, lineups) in the event log
    #[arg(long, global = true)]
    keep_administrative: bool,

    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Pretty)]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Source documents -> CDF tables
    ToCdf(SourceArgs),
    /// CDF tables -> JSON-LD graph
    ToGraph(GraphArgs),
    /// Source documents -> CDF tables -> JSON-LD graph
    Convert(SourceArgs),
}

#[derive(Args, Debug)]
struct SourceArgs {
    /// Events document of one match
    #[arg(long, requires = "lineup", conflicts_with = "root")]
    events: Option<PathBuf>,

    /// Lineup document of one match
    #[arg(long, requires = "events")]
    lineup: Option<PathBuf>,

    /// Competition/season matches document
    #[arg(long)]
    matches: Option<PathBuf>,

    /// Match id; inferred from the events file name when omitted
    #[arg(long)]
    match_id: Option<String>,

    /// StatsBomb open-data root (batch mode)
    #[arg(long, required_unless_present = "events")]
    root: Option<PathBuf>,

    /// Output directory
    #[arg(long, short)]
    out: PathBuf,

    /// Also write the event log as CSV next to the tables
    #[arg(long)]
    csv: bool,
}

#[derive(Args, Debug)]
struct GraphArgs {
    /// One match directory written by to-cdf, or a directory of them
    #[arg(long)]
    tables: PathBuf,

    /// Output directory for the .jsonld files
    #[arg(long, short)]
    out: PathBuf,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum LogFormat {
    Pretty,
    Json,
}

#[derive(Clone, Copy, Debug)]
enum Stage {
    Tables,
    Both,
}

// ============================================================================
// MAIN
// ============================================================================

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.log_format);

    let mut config = match &cli.config {
        Some(path) => PipelineConfig::load(path)?,
        None => PipelineConfig::default(),
    };
    if cli.keep_administrative {
        config = config.with_administrative_events(true);
    }
    let registry = TaxonomyRegistry::new();

    match &cli.command {
        Command::ToCdf(args) => run_source(args, &config, &registry, Stage::Tables),
        Command::Convert(args) => run_source(args, &config, &registry, Stage::Both),
        Command::ToGraph(args) => run_to_graph(args, &config, &registry),
    }
}

fn init_logging(format: LogFormat) {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    match format {
        LogFormat::Json => tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt::layer().json())
            .init(),
        LogFormat::Pretty => tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt::layer().with_target(false))
            .init(),
    }
}

// ============================================================================
// SOURCE -> TABLES (-> GRAPH)
// ============================================================================

fn run_source(args: &SourceArgs, config: &PipelineConfig, registry: &TaxonomyRegistry, stage: Stage) -> Result<()> {
    fs::create_dir_all(&args.out).with_context(|| format!("Failed to create directory: {}", args.out.display()))?;

    if let Some(root) = &args.root {
        return run_batch(root, args, config, registry, stage);
    }

    let (Some(events), Some(lineup)) = (&args.events, &args.lineup) else {
        bail!("Pass --events and --lineup, or --root");
    };
    let docs = io::load_documents(events, lineup, args.matches.as_deref(), args.match_id.as_deref())?;

    let mut summary = BatchSummary::default();
    convert_one(&docs, args, config, registry, stage, &mut summary)?;
    report(&summary)
}

fn run_batch(root: &Path, args: &SourceArgs, config: &PipelineConfig, registry: &TaxonomyRegistry, stage: Stage) -> Result<()> {
    let matches: Vec<MatchFiles> = io::discover_matches(root)?;
    println!("📂 {} match(es) under {}", matches.len(), root.display());

    let mut summary = BatchSummary::default();
    for files in &matches {
        let docs = files.load()?;
        convert_one(&docs, args, config, registry, stage, &mut summary)?;
    }

    io::write_report(&args.out.join("batch_summary.json"), &summary)?;
    report(&summary)
}

/// Convert one match and write its outputs.
///
/// A conversion failure is recorded in `summary`; only I/O errors are returned.
fn convert_one(
    docs: &SourceDocuments,
    args: &SourceArgs,
    config: &PipelineConfig,
    registry: &TaxonomyRegistry,
    stage: Stage,
    summary: &mut BatchSummary,
) -> Result<()> {
    let match_id = docs.match_id.as_str();
    let mapped = match SourceToCdfMapper::new(config, registry).convert(docs) {
        Ok(mapped) => mapped,
        Err(e) => {
            error!(match_id, error = %e, "match failed");
            println!("✗ {}: {}", match_id, e);
            summary.record_failed(match_id, &e);
            return Ok(());
        }
    };

    let match_dir = io::write_cdf_tables(&args.out, &mapped.tables)?;
    if args.csv {
        export::write_event_log_csv_file(&match_dir.join("event_cdf.csv"), &mapped.tables.events)?;
    }
    if !mapped.diagnostics.is_empty() {
        io::write_report(&match_dir.join("warnings.json"), mapped.diagnostics.warnings())?;
    }

    let digest = match stage {
        Stage::Both => {
            let doc = GraphSerializer::new(config, registry.attributes()).serialize(&mapped.tables);
            io::write_graph(&args.out, match_id, &doc)?;
            Some(graph_digest(&doc))
        }
        Stage::Tables => None,
    };

    println!(
        "✓ {}: {} events, {}",
        match_id,
        mapped.tables.events.len(),
        mapped.diagnostics.summary()
    );
    summary.record_converted(match_id, &mapped.diagnostics, digest);
    Ok(())
}

fn report(summary: &BatchSummary) -> Result<()> {
    println!("\n━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!("{}", summary);
    if summary.failed > 0 {
        bail!("{} match(es) failed", summary.failed);
    }
    Ok(())
}

// ============================================================================
// TABLES -> GRAPH
// ============================================================================

fn run_to_graph(args: &GraphArgs, config: &PipelineConfig, registry: &TaxonomyRegistry) -> Result<()> {
    let match_dirs = if args.tables.join(MATCH_SHEET_FILE).is_file() {
        vec![args.tables.clone()]
    } else {
        let mut dirs = Vec::new();
        for entry in fs::read_dir(&args.tables).with_context(|| format!("Failed to list {}", args.tables.display()))? {
            let path = entry?.path();
            if path.join(MATCH_SHEET_FILE).is_file() {
                dirs.push(path);
            }
        }
        dirs.sort();
        dirs
    };
    if match_dirs.is_empty() {
        bail!("No CDF tables under {}", args.tables.display());
    }

    let serializer = GraphSerializer::new(config, registry.attributes());
    for dir in &match_dirs {
        let tables = io::read_cdf_tables(dir)?;
        let doc = serializer.serialize(&tables);
        let path = io::write_graph(&args.out, tables.match_id(), &doc)?;
        info!(match_id = tables.match_id(), nodes = doc.len(), "graph written");
        println!("✓ {} -> {}", tables.match_id(), path.display());
    }

    println!("\n🕸️  {} graph(s) written to {}", match_dirs.len(), args.out.display());
    Ok(())
}
