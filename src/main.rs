//! propinspect - index the distinct property values of a model tree.
//!
//! Usage:
//!   propinspect scan MODEL                     Summary of every category and property
//!   propinspect values MODEL -c CAT -p PROP    Distinct values of one property
//!   propinspect items MODEL -c CAT -p PROP -v VALUE
//!                                              Items carrying one value
//!   propinspect --help                         Show help

use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Args, Parser, Subcommand, ValueEnum};
use color_eyre::eyre::{Context, Result, bail};
use itertools::Itertools;
use tracing_subscriber::EnvFilter;

use propinspect_core::{IndexReport, MemoryModel, ScanSnapshot};
use propinspect_scan::{PropertyKey, ScanConfig, ScanScope, ScanSession, ScanState};

#[derive(Parser)]
#[command(
    name = "propinspect",
    version,
    about = "Index the distinct property values of a model tree",
    long_about = "propinspect scans a model tree, or its current selection, and lists \
                  every property category and property name with the distinct values \
                  found across all items, so items can be grouped by value."
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Args)]
struct ScopeArgs {
    /// Model document (JSON)
    model: PathBuf,

    /// Scan only the selected items and their descendants
    #[arg(short, long)]
    selection: bool,

    /// Maximum depth to descend below the scope roots
    #[arg(short = 'd', long)]
    max_depth: Option<u32>,
}

#[derive(Subcommand)]
enum Command {
    /// Scan and show every category, property and value
    Scan {
        #[command(flatten)]
        scope: ScopeArgs,

        /// Only index categories matching this glob (repeatable)
        #[arg(short, long = "category")]
        categories: Vec<String>,

        /// Number of values to show per property
        #[arg(short = 'n', long, default_value = "10")]
        top: usize,

        /// Show all values (no per-property limit)
        #[arg(short, long)]
        all: bool,

        /// Output format
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,
    },

    /// List the distinct values of one property
    Values {
        #[command(flatten)]
        scope: ScopeArgs,

        /// Property category
        #[arg(short, long)]
        category: String,

        /// Property name
        #[arg(short, long)]
        property: String,
    },

    /// List the items carrying one value of a property
    Items {
        #[command(flatten)]
        scope: ScopeArgs,

        /// Property category
        #[arg(short, long)]
        category: String,

        /// Property name
        #[arg(short, long)]
        property: String,

        /// Value as displayed by `values`
        #[arg(short, long)]
        value: String,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum, Default)]
enum OutputFormat {
    #[default]
    Text,
    Json,
}

fn main() -> Result<()> {
    color_eyre::install()?;
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Scan {
            scope,
            categories,
            top,
            all,
            format,
        } => {
            run_scan(&scope, categories, if all { None } else { Some(top) }, format)?;
        }
        Command::Values {
            scope,
            category,
            property,
        } => {
            run_values(&scope, &PropertyKey::new(category, property))?;
        }
        Command::Items {
            scope,
            category,
            property,
            value,
        } => {
            run_items(&scope, &PropertyKey::new(category, property), &value)?;
        }
    }

    Ok(())
}

/// Load the model and run one scan to completion.
fn scan_model(
    args: &ScopeArgs,
    categories: Vec<String>,
) -> Result<(Arc<MemoryModel>, Arc<ScanSnapshot>)> {
    let model = Arc::new(MemoryModel::load(&args.model).context("Could not load model")?);

    let scope = if args.selection {
        ScanScope::Selection
    } else {
        ScanScope::Full
    };
    let config = ScanConfig::builder()
        .scope(scope)
        .max_depth(args.max_depth)
        .include_categories(categories)
        .build()
        .context("Invalid scan options")?;

    eprintln!("Scanning {} ({scope})...", args.model.display());

    let mut session = ScanSession::new();
    session
        .start(Arc::clone(&model), config)
        .context("Could not start scan")?;
    let state = session.join();

    let Some(snapshot) = session.snapshot() else {
        bail!("Scan ended without a result");
    };
    if state == ScanState::Failed {
        eprintln!(
            "warning: scan failed ({}), showing partial results",
            snapshot.failure().unwrap_or("unknown error")
        );
    }

    Ok((model, snapshot))
}

/// Scan and print every category, property and value.
fn run_scan(
    args: &ScopeArgs,
    categories: Vec<String>,
    top_n: Option<usize>,
    format: OutputFormat,
) -> Result<()> {
    let (_, snapshot) = scan_model(args, categories)?;

    if let OutputFormat::Json = format {
        let report = IndexReport::from_snapshot(&snapshot);
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    print_summary(&args.model, &snapshot);

    for category in snapshot.index.categories() {
        println!("{category}");
        for key in snapshot.index.properties_in(category) {
            let Some(buckets) = snapshot.index.buckets(key) else {
                continue;
            };
            println!("  {} ({})", key.name, buckets.len());
            let limit = top_n.unwrap_or(usize::MAX);
            for (value, items) in buckets.iter().take(limit) {
                println!("    {:<40} {:>6} item(s)", value.to_string(), items.len());
            }
            if buckets.len() > limit {
                println!("    ... {} more", buckets.len() - limit);
            }
        }
    }

    Ok(())
}

/// Print the distinct values of one property.
fn run_values(args: &ScopeArgs, key: &PropertyKey) -> Result<()> {
    let (_, snapshot) = scan_model(args, Vec::new())?;

    let Some(buckets) = snapshot.index.buckets(key) else {
        bail!("No property '{key}' found in {}", args.model.display());
    };

    let types = buckets.keys().map(|v| v.type_name()).unique().join(", ");
    println!("{key}: {} distinct value(s) [{types}]", buckets.len());
    for (value, items) in buckets {
        println!("  {:<40} {:>6} item(s)", value.to_string(), items.len());
    }

    Ok(())
}

/// Print the items carrying one value of a property.
fn run_items(args: &ScopeArgs, key: &PropertyKey, value: &str) -> Result<()> {
    let (model, snapshot) = scan_model(args, Vec::new())?;

    let Some(buckets) = snapshot.index.buckets(key) else {
        bail!("No property '{key}' found in {}", args.model.display());
    };

    // Several typed values can share a display form, e.g. text "1" and integer 1.
    let matching = buckets
        .iter()
        .filter(|(candidate, _)| candidate.to_string() == value)
        .collect_vec();
    if matching.is_empty() {
        bail!("Property '{key}' never has the value '{value}'");
    }

    for (candidate, items) in matching {
        println!("{key} = {candidate} ({}): {} item(s)", candidate.type_name(), items.len());
        for item in items {
            println!("  {:>8}  {}", item.to_string(), model.name(*item).unwrap_or("?"));
        }
    }

    Ok(())
}

fn print_summary(model: &Path, snapshot: &ScanSnapshot) {
    let stats = snapshot.stats();
    println!();
    println!("{}", "─".repeat(60));
    println!(" {} - {} scan", model.display(), snapshot.scope);
    println!(
        " {} items, {} properties in {} categories, {} distinct values",
        snapshot.items_visited, stats.keys, stats.categories, stats.distinct_values
    );
    if let Some(duration) = snapshot.duration() {
        println!(" Scanned in {:.2}s", duration.as_secs_f64());
    }
    println!("{}", "─".repeat(60));
    println!();
}
