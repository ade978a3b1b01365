use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use variant_explosion::{
    default_definition, load_csv, to_json_string, EngineConfig, ExplosionPipeline, OutputSet,
};

/// Profile identifier variants and decide which ones to explode
#[derive(Parser, Debug)]
#[command(name = "variant-explosion")]
#[command(about = "Profile identifier variants and decide which to explode", long_about = None)]
struct Args {
    /// Input CSV with one row per historical record
    #[arg(short, long)]
    input: PathBuf,

    /// Where to write the metadata JSON
    #[arg(short, long, default_value = "metadata.json")]
    output: PathBuf,

    /// Where to write explosions-by-id JSON (stdout if omitted)
    #[arg(short, long)]
    explosions_output: Option<PathBuf>,

    /// Also write the wide combinations table as CSV
    #[arg(short, long)]
    combinations_output: Option<PathBuf>,

    /// Engine configuration JSON (fields, thresholds, columns)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Column name for record ID
    #[arg(long)]
    id_col: Option<String>,

    /// Column name for the timestamp used to pick the reference
    #[arg(long)]
    ts_col: Option<String>,

    /// Identifier fields to profile
    #[arg(short, long, num_args = 1..)]
    fields: Option<Vec<String>>,

    /// Decide ids on a single thread
    #[arg(long)]
    sequential: bool,

    /// Log level
    #[arg(long, default_value = "info")]
    log_level: String,
}

fn build_config(args: &Args) -> Result<EngineConfig> {
    let mut config = match &args.config {
        Some(path) => EngineConfig::from_file(path)?,
        None => EngineConfig::default(),
    };

    if let Some(id_col) = &args.id_col {
        config.id_column = id_col.clone();
    }
    if let Some(ts_col) = &args.ts_col {
        config.timestamp_column = ts_col.clone();
    }
    if let Some(names) = &args.fields {
        // Keep configured definitions for named fields, built-ins for the rest
        config.fields = names
            .iter()
            .map(|name| {
                config
                    .fields
                    .iter()
                    .find(|f| &f.name == name)
                    .cloned()
                    .unwrap_or_else(|| default_definition(name))
            })
            .collect();
    }
    if args.sequential {
        config.parallel = false;
    }

    Ok(config)
}

fn main() -> Result<()> {
    let args = Args::parse();

    let log_level = match args.log_level.as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    info!("Starting variant-explosion v{}", variant_explosion::VERSION);

    let config = build_config(&args)?;
    info!(fields = ?config.field_names(), id = %config.id_column, ts = %config.timestamp_column, "configuration");

    let pipeline = ExplosionPipeline::new(config).context("Invalid engine configuration")?;
    let records = load_csv(&args.input, pipeline.config())?;
    let report = pipeline.run(&records)?;

    // Render everything before touching any output file
    let metadata = to_json_string(&report.metadata())?;
    let explosions = to_json_string(&report.explosions())?;

    let mut outputs = OutputSet::new();
    outputs.add(&args.output, metadata);
    if let Some(path) = &args.combinations_output {
        outputs.add(path, report.combinations().to_csv_string()?);
    }
    let explosions = match &args.explosions_output {
        Some(path) => {
            outputs.add(path, explosions);
            None
        }
        None => Some(explosions),
    };

    outputs.commit()?;

    if let Some(explosions) = explosions {
        println!("{}", explosions);
    }

    Ok(())
}
