use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use handbook_etl::config::PipelineConfig;
use handbook_etl::logging;
use handbook_etl::observability;
use handbook_etl::pipeline::ingestion::{CsvWorkbook, JsonWorkbook, WorkbookSource};
use handbook_etl::pipeline::processing::canonical::{CrosswalkRecord, RegistryKind};
use handbook_etl::pipeline::storage::{CsvDirectorySink, InMemorySink, OutputSink};
use handbook_etl::pipeline::{InputDigest, Pipeline};

#[derive(Parser)]
#[command(name = "handbook_etl")]
#[command(about = "IRDAI life insurance handbook extraction and normalization")]
#[command(version = "0.1.0")]
struct Cli {
    /// Pipeline config file (TOML). Falls back to $HANDBOOK_CONFIG, then defaults.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Directory for the rolling JSON log files
    #[arg(long, global = true, default_value = "logs")]
    log_dir: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the full pipeline over both workbooks
    Run {
        /// Part I workbook: a JSON export or a directory of per-sheet CSV files
        #[arg(long)]
        part1: PathBuf,
        /// Part V workbook: a JSON export or a directory of per-sheet CSV files
        #[arg(long)]
        part5: PathBuf,
        /// Output directory
        #[arg(long, default_value = "output")]
        out: PathBuf,
        /// Run without writing any output files
        #[arg(long)]
        dry_run: bool,
    },
    /// Validate config, registries and layouts without reading any workbook
    Check,
    /// Resolve one label against a registry and print the crosswalk record
    Resolve {
        #[arg(long, value_enum)]
        registry: RegistryArg,
        label: String,
    },
    /// Print the table layout descriptors as JSON
    Layouts,
}

#[derive(Clone, Copy, ValueEnum)]
enum RegistryArg {
    Insurer,
    State,
    Channel,
}

impl From<RegistryArg> for RegistryKind {
    fn from(arg: RegistryArg) -> Self {
        match arg {
            RegistryArg::Insurer => RegistryKind::Insurer,
            RegistryArg::State => RegistryKind::State,
            RegistryArg::Channel => RegistryKind::Channel,
        }
    }
}

fn load_config(path: Option<PathBuf>) -> Result<PipelineConfig> {
    let path = path.or_else(|| std::env::var("HANDBOOK_CONFIG").ok().map(PathBuf::from));
    match path {
        Some(p) => PipelineConfig::load(&p)
            .with_context(|| format!("loading pipeline config from {}", p.display())),
        None => Ok(PipelineConfig::default()),
    }
}

fn open_workbook(path: &Path) -> Result<Box<dyn WorkbookSource>> {
    let source: Box<dyn WorkbookSource> = if path.is_dir() {
        Box::new(CsvWorkbook::open(path)?)
    } else {
        Box::new(JsonWorkbook::open(path)?)
    };
    Ok(source)
}

fn run(pipeline: &Pipeline, part1: &Path, part5: &Path, out: &Path, dry_run: bool) -> Result<()> {
    let span = tracing::info_span!("handbook_run", out = %out.display());
    let _enter = span.enter();

    let part_i = open_workbook(part1)
        .with_context(|| format!("opening Part I workbook {}", part1.display()))?;
    let part_v = open_workbook(part5)
        .with_context(|| format!("opening Part V workbook {}", part5.display()))?;

    let mut output = pipeline.run(part_i.as_ref(), part_v.as_ref())?;
    output.manifest.inputs = vec![
        InputDigest::of_path("part_i", part1).context("hashing Part I input")?,
        InputDigest::of_path("part_v", part5).context("hashing Part V input")?,
    ];
    output.manifest.metrics = observability::render();

    let sink: Box<dyn OutputSink> = if dry_run {
        Box::new(InMemorySink::new())
    } else {
        Box::new(CsvDirectorySink::new(out))
    };
    let bytes = sink
        .write(&output)
        .with_context(|| format!("writing outputs to {}", out.display()))?;

    println!("\n📊 Handbook run {}", output.manifest.run_id);
    for table in &output.manifest.tables {
        println!(
            "   {:<22} {:>6} records  {:>4} rows skipped",
            table.table, table.records, table.skipped_rows
        );
    }
    println!("   Facts: {}", output.facts.len());
    println!("   State breakdown: {}", output.state_breakdown.len());
    for detail in &output.details {
        println!("   {}: {}", detail.name, detail.rows.len());
    }
    println!("   Crosswalk: {}", output.crosswalk.len());
    for (severity, count) in &output.manifest.findings {
        println!("   QA {}: {}", severity, count);
    }
    if dry_run {
        println!("   Dry run: nothing written");
    } else {
        println!("   Output: {} ({} bytes)", out.display(), bytes);
    }

    if output.has_errors() {
        warn!("run finished with QA errors; see checks/qa_logs.csv");
    }
    Ok(())
}

fn main() -> Result<()> {
    dotenv::dotenv().ok();
    let cli = Cli::parse();
    logging::init_logging(&cli.log_dir);
    observability::init().context("installing metrics recorder")?;

    let config = load_config(cli.config)?;
    info!(?config, "configuration loaded");

    match cli.command {
        Commands::Run {
            part1,
            part5,
            out,
            dry_run,
        } => {
            let pipeline = Pipeline::new(config)?;
            run(&pipeline, &part1, &part5, &out, dry_run)?;
        }
        Commands::Check => {
            let pipeline = Pipeline::new(config)?;
            println!("✅ Configuration valid");
            for registry in pipeline.registries().iter() {
                let variants: usize = registry
                    .entities()
                    .iter()
                    .map(|e| e.source_variants.len())
                    .sum();
                println!(
                    "   {} registry: {} entities, {} variants",
                    registry.kind().as_str(),
                    registry.entities().len(),
                    variants
                );
            }
            println!("   Layouts: {}", pipeline.layouts().len());
            for layout in pipeline.layouts() {
                println!(
                    "   {:<22} sheet {:?} -> {}",
                    layout.table,
                    layout.sheet,
                    layout.kpis().join(", ")
                );
            }
        }
        Commands::Resolve { registry, label } => {
            let pipeline = Pipeline::new(config)?;
            let kind = RegistryKind::from(registry);
            let resolution = pipeline.registries().get(kind).resolve(&label);
            let record = CrosswalkRecord::new(kind, &label, &resolution);
            println!("{}", serde_json::to_string_pretty(&record)?);
        }
        Commands::Layouts => {
            let pipeline = Pipeline::new(config)?;
            println!("{}", serde_json::to_string_pretty(pipeline.layouts())?);
        }
    }

    Ok(())
}
