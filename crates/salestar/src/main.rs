use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use comfy_table::Table;
use polars::prelude::DataFrame;
use salestar_core::{
    load_source, run_from_config, ColumnNaming, ExecutionContext, FactMode, MemoryCatalog,
    ParquetCatalog, PipelineConfig, TableCatalog,
};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about = "Builds the sales star schema from a flat export", long_about = None)]
struct Cli {
    /// TOML configuration file; defaults apply when omitted
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Load the export, build all tables and overwrite them in the catalog
    Run(RunArgs),
    /// Print the typed schema and the first rows of the export
    Inspect(InspectArgs),
    /// List the tables in the catalog
    Tables(CatalogArgs),
    /// Print the first rows of a catalog table
    Show(ShowArgs),
}

#[derive(Args, Debug, Default)]
struct RunArgs {
    /// Input CSV file
    #[arg(long)]
    input: Option<PathBuf>,
    /// Catalog directory
    #[arg(long)]
    catalog: Option<PathBuf>,
    #[arg(long, value_enum)]
    fact_mode: Option<FactModeArg>,
    /// Write `Order_Priority` and `year` instead of the legacy column names
    #[arg(long)]
    corrected_names: bool,
    /// Replace stored schemas on every table
    #[arg(long)]
    overwrite_schema: bool,
    /// Build everything but write into an in-memory catalog
    #[arg(long)]
    dry_run: bool,
    /// Print the run summary as JSON
    #[arg(long)]
    json: bool,
}

#[derive(Args, Debug, Default)]
struct InspectArgs {
    #[arg(long)]
    input: Option<PathBuf>,
    /// Number of rows to print
    #[arg(long, default_value_t = 20)]
    rows: usize,
}

#[derive(Args, Debug, Default)]
struct CatalogArgs {
    #[arg(long)]
    catalog: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct ShowArgs {
    table: String,
    #[arg(long)]
    catalog: Option<PathBuf>,
    #[arg(long, default_value_t = 20)]
    rows: usize,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum FactModeArg {
    Projection,
    StarJoin,
}

impl From<FactModeArg> for FactMode {
    fn from(value: FactModeArg) -> Self {
        match value {
            FactModeArg::Projection => FactMode::Projection,
            FactModeArg::StarJoin => FactMode::StarJoin,
        }
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .json()
        .init();

    let cli = Cli::parse();
    let config = load_config(cli.config.as_ref())?;

    match cli.command {
        Command::Run(args) => handle_run(config, args),
        Command::Inspect(args) => handle_inspect(config, args),
        Command::Tables(args) => handle_tables(config, args),
        Command::Show(args) => handle_show(config, args),
    }
}

fn load_config(path: Option<&PathBuf>) -> Result<PipelineConfig> {
    dotenvy::dotenv().ok();
    load_config_with(path, |key| std::env::var(key).ok())
}

/// Config file (or defaults), then `SALESTAR_*` overrides from `lookup`.
fn load_config_with<F>(path: Option<&PathBuf>, lookup: F) -> Result<PipelineConfig>
where
    F: Fn(&str) -> Option<String>,
{
    let mut config = match path {
        Some(path) => PipelineConfig::from_file(path)
            .with_context(|| format!("failed to load config from {}", path.display()))?,
        None => PipelineConfig::default(),
    };
    config
        .apply_overrides(lookup)
        .context("invalid SALESTAR_* environment override")?;
    Ok(config)
}

/// Command-line flags win over both the config file and the environment.
fn apply_run_flags(config: &mut PipelineConfig, args: &RunArgs) -> Result<()> {
    if let Some(input) = &args.input {
        config.input_path = input.clone();
    }
    if let Some(catalog) = &args.catalog {
        config.catalog_dir = catalog.clone();
    }
    if let Some(mode) = args.fact_mode {
        config.fact_mode = mode.into();
    }
    if args.corrected_names {
        config.column_naming = ColumnNaming::Corrected;
    }
    if args.overwrite_schema {
        config.overwrite_schema = true;
    }
    config.validate()?;
    Ok(())
}

fn handle_run(mut config: PipelineConfig, args: RunArgs) -> Result<()> {
    apply_run_flags(&mut config, &args)?;

    let catalog: Arc<dyn TableCatalog> = if args.dry_run {
        warn!("dry run: tables are written to an in-memory catalog and discarded");
        Arc::new(MemoryCatalog::new())
    } else {
        Arc::new(ParquetCatalog::open(&config.catalog_dir).with_context(|| {
            format!("failed to open catalog at {}", config.catalog_dir.display())
        })?)
    };

    let ctx = ExecutionContext::new(catalog, config);
    info!(run_id = %ctx.run_id, input = %ctx.config.input_path.display(), "starting run");
    let summary = run_from_config(&ctx).context("pipeline run failed")?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        let mut table = Table::new();
        table.set_header(vec!["table", "rows", "columns", "content hash"]);
        for info in &summary.tables {
            table.add_row(vec![
                info.name.clone(),
                info.row_count.to_string(),
                info.columns.len().to_string(),
                short_hash(&info.content_hash).to_string(),
            ]);
        }
        println!("Run {} ({} source rows)", summary.run_id, summary.source_rows);
        println!("{table}");
    }
    Ok(())
}

fn handle_inspect(mut config: PipelineConfig, args: InspectArgs) -> Result<()> {
    if let Some(input) = args.input {
        config.input_path = input;
    }
    let source = load_source(&config.input_path, &config.loader_options())
        .with_context(|| format!("failed to load {}", config.input_path.display()))?;

    let mut schema = Table::new();
    schema.set_header(vec!["column", "dtype", "nulls"]);
    for (column, dtype) in source.schema_summary() {
        let nulls = source
            .frame()
            .column(&column)
            .map(|series| series.null_count())
            .unwrap_or(0);
        schema.add_row(vec![column, dtype, nulls.to_string()]);
    }
    println!("{} rows", source.height());
    println!("{schema}");
    println!("{}", render_frame(source.frame(), args.rows));
    Ok(())
}

fn handle_tables(mut config: PipelineConfig, args: CatalogArgs) -> Result<()> {
    if let Some(catalog) = args.catalog {
        config.catalog_dir = catalog;
    }
    let catalog = ParquetCatalog::open_existing(&config.catalog_dir)?;
    let tables = catalog.list_tables()?;

    if tables.is_empty() {
        println!("No tables in {}", config.catalog_dir.display());
        return Ok(());
    }

    let mut table = Table::new();
    table.set_header(vec![
        "table",
        "rows",
        "columns",
        "content hash",
        "written at",
        "run",
    ]);
    for info in tables {
        table.add_row(vec![
            info.name.clone(),
            info.row_count.to_string(),
            info.column_names().join(", "),
            short_hash(&info.content_hash).to_string(),
            info.written_at.to_rfc3339(),
            info.run_id.to_string(),
        ]);
    }
    println!("{table}");
    Ok(())
}

fn handle_show(mut config: PipelineConfig, args: ShowArgs) -> Result<()> {
    if let Some(catalog) = args.catalog {
        config.catalog_dir = catalog;
    }
    let catalog = ParquetCatalog::open_existing(&config.catalog_dir)?;
    let df = catalog
        .read_table(&args.table)
        .with_context(|| format!("failed to read table {}", args.table))?;
    println!("{} rows", df.height());
    println!("{}", render_frame(&df, args.rows));
    Ok(())
}

fn short_hash(hash: &str) -> &str {
    hash.get(..16).unwrap_or(hash)
}

fn render_frame(df: &DataFrame, rows: usize) -> Table {
    let head = df.head(Some(rows));
    let mut table = Table::new();
    table.set_header(
        head.get_column_names()
            .iter()
            .map(|name| name.to_string())
            .collect::<Vec<_>>(),
    );

    for idx in 0..head.height() {
        let row: Vec<String> = head
            .get_columns()
            .iter()
            .map(|column| {
                column
                    .get(idx)
                    .map(|value| value.to_string())
                    .unwrap_or_default()
            })
            .collect();
        table.add_row(row);
    }
    table
}
