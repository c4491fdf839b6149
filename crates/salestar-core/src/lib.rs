pub mod catalog;
pub mod config;
pub mod dimensions;
pub mod error;
pub mod fact;
pub mod loader;
pub mod pipeline;
pub mod schema;

pub use catalog::{CatalogError, MemoryCatalog, ParquetCatalog, TableCatalog, TableInfo, WriteMode};
pub use config::{FactMode, PipelineConfig, TableNames};
pub use error::{PipelineError, Result};
pub use loader::{load_source, load_source_bytes, LoaderOptions, SourceTable};
pub use pipeline::{build_tables, run_from_config, run_pipeline, ExecutionContext, RunSummary};
pub use schema::{ColumnNaming, SourceColumn};
