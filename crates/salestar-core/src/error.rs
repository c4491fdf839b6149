// crates/salestar-core/src/error.rs

use thiserror::Error;

use crate::catalog::CatalogError;
use crate::config::ConfigError;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("File I/O error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("CSV parsing error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Polars operation failed: {0}")]
    Polars(#[from] polars::error::PolarsError),

    #[error("source header is missing required columns: {}", missing.join(", "))]
    MissingColumns { missing: Vec<String> },

    #[error("source file {0} has no header row")]
    EmptySource(String),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Table write failed: {0}")]
    Catalog(#[from] CatalogError),
}

pub type Result<T> = std::result::Result<T, PipelineError>;
