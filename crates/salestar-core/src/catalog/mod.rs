//! Named-table stores the warehouse tables are written into. Every write
//! replaces the table wholesale; there is no append or upsert path.

mod memory;
mod parquet;

use std::io::Cursor;

use chrono::{DateTime, Utc};
use polars::io::parquet::write::{ParquetCompression, ParquetWriter, StatisticsOptions};
use polars::prelude::{DataFrame, PolarsError};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

pub use memory::MemoryCatalog;
pub use parquet::ParquetCatalog;

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("catalog I/O error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("parquet encoding failed: {0}")]
    Polars(#[from] PolarsError),
    #[error("table metadata is unreadable: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid table name: {0}")]
    InvalidName(String),
    #[error(
        "table '{table}' has columns [{}] but the write has [{}]; overwrite the schema to replace it",
        existing.join(", "),
        incoming.join(", ")
    )]
    SchemaConflict {
        table: String,
        existing: Vec<String>,
        incoming: Vec<String>,
    },
    #[error("table not found: {0}")]
    NotFound(String),
    #[error("catalog directory not found: {0}")]
    MissingRoot(String),
    #[error("catalog lock poisoned")]
    Poisoned,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteMode {
    /// Replace the rows; the incoming schema must match an existing table.
    Overwrite,
    /// Replace rows and schema.
    OverwriteSchema,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnInfo {
    pub name: String,
    pub dtype: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableInfo {
    pub name: String,
    pub columns: Vec<ColumnInfo>,
    pub row_count: usize,
    /// blake3 of the encoded parquet payload.
    pub content_hash: String,
    pub run_id: Uuid,
    pub written_at: DateTime<Utc>,
}

impl TableInfo {
    fn new(name: &str, df: &DataFrame, payload: &[u8], run_id: Uuid) -> Self {
        Self {
            name: name.to_string(),
            columns: column_infos(df),
            row_count: df.height(),
            content_hash: blake3::hash(payload).to_hex().to_string(),
            run_id,
            written_at: Utc::now(),
        }
    }

    pub fn column_names(&self) -> Vec<String> {
        self.columns.iter().map(|column| column.name.clone()).collect()
    }
}

pub trait TableCatalog: Send + Sync {
    fn write_table(
        &self,
        name: &str,
        df: &DataFrame,
        mode: WriteMode,
        run_id: Uuid,
    ) -> Result<TableInfo, CatalogError>;

    fn read_table(&self, name: &str) -> Result<DataFrame, CatalogError>;

    /// Metadata of the last write, or `None` if the table was never written.
    fn describe(&self, name: &str) -> Result<Option<TableInfo>, CatalogError>;

    fn list_tables(&self) -> Result<Vec<TableInfo>, CatalogError>;
}

pub(crate) fn column_infos(df: &DataFrame) -> Vec<ColumnInfo> {
    df.get_columns()
        .iter()
        .map(|column| ColumnInfo {
            name: column.name().to_string(),
            dtype: column.dtype().to_string(),
        })
        .collect()
}

/// Rejects a plain overwrite whose columns differ from the stored table.
pub(crate) fn check_schema(
    name: &str,
    existing: Option<&TableInfo>,
    df: &DataFrame,
    mode: WriteMode,
) -> Result<(), CatalogError> {
    let (WriteMode::Overwrite, Some(existing)) = (mode, existing) else {
        return Ok(());
    };

    let incoming = column_infos(df);
    if existing.columns != incoming {
        return Err(CatalogError::SchemaConflict {
            table: name.to_string(),
            existing: existing
                .columns
                .iter()
                .map(|column| format!("{}: {}", column.name, column.dtype))
                .collect(),
            incoming: incoming
                .iter()
                .map(|column| format!("{}: {}", column.name, column.dtype))
                .collect(),
        });
    }
    Ok(())
}

pub(crate) fn validate_name(name: &str) -> Result<(), CatalogError> {
    crate::config::validate_table_name(name).map_err(CatalogError::InvalidName)
}

pub(crate) fn encode_parquet(df: &DataFrame) -> Result<Vec<u8>, PolarsError> {
    let mut buffer = Vec::new();
    {
        let mut cursor = Cursor::new(&mut buffer);
        let mut clone = df.clone();
        ParquetWriter::new(&mut cursor)
            .with_compression(ParquetCompression::Zstd(None))
            .with_statistics(StatisticsOptions::default())
            .finish(&mut clone)?;
    }
    Ok(buffer)
}
