use std::io::Cursor;
use std::path::Path;

use polars::prelude::*;
use tracing::{debug, info, warn};

use crate::error::{PipelineError, Result};
use crate::schema::{ColumnKind, SourceColumn};

#[derive(Debug, Clone)]
pub struct LoaderOptions {
    pub separator: u8,
    /// strftime formats tried in order; the first that parses wins.
    pub date_formats: Vec<String>,
}

impl Default for LoaderOptions {
    fn default() -> Self {
        Self {
            separator: b',',
            date_formats: vec!["%m/%d/%Y".to_string(), "%Y-%m-%d".to_string()],
        }
    }
}

/// The raw export, typed according to the declared source schema.
#[derive(Debug, Clone)]
pub struct SourceTable {
    df: DataFrame,
}

impl SourceTable {
    /// Wraps an already typed frame, checking every declared column is present
    /// with its declared dtype. Extra columns are dropped.
    pub fn from_frame(df: DataFrame) -> Result<Self> {
        let missing: Vec<String> = SourceColumn::ALL
            .iter()
            .filter(|column| df.column(column.header()).is_err())
            .map(|column| column.header().to_string())
            .collect();
        if !missing.is_empty() {
            return Err(PipelineError::MissingColumns { missing });
        }

        for column in SourceColumn::ALL {
            let actual = df.column(column.header())?.dtype();
            let expected = column.dtype();
            if *actual != expected {
                return Err(PolarsError::SchemaMismatch(
                    format!("column '{column}' has dtype {actual}, expected {expected}").into(),
                )
                .into());
            }
        }

        let df = df.select(SourceColumn::ALL.iter().map(|column| column.header()))?;
        Ok(Self { df })
    }

    pub fn frame(&self) -> &DataFrame {
        &self.df
    }

    pub fn lazy(&self) -> LazyFrame {
        self.df.clone().lazy()
    }

    pub fn height(&self) -> usize {
        self.df.height()
    }

    /// (column, dtype) pairs in source order.
    pub fn schema_summary(&self) -> Vec<(String, String)> {
        self.df
            .get_columns()
            .iter()
            .map(|column| (column.name().to_string(), column.dtype().to_string()))
            .collect()
    }

    pub fn null_count(&self, column: SourceColumn) -> usize {
        self.df
            .column(column.header())
            .map(|series| series.null_count())
            .unwrap_or(0)
    }
}

/// Reads the export at `path`. Any I/O, CSV or conversion failure is fatal.
pub fn load_source(path: &Path, options: &LoaderOptions) -> Result<SourceTable> {
    info!(path = %path.display(), "loading sales export");
    let content = std::fs::read(path).map_err(|source| PipelineError::Io {
        path: path.display().to_string(),
        source,
    })?;
    let source = load_source_bytes(&content, options).map_err(|err| match err {
        PipelineError::EmptySource(_) => PipelineError::EmptySource(path.display().to_string()),
        other => other,
    })?;
    info!(rows = source.height(), "sales export loaded");
    Ok(source)
}

pub fn load_source_bytes(content: &[u8], options: &LoaderOptions) -> Result<SourceTable> {
    let headers = read_headers(content, options.separator)?;
    if headers.is_empty() {
        return Err(PipelineError::EmptySource("<input>".to_string()));
    }

    let missing: Vec<String> = SourceColumn::ALL
        .iter()
        .filter(|column| !headers.iter().any(|header| header == column.header()))
        .map(|column| column.header().to_string())
        .collect();
    if !missing.is_empty() {
        return Err(PipelineError::MissingColumns { missing });
    }
    debug!(columns = ?headers, "source header validated");

    let parse_options = CsvParseOptions::default().with_separator(options.separator);

    // Every column comes in as text; types are applied from the declared schema below.
    let raw = CsvReadOptions::default()
        .with_has_header(true)
        .with_infer_schema_length(Some(0))
        .with_parse_options(parse_options)
        .into_reader_with_file_handle(Cursor::new(content))
        .finish()?;

    let typed = raw
        .lazy()
        .select(
            SourceColumn::ALL
                .iter()
                .map(|column| typed_column(*column, &options.date_formats))
                .collect::<Vec<_>>(),
        )
        .collect()?;

    let source = SourceTable::from_frame(typed)?;

    for column in [SourceColumn::OrderDate, SourceColumn::ShipDate] {
        let nulls = source.null_count(column);
        if nulls > 0 {
            warn!(column = %column, nulls, "date values could not be parsed; kept as null");
        }
    }

    Ok(source)
}

fn read_headers(content: &[u8], separator: u8) -> Result<Vec<String>> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(separator)
        .has_headers(true)
        .from_reader(content);

    let headers = reader
        .headers()?
        .iter()
        .enumerate()
        .map(|(idx, header)| {
            if idx == 0 {
                header.trim_start_matches('\u{feff}').to_string()
            } else {
                header.to_string()
            }
        })
        .filter(|header| !header.is_empty())
        .collect();
    Ok(headers)
}

fn typed_column(column: SourceColumn, date_formats: &[String]) -> Expr {
    let name = column.header();
    match column.kind() {
        ColumnKind::Text => col(name),
        ColumnKind::Float => col(name).strict_cast(DataType::Float64),
        ColumnKind::Integer => col(name).strict_cast(DataType::Int64),
        ColumnKind::Date => parse_date(name, date_formats),
    }
}

/// Tries each format in turn; a value no format accepts becomes null.
fn parse_date(name: &str, date_formats: &[String]) -> Expr {
    let mut parsed: Option<Expr> = None;

    for format in date_formats.iter().rev() {
        let attempt = col(name).str().to_date(StrptimeOptions {
            format: Some(format.as_str().into()),
            strict: false,
            exact: true,
            cache: true,
        });
        parsed = Some(match parsed {
            None => attempt,
            Some(fallback) => when(attempt.clone().is_not_null())
                .then(attempt)
                .otherwise(fallback),
        });
    }

    parsed
        .unwrap_or_else(|| lit(NULL).cast(DataType::Date))
        .alias(name)
}
