//! Dimension builders. Each one is a pure function of the loaded export.

use polars::prelude::*;
use tracing::info;

use crate::error::Result;
use crate::loader::SourceTable;
use crate::schema::{
    ColumnNaming, SourceColumn, DAY_COLUMN, LOCATION_COLUMNS, MONTH_COLUMN, ORDER_COLUMNS,
};

pub const LOCATION_KEY: &str = "location_id";
pub const DATE_KEY: &str = "date_id";
pub const ORDER_KEY: &str = "order_key";

#[derive(Debug, Clone)]
pub struct DimensionTables {
    pub location: DataFrame,
    pub date: DataFrame,
    pub orders: DataFrame,
}

impl DimensionTables {
    pub fn build(source: &SourceTable, naming: ColumnNaming) -> Result<Self> {
        Ok(Self {
            location: build_location_dim(source)?,
            date: build_date_dim(source, naming)?,
            orders: build_orders_dim(source, naming)?,
        })
    }

    /// Prepends 1-based surrogate keys to every dimension.
    pub fn with_surrogate_keys(self) -> Result<Self> {
        Ok(Self {
            location: with_surrogate_key(&self.location, LOCATION_KEY)?,
            date: with_surrogate_key(&self.date, DATE_KEY)?,
            orders: with_surrogate_key(&self.orders, ORDER_KEY)?,
        })
    }
}

/// Distinct (region, Country) pairs in first-seen order.
pub fn build_location_dim(source: &SourceTable) -> Result<DataFrame> {
    let df = source
        .lazy()
        .select(projection(&LOCATION_COLUMNS, ColumnNaming::Legacy))
        .unique_stable(None, UniqueKeepStrategy::First)
        .collect()?;

    info!(rows = df.height(), "built location dimension");
    Ok(df)
}

/// One row per distinct order date with its calendar parts. A null date keeps
/// its row and gets null parts.
pub fn build_date_dim(source: &SourceTable, naming: ColumnNaming) -> Result<DataFrame> {
    let date = SourceColumn::OrderDate.identifier(naming);

    let df = source
        .lazy()
        .select([col(SourceColumn::OrderDate.header()).alias(date)])
        .unique_stable(None, UniqueKeepStrategy::First)
        .with_columns([
            col(date)
                .dt()
                .year()
                .cast(DataType::Int32)
                .alias(naming.year_column()),
            col(date).dt().month().cast(DataType::Int32).alias(MONTH_COLUMN),
            col(date).dt().day().cast(DataType::Int32).alias(DAY_COLUMN),
        ])
        .collect()?;

    info!(rows = df.height(), "built date dimension");
    Ok(df)
}

/// Distinct order-attribute rows. Deduplication is over the whole tuple, so an
/// order id can appear more than once.
pub fn build_orders_dim(source: &SourceTable, naming: ColumnNaming) -> Result<DataFrame> {
    let df = source
        .lazy()
        .select(projection(&ORDER_COLUMNS, naming))
        .unique_stable(None, UniqueKeepStrategy::First)
        .collect()?;

    info!(rows = df.height(), "built orders dimension");
    Ok(df)
}

pub fn with_surrogate_key(dim: &DataFrame, key: &str) -> Result<DataFrame> {
    Ok(dim.with_row_index(key.into(), Some(1))?)
}

pub(crate) fn projection(columns: &[SourceColumn], naming: ColumnNaming) -> Vec<Expr> {
    columns
        .iter()
        .map(|column| col(column.header()).alias(column.identifier(naming)))
        .collect()
}
