use polars::prelude::*;
use tracing::info;

use crate::dimensions::{projection, DimensionTables, DATE_KEY, LOCATION_KEY, ORDER_KEY};
use crate::error::Result;
use crate::loader::SourceTable;
use crate::schema::{
    identifiers, ColumnNaming, SourceColumn, FACT_COLUMNS, LOCATION_COLUMNS, ORDER_COLUMNS,
};

const SOURCE_ROW: &str = "__source_row";

/// Fact rows projected straight from the export: one row per source row, no
/// foreign keys.
pub fn build_fact(source: &SourceTable, naming: ColumnNaming) -> Result<DataFrame> {
    let df = source
        .lazy()
        .select(projection(&FACT_COLUMNS, naming))
        .collect()?;

    info!(rows = df.height(), "built fact table");
    Ok(df)
}

/// Fact rows carrying the surrogate keys of `dims`, resolved by left joins on
/// the natural keys. Source row count and order are preserved. Nulls match
/// nulls, so a row whose natural key holds a null resolves to the dimension
/// row deduplicated from it.
pub fn build_star_fact(
    source: &SourceTable,
    naming: ColumnNaming,
    dims: &DimensionTables,
) -> Result<DataFrame> {
    let location_on = key_columns(&LOCATION_COLUMNS, naming);
    let order_on = key_columns(&ORDER_COLUMNS, naming);
    let date = SourceColumn::OrderDate.identifier(naming);

    let mut location_side = vec![col(LOCATION_KEY)];
    location_side.extend(location_on.iter().cloned());
    let mut order_side = vec![col(ORDER_KEY)];
    order_side.extend(order_on.iter().cloned());

    let mut output = vec![col(LOCATION_KEY), col(DATE_KEY), col(ORDER_KEY)];
    output.extend(key_columns(&FACT_COLUMNS, naming));

    let df = source
        .lazy()
        .select(projection(&FACT_COLUMNS, naming))
        .with_row_index(SOURCE_ROW, None)
        .join(
            dims.location.clone().lazy().select(location_side),
            location_on.clone(),
            location_on,
            null_matching_left_join(),
        )
        .join(
            dims.date.clone().lazy().select([col(DATE_KEY), col(date)]),
            [col(date)],
            [col(date)],
            null_matching_left_join(),
        )
        .join(
            dims.orders.clone().lazy().select(order_side),
            order_on.clone(),
            order_on,
            null_matching_left_join(),
        )
        .sort([SOURCE_ROW], SortMultipleOptions::default())
        .select(output)
        .collect()?;

    info!(rows = df.height(), "built fact table with dimension keys");
    Ok(df)
}

/// Dimension dedup groups nulls together; the joins must agree or those keys
/// are orphaned.
fn null_matching_left_join() -> JoinArgs {
    JoinArgs {
        nulls_equal: true,
        ..JoinArgs::new(JoinType::Left)
    }
}

fn key_columns(columns: &[SourceColumn], naming: ColumnNaming) -> Vec<Expr> {
    identifiers(columns, naming).into_iter().map(col).collect()
}
