use std::collections::HashSet;
use std::path::PathBuf;

use polars::prelude::*;
use salestar_core::dimensions::{
    build_date_dim, build_location_dim, build_orders_dim, DimensionTables, DATE_KEY,
    LOCATION_KEY, ORDER_KEY,
};
use salestar_core::{load_source, ColumnNaming, LoaderOptions, SourceTable};

fn sample_source() -> SourceTable {
    let path = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/data/amazon_sales_sample.csv");
    load_source(&path, &LoaderOptions::default()).expect("fixture should load")
}

fn names(df: &DataFrame) -> Vec<String> {
    df.get_column_names()
        .iter()
        .map(|name| name.to_string())
        .collect()
}

fn row_keys(df: &DataFrame) -> Vec<String> {
    (0..df.height())
        .map(|idx| {
            df.get_columns()
                .iter()
                .map(|column| column.get(idx).unwrap().to_string())
                .collect::<Vec<_>>()
                .join("|")
        })
        .collect()
}

fn as_strings(df: &DataFrame, name: &str) -> Vec<Option<String>> {
    let column = df.column(name).unwrap().cast(&DataType::String).unwrap();
    column
        .str()
        .unwrap()
        .into_iter()
        .map(|value| value.map(str::to_string))
        .collect()
}

#[test]
fn location_dimension_has_unique_pairs() {
    let source = sample_source();
    let location = build_location_dim(&source).unwrap();

    assert_eq!(names(&location), ["region", "Country"]);
    assert_eq!(location.height(), 7);

    let keys = row_keys(&location);
    let distinct: HashSet<_> = keys.iter().collect();
    assert_eq!(distinct.len(), keys.len(), "no duplicate (region, Country) pairs");

    let countries = as_strings(&location, "Country");
    assert_eq!(countries[0].as_deref(), Some("Tuvalu"), "first-seen order is kept");
}

#[test]
fn date_dimension_has_one_row_per_distinct_date() {
    let source = sample_source();
    let date = build_date_dim(&source, ColumnNaming::Legacy).unwrap();

    assert_eq!(names(&date), ["Order_date", "data", "month", "day"]);

    let source_dates: HashSet<Option<String>> =
        as_strings(source.frame(), "Order date").into_iter().collect();
    assert_eq!(date.height(), source_dates.len());

    let dim_dates = as_strings(&date, "Order_date");
    let distinct: HashSet<_> = dim_dates.iter().collect();
    assert_eq!(distinct.len(), dim_dates.len());
}

#[test]
fn date_parts_match_calendar_decomposition() {
    let source = sample_source();
    let date = build_date_dim(&source, ColumnNaming::Legacy).unwrap();

    let dates = as_strings(&date, "Order_date");
    let years = date.column("data").unwrap().i32().unwrap();
    let months = date.column("month").unwrap().i32().unwrap();
    let days = date.column("day").unwrap().i32().unwrap();

    let japan = dates
        .iter()
        .position(|value| value.as_deref() == Some("2014-03-01"))
        .expect("2014-03-01 present");
    assert_eq!(years.get(japan), Some(2014));
    assert_eq!(months.get(japan), Some(3));
    assert_eq!(days.get(japan), Some(1));

    for (idx, value) in dates.iter().enumerate() {
        match value {
            Some(text) => {
                let parts: Vec<i32> = text.split('-').map(|part| part.parse().unwrap()).collect();
                assert_eq!(years.get(idx), Some(parts[0]));
                assert_eq!(months.get(idx), Some(parts[1]));
                assert_eq!(days.get(idx), Some(parts[2]));
            }
            None => {
                assert_eq!(years.get(idx), None, "null date keeps null parts");
                assert_eq!(months.get(idx), None);
                assert_eq!(days.get(idx), None);
            }
        }
    }
}

#[test]
fn orders_dimension_deduplicates_whole_rows() {
    let source = sample_source();
    let orders = build_orders_dim(&source, ColumnNaming::Legacy).unwrap();

    assert_eq!(
        names(&orders),
        [
            "Sales_Channel",
            "Order_Priorit",
            "Order_ID",
            "Ship_Date",
            "Item_Type",
            "Unit_Price",
            "Unit_Cost",
            "Total_Revenue",
            "Total_Cost",
            "Units_Sold",
            "Total_Profit",
        ]
    );

    let distinct_ids: HashSet<_> = as_strings(&orders, "Order_ID").into_iter().collect();
    assert!(orders.height() <= source.height());
    assert!(orders.height() >= distinct_ids.len());
    assert_eq!(orders.height(), 9, "the exact duplicate row collapses");

    let ids = as_strings(&orders, "Order_ID");
    assert!(ids.contains(&Some("100000001".to_string())));
    assert!(ids.contains(&Some("100000002".to_string())));
}

#[test]
fn corrected_naming_renames_priority_and_year() {
    let source = sample_source();

    let orders = build_orders_dim(&source, ColumnNaming::Corrected).unwrap();
    assert!(orders.column("Order_Priority").is_ok());
    assert!(orders.column("Order_Priorit").is_err());

    let date = build_date_dim(&source, ColumnNaming::Corrected).unwrap();
    assert_eq!(names(&date), ["Order_date", "year", "month", "day"]);
}

#[test]
fn surrogate_keys_are_one_based_and_first() {
    let source = sample_source();
    let dims = DimensionTables::build(&source, ColumnNaming::Legacy)
        .unwrap()
        .with_surrogate_keys()
        .unwrap();

    for (df, key) in [
        (&dims.location, LOCATION_KEY),
        (&dims.date, DATE_KEY),
        (&dims.orders, ORDER_KEY),
    ] {
        assert_eq!(names(df)[0], key);
        let keys = df.column(key).unwrap().cast(&DataType::Int64).unwrap();
        let keys = keys.i64().unwrap();
        assert_eq!(keys.get(0), Some(1));
        assert_eq!(keys.get(df.height() - 1), Some(df.height() as i64));
    }
}

#[test]
fn builders_accept_hand_built_frames() -> PolarsResult<()> {
    let content = "Region,Country,Order date,Ship Date,Item Type,Sales Channel,Order Priority,Order ID,Unit Price,Unit Cost,Total Revenue,Total Cost,Units Sold,Total Profit\n\
        Asia,Japan,2014-03-01,2014-03-10,Cosmetics,Online,M,1,10,5,100,50,10,50\n\
        Asia,Japan,2014-03-01,2014-03-10,Cosmetics,Online,M,2,10,5,100,50,10,50\n";
    let source = salestar_core::load_source_bytes(content.as_bytes(), &LoaderOptions::default())
        .expect("inline source loads");

    let location = build_location_dim(&source).unwrap();
    let expected = df!("region" => ["Asia"], "Country" => ["Japan"])?;
    assert!(location.equals(&expected));

    let orders = build_orders_dim(&source, ColumnNaming::Legacy).unwrap();
    assert_eq!(orders.height(), 2, "rows differing only by Order ID both survive");
    Ok(())
}
