use std::path::PathBuf;

use polars::prelude::*;
use salestar_core::{load_source, load_source_bytes, LoaderOptions, PipelineError, SourceColumn};

fn fixture_path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests/data")
        .join(name)
}

fn as_strings(df: &DataFrame, name: &str) -> Vec<Option<String>> {
    let column = df
        .column(name)
        .expect("column present")
        .cast(&DataType::String)
        .expect("cast to string");
    column
        .str()
        .expect("string column")
        .into_iter()
        .map(|value| value.map(str::to_string))
        .collect()
}

const HEADER: &str = "Region,Country,Order date,Ship Date,Item Type,Sales Channel,Order Priority,Order ID,Unit Price,Unit Cost,Total Revenue,Total Cost,Units Sold,Total Profit";

#[test]
fn loads_fixture_with_declared_types() {
    let source = load_source(
        &fixture_path("amazon_sales_sample.csv"),
        &LoaderOptions::default(),
    )
    .expect("fixture should load");

    assert_eq!(source.height(), 10);

    let df = source.frame();
    let names: Vec<String> = df
        .get_column_names()
        .iter()
        .map(|name| name.to_string())
        .collect();
    let expected: Vec<String> = SourceColumn::ALL
        .iter()
        .map(|column| column.header().to_string())
        .collect();
    assert_eq!(names, expected, "columns follow the declared order");

    for column in SourceColumn::ALL {
        assert_eq!(
            df.column(column.header()).unwrap().dtype(),
            &column.dtype(),
            "dtype of {column}"
        );
    }
}

#[test]
fn dates_accept_both_formats_and_null_out_garbage() {
    let source = load_source(
        &fixture_path("amazon_sales_sample.csv"),
        &LoaderOptions::default(),
    )
    .unwrap();

    let dates = as_strings(source.frame(), "Order date");
    assert_eq!(dates[0].as_deref(), Some("2010-05-28"));
    assert_eq!(dates[4].as_deref(), Some("2014-03-01"));
    assert_eq!(dates[8].as_deref(), Some("2014-03-01"), "ISO input parses");
    assert_eq!(dates[9], None, "unparseable date becomes null");
    assert_eq!(source.null_count(SourceColumn::OrderDate), 1);
    assert_eq!(source.null_count(SourceColumn::ShipDate), 0);
}

#[test]
fn numeric_columns_are_parsed() {
    let source = load_source(
        &fixture_path("amazon_sales_sample.csv"),
        &LoaderOptions::default(),
    )
    .unwrap();

    let units = source.frame().column("Units Sold").unwrap().i64().unwrap();
    assert_eq!(units.get(0), Some(9925));

    let price = source.frame().column("Unit Price").unwrap().f64().unwrap();
    assert!((price.get(0).unwrap() - 255.28).abs() < 1e-9);

    let ids = as_strings(source.frame(), "Order ID");
    assert_eq!(ids[0].as_deref(), Some("669165933"));
}

#[test]
fn missing_columns_are_fatal() {
    let content = "Region,Country,Order date\nAsia,Japan,3/1/2014\n";
    let err = load_source_bytes(content.as_bytes(), &LoaderOptions::default()).unwrap_err();

    match err {
        PipelineError::MissingColumns { missing } => {
            assert!(missing.contains(&"Total Profit".to_string()));
            assert!(!missing.contains(&"Region".to_string()));
        }
        other => panic!("expected MissingColumns, got {other:?}"),
    }
}

#[test]
fn non_numeric_measure_is_fatal() {
    let content = format!(
        "{HEADER}\nAsia,Japan,3/1/2014,3/10/2014,Cosmetics,Online,M,1,ten,5,100,50,10,50\n"
    );
    let err = load_source_bytes(content.as_bytes(), &LoaderOptions::default()).unwrap_err();
    assert!(matches!(err, PipelineError::Polars(_)), "got {err:?}");
}

#[test]
fn unreadable_path_is_io_error() {
    let err = load_source(
        &fixture_path("does_not_exist.csv"),
        &LoaderOptions::default(),
    )
    .unwrap_err();
    assert!(matches!(err, PipelineError::Io { .. }), "got {err:?}");
}

#[test]
fn empty_file_is_rejected() {
    let err = load_source_bytes(b"", &LoaderOptions::default()).unwrap_err();
    assert!(matches!(err, PipelineError::EmptySource(_)), "got {err:?}");
}

#[test]
fn honours_separator_and_drops_extra_columns() {
    let content = format!(
        "{};Notes\nAsia;Japan;2014-03-01;2014-03-10;Cosmetics;Online;M;1;10;5;100;50;10;50;ignored\n",
        HEADER.replace(',', ";")
    );
    let options = LoaderOptions {
        separator: b';',
        ..LoaderOptions::default()
    };

    let source = load_source_bytes(content.as_bytes(), &options).expect("should load");
    assert_eq!(source.height(), 1);
    assert_eq!(source.frame().width(), SourceColumn::ALL.len());
    assert!(source.frame().column("Notes").is_err());

    let dates = as_strings(source.frame(), "Ship Date");
    assert_eq!(dates[0].as_deref(), Some("2014-03-10"));
}
