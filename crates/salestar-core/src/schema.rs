//! Declared layout of the raw sales export and the identifiers each column is
//! written under in the warehouse tables.

use std::fmt;

use polars::prelude::DataType;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceColumn {
    Region,
    Country,
    OrderDate,
    ShipDate,
    ItemType,
    SalesChannel,
    OrderPriority,
    OrderId,
    UnitPrice,
    UnitCost,
    TotalRevenue,
    TotalCost,
    UnitsSold,
    TotalProfit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    Text,
    Date,
    Float,
    Integer,
}

/// Naming scheme for the warehouse columns. `Legacy` reproduces the names
/// downstream consumers already read (`Order_Priorit`, year stored as `data`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ColumnNaming {
    #[default]
    Legacy,
    Corrected,
}

impl ColumnNaming {
    pub fn year_column(&self) -> &'static str {
        match self {
            ColumnNaming::Legacy => "data",
            ColumnNaming::Corrected => "year",
        }
    }
}

impl TryFrom<&str> for ColumnNaming {
    type Error = String;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.trim().to_ascii_lowercase().as_str() {
            "legacy" => Ok(ColumnNaming::Legacy),
            "corrected" => Ok(ColumnNaming::Corrected),
            other => Err(format!("unknown column naming '{other}'")),
        }
    }
}

pub const MONTH_COLUMN: &str = "month";
pub const DAY_COLUMN: &str = "day";

pub const LOCATION_COLUMNS: [SourceColumn; 2] = [SourceColumn::Region, SourceColumn::Country];

pub const ORDER_COLUMNS: [SourceColumn; 11] = [
    SourceColumn::SalesChannel,
    SourceColumn::OrderPriority,
    SourceColumn::OrderId,
    SourceColumn::ShipDate,
    SourceColumn::ItemType,
    SourceColumn::UnitPrice,
    SourceColumn::UnitCost,
    SourceColumn::TotalRevenue,
    SourceColumn::TotalCost,
    SourceColumn::UnitsSold,
    SourceColumn::TotalProfit,
];

pub const FACT_COLUMNS: [SourceColumn; 14] = [
    SourceColumn::Region,
    SourceColumn::Country,
    SourceColumn::OrderDate,
    SourceColumn::UnitPrice,
    SourceColumn::UnitCost,
    SourceColumn::TotalRevenue,
    SourceColumn::TotalCost,
    SourceColumn::UnitsSold,
    SourceColumn::TotalProfit,
    SourceColumn::SalesChannel,
    SourceColumn::OrderPriority,
    SourceColumn::OrderId,
    SourceColumn::ShipDate,
    SourceColumn::ItemType,
];

impl SourceColumn {
    /// Columns in the order the export lays them out.
    pub const ALL: [SourceColumn; 14] = [
        SourceColumn::Region,
        SourceColumn::Country,
        SourceColumn::OrderDate,
        SourceColumn::ShipDate,
        SourceColumn::ItemType,
        SourceColumn::SalesChannel,
        SourceColumn::OrderPriority,
        SourceColumn::OrderId,
        SourceColumn::UnitPrice,
        SourceColumn::UnitCost,
        SourceColumn::TotalRevenue,
        SourceColumn::TotalCost,
        SourceColumn::UnitsSold,
        SourceColumn::TotalProfit,
    ];

    /// Header text as it appears in the export.
    pub fn header(&self) -> &'static str {
        match self {
            SourceColumn::Region => "Region",
            SourceColumn::Country => "Country",
            SourceColumn::OrderDate => "Order date",
            SourceColumn::ShipDate => "Ship Date",
            SourceColumn::ItemType => "Item Type",
            SourceColumn::SalesChannel => "Sales Channel",
            SourceColumn::OrderPriority => "Order Priority",
            SourceColumn::OrderId => "Order ID",
            SourceColumn::UnitPrice => "Unit Price",
            SourceColumn::UnitCost => "Unit Cost",
            SourceColumn::TotalRevenue => "Total Revenue",
            SourceColumn::TotalCost => "Total Cost",
            SourceColumn::UnitsSold => "Units Sold",
            SourceColumn::TotalProfit => "Total Profit",
        }
    }

    pub fn kind(&self) -> ColumnKind {
        match self {
            SourceColumn::OrderDate | SourceColumn::ShipDate => ColumnKind::Date,
            SourceColumn::UnitPrice
            | SourceColumn::UnitCost
            | SourceColumn::TotalRevenue
            | SourceColumn::TotalCost
            | SourceColumn::TotalProfit => ColumnKind::Float,
            SourceColumn::UnitsSold => ColumnKind::Integer,
            _ => ColumnKind::Text,
        }
    }

    pub fn dtype(&self) -> DataType {
        match self.kind() {
            ColumnKind::Text => DataType::String,
            ColumnKind::Date => DataType::Date,
            ColumnKind::Float => DataType::Float64,
            ColumnKind::Integer => DataType::Int64,
        }
    }

    /// Warehouse identifier for this column.
    pub fn identifier(&self, naming: ColumnNaming) -> &'static str {
        match self {
            SourceColumn::Region => "region",
            SourceColumn::Country => "Country",
            SourceColumn::OrderDate => "Order_date",
            SourceColumn::ShipDate => "Ship_Date",
            SourceColumn::ItemType => "Item_Type",
            SourceColumn::SalesChannel => "Sales_Channel",
            SourceColumn::OrderPriority => match naming {
                ColumnNaming::Legacy => "Order_Priorit",
                ColumnNaming::Corrected => "Order_Priority",
            },
            SourceColumn::OrderId => "Order_ID",
            SourceColumn::UnitPrice => "Unit_Price",
            SourceColumn::UnitCost => "Unit_Cost",
            SourceColumn::TotalRevenue => "Total_Revenue",
            SourceColumn::TotalCost => "Total_Cost",
            SourceColumn::UnitsSold => "Units_Sold",
            SourceColumn::TotalProfit => "Total_Profit",
        }
    }
}

impl fmt::Display for SourceColumn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.header())
    }
}

/// Identifiers for a group of columns, in group order.
pub fn identifiers(columns: &[SourceColumn], naming: ColumnNaming) -> Vec<&'static str> {
    columns.iter().map(|column| column.identifier(naming)).collect()
}
