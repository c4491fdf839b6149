use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::loader::LoaderOptions;
use crate::schema::ColumnNaming;

pub const ENV_INPUT: &str = "SALESTAR_INPUT";
pub const ENV_CATALOG_DIR: &str = "SALESTAR_CATALOG_DIR";
pub const ENV_FACT_MODE: &str = "SALESTAR_FACT_MODE";
pub const ENV_COLUMN_NAMING: &str = "SALESTAR_COLUMN_NAMING";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config file: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// How the fact table relates to the dimension tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FactMode {
    /// Plain projection of the source rows; no foreign keys.
    #[default]
    Projection,
    /// Dimensions receive surrogate keys and the fact rows carry them.
    StarJoin,
}

impl TryFrom<&str> for FactMode {
    type Error = String;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.trim().to_ascii_lowercase().replace('_', "-").as_str() {
            "projection" => Ok(FactMode::Projection),
            "star-join" | "star" => Ok(FactMode::StarJoin),
            other => Err(format!("unknown fact mode '{other}'")),
        }
    }
}

impl fmt::Display for FactMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FactMode::Projection => f.write_str("projection"),
            FactMode::StarJoin => f.write_str("star-join"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TableNames {
    pub location: String,
    pub date: String,
    pub orders: String,
    pub fact: String,
}

impl Default for TableNames {
    fn default() -> Self {
        Self {
            location: "dim_location".to_string(),
            date: "dim_date".to_string(),
            orders: "dim_orders".to_string(),
            fact: "fact_amazon_sales".to_string(),
        }
    }
}

impl TableNames {
    pub fn all(&self) -> [&str; 4] {
        [
            self.location.as_str(),
            self.date.as_str(),
            self.orders.as_str(),
            self.fact.as_str(),
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PipelineConfig {
    pub input_path: PathBuf,
    pub catalog_dir: PathBuf,
    pub separator: char,
    /// strftime formats tried in order when parsing the date columns.
    pub date_formats: Vec<String>,
    pub fact_mode: FactMode,
    pub column_naming: ColumnNaming,
    /// Replace stored schemas on every table, not only the orders dimension.
    pub overwrite_schema: bool,
    pub tables: TableNames,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            input_path: PathBuf::from("data/AmazonSalesData.csv"),
            catalog_dir: PathBuf::from("warehouse"),
            separator: ',',
            date_formats: vec!["%m/%d/%Y".to_string(), "%Y-%m-%d".to_string()],
            fact_mode: FactMode::default(),
            column_naming: ColumnNaming::default(),
            overwrite_schema: false,
            tables: TableNames::default(),
        }
    }
}

impl PipelineConfig {
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: PipelineConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    /// Applies `SALESTAR_*` overrides from the process environment.
    pub fn apply_env(&mut self) -> Result<(), ConfigError> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(input) = lookup(ENV_INPUT) {
            self.input_path = PathBuf::from(input);
        }
        if let Some(dir) = lookup(ENV_CATALOG_DIR) {
            self.catalog_dir = PathBuf::from(dir);
        }
        if let Some(mode) = lookup(ENV_FACT_MODE) {
            self.fact_mode = FactMode::try_from(mode.as_str()).map_err(ConfigError::Invalid)?;
        }
        if let Some(naming) = lookup(ENV_COLUMN_NAMING) {
            self.column_naming =
                ColumnNaming::try_from(naming.as_str()).map_err(ConfigError::Invalid)?;
        }
        self.validate()
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.separator.is_ascii() || self.separator == '"' || self.separator == '\n' {
            return Err(ConfigError::Invalid(format!(
                "separator {:?} must be a single ASCII character other than quote or newline",
                self.separator
            )));
        }

        if self.date_formats.iter().all(|format| format.trim().is_empty()) {
            return Err(ConfigError::Invalid(
                "at least one date format is required".into(),
            ));
        }

        let mut seen = HashSet::new();
        for name in self.tables.all() {
            validate_table_name(name).map_err(ConfigError::Invalid)?;
            if !seen.insert(name) {
                return Err(ConfigError::Invalid(format!(
                    "table name '{name}' is used for more than one table"
                )));
            }
        }

        Ok(())
    }

    pub fn loader_options(&self) -> LoaderOptions {
        LoaderOptions {
            separator: self.separator as u8,
            date_formats: self
                .date_formats
                .iter()
                .filter(|format| !format.trim().is_empty())
                .cloned()
                .collect(),
        }
    }
}

/// Table names double as directory names in the parquet catalog.
pub fn validate_table_name(name: &str) -> Result<(), String> {
    if name.is_empty() {
        return Err("table name cannot be empty".into());
    }
    if !name
        .chars()
        .all(|ch| ch.is_ascii_alphanumeric() || ch == '_')
    {
        return Err(format!(
            "table name '{name}' may only contain ASCII letters, digits and underscores"
        ));
    }
    Ok(())
}
