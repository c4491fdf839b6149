use std::collections::BTreeMap;
use std::sync::RwLock;

use polars::prelude::DataFrame;
use uuid::Uuid;

use super::{
    check_schema, encode_parquet, validate_name, CatalogError, TableCatalog, TableInfo, WriteMode,
};

/// In-process catalog for dry runs and tests. Content hashes are computed over
/// the same parquet encoding the on-disk catalog writes.
#[derive(Debug, Default)]
pub struct MemoryCatalog {
    tables: RwLock<BTreeMap<String, (DataFrame, TableInfo)>>,
}

impl MemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }
}

impl TableCatalog for MemoryCatalog {
    fn write_table(
        &self,
        name: &str,
        df: &DataFrame,
        mode: WriteMode,
        run_id: Uuid,
    ) -> Result<TableInfo, CatalogError> {
        validate_name(name)?;
        let mut tables = self.tables.write().map_err(|_| CatalogError::Poisoned)?;
        check_schema(name, tables.get(name).map(|(_, info)| info), df, mode)?;

        let payload = encode_parquet(df)?;
        let info = TableInfo::new(name, df, &payload, run_id);
        tables.insert(name.to_string(), (df.clone(), info.clone()));
        Ok(info)
    }

    fn read_table(&self, name: &str) -> Result<DataFrame, CatalogError> {
        let tables = self.tables.read().map_err(|_| CatalogError::Poisoned)?;
        tables
            .get(name)
            .map(|(df, _)| df.clone())
            .ok_or_else(|| CatalogError::NotFound(name.to_string()))
    }

    fn describe(&self, name: &str) -> Result<Option<TableInfo>, CatalogError> {
        let tables = self.tables.read().map_err(|_| CatalogError::Poisoned)?;
        Ok(tables.get(name).map(|(_, info)| info.clone()))
    }

    fn list_tables(&self) -> Result<Vec<TableInfo>, CatalogError> {
        let tables = self.tables.read().map_err(|_| CatalogError::Poisoned)?;
        Ok(tables.values().map(|(_, info)| info.clone()).collect())
    }
}
