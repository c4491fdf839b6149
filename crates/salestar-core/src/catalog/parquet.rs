use std::fs::{self, File};
use std::path::{Path, PathBuf};

use polars::prelude::*;
use tracing::{debug, info};
use uuid::Uuid;

use super::{
    check_schema, encode_parquet, validate_name, CatalogError, TableCatalog, TableInfo, WriteMode,
};

const DATA_FILE: &str = "data.parquet";
const META_FILE: &str = "table.json";

/// Directory-backed catalog: `<root>/<table>/data.parquet` plus a
/// `table.json` describing the last write.
#[derive(Debug, Clone)]
pub struct ParquetCatalog {
    root: PathBuf,
}

impl ParquetCatalog {
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, CatalogError> {
        let root = root.into();
        fs::create_dir_all(&root).map_err(|source| io_error(&root, source))?;
        Ok(Self { root })
    }

    /// Opens a catalog that must already exist; nothing is created.
    pub fn open_existing(root: impl Into<PathBuf>) -> Result<Self, CatalogError> {
        let root = root.into();
        if !root.is_dir() {
            return Err(CatalogError::MissingRoot(root.display().to_string()));
        }
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn data_path(&self, name: &str) -> PathBuf {
        self.root.join(name).join(DATA_FILE)
    }

    fn meta_path(&self, name: &str) -> PathBuf {
        self.root.join(name).join(META_FILE)
    }

    fn read_meta(path: &Path) -> Result<TableInfo, CatalogError> {
        let bytes = fs::read(path).map_err(|source| io_error(path, source))?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}

impl TableCatalog for ParquetCatalog {
    fn write_table(
        &self,
        name: &str,
        df: &DataFrame,
        mode: WriteMode,
        run_id: Uuid,
    ) -> Result<TableInfo, CatalogError> {
        validate_name(name)?;
        let existing = self.describe(name)?;
        check_schema(name, existing.as_ref(), df, mode)?;

        let dir = self.root.join(name);
        fs::create_dir_all(&dir).map_err(|source| io_error(&dir, source))?;

        let payload = encode_parquet(df)?;
        let info = TableInfo::new(name, df, &payload, run_id);

        let meta = serde_json::to_vec_pretty(&info)?;

        // Both files are staged before either replaces its target.
        let data_path = self.data_path(name);
        let meta_path = self.meta_path(name);
        let data_staging = stage_file(&data_path, &payload)?;
        let meta_staging = match stage_file(&meta_path, &meta) {
            Ok(staging) => staging,
            Err(err) => {
                let _ = fs::remove_file(&data_staging);
                return Err(err);
            }
        };
        commit_file(&meta_staging, &meta_path)?;
        commit_file(&data_staging, &data_path)?;

        info!(
            table = name,
            rows = info.row_count,
            hash = %info.content_hash,
            "table overwritten"
        );
        Ok(info)
    }

    fn read_table(&self, name: &str) -> Result<DataFrame, CatalogError> {
        validate_name(name)?;
        let path = self.data_path(name);
        if !path.exists() {
            return Err(CatalogError::NotFound(name.to_string()));
        }
        let file = File::open(&path).map_err(|source| io_error(&path, source))?;
        Ok(ParquetReader::new(file).finish()?)
    }

    fn describe(&self, name: &str) -> Result<Option<TableInfo>, CatalogError> {
        validate_name(name)?;
        let path = self.meta_path(name);
        if !path.exists() {
            return Ok(None);
        }
        Self::read_meta(&path).map(Some)
    }

    fn list_tables(&self) -> Result<Vec<TableInfo>, CatalogError> {
        let entries = fs::read_dir(&self.root).map_err(|source| io_error(&self.root, source))?;

        let mut tables = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|source| io_error(&self.root, source))?;
            let meta = entry.path().join(META_FILE);
            if meta.is_file() {
                tables.push(Self::read_meta(&meta)?);
            } else {
                debug!(path = %entry.path().display(), "skipping non-table entry");
            }
        }
        tables.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(tables)
    }
}

/// Writes beside the target; `commit_file` renames it over the target so
/// readers never see a partial file.
fn stage_file(path: &Path, bytes: &[u8]) -> Result<PathBuf, CatalogError> {
    let staging = path.with_extension("tmp");
    fs::write(&staging, bytes).map_err(|source| io_error(&staging, source))?;
    Ok(staging)
}

fn commit_file(staging: &Path, path: &Path) -> Result<(), CatalogError> {
    fs::rename(staging, path).map_err(|source| io_error(path, source))
}

fn io_error(path: &Path, source: std::io::Error) -> CatalogError {
    CatalogError::Io {
        path: path.display().to_string(),
        source,
    }
}
