//! Snapshot Store
//!
//! Persists a `TableCatalog` as a single JSON document and reloads it
//! without the source files. Each column is stored with its dtype so the
//! reloaded frames compare equal to the saved ones.

use crate::catalog::{check_schema, TableCatalog, TableName};
use crate::error::{CensusError, Result};
use chrono::{DateTime, Utc};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufReader, BufWriter, ErrorKind, Write};
use std::path::Path;
use tracing::info;
use uuid::Uuid;

pub const SNAPSHOT_FORMAT_VERSION: u32 = 1;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SnapshotHeader {
    pub format_version: u32,
    pub run_id: String,
    pub created_at: DateTime<Utc>,
}

impl SnapshotHeader {
    fn fresh() -> Self {
        Self {
            format_version: SNAPSHOT_FORMAT_VERSION,
            run_id: Uuid::new_v4().to_string(),
            created_at: Utc::now(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct SnapshotDocument {
    header: SnapshotHeader,
    tables: BTreeMap<String, Vec<ColumnSnapshot>>,
}

/// One column with its values; non-finite floats are written as missing.
#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "dtype", rename_all = "snake_case")]
enum ColumnSnapshot {
    String { name: String, values: Vec<Option<String>> },
    Float64 { name: String, values: Vec<Option<f64>> },
    Int64 { name: String, values: Vec<Option<i64>> },
}

impl ColumnSnapshot {
    fn from_series(series: &Series) -> Result<Self> {
        let name = series.name().to_string();
        let column = match series.dtype() {
            DataType::Float64 => ColumnSnapshot::Float64 {
                name,
                values: series.f64()?.into_iter().collect(),
            },
            DataType::Int64 => ColumnSnapshot::Int64 {
                name,
                values: series.i64()?.into_iter().collect(),
            },
            DataType::String => ColumnSnapshot::String {
                name,
                values: series.str()?.into_iter().map(|v| v.map(str::to_string)).collect(),
            },
            _ => {
                let cast = series.cast(&DataType::String)?;
                ColumnSnapshot::String {
                    name,
                    values: cast.str()?.into_iter().map(|v| v.map(str::to_string)).collect(),
                }
            }
        };
        Ok(column)
    }

    fn into_series(self) -> Series {
        match self {
            ColumnSnapshot::String { name, values } => Series::new(&name, values),
            ColumnSnapshot::Float64 { name, values } => Series::new(&name, values),
            ColumnSnapshot::Int64 { name, values } => Series::new(&name, values),
        }
    }
}

fn encode_frame(df: &DataFrame) -> Result<Vec<ColumnSnapshot>> {
    df.get_columns().iter().map(ColumnSnapshot::from_series).collect()
}

fn decode_frame(name: &str, columns: Vec<ColumnSnapshot>) -> Result<DataFrame> {
    let series: Vec<Series> = columns.into_iter().map(ColumnSnapshot::into_series).collect();
    DataFrame::new(series)
        .map_err(|e| CensusError::Corrupt(format!("table {} is malformed: {}", name, e)))
}

/// Serialize the full catalog to `path`, replacing any existing artifact.
pub fn save(catalog: &TableCatalog, path: &Path) -> Result<SnapshotHeader> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let mut tables = BTreeMap::new();
    for (name, df) in catalog.iter() {
        tables.insert(name.to_string(), encode_frame(df)?);
    }
    let document = SnapshotDocument {
        header: SnapshotHeader::fresh(),
        tables,
    };

    let mut writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer(&mut writer, &document)?;
    writer.flush()?;

    info!(
        path = %path.display(),
        run_id = %document.header.run_id,
        "Saved snapshot"
    );
    Ok(document.header)
}

/// Reload a catalog saved by [`save`].
pub fn load(path: &Path) -> Result<TableCatalog> {
    load_with_header(path).map(|(_, catalog)| catalog)
}

pub fn load_with_header(path: &Path) -> Result<(SnapshotHeader, TableCatalog)> {
    let file = File::open(path).map_err(|e| match e.kind() {
        ErrorKind::NotFound => CensusError::NotFound(path.display().to_string()),
        _ => CensusError::Io(e),
    })?;

    let document: SnapshotDocument = serde_json::from_reader(BufReader::new(file))
        .map_err(|e| CensusError::Corrupt(format!("{}: {}", path.display(), e)))?;

    if document.header.format_version != SNAPSHOT_FORMAT_VERSION {
        return Err(CensusError::Corrupt(format!(
            "unsupported snapshot format version {}",
            document.header.format_version
        )));
    }

    let mut tables = document.tables;
    let mut take = |name: TableName| -> Result<DataFrame> {
        let columns = tables
            .remove(name.as_str())
            .ok_or_else(|| CensusError::Corrupt(format!("missing table {}", name)))?;
        let df = decode_frame(name.as_str(), columns)?;
        check_schema(name, &df)?;
        Ok(df)
    };

    let catalog = TableCatalog::new(
        take(TableName::FullData)?,
        take(TableName::EssentialServices)?,
        take(TableName::Engineering)?,
        take(TableName::NocCategories)?,
        take(TableName::ProvinceData)?,
    );

    info!(
        path = %path.display(),
        run_id = %document.header.run_id,
        "Loaded snapshot"
    );
    Ok((document.header, catalog))
}
