//! Table Catalog - the named-table collection produced by one pipeline run
//!
//! Five `DataFrame`s addressable by name. The catalog is built once, never
//! mutated, and handed to consumers by reference; consumers that filter
//! work on copies.

use crate::categories::{CategorizedRow, CategoryKind};
use crate::distributor::ProvincialOccupationRow;
use crate::error::{CensusError, Result};
use crate::ingestion::ProvinceRecord;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

pub const OCCUPATION_LABEL: &str = "occupation_label";
pub const TOTAL: &str = "total";
pub const MEN: &str = "men";
pub const WOMEN: &str = "women";
pub const LEVEL: &str = "level";
pub const PROVINCE_CODE: &str = "province_code";
pub const PROVINCE_NAME: &str = "province_name";
pub const POPULATION: &str = "population";
pub const PER_CAPITA: &str = "per_capita";
pub const MEN_PER_CAPITA: &str = "men_per_capita";
pub const WOMEN_PER_CAPITA: &str = "women_per_capita";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum TableName {
    FullData,
    EssentialServices,
    Engineering,
    NocCategories,
    ProvinceData,
}

impl TableName {
    pub const ALL: [TableName; 5] = [
        TableName::FullData,
        TableName::EssentialServices,
        TableName::Engineering,
        TableName::NocCategories,
        TableName::ProvinceData,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TableName::FullData => "full_data",
            TableName::EssentialServices => "essential_services",
            TableName::Engineering => "engineering",
            TableName::NocCategories => "noc_categories",
            TableName::ProvinceData => "province_data",
        }
    }
}

impl fmt::Display for TableName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TableName {
    type Err = CensusError;

    fn from_str(s: &str) -> Result<Self> {
        TableName::ALL
            .iter()
            .copied()
            .find(|name| name.as_str() == s)
            .ok_or_else(|| CensusError::UnknownTable(s.to_string()))
    }
}

/// Row/column counts for one table, plus the worker total when the table
/// has a `total` column.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TableSummary {
    pub name: String,
    pub rows: usize,
    pub columns: usize,
    pub total_workers: Option<f64>,
}

#[derive(Clone, Debug)]
pub struct TableCatalog {
    full_data: DataFrame,
    essential_services: DataFrame,
    engineering: DataFrame,
    noc_categories: DataFrame,
    province_data: DataFrame,
}

impl TableCatalog {
    pub fn new(
        full_data: DataFrame,
        essential_services: DataFrame,
        engineering: DataFrame,
        noc_categories: DataFrame,
        province_data: DataFrame,
    ) -> Self {
        Self {
            full_data,
            essential_services,
            engineering,
            noc_categories,
            province_data,
        }
    }

    /// Build the catalog from typed pipeline output.
    pub fn from_rows(
        combined: &[ProvincialOccupationRow],
        essential_services: &[CategorizedRow],
        engineering: &[CategorizedRow],
        noc_categories: &[ProvincialOccupationRow],
        provinces: &[ProvinceRecord],
    ) -> Result<Self> {
        Ok(Self::new(
            occupation_frame(combined)?,
            categorized_frame(essential_services, CategoryKind::EssentialService)?,
            categorized_frame(engineering, CategoryKind::Engineering)?,
            occupation_frame(noc_categories)?,
            province_frame(provinces)?,
        ))
    }

    pub fn table(&self, name: TableName) -> &DataFrame {
        match name {
            TableName::FullData => &self.full_data,
            TableName::EssentialServices => &self.essential_services,
            TableName::Engineering => &self.engineering,
            TableName::NocCategories => &self.noc_categories,
            TableName::ProvinceData => &self.province_data,
        }
    }

    /// Look a table up by its snapshot name.
    pub fn get(&self, name: &str) -> Option<&DataFrame> {
        name.parse::<TableName>().ok().map(|n| self.table(n))
    }

    pub fn iter(&self) -> impl Iterator<Item = (TableName, &DataFrame)> {
        TableName::ALL.into_iter().map(move |name| (name, self.table(name)))
    }

    pub fn summaries(&self) -> Vec<TableSummary> {
        self.iter()
            .map(|(name, df)| TableSummary {
                name: name.to_string(),
                rows: df.height(),
                columns: df.width(),
                total_workers: df
                    .column(TOTAL)
                    .ok()
                    .and_then(|s| s.f64().ok())
                    .map(|ca| ca.into_iter().flatten().sum()),
            })
            .collect()
    }

    /// Value equality per table, treating missing == missing.
    pub fn equals(&self, other: &TableCatalog) -> bool {
        TableName::ALL
            .iter()
            .all(|&name| self.table(name).equals_missing(other.table(name)))
    }

    /// Write each table as `<name>.csv` under `dir`.
    pub fn export_csv(&self, dir: &Path) -> Result<Vec<PathBuf>> {
        std::fs::create_dir_all(dir)?;
        let mut written = Vec::new();
        for (name, df) in self.iter() {
            let path = dir.join(format!("{}.csv", name));
            let mut file = std::fs::File::create(&path)?;
            CsvWriter::new(&mut file).finish(&mut df.clone())?;
            written.push(path);
        }
        Ok(written)
    }
}

const OCCUPATION_SCHEMA: [(&str, DataType); 11] = [
    (OCCUPATION_LABEL, DataType::String),
    (TOTAL, DataType::Float64),
    (MEN, DataType::Float64),
    (WOMEN, DataType::Float64),
    (LEVEL, DataType::Int64),
    (PROVINCE_CODE, DataType::String),
    (PROVINCE_NAME, DataType::String),
    (POPULATION, DataType::Int64),
    (PER_CAPITA, DataType::Float64),
    (MEN_PER_CAPITA, DataType::Float64),
    (WOMEN_PER_CAPITA, DataType::Float64),
];

/// Column names and dtypes every frame of `name` must carry.
pub fn expected_schema(name: TableName) -> Vec<(&'static str, DataType)> {
    let mut schema = OCCUPATION_SCHEMA.to_vec();
    match name {
        TableName::FullData | TableName::NocCategories => {}
        TableName::EssentialServices => {
            schema.push((CategoryKind::EssentialService.column_name(), DataType::String))
        }
        TableName::Engineering => {
            schema.push((CategoryKind::Engineering.column_name(), DataType::String))
        }
        TableName::ProvinceData => {
            schema = vec![
                (PROVINCE_CODE, DataType::String),
                (PROVINCE_NAME, DataType::String),
                (POPULATION, DataType::Int64),
            ]
        }
    }
    schema
}

/// Fails with `Corrupt` naming the first missing or mistyped column.
pub fn check_schema(name: TableName, df: &DataFrame) -> Result<()> {
    for (column, dtype) in expected_schema(name) {
        let series = df.column(column).map_err(|_| {
            CensusError::Corrupt(format!("table {} is missing column {}", name, column))
        })?;
        if series.dtype() != &dtype {
            return Err(CensusError::Corrupt(format!(
                "table {} column {} has dtype {}, expected {}",
                name,
                column,
                series.dtype(),
                dtype
            )));
        }
    }
    Ok(())
}

pub fn occupation_frame(rows: &[ProvincialOccupationRow]) -> Result<DataFrame> {
    let frame = DataFrame::new(occupation_columns(rows.iter()))?;
    Ok(frame)
}

pub fn categorized_frame(rows: &[CategorizedRow], kind: CategoryKind) -> Result<DataFrame> {
    let mut columns = occupation_columns(rows.iter().map(|r| &r.row));
    columns.push(Series::new(
        kind.column_name(),
        rows.iter().map(|r| r.category_type.clone()).collect::<Vec<_>>(),
    ));
    Ok(DataFrame::new(columns)?)
}

pub fn province_frame(provinces: &[ProvinceRecord]) -> Result<DataFrame> {
    Ok(DataFrame::new(vec![
        Series::new(
            PROVINCE_CODE,
            provinces.iter().map(|p| p.province_code.clone()).collect::<Vec<_>>(),
        ),
        Series::new(
            PROVINCE_NAME,
            provinces.iter().map(|p| p.province_name.clone()).collect::<Vec<_>>(),
        ),
        Series::new(
            POPULATION,
            provinces.iter().map(|p| p.population).collect::<Vec<i64>>(),
        ),
    ])?)
}

fn occupation_columns<'a>(rows: impl Iterator<Item = &'a ProvincialOccupationRow>) -> Vec<Series> {
    let rows: Vec<&ProvincialOccupationRow> = rows.collect();
    let text = |name: &str, f: fn(&ProvincialOccupationRow) -> String| {
        Series::new(name, rows.iter().map(|r| f(r)).collect::<Vec<String>>())
    };
    let count = |name: &str, f: fn(&ProvincialOccupationRow) -> Option<f64>| {
        Series::new(name, rows.iter().map(|r| f(r)).collect::<Vec<Option<f64>>>())
    };
    let int = |name: &str, f: fn(&ProvincialOccupationRow) -> i64| {
        Series::new(name, rows.iter().map(|r| f(r)).collect::<Vec<i64>>())
    };

    vec![
        text(OCCUPATION_LABEL, |r| r.occupation_label.clone()),
        count(TOTAL, |r| r.total),
        count(MEN, |r| r.men),
        count(WOMEN, |r| r.women),
        int(LEVEL, |r| r.level as i64),
        text(PROVINCE_CODE, |r| r.province_code.clone()),
        text(PROVINCE_NAME, |r| r.province_name.clone()),
        int(POPULATION, |r| r.population),
        count(PER_CAPITA, |r| r.per_capita),
        count(MEN_PER_CAPITA, |r| r.men_per_capita),
        count(WOMEN_PER_CAPITA, |r| r.women_per_capita),
    ]
}

/// String column values; missing cells are `None`.
pub fn string_values(df: &DataFrame, name: &str) -> Result<Vec<Option<String>>> {
    Ok(df
        .column(name)?
        .str()?
        .into_iter()
        .map(|v| v.map(str::to_string))
        .collect())
}

/// Float column values; missing cells are `None`.
pub fn float_values(df: &DataFrame, name: &str) -> Result<Vec<Option<f64>>> {
    Ok(df.column(name)?.f64()?.into_iter().collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(label: &str, total: Option<f64>) -> ProvincialOccupationRow {
        ProvincialOccupationRow {
            occupation_label: label.to_string(),
            total,
            men: Some(1.0),
            women: None,
            level: 2,
            province_code: "ON".to_string(),
            province_name: "Ontario".to_string(),
            population: 100,
            per_capita: total.map(|t| t * 1000.0),
            men_per_capita: Some(1000.0),
            women_per_capita: None,
        }
    }

    fn catalog() -> TableCatalog {
        let combined = vec![row("42101 Firefighters", Some(3.0)), row("Other", None)];
        let services = vec![CategorizedRow {
            row: combined[0].clone(),
            category_type: "Firefighters".to_string(),
        }];
        let provinces = vec![ProvinceRecord {
            province_code: "ON".to_string(),
            province_name: "Ontario".to_string(),
            population: 100,
        }];
        TableCatalog::from_rows(&combined, &services, &[], &[], &provinces).unwrap()
    }

    #[test]
    fn test_table_names_round_trip() {
        for name in TableName::ALL {
            assert_eq!(name.as_str().parse::<TableName>().unwrap(), name);
        }
        assert!(matches!(
            "pickles".parse::<TableName>(),
            Err(CensusError::UnknownTable(_))
        ));
    }

    #[test]
    fn test_catalog_shapes() {
        let catalog = catalog();
        let full = catalog.table(TableName::FullData);
        assert_eq!(full.height(), 2);
        assert_eq!(full.width(), 11);
        assert_eq!(full.column(LEVEL).unwrap().dtype(), &DataType::Int64);

        let services = catalog.get("essential_services").unwrap();
        assert_eq!(services.width(), 12);
        assert_eq!(
            string_values(services, "service_type").unwrap(),
            vec![Some("Firefighters".to_string())]
        );

        let engineering = catalog.table(TableName::Engineering);
        assert_eq!(engineering.height(), 0);
        assert!(engineering.column("engineering_type").is_ok());

        assert_eq!(catalog.table(TableName::ProvinceData).width(), 3);
        assert!(catalog.get("unknown").is_none());
    }

    #[test]
    fn test_missing_values_are_null() {
        let catalog = catalog();
        let full = catalog.table(TableName::FullData);
        assert_eq!(float_values(full, TOTAL).unwrap(), vec![Some(3.0), None]);
        assert_eq!(full.column(WOMEN).unwrap().null_count(), 2);
    }

    #[test]
    fn test_summaries_exclude_missing_from_totals() {
        let summaries = catalog().summaries();
        assert_eq!(summaries.len(), 5);
        assert_eq!(summaries[0].name, "full_data");
        assert_eq!(summaries[0].total_workers, Some(3.0));
        assert_eq!(summaries[2].total_workers, Some(0.0));
        assert_eq!(summaries[4].total_workers, None);
    }

    #[test]
    fn test_catalog_equals_itself() {
        let catalog = catalog();
        assert!(catalog.equals(&catalog.clone()));
    }

    #[test]
    fn test_built_tables_match_expected_schema() {
        let catalog = catalog();
        for (name, df) in catalog.iter() {
            check_schema(name, df).unwrap();
            assert_eq!(df.width(), expected_schema(name).len());
        }
    }

    #[test]
    fn test_check_schema_rejects_missing_and_mistyped_columns() {
        let full = catalog().table(TableName::FullData).clone();
        let without_total = full.drop(TOTAL).unwrap();
        match check_schema(TableName::FullData, &without_total) {
            Err(CensusError::Corrupt(msg)) => assert!(msg.contains("total")),
            other => panic!("expected corrupt table, got {:?}", other),
        }

        let mut mistyped = full.clone();
        mistyped
            .replace(LEVEL, Series::new(LEVEL, vec!["2".to_string(), "2".to_string()]))
            .unwrap();
        assert!(matches!(
            check_schema(TableName::FullData, &mistyped),
            Err(CensusError::Corrupt(_))
        ));

        assert!(check_schema(TableName::ProvinceData, &DataFrame::empty()).is_err());
    }

    #[test]
    fn test_export_csv_writes_every_table() {
        let dir = tempfile::tempdir().unwrap();
        let written = catalog().export_csv(dir.path()).unwrap();
        assert_eq!(written.len(), 5);
        assert!(written.iter().all(|p| p.exists()));
    }
}
