//! CSV Connector - Reads the raw census and province tables from delimited text

use crate::error::{CensusError, Result};
use csv::{ReaderBuilder, StringRecord, Trim};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Number of metadata lines that precede the header of the census table.
pub const CENSUS_PREAMBLE_LINES: usize = 7;

/// Column count the census table must have once empty rows/columns are gone.
pub const CENSUS_COLUMN_COUNT: usize = 4;

/// Header columns required in the province population table.
pub const PROVINCE_COLUMNS: [&str; 3] = ["province_code", "province_name", "population"];

/// Raw delimited table: a header row plus untyped cells.
///
/// Cells keep their original text (including leading indentation); an empty
/// field is stored as `None`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RawTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<Option<String>>>,
}

impl RawTable {
    pub fn new(headers: Vec<String>, rows: Vec<Vec<Option<String>>>) -> Self {
        Self { headers, rows }
    }

    pub fn width(&self) -> usize {
        self.headers.len()
    }

    pub fn height(&self) -> usize {
        self.rows.len()
    }

    /// Drop columns whose data cells are all empty, then rows that are all empty.
    pub fn drop_empty(&self) -> RawTable {
        let keep: Vec<usize> = (0..self.width())
            .filter(|&idx| {
                self.rows
                    .iter()
                    .any(|row| row.get(idx).map_or(false, Option::is_some))
            })
            .collect();

        let headers = keep.iter().map(|&idx| self.headers[idx].clone()).collect();
        let rows = self
            .rows
            .iter()
            .map(|row| {
                keep.iter()
                    .map(|&idx| row.get(idx).cloned().flatten())
                    .collect::<Vec<_>>()
            })
            .filter(|row| row.iter().any(Option::is_some))
            .collect();

        RawTable { headers, rows }
    }
}

/// Population record for one province or territory.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProvinceRecord {
    pub province_code: String,
    pub province_name: String,
    pub population: i64,
}

#[derive(Debug, Deserialize)]
struct ProvinceRow {
    province_code: String,
    province_name: String,
    population: String,
}

/// CSV Connector - file-backed reader for one source table.
pub struct CsvConnector {
    source_id: String,
    path: PathBuf,
    preamble_lines: usize,
}

impl CsvConnector {
    pub fn new(source_id: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            source_id: source_id.into(),
            path: path.into(),
            preamble_lines: 0,
        }
    }

    pub fn with_preamble_lines(mut self, lines: usize) -> Self {
        self.preamble_lines = lines;
        self
    }

    pub fn source_id(&self) -> &str {
        &self.source_id
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_text(&self) -> Result<String> {
        let bytes = std::fs::read(&self.path).map_err(|e| {
            CensusError::Format(format!(
                "Failed to read {} table {}: {}",
                self.source_id,
                self.path.display(),
                e
            ))
        })?;
        // Census exports are not always UTF-8; keep going on stray bytes.
        let text = String::from_utf8_lossy(&bytes);
        let body: Vec<&str> = text.lines().skip(self.preamble_lines).collect();
        Ok(body.join("\n"))
    }

    /// Read the table body (after the preamble) as raw cells.
    pub fn read_raw_table(&self) -> Result<RawTable> {
        let body = self.read_text()?;
        if body.trim().is_empty() {
            return Err(CensusError::Format(format!(
                "{} table {} has no header after skipping {} lines",
                self.source_id,
                self.path.display(),
                self.preamble_lines
            )));
        }

        let mut rdr = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(body.as_bytes());

        let headers = rdr
            .headers()
            .map_err(|e| CensusError::Format(format!("Failed to read CSV headers: {}", e)))?
            .iter()
            .map(|h| h.trim().to_string())
            .collect::<Vec<_>>();

        let mut rows = Vec::new();
        for (line, result) in rdr.records().enumerate() {
            let record = result
                .map_err(|e| CensusError::Format(format!("Failed to read CSV record: {}", e)))?;
            rows.push(Self::record_cells(&record, headers.len(), line + 1)?);
        }

        debug!(
            source = %self.source_id,
            columns = headers.len(),
            rows = rows.len(),
            "Read raw table"
        );

        Ok(RawTable::new(headers, rows))
    }

    fn record_cells(record: &StringRecord, width: usize, line: usize) -> Result<Vec<Option<String>>> {
        if let Some(extra) = record.iter().skip(width).find(|cell| !cell.is_empty()) {
            return Err(CensusError::Format(format!(
                "Row {} has {} fields but the header has {} (unexpected value {:?})",
                line,
                record.len(),
                width,
                extra
            )));
        }

        Ok((0..width)
            .map(|idx| match record.get(idx) {
                Some(cell) if !cell.is_empty() => Some(cell.to_string()),
                _ => None,
            })
            .collect())
    }
}

/// Load the occupation-by-gender census table, skipping its metadata preamble.
pub fn load_occupations(path: &Path) -> Result<RawTable> {
    load_occupations_with_preamble(path, CENSUS_PREAMBLE_LINES)
}

pub fn load_occupations_with_preamble(path: &Path, preamble_lines: usize) -> Result<RawTable> {
    let table = CsvConnector::new("census", path)
        .with_preamble_lines(preamble_lines)
        .read_raw_table()?;

    let width = table.drop_empty().width();
    if width != CENSUS_COLUMN_COUNT {
        return Err(CensusError::Format(format!(
            "Census table {} has {} non-empty columns, expected {}",
            path.display(),
            width,
            CENSUS_COLUMN_COUNT
        )));
    }

    info!(path = %path.display(), rows = table.height(), "Loaded census table");
    Ok(table)
}

/// Load the province population table, preserving file order.
pub fn load_provinces(path: &Path) -> Result<Vec<ProvinceRecord>> {
    let mut rdr = ReaderBuilder::new()
        .has_headers(true)
        .trim(Trim::All)
        .from_path(path)
        .map_err(|e| {
            CensusError::Format(format!("Failed to open province table {}: {}", path.display(), e))
        })?;

    let headers = rdr
        .headers()
        .map_err(|e| CensusError::Format(format!("Failed to read province headers: {}", e)))?
        .clone();
    let missing: Vec<&str> = PROVINCE_COLUMNS
        .iter()
        .copied()
        .filter(|name| !headers.iter().any(|h| h == *name))
        .collect();
    if !missing.is_empty() {
        return Err(CensusError::Format(format!(
            "Province table {} is missing columns: {}",
            path.display(),
            missing.join(", ")
        )));
    }

    let mut provinces = Vec::new();
    for (line, result) in rdr.deserialize::<ProvinceRow>().enumerate() {
        let row = result.map_err(|e| {
            CensusError::Format(format!("Malformed province row {}: {}", line + 1, e))
        })?;
        let population = parse_population(&row.population).ok_or_else(|| {
            CensusError::Format(format!(
                "Province {} has invalid population {:?}",
                row.province_code, row.population
            ))
        })?;
        provinces.push(ProvinceRecord {
            province_code: row.province_code,
            province_name: row.province_name,
            population,
        });
    }

    if provinces.is_empty() {
        return Err(CensusError::Format(format!(
            "Province table {} has no rows",
            path.display()
        )));
    }
    let population = total_population(&provinces)?;

    info!(
        path = %path.display(),
        provinces = provinces.len(),
        population,
        "Loaded province table"
    );
    Ok(provinces)
}

/// Sum of all province populations; overflow is a format error.
pub fn total_population(provinces: &[ProvinceRecord]) -> Result<i64> {
    provinces.iter().try_fold(0i64, |sum, province| {
        sum.checked_add(province.population).ok_or_else(|| {
            CensusError::Format(format!(
                "Total population overflows at province {}",
                province.province_code
            ))
        })
    })
}

fn parse_population(value: &str) -> Option<i64> {
    value
        .replace(',', "")
        .trim()
        .parse::<i64>()
        .ok()
        .filter(|population| *population > 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_file(dir: &tempfile::TempDir, name: &str, contents: &str) -> PathBuf {
        let path = dir.path().join(name);
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        path
    }

    const PREAMBLE: &str = "Statistics Canada\nTable 98-10-0449-01\nOccupation by gender\nRelease date: 2022-11-30\nGeography: Canada\nNote\n\"Gender (3)\",,,\n";

    #[test]
    fn test_load_occupations_skips_preamble() {
        let dir = tempfile::tempdir().unwrap();
        let body = "Occupation,Total,Men+,Women+\n\"Total - Occupation i2\",\"1,000\",600,400\n\"  1 Business, finance\",500,200,300\n";
        let path = write_file(&dir, "census.csv", &format!("{}{}", PREAMBLE, body));

        let table = load_occupations(&path).unwrap();
        assert_eq!(table.headers, vec!["Occupation", "Total", "Men+", "Women+"]);
        assert_eq!(table.height(), 2);
        assert_eq!(table.rows[1][0].as_deref(), Some("  1 Business, finance"));
        assert_eq!(table.rows[0][1].as_deref(), Some("1,000"));
    }

    #[test]
    fn test_load_occupations_drops_empty_trailing_column() {
        let dir = tempfile::tempdir().unwrap();
        let body = "Occupation,Total,Men+,Women+,\nA,1,1,0,\nB,2,1,1,\n";
        let path = write_file(&dir, "census.csv", &format!("{}{}", PREAMBLE, body));

        let table = load_occupations(&path).unwrap();
        assert_eq!(table.width(), 5);
        assert_eq!(table.drop_empty().width(), 4);
    }

    #[test]
    fn test_load_occupations_wrong_arity_is_format_error() {
        let dir = tempfile::tempdir().unwrap();
        let body = "Occupation,Total,Men+\nA,1,1\n";
        let path = write_file(&dir, "census.csv", &format!("{}{}", PREAMBLE, body));

        match load_occupations(&path) {
            Err(CensusError::Format(msg)) => assert!(msg.contains("expected 4")),
            other => panic!("expected format error, got {:?}", other),
        }
    }

    #[test]
    fn test_load_occupations_missing_file_is_format_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = load_occupations(&dir.path().join("absent.csv"));
        assert!(matches!(result, Err(CensusError::Format(_))));
    }

    #[test]
    fn test_load_provinces_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(
            &dir,
            "provinces.csv",
            "province_code,province_name,population\nON,Ontario,14223942\nQC,Quebec,8501833\n",
        );

        let provinces = load_provinces(&path).unwrap();
        assert_eq!(provinces.len(), 2);
        assert_eq!(provinces[0].province_code, "ON");
        assert_eq!(provinces[1].province_name, "Quebec");
        assert_eq!(provinces[1].population, 8501833);
    }

    #[test]
    fn test_load_provinces_missing_column() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(&dir, "provinces.csv", "province_code,population\nON,100\n");

        match load_provinces(&path) {
            Err(CensusError::Format(msg)) => assert!(msg.contains("province_name")),
            other => panic!("expected format error, got {:?}", other),
        }
    }

    #[test]
    fn test_load_provinces_rejects_non_positive_population() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(
            &dir,
            "provinces.csv",
            "province_code,province_name,population\nON,Ontario,0\n",
        );
        assert!(matches!(load_provinces(&path), Err(CensusError::Format(_))));
    }

    #[test]
    fn test_load_provinces_header_only_is_format_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(&dir, "provinces.csv", "province_code,province_name,population\n");

        match load_provinces(&path) {
            Err(CensusError::Format(msg)) => assert!(msg.contains("no rows")),
            other => panic!("expected format error, got {:?}", other),
        }
    }

    #[test]
    fn test_load_provinces_population_overflow() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(
            &dir,
            "provinces.csv",
            &format!(
                "province_code,province_name,population\nON,Ontario,{}\nQC,Quebec,{}\n",
                i64::MAX,
                i64::MAX
            ),
        );
        assert!(matches!(load_provinces(&path), Err(CensusError::Format(_))));
    }

    #[test]
    fn test_drop_empty_rows_and_columns() {
        let table = RawTable::new(
            vec!["a".into(), "b".into(), "c".into()],
            vec![
                vec![Some("x".into()), None, Some("1".into())],
                vec![None, None, None],
                vec![Some("y".into()), None, None],
            ],
        );
        let dropped = table.drop_empty();
        assert_eq!(dropped.headers, vec!["a", "c"]);
        assert_eq!(dropped.height(), 2);
        assert_eq!(dropped.rows[1], vec![Some("y".to_string()), None]);
    }
}
