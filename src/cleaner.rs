//! Occupation Cleaner
//!
//! Turns the raw census table into ordered `OccupationRecord`s: labels lose
//! their footnote and numeric-code suffixes, counts become numbers and the
//! original indentation is kept as a hierarchy `level`.

use crate::error::{CensusError, Result};
use crate::ingestion::{RawTable, CENSUS_COLUMN_COUNT};
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

lazy_static! {
    static ref FOOTNOTE_SUFFIX: Regex = Regex::new(r"\s*i\d+\s*$").expect("footnote pattern");
    static ref NUMERIC_SUFFIX: Regex = Regex::new(r"\s*\d+\s*$").expect("numeric suffix pattern");
}

/// Column names assigned positionally to the cleaned census table.
pub const OCCUPATION_COLUMNS: [&str; CENSUS_COLUMN_COUNT] = ["occupation", "total", "men", "women"];

/// One row of the national occupation table.
///
/// `level` is the leading-whitespace depth of the original label; a row is
/// a child of the nearest preceding row with a smaller level.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OccupationRecord {
    pub occupation_label: String,
    pub total: Option<f64>,
    pub men: Option<f64>,
    pub women: Option<f64>,
    pub level: usize,
}

/// Clean the raw census table. Row order is preserved.
pub fn clean_occupations(raw: &RawTable) -> Result<Vec<OccupationRecord>> {
    let table = raw.drop_empty();
    if table.width() != CENSUS_COLUMN_COUNT {
        return Err(CensusError::Schema(format!(
            "expected {} columns ({}), found {}: {:?}",
            CENSUS_COLUMN_COUNT,
            OCCUPATION_COLUMNS.join(", "),
            table.width(),
            table.headers
        )));
    }
    debug!(
        renamed_from = ?table.headers,
        renamed_to = ?OCCUPATION_COLUMNS,
        "Renamed census columns"
    );

    let records: Vec<OccupationRecord> = table
        .rows
        .iter()
        .map(|row| {
            let raw_label = row[0].as_deref().unwrap_or("");
            OccupationRecord {
                occupation_label: clean_label(raw_label),
                total: parse_count(row[1].as_deref()),
                men: parse_count(row[2].as_deref()),
                women: parse_count(row[3].as_deref()),
                level: indentation_level(raw_label),
            }
        })
        .collect();

    let missing = records
        .iter()
        .filter(|r| r.total.is_none() || r.men.is_none() || r.women.is_none())
        .count();
    info!(records = records.len(), with_missing_counts = missing, "Cleaned census table");

    Ok(records)
}

/// Strip footnote references, then bare numeric codes, then whitespace.
///
/// The footnote pass must run first: `"... 2021 i2"` would otherwise lose
/// only the `2`.
pub fn clean_label(raw: &str) -> String {
    let without_footnote = FOOTNOTE_SUFFIX.replace(raw, "");
    let without_code = NUMERIC_SUFFIX.replace(&without_footnote, "");
    without_code.trim().to_string()
}

/// Number of leading whitespace characters of the untrimmed label.
pub fn indentation_level(raw: &str) -> usize {
    raw.chars().take_while(|c| c.is_whitespace()).count()
}

/// Parse a count cell; thousands separators are ignored and anything that
/// is not a finite number becomes missing.
pub fn parse_count(cell: Option<&str>) -> Option<f64> {
    let cleaned = cell?.replace(',', "");
    cleaned
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|value| value.is_finite())
}
