//! Ingestion Module
//!
//! Reads the two source tables of a pipeline run:
//! - the occupation-by-gender census table (fixed metadata preamble)
//! - the province population table

pub mod csv_connector;

pub use csv_connector::{
    load_occupations, load_occupations_with_preamble, load_provinces, total_population, CsvConnector,
    ProvinceRecord, RawTable, CENSUS_COLUMN_COUNT, CENSUS_PREAMBLE_LINES, PROVINCE_COLUMNS,
};
