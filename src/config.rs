//! Pipeline configuration: input/output paths, distribution mode and jitter.

use crate::error::{CensusError, Result};
use crate::ingestion::CENSUS_PREAMBLE_LINES;
use crate::jitter::{RandomJitter, JITTER_HIGH, JITTER_LOW};
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;

pub const DEFAULT_DATA_DIR: &str = "data";

/// How the national table is spread over provinces.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum DistributionMode {
    /// One jittered copy of the national table per province.
    #[default]
    ProvinceWeighted,
    /// The national table as a single `CA` pseudo-province, no jitter.
    National,
}

impl DistributionMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            DistributionMode::ProvinceWeighted => "province-weighted",
            DistributionMode::National => "national",
        }
    }
}

impl FromStr for DistributionMode {
    type Err = CensusError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "province-weighted" | "province_weighted" | "weighted" | "province" => {
                Ok(DistributionMode::ProvinceWeighted)
            }
            "national" => Ok(DistributionMode::National),
            other => Err(CensusError::Config(format!("Unknown distribution mode: {}", other))),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Occupation-by-gender census table
    pub census_path: PathBuf,
    /// Province code/name/population table
    pub provinces_path: PathBuf,
    /// Snapshot artifact written by `process`
    pub output_path: PathBuf,
    /// Seed for the jitter RNG; `None` draws from entropy
    pub seed: Option<u64>,
    pub mode: DistributionMode,
    pub jitter_low: f64,
    pub jitter_high: f64,
    /// Metadata lines skipped before the census header
    pub preamble_lines: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self::from_data_dir(DEFAULT_DATA_DIR)
    }
}

impl PipelineConfig {
    /// Standard layout: `raw/` inputs and a `processed/` snapshot.
    pub fn from_data_dir(data_dir: impl AsRef<Path>) -> Self {
        let data_dir = data_dir.as_ref();
        Self {
            census_path: data_dir.join("raw").join("census-data.csv"),
            provinces_path: data_dir.join("raw").join("province_population.csv"),
            output_path: data_dir.join("processed").join("processed_data.json"),
            seed: None,
            mode: DistributionMode::default(),
            jitter_low: JITTER_LOW,
            jitter_high: JITTER_HIGH,
            preamble_lines: CENSUS_PREAMBLE_LINES,
        }
    }

    /// Build from `CENSUS_*` environment variables (a `.env` file is honoured).
    pub fn from_env() -> Result<Self> {
        dotenv::dotenv().ok();

        let data_dir = std::env::var("CENSUS_DATA_DIR").unwrap_or_else(|_| DEFAULT_DATA_DIR.to_string());
        let mut config = Self::from_data_dir(data_dir);

        if let Ok(path) = std::env::var("CENSUS_INPUT") {
            config.census_path = PathBuf::from(path);
        }
        if let Ok(path) = std::env::var("CENSUS_PROVINCES") {
            config.provinces_path = PathBuf::from(path);
        }
        if let Ok(path) = std::env::var("CENSUS_OUTPUT") {
            config.output_path = PathBuf::from(path);
        }
        if let Ok(seed) = std::env::var("CENSUS_SEED") {
            config.seed = Some(seed.trim().parse::<u64>().map_err(|e| {
                CensusError::Config(format!("CENSUS_SEED must be an unsigned integer: {}", e))
            })?);
        }
        if let Ok(mode) = std::env::var("CENSUS_MODE") {
            config.mode = mode.parse()?;
        }

        config.validate()?;
        Ok(config)
    }

    pub fn with_seed(mut self, seed: Option<u64>) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_mode(mut self, mode: DistributionMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.jitter_low > 0.0 && self.jitter_low <= self.jitter_high) {
            return Err(CensusError::Config(format!(
                "Invalid jitter range [{}, {})",
                self.jitter_low, self.jitter_high
            )));
        }
        Ok(())
    }

    /// Jitter RNG for this run: seeded when a seed is configured.
    pub fn jitter_source(&self) -> RandomJitter<StdRng> {
        match self.seed {
            Some(seed) => RandomJitter::seeded(seed),
            None => RandomJitter::from_entropy(),
        }
    }
}
