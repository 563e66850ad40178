//! Provincial Distributor - synthetic per-province occupation counts
//!
//! There is no provincial breakdown in the source census, so each province
//! gets a copy of the national table scaled by its population share. Every
//! count column of a province copy is multiplied by one jitter factor drawn
//! for that (province, column) pair, so `total` and `men + women` drift
//! apart independently. That divergence is expected output.

use crate::cleaner::OccupationRecord;
use crate::config::DistributionMode;
use crate::error::Result;
use crate::ingestion::{total_population, ProvinceRecord};
use crate::jitter::{JitterSource, JITTER_HIGH, JITTER_LOW};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, info_span, warn};

/// Rates are expressed per this many residents.
pub const PER_CAPITA_BASE: f64 = 100_000.0;

pub const NATIONAL_CODE: &str = "CA";
pub const NATIONAL_NAME: &str = "Canada";

/// One occupation row of one province copy.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProvincialOccupationRow {
    pub occupation_label: String,
    pub total: Option<f64>,
    pub men: Option<f64>,
    pub women: Option<f64>,
    pub level: usize,
    pub province_code: String,
    pub province_name: String,
    pub population: i64,
    pub per_capita: Option<f64>,
    pub men_per_capita: Option<f64>,
    pub women_per_capita: Option<f64>,
}

/// Jitter factors drawn for one province copy.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ColumnFactors {
    pub total: f64,
    pub men: f64,
    pub women: f64,
}

impl ColumnFactors {
    pub const UNIT: ColumnFactors = ColumnFactors { total: 1.0, men: 1.0, women: 1.0 };

    /// Draw in column order: total, men, women.
    fn draw(jitter: &mut dyn JitterSource, low: f64, high: f64) -> Self {
        let total = jitter.factor(low, high);
        let men = jitter.factor(low, high);
        let women = jitter.factor(low, high);
        Self { total, men, women }
    }
}

pub struct ProvincialDistributor {
    mode: DistributionMode,
    jitter_low: f64,
    jitter_high: f64,
}

impl Default for ProvincialDistributor {
    fn default() -> Self {
        Self::new(DistributionMode::default())
    }
}

impl ProvincialDistributor {
    pub fn new(mode: DistributionMode) -> Self {
        Self {
            mode,
            jitter_low: JITTER_LOW,
            jitter_high: JITTER_HIGH,
        }
    }

    pub fn with_jitter_range(mut self, low: f64, high: f64) -> Self {
        self.jitter_low = low;
        self.jitter_high = high;
        self
    }

    pub fn mode(&self) -> DistributionMode {
        self.mode
    }

    /// Expand the national table into the combined provincial table.
    ///
    /// Provinces are emitted in input order; within a province the national
    /// occupation order is kept.
    pub fn distribute(
        &self,
        occupations: &[OccupationRecord],
        provinces: &[ProvinceRecord],
        jitter: &mut dyn JitterSource,
    ) -> Result<Vec<ProvincialOccupationRow>> {
        let total_population = total_population(provinces)?;
        if total_population <= 0 {
            warn!(provinces = provinces.len(), "No population to distribute over");
            return Ok(Vec::new());
        }

        match self.mode {
            DistributionMode::ProvinceWeighted => {
                let mut combined = Vec::with_capacity(occupations.len() * provinces.len());
                for province in provinces {
                    let span = info_span!("province", code = %province.province_code);
                    let _enter = span.enter();

                    let pop_ratio = province.population as f64 / total_population as f64;
                    let factors = ColumnFactors::draw(jitter, self.jitter_low, self.jitter_high);
                    debug!(
                        pop_ratio,
                        total_factor = factors.total,
                        men_factor = factors.men,
                        women_factor = factors.women,
                        "Scaling national table"
                    );
                    combined.extend(scale_table(occupations, province, pop_ratio, factors));
                }
                info!(
                    provinces = provinces.len(),
                    rows = combined.len(),
                    "Distributed national table across provinces"
                );
                Ok(combined)
            }
            DistributionMode::National => {
                let national = ProvinceRecord {
                    province_code: NATIONAL_CODE.to_string(),
                    province_name: NATIONAL_NAME.to_string(),
                    population: total_population,
                };
                let rows = scale_table(occupations, &national, 1.0, ColumnFactors::UNIT);
                info!(rows = rows.len(), population = total_population, "Kept national table unweighted");
                Ok(rows)
            }
        }
    }
}

/// Scale one copy of the national table for a province.
pub fn scale_table(
    occupations: &[OccupationRecord],
    province: &ProvinceRecord,
    pop_ratio: f64,
    factors: ColumnFactors,
) -> Vec<ProvincialOccupationRow> {
    occupations
        .iter()
        .map(|record| {
            let total = scale_count(record.total, pop_ratio, factors.total);
            let men = scale_count(record.men, pop_ratio, factors.men);
            let women = scale_count(record.women, pop_ratio, factors.women);
            ProvincialOccupationRow {
                occupation_label: record.occupation_label.clone(),
                total,
                men,
                women,
                level: record.level,
                province_code: province.province_code.clone(),
                province_name: province.province_name.clone(),
                population: province.population,
                per_capita: per_capita(total, province.population),
                men_per_capita: per_capita(men, province.population),
                women_per_capita: per_capita(women, province.population),
            }
        })
        .collect()
}

fn scale_count(value: Option<f64>, pop_ratio: f64, factor: f64) -> Option<f64> {
    value.map(|v| (v * pop_ratio * factor).round_ties_even())
}

/// Count per 100,000 residents, rounded to 2 decimals.
pub fn per_capita(count: Option<f64>, population: i64) -> Option<f64> {
    count.map(|c| round_to(c / population as f64 * PER_CAPITA_BASE, 2))
}

/// Round half to even at the given number of decimals.
pub fn round_to(value: f64, decimals: i32) -> f64 {
    let scale = 10f64.powi(decimals);
    (value * scale).round_ties_even() / scale
}
