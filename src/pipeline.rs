//! Pipeline orchestration
//!
//! load -> clean -> distribute -> extract -> catalog, and optionally save.
//! Any format or schema failure aborts the run before anything is written.

use crate::catalog::TableCatalog;
use crate::categories::{
    extract_engineering, extract_essential_services, extract_noc_categories, CategorizedRow,
};
use crate::cleaner::{clean_occupations, OccupationRecord};
use crate::config::PipelineConfig;
use crate::distributor::{ProvincialDistributor, ProvincialOccupationRow};
use crate::error::Result;
use crate::ingestion::{load_occupations_with_preamble, load_provinces, ProvinceRecord, RawTable};
use crate::jitter::JitterSource;
use crate::snapshot::{self, SnapshotHeader};
use tracing::{info, info_span};

/// Everything one run produces, typed rows alongside the catalog built
/// from them.
#[derive(Clone, Debug)]
pub struct PipelineOutput {
    pub occupations: Vec<OccupationRecord>,
    pub provinces: Vec<ProvinceRecord>,
    pub combined: Vec<ProvincialOccupationRow>,
    pub essential_services: Vec<CategorizedRow>,
    pub engineering: Vec<CategorizedRow>,
    pub noc_categories: Vec<ProvincialOccupationRow>,
    pub catalog: TableCatalog,
}

pub struct CensusPipeline {
    config: PipelineConfig,
}

impl CensusPipeline {
    pub fn new(config: PipelineConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Run with the jitter source the config describes.
    pub fn run(&self) -> Result<PipelineOutput> {
        let mut jitter = self.config.jitter_source();
        self.run_with(&mut jitter)
    }

    pub fn run_with(&self, jitter: &mut dyn JitterSource) -> Result<PipelineOutput> {
        self.config.validate()?;

        let (raw, provinces) = {
            let span = info_span!("load");
            let _enter = span.enter();
            let raw = load_occupations_with_preamble(&self.config.census_path, self.config.preamble_lines)?;
            let provinces = load_provinces(&self.config.provinces_path)?;
            info!(
                census_rows = raw.height(),
                provinces = provinces.len(),
                "Loaded source tables"
            );
            (raw, provinces)
        };

        let distributor = ProvincialDistributor::new(self.config.mode)
            .with_jitter_range(self.config.jitter_low, self.config.jitter_high);
        transform(&raw, provinces, &distributor, jitter)
    }

    /// Run, then save the catalog to the configured output path.
    pub fn process(&self) -> Result<(PipelineOutput, SnapshotHeader)> {
        let output = self.run()?;
        let header = snapshot::save(&output.catalog, &self.config.output_path)?;
        Ok((output, header))
    }
}

/// Everything after loading: pure apart from the jitter draws.
pub fn transform(
    raw: &RawTable,
    provinces: Vec<ProvinceRecord>,
    distributor: &ProvincialDistributor,
    jitter: &mut dyn JitterSource,
) -> Result<PipelineOutput> {
    let occupations = {
        let span = info_span!("clean");
        let _enter = span.enter();
        clean_occupations(raw)?
    };

    let combined = {
        let span = info_span!("distribute", mode = distributor.mode().as_str());
        let _enter = span.enter();
        distributor.distribute(&occupations, &provinces, jitter)?
    };

    let span = info_span!("extract");
    let _enter = span.enter();
    let essential_services = extract_essential_services(&combined);
    let engineering = extract_engineering(&combined);
    let noc_categories = extract_noc_categories(&combined);

    let catalog = TableCatalog::from_rows(
        &combined,
        &essential_services,
        &engineering,
        &noc_categories,
        &provinces,
    )?;

    for summary in catalog.summaries() {
        info!(
            table = %summary.name,
            rows = summary.rows,
            columns = summary.columns,
            total_workers = ?summary.total_workers,
            "Built table"
        );
    }

    Ok(PipelineOutput {
        occupations,
        provinces,
        combined,
        essential_services,
        engineering,
        noc_categories,
        catalog,
    })
}
