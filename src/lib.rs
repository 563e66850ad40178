pub mod catalog;
pub mod categories;
pub mod cleaner;
pub mod config;
pub mod distributor;
pub mod error;
pub mod hierarchy;
pub mod ingestion;
pub mod jitter;
pub mod pipeline;
pub mod snapshot;
pub mod views;

pub use catalog::{TableCatalog, TableName, TableSummary};
pub use categories::{
    extract_engineering, extract_essential_services, extract_noc_categories, CategorizedRow,
    CategoryKind, ENGINEERING_OCCUPATIONS, ESSENTIAL_SERVICES,
};
pub use cleaner::{clean_occupations, OccupationRecord};
pub use config::{DistributionMode, PipelineConfig};
pub use distributor::{ProvincialDistributor, ProvincialOccupationRow};
pub use error::{CensusError, Result};
pub use hierarchy::{build_hierarchy, OccupationHierarchy};
pub use ingestion::{load_occupations, load_provinces, ProvinceRecord, RawTable};
pub use jitter::{FixedJitter, JitterSource, RandomJitter, ScriptedJitter};
pub use pipeline::{CensusPipeline, PipelineOutput};
pub use snapshot::SnapshotHeader;
