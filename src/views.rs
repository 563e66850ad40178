//! Read-only queries the dashboard runs against a loaded catalog.
//!
//! Every query filters a copy of the relevant table and returns plain rows;
//! chart construction happens in the consumer. Empty tables give empty
//! results so the consumer can draw a placeholder.

use crate::catalog::{
    float_values, string_values, TableCatalog, TableName, MEN, OCCUPATION_LABEL, TOTAL, WOMEN,
};
use crate::categories::CategoryKind;
use crate::distributor::round_to;
use crate::error::Result;
use itertools::Itertools;
use lazy_static::lazy_static;
use polars::prelude::*;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

lazy_static! {
    static ref NOC_CODE_PREFIX: Regex = Regex::new(r"^\d+\s+").expect("NOC code prefix pattern");
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ServiceFilter {
    All,
    Only(String),
}

impl ServiceFilter {
    /// `"all"` (any case) selects every service, anything else one service.
    pub fn parse(value: &str) -> Self {
        if value.eq_ignore_ascii_case("all") {
            ServiceFilter::All
        } else {
            ServiceFilter::Only(value.to_string())
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ServiceSummaryRow {
    pub service_type: String,
    pub total: f64,
    pub men: f64,
    pub women: f64,
    /// Share of `total`, in percent to one decimal. `None` when total is 0.
    pub men_pct: Option<f64>,
    pub women_pct: Option<f64>,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct GenderBreakdown {
    pub men: f64,
    pub women: f64,
    pub total: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EngineeringBar {
    pub occupation: String,
    pub men: f64,
    pub women: f64,
    pub total: f64,
    pub exceeds_threshold: bool,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SectorShare {
    pub occupation: String,
    pub total: f64,
    pub share_pct: Option<f64>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
struct Sums {
    total: f64,
    men: f64,
    women: f64,
}

impl Sums {
    fn add(&mut self, other: Sums) {
        self.total += other.total;
        self.men += other.men;
        self.women += other.women;
    }
}

/// Occupation label without its leading NOC code.
pub fn display_label(label: &str) -> String {
    NOC_CODE_PREFIX.replace(label, "").into_owned()
}

/// Essential-service workers grouped by service, sorted by service name.
pub fn service_summary(catalog: &TableCatalog, filter: &ServiceFilter) -> Result<Vec<ServiceSummaryRow>> {
    let key = CategoryKind::EssentialService.column_name();
    let grouped = grouped_sums(catalog.table(TableName::EssentialServices), key, None)?;

    let rows = grouped
        .into_iter()
        .sorted_by(|a, b| a.0.cmp(&b.0))
        .filter(|(service, _)| match filter {
            ServiceFilter::All => true,
            ServiceFilter::Only(name) => service == name,
        })
        .map(|(service_type, sums)| ServiceSummaryRow {
            service_type,
            total: sums.total,
            men: sums.men,
            women: sums.women,
            men_pct: percent(sums.men, sums.total),
            women_pct: percent(sums.women, sums.total),
        })
        .collect();
    Ok(rows)
}

/// Distinct NOC header labels in first-seen order.
pub fn noc_category_options(catalog: &TableCatalog) -> Result<Vec<String>> {
    let labels = string_values(catalog.table(TableName::NocCategories), OCCUPATION_LABEL)?;
    Ok(labels.into_iter().flatten().unique().collect())
}

/// Men/women totals for one NOC header, summed over every province.
pub fn gender_breakdown(catalog: &TableCatalog, category: &str) -> Result<Option<GenderBreakdown>> {
    let grouped = grouped_sums(
        catalog.table(TableName::NocCategories),
        OCCUPATION_LABEL,
        Some((OCCUPATION_LABEL, category)),
    )?;
    Ok(grouped.into_iter().next().map(|(_, sums)| GenderBreakdown {
        men: sums.men,
        women: sums.women,
        total: sums.total,
    }))
}

/// Per-occupation bars for one engineering discipline, keyed by display label.
pub fn engineering_manpower(
    catalog: &TableCatalog,
    engineering_type: &str,
    threshold: f64,
) -> Result<Vec<EngineeringBar>> {
    let grouped = grouped_sums(
        catalog.table(TableName::Engineering),
        OCCUPATION_LABEL,
        Some((CategoryKind::Engineering.column_name(), engineering_type)),
    )?;

    let mut by_display: BTreeMap<String, Sums> = BTreeMap::new();
    for (label, sums) in grouped {
        by_display.entry(display_label(&label)).or_default().add(sums);
    }

    Ok(by_display
        .into_iter()
        .map(|(occupation, sums)| EngineeringBar {
            occupation,
            men: sums.men,
            women: sums.women,
            total: sums.total,
            exceeds_threshold: sums.total > threshold,
        })
        .collect())
}

/// Workforce share of each NOC header, in first-seen order.
pub fn sector_shares(catalog: &TableCatalog) -> Result<Vec<SectorShare>> {
    let grouped = grouped_sums(catalog.table(TableName::NocCategories), OCCUPATION_LABEL, None)?;
    let grand_total: f64 = grouped.iter().map(|(_, sums)| sums.total).sum();

    Ok(grouped
        .into_iter()
        .map(|(occupation, sums)| SectorShare {
            occupation,
            total: sums.total,
            share_pct: percent(sums.total, grand_total),
        })
        .collect())
}

fn percent(part: f64, whole: f64) -> Option<f64> {
    let pct = part / whole * 100.0;
    pct.is_finite().then(|| round_to(pct, 1))
}

/// Sum total/men/women per distinct `key`, first-seen order. Missing
/// counts are excluded from the sums.
fn grouped_sums(df: &DataFrame, key: &str, filter: Option<(&str, &str)>) -> Result<Vec<(String, Sums)>> {
    let mut lf = df.clone().lazy();
    if let Some((column, value)) = filter {
        lf = lf.filter(col(column).eq(lit(value)));
    }
    let out = lf
        .group_by_stable([col(key)])
        .agg([col(TOTAL).sum(), col(MEN).sum(), col(WOMEN).sum()])
        .collect()?;

    let keys = string_values(&out, key)?;
    let totals = float_values(&out, TOTAL)?;
    let men = float_values(&out, MEN)?;
    let women = float_values(&out, WOMEN)?;

    Ok(keys
        .into_iter()
        .zip(totals)
        .zip(men)
        .zip(women)
        .filter_map(|(((key, total), men), women)| {
            key.map(|key| {
                (
                    key,
                    Sums {
                        total: total.unwrap_or(0.0),
                        men: men.unwrap_or(0.0),
                        women: women.unwrap_or(0.0),
                    },
                )
            })
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::categories::CategorizedRow;
    use crate::cleaner::{clean_label, indentation_level};
    use crate::distributor::ProvincialOccupationRow;
    use crate::ingestion::ProvinceRecord;

    fn row(label: &str, province: &str, total: Option<f64>, men: Option<f64>, women: Option<f64>) -> ProvincialOccupationRow {
        ProvincialOccupationRow {
            occupation_label: label.to_string(),
            total,
            men,
            women,
            level: 0,
            province_code: province.to_string(),
            province_name: province.to_string(),
            population: 1000,
            per_capita: None,
            men_per_capita: None,
            women_per_capita: None,
        }
    }

    fn tagged(row: ProvincialOccupationRow, category: &str) -> CategorizedRow {
        CategorizedRow {
            row,
            category_type: category.to_string(),
        }
    }

    fn catalog() -> TableCatalog {
        let nurses = "31301 Registered nurses and registered psychiatric nurses";
        let fire = "42101 Firefighters";
        let mech = "21301 Mechanical engineers";
        let services = vec![
            tagged(row(nurses, "ON", Some(100.0), Some(10.0), Some(90.0)), "Nurses"),
            tagged(row(fire, "ON", Some(50.0), Some(45.0), None), "Firefighters"),
            tagged(row(nurses, "QC", Some(60.0), Some(6.0), Some(50.0)), "Nurses"),
            tagged(row(fire, "QC", Some(0.0), Some(0.0), Some(0.0)), "Firefighters"),
        ];
        let engineering = vec![
            tagged(row(mech, "ON", Some(300.0), Some(250.0), Some(50.0)), "Mechanical"),
            tagged(row(mech, "QC", Some(200.0), Some(150.0), Some(40.0)), "Mechanical"),
        ];
        let noc = vec![
            row("2 Natural and applied sciences", "ON", Some(300.0), Some(200.0), Some(100.0)),
            row("3 Health occupations", "ON", Some(100.0), Some(20.0), Some(80.0)),
            row("2 Natural and applied sciences", "QC", Some(100.0), Some(60.0), None),
        ];
        let provinces = vec![ProvinceRecord {
            province_code: "ON".to_string(),
            province_name: "Ontario".to_string(),
            population: 1000,
        }];
        TableCatalog::from_rows(&noc, &services, &engineering, &noc, &provinces).unwrap()
    }

    fn empty_catalog() -> TableCatalog {
        TableCatalog::from_rows(&[], &[], &[], &[], &[]).unwrap()
    }

    #[test]
    fn test_display_label_strips_code() {
        assert_eq!(
            display_label("31301 Registered nurses and registered psychiatric nurses"),
            "Registered nurses and registered psychiatric nurses"
        );
        assert_eq!(display_label("Total - Occupation"), "Total - Occupation");
    }

    #[test]
    fn test_nurses_row_cleans_then_displays_without_code() {
        let raw = "  31301 Registered nurses and registered psychiatric nurses12";
        let cleaned = clean_label(raw);
        assert_eq!(cleaned, "31301 Registered nurses and registered psychiatric nurses");
        assert_eq!(indentation_level(raw), 2);
        assert_eq!(
            display_label(&cleaned),
            "Registered nurses and registered psychiatric nurses"
        );
    }

    #[test]
    fn test_service_filter_parse() {
        assert_eq!(ServiceFilter::parse("All"), ServiceFilter::All);
        assert_eq!(ServiceFilter::parse("Nurses"), ServiceFilter::Only("Nurses".to_string()));
    }

    #[test]
    fn test_service_summary_all() {
        let rows = service_summary(&catalog(), &ServiceFilter::All).unwrap();
        let names: Vec<&str> = rows.iter().map(|r| r.service_type.as_str()).collect();
        assert_eq!(names, vec!["Firefighters", "Nurses"]);

        let nurses = &rows[1];
        assert_eq!(nurses.total, 160.0);
        assert_eq!(nurses.men, 16.0);
        assert_eq!(nurses.women, 140.0);
        assert_eq!(nurses.men_pct, Some(10.0));
        assert_eq!(nurses.women_pct, Some(87.5));

        // missing women excluded from the sum
        assert_eq!(rows[0].women, 0.0);
        assert_eq!(rows[0].men_pct, Some(90.0));
    }

    #[test]
    fn test_service_summary_only() {
        let rows = service_summary(&catalog(), &ServiceFilter::Only("Nurses".to_string())).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].service_type, "Nurses");

        let none = service_summary(&catalog(), &ServiceFilter::Only("Paramedics".to_string())).unwrap();
        assert!(none.is_empty());
    }

    #[test]
    fn test_noc_category_options_unique() {
        assert_eq!(
            noc_category_options(&catalog()).unwrap(),
            vec!["2 Natural and applied sciences", "3 Health occupations"]
        );
    }

    #[test]
    fn test_gender_breakdown_sums_provinces() {
        let breakdown = gender_breakdown(&catalog(), "2 Natural and applied sciences")
            .unwrap()
            .unwrap();
        assert_eq!(breakdown.men, 260.0);
        assert_eq!(breakdown.women, 100.0);
        assert_eq!(breakdown.total, 400.0);

        assert!(gender_breakdown(&catalog(), "9 Nothing").unwrap().is_none());
    }

    #[test]
    fn test_engineering_manpower_threshold() {
        let bars = engineering_manpower(&catalog(), "Mechanical", 400.0).unwrap();
        assert_eq!(bars.len(), 1);
        assert_eq!(bars[0].occupation, "Mechanical engineers");
        assert_eq!(bars[0].total, 500.0);
        assert!(bars[0].exceeds_threshold);

        let bars = engineering_manpower(&catalog(), "Mechanical", 500.0).unwrap();
        assert!(!bars[0].exceeds_threshold);

        assert!(engineering_manpower(&catalog(), "Electrical", 0.0).unwrap().is_empty());
    }

    #[test]
    fn test_sector_shares() {
        let shares = sector_shares(&catalog()).unwrap();
        assert_eq!(shares.len(), 2);
        assert_eq!(shares[0].total, 400.0);
        assert_eq!(shares[0].share_pct, Some(80.0));
        assert_eq!(shares[1].share_pct, Some(20.0));
    }

    #[test]
    fn test_empty_tables_give_empty_views() {
        let catalog = empty_catalog();
        assert!(service_summary(&catalog, &ServiceFilter::All).unwrap().is_empty());
        assert!(noc_category_options(&catalog).unwrap().is_empty());
        assert!(gender_breakdown(&catalog, "1 Anything").unwrap().is_none());
        assert!(engineering_manpower(&catalog, "Computer", 10.0).unwrap().is_empty());
        assert!(sector_shares(&catalog).unwrap().is_empty());
    }

    #[test]
    fn test_percent_of_zero_is_missing() {
        assert_eq!(percent(0.0, 0.0), None);
        assert_eq!(percent(1.0, 3.0), Some(33.3));
    }
}
