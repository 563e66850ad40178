//! Category Extractor
//!
//! Slices the combined provincial table into the subsets the dashboard
//! charts: essential services and engineering disciplines (exact label
//! lookup) and the top-level NOC headers (label pattern). An empty match is
//! an empty subset.

use crate::distributor::ProvincialOccupationRow;
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{debug, warn};

/// Display name -> exact occupation label.
pub const ESSENTIAL_SERVICES: [(&str, &str); 3] = [
    ("Nurses", "31301 Registered nurses and registered psychiatric nurses"),
    ("Police Officers", "42100 Police officers (except commissioned)"),
    ("Firefighters", "42101 Firefighters"),
];

/// Display name -> exact occupation label.
pub const ENGINEERING_OCCUPATIONS: [(&str, &str); 3] = [
    ("Computer", "21311 Computer engineers (except software engineers and designers)"),
    ("Mechanical", "21301 Mechanical engineers"),
    ("Electrical", "21310 Electrical and electronics engineers"),
];

lazy_static! {
    static ref NOC_HEADER: Regex = Regex::new(r"^\d\s[A-Z]").expect("NOC header pattern");
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CategoryKind {
    EssentialService,
    Engineering,
}

impl CategoryKind {
    /// Name of the column carrying the display label.
    pub fn column_name(&self) -> &'static str {
        match self {
            CategoryKind::EssentialService => "service_type",
            CategoryKind::Engineering => "engineering_type",
        }
    }

    pub fn mapping(&self) -> &'static [(&'static str, &'static str)] {
        match self {
            CategoryKind::EssentialService => &ESSENTIAL_SERVICES,
            CategoryKind::Engineering => &ENGINEERING_OCCUPATIONS,
        }
    }

    /// Display names in mapping order.
    pub fn display_names(&self) -> Vec<&'static str> {
        self.mapping().iter().map(|(name, _)| *name).collect()
    }
}

/// A combined-table row matched by a category lookup.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CategorizedRow {
    pub row: ProvincialOccupationRow,
    pub category_type: String,
}

pub fn extract_essential_services(combined: &[ProvincialOccupationRow]) -> Vec<CategorizedRow> {
    extract_by_label(combined, CategoryKind::EssentialService)
}

pub fn extract_engineering(combined: &[ProvincialOccupationRow]) -> Vec<CategorizedRow> {
    extract_by_label(combined, CategoryKind::Engineering)
}

/// Rows whose label looks like a top-level NOC header: one digit, a space,
/// an uppercase letter.
pub fn extract_noc_categories(combined: &[ProvincialOccupationRow]) -> Vec<ProvincialOccupationRow> {
    let rows: Vec<ProvincialOccupationRow> = combined
        .iter()
        .filter(|row| is_noc_header(&row.occupation_label))
        .cloned()
        .collect();
    if rows.is_empty() {
        warn!("No top-level NOC categories found");
    }
    debug!(rows = rows.len(), "Extracted NOC categories");
    rows
}

pub fn is_noc_header(label: &str) -> bool {
    NOC_HEADER.is_match(label)
}

fn extract_by_label(combined: &[ProvincialOccupationRow], kind: CategoryKind) -> Vec<CategorizedRow> {
    let by_label: HashMap<&str, &str> = kind
        .mapping()
        .iter()
        .map(|(name, label)| (*label, *name))
        .collect();

    let rows: Vec<CategorizedRow> = combined
        .iter()
        .filter_map(|row| {
            by_label
                .get(row.occupation_label.as_str())
                .map(|name| CategorizedRow {
                    row: row.clone(),
                    category_type: name.to_string(),
                })
        })
        .collect();

    if rows.is_empty() {
        warn!(category = kind.column_name(), "No rows matched category labels");
    }
    debug!(category = kind.column_name(), rows = rows.len(), "Extracted category");
    rows
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(label: &str, province: &str) -> ProvincialOccupationRow {
        ProvincialOccupationRow {
            occupation_label: label.to_string(),
            total: Some(10.0),
            men: Some(4.0),
            women: Some(6.0),
            level: 0,
            province_code: province.to_string(),
            province_name: province.to_string(),
            population: 1000,
            per_capita: Some(1000.0),
            men_per_capita: Some(400.0),
            women_per_capita: Some(600.0),
        }
    }

    fn combined() -> Vec<ProvincialOccupationRow> {
        let labels = [
            "Total - Occupation",
            "1 Business, finance and administration occupations",
            "2 Natural and applied sciences and related occupations",
            "21301 Mechanical engineers",
            "21311 Computer engineers (except software engineers and designers)",
            "31301 Registered nurses and registered psychiatric nurses",
            "42100 Police officers (except commissioned)",
            "42101 Firefighters",
            "42101 Firefighters and fire captains",
            "11 Professional occupations in finance",
        ];
        ["ON", "QC"]
            .iter()
            .flat_map(|p| labels.iter().map(move |l| row(l, p)))
            .collect()
    }

    #[test]
    fn test_essential_services_membership() {
        let services = extract_essential_services(&combined());
        assert_eq!(services.len(), 6);

        let mapping: HashMap<&str, &str> = ESSENTIAL_SERVICES.iter().copied().collect();
        for service in &services {
            assert!(["Nurses", "Police Officers", "Firefighters"]
                .contains(&service.category_type.as_str()));
            assert_eq!(
                mapping[service.category_type.as_str()],
                service.row.occupation_label
            );
        }
    }

    #[test]
    fn test_engineering_labels() {
        let engineering = extract_engineering(&combined());
        let types: Vec<&str> = engineering.iter().map(|r| r.category_type.as_str()).collect();
        assert_eq!(types, vec!["Mechanical", "Computer", "Mechanical", "Computer"]);
    }

    #[test]
    fn test_noc_categories_top_level_only() {
        let noc = extract_noc_categories(&combined());
        assert_eq!(noc.len(), 4);
        assert!(noc.iter().all(|r| r.occupation_label.starts_with("1 ")
            || r.occupation_label.starts_with("2 ")));
    }

    #[test]
    fn test_noc_header_pattern() {
        assert!(is_noc_header("0 Legislative and senior management occupations"));
        assert!(!is_noc_header("11 Professional occupations"));
        assert!(!is_noc_header("1 business"));
        assert!(!is_noc_header("Total - Occupation"));
    }

    #[test]
    fn test_empty_matches_are_empty_subsets() {
        let rows = vec![row("Total - Occupation", "ON")];
        assert!(extract_noc_categories(&rows).is_empty());
        assert!(extract_essential_services(&rows).is_empty());
        assert!(extract_engineering(&[]).is_empty());
    }

    #[test]
    fn test_extraction_does_not_touch_combined() {
        let original = combined();
        let copy = original.clone();
        let _ = extract_essential_services(&original);
        let _ = extract_noc_categories(&original);
        assert_eq!(original, copy);
    }
}
