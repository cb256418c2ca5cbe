//! Fixed rows of the register's lookup tables.
//!
//! Province codes are the two-digit Standard Geographical Classification
//! codes used as file suffixes in the register extracts (`Address_35_*.csv`
//! for Ontario). Building usage codes are the `BU_USE` values of the
//! `Location` records.
//!
//! # Examples
//! ```
//! use nar_core::reference::{building_usage_by_code, province_by_abbreviation};
//!
//! let quebec = province_by_abbreviation("qc").expect("Quebec is listed");
//! assert_eq!(quebec.code, "24");
//! assert_eq!(quebec.name_fr, "Québec");
//! assert_eq!(building_usage_by_code("4").map(|usage| usage.description_en), Some("Unknown"));
//! ```

#[cfg(feature = "serde")]
use serde::Serialize;

/// A province or territory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct Province {
    /// Two-digit geographic code (`ProvinceCode`).
    pub code: &'static str,
    /// Postal abbreviation (`ProvinceAbbreviation`).
    pub abbreviation: &'static str,
    /// English name.
    pub name_en: &'static str,
    /// French name.
    pub name_fr: &'static str,
}

/// A building usage category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct BuildingUsage {
    /// Usage code (`BU_USE`).
    pub code: &'static str,
    /// English description.
    pub description_en: &'static str,
    /// French description.
    pub description_fr: &'static str,
}

const fn province(
    code: &'static str,
    abbreviation: &'static str,
    name_en: &'static str,
    name_fr: &'static str,
) -> Province {
    Province {
        code,
        abbreviation,
        name_en,
        name_fr,
    }
}

const fn usage(
    code: &'static str,
    description_en: &'static str,
    description_fr: &'static str,
) -> BuildingUsage {
    BuildingUsage {
        code,
        description_en,
        description_fr,
    }
}

/// The thirteen provinces and territories, ordered by code.
pub const PROVINCES: [Province; 13] = [
    province("10", "NL", "Newfoundland and Labrador", "Terre-Neuve-et-Labrador"),
    province("11", "PE", "Prince Edward Island", "Île-du-Prince-Édouard"),
    province("12", "NS", "Nova Scotia", "Nouvelle-Écosse"),
    province("13", "NB", "New Brunswick", "Nouveau-Brunswick"),
    province("24", "QC", "Quebec", "Québec"),
    province("35", "ON", "Ontario", "Ontario"),
    province("46", "MB", "Manitoba", "Manitoba"),
    province("47", "SK", "Saskatchewan", "Saskatchewan"),
    province("48", "AB", "Alberta", "Alberta"),
    province("59", "BC", "British Columbia", "Colombie-Britannique"),
    province("60", "YT", "Yukon", "Yukon"),
    province("61", "NT", "Northwest Territories", "Territoires du Nord-Ouest"),
    province("62", "NU", "Nunavut", "Nunavut"),
];

/// Building usage categories, ordered by code.
pub const BUILDING_USAGES: [BuildingUsage; 4] = [
    usage("1", "Residential", "Résidentiel"),
    usage("2", "Partial Residential", "Résidentiel partiel"),
    usage("3", "Non Residential", "Non résidentiel"),
    usage("4", "Unknown", "Inconnu"),
];

/// Look up a province by its two-digit code.
pub fn province_by_code(code: &str) -> Option<&'static Province> {
    let code = code.trim();
    PROVINCES.iter().find(|province| province.code == code)
}

/// Look up a province by its postal abbreviation, ignoring case.
pub fn province_by_abbreviation(abbreviation: &str) -> Option<&'static Province> {
    let abbreviation = abbreviation.trim();
    PROVINCES
        .iter()
        .find(|province| province.abbreviation.eq_ignore_ascii_case(abbreviation))
}

/// Look up a building usage by its code.
pub fn building_usage_by_code(code: &str) -> Option<&'static BuildingUsage> {
    let code = code.trim();
    BUILDING_USAGES.iter().find(|usage| usage.code == code)
}
