#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Static reference data for the performance dashboard.
//!
//! Districts and performance categories are closed sets. Every stored
//! record points at one [`District`] by id and carries one [`Category`].
//! Neither list changes at runtime.

use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// A police district.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct District {
    /// Stable numeric identifier.
    pub id: u32,
    /// Display name.
    pub name: &'static str,
}

/// Every known district, in reference order.
pub const DISTRICTS: &[District] = &[
    District {
        id: 1,
        name: "Ganjam",
    },
    District {
        id: 2,
        name: "Cuttack",
    },
    District {
        id: 3,
        name: "Bhubaneswar",
    },
    District { id: 4, name: "Puri" },
    District {
        id: 5,
        name: "Sambalpur",
    },
    District {
        id: 6,
        name: "Rourkela",
    },
];

impl District {
    /// Returns every known district.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        DISTRICTS
    }

    /// Looks up a district by id.
    #[must_use]
    pub fn by_id(id: u32) -> Option<&'static Self> {
        DISTRICTS.iter().find(|d| d.id == id)
    }

    /// Looks up a district by name, ignoring case and surrounding
    /// whitespace.
    #[must_use]
    pub fn by_name(name: &str) -> Option<&'static Self> {
        let needle = name.trim().to_lowercase();
        if needle.is_empty() {
            return None;
        }
        DISTRICTS.iter().find(|d| d.name.to_lowercase() == needle)
    }
}

/// Returns the display name for a district id, or `"Unknown"`.
#[must_use]
pub fn district_name(id: u32) -> &'static str {
    District::by_id(id).map_or("Unknown", |d| d.name)
}

/// Performance category tracked per district.
///
/// The string form (serde and [`std::fmt::Display`]) is the stored value,
/// e.g. `"Missing Person"`. Use [`Category::label`] for the display label.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
pub enum Category {
    #[serde(rename = "NBW")]
    #[strum(serialize = "NBW")]
    Nbw,
    Conviction,
    Narcotics,
    #[serde(rename = "Missing Person")]
    #[strum(serialize = "Missing Person")]
    MissingPerson,
    Firearms,
    #[serde(rename = "Sand Mining")]
    #[strum(serialize = "Sand Mining")]
    SandMining,
    #[serde(rename = "Preventive Actions")]
    #[strum(serialize = "Preventive Actions")]
    PreventiveActions,
    #[serde(rename = "Important Detections")]
    #[strum(serialize = "Important Detections")]
    ImportantDetections,
    #[serde(rename = "Heinous Crime Cases")]
    #[strum(serialize = "Heinous Crime Cases")]
    HeinousCrimeCases,
    #[serde(rename = "Property Crime Cases")]
    #[strum(serialize = "Property Crime Cases")]
    PropertyCrimeCases,
    #[serde(rename = "Crime Against Women")]
    #[strum(serialize = "Crime Against Women")]
    CrimeAgainstWomen,
    Cybercrime,
    #[serde(rename = "Road Accidents")]
    #[strum(serialize = "Road Accidents")]
    RoadAccidents,
    Others,
}

impl Category {
    /// Human-readable label shown on cards and exports.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Nbw => "NBW Execution",
            Self::Conviction => "Conviction",
            Self::Narcotics => "Narcotic Seizures",
            Self::MissingPerson => "Missing Persons Traced",
            Self::Firearms => "Firearms Seized",
            Self::SandMining => "Illegal Sand Mining Cases",
            Self::PreventiveActions => "Preventive Actions",
            Self::ImportantDetections => "Important Detections",
            Self::HeinousCrimeCases => "Heinous Crime Cases",
            Self::PropertyCrimeCases => "Property Crime Cases",
            Self::CrimeAgainstWomen => "Crime Against Women",
            Self::Cybercrime => "Cybercrime",
            Self::RoadAccidents => "Road Accidents",
            Self::Others => "Others",
        }
    }

    /// Returns all variants in display order.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[
            Self::Nbw,
            Self::Conviction,
            Self::Narcotics,
            Self::MissingPerson,
            Self::Firearms,
            Self::SandMining,
            Self::PreventiveActions,
            Self::ImportantDetections,
            Self::HeinousCrimeCases,
            Self::PropertyCrimeCases,
            Self::CrimeAgainstWomen,
            Self::Cybercrime,
            Self::RoadAccidents,
            Self::Others,
        ]
    }

    /// Matches a stored value or a label, ignoring case.
    #[must_use]
    pub fn from_value_or_label(input: &str) -> Option<Self> {
        let needle = input.trim();
        Self::all().iter().copied().find(|c| {
            c.as_ref().eq_ignore_ascii_case(needle) || c.label().eq_ignore_ascii_case(needle)
        })
    }
}

/// Language a generated report is written or spoken in.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
pub enum Language {
    #[default]
    #[serde(rename = "en")]
    #[strum(serialize = "en")]
    English,
    #[serde(rename = "or")]
    #[strum(serialize = "or")]
    Odia,
}

impl Language {
    /// Language name as used in prompts.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::English => "English",
            Self::Odia => "Odia",
        }
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr as _;

    use super::*;

    #[test]
    fn district_lookup_ignores_case_and_whitespace() {
        assert_eq!(District::by_name("  ganjam ").map(|d| d.id), Some(1));
        assert_eq!(District::by_name("ROURKELA").map(|d| d.id), Some(6));
        assert!(District::by_name("Unknown County").is_none());
        assert!(District::by_name("").is_none());
    }

    #[test]
    fn district_ids_are_unique() {
        for (i, a) in DISTRICTS.iter().enumerate() {
            for b in &DISTRICTS[i + 1..] {
                assert_ne!(a.id, b.id, "{} and {} share an id", a.name, b.name);
            }
        }
    }

    #[test]
    fn category_string_form_is_stored_value() {
        assert_eq!(Category::MissingPerson.to_string(), "Missing Person");
        assert_eq!(Category::from_str("NBW").unwrap(), Category::Nbw);
        assert!(Category::from_str("nbw").is_err());
        assert_eq!(
            serde_json::to_string(&Category::SandMining).unwrap(),
            "\"Sand Mining\""
        );
    }

    #[test]
    fn category_matches_labels_case_insensitively() {
        assert_eq!(
            Category::from_value_or_label("narcotic seizures"),
            Some(Category::Narcotics)
        );
        assert_eq!(
            Category::from_value_or_label("cybercrime"),
            Some(Category::Cybercrime)
        );
        assert_eq!(Category::from_value_or_label("Traffic"), None);
    }

    #[test]
    fn every_category_parses_from_its_display_form() {
        for category in Category::all() {
            assert_eq!(
                Category::from_str(&category.to_string()).unwrap(),
                *category
            );
        }
    }

    #[test]
    fn language_codes() {
        assert_eq!(Language::Odia.as_ref(), "or");
        assert_eq!(Language::from_str("en").unwrap(), Language::English);
    }
}
