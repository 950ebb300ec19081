//! Category resolution.
//!
//! Spreadsheets and manual entry are expected to carry the exact stored
//! value (`"NBW"`, `"Missing Person"`, ...). AI extraction sometimes returns
//! labels or free text instead, so anything that is not an exact value or
//! label goes through keyword classification and falls back to
//! [`Category::Others`].

use std::str::FromStr as _;

use police_perf_district_models::Category;

/// Resolves a raw category string. Returns `None` only for blank input.
#[must_use]
pub fn resolve_category(raw: &str) -> Option<Category> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    if let Ok(category) = Category::from_str(trimmed) {
        return Some(category);
    }
    if let Some(category) = Category::from_value_or_label(trimmed) {
        return Some(category);
    }
    let mapped = map_category_keywords(trimmed);
    log::debug!("Mapped free-text category {trimmed:?} to {mapped}");
    Some(mapped)
}

/// Keyword classification for free-text category names.
#[must_use]
pub fn map_category_keywords(raw: &str) -> Category {
    let lower = raw.to_lowercase();

    if contains_any(&lower, &["nbw", "warrant"]) {
        return Category::Nbw;
    }
    if lower.contains("convict") {
        return Category::Conviction;
    }
    if contains_any(&lower, &["missing", "traced", "kidnap"]) {
        return Category::MissingPerson;
    }
    if contains_any(&lower, &["firearm", "arms act", "pistol", "gun", "weapon"]) {
        return Category::Firearms;
    }
    if lower.contains("sand") {
        return Category::SandMining;
    }
    if contains_any(
        &lower,
        &["narcotic", "ndps", "ganja", "drug", "heroin", "brown sugar"],
    ) {
        return Category::Narcotics;
    }
    if contains_any(&lower, &["cyber", "online fraud", "otp"]) {
        return Category::Cybercrime;
    }
    if contains_any(&lower, &["women", "woman", "dowry", "molest"]) {
        return Category::CrimeAgainstWomen;
    }
    if contains_any(&lower, &["heinous", "murder", "dacoity", "robbery"]) {
        return Category::HeinousCrimeCases;
    }
    if contains_any(&lower, &["property", "theft", "burglary", "house breaking"]) {
        return Category::PropertyCrimeCases;
    }
    if contains_any(&lower, &["road", "accident", "traffic"]) {
        return Category::RoadAccidents;
    }
    if contains_any(&lower, &["preventive", "prevention"]) {
        return Category::PreventiveActions;
    }
    if lower.contains("detect") {
        return Category::ImportantDetections;
    }

    Category::Others
}

fn contains_any(haystack: &str, needles: &[&str]) -> bool {
    needles.iter().any(|n| haystack.contains(n))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_values_resolve() {
        for category in Category::all() {
            assert_eq!(resolve_category(category.as_ref()), Some(*category));
        }
    }

    #[test]
    fn labels_resolve() {
        assert_eq!(
            resolve_category("Illegal Sand Mining Cases"),
            Some(Category::SandMining)
        );
        assert_eq!(
            resolve_category("missing persons traced"),
            Some(Category::MissingPerson)
        );
    }

    #[test]
    fn free_text_is_classified() {
        assert_eq!(map_category_keywords("Warrants executed"), Category::Nbw);
        assert_eq!(map_category_keywords("Ganja seized (kg)"), Category::Narcotics);
        assert_eq!(
            map_category_keywords("Online fraud complaints"),
            Category::Cybercrime
        );
        assert_eq!(map_category_keywords("Dowry cases"), Category::CrimeAgainstWomen);
        assert_eq!(map_category_keywords("Fatal road mishaps"), Category::RoadAccidents);
    }

    #[test]
    fn unknown_text_falls_back_to_others() {
        assert_eq!(resolve_category("Miscellaneous"), Some(Category::Others));
    }

    #[test]
    fn blank_is_missing() {
        assert_eq!(resolve_category("   "), None);
    }
}
