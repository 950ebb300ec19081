//! Column alias resolution.
//!
//! Uploaded files name their columns loosely (`District`, `districtName`,
//! `cases_registered`, ...). [`ColumnMap::resolve`] matches a batch's
//! headers against the alias table once, and rows are then read through the
//! resulting map.

use std::collections::BTreeMap;

use crate::value::{RawRow, RawValue};

/// Canonical fields a raw row can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Field {
    District,
    DistrictId,
    Date,
    Category,
    CasesRegistered,
    CasesSolved,
    /// Single count from the superseded schema.
    Value,
}

impl Field {
    /// Column name used when writing this field.
    #[must_use]
    pub const fn header(self) -> &'static str {
        match self {
            Self::District => "District",
            Self::DistrictId => "District Id",
            Self::Date => "Date",
            Self::Category => "Category",
            Self::CasesRegistered => "Cases Registered",
            Self::CasesSolved => "Cases Solved",
            Self::Value => "Value",
        }
    }
}

/// Canonical field to accepted header spellings.
pub const ALIASES: &[(Field, &[&str])] = &[
    (Field::District, &["district", "districtName", "district name"]),
    (Field::DistrictId, &["districtId", "district id"]),
    (Field::Date, &["date", "reportDate", "period"]),
    (Field::Category, &["category", "categoryName"]),
    (
        Field::CasesRegistered,
        &["cases registered", "casesRegistered", "registered"],
    ),
    (Field::CasesSolved, &["cases solved", "casesSolved", "solved"]),
    (Field::Value, &["value"]),
];

/// Lowercases and drops whitespace, `_` and `-` so that `Cases Registered`,
/// `cases_registered` and `casesRegistered` compare equal.
fn header_key(header: &str) -> String {
    header
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '_' && *c != '-')
        .flat_map(char::to_lowercase)
        .collect()
}

fn field_for_header(header: &str) -> Option<Field> {
    let key = header_key(header);
    ALIASES
        .iter()
        .find(|(_, synonyms)| synonyms.iter().any(|s| header_key(s) == key))
        .map(|(field, _)| *field)
}

/// Headers of one batch resolved to canonical fields.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColumnMap {
    columns: BTreeMap<Field, Vec<String>>,
}

impl ColumnMap {
    /// Resolves every distinct header in `rows`.
    #[must_use]
    pub fn resolve<'a>(rows: impl IntoIterator<Item = &'a RawRow>) -> Self {
        let mut columns: BTreeMap<Field, Vec<String>> = BTreeMap::new();
        for row in rows {
            for header in row.keys() {
                let Some(field) = field_for_header(header) else {
                    continue;
                };
                let headers = columns.entry(field).or_default();
                if !headers.iter().any(|h| h == header) {
                    headers.push(header.to_string());
                }
            }
        }
        Self { columns }
    }

    /// Whether any header resolved to `field`.
    #[must_use]
    pub fn has(&self, field: Field) -> bool {
        self.columns.contains_key(&field)
    }

    /// First non-blank value for `field` in `row`.
    #[must_use]
    pub fn get<'a>(&self, row: &'a RawRow, field: Field) -> Option<&'a RawValue> {
        self.columns
            .get(&field)?
            .iter()
            .filter_map(|header| row.get(header))
            .find(|value| !value.is_blank())
    }
}
