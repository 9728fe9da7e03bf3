//! Operator classification.
//!
//! Maps a storefront display name to its [`OperatorLabel`] with
//! case-insensitive keyword matching. Own-brand keywords are checked first,
//! so a name mentioning both the own brand and a competitor is own-brand.
//! Every analysis goes through [`operator_of`] instead of re-deriving the
//! label.

use outlet_map_location_models::{LocationRecord, LocationTable, OperatorLabel};

/// Keyword sets in match order. First match wins.
const RULES: &[(OperatorLabel, &[&str])] = &[
    (OperatorLabel::OwnBrand, &["tele2", "т2"]),
    (OperatorLabel::Mts, &["мтс", "mts"]),
    (OperatorLabel::Beeline, &["билайн", "beeline"]),
    (OperatorLabel::Megafon, &["мегафон", "megafon"]),
];

/// Classifies a display name. Total: unknown and empty names are
/// [`OperatorLabel::Other`].
#[must_use]
pub fn classify_operator(name: &str) -> OperatorLabel {
    let lower = name.to_lowercase();

    RULES
        .iter()
        .find(|(_, keywords)| contains_any(&lower, keywords))
        .map_or(OperatorLabel::Other, |(label, _)| *label)
}

/// Returns the stored label of a record, classifying its name when the
/// label has not been assigned yet.
#[must_use]
pub fn operator_of(record: &LocationRecord) -> OperatorLabel {
    record
        .operator
        .unwrap_or_else(|| classify_operator(&record.name))
}

#[must_use]
pub fn is_own_brand(record: &LocationRecord) -> bool {
    operator_of(record).is_own_brand()
}

/// Assigns the operator label of every record in place.
pub fn classify_table(table: &mut LocationTable) {
    for record in &mut table.records {
        record.operator = Some(classify_operator(&record.name));
    }

    log::debug!("Classified {} records by operator", table.records.len());
}

/// Sub-view with only own-brand rows.
#[must_use]
pub fn own_brand_rows(table: &LocationTable) -> LocationTable {
    table.filter(is_own_brand)
}

fn contains_any(haystack: &str, needles: &[&str]) -> bool {
    needles.iter().any(|needle| haystack.contains(needle))
}
