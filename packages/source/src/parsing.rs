//! Cell parsing for scraper exports.
//!
//! Scraper exports are loosely typed: numbers arrive as JSON numbers or as
//! strings (sometimes with a decimal comma), and empty strings mean
//! "missing". These helpers return `Ok(None)` for missing cells and an
//! error message for cells that are present but unusable.

use outlet_map_location_models::Coordinates;
use serde_json::Value;

/// Collapses runs of whitespace and trims. Non-string scalars are
/// rendered as text; missing cells become the empty string.
#[must_use]
pub fn parse_text(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => collapse_whitespace(s),
        Some(other) => collapse_whitespace(&other.to_string()),
    }
}

#[must_use]
pub fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Parses a float cell. Accepts `4.8` and `4,8`.
///
/// # Errors
///
/// Returns a message if the cell is not a finite number.
pub fn parse_f64(value: Option<&Value>) -> Result<Option<f64>, String> {
    let parsed = match value {
        None | Some(Value::Null) => return Ok(None),
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                return Ok(None);
            }
            trimmed.replace(',', ".").parse::<f64>().ok()
        }
        Some(other) => return Err(format!("expected a number, got {other}")),
    };

    match parsed {
        Some(v) if v.is_finite() => Ok(Some(v)),
        _ => Err(format!("not a finite number: {}", display(value))),
    }
}

/// Parses a non-negative whole count.
///
/// # Errors
///
/// Returns a message if the cell is negative, fractional or too large.
pub fn parse_count(value: Option<&Value>) -> Result<Option<u32>, String> {
    let Some(v) = parse_f64(value)? else {
        return Ok(None);
    };
    if v < 0.0 {
        return Err(format!("count must be non-negative, got {v}"));
    }
    if v.fract() != 0.0 || v > f64::from(u32::MAX) {
        return Err(format!("count must be a whole number, got {v}"));
    }

    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let count = v as u32;
    Ok(Some(count))
}

/// Parses a rating in `[0, 5]`.
///
/// # Errors
///
/// Returns a message if the cell is not a number in range.
pub fn parse_rating(value: Option<&Value>) -> Result<Option<f64>, String> {
    match parse_f64(value)? {
        Some(v) if !(0.0..=5.0).contains(&v) => Err(format!("rating must be within 0-5, got {v}")),
        other => Ok(other),
    }
}

/// Parses a boolean cell (`true/false`, `1/0`, `yes/no`, `да/нет`).
///
/// # Errors
///
/// Returns a message for any other value.
pub fn parse_flag(value: Option<&Value>) -> Result<Option<bool>, String> {
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Bool(b)) => Ok(Some(*b)),
        Some(Value::Number(n)) => match n.as_f64() {
            Some(v) if v == 0.0 => Ok(Some(false)),
            Some(v) if (v - 1.0).abs() < f64::EPSILON => Ok(Some(true)),
            _ => Err(format!("expected 0 or 1, got {n}")),
        },
        Some(Value::String(s)) => match s.trim().to_lowercase().as_str() {
            "" => Ok(None),
            "true" | "1" | "yes" | "да" => Ok(Some(true)),
            "false" | "0" | "no" | "нет" => Ok(Some(false)),
            other => Err(format!("expected a boolean, got {other:?}")),
        },
        Some(other) => Err(format!("expected a boolean, got {other}")),
    }
}

/// Parses a four-digit year.
///
/// # Errors
///
/// Returns a message if the cell is not a whole year between 1800 and 2200.
pub fn parse_year(value: Option<&Value>) -> Result<Option<i32>, String> {
    let Some(v) = parse_f64(value)? else {
        return Ok(None);
    };
    if v.fract() != 0.0 || !(1800.0..=2200.0).contains(&v) {
        return Err(format!("implausible year {v}"));
    }

    #[allow(clippy::cast_possible_truncation)]
    let year = v as i32;
    Ok(Some(year))
}

/// Parses a latitude/longitude cell pair.
///
/// Both missing (or both exactly zero, which scrapers emit for "unknown")
/// yields `Ok(None)`.
///
/// # Errors
///
/// Returns a message if only one side is present, either side does not
/// parse, or the pair is out of range.
pub fn parse_coordinates(
    lat: Option<&Value>,
    lng: Option<&Value>,
) -> Result<Option<Coordinates>, String> {
    let latitude = parse_f64(lat).map_err(|e| format!("latitude: {e}"))?;
    let longitude = parse_f64(lng).map_err(|e| format!("longitude: {e}"))?;

    match (latitude, longitude) {
        (None, None) => Ok(None),
        (Some(la), Some(lo)) if la == 0.0 && lo == 0.0 => Ok(None),
        (Some(la), Some(lo)) => {
            let coordinates = Coordinates::new(la, lo);
            if coordinates.is_valid() {
                Ok(Some(coordinates))
            } else {
                Err(format!("coordinates out of range: ({la}, {lo})"))
            }
        }
        (Some(_), None) => Err("latitude present without longitude".to_string()),
        (None, Some(_)) => Err("longitude present without latitude".to_string()),
    }
}

fn display(value: Option<&Value>) -> String {
    value.map_or_else(String::new, ToString::to_string)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn collapses_whitespace_in_text() {
        let value = json!("  ул.   Ленина,\n 5 ");
        assert_eq!(parse_text(Some(&value)), "ул. Ленина, 5");
        assert_eq!(parse_text(None), "");
        assert_eq!(parse_text(Some(&json!(12))), "12");
    }

    #[test]
    fn parses_decimal_comma() {
        let value = json!("4,8");
        let parsed = parse_f64(Some(&value)).unwrap().unwrap();
        assert!((parsed - 4.8).abs() < f64::EPSILON);
    }

    #[test]
    fn empty_string_is_missing() {
        assert_eq!(parse_f64(Some(&json!("  "))).unwrap(), None);
        assert_eq!(parse_count(Some(&json!(""))).unwrap(), None);
        assert_eq!(parse_flag(Some(&json!(""))).unwrap(), None);
    }

    #[test]
    fn rejects_garbage_numbers() {
        assert!(parse_f64(Some(&json!("abc"))).is_err());
        assert!(parse_f64(Some(&json!(true))).is_err());
        assert!(parse_f64(Some(&json!("NaN"))).is_err());
    }

    #[test]
    fn counts_must_be_non_negative_whole_numbers() {
        assert_eq!(parse_count(Some(&json!("12"))).unwrap(), Some(12));
        assert_eq!(parse_count(Some(&json!(3.0))).unwrap(), Some(3));
        assert!(parse_count(Some(&json!(-1))).is_err());
        assert!(parse_count(Some(&json!(2.5))).is_err());
    }

    #[test]
    fn rating_must_be_in_range() {
        assert_eq!(parse_rating(Some(&json!(5))).unwrap(), Some(5.0));
        assert!(parse_rating(Some(&json!(5.1))).is_err());
        assert!(parse_rating(Some(&json!(-0.5))).is_err());
    }

    #[test]
    fn parses_flag_spellings() {
        assert_eq!(parse_flag(Some(&json!("Да"))).unwrap(), Some(true));
        assert_eq!(parse_flag(Some(&json!("no"))).unwrap(), Some(false));
        assert_eq!(parse_flag(Some(&json!(1))).unwrap(), Some(true));
        assert_eq!(parse_flag(Some(&json!(false))).unwrap(), Some(false));
        assert!(parse_flag(Some(&json!("maybe"))).is_err());
    }

    #[test]
    fn parses_year() {
        assert_eq!(parse_year(Some(&json!("2019"))).unwrap(), Some(2019));
        assert!(parse_year(Some(&json!(19))).is_err());
    }

    #[test]
    fn coordinate_pair_must_be_complete() {
        let lat = json!("55.7558");
        let lng = json!(37.6173);
        let coordinates = parse_coordinates(Some(&lat), Some(&lng)).unwrap().unwrap();
        assert!((coordinates.latitude - 55.7558).abs() < f64::EPSILON);

        assert_eq!(parse_coordinates(None, Some(&Value::Null)).unwrap(), None);
        assert!(parse_coordinates(Some(&lat), None).is_err());
        assert!(parse_coordinates(None, Some(&lng)).is_err());
    }

    #[test]
    fn zero_pair_is_missing_and_out_of_range_is_error() {
        assert_eq!(
            parse_coordinates(Some(&json!(0.0)), Some(&json!(0))).unwrap(),
            None
        );
        assert!(parse_coordinates(Some(&json!(91.0)), Some(&json!(10.0))).is_err());
        assert!(parse_coordinates(Some(&json!("x")), Some(&json!(10.0))).is_err());
    }
}
