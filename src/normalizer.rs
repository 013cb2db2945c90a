//! Cell normalization for the exchange's history tables.
//!
//! Numbers are parsed best-effort: anything that does not read as a finite
//! number becomes [`NUMERIC_FALLBACK`] and the row is kept. Dates are not
//! coerced; a cell that does not match the expected pattern yields `None` and
//! the caller drops the row.

use chrono::NaiveDate;

/// Date pattern used by the symbol history table (`MM/DD/YYYY`)
pub const MSE_DATE_FORMAT: &str = "%m/%d/%Y";

/// Value substituted for any numeric cell that cannot be parsed
pub const NUMERIC_FALLBACK: f64 = 0.0;

/// Parse a numeric cell, tolerating thousands separators and percent signs
pub fn parse_number(value: Option<&str>) -> f64 {
    let Some(raw) = value else {
        return NUMERIC_FALLBACK;
    };

    let cleaned: String = raw
        .trim()
        .chars()
        .filter(|c| *c != ',' && *c != '%' && !c.is_whitespace())
        .collect();

    if cleaned.is_empty() {
        return NUMERIC_FALLBACK;
    }

    match cleaned.parse::<f64>() {
        Ok(number) if number.is_finite() => number,
        _ => NUMERIC_FALLBACK,
    }
}

/// Share counts are published as plain numbers; truncate toward zero
pub fn to_volume(value: f64) -> i64 {
    value.trunc() as i64
}

/// Parse a date cell under `pattern`
pub fn parse_date(value: &str, pattern: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), pattern).ok()
}

pub fn clean_symbol(symbol: &str) -> String {
    symbol.trim().to_uppercase()
}
