//! Spreadsheet row normalization.
//!
//! Import files arrive as loosely-typed cells: numbers as strings, dates in
//! several regional formats or as Excel serial numbers, missing lot numbers.
//! Normalization turns one raw row into a typed [`NormalizedRow`], collecting
//! every problem found instead of stopping at the first, so the preview can
//! show all of a row's errors at once.

use crate::batch::NO_LOT;
use crate::Quantity;
use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};

/// One row as read from the import file, cells still untyped.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawRow {
    /// 1-based row number in the source file, for error reporting
    pub row_index: usize,
    pub code: Option<String>,
    pub description: Option<String>,
    pub quantity: Option<String>,
    pub unit_price: Option<String>,
    pub amount: Option<String>,
    pub lot_number: Option<String>,
    pub expiry: Option<String>,
}

/// A row after normalization, with any problems collected in `errors`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedRow {
    pub row_index: usize,
    pub code: String,
    pub description: String,
    pub quantity: Quantity,
    pub unit_price: Option<f64>,
    pub amount: Option<f64>,
    pub lot_number: String,
    pub expiry_date: Option<NaiveDate>,
    pub errors: Vec<String>,
}

impl NormalizedRow {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// Total value of the row: the stated amount, or quantity times price.
    pub fn amount_or_computed(&self) -> Option<f64> {
        self.amount
            .or_else(|| self.unit_price.map(|price| self.quantity as f64 * price))
    }
}

fn trimmed(cell: &Option<String>) -> Option<&str> {
    cell.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

/// Normalize one raw row. Never fails; problems land in `errors`.
pub fn normalize_row(raw: &RawRow) -> NormalizedRow {
    let mut errors = Vec::new();

    let code = match trimmed(&raw.code) {
        Some(code) => code.to_string(),
        None => {
            errors.push("code is required".to_string());
            String::new()
        }
    };

    let description = match trimmed(&raw.description) {
        Some(description) => description.to_string(),
        None => {
            errors.push("description is required".to_string());
            String::new()
        }
    };

    let quantity = match trimmed(&raw.quantity) {
        Some(cell) => match parse_quantity(cell) {
            Some(quantity) => quantity,
            None => {
                errors.push(format!("invalid quantity: '{cell}'"));
                0
            }
        },
        None => {
            errors.push("quantity is required".to_string());
            0
        }
    };

    let unit_price = match trimmed(&raw.unit_price) {
        Some(cell) => match parse_money(cell) {
            Some(price) => Some(price),
            None => {
                errors.push(format!("invalid unit price: '{cell}'"));
                None
            }
        },
        None => None,
    };

    let amount = match trimmed(&raw.amount) {
        Some(cell) => match parse_money(cell) {
            Some(amount) => Some(amount),
            None => {
                errors.push(format!("invalid amount: '{cell}'"));
                None
            }
        },
        None => None,
    };

    let lot_number = trimmed(&raw.lot_number)
        .map(str::to_string)
        .unwrap_or_else(|| NO_LOT.to_string());

    let expiry_date = match trimmed(&raw.expiry) {
        Some(cell) => match parse_flexible_date(cell) {
            Some(date) => Some(date),
            None => {
                errors.push(format!("invalid expiry date: '{cell}'"));
                None
            }
        },
        None => None,
    };

    NormalizedRow {
        row_index: raw.row_index,
        code,
        description,
        quantity,
        unit_price,
        amount,
        lot_number,
        expiry_date,
        errors,
    }
}

/// Quantities must be non-negative integers; "12.0" style cells are accepted.
fn parse_quantity(cell: &str) -> Option<Quantity> {
    let value: f64 = cell.replace(',', "").parse().ok()?;
    if !value.is_finite() || value < 0.0 || value.fract() != 0.0 {
        return None;
    }
    Some(value as Quantity)
}

/// Monetary cells may carry thousands separators but must be non-negative.
fn parse_money(cell: &str) -> Option<f64> {
    let value: f64 = cell.replace(',', "").parse().ok()?;
    if !value.is_finite() || value < 0.0 {
        return None;
    }
    Some(value)
}

/// Parse a date cell in any of the accepted shapes.
///
/// Tried in order: ISO (`2026-03-31`), day-first with `/` or `-` separators
/// and 2- or 4-digit years (`31/03/2026`, `31-3-26`), and Excel serial
/// numbers (days since 1899-12-30).
pub fn parse_flexible_date(cell: &str) -> Option<NaiveDate> {
    let cell = cell.trim();

    // ISO only when the year comes first; `%Y` alone would also accept
    // day-first cells like "31-3-26" as year 31.
    if cell.len() >= 8 && cell.as_bytes()[4] == b'-' {
        if let Ok(date) = NaiveDate::parse_from_str(cell, "%Y-%m-%d") {
            return Some(date);
        }
    }

    for separator in ['/', '-'] {
        let parts: Vec<&str> = cell.split(separator).collect();
        if parts.len() == 3 {
            if let Some(date) = day_first(&parts) {
                return Some(date);
            }
        }
    }

    if let Ok(serial) = cell.parse::<i64>() {
        return excel_serial_date(serial);
    }

    None
}

fn day_first(parts: &[&str]) -> Option<NaiveDate> {
    let day: u32 = parts[0].trim().parse().ok()?;
    let month: u32 = parts[1].trim().parse().ok()?;
    let year_part = parts[2].trim();
    let mut year: i32 = year_part.parse().ok()?;
    if year_part.len() <= 2 {
        // two-digit years pivot at 50
        year += if year < 50 { 2000 } else { 1900 };
    }
    NaiveDate::from_ymd_opt(year, month, day)
}

/// Excel stores dates as days since 1899-12-30 (its serial 1 is 1900-01-01,
/// with the fictitious 1900 leap day already absorbed by this epoch).
fn excel_serial_date(serial: i64) -> Option<NaiveDate> {
    if !(1..=200_000).contains(&serial) {
        return None;
    }
    let epoch = NaiveDate::from_ymd_opt(1899, 12, 30)?;
    epoch.checked_add_signed(Duration::days(serial))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(code: &str, description: &str, quantity: &str) -> RawRow {
        RawRow {
            row_index: 2,
            code: Some(code.to_string()),
            description: Some(description.to_string()),
            quantity: Some(quantity.to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn minimal_valid_row() {
        let row = normalize_row(&raw("MED-1", "Paracetamol 500mg", "40"));
        assert!(row.is_valid());
        assert_eq!(row.quantity, 40);
        assert_eq!(row.lot_number, NO_LOT);
        assert_eq!(row.expiry_date, None);
    }

    #[test]
    fn collects_all_errors() {
        let row = normalize_row(&RawRow {
            row_index: 5,
            quantity: Some("-3".into()),
            expiry: Some("soon".into()),
            ..Default::default()
        });
        assert!(!row.is_valid());
        assert_eq!(row.errors.len(), 4);
        assert!(row.errors.iter().any(|e| e.contains("code")));
        assert!(row.errors.iter().any(|e| e.contains("description")));
        assert!(row.errors.iter().any(|e| e.contains("quantity")));
        assert!(row.errors.iter().any(|e| e.contains("expiry")));
    }

    #[test]
    fn fractional_quantity_rejected() {
        let row = normalize_row(&raw("MED-1", "Ibuprofen", "2.5"));
        assert!(row.errors.iter().any(|e| e.contains("quantity")));
    }

    #[test]
    fn amount_or_computed() {
        let mut base = raw("MED-1", "Ibuprofen", "10");
        base.unit_price = Some("1.5".into());
        let row = normalize_row(&base);
        assert_eq!(row.amount_or_computed(), Some(15.0));

        base.amount = Some("14.0".into());
        let row = normalize_row(&base);
        assert_eq!(row.amount_or_computed(), Some(14.0));

        let row = normalize_row(&raw("MED-1", "Ibuprofen", "10"));
        assert_eq!(row.amount_or_computed(), None);
    }

    #[test]
    fn iso_dates() {
        assert_eq!(
            parse_flexible_date("2026-03-31"),
            NaiveDate::from_ymd_opt(2026, 3, 31)
        );
    }

    #[test]
    fn day_first_dates() {
        assert_eq!(
            parse_flexible_date("31/03/2026"),
            NaiveDate::from_ymd_opt(2026, 3, 31)
        );
        assert_eq!(
            parse_flexible_date("31-3-26"),
            NaiveDate::from_ymd_opt(2026, 3, 31)
        );
        // two-digit years at the pivot
        assert_eq!(
            parse_flexible_date("1/1/49"),
            NaiveDate::from_ymd_opt(2049, 1, 1)
        );
        assert_eq!(
            parse_flexible_date("1/1/50"),
            NaiveDate::from_ymd_opt(1950, 1, 1)
        );
    }

    #[test]
    fn excel_serial_dates() {
        // 45292 is 2024-01-01
        assert_eq!(
            parse_flexible_date("45292"),
            NaiveDate::from_ymd_opt(2024, 1, 1)
        );
        assert_eq!(parse_flexible_date("0"), None);
        assert_eq!(parse_flexible_date("9999999"), None);
    }

    #[test]
    fn garbage_dates_rejected() {
        assert_eq!(parse_flexible_date("soon"), None);
        assert_eq!(parse_flexible_date("31/13/2026"), None);
        assert_eq!(parse_flexible_date(""), None);
    }

    mod property_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn prop_normalize_never_panics(
                code in ".{0,12}",
                quantity in ".{0,8}",
                expiry in ".{0,12}",
            ) {
                let row = normalize_row(&RawRow {
                    row_index: 1,
                    code: Some(code),
                    description: Some("med".into()),
                    quantity: Some(quantity),
                    expiry: Some(expiry),
                    ..Default::default()
                });
                prop_assert!(row.quantity >= 0);
            }

            #[test]
            fn prop_iso_round_trip(year in 2000i32..2100, month in 1u32..13, day in 1u32..29) {
                let date = NaiveDate::from_ymd_opt(year, month, day).unwrap();
                let cell = date.format("%Y-%m-%d").to_string();
                prop_assert_eq!(parse_flexible_date(&cell), Some(date));
            }
        }
    }
}
