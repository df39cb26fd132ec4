//! Receipt total rounding.
//!
//! Dispensary receipts round the exact total up to the next quarter-quetzal
//! fraction: {.25, .50, .75, 1.00}. An amount that is already exact (zero
//! fractional part) is left untouched.

/// Round a monetary amount up to the next quarter unit.
///
/// The fractional part is first fixed to two decimals so float noise from
/// summing line totals cannot flip a boundary case.
pub fn round_to_quarter(value: f64) -> f64 {
    let whole = value.floor();
    let fraction = ((value - whole) * 100.0).round() / 100.0;

    if fraction == 0.0 {
        return value;
    }

    if fraction <= 0.25 {
        whole + 0.25
    } else if fraction <= 0.50 {
        whole + 0.50
    } else if fraction <= 0.75 {
        whole + 0.75
    } else {
        whole + 1.0
    }
}
