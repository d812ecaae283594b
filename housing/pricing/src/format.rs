//! Number formatting for console and dashboard output.

/// Rounds to the nearest integer and groups digits in thousands:
/// `1234567.6` becomes `"1,234,568"`.
#[must_use]
pub fn format_thousands(value: f64) -> String {
    if !value.is_finite() {
        return value.to_string();
    }
    let rounded = value.round();
    let digits = format!("{:.0}", rounded.abs());
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    if rounded < 0.0 {
        grouped.push('-');
    }
    for (idx, digit) in digits.chars().enumerate() {
        if idx > 0 && (digits.len() - idx) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }
    grouped
}

/// Displayed price: `symbol` plus thousands-grouped integer, negatives
/// clamped to zero.
#[must_use]
pub fn format_currency(symbol: &str, value: f64) -> String {
    let shown = if value.is_finite() { value.max(0.0) } else { 0.0 };
    format!("{symbol}{}", format_thousands(shown))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn groups_digits() {
        assert_eq!(format_thousands(0.0), "0");
        assert_eq!(format_thousands(999.4), "999");
        assert_eq!(format_thousands(1000.0), "1,000");
        assert_eq!(format_thousands(1_234_567.6), "1,234,568");
        assert_eq!(format_thousands(-45_000.0), "-45,000");
    }

    #[test]
    fn currency_clamps_negative_estimates() {
        assert_eq!(format_currency("₹", 7_312_345.2), "₹7,312,345");
        assert_eq!(format_currency("₹", -12.0), "₹0");
        assert_eq!(format_currency("$", f64::NAN), "$0");
    }
}
