//! Display formatting for prices, GEX magnitudes and percentages (en-US conventions).

use rust_decimal::{Decimal, RoundingStrategy};

/// Grouped number with up to three fraction digits, e.g. `-1,234,567.125`.
pub fn number(value: Decimal) -> String {
    let rounded = value
        .round_dp_with_strategy(3, RoundingStrategy::MidpointAwayFromZero)
        .normalize();
    render(rounded, 0)
}

/// US dollars with exactly two fraction digits, e.g. `-$1,234.50`.
pub fn currency(value: Decimal) -> String {
    let rounded = value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    let body = render(rounded.abs(), 2);
    if rounded.is_sign_negative() && !rounded.is_zero() {
        format!("-${body}")
    } else {
        format!("${body}")
    }
}

/// A value already expressed in percent, e.g. `-0.27` -> `-0.27%`.
///
/// Not a fraction formatter: the value is never multiplied by 100, so quote fields such as
/// `netPercentChange` render as sent. Pass `0.5`, not `0.005`, for half a percent.
pub fn percentage(value: Decimal) -> String {
    let rounded = value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    format!("{}%", render(rounded, 2))
}

/// Compact magnitude for narrow columns, e.g. `1.25M`, `-830K`.
pub fn compact(value: Decimal) -> String {
    let abs = value.abs();
    let (scaled, suffix) = if abs >= Decimal::from(1_000_000_000) {
        (value / Decimal::from(1_000_000_000), "B")
    } else if abs >= Decimal::from(1_000_000) {
        (value / Decimal::from(1_000_000), "M")
    } else if abs >= Decimal::from(1_000) {
        (value / Decimal::from(1_000), "K")
    } else {
        (value, "")
    };

    let digits = if scaled.abs() >= Decimal::from(100) { 0 } else { 2 };
    let rounded = scaled
        .round_dp_with_strategy(digits, RoundingStrategy::MidpointAwayFromZero)
        .normalize();
    format!("{rounded}{suffix}")
}

fn render(value: Decimal, min_fraction_digits: usize) -> String {
    let text = value.abs().to_string();
    let (integer, fraction) = text.split_once('.').unwrap_or((text.as_str(), ""));

    let mut fraction = fraction.to_string();
    while fraction.len() < min_fraction_digits {
        fraction.push('0');
    }

    let mut out = String::new();
    if value.is_sign_negative() && !value.is_zero() {
        out.push('-');
    }
    out.push_str(&group_thousands(integer));
    if !fraction.is_empty() {
        out.push('.');
        out.push_str(&fraction);
    }
    out
}

fn group_thousands(digits: &str) -> String {
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (index, digit) in digits.chars().enumerate() {
        if index > 0 && (digits.len() - index) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }
    grouped
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_number() {
        assert_eq!(number(dec!(0)), "0");
        assert_eq!(number(dec!(999)), "999");
        assert_eq!(number(dec!(1000)), "1,000");
        assert_eq!(number(dec!(-1234567.1254)), "-1,234,567.125");
        assert_eq!(number(dec!(1234.5000)), "1,234.5");
        assert_eq!(number(dec!(0.0004)), "0");
    }

    #[test]
    fn test_currency() {
        assert_eq!(currency(dec!(450.1)), "$450.10");
        assert_eq!(currency(dec!(1234567.005)), "$1,234,567.01");
        assert_eq!(currency(dec!(-12.5)), "-$12.50");
        assert_eq!(currency(dec!(-0.001)), "$0.00");
    }

    #[test]
    fn test_percentage() {
        assert_eq!(percentage(dec!(-0.2749)), "-0.27%");
        assert_eq!(percentage(dec!(1.5)), "1.50%");
        assert_eq!(percentage(dec!(1234.567)), "1,234.57%");
        // Percent units in, not fractions
        assert_eq!(percentage(dec!(0.005)), "0.01%");
        assert_eq!(percentage(dec!(0.5)), "0.50%");
    }

    #[test]
    fn test_compact() {
        assert_eq!(compact(dec!(1250000)), "1.25M");
        assert_eq!(compact(dec!(-830000)), "-830K");
        assert_eq!(compact(dec!(2500000000)), "2.5B");
        assert_eq!(compact(dec!(12.345)), "12.35");
    }
}
