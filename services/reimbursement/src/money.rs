//! Money parsing and display
//!
//! Amounts travel through the service as an exact number of cents held in an
//! `i64`. User input is parsed with decimal arithmetic and only accepted when
//! scaling it by 100 loses nothing.

use regex::Regex;
use rust_decimal::{Decimal, prelude::ToPrimitive};
use std::sync::OnceLock;

use crate::error::{ErsError, ErsResult};

/// Parse a user supplied dollar amount into cents
///
/// Accepts an optional sign, an integer part, an optional fractional
/// part and an optional exponent (`"12"`, `".5"`, `"12."`, `"1.5e2"`).
/// Trailing zeros in the fraction are exact and therefore allowed
/// (`"897.0000000"`).
pub fn parse_money(input: &str) -> ErsResult<i64> {
    if input.is_empty() {
        return Err(ErsError::InvalidAmount("No amount entered".to_string()));
    }

    static MONEY_REGEX: OnceLock<Regex> = OnceLock::new();
    let regex = MONEY_REGEX.get_or_init(|| {
        Regex::new(r"^([+-])?([0-9]*)(?:\.([0-9]*))?(?:[eE]([+-]?[0-9]+))?$")
            .expect("Failed to compile money regex")
    });

    let captures = regex
        .captures(input)
        .ok_or_else(|| ErsError::InvalidAmount("Invalid amount".to_string()))?;

    let negative = captures.get(1).is_some_and(|sign| sign.as_str() == "-");
    let integer = captures.get(2).map_or("", |m| m.as_str());
    let fraction = captures.get(3).map_or("", |m| m.as_str());

    if integer.is_empty() && fraction.is_empty() {
        return Err(ErsError::InvalidAmount("Invalid amount".to_string()));
    }

    let (integer, fraction) = match captures.get(4) {
        Some(exponent) => shift_point(integer, fraction, exponent.as_str())?,
        None => (integer.to_string(), fraction.to_string()),
    };

    let fraction = fraction.trim_end_matches('0');
    if fraction.len() > 2 {
        return Err(ErsError::InvalidAmount(
            "Amount cannot have more than 2 decimal places".to_string(),
        ));
    }

    let integer = if integer.is_empty() { "0" } else { integer.as_str() };
    let canonical = if fraction.is_empty() {
        integer.to_string()
    } else {
        format!("{}.{}", integer, fraction)
    };

    let value = Decimal::from_str_exact(&canonical)
        .map_err(|_| ErsError::InvalidAmount("Amount is too large".to_string()))?;

    if negative && !value.is_zero() {
        return Err(ErsError::InvalidAmount(
            "Amount must not be negative".to_string(),
        ));
    }

    let cents = value
        .checked_mul(Decimal::ONE_HUNDRED)
        .ok_or_else(|| ErsError::InvalidAmount("Amount is too large".to_string()))?;

    if !cents.fract().is_zero() {
        return Err(ErsError::InvalidAmount(
            "Amount cannot have more than 2 decimal places".to_string(),
        ));
    }

    cents
        .to_i64()
        .ok_or_else(|| ErsError::InvalidAmount("Amount is too large".to_string()))
}

/// Largest decimal point position that can still fit in `i64` cents
const MAX_POINT: i64 = 20;

/// Apply a base ten exponent to `integer.fraction`
///
/// Works on the significant digits only, so the result stays short no
/// matter how large the exponent is.
fn shift_point(integer: &str, fraction: &str, exponent: &str) -> ErsResult<(String, String)> {
    let digits = format!("{}{}", integer, fraction);
    let significant = digits.trim_start_matches('0').trim_end_matches('0');
    if significant.is_empty() {
        return Ok((String::new(), String::new()));
    }

    let exponent = match exponent.parse::<i64>() {
        Ok(exponent) => exponent,
        Err(_) if exponent.starts_with('-') => i64::MIN,
        Err(_) => i64::MAX,
    };

    // Position of the point measured from the first significant digit
    let leading_zeros = (digits.len() - digits.trim_start_matches('0').len()) as i64;
    let point = (integer.len() as i64 - leading_zeros).saturating_add(exponent);
    let len = significant.len() as i64;

    if point > MAX_POINT {
        return Err(ErsError::InvalidAmount("Amount is too large".to_string()));
    }
    if len.saturating_sub(point) > 2 {
        return Err(ErsError::InvalidAmount(
            "Amount cannot have more than 2 decimal places".to_string(),
        ));
    }

    Ok(if point >= len {
        (
            format!("{}{}", significant, "0".repeat((point - len) as usize)),
            String::new(),
        )
    } else if point <= 0 {
        (
            String::new(),
            format!("{}{}", "0".repeat(-point as usize), significant),
        )
    } else {
        let (whole, part) = significant.split_at(point as usize);
        (whole.to_string(), part.to_string())
    })
}

/// Render cents as `$D.CC`
pub fn format_cents(cents: i64) -> String {
    let sign = if cents < 0 { "-" } else { "" };
    let magnitude = cents.unsigned_abs();
    format!("{}${}.{:02}", sign, magnitude / 100, magnitude % 100)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_invalid(input: &str) {
        match parse_money(input) {
            Err(ErsError::InvalidAmount(_)) => {}
            other => panic!("expected InvalidAmount for {:?}, got {:?}", input, other),
        }
    }

    #[test]
    fn test_parse_money_accepts_valid_amounts() {
        let cases = [
            ("123.23", 12323),
            ("0.01", 1),
            ("1", 100),
            ("0.2", 20),
            ("897.0000000", 89700),
            ("0.0", 0),
            (".5", 50),
            ("12.", 1200),
            ("+3.10", 310),
            ("-0", 0),
            ("1e2", 10000),
            ("1E-2", 1),
            ("1.5e1", 1500),
            ("0.00123e3", 123),
            ("12300e-4", 123),
            ("+2.5E+0", 250),
            ("0e999", 0),
            ("9.2233720368547758e16", 9223372036854775800),
        ];

        for (input, expected) in cases {
            assert_eq!(parse_money(input).unwrap(), expected, "input {:?}", input);
        }
    }

    #[test]
    fn test_parse_money_rejects_invalid_amounts() {
        for input in [
            "",
            "123.345",
            "-12",
            "-0.01",
            "999999999999999999",
            "123a",
            "123.23.",
            ".",
            "+",
            " 12",
            "1,000",
            "1_000",
            "e2",
            "1e",
            "1e+",
            ".e1",
            "1e2.5",
        ] {
            assert_invalid(input);
        }
    }

    #[test]
    fn test_parse_money_range_boundary() {
        assert_eq!(parse_money("92233720368547758.07").unwrap(), i64::MAX);
        assert_invalid("92233720368547758.08");
        assert_invalid("100000000000000000000000000000000");
    }

    #[test]
    fn test_parse_money_exponent_limits() {
        let message = |input: &str| parse_money(input).unwrap_err().to_string();

        assert!(message("1e-3").contains("2 decimal places"));
        assert!(message("1e17").contains("too large"));
        assert!(message("1e40").contains("too large"));
        assert!(message("1e99999999999999999999").contains("too large"));
        assert!(message("1e-99999999999999999999").contains("2 decimal places"));
        assert!(message("-1e2").contains("negative"));
        assert_eq!(parse_money("-0e5").unwrap(), 0);
    }

    #[test]
    fn test_parse_money_messages_name_the_rule() {
        let message = |input: &str| parse_money(input).unwrap_err().to_string();

        assert!(message("").contains("No amount"));
        assert!(message("-5").contains("negative"));
        assert!(message("1.234").contains("2 decimal places"));
        assert!(message("999999999999999999").contains("too large"));
    }

    #[test]
    fn test_format_cents() {
        assert_eq!(format_cents(12323), "$123.23");
        assert_eq!(format_cents(1), "$0.01");
        assert_eq!(format_cents(100), "$1.00");
        assert_eq!(format_cents(0), "$0.00");
        assert_eq!(format_cents(-250), "-$2.50");
    }

    #[test]
    fn test_formatted_amounts_parse_back() {
        for cents in [0, 1, 9, 10, 99, 100, 101, 12323, 1_000_000_07, i64::MAX] {
            let rendered = format_cents(cents);
            let reparsed = parse_money(rendered.trim_start_matches('$')).unwrap();
            assert_eq!(reparsed, cents, "round trip of {}", rendered);
        }
    }
}
