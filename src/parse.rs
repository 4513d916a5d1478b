//! Fixed-format parser for measurement values.
//!
//! Values look like `-?D(D).D`: an optional minus, one or two integer digits
//! (three under [`ValueFormat::Extended`]), a decimal point and exactly one
//! fractional digit. Anything else is rejected. There is no exponent, no `+`
//! and no multi-digit fraction, which keeps the per-value work to a handful of
//! branches.

use thiserror::Error;

/// Accepted width of the integer part.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ValueFormat {
    /// `-?\d{1,2}\.\d`
    #[default]
    Standard,
    /// `-?\d{1,3}\.\d`, for datasets whose range reaches three integer digits.
    Extended,
}

impl ValueFormat {
    #[inline]
    pub const fn max_integer_digits(self) -> usize {
        match self {
            ValueFormat::Standard => 2,
            ValueFormat::Extended => 3,
        }
    }
}

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueError {
    #[error("empty value")]
    Empty,
    #[error("no integer digits before the decimal point")]
    MissingInteger,
    #[error("too many integer digits")]
    TooManyIntegerDigits,
    #[error("missing decimal point")]
    MissingDecimalPoint,
    #[error("expected exactly one fractional digit")]
    BadFraction,
    #[error("unexpected byte")]
    InvalidByte,
}

/// Parses a value into tenths, e.g. `b"-12.3"` into `-123`.
#[inline]
pub fn parse_tenths(bytes: &[u8], format: ValueFormat) -> Result<i64, ValueError> {
    let (negative, digits) = match bytes.split_first() {
        None => return Err(ValueError::Empty),
        Some((b'-', rest)) => (true, rest),
        Some(_) => (false, bytes),
    };

    let len = digits.len();
    if len == 0 {
        return Err(ValueError::Empty);
    }
    if len < 2 || digits[len - 2] != b'.' {
        return Err(classify_shape(digits));
    }

    let integer = &digits[..len - 2];
    if integer.is_empty() {
        return Err(ValueError::MissingInteger);
    }
    if integer.len() > format.max_integer_digits() {
        return Err(ValueError::TooManyIntegerDigits);
    }

    let mut tenths = 0i64;
    for &b in integer {
        tenths = tenths * 10 + digit(b)?;
    }
    tenths = tenths * 10 + digit(digits[len - 1])?;

    Ok(if negative { -tenths } else { tenths })
}

/// Parses a value into an `f64`.
///
/// The tenths are divided once, so the result is the nearest `f64` to the
/// decimal value, the same answer a general-purpose float parser gives.
#[inline]
pub fn parse_value(bytes: &[u8], format: ValueFormat) -> Result<f64, ValueError> {
    parse_tenths(bytes, format).map(tenths_to_f64)
}

#[inline]
pub fn tenths_to_f64(tenths: i64) -> f64 {
    tenths as f64 / 10.0
}

#[inline]
fn digit(b: u8) -> Result<i64, ValueError> {
    if b.is_ascii_digit() {
        Ok((b - b'0') as i64)
    } else {
        Err(ValueError::InvalidByte)
    }
}

// Only reached on the error path.
#[cold]
fn classify_shape(digits: &[u8]) -> ValueError {
    if digits.contains(&b'.') {
        ValueError::BadFraction
    } else if digits.iter().all(u8::is_ascii_digit) {
        ValueError::MissingDecimalPoint
    } else {
        ValueError::InvalidByte
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn parses_in_grammar_values() {
        let f = ValueFormat::Standard;
        assert_eq!(parse_tenths(b"0.0", f), Ok(0));
        assert_eq!(parse_tenths(b"5.1", f), Ok(51));
        assert_eq!(parse_tenths(b"-5.1", f), Ok(-51));
        assert_eq!(parse_tenths(b"23.4", f), Ok(234));
        assert_eq!(parse_tenths(b"-99.9", f), Ok(-999));
        assert_eq!(parse_value(b"-5.5", f), Ok(-5.5));
        assert_eq!(parse_value(b"1.0", f), Ok(1.0));
    }

    #[test]
    fn rejects_out_of_grammar_values() {
        let f = ValueFormat::Standard;
        assert_eq!(parse_tenths(b"", f), Err(ValueError::Empty));
        assert_eq!(parse_tenths(b"-", f), Err(ValueError::Empty));
        assert_eq!(parse_tenths(b"xx", f), Err(ValueError::InvalidByte));
        assert_eq!(parse_tenths(b"12", f), Err(ValueError::MissingDecimalPoint));
        assert_eq!(parse_tenths(b"1.", f), Err(ValueError::BadFraction));
        assert_eq!(parse_tenths(b"1.23", f), Err(ValueError::BadFraction));
        assert_eq!(parse_tenths(b".5", f), Err(ValueError::MissingInteger));
        assert_eq!(parse_tenths(b"100.0", f), Err(ValueError::TooManyIntegerDigits));
        assert_eq!(parse_tenths(b"+1.0", f), Err(ValueError::InvalidByte));
        assert_eq!(parse_tenths(b"1e.1", f), Err(ValueError::InvalidByte));
        assert_eq!(parse_tenths(b"--1.0", f), Err(ValueError::InvalidByte));
        assert_eq!(parse_tenths(b"1.x", f), Err(ValueError::InvalidByte));
    }

    #[test]
    fn extended_format_accepts_three_integer_digits() {
        assert_eq!(parse_tenths(b"100.0", ValueFormat::Extended), Ok(1000));
        assert_eq!(parse_tenths(b"-123.4", ValueFormat::Extended), Ok(-1234));
        assert_eq!(
            parse_tenths(b"1000.0", ValueFormat::Extended),
            Err(ValueError::TooManyIntegerDigits)
        );
    }

    proptest! {
        #[test]
        fn matches_reference_float_parser(s in "-?[0-9]{1,2}\\.[0-9]") {
            let ours = parse_value(s.as_bytes(), ValueFormat::Standard).unwrap();
            let reference: f64 = fast_float::parse(&s).unwrap();
            // Tenths carry no sign of zero, so compare values rather than bits.
            prop_assert_eq!(ours, reference);
        }

        #[test]
        fn formatting_round_trips(s in "-?[0-9]{1,3}\\.[0-9]") {
            let first = parse_value(s.as_bytes(), ValueFormat::Extended).unwrap();
            let formatted = format!("{first:.1}");
            let second = parse_value(formatted.as_bytes(), ValueFormat::Extended).unwrap();
            prop_assert_eq!(first.to_bits(), second.to_bits());
        }
    }
}
