use std::fmt;

use serde::{Deserialize, Serialize};

use super::node::Comparator;

/// Supported value types in an evaluation record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    /// A 64-bit signed integer.
    Int(i64),
    /// A 64-bit floating-point number.
    Float(f64),
    /// A boolean value.
    Bool(bool),
    /// A UTF-8 string.
    String(String),
}

impl Value {
    /// Compare this value against a rule literal.
    ///
    /// `>` and `<` are numeric: the literal is read with a leading-number scan
    /// (`"30"` and `"30abc"` both read as 30) and this value is coerced to a
    /// number. Anything that does not yield a number compares false.
    ///
    /// `=` is textual: only a `String` value equal to the literal matches.
    /// Numbers never equal a literal, even one with the same digits.
    #[must_use]
    pub fn compare(&self, comparator: Comparator, literal: &str) -> bool {
        match comparator {
            Comparator::Eq => matches!(self, Value::String(s) if s == literal),
            Comparator::Gt | Comparator::Lt => {
                let (Some(lhs), Some(rhs)) = (self.as_number(), parse_float_prefix(literal))
                else {
                    return false;
                };
                // NaN on either side compares false for both operators
                if comparator == Comparator::Gt {
                    lhs > rhs
                } else {
                    lhs < rhs
                }
            }
        }
    }

    /// Numeric view of this value. Booleans read as 1/0, strings must be a
    /// complete decimal number (surrounding whitespace allowed).
    #[allow(clippy::cast_precision_loss)]
    #[must_use]
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Int(v) => Some(*v as f64),
            Value::Float(v) => Some(*v),
            Value::Bool(v) => Some(if *v { 1.0 } else { 0.0 }),
            Value::String(s) => {
                let trimmed = s.trim();
                if trimmed.is_empty() || numeric_prefix_len(trimmed) != trimmed.len() {
                    return None;
                }
                trimmed.parse().ok()
            }
        }
    }
}

/// Read the longest numeric prefix of `text`, ignoring leading whitespace.
/// Returns `None` when no digits lead the string.
pub(crate) fn parse_float_prefix(text: &str) -> Option<f64> {
    let s = text.trim_start();
    match numeric_prefix_len(s) {
        0 => None,
        len => s[..len].parse().ok(),
    }
}

fn numeric_prefix_len(s: &str) -> usize {
    let bytes = s.as_bytes();
    let mut i = usize::from(matches!(bytes.first(), Some(b'+' | b'-')));

    if s[i..].starts_with("Infinity") {
        return i + "Infinity".len();
    }

    let int_digits = count_digits(&bytes[i..]);
    i += int_digits;

    let mut frac_digits = 0;
    if bytes.get(i) == Some(&b'.') {
        frac_digits = count_digits(&bytes[i + 1..]);
        if int_digits + frac_digits > 0 {
            i += 1 + frac_digits;
        }
    }
    if int_digits + frac_digits == 0 {
        return 0;
    }

    if matches!(bytes.get(i), Some(b'e' | b'E')) {
        let mut j = i + 1;
        if matches!(bytes.get(j), Some(b'+' | b'-')) {
            j += 1;
        }
        let exp_digits = count_digits(&bytes[j.min(bytes.len())..]);
        if exp_digits > 0 {
            i = j + exp_digits;
        }
    }

    i
}

fn count_digits(bytes: &[u8]) -> usize {
    bytes.iter().take_while(|b| b.is_ascii_digit()).count()
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_owned())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(v)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(v) => write!(f, "{v}"),
            Value::Float(v) => write!(f, "{v}"),
            Value::Bool(v) => write!(f, "{v}"),
            Value::String(v) => write!(f, "\"{v}\""),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_conversions() {
        assert_eq!(Value::from(42_i64), Value::Int(42));
        assert_eq!(Value::from(2.5_f64), Value::Float(2.5));
        assert_eq!(Value::from(true), Value::Bool(true));
        assert_eq!(Value::from("hello"), Value::String("hello".to_owned()));
        assert_eq!(
            Value::from("owned".to_owned()),
            Value::String("owned".to_owned())
        );
    }

    #[test]
    fn display() {
        assert_eq!(Value::Int(42).to_string(), "42");
        assert_eq!(Value::Float(2.5).to_string(), "2.5");
        assert_eq!(Value::Bool(true).to_string(), "true");
        assert_eq!(Value::String("hello".into()).to_string(), "\"hello\"");
    }

    #[test]
    fn float_prefix() {
        assert_eq!(parse_float_prefix("30"), Some(30.0));
        assert_eq!(parse_float_prefix("30abc"), Some(30.0));
        assert_eq!(parse_float_prefix("  2.5"), Some(2.5));
        assert_eq!(parse_float_prefix("5e3"), Some(5000.0));
        assert_eq!(parse_float_prefix("5e"), Some(5.0));
        assert_eq!(parse_float_prefix("-7"), Some(-7.0));
        assert_eq!(parse_float_prefix(".5"), Some(0.5));
        assert_eq!(parse_float_prefix("Infinity"), Some(f64::INFINITY));
        assert_eq!(parse_float_prefix("Sales"), None);
        assert_eq!(parse_float_prefix("."), None);
        assert_eq!(parse_float_prefix("-"), None);
        assert_eq!(parse_float_prefix(""), None);
    }

    #[test]
    fn as_number_coercion() {
        assert_eq!(Value::Int(3).as_number(), Some(3.0));
        assert_eq!(Value::Float(1.5).as_number(), Some(1.5));
        assert_eq!(Value::Bool(true).as_number(), Some(1.0));
        assert_eq!(Value::Bool(false).as_number(), Some(0.0));
        assert_eq!(Value::from(" 42 ").as_number(), Some(42.0));
        assert_eq!(Value::from("42abc").as_number(), None);
        assert_eq!(Value::from("").as_number(), None);
        assert_eq!(Value::from("Sales").as_number(), None);
    }

    #[test]
    fn compare_numeric() {
        let age = Value::Int(35);
        assert!(age.compare(Comparator::Gt, "30"));
        assert!(!age.compare(Comparator::Lt, "30"));
        assert!(!age.compare(Comparator::Gt, "35"));
        assert!(Value::Float(29.5).compare(Comparator::Lt, "30"));
        assert!(Value::from("40").compare(Comparator::Gt, "30"));
    }

    #[test]
    fn compare_non_numeric_literal_is_false() {
        let age = Value::Int(35);
        assert!(!age.compare(Comparator::Gt, "Sales"));
        assert!(!age.compare(Comparator::Lt, "Sales"));
    }

    #[test]
    fn compare_non_numeric_value_is_false() {
        let dept = Value::from("Sales");
        assert!(!dept.compare(Comparator::Gt, "1"));
        assert!(!dept.compare(Comparator::Lt, "1"));
    }

    #[test]
    fn compare_nan_is_false() {
        let nan = Value::Float(f64::NAN);
        assert!(!nan.compare(Comparator::Gt, "0"));
        assert!(!nan.compare(Comparator::Lt, "0"));
    }

    #[test]
    fn equality_is_textual() {
        assert!(Value::from("Sales").compare(Comparator::Eq, "Sales"));
        assert!(!Value::from("sales").compare(Comparator::Eq, "Sales"));
        assert!(Value::from("35").compare(Comparator::Eq, "35"));
        // numbers never equal a literal
        assert!(!Value::Int(35).compare(Comparator::Eq, "35"));
        assert!(!Value::Float(35.0).compare(Comparator::Eq, "35"));
        assert!(!Value::Bool(true).compare(Comparator::Eq, "true"));
    }
}
