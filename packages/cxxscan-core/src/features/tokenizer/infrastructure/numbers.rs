//! Numeric literal validation and evaluation

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref INTEGER: Regex = Regex::new(
        r"^(?:0[xX][0-9a-fA-F]+|0[bB][01]+|0[0-7]*|[1-9][0-9]*)(?:[uU](?:ll|LL|l|L|z|Z)?|(?:ll|LL|l|L|z|Z)[uU]?)?$"
    )
    .unwrap();
    static ref FLOAT: Regex = Regex::new(
        r"^(?:(?:[0-9]+\.[0-9]*|\.[0-9]+)(?:[eE][+-]?[0-9]+)?|[0-9]+[eE][+-]?[0-9]+|0[xX](?:[0-9a-fA-F]+\.?[0-9a-fA-F]*|\.[0-9a-fA-F]+)[pP][+-]?[0-9]+)[fFlL]?$"
    )
    .unwrap();
}

/// Integer literal suffix information
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct IntSuffix {
    pub unsigned: bool,
    /// 0 = none, 1 = `l`, 2 = `ll`
    pub long_count: u8,
}

pub fn is_valid_number(text: &str) -> bool {
    INTEGER.is_match(text) || FLOAT.is_match(text)
}

pub fn is_float_literal(text: &str) -> bool {
    !INTEGER.is_match(text) && FLOAT.is_match(text)
}

/// Reason a pp-number is not a valid C/C++ number, `None` when valid
pub fn invalid_number_reason(text: &str) -> Option<&'static str> {
    if is_valid_number(text) {
        return None;
    }
    let lower = text.to_ascii_lowercase();
    Some(if lower == "0x" || lower == "0b" {
        "Invalid number: missing digits after prefix"
    } else if lower.starts_with("0b") {
        "Invalid binary literal"
    } else if lower.starts_with('0')
        && !lower.starts_with("0x")
        && !lower.contains(&['.', 'e'][..])
        && lower.chars().any(|c| c == '8' || c == '9')
    {
        "Invalid octal literal"
    } else if lower.ends_with('e') || lower.ends_with("e+") || lower.ends_with("e-") {
        "Invalid number: missing exponent"
    } else {
        "Invalid number suffix"
    })
}

/// Value and suffix of an integer literal
pub fn parse_integer(text: &str) -> Option<(i64, IntSuffix)> {
    if !INTEGER.is_match(text) {
        return None;
    }
    let digits_end = text
        .char_indices()
        .rev()
        .find(|(_, c)| !matches!(c, 'u' | 'U' | 'l' | 'L' | 'z' | 'Z'))
        .map(|(i, c)| i + c.len_utf8())
        .unwrap_or(text.len());
    let (body, suffix) = text.split_at(digits_end);
    let suffix_info = IntSuffix {
        unsigned: suffix.contains(&['u', 'U'][..]),
        long_count: suffix.chars().filter(|c| matches!(c, 'l' | 'L')).count() as u8,
    };
    let lower = body.to_ascii_lowercase();
    let value = if let Some(hex) = lower.strip_prefix("0x") {
        u64::from_str_radix(hex, 16).ok()?
    } else if let Some(bin) = lower.strip_prefix("0b") {
        u64::from_str_radix(bin, 2).ok()?
    } else if lower.len() > 1 && lower.starts_with('0') {
        u64::from_str_radix(&lower[1..], 8).ok()?
    } else {
        lower.parse::<u64>().ok()?
    };
    Some((value as i64, suffix_info))
}

pub fn parse_float(text: &str) -> Option<f64> {
    if !FLOAT.is_match(text) {
        return None;
    }
    let trimmed = text.trim_end_matches(&['f', 'F', 'l', 'L'][..]);
    if trimmed.starts_with("0x") || trimmed.starts_with("0X") {
        return parse_hex_float(&trimmed[2..]);
    }
    trimmed.parse::<f64>().ok()
}

fn parse_hex_float(text: &str) -> Option<f64> {
    let (mantissa, exponent) = text.split_once(&['p', 'P'][..])?;
    let exponent: i32 = exponent.parse().ok()?;
    let (int_part, frac_part) = mantissa.split_once('.').unwrap_or((mantissa, ""));
    let mut value = if int_part.is_empty() {
        0.0
    } else {
        u64::from_str_radix(int_part, 16).ok()? as f64
    };
    let mut scale = 1.0 / 16.0;
    for c in frac_part.chars() {
        value += c.to_digit(16)? as f64 * scale;
        scale /= 16.0;
    }
    Some(value * 2f64.powi(exponent))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_numbers() {
        for n in ["0", "42", "0x1F", "0b101", "017", "10u", "10UL", "10llu", "1.5", ".5", "1e10", "1.5f", "0x1p-3", "3.0L"] {
            assert!(is_valid_number(n), "{} should be valid", n);
        }
    }

    #[test]
    fn test_invalid_numbers() {
        assert_eq!(invalid_number_reason("0x"), Some("Invalid number: missing digits after prefix"));
        assert_eq!(invalid_number_reason("08"), Some("Invalid octal literal"));
        assert_eq!(invalid_number_reason("1e"), Some("Invalid number: missing exponent"));
        assert_eq!(invalid_number_reason("0b2"), Some("Invalid binary literal"));
        assert_eq!(invalid_number_reason("12abc"), Some("Invalid number suffix"));
        assert_eq!(invalid_number_reason("12"), None);
    }

    #[test]
    fn test_parse_integer() {
        assert_eq!(parse_integer("0x10").map(|(v, _)| v), Some(16));
        assert_eq!(parse_integer("010").map(|(v, _)| v), Some(8));
        assert_eq!(parse_integer("0b11").map(|(v, _)| v), Some(3));
        let (v, s) = parse_integer("5ull").unwrap();
        assert_eq!(v, 5);
        assert!(s.unsigned);
        assert_eq!(s.long_count, 2);
        assert_eq!(parse_integer("0").map(|(v, _)| v), Some(0));
    }

    #[test]
    fn test_parse_float() {
        assert_eq!(parse_float("1.5f"), Some(1.5));
        assert_eq!(parse_float("0x1p-3"), Some(0.125));
        assert_eq!(parse_float("2e2"), Some(200.0));
        assert!(parse_float("12").is_none());
    }
}
