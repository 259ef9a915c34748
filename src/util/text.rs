use std::str::FromStr;

use anyhow::{anyhow, Result};

const NUMBER_ESCAPE_CHAR: &[char] = &[',', ' ', '"', '\n', '\r'];

/// Converts a GBK / GB18030 encoded byte slice to a UTF-8 `String`.
///
/// The declared charset is ignored. Undecodable sequences become U+FFFD.
pub fn gbk_to_utf8(data: &[u8]) -> String {
    let (text, _, had_errors) = encoding_rs::GB18030.decode(data);
    if had_errors {
        crate::logging::debug_file_async(
            "GB18030 decode met malformed sequences, replaced with U+FFFD".to_string(),
        );
    }

    text.into_owned()
}

/// Parses a `f64` value, treating an empty field as zero.
///
/// # Errors
///
/// Returns an error when the field is not empty and is not a finite number
/// (`nan`, `inf` and overflowing values such as `1e400` are rejected).
pub fn parse_f64_or_zero(s: &str) -> Result<f64> {
    let cleaned = clean_escape_chars(s);
    if cleaned.is_empty() {
        return Ok(0.0);
    }

    let value = f64::from_str(&cleaned)
        .map_err(|why| anyhow!("Failed to parse '{}' as f64 because {:?}", cleaned, why))?;

    if !value.is_finite() {
        return Err(anyhow!("'{}' is not a finite number", cleaned));
    }

    Ok(value)
}

/// Parses an `i64` value, treating an empty field as zero.
pub fn parse_i64_or_zero(s: &str) -> Result<i64> {
    let cleaned = clean_escape_chars(s);
    if cleaned.is_empty() {
        return Ok(0);
    }

    i64::from_str(&cleaned)
        .map_err(|why| anyhow!("Failed to parse '{}' as i64 because: {:?}", cleaned, why))
}

/// Removes thousands separators, quotes and whitespace from a numeric field.
pub(crate) fn clean_escape_chars(s: &str) -> String {
    s.chars().filter(|c| !NUMBER_ESCAPE_CHAR.contains(c)).collect()
}
