//! Date parsing for text date columns.

use chrono::NaiveDate;

/// Parse a date string trying each format in order.
///
/// Returns `None` when no format matches; callers treat that as a missing
/// date rather than an error.
#[must_use]
pub fn parse_date_string<S: AsRef<str>>(s: &str, formats: &[S]) -> Option<NaiveDate> {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        return None;
    }

    for format in formats {
        if let Ok(date) = NaiveDate::parse_from_str(trimmed, format.as_ref()) {
            return Some(date);
        }
    }

    detect_date_format(trimmed).and_then(|format| NaiveDate::parse_from_str(trimmed, format).ok())
}

/// Guess a format from the shape of the string
#[must_use]
pub fn detect_date_format(s: &str) -> Option<&'static str> {
    // ISO-like format with dashes (YYYY-MM-DD)
    if s.len() == 10 && s.chars().nth(4) == Some('-') && s.chars().nth(7) == Some('-') {
        return Some("%Y-%m-%d");
    }

    // Day first with dashes (DD-MM-YYYY)
    if s.len() == 10 && s.chars().nth(2) == Some('-') && s.chars().nth(5) == Some('-') {
        return Some("%d-%m-%Y");
    }

    if s.contains('.') {
        let parts: Vec<&str> = s.split('.').collect();
        if parts.len() == 3 && parts[2].len() == 4 {
            return Some("%d.%m.%Y");
        }
    }

    // Compact format (YYYYMMDD)
    if s.len() == 8 && s.chars().all(|c| c.is_ascii_digit()) {
        return Some("%Y%m%d");
    }

    None
}
