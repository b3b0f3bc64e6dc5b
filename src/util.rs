// Field parsers shared by the cleansers (goals, dates, kick-off times,
// attendance cells, season tokens) and the count formatting used in logs
// and console tables.
use chrono::{NaiveDate, NaiveTime};
use num_format::{Locale, ToFormattedString};
use once_cell::sync::Lazy;
use regex::Regex;

static SEASON_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(\d{4})-(\d{4})$").unwrap());
static START_YEAR_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d{4})(?:\s*[-/]\s*(\d{2}|\d{4}))?$").unwrap());
static DOTTED_THOUSANDS_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d{1,3}(\.\d{3})+$").unwrap());

/// Parse a non-negative count such as a goal tally. Accepts a trailing
/// `.0` left behind by spreadsheet exports.
pub fn parse_u32_safe(s: Option<&str>) -> Option<u32> {
    let s = s?.trim();
    if s.is_empty() {
        return None;
    }
    let s = s.strip_suffix(".0").unwrap_or(s);
    s.parse::<u32>().ok()
}

/// Try each `chrono` format in turn; the first that parses wins.
pub fn parse_date_any(s: Option<&str>, formats: &[&str]) -> Option<NaiveDate> {
    let s = s?.trim();
    if s.is_empty() {
        return None;
    }
    formats
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok())
}

/// Normalize 24-hour and 12-hour clock strings to `HH:MM`.
pub fn normalize_time(s: Option<&str>) -> Option<String> {
    let s = s?.trim();
    if s.is_empty() {
        return None;
    }
    let upper = s.to_ascii_uppercase();
    ["%H:%M", "%H:%M:%S", "%I:%M %p", "%I:%M%p"]
        .iter()
        .find_map(|fmt| NaiveTime::parse_from_str(&upper, fmt).ok())
        .or_else(|| {
            // chrono needs a minute field, so "3 PM" gets one.
            let (hour, meridiem) = upper.split_once(' ')?;
            NaiveTime::parse_from_str(&format!("{}:00 {}", hour, meridiem), "%I:%M %p").ok()
        })
        .map(|t| t.format("%H:%M").to_string())
}

/// Outcome of repairing one raw attendance cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Attendance {
    Value(u32),
    /// Cell was empty.
    Missing,
    /// Cell held text that is not a head count; the caller logs it.
    Unparseable,
}

/// Repair an attendance cell.
///
/// - `without spectators` means a behind-closed-doors game: 0.
/// - a `sold out` prefix is dropped and the remainder parsed.
/// - `Form`, `00k` and anything mentioning `record` are not counts.
/// - `,` and spaces are thousands separators; `.` only when every group
///   after it has three digits (`12.345`). A trailing `.0` is an export
///   artefact. Any other `.` is not a head count.
pub fn parse_attendance(s: Option<&str>) -> Attendance {
    let raw = match s.map(str::trim) {
        Some(v) if !v.is_empty() => v,
        _ => return Attendance::Missing,
    };
    let lower = raw.to_ascii_lowercase();
    if lower.contains("without spectators") {
        return Attendance::Value(0);
    }
    if lower.contains("record") || lower == "form" || lower.contains("00k") {
        return Attendance::Unparseable;
    }
    let lower = lower.trim_start_matches("sold out").trim();
    let lower = lower.strip_suffix(".0").unwrap_or(lower);
    let grouped: String = lower
        .chars()
        .filter(|c| !matches!(c, ',' | ' ' | '\u{a0}'))
        .collect();
    if grouped.is_empty() {
        return Attendance::Missing;
    }
    let digits = if grouped.contains('.') {
        if !DOTTED_THOUSANDS_RE.is_match(&grouped) {
            return Attendance::Unparseable;
        }
        grouped.replace('.', "")
    } else {
        grouped
    };
    if !digits.chars().all(|c| c.is_ascii_digit()) {
        return Attendance::Unparseable;
    }
    match digits.parse::<u32>() {
        Ok(v) => Attendance::Value(v),
        Err(_) => Attendance::Unparseable,
    }
}

/// `true` for `YYYY-YYYY` where the second year follows the first.
pub fn is_valid_season(s: &str) -> bool {
    match SEASON_RE.captures(s) {
        Some(c) => {
            let start: i32 = c[1].parse().unwrap_or(0);
            let end: i32 = c[2].parse().unwrap_or(0);
            end == start + 1
        }
        None => false,
    }
}

pub fn season_from_start_year(year: i32) -> String {
    format!("{}-{}", year, year + 1)
}

/// Accepts `1990`, `1990-91`, `1990/91` and `1990-1991`.
pub fn season_from_token(s: &str) -> Option<String> {
    let s = s.trim();
    let s = s.strip_suffix(".0").unwrap_or(s);
    let caps = START_YEAR_RE.captures(s)?;
    let start: i32 = caps[1].parse().ok()?;
    if let Some(end) = caps.get(2) {
        let end_str = end.as_str();
        let expected = if end_str.len() == 2 {
            format!("{:02}", (start + 1) % 100)
        } else {
            (start + 1).to_string()
        };
        if end_str != expected {
            return None;
        }
    }
    Some(season_from_start_year(start))
}

pub fn format_number(n: f64, decimals: usize) -> String {
    // Fixed decimals with locale-aware thousands separators, e.g. `1,234.50`.
    let neg = n.is_sign_negative() && n != 0.0;
    let s = format!("{:.*}", decimals, n.abs());
    let mut parts = s.split('.');
    let int_val: i64 = parts.next().unwrap_or("0").parse().unwrap_or(0);
    let mut res = int_val.to_formatted_string(&Locale::en);
    if let Some(frac) = parts.next() {
        res.push('.');
        res.push_str(frac);
    }
    if neg {
        format!("-{}", res)
    } else {
        res
    }
}

pub fn format_int<T>(n: T) -> String
where
    T: ToFormattedString,
{
    // Used for counts in log lines (e.g., `9,855 rows loaded`).
    n.to_formatted_string(&Locale::en)
}
