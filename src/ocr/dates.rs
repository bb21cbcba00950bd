//! Text interpretation for OCR output: anchor dates, prose dates, marker phrases.

use chrono::{Datelike, Duration, NaiveDate};
use regex::Regex;

/// Strict format printed in the schedule header: `16.10.2024`.
const NUMERIC_DATE_FORMAT: &str = "%d.%m.%Y";

/// `16 жовтня` or `16 жовтня 2024`. Word boundaries keep `116 жовтня` from
/// reading as the 16th.
const PROSE_DATE_PATTERN: &str = r"\b([0-9]{1,2})\s+(\p{L}+)\b(?:\s+([0-9]{4})\b)?";

/// `16.10.2024`, `16/10/24`, `16.10`. The year takes every trailing digit so
/// a truncated `16.10.202` can be rejected instead of read as 2020.
const LOOSE_NUMERIC_PATTERN: &str = r"\b([0-9]{1,2})[./]([0-9]{1,2})(?:[./]([0-9]+))?\b";

/// A year-less date further than this in the past is taken to mean next year.
const YEAR_ROLLOVER_DAYS: i64 = 183;

/// Month names as they appear in announcements, genitive first.
const MONTH_NAMES: [&[&str]; 12] = [
    &["січня", "січень", "january", "jan"],
    &["лютого", "лютий", "february", "feb"],
    &["березня", "березень", "march", "mar"],
    &["квітня", "квітень", "april", "apr"],
    &["травня", "травень", "may"],
    &["червня", "червень", "june", "jun"],
    &["липня", "липень", "july", "jul"],
    &["серпня", "серпень", "august", "aug"],
    &["вересня", "вересень", "september", "sep"],
    &["жовтня", "жовтень", "october", "oct"],
    &["листопада", "листопад", "november", "nov"],
    &["грудня", "грудень", "december", "dec"],
];

/// Parses an anchor date strictly as `dd.mm.yyyy`, ignoring surrounding whitespace.
pub fn parse_numeric_date(text: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(text.trim(), NUMERIC_DATE_FORMAT).ok()
}

/// Lowercases text and collapses all whitespace runs (including line breaks) to single spaces.
pub fn flatten_text(text: &str) -> String {
    text.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Returns true if the flattened text contains the flattened marker phrase.
pub fn contains_marker(text: &str, marker: &str) -> bool {
    let marker = flatten_text(marker);
    if marker.is_empty() {
        return false;
    }
    flatten_text(text).contains(&marker)
}

fn month_from_name(name: &str) -> Option<u32> {
    let name = name.to_lowercase();
    MONTH_NAMES
        .iter()
        .position(|names| names.contains(&name.as_str()))
        .map(|idx| idx as u32 + 1)
}

/// Picks a year for a year-less day/month relative to `today`.
fn resolve_year(day: u32, month: u32, today: NaiveDate) -> Option<NaiveDate> {
    let date = NaiveDate::from_ymd_opt(today.year(), month, day)?;
    if today - date > Duration::days(YEAR_ROLLOVER_DAYS) {
        NaiveDate::from_ymd_opt(today.year() + 1, month, day)
    } else {
        Some(date)
    }
}

fn build_date(day: u32, month: u32, year: Option<i32>, today: NaiveDate) -> Option<NaiveDate> {
    match year {
        Some(year) => NaiveDate::from_ymd_opt(year, month, day),
        None => resolve_year(day, month, today),
    }
}

/// Leniently finds a date written in prose, e.g. "на 16 жовтня" or "16.10".
///
/// Month-name forms are tried before numeric ones. A missing year is taken
/// from `today`.
pub fn parse_prose_date(text: &str, today: NaiveDate) -> Option<NaiveDate> {
    let prose = Regex::new(PROSE_DATE_PATTERN).ok()?;
    for caps in prose.captures_iter(text) {
        let Some(month) = month_from_name(&caps[2]) else {
            continue;
        };
        let Ok(day) = caps[1].parse::<u32>() else {
            continue;
        };
        let year = caps.get(3).and_then(|m| m.as_str().parse::<i32>().ok());
        if let Some(date) = build_date(day, month, year, today) {
            return Some(date);
        }
    }

    let numeric = Regex::new(LOOSE_NUMERIC_PATTERN).ok()?;
    for caps in numeric.captures_iter(text) {
        let (Ok(day), Ok(month)) = (caps[1].parse::<u32>(), caps[2].parse::<u32>()) else {
            continue;
        };
        let year = match caps.get(3).map(|m| m.as_str()) {
            None => None,
            Some(digits) if digits.len() == 2 || digits.len() == 4 => {
                let Ok(value) = digits.parse::<i32>() else {
                    continue;
                };
                Some(if digits.len() == 2 { 2000 + value } else { value })
            }
            // Misread year, e.g. `202` or `20245`
            Some(_) => continue,
        };
        if let Some(date) = build_date(day, month, year, today) {
            return Some(date);
        }
    }

    None
}
