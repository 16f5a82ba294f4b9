// File: src/extract/dates.rs
//! Date recognition for free-form Romanian/English poster text.
//!
//! `find_date` locates the first date-looking span in a line and
//! `parse_date` turns such a span into a calendar date, trying Romanian month
//! names before English ones and day-first before month-first numeric order.
use chrono::{Datelike, NaiveDate};
use once_cell::sync::Lazy;
use regex::Regex;

const RO_MONTHS: [&str; 12] = [
    "ianuarie",
    "februarie",
    "martie",
    "aprilie",
    "mai",
    "iunie",
    "iulie",
    "august",
    "septembrie",
    "octombrie",
    "noiembrie",
    "decembrie",
];

const EN_MONTHS: [&str; 12] = [
    "january",
    "february",
    "march",
    "april",
    "may",
    "june",
    "july",
    "august",
    "september",
    "october",
    "november",
    "december",
];

// Alternation order is the precedence order: numeric D.M.Y, Romanian
// "D luna YYYY", English "Month D, YYYY", then Y-M-D.
static DATE_RE: Lazy<Regex> = Lazy::new(|| {
    let ro = RO_MONTHS.join("|");
    let en = EN_MONTHS.join("|");
    let pattern = format!(
        r"(?i)\b\d{{1,2}}[.\-/]\d{{1,2}}[.\-/]\d{{2,4}}\b|\b\d{{1,2}}\s+(?:{ro})\s+\d{{4}}\b|\b(?:{en})\s+\d{{1,2}},?\s+\d{{4}}\b|\b\d{{4}}[.\-/]\d{{1,2}}[.\-/]\d{{1,2}}\b"
    );
    Regex::new(&pattern).expect("valid date regex")
});

/// A date-looking span inside a line, as byte offsets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateMatch<'a> {
    pub start: usize,
    pub end: usize,
    pub text: &'a str,
}

pub fn find_date(line: &str) -> Option<DateMatch<'_>> {
    DATE_RE.find(line).map(|m| DateMatch {
        start: m.start(),
        end: m.end(),
        text: m.as_str(),
    })
}

pub fn contains_date(line: &str) -> bool {
    DATE_RE.is_match(line)
}

pub fn is_leap_year(year: i32) -> bool {
    year % 4 == 0 && (year % 100 != 0 || year % 400 == 0)
}

/// Number of days in `month` (1-12) of `year`. Returns 0 for an invalid month.
pub fn days_in_month(month: u32, year: i32) -> u32 {
    match month {
        2 if is_leap_year(year) => 29,
        2 => 28,
        4 | 6 | 9 | 11 => 30,
        1 | 3 | 5 | 7 | 8 | 10 | 12 => 31,
        _ => 0,
    }
}

/// Month number for a Romanian or English month name or its 3-letter prefix.
pub fn month_from_name(name: &str) -> Option<u32> {
    let lower = name.trim().to_lowercase();
    if lower.len() < 3 {
        return None;
    }
    for table in [&RO_MONTHS, &EN_MONTHS] {
        if let Some(idx) = table.iter().position(|m| *m == lower) {
            return Some(idx as u32 + 1);
        }
    }
    for table in [&RO_MONTHS, &EN_MONTHS] {
        if let Some(idx) = table.iter().position(|m| m.starts_with(&lower)) {
            return Some(idx as u32 + 1);
        }
    }
    None
}

fn expand_year(raw: &str) -> Option<i32> {
    let value: i32 = raw.parse().ok()?;
    match raw.len() {
        2 => Some(2000 + value),
        4 => Some(value),
        _ => None,
    }
}

/// Parses a date span such as "15.03.2025", "15 martie 2025",
/// "March 15, 2025" or "2025-03-15". Returns `None` for anything that does
/// not form a valid Gregorian date.
pub fn parse_date(text: &str) -> Option<NaiveDate> {
    let tokens: Vec<&str> = text
        .split(|c: char| c.is_whitespace() || matches!(c, ',' | '.' | '-' | '/'))
        .filter(|t| !t.is_empty())
        .collect();
    if tokens.len() != 3 {
        return None;
    }

    let is_num = |t: &str| t.chars().all(|c| c.is_ascii_digit());

    if tokens.iter().all(|t| is_num(t)) {
        let (a, b, c) = (tokens[0], tokens[1], tokens[2]);
        if a.len() == 4 {
            let year = a.parse().ok()?;
            return NaiveDate::from_ymd_opt(year, b.parse().ok()?, c.parse().ok()?);
        }
        let year = expand_year(c)?;
        let first: u32 = a.parse().ok()?;
        let second: u32 = b.parse().ok()?;
        // Day-first as written in Romanian; month-first only when day-first is impossible.
        return NaiveDate::from_ymd_opt(year, second, first)
            .or_else(|| NaiveDate::from_ymd_opt(year, first, second));
    }

    let name_idx = tokens.iter().position(|t| !is_num(t))?;
    if tokens.iter().filter(|t| !is_num(t)).count() != 1 {
        return None;
    }
    let month = month_from_name(tokens[name_idx])?;
    let numbers: Vec<&str> = tokens
        .iter()
        .enumerate()
        .filter(|(i, _)| *i != name_idx)
        .map(|(_, t)| *t)
        .collect();
    let (day, year) = if numbers[0].len() == 4 {
        (numbers[1], numbers[0])
    } else {
        (numbers[0], numbers[1])
    };
    if day.len() > 2 {
        return None;
    }
    NaiveDate::from_ymd_opt(expand_year(year)?, month, day.parse().ok()?)
}

/// Calendar year assumed for a poster when none can be read: the one after `today`.
pub fn next_year(today: NaiveDate) -> i32 {
    today.year() + 1
}
