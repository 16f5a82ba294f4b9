// File: src/extract/month.rs
//! Line state machine turning one month column's OCR text into events.
//!
//! Columns of the annual posters look like:
//!
//! ```text
//! Ianuarie
//! 1 J. Ziua Culturii Naționale
//! 3 S. Se naște Mihai Eminescu, poet
//! național (1850)
//! ```
//!
//! Each line is first classified (`classify_line`), then fed to
//! `MonthParseState`, which accumulates one day at a time.
use crate::extract::dates::days_in_month;
use crate::model::item::truncate_chars;
use crate::model::{Event, IdProvider, MAX_TITLE_CHARS};
use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;

/// Titles shorter than this are OCR noise (stray glyphs, page numbers).
pub const MIN_TITLE_CHARS: usize = 6;

static DAY_LINE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(\d{1,2})\s+(\p{L}{1,3})(?:[.\s]+(.*))?$").expect("valid day-line regex")
});
static HISTORICAL_YEAR_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\((\d{4})\)\s*$").expect("valid year regex"));
static WHITESPACE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid ws regex"));

fn is_weekday_abbrev(token: &str) -> bool {
    matches!(
        token.to_lowercase().as_str(),
        // Romanian: Luni, Marți, Miercuri, Joi, Vineri, Sâmbătă, Duminică
        "l" | "lu" | "ma" | "mi" | "j" | "jo" | "v" | "vi" | "s" | "sa" | "sâ" | "d" | "du"
        // English
            | "mo" | "mon" | "tu" | "tue" | "we" | "wed" | "th" | "thu" | "fr" | "fri"
            | "sat" | "su" | "sun"
    )
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineKind<'a> {
    /// "12 Mi. Ziua ..." — starts a new day entry.
    Day { day: u32, rest: &'a str },
    /// Anything else: a continuation when a day is open, ignored otherwise.
    Text(&'a str),
}

/// Classifies one trimmed line. Range checks against the month happen later.
pub fn classify_line(line: &str) -> LineKind<'_> {
    if let Some(caps) = DAY_LINE_RE.captures(line)
        && is_weekday_abbrev(&caps[2])
        && let Ok(day) = caps[1].parse::<u32>()
    {
        let rest = caps.get(3).map_or("", |m| m.as_str().trim());
        return LineKind::Day { day, rest };
    }
    LineKind::Text(line)
}

/// A flushed day entry before it becomes an `Event`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DayEntry {
    pub day: u32,
    pub title: String,
    pub historical_year: Option<String>,
}

/// Builds the title and historical-year annotation from raw description lines.
/// Returns `None` when what is left is too short to be a real entry.
pub fn finish_entry(day: u32, lines: &[String]) -> Option<DayEntry> {
    let joined = lines.join(" ");
    let historical_year = HISTORICAL_YEAR_RE
        .captures(&joined)
        .map(|c| c[1].to_string());
    let without_year = HISTORICAL_YEAR_RE.replace(&joined, "");
    let stripped = without_year.trim_matches(|c: char| matches!(c, ' ' | '(' | ')' | '–' | '—'));
    let collapsed = WHITESPACE_RE.replace_all(stripped, " ");
    let title = truncate_chars(collapsed.trim(), MAX_TITLE_CHARS);

    if title.chars().count() < MIN_TITLE_CHARS {
        return None;
    }
    Some(DayEntry {
        day,
        title,
        historical_year,
    })
}

#[derive(Debug, Default)]
pub struct MonthParseState {
    pub current_day: Option<u32>,
    pub current_description: Vec<String>,
}

impl MonthParseState {
    /// Closes the open day, if any.
    pub fn flush(&mut self) -> Option<DayEntry> {
        let day = self.current_day.take()?;
        let lines = std::mem::take(&mut self.current_description);
        finish_entry(day, &lines)
    }

    pub fn start_day(&mut self, day: u32, rest: &str) -> Option<DayEntry> {
        let flushed = self.flush();
        self.current_day = Some(day);
        self.current_description = vec![rest.to_string()];
        flushed
    }

    pub fn push_line(&mut self, line: &str) {
        if self.current_day.is_some() {
            self.current_description.push(line.to_string());
        }
    }
}

pub struct MonthTextParser {
    month: u32,
    year: i32,
    ids: IdProvider,
}

impl MonthTextParser {
    pub fn new(month: u32, year: i32, ids: IdProvider) -> Self {
        Self { month, year, ids }
    }

    /// Runs the state machine over the column text and returns the day entries in order.
    pub fn entries(&self, text: &str) -> Vec<DayEntry> {
        let max_day = days_in_month(self.month, self.year);
        let mut state = MonthParseState::default();
        let mut out = Vec::new();

        for line in text.lines().map(str::trim).filter(|l| !l.is_empty()) {
            match classify_line(line) {
                LineKind::Day { day, rest } if (1..=max_day).contains(&day) => {
                    out.extend(state.start_day(day, rest));
                }
                // An out-of-range day number is most likely misread text.
                LineKind::Day { .. } | LineKind::Text(_) => state.push_line(line),
            }
        }
        out.extend(state.flush());
        out
    }

    pub fn parse(&self, text: &str) -> Vec<Event> {
        self.entries(text)
            .into_iter()
            .filter_map(|entry| {
                let date = NaiveDate::from_ymd_opt(self.year, self.month, entry.day)?;
                let mut ev = Event::new((self.ids)(), entry.title, date);
                if let Some(year) = entry.historical_year {
                    ev.description = format!("An: {}", year);
                }
                Some(ev)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::uuid_ids;

    fn parse(text: &str, month: u32, year: i32) -> Vec<Event> {
        MonthTextParser::new(month, year, uuid_ids()).parse(text)
    }

    #[test]
    fn test_classify_day_lines() {
        assert_eq!(
            classify_line("12 Mi. Ziua Internațională"),
            LineKind::Day {
                day: 12,
                rest: "Ziua Internațională"
            }
        );
        assert_eq!(
            classify_line("3 Ma Descoperirea penicilinei"),
            LineKind::Day {
                day: 3,
                rest: "Descoperirea penicilinei"
            }
        );
        assert_eq!(
            classify_line("7 Sun Moon landing"),
            LineKind::Day {
                day: 7,
                rest: "Moon landing"
            }
        );
        assert_eq!(classify_line("5 mai 1990"), LineKind::Text("5 mai 1990"));
        assert_eq!(classify_line("2026"), LineKind::Text("2026"));
        assert_eq!(classify_line("Ianuarie"), LineKind::Text("Ianuarie"));
    }

    #[test]
    fn test_single_day_line_builds_event() {
        let events = parse("1 J. Ziua Culturii Naționale", 1, 2026);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].date.to_string(), "2026-01-01");
        assert_eq!(events[0].title, "Ziua Culturii Naționale");
        assert_eq!(events[0].description, "");
    }

    #[test]
    fn test_multiline_description_and_historical_year() {
        let text = "Martie\n\
                    14 S. Se naște Albert Einstein,\n\
                    fizician teoretician (1879)\n\
                    15 D. Ziua Consumatorului\n";
        let events = parse(text, 3, 2026);
        assert_eq!(events.len(), 2);
        assert_eq!(
            events[0].title,
            "Se naște Albert Einstein, fizician teoretician"
        );
        assert_eq!(events[0].description, "An: 1879");
        assert_eq!(events[1].date.to_string(), "2026-03-15");
    }

    #[test]
    fn test_trailing_year_is_removed_from_title() {
        let events = parse("10 L. Prima convorbire telefonică (1877)", 3, 2025);
        assert_eq!(events[0].title, "Prima convorbire telefonică");
        assert_eq!(events[0].description, "An: 1877");
    }

    #[test]
    fn test_out_of_range_day_is_continuation() {
        let text = "28 S. Ziua Protecției Datelor\n30 L. fragment citit greșit";
        let events = parse(text, 2, 2026);
        assert_eq!(events.len(), 1);
        assert_eq!(
            events[0].title,
            "Ziua Protecției Datelor 30 L. fragment citit greșit"
        );
    }

    #[test]
    fn test_leap_day_only_in_leap_years() {
        assert_eq!(parse("29 J. Ziua bisectă specială", 2, 2024).len(), 1);
        assert!(parse("29 J. Ziua bisectă specială", 2, 2025).is_empty());
    }

    #[test]
    fn test_short_titles_are_dropped() {
        let text = "4 V. ab\n5 S. (1900)\n6 D. Ziua Eroilor";
        let events = parse(text, 6, 2026);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].title, "Ziua Eroilor");
    }

    #[test]
    fn test_lines_before_first_day_are_ignored() {
        let text = "IULIE 2026\nSăptămâna științei\n20 L. Aselenizarea Apollo 11 (1969)";
        let events = parse(text, 7, 2026);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].title, "Aselenizarea Apollo 11");
    }

    #[test]
    fn test_long_titles_are_truncated() {
        let long = "a".repeat(300);
        let events = parse(&format!("2 Vi. {}", long), 5, 2026);
        assert_eq!(events[0].title.chars().count(), MAX_TITLE_CHARS);
    }

    #[test]
    fn test_empty_day_line_takes_next_lines() {
        let events = parse("9 Ma\nZiua Europei\n(1950)", 5, 2026);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].title, "Ziua Europei");
        assert_eq!(events[0].description, "An: 1950");
    }

    #[test]
    fn test_parsing_is_deterministic_apart_from_ids() {
        let text = "1 L. Ziua Internațională a Muncii\n2 Ma. Ziua Tineretului";
        let a = parse(text, 5, 2026);
        let b = parse(text, 5, 2026);
        assert_eq!(a.len(), b.len());
        for (x, y) in a.iter().zip(&b) {
            assert_ne!(x.id, y.id);
            assert_eq!(
                (&x.title, x.date, x.end_date, &x.description, &x.location),
                (&y.title, y.date, y.end_date, &y.description, &y.location)
            );
        }
    }
}
