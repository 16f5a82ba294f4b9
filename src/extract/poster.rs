// File: src/extract/poster.rs
//! Fallback extraction for prose posters: one event per line that holds a date.
use crate::extract::dates::{DateMatch, contains_date, find_date, parse_date};
use crate::model::item::truncate_chars;
use crate::model::{Event, IdProvider, MAX_TITLE_CHARS};
use chrono::NaiveDate;

/// Title used when nothing but the date is legible.
pub const DEFAULT_TITLE: &str = "Eveniment";
const TITLE_JOINER: &str = " — ";

fn is_title_trim(c: char) -> bool {
    matches!(c, ' ' | '–' | '—' | ':' | '-' | '|')
}

/// One poster line, tagged by whether it carries a parsable date.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PosterLine<'a> {
    Dated {
        date: NaiveDate,
        span: DateMatch<'a>,
        line: &'a str,
    },
    /// Holds something date-shaped that is not a real date ("31.02.2025").
    BadDate(&'a str),
    Plain(&'a str),
}

pub fn classify_poster_line(line: &str) -> PosterLine<'_> {
    match find_date(line) {
        Some(span) => match parse_date(span.text) {
            Some(date) => PosterLine::Dated { date, span, line },
            None => PosterLine::BadDate(line),
        },
        None => PosterLine::Plain(line),
    }
}

/// Line text around the date, trimmed of separator punctuation.
fn remainder(line: &str, span: &DateMatch<'_>) -> String {
    let mut rest = String::with_capacity(line.len());
    rest.push_str(&line[..span.start]);
    rest.push_str(&line[span.end..]);
    rest.trim_matches(is_title_trim).to_string()
}

pub struct PosterDateExtractor {
    ids: IdProvider,
}

impl PosterDateExtractor {
    pub fn new(ids: IdProvider) -> Self {
        Self { ids }
    }

    pub fn extract(&self, text: &str) -> Vec<Event> {
        let lines: Vec<&str> = text
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .collect();

        let mut events = Vec::new();
        for (i, raw) in lines.iter().enumerate() {
            let PosterLine::Dated { date, span, line } = classify_poster_line(raw) else {
                continue;
            };

            let mut parts = Vec::with_capacity(2);
            let rest = remainder(line, &span);
            if !rest.is_empty() {
                parts.push(rest);
            }
            // The line after a date usually names the event, unless it is
            // another dated line.
            if let Some(next) = lines.get(i + 1)
                && !contains_date(next)
            {
                parts.push(next.to_string());
            }

            let title = if parts.is_empty() {
                DEFAULT_TITLE.to_string()
            } else {
                truncate_chars(&parts.join(TITLE_JOINER), MAX_TITLE_CHARS)
            };
            log::debug!("Poster date {} -> '{}'", date, title);
            events.push(Event::new((self.ids)(), title, date));
        }
        events
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::uuid_ids;

    fn extract(text: &str) -> Vec<Event> {
        PosterDateExtractor::new(uuid_ids()).extract(text)
    }

    #[test]
    fn test_romanian_date_with_dash_title() {
        let events = extract("15 martie 2025 – Ziua Mondială a Apei");
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].date.to_string(), "2025-03-15");
        assert_eq!(events[0].title, "Ziua Mondială a Apei");
        assert_eq!(events[0].end_date, None);
        assert_eq!(events[0].location, "");
    }

    #[test]
    fn test_next_line_joins_title() {
        let text = "Sâmbătă, 12.04.2025:\nNoaptea Muzeelor\nIntrare liberă";
        let events = extract(text);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].title, "Sâmbătă, — Noaptea Muzeelor");
        assert_eq!(events[0].date.to_string(), "2025-04-12");
    }

    #[test]
    fn test_next_dated_line_is_not_borrowed() {
        let text = "2025-05-01\n2025-05-02 Atelier de robotică";
        let events = extract(text);
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].title, DEFAULT_TITLE);
        assert_eq!(events[1].title, "Atelier de robotică");
    }

    #[test]
    fn test_english_month_form() {
        let events = extract("Science Fair | March 3, 2026");
        assert_eq!(events[0].date.to_string(), "2026-03-03");
        assert_eq!(events[0].title, "Science Fair");
    }

    #[test]
    fn test_invalid_dates_are_skipped() {
        let events = extract("31.02.2025 Ziua imposibilă\nFără dată");
        assert!(events.is_empty());
        assert!(matches!(
            classify_poster_line("31.02.2025 x"),
            PosterLine::BadDate(_)
        ));
    }

    #[test]
    fn test_long_title_is_capped() {
        let text = format!("15 martie 2025 {}\n{}", "a".repeat(200), "b".repeat(200));
        let events = extract(&text);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].title.chars().count(), MAX_TITLE_CHARS);
        assert!(events[0].title.starts_with("aaa"));
    }

    #[test]
    fn test_text_without_dates_gives_nothing() {
        assert!(extract("Conferință\nSala Mare\n\n").is_empty());
    }
}
