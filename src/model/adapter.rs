// File: src/model/adapter.rs
use crate::model::item::Event;
use chrono::Utc;
use icalendar::{Calendar, Component, EventLike};

pub const PRODID: &str = "-//Science Calendar//RO";
const UID_DOMAIN: &str = "sciencecalendar";

impl Event {
    fn to_vevent(&self) -> icalendar::Event {
        let mut vevent = icalendar::Event::new();
        vevent.uid(&format!("{}@{}", self.id, UID_DOMAIN));
        vevent.timestamp(Utc::now());
        vevent.summary(&self.title);
        // Inclusive end, same as the start for single-day entries.
        vevent.starts(self.date);
        vevent.ends(self.end_date.unwrap_or(self.date));
        // Always present, even when empty.
        vevent.description(&self.description);
        vevent.add_property("LOCATION", &self.location);
        vevent.done()
    }

    /// Renders the event as a standalone VCALENDAR with one all-day VEVENT.
    pub fn to_ics(&self) -> String {
        events_to_ics(std::slice::from_ref(self))
    }
}

/// Joins several events into one calendar file.
pub fn events_to_ics(events: &[Event]) -> String {
    let mut calendar = Calendar::new();
    for ev in events {
        calendar.push(ev.to_vevent());
    }
    let ics = calendar.to_string();

    // icalendar always writes its own PRODID; swap in ours.
    match ics.lines().find(|l| l.starts_with("PRODID:")) {
        Some(line) => ics.replacen(line, &format!("PRODID:{}", PRODID), 1),
        None => ics,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn sample() -> Event {
        let mut ev = Event::new(
            "abc".into(),
            "Ziua Mondială a Apei",
            NaiveDate::from_ymd_opt(2025, 3, 22).unwrap(),
        );
        ev.description = "An: 1993".into();
        ev.location = "Muzeul Național".into();
        ev
    }

    #[test]
    fn test_single_event_ics_is_all_day() {
        let ics = sample().to_ics();
        assert!(ics.contains("BEGIN:VEVENT"));
        assert!(ics.contains("UID:abc@sciencecalendar"));
        assert!(ics.contains("DTSTART;VALUE=DATE:20250322"));
        assert!(ics.contains("DTEND;VALUE=DATE:20250322"));
        assert!(ics.contains("SUMMARY:Ziua Mondială a Apei"));
        assert!(ics.contains("DESCRIPTION:An: 1993"));
        assert!(ics.contains(&format!("PRODID:{}", PRODID)));
    }

    #[test]
    fn test_end_date_is_used_when_present() {
        let mut ev = sample();
        ev.end_date = NaiveDate::from_ymd_opt(2025, 3, 24);
        let ics = ev.to_ics();
        assert!(ics.contains("DTEND;VALUE=DATE:20250324"));
    }

    #[test]
    fn test_empty_description_and_location_are_still_written() {
        let ev = Event::new(
            "bare".into(),
            "Noaptea Cercetătorilor",
            NaiveDate::from_ymd_opt(2025, 9, 26).unwrap(),
        );
        let ics = ev.to_ics();
        assert!(ics.lines().any(|l| l.trim_end() == "DESCRIPTION:"));
        assert!(ics.lines().any(|l| l.trim_end() == "LOCATION:"));
    }

    #[test]
    fn test_many_events_share_one_calendar() {
        let mut second = sample();
        second.id = "def".into();
        let ics = events_to_ics(&[sample(), second]);
        assert_eq!(ics.matches("BEGIN:VEVENT").count(), 2);
        assert_eq!(ics.matches("BEGIN:VCALENDAR").count(), 1);
    }
}
