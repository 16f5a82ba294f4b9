// File: src/extract/year.rs
//! Reads the calendar year from the poster's title band.
use crate::extract::dates::next_year;
use crate::ocr::{OcrLanguages, TextRecognizer, recognize_with_fallback};
use chrono::Local;
use image::DynamicImage;
use image::imageops::FilterType;
use std::collections::HashMap;
use std::ops::RangeInclusive;

/// Share of the poster height holding the title ("CALENDAR ȘTIINȚIFIC 2026").
pub const TITLE_BAND_FRACTION: f64 = 0.10;

/// Most frequent 4-digit token inside `range`; ties go to the first seen.
pub fn year_from_text(text: &str, range: &RangeInclusive<i32>) -> Option<i32> {
    let mut counts: HashMap<i32, (usize, usize)> = HashMap::new();
    // Digit runs are maximal, so a 4-char run is bounded by non-digits.
    let runs = text
        .split(|c: char| !c.is_ascii_digit())
        .filter(|run| run.len() == 4)
        .filter_map(|run| run.parse::<i32>().ok())
        .filter(|y| range.contains(y));
    for (order, year) in runs.enumerate() {
        counts.entry(year).or_insert((0, order)).0 += 1;
    }
    counts
        .into_iter()
        .max_by(|(_, (ca, oa)), (_, (cb, ob))| ca.cmp(cb).then(ob.cmp(oa)))
        .map(|(year, _)| year)
}

pub struct YearDetector<'a> {
    recognizer: &'a dyn TextRecognizer,
    languages: &'a OcrLanguages,
    range: RangeInclusive<i32>,
    upscale: u32,
}

impl<'a> YearDetector<'a> {
    pub fn new(
        recognizer: &'a dyn TextRecognizer,
        languages: &'a OcrLanguages,
        range: RangeInclusive<i32>,
        upscale: u32,
    ) -> Self {
        Self {
            recognizer,
            languages,
            range,
            upscale: upscale.max(1),
        }
    }

    /// Never fails: unreadable titles give next year.
    pub fn detect(&self, image: &DynamicImage) -> i32 {
        let fallback = next_year(Local::now().date_naive());
        let band_height = (image.height() as f64 * TITLE_BAND_FRACTION) as u32;
        if band_height == 0 || image.width() == 0 {
            return fallback;
        }

        let band = image.crop_imm(0, 0, image.width(), band_height);
        // Vertical stretch only; title glyphs are wide but short.
        let band = band.resize_exact(
            band.width(),
            band_height * self.upscale,
            FilterType::Lanczos3,
        );

        let text = match recognize_with_fallback(self.recognizer, &band, self.languages) {
            Ok(text) => text,
            Err(e) => {
                log::warn!("Title OCR failed, assuming {}: {:#}", fallback, e);
                String::new()
            }
        };

        match year_from_text(&text, &self.range) {
            Some(year) => {
                log::info!("Detected calendar year {}", year);
                year
            }
            None => {
                log::info!("No calendar year in title band, assuming {}", fallback);
                fallback
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RANGE: RangeInclusive<i32> = 2024..=2035;

    #[test]
    fn test_most_frequent_plausible_year_wins() {
        let text = "CALENDAR 2026\nedition 2025 · 2026 · founded 1990";
        assert_eq!(year_from_text(text, &RANGE), Some(2026));
    }

    #[test]
    fn test_ties_go_to_first_seen() {
        assert_eq!(year_from_text("2027 and 2025", &RANGE), Some(2027));
    }

    #[test]
    fn test_longer_digit_runs_are_not_years() {
        assert_eq!(year_from_text("tel 0720261234 id 120300", &RANGE), None);
        assert_eq!(year_from_text("ISBN-2026-x", &RANGE), Some(2026));
    }

    #[test]
    fn test_out_of_range_years_are_ignored() {
        assert_eq!(year_from_text("Anul 1859, 2040", &RANGE), None);
    }
}
