// End-to-end tests of the annual grid path with synthetic posters and canned OCR.
#![cfg(feature = "grid")]

use anyhow::Result;
use image::{DynamicImage, GrayImage, Luma};
use sciencecal::config::Config;
use sciencecal::extract::grid::{Brightness, GridGeometry};
use sciencecal::extract::{Extractor, StrategyKind};
use sciencecal::model::IdProvider;
use sciencecal::ocr::TextRecognizer;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

const COLUMN_RULES: [u32; 5] = [300, 600, 900, 1200, 1500];

/// 1800×1000 dark poster with a white rule at y=495..505 and five column rules.
fn grid_poster() -> DynamicImage {
    let mut img = GrayImage::from_pixel(1800, 1000, Luma([60u8]));
    for y in 495..505 {
        for x in 0..1800 {
            img.put_pixel(x, y, Luma([255]));
        }
    }
    for &c in &COLUMN_RULES {
        for x in c - 12..c + 12 {
            for y in 0..1000 {
                img.put_pixel(x, y, Luma([255]));
            }
        }
    }
    DynamicImage::ImageLuma8(img)
}

/// Returns the same text for every crop and records the crop sizes.
struct CannedText {
    text: String,
    sizes: Mutex<Vec<(u32, u32)>>,
}

impl CannedText {
    fn new(text: &str) -> Arc<Self> {
        Arc::new(Self {
            text: text.to_string(),
            sizes: Mutex::new(vec![]),
        })
    }
}

impl TextRecognizer for CannedText {
    fn recognize(&self, image: &DynamicImage, _languages: &str) -> Result<String> {
        self.sizes
            .lock()
            .unwrap()
            .push((image.width(), image.height()));
        Ok(self.text.clone())
    }
}

const MONTH_TEXT: &str = "CALENDAR ȘTIINȚIFIC 2026\n\
                          1 L. Ziua Internațională a Științei\n\
                          2 Ma. Descoperirea razelor X (1895)\n";

fn counting_ids() -> IdProvider {
    let counter = Arc::new(AtomicUsize::new(0));
    Arc::new(move || format!("ev-{}", counter.fetch_add(1, Ordering::SeqCst)))
}

#[test]
fn test_geometry_of_synthetic_poster() {
    let geometry = GridGeometry::detect(&Brightness::from_image(&grid_poster()));
    assert_eq!(geometry.mid_y, 495);
    assert_eq!(geometry.rows[0].y0, 130);
    assert_eq!(geometry.rows[0].y1, 480);
    assert_eq!(geometry.rows[1].y0, 505);
    assert_eq!(geometry.rows[1].y1, 900);

    for seps in &geometry.separators {
        assert_eq!(seps.len(), 5);
        for (found, expected) in seps.iter().zip(COLUMN_RULES) {
            assert!(
                found.abs_diff(expected) <= 2,
                "separator {} too far from {}",
                found,
                expected
            );
        }
    }
    assert_eq!(geometry.columns[0][0], 45);
    assert_eq!(geometry.columns[0][6], 1755);
}

#[test]
fn test_grid_path_accepted_in_month_order() {
    let recognizer = CannedText::new(MONTH_TEXT);
    let extractor = Extractor::new(recognizer.clone(), &Config::default());

    let result = extractor.extract_image(&grid_poster(), None).unwrap();

    assert_eq!(result.strategy, StrategyKind::Grid);
    assert_eq!(result.events.len(), 24);
    assert_eq!(result.month_count(), 12);
    // Parallel OCR, but months come back January to December.
    for (i, pair) in result.events.chunks(2).enumerate() {
        let month = format!("2026-{:02}", i + 1);
        assert_eq!(pair[0].month_key(), month);
        assert_eq!(pair[0].title, "Ziua Internațională a Științei");
        assert_eq!(pair[1].description, "An: 1895");
    }
    assert_eq!(
        result.raw_text,
        "Calendar anual detectat (1800×1000px). 24 intrări extrase din 12 luni (an: 2026)."
    );

    // Title band (stretched 2× vertically) plus twelve month crops (2× both ways).
    let sizes = recognizer.sizes.lock().unwrap();
    assert_eq!(sizes.len(), 13);
    assert!(sizes.contains(&(1800, 200)));
}

#[test]
fn test_forced_year_skips_title_ocr() {
    let recognizer = CannedText::new(MONTH_TEXT);
    let extractor = Extractor::new(recognizer.clone(), &Config::default());

    let result = extractor.extract_image(&grid_poster(), Some(2030)).unwrap();
    assert!(result.events.iter().all(|e| e.month_key().starts_with("2030-")));
    assert_eq!(recognizer.sizes.lock().unwrap().len(), 12);
}

#[test]
fn test_low_yield_grid_falls_back_to_poster_text() {
    // One entry per month: 12 events, under a gate of 13.
    let text = "1 L. Ziua Internațională a Științei\n15 martie 2026 – Noaptea Planetariului";
    let config = Config {
        min_grid_events: 13,
        ..Config::default()
    };
    let extractor = Extractor::new(CannedText::new(text), &config);

    let result = extractor.extract_image(&grid_poster(), Some(2026)).unwrap();
    assert_eq!(result.strategy, StrategyKind::Poster);
    assert_eq!(result.raw_text, text);
    assert_eq!(result.events.len(), 1);
    assert_eq!(result.events[0].title, "Noaptea Planetariului");
}

#[test]
fn test_disabled_grid_always_uses_poster_path() {
    let config = Config {
        grid_enabled: false,
        ..Config::default()
    };
    let extractor = Extractor::new(CannedText::new(MONTH_TEXT), &config);
    let result = extractor.extract_image(&grid_poster(), None).unwrap();
    assert_eq!(result.strategy, StrategyKind::Poster);
    assert!(result.events.is_empty());
}

#[test]
fn test_sequential_run_with_injected_ids_is_reproducible() {
    let config = Config {
        parallel_columns: false,
        ..Config::default()
    };
    let run = || {
        Extractor::with_ids(CannedText::new(MONTH_TEXT), &config, counting_ids())
            .extract_image(&grid_poster(), Some(2026))
            .unwrap()
    };
    let (a, b) = (run(), run());
    assert_eq!(a, b);
    assert_eq!(a.events[0].id, "ev-0");
    assert_eq!(a.events[23].id, "ev-23");
}
