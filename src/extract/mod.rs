// File: ./src/extract/mod.rs
//! Image-to-events pipeline.
//!
//! Two strategies implement `ExtractionStrategy`:
//! - `GridStrategy` for landscape annual posters (6×2 month grid), only built
//!   with the `grid` feature;
//! - `PosterStrategy` for everything else.
//!
//! `Extractor` tries the grid strategy when it applies and trusts its result
//! only above a minimum event count, otherwise it runs the poster strategy.
pub mod dates;
#[cfg(feature = "grid")]
pub mod grid;
pub mod month;
pub mod poster;
pub mod year;

use crate::config::Config;
use crate::model::{Event, IdProvider, uuid_ids};
use crate::ocr::{OcrLanguages, TextRecognizer, recognize_with_fallback};
use anyhow::{Context, Result};
use image::DynamicImage;
use serde::Serialize;
use std::collections::BTreeSet;
use std::sync::Arc;

pub use month::MonthTextParser;
pub use poster::PosterDateExtractor;
pub use year::YearDetector;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, strum::Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum StrategyKind {
    Grid,
    Poster,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExtractionResult {
    pub events: Vec<Event>,
    /// Raw OCR text for posters; a short summary for grid calendars.
    pub raw_text: String,
    pub strategy: StrategyKind,
}

impl ExtractionResult {
    /// Number of distinct year-months among the events.
    pub fn month_count(&self) -> usize {
        self.events
            .iter()
            .map(Event::month_key)
            .collect::<BTreeSet<_>>()
            .len()
    }
}

pub trait ExtractionStrategy: Send + Sync {
    fn kind(&self) -> StrategyKind;

    /// Whether this strategy should be attempted for `image` at all.
    fn applies_to(&self, _image: &DynamicImage) -> bool {
        true
    }

    fn run(&self, image: &DynamicImage, forced_year: Option<i32>) -> Result<ExtractionResult>;
}

pub fn is_landscape(image: &DynamicImage) -> bool {
    image.width() > image.height()
}

/// Decodes JPEG/PNG bytes. Undecodable data is fatal for the request.
pub fn decode_image(bytes: &[u8]) -> Result<DynamicImage> {
    image::load_from_memory(bytes).context("Failed to decode image (expected JPEG or PNG)")
}

// --- Poster strategy ---

pub struct PosterStrategy {
    recognizer: Arc<dyn TextRecognizer>,
    languages: OcrLanguages,
    ids: IdProvider,
}

impl PosterStrategy {
    pub fn new(recognizer: Arc<dyn TextRecognizer>, languages: OcrLanguages, ids: IdProvider) -> Self {
        Self {
            recognizer,
            languages,
            ids,
        }
    }
}

impl ExtractionStrategy for PosterStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Poster
    }

    fn run(&self, image: &DynamicImage, _forced_year: Option<i32>) -> Result<ExtractionResult> {
        let text = recognize_with_fallback(self.recognizer.as_ref(), image, &self.languages)?;
        let events = PosterDateExtractor::new(self.ids.clone()).extract(&text);
        log::info!("Poster path found {} dated line(s)", events.len());
        Ok(ExtractionResult {
            events,
            raw_text: text,
            strategy: StrategyKind::Poster,
        })
    }
}

// --- Grid strategy ---

#[cfg(feature = "grid")]
pub use self::grid_strategy::GridStrategy;

#[cfg(feature = "grid")]
mod grid_strategy {
    use super::*;
    use crate::extract::grid::{Brightness, GridGeometry, MonthRegion};
    use image::imageops::FilterType;
    use rayon::prelude::*;
    use std::ops::RangeInclusive;

    pub struct GridStrategy {
        recognizer: Arc<dyn TextRecognizer>,
        languages: OcrLanguages,
        ids: IdProvider,
        year_range: RangeInclusive<i32>,
        upscale: u32,
        parallel: bool,
    }

    impl GridStrategy {
        pub fn new(
            recognizer: Arc<dyn TextRecognizer>,
            config: &Config,
            ids: IdProvider,
        ) -> Self {
            Self {
                recognizer,
                languages: OcrLanguages::from_config(config),
                ids,
                year_range: config.year_min..=config.year_max,
                upscale: config.upscale_factor.max(1),
                parallel: config.parallel_columns,
            }
        }

        fn read_month(&self, image: &DynamicImage, region: &MonthRegion, year: i32) -> Result<Vec<Event>> {
            if region.width() == 0 || region.height() == 0 {
                return Ok(vec![]);
            }
            let crop = image.crop_imm(region.x0, region.y0, region.width(), region.height());
            let crop = crop.resize_exact(
                crop.width() * self.upscale,
                crop.height() * self.upscale,
                FilterType::Lanczos3,
            );
            let text = recognize_with_fallback(self.recognizer.as_ref(), &crop, &self.languages)
                .with_context(|| format!("OCR failed for month {}", region.month))?;
            let events = MonthTextParser::new(region.month, year, self.ids.clone()).parse(&text);
            log::debug!("Month {:02}: {} entries", region.month, events.len());
            Ok(events)
        }
    }

    impl ExtractionStrategy for GridStrategy {
        fn kind(&self) -> StrategyKind {
            StrategyKind::Grid
        }

        fn applies_to(&self, image: &DynamicImage) -> bool {
            is_landscape(image)
        }

        fn run(&self, image: &DynamicImage, forced_year: Option<i32>) -> Result<ExtractionResult> {
            let year = forced_year.unwrap_or_else(|| {
                YearDetector::new(
                    self.recognizer.as_ref(),
                    &self.languages,
                    self.year_range.clone(),
                    self.upscale,
                )
                .detect(image)
            });

            let geometry = GridGeometry::detect(&Brightness::from_image(image));
            let regions = geometry.month_regions();

            // Columns are independent; collect keeps region (month) order.
            let per_month: Vec<Vec<Event>> = if self.parallel {
                regions
                    .par_iter()
                    .map(|r| self.read_month(image, r, year))
                    .collect::<Result<_>>()?
            } else {
                regions
                    .iter()
                    .map(|r| self.read_month(image, r, year))
                    .collect::<Result<_>>()?
            };
            let events: Vec<Event> = per_month.into_iter().flatten().collect();

            let mut result = ExtractionResult {
                events,
                raw_text: String::new(),
                strategy: StrategyKind::Grid,
            };
            result.raw_text = grid_summary(image.width(), image.height(), &result, year);
            Ok(result)
        }
    }
}

/// Human-readable report shown instead of the twelve column texts.
pub fn grid_summary(width: u32, height: u32, result: &ExtractionResult, fallback_year: i32) -> String {
    let year = result
        .events
        .first()
        .map(|e| e.date.format("%Y").to_string())
        .unwrap_or_else(|| fallback_year.to_string());
    format!(
        "Calendar anual detectat ({}×{}px). {} intrări extrase din {} luni (an: {}).",
        width,
        height,
        result.events.len(),
        result.month_count(),
        year
    )
}

// --- Orchestrator ---

pub struct Extractor {
    primary: Option<Box<dyn ExtractionStrategy>>,
    fallback: Box<dyn ExtractionStrategy>,
    min_primary_events: usize,
}

impl Extractor {
    pub fn new(recognizer: Arc<dyn TextRecognizer>, config: &Config) -> Self {
        Self::with_ids(recognizer, config, uuid_ids())
    }

    pub fn with_ids(recognizer: Arc<dyn TextRecognizer>, config: &Config, ids: IdProvider) -> Self {
        let fallback = Box::new(PosterStrategy::new(
            recognizer.clone(),
            OcrLanguages::from_config(config),
            ids.clone(),
        ));
        Self {
            primary: Self::grid_strategy(recognizer, config, ids),
            fallback,
            min_primary_events: config.min_grid_events,
        }
    }

    #[cfg(feature = "grid")]
    fn grid_strategy(
        recognizer: Arc<dyn TextRecognizer>,
        config: &Config,
        ids: IdProvider,
    ) -> Option<Box<dyn ExtractionStrategy>> {
        config
            .grid_enabled
            .then(|| Box::new(GridStrategy::new(recognizer, config, ids)) as Box<dyn ExtractionStrategy>)
    }

    #[cfg(not(feature = "grid"))]
    fn grid_strategy(
        _recognizer: Arc<dyn TextRecognizer>,
        _config: &Config,
        _ids: IdProvider,
    ) -> Option<Box<dyn ExtractionStrategy>> {
        None
    }

    /// Assembles an extractor from arbitrary strategies.
    pub fn from_strategies(
        primary: Option<Box<dyn ExtractionStrategy>>,
        fallback: Box<dyn ExtractionStrategy>,
        min_primary_events: usize,
    ) -> Self {
        Self {
            primary,
            fallback,
            min_primary_events,
        }
    }

    /// Entry point: decode `image_bytes` and extract its events.
    pub fn extract(&self, image_bytes: &[u8], forced_year: Option<i32>) -> Result<ExtractionResult> {
        let image = decode_image(image_bytes)?;
        self.extract_image(&image, forced_year)
    }

    pub fn extract_image(&self, image: &DynamicImage, forced_year: Option<i32>) -> Result<ExtractionResult> {
        log::info!("Extracting from {}×{} image", image.width(), image.height());

        if let Some(primary) = &self.primary
            && primary.applies_to(image)
        {
            let result = primary.run(image, forced_year)?;
            if result.events.len() >= self.min_primary_events {
                log::info!(
                    "Accepted {} path with {} events",
                    result.strategy,
                    result.events.len()
                );
                return Ok(result);
            }
            log::info!(
                "{} path found only {} events (< {}), falling back to {}",
                result.strategy,
                result.events.len(),
                self.min_primary_events,
                self.fallback.kind()
            );
        }

        self.fallback.run(image, forced_year)
    }
}
