// File: ./src/ocr.rs
//! Text recognition backends.
//!
//! The extraction pipeline only needs "image in, text out" with a language
//! hint. `TesseractCommand` drives the `tesseract` executable over pipes;
//! with the `tesseract` feature, `LeptessRecognizer` calls libtesseract in
//! process instead.
use crate::config::Config;
use anyhow::{Context, Result};
use image::DynamicImage;
use std::io::{Cursor, Write};
use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::sync::Arc;

pub trait TextRecognizer: Send + Sync {
    /// Recognizes the text in `image`. `languages` is a Tesseract language
    /// spec such as `ron+eng`.
    fn recognize(&self, image: &DynamicImage, languages: &str) -> Result<String>;
}

/// Primary language hint plus the one used when its data is unavailable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OcrLanguages {
    pub primary: String,
    pub fallback: String,
}

impl Default for OcrLanguages {
    fn default() -> Self {
        Self {
            primary: "ron+eng".to_string(),
            fallback: "eng".to_string(),
        }
    }
}

impl OcrLanguages {
    pub fn from_config(config: &Config) -> Self {
        Self {
            primary: config.ocr_languages.clone(),
            fallback: config.ocr_fallback_languages.clone(),
        }
    }
}

/// Recognizes with the primary languages, retrying once with the fallback.
/// Only a failure of the retry is returned.
pub fn recognize_with_fallback(
    recognizer: &dyn TextRecognizer,
    image: &DynamicImage,
    languages: &OcrLanguages,
) -> Result<String> {
    match recognizer.recognize(image, &languages.primary) {
        Ok(text) => Ok(text),
        Err(e) => {
            log::warn!(
                "OCR with '{}' failed ({:#}), retrying with '{}'",
                languages.primary,
                e,
                languages.fallback
            );
            recognizer
                .recognize(image, &languages.fallback)
                .with_context(|| format!("OCR failed with '{}'", languages.fallback))
        }
    }
}

fn encode_png(image: &DynamicImage) -> Result<Vec<u8>> {
    let mut buf = Cursor::new(Vec::new());
    image
        .write_to(&mut buf, image::ImageFormat::Png)
        .context("Failed to encode image as PNG")?;
    Ok(buf.into_inner())
}

/// Runs `tesseract stdin stdout -l <langs>` for each request.
#[derive(Debug, Clone)]
pub struct TesseractCommand {
    cmd: String,
    tessdata_dir: Option<PathBuf>,
}

impl TesseractCommand {
    pub fn new(cmd: impl Into<String>, tessdata_dir: Option<PathBuf>) -> Self {
        Self {
            cmd: cmd.into(),
            tessdata_dir,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.tesseract_cmd.clone(), config.resolved_tessdata_dir())
    }
}

impl TextRecognizer for TesseractCommand {
    fn recognize(&self, image: &DynamicImage, languages: &str) -> Result<String> {
        let png = encode_png(image)?;

        let mut command = Command::new(&self.cmd);
        command.arg("stdin").arg("stdout").arg("-l").arg(languages);
        if let Some(dir) = &self.tessdata_dir {
            command.arg("--tessdata-dir").arg(dir);
        }
        let mut child = command
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .with_context(|| format!("Failed to start '{}'. Is Tesseract installed?", self.cmd))?;

        // tesseract may exit before reading everything (e.g. missing language
        // data), so the child is always reaped and its stderr kept.
        let sent = match child.stdin.take() {
            Some(mut stdin) => stdin.write_all(&png),
            None => Err(std::io::Error::other("stdin not captured")),
        };

        let output = child
            .wait_with_output()
            .context("Failed to wait for tesseract")?;
        if let Err(e) = sent {
            return Err(anyhow::anyhow!(
                "Failed to send image to tesseract for '{}': {} ({})",
                languages,
                e,
                String::from_utf8_lossy(&output.stderr).trim()
            ));
        }
        if !output.status.success() {
            return Err(anyhow::anyhow!(
                "tesseract exited with {} for '{}': {}",
                output.status,
                languages,
                String::from_utf8_lossy(&output.stderr).trim()
            ));
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

#[cfg(feature = "tesseract")]
pub use self::leptess_backend::LeptessRecognizer;

#[cfg(feature = "tesseract")]
mod leptess_backend {
    use super::{TextRecognizer, encode_png};
    use anyhow::Result;
    use image::DynamicImage;
    use leptess::LepTess;
    use std::path::PathBuf;

    #[derive(Debug, Clone, Default)]
    pub struct LeptessRecognizer {
        tessdata_dir: Option<PathBuf>,
    }

    impl LeptessRecognizer {
        pub fn new(tessdata_dir: Option<PathBuf>) -> Self {
            Self { tessdata_dir }
        }
    }

    impl TextRecognizer for LeptessRecognizer {
        fn recognize(&self, image: &DynamicImage, languages: &str) -> Result<String> {
            let datapath = self
                .tessdata_dir
                .as_ref()
                .map(|p| p.to_string_lossy().into_owned());
            let mut lt = LepTess::new(datapath.as_deref(), languages).map_err(|e| {
                anyhow::anyhow!("Failed to initialize Tesseract with '{}': {:?}", languages, e)
            })?;

            let png = encode_png(image)?;
            lt.set_image_from_mem(&png)
                .map_err(|e| anyhow::anyhow!("Failed to set image from memory: {:?}", e))?;
            lt.set_source_resolution(300);
            lt.get_utf8_text()
                .map_err(|e| anyhow::anyhow!("Failed to read OCR text: {:?}", e))
        }
    }
}

/// Recognizer selected by build features and configuration.
#[cfg(feature = "tesseract")]
pub fn recognizer_from_config(config: &Config) -> Arc<dyn TextRecognizer> {
    Arc::new(LeptessRecognizer::new(config.resolved_tessdata_dir()))
}

#[cfg(not(feature = "tesseract"))]
pub fn recognizer_from_config(config: &Config) -> Arc<dyn TextRecognizer> {
    Arc::new(TesseractCommand::from_config(config))
}
