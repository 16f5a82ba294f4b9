// File: ./src/config.rs
// Handles configuration loading, saving, and defaults.
use crate::context::AppContext;
use crate::storage::EventStore;
use anyhow::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

/// Environment variable overriding `tesseract_cmd` (e.g. a Windows install path).
pub const TESSERACT_ENV: &str = "SCIENCECAL_TESSERACT";

fn default_true() -> bool {
    true
}

fn default_languages() -> String {
    "ron+eng".to_string()
}
fn default_fallback_languages() -> String {
    "eng".to_string()
}
fn default_tesseract_cmd() -> String {
    "tesseract".to_string()
}

fn default_min_grid_events() -> usize {
    10
}
fn default_upscale_factor() -> u32 {
    2
}

fn default_year_min() -> i32 {
    2024
}
fn default_year_max() -> i32 {
    2035
}

fn default_log_level() -> String {
    "info".to_string()
}

#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
pub struct Config {
    /// Tesseract language hint tried first.
    #[serde(default = "default_languages")]
    pub ocr_languages: String,
    /// Used once when the combined language pack is missing.
    #[serde(default = "default_fallback_languages")]
    pub ocr_fallback_languages: String,
    #[serde(default = "default_tesseract_cmd")]
    pub tesseract_cmd: String,
    #[serde(default)]
    pub tessdata_dir: Option<PathBuf>,

    #[serde(default = "default_true")]
    pub grid_enabled: bool,
    /// A grid result with fewer events is treated as a misdetected grid.
    #[serde(default = "default_min_grid_events")]
    pub min_grid_events: usize,
    #[serde(default = "default_true")]
    pub parallel_columns: bool,
    #[serde(default = "default_upscale_factor")]
    pub upscale_factor: u32,

    #[serde(default = "default_year_min")]
    pub year_min: i32,
    #[serde(default = "default_year_max")]
    pub year_max: i32,

    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            ocr_languages: default_languages(),
            ocr_fallback_languages: default_fallback_languages(),
            tesseract_cmd: default_tesseract_cmd(),
            tessdata_dir: None,
            grid_enabled: true,
            min_grid_events: 10,
            parallel_columns: true,
            upscale_factor: 2,
            year_min: 2024,
            year_max: 2035,
            log_level: default_log_level(),
        }
    }
}

impl Config {
    /// Load the configuration from disk using an explicit context.
    pub fn load(ctx: &dyn AppContext) -> Result<Self> {
        let path = ctx.get_config_file_path()?;

        if !path.exists() {
            return Err(anyhow::anyhow!("Config file not found"));
        }

        let contents = fs::read_to_string(&path).map_err(|e| {
            anyhow::anyhow!("Failed to read config file '{}': {}", path.display(), e)
        })?;

        let config: Config = toml::from_str(&contents).map_err(|e| {
            anyhow::anyhow!("Failed to parse config file '{}': {}", path.display(), e)
        })?;

        Ok(config.with_env_overrides())
    }

    /// Like `load`, but a missing file yields the defaults. Parse errors still fail.
    pub fn load_or_default(ctx: &dyn AppContext) -> Result<Self> {
        match Self::load(ctx) {
            Ok(cfg) => Ok(cfg),
            Err(e) if Self::is_missing_config_error(&e) => {
                log::debug!("No config file, using defaults");
                Ok(Self::default().with_env_overrides())
            }
            Err(e) => Err(e),
        }
    }

    fn with_env_overrides(mut self) -> Self {
        if let Ok(cmd) = std::env::var(TESSERACT_ENV)
            && !cmd.trim().is_empty()
        {
            self.tesseract_cmd = cmd;
        }
        self
    }

    /// Tessdata directory to hand to Tesseract: the configured one, else
    /// `~/.tessdata` when it exists (where the best-quality Romanian model is
    /// usually installed by hand).
    pub fn resolved_tessdata_dir(&self) -> Option<PathBuf> {
        if let Some(dir) = &self.tessdata_dir {
            return Some(dir.clone());
        }
        let user_dir = directories::BaseDirs::new()?.home_dir().join(".tessdata");
        user_dir.exists().then_some(user_dir)
    }

    /// Detects whether an error means the config file was missing, either by
    /// our explicit message or an IO NotFound anywhere in the chain.
    pub fn is_missing_config_error(err: &Error) -> bool {
        if err.to_string().contains("Config file not found") {
            return true;
        }

        for cause in err.chain() {
            if let Some(io_err) = cause.downcast_ref::<std::io::Error>()
                && io_err.kind() == std::io::ErrorKind::NotFound
            {
                return true;
            }
        }

        false
    }

    pub fn save(&self, ctx: &dyn AppContext) -> Result<()> {
        let path = ctx.get_config_file_path()?;
        EventStore::with_lock(&path, || {
            let toml_str = toml::to_string_pretty(self)?;
            EventStore::atomic_write(&path, toml_str)?;
            Ok(())
        })?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::TestContext;

    #[test]
    fn test_missing_file_gives_defaults() {
        let ctx = TestContext::new();
        assert!(Config::load(&ctx).is_err());
        let cfg = Config::load_or_default(&ctx).unwrap();
        assert_eq!(cfg.min_grid_events, 10);
        assert_eq!(cfg.ocr_languages, "ron+eng");
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let ctx = TestContext::new();
        let path = ctx.get_config_file_path().unwrap();
        fs::write(&path, "min_grid_events = 4\ngrid_enabled = false\n").unwrap();

        let cfg = Config::load(&ctx).unwrap();
        assert_eq!(cfg.min_grid_events, 4);
        assert!(!cfg.grid_enabled);
        assert!(cfg.parallel_columns);
        assert_eq!(cfg.year_max, 2035);
    }

    #[test]
    fn test_save_then_load() {
        let ctx = TestContext::new();
        let cfg = Config {
            upscale_factor: 3,
            ..Config::default()
        };
        cfg.save(&ctx).unwrap();
        let loaded = Config::load(&ctx).unwrap();
        assert_eq!(loaded.upscale_factor, 3);
    }

    #[test]
    fn test_broken_toml_is_not_treated_as_missing() {
        let ctx = TestContext::new();
        let path = ctx.get_config_file_path().unwrap();
        fs::write(&path, "min_grid_events = [").unwrap();
        let err = Config::load_or_default(&ctx).unwrap_err();
        assert!(!Config::is_missing_config_error(&err));
    }
}
