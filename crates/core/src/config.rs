//! Viewer configuration.
//!
//! All timing and layout tunables live in one [`ViewerConfig`]. Values can be
//! loaded from a TOML file, overridden from environment variables, or built
//! programmatically. Durations are stored in milliseconds so the file format
//! stays flat.

use crate::error::ConfigError;
use scanview_scheduler::{BatchConfig, RetryPolicy};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;
use viewer_core::RowMetrics;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewerConfig {
    /// Total raster fetch attempts, including the first
    pub retry_attempts: u32,
    pub retry_backoff_ms: u64,
    pub raster_timeout_ms: u64,
    /// Delays after load at which the rendered size is sampled
    pub measure_delays_ms: Vec<u64>,
    pub resize_settle_ms: u64,
    /// Samples narrower than this fraction of the expected width are ignored
    pub min_plausible_fraction: f32,
    pub max_page_width: f32,
    /// Height over width used before a page is measured
    pub default_aspect_ratio: f32,
    pub estimate_padding: f32,
    pub measured_padding: f32,
    pub batch_size: usize,
    pub highlight_debounce_ms: u64,
    /// Fraction of the viewport kept above the first search match
    pub scroll_margin: f32,
    pub copied_ack_ms: u64,
    pub min_font_px: f32,
    pub overscan: usize,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            retry_attempts: 3,
            retry_backoff_ms: 1_000,
            raster_timeout_ms: 10_000,
            measure_delays_ms: vec![80, 240, 600],
            resize_settle_ms: 80,
            min_plausible_fraction: 0.5,
            max_page_width: 900.0,
            default_aspect_ratio: 1584.0 / 1224.0,
            estimate_padding: 80.0,
            measured_padding: 12.0,
            batch_size: 50,
            highlight_debounce_ms: 180,
            scroll_margin: 0.18,
            copied_ack_ms: 1_200,
            min_font_px: 8.0,
            overscan: 2,
        }
    }
}

impl ViewerConfig {
    /// Loads configuration from a TOML file.
    ///
    /// Keys that are absent keep their defaults:
    /// ```toml
    /// retry_attempts = 5
    /// max_page_width = 1100.0
    /// measure_delays_ms = [50, 200, 800]
    /// ```
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or parsed, or if a value
    /// is out of range.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path.as_ref())?;
        let config: Self = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Defaults overridden by environment variables.
    ///
    /// Environment variables:
    /// - `SCANVIEW_RETRY_ATTEMPTS`
    /// - `SCANVIEW_RETRY_BACKOFF_MS`
    /// - `SCANVIEW_RASTER_TIMEOUT_MS`
    /// - `SCANVIEW_BATCH_SIZE`
    /// - `SCANVIEW_MAX_PAGE_WIDTH`
    /// - `SCANVIEW_HIGHLIGHT_DEBOUNCE_MS`
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();
        config.apply_env()?;
        Ok(config)
    }

    /// Applies environment overrides on top of the current values.
    pub fn apply_env(&mut self) -> Result<(), ConfigError> {
        if let Some(value) = env_value("SCANVIEW_RETRY_ATTEMPTS")? {
            self.retry_attempts = value;
        }
        if let Some(value) = env_value("SCANVIEW_RETRY_BACKOFF_MS")? {
            self.retry_backoff_ms = value;
        }
        if let Some(value) = env_value("SCANVIEW_RASTER_TIMEOUT_MS")? {
            self.raster_timeout_ms = value;
        }
        if let Some(value) = env_value("SCANVIEW_BATCH_SIZE")? {
            self.batch_size = value;
        }
        if let Some(value) = env_value("SCANVIEW_MAX_PAGE_WIDTH")? {
            self.max_page_width = value;
        }
        if let Some(value) = env_value("SCANVIEW_HIGHLIGHT_DEBOUNCE_MS")? {
            self.highlight_debounce_ms = value;
        }

        self.validate()
    }

    /// Loads `path` when given, then applies environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_env()?;
        Ok(config)
    }

    /// Saves configuration to a TOML file, creating parent directories.
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)?;
        fs::write(path, contents)?;
        Ok(())
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.retry_attempts == 0 {
            return Err(ConfigError::InvalidValue("retry_attempts".to_string()));
        }
        if self.batch_size == 0 {
            return Err(ConfigError::InvalidValue("batch_size".to_string()));
        }
        if !(self.max_page_width > 0.0) {
            return Err(ConfigError::InvalidValue("max_page_width".to_string()));
        }
        if !(self.default_aspect_ratio > 0.0) {
            return Err(ConfigError::InvalidValue("default_aspect_ratio".to_string()));
        }
        if !(0.0..=1.0).contains(&self.min_plausible_fraction) {
            return Err(ConfigError::InvalidValue("min_plausible_fraction".to_string()));
        }
        if !(0.0..1.0).contains(&self.scroll_margin) {
            return Err(ConfigError::InvalidValue("scroll_margin".to_string()));
        }
        // The final pass is the one with the highest index.
        let delays = &self.measure_delays_ms;
        if delays.windows(2).any(|pair| pair[0] >= pair[1]) {
            return Err(ConfigError::InvalidValue("measure_delays_ms".to_string()));
        }
        Ok(())
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.retry_attempts,
            Duration::from_millis(self.retry_backoff_ms),
            self.raster_timeout(),
        )
    }

    pub fn batch_config(&self) -> BatchConfig {
        BatchConfig {
            batch_size: self.batch_size,
            retry: self.retry_policy(),
        }
    }

    pub fn row_metrics(&self, container_width: f32) -> RowMetrics {
        RowMetrics {
            container_width,
            max_width: self.max_page_width,
            aspect_ratio: self.default_aspect_ratio,
            padding: self.estimate_padding,
        }
    }

    pub fn raster_timeout(&self) -> Duration {
        Duration::from_millis(self.raster_timeout_ms)
    }

    pub fn measure_delays(&self) -> Vec<Duration> {
        self.measure_delays_ms
            .iter()
            .copied()
            .map(Duration::from_millis)
            .collect()
    }

    pub fn resize_settle(&self) -> Duration {
        Duration::from_millis(self.resize_settle_ms)
    }

    pub fn highlight_debounce(&self) -> Duration {
        Duration::from_millis(self.highlight_debounce_ms)
    }

    pub fn copied_ack(&self) -> Duration {
        Duration::from_millis(self.copied_ack_ms)
    }
}

fn env_value<T: std::str::FromStr>(key: &str) -> Result<Option<T>, ConfigError> {
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|_| ConfigError::InvalidValue(key.to_string())),
        Err(_) => Ok(None),
    }
}
