//! Validator configuration management

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{GaugeError, GaugeResult};
use crate::performance::export::ExportFormat;
use crate::performance::history::DEFAULT_TREND_DELTA;
use crate::performance::scoring::ScoringWeights;
use crate::performance::thresholds::{ThresholdEntry, ThresholdTable};

const CONFIG_DIR_NAME: &str = "perfgauge";
const CONFIG_FILE_NAME: &str = "perfgauge.toml";

/// Configuration for the performance validator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GaugeConfig {
    /// Number of recent reports kept for trend display
    pub history_capacity: usize,

    /// Score change between oldest and newest report needed to call a trend
    pub trend_delta: f64,

    /// Seconds between validation passes in watch mode
    pub interval_secs: u64,

    /// Output format for console reports
    pub format: ExportFormat,

    /// Optional file receiving one JSON line per report
    pub json_log_path: Option<PathBuf>,

    /// Emit a structured log event per report
    pub log_to_tracing: bool,

    /// Penalty and bonus points
    pub weights: ScoringWeights,

    /// Threshold overrides applied on top of the built-in table
    pub thresholds: Vec<ThresholdEntry>,
}

impl Default for GaugeConfig {
    fn default() -> Self {
        Self {
            history_capacity: 10,
            trend_delta: DEFAULT_TREND_DELTA,
            interval_secs: 30,
            format: ExportFormat::Text,
            json_log_path: None,
            log_to_tracing: true,
            weights: ScoringWeights::default(),
            thresholds: Vec::new(),
        }
    }
}

impl GaugeConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Default location: `<config dir>/perfgauge/perfgauge.toml`
    pub fn default_path() -> GaugeResult<PathBuf> {
        dirs::config_dir()
            .map(|dir| dir.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME))
            .ok_or_else(|| GaugeError::config_error("Unable to determine config directory"))
    }

    /// Load configuration from file; a missing file yields defaults
    pub async fn load_from_file(path: &Path) -> GaugeResult<Self> {
        if !path.exists() {
            tracing::debug!("No config at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = tokio::fs::read_to_string(path).await.map_err(|e| {
            GaugeError::config_error(format!("Failed to read {}: {}", path.display(), e))
        })?;

        let config = Self::from_toml(&content)?;
        tracing::info!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Parse and validate configuration text
    pub fn from_toml(content: &str) -> GaugeResult<Self> {
        let config: GaugeConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to file, creating parent directories
    pub async fn save_to_file(&self, path: &Path) -> GaugeResult<()> {
        self.validate()?;

        let content = toml::to_string_pretty(self)?;

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        tokio::fs::write(path, content).await?;
        Ok(())
    }

    /// Validate configuration settings
    pub fn validate(&self) -> GaugeResult<()> {
        if self.history_capacity == 0 {
            return Err(GaugeError::config_error(
                "History capacity must be greater than 0",
            ));
        }

        if self.interval_secs == 0 {
            return Err(GaugeError::config_error(
                "Validation interval must be greater than 0",
            ));
        }

        if !self.trend_delta.is_finite() || self.trend_delta < 0.0 {
            return Err(GaugeError::config_error(
                "Trend delta must be a non-negative number",
            ));
        }

        if !self.weights.all_finite_non_negative() {
            return Err(GaugeError::config_error(
                "Scoring weights must be non-negative numbers",
            ));
        }

        Ok(())
    }

    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    /// Built-in thresholds with the configured overrides applied
    pub fn threshold_table(&self) -> ThresholdTable {
        ThresholdTable::with_overrides(&self.thresholds)
    }
}
