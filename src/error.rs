//! Error types for configuration, sample loading and report export

use thiserror::Error;

/// Result type for perfgauge operations
pub type GaugeResult<T> = Result<T, GaugeError>;

/// Errors raised outside the validation pass itself.
///
/// Running a validation never produces one of these; they come from loading
/// configuration, reading sample files and writing to export sinks.
#[derive(Error, Debug)]
pub enum GaugeError {
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Failed to parse TOML: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("Failed to serialize TOML: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    #[error("Invalid metric sample: {message}")]
    InvalidSample { message: String },

    #[error("Export to {sink} failed: {message}")]
    Export { sink: String, message: String },
}

impl GaugeError {
    /// Create a configuration error
    pub fn config_error(message: impl Into<String>) -> Self {
        GaugeError::Configuration {
            message: message.into(),
        }
    }

    /// Create an invalid sample error
    pub fn invalid_sample(message: impl Into<String>) -> Self {
        GaugeError::InvalidSample {
            message: message.into(),
        }
    }

    /// Create an export error for the named sink
    pub fn export_error(sink: impl Into<String>, message: impl Into<String>) -> Self {
        GaugeError::Export {
            sink: sink.into(),
            message: message.into(),
        }
    }

    /// Whether the error came from user-supplied input rather than the environment
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            GaugeError::Configuration { .. }
                | GaugeError::TomlParse(_)
                | GaugeError::InvalidSample { .. }
                | GaugeError::Json(_)
        )
    }
}
