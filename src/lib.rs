pub mod cli;
pub mod config;
pub mod error;
pub mod performance;

pub use config::GaugeConfig;
pub use error::{GaugeError, GaugeResult};
pub use performance::{PerformanceValidator, ScoreReport, Trend};
