//! Score report value object

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use super::metrics::MetricName;
use super::thresholds::Threshold;

/// Outcome of checking one metric against its threshold
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricResult {
    pub metric_name: MetricName,
    pub current_value: f64,
    pub threshold: Threshold,
    pub passed: bool,
}

/// Aggregated result of one validation pass.
///
/// Reports are built once by the aggregator and never modified; the fields
/// are exposed through accessors only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreReport {
    timestamp_iso: String,
    overall_score: f64,
    passed: bool,
    per_metric_results: Vec<MetricResult>,
    issues: Vec<String>,
    recommendations: Vec<String>,
}

impl ScoreReport {
    pub(crate) fn new(
        timestamp: DateTime<Utc>,
        overall_score: f64,
        passed: bool,
        per_metric_results: Vec<MetricResult>,
        issues: Vec<String>,
        recommendations: Vec<String>,
    ) -> Self {
        Self {
            timestamp_iso: timestamp.to_rfc3339_opts(SecondsFormat::Millis, true),
            overall_score,
            passed,
            per_metric_results,
            issues,
            recommendations,
        }
    }

    pub fn timestamp_iso(&self) -> &str {
        &self.timestamp_iso
    }

    /// Score in `0.0..=100.0`
    pub fn overall_score(&self) -> f64 {
        self.overall_score
    }

    pub fn passed(&self) -> bool {
        self.passed
    }

    pub fn per_metric_results(&self) -> &[MetricResult] {
        &self.per_metric_results
    }

    pub fn issues(&self) -> &[String] {
        &self.issues
    }

    pub fn recommendations(&self) -> &[String] {
        &self.recommendations
    }

    pub fn result_for(&self, metric: MetricName) -> Option<&MetricResult> {
        self.per_metric_results
            .iter()
            .find(|result| result.metric_name == metric)
    }

    pub fn failed_metrics(&self) -> Vec<MetricName> {
        self.per_metric_results
            .iter()
            .filter(|result| !result.passed)
            .map(|result| result.metric_name)
            .collect()
    }

    /// Failing metrics that fail the whole report
    pub fn critical_failures(&self) -> Vec<MetricName> {
        self.failed_metrics()
            .into_iter()
            .filter(MetricName::is_critical)
            .collect()
    }

    /// Letter grade for dashboard display
    pub fn grade(&self) -> char {
        match self.overall_score {
            s if s >= 90.0 => 'A',
            s if s >= 80.0 => 'B',
            s if s >= 70.0 => 'C',
            s if s >= 60.0 => 'D',
            _ => 'F',
        }
    }
}
