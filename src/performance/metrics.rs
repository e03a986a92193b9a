//! Metric names and samples
//!
//! The set of metrics is closed: every metric the scorer understands has a
//! variant here, together with its label, unit, criticality and advice text.
//! Samples arriving from outside carry a free-form name and are converted
//! through [`RawSample::into_sample`], which drops names that do not match.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::GaugeError;

/// Scoring category a metric belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MetricCategory {
    /// Authentication context creation latency
    AuthLatency,
    /// Database query latency
    DbLatency,
    /// Total page load time
    LoadTime,
    /// Client bundle size
    BundleSize,
    /// Cache hit ratios
    CacheHit,
    /// Counters that are reported but never scored
    Informational,
}

/// Known metrics, in report order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MetricName {
    AuthContextTime,
    DbQueryTime,
    TotalLoadTime,
    BundleSize,
    ApiCacheHitRate,
    DbCacheHitRate,
    ApiRequestCount,
    DbQueryCount,
}

impl MetricName {
    /// All metrics in declaration order
    pub const ALL: [MetricName; 8] = [
        MetricName::AuthContextTime,
        MetricName::DbQueryTime,
        MetricName::TotalLoadTime,
        MetricName::BundleSize,
        MetricName::ApiCacheHitRate,
        MetricName::DbCacheHitRate,
        MetricName::ApiRequestCount,
        MetricName::DbQueryCount,
    ];

    /// Name used in JSON and configuration files
    pub fn wire_name(&self) -> &'static str {
        match self {
            Self::AuthContextTime => "authContextTime",
            Self::DbQueryTime => "dbQueryTime",
            Self::TotalLoadTime => "totalLoadTime",
            Self::BundleSize => "bundleSize",
            Self::ApiCacheHitRate => "apiCacheHitRate",
            Self::DbCacheHitRate => "dbCacheHitRate",
            Self::ApiRequestCount => "apiRequestCount",
            Self::DbQueryCount => "dbQueryCount",
        }
    }

    /// Human-readable label
    pub fn label(&self) -> &'static str {
        match self {
            Self::AuthContextTime => "Authentication context time",
            Self::DbQueryTime => "Database query time",
            Self::TotalLoadTime => "Total load time",
            Self::BundleSize => "Bundle size",
            Self::ApiCacheHitRate => "API cache hit rate",
            Self::DbCacheHitRate => "Database cache hit rate",
            Self::ApiRequestCount => "API request count",
            Self::DbQueryCount => "Database query count",
        }
    }

    /// Unit suffix used when rendering values
    pub fn unit(&self) -> &'static str {
        match self {
            Self::AuthContextTime | Self::DbQueryTime | Self::TotalLoadTime => "ms",
            Self::BundleSize => "KB",
            Self::ApiCacheHitRate | Self::DbCacheHitRate => "%",
            Self::ApiRequestCount => " requests",
            Self::DbQueryCount => " queries",
        }
    }

    pub fn category(&self) -> MetricCategory {
        match self {
            Self::AuthContextTime => MetricCategory::AuthLatency,
            Self::DbQueryTime => MetricCategory::DbLatency,
            Self::TotalLoadTime => MetricCategory::LoadTime,
            Self::BundleSize => MetricCategory::BundleSize,
            Self::ApiCacheHitRate | Self::DbCacheHitRate => MetricCategory::CacheHit,
            Self::ApiRequestCount | Self::DbQueryCount => MetricCategory::Informational,
        }
    }

    /// A failing critical metric fails the whole report
    pub fn is_critical(&self) -> bool {
        matches!(
            self.category(),
            MetricCategory::AuthLatency | MetricCategory::DbLatency | MetricCategory::LoadTime
        )
    }

    /// Static advice shown when this metric misses its target
    pub fn advice(&self) -> &'static str {
        match self {
            Self::AuthContextTime => {
                "Cache the session lookup and avoid re-creating the auth context on every request"
            }
            Self::DbQueryTime => {
                "Add indexes for slow queries and batch related lookups into a single round trip"
            }
            Self::TotalLoadTime => {
                "Defer non-critical data loading and render skeleton placeholders while it completes"
            }
            Self::BundleSize => "Split large routes into lazily loaded chunks and drop unused dependencies",
            Self::ApiCacheHitRate => "Increase API response cache lifetimes for data that rarely changes",
            Self::DbCacheHitRate => "Warm the query cache for frequently read records",
            Self::ApiRequestCount => "Deduplicate API requests issued during a single page render",
            Self::DbQueryCount => "Collapse repeated per-row queries into joined queries",
        }
    }
}

impl fmt::Display for MetricName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.wire_name())
    }
}

impl FromStr for MetricName {
    type Err = GaugeError;

    /// Accepts the camelCase wire name or its snake_case spelling
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .trim()
            .chars()
            .filter(|c| *c != '_' && *c != '-')
            .map(|c| c.to_ascii_lowercase())
            .collect();

        MetricName::ALL
            .iter()
            .copied()
            .find(|name| name.wire_name().to_ascii_lowercase() == normalized)
            .ok_or_else(|| GaugeError::invalid_sample(format!("unknown metric name: {}", s)))
    }
}

/// A single measurement of a known metric
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricSample {
    pub name: MetricName,
    pub value: f64,
    pub timestamp_millis: i64,
}

impl MetricSample {
    pub fn new(name: MetricName, value: f64, timestamp_millis: i64) -> Self {
        Self {
            name,
            value,
            timestamp_millis,
        }
    }

    /// Sample stamped with the current wall-clock time
    pub fn now(name: MetricName, value: f64) -> Self {
        Self::new(name, value, chrono::Utc::now().timestamp_millis())
    }
}

/// Externally supplied sample with an unchecked metric name
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawSample {
    pub name: String,
    pub value: f64,
    #[serde(default)]
    pub timestamp_millis: i64,
}

impl RawSample {
    /// Convert into a typed sample; unknown names and non-finite values yield `None`
    pub fn into_sample(self) -> Option<MetricSample> {
        if !self.value.is_finite() {
            tracing::warn!("Ignoring non-finite value for metric {}: {}", self.name, self.value);
            return None;
        }
        match self.name.parse::<MetricName>() {
            Ok(name) => Some(MetricSample::new(name, self.value, self.timestamp_millis)),
            Err(_) => {
                tracing::debug!("Ignoring sample for unrecognized metric: {}", self.name);
                None
            }
        }
    }

    /// Parse a `name=value` pair as given on the command line
    pub fn parse_assignment(input: &str) -> Result<Self, GaugeError> {
        let (name, value) = input
            .split_once('=')
            .ok_or_else(|| GaugeError::invalid_sample(format!("expected name=value, got '{}'", input)))?;

        let value: f64 = value.trim().parse().map_err(|_| {
            GaugeError::invalid_sample(format!("value for '{}' is not a number: '{}'", name, value))
        })?;
        if !value.is_finite() {
            return Err(GaugeError::invalid_sample(format!(
                "value for '{}' must be finite: '{}'",
                name, value
            )));
        }

        Ok(Self {
            name: name.trim().to_string(),
            value,
            timestamp_millis: chrono::Utc::now().timestamp_millis(),
        })
    }
}

/// Convert raw samples, dropping unrecognized names
pub fn typed_samples(raw: Vec<RawSample>) -> Vec<MetricSample> {
    raw.into_iter().filter_map(RawSample::into_sample).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metric_name_parsing() {
        assert_eq!(
            "authContextTime".parse::<MetricName>().unwrap(),
            MetricName::AuthContextTime
        );
        assert_eq!(
            "db_query_time".parse::<MetricName>().unwrap(),
            MetricName::DbQueryTime
        );
        assert_eq!(
            "API_CACHE_HIT_RATE".parse::<MetricName>().unwrap(),
            MetricName::ApiCacheHitRate
        );
        assert!("renderTime".parse::<MetricName>().is_err());
    }

    #[test]
    fn test_wire_name_matches_serde() {
        for name in MetricName::ALL {
            let json = serde_json::to_string(&name).unwrap();
            assert_eq!(json, format!("\"{}\"", name.wire_name()));
        }
    }

    #[test]
    fn test_criticality() {
        assert!(MetricName::AuthContextTime.is_critical());
        assert!(MetricName::DbQueryTime.is_critical());
        assert!(MetricName::TotalLoadTime.is_critical());
        assert!(!MetricName::BundleSize.is_critical());
        assert!(!MetricName::ApiCacheHitRate.is_critical());
        assert!(!MetricName::DbQueryCount.is_critical());
    }

    #[test]
    fn test_raw_sample_conversion() {
        let raw = vec![
            RawSample {
                name: "dbQueryTime".to_string(),
                value: 42.0,
                timestamp_millis: 10,
            },
            RawSample {
                name: "mysteryMetric".to_string(),
                value: 1.0,
                timestamp_millis: 11,
            },
        ];

        let typed = typed_samples(raw);
        assert_eq!(typed.len(), 1);
        assert_eq!(typed[0].name, MetricName::DbQueryTime);
        assert_eq!(typed[0].value, 42.0);
    }

    #[test]
    fn test_parse_assignment() {
        let sample = RawSample::parse_assignment("authContextTime=1700").unwrap();
        assert_eq!(sample.name, "authContextTime");
        assert_eq!(sample.value, 1700.0);

        assert!(RawSample::parse_assignment("authContextTime").is_err());
        assert!(RawSample::parse_assignment("authContextTime=fast").is_err());
    }

    #[test]
    fn test_non_finite_values_rejected() {
        for input in ["authContextTime=NaN", "dbQueryTime=inf", "totalLoadTime=-infinity"] {
            let err = RawSample::parse_assignment(input).unwrap_err();
            assert!(err.is_input_error());
        }

        let raw = vec![
            RawSample {
                name: "authContextTime".to_string(),
                value: f64::NAN,
                timestamp_millis: 1,
            },
            RawSample {
                name: "dbQueryTime".to_string(),
                value: f64::INFINITY,
                timestamp_millis: 1,
            },
            RawSample {
                name: "totalLoadTime".to_string(),
                value: 1200.0,
                timestamp_millis: 1,
            },
        ];
        let typed = typed_samples(raw);
        assert_eq!(typed.len(), 1);
        assert_eq!(typed[0].name, MetricName::TotalLoadTime);
    }
}
