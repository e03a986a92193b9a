//! Threshold table
//!
//! Maps each metric to a target value and comparison operator. The table is
//! built once from the defaults plus any configured overrides and is never
//! mutated afterwards. Entries that cannot be understood are skipped.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use super::metrics::MetricName;
use crate::error::GaugeError;

/// Comparison applied as `value <op> target`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Comparison {
    Lt,
    Lte,
    Gt,
    Gte,
    Eq,
}

impl Comparison {
    /// Whether `value` satisfies the comparison against `target`. NaN never does.
    pub fn holds(&self, value: f64, target: f64) -> bool {
        match self {
            Comparison::Lt => value < target,
            Comparison::Lte => value <= target,
            Comparison::Gt => value > target,
            Comparison::Gte => value >= target,
            Comparison::Eq => (value - target).abs() <= f64::EPSILON,
        }
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            Comparison::Lt => "<",
            Comparison::Lte => "<=",
            Comparison::Gt => ">",
            Comparison::Gte => ">=",
            Comparison::Eq => "==",
        }
    }
}

impl fmt::Display for Comparison {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

impl FromStr for Comparison {
    type Err = GaugeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "lt" | "<" => Ok(Comparison::Lt),
            "lte" | "<=" => Ok(Comparison::Lte),
            "gt" | ">" => Ok(Comparison::Gt),
            "gte" | ">=" => Ok(Comparison::Gte),
            "eq" | "==" | "=" => Ok(Comparison::Eq),
            other => Err(GaugeError::config_error(format!(
                "unknown comparison operator: {}",
                other
            ))),
        }
    }
}

/// Target for a single metric
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Threshold {
    pub metric_name: MetricName,
    pub comparison: Comparison,
    pub target: f64,
}

impl Threshold {
    pub fn new(metric_name: MetricName, comparison: Comparison, target: f64) -> Self {
        Self {
            metric_name,
            comparison,
            target,
        }
    }

    pub fn is_met_by(&self, value: f64) -> bool {
        self.comparison.holds(value, self.target)
    }
}

impl fmt::Display for Threshold {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {}{}",
            self.comparison,
            self.target,
            self.metric_name.unit()
        )
    }
}

/// Unvalidated threshold as written in a configuration file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThresholdEntry {
    pub metric: String,
    pub comparison: String,
    pub target: f64,
}

impl ThresholdEntry {
    pub fn new(metric: impl Into<String>, comparison: impl Into<String>, target: f64) -> Self {
        Self {
            metric: metric.into(),
            comparison: comparison.into(),
            target,
        }
    }

    /// Validate the entry into a threshold
    pub fn parse(&self) -> Result<Threshold, GaugeError> {
        let metric: MetricName = self
            .metric
            .parse()
            .map_err(|_| GaugeError::config_error(format!("unknown metric: {}", self.metric)))?;
        let comparison: Comparison = self.comparison.parse()?;
        if !self.target.is_finite() {
            return Err(GaugeError::config_error(format!(
                "target for {} is not a finite number",
                self.metric
            )));
        }
        Ok(Threshold::new(metric, comparison, self.target))
    }
}

/// Static lookup of thresholds by metric
#[derive(Debug, Clone, PartialEq)]
pub struct ThresholdTable {
    thresholds: HashMap<MetricName, Threshold>,
}

impl ThresholdTable {
    /// Table with no thresholds; every metric is skipped
    pub fn empty() -> Self {
        Self {
            thresholds: HashMap::new(),
        }
    }

    /// Built-in targets for the dashboard metrics
    pub fn defaults() -> Self {
        let defaults = [
            Threshold::new(MetricName::AuthContextTime, Comparison::Lt, 500.0),
            Threshold::new(MetricName::DbQueryTime, Comparison::Lt, 100.0),
            Threshold::new(MetricName::TotalLoadTime, Comparison::Lt, 3000.0),
            Threshold::new(MetricName::BundleSize, Comparison::Lt, 500.0),
            Threshold::new(MetricName::ApiCacheHitRate, Comparison::Gt, 70.0),
            Threshold::new(MetricName::DbCacheHitRate, Comparison::Gt, 70.0),
        ];

        Self {
            thresholds: defaults.into_iter().map(|t| (t.metric_name, t)).collect(),
        }
    }

    /// Build from configuration entries only, skipping malformed ones
    pub fn from_entries(entries: &[ThresholdEntry]) -> Self {
        let mut table = Self::empty();
        table.apply_entries(entries);
        table
    }

    /// Defaults with configured entries overriding them metric by metric
    pub fn with_overrides(entries: &[ThresholdEntry]) -> Self {
        let mut table = Self::defaults();
        table.apply_entries(entries);
        table
    }

    fn apply_entries(&mut self, entries: &[ThresholdEntry]) {
        for entry in entries {
            match entry.parse() {
                Ok(threshold) => {
                    self.thresholds.insert(threshold.metric_name, threshold);
                }
                Err(e) => {
                    tracing::warn!("Skipping threshold entry for '{}': {}", entry.metric, e);
                }
            }
        }
    }

    pub fn lookup(&self, metric: MetricName) -> Option<&Threshold> {
        self.thresholds.get(&metric)
    }

    pub fn len(&self) -> usize {
        self.thresholds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.thresholds.is_empty()
    }

    /// Thresholds in metric declaration order
    pub fn iter(&self) -> impl Iterator<Item = &Threshold> {
        MetricName::ALL
            .iter()
            .filter_map(move |name| self.thresholds.get(name))
    }
}

impl Default for ThresholdTable {
    fn default() -> Self {
        Self::defaults()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_comparison_parsing() {
        assert_eq!("lt".parse::<Comparison>().unwrap(), Comparison::Lt);
        assert_eq!("LTE".parse::<Comparison>().unwrap(), Comparison::Lte);
        assert_eq!(">".parse::<Comparison>().unwrap(), Comparison::Gt);
        assert_eq!(">=".parse::<Comparison>().unwrap(), Comparison::Gte);
        assert_eq!("==".parse::<Comparison>().unwrap(), Comparison::Eq);
        assert!("approx".parse::<Comparison>().is_err());
    }

    #[test]
    fn test_comparison_semantics() {
        assert!(Comparison::Lt.holds(499.0, 500.0));
        assert!(!Comparison::Lt.holds(500.0, 500.0));
        assert!(Comparison::Lte.holds(500.0, 500.0));
        assert!(Comparison::Gt.holds(85.0, 70.0));
        assert!(!Comparison::Gte.holds(69.9, 70.0));
        assert!(Comparison::Eq.holds(1.0, 1.0));
        assert!(!Comparison::Lt.holds(f64::NAN, 500.0));
        assert!(!Comparison::Gt.holds(f64::NAN, 500.0));
    }

    #[test]
    fn test_default_table() {
        let table = ThresholdTable::defaults();
        assert_eq!(table.len(), 6);

        let auth = table.lookup(MetricName::AuthContextTime).unwrap();
        assert_eq!(auth.comparison, Comparison::Lt);
        assert_eq!(auth.target, 500.0);

        assert!(table.lookup(MetricName::ApiRequestCount).is_none());
        assert!(table.lookup(MetricName::DbQueryCount).is_none());
    }

    #[test]
    fn test_malformed_entries_are_skipped() {
        let entries = vec![
            ThresholdEntry::new("authContextTime", "lt", 800.0),
            ThresholdEntry::new("dbQueryTime", "roughly", 50.0),
            ThresholdEntry::new("renderTime", "lt", 10.0),
            ThresholdEntry::new("bundleSize", "lt", f64::INFINITY),
        ];

        let table = ThresholdTable::from_entries(&entries);
        assert_eq!(table.len(), 1);
        assert_eq!(table.lookup(MetricName::AuthContextTime).unwrap().target, 800.0);
        assert!(table.lookup(MetricName::DbQueryTime).is_none());
    }

    #[test]
    fn test_overrides_replace_defaults() {
        let table = ThresholdTable::with_overrides(&[
            ThresholdEntry::new("db_query_time", "lte", 250.0),
            ThresholdEntry::new("dbQueryCount", "lt", 40.0),
        ]);

        assert_eq!(table.len(), 7);
        let db = table.lookup(MetricName::DbQueryTime).unwrap();
        assert_eq!(db.comparison, Comparison::Lte);
        assert_eq!(db.target, 250.0);

        let order: Vec<MetricName> = table.iter().map(|t| t.metric_name).collect();
        assert_eq!(order.first(), Some(&MetricName::AuthContextTime));
        assert_eq!(order.last(), Some(&MetricName::DbQueryCount));
    }
}
