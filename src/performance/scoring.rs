//! Scoring aggregator
//!
//! Turns one snapshot of metric samples into a [`ScoreReport`]. The score is
//! a coarse dashboard heuristic: start at 100, subtract a penalty for each
//! failing latency, load-time or bundle-size metric, add a bonus for each
//! cache hit ratio that meets its target, then clamp to `0..=100`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::metrics::{MetricCategory, MetricName, MetricSample};
use super::report::{MetricResult, ScoreReport};
use super::thresholds::ThresholdTable;

const MAX_SCORE: f64 = 100.0;
const MIN_SCORE: f64 = 0.0;

/// Penalty and bonus points applied per metric category
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringWeights {
    pub auth_penalty: f64,
    pub db_penalty: f64,
    pub load_time_penalty: f64,
    pub bundle_penalty: f64,
    pub cache_bonus: f64,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            auth_penalty: 25.0,
            db_penalty: 20.0,
            load_time_penalty: 15.0,
            bundle_penalty: 10.0,
            cache_bonus: 5.0,
        }
    }
}

impl ScoringWeights {
    /// Points removed when a metric of this category misses its target
    pub fn penalty_for(&self, category: MetricCategory) -> f64 {
        match category {
            MetricCategory::AuthLatency => self.auth_penalty,
            MetricCategory::DbLatency => self.db_penalty,
            MetricCategory::LoadTime => self.load_time_penalty,
            MetricCategory::BundleSize => self.bundle_penalty,
            MetricCategory::CacheHit | MetricCategory::Informational => 0.0,
        }
    }

    /// Points added when a metric of this category meets its target
    pub fn bonus_for(&self, category: MetricCategory) -> f64 {
        match category {
            MetricCategory::CacheHit => self.cache_bonus,
            _ => 0.0,
        }
    }

    pub(crate) fn all_finite_non_negative(&self) -> bool {
        [
            self.auth_penalty,
            self.db_penalty,
            self.load_time_penalty,
            self.bundle_penalty,
            self.cache_bonus,
        ]
        .iter()
        .all(|w| w.is_finite() && *w >= 0.0)
    }
}

/// Combines samples and thresholds into score reports
#[derive(Debug, Clone, Default)]
pub struct ScoreAggregator {
    thresholds: ThresholdTable,
    weights: ScoringWeights,
}

impl ScoreAggregator {
    pub fn new(thresholds: ThresholdTable, weights: ScoringWeights) -> Self {
        Self {
            thresholds,
            weights,
        }
    }

    pub fn thresholds(&self) -> &ThresholdTable {
        &self.thresholds
    }

    pub fn weights(&self) -> &ScoringWeights {
        &self.weights
    }

    /// Evaluate a snapshot at the given time. Never fails.
    pub fn evaluate(&self, samples: &[MetricSample], now: DateTime<Utc>) -> ScoreReport {
        let latest = latest_per_metric(samples);

        let mut results = Vec::with_capacity(latest.len());
        for (name, sample) in latest {
            let Some(threshold) = self.thresholds.lookup(name) else {
                tracing::debug!("No threshold for {}, skipping", name);
                continue;
            };

            results.push(MetricResult {
                metric_name: name,
                current_value: sample.value,
                threshold: *threshold,
                passed: threshold.is_met_by(sample.value),
            });
        }

        let mut score = MAX_SCORE;
        let mut issues = Vec::new();
        let mut recommendations: Vec<String> = Vec::new();

        for result in &results {
            let category = result.metric_name.category();
            if result.passed {
                score += self.weights.bonus_for(category);
                continue;
            }

            score -= self.weights.penalty_for(category);
            issues.push(describe_failure(result));

            let advice = result.metric_name.advice();
            if !recommendations.iter().any(|existing| existing == advice) {
                recommendations.push(advice.to_string());
            }
        }

        let passed = results
            .iter()
            .filter(|result| result.metric_name.is_critical())
            .all(|result| result.passed);

        // NaN only arises from NaN weights; treat it as the worst score
        let overall_score = if score.is_nan() {
            MIN_SCORE
        } else {
            score.clamp(MIN_SCORE, MAX_SCORE)
        };

        ScoreReport::new(now, overall_score, passed, results, issues, recommendations)
    }
}

/// Keep the newest sample per metric; later input wins timestamp ties
fn latest_per_metric(samples: &[MetricSample]) -> BTreeMap<MetricName, MetricSample> {
    let mut latest: BTreeMap<MetricName, MetricSample> = BTreeMap::new();
    for sample in samples {
        match latest.get(&sample.name) {
            Some(existing) if existing.timestamp_millis > sample.timestamp_millis => {}
            _ => {
                latest.insert(sample.name, *sample);
            }
        }
    }
    latest
}

fn describe_failure(result: &MetricResult) -> String {
    let name = result.metric_name;
    let verdict = if name.is_critical() {
        "exceeds target"
    } else {
        "could be improved"
    };

    format!(
        "{} {}: {:.1}{} (target {})",
        name.label(),
        verdict,
        result.current_value,
        name.unit(),
        result.threshold
    )
}
