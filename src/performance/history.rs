//! Bounded report history and trend classification

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fmt;

use super::report::ScoreReport;

/// Default score difference needed to call a trend
pub const DEFAULT_TREND_DELTA: f64 = 5.0;

/// Direction of the score across the history window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Trend {
    Improving,
    Declining,
    Stable,
}

impl Trend {
    /// Classify the change from the oldest to the newest score
    pub fn classify(oldest: f64, newest: f64, delta: f64) -> Self {
        let change = newest - oldest;
        if change > delta {
            Trend::Improving
        } else if change < -delta {
            Trend::Declining
        } else {
            Trend::Stable
        }
    }

    pub fn marker(&self) -> &'static str {
        match self {
            Trend::Improving => "📈",
            Trend::Declining => "📉",
            Trend::Stable => "➡️",
        }
    }
}

impl fmt::Display for Trend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Trend::Improving => write!(f, "improving"),
            Trend::Declining => write!(f, "declining"),
            Trend::Stable => write!(f, "stable"),
        }
    }
}

/// Summary of the history window for dashboards
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrendSummary {
    pub trend: Trend,
    pub sample_count: usize,
    pub oldest_score: Option<f64>,
    pub newest_score: Option<f64>,
    pub average_score: Option<f64>,
    pub pass_rate: Option<f64>,
}

/// Fixed-capacity history of recent reports, oldest evicted first
#[derive(Debug, Clone)]
pub struct ReportHistory {
    reports: VecDeque<ScoreReport>,
    capacity: usize,
    trend_delta: f64,
}

impl ReportHistory {
    /// Create a history holding at most `capacity` reports (minimum 1)
    pub fn new(capacity: usize) -> Self {
        Self::with_trend_delta(capacity, DEFAULT_TREND_DELTA)
    }

    pub fn with_trend_delta(capacity: usize, trend_delta: f64) -> Self {
        let capacity = capacity.max(1);
        Self {
            reports: VecDeque::with_capacity(capacity),
            capacity,
            trend_delta,
        }
    }

    /// Append a report, evicting the oldest when full
    pub fn push(&mut self, report: ScoreReport) {
        while self.reports.len() >= self.capacity {
            self.reports.pop_front();
        }
        self.reports.push_back(report);
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.reports.len()
    }

    pub fn is_empty(&self) -> bool {
        self.reports.is_empty()
    }

    pub fn clear(&mut self) {
        self.reports.clear();
    }

    pub fn latest(&self) -> Option<&ScoreReport> {
        self.reports.back()
    }

    pub fn oldest(&self) -> Option<&ScoreReport> {
        self.reports.front()
    }

    /// Reports from oldest to newest
    pub fn iter(&self) -> impl Iterator<Item = &ScoreReport> {
        self.reports.iter()
    }

    /// Compare the oldest and newest report; fewer than two is stable
    pub fn trend(&self) -> Trend {
        match (self.reports.front(), self.reports.back()) {
            (Some(oldest), Some(newest)) if self.reports.len() >= 2 => Trend::classify(
                oldest.overall_score(),
                newest.overall_score(),
                self.trend_delta,
            ),
            _ => Trend::Stable,
        }
    }

    pub fn average_score(&self) -> Option<f64> {
        if self.reports.is_empty() {
            return None;
        }
        let total: f64 = self.reports.iter().map(ScoreReport::overall_score).sum();
        Some(total / self.reports.len() as f64)
    }

    /// Fraction of reports in the window that passed
    pub fn pass_rate(&self) -> Option<f64> {
        if self.reports.is_empty() {
            return None;
        }
        let passed = self.reports.iter().filter(|r| r.passed()).count();
        Some(passed as f64 / self.reports.len() as f64)
    }

    pub fn summary(&self) -> TrendSummary {
        TrendSummary {
            trend: self.trend(),
            sample_count: self.reports.len(),
            oldest_score: self.oldest().map(ScoreReport::overall_score),
            newest_score: self.latest().map(ScoreReport::overall_score),
            average_score: self.average_score(),
            pass_rate: self.pass_rate(),
        }
    }
}

impl Default for ReportHistory {
    fn default() -> Self {
        Self::new(10)
    }
}
