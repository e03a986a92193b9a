//! Performance scoring module
//!
//! This module turns raw performance counters into dashboard health reports:
//! - Metric sources reading in-memory counters from instrumented subsystems
//! - A static threshold table with per-metric targets
//! - A scoring aggregator producing a 0-100 score and pass/fail verdict
//! - A bounded history of recent reports for trend display
//! - Export of reports as text or JSON to console, file and log sinks

pub mod cache;
pub mod export;
pub mod history;
pub mod metrics;
pub mod report;
pub mod scoring;
pub mod sources;
pub mod thresholds;

// Re-export main types for easy access
pub use cache::{CacheCounters, CacheStats};
pub use export::{
    ConsoleSink, ExportFormat, JsonLinesSink, MemorySink, ReportExporter, ReportSink, TracingSink,
};
pub use history::{ReportHistory, Trend, TrendSummary};
pub use metrics::{MetricCategory, MetricName, MetricSample, RawSample};
pub use report::{MetricResult, ScoreReport};
pub use scoring::{ScoreAggregator, ScoringWeights};
pub use sources::{
    ApiCacheSource, AuthTimingSource, DbQuerySource, Instrumentation, LatencyRecorder,
    LoadTimings, MetricSource, MetricsCollector, PageLoadSource, SnapshotSource,
};
pub use thresholds::{Comparison, Threshold, ThresholdEntry, ThresholdTable};

use chrono::{DateTime, Utc};
use std::time::Duration;
use tokio::sync::mpsc;

use crate::config::GaugeConfig;

/// Runs validation passes and keeps their history.
///
/// Owned by whatever drives validation (a CLI command, a timer loop); there
/// is no global instance.
#[derive(Debug)]
pub struct PerformanceValidator {
    /// Registered metric sources
    collector: MetricsCollector,
    /// Threshold table and weights
    aggregator: ScoreAggregator,
    /// Recent reports for trend display
    history: ReportHistory,
    /// Output sinks
    exporter: ReportExporter,
}

impl PerformanceValidator {
    /// Create a validator with default thresholds, weights and no sinks
    pub fn new(collector: MetricsCollector) -> Self {
        Self {
            collector,
            aggregator: ScoreAggregator::default(),
            history: ReportHistory::default(),
            exporter: ReportExporter::default(),
        }
    }

    /// Wire up a validator from configuration
    pub fn from_config(config: &GaugeConfig, collector: MetricsCollector) -> Self {
        let mut exporter = ReportExporter::new(config.format);
        if config.log_to_tracing {
            exporter.add_sink(Box::new(TracingSink));
        }
        if let Some(path) = &config.json_log_path {
            exporter.add_sink(Box::new(JsonLinesSink::new(path.clone())));
        }

        Self {
            collector,
            aggregator: ScoreAggregator::new(config.threshold_table(), config.weights.clone()),
            history: ReportHistory::with_trend_delta(config.history_capacity, config.trend_delta),
            exporter,
        }
    }

    pub fn with_aggregator(mut self, aggregator: ScoreAggregator) -> Self {
        self.aggregator = aggregator;
        self
    }

    pub fn with_history(mut self, history: ReportHistory) -> Self {
        self.history = history;
        self
    }

    pub fn with_exporter(mut self, exporter: ReportExporter) -> Self {
        self.exporter = exporter;
        self
    }

    pub fn collector(&self) -> &MetricsCollector {
        &self.collector
    }

    pub fn collector_mut(&mut self) -> &mut MetricsCollector {
        &mut self.collector
    }

    pub fn aggregator(&self) -> &ScoreAggregator {
        &self.aggregator
    }

    pub fn exporter_mut(&mut self) -> &mut ReportExporter {
        &mut self.exporter
    }

    pub fn history(&self) -> &ReportHistory {
        &self.history
    }

    pub fn trend(&self) -> Trend {
        self.history.trend()
    }

    pub fn trend_summary(&self) -> TrendSummary {
        self.history.summary()
    }

    /// Run one validation pass now
    pub fn run_validation(&mut self) -> ScoreReport {
        self.run_validation_at(Utc::now())
    }

    /// Run one validation pass stamped with `now`. Never fails.
    pub fn run_validation_at(&mut self, now: DateTime<Utc>) -> ScoreReport {
        let samples = self.collector.snapshot();
        let report = self.aggregator.evaluate(&samples, now);

        tracing::debug!(
            "Validation pass: {} samples, {} scored, score {:.0}",
            samples.len(),
            report.per_metric_results().len(),
            report.overall_score()
        );

        self.history.push(report.clone());
        self.exporter.export(&report);
        report
    }

    /// Run passes on a fixed interval until `max_runs` is reached or a
    /// shutdown signal arrives. Returns the number of passes run.
    pub async fn run_periodic(
        &mut self,
        interval: Duration,
        max_runs: Option<usize>,
        shutdown: &mut mpsc::Receiver<()>,
    ) -> usize {
        self.run_periodic_with(interval, max_runs, shutdown, |_| {})
            .await
    }

    /// Like [`run_periodic`](Self::run_periodic), calling `refresh` on the
    /// collector before every pass (e.g. to reload a samples file)
    pub async fn run_periodic_with<F>(
        &mut self,
        interval: Duration,
        max_runs: Option<usize>,
        shutdown: &mut mpsc::Receiver<()>,
        mut refresh: F,
    ) -> usize
    where
        F: FnMut(&mut MetricsCollector),
    {
        let mut ticker = tokio::time::interval(interval);
        let mut runs = 0usize;
        let mut shutdown_open = true;

        tracing::info!("Starting periodic validation every {:?}", interval);

        loop {
            if max_runs.is_some_and(|max| runs >= max) {
                break;
            }

            tokio::select! {
                _ = ticker.tick() => {
                    refresh(&mut self.collector);
                    self.run_validation();
                    runs += 1;
                }
                signal = shutdown.recv(), if shutdown_open => match signal {
                    Some(()) => {
                        tracing::info!("Periodic validation stopped after {} passes", runs);
                        break;
                    }
                    None => {
                        tracing::debug!("Shutdown channel closed; running until max_runs");
                        shutdown_open = false;
                    }
                },
            }
        }

        runs
    }
}
