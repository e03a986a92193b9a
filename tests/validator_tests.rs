use std::time::Duration;

use chrono::{TimeZone, Utc};
use perfgauge::performance::metrics::typed_samples;
use perfgauge::performance::{
    ExportFormat, Instrumentation, MemorySink, MetricName, MetricsCollector, PerformanceValidator,
    RawSample, ReportExporter, ReportSink, ScoreReport, SnapshotSource, Trend,
};
use perfgauge::{GaugeConfig, GaugeError, GaugeResult};
use tokio::sync::mpsc;

struct BrokenSink;

impl ReportSink for BrokenSink {
    fn name(&self) -> &str {
        "broken"
    }

    fn write_report(&mut self, _report: &ScoreReport, _format: ExportFormat) -> GaugeResult<()> {
        Err(GaugeError::export_error("broken", "disk full"))
    }
}

fn instrumented_validator(instrumentation: &Instrumentation) -> PerformanceValidator {
    PerformanceValidator::new(MetricsCollector::with_sources(instrumentation.sources()))
}

#[test]
fn test_validation_over_live_counters() {
    let instrumentation = Instrumentation::new();
    instrumentation.auth.record(Duration::from_millis(1700));
    instrumentation.db_queries.record(Duration::from_millis(50));
    instrumentation.page_load.record_load(Duration::from_millis(1200));
    instrumentation.page_load.set_bundle_size(200 * 1024);
    for _ in 0..17 {
        instrumentation.api_cache.record_hit();
        instrumentation.db_cache.record_hit();
    }
    for _ in 0..3 {
        instrumentation.api_cache.record_miss();
        instrumentation.db_cache.record_miss();
    }

    let mut validator = instrumented_validator(&instrumentation);
    let report = validator.run_validation();

    assert!(!report.passed());
    assert_eq!(report.failed_metrics(), vec![MetricName::AuthContextTime]);
    // 100 - 25 (auth) + 5 + 5 (cache bonuses)
    assert_eq!(report.overall_score(), 85.0);
    assert_eq!(validator.history().len(), 1);
}

#[test]
fn test_uninitialized_sources_do_not_block() {
    let instrumentation = Instrumentation::new();
    let mut validator = instrumented_validator(&instrumentation);

    let report = validator.run_validation();

    // Zero latencies pass, zero hit rates miss their target without penalty
    assert!(report.passed());
    assert_eq!(report.overall_score(), 100.0);
    assert_eq!(report.issues().len(), 2);
}

#[test]
fn test_missing_sources_yield_empty_report() {
    let mut validator = PerformanceValidator::new(MetricsCollector::new());
    let report = validator.run_validation();

    assert!(report.per_metric_results().is_empty());
    assert!(report.passed());
    assert_eq!(report.overall_score(), 100.0);
}

#[test]
fn test_repeated_validation_is_idempotent() {
    let samples = typed_samples(vec![
        RawSample {
            name: "authContextTime".to_string(),
            value: 650.0,
            timestamp_millis: 1,
        },
        RawSample {
            name: "dbCacheHitRate".to_string(),
            value: 92.0,
            timestamp_millis: 1,
        },
    ]);
    let mut validator = PerformanceValidator::new(MetricsCollector::with_sources(vec![Box::new(
        SnapshotSource::new(samples),
    )]));

    let at = Utc.with_ymd_and_hms(2024, 6, 1, 9, 0, 0).unwrap();
    let first = validator.run_validation_at(at);
    let second = validator.run_validation_at(at);

    assert_eq!(first.overall_score(), second.overall_score());
    assert_eq!(first.passed(), second.passed());
    assert_eq!(first, second);
    assert_eq!(validator.trend(), Trend::Stable);
}

#[test]
fn test_unknown_raw_metric_is_omitted() {
    let source = SnapshotSource::from_json(
        r#"[
            {"name": "dbQueryTime", "value": 40, "timestampMillis": 1},
            {"name": "firstContentfulPaint", "value": 99999, "timestampMillis": 1}
        ]"#,
    )
    .unwrap();
    let mut validator =
        PerformanceValidator::new(MetricsCollector::with_sources(vec![Box::new(source)]));

    let report = validator.run_validation();

    assert_eq!(report.per_metric_results().len(), 1);
    assert_eq!(report.overall_score(), 100.0);
    assert!(report.passed());
}

#[test]
fn test_sink_failure_never_reaches_caller() {
    let memory = MemorySink::new();
    let exporter = ReportExporter::new(ExportFormat::Text)
        .with_sink(Box::new(BrokenSink))
        .with_sink(Box::new(memory.clone()));

    let instrumentation = Instrumentation::new();
    instrumentation.auth.record(Duration::from_millis(900));
    let mut validator = instrumented_validator(&instrumentation).with_exporter(exporter);

    let report = validator.run_validation();

    assert!(!report.passed());
    let entries = memory.entries();
    assert_eq!(entries.len(), 1);
    assert!(entries[0].contains("FAILED"));
}

#[test]
fn test_from_config_applies_settings() {
    let dir = tempfile::tempdir().unwrap();
    let log_path = dir.path().join("reports.jsonl");
    let config = GaugeConfig {
        history_capacity: 2,
        json_log_path: Some(log_path.clone()),
        log_to_tracing: false,
        format: ExportFormat::Json,
        ..GaugeConfig::default()
    };

    let instrumentation = Instrumentation::new();
    let mut validator = PerformanceValidator::from_config(
        &config,
        MetricsCollector::with_sources(instrumentation.sources()),
    );

    for _ in 0..3 {
        validator.run_validation();
    }

    assert_eq!(validator.history().len(), 2);
    let logged = std::fs::read_to_string(&log_path).unwrap();
    assert_eq!(logged.lines().count(), 3);
}

#[tokio::test]
async fn test_periodic_validation_respects_max_runs() {
    let instrumentation = Instrumentation::new();
    let mut validator = instrumented_validator(&instrumentation);
    let (_shutdown_tx, mut shutdown_rx) = mpsc::channel::<()>(1);

    let runs = validator
        .run_periodic(Duration::from_millis(5), Some(3), &mut shutdown_rx)
        .await;

    assert_eq!(runs, 3);
    assert_eq!(validator.history().len(), 3);
}

#[tokio::test]
async fn test_periodic_validation_stops_on_shutdown() {
    let instrumentation = Instrumentation::new();
    let mut validator = instrumented_validator(&instrumentation);
    let (shutdown_tx, mut shutdown_rx) = mpsc::channel::<()>(1);

    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(30)).await;
        let _ = shutdown_tx.send(()).await;
    });

    let runs = validator
        .run_periodic(Duration::from_millis(5), None, &mut shutdown_rx)
        .await;

    assert!(runs >= 1);
    assert_eq!(validator.history().len(), runs.min(10));
}

#[tokio::test]
async fn test_periodic_validation_survives_closed_shutdown_channel() {
    let instrumentation = Instrumentation::new();
    let mut validator = instrumented_validator(&instrumentation);
    let (shutdown_tx, mut shutdown_rx) = mpsc::channel::<()>(1);
    drop(shutdown_tx);

    let runs = validator
        .run_periodic(Duration::from_millis(5), Some(5), &mut shutdown_rx)
        .await;

    assert_eq!(runs, 5);
    assert_eq!(validator.history().len(), 5);
}

#[tokio::test]
async fn test_periodic_refresh_reloads_samples() {
    let mut validator = PerformanceValidator::new(MetricsCollector::new());
    let (_shutdown_tx, mut shutdown_rx) = mpsc::channel::<()>(1);
    let mut auth_values = vec![100.0, 400.0, 2000.0].into_iter();

    validator
        .run_periodic_with(
            Duration::from_millis(5),
            Some(3),
            &mut shutdown_rx,
            |collector| {
                if let Some(value) = auth_values.next() {
                    collector.replace(Box::new(SnapshotSource::new(vec![
                        perfgauge::performance::MetricSample::now(
                            MetricName::AuthContextTime,
                            value,
                        ),
                    ])));
                }
            },
        )
        .await;

    let verdicts: Vec<bool> = validator.history().iter().map(|r| r.passed()).collect();
    assert_eq!(verdicts, vec![true, true, false]);
    assert_eq!(validator.trend(), Trend::Declining);
}
