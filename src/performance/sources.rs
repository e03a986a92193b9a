//! Metric source adapters
//!
//! Each instrumented subsystem keeps its own counters and hands an `Arc` of
//! them to a source. Reading a source is an in-memory snapshot; a subsystem
//! that has not recorded anything yet reads as zero rather than failing.

use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use super::cache::CacheCounters;
use super::metrics::{typed_samples, MetricName, MetricSample, RawSample};
use crate::error::{GaugeError, GaugeResult};

/// A producer of metric samples
pub trait MetricSource: Send + Sync {
    /// Short name of the subsystem this source reads from
    fn domain(&self) -> &'static str;

    /// Current values for every metric this source covers
    fn read(&self) -> Vec<MetricSample>;
}

fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Latency recorder keeping the most recent and running mean durations
#[derive(Debug, Default)]
pub struct LatencyRecorder {
    last_micros: AtomicU64,
    total_micros: AtomicU64,
    count: AtomicU64,
}

impl LatencyRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, duration: Duration) {
        let micros = u64::try_from(duration.as_micros()).unwrap_or(u64::MAX);
        self.last_micros.store(micros, Ordering::Relaxed);
        self.total_micros.fetch_add(micros, Ordering::Relaxed);
        self.count.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_millis(&self, millis: f64) {
        if millis.is_finite() && millis >= 0.0 {
            let duration = Duration::try_from_secs_f64(millis / 1000.0).unwrap_or(Duration::MAX);
            self.record(duration);
        }
    }

    /// Run `f` and record how long it took
    pub fn time<T>(&self, f: impl FnOnce() -> T) -> T {
        let start = Instant::now();
        let result = f();
        self.record(start.elapsed());
        result
    }

    pub fn last_millis(&self) -> f64 {
        self.last_micros.load(Ordering::Relaxed) as f64 / 1000.0
    }

    pub fn mean_millis(&self) -> f64 {
        let count = self.count.load(Ordering::Relaxed);
        if count == 0 {
            return 0.0;
        }
        self.total_micros.load(Ordering::Relaxed) as f64 / count as f64 / 1000.0
    }

    pub fn count(&self) -> u64 {
        self.count.load(Ordering::Relaxed)
    }

    pub fn reset(&self) {
        self.last_micros.store(0, Ordering::Relaxed);
        self.total_micros.store(0, Ordering::Relaxed);
        self.count.store(0, Ordering::Relaxed);
    }
}

/// Reads authentication context creation time
pub struct AuthTimingSource {
    timings: Arc<LatencyRecorder>,
}

impl AuthTimingSource {
    pub fn new(timings: Arc<LatencyRecorder>) -> Self {
        Self { timings }
    }
}

impl MetricSource for AuthTimingSource {
    fn domain(&self) -> &'static str {
        "auth"
    }

    fn read(&self) -> Vec<MetricSample> {
        vec![MetricSample::new(
            MetricName::AuthContextTime,
            self.timings.last_millis(),
            now_millis(),
        )]
    }
}

/// Reads API response cache counters
pub struct ApiCacheSource {
    cache: Arc<CacheCounters>,
}

impl ApiCacheSource {
    pub fn new(cache: Arc<CacheCounters>) -> Self {
        Self { cache }
    }
}

impl MetricSource for ApiCacheSource {
    fn domain(&self) -> &'static str {
        "api"
    }

    fn read(&self) -> Vec<MetricSample> {
        let stats = self.cache.stats();
        let now = now_millis();
        vec![
            MetricSample::new(MetricName::ApiCacheHitRate, stats.hit_rate_percent(), now),
            MetricSample::new(MetricName::ApiRequestCount, stats.total_requests as f64, now),
        ]
    }
}

/// Reads database query latency and query cache counters
pub struct DbQuerySource {
    queries: Arc<LatencyRecorder>,
    cache: Arc<CacheCounters>,
}

impl DbQuerySource {
    pub fn new(queries: Arc<LatencyRecorder>, cache: Arc<CacheCounters>) -> Self {
        Self { queries, cache }
    }
}

impl MetricSource for DbQuerySource {
    fn domain(&self) -> &'static str {
        "database"
    }

    fn read(&self) -> Vec<MetricSample> {
        let now = now_millis();
        vec![
            MetricSample::new(MetricName::DbQueryTime, self.queries.mean_millis(), now),
            MetricSample::new(
                MetricName::DbCacheHitRate,
                self.cache.stats().hit_rate_percent(),
                now,
            ),
            MetricSample::new(MetricName::DbQueryCount, self.queries.count() as f64, now),
        ]
    }
}

/// Page load measurements reported by the client
#[derive(Debug, Default)]
pub struct LoadTimings {
    total_load: LatencyRecorder,
    bundle_size_bytes: AtomicU64,
}

impl LoadTimings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_load(&self, duration: Duration) {
        self.total_load.record(duration);
    }

    pub fn set_bundle_size(&self, bytes: u64) {
        self.bundle_size_bytes.store(bytes, Ordering::Relaxed);
    }

    pub fn last_load_millis(&self) -> f64 {
        self.total_load.last_millis()
    }

    pub fn bundle_size_kb(&self) -> f64 {
        self.bundle_size_bytes.load(Ordering::Relaxed) as f64 / 1024.0
    }
}

/// Reads total load time and bundle size
pub struct PageLoadSource {
    timings: Arc<LoadTimings>,
}

impl PageLoadSource {
    pub fn new(timings: Arc<LoadTimings>) -> Self {
        Self { timings }
    }
}

impl MetricSource for PageLoadSource {
    fn domain(&self) -> &'static str {
        "page"
    }

    fn read(&self) -> Vec<MetricSample> {
        let now = now_millis();
        vec![
            MetricSample::new(MetricName::TotalLoadTime, self.timings.last_load_millis(), now),
            MetricSample::new(MetricName::BundleSize, self.timings.bundle_size_kb(), now),
        ]
    }
}

/// Fixed samples supplied from outside the process
#[derive(Debug, Clone, Default)]
pub struct SnapshotSource {
    samples: Vec<MetricSample>,
}

/// Accepted layouts of a samples file
#[derive(Deserialize)]
#[serde(untagged)]
enum SamplesFile {
    List(Vec<RawSample>),
    Map(BTreeMap<String, f64>),
}

impl SnapshotSource {
    pub fn new(samples: Vec<MetricSample>) -> Self {
        Self { samples }
    }

    /// Parse raw samples from JSON: either a list of
    /// `{name, value, timestampMillis}` objects or a `{name: value}` map.
    /// Unrecognized metric names are dropped.
    pub fn parse_raw(json: &str) -> GaugeResult<Vec<RawSample>> {
        let parsed: SamplesFile = serde_json::from_str(json)
            .map_err(|e| GaugeError::invalid_sample(format!("unreadable samples: {}", e)))?;

        Ok(match parsed {
            SamplesFile::List(samples) => samples,
            SamplesFile::Map(values) => {
                let now = now_millis();
                values
                    .into_iter()
                    .map(|(name, value)| RawSample {
                        name,
                        value,
                        timestamp_millis: now,
                    })
                    .collect()
            }
        })
    }

    pub fn from_json(json: &str) -> GaugeResult<Self> {
        Ok(Self::new(typed_samples(Self::parse_raw(json)?)))
    }

    pub fn load(path: &Path) -> GaugeResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    pub fn samples(&self) -> &[MetricSample] {
        &self.samples
    }
}

impl MetricSource for SnapshotSource {
    fn domain(&self) -> &'static str {
        "snapshot"
    }

    fn read(&self) -> Vec<MetricSample> {
        self.samples.clone()
    }
}

/// Shared counters for the built-in instrumented subsystems
#[derive(Debug, Default, Clone)]
pub struct Instrumentation {
    pub auth: Arc<LatencyRecorder>,
    pub api_cache: Arc<CacheCounters>,
    pub db_queries: Arc<LatencyRecorder>,
    pub db_cache: Arc<CacheCounters>,
    pub page_load: Arc<LoadTimings>,
}

impl Instrumentation {
    pub fn new() -> Self {
        Self::default()
    }

    /// One source per instrumented subsystem
    pub fn sources(&self) -> Vec<Box<dyn MetricSource>> {
        vec![
            Box::new(AuthTimingSource::new(self.auth.clone())),
            Box::new(ApiCacheSource::new(self.api_cache.clone())),
            Box::new(DbQuerySource::new(self.db_queries.clone(), self.db_cache.clone())),
            Box::new(PageLoadSource::new(self.page_load.clone())),
        ]
    }
}

/// Owns the registered sources and snapshots them in registration order
#[derive(Default)]
pub struct MetricsCollector {
    sources: Vec<Box<dyn MetricSource>>,
}

impl MetricsCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_sources(sources: Vec<Box<dyn MetricSource>>) -> Self {
        Self { sources }
    }

    pub fn register(&mut self, source: Box<dyn MetricSource>) {
        tracing::debug!("Registered metric source: {}", source.domain());
        self.sources.push(source);
    }

    /// Replace every source of the given domain
    pub fn replace(&mut self, source: Box<dyn MetricSource>) {
        let domain = source.domain();
        self.sources.retain(|existing| existing.domain() != domain);
        self.sources.push(source);
    }

    pub fn domains(&self) -> Vec<&'static str> {
        self.sources.iter().map(|source| source.domain()).collect()
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    pub fn snapshot(&self) -> Vec<MetricSample> {
        self.sources.iter().flat_map(|source| source.read()).collect()
    }
}

impl std::fmt::Debug for MetricsCollector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MetricsCollector")
            .field("domains", &self.domains())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn value_of(samples: &[MetricSample], name: MetricName) -> Option<f64> {
        samples.iter().find(|s| s.name == name).map(|s| s.value)
    }

    #[test]
    fn test_uninitialized_sources_read_zero() {
        let instrumentation = Instrumentation::new();
        let collector = MetricsCollector::with_sources(instrumentation.sources());
        let samples = collector.snapshot();

        assert_eq!(samples.len(), 8);
        assert!(samples.iter().all(|s| s.value == 0.0));
        assert_eq!(collector.domains(), vec!["auth", "api", "database", "page"]);
    }

    #[test]
    fn test_sources_reflect_recorded_values() {
        let instrumentation = Instrumentation::new();
        instrumentation.auth.record(Duration::from_millis(1700));
        instrumentation.db_queries.record(Duration::from_millis(40));
        instrumentation.db_queries.record(Duration::from_millis(60));
        for hit in [true, true, true, false] {
            instrumentation.api_cache.record_lookup(hit);
        }
        instrumentation.page_load.record_load(Duration::from_millis(2400));
        instrumentation.page_load.set_bundle_size(300 * 1024);

        let collector = MetricsCollector::with_sources(instrumentation.sources());
        let samples = collector.snapshot();

        assert_eq!(value_of(&samples, MetricName::AuthContextTime), Some(1700.0));
        assert_eq!(value_of(&samples, MetricName::DbQueryTime), Some(50.0));
        assert_eq!(value_of(&samples, MetricName::DbQueryCount), Some(2.0));
        assert_eq!(value_of(&samples, MetricName::ApiCacheHitRate), Some(75.0));
        assert_eq!(value_of(&samples, MetricName::ApiRequestCount), Some(4.0));
        assert_eq!(value_of(&samples, MetricName::TotalLoadTime), Some(2400.0));
        assert_eq!(value_of(&samples, MetricName::BundleSize), Some(300.0));
    }

    #[test]
    fn test_latency_recorder_timing() {
        let recorder = LatencyRecorder::new();
        let value = recorder.time(|| 7);
        assert_eq!(value, 7);
        assert_eq!(recorder.count(), 1);

        recorder.record_millis(f64::NAN);
        assert_eq!(recorder.count(), 1);

        recorder.reset();
        assert_eq!(recorder.mean_millis(), 0.0);
    }

    #[test]
    fn test_latency_recorder_saturates_huge_values() {
        let recorder = LatencyRecorder::new();
        recorder.record_millis(1e300);
        assert_eq!(recorder.count(), 1);
        assert_eq!(recorder.last_millis(), u64::MAX as f64 / 1000.0);

        recorder.record_millis(f64::NAN);
        recorder.record_millis(-5.0);
        assert_eq!(recorder.count(), 1);
    }

    #[test]
    fn test_snapshot_from_json_layouts() {
        let list = SnapshotSource::from_json(
            r#"[
                {"name": "authContextTime", "value": 1700, "timestampMillis": 5},
                {"name": "renderTime", "value": 3}
            ]"#,
        )
        .unwrap();
        assert_eq!(list.samples().len(), 1);
        assert_eq!(list.samples()[0].timestamp_millis, 5);

        let map = SnapshotSource::from_json(r#"{"dbQueryTime": 50, "bundleSize": 320}"#).unwrap();
        assert_eq!(map.samples().len(), 2);

        assert!(SnapshotSource::from_json("\"not samples\"").is_err());
    }

    #[test]
    fn test_replace_source_by_domain() {
        let mut collector = MetricsCollector::new();
        collector.register(Box::new(SnapshotSource::new(vec![MetricSample::new(
            MetricName::BundleSize,
            900.0,
            1,
        )])));
        collector.replace(Box::new(SnapshotSource::new(Vec::new())));

        assert_eq!(collector.len(), 1);
        assert!(collector.snapshot().is_empty());
    }
}
