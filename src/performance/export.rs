//! Report rendering and export sinks
//!
//! A report can be rendered as line-oriented text with status markers or as
//! JSON using the report's camelCase field names. [`ReportExporter`] writes a
//! report to every configured sink; a sink that fails is logged, the report
//! goes to stderr instead, and the caller never sees the error.

use std::fmt::Write as _;
use std::fs::OpenOptions;
use std::io::Write as _;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::{Arc, Mutex, PoisonError};

use serde::{Deserialize, Serialize};

use super::report::ScoreReport;
use crate::error::{GaugeError, GaugeResult};

/// Output format for rendered reports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ExportFormat {
    #[default]
    Text,
    Json,
    JsonPretty,
}

impl FromStr for ExportFormat {
    type Err = GaugeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "text" => Ok(ExportFormat::Text),
            "json" => Ok(ExportFormat::Json),
            "json-pretty" | "pretty" => Ok(ExportFormat::JsonPretty),
            other => Err(GaugeError::config_error(format!(
                "unknown output format: {} (expected text, json or json-pretty)",
                other
            ))),
        }
    }
}

/// Render a report in the requested format
pub fn render(report: &ScoreReport, format: ExportFormat) -> GaugeResult<String> {
    match format {
        ExportFormat::Text => Ok(render_text(report)),
        ExportFormat::Json => render_json(report, false),
        ExportFormat::JsonPretty => render_json(report, true),
    }
}

pub fn render_json(report: &ScoreReport, pretty: bool) -> GaugeResult<String> {
    let json = if pretty {
        serde_json::to_string_pretty(report)?
    } else {
        serde_json::to_string(report)?
    };
    Ok(json)
}

/// Human-readable rendering with one line per metric
pub fn render_text(report: &ScoreReport) -> String {
    let mut out = String::new();
    let status = if report.passed() { "✅ PASSED" } else { "❌ FAILED" };

    // Writing to a String cannot fail
    let _ = writeln!(
        out,
        "Performance report {} | score {:.0}/100 ({}) {}",
        report.timestamp_iso(),
        report.overall_score(),
        report.grade(),
        status
    );

    if report.per_metric_results().is_empty() {
        let _ = writeln!(out, "  (no metrics with thresholds)");
    }

    for result in report.per_metric_results() {
        let name = result.metric_name;
        let marker = match (result.passed, name.is_critical()) {
            (true, _) => "✅",
            (false, true) => "❌",
            (false, false) => "⚠️",
        };
        let _ = writeln!(
            out,
            "  {} {}: {:.1}{} (target {})",
            marker,
            name.label(),
            result.current_value,
            name.unit(),
            result.threshold
        );
    }

    if !report.issues().is_empty() {
        let _ = writeln!(out, "Issues:");
        for issue in report.issues() {
            let _ = writeln!(out, "  - {}", issue);
        }
    }

    if !report.recommendations().is_empty() {
        let _ = writeln!(out, "Recommendations:");
        for recommendation in report.recommendations() {
            let _ = writeln!(out, "  💡 {}", recommendation);
        }
    }

    out
}

/// Destination for rendered reports
pub trait ReportSink: Send {
    fn name(&self) -> &str;

    fn write_report(&mut self, report: &ScoreReport, format: ExportFormat) -> GaugeResult<()>;
}

/// Writes rendered reports to stdout
#[derive(Debug, Default)]
pub struct ConsoleSink;

impl ReportSink for ConsoleSink {
    fn name(&self) -> &str {
        "console"
    }

    fn write_report(&mut self, report: &ScoreReport, format: ExportFormat) -> GaugeResult<()> {
        let rendered = render(report, format)?;
        let stdout = std::io::stdout();
        let mut handle = stdout.lock();
        handle.write_all(rendered.as_bytes())?;
        if !rendered.ends_with('\n') {
            handle.write_all(b"\n")?;
        }
        handle.flush()?;
        Ok(())
    }
}

/// Appends one compact JSON line per report to a file
#[derive(Debug, Clone)]
pub struct JsonLinesSink {
    path: PathBuf,
}

impl JsonLinesSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ReportSink for JsonLinesSink {
    fn name(&self) -> &str {
        "json-lines"
    }

    fn write_report(&mut self, report: &ScoreReport, _format: ExportFormat) -> GaugeResult<()> {
        let line = render_json(report, false)?;
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        writeln!(file, "{}", line)?;
        Ok(())
    }
}

/// Emits each report as a structured tracing event
#[derive(Debug, Default)]
pub struct TracingSink;

impl ReportSink for TracingSink {
    fn name(&self) -> &str {
        "tracing"
    }

    fn write_report(&mut self, report: &ScoreReport, _format: ExportFormat) -> GaugeResult<()> {
        let failed: Vec<String> = report
            .failed_metrics()
            .iter()
            .map(|m| m.to_string())
            .collect();
        tracing::info!(
            score = report.overall_score(),
            passed = report.passed(),
            metrics = report.per_metric_results().len(),
            failed = ?failed,
            "Performance validation complete"
        );
        Ok(())
    }
}

/// Keeps rendered reports in memory; clones share the same buffer
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    entries: Arc<Mutex<Vec<String>>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> Vec<String> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl ReportSink for MemorySink {
    fn name(&self) -> &str {
        "memory"
    }

    fn write_report(&mut self, report: &ScoreReport, format: ExportFormat) -> GaugeResult<()> {
        let rendered = render(report, format)?;
        let mut entries = self
            .entries
            .lock()
            .map_err(|_| GaugeError::export_error("memory", "buffer lock poisoned"))?;
        entries.push(rendered);
        Ok(())
    }
}

/// Fans a report out to every sink, swallowing failures
#[derive(Default)]
pub struct ReportExporter {
    sinks: Vec<Box<dyn ReportSink>>,
    format: ExportFormat,
}

impl ReportExporter {
    pub fn new(format: ExportFormat) -> Self {
        Self {
            sinks: Vec::new(),
            format,
        }
    }

    pub fn with_sink(mut self, sink: Box<dyn ReportSink>) -> Self {
        self.sinks.push(sink);
        self
    }

    pub fn add_sink(&mut self, sink: Box<dyn ReportSink>) {
        self.sinks.push(sink);
    }

    pub fn format(&self) -> ExportFormat {
        self.format
    }

    pub fn set_format(&mut self, format: ExportFormat) {
        self.format = format;
    }

    pub fn sink_names(&self) -> Vec<&str> {
        self.sinks.iter().map(|sink| sink.name()).collect()
    }

    /// Write the report to all sinks; returns how many succeeded.
    /// If any sink fails the text report is written to stderr once.
    pub fn export(&mut self, report: &ScoreReport) -> usize {
        self.export_with_fallback(report, &mut std::io::stderr())
    }

    fn export_with_fallback(
        &mut self,
        report: &ScoreReport,
        fallback: &mut impl std::io::Write,
    ) -> usize {
        let mut delivered = 0;
        let mut failed = false;
        for sink in self.sinks.iter_mut() {
            match sink.write_report(report, self.format) {
                Ok(()) => delivered += 1,
                Err(e) => {
                    tracing::warn!("Report sink '{}' failed: {}", sink.name(), e);
                    failed = true;
                }
            }
        }
        if failed {
            let _ = fallback.write_all(render_text(report).as_bytes());
        }
        delivered
    }
}

impl std::fmt::Debug for ReportExporter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReportExporter")
            .field("sinks", &self.sink_names())
            .field("format", &self.format)
            .finish()
    }
}
