use anyhow::{anyhow, Context, Result};
use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::sync::mpsc;

use crate::config::GaugeConfig;
use crate::performance::metrics::typed_samples;
use crate::performance::{
    ConsoleSink, ExportFormat, MetricName, MetricsCollector, PerformanceValidator, RawSample,
    SnapshotSource,
};

/// perfgauge - Performance scoring for dashboard health checks
#[derive(Parser)]
#[command(name = "perfgauge")]
#[command(about = "Score dashboard performance metrics against thresholds")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable debug logging
    #[arg(long, global = true)]
    pub debug: bool,

    /// Configuration file path
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run one validation pass and print the report
    Validate(ValidateArgs),

    /// Re-run validation on an interval and show the trend
    Watch(WatchArgs),

    /// Show the effective threshold table
    Thresholds,

    /// Show or initialize configuration
    Config(ConfigArgs),
}

#[derive(Args, Default)]
pub struct SampleArgs {
    /// JSON file with metric samples (list of samples or name/value map)
    #[arg(short, long)]
    pub samples: Option<PathBuf>,

    /// Inline metric value, e.g. --metric authContextTime=420 (repeatable)
    #[arg(short, long = "metric", value_name = "NAME=VALUE")]
    pub metrics: Vec<String>,

    /// Output format (text, json, json-pretty)
    #[arg(short, long)]
    pub format: Option<String>,
}

#[derive(Args, Default)]
pub struct ValidateArgs {
    #[command(flatten)]
    pub samples: SampleArgs,
}

#[derive(Args, Default)]
pub struct WatchArgs {
    #[command(flatten)]
    pub samples: SampleArgs,

    /// Seconds between passes (defaults to the configured interval)
    #[arg(short, long)]
    pub interval: Option<u64>,

    /// Stop after this many passes
    #[arg(short, long)]
    pub count: Option<usize>,
}

#[derive(Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommands,
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Print the effective configuration
    Show,

    /// Write a default configuration file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

/// Outcome of a command, mapped to the process exit code
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandOutcome {
    Success,
    ValidationFailed,
}

impl CommandOutcome {
    pub fn exit_code(&self) -> i32 {
        match self {
            CommandOutcome::Success => 0,
            CommandOutcome::ValidationFailed => 2,
        }
    }
}

/// CLI command handler
pub struct CliHandler {
    config: GaugeConfig,
    config_path: PathBuf,
}

impl CliHandler {
    /// Create a new CLI handler, loading configuration from `config_path`
    /// or the default location
    pub async fn new(config_path: Option<PathBuf>) -> Result<Self> {
        let config_path = match config_path {
            Some(path) => path,
            None => GaugeConfig::default_path()?,
        };

        let config = GaugeConfig::load_from_file(&config_path)
            .await
            .with_context(|| format!("loading {}", config_path.display()))?;

        Ok(Self {
            config,
            config_path,
        })
    }

    pub fn with_config(config: GaugeConfig, config_path: PathBuf) -> Self {
        Self {
            config,
            config_path,
        }
    }

    /// Handle CLI commands
    pub async fn handle_command(&self, command: Commands) -> Result<CommandOutcome> {
        match command {
            Commands::Validate(args) => self.handle_validate(args),
            Commands::Watch(args) => self.handle_watch(args).await,
            Commands::Thresholds => self.handle_thresholds(),
            Commands::Config(args) => self.handle_config(args).await,
        }
    }

    fn handle_validate(&self, args: ValidateArgs) -> Result<CommandOutcome> {
        let source = load_snapshot(&args.samples)?;
        let format = self.resolve_format(args.samples.format.as_deref())?;
        let mut validator = self.build_validator(source, format);

        let report = validator.run_validation();
        Ok(if report.passed() {
            CommandOutcome::Success
        } else {
            CommandOutcome::ValidationFailed
        })
    }

    async fn handle_watch(&self, args: WatchArgs) -> Result<CommandOutcome> {
        let source = load_snapshot(&args.samples)?;
        let format = self.resolve_format(args.samples.format.as_deref())?;
        let interval = match args.interval {
            Some(0) => return Err(anyhow!("Interval must be greater than 0")),
            Some(secs) => Duration::from_secs(secs),
            None => self.config.interval(),
        };

        let mut validator = self.build_validator(source, format);

        let (shutdown_tx, mut shutdown_rx) = mpsc::channel(1);
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                let _ = shutdown_tx.send(()).await;
            }
        });

        let sample_args = args.samples;
        let runs = validator
            .run_periodic_with(interval, args.count, &mut shutdown_rx, |collector| {
                if sample_args.samples.is_none() {
                    return;
                }
                match load_snapshot(&sample_args) {
                    Ok(source) => collector.replace(Box::new(source)),
                    Err(e) => tracing::warn!("Keeping previous samples: {}", e),
                }
            })
            .await;

        let summary = validator.trend_summary();
        println!(
            "{} Trend over {} of {} passes: {}",
            summary.trend.marker(),
            summary.sample_count,
            runs,
            summary.trend
        );
        if let Some(average) = summary.average_score {
            println!("   Average score: {:.1}", average);
        }

        let last_passed = validator
            .history()
            .latest()
            .map(|report| report.passed())
            .unwrap_or(true);
        Ok(if last_passed {
            CommandOutcome::Success
        } else {
            CommandOutcome::ValidationFailed
        })
    }

    fn handle_thresholds(&self) -> Result<CommandOutcome> {
        let table = self.config.threshold_table();
        println!("📏 Thresholds ({} metrics)", table.len());
        for threshold in table.iter() {
            let name = threshold.metric_name;
            let kind = if name.is_critical() { "critical" } else { "advisory" };
            println!(
                "   {:<18} {:<28} {:<12} {}",
                name.wire_name(),
                name.label(),
                threshold.to_string(),
                kind
            );
        }
        Ok(CommandOutcome::Success)
    }

    async fn handle_config(&self, args: ConfigArgs) -> Result<CommandOutcome> {
        match args.command {
            ConfigCommands::Show => {
                println!("# {}", self.config_path.display());
                print!("{}", toml::to_string_pretty(&self.config)?);
            }
            ConfigCommands::Init { force } => {
                if self.config_path.exists() && !force {
                    return Err(anyhow!(
                        "{} already exists (use --force to overwrite)",
                        self.config_path.display()
                    ));
                }
                GaugeConfig::default().save_to_file(&self.config_path).await?;
                println!("✅ Wrote default configuration to {}", self.config_path.display());
            }
        }
        Ok(CommandOutcome::Success)
    }

    fn resolve_format(&self, requested: Option<&str>) -> Result<ExportFormat> {
        match requested {
            Some(format) => Ok(format.parse()?),
            None => Ok(self.config.format),
        }
    }

    fn build_validator(&self, source: SnapshotSource, format: ExportFormat) -> PerformanceValidator {
        let mut collector = MetricsCollector::new();
        collector.register(Box::new(source));

        let mut validator = PerformanceValidator::from_config(&self.config, collector);
        let exporter = validator.exporter_mut();
        exporter.set_format(format);
        exporter.add_sink(Box::new(ConsoleSink));
        validator
    }
}

/// Samples from the file (if any) with inline `--metric` values replacing
/// file values of the same name
fn load_snapshot(args: &SampleArgs) -> Result<SnapshotSource> {
    if args.samples.is_none() && args.metrics.is_empty() {
        return Err(anyhow!("No samples given; use --samples <file> or --metric name=value"));
    }

    let mut raw = match &args.samples {
        Some(path) => read_raw_samples(path)?,
        None => Vec::new(),
    };

    for assignment in &args.metrics {
        let inline = RawSample::parse_assignment(assignment)?;
        raw.retain(|existing| !same_metric(&existing.name, &inline.name));
        raw.push(inline);
    }

    Ok(SnapshotSource::new(typed_samples(raw)))
}

fn read_raw_samples(path: &Path) -> Result<Vec<RawSample>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("reading samples from {}", path.display()))?;
    Ok(SnapshotSource::parse_raw(&content)?)
}

fn same_metric(a: &str, b: &str) -> bool {
    match (a.parse::<MetricName>(), b.parse::<MetricName>()) {
        (Ok(a), Ok(b)) => a == b,
        _ => a == b,
    }
}
