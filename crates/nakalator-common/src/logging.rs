//! Logging configuration and initialization
//!
//! Every Nakalator binary routes its diagnostics through `tracing`. Console
//! lines go to stderr for whoever watches an upload run. When a run log
//! directory is set, the same events are also appended to daily files so a
//! deposit can be audited afterwards.
//!
//! # Example
//!
//! ```no_run
//! use nakalator_common::logging::{init_logging, LogConfig};
//! use tracing::info;
//!
//! let config = LogConfig::builder().verbose(true).run_log_dir("output/logs").build();
//! let _guard = init_logging(&config).expect("logging");
//! info!("Upload run started");
//! ```

use anyhow::{anyhow, Context, Result};
use std::path::PathBuf;
use tracing::Level;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer, Registry};

/// Prefix shared by every logging environment variable.
pub const ENV_PREFIX: &str = "NAKALATOR_LOG";

/// HTTP internals are only interesting when they fail
const DEPENDENCY_DIRECTIVES: &str = "hyper=warn,hyper_util=warn,reqwest=warn,h2=warn";

/// Shape of a log line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LineFormat {
    #[default]
    Text,
    Json,
}

impl std::str::FromStr for LineFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" | "pretty" => Ok(LineFormat::Text),
            "json" => Ok(LineFormat::Json),
            _ => Err(anyhow!("Invalid log format: {}", s)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Minimum level written anywhere
    pub level: Level,

    pub format: LineFormat,

    /// Write to stderr
    pub console: bool,

    /// Daily run log files go here when set
    pub run_log_dir: Option<PathBuf>,

    /// Run log file prefix ("nakalator" -> "nakalator.2024-09-02")
    pub file_prefix: String,

    /// Comma-separated filter directives added after the level
    pub directives: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: Level::INFO,
            format: LineFormat::Text,
            console: true,
            run_log_dir: None,
            file_prefix: "nakalator".to_string(),
            directives: DEPENDENCY_DIRECTIVES.to_string(),
        }
    }
}

impl LogConfig {
    pub fn builder() -> LogConfigBuilder {
        LogConfigBuilder::default()
    }

    /// Overlay `NAKALATOR_LOG_*` environment variables on top of `self`.
    ///
    /// Recognised variables: `NAKALATOR_LOG_LEVEL`, `NAKALATOR_LOG_FORMAT`,
    /// `NAKALATOR_LOG_DIR` and `NAKALATOR_LOG_FILTER` (appended to the
    /// existing directives).
    pub fn merge_env(self) -> Result<Self> {
        self.merge_vars(|name| std::env::var(format!("{}_{}", ENV_PREFIX, name)).ok())
    }

    fn merge_vars(mut self, var: impl Fn(&str) -> Option<String>) -> Result<Self> {
        if let Some(level) = var("LEVEL") {
            self.level = level
                .trim()
                .parse()
                .with_context(|| format!("Invalid {}_LEVEL '{}'", ENV_PREFIX, level))?;
        }
        if let Some(format) = var("FORMAT") {
            self.format = format.parse()?;
        }
        if let Some(dir) = var("DIR").filter(|d| !d.trim().is_empty()) {
            self.run_log_dir = Some(PathBuf::from(dir));
        }
        if let Some(filter) = var("FILTER") {
            self.directives = format!("{},{}", self.directives, filter);
        }
        Ok(self)
    }
}

#[derive(Default)]
pub struct LogConfigBuilder {
    config: LogConfig,
}

impl LogConfigBuilder {
    /// Debug level when set, info otherwise
    pub fn verbose(mut self, verbose: bool) -> Self {
        self.config.level = if verbose { Level::DEBUG } else { Level::INFO };
        self
    }

    pub fn format(mut self, format: LineFormat) -> Self {
        self.config.format = format;
        self
    }

    pub fn console(mut self, console: bool) -> Self {
        self.config.console = console;
        self
    }

    pub fn run_log_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.run_log_dir = Some(dir.into());
        self
    }

    pub fn file_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.config.file_prefix = prefix.into();
        self
    }

    pub fn build(self) -> LogConfig {
        self.config
    }
}

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

fn build_filter(config: &LogConfig) -> Result<EnvFilter> {
    let mut filter = EnvFilter::default().add_directive(config.level.into());

    for directive in config.directives.split(',').map(str::trim).filter(|d| !d.is_empty()) {
        filter = filter.add_directive(
            directive
                .parse()
                .with_context(|| format!("Invalid filter directive '{}'", directive))?,
        );
    }

    Ok(filter)
}

/// Initialize the global subscriber.
///
/// Returns the file writer guard when a run log directory is set; keep it
/// alive until the process ends or buffered lines may be lost.
pub fn init_logging(config: &LogConfig) -> Result<Option<WorkerGuard>> {
    let filter = build_filter(config)?;
    let mut layers: Vec<BoxedLayer> = Vec::new();
    let mut guard = None;

    if config.console {
        let layer = tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(false);
        layers.push(match config.format {
            LineFormat::Text => layer.boxed(),
            LineFormat::Json => layer.json().boxed(),
        });
    }

    if let Some(dir) = &config.run_log_dir {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Cannot create run log directory {}", dir.display()))?;
        let appender = tracing_appender::rolling::daily(dir, &config.file_prefix);
        let (writer, file_guard) = tracing_appender::non_blocking(appender);
        guard = Some(file_guard);

        let layer = tracing_subscriber::fmt::layer()
            .with_writer(writer)
            .with_ansi(false);
        layers.push(match config.format {
            LineFormat::Text => layer.boxed(),
            LineFormat::Json => layer.json().boxed(),
        });
    }

    tracing_subscriber::registry()
        .with(layers)
        .with(filter)
        .try_init()?;

    Ok(guard)
}
