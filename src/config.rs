//! Configuration management for vastlog
//!
//! Settings are read from `log.yml`, `log.json` or `log.toml` in the config
//! directory and turned into a [`LogFactory`] with the plugins they enable.

use crate::factory::LogFactory;
use crate::logs::{
    ColorfulLineFormat, ConsoleLogger, ConsoleTarget, FileLogger, FileLoggerConfig, JsonConverter,
    LineFormat, LogFormat, LogHeader, LogLevel, LogStore, Logger, SerdeJsonConverter, TableFormat,
    WriteMode, DEFAULT_MAX_PRINT_TIMES, DEFAULT_MAX_SINGLE_LOG_LENGTH,
};
use crate::plugins::{
    LogFilter, LogFilterConfig, LogJson, LogPretty, LogPrinter, LogStorage, LogSwitch,
};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::Path;
use std::sync::Arc;
use tracing::info;

/// Top-level logging settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogSettings {
    /// Master switch; `false` drops every record
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default)]
    pub json: JsonSettings,
    #[serde(default)]
    pub filter: LogFilterConfig,
    #[serde(default)]
    pub console: ConsoleSettings,
    /// File output, also used as the log store
    #[serde(default)]
    pub file: Option<FileLoggerConfig>,
    /// Levels written to the file store, all when unset
    #[serde(default)]
    pub storage_levels: Option<BTreeSet<LogLevel>>,
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            json: JsonSettings::default(),
            filter: LogFilterConfig::default(),
            console: ConsoleSettings::default(),
            file: None,
            storage_levels: None,
        }
    }
}

/// Object to JSON conversion
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonSettings {
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Indent JSON content before output
    #[serde(default)]
    pub pretty: bool,
    /// Let `pretty` also indent plain text that starts like JSON
    #[serde(default)]
    pub detect_json_text: bool,
}

impl Default for JsonSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            pretty: false,
            detect_json_text: false,
        }
    }
}

/// Console layout
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConsoleLayout {
    #[default]
    Table,
    Line,
    /// ANSI-colored lines
    Colorful,
}

/// Console output
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsoleSettings {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default)]
    pub target: ConsoleTarget,
    #[serde(default)]
    pub layout: ConsoleLayout,
    #[serde(default)]
    pub mode: WriteMode,
    #[serde(default = "default_max_single_log_length")]
    pub max_single_log_length: usize,
    #[serde(default = "default_max_print_times")]
    pub max_print_times: usize,
    #[serde(default)]
    pub header: LogHeader,
    /// Printed levels, all when unset
    #[serde(default)]
    pub levels: Option<BTreeSet<LogLevel>>,
}

impl Default for ConsoleSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            target: ConsoleTarget::default(),
            layout: ConsoleLayout::default(),
            mode: WriteMode::default(),
            max_single_log_length: DEFAULT_MAX_SINGLE_LOG_LENGTH,
            max_print_times: DEFAULT_MAX_PRINT_TIMES,
            header: LogHeader::default(),
            levels: None,
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_max_single_log_length() -> usize {
    DEFAULT_MAX_SINGLE_LOG_LENGTH
}

fn default_max_print_times() -> usize {
    DEFAULT_MAX_PRINT_TIMES
}

impl ConsoleSettings {
    fn format(&self) -> Arc<dyn LogFormat> {
        let (max_len, max_times, header) = (
            self.max_single_log_length,
            self.max_print_times,
            self.header,
        );
        match self.layout {
            ConsoleLayout::Table => Arc::new(TableFormat::new(max_len, max_times, header)),
            ConsoleLayout::Line => Arc::new(LineFormat::new(max_len, max_times, header)),
            ConsoleLayout::Colorful => Arc::new(ColorfulLineFormat::new(LineFormat::new(
                max_len, max_times, header,
            ))),
        }
    }
}

/// A factory together with the sinks it writes to
pub struct ConfiguredLogging {
    pub factory: LogFactory,
    sinks: Vec<Arc<dyn Logger>>,
}

impl ConfiguredLogging {
    /// Drain and flush every sink
    pub async fn close(&self) -> Result<()> {
        for sink in &self.sinks {
            sink.close().await?;
        }
        Ok(())
    }
}

impl LogSettings {
    /// Install the plugins these settings enable
    ///
    /// Sinks in async mode need a running tokio runtime.
    pub fn build_factory(&self) -> Result<ConfiguredLogging> {
        let factory = LogFactory::new();
        let mut sinks: Vec<Arc<dyn Logger>> = Vec::new();

        let open = self.enabled;
        factory.install(LogSwitch, move |c| c.open = open);

        if self.json.enabled {
            let converter: Arc<dyn JsonConverter> = Arc::new(SerdeJsonConverter::compact());
            factory.install(LogJson, move |c| c.converter = Some(converter.clone()));
        }
        if self.json.pretty {
            let converter: Arc<dyn JsonConverter> = Arc::new(SerdeJsonConverter::compact());
            let detect = self.json.detect_json_text;
            factory.install(LogPretty, move |c| {
                c.converter = Some(converter.clone());
                c.detect_json_text = detect;
            });
        }

        let filter = self.filter.clone();
        factory.install(LogFilter, move |c| *c = filter.clone());

        if let Some(file) = &self.file {
            let store = Arc::new(
                FileLogger::new(file.clone()).with_context(|| {
                    format!("Failed to create file logger in {}", file.log_dir.display())
                })?,
            );
            let levels = self.storage_levels.clone();
            let sink: Arc<dyn LogStore> = store.clone();
            factory.install(LogStorage, move |c| {
                c.store = Some(sink.clone());
                c.levels = levels.clone();
            });
            sinks.push(store);
        }

        if self.console.enabled {
            let console: Arc<dyn Logger> = Arc::new(ConsoleLogger::with_format(
                self.console.target,
                self.console.mode,
                self.console.format(),
            )?);
            let levels = self.console.levels.clone();
            let sink = console.clone();
            factory.install(LogPrinter, move |c| {
                c.logger = Some(sink.clone());
                c.levels = levels.clone();
            });
            sinks.push(console);
        }

        info!(plugins = ?factory.plugin_keys(), "Built log factory");
        Ok(ConfiguredLogging { factory, sinks })
    }
}

/// Load logging settings from the config directory
pub fn load_log_settings(config_dir: &Path) -> Result<LogSettings> {
    let yaml_path = config_dir.join("log.yml");
    let json_path = config_dir.join("log.json");
    let toml_path = config_dir.join("log.toml");

    let settings: LogSettings = if yaml_path.exists() {
        let contents = std::fs::read_to_string(&yaml_path)
            .with_context(|| format!("Failed to read {}", yaml_path.display()))?;
        serde_yaml::from_str(&contents)
            .with_context(|| format!("Failed to parse {}", yaml_path.display()))?
    } else if json_path.exists() {
        let contents = std::fs::read_to_string(&json_path)
            .with_context(|| format!("Failed to read {}", json_path.display()))?;
        serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse {}", json_path.display()))?
    } else if toml_path.exists() {
        let contents = std::fs::read_to_string(&toml_path)
            .with_context(|| format!("Failed to read {}", toml_path.display()))?;
        toml::from_str(&contents)
            .with_context(|| format!("Failed to parse {}", toml_path.display()))?
    } else {
        // Return default settings if no config file exists
        LogSettings::default()
    };

    Ok(settings)
}
