//! File logger
//!
//! Writes records as text lines to per-day files with size based rotation,
//! optional gzip compression, a cache directory for recent files and
//! retention of old ones.

use super::{
    LineFormat, LogFormat, LogHeader, LogInfo, LogStore, Logger, RecordWriter, SinkDispatch,
    WriteMode, DEFAULT_MAX_PRINT_TIMES, DEFAULT_MAX_SINGLE_LOG_LENGTH,
};
use anyhow::{Context, Result};
use base64::Engine as _;
use chrono::{Local, NaiveDate, TimeZone};
use flate2::read::MultiGzDecoder;
use flate2::write::GzEncoder;
use serde::{Deserialize, Serialize};
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tracing::{debug, info, warn};

const SECONDS_PER_DAY: u64 = 24 * 60 * 60;

/// Seals formatted records before they reach disk
///
/// Implementations hold the public half of a key pair; the crate only stores
/// what they return.
pub trait RecordSealer: Send + Sync {
    fn seal(&self, plain: &[u8]) -> Result<Vec<u8>>;
}

/// File logger configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileLoggerConfig {
    /// Directory holding finished log files
    pub log_dir: PathBuf,
    /// Directory for files younger than `cache_days`
    #[serde(default)]
    pub cache_dir: Option<PathBuf>,
    #[serde(default = "default_name_prefix")]
    pub name_prefix: String,
    #[serde(default)]
    pub mode: WriteMode,
    /// One file per calendar day instead of a single file
    #[serde(default = "default_true")]
    pub single_file_every_day: bool,
    /// Uncompressed record bytes per file before the next index is opened,
    /// 0 for unlimited. Compressed files are measured by their decoded size.
    #[serde(default)]
    pub max_file_size: u64,
    /// Days to keep files in `log_dir`, 0 keeps them forever
    #[serde(default = "default_retention_days")]
    pub retention_days: u64,
    #[serde(default)]
    pub cache_days: u64,
    #[serde(default = "default_max_single_log_length")]
    pub max_single_log_length: usize,
    #[serde(default = "default_max_print_times")]
    pub max_print_times: usize,
    #[serde(default)]
    pub compression: CompressionConfig,
}

/// Gzip settings for log files
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompressionConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_compression_level")]
    pub level: u32,
}

impl Default for CompressionConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            level: default_compression_level(),
        }
    }
}

fn default_name_prefix() -> String {
    "vastlog".to_string()
}

fn default_true() -> bool {
    true
}

fn default_retention_days() -> u64 {
    10
}

fn default_max_single_log_length() -> usize {
    DEFAULT_MAX_SINGLE_LOG_LENGTH
}

fn default_max_print_times() -> usize {
    DEFAULT_MAX_PRINT_TIMES
}

fn default_compression_level() -> u32 {
    6
}

impl FileLoggerConfig {
    /// Defaults writing into `log_dir`
    pub fn new(log_dir: impl Into<PathBuf>) -> Self {
        Self {
            log_dir: log_dir.into(),
            cache_dir: None,
            name_prefix: default_name_prefix(),
            mode: WriteMode::default(),
            single_file_every_day: true,
            max_file_size: 0,
            retention_days: default_retention_days(),
            cache_days: 0,
            max_single_log_length: DEFAULT_MAX_SINGLE_LOG_LENGTH,
            max_print_times: DEFAULT_MAX_PRINT_TIMES,
            compression: CompressionConfig::default(),
        }
    }

    /// File name for `day` and rotation `index`
    pub fn file_name(&self, day: NaiveDate, index: u32) -> String {
        let mut name = if self.single_file_every_day {
            format!("{}_{}", self.name_prefix, day.format("%Y%m%d"))
        } else {
            self.name_prefix.clone()
        };
        if index > 0 {
            name.push_str(&format!("_{}", index));
        }
        name.push_str(".log");
        if self.compression.enabled {
            name.push_str(".gz");
        }
        name
    }

    /// Directory new files are opened in
    pub fn write_dir(&self) -> &Path {
        match &self.cache_dir {
            Some(cache_dir) if self.cache_days > 0 => cache_dir,
            _ => &self.log_dir,
        }
    }
}

/// Rotating file sink
pub struct FileLogger {
    dispatch: SinkDispatch<FileWriter>,
}

impl FileLogger {
    pub fn new(config: FileLoggerConfig) -> Result<Self> {
        Self::build(config, None)
    }

    /// File logger sealing every record with `sealer`
    pub fn with_sealer(config: FileLoggerConfig, sealer: Arc<dyn RecordSealer>) -> Result<Self> {
        Self::build(config, Some(sealer))
    }

    fn build(config: FileLoggerConfig, sealer: Option<Arc<dyn RecordSealer>>) -> Result<Self> {
        fs::create_dir_all(&config.log_dir).with_context(|| {
            format!(
                "Failed to create log directory: {}",
                config.log_dir.display()
            )
        })?;
        let mode = config.mode;
        let writer = FileWriter::new(config, sealer);
        Ok(Self {
            dispatch: SinkDispatch::new(mode, writer)?,
        })
    }

    /// Drop queued records and stop the consumer
    pub fn cancel(&self) {
        self.dispatch.cancel();
    }
}

#[async_trait::async_trait]
impl Logger for FileLogger {
    fn log(&self, info: &LogInfo) {
        self.dispatch.submit(info);
    }

    async fn close(&self) -> Result<()> {
        self.dispatch.close().await
    }
}

impl LogStore for FileLogger {
    fn store(&self, info: &LogInfo) -> Result<()> {
        self.dispatch.submit(info);
        Ok(())
    }
}

struct FileWriter {
    config: FileLoggerConfig,
    format: LineFormat,
    sealer: Option<Arc<dyn RecordSealer>>,
    current: Option<OpenFile>,
    day: Option<NaiveDate>,
    index: u32,
}

struct OpenFile {
    path: PathBuf,
    output: Output,
    bytes_written: u64,
}

enum Output {
    Plain(File),
    Gzip(GzEncoder<File>),
}

impl Output {
    fn write_all(&mut self, bytes: &[u8]) -> std::io::Result<()> {
        match self {
            Output::Plain(file) => file.write_all(bytes),
            Output::Gzip(encoder) => encoder.write_all(bytes),
        }
    }

    fn flush(&mut self) -> std::io::Result<()> {
        match self {
            Output::Plain(file) => file.flush(),
            Output::Gzip(encoder) => encoder.flush(),
        }
    }

    /// Flush and, for gzip, write the member trailer
    fn finish(self) -> std::io::Result<()> {
        match self {
            Output::Plain(file) => file.sync_all(),
            Output::Gzip(encoder) => encoder.finish()?.sync_all(),
        }
    }
}

impl FileWriter {
    fn new(config: FileLoggerConfig, sealer: Option<Arc<dyn RecordSealer>>) -> Self {
        let format = LineFormat::new(
            config.max_single_log_length,
            config.max_print_times,
            LogHeader::default(),
        );
        Self {
            config,
            format,
            sealer,
            current: None,
            day: None,
            index: 0,
        }
    }

    fn encode(&self, info: &LogInfo) -> Result<String> {
        let text = self.format.format(info);
        match &self.sealer {
            Some(sealer) => {
                let sealed = sealer.seal(text.as_bytes())?;
                Ok(format!(
                    "{}\n",
                    base64::engine::general_purpose::STANDARD.encode(sealed)
                ))
            }
            None => Ok(format!("{}\n", text)),
        }
    }

    fn close_current(&mut self) -> Result<()> {
        if let Some(current) = self.current.take() {
            current
                .output
                .finish()
                .with_context(|| format!("Failed to close log file: {}", current.path.display()))?;
        }
        Ok(())
    }

    fn needs_rotation(&self, day: NaiveDate, entry_size: u64) -> bool {
        let Some(current) = &self.current else {
            return false;
        };
        if self.config.single_file_every_day && self.day != Some(day) {
            return true;
        }
        self.config.max_file_size > 0
            && current.bytes_written > 0
            && current.bytes_written + entry_size > self.config.max_file_size
    }

    fn open(&mut self, day: NaiveDate) -> Result<()> {
        let dir = self.config.write_dir().to_path_buf();
        fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create log directory: {}", dir.display()))?;

        if self.day != Some(day) {
            self.day = Some(day);
            self.index = 0;
        }

        // resume after files already filled up by an earlier run
        let mut path = dir.join(self.config.file_name(day, self.index));
        let compressed = self.config.compression.enabled;
        let mut bytes_written = content_len(&path, compressed);
        while self.config.max_file_size > 0 && bytes_written >= self.config.max_file_size {
            self.index += 1;
            path = dir.join(self.config.file_name(day, self.index));
            bytes_written = content_len(&path, compressed);
        }

        self.run_maintenance(&path);

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .with_context(|| format!("Failed to open log file: {}", path.display()))?;

        let output = if self.config.compression.enabled {
            Output::Gzip(GzEncoder::new(
                file,
                flate2::Compression::new(self.config.compression.level),
            ))
        } else {
            Output::Plain(file)
        };

        debug!("Opened log file {}", path.display());
        self.current = Some(OpenFile {
            path,
            output,
            bytes_written,
        });
        Ok(())
    }

    fn run_maintenance(&self, opening: &Path) {
        if let Some(cache_dir) = &self.config.cache_dir {
            if self.config.cache_days > 0 {
                if let Err(err) = self.move_cached_files(cache_dir, opening) {
                    warn!("Failed to move cached log files: {:#}", err);
                }
            }
        }
        if self.config.retention_days > 0 {
            if let Err(err) = self.remove_expired_files(opening) {
                warn!("Failed to remove expired log files: {:#}", err);
            }
        }
    }

    /// Move cache files older than `cache_days` into the log directory
    fn move_cached_files(&self, cache_dir: &Path, opening: &Path) -> Result<()> {
        let max_age = days(self.config.cache_days);
        for path in self.prefixed_files(cache_dir)? {
            if path == opening || !is_older_than(&path, max_age) {
                continue;
            }
            if let Some(name) = path.file_name() {
                let target = self.config.log_dir.join(name);
                move_file(&path, &target)?;
                info!("Moved cached log file to {}", target.display());
            }
        }
        Ok(())
    }

    /// Delete log directory files older than `retention_days`
    fn remove_expired_files(&self, opening: &Path) -> Result<()> {
        let max_age = days(self.config.retention_days);
        for path in self.prefixed_files(&self.config.log_dir)? {
            if path == opening || !is_older_than(&path, max_age) {
                continue;
            }
            match fs::remove_file(&path) {
                Ok(()) => info!("Removed expired log file {}", path.display()),
                Err(err) => warn!("Failed to remove {}: {}", path.display(), err),
            }
        }
        Ok(())
    }

    fn prefixed_files(&self, dir: &Path) -> Result<Vec<PathBuf>> {
        if !dir.exists() {
            return Ok(Vec::new());
        }
        let files = fs::read_dir(dir)
            .with_context(|| format!("Failed to read directory: {}", dir.display()))?
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_type().map(|t| t.is_file()).unwrap_or(false))
            .filter(|entry| {
                entry
                    .file_name()
                    .to_str()
                    .map(|name| name.starts_with(&self.config.name_prefix))
                    .unwrap_or(false)
            })
            .map(|entry| entry.path())
            .collect();
        Ok(files)
    }
}

impl RecordWriter for FileWriter {
    fn name(&self) -> &str {
        "FileLogger"
    }

    fn write(&mut self, info: &LogInfo) -> Result<()> {
        let line = self.encode(info)?;
        let bytes = line.as_bytes();
        let day = local_day(info.time());

        if self.needs_rotation(day, bytes.len() as u64) {
            let next_day = self.day != Some(day);
            self.close_current()?;
            if !next_day {
                self.index += 1;
            }
        }
        if self.current.is_none() {
            self.open(day)?;
        }

        if let Some(current) = &mut self.current {
            current
                .output
                .write_all(bytes)
                .with_context(|| format!("Failed to write to file: {}", current.path.display()))?;
            current.bytes_written += bytes.len() as u64;
        }
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        if self.config.compression.enabled {
            // a gzip member is only readable once finished; the next write opens a new member
            return self.close_current();
        }
        if let Some(current) = &mut self.current {
            current
                .output
                .flush()
                .with_context(|| format!("Failed to flush file: {}", current.path.display()))?;
        }
        Ok(())
    }
}

impl Drop for FileWriter {
    fn drop(&mut self) {
        if let Err(err) = self.close_current() {
            warn!("{:#}", err);
        }
    }
}

fn local_day(millis: i64) -> NaiveDate {
    Local
        .timestamp_millis_opt(millis)
        .single()
        .map(|t| t.date_naive())
        .unwrap_or_else(|| Local::now().date_naive())
}

fn days(count: u64) -> Duration {
    Duration::from_secs(count * SECONDS_PER_DAY)
}

/// Record bytes already in `path`, decoding gzip members when `compressed`
fn content_len(path: &Path, compressed: bool) -> u64 {
    let on_disk = fs::metadata(path).map(|m| m.len()).unwrap_or(0);
    if !compressed || on_disk == 0 {
        return on_disk;
    }
    let decoded = File::open(path).and_then(|file| {
        std::io::copy(&mut MultiGzDecoder::new(file), &mut std::io::sink())
    });
    match decoded {
        Ok(len) => len,
        Err(err) => {
            warn!("Failed to measure {}: {}", path.display(), err);
            on_disk
        }
    }
}

fn is_older_than(path: &Path, max_age: Duration) -> bool {
    fs::metadata(path)
        .and_then(|m| m.modified())
        .ok()
        .and_then(|modified| SystemTime::now().duration_since(modified).ok())
        .map(|age| age > max_age)
        .unwrap_or(false)
}

fn move_file(from: &Path, to: &Path) -> Result<()> {
    if fs::rename(from, to).is_ok() {
        return Ok(());
    }
    // rename fails across filesystems
    fs::copy(from, to)
        .with_context(|| format!("Failed to copy {} to {}", from.display(), to.display()))?;
    fs::remove_file(from).with_context(|| format!("Failed to remove {}", from.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logs::LogLevel;
    use tempfile::tempdir;

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 9).unwrap()
    }

    #[test]
    fn test_file_names() {
        let mut config = FileLoggerConfig::new("/tmp/logs");
        assert_eq!(config.file_name(day(), 0), "vastlog_20240309.log");
        assert_eq!(config.file_name(day(), 2), "vastlog_20240309_2.log");

        config.compression.enabled = true;
        assert_eq!(config.file_name(day(), 0), "vastlog_20240309.log.gz");

        config.single_file_every_day = false;
        config.compression.enabled = false;
        config.name_prefix = "app".to_string();
        assert_eq!(config.file_name(day(), 0), "app.log");
    }

    #[test]
    fn test_write_dir_prefers_cache_only_when_cache_days_set() {
        let mut config = FileLoggerConfig::new("/tmp/logs");
        config.cache_dir = Some(PathBuf::from("/tmp/cache"));
        assert_eq!(config.write_dir(), Path::new("/tmp/logs"));
        config.cache_days = 2;
        assert_eq!(config.write_dir(), Path::new("/tmp/cache"));
    }

    #[test]
    fn test_config_defaults_from_yaml() {
        let config: FileLoggerConfig = serde_yaml::from_str("log_dir: /var/log/app").unwrap();
        assert_eq!(config.name_prefix, "vastlog");
        assert_eq!(config.mode, WriteMode::Async);
        assert!(config.single_file_every_day);
        assert_eq!(config.retention_days, 10);
        assert_eq!(config.max_file_size, 0);
        assert!(!config.compression.enabled);
    }

    #[test]
    fn test_writer_appends_lines() {
        let dir = tempdir().unwrap();
        let mut config = FileLoggerConfig::new(dir.path());
        config.mode = WriteMode::Sync;
        let mut writer = FileWriter::new(config.clone(), None);

        let info = LogInfo::new(LogLevel::Info, "t", "first");
        writer.write(&info).unwrap();
        writer
            .write(&LogInfo::new(LogLevel::Info, "t", "second"))
            .unwrap();
        writer.flush().unwrap();

        let path = dir.path().join(config.file_name(local_day(info.time()), 0));
        let content = fs::read_to_string(path).unwrap();
        let lines: Vec<_> = content.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].ends_with(": first"));
        assert!(lines[1].ends_with(": second"));
    }
}
