//! Log records, formats and sinks
//!
//! A [`Logger`] is the terminal consumer of a record. A [`LogStore`] persists
//! records on the side. Sinks never surface failures to the code that logged:
//! write errors are reported through `tracing` and dropped.

pub mod console_logger;
pub mod desktop_logger;
pub mod file_logger;
pub mod format;
pub mod info;
pub mod json;
pub mod level;
pub mod sink_worker;

pub use console_logger::{ConsoleLogger, ConsoleTarget};
pub use desktop_logger::DesktopLogger;
pub use file_logger::{CompressionConfig, FileLogger, FileLoggerConfig, RecordSealer};
pub use format::{
    chunk_content, ColorfulLineFormat, LineFormat, LogFormat, LogHeader, TableFormat,
    DEFAULT_MAX_PRINT_TIMES, DEFAULT_MAX_SINGLE_LOG_LENGTH,
};
pub use info::{ContentType, LogContent, LogInfo, LogObject};
pub use json::{JsonConverter, SerdeJsonConverter};
pub use level::LogLevel;
pub use sink_worker::{RecordWriter, SinkDispatch, WriteMode};

use anyhow::Result;
use std::sync::{Arc, Mutex};

/// Terminal consumer of log records
#[async_trait::async_trait]
pub trait Logger: Send + Sync {
    /// Output `info`. Must not block on I/O for long and must not fail.
    fn log(&self, info: &LogInfo);

    /// Drain anything queued and flush
    async fn close(&self) -> Result<()> {
        Ok(())
    }
}

/// Persistence back end for log records
pub trait LogStore: Send + Sync {
    fn store(&self, info: &LogInfo) -> Result<()>;
}

/// Logger that discards every record
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopLogger;

impl Logger for NoopLogger {
    fn log(&self, _info: &LogInfo) {}
}

/// Logger and store that keeps records in memory
#[derive(Debug, Clone, Default)]
pub struct MemoryLogger {
    records: Arc<Mutex<Vec<LogInfo>>>,
}

impl MemoryLogger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the records received so far
    pub fn records(&self) -> Vec<LogInfo> {
        self.records
            .lock()
            .map(|records| records.clone())
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.records.lock().map(|r| r.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        if let Ok(mut records) = self.records.lock() {
            records.clear();
        }
    }

    fn push(&self, info: &LogInfo) {
        if let Ok(mut records) = self.records.lock() {
            records.push(info.clone());
        }
    }
}

impl Logger for MemoryLogger {
    fn log(&self, info: &LogInfo) {
        self.push(info);
    }
}

impl LogStore for MemoryLogger {
    fn store(&self, info: &LogInfo) -> Result<()> {
        self.push(info);
        Ok(())
    }
}
