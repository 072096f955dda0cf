//! Console logger
//!
//! Writes formatted records to stdout or stderr. Long content is already cut
//! into chunks by the format; each chunk goes out as its own bounded write.

use super::{LogFormat, LogInfo, Logger, RecordWriter, SinkDispatch, TableFormat, WriteMode};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::io::{self, Write};
use std::sync::Arc;

/// Console stream
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConsoleTarget {
    /// Standard output
    #[default]
    Stdout,
    /// Standard error
    Stderr,
}

/// Platform console sink
pub struct ConsoleLogger {
    dispatch: SinkDispatch<ConsoleWriter>,
}

struct ConsoleWriter {
    format: Arc<dyn LogFormat>,
    writer: Box<dyn Write + Send>,
}

impl ConsoleLogger {
    /// Console logger using [`TableFormat`] defaults
    pub fn new(target: ConsoleTarget, mode: WriteMode) -> Result<Self> {
        Self::with_format(target, mode, Arc::new(TableFormat::default()))
    }

    pub fn with_format(
        target: ConsoleTarget,
        mode: WriteMode,
        format: Arc<dyn LogFormat>,
    ) -> Result<Self> {
        let writer: Box<dyn Write + Send> = match target {
            ConsoleTarget::Stdout => Box::new(io::stdout()),
            ConsoleTarget::Stderr => Box::new(io::stderr()),
        };
        Self::with_writer(writer, mode, format)
    }

    /// Console logger writing to an arbitrary stream
    pub fn with_writer(
        writer: Box<dyn Write + Send>,
        mode: WriteMode,
        format: Arc<dyn LogFormat>,
    ) -> Result<Self> {
        let dispatch = SinkDispatch::new(mode, ConsoleWriter { format, writer })?;
        Ok(Self { dispatch })
    }

    /// Drop queued records and stop the consumer
    pub fn cancel(&self) {
        self.dispatch.cancel();
    }
}

#[async_trait::async_trait]
impl Logger for ConsoleLogger {
    fn log(&self, info: &LogInfo) {
        self.dispatch.submit(info);
    }

    async fn close(&self) -> Result<()> {
        self.dispatch.close().await
    }
}

impl RecordWriter for ConsoleWriter {
    fn name(&self) -> &str {
        "ConsoleLogger"
    }

    fn write(&mut self, info: &LogInfo) -> Result<()> {
        for line in self.format.format_lines(info) {
            self.writer
                .write_all(line.as_bytes())
                .context("Failed to write to console")?;
            self.writer
                .write_all(b"\n")
                .context("Failed to write newline to console")?;
        }
        self.writer
            .flush()
            .context("Failed to flush console output")
    }

    fn flush(&mut self) -> Result<()> {
        self.writer
            .flush()
            .context("Failed to flush console output")
    }
}
