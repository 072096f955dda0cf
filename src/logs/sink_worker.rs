//! Sink dispatch
//!
//! Sinks either write on the caller's thread or hand records to a queue that a
//! single consumer task drains in arrival order. Blocking writes in async mode
//! run on the blocking pool, so producers never wait on disk I/O.

use super::{LogInfo, LogLevel};
use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::sync::Mutex;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error};

/// Blocking writer behind a sink
pub trait RecordWriter: Send + 'static {
    /// Sink name used in error reports
    fn name(&self) -> &str;

    fn write(&mut self, info: &LogInfo) -> Result<()>;

    fn flush(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Where sink writes happen
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WriteMode {
    /// On the logging thread
    Sync,
    /// On a dedicated consumer task
    #[default]
    Async,
}

/// A [`RecordWriter`] driven in the configured [`WriteMode`]
pub struct SinkDispatch<W: RecordWriter> {
    inner: Dispatch<W>,
}

enum Dispatch<W> {
    Sync(Mutex<W>),
    Async(AsyncWorker),
}

struct AsyncWorker {
    sender: Mutex<Option<mpsc::UnboundedSender<LogInfo>>>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl<W: RecordWriter> SinkDispatch<W> {
    /// Wrap `writer`. Async mode spawns the consumer on the current tokio runtime.
    pub fn new(mode: WriteMode, writer: W) -> Result<Self> {
        let inner = match mode {
            WriteMode::Sync => Dispatch::Sync(Mutex::new(writer)),
            WriteMode::Async => {
                let runtime = tokio::runtime::Handle::try_current()
                    .context("Async sink mode requires a running tokio runtime")?;
                let (sender, receiver) = mpsc::unbounded_channel();
                let task = runtime.spawn(drain(writer, receiver));
                Dispatch::Async(AsyncWorker {
                    sender: Mutex::new(Some(sender)),
                    task: Mutex::new(Some(task)),
                })
            }
        };
        Ok(Self { inner })
    }

    pub fn mode(&self) -> WriteMode {
        match self.inner {
            Dispatch::Sync(_) => WriteMode::Sync,
            Dispatch::Async(_) => WriteMode::Async,
        }
    }

    /// Write or enqueue `info`
    pub fn submit(&self, info: &LogInfo) {
        match &self.inner {
            Dispatch::Sync(writer) => match writer.lock() {
                Ok(mut writer) => write_record(&mut *writer, info),
                Err(_) => error!("Sink writer lock poisoned, record dropped"),
            },
            Dispatch::Async(worker) => {
                let sent = worker
                    .sender
                    .lock()
                    .ok()
                    .and_then(|sender| sender.as_ref().map(|s| s.send(info.clone()).is_ok()))
                    .unwrap_or(false);
                if !sent {
                    debug!("Sink is closed, record dropped");
                }
            }
        }
    }

    /// Drain queued records, then flush the writer
    pub async fn close(&self) -> Result<()> {
        match &self.inner {
            Dispatch::Sync(writer) => flush_locked(writer),
            Dispatch::Async(worker) => {
                if let Ok(mut sender) = worker.sender.lock() {
                    sender.take();
                }
                let task = worker.task.lock().ok().and_then(|mut task| task.take());
                if let Some(task) = task {
                    task.await.context("Sink consumer task failed")?;
                }
                Ok(())
            }
        }
    }

    /// Stop the consumer now; queued records are dropped
    pub fn cancel(&self) {
        if let Dispatch::Async(worker) = &self.inner {
            if let Ok(mut sender) = worker.sender.lock() {
                sender.take();
            }
            if let Some(task) = worker.task.lock().ok().and_then(|mut task| task.take()) {
                task.abort();
            }
        }
    }
}

fn flush_locked<W: RecordWriter>(writer: &Mutex<W>) -> Result<()> {
    let mut writer = writer
        .lock()
        .map_err(|_| anyhow!("Sink writer lock poisoned"))?;
    writer.flush()
}

async fn drain<W: RecordWriter>(mut writer: W, mut receiver: mpsc::UnboundedReceiver<LogInfo>) {
    while let Some(info) = receiver.recv().await {
        let written = tokio::task::spawn_blocking(move || {
            write_record(&mut writer, &info);
            writer
        })
        .await;

        match written {
            Ok(returned) => writer = returned,
            Err(err) => {
                error!("Sink writer task failed, dropping queued records: {}", err);
                return;
            }
        }
    }

    let flushed = tokio::task::spawn_blocking(move || writer.flush()).await;
    if let Ok(Err(err)) = flushed {
        error!("Failed to flush sink: {:#}", err);
    }
}

/// Write `info`; a failure is reported as a synthetic ERROR record written once
/// through the same writer
fn write_record<W: RecordWriter + ?Sized>(writer: &mut W, info: &LogInfo) {
    let Err(err) = writer.write(info) else {
        return;
    };

    error!(sink = writer.name(), "Failed to write log record: {:#}", err);
    let report = LogInfo::new(
        LogLevel::Error,
        writer.name(),
        format!("Failed to write log record: {:#}", err),
    )
    .with_location(None);
    if let Err(err) = writer.write(&report) {
        debug!("Failed to write error report: {:#}", err);
    }
}
