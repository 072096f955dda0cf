//! Log handles
//!
//! A [`Log`] owns the pipeline its factory built for it and a queue drained by
//! one consumer task, so records from one handle are processed in the order
//! they were emitted. Emission never blocks and never fails.

use crate::logs::{LogContent, LogInfo, LogLevel};
use crate::pipeline::{Pipeline, PipelinePhase};
use anyhow::{Context, Result};
use once_cell::sync::Lazy;
use serde::Serialize;
use std::fmt;
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error};

/// Pipeline every log handle runs its records through
pub type LogPipeline = Pipeline<LogInfo, LogCall>;

/// Gate that can drop every record
pub static SWITCH_PHASE: Lazy<PipelinePhase> = Lazy::new(|| PipelinePhase::new("Switch"));
/// Content conversion
pub static TRANSFORM_PHASE: Lazy<PipelinePhase> = Lazy::new(|| PipelinePhase::new("Transform"));
/// Presentation changes
pub static RENDER_PHASE: Lazy<PipelinePhase> = Lazy::new(|| PipelinePhase::new("Render"));
pub static FILTER_PHASE: Lazy<PipelinePhase> = Lazy::new(|| PipelinePhase::new("Filter"));
pub static STORAGE_PHASE: Lazy<PipelinePhase> = Lazy::new(|| PipelinePhase::new("Storage"));
/// Terminal output
pub static PRINT_PHASE: Lazy<PipelinePhase> = Lazy::new(|| PipelinePhase::new("Print"));

impl Pipeline<LogInfo, LogCall> {
    /// Empty pipeline with the log phases registered in order
    pub fn with_log_phases() -> Self {
        Pipeline::with_phases([
            SWITCH_PHASE.clone(),
            TRANSFORM_PHASE.clone(),
            RENDER_PHASE.clone(),
            FILTER_PHASE.clone(),
            STORAGE_PHASE.clone(),
            PRINT_PHASE.clone(),
        ])
    }
}

/// Execution context handed to log interceptors
#[derive(Debug, Clone)]
pub struct LogCall {
    tag: String,
}

impl LogCall {
    pub fn new(tag: impl Into<String>) -> Self {
        Self { tag: tag.into() }
    }

    /// Default tag of the handle that emitted the record
    pub fn tag(&self) -> &str {
        &self.tag
    }
}

/// Logging handle bound to one pipeline
#[derive(Clone)]
pub struct Log {
    inner: Arc<LogInner>,
}

struct LogInner {
    call: Arc<LogCall>,
    pipeline: Arc<LogPipeline>,
    sender: Mutex<Option<mpsc::UnboundedSender<LogInfo>>>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl Log {
    /// Start the consumer for `pipeline` on the current tokio runtime
    pub fn new(tag: impl Into<String>, pipeline: LogPipeline) -> Result<Self> {
        let runtime = tokio::runtime::Handle::try_current()
            .context("Log handles require a running tokio runtime")?;

        let call = Arc::new(LogCall::new(tag));
        let pipeline = Arc::new(pipeline);
        let (sender, receiver) = mpsc::unbounded_channel();
        let task = runtime.spawn(consume(pipeline.clone(), call.clone(), receiver));

        Ok(Self {
            inner: Arc::new(LogInner {
                call,
                pipeline,
                sender: Mutex::new(Some(sender)),
                task: Mutex::new(Some(task)),
            }),
        })
    }

    /// Default tag
    pub fn tag(&self) -> &str {
        self.inner.call.tag()
    }

    pub fn pipeline(&self) -> &LogPipeline {
        &self.inner.pipeline
    }

    #[track_caller]
    pub fn v(&self, content: impl Into<LogContent>) {
        self.emit(LogInfo::new(LogLevel::Verbose, self.tag(), content));
    }

    #[track_caller]
    pub fn d(&self, content: impl Into<LogContent>) {
        self.emit(LogInfo::new(LogLevel::Debug, self.tag(), content));
    }

    #[track_caller]
    pub fn i(&self, content: impl Into<LogContent>) {
        self.emit(LogInfo::new(LogLevel::Info, self.tag(), content));
    }

    #[track_caller]
    pub fn w(&self, content: impl Into<LogContent>) {
        self.emit(LogInfo::new(LogLevel::Warn, self.tag(), content));
    }

    #[track_caller]
    pub fn e(&self, content: impl Into<LogContent>) {
        self.emit(LogInfo::new(LogLevel::Error, self.tag(), content));
    }

    #[track_caller]
    pub fn a(&self, content: impl Into<LogContent>) {
        self.emit(LogInfo::new(LogLevel::Assert, self.tag(), content));
    }

    /// Emit with an explicit level and tag
    #[track_caller]
    pub fn log(&self, level: LogLevel, tag: &str, content: impl Into<LogContent>) {
        self.emit(LogInfo::new(level, tag, content));
    }

    #[track_caller]
    pub fn log_with_error(
        &self,
        level: LogLevel,
        tag: &str,
        content: impl Into<LogContent>,
        error: impl Into<anyhow::Error>,
    ) {
        self.emit(LogInfo::new(level, tag, content).with_error(error));
    }

    /// Emit `object` as structured content for the transform phase to convert
    #[track_caller]
    pub fn json<T: Serialize + fmt::Debug + ?Sized>(&self, level: LogLevel, tag: &str, object: &T) {
        self.emit(LogInfo::new(level, tag, LogContent::object(object)));
    }

    /// Queue a prepared record
    pub fn emit(&self, info: LogInfo) {
        let sent = self
            .inner
            .sender
            .lock()
            .ok()
            .and_then(|sender| sender.as_ref().map(|s| s.send(info).is_ok()))
            .unwrap_or(false);
        if !sent {
            debug!(tag = self.tag(), "Log handle is closed, record dropped");
        }
    }

    /// Run `info` through the pipeline on the caller's task
    ///
    /// Returns the final record, or `None` when an interceptor stopped it.
    pub async fn dispatch(&self, info: LogInfo) -> Result<Option<LogInfo>> {
        self.inner
            .pipeline
            .execute(self.inner.call.clone(), info)
            .await
    }

    /// Stop accepting records and wait for the queue to drain
    pub async fn shutdown(&self) -> Result<()> {
        if let Ok(mut sender) = self.inner.sender.lock() {
            sender.take();
        }
        let task = self.inner.task.lock().ok().and_then(|mut task| task.take());
        if let Some(task) = task {
            task.await.context("Log consumer task failed")?;
        }
        Ok(())
    }

    /// Stop now; queued records are dropped
    pub fn cancel(&self) {
        if let Ok(mut sender) = self.inner.sender.lock() {
            sender.take();
        }
        if let Some(task) = self.inner.task.lock().ok().and_then(|mut task| task.take()) {
            task.abort();
        }
    }
}

impl fmt::Debug for Log {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Log")
            .field("tag", &self.tag())
            .field("interceptors", &self.inner.pipeline.interceptor_count())
            .finish()
    }
}

async fn consume(
    pipeline: Arc<LogPipeline>,
    call: Arc<LogCall>,
    mut receiver: mpsc::UnboundedReceiver<LogInfo>,
) {
    while let Some(info) = receiver.recv().await {
        // a panic inside the pipeline loses only this record
        let run = tokio::spawn({
            let pipeline = pipeline.clone();
            let call = call.clone();
            async move { pipeline.execute(call, info).await }
        });
        match run.await {
            Ok(Ok(_)) => {}
            Ok(Err(err)) => error!(tag = call.tag(), "Log pipeline failed: {:#}", err),
            Err(err) if err.is_panic() => {
                error!(tag = call.tag(), "Log pipeline panicked, record dropped")
            }
            Err(err) => error!(tag = call.tag(), "Log pipeline task failed: {}", err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::{Interceptor, PipelineContext};

    struct Collect(Arc<Mutex<Vec<LogInfo>>>);

    #[async_trait::async_trait]
    impl Interceptor<LogInfo, LogCall> for Collect {
        async fn intercept(&self, ctx: &mut PipelineContext<LogInfo, LogCall>) -> Result<()> {
            self.0.lock().unwrap().push(ctx.subject().clone());
            ctx.proceed().await
        }
    }

    fn collecting_log(tag: &str) -> (Log, Arc<Mutex<Vec<LogInfo>>>) {
        let records = Arc::new(Mutex::new(Vec::new()));
        let mut pipeline = LogPipeline::with_log_phases();
        pipeline
            .intercept(&PRINT_PHASE, Arc::new(Collect(records.clone())))
            .unwrap();
        (Log::new(tag, pipeline).unwrap(), records)
    }

    #[test]
    fn test_log_phases_order() {
        let names: Vec<_> = LogPipeline::with_log_phases()
            .phases()
            .iter()
            .map(|p| p.name().to_string())
            .collect();
        assert_eq!(
            names,
            ["Switch", "Transform", "Render", "Filter", "Storage", "Print"]
        );
    }

    #[test]
    fn test_log_requires_runtime() {
        assert!(Log::new("t", LogPipeline::with_log_phases()).is_err());
    }

    #[tokio::test]
    async fn test_records_keep_emission_order_and_call_site() {
        let (log, records) = collecting_log("app");
        log.v("one");
        log.i("two");
        log.log(LogLevel::Error, "other", "three");
        log.shutdown().await.unwrap();

        let records = records.lock().unwrap();
        let texts: Vec<_> = records.iter().map(|r| r.text().to_string()).collect();
        assert_eq!(texts, ["one", "two", "three"]);
        assert_eq!(records[0].level(), LogLevel::Verbose);
        assert_eq!(records[0].tag(), "app");
        assert_eq!(records[2].tag(), "other");
        assert!(records[0].location().unwrap().file().ends_with("log.rs"));
    }

    struct PanicOn(&'static str);

    #[async_trait::async_trait]
    impl Interceptor<LogInfo, LogCall> for PanicOn {
        async fn intercept(&self, ctx: &mut PipelineContext<LogInfo, LogCall>) -> Result<()> {
            if ctx.subject().text() == self.0 {
                panic!("sink exploded");
            }
            ctx.proceed().await
        }
    }

    #[tokio::test]
    async fn test_panicking_record_does_not_stop_the_handle() {
        let records = Arc::new(Mutex::new(Vec::new()));
        let mut pipeline = LogPipeline::with_log_phases();
        pipeline
            .intercept(&STORAGE_PHASE, Arc::new(PanicOn("bad")))
            .unwrap();
        pipeline
            .intercept(&PRINT_PHASE, Arc::new(Collect(records.clone())))
            .unwrap();
        let log = Log::new("app", pipeline).unwrap();

        log.i("before");
        log.i("bad");
        log.i("after");
        log.shutdown().await.unwrap();

        let texts: Vec<_> = records
            .lock()
            .unwrap()
            .iter()
            .map(|r| r.text().to_string())
            .collect();
        assert_eq!(texts, ["before", "after"]);
    }

    #[tokio::test]
    async fn test_emit_after_shutdown_is_dropped() {
        let (log, records) = collecting_log("app");
        log.shutdown().await.unwrap();
        log.e("late");
        assert!(records.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_dispatch_runs_inline() {
        let (log, records) = collecting_log("app");
        let out = log
            .dispatch(LogInfo::new(LogLevel::Warn, "app", "now"))
            .await
            .unwrap();
        assert_eq!(out.unwrap().text(), "now");
        assert_eq!(records.lock().unwrap().len(), 1);
        log.cancel();
    }
}
