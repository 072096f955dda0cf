//! Persistence of records to a [`LogStore`]

use super::{level_allowed, LogPlugin};
use crate::log::{LogCall, LogPipeline, STORAGE_PHASE};
use crate::logs::{LogInfo, LogLevel, LogStore};
use crate::pipeline::{Interceptor, PipelineContext};
use anyhow::{anyhow, Result};
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::error;

/// Hands matching records to a store, then continues
#[derive(Debug, Clone, Copy, Default)]
pub struct LogStorage;

#[derive(Clone, Default)]
pub struct LogStorageConfig {
    /// Required
    pub store: Option<Arc<dyn LogStore>>,
    /// Stored levels, `None` for all
    pub levels: Option<BTreeSet<LogLevel>>,
}

impl LogPlugin for LogStorage {
    type Config = LogStorageConfig;

    fn key(&self) -> &'static str {
        "LogStorage"
    }

    fn configuration(&self) -> LogStorageConfig {
        LogStorageConfig::default()
    }

    fn install(&self, config: LogStorageConfig, pipeline: &mut LogPipeline) -> Result<()> {
        let store = config
            .store
            .ok_or_else(|| anyhow!("LogStorage requires a log store"))?;
        pipeline.intercept(
            &STORAGE_PHASE,
            Arc::new(StorageInterceptor {
                store,
                levels: config.levels,
            }),
        )
    }
}

struct StorageInterceptor {
    store: Arc<dyn LogStore>,
    levels: Option<BTreeSet<LogLevel>>,
}

#[async_trait::async_trait]
impl Interceptor<LogInfo, LogCall> for StorageInterceptor {
    async fn intercept(&self, ctx: &mut PipelineContext<LogInfo, LogCall>) -> Result<()> {
        let info = ctx.subject();
        if level_allowed(&self.levels, info.level()) {
            if let Err(err) = self.store.store(info) {
                error!(tag = info.tag(), "Failed to store log record: {:#}", err);
            }
        }
        ctx.proceed().await
    }

    fn name(&self) -> &str {
        "LogStorage"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logs::MemoryLogger;
    use crate::plugins::test_support::run;

    struct BrokenStore;

    impl LogStore for BrokenStore {
        fn store(&self, _info: &LogInfo) -> Result<()> {
            anyhow::bail!("disk full")
        }
    }

    #[tokio::test]
    async fn test_stores_selected_levels() {
        let memory = MemoryLogger::new();
        let mut pipeline = LogPipeline::with_log_phases();
        LogStorage
            .install(
                LogStorageConfig {
                    store: Some(Arc::new(memory.clone())),
                    levels: Some([LogLevel::Error].into_iter().collect()),
                },
                &mut pipeline,
            )
            .unwrap();

        run(&pipeline, LogInfo::new(LogLevel::Info, "t", "skip")).await;
        run(&pipeline, LogInfo::new(LogLevel::Error, "t", "keep")).await;

        let records = memory.records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].text(), "keep");
    }

    #[tokio::test]
    async fn test_store_failure_does_not_stop_chain() {
        let mut pipeline = LogPipeline::with_log_phases();
        LogStorage
            .install(
                LogStorageConfig {
                    store: Some(Arc::new(BrokenStore)),
                    levels: None,
                },
                &mut pipeline,
            )
            .unwrap();
        assert!(run(&pipeline, LogInfo::new(LogLevel::Warn, "t", "x"))
            .await
            .is_some());
    }
}
