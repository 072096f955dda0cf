//! Output of records to a [`Logger`] sink

use super::{level_allowed, LogPlugin};
use crate::log::{LogCall, LogPipeline, PRINT_PHASE};
use crate::logs::{LogInfo, LogLevel, Logger};
use crate::pipeline::{Interceptor, PipelineContext};
use anyhow::{anyhow, Result};
use std::collections::BTreeSet;
use std::sync::Arc;

/// Hands matching records to a logger, then continues
#[derive(Debug, Clone, Copy, Default)]
pub struct LogPrinter;

#[derive(Clone, Default)]
pub struct LogPrinterConfig {
    /// Required
    pub logger: Option<Arc<dyn Logger>>,
    /// Printed levels, `None` for all
    pub levels: Option<BTreeSet<LogLevel>>,
}

impl LogPlugin for LogPrinter {
    type Config = LogPrinterConfig;

    fn key(&self) -> &'static str {
        "LogPrinter"
    }

    fn configuration(&self) -> LogPrinterConfig {
        LogPrinterConfig::default()
    }

    fn install(&self, config: LogPrinterConfig, pipeline: &mut LogPipeline) -> Result<()> {
        let logger = config
            .logger
            .ok_or_else(|| anyhow!("LogPrinter requires a logger"))?;
        pipeline.intercept(
            &PRINT_PHASE,
            Arc::new(PrintInterceptor {
                logger,
                levels: config.levels,
            }),
        )
    }
}

struct PrintInterceptor {
    logger: Arc<dyn Logger>,
    levels: Option<BTreeSet<LogLevel>>,
}

#[async_trait::async_trait]
impl Interceptor<LogInfo, LogCall> for PrintInterceptor {
    async fn intercept(&self, ctx: &mut PipelineContext<LogInfo, LogCall>) -> Result<()> {
        let info = ctx.subject();
        if level_allowed(&self.levels, info.level()) {
            self.logger.log(info);
        }
        ctx.proceed().await
    }

    fn name(&self) -> &str {
        "LogPrinter"
    }
}
