//! Master on/off switch for a log pipeline

use super::LogPlugin;
use crate::log::{LogCall, LogPipeline, SWITCH_PHASE};
use crate::logs::LogInfo;
use crate::pipeline::{Interceptor, PipelineContext};
use anyhow::Result;
use std::sync::Arc;

/// Drops every record while closed
#[derive(Debug, Clone, Copy, Default)]
pub struct LogSwitch;

#[derive(Debug, Clone)]
pub struct LogSwitchConfig {
    pub open: bool,
}

impl LogPlugin for LogSwitch {
    type Config = LogSwitchConfig;

    fn key(&self) -> &'static str {
        "LogSwitch"
    }

    fn configuration(&self) -> LogSwitchConfig {
        LogSwitchConfig { open: true }
    }

    fn install(&self, config: LogSwitchConfig, pipeline: &mut LogPipeline) -> Result<()> {
        pipeline.intercept(&SWITCH_PHASE, Arc::new(SwitchInterceptor { open: config.open }))
    }
}

struct SwitchInterceptor {
    open: bool,
}

#[async_trait::async_trait]
impl Interceptor<LogInfo, LogCall> for SwitchInterceptor {
    async fn intercept(&self, ctx: &mut PipelineContext<LogInfo, LogCall>) -> Result<()> {
        if self.open {
            ctx.proceed().await
        } else {
            Ok(())
        }
    }

    fn name(&self) -> &str {
        "LogSwitch"
    }
}
