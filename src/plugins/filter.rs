//! Level and tag filtering

use super::{level_allowed, LogPlugin};
use crate::log::{LogCall, LogPipeline, FILTER_PHASE};
use crate::logs::{LogInfo, LogLevel};
use crate::pipeline::{Interceptor, PipelineContext};
use anyhow::{Context, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::Arc;

/// Stops records outside the configured levels or with excluded tags
#[derive(Debug, Clone, Copy, Default)]
pub struct LogFilter;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogFilterConfig {
    /// Allowed levels, `None` for all
    #[serde(default)]
    pub levels: Option<BTreeSet<LogLevel>>,
    #[serde(default = "default_min_level")]
    pub min_level: LogLevel,
    /// Regular expressions matched against the tag
    #[serde(default)]
    pub exclude_tags: Vec<String>,
}

fn default_min_level() -> LogLevel {
    LogLevel::Verbose
}

impl Default for LogFilterConfig {
    fn default() -> Self {
        Self {
            levels: None,
            min_level: default_min_level(),
            exclude_tags: Vec::new(),
        }
    }
}

impl LogPlugin for LogFilter {
    type Config = LogFilterConfig;

    fn key(&self) -> &'static str {
        "LogFilter"
    }

    fn configuration(&self) -> LogFilterConfig {
        LogFilterConfig::default()
    }

    fn install(&self, config: LogFilterConfig, pipeline: &mut LogPipeline) -> Result<()> {
        let exclude_tags = config
            .exclude_tags
            .iter()
            .map(|pattern| {
                Regex::new(pattern).with_context(|| format!("Invalid tag pattern `{}`", pattern))
            })
            .collect::<Result<Vec<_>>>()?;

        pipeline.intercept(
            &FILTER_PHASE,
            Arc::new(FilterInterceptor {
                levels: config.levels,
                min_level: config.min_level,
                exclude_tags,
            }),
        )
    }
}

struct FilterInterceptor {
    levels: Option<BTreeSet<LogLevel>>,
    min_level: LogLevel,
    exclude_tags: Vec<Regex>,
}

impl FilterInterceptor {
    fn accepts(&self, info: &LogInfo) -> bool {
        info.level() >= self.min_level
            && level_allowed(&self.levels, info.level())
            && !self.exclude_tags.iter().any(|re| re.is_match(info.tag()))
    }
}

#[async_trait::async_trait]
impl Interceptor<LogInfo, LogCall> for FilterInterceptor {
    async fn intercept(&self, ctx: &mut PipelineContext<LogInfo, LogCall>) -> Result<()> {
        if self.accepts(ctx.subject()) {
            ctx.proceed().await
        } else {
            Ok(())
        }
    }

    fn name(&self) -> &str {
        "LogFilter"
    }
}
