//! Pretty printing of JSON content

use super::LogPlugin;
use crate::log::{LogCall, LogPipeline, RENDER_PHASE};
use crate::logs::{ContentType, JsonConverter, LogInfo};
use crate::pipeline::{Interceptor, PipelineContext};
use anyhow::{anyhow, Result};
use std::sync::Arc;

/// Re-renders JSON content with indentation
#[derive(Debug, Clone, Copy, Default)]
pub struct LogPretty;

#[derive(Clone, Default)]
pub struct LogPrettyConfig {
    /// Required
    pub converter: Option<Arc<dyn JsonConverter>>,
    /// Also re-render plain text that starts like a JSON object or array
    pub detect_json_text: bool,
}

impl LogPlugin for LogPretty {
    type Config = LogPrettyConfig;

    fn key(&self) -> &'static str {
        "LogPretty"
    }

    fn configuration(&self) -> LogPrettyConfig {
        LogPrettyConfig::default()
    }

    fn install(&self, config: LogPrettyConfig, pipeline: &mut LogPipeline) -> Result<()> {
        let converter = config
            .converter
            .ok_or_else(|| anyhow!("LogPretty requires a JSON converter"))?;
        pipeline.intercept(
            &RENDER_PHASE,
            Arc::new(PrettyInterceptor {
                converter,
                detect_json_text: config.detect_json_text,
            }),
        )
    }
}

struct PrettyInterceptor {
    converter: Arc<dyn JsonConverter>,
    detect_json_text: bool,
}

impl PrettyInterceptor {
    fn looks_like_json(&self, info: &LogInfo) -> bool {
        if info.content_type() == ContentType::Json {
            return true;
        }
        if !self.detect_json_text {
            return false;
        }
        let text = info.text().trim_start();
        text.starts_with('{') || text.starts_with('[')
    }
}

#[async_trait::async_trait]
impl Interceptor<LogInfo, LogCall> for PrettyInterceptor {
    async fn intercept(&self, ctx: &mut PipelineContext<LogInfo, LogCall>) -> Result<()> {
        if !self.looks_like_json(ctx.subject()) {
            return ctx.proceed().await;
        }

        match self.converter.pretty(ctx.subject().text()) {
            Ok(pretty) => {
                let record = ctx.subject().clone().with_json_content(pretty);
                ctx.proceed_with(record).await
            }
            Err(_) => ctx.proceed().await,
        }
    }

    fn name(&self) -> &str {
        "LogPretty"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logs::{LogLevel, SerdeJsonConverter};
    use crate::plugins::test_support::run;

    fn pipeline() -> LogPipeline {
        detecting_pipeline(true)
    }

    fn detecting_pipeline(detect_json_text: bool) -> LogPipeline {
        let mut pipeline = LogPipeline::with_log_phases();
        LogPretty
            .install(
                LogPrettyConfig {
                    converter: Some(Arc::new(SerdeJsonConverter::compact())),
                    detect_json_text,
                },
                &mut pipeline,
            )
            .unwrap();
        pipeline
    }

    #[tokio::test]
    async fn test_json_text_is_indented() {
        let out = run(&pipeline(), LogInfo::new(LogLevel::Debug, "t", r#"{"a":[1,2]}"#))
            .await
            .unwrap();
        assert_eq!(out.text(), "{\n  \"a\": [\n    1,\n    2\n  ]\n}");
        assert_eq!(out.content_type(), ContentType::Json);
    }

    #[tokio::test]
    async fn test_unparsable_text_is_untouched() {
        let text = "[worker] {not json";
        let out = run(&pipeline(), LogInfo::new(LogLevel::Debug, "t", text))
            .await
            .unwrap();
        assert_eq!(out.text(), text);
        assert_eq!(out.content_type(), ContentType::Text);

        let out = run(&pipeline(), LogInfo::new(LogLevel::Debug, "t", "hello"))
            .await
            .unwrap();
        assert_eq!(out.text(), "hello");
    }

    #[tokio::test]
    async fn test_plain_text_kept_unless_detection_enabled() {
        // debug rendering of a vector, as left behind by a failed conversion
        let out = run(&detecting_pipeline(false), LogInfo::new(LogLevel::Warn, "t", "[1, 2]"))
            .await
            .unwrap();
        assert_eq!(out.text(), "[1, 2]");
        assert_eq!(out.content_type(), ContentType::Text);

        let json = LogInfo::new(LogLevel::Warn, "t", "placeholder")
            .with_json_content(r#"{"a":1}"#.to_string());
        let out = run(&detecting_pipeline(false), json).await.unwrap();
        assert_eq!(out.text(), "{\n  \"a\": 1\n}");
    }

    #[test]
    fn test_missing_converter_is_rejected() {
        let mut pipeline = LogPipeline::with_log_phases();
        assert!(LogPretty
            .install(LogPrettyConfig::default(), &mut pipeline)
            .is_err());
    }
}
