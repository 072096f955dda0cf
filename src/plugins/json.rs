//! Object to JSON conversion at the transform phase

use super::LogPlugin;
use crate::log::{LogCall, LogPipeline, TRANSFORM_PHASE};
use crate::logs::{JsonConverter, LogContent, LogInfo};
use crate::pipeline::{Interceptor, PipelineContext};
use anyhow::{anyhow, Result};
use std::sync::Arc;
use tracing::warn;

/// Converts object content to JSON text
#[derive(Debug, Clone, Copy, Default)]
pub struct LogJson;

#[derive(Clone, Default)]
pub struct LogJsonConfig {
    /// Required
    pub converter: Option<Arc<dyn JsonConverter>>,
}

impl LogPlugin for LogJson {
    type Config = LogJsonConfig;

    fn key(&self) -> &'static str {
        "LogJson"
    }

    fn configuration(&self) -> LogJsonConfig {
        LogJsonConfig::default()
    }

    fn install(&self, config: LogJsonConfig, pipeline: &mut LogPipeline) -> Result<()> {
        let converter = config
            .converter
            .ok_or_else(|| anyhow!("LogJson requires a JSON converter"))?;
        pipeline.intercept(&TRANSFORM_PHASE, Arc::new(JsonInterceptor { converter }))
    }
}

struct JsonInterceptor {
    converter: Arc<dyn JsonConverter>,
}

#[async_trait::async_trait]
impl Interceptor<LogInfo, LogCall> for JsonInterceptor {
    async fn intercept(&self, ctx: &mut PipelineContext<LogInfo, LogCall>) -> Result<()> {
        let converted = match ctx.subject().content() {
            LogContent::Text(_) => None,
            LogContent::Object(object) => Some(self.converter.to_json(object)),
        };

        match converted {
            None => ctx.proceed().await,
            Some(Ok(json)) => {
                let record = ctx.subject().clone().with_json_content(json);
                ctx.proceed_with(record).await
            }
            Some(Err(err)) => {
                warn!(
                    tag = ctx.subject().tag(),
                    "JSON conversion failed, logging plain text: {:#}", err
                );
                let record = ctx.subject().clone().into_text_content();
                ctx.proceed_with(record).await
            }
        }
    }

    fn name(&self) -> &str {
        "LogJson"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logs::{ContentType, LogLevel, LogObject, SerdeJsonConverter};
    use crate::plugins::test_support::run;
    use std::collections::BTreeMap;

    fn pipeline(converter: Arc<dyn JsonConverter>) -> LogPipeline {
        let mut pipeline = LogPipeline::with_log_phases();
        LogJson
            .install(
                LogJsonConfig {
                    converter: Some(converter),
                },
                &mut pipeline,
            )
            .unwrap();
        pipeline
    }

    struct FailingConverter;

    impl JsonConverter for FailingConverter {
        fn to_json(&self, _object: &LogObject) -> Result<String> {
            anyhow::bail!("converter down")
        }

        fn pretty(&self, json: &str) -> Result<String> {
            Ok(json.to_string())
        }
    }

    #[test]
    fn test_missing_converter_is_rejected() {
        let mut pipeline = LogPipeline::with_log_phases();
        let err = LogJson
            .install(LogJsonConfig::default(), &mut pipeline)
            .unwrap_err();
        assert!(err.to_string().contains("converter"));
    }

    #[tokio::test]
    async fn test_object_becomes_json() {
        let pipeline = pipeline(Arc::new(SerdeJsonConverter::compact()));
        let mut map = BTreeMap::new();
        map.insert("a", 1);

        let record = LogInfo::new(LogLevel::Info, "t", LogContent::object(&map));
        let out = run(&pipeline, record).await.unwrap();
        assert_eq!(out.text(), r#"{"a":1}"#);
        assert_eq!(out.content_type(), ContentType::Json);
    }

    #[tokio::test]
    async fn test_text_is_untouched() {
        let pipeline = pipeline(Arc::new(SerdeJsonConverter::compact()));
        let out = run(&pipeline, LogInfo::new(LogLevel::Info, "t", "plain"))
            .await
            .unwrap();
        assert_eq!(out.text(), "plain");
        assert_eq!(out.content_type(), ContentType::Text);
    }

    #[tokio::test]
    async fn test_converter_failure_falls_back_to_text() {
        let pipeline = pipeline(Arc::new(FailingConverter));
        let record = LogInfo::new(LogLevel::Info, "t", LogContent::object(&vec![1, 2]));
        let out = run(&pipeline, record).await.unwrap();
        assert_eq!(out.text(), "[1, 2]");
        assert_eq!(out.content_type(), ContentType::Text);
        assert!(matches!(out.content(), LogContent::Text(_)));
    }
}
