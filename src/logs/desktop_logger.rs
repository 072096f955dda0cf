//! Desktop logger: ANSI-colored single-line output for terminals

use super::{
    ColorfulLineFormat, ConsoleLogger, ConsoleTarget, LineFormat, LogFormat, LogInfo, Logger,
    WriteMode,
};
use anyhow::Result;
use std::sync::Arc;

/// Terminal sink coloring each line by level
pub struct DesktopLogger {
    console: ConsoleLogger,
}

impl DesktopLogger {
    /// Desktop logger writing synchronously to stdout
    pub fn new() -> Result<Self> {
        Self::with_format(LineFormat::default(), WriteMode::Sync)
    }

    pub fn with_format(format: LineFormat, mode: WriteMode) -> Result<Self> {
        let format: Arc<dyn LogFormat> = Arc::new(ColorfulLineFormat::new(format));
        let console = ConsoleLogger::with_format(ConsoleTarget::Stdout, mode, format)?;
        Ok(Self { console })
    }
}

#[async_trait::async_trait]
impl Logger for DesktopLogger {
    fn log(&self, info: &LogInfo) {
        self.console.log(info);
    }

    async fn close(&self) -> Result<()> {
        self.console.close().await
    }
}
