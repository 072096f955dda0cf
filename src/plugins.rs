//! Log plugins
//!
//! A plugin contributes interceptors to the log pipeline of every handle a
//! [`LogFactory`](crate::factory::LogFactory) creates. Its configuration
//! starts from [`LogPlugin::configuration`] and is folded through every
//! configuration block installed under the plugin's key before
//! [`LogPlugin::install`] runs.

use crate::log::LogPipeline;
use crate::logs::LogLevel;
use anyhow::Result;
use std::collections::BTreeSet;

pub mod filter;
pub mod json;
pub mod pretty;
pub mod printer;
pub mod storage;
pub mod switch;

pub use filter::{LogFilter, LogFilterConfig};
pub use json::{LogJson, LogJsonConfig};
pub use pretty::{LogPretty, LogPrettyConfig};
pub use printer::{LogPrinter, LogPrinterConfig};
pub use storage::{LogStorage, LogStorageConfig};
pub use switch::{LogSwitch, LogSwitchConfig};

/// A pluggable piece of log pipeline behaviour
pub trait LogPlugin: Send + Sync + 'static {
    type Config: Send + 'static;

    /// Identity under which configuration blocks accumulate
    fn key(&self) -> &'static str;

    /// Default configuration
    fn configuration(&self) -> Self::Config;

    /// Register interceptors on `pipeline` using the final configuration
    fn install(&self, config: Self::Config, pipeline: &mut LogPipeline) -> Result<()>;
}

/// Whether `level` passes an optional allow set; `None` allows everything
pub(crate) fn level_allowed(levels: &Option<BTreeSet<LogLevel>>, level: LogLevel) -> bool {
    levels
        .as_ref()
        .map(|levels| levels.contains(&level))
        .unwrap_or(true)
}

#[cfg(test)]
pub(crate) mod test_support {
    use crate::log::LogCall;
    use crate::log::LogPipeline;
    use crate::logs::LogInfo;
    use std::sync::Arc;

    /// Run `record` through `pipeline` with a throwaway call context
    pub async fn run(pipeline: &LogPipeline, record: LogInfo) -> Option<LogInfo> {
        pipeline
            .execute(Arc::new(LogCall::new("test")), record)
            .await
            .unwrap()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_allowed() {
        assert!(level_allowed(&None, LogLevel::Verbose));

        let levels: BTreeSet<_> = [LogLevel::Warn, LogLevel::Error].into_iter().collect();
        let levels = Some(levels);
        assert!(level_allowed(&levels, LogLevel::Warn));
        assert!(!level_allowed(&levels, LogLevel::Info));
    }
}
