//! Log factories
//!
//! A [`LogFactory`] records plugin installations and builds a fresh pipeline
//! for every handle it creates. Installing a plugin under a key that is
//! already present keeps the first plugin value and appends the new
//! configuration block, so blocks from every install fold over the defaults
//! in registration order. Handles see the installations made before they were
//! created and nothing after.

use crate::log::{Log, LogPipeline};
use crate::plugins::LogPlugin;
use anyhow::{anyhow, Context, Result};
use once_cell::sync::Lazy;
use std::any::Any;
use std::sync::{Arc, RwLock};
use tracing::{debug, warn};

type Mutator = Box<dyn Fn(&mut dyn Any) + Send + Sync>;
type Installer = Box<dyn Fn(&[Mutator], &mut LogPipeline) -> Result<()> + Send + Sync>;

struct PluginEntry {
    key: &'static str,
    installer: Installer,
    mutators: Vec<Mutator>,
}

/// Builds log handles from installed plugins
#[derive(Default)]
pub struct LogFactory {
    entries: RwLock<Vec<PluginEntry>>,
}

impl LogFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install `plugin` with a configuration block
    pub fn install<P, F>(&self, plugin: P, configure: F) -> &Self
    where
        P: LogPlugin,
        F: Fn(&mut P::Config) + Send + Sync + 'static,
    {
        let key = plugin.key();
        let mutator: Mutator = Box::new(move |config: &mut dyn Any| {
            match config.downcast_mut::<P::Config>() {
                Some(config) => configure(config),
                None => warn!(
                    plugin = key,
                    "Configuration block does not match the installed plugin, ignored"
                ),
            }
        });

        let Ok(mut entries) = self.entries.write() else {
            warn!(plugin = key, "Plugin registry lock poisoned, install ignored");
            return self;
        };

        match entries.iter_mut().find(|entry| entry.key == key) {
            Some(entry) => entry.mutators.push(mutator),
            None => {
                debug!(plugin = key, "Registered log plugin");
                entries.push(PluginEntry {
                    key,
                    installer: installer_for(plugin),
                    mutators: vec![mutator],
                });
            }
        }
        self
    }

    /// Install `plugin` with its default configuration
    pub fn install_default<P: LogPlugin>(&self, plugin: P) -> &Self {
        self.install(plugin, |_: &mut P::Config| {})
    }

    /// Keys of installed plugins in registration order
    pub fn plugin_keys(&self) -> Vec<&'static str> {
        self.entries
            .read()
            .map(|entries| entries.iter().map(|entry| entry.key).collect())
            .unwrap_or_default()
    }

    pub fn is_installed(&self, key: &str) -> bool {
        self.plugin_keys().contains(&key)
    }

    /// Build the pipeline for a new handle
    pub fn build_pipeline(&self) -> Result<LogPipeline> {
        let mut pipeline = LogPipeline::with_log_phases();
        let entries = self
            .entries
            .read()
            .map_err(|_| anyhow!("Plugin registry lock poisoned"))?;

        for entry in entries.iter() {
            (entry.installer)(&entry.mutators, &mut pipeline)
                .with_context(|| format!("Failed to install log plugin `{}`", entry.key))?;
        }
        Ok(pipeline)
    }

    /// Create a handle with default tag `tag`
    ///
    /// Must be called within a tokio runtime.
    pub fn get_log(&self, tag: impl Into<String>) -> Result<Log> {
        Log::new(tag, self.build_pipeline()?)
    }

    /// Create a handle tagged with the short name of `T`
    pub fn get_log_for<T: ?Sized>(&self) -> Result<Log> {
        self.get_log(short_type_name::<T>())
    }
}

fn installer_for<P: LogPlugin>(plugin: P) -> Installer {
    Box::new(move |mutators: &[Mutator], pipeline: &mut LogPipeline| {
        let mut config = plugin.configuration();
        for mutate in mutators {
            mutate(&mut config as &mut dyn Any);
        }
        plugin.install(config, pipeline)
    })
}

/// `Vec<my::Type>` becomes `Vec`, `my::module::Type` becomes `Type`
fn short_type_name<T: ?Sized>() -> &'static str {
    let name = std::any::type_name::<T>();
    let base = name.split('<').next().unwrap_or(name);
    base.rsplit("::").next().unwrap_or(base)
}

impl std::fmt::Debug for LogFactory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LogFactory")
            .field("plugins", &self.plugin_keys())
            .finish()
    }
}

/// Build a factory and let `configure` install its plugins
pub fn get_log_factory(configure: impl FnOnce(&LogFactory)) -> LogFactory {
    let factory = LogFactory::new();
    configure(&factory);
    factory
}

static DEFAULT_FACTORY: Lazy<RwLock<Option<Arc<LogFactory>>>> = Lazy::new(|| RwLock::new(None));

/// Make `factory` the process-wide default, replacing any previous one
pub fn init_default_factory(factory: LogFactory) -> Arc<LogFactory> {
    let factory = Arc::new(factory);
    match DEFAULT_FACTORY.write() {
        Ok(mut default) => *default = Some(factory.clone()),
        Err(_) => warn!("Default factory lock poisoned, factory not installed"),
    }
    factory
}

pub fn default_factory() -> Option<Arc<LogFactory>> {
    DEFAULT_FACTORY
        .read()
        .ok()
        .and_then(|default| default.clone())
}

/// Remove the process-wide default, returning it
pub fn teardown_default_factory() -> Option<Arc<LogFactory>> {
    DEFAULT_FACTORY
        .write()
        .ok()
        .and_then(|mut default| default.take())
}

/// Handle from the default factory
pub fn get_log(tag: impl Into<String>) -> Result<Log> {
    default_factory()
        .ok_or_else(|| anyhow!("No default log factory initialized"))?
        .get_log(tag)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plugins::{LogFilter, LogSwitch};

    struct Widget;

    #[test]
    fn test_short_type_name() {
        assert_eq!(short_type_name::<Widget>(), "Widget");
        assert_eq!(short_type_name::<Vec<Widget>>(), "Vec");
        assert_eq!(short_type_name::<str>(), "str");
    }

    #[test]
    fn test_same_key_keeps_single_entry() {
        let factory = get_log_factory(|f| {
            f.install_default(LogSwitch);
            f.install(LogFilter, |c| c.exclude_tags.push("a".to_string()));
            f.install(LogSwitch, |c| c.open = false);
        });
        assert_eq!(factory.plugin_keys(), ["LogSwitch", "LogFilter"]);
        assert!(factory.is_installed("LogFilter"));
        assert!(!factory.is_installed("LogJson"));
    }

    #[test]
    fn test_build_pipeline_registers_interceptors() {
        let factory = get_log_factory(|f| {
            f.install_default(LogSwitch);
            f.install_default(LogFilter);
        });
        let pipeline = factory.build_pipeline().unwrap();
        let plan = pipeline.execution_plan();
        assert_eq!(
            plan,
            [
                ("Switch".to_string(), "LogSwitch".to_string()),
                ("Filter".to_string(), "LogFilter".to_string()),
            ]
        );
    }

    #[test]
    fn test_get_log_requires_runtime() {
        let factory = LogFactory::new();
        assert!(factory.get_log("t").is_err());
    }
}
