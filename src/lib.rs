//! vastlog - structured logging through a phase-ordered interceptor pipeline
//!
//! A [`factory::LogFactory`] collects plugin installations. Every
//! [`log::Log`] handle it creates owns a pipeline built from those plugins and
//! runs each record through the log phases (switch, transform, render,
//! filter, storage, print) before the terminal sinks in [`logs`] write it out.

pub mod config;
pub mod factory;
pub mod log;
pub mod logs;
pub mod pipeline;
pub mod plugins;

pub use factory::{
    default_factory, get_log, get_log_factory, init_default_factory, teardown_default_factory,
    LogFactory,
};
pub use log::{Log, LogCall, LogPipeline};
pub use logs::{LogInfo, LogLevel};
pub use plugins::LogPlugin;
