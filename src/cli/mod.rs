pub mod args;
pub mod commands;
pub mod config;
pub mod logging;

pub use args::{Cli, Commands, PipelineArgs};
pub use commands::run;
pub use config::{AppConfig, ConfigOverrides};
