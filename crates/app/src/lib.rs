//! Storefront process wiring: configuration, bootstrap, and script replay.

pub mod bootstrap;
pub mod config;
pub mod replay;

pub use bootstrap::{BootstrapError, Storefront};
pub use config::{AppConfig, ConfigError};
pub use replay::{ReplayError, ReplayReport, Step, StepOp};
