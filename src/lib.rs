pub mod classify;
pub mod commands;
pub mod config;
pub mod driver;
pub mod error;
pub mod fixtures;
pub mod http;
pub mod logging;
pub mod performance;
pub mod utils;

pub use config::{LoadArgs, LoadConfig};
pub use driver::{IterationDriver, IterationPicks};
pub use error::ConfigError;
pub use fixtures::Fixtures;
