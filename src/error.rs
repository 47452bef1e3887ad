use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid duration '{value}': {reason}")]
    InvalidDuration { value: String, reason: String },

    #[error("Unknown scenario '{0}'. Use: rt, rps")]
    UnknownScenario(String),

    #[error("Invalid base URL '{value}': {source}")]
    InvalidBaseUrl {
        value: String,
        #[source]
        source: url::ParseError,
    },

    #[error("{name} must be greater than zero")]
    NotPositive { name: &'static str },

    #[error("Fixture collection '{0}' is empty")]
    EmptyFixtures(&'static str),

    #[error("Failed to read fixture file {}: {source}", path.display())]
    FixtureIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse fixture file {}: {message}", path.display())]
    FixtureParse { path: PathBuf, message: String },
}
