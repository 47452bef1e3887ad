pub mod inspect;
pub mod run;

use crate::config::LoadConfig;
use crate::fixtures::Fixtures;
use anyhow::Result;

/// Built-in fixtures unless the config points at a fixture file.
pub fn load_fixtures(config: &LoadConfig) -> Result<Fixtures> {
    Ok(match &config.fixtures {
        Some(path) => Fixtures::from_file(path)?,
        None => Fixtures::builtin(),
    })
}
