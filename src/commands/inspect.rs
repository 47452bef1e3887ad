use anyhow::{Context, Result};
use indexmap::IndexMap;
use serde::Serialize;

use crate::commands::load_fixtures;
use crate::config::{LoadArgs, LoadConfig};
use crate::performance::Scenario;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedOptions {
    #[serde(flatten)]
    pub config: LoadConfig,
    pub scenarios: IndexMap<String, Scenario>,
    pub fixture_counts: IndexMap<&'static str, usize>,
}

/// Resolve options the way `run` would, without sending any traffic.
pub fn resolve_options(args: &LoadArgs) -> Result<ResolvedOptions> {
    let config = args.resolve().context("Invalid load configuration")?;
    let fixtures = load_fixtures(&config)?;

    let scenarios = config
        .scenarios()
        .into_iter()
        .map(|scenario| (scenario.name.clone(), scenario))
        .collect();

    let mut fixture_counts = IndexMap::new();
    fixture_counts.insert("owners", fixtures.owners().len());
    fixture_counts.insert("pets", fixtures.pets().len());
    fixture_counts.insert("vets", fixtures.vets().len());
    fixture_counts.insert("specialties", fixtures.specialties().len());
    fixture_counts.insert("visits", fixtures.visits().len());

    Ok(ResolvedOptions {
        config,
        scenarios,
        fixture_counts,
    })
}

pub fn handle_inspect(args: LoadArgs) -> Result<()> {
    let options = resolve_options(&args)?;
    println!("{}", serde_json::to_string_pretty(&options)?);
    Ok(())
}
