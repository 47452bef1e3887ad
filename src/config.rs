use crate::error::ConfigError;
use crate::performance::patterns::{LoadPattern, Scenario, RPS, RT};
use crate::utils::{duration_string, parse_duration};
use clap::Args;
use indexmap::IndexMap;
use serde::Serialize;
use std::path::PathBuf;
use std::time::Duration;
use url::Url;

pub const DEFAULT_BASE_URL: &str = "http://petclinic:9966/petclinic";

/// Pre-allocated VUs of the constant-arrival-rate scenario.
pub const ARRIVAL_PRE_ALLOCATED_VUS: u32 = 2;
/// Upper bound on VUs the constant-arrival-rate scenario may spin up.
pub const ARRIVAL_MAX_VUS: u32 = 200;

/// Load settings. Each flag falls back to its environment variable, then to its default.
#[derive(Debug, Clone, Args)]
pub struct LoadArgs {
    /// PetClinic REST root
    #[arg(long, env = "BASE_URL", default_value = DEFAULT_BASE_URL)]
    pub base_url: String,
    /// How long each scenario generates load (500ms, 30s, 10m, 1h)
    #[arg(long, env = "DURATION", default_value = "600s")]
    pub duration: String,
    /// Iterations started per second by the `rt` scenario
    #[arg(long, env = "RATE", default_value_t = 100)]
    pub rate: u32,
    /// Concurrent workers of the `rps` scenario
    #[arg(long, env = "CLIENTS", default_value_t = 100)]
    pub clients: u32,
    /// Run only this scenario (rt or rps); both run when unset
    #[arg(long, env = "SCENARIO")]
    pub scenario: Option<String>,
    /// Time in-flight iterations get to finish after the duration elapses
    #[arg(long, env = "GRACEFUL_STOP", default_value = "30s")]
    pub graceful_stop: String,
    /// Per-request timeout
    #[arg(long, env = "HTTP_TIMEOUT", default_value = "60s")]
    pub http_timeout: String,
    /// YAML or JSON file replacing the built-in fixtures
    #[arg(long, env = "FIXTURES")]
    pub fixtures: Option<PathBuf>,
    /// Interval between progress reports
    #[arg(long, env = "REPORT_INTERVAL", default_value = "10s")]
    pub report_interval: String,
    /// Write the end-of-run summary as JSON to this file
    #[arg(long, env = "SUMMARY_EXPORT")]
    pub summary_export: Option<PathBuf>,
}

/// Validated form of [`LoadArgs`].
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadConfig {
    pub base_url: String,
    #[serde(with = "duration_string")]
    pub duration: Duration,
    pub rate: u32,
    pub clients: u32,
    pub scenario: Option<String>,
    #[serde(with = "duration_string")]
    pub graceful_stop: Duration,
    #[serde(with = "duration_string")]
    pub http_timeout: Duration,
    pub fixtures: Option<PathBuf>,
    #[serde(with = "duration_string")]
    pub report_interval: Duration,
    pub summary_export: Option<PathBuf>,
}

impl LoadArgs {
    pub fn resolve(&self) -> Result<LoadConfig, ConfigError> {
        let base_url = self.base_url.trim();
        Url::parse(base_url).map_err(|source| ConfigError::InvalidBaseUrl {
            value: base_url.to_string(),
            source,
        })?;

        if self.rate == 0 {
            return Err(ConfigError::NotPositive { name: "RATE" });
        }
        if self.clients == 0 {
            return Err(ConfigError::NotPositive { name: "CLIENTS" });
        }

        let duration = parse_duration(&self.duration)?;
        if duration.is_zero() {
            return Err(ConfigError::NotPositive { name: "DURATION" });
        }

        // an empty SCENARIO counts as unset
        let scenario = match self.scenario.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(name) if name == RT || name == RPS => Some(name.to_string()),
            Some(other) => return Err(ConfigError::UnknownScenario(other.to_string())),
        };

        Ok(LoadConfig {
            base_url: base_url.trim_end_matches('/').to_string(),
            duration,
            rate: self.rate,
            clients: self.clients,
            scenario,
            graceful_stop: parse_duration(&self.graceful_stop)?,
            http_timeout: parse_duration(&self.http_timeout)?,
            fixtures: self.fixtures.clone(),
            report_interval: parse_duration(&self.report_interval)?,
            summary_export: self.summary_export.clone(),
        })
    }
}

impl LoadConfig {
    /// Both scenarios, keyed by name, in declaration order.
    pub fn all_scenarios(&self) -> IndexMap<&'static str, Scenario> {
        let mut scenarios = IndexMap::new();
        scenarios.insert(
            RT,
            Scenario {
                name: RT.to_string(),
                pattern: LoadPattern::ConstantArrivalRate {
                    rate: self.rate,
                    time_unit: Duration::from_secs(1),
                    duration: self.duration,
                    pre_allocated_vus: ARRIVAL_PRE_ALLOCATED_VUS,
                    max_vus: ARRIVAL_MAX_VUS,
                },
                graceful_stop: self.graceful_stop,
            },
        );
        scenarios.insert(
            RPS,
            Scenario {
                name: RPS.to_string(),
                pattern: LoadPattern::ConstantVus {
                    vus: self.clients,
                    duration: self.duration,
                },
                graceful_stop: self.graceful_stop,
            },
        );
        scenarios
    }

    /// The scenarios this run executes: the one named by SCENARIO, or all of them.
    pub fn scenarios(&self) -> Vec<Scenario> {
        let mut all = self.all_scenarios();
        match &self.scenario {
            Some(name) => all.shift_remove(name.as_str()).into_iter().collect(),
            None => all.into_values().collect(),
        }
    }
}
