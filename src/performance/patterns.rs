use crate::utils::duration_string;
use serde::Serialize;
use std::time::Duration;

/// Constant-arrival-rate scenario name.
pub const RT: &str = "rt";
/// Constant-concurrency scenario name.
pub const RPS: &str = "rps";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "executor", rename_all = "kebab-case")]
pub enum LoadPattern {
    /// Start `rate` iterations per `time_unit`, whatever their latency
    #[serde(rename_all = "camelCase")]
    ConstantArrivalRate {
        rate: u32,
        #[serde(with = "duration_string")]
        time_unit: Duration,
        #[serde(with = "duration_string")]
        duration: Duration,
        pre_allocated_vus: u32,
        max_vus: u32,
    },
    /// Keep `vus` workers looping iterations back to back
    #[serde(rename_all = "camelCase")]
    ConstantVus {
        vus: u32,
        #[serde(with = "duration_string")]
        duration: Duration,
    },
}

impl LoadPattern {
    pub fn duration(&self) -> Duration {
        match self {
            LoadPattern::ConstantArrivalRate { duration, .. } => *duration,
            LoadPattern::ConstantVus { duration, .. } => *duration,
        }
    }

    /// Gap between two iteration starts, for arrival-rate patterns.
    pub fn iteration_interval(&self) -> Option<Duration> {
        match self {
            LoadPattern::ConstantArrivalRate {
                rate, time_unit, ..
            } if *rate > 0 => Some(*time_unit / *rate),
            _ => None,
        }
    }

    pub fn describe(&self) -> String {
        match self {
            LoadPattern::ConstantArrivalRate {
                rate,
                time_unit,
                duration,
                pre_allocated_vus,
                max_vus,
            } => format!(
                "{} iterations/{:?} for {:?} (pre-allocated VUs: {}, max VUs: {})",
                rate, time_unit, duration, pre_allocated_vus, max_vus
            ),
            LoadPattern::ConstantVus { vus, duration } => {
                format!("{} looping VUs for {:?}", vus, duration)
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Scenario {
    #[serde(skip)]
    pub name: String,
    #[serde(flatten)]
    pub pattern: LoadPattern,
    #[serde(with = "duration_string")]
    pub graceful_stop: Duration,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn arrival(rate: u32) -> LoadPattern {
        LoadPattern::ConstantArrivalRate {
            rate,
            time_unit: Duration::from_secs(1),
            duration: Duration::from_secs(600),
            pre_allocated_vus: 2,
            max_vus: 200,
        }
    }

    #[test]
    fn arrival_rate_spaces_iterations_evenly() {
        assert_eq!(
            arrival(100).iteration_interval(),
            Some(Duration::from_millis(10))
        );
        assert_eq!(arrival(3).iteration_interval(), Some(Duration::from_nanos(333_333_333)));
        assert_eq!(arrival(0).iteration_interval(), None);
    }

    #[test]
    fn constant_vus_has_no_pacing() {
        let pattern = LoadPattern::ConstantVus {
            vus: 10,
            duration: Duration::from_secs(5),
        };
        assert_eq!(pattern.iteration_interval(), None);
        assert_eq!(pattern.duration(), Duration::from_secs(5));
    }

    #[test]
    fn serializes_like_k6_options() {
        let scenario = Scenario {
            name: RT.to_string(),
            pattern: arrival(100),
            graceful_stop: Duration::from_secs(30),
        };
        let json = serde_json::to_value(&scenario).unwrap();
        assert_eq!(json["executor"], "constant-arrival-rate");
        assert_eq!(json["rate"], 100);
        assert_eq!(json["timeUnit"], "1s");
        assert_eq!(json["duration"], "10m");
        assert_eq!(json["preAllocatedVus"], 2);
        assert_eq!(json["maxVus"], 200);
        assert_eq!(json["gracefulStop"], "30s");
    }
}
