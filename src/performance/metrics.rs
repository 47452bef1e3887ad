use crate::driver::RequestRecord;
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

/// Metrics handle shared by every VU of a run.
pub type SharedMetrics = Arc<Mutex<PerformanceMetrics>>;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckStats {
    pub passes: u64,
    pub fails: u64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupStats {
    pub requests: u64,
    pub failed: u64,
}

#[derive(Debug, Clone)]
pub struct PerformanceMetrics {
    pub start_time: Instant,
    pub response_times: Vec<Duration>,
    pub error_count: u64,
    pub request_count: u64,
    pub status_codes: HashMap<u16, u64>,
    pub bytes_sent: u64,
    pub bytes_received: u64,
    pub connection_errors: u64,
    pub checks: IndexMap<String, CheckStats>,
    pub groups: IndexMap<String, GroupStats>,
    pub iterations: u64,
    pub iteration_duration_total: Duration,
    pub dropped_iterations: u64,
    pub interrupted_iterations: u64,
    pub vus_max: u32,
}

impl Default for PerformanceMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl PerformanceMetrics {
    pub fn new() -> Self {
        Self {
            start_time: Instant::now(),
            response_times: Vec::new(),
            error_count: 0,
            request_count: 0,
            status_codes: HashMap::new(),
            bytes_sent: 0,
            bytes_received: 0,
            connection_errors: 0,
            checks: IndexMap::new(),
            groups: IndexMap::new(),
            iterations: 0,
            iteration_duration_total: Duration::ZERO,
            dropped_iterations: 0,
            interrupted_iterations: 0,
            vus_max: 0,
        }
    }

    pub fn record_request(
        &mut self,
        response_time: Duration,
        status_code: u16,
        bytes_sent: u64,
        bytes_received: u64,
        is_error: bool,
    ) {
        self.response_times.push(response_time);
        self.request_count += 1;
        self.bytes_sent += bytes_sent;
        self.bytes_received += bytes_received;

        *self.status_codes.entry(status_code).or_insert(0) += 1;

        if is_error {
            self.error_count += 1;
        }
    }

    pub fn record_connection_error(&mut self) {
        self.connection_errors += 1;
        self.error_count += 1;
    }

    pub fn record_check(&mut self, name: &str, passed: bool) {
        let stats = self.checks.entry(name.to_string()).or_default();
        if passed {
            stats.passes += 1;
        } else {
            stats.fails += 1;
        }
    }

    /// Count one request of an iteration as soon as its outcome is known.
    pub fn record_response(&mut self, request: &RequestRecord) {
        match request.status {
            Some(status) => self.record_request(
                request.duration,
                status,
                request.bytes_sent,
                request.bytes_received,
                request.is_failed(),
            ),
            None => self.record_connection_error(),
        }

        let group = self.groups.entry(request.group.name().to_string()).or_default();
        group.requests += 1;
        if request.is_failed() {
            group.failed += 1;
        }

        if let Some(check) = &request.classification.check {
            self.record_check(check.name, check.passed);
        }
    }

    pub fn record_iteration(&mut self, duration: Duration) {
        self.iterations += 1;
        self.iteration_duration_total += duration;
    }

    pub fn record_dropped_iteration(&mut self) {
        self.dropped_iterations += 1;
    }

    pub fn record_interrupted_iterations(&mut self, count: u64) {
        self.interrupted_iterations += count;
    }

    pub fn observe_vus(&mut self, vus: u32) {
        self.vus_max = self.vus_max.max(vus);
    }

    pub fn calculate_results(&self) -> PerformanceResults {
        self.clone().into_results()
    }

    /// Consume a snapshot, sorting its latencies in place.
    pub fn into_results(mut self) -> PerformanceResults {
        let total_duration = self.start_time.elapsed();
        let total_requests = self.request_count + self.connection_errors;
        let successful_requests = total_requests.saturating_sub(self.error_count);
        let success_rate = if total_requests > 0 {
            successful_requests as f64 / total_requests as f64
        } else {
            0.0
        };

        let checks_passed = self.checks.values().map(|c| c.passes).sum();
        let checks_failed = self.checks.values().map(|c| c.fails).sum();

        self.response_times.sort_unstable();
        let sorted_times = &self.response_times;

        let avg_response_time = if sorted_times.is_empty() {
            Duration::ZERO
        } else {
            Duration::from_nanos(
                (sorted_times.iter().map(|d| d.as_nanos()).sum::<u128>()
                    / sorted_times.len() as u128) as u64,
            )
        };

        let average_iteration_duration = if self.iterations == 0 {
            Duration::ZERO
        } else {
            Duration::from_nanos(
                (self.iteration_duration_total.as_nanos() / self.iterations as u128) as u64,
            )
        };

        let secs = total_duration.as_secs_f64();
        let per_second = |value: f64| if secs > 0.0 { value / secs } else { 0.0 };

        PerformanceResults {
            finished_at: Utc::now(),
            total_requests,
            successful_requests,
            failed_requests: self.error_count,
            success_rate,
            requests_per_second: per_second(total_requests as f64),
            average_response_time: avg_response_time,
            min_response_time: sorted_times.first().copied().unwrap_or(Duration::ZERO),
            max_response_time: sorted_times.last().copied().unwrap_or(Duration::ZERO),
            p50_response_time: percentile(sorted_times, 50),
            p90_response_time: percentile(sorted_times, 90),
            p95_response_time: percentile(sorted_times, 95),
            p99_response_time: percentile(sorted_times, 99),
            status_code_distribution: self.status_codes,
            bytes_per_second_sent: per_second(self.bytes_sent as f64),
            bytes_per_second_received: per_second(self.bytes_received as f64),
            connection_errors: self.connection_errors,
            checks: self.checks,
            checks_passed,
            checks_failed,
            groups: self.groups,
            iterations: self.iterations,
            iterations_per_second: per_second(self.iterations as f64),
            average_iteration_duration,
            dropped_iterations: self.dropped_iterations,
            interrupted_iterations: self.interrupted_iterations,
            vus_max: self.vus_max,
            total_duration,
        }
    }
}

/// Copy the metrics out under the lock and aggregate after releasing it, so
/// VUs are never blocked behind the percentile sort.
pub async fn snapshot_results(metrics: &SharedMetrics) -> PerformanceResults {
    let snapshot = metrics.lock().await.clone();
    snapshot.into_results()
}

fn percentile(sorted: &[Duration], pct: usize) -> Duration {
    sorted
        .get(sorted.len() * pct / 100)
        .copied()
        .unwrap_or(Duration::ZERO)
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PerformanceResults {
    pub finished_at: DateTime<Utc>,
    pub total_requests: u64,
    pub successful_requests: u64,
    pub failed_requests: u64,
    pub success_rate: f64,
    pub requests_per_second: f64,

    #[serde(with = "duration_serde")]
    pub average_response_time: Duration,
    #[serde(with = "duration_serde")]
    pub min_response_time: Duration,
    #[serde(with = "duration_serde")]
    pub max_response_time: Duration,
    #[serde(with = "duration_serde")]
    pub p50_response_time: Duration,
    #[serde(with = "duration_serde")]
    pub p90_response_time: Duration,
    #[serde(with = "duration_serde")]
    pub p95_response_time: Duration,
    #[serde(with = "duration_serde")]
    pub p99_response_time: Duration,

    pub status_code_distribution: HashMap<u16, u64>,
    pub bytes_per_second_sent: f64,
    pub bytes_per_second_received: f64,
    pub connection_errors: u64,

    pub checks: IndexMap<String, CheckStats>,
    pub checks_passed: u64,
    pub checks_failed: u64,
    pub groups: IndexMap<String, GroupStats>,

    pub iterations: u64,
    pub iterations_per_second: f64,
    #[serde(with = "duration_serde")]
    pub average_iteration_duration: Duration,
    pub dropped_iterations: u64,
    pub interrupted_iterations: u64,
    pub vus_max: u32,

    #[serde(with = "duration_serde")]
    pub total_duration: Duration,
}

impl PerformanceResults {
    pub fn check_pass_rate(&self) -> f64 {
        let total = self.checks_passed + self.checks_failed;
        if total == 0 {
            0.0
        } else {
            self.checks_passed as f64 / total as f64
        }
    }

    pub fn save_report(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)
            .with_context(|| format!("Failed to write summary to {}", path.display()))?;
        Ok(())
    }
}

// Helper module for serializing Duration as milliseconds
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_millis() as u64)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}
