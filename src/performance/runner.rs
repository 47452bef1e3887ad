use crate::config::LoadConfig;
use crate::driver::IterationDriver;
use crate::fixtures::Fixtures;
use crate::http::build_client;
use crate::performance::monitor::PerformanceMonitor;
use crate::performance::pool::VuPool;
use crate::performance::metrics::snapshot_results;
use crate::performance::{
    LoadPattern, PerformanceMetrics, PerformanceResults, Scenario, SharedMetrics,
};
use anyhow::Result;
use futures::stream::{FuturesUnordered, StreamExt};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::{sleep_until, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

pub struct PerformanceTestRunner {
    scenarios: Vec<Scenario>,
    driver: Arc<IterationDriver>,
    report_interval: Duration,
}

impl PerformanceTestRunner {
    pub fn new(config: &LoadConfig, fixtures: Arc<Fixtures>) -> Result<Self> {
        let client = build_client(config.http_timeout)?;
        let driver = IterationDriver::new(client, &config.base_url, fixtures);
        Ok(Self::with_driver(
            config.scenarios(),
            Arc::new(driver),
            config.report_interval,
        ))
    }

    pub fn with_driver(
        scenarios: Vec<Scenario>,
        driver: Arc<IterationDriver>,
        report_interval: Duration,
    ) -> Self {
        Self {
            scenarios,
            driver,
            report_interval,
        }
    }

    pub fn scenarios(&self) -> &[Scenario] {
        &self.scenarios
    }

    /// Run every selected scenario concurrently and return the merged results.
    pub async fn run_performance_test(&self) -> Result<PerformanceResults> {
        if self.scenarios.is_empty() {
            anyhow::bail!("No scenarios selected");
        }

        println!("🚀 Starting load test against {}", self.driver.base_url());
        for scenario in &self.scenarios {
            println!("   {}: {}", scenario.name, scenario.pattern.describe());
        }

        let metrics: SharedMetrics = Arc::new(Mutex::new(PerformanceMetrics::new()));
        let longest = self
            .scenarios
            .iter()
            .map(|s| s.pattern.duration())
            .max()
            .unwrap_or_default();

        let monitor = PerformanceMonitor::new(self.report_interval)
            .start_background_monitoring(Arc::clone(&metrics), longest);

        let runs = self.scenarios.iter().map(|scenario| {
            run_scenario(
                scenario.clone(),
                Arc::clone(&self.driver),
                Arc::clone(&metrics),
            )
        });
        futures::future::join_all(runs).await;

        monitor.abort();

        let results = snapshot_results(&metrics).await;
        PerformanceMonitor::new(self.report_interval).print_final_summary(&results);
        Ok(results)
    }
}

async fn run_scenario(scenario: Scenario, driver: Arc<IterationDriver>, metrics: SharedMetrics) {
    info!(scenario = %scenario.name, "starting scenario: {}", scenario.pattern.describe());

    let deadline = Instant::now() + scenario.pattern.duration();
    let in_flight = match &scenario.pattern {
        LoadPattern::ConstantVus { vus, .. } => {
            run_constant_vus(*vus, deadline, &driver, &metrics).await
        }
        LoadPattern::ConstantArrivalRate {
            pre_allocated_vus,
            max_vus,
            ..
        } => {
            let Some(period) = scenario.pattern.iteration_interval() else {
                warn!(scenario = %scenario.name, "arrival rate is zero, nothing to run");
                return;
            };
            let pool = VuPool::new(*pre_allocated_vus, *max_vus);
            run_constant_arrival_rate(period, deadline, &pool, &driver, &metrics).await
        }
    };

    let interrupted = drain_in_flight(in_flight, scenario.graceful_stop).await;
    if interrupted > 0 {
        warn!(
            scenario = %scenario.name,
            interrupted, "graceful stop elapsed, iterations interrupted"
        );
        metrics
            .lock()
            .await
            .record_interrupted_iterations(interrupted);
    }

    info!(scenario = %scenario.name, "scenario finished");
}

/// Spawn `vus` workers that loop iterations until `deadline`. Returns the
/// workers, which may still be finishing their last iteration.
async fn run_constant_vus(
    vus: u32,
    deadline: Instant,
    driver: &Arc<IterationDriver>,
    metrics: &SharedMetrics,
) -> FuturesUnordered<JoinHandle<()>> {
    let workers = FuturesUnordered::new();

    for worker_id in 0..vus {
        let driver = Arc::clone(driver);
        let metrics = Arc::clone(metrics);
        workers.push(tokio::spawn(async move {
            while Instant::now() < deadline {
                let report = driver.run_iteration(&metrics).await;
                metrics.lock().await.record_iteration(report.duration);
            }
            debug!(worker_id, "worker done");
        }));
    }
    metrics.lock().await.observe_vus(vus);

    sleep_until(deadline).await;
    workers
}

/// Start one iteration every `period` until `deadline`, each on a VU leased
/// from `pool`. Starts that find no free VU are counted as dropped.
async fn run_constant_arrival_rate(
    period: Duration,
    deadline: Instant,
    pool: &VuPool,
    driver: &Arc<IterationDriver>,
    metrics: &SharedMetrics,
) -> FuturesUnordered<JoinHandle<()>> {
    let mut in_flight = FuturesUnordered::new();
    // interval() panics on a zero period
    let mut ticker = tokio::time::interval(period.max(Duration::from_micros(1)));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    let stop = sleep_until(deadline);
    tokio::pin!(stop);

    loop {
        tokio::select! {
            _ = &mut stop => break,
            // reap finished iterations so the set stays small
            Some(_) = in_flight.next(), if !in_flight.is_empty() => {}
            _ = ticker.tick() => {
                let Some(lease) = pool.try_acquire() else {
                    metrics.lock().await.record_dropped_iteration();
                    continue;
                };
                metrics.lock().await.observe_vus(pool.allocated());

                let driver = Arc::clone(driver);
                let metrics = Arc::clone(metrics);
                in_flight.push(tokio::spawn(async move {
                    let _lease = lease;
                    let report = driver.run_iteration(&metrics).await;
                    metrics.lock().await.record_iteration(report.duration);
                }));
            }
        }
    }

    in_flight
}

/// Wait up to `graceful_stop` for in-flight work, abort the rest and return
/// how many were aborted.
async fn drain_in_flight(
    mut in_flight: FuturesUnordered<JoinHandle<()>>,
    graceful_stop: Duration,
) -> u64 {
    let timeout_future = tokio::time::sleep(graceful_stop);
    tokio::pin!(timeout_future);

    loop {
        tokio::select! {
            _ = &mut timeout_future => break,
            result = in_flight.next() => {
                match result {
                    Some(Ok(())) => {}
                    Some(Err(e)) => warn!("iteration task failed: {}", e),
                    None => return 0,
                }
            }
        }
    }

    let remaining = in_flight.len() as u64;
    for handle in in_flight.iter() {
        handle.abort();
    }
    remaining
}
