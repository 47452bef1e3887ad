use anyhow::Result;
use httpmock::prelude::*;
use httpmock::Method;
use petclinic_load::driver::{ApiGroup, IterationDriver, IterationPicks};
use petclinic_load::fixtures::Fixtures;
use petclinic_load::http::build_client;
use petclinic_load::performance::{
    LoadPattern, PerformanceMetrics, PerformanceTestRunner, Scenario, SharedMetrics,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

fn driver_for(server: &MockServer) -> Result<Arc<IterationDriver>> {
    let client = build_client(Duration::from_secs(10))?;
    Ok(Arc::new(IterationDriver::new(
        client,
        &server.url("/petclinic"),
        Arc::new(Fixtures::builtin()),
    )))
}

fn new_metrics() -> SharedMetrics {
    Arc::new(Mutex::new(PerformanceMetrics::new()))
}

fn fixed_picks() -> IterationPicks {
    IterationPicks {
        owner_id: 6,
        pet_id: 8,
        vet_id: 4,
        specialty_id: 2,
        visit_id: 3,
        pet_type_id: 1,
        telephone_digit: 4,
    }
}

const ROUTES: [(&str, &str); 12] = [
    ("GET", "/petclinic/api/pettypes/1"),
    ("GET", "/petclinic/api/owners/6"),
    ("PUT", "/petclinic/api/owners/6"),
    ("GET", "/petclinic/api/pets/8"),
    ("PUT", "/petclinic/api/pets/8"),
    ("POST", "/petclinic/api/owners/6/pets/8/visits"),
    ("GET", "/petclinic/api/visits/3"),
    ("PUT", "/petclinic/api/visits/3"),
    ("GET", "/petclinic/api/vets/4"),
    ("PUT", "/petclinic/api/vets/4"),
    ("GET", "/petclinic/api/specialties/2"),
    ("PUT", "/petclinic/api/specialties/2"),
];

fn mock_method(name: &str) -> Method {
    match name {
        "PUT" => PUT,
        "POST" => POST,
        _ => GET,
    }
}

/// Reads that carry a JSON content type.
fn sends_content_type(method: &str, path: &str) -> bool {
    method != "GET"
        || ["/api/pets/", "/api/visits/", "/api/vets/"]
            .iter()
            .any(|prefix| path.contains(prefix))
}

/// One mock per route of `fixed_picks()`, answering `status_for(method, path)`.
async fn mock_routes<'a>(
    server: &'a MockServer,
    status_for: impl Fn(&str, &str) -> u16,
) -> Vec<httpmock::Mock<'a>> {
    let mut mocks = Vec::new();
    for (method, path) in ROUTES {
        let status = status_for(method, path);
        let mock = server
            .mock_async(|when, then| {
                let mut when = when.method(mock_method(method)).path(path);
                if sends_content_type(method, path) {
                    when = when.header("content-type", "application/json");
                }
                if method == "PUT" && path.ends_with("/owners/6") {
                    when.body_contains("6085551024");
                }
                then.status(status);
            })
            .await;
        mocks.push(mock);
    }
    mocks
}

/// One iteration against a stub answering 200 everywhere issues every call once, in order.
#[tokio::test]
async fn test_iteration_hits_every_route_in_order() -> Result<()> {
    let server = MockServer::start_async().await;
    let mocks = mock_routes(&server, |_, _| 200).await;

    let driver = driver_for(&server)?;
    let metrics = new_metrics();
    let report = driver.run_with_picks(fixed_picks(), &metrics).await;

    assert_eq!(report.requests.len(), 12);
    let sent: Vec<(String, String)> = report
        .requests
        .iter()
        .map(|r| (r.method.to_string(), r.url.clone()))
        .collect();
    let expected: Vec<(String, String)> = ROUTES
        .iter()
        .map(|(method, path)| (method.to_string(), server.url(*path)))
        .collect();
    assert_eq!(sent, expected);

    let groups: Vec<ApiGroup> = report.requests.iter().map(|r| r.group).collect();
    assert_eq!(
        groups,
        vec![
            ApiGroup::PetTypes,
            ApiGroup::Owners,
            ApiGroup::Owners,
            ApiGroup::Pets,
            ApiGroup::Pets,
            ApiGroup::Visits,
            ApiGroup::Visits,
            ApiGroup::Visits,
            ApiGroup::Vets,
            ApiGroup::Vets,
            ApiGroup::Specialties,
            ApiGroup::Specialties,
        ]
    );

    for record in &report.requests {
        assert_eq!(record.status, Some(200));
        assert!(record.classification.log_line.is_none());
        assert_eq!(
            record.classification.check.as_ref().map(|c| c.passed),
            Some(true)
        );
    }

    // exactly one hit per route, headers and owner telephone included
    for mock in &mocks {
        mock.assert_async().await;
    }

    let results = metrics.lock().await.calculate_results();
    assert_eq!(results.total_requests, 12);
    assert_eq!(results.checks["status is 200"].passes, 12);
    assert_eq!(results.groups["Visit API"].requests, 3);

    Ok(())
}

/// Error statuses are classified, never abort the iteration.
#[tokio::test]
async fn test_error_statuses_are_recorded_and_iteration_continues() -> Result<()> {
    let server = MockServer::start_async().await;
    mock_routes(&server, |method, path| match (method, path) {
        ("GET", "/petclinic/api/owners/6") => 404,
        ("PUT", "/petclinic/api/vets/4") => 503,
        _ => 200,
    })
    .await;

    let driver = driver_for(&server)?;
    let report = driver.run_with_picks(fixed_picks(), &new_metrics()).await;
    assert_eq!(report.requests.len(), 12);

    let owner_get = &report.requests[1];
    assert_eq!(owner_get.status, Some(404));
    let line = owner_get.classification.log_line.as_deref().unwrap_or_default();
    assert!(line.starts_with("4xx Error: 404 at "));
    assert!(line.ends_with("/petclinic/api/owners/6"));

    let vet_put = &report.requests[9];
    assert_eq!(vet_put.status, Some(503));
    assert_eq!(
        vet_put.classification.log_line.as_deref(),
        Some(format!("5xx Error: 503 at {}", server.url("/petclinic/api/vets/4")).as_str())
    );

    let log_lines = report
        .requests
        .iter()
        .filter(|r| r.classification.log_line.is_some())
        .count();
    assert_eq!(log_lines, 2);
    assert!(report.requests[2..].iter().all(|r| r.status.is_some()));

    Ok(())
}

fn constant_vus(vus: u32, duration: Duration, graceful_stop: Duration) -> Scenario {
    Scenario {
        name: "rps".to_string(),
        pattern: LoadPattern::ConstantVus { vus, duration },
        graceful_stop,
    }
}

fn arrival_rate(rate: u32, max_vus: u32, duration: Duration, graceful_stop: Duration) -> Scenario {
    Scenario {
        name: "rt".to_string(),
        pattern: LoadPattern::ConstantArrivalRate {
            rate,
            time_unit: Duration::from_secs(1),
            duration,
            pre_allocated_vus: 1,
            max_vus,
        },
        graceful_stop,
    }
}

/// Constant VUs loop whole iterations; every finished iteration contributes 12 requests.
#[tokio::test]
async fn test_constant_vus_run() -> Result<()> {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.path_contains("/petclinic/api/");
            then.status(200);
        })
        .await;

    let runner = PerformanceTestRunner::with_driver(
        vec![constant_vus(
            2,
            Duration::from_millis(500),
            Duration::from_secs(10),
        )],
        driver_for(&server)?,
        Duration::ZERO,
    );
    let results = runner.run_performance_test().await?;

    assert!(results.iterations >= 2);
    assert_eq!(results.total_requests, results.iterations * 12);
    assert_eq!(results.failed_requests, 0);
    assert_eq!(results.interrupted_iterations, 0);
    assert_eq!(results.dropped_iterations, 0);
    assert_eq!(results.vus_max, 2);
    assert_eq!(results.checks_failed, 0);
    assert_eq!(results.groups["Visit API"].requests, results.iterations * 3);

    Ok(())
}

/// Arrival rate starts roughly `rate` iterations per second.
#[tokio::test]
async fn test_constant_arrival_rate_run() -> Result<()> {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.path_contains("/petclinic/api/");
            then.status(200);
        })
        .await;

    let runner = PerformanceTestRunner::with_driver(
        vec![arrival_rate(
            10,
            50,
            Duration::from_secs(1),
            Duration::from_secs(10),
        )],
        driver_for(&server)?,
        Duration::ZERO,
    );
    let results = runner.run_performance_test().await?;

    assert!(results.iterations > 0);
    assert!(results.iterations <= 11, "got {} iterations", results.iterations);
    assert_eq!(results.total_requests, results.iterations * 12);
    assert_eq!(results.dropped_iterations, 0);

    Ok(())
}

/// With every VU busy, further starts are dropped; graceful stop interrupts the stragglers.
#[tokio::test]
async fn test_saturated_arrival_rate_drops_and_interrupts() -> Result<()> {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.path_contains("/petclinic/api/");
            then.status(200).delay(Duration::from_millis(300));
        })
        .await;

    let runner = PerformanceTestRunner::with_driver(
        vec![arrival_rate(
            20,
            1,
            Duration::from_millis(600),
            Duration::from_millis(100),
        )],
        driver_for(&server)?,
        Duration::ZERO,
    );
    let results = runner.run_performance_test().await?;

    assert_eq!(results.vus_max, 1);
    assert!(results.dropped_iterations > 0);
    // a single iteration takes 12 x 300ms, far past duration + graceful stop
    assert_eq!(results.iterations, 0);
    assert_eq!(results.interrupted_iterations, 1);

    Ok(())
}

/// Responses that arrive before graceful stop aborts an iteration still reach the summary.
#[tokio::test]
async fn test_interrupted_iteration_keeps_finished_requests() -> Result<()> {
    let server = MockServer::start_async().await;
    let catch_all = server
        .mock_async(|when, then| {
            when.path_contains("/petclinic/api/");
            then.status(404).delay(Duration::from_millis(100));
        })
        .await;

    let runner = PerformanceTestRunner::with_driver(
        vec![constant_vus(
            1,
            Duration::from_millis(300),
            Duration::from_millis(200),
        )],
        driver_for(&server)?,
        Duration::ZERO,
    );
    let results = runner.run_performance_test().await?;

    assert_eq!(results.iterations, 0);
    assert_eq!(results.interrupted_iterations, 1);
    assert!(results.total_requests > 0);
    assert!(results.total_requests < 12);
    assert_eq!(results.failed_requests, results.total_requests);
    assert_eq!(results.checks["status is 4xx"].passes, results.total_requests);
    assert!(catch_all.hits_async().await as u64 >= results.total_requests);

    Ok(())
}

/// Both scenarios run side by side when no selector is given.
#[tokio::test]
async fn test_both_scenarios_run_concurrently() -> Result<()> {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.path_contains("/petclinic/api/");
            then.status(200);
        })
        .await;

    let runner = PerformanceTestRunner::with_driver(
        vec![
            arrival_rate(5, 10, Duration::from_millis(600), Duration::from_secs(10)),
            constant_vus(1, Duration::from_millis(600), Duration::from_secs(10)),
        ],
        driver_for(&server)?,
        Duration::ZERO,
    );
    assert_eq!(runner.scenarios().len(), 2);

    let results = runner.run_performance_test().await?;
    assert!(results.iterations >= 2);
    assert_eq!(results.total_requests, results.iterations * 12);

    Ok(())
}
