use anyhow::{Context, Result};
use owo_colors::OwoColorize;
use std::sync::Arc;

use crate::commands::load_fixtures;
use crate::config::LoadArgs;
use crate::performance::PerformanceTestRunner;

pub async fn handle_run(args: LoadArgs) -> Result<()> {
    let config = args.resolve().context("Invalid load configuration")?;
    let fixtures = Arc::new(load_fixtures(&config)?);

    println!("{} Starting PetClinic load test", "→".cyan());
    println!("Base URL: {}", config.base_url.bright_white());
    println!("Duration: {:?}", config.duration.bright_white());
    println!(
        "Scenario: {}",
        config.scenario.as_deref().unwrap_or("rt + rps").bright_white()
    );
    tracing::debug!(
        owners = fixtures.owners().len(),
        pets = fixtures.pets().len(),
        vets = fixtures.vets().len(),
        "fixtures loaded"
    );

    let runner = PerformanceTestRunner::new(&config, fixtures)?;
    let results = runner.run_performance_test().await?;

    println!();
    println!("{} Load test completed", "✔".green().bold());
    println!(
        "Iterations: {}  Requests: {}  Checks passed: {:.1}%",
        results.iterations.to_string().bright_white(),
        results.total_requests.to_string().bright_white(),
        results.check_pass_rate() * 100.0
    );

    if let Some(output_path) = &config.summary_export {
        println!();
        println!("Saving summary to: {}", output_path.display());
        results.save_report(output_path)?;
        println!("{} Summary saved", "✔".green());
    }

    Ok(())
}
