use crate::performance::metrics::{snapshot_results, SharedMetrics};
use crate::performance::PerformanceResults;
use owo_colors::OwoColorize;
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;

pub struct PerformanceMonitor {
    start_time: Instant,
    report_interval: Duration,
}

impl PerformanceMonitor {
    pub fn new(report_interval: Duration) -> Self {
        Self {
            start_time: Instant::now(),
            report_interval,
        }
    }

    /// One-line progress report, k6 style.
    pub fn progress_line(&self, results: &PerformanceResults, target_duration: Duration) -> String {
        let elapsed = self.start_time.elapsed();
        let progress_percent = if target_duration > Duration::ZERO {
            (elapsed.as_secs_f64() / target_duration.as_secs_f64() * 100.0).min(100.0)
        } else {
            0.0
        };

        let bar_width = 20;
        let filled = ((progress_percent / 100.0) * bar_width as f64) as usize;
        let empty = bar_width - filled;

        format!(
            "[{}{}] {:>5.1}% {}s/{}s  iterations={} reqs={} failed={} dropped={}",
            "=".repeat(filled).green(),
            "-".repeat(empty).dimmed(),
            progress_percent,
            elapsed.as_secs(),
            target_duration.as_secs(),
            results.iterations,
            results.total_requests,
            results.failed_requests,
            results.dropped_iterations,
        )
    }

    /// Print the final summary when the run completes
    pub fn print_final_summary(&self, results: &PerformanceResults) {
        println!();
        println!("{}", "=".repeat(60).dimmed());
        println!("{} Load Test Summary", "🎯".bright_white());
        println!("{}", "=".repeat(60).dimmed());

        if !results.checks.is_empty() {
            println!();
            println!("{} Checks:", "✔".bright_white());
            for (name, stats) in &results.checks {
                let total = stats.passes + stats.fails;
                let rate = if total > 0 {
                    stats.passes as f64 / total as f64 * 100.0
                } else {
                    0.0
                };
                if stats.fails == 0 {
                    println!("  {} {}", "✓".green(), name);
                } else {
                    println!(
                        "  {} {} ({:.0}%, ✓ {} / ✗ {})",
                        "✗".red(),
                        name,
                        rate,
                        stats.passes,
                        stats.fails
                    );
                }
            }
            println!(
                "  checks: {:.2}% ({} passed, {} failed)",
                results.check_pass_rate() * 100.0,
                results.checks_passed.to_string().green(),
                results.checks_failed.to_string().red()
            );
        }

        if !results.groups.is_empty() {
            println!();
            println!("{} Groups:", "📋".bright_white());
            for (name, stats) in &results.groups {
                println!(
                    "  {:<15} requests: {}  failed: {}",
                    name,
                    stats.requests.to_string().bright_white(),
                    stats.failed.to_string().red()
                );
            }
        }

        println!();
        println!("{} HTTP:", "⚡".bright_white());
        println!("  Total Requests: {}", results.total_requests.to_string().bright_white());
        println!(
            "  Requests/sec: {}",
            format!("{:.1}", results.requests_per_second).bright_white()
        );
        let failed_percent = if results.total_requests > 0 {
            results.failed_requests as f64 / results.total_requests as f64 * 100.0
        } else {
            0.0
        };
        println!(
            "  Failed: {} ({:.2}%)",
            results.failed_requests.to_string().red(),
            failed_percent
        );
        println!("  Connection Errors: {}", results.connection_errors);
        println!(
            "  Duration: avg={}ms min={}ms p50={}ms p90={}ms p95={}ms p99={}ms max={}ms",
            results.average_response_time.as_millis(),
            results.min_response_time.as_millis(),
            results.p50_response_time.as_millis(),
            results.p90_response_time.as_millis(),
            results.p95_response_time.as_millis(),
            results.p99_response_time.as_millis(),
            results.max_response_time.as_millis(),
        );

        if !results.status_code_distribution.is_empty() {
            println!();
            println!("{} Status Code Distribution:", "🔍".bright_white());
            let mut sorted_codes: Vec<_> = results.status_code_distribution.iter().collect();
            sorted_codes.sort_by_key(|(code, _)| *code);

            for (code, count) in sorted_codes {
                let count_str = count.to_string();
                if (200..300).contains(code) {
                    println!("  {}: {}", code, count_str.green());
                } else if *code >= 400 {
                    println!("  {}: {}", code, count_str.red());
                } else {
                    println!("  {}: {}", code, count_str.yellow());
                }
            }
        }

        println!();
        println!("{} Execution:", "🔁".bright_white());
        println!(
            "  Iterations: {} ({:.1}/s)",
            results.iterations.to_string().bright_white(),
            results.iterations_per_second
        );
        println!(
            "  Average Iteration: {:.2}ms",
            results.average_iteration_duration.as_secs_f64() * 1000.0
        );
        if results.dropped_iterations > 0 {
            println!(
                "  {} Dropped Iterations: {}",
                "⚠".yellow(),
                results.dropped_iterations.to_string().bright_white()
            );
        }
        if results.interrupted_iterations > 0 {
            println!(
                "  {} Interrupted Iterations: {}",
                "⚠".yellow(),
                results.interrupted_iterations.to_string().bright_white()
            );
        }
        println!("  Max VUs: {}", results.vus_max);
        println!("  Total Duration: {:?}", results.total_duration);

        if results.bytes_per_second_received > 0.0 {
            println!();
            println!("{} Network Traffic:", "🌐".bright_white());
            println!(
                "  Data Sent: {:.2} KB/s",
                results.bytes_per_second_sent / 1024.0
            );
            println!(
                "  Data Received: {:.2} KB/s",
                results.bytes_per_second_received / 1024.0
            );
        }

        println!("{}", "=".repeat(60).dimmed());
    }

    /// Start a background task that prints a progress line every report interval.
    /// The caller aborts the returned handle once load generation ends.
    pub fn start_background_monitoring(
        self,
        metrics: SharedMetrics,
        target_duration: Duration,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            if self.report_interval.is_zero() {
                return;
            }

            let mut interval = tokio::time::interval(self.report_interval);
            interval.tick().await; // Skip the first tick which fires immediately

            loop {
                interval.tick().await;

                let results = snapshot_results(&metrics).await;
                println!("{}", self.progress_line(&results, target_duration));

                if self.start_time.elapsed() >= target_duration {
                    break;
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::performance::PerformanceMetrics;

    #[test]
    fn progress_line_shows_counters() {
        let mut metrics = PerformanceMetrics::new();
        metrics.record_request(Duration::from_millis(5), 200, 0, 10, false);
        metrics.record_dropped_iteration();
        let results = metrics.calculate_results();

        let monitor = PerformanceMonitor::new(Duration::from_secs(1));
        let line = monitor.progress_line(&results, Duration::from_secs(60));
        assert!(line.contains("reqs=1"));
        assert!(line.contains("dropped=1"));
        assert!(line.contains("/60s"));
    }
}
