pub mod metrics;
pub mod monitor;
pub mod patterns;
pub mod pool;
pub mod runner;

pub use metrics::{PerformanceMetrics, PerformanceResults, SharedMetrics};
pub use patterns::{LoadPattern, Scenario};
pub use runner::PerformanceTestRunner;
