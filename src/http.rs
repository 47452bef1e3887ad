use anyhow::{Context, Result};
use reqwest::Client;
use std::time::Duration;

const USER_AGENT: &str = concat!("petclinic-load/", env!("CARGO_PKG_VERSION"));

/// Shared client every VU sends through. Cloning it shares the connection pool.
pub fn build_client(timeout: Duration) -> Result<Client> {
    Client::builder()
        .timeout(timeout)
        .user_agent(USER_AGENT)
        .pool_idle_timeout(Duration::from_secs(90))
        .build()
        .context("Failed to create HTTP client")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_with_any_timeout() {
        assert!(build_client(Duration::from_secs(60)).is_ok());
        assert!(build_client(Duration::from_millis(1)).is_ok());
    }
}
