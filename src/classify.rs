//! Status-code bucketing for every response the driver receives.
//!
//! Classification is observational only: it produces a check result for the
//! summary and at most one error line for the log. Nothing here retries.

use reqwest::Method;
use serde::Serialize;

pub const CHECK_OK: &str = "status is 200";
pub const CHECK_4XX: &str = "status is 4xx";
pub const CHECK_5XX: &str = "status is 5xx";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseClass {
    Success,
    ClientError,
    ServerError,
    Unexpected,
}

impl ResponseClass {
    pub fn from_status(status: u16) -> Self {
        match status {
            s if s < 400 => ResponseClass::Success,
            400..=499 => ResponseClass::ClientError,
            500..=599 => ResponseClass::ServerError,
            _ => ResponseClass::Unexpected,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckResult {
    pub name: &'static str,
    pub passed: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    pub class: ResponseClass,
    pub check: Option<CheckResult>,
    pub log_line: Option<String>,
}

/// Classify a status without side effects. Status `0` stands for a request
/// that never produced a response; it falls in the below-400 bucket and is
/// only visible through the connection error counter.
pub fn classify_status(status: u16, url: &str) -> Classification {
    let class = ResponseClass::from_status(status);
    let is_4xx = class == ResponseClass::ClientError;

    match class {
        ResponseClass::Success => Classification {
            class,
            check: Some(CheckResult {
                name: CHECK_OK,
                passed: true,
            }),
            log_line: None,
        },
        ResponseClass::ClientError => Classification {
            class,
            check: Some(CheckResult {
                name: CHECK_4XX,
                passed: is_4xx,
            }),
            log_line: Some(format!("4xx Error: {} at {}", status, url)),
        },
        ResponseClass::ServerError => Classification {
            class,
            // evaluates the 4xx predicate, so a 5xx response always fails this check
            check: Some(CheckResult {
                name: CHECK_5XX,
                passed: is_4xx,
            }),
            log_line: Some(format!("5xx Error: {} at {}", status, url)),
        },
        ResponseClass::Unexpected => Classification {
            class,
            check: None,
            log_line: Some(format!("Unexpected Error: {} at {}", status, url)),
        },
    }
}

/// Classify a response and emit its error line, if any.
pub fn handle_response(method: &Method, url: &str, status: u16) -> Classification {
    let classification = classify_status(status, url);
    if let Some(line) = &classification.log_line {
        tracing::error!(method = %method, "{}", line);
    }
    classification
}
