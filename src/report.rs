//! JSON mirror of the check contract.
//!
//! A service wrapper around the engine speaks one request/response pair per
//! pattern:
//!
//! ```json
//! {"pattern": "^(a+)+$", "flags": ["ignore_case"], "config": {"timeout_ms": 500}}
//! ```
//!
//! ```json
//! {"status": "vulnerable", "attack": {"prefix": "a", "pump": "a", "count": 16, "suffix": "!"}, "reason": "exponential backtracking"}
//! ```
//!
//! The wire report collapses the full [`CheckResult`] taxonomy to the
//! three-way status; syntax errors travel as `unknown` with the parse
//! message in `reason`.

use serde::{Deserialize, Serialize};

use crate::attack::AttackString;
use crate::engine::{self, CheckResult, Config, Severity, UnknownReason};
use crate::pattern::{Flags, Pattern};

/// One check request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckRequest {
    pub pattern: String,
    #[serde(default)]
    pub flags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config: Option<Config>,
}

/// Wire status: the three-way contract callers branch on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportStatus {
    Safe,
    Vulnerable,
    Unknown,
}

/// One check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckReport {
    pub status: ReportStatus,
    pub attack: Option<AttackString>,
    pub reason: Option<String>,
}

impl From<&CheckResult> for CheckReport {
    fn from(result: &CheckResult) -> Self {
        match result {
            CheckResult::Safe => CheckReport {
                status: ReportStatus::Safe,
                attack: None,
                reason: None,
            },
            CheckResult::Vulnerable {
                severity, attack, ..
            } => CheckReport {
                status: ReportStatus::Vulnerable,
                attack: Some(attack.clone()),
                reason: Some(match severity {
                    Severity::Exponential => "exponential backtracking".to_string(),
                    Severity::Polynomial { degree } => {
                        format!("polynomial backtracking, degree {degree}")
                    }
                }),
            },
            CheckResult::Unknown { reason, detail } => CheckReport {
                status: ReportStatus::Unknown,
                attack: None,
                reason: Some(match (reason, detail) {
                    (_, Some(detail)) => detail.clone(),
                    (UnknownReason::Timeout, None) => "analysis timed out".to_string(),
                    (UnknownReason::UnsupportedConstruct, None) => {
                        "unsupported construct".to_string()
                    }
                    (UnknownReason::InternalLimitExceeded, None) => {
                        "internal limit exceeded".to_string()
                    }
                }),
            },
            CheckResult::SyntaxError { position, message } => CheckReport {
                status: ReportStatus::Unknown,
                attack: None,
                reason: Some(format!("syntax error at position {position}: {message}")),
            },
        }
    }
}

/// Serve one request end to end.
#[must_use]
pub fn handle(request: &CheckRequest) -> CheckReport {
    let flags = match Flags::from_names(&request.flags) {
        Ok(flags) => flags,
        Err(message) => {
            return CheckReport {
                status: ReportStatus::Unknown,
                attack: None,
                reason: Some(message),
            };
        }
    };
    let pattern = Pattern::new(request.pattern.clone(), flags);
    let config = request
        .config
        .as_ref()
        .unwrap_or_else(|| Config::global_default());
    CheckReport::from(&engine::check(&pattern, config))
}
