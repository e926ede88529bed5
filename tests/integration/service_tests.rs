//! Wire-contract tests for the JSON request/response mirror.

use redos_engine::{handle, CheckReport, CheckRequest, ReportStatus};

#[test]
fn test_vulnerable_response_shape() {
    let request: CheckRequest =
        serde_json::from_str(r#"{"pattern": "^(a+)+$", "flags": []}"#).unwrap();
    let report = handle(&request);
    let json = serde_json::to_value(&report).unwrap();

    assert_eq!(json["status"], "vulnerable");
    let attack = &json["attack"];
    assert!(attack["prefix"].is_string());
    assert!(attack["pump"].is_string());
    assert!(attack["count"].is_u64());
    assert!(attack["suffix"].is_string());
    assert!(json["reason"].is_string());
}

#[test]
fn test_safe_response_shape() {
    let report = handle(&CheckRequest {
        pattern: "^[a-z]+$".into(),
        flags: vec![],
        config: None,
    });
    let json = serde_json::to_value(&report).unwrap();
    assert_eq!(json["status"], "safe");
    assert!(json["attack"].is_null());
    assert!(json["reason"].is_null());
}

#[test]
fn test_flags_list_is_honored() {
    let request: CheckRequest =
        serde_json::from_str(r#"{"pattern": "^(A+)+$", "flags": ["ignore_case"]}"#).unwrap();
    let report = handle(&request);
    assert_eq!(report.status, ReportStatus::Vulnerable);
}

#[test]
fn test_per_request_config_overrides_default() {
    let request: CheckRequest = serde_json::from_str(
        r#"{"pattern": "^(a+)+$", "config": {"max_search_steps": 5}}"#,
    )
    .unwrap();
    let report = handle(&request);
    // Starved search: unknown, and the attack field stays null.
    assert_eq!(report.status, ReportStatus::Unknown);
    assert!(report.attack.is_none());
}

#[test]
fn test_unknown_reason_is_populated() {
    let report = handle(&CheckRequest {
        pattern: r"(a)\1+".into(),
        flags: vec![],
        config: None,
    });
    assert_eq!(report.status, ReportStatus::Unknown);
    assert!(report.reason.is_some());
}

#[test]
fn test_response_round_trips() {
    for pattern in ["^(a+)+$", "abc", "(("] {
        let report = handle(&CheckRequest {
            pattern: pattern.into(),
            flags: vec![],
            config: None,
        });
        let json = serde_json::to_string(&report).unwrap();
        let back: CheckReport = serde_json::from_str(&json).unwrap();
        assert_eq!(report.status, back.status);
        assert_eq!(report.attack, back.attack);
    }
}
