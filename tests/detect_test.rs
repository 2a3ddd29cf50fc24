//! Tests for duplicate-name mutation detection
//!
//! Covers:
//! - Endpoint gating by origin and path
//! - Body inspection for the DuplicateName question id
//! - Inconclusive outcomes on unparsable bodies

use disclaim_webdriver::capture::detect::{
    body_reports_duplicate_name, matches_event_endpoint, DUPLICATE_NAME_QUESTION_ID, EVENT_PATH,
    TARGET_ORIGIN,
};
use disclaim_webdriver::error::DisclaimError;
use url::Url;

#[test]
fn endpoint_constants_describe_the_target_site() {
    assert_eq!(TARGET_ORIGIN, "https://www.academia.edu");
    assert_eq!(EVENT_PATH, "/v0/arbitrary_event");
    assert_eq!(DUPLICATE_NAME_QUESTION_ID, "DuplicateName");
}

#[test]
fn foreign_origins_never_match() {
    for url in [
        "https://academia.edu/v0/arbitrary_event",
        "http://www.academia.edu/v0/arbitrary_event",
        "https://www.academia.edu.evil.example/v0/arbitrary_event",
        "https://example.com/v0/arbitrary_event",
    ] {
        let url = Url::parse(url).unwrap();
        assert!(!matches_event_endpoint(&url), "matched {}", url);
    }
}

#[test]
fn other_paths_on_the_target_origin_never_match() {
    for url in [
        "https://www.academia.edu/",
        "https://www.academia.edu/v0/arbitrary_event/extra",
        "https://www.academia.edu/v1/arbitrary_event",
    ] {
        let url = Url::parse(url).unwrap();
        assert!(!matches_event_endpoint(&url), "matched {}", url);
    }
}

#[test]
fn event_endpoint_matches_with_or_without_query() {
    let plain = Url::parse("https://www.academia.edu/v0/arbitrary_event").unwrap();
    assert!(matches_event_endpoint(&plain));

    let with_query = Url::parse("https://www.academia.edu/v0/arbitrary_event?a=1").unwrap();
    assert!(matches_event_endpoint(&with_query));
}

#[test]
fn duplicate_name_report_is_recognized() {
    let body = r#"{"data":{"question_id":"DuplicateName"}}"#;
    assert!(body_reports_duplicate_name(body).unwrap());
}

#[test]
fn other_question_ids_are_negative() {
    let body = r#"{"data":{"question_id":"Other"}}"#;
    assert!(!body_reports_duplicate_name(body).unwrap());
}

#[test]
fn missing_nesting_is_negative_not_inconclusive() {
    // Valid JSON that simply lacks the field is a conclusive "no".
    assert!(!body_reports_duplicate_name("{}").unwrap());
    assert!(!body_reports_duplicate_name(r#"{"data":{}}"#).unwrap());
    assert!(!body_reports_duplicate_name(r#"{"question_id":"DuplicateName"}"#).unwrap());
}

#[test]
fn unparsable_bodies_are_inconclusive() {
    for body in ["question_id=DuplicateName", "", "{\"data\":"] {
        let err = body_reports_duplicate_name(body).unwrap_err();
        assert!(
            matches!(err, DisclaimError::DetectionInconclusive(_)),
            "wrong error for {:?}",
            body
        );
    }
}
