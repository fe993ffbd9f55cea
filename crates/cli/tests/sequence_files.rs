//! Integration tests for loading, checking and converting sequence files.

use std::path::PathBuf;

use assert_matches::assert_matches;
use serde_json::json;

use imgflow_cli::commands::{check, convert, load_sequence};
use imgflow_cli::error::CliError;

fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests/fixtures")
        .join(name)
}

// ---------------------------------------------------------------------------
// Test: a complete pipeline
// ---------------------------------------------------------------------------

#[test]
fn filter_pipeline_is_valid() {
    let sequence = load_sequence(&fixture("filter_pipeline.json")).unwrap();

    let report = check(&sequence);

    assert!(report.is_valid(), "unexpected errors: {:?}", report.errors);
    assert!(report.violations.is_empty());
}

#[test]
fn filter_pipeline_converts_with_derived_connections() {
    let sequence = load_sequence(&fixture("filter_pipeline.json")).unwrap();

    let document: serde_json::Value = serde_json::from_str(&convert(&sequence).unwrap()).unwrap();

    assert_eq!(document["nodes"]["1"]["widgets_values"], json!(["portrait.jpg", "image"]));
    assert_eq!(document["nodes"]["2"]["widgets_values"], json!([15, -10]));
    assert_eq!(document["nodes"]["3"]["type"], "PreviewImage");
    assert_eq!(
        document["connections"],
        json!({ "1": { "2": [0] }, "2": { "3": [0] } })
    );
}

// ---------------------------------------------------------------------------
// Test: a mis-ordered pipeline
// ---------------------------------------------------------------------------

#[test]
fn preview_first_reports_ordering() {
    let sequence = load_sequence(&fixture("preview_first.json")).unwrap();

    let report = check(&sequence);

    assert_eq!(
        report.errors,
        vec!["Preview must come after Image Repair".to_string()]
    );
    // The missing upload image is a field warning, not a sequence error.
    assert_eq!(report.violations.len(), 1);
    assert_eq!(report.violations[0].node_id, 11);
}

#[test]
fn explicit_connections_are_kept() {
    let sequence = load_sequence(&fixture("preview_first.json")).unwrap();

    let document: serde_json::Value = serde_json::from_str(&convert(&sequence).unwrap()).unwrap();

    assert_eq!(
        document["connections"],
        json!({ "11": { "12": [0] }, "12": { "10": [0] } })
    );
}

// ---------------------------------------------------------------------------
// Test: unreadable input
// ---------------------------------------------------------------------------

#[test]
fn missing_file_reports_path() {
    let err = load_sequence(&fixture("nope.json")).unwrap_err();

    assert!(err.to_string().contains("nope.json"));
    assert_matches!(err, CliError::Read { .. });
}
