use std::path::Path;

use super::*;

#[test]
fn parses_minimal_monitor_with_default_interval() {
    let yaml = "monitors:\n  - term: acme\n    sources: [smallbusiness]\n";
    let file = parse_monitors(yaml).expect("valid yaml");
    assert_eq!(file.monitors.len(), 1);
    assert_eq!(file.monitors[0].interval_secs, 300);
    assert!(file.monitors[0].notify_target.is_none());
}

#[test]
fn empty_document_yields_no_monitors() {
    let file = parse_monitors("monitors: []\n").expect("valid yaml");
    assert!(file.monitors.is_empty());
}

#[test]
fn rejects_blank_term() {
    let yaml = "monitors:\n  - term: '  '\n    sources: [smallbusiness]\n";
    assert!(matches!(
        parse_monitors(yaml),
        Err(ConfigError::Validation(msg)) if msg.contains("non-empty")
    ));
}

#[test]
fn rejects_missing_sources() {
    let yaml = "monitors:\n  - term: acme\n    sources: []\n";
    assert!(matches!(
        parse_monitors(yaml),
        Err(ConfigError::Validation(msg)) if msg.contains("at least one source")
    ));
}

#[test]
fn rejects_invalid_source_name() {
    let yaml = "monitors:\n  - term: acme\n    sources: [r/smallbusiness]\n";
    assert!(matches!(
        parse_monitors(yaml),
        Err(ConfigError::Validation(msg)) if msg.contains("invalid source name")
    ));
}

#[test]
fn rejects_short_interval() {
    let yaml = "monitors:\n  - term: acme\n    sources: [startups]\n    interval_secs: 2\n";
    assert!(matches!(
        parse_monitors(yaml),
        Err(ConfigError::Validation(msg)) if msg.contains("minimum")
    ));
}

#[test]
fn rejects_duplicate_terms_case_insensitively() {
    let yaml = "monitors:\n  - term: Acme\n    sources: [startups]\n  - term: acme\n    sources: [business]\n";
    assert!(matches!(
        parse_monitors(yaml),
        Err(ConfigError::Validation(msg)) if msg.contains("duplicate")
    ));
}

#[test]
fn malformed_yaml_is_a_parse_error() {
    assert!(matches!(
        parse_monitors("monitors: [term"),
        Err(ConfigError::MonitorsFileParse(_))
    ));
}

#[test]
fn missing_file_is_an_io_error() {
    let result = load_monitors(Path::new("/nonexistent/monitors.yaml"));
    assert!(matches!(result, Err(ConfigError::MonitorsFileIo { .. })));
}

#[test]
fn load_monitors_from_real_file() {
    let path = Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("..")
        .join("..")
        .join("config")
        .join("monitors.yaml");
    let file = load_monitors(&path).expect("failed to load monitors.yaml");
    assert!(
        !file.monitors.is_empty(),
        "monitors.yaml should define at least one monitor"
    );
}
