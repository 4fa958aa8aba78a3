//! Config hash stability.
//!
//! Validates:
//! - `load_layered_yaml_from_strings` called twice on the same inputs returns
//!   an identical config_hash.
//! - Reordering keys within YAML doesn't change the hash (canonicalization).
//! - Different values produce different hashes.
//! - Multiple merge layers produce a stable hash.

use twe_config::load_layered_yaml_from_strings;

const BASE_YAML: &str = r#"
trading:
  window:
    start: "09:00"
    end: "13:30"
  risk:
    dailyLossLimit: 50000.0
    maxPosition: 0.25
auto_selection:
  minSharpe: 0.5
"#;

/// Same content as BASE_YAML but with keys in different order.
const BASE_YAML_REORDERED: &str = r#"
auto_selection:
  minSharpe: 0.5
trading:
  risk:
    maxPosition: 0.25
    dailyLossLimit: 50000.0
  window:
    end: "13:30"
    start: "09:00"
"#;

const OVERLAY_YAML: &str = r#"
trading:
  window:
    start: "09:05"
"#;

#[test]
fn same_input_produces_identical_hash() {
    let a = load_layered_yaml_from_strings(&[BASE_YAML]).unwrap();
    let b = load_layered_yaml_from_strings(&[BASE_YAML]).unwrap();

    assert_eq!(
        a.config_hash, b.config_hash,
        "same YAML input must produce identical hash"
    );
    assert_eq!(
        a.canonical_json, b.canonical_json,
        "canonical JSON must be identical for same input"
    );
}

#[test]
fn reordered_keys_produce_same_hash() {
    let original = load_layered_yaml_from_strings(&[BASE_YAML]).unwrap();
    let reordered = load_layered_yaml_from_strings(&[BASE_YAML_REORDERED]).unwrap();

    assert_eq!(
        original.config_hash, reordered.config_hash,
        "reordering keys in YAML must not change the hash (canonicalization)"
    );
    assert_eq!(original.canonical_json, reordered.canonical_json);
}

#[test]
fn different_values_produce_different_hash() {
    let a = load_layered_yaml_from_strings(&[BASE_YAML]).unwrap();

    let modified = r#"
trading:
  window:
    start: "09:00"
    end: "13:30"
  risk:
    dailyLossLimit: 80000.0
    maxPosition: 0.40
auto_selection:
  minSharpe: 1.0
"#;
    let b = load_layered_yaml_from_strings(&[modified]).unwrap();

    assert_ne!(
        a.config_hash, b.config_hash,
        "different config values must produce different hashes"
    );
}

#[test]
fn merged_layers_produce_stable_hash() {
    let a = load_layered_yaml_from_strings(&[BASE_YAML, OVERLAY_YAML]).unwrap();
    let b = load_layered_yaml_from_strings(&[BASE_YAML, OVERLAY_YAML]).unwrap();

    assert_eq!(
        a.config_hash, b.config_hash,
        "same merge layers must produce identical hash"
    );

    let start = a
        .config_json
        .pointer("/trading/window/start")
        .and_then(|v| v.as_str())
        .unwrap();
    assert_eq!(start, "09:05", "overlay should override base window.start");
}

#[test]
fn hash_is_64_hex_chars() {
    let loaded = load_layered_yaml_from_strings(&[BASE_YAML]).unwrap();

    assert_eq!(loaded.config_hash.len(), 64, "SHA-256 hash should be 64 hex chars");
    assert!(
        loaded.config_hash.chars().all(|c| c.is_ascii_hexdigit()),
        "hash should contain only hex digits"
    );
}

#[test]
fn empty_config_produces_stable_hash() {
    let a = load_layered_yaml_from_strings(&["{}"]).unwrap();
    let b = load_layered_yaml_from_strings(&["{}"]).unwrap();

    assert_eq!(a.config_hash, b.config_hash, "empty configs must produce identical hash");
}
