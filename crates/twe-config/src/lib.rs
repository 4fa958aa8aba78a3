//! twe-config
//!
//! Layered YAML configuration with deterministic canonical-JSON hashing,
//! plus the typed accessors for the "Configuration surface" table,
//! secret resolution ([`secrets`]) and the unused-key audit used at startup.
//!
//! # Layering
//! [`load_layered_yaml`] (or [`load_layered_yaml_from_strings`] for
//! filesystem-free tests) reads one or more YAML sources in order, deep-merges
//! them (later sources win), canonicalizes the result to JSON with sorted
//! object keys, and hashes the canonical bytes with SHA-256. The hash is
//! stable across key reordering and is what the daemon reports in
//! `/v1/status` so operators can tell two runs apart without diffing YAML.
//!
//! # Secret exclusion
//! Config YAML is only ever allowed to carry **names** of environment
//! variables, never secret values. [`load_layered_yaml_from_strings`] scans
//! every string leaf for values that look like a live secret (API-key
//! prefixes, PEM material) and rejects the whole load with
//! `CONFIG_SECRET_DETECTED` rather than silently hashing a leaked value into
//! `canonical_json`.

pub mod consumption;
pub mod secrets;
pub mod surface;

use anyhow::{bail, Context, Result};
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::fs;

pub use consumption::ConfigMode;

/// Load + merge YAML files in order, then canonicalize to JSON and hash.
/// Later files override earlier files via deep-merge.
pub fn load_layered_yaml(paths: &[&str]) -> Result<LoadedConfig> {
    let mut sources = Vec::with_capacity(paths.len());
    for p in paths {
        sources.push(fs::read_to_string(p).with_context(|| format!("read config: {p}"))?);
    }
    let refs: Vec<&str> = sources.iter().map(String::as_str).collect();
    load_layered_yaml_from_strings(&refs)
}

/// Same as [`load_layered_yaml`] but takes raw YAML text directly, so tests
/// never need to touch the filesystem.
pub fn load_layered_yaml_from_strings(sources: &[&str]) -> Result<LoadedConfig> {
    let mut merged = Value::Object(Default::default());

    for s in sources {
        let yaml_val: serde_yaml::Value =
            serde_yaml::from_str(s).context("parse yaml source")?;
        let json_val = serde_json::to_value(yaml_val).context("yaml->json conversion failed")?;
        deep_merge(&mut merged, json_val);
    }

    detect_literal_secrets(&merged, "")?;

    let canonical = canonicalize_json(&merged);

    let mut hasher = Sha256::new();
    hasher.update(canonical.as_bytes());
    let hash = hex::encode(hasher.finalize());

    Ok(LoadedConfig {
        config_json: serde_json::from_str(&canonical).context("canonical json parse failed")?,
        canonical_json: canonical,
        config_hash: hash,
    })
}

#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub config_json: Value,
    pub canonical_json: String,
    pub config_hash: String,
}

/// Deep-merge: objects merge recursively; arrays replaced; scalars overwritten.
fn deep_merge(dst: &mut Value, src: Value) {
    match (dst, src) {
        (Value::Object(dst_map), Value::Object(src_map)) => {
            for (k, v) in src_map {
                match dst_map.get_mut(&k) {
                    Some(existing) => deep_merge(existing, v),
                    None => {
                        dst_map.insert(k, v);
                    }
                }
            }
        }
        (dst_slot, src_val) => {
            *dst_slot = src_val;
        }
    }
}

/// Canonicalize JSON by sorting all object keys recursively and emitting compact JSON.
fn canonicalize_json(v: &Value) -> String {
    let sorted = sort_keys(v);
    serde_json::to_string(&sorted).expect("json serialization must not fail")
}

fn sort_keys(v: &Value) -> Value {
    match v {
        Value::Object(map) => {
            let mut keys: Vec<_> = map.keys().cloned().collect();
            keys.sort();
            let mut new = serde_json::Map::new();
            for k in keys {
                new.insert(k.clone(), sort_keys(&map[&k]));
            }
            Value::Object(new)
        }
        Value::Array(arr) => Value::Array(arr.iter().map(sort_keys).collect()),
        _ => v.clone(),
    }
}

/// Prefixes and markers that indicate a literal secret value rather than an
/// env var name. Env var names are `SCREAMING_SNAKE_CASE` identifiers; none
/// of these patterns can occur in one.
fn looks_like_secret(s: &str) -> bool {
    const PREFIXES: &[&str] = &["sk-", "AKIA", "ghp_", "xox"];
    const MARKERS: &[&str] = &["BEGIN RSA PRIVATE KEY", "BEGIN PRIVATE KEY", "BEGIN OPENSSH PRIVATE KEY"];

    PREFIXES.iter().any(|p| s.starts_with(p)) || MARKERS.iter().any(|m| s.contains(m))
}

fn detect_literal_secrets(v: &Value, pointer: &str) -> Result<()> {
    match v {
        Value::Object(map) => {
            for (k, val) in map {
                detect_literal_secrets(val, &format!("{pointer}/{k}"))?;
            }
        }
        Value::Array(arr) => {
            for (i, val) in arr.iter().enumerate() {
                detect_literal_secrets(val, &format!("{pointer}/{i}"))?;
            }
        }
        Value::String(s) => {
            if looks_like_secret(s) {
                bail!("CONFIG_SECRET_DETECTED: literal secret-shaped value at '{pointer}' — config must store env var NAMES only");
            }
        }
        _ => {}
    }
    Ok(())
}

/// Report of which leaf pointers in a loaded config a given [`ConfigMode`]
/// does not claim to consume.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnusedKeyReport {
    pub mode: ConfigMode,
    pub unused_leaf_pointers: Vec<String>,
}

impl UnusedKeyReport {
    pub fn is_clean(&self) -> bool {
        self.unused_leaf_pointers.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnusedKeyPolicy {
    Warn,
    Fail,
}

fn collect_leaf_pointers(v: &Value, pointer: &str, out: &mut Vec<String>) {
    match v {
        Value::Object(map) => {
            for (k, val) in map {
                collect_leaf_pointers(val, &format!("{pointer}/{k}"), out);
            }
        }
        _ => out.push(pointer.to_string()),
    }
}

fn is_consumed(pointer: &str, consumed: &[&str]) -> bool {
    consumed
        .iter()
        .any(|root| pointer == *root || pointer.starts_with(&format!("{root}/")))
}

/// Walk every leaf of `config_json` and flag pointers that `mode` does not
/// declare in [`consumption::consumed_pointers`]. Under [`UnusedKeyPolicy::Fail`]
/// a non-empty result is an error named `CONFIG_UNUSED_KEYS`; under
/// [`UnusedKeyPolicy::Warn`] it is returned for the caller to log.
pub fn report_unused_keys(
    mode: ConfigMode,
    config_json: &Value,
    policy: UnusedKeyPolicy,
) -> Result<UnusedKeyReport> {
    let consumed = consumption::consumed_pointers(mode);

    let mut leaves = Vec::new();
    collect_leaf_pointers(config_json, "", &mut leaves);

    let mut unused: Vec<String> = leaves
        .into_iter()
        .filter(|p| !is_consumed(p, consumed))
        .collect();
    unused.sort();

    let report = UnusedKeyReport {
        mode,
        unused_leaf_pointers: unused,
    };

    if policy == UnusedKeyPolicy::Fail && !report.is_clean() {
        bail!(
            "CONFIG_UNUSED_KEYS: mode={:?} has {} unused config key(s): {:?}",
            report.mode,
            report.unused_leaf_pointers.len(),
            report.unused_leaf_pointers,
        );
    }

    Ok(report)
}
