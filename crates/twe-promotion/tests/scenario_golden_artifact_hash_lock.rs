//! Artifact hash-lock scenario tests: `lock_artifact_from_str` validates a
//! `manifest.json` + `audit.jsonl` pair before `AutoSelector::select` is
//! allowed to treat a run's artifacts as trustworthy.

use std::sync::atomic::{AtomicUsize, Ordering};

use twe_audit::AuditWriter;
use twe_promotion::{lock_artifact_from_str, ArtifactLock, LockError};
use uuid::Uuid;

static AUDIT_COUNTER: AtomicUsize = AtomicUsize::new(0);

fn valid_manifest_json() -> String {
    r#"{
        "schema_version": 1,
        "run_id": "00000000-0000-0000-0000-000000000001",
        "engine_id": "twe_backtest",
        "mode": "backtest",
        "git_hash": "abc123def456789abcdef",
        "config_hash": "sha256_abcdef1234567890abcdef1234567890",
        "host_fingerprint": "test_host",
        "created_at_utc": "2024-01-01T00:00:00Z",
        "artifacts": {
            "audit_jsonl": "audit.jsonl",
            "manifest_json": "manifest.json",
            "orders_csv": "orders.csv",
            "fills_csv": "fills.csv",
            "equity_curve_csv": "equity_curve.csv",
            "metrics_json": "metrics.json"
        }
    }"#
    .to_string()
}

fn make_valid_audit_jsonl(n: usize) -> String {
    assert!(n >= 1, "need at least 1 audit event");
    let seq = AUDIT_COUNTER.fetch_add(1, Ordering::SeqCst);
    let tmp = std::env::temp_dir().join(format!(
        "twe_promotion_test_audit_{}_{}_seq{}.jsonl",
        std::process::id(),
        n,
        seq,
    ));
    {
        let mut w = AuditWriter::new(&tmp, true).unwrap();
        let run_id = Uuid::from_u128(0x42);
        for i in 0..n {
            w.append(run_id, "test", "RUN_STEP", serde_json::json!({ "step": i }))
                .unwrap();
        }
    }
    let s = std::fs::read_to_string(&tmp).unwrap();
    let _ = std::fs::remove_file(&tmp);
    s
}

#[test]
fn valid_manifest_and_chain_produce_a_lock() {
    let audit = make_valid_audit_jsonl(2);
    let lock = lock_artifact_from_str(&valid_manifest_json(), &audit)
        .expect("valid manifest + valid audit must lock successfully");

    assert_eq!(lock.config_hash, "sha256_abcdef1234567890abcdef1234567890");
    assert_eq!(lock.git_hash, "abc123def456789abcdef");
    assert_eq!(lock.audit_lines_verified, 2);
}

#[test]
fn tampered_audit_chain_lock_fails() {
    let audit = make_valid_audit_jsonl(1);
    let original_hash_prefix = "hash_self\":\"";
    let pos = audit.find(original_hash_prefix).unwrap();
    let start = pos + original_hash_prefix.len();
    let mut bytes = audit.clone().into_bytes();
    bytes[start] ^= 1;
    let corrupted = String::from_utf8(bytes).unwrap();

    let result = lock_artifact_from_str(&valid_manifest_json(), &corrupted);
    assert!(
        matches!(result, Err(LockError::AuditChainBroken { .. })),
        "tampered audit must return AuditChainBroken, got: {result:?}"
    );
}

#[test]
fn empty_audit_log_lock_fails() {
    let result = lock_artifact_from_str(&valid_manifest_json(), "");
    assert_eq!(result, Err(LockError::AuditEmpty));
}

#[test]
fn whitespace_only_audit_log_is_empty() {
    let result = lock_artifact_from_str(&valid_manifest_json(), "   \n   \n");
    assert_eq!(result, Err(LockError::AuditEmpty));
}

#[test]
fn missing_config_hash_lock_fails() {
    let manifest = r#"{
        "schema_version": 1,
        "run_id": "00000000-0000-0000-0000-000000000002",
        "engine_id": "test",
        "mode": "backtest",
        "git_hash": "abc123",
        "config_hash": "",
        "host_fingerprint": "h",
        "created_at_utc": "2024-01-01T00:00:00Z",
        "artifacts": {
            "audit_jsonl": "audit.jsonl",
            "manifest_json": "manifest.json",
            "orders_csv": "orders.csv",
            "fills_csv": "fills.csv",
            "equity_curve_csv": "equity_curve.csv",
            "metrics_json": "metrics.json"
        }
    }"#;

    let audit = make_valid_audit_jsonl(1);
    let result = lock_artifact_from_str(manifest, &audit);
    assert_eq!(result, Err(LockError::MissingConfigHash));
}

#[test]
fn missing_git_hash_lock_fails() {
    let manifest = r#"{
        "schema_version": 1,
        "run_id": "00000000-0000-0000-0000-000000000003",
        "engine_id": "test",
        "mode": "backtest",
        "git_hash": "",
        "config_hash": "sha256_nonempty",
        "host_fingerprint": "h",
        "created_at_utc": "2024-01-01T00:00:00Z",
        "artifacts": {
            "audit_jsonl": "audit.jsonl",
            "manifest_json": "manifest.json",
            "orders_csv": "orders.csv",
            "fills_csv": "fills.csv",
            "equity_curve_csv": "equity_curve.csv",
            "metrics_json": "metrics.json"
        }
    }"#;

    let audit = make_valid_audit_jsonl(1);
    let result = lock_artifact_from_str(manifest, &audit);
    assert_eq!(result, Err(LockError::MissingGitHash));
}

#[test]
fn malformed_manifest_json_lock_fails() {
    let audit = make_valid_audit_jsonl(1);
    let result = lock_artifact_from_str("{ this is not valid json }", &audit);
    assert!(matches!(result, Err(LockError::ManifestParse(_))));
}

#[test]
fn new_for_testing_token_carries_the_hashes_given() {
    let lock = ArtifactLock::new_for_testing("test_cfg_hash", "test_git_hash");
    assert_eq!(lock.config_hash, "test_cfg_hash");
    assert_eq!(lock.git_hash, "test_git_hash");
    assert_eq!(lock.audit_lines_verified, 1);
}

#[test]
fn non_chained_audit_lock_succeeds() {
    let tmp = std::env::temp_dir().join(format!("twe_promotion_nonchain_{}.jsonl", std::process::id()));
    {
        let mut w = AuditWriter::new(&tmp, false).unwrap();
        w.append(Uuid::from_u128(0), "test", "RUN_START", serde_json::json!({}))
            .unwrap();
    }
    let audit = std::fs::read_to_string(&tmp).unwrap();
    let _ = std::fs::remove_file(&tmp);

    let result = lock_artifact_from_str(&valid_manifest_json(), &audit);
    assert!(result.is_ok(), "non-chained audit must lock successfully; got: {result:?}");
}
