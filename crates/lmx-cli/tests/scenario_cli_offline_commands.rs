//! CLI commands that need no directory server: config hashing, offline diff,
//! and config rejection before any connection is attempted.

use std::fs;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::tempdir;

#[allow(deprecated)]
fn lmx() -> Command {
    let mut cmd = Command::cargo_bin("lmx").expect("lmx binary");
    cmd.env("RUST_LOG", "warn");
    cmd
}

#[test]
fn config_hash_is_independent_of_key_order() {
    let dir = tempdir().unwrap();
    let a = dir.path().join("a.yaml");
    let b = dir.path().join("b.yaml");
    fs::write(&a, "directory:\n  page_size: 100\n  filter: \"(cn=*)\"\n").unwrap();
    fs::write(&b, "directory:\n  filter: \"(cn=*)\"\n  page_size: 100\n").unwrap();

    let out_a = lmx().arg("config-hash").arg(&a).output().unwrap();
    let out_b = lmx().arg("config-hash").arg(&b).output().unwrap();
    assert!(out_a.status.success());

    let first_line = |o: &std::process::Output| {
        String::from_utf8_lossy(&o.stdout)
            .lines()
            .next()
            .unwrap_or_default()
            .to_string()
    };
    let line = first_line(&out_a);
    assert!(line.starts_with("config_hash="));
    assert_eq!(line.len(), "config_hash=".len() + 64);
    assert_eq!(line, first_line(&out_b));
}

#[test]
fn diff_prints_summary_and_ids() {
    let dir = tempdir().unwrap();
    let prev = dir.path().join("prev.json");
    let cur = dir.path().join("cur.json");
    fs::write(
        &prev,
        r#"[{"employeeID":["1"],"displayName":["A"]},{"employeeID":["2"],"displayName":["B"]}]"#,
    )
    .unwrap();
    fs::write(
        &cur,
        r#"[{"employeeID":["1"],"displayName":["A"]},{"employeeID":["3"],"displayName":["C"]}]"#,
    )
    .unwrap();

    lmx()
        .args(["diff", "--current"])
        .arg(&cur)
        .arg("--previous")
        .arg(&prev)
        .assert()
        .success()
        .stdout(predicate::str::contains("added=1 changed=0 removed=1"))
        .stdout(predicate::str::contains("added 3\nremoved 2"))
        .stdout(predicate::str::contains(" 1\n").not());
}

#[test]
fn diff_with_missing_previous_fails() {
    let dir = tempdir().unwrap();
    let cur = dir.path().join("cur.json");
    fs::write(&cur, "[]").unwrap();

    lmx()
        .args(["diff", "--current"])
        .arg(&cur)
        .arg("--previous")
        .arg(dir.path().join("missing.json"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("--previous"));
}

#[test]
fn sync_refuses_inline_bind_password() {
    let dir = tempdir().unwrap();
    let cfg = dir.path().join("sync.yaml");
    fs::write(
        &cfg,
        "directory:\n  url: ldap://127.0.0.1:1\n  bind_dn: cn=svc\n  bind_password: hunter2hunter2\n",
    )
    .unwrap();

    lmx()
        .args(["sync", "--config"])
        .arg(&cfg)
        .assert()
        .failure()
        .stderr(predicate::str::contains("CONFIG_SECRET_DETECTED"))
        .stderr(predicate::str::contains("hunter2").not());
}

#[test]
fn strict_sync_rejects_unused_keys() {
    let dir = tempdir().unwrap();
    let cfg = dir.path().join("sync.yaml");
    fs::write(&cfg, "directory:\n  url: ldap://127.0.0.1:1\nlegacy:\n  upload_url: x\n").unwrap();

    lmx()
        .args(["sync", "--strict", "--config"])
        .arg(&cfg)
        .assert()
        .failure()
        .stderr(predicate::str::contains("CONFIG_UNUSED_KEYS"));
}
