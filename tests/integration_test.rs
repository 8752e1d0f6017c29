use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

/// 사용자 설정/환경 변수의 영향을 받지 않는 txpilot
fn txpilot(home: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("txpilot").unwrap();
    cmd.env("HOME", home.path())
        .env("NO_COLOR", "1")
        .env_remove("TXPILOT_DEMO_MODE")
        .env_remove("TXPILOT_AUDIT_LOG")
        .env_remove("TXPILOT_NETWORK")
        .env_remove("TXPILOT_BINARY")
        .env_remove("RUST_LOG");
    cmd
}

#[test]
fn test_cli_help() {
    let home = TempDir::new().unwrap();
    txpilot(&home)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Safe transaction driver"))
        .stdout(predicate::str::contains("Usage:"));
}

#[test]
fn test_cli_version() {
    let home = TempDir::new().unwrap();
    txpilot(&home).arg("--version").assert().success();
}

#[test]
fn test_missing_subcommand() {
    let home = TempDir::new().unwrap();
    txpilot(&home).assert().failure();
}

#[test]
fn test_explain_rate_limit() {
    let home = TempDir::new().unwrap();
    txpilot(&home)
        .args(["explain", "Custom error: 6 - RateLimitExceeded", "--exit-code", "1"])
        .assert()
        .success()
        .stderr(predicate::str::contains("rate limited"))
        .stderr(predicate::str::contains("Wait 2-5 minutes"));
}

#[test]
fn test_explain_json() {
    let home = TempDir::new().unwrap();
    txpilot(&home)
        .args(["--json", "explain", "Error: insufficient balance"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"category\": \"insufficient_balance\""));
}

#[test]
fn test_dry_run_never_spawns() {
    let home = TempDir::new().unwrap();
    // 존재하지 않는 바이너리여도 dry-run은 성공
    txpilot(&home)
        .env("TXPILOT_BINARY", "definitely-not-a-wallet-cli")
        .args(["--dry-run", "run", "wallet", "balance", "--wallet-name", "alice"])
        .assert()
        .success()
        .stderr(predicate::str::contains("[DRY RUN] Would execute:"))
        .stderr(predicate::str::contains("--wallet-name alice"));
}

#[test]
fn test_command_outside_allow_list() {
    let home = TempDir::new().unwrap();
    txpilot(&home)
        .args(["run", "wallet", "regen-coldkey"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Command not allowed: wallet regen-coldkey"));
}

#[test]
fn test_missing_binary_reports_install_hint() {
    let home = TempDir::new().unwrap();
    txpilot(&home)
        .env("TXPILOT_BINARY", "definitely-not-a-wallet-cli")
        .args(["run", "wallet", "list"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not found"));
}

#[test]
fn test_demo_stake() {
    let home = TempDir::new().unwrap();
    txpilot(&home)
        .args([
            "--demo",
            "--yes",
            "stake",
            "1.5",
            "5FHneW46xGXgs5mUiveU4sbTyGBzmstUspZC92UhjJM694ty",
            "--netuid",
            "1",
        ])
        .assert()
        .success()
        .stderr(predicate::str::contains("Stake Plan"))
        .stderr(predicate::str::contains("Demo mode - transaction simulated"));
}

#[test]
fn test_dry_run_transfer_json_plan() {
    let home = TempDir::new().unwrap();
    txpilot(&home)
        .args([
            "--dry-run",
            "--yes",
            "--json",
            "transfer",
            "50",
            "5DAAnrj7VHTznn2AWBemMuyBwZWs6FNFjdyVXUeYum3PTXFy",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"type\": \"plan\""))
        .stdout(predicate::str::contains("\"dry_run\": true"));
}

#[test]
fn test_rebalance_dry_run() {
    let home = TempDir::new().unwrap();
    txpilot(&home)
        .args(["--dry-run", "rebalance", "9", "-v", "5Aaa", "-v", "5Bbb", "-v", "5Ccc"])
        .assert()
        .success()
        .stderr(predicate::str::contains("Batch Operation Plan"))
        .stderr(predicate::str::contains("3.0000 τ"))
        .stderr(predicate::str::contains("Dry run - no transaction sent"));
}

#[test]
fn test_audit_log_written_with_redaction() {
    let home = TempDir::new().unwrap();
    txpilot(&home)
        .env("TXPILOT_BINARY", "echo")
        .args(["--audit-log", "run", "wallet", "list", "--password", "hunter2"])
        .assert()
        .success();

    let logs = home.path().join(".txpilot").join("logs");
    let entries: Vec<_> = std::fs::read_dir(&logs).unwrap().collect();
    assert_eq!(entries.len(), 1);

    let content = std::fs::read_to_string(entries[0].as_ref().unwrap().path()).unwrap();
    assert!(content.contains("=== txpilot audit log ==="));
    assert!(!content.contains("hunter2"));
}

#[test]
fn test_config_init_writes_defaults() {
    let home = TempDir::new().unwrap();
    txpilot(&home)
        .args(["config", "init"])
        .assert()
        .success()
        .stderr(predicate::str::contains("Config written to"));

    let path = home.path().join(".txpilot").join("config.toml");
    let content = std::fs::read_to_string(&path).unwrap();
    assert!(content.contains("network = \"finney\""));

    // 두 번째 init은 기존 파일을 보존
    std::fs::write(&path, "network = \"test\"\n").unwrap();
    txpilot(&home)
        .args(["config", "init"])
        .assert()
        .success()
        .stderr(predicate::str::contains("already exists"));
    assert_eq!(std::fs::read_to_string(&path).unwrap(), "network = \"test\"\n");

    txpilot(&home)
        .args(["config", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("network = \"test\""));
}

#[test]
fn test_infinite_chunk_delay_is_rejected() {
    let home = TempDir::new().unwrap();
    let dir = home.path().join(".txpilot");
    std::fs::create_dir_all(&dir).unwrap();
    std::fs::write(dir.join("config.toml"), "batch_chunk_delay_secs = inf\n").unwrap();

    txpilot(&home)
        .args(["explain", "oops"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("batch_chunk_delay_secs"));
}
