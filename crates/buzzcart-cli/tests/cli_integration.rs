//! CLI Integration Tests
//!
//! These tests run the `buzzcart` binary end-to-end against a temporary
//! data directory.

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

// ============================================================================
// Test Utilities
// ============================================================================

/// Create a CLI command with a temporary data directory
fn cli_cmd(data_dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("buzzcart").expect("Failed to find buzzcart binary");
    cmd.arg("--data-dir").arg(data_dir.path());
    cmd
}

/// Extract the user ID from CLI output (assumes format: "  ID: <base58>")
fn extract_user_id(output: &str) -> Option<String> {
    output
        .lines()
        .find_map(|line| line.trim_start().strip_prefix("ID: "))
        .map(|id| id.trim().to_string())
}

/// Sign up an account and return its ID. Leaves it signed in.
fn signup(data_dir: &TempDir, name: &str, email: &str) -> String {
    let output = cli_cmd(data_dir)
        .args(["signup", name, email, "secret1"])
        .output()
        .unwrap();
    assert!(output.status.success(), "signup failed: {:?}", output);
    extract_user_id(&String::from_utf8_lossy(&output.stdout)).expect("signup prints an ID")
}

fn login(data_dir: &TempDir, email: &str) {
    cli_cmd(data_dir)
        .args(["login", email, "secret1"])
        .assert()
        .success();
}

// ============================================================================
// Account Tests
// ============================================================================

#[test]
fn test_signup_and_whoami() {
    let data_dir = TempDir::new().unwrap();
    let id = signup(&data_dir, "Alice Smith", "alice@example.com");

    cli_cmd(&data_dir)
        .arg("whoami")
        .assert()
        .success()
        .stdout(predicate::str::contains("Alice Smith"))
        .stdout(predicate::str::contains(id))
        .stdout(predicate::str::contains("Followers: 0"));
}

#[test]
fn test_signup_rejects_mismatched_passwords() {
    let data_dir = TempDir::new().unwrap();

    cli_cmd(&data_dir)
        .args(["signup", "Alice", "alice@example.com", "secret1", "--confirm", "secret2"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Passwords do not match"));
}

#[test]
fn test_signup_rejects_short_password() {
    let data_dir = TempDir::new().unwrap();

    cli_cmd(&data_dir)
        .args(["signup", "Alice", "alice@example.com", "abc"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("at least 6 characters"));
}

#[test]
fn test_duplicate_email_fails() {
    let data_dir = TempDir::new().unwrap();
    signup(&data_dir, "Alice", "alice@example.com");

    cli_cmd(&data_dir)
        .args(["signup", "Other Alice", "alice@example.com", "secret1"])
        .assert()
        .failure();
}

#[test]
fn test_logout_then_whoami() {
    let data_dir = TempDir::new().unwrap();
    signup(&data_dir, "Alice", "alice@example.com");

    cli_cmd(&data_dir)
        .arg("logout")
        .assert()
        .success()
        .stdout(predicate::str::contains("Signed out."));

    cli_cmd(&data_dir)
        .arg("whoami")
        .assert()
        .success()
        .stdout(predicate::str::contains("Not signed in."));
}

#[test]
fn test_login_wrong_password() {
    let data_dir = TempDir::new().unwrap();
    signup(&data_dir, "Alice", "alice@example.com");

    cli_cmd(&data_dir)
        .args(["login", "alice@example.com", "wrong-password"])
        .assert()
        .failure();
}

#[test]
fn test_commands_require_login() {
    let data_dir = TempDir::new().unwrap();

    cli_cmd(&data_dir)
        .args(["search", "al"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Not signed in"));
}

// ============================================================================
// Search Tests
// ============================================================================

#[test]
fn test_search_ranks_prefix_matches() {
    let data_dir = TempDir::new().unwrap();
    signup(&data_dir, "Alice", "alice@example.com");
    signup(&data_dir, "Albert", "albert@example.com");
    signup(&data_dir, "Carl", "carl@example.com");

    let output = cli_cmd(&data_dir).args(["search", "al"]).output().unwrap();
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(stdout.contains("Accounts - 2 results"));
    assert!(stdout.contains("Found 2 results matching \"al\""));
    let albert = stdout.find("Albert").unwrap();
    let alice = stdout.find("Alice").unwrap();
    assert!(albert < alice, "results are sorted by name");
    assert!(!stdout.contains("Carl"));
}

#[test]
fn test_search_short_query_prompts() {
    let data_dir = TempDir::new().unwrap();
    signup(&data_dir, "Alice", "alice@example.com");

    cli_cmd(&data_dir)
        .args(["search", "a"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Type at least 2 characters to search..."));
}

#[test]
fn test_search_no_results() {
    let data_dir = TempDir::new().unwrap();
    signup(&data_dir, "Alice", "alice@example.com");

    cli_cmd(&data_dir)
        .args(["search", "zz"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No accounts found for \"zz\""));
}

#[test]
fn test_search_unknown_filter() {
    let data_dir = TempDir::new().unwrap();
    signup(&data_dir, "Alice", "alice@example.com");

    cli_cmd(&data_dir)
        .args(["search", "al", "--filter", "pets"])
        .assert()
        .failure();
}

// ============================================================================
// Follow Tests
// ============================================================================

#[test]
fn test_follow_and_unfollow() {
    let data_dir = TempDir::new().unwrap();
    let alice = signup(&data_dir, "Alice", "alice@example.com");
    signup(&data_dir, "Bob", "bob@example.com");

    cli_cmd(&data_dir)
        .args(["follow", &alice])
        .assert()
        .success()
        .stdout(predicate::str::contains("Now following Alice"))
        .stdout(predicate::str::contains("0 followers, 1 following"));

    cli_cmd(&data_dir)
        .args(["follow", &alice])
        .assert()
        .success()
        .stdout(predicate::str::contains("Already following Alice"));

    cli_cmd(&data_dir)
        .args(["user", "show", &alice])
        .assert()
        .success()
        .stdout(predicate::str::contains("Followers: 1"))
        .stdout(predicate::str::contains("[Unfollow]"));

    cli_cmd(&data_dir)
        .args(["unfollow", &alice])
        .assert()
        .success()
        .stdout(predicate::str::contains("Unfollowed Alice"));

    login(&data_dir, "alice@example.com");
    cli_cmd(&data_dir)
        .arg("whoami")
        .assert()
        .success()
        .stdout(predicate::str::contains("Followers: 0"));
}

#[test]
fn test_user_show_marks_followers() {
    let data_dir = TempDir::new().unwrap();
    let alice = signup(&data_dir, "Alice", "alice@example.com");
    let bob = signup(&data_dir, "Bob", "bob@example.com");

    cli_cmd(&data_dir)
        .args(["user", "show", &alice])
        .assert()
        .success()
        .stdout(predicate::str::contains("Follows you").not());

    cli_cmd(&data_dir).args(["follow", &alice]).assert().success();

    login(&data_dir, "alice@example.com");
    cli_cmd(&data_dir)
        .args(["user", "show", &bob])
        .assert()
        .success()
        .stdout(predicate::str::contains("Follows you"))
        .stdout(predicate::str::contains("[Follow]"));
}

#[test]
fn test_cannot_follow_self() {
    let data_dir = TempDir::new().unwrap();
    let alice = signup(&data_dir, "Alice", "alice@example.com");

    cli_cmd(&data_dir)
        .args(["follow", &alice])
        .assert()
        .failure()
        .stderr(predicate::str::contains("cannot follow yourself"));
}

#[test]
fn test_unknown_user() {
    let data_dir = TempDir::new().unwrap();
    signup(&data_dir, "Alice", "alice@example.com");

    cli_cmd(&data_dir)
        .args(["user", "show", "ghost"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("User not found"));
}

// ============================================================================
// Log Tests
// ============================================================================

#[test]
fn test_logs_written_and_read_back() {
    let data_dir = TempDir::new().unwrap();
    let log_dir = data_dir.path().join("jsonl");

    cli_cmd(&data_dir)
        .arg("--log-dir")
        .arg(&log_dir)
        .args(["--device", "pixel", "signup", "Alice", "alice@example.com", "secret1"])
        .assert()
        .success();

    assert!(log_dir.join("pixel").is_dir());

    cli_cmd(&data_dir)
        .arg("--log-dir")
        .arg(&log_dir)
        .args(["logs", "--for-device", "pixel"])
        .assert()
        .success()
        .stdout(predicate::str::contains("[pixel]"))
        .stdout(predicate::str::contains("Registration successful"));
}

#[test]
fn test_logs_empty() {
    let data_dir = TempDir::new().unwrap();

    cli_cmd(&data_dir)
        .arg("logs")
        .assert()
        .success()
        .stdout(predicate::str::contains("No log entries."));
}
