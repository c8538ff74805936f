use assert_cmd::Command;

#[test]
fn help_lists_subcommands() {
    let output = Command::cargo_bin("bookshelf-cli")
        .unwrap()
        .arg("--help")
        .output()
        .unwrap();

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("serve"));
    assert!(stdout.contains("migrate"));
}

#[test]
fn migrate_runs_against_in_memory_database() {
    let output = Command::cargo_bin("bookshelf-cli")
        .unwrap()
        .args(["--config-dir", "/nonexistent/bookshelf", "migrate"])
        .env("BOOKSHELF__DATABASE__URL", "sqlite::memory:")
        .env_remove("BOOKSHELF_ENV")
        .output()
        .unwrap();

    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("applied 1 migration(s)"));
}

#[test]
fn unknown_environment_is_rejected() {
    let output = Command::cargo_bin("bookshelf-cli")
        .unwrap()
        .args(["--env", "qa", "--config-dir", "/nonexistent/bookshelf", "migrate"])
        .output()
        .unwrap();

    assert!(!output.status.success());
}
