//! End-to-end checks of the `git-wrapper` binary.

use std::fs;
use std::path::Path;
use std::process::{Command, Output};

use tempfile::TempDir;

fn git_available() -> bool {
    Command::new("git")
        .arg("--version")
        .output()
        .map(|o| o.status.success())
        .unwrap_or(false)
}

/// Run the binary with an isolated config home and colors off.
fn run(home: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_git-wrapper"))
        .args(args)
        .env("XDG_CONFIG_HOME", home.join("xdg"))
        .env("HOME", home)
        .env("NO_COLOR", "1")
        .env_remove("RUST_LOG")
        .output()
        .unwrap()
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

// =============================================================================
// Settings loading
// =============================================================================

#[test]
fn test_parsers_ignore_broken_settings() {
    let temp = TempDir::new().unwrap();
    let config = temp.path().join("config.toml");
    fs::write(&config, "global_args = 3").unwrap();
    let config = config.to_str().unwrap();

    let output = run(temp.path(), &["--config", config, "parse-args", "--json", "--", "--bare", "status"]);
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    assert!(stdout(&output).contains("\"bare\""));

    let output = run(temp.path(), &["--config", config, "parse-url", "--format", "https", "git@github.com:openacid/slim"]);
    assert!(output.status.success());
    assert_eq!(stdout(&output).trim(), "https://github.com/openacid/slim.git");

    let output = run(temp.path(), &["--config", config, "refs"]);
    assert!(!output.status.success());
}

#[test]
fn test_config_init_shows_new_settings() {
    let temp = TempDir::new().unwrap();
    let config = temp.path().join("conf").join("config.toml");
    let config = config.to_str().unwrap();

    let output = run(temp.path(), &["--config", config, "config", "--init"]);
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));

    let text = stdout(&output);
    assert!(text.contains("Created"));
    assert!(text.contains("log_file"));
    assert!(!text.contains("not found"));
    assert!(Path::new(config).exists());
}

// =============================================================================
// Command log
// =============================================================================

#[test]
fn test_repository_commands_are_logged() {
    if !git_available() {
        eprintln!("Skipping: git not installed");
        return;
    }

    let temp = TempDir::new().unwrap();
    let repo = temp.path().join("repo");
    fs::create_dir(&repo).unwrap();
    let init = Command::new("git").args(["init", "-q"]).current_dir(&repo).status().unwrap();
    assert!(init.success());

    let log_file = temp.path().join("commands.log");
    let config = temp.path().join("config.toml");
    fs::write(&config, format!("log_file = {:?}\n", log_file.to_str().unwrap())).unwrap();
    let config = config.to_str().unwrap();
    let repo = repo.to_str().unwrap();

    assert!(run(temp.path(), &["--config", config, "refs", "-d", repo]).status.success());
    assert!(run(temp.path(), &["--config", config, "head", "-d", repo]).status.success());
    assert!(run(temp.path(), &["--config", config, "exec", "-d", repo, "--", "status", "-s"]).status.success());

    let log = fs::read_to_string(&log_file).unwrap();
    let lines: Vec<&str> = log.lines().collect();
    assert_eq!(lines.len(), 3, "{log}");
    assert!(lines[0].ends_with("git show-ref"));
    assert!(lines[1].ends_with("git symbolic-ref --short HEAD"));
    assert!(lines[2].ends_with("git status -s"));
}
