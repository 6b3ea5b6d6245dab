//! Repository handle tests against a real `git` binary.
//!
//! Every test runs in its own temporary repository and is skipped when git
//! is not installed.

use std::fs;
use std::path::Path;
use std::process::Command;

use git_wrapper::{ExecutionError, Git, GitError, ParsedOptions, ResetMode};
use tempfile::TempDir;

fn git_available() -> bool {
    Command::new("git")
        .arg("--version")
        .output()
        .map(|o| o.status.success())
        .unwrap_or(false)
}

/// Fresh repository on `master` with a fixed identity.
fn init_repo() -> Option<(TempDir, Git)> {
    if !git_available() {
        eprintln!("Skipping: git not installed");
        return None;
    }

    let temp = TempDir::new().unwrap();
    let options = ParsedOptions::parse([
        "-c",
        "user.name=Test",
        "-c",
        "user.email=test@example.com",
        "-c",
        "init.defaultBranch=master",
        "-c",
        "commit.gpgsign=false",
    ])
    .unwrap();
    let git = Git::new(options).with_cwd(temp.path());

    let output = git.run(&["init", "-q"]).unwrap();
    assert!(output.success(), "git init failed: {}", output.stderr);

    Some((temp, git))
}

fn commit_file(git: &Git, dir: &Path, name: &str, content: &str, message: &str) -> String {
    fs::write(dir.join(name), content).unwrap();
    git.add(&[name], false).unwrap();
    git.commit(message).unwrap()
}

// =============================================================================
// Commits and HEAD
// =============================================================================

#[test]
fn test_commit_and_resolve() {
    let Some((temp, git)) = init_repo() else { return };

    let hash = commit_file(&git, temp.path(), "a.txt", "hello\n", "initial");

    assert_eq!(hash.len(), 40);
    assert_eq!(git.rev_of("HEAD").unwrap().as_deref(), Some(hash.as_str()));
    assert_eq!(git.rev_of("master").unwrap().as_deref(), Some(hash.as_str()));
    assert_eq!(git.rev_of("no-such-branch").unwrap(), None);
    assert_eq!(git.head_branch().unwrap().as_deref(), Some("master"));
    assert_eq!(git.obj_type(&hash).unwrap(), "commit");
}

#[test]
fn test_detached_head_has_no_branch() {
    let Some((temp, git)) = init_repo() else { return };
    commit_file(&git, temp.path(), "a.txt", "hello\n", "initial");

    let output = git.run(&["checkout", "-q", "--detach"]).unwrap();
    assert!(output.success());

    assert_eq!(git.head_branch().unwrap(), None);
}

#[test]
fn test_worktree_is_clean() {
    let Some((temp, git)) = init_repo() else { return };
    commit_file(&git, temp.path(), "a.txt", "hello\n", "initial");

    assert!(git.worktree_is_clean().unwrap());

    fs::write(temp.path().join("a.txt"), "changed\n").unwrap();
    assert!(!git.worktree_is_clean().unwrap());

    git.add(&[], true).unwrap();
    assert!(!git.worktree_is_clean().unwrap());
}

#[test]
fn test_add_requires_files_or_update() {
    let err = Git::default().add(&[], false).unwrap_err();
    assert!(matches!(err, GitError::Usage(_)));
}

#[test]
fn test_reset_soft_keeps_changes_staged() {
    let Some((temp, git)) = init_repo() else { return };
    let first = commit_file(&git, temp.path(), "a.txt", "one\n", "first");
    let second = commit_file(&git, temp.path(), "a.txt", "two\n", "second");
    assert_ne!(first, second);

    git.reset_to_commit(ResetMode::Soft, Some(&first)).unwrap();

    assert_eq!(git.rev_of("HEAD").unwrap().as_deref(), Some(first.as_str()));
    assert!(!git.worktree_is_clean().unwrap());
    assert_eq!(fs::read_to_string(temp.path().join("a.txt")).unwrap(), "two\n");

    git.reset_to_commit(ResetMode::Hard, None).unwrap();
    assert!(git.worktree_is_clean().unwrap());
    assert_eq!(fs::read_to_string(temp.path().join("a.txt")).unwrap(), "one\n");
}

// =============================================================================
// Branches, refs and remotes
// =============================================================================

#[test]
fn test_refs_of_empty_repository() {
    let Some((_temp, git)) = init_repo() else { return };

    assert!(git.ref_list().unwrap().is_empty());
    assert!(git.branch_list().unwrap().is_empty());
}

#[test]
fn test_branch_set_and_list() {
    let Some((temp, git)) = init_repo() else { return };
    let hash = commit_file(&git, temp.path(), "a.txt", "hello\n", "initial");

    git.branch_set("feature", &hash).unwrap();

    assert_eq!(git.branch_list().unwrap(), vec!["feature", "master"]);

    let refs = git.ref_list().unwrap();
    assert_eq!(refs.get("refs/heads/master"), Some(&hash));
    assert_eq!(refs.get("refs/heads/feature"), Some(&hash));
}

#[test]
fn test_checkout_missing_branch_fails() {
    let Some((temp, git)) = init_repo() else { return };
    commit_file(&git, temp.path(), "a.txt", "hello\n", "initial");

    let err = git.checkout("does-not-exist").unwrap_err();
    match err {
        GitError::Command { command, code, .. } => {
            assert!(command.contains("checkout does-not-exist"));
            assert_ne!(code, 0);
        }
        other => panic!("expected a command failure, got {other:?}"),
    }
}

#[test]
fn test_remote_add_and_get() {
    let Some((_temp, git)) = init_repo() else { return };

    assert_eq!(git.remote_get("origin").unwrap(), None);

    git.remote_add("origin", "git@github.com:openacid/slim.git").unwrap();

    assert_eq!(
        git.remote_get("origin").unwrap().as_deref(),
        Some("git@github.com:openacid/slim.git")
    );
    assert!(git.remote_add("origin", "https://example.com/x.git").is_err());
}

#[test]
fn test_branch_tracking_config() {
    let Some((temp, git)) = init_repo() else { return };
    commit_file(&git, temp.path(), "a.txt", "hello\n", "initial");

    assert_eq!(git.branch_default_remote("master").unwrap(), None);
    assert_eq!(git.branch_default_upstream("master").unwrap(), None);

    let output = git.run(&["config", "branch.master.remote", "origin"]).unwrap();
    assert!(output.success());
    assert_eq!(git.branch_default_remote("master").unwrap().as_deref(), Some("origin"));

    let err = git.branch_divergency("master", None).unwrap_err();
    assert!(matches!(err, GitError::Usage(_)));
}

#[test]
fn test_branch_divergency() {
    let Some((temp, git)) = init_repo() else { return };
    let base = commit_file(&git, temp.path(), "a.txt", "base\n", "base");

    let output = git.run(&["checkout", "-q", "-b", "feature"]).unwrap();
    assert!(output.success());
    let ours = commit_file(&git, temp.path(), "b.txt", "feature\n", "feature work");

    git.checkout("master").unwrap();
    let theirs = commit_file(&git, temp.path(), "c.txt", "master\n", "master work");

    assert_eq!(
        git.branch_common_base("feature", "master").unwrap().as_deref(),
        Some(base.as_str())
    );

    let div = git.branch_divergency("feature", Some("master")).unwrap();
    assert_eq!(div.base, base);
    assert_eq!(div.branch_commits, vec![ours]);
    assert_eq!(div.upstream_commits, vec![theirs]);
}

// =============================================================================
// Objects and trees
// =============================================================================

#[test]
fn test_blob_and_nested_tree() {
    let Some((temp, git)) = init_repo() else { return };
    let head = commit_file(&git, temp.path(), "a.txt", "hello\n", "initial");

    fs::write(temp.path().join("b.txt"), "nested\n").unwrap();
    let blob = git.blob_new("b.txt").unwrap();
    assert_eq!(git.obj_type(&blob).unwrap(), "blob");

    let tree = git.tree_of("HEAD").unwrap().unwrap();
    assert_eq!(git.obj_type(&tree).unwrap(), "tree");
    assert_eq!(git.tree_items(&tree, true, false).unwrap(), vec!["a.txt"]);

    let new_tree = git.tree_add_obj(&tree, "dir/sub/b.txt", &blob).unwrap();

    let listing = git
        .run(&["ls-tree", "-r", "--name-only", &new_tree])
        .unwrap()
        .lines();
    assert_eq!(listing, vec!["a.txt", "dir/sub/b.txt"]);

    let dir = git.tree_find_item(&new_tree, Some("dir"), Some("tree")).unwrap().unwrap();
    assert!(dir.is_tree());
    assert_eq!(dir.mode, "040000");
    assert_eq!(git.tree_find_item(&new_tree, Some("dir"), Some("blob")).unwrap(), None);

    // adding next to an existing subtree keeps its entries
    let again = git.tree_add_obj(&new_tree, "dir/c.txt", &blob).unwrap();
    let listing = git.run(&["ls-tree", "-r", "--name-only", &again]).unwrap().lines();
    assert_eq!(listing, vec!["a.txt", "dir/c.txt", "dir/sub/b.txt"]);

    let commit = git.tree_commit(&new_tree, "add nested blob", &[head.as_str()]).unwrap();
    assert_eq!(git.obj_type(&commit).unwrap(), "commit");
    assert_eq!(git.tree_of(&commit).unwrap().as_deref(), Some(new_tree.as_str()));

    let message = git.run(&["log", "-1", "--format=%s", &commit]).unwrap();
    assert_eq!(message.first_line(), Some("add nested blob"));
}

#[test]
fn test_empty_tree() {
    let Some((_temp, git)) = init_repo() else { return };

    let tree = git.tree_new(&[]).unwrap();
    assert_eq!(tree, "4b825dc642cb6eb9a060e54bf8d69288fbee4904");
}

#[test]
fn test_tree_replace_item() {
    let Some((temp, git)) = init_repo() else { return };
    commit_file(&git, temp.path(), "a.txt", "hello\n", "initial");
    commit_file(&git, temp.path(), "b.txt", "world\n", "second");

    let tree = git.tree_of("HEAD").unwrap().unwrap();
    let items = git.tree_items(&tree, false, false).unwrap();

    let without_a = git.treeitems_replace_item(&items, "a.txt", None, None).unwrap();
    assert_eq!(without_a.len(), 1);
    assert!(without_a[0].ends_with("\tb.txt"));

    let blob = git.tree_find_item(&tree, Some("b.txt"), None).unwrap().unwrap().object;
    let swapped = git
        .tree_new_replace(&items, "a.txt", &blob, Some("100755"))
        .unwrap();
    let a = git.tree_find_item(&swapped, Some("a.txt"), None).unwrap().unwrap();
    assert_eq!(a.object, blob);
    assert_eq!(a.mode, "100755");
}

// =============================================================================
// Handle configuration
// =============================================================================

#[test]
fn test_git_dir_and_work_tree_from_elsewhere() {
    let Some((temp, git)) = init_repo() else { return };
    commit_file(&git, temp.path(), "a.txt", "hello\n", "initial");

    let elsewhere = TempDir::new().unwrap();
    let remote = Git::default()
        .with_cwd(elsewhere.path())
        .with_git_dir(temp.path().join(".git"))
        .with_work_tree(temp.path());

    let git_dir = temp.path().join(".git");
    assert_eq!(remote.options().git_dir(), git_dir.to_str());
    assert_eq!(remote.head_branch().unwrap().as_deref(), Some("master"));
    assert!(remote.worktree_is_clean().unwrap());
}

#[test]
fn test_missing_program() {
    let git = Git::default().with_program("/nonexistent/bin/git-wrapper-test-git");

    let err = git.run(&["status"]).unwrap_err();
    assert!(matches!(
        err,
        GitError::Execution(ExecutionError::NotFound { .. })
    ));
}

#[test]
fn test_non_zero_exit_is_a_result() {
    let Some((_temp, git)) = init_repo() else { return };

    let output = git.run(&["rev-parse", "--verify", "--quiet", "missing"]).unwrap();
    assert!(!output.success());
    assert_eq!(output.code, 1);
}

#[test]
fn test_out_with_context() {
    let git = Git::default().with_context("sync");
    let mut buf = Vec::new();
    git.out(&mut buf, &["fetched", "origin"]).unwrap();
    assert_eq!(String::from_utf8(buf).unwrap(), "sync: fetched origin\n");
}
