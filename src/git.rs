//! Repository handle driving the git CLI.
//!
//! [`Git`] prepends its global options to every call and hands the command
//! line to an [`Executor`]. The convenience methods are thin builders over
//! [`Git::run`] that interpret git's textual output.

use std::collections::BTreeMap;
use std::fmt;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Serialize;

use crate::error::{GitError, Result};
use crate::exec::{CommandOutput, Executor, ProcessExecutor};
use crate::options::ParsedOptions;
use crate::tree::{TreeItem, MODE_FILE, MODE_TREE};

/// `git reset` modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResetMode {
    Soft,
    Mixed,
    Hard,
    Merge,
    Keep,
}

impl ResetMode {
    pub fn as_flag(self) -> &'static str {
        match self {
            ResetMode::Soft => "--soft",
            ResetMode::Mixed => "--mixed",
            ResetMode::Hard => "--hard",
            ResetMode::Merge => "--merge",
            ResetMode::Keep => "--keep",
        }
    }
}

/// How far a branch and its upstream have moved apart since their merge base.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Divergency {
    pub base: String,
    /// Commits on the branch but not on upstream, newest first.
    pub branch_commits: Vec<String>,
    /// Commits on upstream but not on the branch, newest first.
    pub upstream_commits: Vec<String>,
}

/// Handle for running git with a fixed global context.
#[derive(Clone)]
pub struct Git {
    options: ParsedOptions,
    program: PathBuf,
    cwd: Option<PathBuf>,
    context: Option<String>,
    executor: Arc<dyn Executor>,
}

impl fmt::Debug for Git {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Git")
            .field("options", &self.options)
            .field("program", &self.program)
            .field("cwd", &self.cwd)
            .field("context", &self.context)
            .finish_non_exhaustive()
    }
}

impl Default for Git {
    fn default() -> Self {
        Git::new(ParsedOptions::default())
    }
}

impl Git {
    /// Any command tokens in `options` are dropped; only global flags are kept.
    pub fn new(options: ParsedOptions) -> Self {
        Git {
            options: options.with_command(Vec::<String>::new()),
            program: PathBuf::from("git"),
            cwd: None,
            context: None,
            executor: Arc::new(ProcessExecutor),
        }
    }

    /// Path of the git executable; defaults to `git` on `PATH`.
    pub fn with_program(mut self, program: impl Into<PathBuf>) -> Self {
        self.program = program.into();
        self
    }

    /// Directory the git process is started in.
    pub fn with_cwd(mut self, cwd: impl Into<PathBuf>) -> Self {
        self.cwd = Some(cwd.into());
        self
    }

    /// Override `--git-dir`, made absolute so `-C` does not affect it.
    pub fn with_git_dir(mut self, path: impl AsRef<Path>) -> Self {
        self.options.set_git_dir(absolute(path.as_ref()));
        self
    }

    /// Override `--work-tree`, made absolute so `-C` does not affect it.
    pub fn with_work_tree(mut self, path: impl AsRef<Path>) -> Self {
        self.options.set_work_tree(absolute(path.as_ref()));
        self
    }

    /// Prefix for [`Git::out`].
    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    pub fn with_executor(mut self, executor: Arc<dyn Executor>) -> Self {
        self.executor = executor;
        self
    }

    pub fn options(&self) -> &ParsedOptions {
        &self.options
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    pub fn cwd(&self) -> Option<&Path> {
        self.cwd.as_deref()
    }

    pub fn executor(&self) -> &Arc<dyn Executor> {
        &self.executor
    }

    // command line

    /// `[program] + global flags + args`
    pub fn command_line<S: AsRef<str>>(&self, args: &[S]) -> Vec<String> {
        let mut argv = Vec::with_capacity(1 + self.options.global_flags.len() * 2 + args.len());
        argv.push(self.program.to_string_lossy().into_owned());
        argv.extend(self.options.to_args());
        argv.extend(args.iter().map(|a| a.as_ref().to_string()));
        argv
    }

    /// Run git; a non-zero exit status is returned, not raised.
    pub fn run<S: AsRef<str>>(&self, args: &[S]) -> Result<CommandOutput> {
        self.exec(args, None)
    }

    /// Run git with `input` on stdin.
    pub fn run_with_input<S: AsRef<str>>(&self, args: &[S], input: &str) -> Result<CommandOutput> {
        self.exec(args, Some(input))
    }

    fn exec<S: AsRef<str>>(&self, args: &[S], stdin: Option<&str>) -> Result<CommandOutput> {
        let argv = self.command_line(args);
        log::debug!("Running: {}", argv.join(" "));

        let output = self.executor.execute(&argv, self.cwd.as_deref(), stdin)?;

        if !output.success() {
            log::debug!("'{}' exited with status {}", argv.join(" "), output.code);
        }
        Ok(output)
    }

    /// Run git and fail on a non-zero exit status.
    fn run_checked<S: AsRef<str>>(&self, args: &[S], stdin: Option<&str>) -> Result<CommandOutput> {
        let output = self.exec(args, stdin)?;
        if !output.success() {
            return Err(GitError::Command {
                command: self.command_line(args).join(" "),
                code: output.code,
                stderr: output.stderr.trim().to_string(),
            });
        }
        Ok(output)
    }

    /// First stdout line of a call that must succeed.
    fn output_line<S: AsRef<str>>(&self, args: &[S], stdin: Option<&str>) -> Result<String> {
        let output = self.run_checked(args, stdin)?;
        Ok(output.first_line().unwrap_or_default().to_string())
    }

    /// Stdout lines of a call that must succeed.
    fn output_lines<S: AsRef<str>>(&self, args: &[S]) -> Result<Vec<String>> {
        Ok(self.run_checked(args, None)?.lines())
    }

    /// First stdout line, or `None` when git exits non-zero.
    fn query<S: AsRef<str>>(&self, args: &[S]) -> Result<Option<String>> {
        let output = self.exec(args, None)?;
        if !output.success() {
            return Ok(None);
        }
        Ok(output.first_line().filter(|l| !l.is_empty()).map(str::to_string))
    }

    // high level

    pub fn checkout(&self, branch: &str) -> Result<()> {
        self.run_checked(&["checkout", branch], None)?;
        Ok(())
    }

    pub fn fetch(&self, remote: &str) -> Result<()> {
        self.run_checked(&["fetch", remote], None)?;
        Ok(())
    }

    /// `git add [-u] <files>`. At least one file is required unless `update`.
    pub fn add(&self, files: &[&str], update: bool) -> Result<()> {
        if files.is_empty() && !update {
            return Err(GitError::Usage(
                "must specify files to add or use update".to_string(),
            ));
        }

        let mut args = vec!["add"];
        if update {
            args.push("-u");
        }
        args.extend_from_slice(files);

        self.run_checked(&args, None)?;
        Ok(())
    }

    /// Commit the index and return the new commit hash.
    pub fn commit(&self, message: &str) -> Result<String> {
        self.run_checked(&["commit", "-m", message], None)?;
        self.output_line(&["rev-parse", "HEAD"], None)
    }

    /// Reset HEAD to `target`, `HEAD` when not given.
    pub fn reset_to_commit(&self, mode: ResetMode, target: Option<&str>) -> Result<()> {
        let target = target.unwrap_or("HEAD");
        self.run_checked(&["reset", mode.as_flag(), target], None)?;
        Ok(())
    }

    // worktree

    pub fn worktree_is_clean(&self) -> Result<bool> {
        // diff-index may report stale stat info as changes until the index
        // is refreshed; `status` refreshes it.
        self.run(&["status"])?;
        let output = self.run(&["diff-index", "--quiet", "HEAD", "--"])?;
        Ok(output.success())
    }

    // branch

    pub fn branch_default_remote(&self, branch: &str) -> Result<Option<String>> {
        self.query(&["config", "--get", &format!("branch.{branch}.remote")])
    }

    /// Upstream of `branch`, e.g. `origin/master`.
    pub fn branch_default_upstream(&self, branch: &str) -> Result<Option<String>> {
        self.query(&[
            "rev-parse",
            "--abbrev-ref",
            "--symbolic-full-name",
            &format!("{branch}@{{upstream}}"),
        ])
    }

    /// Point `refs/heads/<branch>` at `rev`.
    pub fn branch_set(&self, branch: &str, rev: &str) -> Result<()> {
        self.run_checked(&["update-ref", &format!("refs/heads/{branch}"), rev], None)?;
        Ok(())
    }

    /// Local branch names, sorted.
    pub fn branch_list(&self) -> Result<Vec<String>> {
        let branches = self
            .ref_list()?
            .into_keys()
            .filter_map(|r| r.strip_prefix("refs/heads/").map(str::to_string))
            .collect();
        Ok(branches)
    }

    pub fn branch_common_base(&self, branch: &str, other: &str) -> Result<Option<String>> {
        self.query(&["merge-base", branch, other])
    }

    /// Compare `branch` with `upstream`, or with its configured upstream.
    pub fn branch_divergency(&self, branch: &str, upstream: Option<&str>) -> Result<Divergency> {
        let upstream = match upstream {
            Some(u) => u.to_string(),
            None => self
                .branch_default_upstream(branch)?
                .ok_or_else(|| GitError::Usage(format!("branch '{branch}' has no upstream")))?,
        };

        let base = self
            .branch_common_base(branch, &upstream)?
            .ok_or_else(|| GitError::Usage(format!("'{branch}' and '{upstream}' have no common base")))?;

        let branch_commits = self.output_lines(&["log", "--format=%H", &format!("{base}..{branch}")])?;
        let upstream_commits = self.output_lines(&["log", "--format=%H", &format!("{base}..{upstream}")])?;

        Ok(Divergency {
            base,
            branch_commits,
            upstream_commits,
        })
    }

    // head

    /// Current branch name; `None` on a detached HEAD.
    pub fn head_branch(&self) -> Result<Option<String>> {
        self.query(&["symbolic-ref", "--short", "HEAD"])
    }

    // remote

    pub fn remote_get(&self, name: &str) -> Result<Option<String>> {
        self.query(&["remote", "get-url", name])
    }

    pub fn remote_add(&self, name: &str, url: &str) -> Result<()> {
        self.run_checked(&["remote", "add", name, url], None)?;
        Ok(())
    }

    // blob

    /// Write `path` into the object store and return the blob hash.
    pub fn blob_new(&self, path: &str) -> Result<String> {
        self.output_line(&["hash-object", "-w", path], None)
    }

    // tree

    pub fn tree_of(&self, commit: &str) -> Result<Option<String>> {
        self.query(&["rev-parse", &format!("{commit}^{{tree}}")])
    }

    /// Create a commit object for `tree`; the message is passed on stdin.
    pub fn tree_commit(&self, tree: &str, message: &str, parents: &[&str]) -> Result<String> {
        let mut args = vec!["commit-tree", tree];
        for parent in parents {
            args.push("-p");
            args.push(parent);
        }
        self.output_line(&args, Some(message))
    }

    /// `git ls-tree` lines of `treeish`.
    pub fn tree_items(&self, treeish: &str, name_only: bool, with_size: bool) -> Result<Vec<String>> {
        let mut args = vec!["ls-tree", treeish];
        if name_only {
            args.push("--name-only");
        }
        if with_size {
            args.push("--long");
        }
        self.output_lines(&args)
    }

    /// First entry of `treeish` matching `name` and `kind` (both optional).
    pub fn tree_find_item(&self, treeish: &str, name: Option<&str>, kind: Option<&str>) -> Result<Option<TreeItem>> {
        for line in self.tree_items(treeish, false, false)? {
            let item = TreeItem::parse(&line)?;
            if name.is_some_and(|n| n != item.name) {
                continue;
            }
            if kind.is_some_and(|k| k != item.kind) {
                continue;
            }
            return Ok(Some(item));
        }
        Ok(None)
    }

    /// Build a tree object from `ls-tree` formatted lines.
    pub fn tree_new(&self, items: &[String]) -> Result<String> {
        let mut input = items.join("\n");
        if !input.is_empty() {
            input.push('\n');
        }
        self.output_line(&["mktree"], Some(&input))
    }

    /// Build a tree from `items` with `name` pointing to `object`.
    pub fn tree_new_replace(&self, items: &[String], name: &str, object: &str, mode: Option<&str>) -> Result<String> {
        let items = self.treeitems_replace_item(items, name, Some(object), mode)?;
        self.tree_new(&items)
    }

    /// Insert `object` into `tree` at the slash-separated `path`, creating
    /// or replacing intermediate trees. Returns the new root tree.
    pub fn tree_add_obj(&self, tree: &str, path: &str, object: &str) -> Result<String> {
        let items = self.tree_items(tree, false, false)?;

        let Some((first, rest)) = path.split_once('/') else {
            return self.tree_new_replace(&items, path, object, None);
        };

        let subtree = match self.tree_find_item(tree, Some(first), Some("tree"))? {
            Some(item) => self.tree_add_obj(&item.object, rest, object)?,
            None => {
                let mut subtree = object.to_string();
                for part in rest.rsplit('/') {
                    subtree = self.tree_new_replace(&[], part, &subtree, None)?;
                }
                subtree
            }
        };

        self.tree_new_replace(&items, first, &subtree, None)
    }

    /// Drop the entry named `name` and, if `object` is given, add a new one.
    pub fn treeitems_replace_item(&self, items: &[String], name: &str, object: Option<&str>, mode: Option<&str>) -> Result<Vec<String>> {
        let mut kept = Vec::with_capacity(items.len() + 1);
        for line in items {
            if TreeItem::parse(line)?.name != name {
                kept.push(line.clone());
            }
        }

        if let Some(object) = object {
            kept.push(self.treeitem_new(name, object, mode)?);
        }
        Ok(kept)
    }

    /// A `mktree` line for `object`; trees always get mode `040000`.
    pub fn treeitem_new(&self, name: &str, object: &str, mode: Option<&str>) -> Result<String> {
        let kind = self.obj_type(object)?;
        let mode = if kind == "tree" {
            MODE_TREE
        } else {
            mode.unwrap_or(MODE_FILE)
        };

        let item = TreeItem {
            mode: mode.to_string(),
            kind,
            object: object.to_string(),
            size: None,
            name: name.to_string(),
        };
        Ok(item.to_string())
    }

    // ref

    /// Map of ref names (`refs/heads/master`) to hashes.
    pub fn ref_list(&self) -> Result<BTreeMap<String, String>> {
        let output = self.run(&["show-ref"])?;
        // show-ref exits 1 when there are no refs at all
        if output.code == 1 && output.stdout.trim().is_empty() {
            return Ok(BTreeMap::new());
        }
        if !output.success() {
            return Err(GitError::Command {
                command: self.command_line(&["show-ref"]).join(" "),
                code: output.code,
                stderr: output.stderr.trim().to_string(),
            });
        }

        let mut refs = BTreeMap::new();
        for line in output.stdout.lines() {
            if let Some((hash, name)) = line.trim().split_once(' ') {
                refs.insert(name.trim().to_string(), hash.to_string());
            }
        }
        Ok(refs)
    }

    // rev

    /// Hash of a revision name; `None` if it does not resolve.
    pub fn rev_of(&self, name: &str) -> Result<Option<String>> {
        self.query(&["rev-parse", "--verify", "--quiet", name])
    }

    /// `blob`, `tree`, `commit` or `tag`.
    pub fn obj_type(&self, object: &str) -> Result<String> {
        self.output_line(&["cat-file", "-t", object], None)
    }

    // output

    /// Write `parts` space-separated, prefixed with the context message.
    pub fn out<W: Write>(&self, writer: &mut W, parts: &[&str]) -> io::Result<()> {
        if let Some(context) = &self.context {
            write!(writer, "{context}: ")?;
        }
        writeln!(writer, "{}", parts.join(" "))
    }
}

fn absolute(path: &Path) -> String {
    std::path::absolute(path)
        .unwrap_or_else(|_| path.to_path_buf())
        .to_string_lossy()
        .into_owned()
}
