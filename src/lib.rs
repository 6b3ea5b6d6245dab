//! # git-wrapper
//!
//! A thin layer over the `git` command-line tool.
//!
//! ## Overview
//!
//! `git-wrapper` never touches the object store itself. It builds command
//! lines, runs the external `git` binary and parses what it prints. Two
//! pure parsers sit underneath the repository handle:
//!
//! - **Global options** ([`options`]): split `git [global options] <command>`
//!   into recognized global flags and an opaque sub-command tail, and render
//!   the flags back with [`ParsedOptions::to_args`].
//! - **Remote URLs** ([`url`]): classify `scheme://`, SSH shorthand and
//!   local-path remotes into a [`GitUrl`].
//!
//! ## Example
//!
//! ```no_run
//! use git_wrapper::{Git, GitUrl, ParsedOptions};
//!
//! let parsed = ParsedOptions::parse(["--git-dir=/srv/repo.git", "fetch", "origin"])?;
//! assert_eq!(parsed.command_tokens, ["fetch", "origin"]);
//!
//! let url = GitUrl::parse("git@github.com:pykit3/k3git.git")?;
//! assert_eq!(url.host.as_deref(), Some("github.com"));
//!
//! let git = Git::new(parsed).with_cwd("/srv");
//! let head = git.head_branch()?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

/// Platform configuration directory and user settings.
///
/// Settings are read from `config.toml` and decide which git binary runs
/// and which global options every call carries.
pub mod config;

/// Error types shared by the parsers and the repository handle.
pub mod error;

/// Process execution behind the [`exec::Executor`] trait.
pub mod exec;

/// Repository handle: argument assembly and convenience builders over the
/// git CLI.
pub mod git;

/// Console logging setup and the optional command log file.
pub mod logger;

/// Parser for git global options.
pub mod options;

/// `git ls-tree` line model used by the tree builders.
pub mod tree;

/// Parser for git remote URLs.
pub mod url;

pub use error::{ExecutionError, GitError, ParseError};
pub use exec::{CommandOutput, Executor, ProcessExecutor};
pub use git::{Divergency, Git, ResetMode};
pub use options::{GlobalFlag, ParsedOptions};
pub use tree::TreeItem;
pub use url::{GitUrl, HttpsCredentials, Scheme, UrlFormat};
