//! Git global option parsing.
//!
//! `git [global options] <command> [args]`: only the global options are
//! interpreted here. Scanning stops at the first token that is not a known
//! global option, and that token plus everything after it is kept verbatim
//! as the sub-command. Sub-command grammars belong to git.

use std::fmt;

use serde::{Serialize, Serializer};

use crate::error::ParseError;

/// A global option that git handles before the sub-command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GlobalFlag {
    /// `-C <path>`
    ChangeDir(String),
    /// `-c <name>=<value>`
    Config(String),
    /// `--config-env=<name>=<envvar>`
    ConfigEnv(String),
    GitDir(String),
    WorkTree(String),
    Namespace(String),
    /// `--exec-path` prints the path; `--exec-path=<path>` sets it.
    ExecPath(Option<String>),
    Paginate,
    NoPager,
    Bare,
    NoReplaceObjects,
    LiteralPathspecs,
    GlobPathspecs,
    NoglobPathspecs,
    IcasePathspecs,
    NoOptionalLocks,
    NoAdvice,
    HtmlPath,
    ManPath,
    InfoPath,
}

impl GlobalFlag {
    /// Option name without leading dashes.
    pub fn name(&self) -> &'static str {
        match self {
            GlobalFlag::ChangeDir(_) => "C",
            GlobalFlag::Config(_) => "c",
            GlobalFlag::ConfigEnv(_) => "config-env",
            GlobalFlag::GitDir(_) => "git-dir",
            GlobalFlag::WorkTree(_) => "work-tree",
            GlobalFlag::Namespace(_) => "namespace",
            GlobalFlag::ExecPath(_) => "exec-path",
            GlobalFlag::Paginate => "paginate",
            GlobalFlag::NoPager => "no-pager",
            GlobalFlag::Bare => "bare",
            GlobalFlag::NoReplaceObjects => "no-replace-objects",
            GlobalFlag::LiteralPathspecs => "literal-pathspecs",
            GlobalFlag::GlobPathspecs => "glob-pathspecs",
            GlobalFlag::NoglobPathspecs => "noglob-pathspecs",
            GlobalFlag::IcasePathspecs => "icase-pathspecs",
            GlobalFlag::NoOptionalLocks => "no-optional-locks",
            GlobalFlag::NoAdvice => "no-advice",
            GlobalFlag::HtmlPath => "html-path",
            GlobalFlag::ManPath => "man-path",
            GlobalFlag::InfoPath => "info-path",
        }
    }

    pub fn value(&self) -> Option<&str> {
        match self {
            GlobalFlag::ChangeDir(v)
            | GlobalFlag::Config(v)
            | GlobalFlag::ConfigEnv(v)
            | GlobalFlag::GitDir(v)
            | GlobalFlag::WorkTree(v)
            | GlobalFlag::Namespace(v) => Some(v),
            GlobalFlag::ExecPath(v) => v.as_deref(),
            _ => None,
        }
    }

    fn push_args(&self, out: &mut Vec<String>) {
        match self {
            GlobalFlag::ChangeDir(v) => {
                out.push("-C".to_string());
                out.push(v.clone());
            }
            GlobalFlag::Config(v) => {
                out.push("-c".to_string());
                out.push(v.clone());
            }
            other => match other.value() {
                Some(v) => out.push(format!("--{}={}", other.name(), v)),
                None => out.push(format!("--{}", other.name())),
            },
        }
    }

    /// Long options that take a value, either inline or as the next token.
    fn valued(name: &str) -> Option<fn(String) -> GlobalFlag> {
        match name {
            "config-env" => Some(GlobalFlag::ConfigEnv),
            "git-dir" => Some(GlobalFlag::GitDir),
            "work-tree" => Some(GlobalFlag::WorkTree),
            "namespace" => Some(GlobalFlag::Namespace),
            _ => None,
        }
    }

    fn switch(token: &str) -> Option<GlobalFlag> {
        let flag = match token {
            "-p" | "--paginate" => GlobalFlag::Paginate,
            "-P" | "--no-pager" => GlobalFlag::NoPager,
            "--bare" => GlobalFlag::Bare,
            "--exec-path" => GlobalFlag::ExecPath(None),
            "--no-replace-objects" => GlobalFlag::NoReplaceObjects,
            "--literal-pathspecs" => GlobalFlag::LiteralPathspecs,
            "--glob-pathspecs" => GlobalFlag::GlobPathspecs,
            "--noglob-pathspecs" => GlobalFlag::NoglobPathspecs,
            "--icase-pathspecs" => GlobalFlag::IcasePathspecs,
            "--no-optional-locks" => GlobalFlag::NoOptionalLocks,
            "--no-advice" => GlobalFlag::NoAdvice,
            "--html-path" => GlobalFlag::HtmlPath,
            "--man-path" => GlobalFlag::ManPath,
            "--info-path" => GlobalFlag::InfoPath,
            _ => return None,
        };
        Some(flag)
    }

    /// Recognize `token` as a global flag, returning the flag and how many
    /// tokens it consumed. `Ok(None)` means `token` starts the sub-command.
    fn recognize(token: &str, next: Option<&String>) -> Result<Option<(GlobalFlag, usize)>, ParseError> {
        let required = |flag: &str| {
            next.cloned().ok_or_else(|| ParseError::MissingValue {
                flag: flag.to_string(),
            })
        };

        match token {
            "-C" => return Ok(Some((GlobalFlag::ChangeDir(required(token)?), 2))),
            "-c" => return Ok(Some((GlobalFlag::Config(required(token)?), 2))),
            _ => {}
        }

        if let Some(flag) = Self::switch(token) {
            return Ok(Some((flag, 1)));
        }

        let Some(rest) = token.strip_prefix("--") else {
            return Ok(None);
        };
        let (name, inline) = match rest.split_once('=') {
            Some((name, value)) => (name, Some(value)),
            None => (rest, None),
        };

        if let Some(build) = Self::valued(name) {
            let flag = match inline {
                Some(value) => (build(value.to_string()), 1),
                None => (build(required(token)?), 2),
            };
            return Ok(Some(flag));
        }

        match (name, inline) {
            ("exec-path", Some(value)) => Ok(Some((GlobalFlag::ExecPath(Some(value.to_string())), 1))),
            _ => Ok(None),
        }
    }
}

#[derive(Serialize)]
struct FlagView<'a> {
    name: &'a str,
    value: Option<&'a str>,
}

impl Serialize for GlobalFlag {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        FlagView {
            name: self.name(),
            value: self.value(),
        }
        .serialize(serializer)
    }
}

/// A git command line split into global flags and the sub-command.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ParsedOptions {
    pub global_flags: Vec<GlobalFlag>,
    pub command_tokens: Vec<String>,
}

impl ParsedOptions {
    /// Split `tokens` at the first token that is not a recognized global
    /// flag. The command part may be empty.
    pub fn parse<I, S>(tokens: I) -> Result<Self, ParseError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut tokens: Vec<String> = tokens.into_iter().map(Into::into).collect();
        let mut global_flags = Vec::new();

        let mut i = 0;
        while i < tokens.len() {
            match GlobalFlag::recognize(&tokens[i], tokens.get(i + 1))? {
                Some((flag, consumed)) => {
                    global_flags.push(flag);
                    i += consumed;
                }
                None => break,
            }
        }

        let command_tokens = tokens.split_off(i);
        Ok(ParsedOptions {
            global_flags,
            command_tokens,
        })
    }

    /// Like [`ParsedOptions::parse`], but a sub-command is mandatory.
    pub fn parse_command<I, S>(tokens: I) -> Result<Self, ParseError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let parsed = Self::parse(tokens)?;
        if parsed.command_tokens.is_empty() {
            return Err(ParseError::MissingCommand);
        }
        Ok(parsed)
    }

    /// Global flags only, `--name=value` form for long options.
    pub fn to_args(&self) -> Vec<String> {
        let mut args = Vec::with_capacity(self.global_flags.len() * 2);
        for flag in &self.global_flags {
            flag.push_args(&mut args);
        }
        args
    }

    /// Global flags followed by the sub-command tokens.
    pub fn to_command_line(&self) -> Vec<String> {
        let mut args = self.to_args();
        args.extend(self.command_tokens.iter().cloned());
        args
    }

    /// Same global context with a different sub-command.
    pub fn with_command<I, S>(&self, tokens: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        ParsedOptions {
            global_flags: self.global_flags.clone(),
            command_tokens: tokens.into_iter().map(Into::into).collect(),
        }
    }

    /// Sub-command name, if any.
    pub fn command(&self) -> Option<&str> {
        self.command_tokens.first().map(String::as_str)
    }

    pub fn git_dir(&self) -> Option<&str> {
        self.last_value(|f| matches!(f, GlobalFlag::GitDir(_)))
    }

    pub fn work_tree(&self) -> Option<&str> {
        self.last_value(|f| matches!(f, GlobalFlag::WorkTree(_)))
    }

    /// All `-C` paths in order; git applies them cumulatively.
    pub fn change_dirs(&self) -> impl Iterator<Item = &str> {
        self.global_flags.iter().filter_map(|f| match f {
            GlobalFlag::ChangeDir(p) => Some(p.as_str()),
            _ => None,
        })
    }

    /// Replace any `--git-dir`.
    pub fn set_git_dir(&mut self, path: impl Into<String>) {
        self.global_flags.retain(|f| !matches!(f, GlobalFlag::GitDir(_)));
        self.global_flags.push(GlobalFlag::GitDir(path.into()));
    }

    /// Replace any `--work-tree`.
    pub fn set_work_tree(&mut self, path: impl Into<String>) {
        self.global_flags.retain(|f| !matches!(f, GlobalFlag::WorkTree(_)));
        self.global_flags.push(GlobalFlag::WorkTree(path.into()));
    }

    fn last_value(&self, pred: impl Fn(&GlobalFlag) -> bool) -> Option<&str> {
        self.global_flags
            .iter()
            .rev()
            .find(|f| pred(f))
            .and_then(GlobalFlag::value)
    }
}

impl fmt::Display for ParsedOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_command_line().join(" "))
    }
}
