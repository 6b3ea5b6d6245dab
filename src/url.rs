//! Git remote URL parsing.
//!
//! Three shapes are recognized, tried in this order:
//!
//! | Shape | Example | Scheme |
//! |-------|---------|--------|
//! | explicit scheme | `https://github.com/org/repo.git` | `https`, `ssh`, ... |
//! | SSH shorthand | `git@github.com:org/repo.git` | `ssh-shorthand` |
//! | local path | `/srv/git/repo.git`, `..\repo` | `file` |
//!
//! Telling `host:path` apart from a Windows path such as `C:\repo` is a
//! heuristic: the part before the first `:` must look like a host name
//! (no path separators, not a single drive letter).

use std::env;
use std::fmt;
use std::str::FromStr;

use serde::{Serialize, Serializer};

use crate::error::ParseError;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Scheme {
    /// `[user@]host:path`
    SshShorthand,
    Ssh,
    Http,
    Https,
    Git,
    File,
    /// A syntactically valid scheme git may hand to a remote helper.
    Unknown(String),
}

impl Scheme {
    fn from_name(name: &str) -> Scheme {
        match name.to_ascii_lowercase().as_str() {
            "ssh" | "git+ssh" | "ssh+git" => Scheme::Ssh,
            "http" => Scheme::Http,
            "https" => Scheme::Https,
            "git" => Scheme::Git,
            "file" => Scheme::File,
            _ => Scheme::Unknown(name.to_string()),
        }
    }

    fn is_valid_name(name: &str) -> bool {
        let mut chars = name.chars();
        matches!(chars.next(), Some(c) if c.is_ascii_alphabetic())
            && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
    }

    pub fn as_str(&self) -> &str {
        match self {
            Scheme::SshShorthand => "ssh-shorthand",
            Scheme::Ssh => "ssh",
            Scheme::Http => "http",
            Scheme::Https => "https",
            Scheme::Git => "git",
            Scheme::File => "file",
            Scheme::Unknown(name) => name,
        }
    }

    fn is_ssh(&self) -> bool {
        matches!(self, Scheme::Ssh | Scheme::SshShorthand)
    }

    fn is_http(&self) -> bool {
        matches!(self, Scheme::Http | Scheme::Https)
    }
}

impl fmt::Display for Scheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for Scheme {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// Output form for [`GitUrl::format`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UrlFormat {
    /// `git@host:owner/repo.git`
    Ssh,
    /// `https://[user:token@]host/owner/repo.git`
    Https,
}

impl FromStr for UrlFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ssh" => Ok(UrlFormat::Ssh),
            "https" => Ok(UrlFormat::Https),
            other => Err(format!("unknown url format '{other}', expected 'ssh' or 'https'")),
        }
    }
}

/// Credentials embedded into https URLs that do not carry their own.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpsCredentials {
    pub username: String,
    pub token: String,
}

impl HttpsCredentials {
    pub fn new(username: impl Into<String>, token: impl Into<String>) -> Self {
        HttpsCredentials {
            username: username.into(),
            token: token.into(),
        }
    }

    /// Read `GITHUB_USERNAME` and `GITHUB_TOKEN`. Both must be set.
    pub fn from_env() -> Option<Self> {
        let username = env::var("GITHUB_USERNAME").ok().filter(|s| !s.is_empty())?;
        let token = env::var("GITHUB_TOKEN").ok().filter(|s| !s.is_empty())?;
        Some(HttpsCredentials { username, token })
    }
}

/// A parsed git remote reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GitUrl {
    pub scheme: Scheme,
    pub user: Option<String>,
    #[serde(skip_serializing)]
    pub password: Option<String>,
    pub host: Option<String>,
    pub port: Option<u16>,
    pub path: String,
    /// `repo.git@<branch>` suffix; not part of the rendered URL.
    pub branch: Option<String>,
}

impl GitUrl {
    pub fn parse(input: &str) -> Result<GitUrl, ParseError> {
        if input.trim().is_empty() {
            return Err(ParseError::invalid_url(input, "empty url"));
        }

        if let Some((scheme, rest)) = input.split_once("://") {
            // `dir/a://b` and `user@host:a://b` are paths, not URLs
            if !scheme.contains(['/', '\\', '@', ':']) {
                return Self::parse_explicit(input, scheme, rest);
            }
        }

        if let Some(url) = Self::parse_shorthand(input)? {
            return Ok(url);
        }

        Ok(GitUrl {
            scheme: Scheme::File,
            user: None,
            password: None,
            host: None,
            port: None,
            path: input.to_string(),
            branch: None,
        })
    }

    /// `scheme://[user[:password]@]host[:port]/path`
    fn parse_explicit(input: &str, scheme_name: &str, rest: &str) -> Result<GitUrl, ParseError> {
        if scheme_name.is_empty() {
            return Err(ParseError::invalid_url(input, "empty scheme"));
        }
        if !Scheme::is_valid_name(scheme_name) {
            return Err(ParseError::invalid_url(
                input,
                format!("invalid scheme '{scheme_name}'"),
            ));
        }
        let scheme = Scheme::from_name(scheme_name);

        let (authority, path) = match rest.find('/') {
            // file paths keep their leading slash
            Some(i) if scheme == Scheme::File => (&rest[..i], &rest[i..]),
            Some(i) => (&rest[..i], &rest[i + 1..]),
            None => (rest, ""),
        };

        let (userinfo, host_port) = match authority.rfind('@') {
            Some(i) => (Some(&authority[..i]), &authority[i + 1..]),
            None => (None, authority),
        };
        let (user, password) = match userinfo {
            Some(info) => match info.split_once(':') {
                Some((u, p)) => (non_empty(u), non_empty(p)),
                None => (non_empty(info), None),
            },
            None => (None, None),
        };

        let (host, port) = Self::split_host_port(input, host_port)?;

        if host.is_none() && scheme != Scheme::File {
            return Err(ParseError::invalid_url(input, "missing host"));
        }
        if path.is_empty() {
            return Err(ParseError::invalid_url(input, "missing repository path"));
        }

        let (path, branch) = if scheme == Scheme::File {
            (path.to_string(), None)
        } else {
            split_branch(path)
        };

        Ok(GitUrl {
            scheme,
            user,
            password,
            host,
            port,
            path,
            branch,
        })
    }

    fn split_host_port(input: &str, host_port: &str) -> Result<(Option<String>, Option<u16>), ParseError> {
        let (host, port) = if let Some(bracketed) = host_port.strip_prefix('[') {
            let Some((host, after)) = bracketed.split_once(']') else {
                return Err(ParseError::invalid_url(input, "unterminated '[' in host"));
            };
            if !after.is_empty() && !after.starts_with(':') {
                return Err(ParseError::invalid_url(
                    input,
                    format!("unexpected '{after}' after host"),
                ));
            }
            (host, after.strip_prefix(':'))
        } else {
            match host_port.split_once(':') {
                Some((host, port)) => (host, Some(port)),
                None => (host_port, None),
            }
        };

        let port = match port {
            None | Some("") => None,
            Some(digits) if digits.chars().all(|c| c.is_ascii_digit()) => {
                let port = digits
                    .parse::<u16>()
                    .map_err(|_| ParseError::invalid_url(input, format!("port '{digits}' out of range")))?;
                Some(port)
            }
            Some(other) => {
                return Err(ParseError::invalid_url(input, format!("invalid port '{other}'")));
            }
        };

        Ok((non_empty(host), port))
    }

    /// `[user@]host:path`, or `Ok(None)` when the text before the first
    /// colon does not look like a host.
    fn parse_shorthand(input: &str) -> Result<Option<GitUrl>, ParseError> {
        let (user, rest) = match input.split_once('@') {
            Some((user, rest)) if !user.is_empty() && !user.contains(['/', '\\', ':']) => (Some(user), rest),
            _ => (None, input),
        };

        let (host, path) = if let Some(bracketed) = rest.strip_prefix('[') {
            match bracketed.split_once("]:") {
                Some((host, path)) if !host.is_empty() && !host.contains(['/', '\\']) => (host, path),
                _ => return Ok(None),
            }
        } else {
            match rest.split_once(':') {
                Some((host, path)) if looks_like_host(host) => (host, path),
                _ => return Ok(None),
            }
        };

        if path.is_empty() {
            return Err(ParseError::invalid_url(input, "missing repository path after ':'"));
        }

        let (path, branch) = split_branch(path);
        Ok(Some(GitUrl {
            scheme: Scheme::SshShorthand,
            user: user.map(str::to_string),
            password: None,
            host: Some(host.to_string()),
            port: None,
            path,
            branch,
        }))
    }

    /// Render as a hosted-repository URL in the given form.
    ///
    /// The path is trimmed of slashes and always ends in `.git`. For https,
    /// credentials already in the URL win over `credentials`.
    pub fn format(&self, format: UrlFormat, credentials: Option<&HttpsCredentials>) -> Result<String, ParseError> {
        let host = self.host.as_deref().ok_or_else(|| ParseError::NoHost {
            url: self.to_string(),
        })?;
        let host = bracket_host(host);
        let path = self.repo_path();

        let url = match format {
            UrlFormat::Ssh => {
                let user = match (&self.user, self.scheme.is_ssh()) {
                    (Some(user), true) => user.as_str(),
                    _ => "git",
                };
                format!("{user}@{host}:{path}")
            }
            UrlFormat::Https => {
                let (user, password) = if self.scheme.is_http() && self.user.is_some() {
                    (self.user.as_deref(), self.password.as_deref())
                } else {
                    match credentials {
                        Some(c) => (Some(c.username.as_str()), Some(c.token.as_str())),
                        None => (None, None),
                    }
                };
                match (user, password) {
                    (Some(u), Some(p)) => format!("https://{u}:{p}@{host}/{path}"),
                    (Some(u), None) => format!("https://{u}@{host}/{path}"),
                    _ => format!("https://{host}/{path}"),
                }
            }
        };
        Ok(url)
    }

    /// Path without surrounding slashes, ending in `.git`.
    fn repo_path(&self) -> String {
        let trimmed = self.path.trim_matches('/');
        if trimmed.ends_with(".git") {
            trimmed.to_string()
        } else {
            format!("{trimmed}.git")
        }
    }

    /// Last path segment without the `.git` suffix.
    pub fn repo_name(&self) -> Option<&str> {
        let last = self
            .path
            .trim_end_matches(['/', '\\'])
            .rsplit(['/', '\\'])
            .next()?;
        let name = last.strip_suffix(".git").unwrap_or(last);
        non_empty_str(name)
    }

    pub fn is_local(&self) -> bool {
        self.scheme == Scheme::File && self.host.is_none()
    }
}

impl FromStr for GitUrl {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        GitUrl::parse(s)
    }
}

impl fmt::Display for GitUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.scheme, &self.host) {
            (Scheme::SshShorthand, Some(host)) => {
                if let Some(user) = &self.user {
                    write!(f, "{user}@")?;
                }
                write!(f, "{}:{}", bracket_host(host), self.path)
            }
            (Scheme::File, None) if self.path.starts_with('/') => write!(f, "file://{}", self.path),
            (Scheme::File, None) => f.write_str(&self.path),
            (Scheme::File, Some(host)) => write!(f, "file://{}{}", bracket_host(host), self.path),
            (scheme, host) => {
                write!(f, "{scheme}://")?;
                if let Some(user) = &self.user {
                    f.write_str(user)?;
                    if let Some(password) = &self.password {
                        write!(f, ":{password}")?;
                    }
                    f.write_str("@")?;
                }
                if let Some(host) = host {
                    f.write_str(&bracket_host(host))?;
                }
                if let Some(port) = self.port {
                    write!(f, ":{port}")?;
                }
                write!(f, "/{}", self.path)
            }
        }
    }
}

/// Any token without path separators, whitespace or `@`; never a drive
/// letter. Internationalized host names pass as typed.
fn looks_like_host(s: &str) -> bool {
    let single_drive_letter = s.len() == 1 && s.chars().all(|c| c.is_ascii_alphabetic());
    !s.is_empty()
        && !single_drive_letter
        && !s.chars().any(|c| matches!(c, '/' | '\\' | '@') || c.is_whitespace())
}

fn bracket_host(host: &str) -> String {
    if host.contains(':') {
        format!("[{host}]")
    } else {
        host.to_string()
    }
}

fn split_branch(path: &str) -> (String, Option<String>) {
    if let Some(i) = path.rfind(".git@") {
        let branch = &path[i + ".git@".len()..];
        if !branch.is_empty() {
            return (path[..i + ".git".len()].to_string(), Some(branch.to_string()));
        }
    }
    (path.to_string(), None)
}

fn non_empty(s: &str) -> Option<String> {
    non_empty_str(s).map(str::to_string)
}

fn non_empty_str(s: &str) -> Option<&str> {
    if s.is_empty() {
        None
    } else {
        Some(s)
    }
}
