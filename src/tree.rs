//! `git ls-tree` / `git mktree` line format.
//!
//! ```text
//! <mode> SP <type> SP <object> TAB <name>
//! <mode> SP <type> SP <object> SP+ <size> TAB <name>    (ls-tree --long)
//! ```

use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use crate::error::ParseError;

pub const MODE_TREE: &str = "040000";
pub const MODE_FILE: &str = "100644";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TreeItem {
    pub mode: String,
    /// `blob`, `tree` or `commit`
    pub kind: String,
    pub object: String,
    /// Only present in `--long` output; `-` for trees.
    pub size: Option<String>,
    pub name: String,
}

impl TreeItem {
    pub fn parse(line: &str) -> Result<TreeItem, ParseError> {
        let invalid = || ParseError::InvalidTreeItem {
            line: line.to_string(),
        };

        let (meta, name) = line.split_once('\t').ok_or_else(invalid)?;
        let fields: Vec<&str> = meta.split_whitespace().collect();

        let (mode, kind, object, size) = match fields.as_slice() {
            [mode, kind, object] => (mode, kind, object, None),
            [mode, kind, object, size] => (mode, kind, object, Some(size.to_string())),
            _ => return Err(invalid()),
        };

        Ok(TreeItem {
            mode: mode.to_string(),
            kind: kind.to_string(),
            object: object.to_string(),
            size,
            name: name.to_string(),
        })
    }

    pub fn is_tree(&self) -> bool {
        self.kind == "tree"
    }
}

impl FromStr for TreeItem {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TreeItem::parse(s)
    }
}

/// Renders the `mktree` input form; `size` is never written.
impl fmt::Display for TreeItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}\t{}", self.mode, self.kind, self.object, self.name)
    }
}
