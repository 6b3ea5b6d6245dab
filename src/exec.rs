//! Running external commands.
//!
//! [`Executor`] is the seam between the repository handle and the operating
//! system. [`ProcessExecutor`] spawns real processes; tests substitute a
//! recording fake.

use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use crate::error::ExecutionError;

/// Captured result of one process run. A non-zero `code` is a normal result.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    /// Exit status; `-1` when the process was killed by a signal.
    pub code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.code == 0
    }

    /// First line of stdout, trailing whitespace removed.
    pub fn first_line(&self) -> Option<&str> {
        self.stdout.lines().next().map(str::trim_end)
    }

    /// Stdout split into lines, with the trailing empty line dropped.
    pub fn lines(&self) -> Vec<String> {
        self.stdout.lines().map(str::to_string).collect()
    }
}

/// Executes a command line (`argv[0]` is the program).
pub trait Executor: Send + Sync {
    fn execute(&self, argv: &[String], cwd: Option<&Path>, stdin: Option<&str>) -> Result<CommandOutput, ExecutionError>;
}

/// [`Executor`] backed by `std::process::Command`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessExecutor;

impl Executor for ProcessExecutor {
    fn execute(&self, argv: &[String], cwd: Option<&Path>, stdin: Option<&str>) -> Result<CommandOutput, ExecutionError> {
        let (program, args) = argv.split_first().ok_or(ExecutionError::EmptyCommand)?;

        let mut command = Command::new(program);
        command
            .args(args)
            .stdin(if stdin.is_some() { Stdio::piped() } else { Stdio::null() })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        if let Some(dir) = cwd {
            command.current_dir(dir);
        }

        let mut child = command.spawn().map_err(|source| {
            let program = PathBuf::from(program);
            if source.kind() == io::ErrorKind::NotFound {
                ExecutionError::NotFound { program, source }
            } else {
                ExecutionError::Spawn { program, source }
            }
        })?;

        let io_error = |source| ExecutionError::Io {
            command: argv.join(" "),
            source,
        };

        if let Some(input) = stdin {
            // dropping the handle closes the pipe so the child sees EOF
            if let Some(mut pipe) = child.stdin.take() {
                pipe.write_all(input.as_bytes()).map_err(io_error)?;
            }
        }

        let output = child.wait_with_output().map_err(io_error)?;

        Ok(CommandOutput {
            code: output.status.code().unwrap_or(-1),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}
