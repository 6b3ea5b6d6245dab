use anyhow::{Context, Result};
use log::LevelFilter;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::error::ExecutionError;
use crate::exec::{CommandOutput, Executor};

/// Rotate the command log once it grows past this size.
const MAX_LOG_SIZE: u64 = 10 * 1024 * 1024;

/// Initialize console logging.
///
/// `verbosity` comes from repeated `-v` flags: 0 = warn, 1 = info,
/// 2 = debug, 3+ = trace. `RUST_LOG` takes precedence when set:
///
/// ```bash
/// # Show every git command line the handle runs
/// RUST_LOG=debug git-wrapper exec -- status
/// ```
pub fn init_logger(verbosity: u8) {
    let level = std::env::var("RUST_LOG")
        .ok()
        .and_then(|s| s.parse::<LevelFilter>().ok())
        .unwrap_or(match verbosity {
            0 => LevelFilter::Warn,
            1 => LevelFilter::Info,
            2 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        });

    env_logger::Builder::new()
        .format(|buf, record| {
            writeln!(
                buf,
                "{} [{:5}] {}",
                chrono::Local::now().format("%H:%M:%S"),
                record.level(),
                record.args()
            )
        })
        .filter_level(level)
        .target(env_logger::Target::Stderr)
        .try_init()
        .ok(); // Ignore error if logger is already initialized
}

/// Append a timestamped line to the log file at `path`.
pub fn log_to_file(path: &Path, message: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create log directory: {}", parent.display()))?;
    }

    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("Failed to open log file: {}", path.display()))?;

    writeln!(
        file,
        "[{}] {}",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
        message
    )?;

    Ok(())
}

/// Move `path` to `<path>.old` if it exceeds the size limit.
pub fn rotate_log_if_needed(path: &Path) -> Result<()> {
    rotate_log(path, MAX_LOG_SIZE)
}

fn rotate_log(path: &Path, max_size: u64) -> Result<()> {
    if !path.exists() {
        return Ok(());
    }

    let metadata = std::fs::metadata(path)?;
    if metadata.len() <= max_size {
        return Ok(());
    }

    let old_path = path.with_extension("log.old");
    if old_path.exists() {
        std::fs::remove_file(&old_path)?;
    }
    std::fs::rename(path, &old_path)?;

    log::info!("Log file rotated to {}", old_path.display());
    Ok(())
}

/// [`Executor`] that appends every command line to a log file, then
/// hands the call to `inner`.
///
/// A log write failure is reported as a warning and never fails the command.
pub struct CommandLog {
    path: PathBuf,
    inner: Arc<dyn Executor>,
}

impl CommandLog {
    pub fn new(path: impl Into<PathBuf>, inner: Arc<dyn Executor>) -> Self {
        CommandLog {
            path: path.into(),
            inner,
        }
    }
}

impl Executor for CommandLog {
    fn execute(&self, argv: &[String], cwd: Option<&Path>, stdin: Option<&str>) -> Result<CommandOutput, ExecutionError> {
        let written = rotate_log_if_needed(&self.path).and_then(|()| log_to_file(&self.path, &argv.join(" ")));
        if let Err(e) = written {
            log::warn!("Failed to write command log {}: {e:#}", self.path.display());
        }

        self.inner.execute(argv, cwd, stdin)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::git::Git;
    use std::sync::Mutex;
    use tempfile::TempDir;

    /// Records argv and answers every call with exit status 3.
    #[derive(Default)]
    struct Recorder {
        calls: Mutex<Vec<Vec<String>>>,
    }

    impl Executor for Recorder {
        fn execute(&self, argv: &[String], _cwd: Option<&Path>, _stdin: Option<&str>) -> Result<CommandOutput, ExecutionError> {
            self.calls.lock().unwrap().push(argv.to_vec());
            Ok(CommandOutput {
                code: 3,
                ..CommandOutput::default()
            })
        }
    }

    #[test]
    fn test_command_log_records_every_call() -> Result<()> {
        let temp = TempDir::new()?;
        let log_path = temp.path().join("logs").join("git-wrapper.log");
        let recorder = Arc::new(Recorder::default());

        let git = Git::default().with_executor(Arc::new(CommandLog::new(&log_path, recorder.clone())));
        let output = git.run(&["status", "-s"])?;
        assert_eq!(output.code, 3);
        assert_eq!(git.head_branch()?, None);

        let contents = std::fs::read_to_string(&log_path)?;
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].ends_with("] git status -s"));
        assert!(lines[1].ends_with("] git symbolic-ref --short HEAD"));

        assert_eq!(recorder.calls.lock().unwrap().len(), 2);
        Ok(())
    }

    #[test]
    fn test_command_log_failure_still_runs_command() -> Result<()> {
        let temp = TempDir::new()?;
        let blocker = temp.path().join("not-a-dir");
        std::fs::write(&blocker, "file")?;
        let recorder = Arc::new(Recorder::default());

        let log = CommandLog::new(blocker.join("git-wrapper.log"), recorder.clone());
        let output = log.execute(&["git".to_string(), "fetch".to_string()], None, None)?;

        assert_eq!(output.code, 3);
        assert_eq!(recorder.calls.lock().unwrap()[0], vec!["git", "fetch"]);
        Ok(())
    }

    #[test]
    fn test_init_logger_twice_is_harmless() {
        init_logger(0);
        init_logger(3);
    }

    #[test]
    fn test_log_to_file() -> Result<()> {
        let temp = TempDir::new()?;
        let log_path = temp.path().join("logs").join("git-wrapper.log");

        log_to_file(&log_path, "git status")?;
        log_to_file(&log_path, "git fetch origin")?;

        let contents = std::fs::read_to_string(&log_path)?;
        assert!(contents.contains("git status"));
        assert_eq!(contents.lines().count(), 2);

        Ok(())
    }

    #[test]
    fn test_rotate_log_creates_backup() -> Result<()> {
        let temp = TempDir::new()?;
        let log_path = temp.path().join("git-wrapper.log");
        std::fs::write(&log_path, vec![b'a'; 2048])?;

        rotate_log(&log_path, 1024)?;

        assert!(!log_path.exists());
        assert!(temp.path().join("git-wrapper.log.old").exists());
        Ok(())
    }

    #[test]
    fn test_rotate_log_small_file_untouched() -> Result<()> {
        let temp = TempDir::new()?;
        let log_path = temp.path().join("git-wrapper.log");
        std::fs::write(&log_path, "small")?;

        rotate_log_if_needed(&log_path)?;
        assert!(log_path.exists());

        rotate_log_if_needed(&temp.path().join("missing.log"))?;
        Ok(())
    }
}
