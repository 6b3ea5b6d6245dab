use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::git::Git;
use crate::options::ParsedOptions;

/// Cross-platform configuration directory manager
pub struct ConfigManager;

impl ConfigManager {
    /// Get the main configuration directory path following platform conventions:
    /// - Linux: $XDG_CONFIG_HOME/git-wrapper or ~/.config/git-wrapper
    /// - macOS: ~/Library/Application Support/git-wrapper
    /// - Windows: %APPDATA%\git-wrapper
    pub fn config_dir() -> Result<PathBuf> {
        #[cfg(target_os = "linux")]
        {
            if let Ok(xdg_config) = std::env::var("XDG_CONFIG_HOME") {
                Ok(PathBuf::from(xdg_config).join("git-wrapper"))
            } else {
                let home = dirs::home_dir().context("Failed to get home directory")?;
                Ok(home.join(".config").join("git-wrapper"))
            }
        }

        #[cfg(not(target_os = "linux"))]
        {
            Ok(dirs::config_dir()
                .context("Failed to get config directory")?
                .join("git-wrapper"))
        }
    }

    /// Get the settings file path (config.toml)
    pub fn settings_path() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join("config.toml"))
    }

    /// Get the default command log path
    pub fn default_log_path() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join("git-wrapper.log"))
    }

    /// Ensure the configuration directory exists
    pub fn ensure_config_dir() -> Result<PathBuf> {
        let config_dir = Self::config_dir()?;
        fs::create_dir_all(&config_dir)
            .with_context(|| format!("Failed to create config directory: {}", config_dir.display()))?;
        Ok(config_dir)
    }
}

/// User settings for the repository handle.
///
/// ```toml
/// git_path = "/usr/bin/git"
/// global_args = ["-c", "core.quotepath=off", "--no-pager"]
/// context = "deploy"
/// log_file = "/var/log/git-wrapper.log"
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    /// git executable; `git` from `PATH` when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub git_path: Option<PathBuf>,

    /// Global options prepended to every git call
    #[serde(default)]
    pub global_args: Vec<String>,

    /// Prefix for messages written by the handle
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,

    /// Append every executed command line to this file
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_file: Option<PathBuf>,
}

impl Settings {
    /// Load from the default location; defaults if the file does not exist.
    pub fn load() -> Result<Self> {
        Self::load_from(&ConfigManager::settings_path()?)
    }

    /// Load from `path`; defaults if the file does not exist.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            log::debug!("No settings at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let settings: Settings = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(settings)
    }

    /// Save to `path`, creating parent directories.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
        }

        let content = toml::to_string_pretty(self).context("Failed to serialize settings")?;
        fs::write(path, content)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }

    /// Parse `global_args` with the option parser. They must be global
    /// options only.
    pub fn global_options(&self) -> Result<ParsedOptions> {
        let options = ParsedOptions::parse(self.global_args.iter().cloned())
            .context("Invalid global_args in settings")?;

        if let Some(command) = options.command() {
            anyhow::bail!("global_args must only contain git global options, found '{command}'");
        }
        Ok(options)
    }

    /// Build a repository handle from these settings.
    pub fn to_git(&self) -> Result<Git> {
        let mut git = Git::new(self.global_options()?);
        if let Some(path) = &self.git_path {
            git = git.with_program(path);
        }
        if let Some(context) = &self.context {
            git = git.with_context(context);
        }
        Ok(git)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_config_paths() {
        let config_dir = ConfigManager::config_dir().unwrap();
        assert!(config_dir.to_string_lossy().contains("git-wrapper"));

        let settings = ConfigManager::settings_path().unwrap();
        assert!(settings.to_string_lossy().ends_with("config.toml"));

        let log = ConfigManager::default_log_path().unwrap();
        assert!(log.to_string_lossy().contains("git-wrapper.log"));
    }

    #[test]
    fn test_missing_file_gives_defaults() {
        let temp = TempDir::new().unwrap();
        let settings = Settings::load_from(&temp.path().join("nope.toml")).unwrap();
        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn test_save_and_load() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("sub").join("config.toml");

        let settings = Settings {
            git_path: Some(PathBuf::from("/opt/git/bin/git")),
            global_args: vec!["-c".into(), "core.quotepath=off".into()],
            context: Some("ci".into()),
            log_file: None,
        };
        settings.save_to(&path).unwrap();

        let loaded = Settings::load_from(&path).unwrap();
        assert_eq!(loaded, settings);
    }

    #[test]
    fn test_to_git_applies_settings() {
        let settings: Settings = toml::from_str(
            r#"
            git_path = "/opt/git/bin/git"
            global_args = ["--no-pager", "-c", "color.ui=never"]
            "#,
        )
        .unwrap();

        let git = settings.to_git().unwrap();
        assert_eq!(
            git.command_line(&["status"]),
            vec!["/opt/git/bin/git", "--no-pager", "-c", "color.ui=never", "status"]
        );
    }

    #[test]
    fn test_global_args_reject_subcommand() {
        let settings = Settings {
            global_args: vec!["--bare".into(), "status".into()],
            ..Settings::default()
        };
        assert!(settings.global_options().is_err());

        let settings = Settings {
            global_args: vec!["--git-dir".into()],
            ..Settings::default()
        };
        assert!(settings.to_git().is_err());
    }

    #[test]
    fn test_invalid_toml_is_error() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.toml");
        fs::write(&path, "global_args = 3").unwrap();
        assert!(Settings::load_from(&path).is_err());
    }

    #[test]
    #[cfg(target_os = "linux")]
    #[serial_test::serial]
    fn test_xdg_config_home_respected() {
        std::env::set_var("XDG_CONFIG_HOME", "/tmp/test-xdg-config");
        let config_dir = ConfigManager::config_dir().unwrap();
        assert!(config_dir
            .to_string_lossy()
            .contains("/tmp/test-xdg-config/git-wrapper"));
        std::env::remove_var("XDG_CONFIG_HOME");
    }
}
