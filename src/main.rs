use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use git_wrapper::config::{ConfigManager, Settings};
use git_wrapper::url::{GitUrl, HttpsCredentials, UrlFormat};
use git_wrapper::logger::{self, CommandLog};
use git_wrapper::{Git, ParsedOptions};

#[derive(Parser)]
#[command(name = "git-wrapper")]
#[command(about = "Parse git command lines and remote URLs, and run git through them", long_about = None)]
#[command(version)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Settings file (defaults to config.toml in the config directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Split a git command line into global flags and the sub-command
    ParseArgs {
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,

        /// Tokens as they would follow `git`
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        tokens: Vec<String>,
    },

    /// Decompose a git remote URL
    ParseUrl {
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,

        /// Re-render as a hosted remote: ssh or https
        #[arg(long)]
        format: Option<UrlFormat>,

        /// Embed GITHUB_USERNAME/GITHUB_TOKEN into https output
        #[arg(long)]
        env_credentials: bool,

        url: String,
    },

    /// Run git with the configured global options prepended
    Exec {
        /// Directory to run git in
        #[arg(short = 'd', long)]
        dir: Option<PathBuf>,

        /// Tokens as they would follow `git`
        #[arg(trailing_var_arg = true, allow_hyphen_values = true, required = true)]
        tokens: Vec<String>,
    },

    /// Show how far a branch has diverged from its upstream
    Divergency {
        branch: String,

        /// Compare against this instead of the configured upstream
        upstream: Option<String>,

        /// Directory of the repository
        #[arg(short = 'd', long)]
        dir: Option<PathBuf>,
    },

    /// Print the checked-out branch
    Head {
        /// Directory of the repository
        #[arg(short = 'd', long)]
        dir: Option<PathBuf>,
    },

    /// List refs and the commits they point to
    Refs {
        /// Directory of the repository
        #[arg(short = 'd', long)]
        dir: Option<PathBuf>,
    },

    /// Show the effective settings
    Config {
        /// Write a starter config.toml if none exists
        #[arg(long)]
        init: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    logger::init_logger(cli.verbose);

    let config = cli.config.as_deref();

    match cli.command {
        Commands::ParseArgs { json, tokens } => parse_args(&tokens, json)?,
        Commands::ParseUrl {
            json,
            format,
            env_credentials,
            url,
        } => parse_url(&url, json, format, env_credentials)?,
        Commands::Exec { dir, tokens } => {
            let code = exec(&load_settings(config)?, dir, &tokens)?;
            std::process::exit(code);
        }
        Commands::Divergency {
            branch,
            upstream,
            dir,
        } => {
            let git = handle(&load_settings(config)?, dir)?;
            let div = git.branch_divergency(&branch, upstream.as_deref())?;

            println!("{} {}", "Base:".bold(), div.base.cyan());
            println!(
                "{} {} ahead, {} behind",
                branch.bold(),
                div.branch_commits.len().to_string().green(),
                div.upstream_commits.len().to_string().yellow()
            );
            for commit in &div.branch_commits {
                println!("  {} {commit}", "+".green());
            }
            for commit in &div.upstream_commits {
                println!("  {} {commit}", "-".yellow());
            }
        }
        Commands::Head { dir } => {
            let git = handle(&load_settings(config)?, dir)?;
            match git.head_branch()? {
                Some(branch) => println!("{}", branch.green()),
                None => println!("{}", "(detached HEAD)".yellow()),
            }
        }
        Commands::Refs { dir } => {
            let git = handle(&load_settings(config)?, dir)?;
            for (name, hash) in git.ref_list()? {
                println!("{} {name}", hash.yellow());
            }
        }
        Commands::Config { init } => {
            if init {
                init_config(config)?;
            }
            show_config(config, &load_settings(config)?)?;
        }
    }

    Ok(())
}

fn load_settings(path: Option<&Path>) -> Result<Settings> {
    match path {
        Some(path) => Settings::load_from(path),
        None => Settings::load(),
    }
}

fn handle(settings: &Settings, dir: Option<PathBuf>) -> Result<Git> {
    let git = with_command_log(settings.to_git()?, settings);
    Ok(match dir {
        Some(dir) => git.with_cwd(dir),
        None => git,
    })
}

/// Route every git call through the command log when `log_file` is set.
fn with_command_log(git: Git, settings: &Settings) -> Git {
    match &settings.log_file {
        Some(path) => {
            let inner = git.executor().clone();
            git.with_executor(Arc::new(CommandLog::new(path, inner)))
        }
        None => git,
    }
}

fn parse_args(tokens: &[String], json: bool) -> Result<()> {
    let parsed = ParsedOptions::parse(tokens.iter().cloned())?;

    if json {
        println!("{}", serde_json::to_string_pretty(&parsed)?);
        return Ok(());
    }

    println!("{}", "Global flags:".bold());
    if parsed.global_flags.is_empty() {
        println!("  {}", "(none)".dimmed());
    }
    for flag in &parsed.global_flags {
        match flag.value() {
            Some(value) => println!("  {} = {}", flag.name().cyan(), value),
            None => println!("  {}", flag.name().cyan()),
        }
    }

    println!("{}", "Command:".bold());
    if parsed.command_tokens.is_empty() {
        println!("  {}", "(none)".dimmed());
    } else {
        println!("  {}", parsed.command_tokens.join(" "));
    }

    Ok(())
}

fn parse_url(input: &str, json: bool, format: Option<UrlFormat>, env_credentials: bool) -> Result<()> {
    let url = GitUrl::parse(input)?;

    if let Some(format) = format {
        let credentials = if env_credentials {
            HttpsCredentials::from_env()
        } else {
            None
        };
        println!("{}", url.format(format, credentials.as_ref())?);
        return Ok(());
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&url)?);
        return Ok(());
    }

    let field = |name: &str, value: Option<&str>| {
        println!(
            "{:>10} {}",
            format!("{name}:").bold(),
            value.map_or_else(|| "-".dimmed().to_string(), str::to_string)
        );
    };
    let port = url.port.map(|p| p.to_string());

    field("scheme", Some(url.scheme.as_str()));
    field("user", url.user.as_deref());
    field("host", url.host.as_deref());
    field("port", port.as_deref());
    field("path", Some(url.path.as_str()));
    field("branch", url.branch.as_deref());
    field("canonical", Some(url.to_string().as_str()));

    Ok(())
}

fn exec(settings: &Settings, dir: Option<PathBuf>, tokens: &[String]) -> Result<i32> {
    let parsed = ParsedOptions::parse_command(tokens.iter().cloned())?;

    let mut options = settings.global_options()?;
    options.global_flags.extend(parsed.global_flags.iter().cloned());

    let mut git = Git::new(options);
    if let Some(path) = &settings.git_path {
        git = git.with_program(path);
    }
    if let Some(dir) = dir {
        git = git.with_cwd(dir);
    }

    let git = with_command_log(git, settings);
    let output = git.run(&parsed.command_tokens)?;

    io::stdout()
        .write_all(output.stdout.as_bytes())
        .context("Failed to write git output")?;
    io::stderr()
        .write_all(output.stderr.as_bytes())
        .context("Failed to write git output")?;

    Ok(output.code)
}

fn init_config(path: Option<&Path>) -> Result<()> {
    let path = match path {
        Some(path) => path.to_path_buf(),
        None => ConfigManager::ensure_config_dir()?.join("config.toml"),
    };

    if path.exists() {
        println!("{} {}", "Keeping existing".yellow(), path.display());
        return Ok(());
    }

    let settings = Settings {
        log_file: Some(ConfigManager::default_log_path()?),
        ..Settings::default()
    };
    settings.save_to(&path)?;
    println!("{} {}", "Created".green(), path.display());

    Ok(())
}

fn show_config(path: Option<&Path>, settings: &Settings) -> Result<()> {
    let path = match path {
        Some(path) => path.to_path_buf(),
        None => ConfigManager::settings_path()?,
    };

    println!("{} {}", "Config file:".bold(), path.display().to_string().cyan());
    if !path.exists() {
        println!("{}", "(not found, using defaults)".yellow());
    }
    println!();

    let content = toml::to_string_pretty(settings).context("Failed to serialize settings")?;
    if content.trim().is_empty() {
        println!("{}", "(all defaults)".dimmed());
    } else {
        print!("{content}");
    }

    let git = settings.to_git()?;
    println!(
        "\n{} {}",
        "Command prefix:".bold(),
        git.command_line::<&str>(&[]).join(" ")
    );

    Ok(())
}
