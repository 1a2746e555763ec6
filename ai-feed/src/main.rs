//! ai-feed - recommend one article from your feeds to chat
//!
//! Fetches RSS/Atom feeds, skips articles already posted, asks an LLM to pick
//! one and comment on it, and posts the result to Slack and/or Misskey.
//!
//! File locations:
//! - Config: `./config.yml` (override with `--config`)
//! - Recommend history: `~/.ai-feed/recommend_history.jsonl` by default
//! - Logs: $XDG_STATE_HOME/ai-feed/ai-feed.log.<date> (~/.local/state/ai-feed/)

mod check;

use std::io;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use ai_feed_core::config::{write_new_file, DEFAULT_CONFIG_PATH, DEFAULT_CONFIG_TEMPLATE};
use ai_feed_core::profile::{validate, Merge, DEFAULT_PROFILE_TEMPLATE};
use ai_feed_core::{feed, recommend, Config, LoadedConfig, Outcome, Pipeline, Profile, RawProfile};
use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};

use crate::check::{write_report, Subject};

#[derive(Parser)]
#[command(name = "ai-feed")]
#[command(about = "Pick an article from your feeds, let an LLM comment on it, and post it to chat")]
#[command(version)]
struct Args {
    /// Configuration file
    #[arg(short, long, global = true, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Write a starter configuration file
    Init,

    /// Inspect the configuration file
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },

    /// Create and check profile files
    Profile {
        #[command(subcommand)]
        command: ProfileCommand,
    },

    /// Recommend one new article and post it
    Recommend {
        /// Feed URL (repeatable)
        #[arg(long = "url", value_name = "URL", conflicts_with = "source")]
        urls: Vec<String>,

        /// File with one feed URL per line
        #[arg(long, value_name = "FILE")]
        source: Option<PathBuf>,

        /// Profile merged over the default profile
        #[arg(short, long, value_name = "FILE")]
        profile: Option<PathBuf>,
    },
}

#[derive(Subcommand)]
enum ConfigCommand {
    /// Load, merge and validate the configuration
    Check {
        /// Profile merged over the default profile
        #[arg(short, long, value_name = "FILE")]
        profile: Option<PathBuf>,
    },
}

#[derive(Subcommand)]
enum ProfileCommand {
    /// Write a starter profile file
    Init { file: PathBuf },

    /// Validate a profile merged over the default profile
    Check { file: PathBuf },
}

/// Options shared by every command.
struct Settings {
    config_path: PathBuf,
    verbose: bool,
}

fn main() -> Result<ExitCode> {
    let args = Args::parse();
    let settings = Settings {
        config_path: args.config,
        verbose: args.verbose,
    };

    let logging = Config::peek_logging(&settings.config_path);
    let _log_guard = ai_feed_core::logging::init(&logging, settings.verbose)
        .context("failed to initialize logging")?;

    match args.command {
        Command::Init => cmd_init(&settings),
        Command::Config {
            command: ConfigCommand::Check { profile },
        } => cmd_check(&settings, Subject::Config, profile.as_deref()),
        Command::Profile {
            command: ProfileCommand::Init { file },
        } => cmd_profile_init(&file),
        Command::Profile {
            command: ProfileCommand::Check { file },
        } => cmd_check(&settings, Subject::Profile, Some(&file)),
        Command::Recommend {
            urls,
            source,
            profile,
        } => cmd_recommend(&settings, urls, source.as_deref(), profile.as_deref()),
    }
}

fn cmd_init(settings: &Settings) -> Result<ExitCode> {
    write_new_file(&settings.config_path, DEFAULT_CONFIG_TEMPLATE)
        .with_context(|| format!("failed to create {}", settings.config_path.display()))?;
    println!("Created {}", settings.config_path.display());
    println!("Set GEMINI_API_KEY, then run `ai-feed config check`.");
    Ok(ExitCode::SUCCESS)
}

fn cmd_profile_init(file: &Path) -> Result<ExitCode> {
    write_new_file(file, DEFAULT_PROFILE_TEMPLATE)
        .with_context(|| format!("failed to create {}", file.display()))?;
    println!("Created {}", file.display());
    println!(
        "Replace the placeholder tokens, then run `ai-feed profile check {}`.",
        file.display()
    );
    Ok(ExitCode::SUCCESS)
}

/// Load the config and merge `profile_path` over its default profile.
fn load_profile(settings: &Settings, profile_path: Option<&Path>) -> Result<(LoadedConfig, Profile)> {
    let loaded = Config::load_from(&settings.config_path)
        .and_then(|config| config.to_entity())
        .context("failed to load configuration")?;

    let mut profile = loaded.default_profile.clone();
    if let Some(path) = profile_path {
        let user = RawProfile::load_from(path)
            .and_then(|raw| raw.to_entity())
            .with_context(|| format!("failed to load profile {}", path.display()))?;
        profile.merge(&user);
    }
    Ok((loaded, profile))
}

fn cmd_check(settings: &Settings, subject: Subject, profile_path: Option<&Path>) -> Result<ExitCode> {
    let (loaded, profile) = load_profile(settings, profile_path)?;
    let result = validate(&profile);

    write_report(
        &mut io::stdout().lock(),
        subject,
        &result,
        loaded.cache.as_ref(),
        settings.verbose,
    )
    .context("failed to write report")?;

    Ok(if result.valid {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

fn cmd_recommend(
    settings: &Settings,
    urls: Vec<String>,
    source: Option<&Path>,
    profile_path: Option<&Path>,
) -> Result<ExitCode> {
    let urls = match source {
        Some(path) => feed::read_source_file(path)?,
        None => urls,
    };
    if urls.is_empty() {
        bail!("no feeds given; pass --url URL or --source FILE");
    }

    let (loaded, profile) = load_profile(settings, profile_path)?;
    let runtime = profile
        .into_runtime()
        .context("profile is not valid; run `ai-feed config check` for details")?;
    for warning in &runtime.validation.warnings {
        tracing::warn!("{}", warning);
    }
    tracing::info!(
        backend = runtime.backend.name(),
        destinations = runtime.destinations.len(),
        "Starting recommend run"
    );

    let has_destinations = !runtime.destinations.is_empty();
    let pipeline = Pipeline::new(runtime, loaded.cache);
    match recommend::run_blocking(&pipeline, &urls)? {
        Outcome::NothingNew { fetched } => {
            println!(
                "No new articles to recommend ({} fetched, all posted before)",
                fetched
            );
        }
        Outcome::Posted(recommendation) => {
            if has_destinations {
                println!(
                    "Recommended: {} <{}>",
                    recommendation.article.title, recommendation.article.link
                );
            }
        }
    }
    Ok(ExitCode::SUCCESS)
}
