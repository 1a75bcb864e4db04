//! Rating aggregator CLI
//!
//! Local entry point: look up ratings, inspect the cache, check focus-mode
//! hosts and validate configuration.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use rating_aggregator::{
    config::{self, DEFAULT_CONFIG_PATH},
    error::{AppError, Result},
    models::{Config, Platform, RatingRequest, ResolutionOutcome},
    services::{RatingAggregator, RatingCache, focus},
    storage::LocalStore,
    utils::http::ReqwestTransport,
};

/// Competitive-programming rating aggregator
#[derive(Parser, Debug)]
#[command(
    name = "rating",
    version,
    about = "Codeforces, CodeChef, LeetCode and AtCoder ratings in one place"
)]
struct Cli {
    /// Path to the configuration file
    #[arg(short, long, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Fetch one rating
    Fetch {
        /// codeforces, codechef, leetcode or atcoder
        platform: String,

        username: String,

        /// Print the full response message as JSON
        #[arg(long)]
        json: bool,
    },

    /// Fetch every given handle concurrently
    All {
        #[arg(long)]
        codeforces: Option<String>,

        #[arg(long)]
        codechef: Option<String>,

        #[arg(long)]
        leetcode: Option<String>,

        #[arg(long)]
        atcoder: Option<String>,

        /// Print outcomes as JSON
        #[arg(long)]
        json: bool,
    },

    /// Inspect or clear the rating cache
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },

    /// Check whether a host or URL is allowed in focus mode
    Check {
        target: String,
    },

    /// Validate the configuration file
    Validate,

    /// Write a configuration file with the default settings
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

#[derive(Subcommand, Debug)]
enum CacheAction {
    /// List cached ratings
    List,

    /// Remove cached ratings (all of them when no filter is given)
    Clear {
        #[arg(long)]
        platform: Option<String>,

        #[arg(long)]
        username: Option<String>,
    },
}

/// Initialize logging based on verbosity flag and configured level.
fn init_logging(verbose: bool, level: &str) {
    let level = if verbose { "debug" } else { level };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp_secs()
        .init();
}

fn aggregator(config: &Config) -> Result<RatingAggregator> {
    let transport = Arc::new(ReqwestTransport::new(&config.http)?);
    let store = Arc::new(LocalStore::new(&config.cache.path));
    Ok(RatingAggregator::new(transport, store, config))
}

fn print_outcome(outcome: &ResolutionOutcome) {
    match outcome {
        ResolutionOutcome::Success(record) => println!("{record}"),
        other => println!(
            "{}",
            other.error_message().unwrap_or_else(|| "unknown outcome".to_string())
        ),
    }
}

/// Main entry point for the CLI application.
#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Validation and init must see the file as written, not the fallback.
    let config = match cli.command {
        Command::Validate | Command::Init { .. } => Config::default(),
        _ => config::load_config(&cli.config),
    };
    init_logging(cli.verbose, &config.logging.level);

    match cli.command {
        Command::Fetch {
            platform,
            username,
            json,
        } => {
            let aggregator = aggregator(&config)?;
            let response = aggregator
                .handle(RatingRequest { platform, username })
                .await;

            if json {
                println!("{}", serde_json::to_string_pretty(&response)?);
            } else {
                print_outcome(&response.data);
            }
        }

        Command::All {
            codeforces,
            codechef,
            leetcode,
            atcoder,
            json,
        } => {
            let requests: Vec<(Platform, String)> = [
                (Platform::Codeforces, codeforces),
                (Platform::CodeChef, codechef),
                (Platform::LeetCode, leetcode),
                (Platform::AtCoder, atcoder),
            ]
            .into_iter()
            .filter_map(|(platform, username)| username.map(|u| (platform, u)))
            .collect();

            if requests.is_empty() {
                return Err(AppError::validation(
                    "give at least one of --codeforces, --codechef, --leetcode, --atcoder",
                ));
            }

            let aggregator = aggregator(&config)?;
            let outcomes = aggregator.fetch_many(&requests).await;

            if json {
                println!("{}", serde_json::to_string_pretty(&outcomes)?);
            } else {
                for ((platform, username), outcome) in requests.iter().zip(&outcomes) {
                    print!("{:<10} {username:<20} ", platform.display_name());
                    print_outcome(outcome);
                }
            }
        }

        Command::Cache { action } => {
            let cache = RatingCache::new(Arc::new(LocalStore::new(&config.cache.path)));

            match action {
                CacheAction::List => {
                    let entries = cache.entries().await?;
                    if entries.is_empty() {
                        log::info!("Cache at {} is empty", config.cache.path);
                    }
                    for entry in entries {
                        println!(
                            "{:<10} {:<20} {} {}",
                            entry.platform.display_name(),
                            entry.username,
                            entry.stored_at.format("%Y-%m-%d %H:%M:%S UTC"),
                            if entry.fresh { "fresh" } else { "stale" }
                        );
                    }
                }

                CacheAction::Clear { platform, username } => {
                    let platform = platform.map(|p| p.parse::<Platform>()).transpose()?;
                    let removed = match (platform, username) {
                        (Some(platform), Some(username)) => {
                            cache.clear_user(platform, &username).await?
                        }
                        (Some(platform), None) => cache.clear_platform(platform).await?,
                        (None, Some(username)) => cache.clear_username(&username).await?,
                        (None, None) => cache.clear_all().await?,
                    };
                    log::info!("Removed {removed} cached rating(s)");
                }
            }
        }

        Command::Check { target } => {
            let host = focus::host_of(&target)
                .ok_or_else(|| AppError::validation(format!("no host in {target:?}")))?;
            let mut focus_config = config.focus.clone();
            focus_config.enabled = true;

            let verdict = if focus::is_allowed(&host, &focus_config) {
                "allowed"
            } else {
                "blocked"
            };
            println!("{host}: {verdict} in focus mode");
            if !config.focus.enabled {
                log::info!("Focus mode is currently disabled in {}", cli.config.display());
            }
        }

        Command::Validate => {
            log::info!("Validating {}...", cli.config.display());

            if let Err(e) = config::load_config_strict(&cli.config) {
                log::error!("Config validation failed: {}", e);
                return Err(e);
            }
            log::info!("✓ Config OK");
        }

        Command::Init { force } => {
            config::write_config(&cli.config, &Config::default(), force)?;
            log::info!("Wrote default configuration to {}", cli.config.display());
        }
    }

    Ok(())
}
