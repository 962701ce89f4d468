//! Campaign crawler CLI
//!
//! Local execution entry point.

use std::path::PathBuf;

use campaign_crawler::{
    error::{AppError, Result},
    models::{Config, SourceConfig},
    pipeline::{self, DeadlineFilter},
    storage::LocalStorage,
    sync::{ArchiveOptions, CampaignSink, NotionSink},
    utils::http::HttpFetcher,
};
use chrono::{SubsecRound, Utc};
use clap::{Parser, Subcommand};

/// Promotional campaign crawler
#[derive(Parser, Debug)]
#[command(
    name = "campaign-crawler",
    version,
    about = "Collects promotional campaigns and syncs them to Notion"
)]
struct Cli {
    /// Path to the crawler settings file
    #[arg(long, default_value = "config.toml")]
    settings: PathBuf,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Crawl all sources, write the snapshot and upsert everything
    Run {
        /// Path to sources.json (default: paths.sources_file)
        #[arg(long)]
        sources: Option<PathBuf>,

        /// Snapshot output path (default: paths.snapshot_file)
        #[arg(long)]
        out: Option<PathBuf>,

        /// Skip the Notion sync
        #[arg(long)]
        no_sync: bool,

        /// Keep campaigns whose deadline is within N days from today
        #[arg(long, value_name = "N")]
        valid_within_days: Option<u32>,

        /// Drop campaigns without a readable deadline
        #[arg(long)]
        require_deadline: bool,

        /// Keep only campaigns with a future deadline (ignores the window)
        #[arg(long)]
        active_only: bool,
    },

    /// Report campaigns new this week and archive expired ones
    Weekly {
        /// Path to sources.json (default: paths.sources_file)
        #[arg(long)]
        sources: Option<PathBuf>,

        /// Snapshot output path (default: paths.snapshot_file)
        #[arg(long)]
        out: Option<PathBuf>,

        /// Persistent state file (default: paths.state_file)
        #[arg(long)]
        state_file: Option<PathBuf>,

        /// Skip the Notion sync
        #[arg(long)]
        no_sync: bool,

        /// Also move expired pages to the Notion trash
        #[arg(long)]
        archive_pages: bool,
    },

    /// Declare the required properties on the Notion database
    SetupSchema,

    /// Validate the settings and sources files
    Validate,
}

/// Initialize logging based on verbosity flag.
fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp_secs()
        .init();
}

/// Notion sink from the environment, unless sync is disabled.
fn sink(no_sync: bool) -> Option<NotionSink> {
    if no_sync {
        log::info!("Sync disabled");
        return None;
    }
    let sink = NotionSink::from_env();
    if sink.is_none() {
        log::info!("Notion not configured. Skipping sync.");
    }
    sink
}

/// Main entry point for the CLI application.
#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let mut config = Config::load_or_default(&cli.settings);
    log::debug!("Loaded configuration from {}", cli.settings.display());

    match cli.command {
        Command::Run {
            sources,
            out,
            no_sync,
            valid_within_days,
            require_deadline,
            active_only,
        } => {
            if let Some(path) = sources {
                config.paths.sources_file = path;
            }
            if let Some(path) = out {
                config.paths.snapshot_file = path;
            }

            let filter = if active_only {
                DeadlineFilter::active_only()
            } else {
                DeadlineFilter {
                    valid_within_days,
                    require_deadline,
                }
            };

            let sources = SourceConfig::load_all(&config.paths.sources_file)?;
            let fetcher = HttpFetcher::new(&config.crawler)?;
            let storage = LocalStorage::new(&config.paths);

            let items = pipeline::run_crawler(
                &sources,
                &fetcher,
                &storage,
                &filter,
                Utc::now().date_naive(),
            )
            .await?;

            if let Some(sink) = sink(no_sync) {
                if let Err(e) = sink.upsert(&items).await {
                    log::error!("Upsert failed: {}", e);
                }
            }
        }

        Command::Weekly {
            sources,
            out,
            state_file,
            no_sync,
            archive_pages,
        } => {
            if let Some(path) = sources {
                config.paths.sources_file = path;
            }
            if let Some(path) = out {
                config.paths.snapshot_file = path;
            }
            if let Some(path) = state_file {
                config.paths.state_file = path;
            }

            let sources = SourceConfig::load_all(&config.paths.sources_file)?;
            let fetcher = HttpFetcher::new(&config.crawler)?;
            let storage = LocalStorage::new(&config.paths);
            let sink = sink(no_sync).map(|s| {
                s.with_archive_options(ArchiveOptions {
                    set_status: true,
                    archive_page: archive_pages,
                })
            });

            let outcome = pipeline::run_weekly(
                &sources,
                &fetcher,
                &storage,
                sink.as_ref().map(|s| s as &dyn CampaignSink),
                config.weekly.window_days,
                Utc::now().trunc_subsecs(0),
            )
            .await?;

            log::info!(
                "Weekly complete: {} new, {} expired",
                outcome.new_items.len(),
                outcome.expired_ids.len()
            );
        }

        Command::SetupSchema => {
            let sink = NotionSink::from_env().ok_or_else(|| {
                AppError::config("NOTION_TOKEN and NOTION_DATABASE_ID must be set")
            })?;
            sink.ensure_schema().await?;
        }

        Command::Validate => {
            log::info!("Validating configuration...");

            if let Err(e) = config.validate() {
                log::error!("Config validation failed: {}", e);
                return Err(e);
            }
            log::info!("✓ Settings OK ({})", cli.settings.display());

            let sources = SourceConfig::load_all(&config.paths.sources_file)?;
            let mut invalid = 0;
            for (i, source) in sources.iter().enumerate() {
                if source.disabled {
                    continue;
                }
                if let Err(e) = source.validate() {
                    log::error!("Source #{}: {}", i, e);
                    invalid += 1;
                }
            }
            if invalid > 0 {
                return Err(AppError::validation(format!(
                    "{} of {} sources are invalid",
                    invalid,
                    sources.len()
                )));
            }
            log::info!(
                "✓ Sources OK ({} sources, {} disabled)",
                sources.len(),
                sources.iter().filter(|s| s.disabled).count()
            );

            log::info!("All validations passed!");
        }
    }

    log::info!("Done!");

    Ok(())
}
