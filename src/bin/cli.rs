//! jobwatch CLI
//!
//! Runs check cycles once or on an interval.

use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand};
use jobwatch::{
    config::load_config,
    error::Result,
    models::Config,
    pipeline::{self, CycleOptions, CycleSummary, SourcePlan},
    services::{Dispatcher, ExtractorRegistry, HttpFetcher},
    storage::{LocalStorage, StateStore},
    utils::http,
};

/// jobwatch - Job Posting Watcher
#[derive(Parser, Debug)]
#[command(
    name = "jobwatch",
    version,
    about = "Watches recruiting pages and notifies about new job postings"
)]
struct Cli {
    /// Path to storage directory containing config and state files
    #[arg(short, long, default_value = "storage")]
    storage_dir: PathBuf,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run a single check cycle
    Check,

    /// Run check cycles until interrupted
    Watch {
        /// Minutes between cycles (overrides config)
        #[arg(long)]
        interval: Option<u64>,
    },

    /// Validate configuration and extraction strategies
    Validate,

    /// Show configured sources and stored state
    Info,
}

/// Everything a cycle needs, built once per process.
struct Watcher {
    plans: Vec<SourcePlan>,
    registry: ExtractorRegistry,
    fetcher: HttpFetcher,
    dispatcher: Dispatcher,
    storage: LocalStorage,
    options: CycleOptions,
}

impl Watcher {
    fn new(config: &Config, storage: LocalStorage) -> Result<Self> {
        config.validate()?;
        let registry = ExtractorRegistry::from_config(config)?;
        let client = http::create_async_client(&config.fetch)?;

        if !config.telegram.is_configured() {
            log::warn!("Telegram credentials missing; new postings will only be logged");
        }

        Ok(Self {
            plans: SourcePlan::from_config(config),
            registry,
            fetcher: HttpFetcher::with_client(client.clone()),
            dispatcher: Dispatcher::from_config(&config.telegram, client),
            storage,
            options: CycleOptions {
                notify_on_first_run: config.watcher.notify_on_first_run,
            },
        })
    }

    async fn run_once(&self) -> Result<CycleSummary> {
        let summary = pipeline::run_check_cycle(
            &self.plans,
            &self.registry,
            &self.fetcher,
            &self.dispatcher,
            &self.storage,
            self.options,
        )
        .await?;
        log_summary(&summary);
        Ok(summary)
    }
}

fn log_summary(summary: &CycleSummary) {
    let elapsed = summary.finished_at - summary.started_at;
    log::info!(
        "Cycle finished in {}ms: {} sources, {} matching, {} new, {} failed",
        elapsed.num_milliseconds(),
        summary.sources.len(),
        summary.total_found(),
        summary.total_new(),
        summary.failed_sources()
    );
    if let Some(report) = summary.dispatch {
        if report.failed > 0 {
            log::warn!(
                "{} notification(s) delivered, {} failed",
                report.delivered,
                report.failed
            );
        }
    }
    if !summary.saved {
        log::warn!("State was not saved this cycle");
    }
}

/// Initialize logging based on verbosity flag.
fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp_secs()
        .init();
}

/// Main entry point for the CLI application.
#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = load_config(&cli.storage_dir);
    log::info!("Loaded configuration from {}", cli.storage_dir.display());

    let storage = LocalStorage::with_state_file(&cli.storage_dir, &config.watcher.state_file);

    match cli.command {
        Command::Check => {
            let watcher = Watcher::new(&config, storage)?;
            watcher.run_once().await?;
        }

        Command::Watch { interval } => {
            let minutes = interval.unwrap_or(config.watcher.interval_minutes).max(1);
            let watcher = Watcher::new(&config, storage)?;
            log::info!(
                "Watching {} sources every {} minute(s)",
                watcher.plans.len(),
                minutes
            );

            let shutdown = async {
                match tokio::signal::ctrl_c().await {
                    Ok(()) => log::info!("Interrupted, shutting down"),
                    Err(e) => {
                        log::error!("Cannot listen for Ctrl-C: {}", e);
                        std::future::pending::<()>().await;
                    }
                }
            };

            let watcher = &watcher;
            let cycles = pipeline::run_every(
                Duration::from_secs(minutes * 60),
                shutdown,
                move || async move {
                    if let Err(e) = watcher.run_once().await {
                        log::error!("Check cycle failed: {}", e);
                    }
                },
            )
            .await;
            log::info!("Stopped after {} cycle(s)", cycles);
        }

        Command::Validate => {
            pipeline::run_validate(&config)?;
            log::info!("All validations passed!");
        }

        Command::Info => {
            log::info!("Storage directory: {}", cli.storage_dir.display());
            log::info!(
                "Telegram: {}",
                if config.telegram.is_configured() {
                    "configured"
                } else {
                    "not configured"
                }
            );
            log::info!("Interval: {} minute(s)", config.watcher.interval_minutes);

            let state = storage.load().await;
            log::info!(
                "State file {}: {} fingerprints",
                storage.state_path().display(),
                state.total()
            );
            for (name, seen) in state.counts() {
                let configured = config.sources.iter().any(|s| s.name == name);
                log::info!(
                    "    {}: {} seen{}",
                    name,
                    seen,
                    if configured { "" } else { " (not in config)" }
                );
            }
            for source in &config.sources {
                if state.seen_count(&source.name) == 0 {
                    log::info!("    {}: nothing recorded yet", source.name);
                }
            }
        }
    }

    log::info!("Done!");

    Ok(())
}
