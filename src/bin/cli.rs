//! Race crawler CLI
//!
//! Runs a single pipeline once or serves all of them on their cron schedule.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use race_crawler::{
    error::{AppError, Result},
    models::Config,
    pipeline::{self, Context, PipelineKind},
    storage::{LocalStore, StoreProvider},
    utils::{http::HttpTransport, render::Renderer},
};

/// Race crawler for the Swiss orienteering federation
#[derive(Parser, Debug)]
#[command(name = "race-crawler", version, about = "SOLV race, start list and news crawler")]
struct Cli {
    /// Path to the configuration file
    #[arg(short, long, default_value = "storage/config.toml")]
    config: PathBuf,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run one pipeline once
    Run {
        #[arg(value_enum)]
        pipeline: PipelineKind,
    },

    /// Run pipelines on their configured cron schedule until Ctrl-C
    Serve {
        /// Only schedule these pipelines (default: all)
        #[arg(long, value_enum, value_delimiter = ',')]
        only: Vec<PipelineKind>,
    },

    /// Validate the configuration file
    Validate,

    /// Show item counts of the store
    Info,
}

/// Initialize logging based on verbosity flag.
fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp_secs()
        .init();
}

#[cfg(feature = "render")]
fn renderer() -> Arc<dyn Renderer> {
    Arc::new(race_crawler::utils::render::ChromiumRenderer::new())
}

#[cfg(not(feature = "render"))]
fn renderer() -> Arc<dyn Renderer> {
    Arc::new(Unavailable)
}

/// Stand-in when built without the `render` feature.
#[cfg(not(feature = "render"))]
struct Unavailable;

#[cfg(not(feature = "render"))]
#[async_trait::async_trait]
impl Renderer for Unavailable {
    async fn acquire(&self) -> Result<Box<dyn race_crawler::utils::render::RenderSession>> {
        Err(AppError::render(
            "built without the `render` feature, no headless browser available",
        ))
    }
}

fn build_context(config: Arc<Config>) -> Result<Context> {
    Ok(Context {
        transport: Arc::new(HttpTransport::new(&config.crawler)?),
        renderer: renderer(),
        store: Arc::new(LocalStore::new(&config.storage.root_dir)),
        config,
    })
}

/// Main entry point for the CLI application.
#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let mut config = Config::load_or_default(&cli.config);
    config.apply_env_overrides();
    log::info!("Loaded configuration from {}", cli.config.display());

    match cli.command {
        Command::Run { pipeline: kind } => {
            config.validate()?;
            let ctx = build_context(Arc::new(config))?;
            if !pipeline::run(kind, &ctx).await {
                return Err(AppError::crawl(kind.name(), "pipeline failed, see log"));
            }
        }

        Command::Serve { only } => {
            config.validate()?;
            let kinds = if only.is_empty() {
                PipelineKind::ALL.to_vec()
            } else {
                only
            };
            // fail on a missing cron expression before building any client
            pipeline::schedule::plan(&config.schedule, &kinds)?;
            let ctx = build_context(Arc::new(config))?;
            pipeline::serve(Arc::new(ctx), &kinds).await?;
        }

        Command::Validate => {
            log::info!("Validating configuration...");

            if let Err(e) = config.validate() {
                log::error!("Config validation failed: {}", e);
                return Err(e);
            }
            for kind in PipelineKind::ALL {
                match kind.cron(&config.schedule) {
                    Some(cron) => log::info!("✓ {kind}: '{cron}'"),
                    None => log::warn!("{kind}: no schedule, can only be run manually"),
                }
            }
            log::info!("All validations passed!");
        }

        Command::Info => {
            let store = LocalStore::new(&config.storage.root_dir);
            log::info!("Store directory: {}", store.root_dir().display());

            let collections = store.collections().await?;
            if collections.is_empty() {
                log::info!("No items stored yet.");
            }
            for name in collections {
                let count = store
                    .items(&name)
                    .read_by_query(&Default::default())
                    .await?
                    .len();
                log::info!("{name}: {count} items");
            }
        }
    }

    log::info!("Done!");

    Ok(())
}
