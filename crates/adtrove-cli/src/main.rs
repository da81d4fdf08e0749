mod collect;
mod transport;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use crate::collect::CollectOptions;

#[derive(Debug, Parser)]
#[command(name = "adtrove-cli")]
#[command(about = "Collect ad creatives and manage the adtrove database")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Scrape an advertiser's ad library, enrich the creatives, and deliver them
    Collect {
        /// Advertiser name to search the ad library for
        #[arg(long)]
        advertiser: String,

        /// Platform label recorded on every ad
        #[arg(long, default_value = adtrove_core::DEFAULT_PLATFORM)]
        platform: String,

        /// Skip AI enrichment even when a vision model is configured
        #[arg(long)]
        no_enrich: bool,

        /// Override the configured maximum number of extraction passes
        #[arg(long)]
        max_passes: Option<usize>,

        /// Print the batch payload instead of delivering it
        #[arg(long)]
        dry_run: bool,

        /// Also write the batch payload to this file as JSON
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Database maintenance
    Db {
        #[command(subcommand)]
        command: DbCommands,
    },
}

#[derive(Debug, Clone, Copy, Subcommand)]
enum DbCommands {
    /// Verify the database is reachable
    Ping,
    /// Apply pending migrations
    Migrate,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    let config = adtrove_core::load_app_config()?;

    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Some(Commands::Collect {
            advertiser,
            platform,
            no_enrich,
            max_passes,
            dry_run,
            output,
        }) => {
            let options = CollectOptions {
                advertiser,
                platform,
                no_enrich,
                max_passes,
                dry_run,
                output,
            };
            collect::run_collect(&config, &options).await?;
        }
        Some(Commands::Db { command }) => run_db_command(&config, command).await?,
        None => println!("adtrove-cli: run with --help to list commands"),
    }

    Ok(())
}

async fn run_db_command(
    config: &adtrove_core::AppConfig,
    command: DbCommands,
) -> anyhow::Result<()> {
    let database_url = config.require_database_url()?;
    let pool_config = adtrove_db::PoolConfig::from_app_config(config);
    let pool = adtrove_db::connect_pool(database_url, pool_config).await?;

    match command {
        DbCommands::Ping => {
            adtrove_db::ping(&pool).await?;
            println!("database ok");
        }
        DbCommands::Migrate => {
            let applied = adtrove_db::run_migrations(&pool).await?;
            tracing::info!(applied, "migrations complete");
            println!("applied {applied} migration(s)");
        }
    }

    pool.close().await;
    Ok(())
}
