//! `idcache` - inspect and convert OAuth2 token cache files.
//!
//! Works on the unified JSON cache written by `idcache-core` and on the
//! legacy flat cache shared with older clients.

#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

mod cli;
mod commands;
mod settings;

use anyhow::Result;
use clap::Parser;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use cli::{Cli, Commands, ConfigCommands};
use commands::CachePaths;
use settings::Settings;

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();
    let mut settings = Settings::load().await?;

    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| settings.log_filter.clone().into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let paths = CachePaths {
        cache: cli.cache.clone().unwrap_or_else(|| settings.cache_path.clone()),
        legacy: cli
            .legacy_cache
            .clone()
            .unwrap_or_else(|| settings.legacy_path.clone()),
    };

    match &cli.command {
        Commands::Inspect => commands::inspect(&paths, cli.json).await?,
        Commands::Accounts(args) => {
            let resolver = commands::resolver(cli.offline)?;
            commands::accounts(&paths, resolver, &args.client_id, &args.authority, cli.json).await?;
        }
        Commands::ExportLegacy => {
            let exported = commands::export_legacy(&paths).await?;
            println!("Exported {exported} entries to {}", paths.legacy.display());
        }
        Commands::ImportLegacy => {
            let imported = commands::import_legacy(&paths).await?;
            println!("Imported {imported} entities into {}", paths.cache.display());
        }
        Commands::Clear => {
            commands::clear(&paths);
            info!("Cleared {} and {}", paths.cache.display(), paths.legacy.display());
            println!("Cleared token caches");
        }
        Commands::Aliases(args) => {
            let resolver = commands::resolver(cli.offline)?;
            commands::aliases(resolver, &args.authority, cli.json).await?;
        }
        Commands::Config(args) => match &args.command {
            ConfigCommands::Show => {
                println!("Settings file: {}", Settings::path().display());
                println!("cache_path:    {}", settings.cache_path.display());
                println!("legacy_path:   {}", settings.legacy_path.display());
                println!("log_filter:    {}", settings.log_filter);
            }
            ConfigCommands::Set(set_args) => {
                settings.set(&set_args.key, &set_args.value)?;
                settings.save().await?;
                println!("Set {} = {}", set_args.key, set_args.value);
            }
        },
    }

    Ok(())
}
