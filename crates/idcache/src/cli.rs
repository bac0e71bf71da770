//! Command-line arguments.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "idcache")]
#[command(about = "Inspect and convert OAuth2 token cache files")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Unified cache file (overrides settings and `IDCACHE_CACHE`)
    #[arg(long, global = true, env = "IDCACHE_CACHE")]
    pub cache: Option<PathBuf>,

    /// Legacy cache file (overrides settings and `IDCACHE_LEGACY_CACHE`)
    #[arg(long, global = true, env = "IDCACHE_LEGACY_CACHE")]
    pub legacy_cache: Option<PathBuf>,

    /// Print machine-readable JSON instead of text
    #[arg(long, global = true)]
    pub json: bool,

    /// Do not query instance discovery; every host is its own only alias
    #[arg(long, global = true)]
    pub offline: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Summarize the entries of the unified cache (secrets are never shown)
    Inspect,
    /// List accounts signed in for a client
    Accounts(AccountsArgs),
    /// Write user refresh tokens from the unified cache into the legacy cache
    ExportLegacy,
    /// Import users from the legacy cache into the unified cache
    ImportLegacy,
    /// Remove every entry from both caches
    Clear,
    /// Resolve the alias set of an authority host
    Aliases(AliasesArgs),
    /// Manage CLI settings
    Config(ConfigArgs),
}

#[derive(clap::Args)]
pub struct AccountsArgs {
    /// Client (application) id
    #[arg(long)]
    pub client_id: String,
    /// Authority URL
    #[arg(long, default_value = "https://login.microsoftonline.com/common/")]
    pub authority: String,
}

#[derive(clap::Args)]
pub struct AliasesArgs {
    /// Authority URL (e.g. `https://login.microsoftonline.com/contoso.onmicrosoft.com/`)
    pub authority: String,
}

#[derive(clap::Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommands,
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Show current settings
    Show,
    /// Set a setting (`cache_path`, `legacy_path`, `log_filter`)
    Set(ConfigSetArgs),
}

#[derive(clap::Args)]
pub struct ConfigSetArgs {
    /// Setting name
    pub key: String,
    /// New value
    pub value: String,
}
