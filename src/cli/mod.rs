//! CLI module for the model cache
//!
//! Administrative subcommands run against the configured stores:
//! - `clear`: flush cached query results, for one entity type or all of them
//! - `tags`: print the invalidation tags a query would carry

pub mod clear;
pub mod tags;

use clap::{Parser, Subcommand};

use crate::config::AppConfig;
use crate::infrastructure::logging;

/// Model cache - read-through query cache administration
#[derive(Parser)]
#[command(name = "model-cache")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Extra configuration file layered over config/default and config/local
    #[arg(long, global = true)]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Clear cached query results
    Clear(clear::ClearArgs),

    /// Print the tags derived for an entity type and its eager loads
    Tags(tags::TagsArgs),
}

/// Loads `.env`, the layered configuration and the tracing subscriber
pub fn bootstrap(path: Option<&str>) -> anyhow::Result<AppConfig> {
    dotenvy::dotenv().ok();

    let config = AppConfig::load_from(path)?;
    logging::init_logging(&config.logging);

    Ok(config)
}
