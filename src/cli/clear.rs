//! Clear command - flushes cached query results

use clap::Args;
use tracing::info;

use crate::config::AppConfig;
use crate::infrastructure::services::ModelCaching;

/// Arguments for the clear command
#[derive(Args, Clone, Debug)]
pub struct ClearArgs {
    /// Entity type whose cached results are cleared; every store is flushed when omitted
    #[arg(long)]
    pub model: Option<String>,
}

/// Run the clear command, returning whether anything was cleared
pub async fn run(config: &AppConfig, args: ClearArgs) -> anyhow::Result<bool> {
    let caching = ModelCaching::from_config(config).await?;
    Ok(clear(&caching, args.model.as_deref()).await)
}

pub async fn clear(caching: &ModelCaching, model: Option<&str>) -> bool {
    let cleared = match model {
        Some(name) => caching.clear_model(name).await,
        None => caching.clear_all().await,
    };

    info!(model = model.unwrap_or("*"), cleared, "Clear command finished");
    cleared
}
