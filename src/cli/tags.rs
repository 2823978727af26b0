//! Tags command - shows the invalidation tags of a query shape

use std::sync::Arc;

use anyhow::anyhow;
use clap::Args;

use crate::config::AppConfig;
use crate::domain::cache::{KeyNamespace, TagResolver};
use crate::domain::model::{EagerLoads, ModelRegistry};

/// Arguments for the tags command
#[derive(Args, Clone, Debug)]
pub struct TagsArgs {
    /// Registered entity type name
    #[arg(long)]
    pub model: String,

    /// Eager-loaded relation path, dotted for nesting (repeatable)
    #[arg(long = "with", value_name = "RELATION")]
    pub with: Vec<String>,
}

/// Run the tags command, printing one tag per line
pub fn run(config: &AppConfig, args: TagsArgs) -> anyhow::Result<()> {
    for tag in derive(config, &args)? {
        println!("{}", tag);
    }

    Ok(())
}

pub fn derive(config: &AppConfig, args: &TagsArgs) -> anyhow::Result<Vec<String>> {
    let registry = Arc::new(ModelRegistry::from_descriptors(config.models.iter().cloned()));
    let model = registry
        .get(&args.model)
        .ok_or_else(|| anyhow!("Model '{}' is not registered", args.model))?;

    let eager = args
        .with
        .iter()
        .fold(EagerLoads::new(), |eager, path| eager.with(path.as_str()));

    let namespace = KeyNamespace::new(
        config.cache.prefix.clone(),
        config.cache.use_database_keying,
    );
    let resolver = TagResolver::new(registry, namespace);

    Ok(resolver.make_tags(&model, &eager).iter().map(String::from).collect())
}
