use std::process::ExitCode;

use clap::Parser;
use model_cache::cli::{self, Cli, Command};

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();
    let config = cli::bootstrap(cli.config.as_deref())?;

    match cli.command {
        Command::Clear(args) => {
            let cleared = cli::clear::run(&config, args).await?;
            Ok(if cleared {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            })
        }
        Command::Tags(args) => {
            cli::tags::run(&config, args)?;
            Ok(ExitCode::SUCCESS)
        }
    }
}
