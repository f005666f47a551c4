mod args;
mod commands;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use args::{Cli, Commands};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = cli.loglevel.as_filter();
    let filter = format!("ytmp3={level},ytmp3_core={level}");

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).without_time())
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .init();

    match cli.command {
        Some(Commands::Doctor) => commands::doctor::run(cli.config.as_deref()).await,
        Some(Commands::Config) => commands::config::run(cli.config.as_deref()).await,
        None => {
            if let Some(url_list) = cli.url_list {
                commands::download::run(&url_list, &cli.options, cli.config.as_deref()).await
            } else {
                use clap::CommandFactory;
                Cli::command().print_help()?;
                println!();
                std::process::exit(2);
            }
        }
    }
}
