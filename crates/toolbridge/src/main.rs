//! Toolbridge command-line interface.

mod cli;

use anyhow::Result;
use clap::Parser;
use cli::{Cli, Commands};
use toolbridge::init_tracing;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let config = cli::load_config(cli.config.as_deref(), cli.host_url.as_deref())?;
    init_tracing(&config.diagnostics)?;

    match cli.command {
        Commands::Tools { provider, report } => cli::handle_tools(config, &provider, report).await,
        Commands::Call {
            name,
            args,
            provider,
        } => cli::handle_call(config, &name, &args, &provider).await,
        Commands::Health => cli::handle_health(config).await,
        Commands::Metrics => cli::handle_metrics(config).await,
        Commands::Chat {
            prompt,
            provider,
            model,
            base_url,
        } => cli::handle_chat(config, &prompt, &provider, &model, base_url.as_deref()).await,
    }
}
