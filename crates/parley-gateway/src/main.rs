use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing::{info, warn};

use parley_agent::{AgentRuntime, GeminiClient};
use parley_core::config::ParleyConfig;
use parley_discord::DiscordAdapter;

mod app;

#[derive(Parser)]
#[command(name = "parley")]
#[command(about = "Discord relay for a generative text service", long_about = None)]
#[command(version)]
struct Cli {
    /// Config file. Falls back to $PARLEY_CONFIG, then ~/.parley/parley.toml.
    #[arg(long, short)]
    config: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "parley=info,parley_agent=info,parley_discord=info,serenity=warn".into()),
        )
        .init();

    let cli = Cli::parse();
    let config_path = cli.config.or_else(|| std::env::var("PARLEY_CONFIG").ok());
    let config = ParleyConfig::load(config_path.as_deref()).context("loading configuration")?;
    config.validate().context("invalid configuration")?;

    let client = GeminiClient::new(&config.gemini);
    let agent = AgentRuntime::new(Box::new(client))
        .with_max_turns(config.limits.max_transcript_turns);
    info!(
        model = %agent.model(),
        provider = %agent.provider_name(),
        hard_limit = config.format.hard_limit,
        max_transcript_turns = config.limits.max_transcript_turns,
        max_chunks = config.format.max_chunks,
        "relay configured"
    );

    let state = Arc::new(app::AppState::new(config, agent));
    let adapter = DiscordAdapter::new(&state.config.discord, Arc::clone(&state));

    tokio::select! {
        result = adapter.run() => result.context("Discord adapter stopped")?,
        signal = tokio::signal::ctrl_c() => {
            signal.context("waiting for shutdown signal")?;
            warn!(
                total_requests = state.agent.tally().get(),
                "shutdown requested, exiting"
            );
        }
    }

    Ok(())
}
