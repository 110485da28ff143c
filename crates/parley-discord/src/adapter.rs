use std::sync::Arc;
use std::time::Duration;

use serenity::model::gateway::GatewayIntents;
use serenity::Client;
use tracing::{error, info, warn};

use parley_agent::pipeline::RelayContext;
use parley_core::config::DiscordConfig;

use crate::error::DiscordError;
use crate::handler::RelayHandler;

/// Discord channel adapter.
///
/// Wraps a serenity `Client` and drives the gateway until the process exits,
/// rebuilding the client whenever the connection drops.
pub struct DiscordAdapter<C: RelayContext + 'static> {
    ctx: Arc<C>,
    config: DiscordConfig,
}

impl<C: RelayContext + 'static> DiscordAdapter<C> {
    pub fn new(config: &DiscordConfig, ctx: Arc<C>) -> Self {
        Self {
            ctx,
            config: config.clone(),
        }
    }

    /// Connect and keep reconnecting. Only returns on a missing token.
    pub async fn run(self) -> Result<(), DiscordError> {
        if self.config.bot_token.trim().is_empty() {
            return Err(DiscordError::NoToken);
        }

        let intents = GatewayIntents::GUILDS
            | GatewayIntents::GUILD_MESSAGES
            | GatewayIntents::DIRECT_MESSAGES
            | GatewayIntents::MESSAGE_CONTENT;

        loop {
            let mut client = self.connect(intents).await;
            info!("Discord: gateway connecting");

            if let Err(e) = client.start().await {
                warn!("Discord: gateway error ({e}), reconnecting in 5s");
            } else {
                info!("Discord: gateway stopped cleanly, reconnecting in 5s");
            }

            tokio::time::sleep(Duration::from_secs(5)).await;
        }
    }

    /// Build a client, retrying until serenity accepts the configuration.
    async fn connect(&self, intents: GatewayIntents) -> Client {
        loop {
            match self.build_client(intents).await {
                Ok(c) => return c,
                Err(e) => {
                    error!("Discord: client setup failed ({e}), retrying in 30s");
                    tokio::time::sleep(Duration::from_secs(30)).await;
                }
            }
        }
    }

    async fn build_client(&self, intents: GatewayIntents) -> Result<Client, DiscordError> {
        let handler = RelayHandler {
            ctx: Arc::clone(&self.ctx),
            config: self.config.clone(),
        };

        let client = Client::builder(&self.config.bot_token, intents)
            .event_handler(handler)
            .await?;
        Ok(client)
    }
}
