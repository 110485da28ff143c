use std::sync::Arc;

use serenity::all::ActivityData;
use serenity::async_trait;
use serenity::model::application::Interaction;
use serenity::model::channel::Message;
use serenity::model::gateway::Ready;
use serenity::model::id::GuildId;
use serenity::model::user::OnlineStatus;
use serenity::prelude::{Context, EventHandler};
use tracing::{info, warn};

use parley_agent::pipeline::{clear_message, stats_message, RelayContext};
use parley_core::config::DiscordConfig;

/// Serenity event handler wired to the relay pipeline.
pub struct RelayHandler<C: RelayContext + 'static> {
    pub ctx: Arc<C>,
    pub config: DiscordConfig,
}

/// Text commands understood in plain channel messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrefixCommand {
    Stats,
    Clear,
}

#[async_trait]
impl<C: RelayContext + 'static> EventHandler for RelayHandler<C> {
    async fn ready(&self, ctx: Context, ready: Ready) {
        let status = parse_online_status(&self.config.status);
        let activity = build_activity(&self.config);
        ctx.set_presence(activity, status);

        info!(name = %ready.user.name, guilds = ready.guilds.len(), "Discord bot connected");

        crate::commands::register_commands(&ctx, self.config.guild_id.map(GuildId::new)).await;
    }

    async fn message(&self, ctx: Context, msg: Message) {
        if msg.author.bot {
            return;
        }
        let Some(command) = parse_prefix_command(&msg.content, &self.config.command_prefix) else {
            return;
        };

        let reply = match command {
            PrefixCommand::Stats => stats_message(self.ctx.as_ref()),
            PrefixCommand::Clear => {
                let text = clear_message(self.ctx.as_ref());
                info!(user = %msg.author.name, "conversation cleared via text command");
                text
            }
        };

        if let Err(e) = msg.channel_id.say(&ctx.http, reply).await {
            warn!(error = %e, channel = %msg.channel_id, "failed to answer text command");
        }
    }

    async fn interaction_create(&self, ctx: Context, interaction: Interaction) {
        if let Interaction::Command(command) = interaction {
            let app = Arc::clone(&self.ctx);
            // Generation can take a while; keep the gateway loop free.
            tokio::spawn(async move {
                crate::commands::handle_interaction(&app, &ctx, command).await;
            });
        }
    }
}

/// Recognise `!stats` / `!clear` style messages. Anything after the command
/// word is ignored; unknown words are not commands.
pub fn parse_prefix_command(content: &str, prefix: &str) -> Option<PrefixCommand> {
    if prefix.is_empty() {
        return None;
    }
    let rest = content.trim().strip_prefix(prefix)?;
    match rest.split_whitespace().next()?.to_lowercase().as_str() {
        "stats" => Some(PrefixCommand::Stats),
        "clear" => Some(PrefixCommand::Clear),
        _ => None,
    }
}

/// Parse a config status string into serenity's `OnlineStatus`.
fn parse_online_status(s: &str) -> OnlineStatus {
    match s.to_lowercase().as_str() {
        "idle" => OnlineStatus::Idle,
        "dnd" | "do_not_disturb" => OnlineStatus::DoNotDisturb,
        "invisible" => OnlineStatus::Invisible,
        _ => OnlineStatus::Online,
    }
}

fn build_activity(config: &DiscordConfig) -> Option<ActivityData> {
    config.activity_name.as_deref().map(ActivityData::listening)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefix_commands() {
        assert_eq!(parse_prefix_command("!stats", "!"), Some(PrefixCommand::Stats));
        assert_eq!(parse_prefix_command("  !clear now", "!"), Some(PrefixCommand::Clear));
        assert_eq!(parse_prefix_command("!STATS", "!"), Some(PrefixCommand::Stats));
        assert_eq!(parse_prefix_command("?stats", "!"), None);
        assert_eq!(parse_prefix_command("!ask hi", "!"), None);
        assert_eq!(parse_prefix_command("!", "!"), None);
        assert_eq!(parse_prefix_command("stats", ""), None);
    }

    #[test]
    fn multi_char_prefix() {
        assert_eq!(parse_prefix_command("p!stats", "p!"), Some(PrefixCommand::Stats));
        assert_eq!(parse_prefix_command("!stats", "p!"), None);
    }

    #[test]
    fn status_parsing_defaults_to_online() {
        assert_eq!(parse_online_status("DND"), OnlineStatus::DoNotDisturb);
        assert_eq!(parse_online_status("idle"), OnlineStatus::Idle);
        assert_eq!(parse_online_status("whatever"), OnlineStatus::Online);
    }

    #[test]
    fn activity_only_when_named() {
        assert!(build_activity(&DiscordConfig::default()).is_none());
        let config = DiscordConfig {
            activity_name: Some("/ask".into()),
            ..DiscordConfig::default()
        };
        assert!(build_activity(&config).is_some());
    }
}
