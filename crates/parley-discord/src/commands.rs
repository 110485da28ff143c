//! Discord slash commands: `/ask`, `/quick`, `/stats`, `/clear`.
//!
//! Registration happens in `ready()`. Interactions are dispatched from
//! `interaction_create` in the event handler.

use std::sync::Arc;

use serenity::builder::{
    CreateCommand, CreateCommandOption, CreateInteractionResponse,
    CreateInteractionResponseMessage,
};
use serenity::model::application::{CommandDataOption, CommandInteraction, CommandOptionType};
use serenity::model::id::GuildId;
use serenity::prelude::Context;
use tracing::{info, warn};

use parley_agent::pipeline::{
    clear_message, run_request, stats_message, Mode, RelayContext, RelayRequest,
};

use crate::transport::InteractionTransport;

/// Name of the text option carried by `/ask` and `/quick`.
pub const QUESTION_OPTION: &str = "question";

/// Slash command definitions, in registration order.
pub fn command_definitions() -> Vec<CreateCommand> {
    let question = |description: &str| {
        CreateCommandOption::new(CommandOptionType::String, QUESTION_OPTION, description)
            .required(true)
    };
    vec![
        CreateCommand::new("ask")
            .description("Ask the assistant a question")
            .add_option(question("Your question")),
        CreateCommand::new("quick")
            .description("Get a short answer in a single message")
            .add_option(question("Your question")),
        CreateCommand::new("stats").description("Show bot statistics"),
        CreateCommand::new("clear").description("Start a fresh conversation"),
    ]
}

/// Register slash commands on `guild_id`, or globally when `None`.
pub async fn register_commands(ctx: &Context, guild_id: Option<GuildId>) {
    let commands = command_definitions();

    match guild_id {
        Some(gid) => match gid.set_commands(&ctx.http, commands).await {
            Ok(cmds) => info!(guild = %gid, count = cmds.len(), "registered guild slash commands"),
            Err(e) => warn!(guild = %gid, error = %e, "failed to register guild commands"),
        },
        None => {
            match serenity::model::application::Command::set_global_commands(&ctx.http, commands)
                .await
            {
                Ok(cmds) => info!(count = cmds.len(), "registered global slash commands"),
                Err(e) => warn!(error = %e, "failed to register global slash commands"),
            }
        }
    }
}

/// Dispatch a slash command interaction to the appropriate handler.
pub async fn handle_interaction<C: RelayContext + 'static>(
    app: &Arc<C>,
    ctx: &Context,
    command: CommandInteraction,
) {
    let name = command.data.name.clone();
    let result = match name.as_str() {
        "ask" => {
            relay(app, ctx, command, Mode::Ask).await;
            Ok(())
        }
        "quick" => {
            relay(app, ctx, command, Mode::Quick).await;
            Ok(())
        }
        "stats" => respond(ctx, &command, &stats_message(app.as_ref())).await,
        "clear" => {
            let text = clear_message(app.as_ref());
            info!(user = %command.user.name, "conversation cleared via slash command");
            respond(ctx, &command, &text).await
        }
        _ => respond(ctx, &command, "Unknown command.").await,
    };

    if let Err(e) = result {
        warn!(command = %name, error = %e, "slash command error");
    }
}

/// `/ask` and `/quick`: hand the question to the relay pipeline, which owns
/// every reply from here on.
async fn relay<C: RelayContext + 'static>(
    app: &Arc<C>,
    ctx: &Context,
    command: CommandInteraction,
    mode: Mode,
) {
    let question = question_option(&command.data.options).unwrap_or_default().to_string();
    let requester = command.user.name.clone();
    let transport = InteractionTransport::new(Arc::clone(&ctx.http), command);

    let outcome = run_request(
        app.as_ref(),
        &transport,
        RelayRequest::new(mode, question, requester),
    )
    .await;
    info!(
        request = %outcome.id,
        command = mode.command_name(),
        state = %outcome.state,
        payloads = outcome.payloads_sent,
        "interaction finished"
    );
}

/// Value of the `question` option, if present and a string.
fn question_option(options: &[CommandDataOption]) -> Option<&str> {
    options
        .iter()
        .find(|o| o.name == QUESTION_OPTION)
        .and_then(|o| o.value.as_str())
}

async fn respond(
    ctx: &Context,
    command: &CommandInteraction,
    content: &str,
) -> Result<(), serenity::Error> {
    command
        .create_response(
            &ctx.http,
            CreateInteractionResponse::Message(
                CreateInteractionResponseMessage::new().content(content),
            ),
        )
        .await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn four_commands_are_registered() {
        let defs = serde_json::to_value(command_definitions()).unwrap();
        let names: Vec<&str> = defs
            .as_array()
            .unwrap()
            .iter()
            .map(|c| c["name"].as_str().unwrap())
            .collect();
        assert_eq!(names, ["ask", "quick", "stats", "clear"]);
    }

    #[test]
    fn question_commands_require_text() {
        let defs = serde_json::to_value(command_definitions()).unwrap();
        for def in &defs.as_array().unwrap()[..2] {
            let option = &def["options"][0];
            assert_eq!(option["name"], QUESTION_OPTION);
            assert_eq!(option["required"], true);
        }
        assert!(defs[2]["options"].as_array().map_or(true, |o| o.is_empty()));
    }
}
