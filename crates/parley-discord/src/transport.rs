//! [`Transport`] over a slash-command interaction.
//!
//! The first payload either defers the interaction or answers it directly;
//! everything after that is a followup message.

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use serenity::builder::{
    CreateAttachment, CreateInteractionResponse, CreateInteractionResponseFollowup,
    CreateInteractionResponseMessage,
};
use serenity::http::Http;
use serenity::model::application::CommandInteraction;

use parley_agent::pipeline::{Transport, TransportError};

pub struct InteractionTransport {
    http: Arc<Http>,
    command: CommandInteraction,
    responded: AtomicBool,
}

impl InteractionTransport {
    pub fn new(http: Arc<Http>, command: CommandInteraction) -> Self {
        Self {
            http,
            command,
            responded: AtomicBool::new(false),
        }
    }

    /// Marks the interaction answered; returns whether it already was.
    fn mark_responded(&self) -> bool {
        self.responded.swap(true, Ordering::SeqCst)
    }
}

fn rejected(e: serenity::Error) -> TransportError {
    TransportError::Rejected(e.to_string())
}

#[async_trait]
impl Transport for InteractionTransport {
    async fn acknowledge(&self) -> Result<(), TransportError> {
        if self.mark_responded() {
            return Ok(());
        }
        self.command
            .create_response(
                &self.http,
                CreateInteractionResponse::Defer(CreateInteractionResponseMessage::new()),
            )
            .await
            .map_err(rejected)
    }

    async fn send_text(&self, content: &str) -> Result<(), TransportError> {
        if self.mark_responded() {
            self.command
                .create_followup(
                    &self.http,
                    CreateInteractionResponseFollowup::new().content(content),
                )
                .await
                .map(|_| ())
                .map_err(rejected)
        } else {
            self.command
                .create_response(
                    &self.http,
                    CreateInteractionResponse::Message(
                        CreateInteractionResponseMessage::new().content(content),
                    ),
                )
                .await
                .map_err(rejected)
        }
    }

    async fn send_file(
        &self,
        path: &Path,
        filename: &str,
        caption: &str,
    ) -> Result<(), TransportError> {
        let data = tokio::fs::read(path).await?;
        let attachment = CreateAttachment::bytes(data, filename);

        if self.mark_responded() {
            self.command
                .create_followup(
                    &self.http,
                    CreateInteractionResponseFollowup::new()
                        .content(caption)
                        .add_file(attachment),
                )
                .await
                .map(|_| ())
                .map_err(rejected)
        } else {
            self.command
                .create_response(
                    &self.http,
                    CreateInteractionResponse::Message(
                        CreateInteractionResponseMessage::new()
                            .content(caption)
                            .add_file(attachment),
                    ),
                )
                .await
                .map_err(rejected)
        }
    }
}
