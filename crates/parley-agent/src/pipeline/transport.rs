use std::path::Path;

use async_trait::async_trait;

/// Outbound side of one conversation: where a request's payloads go.
///
/// Implemented by each messaging adapter (e.g. a Discord interaction).
#[async_trait]
pub trait Transport: Send + Sync {
    /// Tell the user an answer is on its way. Called once, after the input
    /// passed validation and before the remote call.
    async fn acknowledge(&self) -> Result<(), TransportError>;

    /// Send one text message.
    async fn send_text(&self, content: &str) -> Result<(), TransportError>;

    /// Upload the file at `path` under `filename`, with `caption` as message text.
    async fn send_file(&self, path: &Path, filename: &str, caption: &str)
        -> Result<(), TransportError>;
}

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("transport rejected payload: {0}")]
    Rejected(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
