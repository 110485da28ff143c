//! Ordered dispatch of a [`DeliveryPlan`] through a [`Transport`].

use std::time::Duration;

use tracing::debug;

use parley_core::types::{DeliveryPlan, Payload};

use super::transport::{Transport, TransportError};

/// A payload was refused after `sent` others went through.
#[derive(Debug, thiserror::Error)]
#[error("delivery stopped after {sent} payloads: {source}")]
pub struct DeliveryError {
    pub sent: usize,
    #[source]
    pub source: TransportError,
}

/// Send every payload of `plan` in order, pausing `delay` between text
/// messages. Stops at the first failure; nothing is retried.
///
/// Returns the number of payloads sent.
pub async fn deliver<T: Transport + ?Sized>(
    transport: &T,
    plan: &DeliveryPlan,
    delay: Duration,
) -> Result<usize, DeliveryError> {
    let mut sent = 0;
    let mut text_sent = false;

    for payload in &plan.payloads {
        let result = match payload {
            Payload::TextChunk { content } | Payload::Notice { content } => {
                if content.trim().is_empty() {
                    continue;
                }
                if text_sent && !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }
                text_sent = true;
                transport.send_text(content).await
            }
            Payload::FileAttachment {
                filename,
                body,
                caption,
            } => send_attachment(transport, filename, body, caption).await,
        };
        result.map_err(|source| DeliveryError { sent, source })?;
        sent += 1;
        debug!(sent, total = plan.payloads.len(), "payload dispatched");
    }

    Ok(sent)
}

/// Stage `body` in a temporary file for the upload. The file is removed when
/// this returns, whether the upload succeeded or not.
async fn send_attachment<T: Transport + ?Sized>(
    transport: &T,
    filename: &str,
    body: &str,
    caption: &str,
) -> Result<(), TransportError> {
    let staged = tempfile::Builder::new()
        .prefix("parley-")
        .suffix(".txt")
        .tempfile()?;
    tokio::fs::write(staged.path(), body.as_bytes()).await?;

    let result = transport.send_file(staged.path(), filename, caption).await;
    let closed = staged.close();
    result?;
    closed.map_err(TransportError::from)
}
