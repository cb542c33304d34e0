//! Notification channel used by the staleness monitor.
//!
//! Delivery (mail, chat, ...) lives behind [`Notifier`]; the harvester ships
//! with a channel that writes the notice to the log.

use async_trait::async_trait;

use crate::error::Result;

/// Delivers an alert. Mail delivery plugs in here: an SMTP-backed
/// implementation sends `subject` and `body` as one message to the
/// operators. A failed delivery returns `IngestError::Notification`.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, subject: &str, body: &str) -> Result<()>;
}

/// Writes each notice as a structured warning
#[derive(Debug, Clone, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(&self, subject: &str, body: &str) -> Result<()> {
        tracing::warn!(subject = subject, body = body, "Notification");
        Ok(())
    }
}
