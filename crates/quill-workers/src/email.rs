use async_trait::async_trait;
use parking_lot::Mutex;
use tracing::info;

/// Failure classification for outbound email: retryable (provider down)
/// or permanent (the request itself is bad, e.g. an invalid address).
#[derive(Clone, Debug, thiserror::Error)]
pub enum EmailError {
    #[error("email provider unavailable: {0}")]
    Transient(String),
    #[error("email rejected: {0}")]
    Permanent(String),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OutboundEmail {
    pub to: String,
    pub subject: String,
    pub body: String,
}

/// Outbound email capability. Delivery itself is out of scope; this is
/// the seam a real provider plugs into.
#[async_trait]
pub trait EmailSender: Send + Sync {
    async fn send(&self, email: &OutboundEmail) -> Result<(), EmailError>;
}

/// Sender that writes the notification to the log. The default when no
/// provider is configured.
pub struct LogEmailSender;

#[async_trait]
impl EmailSender for LogEmailSender {
    async fn send(&self, email: &OutboundEmail) -> Result<(), EmailError> {
        info!(to = %email.to, subject = %email.subject, "reminder notification (log delivery)");
        Ok(())
    }
}

/// Test double: records sends and can fail on demand.
#[derive(Default)]
pub struct RecordingEmailSender {
    sent: Mutex<Vec<OutboundEmail>>,
    fail_with: Mutex<Option<EmailError>>,
}

impl RecordingEmailSender {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_with(&self, error: EmailError) {
        *self.fail_with.lock() = Some(error);
    }

    pub fn clear_failure(&self) {
        *self.fail_with.lock() = None;
    }

    pub fn sent(&self) -> Vec<OutboundEmail> {
        self.sent.lock().clone()
    }
}

#[async_trait]
impl EmailSender for RecordingEmailSender {
    async fn send(&self, email: &OutboundEmail) -> Result<(), EmailError> {
        if let Some(error) = self.fail_with.lock().clone() {
            return Err(error);
        }
        self.sent.lock().push(email.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn recording_sender_captures_emails() {
        let sender = RecordingEmailSender::new();
        sender
            .send(&OutboundEmail {
                to: "a@x.y".into(),
                subject: "Reminder".into(),
                body: "b".into(),
            })
            .await
            .unwrap();
        assert_eq!(sender.sent().len(), 1);
        assert_eq!(sender.sent()[0].to, "a@x.y");
    }

    #[tokio::test]
    async fn recording_sender_injects_failures() {
        let sender = RecordingEmailSender::new();
        sender.fail_with(EmailError::Transient("smtp down".into()));
        let err = sender
            .send(&OutboundEmail {
                to: "a@x.y".into(),
                subject: "s".into(),
                body: "b".into(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, EmailError::Transient(_)));
        assert!(sender.sent().is_empty());
    }

    #[tokio::test]
    async fn log_sender_always_succeeds() {
        let sender = LogEmailSender;
        sender
            .send(&OutboundEmail {
                to: "a@x.y".into(),
                subject: "s".into(),
                body: "b".into(),
            })
            .await
            .unwrap();
    }
}
