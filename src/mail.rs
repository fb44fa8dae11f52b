//! Outgoing email. Delivery failures are always reported to the caller.

use std::sync::Arc;

use lettre::{
    address::AddressError,
    message::Mailbox,
    transport::smtp::{self, authentication::Credentials},
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use thiserror::Error;

use crate::model::api::email::Email;

#[derive(Debug, Error)]
pub enum MailError {
    #[error("Invalid sender address: {0}")]
    Sender(#[from] AddressError),
    #[error("Failed to build message: {0}")]
    Build(#[from] lettre::error::Error),
    #[error("SMTP delivery failed: {0}")]
    Smtp(#[from] smtp::Error),
    #[error("Delivery rejected: {0}")]
    Rejected(String),
}

/// Something that can deliver a plain-text email.
#[rocket::async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, to: &Email, subject: &str, body: &str) -> Result<(), MailError>;
}

/// The shared mailer, as placed in managed state.
pub type MailSender = Arc<dyn Mailer>;

/// Delivers mail through an SMTP relay.
pub struct SmtpMailer {
    from: Mailbox,
    transport: AsyncSmtpTransport<Tokio1Executor>,
}

impl SmtpMailer {
    /// Build a STARTTLS relay transport. Credentials are optional for
    /// relays that authenticate by network.
    pub fn new(
        from: &str,
        host: &str,
        port: u16,
        credentials: Option<(String, String)>,
    ) -> Result<Self, MailError> {
        let from = Mailbox::new(None, from.parse()?);
        let mut builder = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(host)?.port(port);
        if let Some((username, password)) = credentials {
            builder = builder.credentials(Credentials::new(username, password));
        }
        Ok(Self {
            from,
            transport: builder.build(),
        })
    }
}

#[rocket::async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, to: &Email, subject: &str, body: &str) -> Result<(), MailError> {
        let message = Message::builder()
            .from(self.from.clone())
            .to(Mailbox::new(None, (**to).clone()))
            .subject(subject)
            .body(body.to_string())?;
        let response = self.transport.send(message).await?;
        debug!("Mail to {to} accepted: {:?}", response.code());
        Ok(())
    }
}

/// Writes mail to the log instead of sending it. For development only.
pub struct LogMailer;

#[rocket::async_trait]
impl Mailer for LogMailer {
    async fn send(&self, to: &Email, subject: &str, body: &str) -> Result<(), MailError> {
        warn!("Mail transport is `log`; not sending. To: {to} Subject: {subject} Body: {body}");
        Ok(())
    }
}

/// A mail captured by [`RecordingMailer`].
#[cfg(test)]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentMail {
    pub to: Email,
    pub subject: String,
    pub body: String,
}

/// Records every message instead of sending it, optionally failing on demand.
#[cfg(test)]
#[derive(Default)]
pub struct RecordingMailer {
    sent: std::sync::Mutex<Vec<SentMail>>,
    fail: std::sync::atomic::AtomicBool,
}

/// The recording mailer handed to tests.
#[cfg(test)]
pub type Outbox = Arc<RecordingMailer>;

#[cfg(test)]
impl RecordingMailer {
    pub fn new() -> Outbox {
        Arc::new(Self::default())
    }

    /// Make every subsequent delivery fail (or succeed again).
    pub fn set_failing(&self, fail: bool) {
        self.fail.store(fail, std::sync::atomic::Ordering::SeqCst);
    }

    pub fn sent(&self) -> Vec<SentMail> {
        self.sent.lock().unwrap().clone()
    }

    /// The most recent mail sent to the given address.
    pub fn last_to(&self, to: &Email) -> Option<SentMail> {
        self.sent().into_iter().rev().find(|mail| &mail.to == to)
    }
}

#[cfg(test)]
#[rocket::async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, to: &Email, subject: &str, body: &str) -> Result<(), MailError> {
        if self.fail.load(std::sync::atomic::Ordering::SeqCst) {
            return Err(MailError::Rejected(format!("refusing to mail {to}")));
        }
        self.sent.lock().unwrap().push(SentMail {
            to: to.clone(),
            subject: subject.to_string(),
            body: body.to_string(),
        });
        Ok(())
    }
}
