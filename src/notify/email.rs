//! SMTP delivery via a STARTTLS relay.
use super::{
    EnvReader, MissingCredentials, Notification, Notifier, NotifyError, EMAIL_PASSWORD_VAR,
    EMAIL_RECIPIENT_VAR, EMAIL_SENDER_VAR,
};
use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Message, SmtpTransport, Transport};

/// Sender login doubles as the From address.
#[derive(Clone, PartialEq, Eq)]
pub struct EmailCredentials {
    pub sender: String,
    pub password: String,
    pub recipient: String,
}

impl std::fmt::Debug for EmailCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmailCredentials")
            .field("sender", &self.sender)
            .field("password", &"<redacted>")
            .field("recipient", &self.recipient)
            .finish()
    }
}

impl EmailCredentials {
    pub fn from_lookup<F: Fn(&str) -> Option<String>>(
        lookup: F,
    ) -> Result<Self, MissingCredentials> {
        let mut env = EnvReader::new(lookup);
        let credentials = Self {
            sender: env.take(EMAIL_SENDER_VAR),
            password: env.take(EMAIL_PASSWORD_VAR),
            recipient: env.take(EMAIL_RECIPIENT_VAR),
        };
        env.finish(credentials)
    }
}

pub struct EmailNotifier {
    credentials: EmailCredentials,
    host: String,
    port: u16,
}

impl EmailNotifier {
    pub fn new(credentials: EmailCredentials, host: &str, port: u16) -> Self {
        Self {
            credentials,
            host: host.to_string(),
            port,
        }
    }

    fn message(&self, notification: &Notification) -> Result<Message, NotifyError> {
        let from: Mailbox = self.credentials.sender.parse()?;
        let to: Mailbox = self.credentials.recipient.parse()?;
        let message = Message::builder()
            .from(from)
            .to(to)
            .subject(notification.subject.as_str())
            .header(ContentType::TEXT_PLAIN)
            .body(notification.body.clone())?;
        Ok(message)
    }
}

impl Notifier for EmailNotifier {
    fn name(&self) -> &'static str {
        "email"
    }

    fn notify(&self, notification: &Notification) -> Result<(), NotifyError> {
        let message = self.message(notification)?;
        let mailer = SmtpTransport::starttls_relay(&self.host)?
            .port(self.port)
            .credentials(Credentials::new(
                self.credentials.sender.clone(),
                self.credentials.password.clone(),
            ))
            .build();
        mailer.send(&message)?;
        tracing::info!(
            host = %self.host,
            recipient = %self.credentials.recipient,
            "email notification sent"
        );
        Ok(())
    }
}
