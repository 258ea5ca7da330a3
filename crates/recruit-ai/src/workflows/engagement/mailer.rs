use std::time::Duration;

use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Message, SmtpTransport, Transport};

use super::notify::{Mailer, NotifyError};
use crate::config::MailConfig;

/// STARTTLS SMTP mailer. Sends are synchronous and bounded by the configured timeout.
pub struct SmtpMailer {
    transport: SmtpTransport,
    sender: Mailbox,
}

impl SmtpMailer {
    pub fn new(config: &MailConfig) -> Result<Self, NotifyError> {
        let sender: Mailbox = config
            .sender
            .parse()
            .map_err(|err| NotifyError::InvalidAddress(format!("{}: {err}", config.sender)))?;

        let transport = SmtpTransport::starttls_relay(&config.smtp_host)
            .map_err(|err| NotifyError::Transport(format!("smtp relay: {err}")))?
            .port(config.smtp_port)
            .credentials(Credentials::new(
                config.username.clone(),
                config.password.clone(),
            ))
            .timeout(Some(Duration::from_secs(config.timeout_secs)))
            .build();

        Ok(Self { transport, sender })
    }
}

impl std::fmt::Debug for SmtpMailer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SmtpMailer")
            .field("sender", &self.sender.to_string())
            .finish_non_exhaustive()
    }
}

impl Mailer for SmtpMailer {
    fn send_message(&self, to: &str, subject: &str, body: &str) -> Result<(), NotifyError> {
        let recipient: Mailbox = to
            .parse()
            .map_err(|err| NotifyError::InvalidAddress(format!("{to}: {err}")))?;

        let email = Message::builder()
            .from(self.sender.clone())
            .to(recipient)
            .subject(subject)
            .header(ContentType::TEXT_PLAIN)
            .body(body.to_string())
            .map_err(|err| NotifyError::Transport(format!("build email: {err}")))?;

        self.transport
            .send(&email)
            .map_err(|err| NotifyError::Transport(format!("smtp send: {err}")))?;

        tracing::info!(%to, %subject, "engagement email sent");
        Ok(())
    }
}
