use std::time::Duration;

use chrono::{DateTime, Utc};
use futures::StreamExt;
use tokio::net::TcpStream;
use tokio::runtime::Runtime;
use tokio_native_tls::TlsStream;

use super::notify::{NotifyError, ReplyCheck, ReplyProbe};
use crate::config::MailConfig;

type ImapSession = async_imap::Session<TlsStream<TcpStream>>;

/// IMAP search for a sender's mail received on or after `since`. IMAP `SINCE` only
/// has day precision; the exact cutoff is applied to the fetched dates.
pub fn search_query(from_address: &str, since: DateTime<Utc>) -> String {
    let sender: String = from_address
        .trim()
        .chars()
        .filter(|ch| !matches!(ch, '"' | '\\') && !ch.is_control())
        .collect();
    format!("FROM \"{sender}\" SINCE {}", since.format("%d-%b-%Y"))
}

/// Most recent arrival at or after the cutoff.
pub fn latest_since(
    arrivals: impl IntoIterator<Item = DateTime<Utc>>,
    cutoff: DateTime<Utc>,
) -> Option<DateTime<Utc>> {
    arrivals.into_iter().filter(|at| *at >= cutoff).max()
}

/// Reply check over an IMAP TLS mailbox, signed in with the SMTP account.
///
/// Each check opens its own session on a private runtime and blocks on it, like the
/// other engagement collaborators.
pub struct ImapReplyProbe {
    host: String,
    port: u16,
    username: String,
    password: String,
    mailbox: String,
    timeout: Duration,
    runtime: Runtime,
}

impl ImapReplyProbe {
    pub fn new(config: &MailConfig) -> Result<Self, NotifyError> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|err| NotifyError::Transport(format!("imap runtime: {err}")))?;

        Ok(Self {
            host: config.imap_host.clone(),
            port: config.imap_port,
            username: config.username.clone(),
            password: config.password.clone(),
            mailbox: "INBOX".to_string(),
            timeout: Duration::from_secs(config.timeout_secs),
            runtime,
        })
    }

    pub fn with_mailbox(mut self, mailbox: impl Into<String>) -> Self {
        self.mailbox = mailbox.into();
        self
    }

    async fn connect(&self) -> Result<ImapSession, NotifyError> {
        let tcp = TcpStream::connect((self.host.as_str(), self.port))
            .await
            .map_err(|err| NotifyError::Transport(format!("imap connect: {err}")))?;

        let connector = native_tls::TlsConnector::new()
            .map_err(|err| NotifyError::Transport(format!("imap tls: {err}")))?;
        let tls = tokio_native_tls::TlsConnector::from(connector)
            .connect(&self.host, tcp)
            .await
            .map_err(|err| NotifyError::Transport(format!("imap tls handshake: {err}")))?;

        async_imap::Client::new(tls)
            .login(&self.username, &self.password)
            .await
            .map_err(|(err, _)| NotifyError::Transport(format!("imap login: {err}")))
    }

    async fn latest_reply(
        &self,
        from_address: &str,
        cutoff: DateTime<Utc>,
    ) -> Result<Option<DateTime<Utc>>, NotifyError> {
        let mut session = self.connect().await?;
        session
            .select(&self.mailbox)
            .await
            .map_err(|err| NotifyError::Transport(format!("imap select: {err}")))?;

        let uids = session
            .uid_search(search_query(from_address, cutoff))
            .await
            .map_err(|err| NotifyError::Transport(format!("imap search: {err}")))?;

        if uids.is_empty() {
            session.logout().await.ok();
            return Ok(None);
        }

        let uid_set = uids
            .iter()
            .map(u32::to_string)
            .collect::<Vec<_>>()
            .join(",");
        let mut messages = session
            .uid_fetch(&uid_set, "(UID INTERNALDATE)")
            .await
            .map_err(|err| NotifyError::Transport(format!("imap fetch: {err}")))?;

        let mut arrivals = Vec::new();
        while let Some(message) = messages.next().await {
            let message =
                message.map_err(|err| NotifyError::Transport(format!("imap fetch: {err}")))?;
            if let Some(at) = message.internal_date() {
                arrivals.push(at.with_timezone(&Utc));
            }
        }
        drop(messages);

        session.logout().await.ok();
        Ok(latest_since(arrivals, cutoff))
    }
}

impl std::fmt::Debug for ImapReplyProbe {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImapReplyProbe")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("mailbox", &self.mailbox)
            .finish_non_exhaustive()
    }
}

impl ReplyProbe for ImapReplyProbe {
    fn check_reply(
        &self,
        from_address: &str,
        since_minutes: u32,
    ) -> Result<ReplyCheck, NotifyError> {
        let cutoff = Utc::now() - chrono::Duration::minutes(i64::from(since_minutes));

        let latest = self
            .runtime
            .block_on(async {
                tokio::time::timeout(self.timeout, self.latest_reply(from_address, cutoff)).await
            })
            .map_err(|_| NotifyError::Transport("imap check timed out".to_string()))??;

        Ok(match latest {
            Some(at) => {
                tracing::debug!(from = %from_address, %at, "candidate reply found");
                ReplyCheck::found(format!("reply from {from_address} at {at}"))
            }
            None => ReplyCheck::missing(format!(
                "no reply from {from_address} in the last {since_minutes} minutes"
            )),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(hour: u32, minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 10, 6, hour, minute, 0)
            .single()
            .expect("valid instant")
    }

    #[test]
    fn search_uses_sender_and_day_precision_since() {
        assert_eq!(
            search_query(" arjun@example.com ", at(9, 30)),
            "FROM \"arjun@example.com\" SINCE 06-Oct-2025"
        );
    }

    #[test]
    fn search_strips_quoting_characters() {
        assert_eq!(
            search_query("a\"b\\c@example.com", at(0, 0)),
            "FROM \"abc@example.com\" SINCE 06-Oct-2025"
        );
    }

    #[test]
    fn only_arrivals_inside_the_window_count() {
        let cutoff = at(10, 0);
        assert_eq!(latest_since([at(8, 0), at(9, 59)], cutoff), None);
        assert_eq!(
            latest_since([at(8, 0), at(10, 0), at(11, 15), at(10, 30)], cutoff),
            Some(at(11, 15))
        );
    }

    #[test]
    fn imap_settings_come_from_the_mail_account() {
        let config = MailConfig {
            smtp_host: "smtp.example.com".to_string(),
            smtp_port: 587,
            imap_host: "imap.example.com".to_string(),
            imap_port: 993,
            username: "recruiting@example.com".to_string(),
            password: "app-password".to_string(),
            sender: "recruiting@example.com".to_string(),
            timeout_secs: 10,
        };

        let imap = ImapReplyProbe::new(&config)
            .expect("runtime builds")
            .with_mailbox("Replies");
        let debug = format!("{imap:?}");
        assert!(debug.contains("imap.example.com"));
        assert!(debug.contains("Replies"));
        assert!(!debug.contains("app-password"));
    }
}
