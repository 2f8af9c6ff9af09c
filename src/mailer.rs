use lettre::{
    message::{Mailbox, MultiPart},
    transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use tokio::sync::mpsc;
use tracing::{error, info, warn};

use crate::config::SmtpConfig;

const QUEUE_CAPACITY: usize = 64;

#[derive(Debug)]
struct Outbound {
    subject: String,
    recipients: Vec<String>,
    text_body: String,
    html_body: String,
}

/// Fire-and-forget mail dispatch over a bounded queue. One worker task
/// drains the queue; delivery failures and overflow are logged as
/// dead-letters and never reach the HTTP caller.
#[derive(Clone)]
pub struct Mailer {
    tx: mpsc::Sender<Outbound>,
}

impl Mailer {
    pub fn start(smtp: Option<SmtpConfig>) -> Self {
        let (tx, rx) = mpsc::channel(QUEUE_CAPACITY);
        match smtp {
            Some(cfg) => {
                tokio::spawn(deliver_loop(rx, cfg));
            }
            None => {
                info!("MAIL_SERVER not configured; outbound mail will be dropped");
                tokio::spawn(drop_loop(rx));
            }
        }
        Self { tx }
    }

    /// Enqueue a message without awaiting delivery. A full queue drops the
    /// message rather than blocking the request.
    pub fn send(
        &self,
        subject: impl Into<String>,
        recipients: Vec<String>,
        text_body: impl Into<String>,
        html_body: impl Into<String>,
    ) {
        let mail = Outbound {
            subject: subject.into(),
            recipients,
            text_body: text_body.into(),
            html_body: html_body.into(),
        };
        if let Err(e) = self.tx.try_send(mail) {
            warn!(error = %e, "mail queue rejected message (dead-letter)");
        }
    }
}

async fn deliver_loop(mut rx: mpsc::Receiver<Outbound>, cfg: SmtpConfig) {
    let from: Mailbox = match cfg.from.parse() {
        Ok(m) => m,
        Err(e) => {
            error!(error = %e, sender = %cfg.from, "invalid MAIL_DEFAULT_SENDER; dropping all mail");
            return drop_loop(rx).await;
        }
    };

    let transport = match AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&cfg.server) {
        Ok(builder) => builder
            .port(cfg.port)
            .credentials(Credentials::new(cfg.username.clone(), cfg.password.clone()))
            .build(),
        Err(e) => {
            error!(error = %e, server = %cfg.server, "smtp transport setup failed; dropping all mail");
            return drop_loop(rx).await;
        }
    };

    while let Some(mail) = rx.recv().await {
        let mut builder = Message::builder()
            .from(from.clone())
            .subject(mail.subject.clone());
        let mut any_recipient = false;
        for rcpt in &mail.recipients {
            match rcpt.parse::<Mailbox>() {
                Ok(mailbox) => {
                    builder = builder.to(mailbox);
                    any_recipient = true;
                }
                Err(e) => warn!(error = %e, recipient = %rcpt, "skipping unparseable recipient"),
            }
        }
        if !any_recipient {
            warn!(subject = %mail.subject, "no valid recipients (dead-letter)");
            continue;
        }

        let message = match builder.multipart(MultiPart::alternative_plain_html(
            mail.text_body,
            mail.html_body,
        )) {
            Ok(m) => m,
            Err(e) => {
                error!(error = %e, subject = %mail.subject, "building message failed (dead-letter)");
                continue;
            }
        };

        match transport.send(message).await {
            Ok(_) => info!(subject = %mail.subject, "mail sent"),
            Err(e) => error!(error = %e, subject = %mail.subject, "mail send failed (dead-letter)"),
        }
    }
}

async fn drop_loop(mut rx: mpsc::Receiver<Outbound>) {
    while let Some(mail) = rx.recv().await {
        info!(subject = %mail.subject, recipients = ?mail.recipients, "mail transport disabled; dropping message");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn disabled_mailer_accepts_sends() {
        let mailer = Mailer::start(None);
        for _ in 0..10 {
            mailer.send(
                "hello",
                vec!["someone@example.com".into()],
                "text",
                "<p>html</p>",
            );
        }
        // give the drop worker a chance to drain
        tokio::task::yield_now().await;
    }

    #[tokio::test]
    async fn overflow_is_dropped_not_blocking() {
        // No runtime worker consumes instantly enough to matter here; the
        // point is that send never awaits and never errors out to the caller.
        let mailer = Mailer::start(None);
        for i in 0..(QUEUE_CAPACITY * 2) {
            mailer.send(
                format!("subject {i}"),
                vec!["x@example.com".into()],
                "t",
                "h",
            );
        }
    }
}
