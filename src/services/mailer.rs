//! Email collaborator
//!
//! Invite delivery goes through this interface: (recipient, subject,
//! template id, params) in, success or failure out. The gateway never
//! composes SMTP conversations inline; callers treat a send failure as a
//! soft warning.

use anyhow::{Context, Result};
use async_trait::async_trait;
use lettre::{
    message::{header::ContentType, Mailbox},
    transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use tracing::info;

use crate::config::EmailConfig;

/// Outbound email collaborator
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(
        &self,
        recipient: &str,
        subject: &str,
        template_id: &str,
        params: &serde_json::Value,
    ) -> Result<()>;
}

/// SMTP-backed mailer
pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl SmtpMailer {
    pub fn new(config: &EmailConfig) -> Result<Self> {
        let mut builder = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.smtp_host)
            .context("Failed to create SMTP transport")?
            .port(config.smtp_port);

        if let (Some(username), Some(password)) = (&config.username, &config.password) {
            builder = builder.credentials(Credentials::new(username.clone(), password.clone()));
        }

        let from = config
            .from
            .parse::<Mailbox>()
            .context("Invalid from address")?;

        Ok(Self {
            transport: builder.build(),
            from,
        })
    }

    fn render(template_id: &str, params: &serde_json::Value) -> Result<String> {
        match template_id {
            "invite" => {
                let profile = params["profile_name"].as_str().unwrap_or("member");
                let token = params["token"].as_str().unwrap_or_default();
                let expires_at = params["expires_at"].as_str().unwrap_or_default();
                Ok(format!(
                    "You have been invited to the console as {}.\n\n\
                     Use this invitation code during sign-up: {}\n\n\
                     The invitation expires at {}.\n",
                    profile, token, expires_at
                ))
            }
            other => anyhow::bail!("Unknown email template: {}", other),
        }
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(
        &self,
        recipient: &str,
        subject: &str,
        template_id: &str,
        params: &serde_json::Value,
    ) -> Result<()> {
        let body = Self::render(template_id, params)?;

        let message = Message::builder()
            .from(self.from.clone())
            .to(recipient.parse().context("Invalid recipient address")?)
            .subject(subject)
            .header(ContentType::TEXT_PLAIN)
            .body(body)
            .context("Failed to build email message")?;

        self.transport
            .send(message)
            .await
            .context("Failed to send email")?;

        info!(recipient, template_id, "Email sent");
        Ok(())
    }
}
