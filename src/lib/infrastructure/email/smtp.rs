//! SMTP email service implementation

use anyhow::{Context, Result};
use async_trait::async_trait;
use clap::Parser;
use lettre::{
    message::{header::ContentType, Mailbox},
    transport::smtp::{
        authentication::Credentials,
        client::{Tls, TlsParameters},
        PoolConfig,
    },
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use tracing::debug;

use crate::domain::communication::mailer::{Mailer, MailerError, OutboundEmail};

/// SMTP configuration
#[derive(Clone, Default, Debug, Parser)]
pub struct SMTPConfig {
    /// The SMTP host
    #[clap(id = "smtp_host", long = "smtp-host", env = "SMTP_HOST")]
    pub host: String,

    /// The SMTP port
    #[clap(id = "smtp_port", long = "smtp-port", env = "SMTP_PORT", default_value = "587")]
    pub port: u16,

    /// The SMTP username
    #[clap(id = "smtp_username", long = "smtp-username", env = "SMTP_USERNAME")]
    pub username: String,

    /// The SMTP password
    #[clap(id = "smtp_password", long = "smtp-password", env = "SMTP_PASSWORD")]
    pub password: String,

    /// Verify the TLS certificate
    #[clap(long, env = "SMTP_VERIFY_TLS", default_value = "true")]
    pub verify_tls: bool,

    /// Enable STARTTLS (TLS upgrade on connection)
    #[clap(long, env = "SMTP_STARTTLS", default_value = "true")]
    pub starttls: bool,
}

/// SMTP mailer
#[derive(Debug, Default, Clone)]
pub struct SMTPMailer {
    config: SMTPConfig,
}

impl SMTPMailer {
    /// Create a new SMTP mailer
    pub fn new(config: SMTPConfig) -> Self {
        Self { config }
    }

    /// Create a transport holding a single connection to the relay, so that a
    /// batch is delivered over one session
    #[mutants::skip]
    pub fn transport(&self) -> Result<AsyncSmtpTransport<Tokio1Executor>> {
        let creds = Credentials::new(self.config.username.clone(), self.config.password.clone());

        let tls_parameters = TlsParameters::builder(self.config.host.to_string())
            .dangerous_accept_invalid_certs(!self.config.verify_tls)
            .build()
            .context("failed to build TLS parameters")?;

        let relay = if self.config.starttls {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&self.config.host)?
                .tls(Tls::Opportunistic(tls_parameters))
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::relay(&self.config.host)?
                .tls(Tls::Wrapper(tls_parameters))
        };

        Ok(relay
            .credentials(creds)
            .port(self.config.port)
            .pool_config(PoolConfig::new().max_size(1))
            .build())
    }
}

/// Converts an [`OutboundEmail`] into a message the transport can deliver
pub fn to_message(email: &OutboundEmail) -> Result<Message, MailerError> {
    let mut builder = Message::builder()
        .from(email.from.parse::<Mailbox>()?)
        .subject(email.subject.clone());

    for to in &email.to {
        builder = builder.to(to.parse::<Mailbox>()?);
    }

    for cc in &email.cc {
        builder = builder.cc(cc.parse::<Mailbox>()?);
    }

    Ok(builder
        .header(ContentType::TEXT_HTML)
        .body(email.html_body.clone())?)
}

#[async_trait]
impl Mailer for SMTPMailer {
    async fn send_batch(&self, emails: &[OutboundEmail]) -> Result<(), MailerError> {
        if emails.is_empty() {
            return Ok(());
        }

        let messages = emails
            .iter()
            .map(to_message)
            .collect::<Result<Vec<_>, _>>()?;

        let transport = self.transport()?;

        for (index, message) in messages.into_iter().enumerate() {
            transport.send(message).await.map_err(|err| {
                MailerError::SendError(anyhow::Error::new(err).context(format!(
                    "relay failed on email {} of {}",
                    index + 1,
                    emails.len()
                )))
            })?;
        }

        debug!(count = emails.len(), "batch accepted by relay");

        Ok(())
    }
}
