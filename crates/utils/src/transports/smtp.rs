//! SMTP relay transport.
//!
//! Interprets the transport value of the sender options as the connection
//! settings of an SMTP relay, shaped as
//! `{"host", "port", "secure", "auth": {"user", "pass"}, "tls": {"rejectUnauthorized"}}`,
//! and sends through the async `lettre` client.

use std::time::Duration;

use lettre::{
    message::{header::ContentType, Mailbox, Mailboxes, MessageBuilder},
    transport::smtp::{
        authentication::Credentials,
        client::{Tls, TlsParameters},
    },
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info};

use crate::{
    DispatchError, DispatchResult, EmailMessage, MailTransport, TransportFactory, TransportFuture,
};

/// Port used for implicit TLS connections when none is configured.
pub const SECURE_PORT: u16 = 465;

/// Port used for plain and STARTTLS connections when none is configured.
pub const SUBMISSION_PORT: u16 = 587;

/// SMTP relay settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SmtpTransportConfig {
    pub host: String,

    #[serde(default)]
    pub port: Option<u16>,

    /// Connect with implicit TLS instead of upgrading with STARTTLS.
    #[serde(default)]
    pub secure: bool,

    #[serde(default)]
    pub auth: Option<SmtpAuth>,

    #[serde(default)]
    pub tls: SmtpTlsOptions,

    /// Never upgrade the connection with STARTTLS.
    #[serde(default, rename = "ignoreTLS")]
    pub ignore_tls: bool,

    /// Refuse to send unless the connection is upgraded with STARTTLS.
    #[serde(default, rename = "requireTLS")]
    pub require_tls: bool,

    /// Connection timeout in milliseconds.
    #[serde(default)]
    pub connection_timeout: Option<u64>,
}

impl SmtpTransportConfig {
    /// Returns the configured port or the default one for the TLS mode.
    pub fn port(&self) -> u16 {
        self.port.unwrap_or(if self.secure {
            SECURE_PORT
        } else {
            SUBMISSION_PORT
        })
    }
}

/// SMTP credentials.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SmtpAuth {
    pub user: String,
    pub pass: String,
}

/// TLS certificate handling.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SmtpTlsOptions {
    #[serde(default = "default_true")]
    pub reject_unauthorized: bool,
}

impl Default for SmtpTlsOptions {
    fn default() -> Self {
        Self {
            reject_unauthorized: default_true(),
        }
    }
}

fn default_true() -> bool {
    true
}

/// Factory building [`SmtpMailTransport`] instances from sender options.
#[derive(Debug, Default)]
pub struct SmtpTransportFactory;

impl SmtpTransportFactory {
    pub fn new() -> Self {
        Self
    }
}

impl TransportFactory for SmtpTransportFactory {
    fn create(&self, transport: &Value) -> DispatchResult<Box<dyn MailTransport>> {
        let config = SmtpTransportConfig::deserialize(transport)
            .map_err(|e| DispatchError::InvalidTransport(e.to_string()))?;
        Ok(Box::new(SmtpMailTransport::new(config)?))
    }
}

/// Transport delivering messages to an SMTP relay.
pub struct SmtpMailTransport {
    host: String,
    mailer: AsyncSmtpTransport<Tokio1Executor>,
}

impl SmtpMailTransport {
    /// Creates a new [`SmtpMailTransport`], no connection is opened until
    /// the first send.
    pub fn new(config: SmtpTransportConfig) -> DispatchResult<Self> {
        let tls_parameters = TlsParameters::builder(config.host.clone())
            .dangerous_accept_invalid_certs(!config.tls.reject_unauthorized)
            .build()
            .map_err(|e| DispatchError::InvalidTransport(e.to_string()))?;
        let tls = if config.secure {
            Tls::Wrapper(tls_parameters)
        } else if config.ignore_tls {
            Tls::None
        } else if config.require_tls {
            Tls::Required(tls_parameters)
        } else {
            Tls::Opportunistic(tls_parameters)
        };

        let mut builder = AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&config.host)
            .port(config.port())
            .tls(tls);
        if let Some(auth) = &config.auth {
            builder = builder.credentials(Credentials::new(auth.user.clone(), auth.pass.clone()));
        }
        if let Some(timeout) = config.connection_timeout {
            builder = builder.timeout(Some(Duration::from_millis(timeout)));
        }

        info!(
            host = %config.host,
            port = config.port(),
            secure = config.secure,
            "SMTP transport initialized"
        );
        Ok(Self {
            host: config.host,
            mailer: builder.build(),
        })
    }
}

impl MailTransport for SmtpMailTransport {
    fn send<'a>(&'a self, message: &'a EmailMessage) -> TransportFuture<'a> {
        Box::pin(async move {
            let email = build_message(message)?;
            debug!(
                message_id = %message.message_id,
                host = %self.host,
                "Submitting email to SMTP relay"
            );
            let response = self
                .mailer
                .send(email)
                .await
                .map_err(|e| DispatchError::Transport(e.to_string()))?;
            let lines: Vec<&str> = response.message().collect();
            Ok(format!("{} {}", response.code(), lines.join(" ")))
        })
    }

    fn name(&self) -> &str {
        "smtp"
    }
}

/// Converts a message into a `lettre` HTML mail.
///
/// The `from` header is mandatory and at least one recipient is needed
/// across `to`, `cc` and `bcc`.
pub fn build_message(message: &EmailMessage) -> DispatchResult<Message> {
    let from = message
        .from()
        .ok_or_else(|| DispatchError::InvalidMessage("Missing from header".to_string()))?;
    let mut builder = Message::builder().from(parse_mailbox(from)?);

    builder = add_mailboxes(builder, message.to(), MessageBuilder::to)?;
    builder = add_mailboxes(builder, message.cc(), MessageBuilder::cc)?;
    builder = add_mailboxes(builder, message.bcc(), MessageBuilder::bcc)?;
    if let Some(reply_to) = message.reply_to() {
        builder = builder.reply_to(parse_mailbox(reply_to)?);
    }
    if let Some(subject) = message.subject() {
        builder = builder.subject(subject);
    }

    builder
        .header(ContentType::TEXT_HTML)
        .body(message.html().to_string())
        .map_err(|e| DispatchError::InvalidMessage(e.to_string()))
}

fn parse_mailbox(value: &str) -> DispatchResult<Mailbox> {
    value
        .parse()
        .map_err(|e| DispatchError::InvalidMessage(format!("Invalid address {value:?}: {e}")))
}

fn add_mailboxes(
    builder: MessageBuilder,
    value: Option<&str>,
    add: fn(MessageBuilder, Mailbox) -> MessageBuilder,
) -> DispatchResult<MessageBuilder> {
    let Some(value) = value.filter(|value| !value.trim().is_empty()) else {
        return Ok(builder);
    };
    let mailboxes: Mailboxes = value
        .parse()
        .map_err(|e| DispatchError::InvalidMessage(format!("Invalid address list {value:?}: {e}")))?;
    Ok(mailboxes.into_iter().fold(builder, add))
}
