// Order confirmation email delivery with observable outcomes

use async_trait::async_trait;
use lettre::message::{header::ContentType, Mailbox};
use lettre::transport::smtp::authentication::Credentials;
use lettre::transport::smtp::client::{Tls, TlsParameters};
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, instrument, warn};

use crate::settings::SmtpSettings;
use crate::stripe::webhook::OrderConfirmation;

const DEFAULT_CHANNEL_CAPACITY: usize = 100;

pub const CONFIRMATION_SUBJECT: &str =
    "Order Confirmed: Your CashMesh AI Report is Being Generated";

#[derive(Debug, Error)]
pub enum NotifierError {
    #[error("invalid address {address}: {reason}")]
    InvalidAddress { address: String, reason: String },
    #[error("message build error: {0}")]
    Build(String),
    #[error("smtp error: {0}")]
    Transport(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Email {
    pub to: String,
    pub subject: String,
    pub html: String,
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, email: &Email) -> Result<(), NotifierError>;
}

/// SMTP mailer. Without credentials it still connects, unauthenticated.
pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl SmtpMailer {
    pub fn new(cfg: &SmtpSettings) -> Result<Self, NotifierError> {
        let from = parse_mailbox(&cfg.from)?;

        let builder = if cfg.secure {
            AsyncSmtpTransport::<Tokio1Executor>::relay(&cfg.host)
                .map_err(|e| NotifierError::Transport(e.to_string()))?
        } else {
            let tls = TlsParameters::new(cfg.host.clone())
                .map_err(|e| NotifierError::Transport(e.to_string()))?;
            AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&cfg.host)
                .tls(Tls::Opportunistic(tls))
        };

        let mut builder = builder.port(cfg.port).timeout(Some(cfg.timeout));
        if let Some(user) = &cfg.user {
            builder = builder.credentials(Credentials::new(
                user.clone(),
                cfg.password.clone().unwrap_or_default(),
            ));
        } else {
            info!(
                host = %cfg.host,
                port = cfg.port,
                "SMTP credentials not set; sending unauthenticated"
            );
        }

        Ok(Self {
            transport: builder.build(),
            from,
        })
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    #[instrument(skip(self, email), fields(to = %email.to))]
    async fn send(&self, email: &Email) -> Result<(), NotifierError> {
        let message = Message::builder()
            .from(self.from.clone())
            .to(parse_mailbox(&email.to)?)
            .subject(email.subject.clone())
            .header(ContentType::TEXT_HTML)
            .body(email.html.clone())
            .map_err(|e| NotifierError::Build(e.to_string()))?;

        self.transport
            .send(message)
            .await
            .map_err(|e| NotifierError::Transport(e.to_string()))?;
        Ok(())
    }
}

fn parse_mailbox(address: &str) -> Result<Mailbox, NotifierError> {
    address
        .parse()
        .map_err(|e: lettre::address::AddressError| NotifierError::InvalidAddress {
            address: address.to_string(),
            reason: e.to_string(),
        })
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryStatus {
    Sent,
    Failed { reason: String },
}

/// Published once per confirmation email attempt
#[derive(Debug, Clone)]
pub struct DeliveryOutcome {
    pub payment_intent_id: String,
    pub recipient: String,
    pub status: DeliveryStatus,
}

/// Sends confirmation emails off the request path.
#[derive(Clone)]
pub struct Notifier {
    mailer: Arc<dyn Mailer>,
    outcomes: broadcast::Sender<DeliveryOutcome>,
}

impl Notifier {
    pub fn new(mailer: Arc<dyn Mailer>) -> Self {
        let (outcomes, _rx) = broadcast::channel(DEFAULT_CHANNEL_CAPACITY);
        Self { mailer, outcomes }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<DeliveryOutcome> {
        self.outcomes.subscribe()
    }

    /// Spawn the send; failures are logged and published, never returned.
    pub fn dispatch(&self, confirmation: OrderConfirmation) -> JoinHandle<DeliveryOutcome> {
        let mailer = Arc::clone(&self.mailer);
        let outcomes = self.outcomes.clone();
        let email = confirmation_email(&confirmation);

        tokio::spawn(async move {
            let status = match mailer.send(&email).await {
                Ok(()) => {
                    info!(
                        payment_intent_id = %confirmation.payment_intent_id,
                        to = %email.to,
                        "Confirmation email sent"
                    );
                    DeliveryStatus::Sent
                }
                Err(e) => {
                    warn!(
                        payment_intent_id = %confirmation.payment_intent_id,
                        to = %email.to,
                        error = %e,
                        "Confirmation email failed"
                    );
                    DeliveryStatus::Failed {
                        reason: e.to_string(),
                    }
                }
            };

            let outcome = DeliveryOutcome {
                payment_intent_id: confirmation.payment_intent_id,
                recipient: email.to,
                status,
            };
            // No subscribers is fine
            let _ = outcomes.send(outcome.clone());
            outcome
        })
    }
}

/// Tally delivery outcomes until every sender is gone; returns (sent, failed).
pub async fn monitor_deliveries(mut rx: broadcast::Receiver<DeliveryOutcome>) -> (u64, u64) {
    let (mut sent, mut failed) = (0u64, 0u64);
    loop {
        match rx.recv().await {
            Ok(outcome) => {
                match &outcome.status {
                    DeliveryStatus::Sent => sent += 1,
                    DeliveryStatus::Failed { reason } => {
                        failed += 1;
                        error!(
                            payment_intent_id = %outcome.payment_intent_id,
                            recipient = %outcome.recipient,
                            reason = %reason,
                            failed_total = failed,
                            "Order confirmation undelivered"
                        );
                    }
                }
                debug!(sent_total = sent, failed_total = failed, "Delivery outcome recorded");
            }
            Err(RecvError::Lagged(skipped)) => {
                warn!(skipped = skipped, "Delivery monitor lagged; outcomes dropped");
            }
            Err(RecvError::Closed) => break,
        }
    }
    (sent, failed)
}

pub fn confirmation_email(confirmation: &OrderConfirmation) -> Email {
    let html = format!(
        r#"
<h2>Order Confirmed</h2>
<p>Hi {name},</p>
<p>Your order for "{topic}" has been confirmed.</p>
<p>Your strategic report will be generated and delivered within 2 hours.</p>
<p>Order ID: {id}</p>
"#,
        name = escape_html(&confirmation.customer_name),
        topic = escape_html(&confirmation.topic),
        id = escape_html(&confirmation.payment_intent_id),
    );

    Email {
        to: confirmation.customer_email.clone(),
        subject: CONFIRMATION_SUBJECT.to_string(),
        html,
    }
}

fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}
