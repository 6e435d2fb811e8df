//! Stripe webhook verification and event handling

use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha2::Sha256;
use thiserror::Error;
use tracing::{info, warn};

use crate::store::{AccountStore, StoreError};

type HmacSha256 = Hmac<Sha256>;

/// Header carrying `t=<unix>,v1=<hex>[,v1=<hex>...]`
pub const SIGNATURE_HEADER: &str = "stripe-signature";

/// Webhook rejection reasons; all map to 400
#[derive(Debug, Error)]
pub enum WebhookError {
    #[error("Webhook secret not configured")]
    MissingSecret,

    #[error("Missing signature")]
    MissingSignature,

    #[error("Malformed signature header")]
    MalformedSignature,

    #[error("Signature mismatch")]
    InvalidSignature,

    #[error("Timestamp outside tolerance")]
    StaleTimestamp,

    #[error("Invalid webhook payload: {0}")]
    InvalidPayload(String),
}

/// Verify a `Stripe-Signature` header against the raw request body
///
/// The signed payload is `"{t}.{body}"`. Any `v1` entry may match, which
/// covers secret rotation.
pub fn verify_signature(
    payload: &[u8],
    header: &str,
    secret: &str,
    tolerance_secs: i64,
    now: i64,
) -> Result<(), WebhookError> {
    let mut timestamp: Option<&str> = None;
    let mut signatures = Vec::new();

    for part in header.split(',') {
        match part.trim().split_once('=') {
            Some(("t", value)) => timestamp = Some(value),
            Some(("v1", value)) => signatures.push(value),
            _ => {}
        }
    }

    let timestamp = timestamp.ok_or(WebhookError::MalformedSignature)?;
    let issued_at: i64 = timestamp.parse().map_err(|_| WebhookError::MalformedSignature)?;
    if signatures.is_empty() {
        return Err(WebhookError::MalformedSignature);
    }

    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).map_err(|_| WebhookError::MissingSecret)?;
    mac.update(timestamp.as_bytes());
    mac.update(b".");
    mac.update(payload);

    let matched = signatures.iter().any(|candidate| {
        hex::decode(candidate)
            .map(|bytes| mac.clone().verify_slice(&bytes).is_ok())
            .unwrap_or(false)
    });
    if !matched {
        return Err(WebhookError::InvalidSignature);
    }

    if (now - issued_at).abs() > tolerance_secs {
        return Err(WebhookError::StaleTimestamp);
    }

    Ok(())
}

/// Stripe event envelope
#[derive(Debug, Clone, Deserialize)]
pub struct WebhookEvent {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(rename = "type")]
    pub event_type: String,
    pub data: EventData,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EventData {
    pub object: serde_json::Value,
}

impl WebhookEvent {
    pub fn parse(payload: &[u8]) -> Result<Self, WebhookError> {
        serde_json::from_slice(payload).map_err(|e| WebhookError::InvalidPayload(e.to_string()))
    }

    fn object_id(&self) -> Option<&str> {
        self.data.object.get("id").and_then(|v| v.as_str())
    }
}

/// Fields of a completed checkout session
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompletedCheckout {
    pub user_id: Option<i64>,
    pub customer_id: Option<String>,
    pub customer_email: Option<String>,
}

impl CompletedCheckout {
    fn from_session(session: &serde_json::Value) -> Self {
        let user_id = session
            .pointer("/metadata/userId")
            .and_then(|v| v.as_str())
            .and_then(|s| s.trim().parse::<i64>().ok());

        let customer_id = session
            .get("customer")
            .and_then(|v| v.as_str())
            .filter(|s| !s.is_empty())
            .map(str::to_string);

        let customer_email = session
            .get("customer_email")
            .and_then(|v| v.as_str())
            .or_else(|| session.pointer("/customer_details/email").and_then(|v| v.as_str()))
            .filter(|s| !s.is_empty())
            .map(str::to_string);

        Self {
            user_id,
            customer_id,
            customer_email,
        }
    }
}

/// What handling an event did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WebhookOutcome {
    Activated { user_id: i64 },
    /// Checkout named a user id that has no account
    UnknownUser { user_id: i64 },
    /// Paid without a linked account; needs manual follow-up by email
    PendingAccount { email: Option<String> },
    Logged,
    Unhandled,
}

/// Apply a verified event to the account store
///
/// Redelivered events are harmless: activation and customer id updates
/// are idempotent.
pub async fn handle_event(
    accounts: &dyn AccountStore,
    event: &WebhookEvent,
) -> Result<WebhookOutcome, StoreError> {
    info!(event_id = ?event.id, event_type = %event.event_type, "Received webhook event");

    match event.event_type.as_str() {
        "checkout.session.completed" => {
            let checkout = CompletedCheckout::from_session(&event.data.object);

            let Some(user_id) = checkout.user_id else {
                warn!(
                    email = ?checkout.customer_email,
                    "Checkout completed without a user id; account must be linked manually"
                );
                return Ok(WebhookOutcome::PendingAccount {
                    email: checkout.customer_email,
                });
            };

            if !accounts.activate_user(user_id).await? {
                warn!(user_id, "Checkout completed for unknown user");
                return Ok(WebhookOutcome::UnknownUser { user_id });
            }
            info!(user_id, "User activated");

            if let Some(customer_id) = checkout.customer_id.as_deref() {
                accounts.update_stripe_customer_id(user_id, customer_id).await?;
                info!(user_id, customer_id, "Stored Stripe customer id");
            }

            Ok(WebhookOutcome::Activated { user_id })
        }
        "payment_intent.succeeded" => {
            info!(payment_intent = ?event.object_id(), "Payment succeeded");
            Ok(WebhookOutcome::Logged)
        }
        "payment_intent.payment_failed" => {
            warn!(payment_intent = ?event.object_id(), "Payment failed");
            Ok(WebhookOutcome::Logged)
        }
        other => {
            info!(event_type = other, "Unhandled webhook event");
            Ok(WebhookOutcome::Unhandled)
        }
    }
}
