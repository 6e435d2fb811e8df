//! Access gate: checkout sessions and payment webhooks
//!
//! Payment itself happens at Stripe. This module only opens a checkout
//! session and, once Stripe reports a completed checkout, flips the user's
//! `is_active` flag through [`AccountStore`](crate::store::AccountStore).

pub mod stripe;
pub mod webhook;

use async_trait::async_trait;
use thiserror::Error;

pub use stripe::StripeClient;
pub use webhook::{handle_event, verify_signature, WebhookError, WebhookEvent, WebhookOutcome};

/// Product shown on the checkout page
pub const PRODUCT_NAME: &str = "O Tabuleiro da Dominação";

pub const PRODUCT_DESCRIPTION: &str = "Acesso vitalício ao sistema completo de dominação do TikTok";

/// Checkout errors
#[derive(Debug, Error)]
pub enum CheckoutError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Payment provider error {0}: {1}")]
    Api(u16, String),

    #[error("Parse error: {0}")]
    Parse(String),
}

/// Who the checkout session is for; both fields are optional
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CheckoutRequest {
    pub email: Option<String>,
    pub user_id: Option<i64>,
}

/// Payment collaborator
#[async_trait]
pub trait CheckoutProvider: Send + Sync {
    /// Create a hosted checkout session and return its URL
    async fn create_checkout_session(&self, request: &CheckoutRequest) -> Result<String, CheckoutError>;
}
