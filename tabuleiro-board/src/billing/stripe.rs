//! Stripe Checkout client

use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use tabuleiro_common::config::BillingConfig;

use super::{CheckoutError, CheckoutProvider, CheckoutRequest, PRODUCT_DESCRIPTION, PRODUCT_NAME};

const STRIPE_API_BASE: &str = "https://api.stripe.com/v1";

const USER_AGENT: &str = concat!("tabuleiro-board/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Deserialize)]
struct CheckoutSession {
    id: String,
    url: Option<String>,
}

/// Stripe API client
pub struct StripeClient {
    http_client: reqwest::Client,
    api_base: String,
    secret_key: String,
    app_url: String,
    price_cents: i64,
    currency: String,
}

impl StripeClient {
    pub fn new(secret_key: impl Into<String>, config: &BillingConfig) -> Result<Self, CheckoutError> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| CheckoutError::Network(e.to_string()))?;

        Ok(Self {
            http_client,
            api_base: STRIPE_API_BASE.to_string(),
            secret_key: secret_key.into(),
            app_url: config.app_url.trim_end_matches('/').to_string(),
            price_cents: config.price_cents,
            currency: config.currency.clone(),
        })
    }

    /// Form fields for `POST /checkout/sessions`
    fn checkout_form(&self, request: &CheckoutRequest) -> Vec<(&'static str, String)> {
        let mut form = vec![
            ("mode", "payment".to_string()),
            ("payment_method_types[0]", "card".to_string()),
            ("line_items[0][quantity]", "1".to_string()),
            ("line_items[0][price_data][currency]", self.currency.clone()),
            ("line_items[0][price_data][unit_amount]", self.price_cents.to_string()),
            ("line_items[0][price_data][product_data][name]", PRODUCT_NAME.to_string()),
            (
                "line_items[0][price_data][product_data][description]",
                PRODUCT_DESCRIPTION.to_string(),
            ),
            ("success_url", format!("{}/tabuleiro?success=true", self.app_url)),
            ("cancel_url", format!("{}?canceled=true", self.app_url)),
            (
                "metadata[userId]",
                request.user_id.map(|id| id.to_string()).unwrap_or_default(),
            ),
        ];

        if let Some(email) = request.email.as_deref().filter(|e| !e.is_empty()) {
            form.push(("customer_email", email.to_string()));
        }

        form
    }
}

#[async_trait]
impl CheckoutProvider for StripeClient {
    async fn create_checkout_session(&self, request: &CheckoutRequest) -> Result<String, CheckoutError> {
        let response = self
            .http_client
            .post(format!("{}/checkout/sessions", self.api_base))
            .bearer_auth(&self.secret_key)
            .form(&self.checkout_form(request))
            .send()
            .await
            .map_err(|e| CheckoutError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            tracing::error!(status = status.as_u16(), error = %error_text, "Stripe checkout creation failed");
            return Err(CheckoutError::Api(status.as_u16(), error_text));
        }

        let session: CheckoutSession = response
            .json()
            .await
            .map_err(|e| CheckoutError::Parse(e.to_string()))?;

        tracing::info!(session_id = %session.id, user_id = ?request.user_id, "Created checkout session");

        session
            .url
            .filter(|url| !url.is_empty())
            .ok_or_else(|| CheckoutError::Parse("checkout session has no url".to_string()))
    }
}

impl std::fmt::Debug for StripeClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StripeClient")
            .field("api_base", &self.api_base)
            .field("secret_key", &"[REDACTED]")
            .field("app_url", &self.app_url)
            .finish()
    }
}
