//! Checkout and Stripe webhook endpoints

use axum::{body::Bytes, extract::State, http::HeaderMap, Json};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::{ApiError, ApiResult, AuthUser};
use crate::billing::{self, webhook::SIGNATURE_HEADER, CheckoutRequest, WebhookError, WebhookEvent};
use crate::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct CheckoutBody {
    pub email: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CheckoutResponse {
    pub url: String,
}

/// POST /api/checkout
///
/// Identity is optional: anonymous visitors can pay first and link the
/// account afterwards. A sign-in that fails for any other reason than a
/// missing identity aborts, so a paid session is never left unlinked.
pub async fn create_checkout(
    State(state): State<AppState>,
    user: Result<AuthUser, ApiError>,
    body: Option<Json<CheckoutBody>>,
) -> ApiResult<Json<CheckoutResponse>> {
    let checkout = state
        .checkout
        .as_ref()
        .ok_or_else(|| ApiError::ServiceUnavailable("Pagamentos não configurados".to_string()))?;

    let user = match user {
        Ok(AuthUser(user)) => Some(user),
        Err(ApiError::Unauthorized(_)) => None,
        Err(e) => return Err(e),
    };
    let body = body.map(|Json(b)| b).unwrap_or_default();

    let request = CheckoutRequest {
        email: body.email.or_else(|| user.as_ref().and_then(|u| u.email.clone())),
        user_id: user.as_ref().map(|u| u.id),
    };

    let url = checkout.create_checkout_session(&request).await?;
    Ok(Json(CheckoutResponse { url }))
}

/// POST /api/stripe/webhook
///
/// Verifies the signature over the raw body before parsing anything.
pub async fn stripe_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> ApiResult<Json<Value>> {
    let result = verify_and_parse(&state, &headers, &body);
    let event = match result {
        Ok(event) => event,
        Err(e) => {
            tracing::warn!(error = %e, "Rejected webhook");
            return Err(e.into());
        }
    };

    billing::handle_event(state.accounts.as_ref(), &event).await?;

    Ok(Json(json!({ "received": true })))
}

fn verify_and_parse(state: &AppState, headers: &HeaderMap, body: &[u8]) -> Result<WebhookEvent, WebhookError> {
    let secret = state
        .webhook_secret
        .as_deref()
        .filter(|s| !s.is_empty())
        .ok_or(WebhookError::MissingSecret)?;

    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or(WebhookError::MissingSignature)?;

    billing::verify_signature(
        body,
        signature,
        secret,
        state.settings.webhook_tolerance_secs,
        tabuleiro_common::time::unix_seconds(),
    )?;

    WebhookEvent::parse(body)
}
