//! tabuleiro-board library - progression service for the 20-house board
//!
//! Learners answer one house at a time; an external mentor grades each
//! answer and approvals advance a single monotonic progress pointer.

use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tabuleiro_common::db::RuntimeSettings;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

pub mod api;
pub mod billing;
pub mod houses;
pub mod mentor;
pub mod progression;
pub mod store;

use billing::CheckoutProvider;
use progression::ProgressionController;
use store::AccountStore;

/// Default HTTP port
pub const DEFAULT_PORT: u16 = 5780;

/// Default bind address
pub const DEFAULT_BIND_ADDRESS: &str = "127.0.0.1";

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    pub controller: Arc<ProgressionController>,
    pub accounts: Arc<dyn AccountStore>,
    /// `None` when no Stripe key is configured
    pub checkout: Option<Arc<dyn CheckoutProvider>>,
    pub webhook_secret: Option<String>,
    pub settings: RuntimeSettings,
}

impl AppState {
    pub fn new(
        controller: Arc<ProgressionController>,
        accounts: Arc<dyn AccountStore>,
        settings: RuntimeSettings,
    ) -> Self {
        Self {
            controller,
            accounts,
            checkout: None,
            webhook_secret: None,
            settings,
        }
    }

    pub fn with_checkout(mut self, checkout: Option<Arc<dyn CheckoutProvider>>) -> Self {
        self.checkout = checkout;
        self
    }

    pub fn with_webhook_secret(mut self, secret: Option<String>) -> Self {
        self.webhook_secret = secret;
        self
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    let board = Router::new()
        .route("/api/auth/me", get(api::me))
        .route("/api/tabuleiro/progress", get(api::get_progress))
        .route("/api/tabuleiro/answer", post(api::submit_answer))
        .route("/api/tabuleiro/hint", get(api::get_hint))
        .route("/api/tabuleiro/history", get(api::get_history));

    let billing = Router::new()
        .route("/api/checkout", post(api::create_checkout))
        .route("/api/stripe/webhook", post(api::stripe_webhook));

    Router::new()
        .merge(board)
        .merge(billing)
        .merge(api::health_routes())
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}
