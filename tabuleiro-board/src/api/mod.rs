//! HTTP API handlers for tabuleiro-board

pub mod auth;
pub mod billing;
pub mod board;
pub mod error;
pub mod health;

pub use auth::AuthUser;
pub use billing::{create_checkout, stripe_webhook};
pub use board::{get_hint, get_history, get_progress, me, submit_answer};
pub use error::{ApiError, ApiResult};
pub use health::health_routes;
