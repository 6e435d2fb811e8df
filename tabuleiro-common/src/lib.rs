//! # Tabuleiro Common Library
//!
//! Shared code for the Tabuleiro services including:
//! - Database initialization, models and runtime settings
//! - Bootstrap configuration loading
//! - Common error type
//! - Timestamp helpers

pub mod config;
pub mod db;
pub mod error;
pub mod time;

pub use error::{Error, Result};
