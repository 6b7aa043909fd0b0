//! Libris Library Books Microservice
//!
//! A Rust implementation of the school-library books service, providing a
//! REST JSON API over books, categories, and borrowings with availability
//! bookkeeping for loans.

use std::sync::Arc;

pub mod api;
pub mod config;
pub mod error;
pub mod inventory;
pub mod models;
pub mod repository;
pub mod services;

pub use config::AppConfig;
pub use error::{AppError, AppResult};

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub services: Arc<services::Services>,
}
