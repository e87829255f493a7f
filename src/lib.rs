//! Client for the bolsa de trabajo job board: a typed REST gateway, the
//! persisted session, generic list and form controllers, and the
//! per-screen presets built on them.

pub mod admin;
pub mod api;
pub mod applications;
pub mod auth;
pub mod banner;
pub mod config;
pub mod confirm;
pub mod detail;
pub mod error;
pub mod filter;
pub mod form;
pub mod jobs;
pub mod list;
pub mod models;
pub mod profiles;
pub mod router;
pub mod session;
pub mod store;

#[cfg(test)]
mod testing;

pub use api::{ApiClient, ApiRequest, Backend};
pub use config::Config;
pub use error::{ApiError, BulkError, FormError, StoreError};
pub use session::SessionStore;
