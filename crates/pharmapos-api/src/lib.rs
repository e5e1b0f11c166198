//! # pharmapos-api: Pharmacy Backend Contract
//!
//! Typed access to the pharmacy REST backend.
//!
//! ## Modules
//!
//! - [`client`] - `PharmacyBackend` trait and its `reqwest` implementation
//! - [`dto`] - Wire shapes and their validation into domain types
//! - [`config`] - `[api]` configuration section
//! - [`error`] - Transport, rejection and decode errors
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use pharmapos_api::{ApiConfig, HttpBackend, PharmacyBackend};
//!
//! # async fn run() -> pharmapos_api::ApiResult<()> {
//! let backend = HttpBackend::new(&ApiConfig::new("https://pharmacy.example.com/api"))?
//!     .with_token(Some("session-token".to_string()));
//!
//! for product in backend.list_products().await? {
//!     println!("{} {}", product.name, product.price());
//! }
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod config;
pub mod dto;
pub mod error;

pub use client::{HttpBackend, PharmacyBackend};
pub use config::ApiConfig;
pub use error::{ApiError, ApiResult};
