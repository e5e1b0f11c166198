//! # pharmapos-session: Session Orchestration
//!
//! Owns the mutable state of one UI session and drives the core ledgers
//! against the backend.
//!
//! ## Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        UI (storefront / counter)                        │
//! │                 commands ▼              ▲ watch::Receiver<Snapshot>     │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │  ┌────────────────────┐  ┌────────────────────┐  ┌──────────────────┐  │
//! │  │ PosTerminal        │  │ CustomerCart       │  │ CatalogCache     │  │
//! │  │ PosLedger (branch) │  │ StorefrontLedger   │  │ products,        │  │
//! │  │ Rx gate, customer  │  │ persisted "cart"   │  │ branches,        │  │
//! │  └─────────┬──────────┘  └─────────┬──────────┘  │ customers        │  │
//! │            └───────── checkout ────┘             └────────┬─────────┘  │
//! ├───────────────────────────────────────────────────────────┼────────────┤
//! │                 pharmapos-api: PharmacyBackend ◄──────────┘            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`pos`] - Staff counter terminal
//! - [`customer_cart`] - Storefront cart with persistence
//! - [`catalog`] - Shared catalog cache and refresh
//! - [`checkout`] - Sale submission and the success banner
//! - [`store`] - Cart storage backends
//! - [`config`] - Layered `PosConfig`
//! - [`telemetry`] - Tracing subscriber setup
//! - [`error`] - `SessionError` and the UI error payload
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use pharmapos_api::HttpBackend;
//! use pharmapos_core::{Role, Session};
//! use pharmapos_session::{CatalogCache, PosConfig, PosTerminal};
//!
//! # async fn run() -> pharmapos_session::SessionResult<()> {
//! pharmapos_session::telemetry::init_tracing();
//! let config = PosConfig::load_or_default(None);
//! let session = Session::new("staff-1", Role::Staff).with_branch("north");
//!
//! let backend = HttpBackend::new(&config.api)?.with_token(session.token.clone());
//! let catalog = Arc::new(CatalogCache::new(Arc::new(backend)));
//! let terminal = PosTerminal::new(session, catalog, &config)?;
//!
//! terminal.load_catalog().await?;
//! terminal.add_product("paracetamol-500")?;
//! let receipt = terminal.checkout().await?;
//! println!("Sale {} for {}", receipt.id, receipt.total());
//! # Ok(())
//! # }
//! ```

pub mod catalog;
pub mod checkout;
pub mod config;
pub mod customer_cart;
pub mod error;
pub mod pos;
pub mod store;
pub mod telemetry;

#[cfg(test)]
pub(crate) mod testing;

pub use catalog::{Catalog, CatalogCache, ExpiryReportRow};
pub use checkout::SuccessBanner;
pub use config::{PosConfig, PricingConfig, StorageConfig, TerminalConfig};
pub use customer_cart::{CartSnapshot, CustomerCart};
pub use error::{ErrorCode, ErrorPayload, SessionError, SessionResult};
pub use pos::{PosSnapshot, PosTerminal};
pub use store::{CartStore, JsonFileStore, MemoryStore};
