//! # pharmapos-core: Pure Cart Logic for PharmaPOS
//!
//! This crate holds the pricing, expiry and cart rules shared by the online
//! storefront cart and the in-store POS terminal. It has no I/O.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        PharmaPOS Architecture                           │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                 Frontends (storefront, POS)                     │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │   pharmapos-session: PosTerminal, CustomerCart, config, store   │   │
//! │  └──────────────┬──────────────────────────────────┬───────────────┘   │
//! │                 │                                  │                    │
//! │  ┌──────────────▼──────────────────────┐  ┌───────▼───────────────┐   │
//! │  │    ★ pharmapos-core (THIS CRATE) ★  │  │   pharmapos-api       │   │
//! │  │                                     │  │   REST backend client │   │
//! │  │  pricing   expiry    promotion      │  └───────────────────────┘   │
//! │  │  stock     admission cart           │                               │
//! │  │  prescription        checkout       │                               │
//! │  │                                     │                               │
//! │  │  NO I/O • NO NETWORK • PURE         │                               │
//! │  └─────────────────────────────────────┘                               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (Product, Batch, SaleRequest, etc.)
//! - [`money`] - Money type with integer arithmetic
//! - [`pricing`] - Promotion selection and effective unit price
//! - [`expiry`] - Expired / near-expiry batch classification
//! - [`promotion`] - Units still sellable at the promotional price
//! - [`stock`] - Stock guard against over-selling
//! - [`admission`] - Which products a role may put in a cart
//! - [`cart`] - The cart ledger and its two line shapes
//! - [`prescription`] - Prescription validation gate for POS checkout
//! - [`checkout`] - Sale request assembly
//! - [`error`] / [`validation`] - Typed errors and input rules
//!
//! ## Example Usage
//!
//! ```rust
//! use pharmapos_core::money::Money;
//! use pharmapos_core::types::DiscountRate;
//!
//! let price = Money::from_cents(1999); // $19.99
//! let promo = price.apply_discount(DiscountRate::from_bps(2500)); // 25% off
//!
//! // $14.9925 rounds half-up to $14.99
//! assert_eq!(promo.cents(), 1499);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod admission;
pub mod cart;
pub mod checkout;
pub mod error;
pub mod expiry;
pub mod money;
pub mod prescription;
pub mod pricing;
pub mod promotion;
pub mod stock;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use admission::{can_add, check_admission};
pub use cart::{
    CartLedger, CartLine, CartTotals, DiscountDetails, LedgerLine, PosCartLine, PosLedger,
    StorefrontLedger,
};
pub use checkout::CheckoutAssembler;
pub use error::{AdmissionDenial, CoreError, CoreResult, ValidationError};
pub use expiry::{ExpiryClassification, ExpiryClassifier, ExpiryStatus};
pub use money::Money;
pub use prescription::PrescriptionGate;
pub use pricing::{PricingResolver, PromotionPolicy, ResolvedPrice};
pub use promotion::{PromotionSummary, PromotionalStockEstimator};
pub use stock::{StockGuard, StockScope};
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Days ahead within which a batch counts as near expiry.
pub const DEFAULT_NEAR_EXPIRY_HORIZON_DAYS: u32 = 60;

/// Storage key of the persisted storefront cart.
pub const DEFAULT_CART_STORAGE_KEY: &str = "cart";

/// Maximum distinct products in a single cart.
///
/// ## Business Reason
/// Prevents runaway carts and keeps sale requests a reasonable size.
pub const MAX_CART_ITEMS: usize = 100;

/// Highest unit price accepted from the backend, in cents.
///
/// Keeps `MAX_CART_ITEMS * MAX_ITEM_QUANTITY * price` far inside `i64`.
pub const MAX_PRICE_CENTS: i64 = 1_000_000_000;

/// Maximum quantity of a single product in a cart.
///
/// ## Business Reason
/// Catches typing 1000 instead of 10 at the counter.
pub const MAX_ITEM_QUANTITY: i64 = 999;
