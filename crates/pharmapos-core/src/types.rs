//! # Domain Types
//!
//! Core domain types used throughout PharmaPOS.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────────┐                                                │
//! │  │      Product        │──┬──► Promotion  (discount_bps, 0..=10000)     │
//! │  │  ─────────────────  │  │                                             │
//! │  │  id, name           │  ├──► Batch      (lot, expiration, quantity)   │
//! │  │  price_cents        │  │                                             │
//! │  │  requires_prescr.   │  └──► Inventory  (branch_id, total_stock)      │
//! │  │  status             │                                                │
//! │  └─────────────────────┘                                                │
//! │                                                                         │
//! │  ┌─────────────────────┐   ┌─────────────────────┐                      │
//! │  │    SaleRequest      │   │    SaleReceipt      │                      │
//! │  │  customer_id?       │──►│  id, total_cents    │  (backend computes)  │
//! │  │  lines: id + qty    │   │  lines              │                      │
//! │  └─────────────────────┘   └─────────────────────┘                      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Field names serialize as camelCase, matching the REST backend and the
//! persisted storefront cart.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::money::Money;

// =============================================================================
// Discount Rate
// =============================================================================

/// Discount percentage represented in basis points (bps).
///
/// 1 basis point = 0.01%, so 5000 bps = 50%.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct DiscountRate(u32);

impl DiscountRate {
    /// Creates a discount rate from basis points.
    #[inline]
    pub const fn from_bps(bps: u32) -> Self {
        DiscountRate(bps)
    }

    /// Creates a discount rate from a percentage (for convenience).
    pub fn from_percentage(pct: f64) -> Self {
        DiscountRate((pct * 100.0).round().max(0.0) as u32)
    }

    /// Returns the rate in basis points.
    #[inline]
    pub const fn bps(&self) -> u32 {
        self.0
    }

    /// Returns the rate as a percentage (for display only).
    #[inline]
    pub fn percentage(&self) -> f64 {
        self.0 as f64 / 100.0
    }

    /// Zero discount.
    #[inline]
    pub const fn zero() -> Self {
        DiscountRate(0)
    }

    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }
}

impl Default for DiscountRate {
    fn default() -> Self {
        DiscountRate::zero()
    }
}

// =============================================================================
// Product
// =============================================================================

/// Lifecycle status of a catalog product.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum ProductStatus {
    #[default]
    Active,
    Inactive,
    Expired,
}

/// A percentage discount attached to one product.
///
/// The backend only returns promotions that are currently valid; no date
/// range check happens on this side.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Promotion {
    pub id: String,
    pub product_id: String,
    /// Discount in basis points (5000 = 50%).
    pub discount_bps: u32,
}

impl Promotion {
    #[inline]
    pub fn discount(&self) -> DiscountRate {
        DiscountRate::from_bps(self.discount_bps)
    }
}

/// A dated quantity of a product received in one stock-in event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Batch {
    pub id: String,
    pub lot_number: String,
    #[ts(as = "String")]
    pub expiration_date: DateTime<Utc>,
    pub quantity: i64,
    pub product_id: String,
    pub branch_id: String,
}

/// Stock of one product held by one branch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Inventory {
    pub branch_id: String,
    pub total_stock: i64,
}

/// A product available for sale, with its nested promotions, batches and
/// per-branch inventory as returned by the catalog endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    /// Backend identifier.
    pub id: String,

    /// Display name shown to cashier, customer and on receipt.
    pub name: String,

    #[serde(default)]
    pub description: Option<String>,

    /// Catalog unit price in cents.
    pub price_cents: i64,

    /// Controlled item: sold at the counter only, after staff validation.
    #[serde(default)]
    pub requires_prescription: bool,

    #[serde(default)]
    pub status: ProductStatus,

    #[serde(default)]
    pub category_id: Option<String>,

    #[serde(default)]
    pub promotions: Vec<Promotion>,

    #[serde(default)]
    pub batches: Vec<Batch>,

    #[serde(default)]
    pub inventory: Vec<Inventory>,
}

impl Product {
    /// Returns the catalog price as a Money type.
    #[inline]
    pub fn price(&self) -> Money {
        Money::from_cents(self.price_cents)
    }

    #[inline]
    pub fn is_active(&self) -> bool {
        self.status == ProductStatus::Active
    }

    /// Sum of stock across every branch.
    pub fn total_stock(&self) -> i64 {
        self.inventory.iter().map(|i| i.total_stock).sum()
    }
}

// =============================================================================
// Branches, Customers & Roles
// =============================================================================

/// A physical pharmacy branch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Branch {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub address: Option<String>,
}

/// A registered user who can be attached to a POS sale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Customer {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub email: Option<String>,
}

/// Role of the authenticated user driving a cart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Online storefront shopper.
    Customer,
    /// Counter staff operating the POS.
    Staff,
    /// Back-office administrator (may also operate the POS).
    Admin,
}

impl Role {
    /// Staff and admins may sell prescription items at the counter.
    #[inline]
    pub fn is_staff(&self) -> bool {
        matches!(self, Role::Staff | Role::Admin)
    }
}

/// Authenticated context handed over by the login layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub user_id: String,
    pub role: Role,
    /// Branch a staff member works at. Scopes POS stock when present.
    #[serde(default)]
    pub branch_id: Option<String>,
    /// Bearer token for backend calls.
    #[serde(default, skip_serializing)]
    #[ts(skip)]
    pub token: Option<String>,
}

impl Session {
    pub fn new(user_id: impl Into<String>, role: Role) -> Self {
        Session {
            user_id: user_id.into(),
            role,
            branch_id: None,
            token: None,
        }
    }

    pub fn with_branch(mut self, branch_id: impl Into<String>) -> Self {
        self.branch_id = Some(branch_id.into());
        self
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }
}

// =============================================================================
// Sale
// =============================================================================

/// One line of a sale request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct SaleRequestLine {
    pub product_id: String,
    pub quantity: i64,
}

/// The only structure sent to the sale endpoint.
///
/// Carries no prices: the backend recomputes pricing, checks stock and
/// prescriptions, and decrements batches.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct SaleRequest {
    /// Serialized as `null` when no customer is attached.
    pub customer_id: Option<String>,
    pub lines: Vec<SaleRequestLine>,
}

impl SaleRequest {
    pub fn total_quantity(&self) -> i64 {
        self.lines.iter().map(|l| l.quantity).sum()
    }
}

/// A line of a created sale, priced by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct SaleReceiptLine {
    pub product_id: String,
    pub quantity: i64,
    pub unit_price_cents: i64,
}

/// A sale created by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct SaleReceipt {
    pub id: String,
    /// Backend-computed total in cents.
    pub total_cents: i64,
    pub customer_id: Option<String>,
    #[ts(as = "Option<String>")]
    pub created_at: Option<DateTime<Utc>>,
    pub lines: Vec<SaleReceiptLine>,
}

impl SaleReceipt {
    #[inline]
    pub fn total(&self) -> Money {
        Money::from_cents(self.total_cents)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
