//! # Cart Ledger
//!
//! Line-item store shared by the storefront cart and the POS terminal cart.
//!
//! ## Cart Operations Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Cart Ledger Operations                               │
//! │                                                                         │
//! │  Operation              Checks (in order)              Effect           │
//! │  ─────────              ─────────────────              ──────           │
//! │                                                                         │
//! │  add_line(product) ───► admission → stock → limits ──► qty+1 or insert  │
//! │                                                                         │
//! │  set_quantity(id, n) ─► n < 1 ? remove : stock → max ► qty = n          │
//! │                                                                         │
//! │  remove_line(id) ─────► none ────────────────────────► line dropped     │
//! │                                                                         │
//! │  clear() ─────────────► none ────────────────────────► empty            │
//! │                                                                         │
//! │  total() ─────────────► Σ unit_price × qty  (recomputed on each call)   │
//! │                                                                         │
//! │  NOTE: A rejected mutation leaves every line untouched and is kept as   │
//! │        `last_error` until the next successful mutation.                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Line Shapes
//! - [`CartLine`]: storefront. The product is stored flat next to `quantity`
//!   and priced at catalog price; this is also the persisted format.
//! - [`PosCartLine`]: POS. Snapshots the promotional price and discount when
//!   the line is created, and carries the prescription-validated flag.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use ts_rs::TS;

use crate::admission::{check_admission, denial_reason};
use crate::error::{CoreError, CoreResult};
use crate::money::Money;
use crate::pricing::PricingResolver;
use crate::stock::StockGuard;
use crate::types::{Product, Role};
use crate::validation::{validate_cart_size, validate_price_cents};
use crate::{MAX_CART_ITEMS, MAX_ITEM_QUANTITY};

// =============================================================================
// Ledger Line Trait
// =============================================================================

/// Behaviour every cart line shape provides to [`CartLedger`].
pub trait LedgerLine: Clone {
    /// New line with quantity 1.
    fn from_product(product: &Product, pricing: &PricingResolver) -> Self;

    fn product(&self) -> &Product;

    fn product_mut(&mut self) -> &mut Product;

    fn quantity(&self) -> i64;

    fn set_quantity(&mut self, quantity: i64);

    /// Price charged per unit on this line.
    fn unit_price(&self) -> Money;

    /// Catalog price per unit, before any promotion.
    fn list_price(&self) -> Money {
        self.product().price()
    }

    fn line_total(&self) -> Money {
        self.unit_price().multiply_quantity(self.quantity())
    }

    fn product_id(&self) -> &str {
        &self.product().id
    }
}

// =============================================================================
// Storefront Line
// =============================================================================

/// Storefront cart line: the product with a `quantity` field beside it.
///
/// Priced at catalog price. Promotions are shown on product cards but the
/// storefront line total is computed from `price` as the backend will.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct CartLine {
    #[serde(flatten)]
    pub product: Product,
    pub quantity: i64,
}

impl LedgerLine for CartLine {
    fn from_product(product: &Product, _pricing: &PricingResolver) -> Self {
        CartLine {
            product: product.clone(),
            quantity: 1,
        }
    }

    fn product(&self) -> &Product {
        &self.product
    }

    fn product_mut(&mut self) -> &mut Product {
        &mut self.product
    }

    fn quantity(&self) -> i64 {
        self.quantity
    }

    fn set_quantity(&mut self, quantity: i64) {
        self.quantity = quantity;
    }

    fn unit_price(&self) -> Money {
        self.product.price()
    }
}

// =============================================================================
// POS Line
// =============================================================================

/// Promotion snapshot stored on a discounted POS line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct DiscountDetails {
    pub discount_bps: u32,
    pub promotion_id: String,
}

/// POS cart line.
///
/// ## Price Freezing
/// `unit_price_cents`, `original_price_cents` and `discount` are captured
/// when the line is created. Later catalog refreshes update stock on the
/// snapshot but never re-price the line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct PosCartLine {
    pub product: Product,

    pub cart_quantity: i64,

    /// Staff confirmed the paper prescription. Ignored for OTC products.
    pub validated_prescription: bool,

    /// Promotional price when discounted, catalog price otherwise.
    pub unit_price_cents: i64,

    /// Catalog price, present only when a promotion lowered the price.
    pub original_price_cents: Option<i64>,

    pub discount: Option<DiscountDetails>,
}

impl PosCartLine {
    /// Prescription product whose prescription is not yet validated.
    #[inline]
    pub fn needs_prescription_validation(&self) -> bool {
        self.product.requires_prescription && !self.validated_prescription
    }

    /// Amount saved on this line versus catalog price.
    pub fn savings(&self) -> Money {
        match self.original_price_cents {
            Some(original) => Money::from_cents(original - self.unit_price_cents)
                .multiply_quantity(self.cart_quantity),
            None => Money::zero(),
        }
    }
}

impl LedgerLine for PosCartLine {
    fn from_product(product: &Product, pricing: &PricingResolver) -> Self {
        let resolved = pricing.resolve(product);
        let discounted = resolved.has_discount();
        let (original_price_cents, discount) = match resolved.promotion_id {
            Some(promotion_id) if discounted => (
                Some(product.price_cents),
                Some(DiscountDetails {
                    discount_bps: resolved.discount.bps(),
                    promotion_id,
                }),
            ),
            _ => (None, None),
        };

        PosCartLine {
            product: product.clone(),
            cart_quantity: 1,
            validated_prescription: false,
            unit_price_cents: resolved.final_price.cents(),
            original_price_cents,
            discount,
        }
    }

    fn product(&self) -> &Product {
        &self.product
    }

    fn product_mut(&mut self) -> &mut Product {
        &mut self.product
    }

    fn quantity(&self) -> i64 {
        self.cart_quantity
    }

    fn set_quantity(&mut self, quantity: i64) {
        self.cart_quantity = quantity;
    }

    fn unit_price(&self) -> Money {
        Money::from_cents(self.unit_price_cents)
    }

    fn list_price(&self) -> Money {
        Money::from_cents(self.original_price_cents.unwrap_or(self.unit_price_cents))
    }
}

// =============================================================================
// Totals
// =============================================================================

/// Cart totals summary for display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct CartTotals {
    pub item_count: usize,
    pub total_quantity: i64,
    /// Σ list price × quantity.
    pub subtotal_cents: i64,
    /// Σ (list price - unit price) × quantity.
    pub savings_cents: i64,
    /// Σ unit price × quantity.
    pub total_cents: i64,
}

// =============================================================================
// Cart Ledger
// =============================================================================

/// Ordered, product-unique set of cart lines.
///
/// ## Invariants
/// - Lines are unique by product id, in insertion order
/// - Every line has quantity >= 1 (setting a quantity below 1 removes it)
/// - Growing a line never exceeds the guard's available stock
/// - At most [`MAX_CART_ITEMS`] lines, [`MAX_ITEM_QUANTITY`] per line
#[derive(Debug, Clone)]
pub struct CartLedger<L> {
    lines: Vec<L>,
    role: Role,
    guard: StockGuard,
    pricing: PricingResolver,
    last_error: Option<CoreError>,
}

/// Storefront cart driven by a customer.
pub type StorefrontLedger = CartLedger<CartLine>;

/// POS cart driven by staff.
pub type PosLedger = CartLedger<PosCartLine>;

impl<L: LedgerLine> CartLedger<L> {
    /// Creates an empty ledger.
    pub fn new(role: Role, guard: StockGuard, pricing: PricingResolver) -> Self {
        CartLedger {
            lines: Vec::new(),
            role,
            guard,
            pricing,
            last_error: None,
        }
    }

    /// Restores previously persisted lines.
    ///
    /// Lines with a quantity outside `1..=MAX_ITEM_QUANTITY`, out-of-range
    /// prices, repeated product ids and products this role may not add are
    /// dropped so the ledger invariants hold whatever was on disk. Lines past
    /// [`MAX_CART_ITEMS`] are ignored.
    pub fn with_lines(mut self, lines: Vec<L>) -> Self {
        self.lines.clear();
        for line in lines {
            if self.lines.len() >= MAX_CART_ITEMS {
                debug!("Restored cart truncated at the line limit");
                break;
            }
            let malformed = !(1..=MAX_ITEM_QUANTITY).contains(&line.quantity())
                || validate_price_cents(line.unit_price().cents()).is_err()
                || validate_price_cents(line.list_price().cents()).is_err();
            if malformed || self.position(line.product_id()).is_some() {
                debug!(product_id = %line.product_id(), "Dropping invalid restored line");
                continue;
            }
            if let Some(reason) = denial_reason(line.product(), self.role) {
                warn!(
                    product_id = %line.product_id(),
                    reason = %reason,
                    "Dropping restored line refused by admission"
                );
                continue;
            }
            self.lines.push(line);
        }
        self
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn guard(&self) -> &StockGuard {
        &self.guard
    }

    pub fn pricing(&self) -> &PricingResolver {
        &self.pricing
    }

    /// Adds one unit of `product`.
    ///
    /// ## Behavior
    /// - Product already in cart: quantity + 1
    /// - Product not in cart: new line with quantity 1 (price frozen now)
    pub fn add_line(&mut self, product: &Product) -> CoreResult<()> {
        debug!(product_id = %product.id, "add_line");
        let result = self.try_add(product);
        self.record(result)
    }

    fn try_add(&mut self, product: &Product) -> CoreResult<()> {
        check_admission(product, self.role)?;

        if let Some(index) = self.position(&product.id) {
            let current = self.lines[index].quantity();
            let requested = current + 1;
            self.guard.check(product, current, requested)?;
            if requested > MAX_ITEM_QUANTITY {
                return Err(CoreError::QuantityTooLarge {
                    requested,
                    max: MAX_ITEM_QUANTITY,
                });
            }
            self.lines[index].set_quantity(requested);
            return Ok(());
        }

        self.guard.check(product, 0, 1)?;
        validate_cart_size(self.lines.len()).map_err(|_| CoreError::CartTooLarge {
            max: MAX_CART_ITEMS,
        })?;
        self.lines.push(L::from_product(product, &self.pricing));
        Ok(())
    }

    /// Sets the quantity of an existing line.
    ///
    /// ## Behavior
    /// - `quantity < 1`: the line is removed
    /// - Raising: checked against stock on the line's product snapshot
    /// - Lowering: always allowed
    pub fn set_quantity(&mut self, product_id: &str, quantity: i64) -> CoreResult<()> {
        debug!(product_id = %product_id, quantity, "set_quantity");

        if quantity < 1 {
            return match self.remove_line(product_id) {
                Some(_) => Ok(()),
                None => self.record(Err(CoreError::NotInCart(product_id.to_string()))),
            };
        }

        let result = self.try_set(product_id, quantity);
        self.record(result)
    }

    fn try_set(&mut self, product_id: &str, quantity: i64) -> CoreResult<()> {
        let index = self
            .position(product_id)
            .ok_or_else(|| CoreError::NotInCart(product_id.to_string()))?;

        let line = &self.lines[index];
        self.guard.check(line.product(), line.quantity(), quantity)?;
        if quantity > MAX_ITEM_QUANTITY {
            return Err(CoreError::QuantityTooLarge {
                requested: quantity,
                max: MAX_ITEM_QUANTITY,
            });
        }

        self.lines[index].set_quantity(quantity);
        Ok(())
    }

    /// Removes a line regardless of stock. Clears any pending error.
    pub fn remove_line(&mut self, product_id: &str) -> Option<L> {
        debug!(product_id = %product_id, "remove_line");
        let index = self.position(product_id)?;
        self.last_error = None;
        Some(self.lines.remove(index))
    }

    /// Empties the cart.
    pub fn clear(&mut self) {
        self.lines.clear();
        self.last_error = None;
    }

    /// Σ unit price × quantity, recomputed from the lines.
    pub fn total(&self) -> Money {
        self.lines.iter().map(|l| l.line_total()).sum()
    }

    pub fn totals(&self) -> CartTotals {
        let subtotal: Money = self
            .lines
            .iter()
            .map(|l| l.list_price().multiply_quantity(l.quantity()))
            .sum();
        let total = self.total();

        CartTotals {
            item_count: self.len(),
            total_quantity: self.total_quantity(),
            subtotal_cents: subtotal.cents(),
            savings_cents: (subtotal - total).cents(),
            total_cents: total.cents(),
        }
    }

    pub fn total_quantity(&self) -> i64 {
        self.lines.iter().map(|l| l.quantity()).sum()
    }

    pub fn lines(&self) -> &[L] {
        &self.lines
    }

    pub fn into_lines(self) -> Vec<L> {
        self.lines
    }

    pub fn line(&self, product_id: &str) -> Option<&L> {
        self.lines.iter().find(|l| l.product_id() == product_id)
    }

    pub(crate) fn line_mut(&mut self, product_id: &str) -> Option<&mut L> {
        self.lines.iter_mut().find(|l| l.product_id() == product_id)
    }

    /// Number of distinct products.
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Error from the most recent rejected mutation, if not yet superseded.
    pub fn last_error(&self) -> Option<&CoreError> {
        self.last_error.as_ref()
    }

    pub fn clear_error(&mut self) {
        self.last_error = None;
    }

    /// Refreshes stock data on line snapshots from a newer catalog.
    ///
    /// Inventory, batches and status are replaced; prices already on the
    /// line are kept. Quantities above the new stock are left for the
    /// backend to reject.
    pub fn sync_inventory(&mut self, catalog: &[Product]) {
        for line in &mut self.lines {
            if let Some(fresh) = catalog.iter().find(|p| p.id == line.product().id) {
                let snapshot = line.product_mut();
                snapshot.inventory = fresh.inventory.clone();
                snapshot.batches = fresh.batches.clone();
                snapshot.status = fresh.status;
            }
        }
    }

    fn position(&self, product_id: &str) -> Option<usize> {
        self.lines.iter().position(|l| l.product_id() == product_id)
    }

    fn record<T>(&mut self, result: CoreResult<T>) -> CoreResult<T> {
        match &result {
            Ok(_) => self.last_error = None,
            Err(err) => {
                debug!(error = %err, "Cart mutation rejected");
                self.last_error = Some(err.clone());
            }
        }
        result
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
