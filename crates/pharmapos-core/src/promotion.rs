//! # Promotion Eligibility
//!
//! Estimates how many units of a product can still be sold at the
//! promotional price, and bundles that with the resolved price for the
//! storefront product card.
//!
//! Near-expiry lots are the ones put on promotion, so the promotional stock
//! is the sum of near-expiry, non-expired batch quantities:
//! ```text
//!  Batch  expires in   quantity   counted?
//!  ─────  ──────────   ────────   ────────
//!  L-01      -5 days         4    no  (expired)
//!  L-02      10 days         6    yes
//!  L-03      90 days        20    no  (beyond 60-day horizon)
//!                                 ────
//!                                    6 discounted units
//! ```
//!
//! This number is display data only. The backend decides at sale time.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::expiry::ExpiryClassifier;
use crate::money::Money;
use crate::pricing::PricingResolver;
use crate::types::{Batch, DiscountRate, Product};

/// Sums near-expiry batch quantities.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PromotionalStockEstimator {
    classifier: ExpiryClassifier,
}

impl PromotionalStockEstimator {
    pub const fn new(classifier: ExpiryClassifier) -> Self {
        PromotionalStockEstimator { classifier }
    }

    /// Units eligible for promotional pricing at instant `now`.
    ///
    /// Negative batch quantities (corrections in flight) count as zero.
    pub fn estimate(&self, batches: &[Batch], now: DateTime<Utc>) -> i64 {
        batches
            .iter()
            .filter(|b| self.classifier.classify_batch(b, now).is_near_expiry())
            .map(|b| b.quantity.max(0))
            .sum()
    }
}

// =============================================================================
// Product Card Summary
// =============================================================================

/// What the storefront product card renders for one product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct PromotionSummary {
    pub product_id: String,
    pub original_price: Money,
    pub final_price: Money,
    pub discount: DiscountRate,
    pub promotion_id: Option<String>,
    /// Units left at the promotional price (advisory).
    pub discounted_units: i64,
    /// The card replaces "add to cart" with a counter-sale notice.
    pub counter_sale_only: bool,
}

impl PromotionSummary {
    #[inline]
    pub fn has_promotion(&self) -> bool {
        self.promotion_id.is_some() && !self.discount.is_zero()
    }
}

/// Builds the product card summary for `product` at instant `now`.
pub fn summarize(
    product: &Product,
    resolver: &PricingResolver,
    estimator: &PromotionalStockEstimator,
    now: DateTime<Utc>,
) -> PromotionSummary {
    let resolved = resolver.resolve(product);
    let discounted_units = if resolved.has_discount() {
        estimator.estimate(&product.batches, now)
    } else {
        0
    };

    PromotionSummary {
        product_id: product.id.clone(),
        original_price: product.price(),
        final_price: resolved.final_price,
        discount: resolved.discount,
        promotion_id: resolved.promotion_id,
        discounted_units,
        counter_sale_only: product.requires_prescription,
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
