//! # Pricing Module
//!
//! Derives the effective unit price of a product from its promotions.
//!
//! ## Resolution Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Product { price: $20.00, promotions: [P1 50%, P2 10%] }                │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  PromotionPolicy::select()                                              │
//! │       ├── FirstListed     → P1 (trust backend order)                    │
//! │       └── HighestDiscount → P1 (50% > 10%)                              │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ResolvedPrice { final: $10.00, discount: 50%, promotion: P1 }          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The backend recomputes prices at sale time; the resolved price is what the
//! cashier sees while building the cart.

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::ValidationError;
use crate::money::Money;
use crate::types::{DiscountRate, Product, Promotion};

// =============================================================================
// Promotion Policy
// =============================================================================

/// How one promotion is chosen when a product carries several.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum PromotionPolicy {
    /// First promotion in the order returned by the backend.
    #[default]
    FirstListed,

    /// Largest discount; ties go to the earlier promotion.
    HighestDiscount,
}

impl PromotionPolicy {
    /// Picks the promotion this policy applies, if any.
    pub fn select<'a>(&self, promotions: &'a [Promotion]) -> Option<&'a Promotion> {
        match self {
            PromotionPolicy::FirstListed => promotions.first(),
            PromotionPolicy::HighestDiscount => {
                promotions.iter().fold(None, |best, candidate| match best {
                    Some(current) if current.discount_bps >= candidate.discount_bps => {
                        Some(current)
                    }
                    _ => Some(candidate),
                })
            }
        }
    }
}

impl std::fmt::Display for PromotionPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PromotionPolicy::FirstListed => write!(f, "first_listed"),
            PromotionPolicy::HighestDiscount => write!(f, "highest_discount"),
        }
    }
}

impl FromStr for PromotionPolicy {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "first_listed" | "first" => Ok(PromotionPolicy::FirstListed),
            "highest_discount" | "highest" => Ok(PromotionPolicy::HighestDiscount),
            _ => Err(ValidationError::NotAllowed {
                field: "promotion_policy".to_string(),
                allowed: vec!["first_listed".to_string(), "highest_discount".to_string()],
            }),
        }
    }
}

// =============================================================================
// Resolved Price
// =============================================================================

/// Effective price of one unit after promotion resolution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedPrice {
    pub final_price: Money,
    pub discount: DiscountRate,
    pub promotion_id: Option<String>,
}

impl ResolvedPrice {
    /// True when a promotion actually lowers the price.
    #[inline]
    pub fn has_discount(&self) -> bool {
        self.promotion_id.is_some() && !self.discount.is_zero()
    }
}

// =============================================================================
// Pricing Resolver
// =============================================================================

/// Pure promotion pricing. Cheap to copy; carried by every cart ledger.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PricingResolver {
    policy: PromotionPolicy,
}

impl PricingResolver {
    pub const fn new(policy: PromotionPolicy) -> Self {
        PricingResolver { policy }
    }

    pub fn policy(&self) -> PromotionPolicy {
        self.policy
    }

    /// Resolves the unit price of `product`.
    ///
    /// ## Example
    /// ```rust
    /// use pharmapos_core::pricing::PricingResolver;
    /// use pharmapos_core::types::{Product, Promotion};
    ///
    /// let mut product: Product = serde_json::from_value(serde_json::json!({
    ///     "id": "p-1", "name": "Vitamin C", "priceCents": 2000
    /// })).unwrap();
    /// product.promotions.push(Promotion {
    ///     id: "promo-1".into(), product_id: "p-1".into(), discount_bps: 5000,
    /// });
    ///
    /// let resolved = PricingResolver::default().resolve(&product);
    /// assert_eq!(resolved.final_price.cents(), 1000);
    /// assert_eq!(resolved.promotion_id.as_deref(), Some("promo-1"));
    /// ```
    pub fn resolve(&self, product: &Product) -> ResolvedPrice {
        match self.policy.select(&product.promotions) {
            Some(promotion) => ResolvedPrice {
                final_price: product.price().apply_discount(promotion.discount()),
                discount: promotion.discount(),
                promotion_id: Some(promotion.id.clone()),
            },
            None => ResolvedPrice {
                final_price: product.price(),
                discount: DiscountRate::zero(),
                promotion_id: None,
            },
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
