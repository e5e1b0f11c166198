//! # Stock Guard
//!
//! Pre-submission check that a cart line never asks for more units than the
//! relevant inventory holds.
//!
//! ## Scope
//! ```text
//!  Product.inventory = [ {branch: "north", total: 4}, {branch: "south", total: 2} ]
//!
//!  StockScope::AllBranches        → 6   (storefront cart)
//!  StockScope::Branch("north")    → 4   (POS terminal in the north branch)
//! ```
//!
//! Two terminals selling the same lot race at the backend, which has the
//! final word. This guard only keeps the operator from building a cart that
//! is certain to be rejected.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{CoreError, CoreResult};
use crate::types::Product;

/// Which inventory records count towards available stock.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StockScope {
    #[default]
    AllBranches,
    Branch(String),
}

impl StockScope {
    /// Branch scope when a branch is assigned, every branch otherwise.
    pub fn for_branch(branch_id: Option<String>) -> Self {
        branch_id.map_or(StockScope::AllBranches, StockScope::Branch)
    }

    /// Units of `product` available in this scope (never negative).
    pub fn available(&self, product: &Product) -> i64 {
        let total: i64 = match self {
            StockScope::AllBranches => product.total_stock(),
            StockScope::Branch(branch_id) => product
                .inventory
                .iter()
                .filter(|i| &i.branch_id == branch_id)
                .map(|i| i.total_stock)
                .sum(),
        };
        total.max(0)
    }
}

/// Rejects quantity increases beyond available stock.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StockGuard {
    scope: StockScope,
}

impl StockGuard {
    pub fn new(scope: StockScope) -> Self {
        StockGuard { scope }
    }

    pub fn scope(&self) -> &StockScope {
        &self.scope
    }

    #[inline]
    pub fn available(&self, product: &Product) -> i64 {
        self.scope.available(product)
    }

    /// Checks moving a line from `current` to `requested` units.
    ///
    /// Keeping or lowering the quantity always passes, even when stock has
    /// since dropped below it.
    pub fn check(&self, product: &Product, current: i64, requested: i64) -> CoreResult<()> {
        if requested <= current {
            return Ok(());
        }

        let available = self.available(product);
        if requested > available {
            debug!(
                product_id = %product.id,
                available,
                requested,
                "Stock guard rejected quantity"
            );
            return Err(CoreError::InsufficientStock {
                product: product.name.clone(),
                available,
                requested,
            });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Inventory;

    fn product(stock: &[(&str, i64)]) -> Product {
        Product {
            id: "p-1".to_string(),
            name: "Salbutamol Inhaler".to_string(),
            description: None,
            price_cents: 1500,
            requires_prescription: false,
            status: Default::default(),
            category_id: None,
            promotions: vec![],
            batches: vec![],
            inventory: stock
                .iter()
                .map(|(branch, total)| Inventory {
                    branch_id: branch.to_string(),
                    total_stock: *total,
                })
                .collect(),
        }
    }

    #[test]
    fn test_scope_available() {
        let product = product(&[("north", 4), ("south", 2)]);
        assert_eq!(StockScope::AllBranches.available(&product), 6);
        assert_eq!(StockScope::Branch("north".into()).available(&product), 4);
        assert_eq!(StockScope::Branch("east".into()).available(&product), 0);
    }

    #[test]
    fn test_negative_inventory_clamps_to_zero() {
        let product = product(&[("north", -3)]);
        assert_eq!(StockScope::AllBranches.available(&product), 0);
    }

    #[test]
    fn test_for_branch() {
        assert_eq!(StockScope::for_branch(None), StockScope::AllBranches);
        assert_eq!(
            StockScope::for_branch(Some("b-1".into())),
            StockScope::Branch("b-1".into())
        );
    }

    #[test]
    fn test_check_at_and_above_stock() {
        let guard = StockGuard::default();
        let product = product(&[("north", 3)]);

        assert!(guard.check(&product, 0, 3).is_ok());
        let err = guard.check(&product, 3, 4).unwrap_err();
        assert_eq!(
            err,
            CoreError::InsufficientStock {
                product: "Salbutamol Inhaler".to_string(),
                available: 3,
                requested: 4,
            }
        );
    }

    #[test]
    fn test_lowering_always_passes() {
        let guard = StockGuard::default();
        let product = product(&[("north", 1)]);
        assert!(guard.check(&product, 5, 4).is_ok());
        assert!(guard.check(&product, 5, 5).is_ok());
    }
}
