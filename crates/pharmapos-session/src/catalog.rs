//! # Catalog Cache
//!
//! Last catalog fetched from the backend, shared by the POS terminal and the
//! storefront cart.
//!
//! ```text
//! ┌────────────────┐  refresh()            ┌──────────────────────────────┐
//! │ PharmacyBackend│ ────────────────────► │ CatalogCache                 │
//! │                │  products + branches  │  Mutex<Catalog>              │
//! │                │  refresh_customers()  │  products, branches,         │
//! │                │ ────────────────────► │  customers, refreshed_at     │
//! └────────────────┘                       └──────────────────────────────┘
//! ```
//!
//! A failed refresh leaves the previous catalog in place.

use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::info;
use ts_rs::TS;

use pharmapos_api::{ApiResult, PharmacyBackend};
use pharmapos_core::{
    promotion::summarize, Branch, Customer, ExpiryClassifier, PricingResolver, Product,
    PromotionSummary, PromotionalStockEstimator,
};

/// One product on the expiry report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct ExpiryReportRow {
    pub product_id: String,
    pub product_name: String,
    /// Units to write off.
    pub expired_units: i64,
    pub near_expiry_units: i64,
    /// Lot numbers of the expired batches.
    pub expired_lots: Vec<String>,
}

/// Point-in-time copy of the backend catalog.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    pub products: Vec<Product>,
    pub branches: Vec<Branch>,
    pub customers: Vec<Customer>,
    pub refreshed_at: Option<DateTime<Utc>>,
}

impl Catalog {
    pub fn product(&self, product_id: &str) -> Option<&Product> {
        self.products.iter().find(|p| p.id == product_id)
    }

    pub fn customer(&self, customer_id: &str) -> Option<&Customer> {
        self.customers.iter().find(|c| c.id == customer_id)
    }

    /// Case-insensitive name search; an empty query matches everything.
    pub fn search(&self, query: &str) -> Vec<&Product> {
        let needle = query.trim().to_lowercase();
        self.products
            .iter()
            .filter(|p| needle.is_empty() || p.name.to_lowercase().contains(&needle))
            .collect()
    }

    /// Product card data for every product.
    pub fn product_cards(
        &self,
        resolver: &PricingResolver,
        estimator: &PromotionalStockEstimator,
        now: DateTime<Utc>,
    ) -> Vec<PromotionSummary> {
        self.products
            .iter()
            .map(|p| summarize(p, resolver, estimator, now))
            .collect()
    }

    /// Products holding expired or near-expiry batches, in catalog order.
    pub fn expiry_report(
        &self,
        classifier: &ExpiryClassifier,
        now: DateTime<Utc>,
    ) -> Vec<ExpiryReportRow> {
        self.products
            .iter()
            .filter_map(|p| {
                let breakdown = classifier.partition(&p.batches, now);
                if breakdown.expired.is_empty() && breakdown.near_expiry.is_empty() {
                    return None;
                }
                Some(ExpiryReportRow {
                    product_id: p.id.clone(),
                    product_name: p.name.clone(),
                    expired_units: breakdown.expired_quantity(),
                    near_expiry_units: breakdown.near_expiry_quantity(),
                    expired_lots: breakdown
                        .expired
                        .iter()
                        .map(|b| b.lot_number.clone())
                        .collect(),
                })
            })
            .collect()
    }
}

/// Shared, refreshable catalog.
pub struct CatalogCache {
    backend: Arc<dyn PharmacyBackend>,
    catalog: Mutex<Catalog>,
}

impl CatalogCache {
    pub fn new(backend: Arc<dyn PharmacyBackend>) -> Self {
        CatalogCache {
            backend,
            catalog: Mutex::new(Catalog::default()),
        }
    }

    pub fn backend(&self) -> &Arc<dyn PharmacyBackend> {
        &self.backend
    }

    /// Fetches products and branches. On error the cache is untouched.
    pub async fn refresh(&self) -> ApiResult<()> {
        let (products, branches) =
            tokio::try_join!(self.backend.list_products(), self.backend.list_branches())?;

        info!(
            products = products.len(),
            branches = branches.len(),
            "Catalog refreshed"
        );

        let mut catalog = self.catalog.lock().expect("Catalog mutex poisoned");
        catalog.products = products;
        catalog.branches = branches;
        catalog.refreshed_at = Some(Utc::now());
        Ok(())
    }

    /// Fetches the customer list (staff only on the backend side).
    pub async fn refresh_customers(&self) -> ApiResult<()> {
        let customers = self.backend.list_customers().await?;
        info!(customers = customers.len(), "Customers refreshed");

        self.catalog.lock().expect("Catalog mutex poisoned").customers = customers;
        Ok(())
    }

    pub fn snapshot(&self) -> Catalog {
        self.catalog.lock().expect("Catalog mutex poisoned").clone()
    }

    pub fn products(&self) -> Vec<Product> {
        self.catalog.lock().expect("Catalog mutex poisoned").products.clone()
    }

    pub fn product(&self, product_id: &str) -> Option<Product> {
        self.catalog
            .lock()
            .expect("Catalog mutex poisoned")
            .product(product_id)
            .cloned()
    }

    pub fn customer(&self, customer_id: &str) -> Option<Customer> {
        self.catalog
            .lock()
            .expect("Catalog mutex poisoned")
            .customer(customer_id)
            .cloned()
    }

    pub fn customers(&self) -> Vec<Customer> {
        self.catalog.lock().expect("Catalog mutex poisoned").customers.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{product, FakeBackend};
    use chrono::Duration;
    use pharmapos_core::{Batch, ExpiryClassifier, Promotion, PromotionPolicy};

    #[tokio::test]
    async fn test_refresh_populates_cache() {
        let backend = Arc::new(FakeBackend::new(vec![product("a", "Paracetamol", 1000, 5)]));
        let cache = CatalogCache::new(backend.clone());
        assert!(cache.products().is_empty());

        cache.refresh().await.unwrap();
        cache.refresh_customers().await.unwrap();

        let catalog = cache.snapshot();
        assert_eq!(catalog.products.len(), 1);
        assert_eq!(catalog.branches.len(), 1);
        assert!(catalog.refreshed_at.is_some());
        assert_eq!(cache.customer("cust-1").unwrap().name, "Ana Silva");
        assert!(cache.product("missing").is_none());
    }

    #[tokio::test]
    async fn test_failed_refresh_keeps_previous_catalog() {
        let backend = Arc::new(FakeBackend::new(vec![product("a", "Paracetamol", 1000, 5)]));
        let cache = CatalogCache::new(backend.clone());
        cache.refresh().await.unwrap();

        backend.fail_reads(true);
        assert!(cache.refresh().await.is_err());
        assert_eq!(cache.products().len(), 1);
    }

    #[test]
    fn test_search_is_case_insensitive() {
        let catalog = Catalog {
            products: vec![
                product("a", "Paracetamol 500mg", 1000, 5),
                product("b", "Vitamin C", 2000, 5),
            ],
            ..Catalog::default()
        };
        assert_eq!(catalog.search("PARA").len(), 1);
        assert_eq!(catalog.search("").len(), 2);
        assert!(catalog.search("ibuprofen").is_empty());
    }

    #[test]
    fn test_product_cards_count_near_expiry_units() {
        let now = Utc::now();
        let mut promo = product("b", "Vitamin C", 2000, 20);
        promo.promotions = vec![Promotion {
            id: "promo-b".to_string(),
            product_id: "b".to_string(),
            discount_bps: 5000,
        }];
        let batch = |id: &str, days: i64, quantity: i64| Batch {
            id: id.to_string(),
            lot_number: format!("LOT-{}", id),
            expiration_date: now + Duration::days(days),
            quantity,
            product_id: "b".to_string(),
            branch_id: "north".to_string(),
        };
        promo.batches = vec![batch("1", 10, 4), batch("2", 90, 7), batch("3", -5, 2)];

        let catalog = Catalog {
            products: vec![product("a", "Paracetamol", 1000, 5), promo],
            ..Catalog::default()
        };
        let cards = catalog.product_cards(
            &PricingResolver::new(PromotionPolicy::FirstListed),
            &PromotionalStockEstimator::new(ExpiryClassifier::new(60)),
            now,
        );

        assert!(!cards[0].has_promotion());
        assert_eq!(cards[0].discounted_units, 0);
        assert!(cards[1].has_promotion());
        assert_eq!(cards[1].final_price.cents(), 1000);
        assert_eq!(cards[1].discounted_units, 4);
    }

    #[test]
    fn test_expiry_report_lists_only_products_with_expiring_stock() {
        let now = Utc::now();
        let batch = |id: &str, days: i64, quantity: i64| Batch {
            id: id.to_string(),
            lot_number: format!("LOT-{}", id),
            expiration_date: now + Duration::days(days),
            quantity,
            product_id: "b".to_string(),
            branch_id: "north".to_string(),
        };
        let mut fresh = product("a", "Paracetamol", 1000, 5);
        fresh.batches = vec![batch("1", 200, 5)];
        let mut aging = product("b", "Vitamin C", 2000, 20);
        aging.batches = vec![
            batch("2", 10, 4),
            batch("3", 90, 7),
            batch("4", -5, 2),
            batch("5", 0, 1),
        ];

        let catalog = Catalog {
            products: vec![fresh, aging],
            ..Catalog::default()
        };
        let report = catalog.expiry_report(&ExpiryClassifier::new(60), now);

        assert_eq!(report.len(), 1);
        assert_eq!(report[0].product_id, "b");
        assert_eq!(report[0].near_expiry_units, 4);
        assert_eq!(report[0].expired_units, 3);
        assert_eq!(report[0].expired_lots, vec!["LOT-4".to_string(), "LOT-5".to_string()]);
    }
}
