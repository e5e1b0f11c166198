//! # Storefront Cart
//!
//! The online customer's cart. Lines are priced at catalog price, persisted
//! after every change, and restored on startup.
//!
//! ```text
//! ┌──────────────┐  add / set qty / remove / clear   ┌─────────────────────┐
//! │ CustomerCart │ ────────────────────────────────► │ StorefrontLedger    │
//! │              │                                   │ role = Customer     │
//! │              │ ◄── save_lines(store, "cart") ─── │ scope = all branches│
//! └──────┬───────┘                                   └─────────────────────┘
//!        │ checkout (signed in only)
//!        ▼
//!  SaleRequest { customerId: session.user_id, lines }
//! ```
//!
//! Prescription products never enter this cart: they are counter sale only.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde::Serialize;
use tokio::sync::watch;
use tracing::{debug, info, warn};
use ts_rs::TS;

use pharmapos_core::{
    CartLine, CartTotals, CheckoutAssembler, CoreError, Product, Role, SaleReceipt, Session,
    StockGuard, StockScope, StorefrontLedger,
};

use crate::catalog::CatalogCache;
use crate::checkout::{schedule_expiry, submit_sale, SuccessBanner};
use crate::config::PosConfig;
use crate::error::{ErrorCode, ErrorPayload, SessionError, SessionResult};
use crate::store::{load_lines, save_lines, CartStore};

/// Everything the storefront cart page renders.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct CartSnapshot {
    pub lines: Vec<CartLine>,
    pub totals: CartTotals,
    pub signed_in: bool,
    pub is_processing: bool,
    pub error: Option<ErrorPayload>,
    pub success: bool,
    pub last_sale: Option<SaleReceipt>,
}

struct CustomerState {
    ledger: StorefrontLedger,
    session: Option<Session>,
    is_processing: bool,
    error: Option<ErrorPayload>,
    banner: SuccessBanner,
}

impl CustomerState {
    fn snapshot(&self) -> CartSnapshot {
        CartSnapshot {
            lines: self.ledger.lines().to_vec(),
            totals: self.ledger.totals(),
            signed_in: self.session.is_some(),
            is_processing: self.is_processing,
            error: self.error.clone(),
            success: self.banner.is_visible(),
            last_sale: self.banner.receipt().cloned(),
        }
    }
}

#[derive(Clone)]
pub struct CustomerCart {
    catalog: Arc<CatalogCache>,
    store: Arc<dyn CartStore>,
    key: String,
    state: Arc<Mutex<CustomerState>>,
    notifier: Arc<watch::Sender<CartSnapshot>>,
    success_window: Duration,
}

impl CustomerCart {
    /// Restores the persisted cart. Unusable stored data gives an empty cart.
    pub fn new(catalog: Arc<CatalogCache>, store: Arc<dyn CartStore>, config: &PosConfig) -> Self {
        let key = config.storage.cart_key.clone();
        let restored = load_lines(store.as_ref(), &key);

        let ledger = StorefrontLedger::new(
            Role::Customer,
            StockGuard::new(StockScope::AllBranches),
            config.pricing_resolver(),
        )
        .with_lines(restored);
        debug!(key = %key, lines = ledger.len(), "Storefront cart opened");

        let state = CustomerState {
            ledger,
            session: None,
            is_processing: false,
            error: None,
            banner: SuccessBanner::default(),
        };
        let (notifier, _) = watch::channel(state.snapshot());

        CustomerCart {
            catalog,
            store,
            key,
            state: Arc::new(Mutex::new(state)),
            notifier: Arc::new(notifier),
            success_window: config.success_display(),
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<CartSnapshot> {
        self.notifier.subscribe()
    }

    pub fn snapshot(&self) -> CartSnapshot {
        self.state.lock().expect("Cart mutex poisoned").snapshot()
    }

    pub fn sign_in(&self, session: Session) {
        info!(user_id = %session.user_id, "Customer signed in");
        self.with_state_mut(|state| {
            state.session = Some(session);
            if matches!(&state.error, Some(e) if e.code == ErrorCode::SessionError) {
                state.error = None;
            }
        });
    }

    /// The cart itself survives sign-out.
    pub fn sign_out(&self) {
        self.with_state_mut(|state| state.session = None);
    }

    fn with_state_mut<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&mut CustomerState) -> R,
    {
        let mut state = self.state.lock().expect("Cart mutex poisoned");
        let result = f(&mut state);
        self.notifier.send_replace(state.snapshot());
        result
    }

    /// Runs a cart command; a successful one is persisted.
    ///
    /// Refused while a sale is in flight, since a successful sale clears
    /// the cart.
    fn command<F, R>(&self, name: &str, f: F) -> SessionResult<R>
    where
        F: FnOnce(&mut StorefrontLedger) -> SessionResult<R>,
    {
        debug!(command = name, "Storefront cart command");
        self.with_state_mut(|state| {
            if state.is_processing {
                debug!(command = name, "Cart locked during checkout");
                return Err(SessionError::CheckoutInProgress);
            }
            let result = f(&mut state.ledger);
            match &result {
                Ok(_) => {
                    state.error = None;
                    self.persist(&state.ledger);
                }
                Err(e) => state.error = Some(e.to_payload()),
            }
            result
        })
    }

    fn persist(&self, ledger: &StorefrontLedger) {
        if let Err(e) = save_lines(self.store.as_ref(), &self.key, ledger.lines()) {
            warn!(key = %self.key, error = %e, "Failed to persist cart");
        }
    }

    // =========================================================================
    // Cart Commands
    // =========================================================================

    pub fn add(&self, product: &Product) -> SessionResult<()> {
        self.command("add", |ledger| Ok(ledger.add_line(product)?))
    }

    pub fn add_product(&self, product_id: &str) -> SessionResult<()> {
        let product = self.catalog.product(product_id);
        self.command("add", |ledger| {
            let product =
                product.ok_or_else(|| CoreError::ProductNotFound(product_id.to_string()))?;
            Ok(ledger.add_line(&product)?)
        })
    }

    pub fn set_quantity(&self, product_id: &str, quantity: i64) -> SessionResult<()> {
        self.command("set_quantity", |ledger| {
            Ok(ledger.set_quantity(product_id, quantity)?)
        })
    }

    pub fn remove(&self, product_id: &str) -> bool {
        self.command("remove", |ledger| Ok(ledger.remove_line(product_id).is_some()))
            .unwrap_or(false)
    }

    pub fn clear(&self) {
        let _ = self.command("clear", |ledger| {
            ledger.clear();
            Ok(())
        });
    }

    /// Refreshes the catalog and the stock data held by restored lines.
    pub async fn load_catalog(&self) -> SessionResult<()> {
        let result = self.catalog.refresh().await;
        let products = self.catalog.products();

        self.with_state_mut(|state| match result {
            Ok(()) => {
                state.ledger.sync_inventory(&products);
                self.persist(&state.ledger);
                Ok(())
            }
            Err(e) => {
                let err = SessionError::from(e);
                state.error = Some(err.to_payload());
                Err(err)
            }
        })
    }

    // =========================================================================
    // Checkout
    // =========================================================================

    /// Submits the cart for the signed-in customer.
    pub async fn checkout(&self) -> SessionResult<SaleReceipt> {
        let request = self.with_state_mut(|state| {
            if state.is_processing {
                return Err(SessionError::CheckoutInProgress);
            }
            let result = match &state.session {
                None => Err(SessionError::NoActiveSession),
                Some(session) => {
                    CheckoutAssembler::assemble(state.ledger.lines(), Some(&session.user_id))
                        .map_err(SessionError::from)
                }
            };
            match result {
                Ok(request) => {
                    state.is_processing = true;
                    state.error = None;
                    state.banner.dismiss();
                    Ok(request)
                }
                Err(err) => {
                    state.error = Some(err.to_payload());
                    Err(err)
                }
            }
        })?;

        let outcome = submit_sale(self.catalog.backend().as_ref(), &request).await;

        let (receipt, generation) = self.with_state_mut(|state| {
            state.is_processing = false;
            match outcome {
                Ok(receipt) => {
                    state.ledger.clear();
                    self.persist(&state.ledger);
                    let generation = state.banner.show(receipt.clone());
                    Ok((receipt, generation))
                }
                Err(err) => {
                    state.error = Some(err.to_payload());
                    Err(err)
                }
            }
        })?;

        let state = Arc::clone(&self.state);
        let notifier = Arc::clone(&self.notifier);
        schedule_expiry(self.success_window, move || {
            let mut state = state.lock().expect("Cart mutex poisoned");
            if state.banner.expire(generation) {
                notifier.send_replace(state.snapshot());
            }
        });

        if let Err(e) = self.catalog.refresh().await {
            warn!(error = %e, "Catalog refresh after sale failed");
        }

        Ok(receipt)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{JsonFileStore, MemoryStore};
    use crate::testing::{product, FakeBackend};
    use pharmapos_core::AdmissionDenial;

    fn products() -> Vec<Product> {
        let mut rx = product("rx", "Amoxicillin 500mg", 1500, 10);
        rx.requires_prescription = true;
        vec![
            product("a", "Paracetamol 500mg", 1000, 10),
            product("b", "Vitamin C 1g", 2000, 3),
            rx,
        ]
    }

    async fn cart_with(store: Arc<dyn CartStore>) -> (CustomerCart, Arc<FakeBackend>) {
        let backend = Arc::new(FakeBackend::new(products()));
        let catalog = Arc::new(CatalogCache::new(backend.clone()));
        let cart = CustomerCart::new(catalog, store, &PosConfig::default());
        cart.load_catalog().await.unwrap();
        (cart, backend)
    }

    #[tokio::test]
    async fn test_cart_is_persisted_and_restored() {
        let dir = tempfile::tempdir().unwrap();
        let store: Arc<dyn CartStore> = Arc::new(JsonFileStore::new(dir.path()));

        let (cart, _) = cart_with(store.clone()).await;
        cart.add_product("a").unwrap();
        cart.add_product("a").unwrap();
        cart.add_product("b").unwrap();
        drop(cart);

        let (restored, _) = cart_with(store).await;
        let snapshot = restored.snapshot();
        assert_eq!(snapshot.lines.len(), 2);
        assert_eq!(snapshot.lines[0].quantity, 2);
        assert_eq!(snapshot.totals.total_cents, 4000);
    }

    #[tokio::test]
    async fn test_corrupt_storage_starts_empty() {
        let store = Arc::new(MemoryStore::new());
        store.save("cart", "definitely not json").unwrap();

        let (cart, _) = cart_with(store).await;
        assert!(cart.snapshot().lines.is_empty());
    }

    #[tokio::test]
    async fn test_prescription_product_is_counter_sale_only() {
        let (cart, _) = cart_with(Arc::new(MemoryStore::new())).await;

        let err = cart.add_product("rx").unwrap_err();
        assert!(matches!(
            err,
            SessionError::Core(CoreError::AdmissionDenied {
                reason: AdmissionDenial::CounterSaleOnly,
                ..
            })
        ));
        assert!(cart.snapshot().lines.is_empty());
    }

    #[tokio::test]
    async fn test_checkout_requires_session() {
        let (cart, backend) = cart_with(Arc::new(MemoryStore::new())).await;
        cart.add_product("a").unwrap();

        let err = cart.checkout().await.unwrap_err();
        assert!(matches!(err, SessionError::NoActiveSession));
        assert_eq!(cart.snapshot().error.unwrap().code, ErrorCode::SessionError);
        assert!(backend.sales().is_empty());

        cart.sign_in(Session::new("cust-1", Role::Customer));
        assert!(cart.snapshot().error.is_none());

        let receipt = cart.checkout().await.unwrap();
        assert_eq!(receipt.customer_id.as_deref(), Some("cust-1"));
        assert_eq!(backend.sales()[0].customer_id.as_deref(), Some("cust-1"));

        let snapshot = cart.snapshot();
        assert!(snapshot.lines.is_empty());
        assert!(snapshot.success);
    }

    #[tokio::test]
    async fn test_successful_checkout_clears_stored_cart() {
        let store = Arc::new(MemoryStore::new());
        let (cart, _) = cart_with(store.clone()).await;
        cart.sign_in(Session::new("cust-1", Role::Customer));
        cart.add_product("a").unwrap();

        cart.checkout().await.unwrap();
        assert!(load_lines(store.as_ref(), "cart").is_empty());
    }

    #[tokio::test]
    async fn test_rejected_checkout_keeps_cart() {
        let store = Arc::new(MemoryStore::new());
        let (cart, backend) = cart_with(store.clone()).await;
        cart.sign_in(Session::new("cust-1", Role::Customer));
        cart.add_product("b").unwrap();
        backend.reject_sales(Some("Product is out of stock"));

        let err = cart.checkout().await.unwrap_err();
        assert_eq!(err.to_string(), "Product is out of stock");
        assert_eq!(cart.snapshot().lines.len(), 1);
        assert_eq!(load_lines(store.as_ref(), "cart").len(), 1);
    }

    #[tokio::test]
    async fn test_stock_is_counted_across_all_branches() {
        let (cart, _) = cart_with(Arc::new(MemoryStore::new())).await;
        cart.add_product("b").unwrap();
        cart.set_quantity("b", 3).unwrap();

        let err = cart.set_quantity("b", 4).unwrap_err();
        assert_eq!(err.code(), ErrorCode::InsufficientStock);
        assert_eq!(cart.snapshot().lines[0].quantity, 3);

        cart.set_quantity("b", 0).unwrap();
        assert!(cart.snapshot().lines.is_empty());
    }

    #[tokio::test]
    async fn test_restored_prescription_line_is_dropped() {
        let store = Arc::new(MemoryStore::new());
        let mut rx = product("rx", "Amoxicillin 500mg", 1500, 10);
        rx.requires_prescription = true;
        let stored = vec![
            CartLine { product: rx, quantity: 1 },
            CartLine { product: product("a", "Paracetamol 500mg", 1000, 10), quantity: 2 },
        ];
        save_lines(store.as_ref(), "cart", &stored).unwrap();

        let (cart, backend) = cart_with(store).await;
        let snapshot = cart.snapshot();
        assert_eq!(snapshot.lines.len(), 1);
        assert_eq!(snapshot.lines[0].product.id, "a");

        cart.sign_in(Session::new("cust-1", Role::Customer));
        cart.checkout().await.unwrap();
        let sales = backend.sales();
        assert_eq!(sales[0].lines.len(), 1);
        assert_eq!(sales[0].lines[0].product_id, "a");
    }

    #[tokio::test]
    async fn test_cart_is_locked_while_sale_is_in_flight() {
        let store = Arc::new(MemoryStore::new());
        let (cart, backend) = cart_with(store.clone()).await;
        cart.sign_in(Session::new("cust-1", Role::Customer));
        backend.hold_sales(true);
        cart.add_product("a").unwrap();

        let mut rx = cart.subscribe();
        let first = tokio::spawn({
            let cart = cart.clone();
            async move { cart.checkout().await }
        });
        rx.wait_for(|s| s.is_processing).await.unwrap();

        assert!(matches!(
            cart.add_product("b"),
            Err(SessionError::CheckoutInProgress)
        ));
        assert!(matches!(
            cart.set_quantity("a", 2),
            Err(SessionError::CheckoutInProgress)
        ));
        assert!(!cart.remove("a"));
        assert_eq!(load_lines(store.as_ref(), "cart").len(), 1);

        backend.release_sale();
        first.await.unwrap().unwrap();
        assert_eq!(backend.sales()[0].lines.len(), 1);
        assert!(cart.snapshot().lines.is_empty());
        assert!(cart.snapshot().error.is_none());
    }
}
