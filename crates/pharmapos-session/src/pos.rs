//! # POS Terminal
//!
//! Counter sale state for one staff session.
//!
//! ## State Ownership
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  PosTerminal (Clone, cheap: every field is shared)                      │
//! │                                                                         │
//! │  Arc<Mutex<PosState>>          never held across .await                 │
//! │    ledger: PosLedger           branch-scoped StockGuard                 │
//! │    selected_customer           None = walk-in sale                      │
//! │    is_processing               one checkout at a time                   │
//! │    error: Option<ErrorPayload> last failure, cleared by next success    │
//! │    banner: SuccessBanner       "sale completed" for N seconds           │
//! │                                                                         │
//! │  Arc<watch::Sender<PosSnapshot>>  ─► UI re-renders on every change      │
//! │  Arc<CatalogCache>                ─► product lookup, refresh after sale │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Sale Workflow
//! ```text
//! add / set qty / remove ──► toggle Rx on controlled lines ──► pick customer
//!                                                                │
//!                 checkout: empty? gate? ──► POST /sales ◄───────┘
//!                        │                        │
//!                   Err (kept cart)        Ok: clear cart + customer,
//!                                          banner, refresh catalog
//! ```

use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde::Serialize;
use tokio::sync::watch;
use tracing::{debug, info, warn};
use ts_rs::TS;

use pharmapos_core::{
    CartTotals, CheckoutAssembler, CoreError, Customer, PosCartLine, PosLedger, Product,
    SaleReceipt, Session, StockGuard, StockScope,
};

use crate::catalog::CatalogCache;
use crate::checkout::{schedule_expiry, submit_sale, SuccessBanner};
use crate::config::PosConfig;
use crate::error::{ErrorPayload, SessionError, SessionResult};

// =============================================================================
// Snapshot
// =============================================================================

/// Everything the POS screen renders.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct PosSnapshot {
    pub lines: Vec<PosCartLine>,
    pub totals: CartTotals,
    pub selected_customer: Option<Customer>,
    /// Names of prescription products not yet validated.
    pub pending_prescriptions: Vec<String>,
    pub is_processing: bool,
    pub error: Option<ErrorPayload>,
    /// True while the "sale completed" banner is up.
    pub success: bool,
    pub last_sale: Option<SaleReceipt>,
}

struct PosState {
    ledger: PosLedger,
    selected_customer: Option<Customer>,
    is_processing: bool,
    error: Option<ErrorPayload>,
    banner: SuccessBanner,
}

impl PosState {
    fn snapshot(&self) -> PosSnapshot {
        PosSnapshot {
            lines: self.ledger.lines().to_vec(),
            totals: self.ledger.totals(),
            selected_customer: self.selected_customer.clone(),
            pending_prescriptions: self
                .ledger
                .pending_prescriptions()
                .iter()
                .map(|l| l.product.name.clone())
                .collect(),
            is_processing: self.is_processing,
            error: self.error.clone(),
            success: self.banner.is_visible(),
            last_sale: self.banner.receipt().cloned(),
        }
    }
}

// =============================================================================
// Terminal
// =============================================================================

#[derive(Clone)]
pub struct PosTerminal {
    session: Session,
    catalog: Arc<CatalogCache>,
    state: Arc<Mutex<PosState>>,
    notifier: Arc<watch::Sender<PosSnapshot>>,
    success_window: Duration,
}

impl PosTerminal {
    /// Opens a terminal for a staff or admin session.
    ///
    /// Stock is scoped to the session's branch, then the configured
    /// terminal branch, then every branch.
    pub fn new(session: Session, catalog: Arc<CatalogCache>, config: &PosConfig) -> SessionResult<Self> {
        if !session.role.is_staff() {
            return Err(SessionError::NotStaff);
        }

        let branch = session
            .branch_id
            .clone()
            .or_else(|| config.terminal.branch_id.clone());
        let guard = StockGuard::new(StockScope::for_branch(branch));
        info!(user_id = %session.user_id, scope = ?guard.scope(), "POS terminal opened");

        let state = PosState {
            ledger: PosLedger::new(session.role, guard, config.pricing_resolver()),
            selected_customer: None,
            is_processing: false,
            error: None,
            banner: SuccessBanner::default(),
        };
        let (notifier, _) = watch::channel(state.snapshot());

        Ok(PosTerminal {
            session,
            catalog,
            state: Arc::new(Mutex::new(state)),
            notifier: Arc::new(notifier),
            success_window: config.success_display(),
        })
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn catalog(&self) -> &Arc<CatalogCache> {
        &self.catalog
    }

    pub fn subscribe(&self) -> watch::Receiver<PosSnapshot> {
        self.notifier.subscribe()
    }

    pub fn snapshot(&self) -> PosSnapshot {
        self.state.lock().expect("POS state mutex poisoned").snapshot()
    }

    /// Runs `f` under the lock and publishes the resulting snapshot.
    fn with_state_mut<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&mut PosState) -> R,
    {
        let mut state = self.state.lock().expect("POS state mutex poisoned");
        let result = f(&mut state);
        self.notifier.send_replace(state.snapshot());
        result
    }

    /// Runs a cart command, recording its error on the snapshot.
    ///
    /// The cart is frozen while a sale is in flight: a successful sale
    /// clears it, so later edits would never be sold.
    fn command<F, R>(&self, name: &str, f: F) -> SessionResult<R>
    where
        F: FnOnce(&mut PosState) -> SessionResult<R>,
    {
        debug!(command = name, "POS cart command");
        self.with_state_mut(|state| {
            if state.is_processing {
                debug!(command = name, "Cart locked during checkout");
                return Err(SessionError::CheckoutInProgress);
            }
            let result = f(state);
            state.error = result.as_ref().err().map(SessionError::to_payload);
            result
        })
    }

    // =========================================================================
    // Catalog
    // =========================================================================

    /// Loads products, branches and customers, then refreshes line stock.
    pub async fn load_catalog(&self) -> SessionResult<()> {
        let result = async {
            self.catalog.refresh().await?;
            self.catalog.refresh_customers().await
        }
        .await;

        let products = self.catalog.products();
        self.with_state_mut(|state| match result {
            Ok(()) => {
                state.ledger.sync_inventory(&products);
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
    // Cart Commands
    // =========================================================================

    /// Adds one unit of a catalog product.
    pub fn add_product(&self, product_id: &str) -> SessionResult<()> {
        let product = self.catalog.product(product_id);
        self.command("add", |state| {
            let product =
                product.ok_or_else(|| CoreError::ProductNotFound(product_id.to_string()))?;
            Ok(state.ledger.add_line(&product)?)
        })
    }

    /// Adds one unit of `product` (e.g. from a barcode lookup).
    pub fn add(&self, product: &Product) -> SessionResult<()> {
        self.command("add", |state| Ok(state.ledger.add_line(product)?))
    }

    /// Quantities below 1 remove the line.
    pub fn set_quantity(&self, product_id: &str, quantity: i64) -> SessionResult<()> {
        self.command("set_quantity", |state| {
            Ok(state.ledger.set_quantity(product_id, quantity)?)
        })
    }

    /// Returns whether a line was removed.
    pub fn remove(&self, product_id: &str) -> bool {
        self.command("remove", |state| Ok(state.ledger.remove_line(product_id).is_some()))
            .unwrap_or(false)
    }

    pub fn clear(&self) {
        let _ = self.command("clear", |state| {
            state.ledger.clear();
            Ok(())
        });
    }

    /// Flips the prescription-validated flag. Returns the new value.
    pub fn toggle_prescription(&self, product_id: &str) -> SessionResult<bool> {
        self.command("toggle_prescription", |state| {
            Ok(state.ledger.toggle_prescription(product_id)?)
        })
    }

    /// Attaches a customer to the sale; `None` makes it a walk-in sale.
    pub fn select_customer(&self, customer_id: Option<&str>) -> SessionResult<()> {
        let customer = match customer_id {
            Some(id) => Some(
                self.catalog
                    .customer(id)
                    .ok_or_else(|| SessionError::CustomerNotFound(id.to_string())),
            ),
            None => None,
        };

        self.command("select_customer", |state| {
            state.selected_customer = customer.transpose()?;
            Ok(())
        })
    }

    pub fn dismiss_error(&self) {
        self.with_state_mut(|state| state.error = None);
    }

    // =========================================================================
    // Checkout
    // =========================================================================

    /// Submits the cart as a sale.
    ///
    /// ## Errors
    /// - `CheckoutInProgress` while another checkout is running
    /// - `EmptyCart`, `PrescriptionNotValidated` before any network call
    /// - the backend's rejection, verbatim; the cart is left as it was
    pub async fn checkout(&self) -> SessionResult<SaleReceipt> {
        let request = self.with_state_mut(|state| {
            if state.is_processing {
                return Err(SessionError::CheckoutInProgress);
            }
            match CheckoutAssembler::assemble_pos(
                state.ledger.lines(),
                state.selected_customer.as_ref(),
            ) {
                Ok(request) => {
                    state.is_processing = true;
                    state.error = None;
                    state.banner.dismiss();
                    Ok(request)
                }
                Err(e) => {
                    let err = SessionError::from(e);
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
                    state.selected_customer = None;
                    let generation = state.banner.show(receipt.clone());
                    Ok((receipt, generation))
                }
                Err(err) => {
                    state.error = Some(err.to_payload());
                    Err(err)
                }
            }
        })?;

        self.schedule_banner_expiry(generation);

        if let Err(e) = self.catalog.refresh().await {
            warn!(error = %e, "Catalog refresh after sale failed");
        }

        Ok(receipt)
    }

    fn schedule_banner_expiry(&self, generation: u64) {
        let state = Arc::clone(&self.state);
        let notifier = Arc::clone(&self.notifier);

        schedule_expiry(self.success_window, move || {
            let mut state = state.lock().expect("POS state mutex poisoned");
            if state.banner.expire(generation) {
                notifier.send_replace(state.snapshot());
            }
        });
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use crate::testing::{product, FakeBackend};
    use pharmapos_core::{Inventory, Promotion, Role};

    fn catalog_products() -> Vec<Product> {
        let a = product("a", "Paracetamol 500mg", 1000, 10);
        let mut b = product("b", "Vitamin C 1g", 2000, 10);
        b.promotions = vec![Promotion {
            id: "promo-b".to_string(),
            product_id: "b".to_string(),
            discount_bps: 5000,
        }];
        let mut rx = product("rx", "Amoxicillin 500mg", 1500, 10);
        rx.requires_prescription = true;
        let low = product("low", "Insulin Pen", 4500, 3);
        vec![a, b, rx, low]
    }

    fn staff() -> Session {
        Session::new("staff-1", Role::Staff)
    }

    async fn terminal_with(config: PosConfig) -> (PosTerminal, Arc<FakeBackend>) {
        let backend = Arc::new(FakeBackend::new(catalog_products()));
        let catalog = Arc::new(CatalogCache::new(backend.clone()));
        let terminal = PosTerminal::new(staff(), catalog, &config).unwrap();
        terminal.load_catalog().await.unwrap();
        (terminal, backend)
    }

    async fn terminal() -> (PosTerminal, Arc<FakeBackend>) {
        terminal_with(PosConfig::default()).await
    }

    #[tokio::test]
    async fn test_customer_session_cannot_open_terminal() {
        let backend = Arc::new(FakeBackend::default());
        let catalog = Arc::new(CatalogCache::new(backend));
        let result = PosTerminal::new(
            Session::new("cust-1", Role::Customer),
            catalog,
            &PosConfig::default(),
        );
        assert!(matches!(result, Err(SessionError::NotStaff)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_walk_in_sale_clears_cart_and_shows_banner() {
        let (terminal, backend) = terminal().await;

        terminal.add_product("a").unwrap();
        terminal.add_product("b").unwrap();
        terminal.add_product("b").unwrap();
        assert_eq!(terminal.snapshot().totals.total_cents, 3000);

        let receipt = terminal.checkout().await.unwrap();
        assert_eq!(receipt.total_cents, 3000);

        let sales = backend.sales();
        assert_eq!(sales.len(), 1);
        assert_eq!(sales[0].customer_id, None);
        assert_eq!(sales[0].lines.len(), 2);
        assert_eq!(sales[0].lines[1].quantity, 2);

        let snapshot = terminal.snapshot();
        assert!(snapshot.lines.is_empty());
        assert!(snapshot.success);
        assert!(!snapshot.is_processing);
        assert_eq!(snapshot.last_sale.unwrap().id, "sale-1");

        // Catalog was refreshed with the decremented stock.
        let a = terminal.catalog().product("a").unwrap();
        assert_eq!(a.inventory[0].total_stock, 9);
    }

    #[tokio::test(start_paused = true)]
    async fn test_success_banner_expires_after_window() {
        let (terminal, _) = terminal().await;
        let mut rx = terminal.subscribe();

        terminal.add_product("a").unwrap();
        terminal.checkout().await.unwrap();
        assert!(rx.borrow_and_update().success);

        let start = tokio::time::Instant::now();
        let snapshot = rx.wait_for(|s| !s.success).await.unwrap().clone();
        assert!(start.elapsed() >= Duration::from_secs(5));
        assert!(snapshot.last_sale.is_none());
    }

    #[tokio::test]
    async fn test_fourth_add_exceeds_stock_of_three() {
        let (terminal, _) = terminal().await;

        for _ in 0..3 {
            terminal.add_product("low").unwrap();
        }
        let err = terminal.add_product("low").unwrap_err();
        assert_eq!(err.code(), ErrorCode::InsufficientStock);

        let snapshot = terminal.snapshot();
        assert_eq!(snapshot.lines[0].cart_quantity, 3);
        assert_eq!(snapshot.error.unwrap().code, ErrorCode::InsufficientStock);

        // Next successful command clears the error.
        terminal.set_quantity("low", 2).unwrap();
        assert!(terminal.snapshot().error.is_none());
    }

    #[tokio::test]
    async fn test_prescription_gate_blocks_checkout_until_toggled() {
        let (terminal, backend) = terminal().await;

        terminal.add_product("rx").unwrap();
        terminal.add_product("a").unwrap();
        assert_eq!(terminal.snapshot().pending_prescriptions, vec!["Amoxicillin 500mg"]);

        let err = terminal.checkout().await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::PrescriptionRequired);
        assert!(backend.sales().is_empty());
        assert_eq!(terminal.snapshot().lines.len(), 2);

        assert!(terminal.toggle_prescription("rx").unwrap());
        assert!(terminal.snapshot().pending_prescriptions.is_empty());
        terminal.checkout().await.unwrap();
        assert_eq!(backend.sales().len(), 1);
    }

    #[tokio::test]
    async fn test_rejected_sale_keeps_cart_and_message() {
        let (terminal, backend) = terminal().await;
        backend.reject_sales(Some("Insufficient stock for Paracetamol 500mg"));

        terminal.add_product("a").unwrap();
        terminal.select_customer(Some("cust-1")).unwrap();

        let err = terminal.checkout().await.unwrap_err();
        assert_eq!(err.to_string(), "Insufficient stock for Paracetamol 500mg");

        let snapshot = terminal.snapshot();
        assert_eq!(snapshot.lines.len(), 1);
        assert_eq!(snapshot.selected_customer.unwrap().id, "cust-1");
        assert!(!snapshot.is_processing);
        assert!(!snapshot.success);
        assert_eq!(
            snapshot.error.unwrap().message,
            "Insufficient stock for Paracetamol 500mg"
        );
    }

    #[tokio::test]
    async fn test_selected_customer_is_sent_and_cleared() {
        let (terminal, backend) = terminal().await;

        assert!(matches!(
            terminal.select_customer(Some("nobody")),
            Err(SessionError::CustomerNotFound(_))
        ));

        terminal.select_customer(Some("cust-1")).unwrap();
        terminal.add_product("a").unwrap();
        terminal.checkout().await.unwrap();

        assert_eq!(backend.sales()[0].customer_id.as_deref(), Some("cust-1"));
        assert!(terminal.snapshot().selected_customer.is_none());
    }

    #[tokio::test]
    async fn test_empty_cart_checkout_is_refused_locally() {
        let (terminal, backend) = terminal().await;
        let err = terminal.checkout().await.unwrap_err();
        assert!(matches!(err, SessionError::Core(CoreError::EmptyCart)));
        assert!(backend.sales().is_empty());
    }

    #[tokio::test]
    async fn test_second_checkout_while_processing_is_rejected() {
        let (terminal, backend) = terminal().await;
        backend.hold_sales(true);
        terminal.add_product("a").unwrap();

        let mut rx = terminal.subscribe();
        let first = tokio::spawn({
            let terminal = terminal.clone();
            async move { terminal.checkout().await }
        });
        rx.wait_for(|s| s.is_processing).await.unwrap();

        let err = terminal.checkout().await.unwrap_err();
        assert!(matches!(err, SessionError::CheckoutInProgress));

        backend.release_sale();
        first.await.unwrap().unwrap();
        assert_eq!(backend.sales().len(), 1);
    }

    #[tokio::test]
    async fn test_branch_scope_limits_stock() {
        let mut config = PosConfig::default();
        config.terminal.branch_id = Some("south".to_string());
        let (terminal, _) = terminal_with(config).await;

        // Catalog stock lives at "north" only.
        let err = terminal.add_product("a").unwrap_err();
        assert_eq!(err.code(), ErrorCode::InsufficientStock);

        let mut local = product("c", "Ibuprofen 200mg", 800, 0);
        local.inventory.push(Inventory {
            branch_id: "south".to_string(),
            total_stock: 2,
        });
        terminal.add(&local).unwrap();
        terminal.add(&local).unwrap();
        assert!(terminal.add(&local).is_err());
    }

    #[tokio::test]
    async fn test_remove_and_clear() {
        let (terminal, _) = terminal().await;
        terminal.add_product("a").unwrap();
        terminal.add_product("b").unwrap();

        assert!(terminal.remove("a"));
        assert!(!terminal.remove("a"));
        assert_eq!(terminal.snapshot().lines.len(), 1);

        terminal.set_quantity("b", 0).unwrap();
        assert!(terminal.snapshot().lines.is_empty());

        terminal.add_product("a").unwrap();
        terminal.clear();
        assert_eq!(terminal.snapshot().totals.total_cents, 0);
        assert!(matches!(
            terminal.add_product("missing"),
            Err(SessionError::Core(CoreError::ProductNotFound(_)))
        ));
    }

    #[tokio::test]
    async fn test_cart_is_locked_while_sale_is_in_flight() {
        let (terminal, backend) = terminal().await;
        backend.hold_sales(true);
        terminal.add_product("a").unwrap();
        terminal.add_product("rx").unwrap();
        terminal.toggle_prescription("rx").unwrap();

        let mut rx = terminal.subscribe();
        let first = tokio::spawn({
            let terminal = terminal.clone();
            async move { terminal.checkout().await }
        });
        rx.wait_for(|s| s.is_processing).await.unwrap();

        assert!(matches!(
            terminal.add_product("b"),
            Err(SessionError::CheckoutInProgress)
        ));
        assert!(matches!(
            terminal.set_quantity("a", 3),
            Err(SessionError::CheckoutInProgress)
        ));
        assert!(matches!(
            terminal.toggle_prescription("rx"),
            Err(SessionError::CheckoutInProgress)
        ));
        assert!(matches!(
            terminal.select_customer(Some("cust-1")),
            Err(SessionError::CheckoutInProgress)
        ));
        assert!(!terminal.remove("a"));
        terminal.clear();

        let snapshot = terminal.snapshot();
        assert_eq!(snapshot.lines.len(), 2);
        assert!(snapshot.error.is_none());

        backend.release_sale();
        first.await.unwrap().unwrap();

        let sales = backend.sales();
        assert_eq!(sales.len(), 1);
        assert_eq!(sales[0].lines.len(), 2);
        assert_eq!(sales[0].lines[0].quantity, 1);
        assert!(terminal.snapshot().lines.is_empty());

        terminal.add_product("b").unwrap();
        assert_eq!(terminal.snapshot().lines.len(), 1);
    }
}
