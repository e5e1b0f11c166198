//! # Checkout Submission
//!
//! Pieces shared by the POS and storefront checkout flows.
//!
//! ```text
//! ┌──────────────┐   assemble    ┌──────────────┐  create_sale  ┌─────────┐
//! │ cart + gate  │ ────────────► │ SaleRequest  │ ────────────► │ backend │
//! └──────────────┘               └──────────────┘               └────┬────┘
//!                                                                    │
//!        ┌───────────────────────── Ok(receipt) ◄────────────────────┤
//!        ▼                                                           │
//!  clear cart, SuccessBanner::show ── window ──► expire              │
//!  refresh catalog (warn on failure)                                 │
//!                                                                    │
//!  Err(message) ◄────────────────────────────────────────────────────┘
//!  cart kept, message shown verbatim, no retry
//! ```

use std::time::Duration;

use tracing::{error, info, warn};

use pharmapos_api::PharmacyBackend;
use pharmapos_core::{SaleReceipt, SaleRequest};

use crate::error::SessionResult;

/// Sends a sale to the backend once and logs the outcome.
pub async fn submit_sale(
    backend: &dyn PharmacyBackend,
    request: &SaleRequest,
) -> SessionResult<SaleReceipt> {
    info!(
        lines = request.lines.len(),
        customer_id = request.customer_id.as_deref().unwrap_or("walk-in"),
        "Submitting sale"
    );

    match backend.create_sale(request).await {
        Ok(receipt) => {
            info!(sale_id = %receipt.id, total = %receipt.total(), "Sale completed");
            Ok(receipt)
        }
        Err(e) => {
            if e.is_transport() {
                error!(error = %e, "Sale submission failed");
            } else {
                warn!(error = %e, "Sale not accepted");
            }
            Err(e.into())
        }
    }
}

// =============================================================================
// Success Banner
// =============================================================================

/// Transient "sale completed" state.
///
/// Each `show` bumps a generation; an expiry timer only clears the banner it
/// was started for, so a quick second sale keeps its full window.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SuccessBanner {
    receipt: Option<SaleReceipt>,
    generation: u64,
}

impl SuccessBanner {
    /// Shows `receipt` and returns the generation to expire later.
    pub fn show(&mut self, receipt: SaleReceipt) -> u64 {
        self.generation += 1;
        self.receipt = Some(receipt);
        self.generation
    }

    /// Clears the banner if it still belongs to `generation`.
    pub fn expire(&mut self, generation: u64) -> bool {
        if self.generation == generation && self.receipt.is_some() {
            self.receipt = None;
            true
        } else {
            false
        }
    }

    pub fn dismiss(&mut self) {
        self.receipt = None;
    }

    pub fn is_visible(&self) -> bool {
        self.receipt.is_some()
    }

    pub fn receipt(&self) -> Option<&SaleReceipt> {
        self.receipt.as_ref()
    }
}

/// Runs `expire` once `window` has elapsed.
pub(crate) fn schedule_expiry<F>(window: Duration, expire: F)
where
    F: FnOnce() + Send + 'static,
{
    tokio::spawn(async move {
        tokio::time::sleep(window).await;
        expire();
    });
}
