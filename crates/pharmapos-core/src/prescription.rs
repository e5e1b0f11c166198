//! # Prescription Gate
//!
//! Blocks a POS checkout until every prescription line has been validated by
//! staff against the paper prescription.
//!
//! ## User Workflow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  CART                                                                   │
//! │  ┌────────────────────────────────────────────────────────────────┐    │
//! │  │  Ibuprofen 400mg          x1      $4.50                        │    │
//! │  │  Amoxicillin 500mg   Rx   x1      $9.00    [ ] validated       │    │
//! │  └────────────────────────────────────────────────────────────────┘    │
//! │                                                                         │
//! │  [Checkout] → "Prescription not validated for: Amoxicillin 500mg"      │
//! │                                                                         │
//! │  Cashier ticks the box → toggle_prescription("amox")                   │
//! │                                                                         │
//! │  [Checkout] → sale submitted                                           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use crate::cart::{PosCartLine, PosLedger};
use crate::error::{CoreError, CoreResult};

/// Checks and flips the prescription-validated flag on POS lines.
pub struct PrescriptionGate;

impl PrescriptionGate {
    /// Lines still waiting for validation, in cart order.
    pub fn pending(lines: &[PosCartLine]) -> Vec<&PosCartLine> {
        lines
            .iter()
            .filter(|l| l.needs_prescription_validation())
            .collect()
    }

    #[inline]
    pub fn is_satisfied(lines: &[PosCartLine]) -> bool {
        lines.iter().all(|l| !l.needs_prescription_validation())
    }

    /// Fails naming every unvalidated prescription product.
    pub fn check(lines: &[PosCartLine]) -> CoreResult<()> {
        let pending = Self::pending(lines);
        if pending.is_empty() {
            return Ok(());
        }

        Err(CoreError::PrescriptionNotValidated {
            products: pending.iter().map(|l| l.product.name.clone()).collect(),
        })
    }
}

impl PosLedger {
    /// Flips the validated flag on the line for `product_id`.
    ///
    /// The flag is stored for any line; only prescription products consult
    /// it. Returns the new value.
    pub fn toggle_prescription(&mut self, product_id: &str) -> CoreResult<bool> {
        let line = self
            .line_mut(product_id)
            .ok_or_else(|| CoreError::NotInCart(product_id.to_string()))?;
        line.validated_prescription = !line.validated_prescription;
        Ok(line.validated_prescription)
    }

    /// Lines still waiting for prescription validation.
    pub fn pending_prescriptions(&self) -> Vec<&PosCartLine> {
        PrescriptionGate::pending(self.lines())
    }
}
