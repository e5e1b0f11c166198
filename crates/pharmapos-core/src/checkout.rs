//! # Checkout Assembler
//!
//! Turns cart lines into the [`SaleRequest`] sent to the backend.
//!
//! ```text
//!  lines ──► empty? ──► prescriptions validated? (POS only) ──► SaleRequest
//!               │                    │                          { customerId,
//!               ▼                    ▼                            lines: [id, qty] }
//!           EmptyCart     PrescriptionNotValidated
//! ```
//!
//! Only product ids and quantities leave the cart. Prices, promotions and
//! stock are re-evaluated by the backend, whose total is authoritative.

use tracing::debug;

use crate::cart::{LedgerLine, PosCartLine};
use crate::error::{CoreError, CoreResult};
use crate::prescription::PrescriptionGate;
use crate::types::{Customer, SaleRequest, SaleRequestLine};

pub struct CheckoutAssembler;

impl CheckoutAssembler {
    /// Builds a sale request from any cart lines, in cart order.
    pub fn assemble<L: LedgerLine>(lines: &[L], customer_id: Option<&str>) -> CoreResult<SaleRequest> {
        if lines.is_empty() {
            return Err(CoreError::EmptyCart);
        }

        let request = SaleRequest {
            customer_id: customer_id.map(str::to_string),
            lines: lines
                .iter()
                .map(|l| SaleRequestLine {
                    product_id: l.product_id().to_string(),
                    quantity: l.quantity(),
                })
                .collect(),
        };

        debug!(
            lines = request.lines.len(),
            total_quantity = request.total_quantity(),
            "Sale request assembled"
        );
        Ok(request)
    }

    /// POS variant: also requires every prescription line to be validated.
    ///
    /// A walk-in sale (no customer selected) sends `customerId: null`.
    pub fn assemble_pos(
        lines: &[PosCartLine],
        customer: Option<&Customer>,
    ) -> CoreResult<SaleRequest> {
        if lines.is_empty() {
            return Err(CoreError::EmptyCart);
        }
        PrescriptionGate::check(lines)?;
        Self::assemble(lines, customer.map(|c| c.id.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cart::{CartLedger, CartLine, PosLedger};
    use crate::pricing::PricingResolver;
    use crate::stock::StockGuard;
    use crate::types::{Inventory, Product, Promotion, Role};

    fn product(id: &str, price_cents: i64, requires_prescription: bool) -> Product {
        Product {
            id: id.to_string(),
            name: format!("Product {}", id),
            description: None,
            price_cents,
            requires_prescription,
            status: Default::default(),
            category_id: None,
            promotions: vec![],
            batches: vec![],
            inventory: vec![Inventory {
                branch_id: "b-1".to_string(),
                total_stock: 10,
            }],
        }
    }

    fn ledger() -> PosLedger {
        CartLedger::new(Role::Staff, StockGuard::default(), PricingResolver::default())
    }

    #[test]
    fn test_empty_cart_rejected() {
        assert_eq!(
            CheckoutAssembler::assemble::<CartLine>(&[], Some("c-1")),
            Err(CoreError::EmptyCart)
        );
        assert_eq!(
            CheckoutAssembler::assemble_pos(&[], None),
            Err(CoreError::EmptyCart)
        );
    }

    #[test]
    fn test_pos_request_lines_in_cart_order() {
        let mut cart = ledger();
        let a = product("a", 1000, false);
        let mut b = product("b", 2000, false);
        b.promotions.push(Promotion {
            id: "promo-b".to_string(),
            product_id: "b".to_string(),
            discount_bps: 5000,
        });

        cart.add_line(&a).unwrap();
        cart.add_line(&b).unwrap();
        cart.add_line(&b).unwrap();

        let request = CheckoutAssembler::assemble_pos(cart.lines(), None).unwrap();
        assert_eq!(request.customer_id, None);
        assert_eq!(
            request.lines,
            vec![
                SaleRequestLine { product_id: "a".to_string(), quantity: 1 },
                SaleRequestLine { product_id: "b".to_string(), quantity: 2 },
            ]
        );
    }

    #[test]
    fn test_pos_request_with_customer() {
        let mut cart = ledger();
        cart.add_line(&product("a", 1000, false)).unwrap();
        let customer = Customer {
            id: "cust-7".to_string(),
            name: "Ana Silva".to_string(),
            email: None,
        };

        let request = CheckoutAssembler::assemble_pos(cart.lines(), Some(&customer)).unwrap();
        assert_eq!(request.customer_id.as_deref(), Some("cust-7"));
    }

    #[test]
    fn test_prescription_gate_applies_to_pos() {
        let mut cart = ledger();
        cart.add_line(&product("rx", 900, true)).unwrap();

        assert!(matches!(
            CheckoutAssembler::assemble_pos(cart.lines(), None),
            Err(CoreError::PrescriptionNotValidated { .. })
        ));

        cart.toggle_prescription("rx").unwrap();
        assert!(CheckoutAssembler::assemble_pos(cart.lines(), None).is_ok());
    }
}
