//! # Cart Admission Control
//!
//! Decides whether a product may enter a cart at all, before any stock or
//! quantity rule runs.
//!
//! | Product                      | Customer | Staff / Admin |
//! |------------------------------|----------|---------------|
//! | active, OTC                  | yes      | yes           |
//! | active, prescription needed  | no       | yes           |
//! | inactive or expired          | no       | no            |
//!
//! Prescription items are counter sales: staff validate the prescription in
//! the POS before checkout (see [`crate::prescription`]).

use crate::error::{AdmissionDenial, CoreError, CoreResult};
use crate::types::{Product, ProductStatus, Role};

/// Returns the reason `product` is refused for `role`, if any.
pub fn denial_reason(product: &Product, role: Role) -> Option<AdmissionDenial> {
    match product.status {
        ProductStatus::Inactive => return Some(AdmissionDenial::Inactive),
        ProductStatus::Expired => return Some(AdmissionDenial::Expired),
        ProductStatus::Active => {}
    }

    if product.requires_prescription && !role.is_staff() {
        return Some(AdmissionDenial::CounterSaleOnly);
    }

    None
}

/// True when `role` may add `product` to a cart.
#[inline]
pub fn can_add(product: &Product, role: Role) -> bool {
    denial_reason(product, role).is_none()
}

/// Same as [`can_add`] but as a `CoreResult` carrying the reason.
pub fn check_admission(product: &Product, role: Role) -> CoreResult<()> {
    match denial_reason(product, role) {
        Some(reason) => Err(CoreError::AdmissionDenied {
            product: product.name.clone(),
            reason,
        }),
        None => Ok(()),
    }
}
