//! # Error Types
//!
//! Domain-specific error types for pharmapos-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  pharmapos-core errors (this file)                                     │
//! │  ├── CoreError        - Cart, stock and checkout rule violations       │
//! │  └── ValidationError  - Input validation failures                      │
//! │                                                                         │
//! │  pharmapos-api errors (separate crate)                                 │
//! │  └── ApiError         - Transport, rejection and decode failures       │
//! │                                                                         │
//! │  pharmapos-session errors                                              │
//! │  └── SessionError     - What the UI sees (wraps both of the above)     │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError ─┐                                  │
//! │                         ApiError ───┴──► SessionError → UI message     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every `CoreError` is soft: the operation that produced it left the cart
//! untouched, and its `Display` text is shown to the operator as-is.

use thiserror::Error;

// =============================================================================
// Core Error
// =============================================================================

/// Core business logic errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    /// Product id is not in the catalog.
    #[error("Product not found: {0}")]
    ProductNotFound(String),

    /// Product id has no line in the cart.
    #[error("Product {0} is not in the cart")]
    NotInCart(String),

    /// A mutation would raise a line above available stock.
    ///
    /// ## User Workflow
    /// ```text
    /// Add "Amoxicillin" (line already at 3)
    ///      │
    ///      ▼
    /// StockGuard: available=3, requested=4
    ///      │
    ///      ▼
    /// UI shows: "Insufficient stock for Amoxicillin: only 3 available"
    /// ```
    #[error("Insufficient stock for {product}: only {available} available")]
    InsufficientStock {
        product: String,
        available: i64,
        requested: i64,
    },

    /// Product may not enter this cart.
    #[error("{product} {reason}")]
    AdmissionDenied {
        product: String,
        reason: AdmissionDenial,
    },

    /// Checkout attempted with no lines.
    #[error("Cart is empty")]
    EmptyCart,

    /// Checkout attempted while prescription lines are unvalidated.
    #[error("Prescription not validated for: {}", .products.join(", "))]
    PrescriptionNotValidated { products: Vec<String> },

    /// Cart has exceeded maximum allowed lines.
    #[error("Cart cannot have more than {max} items")]
    CartTooLarge { max: usize },

    /// Item quantity exceeds maximum allowed.
    #[error("Quantity {requested} exceeds maximum allowed ({max})")]
    QuantityTooLarge { requested: i64, max: i64 },

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

/// Why a product was refused by cart admission control.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum AdmissionDenial {
    /// Prescription-required item offered to the storefront cart.
    #[error("requires a prescription and is sold at the counter only")]
    CounterSaleOnly,

    #[error("is not available for sale")]
    Inactive,

    #[error("is expired and cannot be sold")]
    Expired,
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// Raised before any business rule runs, including when decoding backend
/// payloads into domain types.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Invalid format (e.g., unparsable decimal or date).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// Value is not in allowed set.
    #[error("{field} must be one of: {allowed:?}")]
    NotAllowed { field: String, allowed: Vec<String> },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insufficient_stock_names_product_and_available() {
        let err = CoreError::InsufficientStock {
            product: "Amoxicillin 500mg".to_string(),
            available: 3,
            requested: 4,
        };
        assert_eq!(
            err.to_string(),
            "Insufficient stock for Amoxicillin 500mg: only 3 available"
        );
    }

    #[test]
    fn test_admission_denied_message() {
        let err = CoreError::AdmissionDenied {
            product: "Diazepam 5mg".to_string(),
            reason: AdmissionDenial::CounterSaleOnly,
        };
        assert_eq!(
            err.to_string(),
            "Diazepam 5mg requires a prescription and is sold at the counter only"
        );
    }

    #[test]
    fn test_prescription_message_lists_products() {
        let err = CoreError::PrescriptionNotValidated {
            products: vec!["Diazepam".to_string(), "Tramadol".to_string()],
        };
        assert_eq!(
            err.to_string(),
            "Prescription not validated for: Diazepam, Tramadol"
        );
    }

    #[test]
    fn test_validation_converts_to_core_error() {
        let validation_err = ValidationError::Required {
            field: "id".to_string(),
        };
        let core_err: CoreError = validation_err.into();
        assert!(matches!(core_err, CoreError::Validation(_)));
    }
}
