//! # Session Error Type
//!
//! Unified error type for session operations, and the payload the UI shows.
//!
//! ## Error Handling Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Flow in PharmaPOS                              │
//! │                                                                         │
//! │  UI action (add, set qty, checkout)                                     │
//! │         │                                                               │
//! │         ▼                                                               │
//! │  ┌──────────────────────────────────────────────────────────────────┐  │
//! │  │  PosTerminal / CustomerCart                                      │  │
//! │  │  SessionResult<T>                                                │  │
//! │  │         │                                                        │  │
//! │  │  Cart rule? ─── CoreError::InsufficientStock ──┐                 │  │
//! │  │         │                                      │                 │  │
//! │  │  Backend? ───── ApiError::Rejected ────────────┼─► SessionError  │  │
//! │  │         │                                      │        │        │  │
//! │  │  Session? ───── NoActiveSession ───────────────┘        │        │  │
//! │  └─────────────────────────────────────────────────────────┼────────┘  │
//! │                                                            ▼           │
//! │          snapshot.error = ErrorPayload { code, message }  + Err(..)   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use serde::{Deserialize, Serialize};
use thiserror::Error;
use ts_rs::TS;

use pharmapos_api::ApiError;
use pharmapos_core::CoreError;

/// Result type alias for session operations.
pub type SessionResult<T> = Result<T, SessionError>;

#[derive(Debug, Error)]
pub enum SessionError {
    /// A cart, stock or checkout rule refused the operation.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// The backend call failed or was rejected.
    #[error(transparent)]
    Api(#[from] ApiError),

    /// Storefront checkout without a signed-in customer.
    #[error("Please sign in to complete your purchase")]
    NoActiveSession,

    /// A second checkout while one is in flight.
    #[error("A checkout is already in progress")]
    CheckoutInProgress,

    /// POS terminal opened by a non-staff session.
    #[error("Only staff members can operate the POS terminal")]
    NotStaff,

    #[error("Customer not found: {0}")]
    CustomerNotFound(String),

    // =========================================================================
    // Configuration & Storage
    // =========================================================================
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Failed to load config: {0}")]
    ConfigLoadFailed(String),

    #[error("Failed to save config: {0}")]
    ConfigSaveFailed(String),

    #[error("Storage error: {0}")]
    Storage(String),
}

// =============================================================================
// Error Conversions
// =============================================================================

impl From<std::io::Error> for SessionError {
    fn from(err: std::io::Error) -> Self {
        SessionError::Storage(err.to_string())
    }
}

impl From<toml::de::Error> for SessionError {
    fn from(err: toml::de::Error) -> Self {
        SessionError::ConfigLoadFailed(err.to_string())
    }
}

impl From<toml::ser::Error> for SessionError {
    fn from(err: toml::ser::Error) -> Self {
        SessionError::ConfigSaveFailed(err.to_string())
    }
}

impl From<serde_json::Error> for SessionError {
    fn from(err: serde_json::Error) -> Self {
        SessionError::Storage(err.to_string())
    }
}

// =============================================================================
// UI Error Payload
// =============================================================================

/// Error codes the UI can switch on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Not enough stock for the requested quantity.
    InsufficientStock,
    /// Prescription lines are not validated yet.
    PrescriptionRequired,
    /// Other cart rule (empty cart, limits, admission).
    CartError,
    /// Input failed validation.
    ValidationError,
    /// Signed-out or wrong-role session.
    SessionError,
    /// Backend refused the request.
    BackendRejected,
    /// Backend unreachable or answered garbage.
    NetworkError,
    /// Configuration or local storage failure.
    Internal,
}

/// What the UI receives when an operation fails.
///
/// ```json
/// { "code": "INSUFFICIENT_STOCK", "message": "Insufficient stock for Amoxicillin: only 3 available" }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct ErrorPayload {
    pub code: ErrorCode,
    pub message: String,
}

impl SessionError {
    pub fn code(&self) -> ErrorCode {
        match self {
            SessionError::Core(CoreError::InsufficientStock { .. }) => ErrorCode::InsufficientStock,
            SessionError::Core(CoreError::PrescriptionNotValidated { .. }) => {
                ErrorCode::PrescriptionRequired
            }
            SessionError::Core(CoreError::Validation(_)) => ErrorCode::ValidationError,
            SessionError::Core(_) => ErrorCode::CartError,
            SessionError::Api(ApiError::Rejected { .. }) => ErrorCode::BackendRejected,
            SessionError::Api(ApiError::InvalidConfig(_) | ApiError::InvalidUrl(_)) => {
                ErrorCode::Internal
            }
            SessionError::Api(_) => ErrorCode::NetworkError,
            SessionError::NoActiveSession
            | SessionError::CheckoutInProgress
            | SessionError::NotStaff => ErrorCode::SessionError,
            SessionError::CustomerNotFound(_) => ErrorCode::ValidationError,
            SessionError::InvalidConfig(_)
            | SessionError::ConfigLoadFailed(_)
            | SessionError::ConfigSaveFailed(_)
            | SessionError::Storage(_) => ErrorCode::Internal,
        }
    }

    pub fn to_payload(&self) -> ErrorPayload {
        ErrorPayload {
            code: self.code(),
            message: self.to_string(),
        }
    }
}

impl From<&SessionError> for ErrorPayload {
    fn from(err: &SessionError) -> Self {
        err.to_payload()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_message_passes_through() {
        let err = SessionError::from(ApiError::Rejected {
            status: 400,
            message: "Prescription required".to_string(),
        });
        let payload = err.to_payload();
        assert_eq!(payload.code, ErrorCode::BackendRejected);
        assert_eq!(payload.message, "Prescription required");
    }

    #[test]
    fn test_core_error_codes() {
        let stock = SessionError::from(CoreError::InsufficientStock {
            product: "Amoxicillin".to_string(),
            available: 3,
            requested: 4,
        });
        assert_eq!(stock.code(), ErrorCode::InsufficientStock);
        assert_eq!(
            stock.to_string(),
            "Insufficient stock for Amoxicillin: only 3 available"
        );

        assert_eq!(SessionError::from(CoreError::EmptyCart).code(), ErrorCode::CartError);
        assert_eq!(SessionError::NoActiveSession.code(), ErrorCode::SessionError);
        assert_eq!(SessionError::from(ApiError::Timeout).code(), ErrorCode::NetworkError);
    }

    #[test]
    fn test_payload_serialization() {
        let json = serde_json::to_value(SessionError::CheckoutInProgress.to_payload()).unwrap();
        assert_eq!(json["code"], "SESSION_ERROR");
        assert_eq!(json["message"], "A checkout is already in progress");
    }
}
