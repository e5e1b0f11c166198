//! # API Error Types
//!
//! Error types for calls to the pharmacy backend.
//!
//! ## Error Categories
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       API Error Categories                              │
//! │                                                                         │
//! │  ┌─────────────────┐  ┌─────────────────┐  ┌─────────────────────────┐ │
//! │  │  Configuration  │  │   Transport     │  │     Backend             │ │
//! │  │                 │  │                 │  │                         │ │
//! │  │  InvalidConfig  │  │  Connection     │  │  Rejected               │ │
//! │  │  InvalidUrl     │  │  Timeout        │  │  (status + message,     │ │
//! │  │                 │  │  Transport      │  │   shown verbatim)       │ │
//! │  └─────────────────┘  └─────────────────┘  └─────────────────────────┘ │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │  Decode: payload failed schema or domain validation             │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

/// Result type alias for backend calls.
pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug, Error)]
pub enum ApiError {
    // =========================================================================
    // Configuration Errors
    // =========================================================================
    #[error("Invalid API configuration: {0}")]
    InvalidConfig(String),

    #[error("Invalid backend URL: {0}")]
    InvalidUrl(String),

    // =========================================================================
    // Transport Errors
    // =========================================================================
    /// Backend unreachable.
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Only raised when a transport timeout is configured.
    #[error("Request timed out")]
    Timeout,

    #[error("Transport error: {0}")]
    Transport(String),

    // =========================================================================
    // Backend Errors
    // =========================================================================
    /// Non-2xx response. `message` is the backend's own text.
    ///
    /// ## User Workflow
    /// ```text
    /// POST /sales → 400 { "message": "Insufficient stock for Amoxicillin" }
    ///      │
    ///      ▼
    /// UI shows: "Insufficient stock for Amoxicillin"   (cart kept)
    /// ```
    #[error("{message}")]
    Rejected { status: u16, message: String },

    // =========================================================================
    // Decode Errors
    // =========================================================================
    /// Response body did not match the expected shape or values.
    #[error("Invalid {entity} payload: {reason}")]
    Decode { entity: String, reason: String },
}

impl ApiError {
    pub fn decode(entity: &str, reason: impl std::fmt::Display) -> Self {
        ApiError::Decode {
            entity: entity.to_string(),
            reason: reason.to_string(),
        }
    }

    /// True for failures where the backend never answered.
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            ApiError::ConnectionFailed(_) | ApiError::Timeout | ApiError::Transport(_)
        )
    }

    /// True when the backend answered and refused the request.
    pub fn is_rejection(&self) -> bool {
        matches!(self, ApiError::Rejected { .. })
    }

    pub fn is_config_error(&self) -> bool {
        matches!(self, ApiError::InvalidConfig(_) | ApiError::InvalidUrl(_))
    }

    /// HTTP status for rejections.
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Rejected { status, .. } => Some(*status),
            _ => None,
        }
    }
}

// =============================================================================
// Error Conversions
// =============================================================================

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ApiError::Timeout
        } else if err.is_connect() {
            ApiError::ConnectionFailed(err.to_string())
        } else if err.is_decode() {
            ApiError::decode("response", err)
        } else if err.is_builder() {
            ApiError::InvalidConfig(err.to_string())
        } else {
            ApiError::Transport(err.to_string())
        }
    }
}

impl From<url::ParseError> for ApiError {
    fn from(err: url::ParseError) -> Self {
        ApiError::InvalidUrl(err.to_string())
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        ApiError::decode("response", err)
    }
}
