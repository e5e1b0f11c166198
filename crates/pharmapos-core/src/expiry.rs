//! # Expiry Module
//!
//! Classifies batches (lots) by how close they are to their expiration date.
//!
//! ## Classification
//! ```text
//!            expired            │        near-expiry         │    normal
//!  ─────────────────────────────┼────────────────────────────┼──────────────►
//!                          expiration                   now + horizon    time
//!                          <= now
//!
//!  days_remaining = floor((expiration - now) / 1 day)
//!  is_expired     = expiration <= now
//!  is_near_expiry = !is_expired && 0 <= days_remaining <= horizon
//! ```
//!
//! A batch expiring at the exact current instant is expired: the boundary is
//! half-open on the expired side.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::types::Batch;
use crate::DEFAULT_NEAR_EXPIRY_HORIZON_DAYS;

const MILLIS_PER_DAY: i64 = 86_400_000;

/// Whole days from `now` until `expiration`, rounded toward negative infinity.
///
/// ## Example
/// ```rust
/// use chrono::{Duration, Utc};
/// use pharmapos_core::expiry::days_remaining;
///
/// let now = Utc::now();
/// assert_eq!(days_remaining(now + Duration::days(10), now), 10);
/// assert_eq!(days_remaining(now + Duration::hours(36), now), 1);
/// assert_eq!(days_remaining(now - Duration::hours(1), now), -1);
/// ```
pub fn days_remaining(expiration: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    (expiration - now).num_milliseconds().div_euclid(MILLIS_PER_DAY)
}

// =============================================================================
// Expiry Status
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum ExpiryStatus {
    Expired,
    NearExpiry,
    Normal,
}

/// Result of classifying one expiration date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct ExpiryClassification {
    pub days_remaining: i64,
    pub status: ExpiryStatus,
}

impl ExpiryClassification {
    #[inline]
    pub fn is_expired(&self) -> bool {
        self.status == ExpiryStatus::Expired
    }

    #[inline]
    pub fn is_near_expiry(&self) -> bool {
        self.status == ExpiryStatus::NearExpiry
    }
}

// =============================================================================
// Expiry Classifier
// =============================================================================

/// Classifies expiration dates against a near-expiry horizon in days.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExpiryClassifier {
    horizon_days: u32,
}

impl Default for ExpiryClassifier {
    /// 60-day horizon used for promotion eligibility.
    fn default() -> Self {
        ExpiryClassifier::new(DEFAULT_NEAR_EXPIRY_HORIZON_DAYS)
    }
}

impl ExpiryClassifier {
    pub const fn new(horizon_days: u32) -> Self {
        ExpiryClassifier { horizon_days }
    }

    pub fn horizon_days(&self) -> u32 {
        self.horizon_days
    }

    /// Classifies one expiration date at instant `now`.
    pub fn classify(&self, expiration: DateTime<Utc>, now: DateTime<Utc>) -> ExpiryClassification {
        let days = days_remaining(expiration, now);

        let status = if expiration <= now {
            ExpiryStatus::Expired
        } else if (0..=i64::from(self.horizon_days)).contains(&days) {
            ExpiryStatus::NearExpiry
        } else {
            ExpiryStatus::Normal
        };

        ExpiryClassification {
            days_remaining: days,
            status,
        }
    }

    #[inline]
    pub fn classify_batch(&self, batch: &Batch, now: DateTime<Utc>) -> ExpiryClassification {
        self.classify(batch.expiration_date, now)
    }

    /// Splits batches into expired, near-expiry and normal groups.
    ///
    /// Feeds the catalog expiry report: expired lots are written off and
    /// near-expiry lots are candidates for a promotion.
    pub fn partition<'a>(&self, batches: &'a [Batch], now: DateTime<Utc>) -> ExpiryBreakdown<'a> {
        let mut breakdown = ExpiryBreakdown::default();
        for batch in batches {
            match self.classify_batch(batch, now).status {
                ExpiryStatus::Expired => breakdown.expired.push(batch),
                ExpiryStatus::NearExpiry => breakdown.near_expiry.push(batch),
                ExpiryStatus::Normal => breakdown.normal.push(batch),
            }
        }
        breakdown
    }
}

/// Batches grouped by expiry status, in input order.
#[derive(Debug, Default)]
pub struct ExpiryBreakdown<'a> {
    pub expired: Vec<&'a Batch>,
    pub near_expiry: Vec<&'a Batch>,
    pub normal: Vec<&'a Batch>,
}

impl ExpiryBreakdown<'_> {
    pub fn expired_quantity(&self) -> i64 {
        self.expired.iter().map(|b| b.quantity).sum()
    }

    pub fn near_expiry_quantity(&self) -> i64 {
        self.near_expiry.iter().map(|b| b.quantity).sum()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
