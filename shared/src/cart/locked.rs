//! Price-locked items
//!
//! A locked item is a time-boxed guarantee that `locked_price` applies to
//! `quantity` units of `(product_ref, variant)` when later purchased. Paid
//! locks are secured by an upfront, refundable wallet fee. Expiry is passive:
//! `expires_at <= now` means the lock is already gone, whether or not any
//! process has observed it yet.

use serde::{Deserialize, Serialize};

use super::item::Variant;

/// Paid-lock durations offered, in hours
pub const PAID_LOCK_DURATION_HOURS: [u32; 3] = [2, 4, 8];

/// Fee percentage for a paid-lock duration, if the duration is offered
pub fn fee_percentage(duration_hours: u32) -> Option<u32> {
    match duration_hours {
        2 => Some(5),
        4 => Some(10),
        8 => Some(15),
        _ => None,
    }
}

/// Payment lifecycle of a lock fee
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LockPaymentStatus {
    Unpaid,
    Paid,
    Refunded,
}

/// A time-boxed price hold on a `(product_ref, variant)` key
///
/// Invariants: `expires_at = locked_at + duration`; a paid lock's fee is
/// charged exactly once and refunded exactly once.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LockedItem {
    pub product_ref: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub variant: Option<Variant>,
    pub quantity: u32,
    /// Price frozen at lock time
    pub locked_price: f64,
    pub locked_at: i64,
    pub expires_at: i64,
    pub is_paid_lock: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lock_fee: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lock_fee_percentage: Option<u32>,
    /// Duration in hours; paid locks are restricted to {2, 4, 8}
    pub lock_duration_hours: u32,
    /// Wallet transaction reference for the fee debit (paid locks)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_transaction_ref: Option<String>,
    pub lock_payment_status: LockPaymentStatus,
}

/// A live lock together with its time remaining, for read-only listings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActiveLock {
    pub lock: LockedItem,
    /// Milliseconds until `expires_at`
    pub remaining_ms: i64,
}

impl LockedItem {
    /// Whether this lock holds the `(product_ref, variant)` slot
    pub fn matches(&self, product_ref: &str, variant: Option<&Variant>) -> bool {
        self.product_ref == product_ref && self.variant.as_ref() == variant
    }

    /// Passive expiry predicate
    pub fn is_expired(&self, now: i64) -> bool {
        self.expires_at <= now
    }
}
