//! Operation outcomes and typed rejections
//!
//! Every engine operation returns either its primary outcome plus a list of
//! absorbed non-critical warnings, or a typed rejection the API layer can
//! map to a status code. The rejection carries the actionable quantity when
//! stock is the reason ("Only N items remaining").

use serde::{Deserialize, Serialize};

use super::item::Variant;
use super::snapshot::Cart;

/// Stable rejection codes (clients handle localization)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RejectionCode {
    InvalidInput,
    ProductNotFound,
    ProductInactive,
    ProductUnavailable,
    OutOfStock,
    InsufficientStock,
    DuplicateBooking,
    DuplicateLock,
    LockNotFound,
    ItemNotFound,
    EmptyCart,
    CouponRejected,
    InvalidLockDuration,
    InsufficientFunds,
    EventNotPublished,
    WalletFailure,
    // Storage-level codes
    StorageFull,
    StorageCorrupted,
    SystemBusy,
    InternalError,
}

/// A user-facing rejection with a human-readable reason
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CartRejection {
    pub code: RejectionCode,
    pub message: String,
    /// Quantity still available, when stock is the blocker
    #[serde(skip_serializing_if = "Option::is_none")]
    pub available: Option<u32>,
}

impl CartRejection {
    pub fn new(code: RejectionCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            available: None,
        }
    }

    pub fn with_available(mut self, available: u32) -> Self {
        self.available = Some(available);
        self
    }
}

impl std::fmt::Display for CartRejection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}: {}", self.code, self.message)
    }
}

/// Primary outcome of a cart mutation
///
/// `warnings` collects best-effort side effects that failed without failing
/// the mutation itself (reservation writes, refund credits on retry).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CartOutcome {
    pub cart: Cart,
    #[serde(default)]
    pub warnings: Vec<String>,
}

impl CartOutcome {
    pub fn new(cart: Cart) -> Self {
        Self {
            cart,
            warnings: Vec::new(),
        }
    }
}

/// Per-item checkout classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ItemIssueKind {
    /// Product no longer resolvable
    Missing,
    /// Product exists but is deactivated
    Inactive,
    /// Product exists but is flagged unavailable
    Unavailable,
    /// Zero units available
    OutOfStock,
    /// Fewer units available than requested
    InsufficientStock,
    /// Enough units, but at or below the low-stock threshold
    LowStock,
}

/// One flagged item in a checkout validation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemIssue {
    pub product_ref: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub variant: Option<Variant>,
    pub quantity_requested: u32,
    pub issue: ItemIssueKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub available: Option<u32>,
    pub message: String,
}

/// Checkout validation result
///
/// `issues` are checkout-blocking; `warnings` (low stock) are returned
/// alongside a still-valid result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationReport {
    pub is_valid: bool,
    #[serde(default)]
    pub issues: Vec<ItemIssue>,
    #[serde(default)]
    pub warnings: Vec<ItemIssue>,
}

/// One row of the paid-lock fee table for a given item and quantity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LockFeeOption {
    pub duration_hours: u32,
    pub percentage: u32,
    pub fee: f64,
}
