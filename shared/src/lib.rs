//! Shared domain types for the cart engine
//!
//! This crate holds the serializable data model shared between the engine
//! and any API layer embedding it: cart snapshots, line items, locked items,
//! wallet ledger records, and the typed rejection/outcome envelope.

pub mod cart;
pub mod util;
pub mod wallet;

pub use cart::{
    ActiveLock, AppliedCoupon, Cart, CartItem, CartOutcome, CartRejection, CartSummary,
    CartTotals, DiscountType, ItemIssue, ItemIssueKind, ItemKind, LockFeeOption,
    LockPaymentStatus, LockedItem, RejectionCode, ServiceBooking, TimeSlot, ValidationReport,
    Variant,
};
pub use wallet::{LedgerTransaction, TransactionKind};
