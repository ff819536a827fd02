//! Cart data model
//!
//! - **item**: line items (product / service / event kinds) and variants
//! - **locked**: price-locked items and the paid-lock fee table
//! - **snapshot**: the cart aggregate, applied coupon, and computed totals
//! - **input**: mutation inputs accepted by the engine
//! - **outcome**: operation outcomes, typed rejections, validation reports

pub mod input;
pub mod item;
pub mod locked;
pub mod outcome;
pub mod snapshot;

pub use input::AddItemInput;
pub use item::{CartItem, ItemKind, ServiceBooking, TimeSlot, Variant};
pub use locked::{fee_percentage, ActiveLock, LockPaymentStatus, LockedItem, PAID_LOCK_DURATION_HOURS};
pub use outcome::{
    CartOutcome, CartRejection, ItemIssue, ItemIssueKind, LockFeeOption, RejectionCode,
    ValidationReport,
};
pub use snapshot::{AppliedCoupon, Cart, CartSummary, CartTotals, DiscountType};
