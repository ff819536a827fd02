//! Cart mutation actions
//!
//! One module per mutation. Each action is a struct carrying its input plus
//! any collaborator facts the manager pre-fetched (catalog availability,
//! price quotes, wallet transactions), and an `apply` that runs inside the
//! manager's write transaction against the loaded cart. Actions never await:
//! all I/O other than the transaction itself happens before it opens.

pub mod add_item;
pub mod apply_coupon;
pub mod clear_cart;
pub mod lock_item;
pub mod lock_with_payment;
pub mod move_locked;
pub mod remove_item;
pub mod unlock_item;
pub mod update_quantity;
pub mod validate_cart;

pub use add_item::AddItemAction;
pub use apply_coupon::ApplyCouponAction;
pub use clear_cart::ClearCartAction;
pub use lock_item::LockItemAction;
pub use lock_with_payment::LockWithPaymentAction;
pub use move_locked::MoveLockedToCartAction;
pub use remove_item::RemoveItemAction;
pub use update_quantity::UpdateQuantityAction;

use redb::WriteTransaction;

use crate::catalog::Availability;
use crate::config::EngineConfig;
use crate::reservation::ReservationService;

/// Execution context handed to every action
pub struct ActionContext<'a> {
    pub txn: &'a WriteTransaction,
    pub reservations: &'a ReservationService,
    pub config: &'a EngineConfig,
    pub now: i64,
    /// Absorbed non-critical failures, surfaced on the outcome
    pub warnings: Vec<String>,
}

impl ActionContext<'_> {
    /// Record a best-effort failure without failing the mutation
    pub fn warn(&mut self, message: String) {
        tracing::warn!("{}", message);
        self.warnings.push(message);
    }
}

/// Units actually available: `on_hand - reserved_by_others`, saturating;
/// `None` when stock is untracked
pub(crate) fn available_units(availability: &Availability, reserved_by_others: u32) -> Option<u32> {
    if availability.unlimited {
        None
    } else {
        Some(availability.stock.saturating_sub(reserved_by_others))
    }
}
