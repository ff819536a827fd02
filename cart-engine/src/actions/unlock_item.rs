//! UnlockItem action
//!
//! Removing a paid lock refunds the fee exactly once, even across retries.
//! The refund happens in three steps orchestrated by the manager:
//!
//! 1. `mark_refunded` flips the status to `Refunded` and is committed before
//!    any money moves, so a retry after a crash can never credit twice.
//! 2. The wallet credit runs; a failure here is non-critical (logged and
//!    surfaced as a warning) because the committed status already records
//!    the obligation.
//! 3. `remove_lock` drops the entry.
//!
//! Expired locks are purged rather than unlocked; their refund, if any, is
//! not owed (the hold ran its full course).

use shared::cart::{Cart, LockPaymentStatus, Variant};

use crate::expiry::purge_expired_locks_for;
use crate::manager::{CartError, CartResult};

/// Refund owed to the wallet after `mark_refunded`
#[derive(Debug, Clone)]
pub struct RefundDue {
    pub amount: f64,
    pub description: String,
}

/// Step 1: flip a paid, not-yet-refunded lock to `Refunded`
///
/// Returns the refund to issue, or `None` when no money is owed (free lock,
/// or an earlier attempt already recorded the refund).
pub fn mark_refunded(
    cart: &mut Cart,
    product_ref: &str,
    variant: Option<&Variant>,
    now: i64,
) -> CartResult<Option<RefundDue>> {
    purge_expired_locks_for(cart, product_ref, variant, now);

    let lock = cart
        .find_lock_mut(product_ref, variant)
        .ok_or_else(|| CartError::LockNotFound(product_ref.to_string()))?;

    if !lock.is_paid_lock || lock.lock_payment_status != LockPaymentStatus::Paid {
        return Ok(None);
    }

    lock.lock_payment_status = LockPaymentStatus::Refunded;
    let amount = lock.lock_fee.unwrap_or(0.0);
    if amount <= 0.0 {
        return Ok(None);
    }
    Ok(Some(RefundDue {
        amount,
        description: format!("Lock fee refund: {}", product_ref),
    }))
}

/// Step 3: drop the lock entry
pub fn remove_lock(cart: &mut Cart, product_ref: &str, variant: Option<&Variant>) {
    cart.locked_items
        .retain(|l| !l.matches(product_ref, variant));
}
