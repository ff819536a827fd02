//! LockItemWithPayment action (paid price lock)
//!
//! Paid locks are restricted to 2, 4 or 8 hours, charging an upfront
//! refundable fee of 5%, 10% or 15% of `unit_price * quantity`, rounded up
//! to the next whole currency unit.
//!
//! The wallet debit is external I/O, so it runs between two evaluations of
//! the same eligibility check: the manager first runs `check` on a read
//! snapshot (no side effects before the debit), then debits the wallet, then
//! re-runs the check inside the write transaction via `apply`. If the
//! re-check or the commit fails after the debit, the manager issues a
//! compensating credit.

use shared::cart::{Cart, LockPaymentStatus, LockedItem, Variant};
use shared::util::HOUR_MS;
use shared::wallet::LedgerTransaction;

use crate::catalog::{Availability, PriceQuote};
use crate::expiry::purge_expired_locks_for;
use crate::manager::{CartError, CartResult};

use super::{available_units, ActionContext};

/// LockItemWithPayment action
#[derive(Debug)]
pub struct LockWithPaymentAction {
    pub product_ref: String,
    pub variant: Option<Variant>,
    pub quantity: u32,
    pub duration_hours: u32,
    /// Fee percentage for the duration
    pub percentage: u32,
    /// Fee amount, already computed from the current price
    pub fee: f64,
    pub availability: Option<Availability>,
    pub quote: Option<PriceQuote>,
    /// Completed fee debit; set between `check` and `apply`
    pub transaction: Option<LedgerTransaction>,
}

impl LockWithPaymentAction {
    /// Eligibility check, run before the debit (on a read copy) and again
    /// inside the write transaction. Purges expired locks for the key first
    /// so a stale lock never blocks.
    pub fn check(&self, cart: &mut Cart, now: i64, reserved_by_others: u32) -> CartResult<()> {
        if self.quantity == 0 {
            return Err(CartError::Validation(
                "Quantity must be greater than zero".to_string(),
            ));
        }
        if shared::cart::locked::fee_percentage(self.duration_hours).is_none() {
            return Err(CartError::InvalidLockDuration(self.duration_hours));
        }
        let variant = self.variant.as_ref();
        purge_expired_locks_for(cart, &self.product_ref, variant, now);

        if cart.find_lock(&self.product_ref, variant).is_some() {
            return Err(CartError::DuplicateLock(self.product_ref.clone()));
        }
        // Double-charge guard: an item materialized from a paid lock keeps
        // its fee marker and cannot be locked again
        if let Some(item) = cart.find_item(&self.product_ref, variant)
            && item.lock_fee_marker.is_some()
        {
            return Err(CartError::DuplicateLock(self.product_ref.clone()));
        }

        let availability = self
            .availability
            .as_ref()
            .ok_or_else(|| CartError::ProductNotFound(self.product_ref.clone()))?;
        if !availability.is_active {
            return Err(CartError::ProductInactive(self.product_ref.clone()));
        }
        if !availability.is_available {
            return Err(CartError::ProductUnavailable(self.product_ref.clone()));
        }
        if let Some(available) = available_units(availability, reserved_by_others) {
            if available == 0 {
                return Err(CartError::OutOfStock(self.product_ref.clone()));
            }
            if available < self.quantity {
                return Err(CartError::InsufficientStock {
                    product_ref: self.product_ref.clone(),
                    available,
                });
            }
        }

        Ok(())
    }

    /// Post-debit application inside the write transaction
    pub fn apply(&self, ctx: &mut ActionContext<'_>, cart: &mut Cart) -> CartResult<()> {
        let variant = self.variant.as_ref();
        let reserved_by_others = ctx.reservations.reserved_by_others_txn(
            ctx.txn,
            &cart.user_ref,
            &self.product_ref,
            variant,
        )?;
        self.check(cart, ctx.now, reserved_by_others)?;

        let transaction = self
            .transaction
            .as_ref()
            .ok_or_else(|| CartError::Wallet("Missing fee transaction".to_string()))?;
        let quote = self
            .quote
            .as_ref()
            .ok_or_else(|| CartError::ProductNotFound(self.product_ref.clone()))?;

        // Reconcile an existing plain cart line: locked units leave the cart
        if let Some(item) = cart.find_item(&self.product_ref, variant) {
            if self.quantity >= item.quantity {
                cart.items
                    .retain(|i| !(i.matches(&self.product_ref, variant) && i.booking_key().is_none()));
                if let Err(e) =
                    ctx.reservations
                        .release_txn(ctx.txn, &cart.user_ref, &self.product_ref, variant)
                {
                    ctx.warn(format!(
                        "Reservation release failed for {}: {}",
                        self.product_ref, e
                    ));
                }
            } else {
                let remaining = item.quantity - self.quantity;
                if let Some(item) = cart.find_item_mut(&self.product_ref, variant) {
                    item.quantity = remaining;
                }
                if let Err(e) = ctx.reservations.reserve_txn(
                    ctx.txn,
                    &cart.user_ref,
                    &self.product_ref,
                    variant,
                    remaining,
                ) {
                    ctx.warn(format!(
                        "Stock reservation failed for {}: {}",
                        self.product_ref, e
                    ));
                }
            }
        }

        cart.locked_items.push(LockedItem {
            product_ref: self.product_ref.clone(),
            variant: self.variant.clone(),
            quantity: self.quantity,
            locked_price: quote.unit_price,
            locked_at: ctx.now,
            expires_at: ctx.now + self.duration_hours as i64 * HOUR_MS,
            is_paid_lock: true,
            lock_fee: Some(self.fee),
            lock_fee_percentage: Some(self.percentage),
            lock_duration_hours: self.duration_hours,
            payment_transaction_ref: Some(transaction.reference.clone()),
            lock_payment_status: LockPaymentStatus::Paid,
        });

        cart.expires_at = cart.expires_at.max(ctx.now + ctx.config.locked_cart_ttl_ms);

        Ok(())
    }
}
