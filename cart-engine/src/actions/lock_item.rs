//! LockItem action (free price lock)
//!
//! Freezes the current price for `(product_ref, variant)` without any money
//! movement. Default duration is 24 hours, distinct from the paid-lock
//! duration set. Expired locks on the same key are purged before the
//! duplicate check so a stale lock never blocks a fresh one.

use shared::cart::{Cart, LockPaymentStatus, LockedItem, Variant};
use shared::util::HOUR_MS;

use crate::catalog::{Availability, PriceQuote};
use crate::expiry::purge_expired_locks_for;
use crate::manager::{CartError, CartResult};

use super::{available_units, ActionContext};

/// LockItem action
#[derive(Debug)]
pub struct LockItemAction {
    pub product_ref: String,
    pub variant: Option<Variant>,
    pub quantity: u32,
    /// Hours; defaults to the configured free-lock duration
    pub duration_hours: Option<u32>,
    pub availability: Option<Availability>,
    pub quote: Option<PriceQuote>,
}

impl LockItemAction {
    pub fn apply(&self, ctx: &mut ActionContext<'_>, cart: &mut Cart) -> CartResult<()> {
        if self.quantity == 0 {
            return Err(CartError::Validation(
                "Quantity must be greater than zero".to_string(),
            ));
        }
        let variant = self.variant.as_ref();
        purge_expired_locks_for(cart, &self.product_ref, variant, ctx.now);

        if cart.find_lock(&self.product_ref, variant).is_some() {
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
        let reserved_by_others = ctx.reservations.reserved_by_others_txn(
            ctx.txn,
            &cart.user_ref,
            &self.product_ref,
            variant,
        )?;
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

        let quote = self
            .quote
            .as_ref()
            .ok_or_else(|| CartError::ProductNotFound(self.product_ref.clone()))?;
        let duration_hours = self.duration_hours.unwrap_or(ctx.config.free_lock_hours);
        if duration_hours == 0 {
            return Err(CartError::InvalidLockDuration(0));
        }

        cart.locked_items.push(LockedItem {
            product_ref: self.product_ref.clone(),
            variant: self.variant.clone(),
            quantity: self.quantity,
            locked_price: quote.unit_price,
            locked_at: ctx.now,
            expires_at: ctx.now + duration_hours as i64 * HOUR_MS,
            is_paid_lock: false,
            lock_fee: None,
            lock_fee_percentage: None,
            lock_duration_hours: duration_hours,
            payment_transaction_ref: None,
            lock_payment_status: LockPaymentStatus::Unpaid,
        });

        // A lock extends the cart's life
        cart.expires_at = cart.expires_at.max(ctx.now + ctx.config.locked_cart_ttl_ms);

        Ok(())
    }
}
