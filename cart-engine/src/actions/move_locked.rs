//! MoveLockedToCart action
//!
//! Converts a non-expired lock back into a regular cart line at the locked
//! price, not the current catalog price. No money movement: a paid lock's
//! fee stays spent, and the materialized item carries the fee marker that
//! refuses re-locking.

use shared::cart::{Cart, CartItem, ItemKind, Variant};

use crate::manager::{CartError, CartResult};

use super::ActionContext;

/// MoveLockedToCart action
#[derive(Debug)]
pub struct MoveLockedToCartAction {
    pub product_ref: String,
    pub variant: Option<Variant>,
}

impl MoveLockedToCartAction {
    pub fn apply(&self, ctx: &mut ActionContext<'_>, cart: &mut Cart) -> CartResult<()> {
        let variant = self.variant.as_ref();

        // Expired locks never participate; drop them on sight
        crate::expiry::purge_expired_locks_for(cart, &self.product_ref, variant, ctx.now);
        let lock = cart
            .find_lock(&self.product_ref, variant)
            .ok_or_else(|| CartError::LockNotFound(self.product_ref.clone()))?
            .clone();

        let new_quantity = match cart.find_item_mut(&self.product_ref, variant) {
            Some(item) => {
                // Merge into the existing line; the locked price wins, that
                // is the guarantee the user paid for
                item.quantity = item.quantity.checked_add(lock.quantity).ok_or_else(|| {
                    CartError::Validation("Quantity exceeds the supported maximum".to_string())
                })?;
                item.unit_price = lock.locked_price;
                item.locked_price = Some(lock.locked_price);
                if lock.is_paid_lock {
                    item.lock_fee_marker = lock.lock_fee;
                }
                item.quantity
            }
            None => {
                cart.items.push(CartItem {
                    product_ref: lock.product_ref.clone(),
                    store_ref: None,
                    variant: lock.variant.clone(),
                    quantity: lock.quantity,
                    unit_price: lock.locked_price,
                    unit_original_price: lock.locked_price,
                    added_at: ctx.now,
                    kind: ItemKind::Product,
                    locked_price: Some(lock.locked_price),
                    lock_fee_marker: if lock.is_paid_lock { lock.lock_fee } else { None },
                });
                lock.quantity
            }
        };

        cart.locked_items
            .retain(|l| !l.matches(&self.product_ref, variant));

        // The units are back in the cart; hold them advisorily again
        if let Err(e) = ctx.reservations.reserve_txn(
            ctx.txn,
            &cart.user_ref,
            &self.product_ref,
            variant,
            new_quantity,
        ) {
            ctx.warn(format!(
                "Stock reservation failed for {}: {}",
                self.product_ref, e
            ));
        }

        Ok(())
    }
}
