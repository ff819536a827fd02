//! ClearCart action
//!
//! Empties line items and locked items, drops the coupon, and releases every
//! reservation the cart holds. Locked items are dropped without refunding
//! lock fees; callers wanting the fee back unlock first.

use shared::cart::Cart;

use crate::manager::CartResult;

use super::ActionContext;

/// ClearCart action
#[derive(Debug)]
pub struct ClearCartAction;

impl ClearCartAction {
    pub fn apply(&self, ctx: &mut ActionContext<'_>, cart: &mut Cart) -> CartResult<()> {
        if let Err(e) = ctx.reservations.release_all_txn(ctx.txn, &cart.user_ref) {
            ctx.warn(format!(
                "Releasing reservations failed for {}: {}",
                cart.user_ref, e
            ));
        }

        cart.items.clear();
        cart.locked_items.clear();
        cart.coupon = None;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::reservation::ReservationService;
    use crate::storage::CartStorage;
    use shared::cart::{AppliedCoupon, DiscountType};

    #[test]
    fn test_clear_releases_everything() {
        let storage = CartStorage::open_in_memory().unwrap();
        let reservations = ReservationService::new(storage.clone());
        let config = EngineConfig::default();
        let txn = storage.begin_write().unwrap();

        reservations
            .reserve_txn(&txn, "user-1", "p1", None, 2)
            .unwrap();
        reservations
            .reserve_txn(&txn, "user-1", "p2", None, 1)
            .unwrap();
        reservations
            .reserve_txn(&txn, "user-2", "p1", None, 5)
            .unwrap();

        let mut ctx = ActionContext {
            txn: &txn,
            reservations: &reservations,
            config: &config,
            now: 0,
            warnings: Vec::new(),
        };
        let mut cart = Cart::new("user-1", 0, i64::MAX);
        cart.coupon = Some(AppliedCoupon {
            code: "TEN".to_string(),
            discount_type: DiscountType::Fixed,
            applied_amount: 10.0,
        });

        ClearCartAction.apply(&mut ctx, &mut cart).unwrap();

        assert!(cart.items.is_empty());
        assert!(cart.locked_items.is_empty());
        assert!(cart.coupon.is_none());
        assert_eq!(reservations.reserved_total_txn(&txn, "p1", None).unwrap(), 5);
        assert_eq!(reservations.reserved_total_txn(&txn, "p2", None).unwrap(), 0);
    }
}
