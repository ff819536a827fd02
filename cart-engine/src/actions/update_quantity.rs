//! UpdateQuantity action
//!
//! Quantity 0 removes the item and releases its reservation. Any other
//! quantity re-validates stock at the new absolute amount (this cart's own
//! reservation does not count against it) and re-reserves.

use shared::cart::{Cart, Variant};

use crate::catalog::Availability;
use crate::manager::{CartError, CartResult};

use super::{available_units, ActionContext};

/// UpdateQuantity action
#[derive(Debug)]
pub struct UpdateQuantityAction {
    pub product_ref: String,
    pub variant: Option<Variant>,
    pub quantity: u32,
    /// Pre-fetched availability; only consulted when raising the quantity
    /// of a stock-tracked product
    pub availability: Option<Availability>,
}

impl UpdateQuantityAction {
    pub fn apply(&self, ctx: &mut ActionContext<'_>, cart: &mut Cart) -> CartResult<()> {
        let variant = self.variant.as_ref();
        let item = cart
            .find_item(&self.product_ref, variant)
            .ok_or_else(|| CartError::ItemNotFound(self.product_ref.clone()))?;
        let is_product = item.is_product();

        if self.quantity == 0 {
            cart.items
                .retain(|i| !(i.matches(&self.product_ref, variant) && i.booking_key().is_none()));
            if is_product
                && let Err(e) =
                    ctx.reservations
                        .release_txn(ctx.txn, &cart.user_ref, &self.product_ref, variant)
            {
                ctx.warn(format!(
                    "Reservation release failed for {}: {}",
                    self.product_ref, e
                ));
            }
            return Ok(());
        }

        if is_product {
            let availability = self
                .availability
                .as_ref()
                .ok_or_else(|| CartError::ProductNotFound(self.product_ref.clone()))?;
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
        }

        let item = cart
            .find_item_mut(&self.product_ref, variant)
            .ok_or_else(|| CartError::ItemNotFound(self.product_ref.clone()))?;
        item.quantity = self.quantity;

        if is_product
            && let Err(e) = ctx.reservations.reserve_txn(
                ctx.txn,
                &cart.user_ref,
                &self.product_ref,
                variant,
                self.quantity,
            )
        {
            ctx.warn(format!(
                "Stock reservation failed for {}: {}",
                self.product_ref, e
            ));
        }

        Ok(())
    }
}
