//! RemoveItem action
//!
//! Deletes the line item and releases its reservation. The release is
//! best-effort: a failed release is logged and surfaced as a warning, never
//! as a failure of the removal itself.

use shared::cart::{Cart, Variant};

use crate::manager::{CartError, CartResult};

use super::ActionContext;

/// RemoveItem action
#[derive(Debug)]
pub struct RemoveItemAction {
    pub product_ref: String,
    pub variant: Option<Variant>,
}

impl RemoveItemAction {
    pub fn apply(&self, ctx: &mut ActionContext<'_>, cart: &mut Cart) -> CartResult<()> {
        let variant = self.variant.as_ref();
        let before = cart.items.len();
        let had_product = cart
            .items
            .iter()
            .any(|i| i.matches(&self.product_ref, variant) && i.is_product());
        cart.items.retain(|i| !i.matches(&self.product_ref, variant));
        if cart.items.len() == before {
            return Err(CartError::ItemNotFound(self.product_ref.clone()));
        }

        if had_product
            && let Err(e) =
                ctx.reservations
                    .release_txn(ctx.txn, &cart.user_ref, &self.product_ref, variant)
        {
            ctx.warn(format!(
                "Reservation release failed for {}: {}",
                self.product_ref, e
            ));
        }

        Ok(())
    }
}
