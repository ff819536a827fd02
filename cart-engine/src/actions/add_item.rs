//! AddItem action
//!
//! Adds a product, service booking, or event ticket to the cart. The three
//! kinds validate differently: products need active + available inventory
//! with enough stock; services need a future booking date and a non-empty
//! slot start, and reject duplicate (date, time) bookings; events must be
//! published. Products also place an advisory stock reservation, which is
//! best-effort and never fails the add.

use shared::cart::{AddItemInput, Cart, CartItem, ItemKind};

use crate::catalog::{Availability, EventStatus, PriceQuote};
use crate::manager::{CartError, CartResult};

use super::{available_units, ActionContext};

/// AddItem action
#[derive(Debug)]
pub struct AddItemAction {
    pub input: AddItemInput,
    /// Catalog availability for the (product, variant); `None` when the
    /// product could not be resolved
    pub availability: Option<Availability>,
    /// Current pricing; `None` when the product could not be resolved
    pub quote: Option<PriceQuote>,
    /// Publication state, pre-fetched only for event tickets
    pub event_status: Option<EventStatus>,
}

impl AddItemAction {
    pub fn apply(&self, ctx: &mut ActionContext<'_>, cart: &mut Cart) -> CartResult<()> {
        let input = &self.input;
        if input.quantity == 0 {
            return Err(CartError::Validation(
                "Quantity must be greater than zero".to_string(),
            ));
        }

        let quote = self
            .quote
            .as_ref()
            .ok_or_else(|| CartError::ProductNotFound(input.product_ref.clone()))?;

        // Discriminate the kind once, up front
        if let Some(event_ref) = &input.event_ref {
            self.apply_event(ctx, cart, event_ref, quote)
        } else if let Some(booking) = &input.booking {
            self.apply_service(ctx, cart, booking, quote)
        } else {
            self.apply_product(ctx, cart, quote)
        }
    }

    fn apply_product(
        &self,
        ctx: &mut ActionContext<'_>,
        cart: &mut Cart,
        quote: &PriceQuote,
    ) -> CartResult<()> {
        let input = &self.input;
        let availability = self
            .availability
            .as_ref()
            .ok_or_else(|| CartError::ProductNotFound(input.product_ref.clone()))?;
        if !availability.is_active {
            return Err(CartError::ProductInactive(input.product_ref.clone()));
        }
        if !availability.is_available {
            return Err(CartError::ProductUnavailable(input.product_ref.clone()));
        }

        // Upsert: requested quantity is the existing line plus the delta
        let existing_quantity = cart
            .find_item(&input.product_ref, input.variant.as_ref())
            .map(|i| i.quantity)
            .unwrap_or(0);
        let new_quantity = existing_quantity.checked_add(input.quantity).ok_or_else(|| {
            CartError::Validation("Quantity exceeds the supported maximum".to_string())
        })?;

        let reserved_by_others = ctx.reservations.reserved_by_others_txn(
            ctx.txn,
            &cart.user_ref,
            &input.product_ref,
            input.variant.as_ref(),
        )?;
        if let Some(available) = available_units(availability, reserved_by_others) {
            if available == 0 {
                return Err(CartError::OutOfStock(input.product_ref.clone()));
            }
            if available < new_quantity {
                return Err(CartError::InsufficientStock {
                    product_ref: input.product_ref.clone(),
                    available,
                });
            }
        }

        match cart.find_item_mut(&input.product_ref, input.variant.as_ref()) {
            Some(item) => {
                item.quantity = new_quantity;
                item.unit_price = quote.unit_price;
            }
            None => {
                cart.items.push(CartItem {
                    product_ref: input.product_ref.clone(),
                    store_ref: quote.store_ref.clone(),
                    variant: input.variant.clone(),
                    quantity: new_quantity,
                    unit_price: quote.unit_price,
                    unit_original_price: quote.unit_original_price,
                    added_at: ctx.now,
                    kind: ItemKind::Product,
                    locked_price: None,
                    lock_fee_marker: None,
                });
            }
        }

        // Advisory hold; failure is logged, never fatal
        if let Err(e) = ctx.reservations.reserve_txn(
            ctx.txn,
            &cart.user_ref,
            &input.product_ref,
            input.variant.as_ref(),
            new_quantity,
        ) {
            ctx.warn(format!(
                "Stock reservation failed for {}: {}",
                input.product_ref, e
            ));
        }

        Ok(())
    }

    fn apply_service(
        &self,
        ctx: &mut ActionContext<'_>,
        cart: &mut Cart,
        booking: &shared::cart::ServiceBooking,
        quote: &PriceQuote,
    ) -> CartResult<()> {
        let input = &self.input;
        if booking.booking_date <= ctx.now {
            return Err(CartError::Validation(
                "Booking date must be in the future".to_string(),
            ));
        }
        if booking.time_slot.start.is_empty() {
            return Err(CartError::Validation(
                "Booking time slot is required".to_string(),
            ));
        }
        if let Some(availability) = &self.availability
            && !availability.is_active
        {
            return Err(CartError::ProductInactive(input.product_ref.clone()));
        }
        if cart.has_booking(
            &input.product_ref,
            input.variant.as_ref(),
            booking.booking_date,
            &booking.time_slot.start,
        ) {
            return Err(CartError::DuplicateBooking);
        }

        cart.items.push(CartItem {
            product_ref: input.product_ref.clone(),
            store_ref: quote.store_ref.clone(),
            variant: input.variant.clone(),
            quantity: input.quantity,
            unit_price: quote.unit_price,
            unit_original_price: quote.unit_original_price,
            added_at: ctx.now,
            kind: ItemKind::Service {
                booking: booking.clone(),
            },
            locked_price: None,
            lock_fee_marker: None,
        });

        Ok(())
    }

    fn apply_event(
        &self,
        ctx: &mut ActionContext<'_>,
        cart: &mut Cart,
        event_ref: &str,
        quote: &PriceQuote,
    ) -> CartResult<()> {
        let input = &self.input;
        match self.event_status {
            Some(EventStatus::Published) => {}
            _ => return Err(CartError::EventNotPublished(event_ref.to_string())),
        }

        match cart.find_item_mut(&input.product_ref, input.variant.as_ref()) {
            Some(item) => {
                item.quantity = item.quantity.checked_add(input.quantity).ok_or_else(|| {
                    CartError::Validation("Quantity exceeds the supported maximum".to_string())
                })?;
            }
            None => cart.items.push(CartItem {
                product_ref: input.product_ref.clone(),
                store_ref: quote.store_ref.clone(),
                variant: input.variant.clone(),
                quantity: input.quantity,
                unit_price: quote.unit_price,
                unit_original_price: quote.unit_original_price,
                added_at: ctx.now,
                kind: ItemKind::Event {
                    event_ref: event_ref.to_string(),
                },
                locked_price: None,
                lock_fee_marker: None,
            }),
        }

        Ok(())
    }
}
