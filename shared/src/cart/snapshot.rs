//! Cart aggregate snapshot
//!
//! The cart is the unit of consistency: line items, locked items, applied
//! coupon, and derived totals live and persist together. Totals are always
//! recomputed after a structural mutation and never trusted from storage.

use serde::{Deserialize, Serialize};

use super::item::{CartItem, Variant};
use super::locked::LockedItem;

/// Coupon discount shape
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DiscountType {
    Fixed,
    Percentage,
}

/// Coupon accepted by the validator and attached to the cart
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppliedCoupon {
    pub code: String,
    pub discount_type: DiscountType,
    /// Discount amount resolved by the validator (currency units)
    pub applied_amount: f64,
}

/// Derived totals
///
/// `total = max(0, subtotal + tax + delivery - discount)`. Cashback is
/// informational: tracked here, never subtracted from the payable total.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CartTotals {
    pub subtotal: f64,
    pub tax: f64,
    pub delivery: f64,
    pub discount: f64,
    pub cashback: f64,
    pub total: f64,
    /// Original-vs-current price savings across items, plus coupon discount
    pub savings: f64,
}

/// Lightweight read model for cart badges and headers
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CartSummary {
    /// Total units across all line items
    pub item_count: u64,
    /// Distinct stores represented in the cart
    pub store_count: usize,
    pub has_items: bool,
    pub totals: CartTotals,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub coupon: Option<AppliedCoupon>,
}

/// The cart aggregate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cart {
    pub user_ref: String,
    #[serde(default)]
    pub items: Vec<CartItem>,
    #[serde(default)]
    pub locked_items: Vec<LockedItem>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub coupon: Option<AppliedCoupon>,
    #[serde(default)]
    pub totals: CartTotals,
    pub is_active: bool,
    pub created_at: i64,
    pub updated_at: i64,
    /// Cart-level TTL: 24h from creation by default, extended to 30 days
    /// once any item is locked
    pub expires_at: i64,
}

impl Cart {
    pub fn new(user_ref: impl Into<String>, now: i64, ttl_ms: i64) -> Self {
        Self {
            user_ref: user_ref.into(),
            items: Vec::new(),
            locked_items: Vec::new(),
            coupon: None,
            totals: CartTotals::default(),
            is_active: true,
            created_at: now,
            updated_at: now,
            expires_at: now + ttl_ms,
        }
    }

    /// Soft-expiry predicate for the whole cart
    pub fn is_expired(&self, now: i64) -> bool {
        self.expires_at <= now
    }

    /// Find the non-service item occupying `(product_ref, variant)`
    pub fn find_item(&self, product_ref: &str, variant: Option<&Variant>) -> Option<&CartItem> {
        self.items
            .iter()
            .find(|i| i.matches(product_ref, variant) && i.booking_key().is_none())
    }

    pub fn find_item_mut(
        &mut self,
        product_ref: &str,
        variant: Option<&Variant>,
    ) -> Option<&mut CartItem> {
        self.items
            .iter_mut()
            .find(|i| i.matches(product_ref, variant) && i.booking_key().is_none())
    }

    /// Whether a service booking for the same product, variant, date and
    /// start time is already present
    pub fn has_booking(
        &self,
        product_ref: &str,
        variant: Option<&Variant>,
        booking_date: i64,
        slot_start: &str,
    ) -> bool {
        self.items.iter().any(|i| {
            i.matches(product_ref, variant)
                && i.booking_key() == Some((booking_date, slot_start))
        })
    }

    /// Find the lock on `(product_ref, variant)`, expired or not
    pub fn find_lock(&self, product_ref: &str, variant: Option<&Variant>) -> Option<&LockedItem> {
        self.locked_items
            .iter()
            .find(|l| l.matches(product_ref, variant))
    }

    pub fn find_lock_mut(
        &mut self,
        product_ref: &str,
        variant: Option<&Variant>,
    ) -> Option<&mut LockedItem> {
        self.locked_items
            .iter_mut()
            .find(|l| l.matches(product_ref, variant))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_cart_is_empty_and_active() {
        let cart = Cart::new("user-1", 1000, 5000);
        assert!(cart.is_active);
        assert!(cart.items.is_empty());
        assert!(cart.locked_items.is_empty());
        assert_eq!(cart.expires_at, 6000);
        assert!(!cart.is_expired(5999));
        assert!(cart.is_expired(6000));
    }

    #[test]
    fn test_totals_default_to_zero() {
        let cart = Cart::new("user-1", 0, 1);
        assert_eq!(cart.totals.subtotal, 0.0);
        assert_eq!(cart.totals.total, 0.0);
    }
}
