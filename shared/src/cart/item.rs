//! Cart line items
//!
//! A cart holds three disjoint kinds of line items sharing one container:
//! plain products, appointment-style service bookings, and event tickets.
//! The kind is a tagged union so every operation can discriminate once at
//! the top instead of sniffing optional fields.

use serde::{Deserialize, Serialize};

/// Product variant selection, e.g. `{ type: "size", value: "XL" }`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Variant {
    #[serde(rename = "type")]
    pub variant_type: String,
    pub value: String,
}

impl Variant {
    pub fn new(variant_type: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            variant_type: variant_type.into(),
            value: value.into(),
        }
    }

    /// Stable string form used in ledger keys and log fields
    pub fn key(&self) -> String {
        format!("{}={}", self.variant_type, self.value)
    }
}

/// Booking time slot, e.g. `{ start: "14:00", end: "15:00" }`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeSlot {
    pub start: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end: Option<String>,
}

/// Appointment details carried by service items
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceBooking {
    /// Booking date (Unix millis, start of the appointment day)
    pub booking_date: i64,
    pub time_slot: TimeSlot,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_minutes: Option<u32>,
}

/// Line item kind with kind-specific payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ItemKind {
    Product,
    Service { booking: ServiceBooking },
    Event { event_ref: String },
}

/// A single cart line item
///
/// Uniqueness: at most one item per `(product_ref, variant)` pair, except
/// service bookings which are unique per
/// `(product_ref, variant, booking_date, time_slot.start)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CartItem {
    pub product_ref: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub store_ref: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub variant: Option<Variant>,
    pub quantity: u32,
    pub unit_price: f64,
    pub unit_original_price: f64,
    /// When the item entered the cart (Unix millis)
    pub added_at: i64,
    #[serde(flatten)]
    pub kind: ItemKind,
    /// Price frozen by a lock this item was materialized from
    #[serde(skip_serializing_if = "Option::is_none")]
    pub locked_price: Option<f64>,
    /// Fee already paid for the lock this item came from; an item carrying
    /// this marker refuses re-locking (double-charge guard)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lock_fee_marker: Option<f64>,
}

impl CartItem {
    /// Whether this item occupies the `(product_ref, variant)` slot
    pub fn matches(&self, product_ref: &str, variant: Option<&Variant>) -> bool {
        self.product_ref == product_ref && self.variant.as_ref() == variant
    }

    /// Service booking identity, if this is a service item
    pub fn booking_key(&self) -> Option<(i64, &str)> {
        match &self.kind {
            ItemKind::Service { booking } => {
                Some((booking.booking_date, booking.time_slot.start.as_str()))
            }
            _ => None,
        }
    }

    pub fn is_product(&self) -> bool {
        matches!(self.kind, ItemKind::Product)
    }
}
