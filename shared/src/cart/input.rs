//! Mutation inputs accepted by the engine

use serde::{Deserialize, Serialize};

use super::item::{ServiceBooking, Variant};

/// Input for adding a line item
///
/// The kind is inferred: `event_ref` makes an event ticket, `booking` makes
/// a service appointment, otherwise a plain product.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddItemInput {
    pub product_ref: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub variant: Option<Variant>,
    pub quantity: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub booking: Option<ServiceBooking>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event_ref: Option<String>,
}

impl AddItemInput {
    pub fn product(product_ref: impl Into<String>, quantity: u32) -> Self {
        Self {
            product_ref: product_ref.into(),
            variant: None,
            quantity,
            booking: None,
            event_ref: None,
        }
    }

    pub fn with_variant(mut self, variant: Variant) -> Self {
        self.variant = Some(variant);
        self
    }
}
