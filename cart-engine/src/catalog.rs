//! Catalog collaborator
//!
//! The catalog owns authoritative on-hand stock and product state. The
//! engine consults it before every stock-bearing mutation; it never writes
//! back. `InMemoryCatalog` backs tests and single-process embedding.

use std::collections::HashMap;

use async_trait::async_trait;
use dashmap::DashMap;

use shared::cart::Variant;

/// Availability of a `(product_ref, variant)` at a point in time
#[derive(Debug, Clone, Copy)]
pub struct Availability {
    pub is_active: bool,
    pub is_available: bool,
    /// Stock is not tracked for this product; never runs out
    pub unlimited: bool,
    /// Authoritative on-hand units (ignored when `unlimited`)
    pub stock: u32,
}

/// Publication state of an event listing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventStatus {
    Published,
    Draft,
    Cancelled,
}

/// Current pricing for a `(product_ref, variant)`
#[derive(Debug, Clone)]
pub struct PriceQuote {
    pub unit_price: f64,
    pub unit_original_price: f64,
    pub store_ref: Option<String>,
}

/// Read-only catalog contract
#[async_trait]
pub trait Catalog: Send + Sync {
    /// `None` when the product cannot be resolved at all
    async fn availability(
        &self,
        product_ref: &str,
        variant: Option<&Variant>,
    ) -> Option<Availability>;

    async fn price_quote(
        &self,
        product_ref: &str,
        variant: Option<&Variant>,
    ) -> Option<PriceQuote>;

    async fn event_status(&self, event_ref: &str) -> Option<EventStatus>;
}

/// Per-variant stock/price override
#[derive(Debug, Clone)]
pub struct VariantRecord {
    pub stock: u32,
    pub price: Option<f64>,
}

/// One catalog product
#[derive(Debug, Clone)]
pub struct ProductRecord {
    pub is_active: bool,
    pub is_available: bool,
    pub unlimited: bool,
    pub stock: u32,
    pub price: f64,
    pub original_price: f64,
    pub store_ref: Option<String>,
    /// variant key (`type=value`) → override
    pub variants: HashMap<String, VariantRecord>,
}

impl ProductRecord {
    pub fn new(price: f64, stock: u32) -> Self {
        Self {
            is_active: true,
            is_available: true,
            unlimited: false,
            stock,
            price,
            original_price: price,
            store_ref: None,
            variants: HashMap::new(),
        }
    }
}

/// In-memory catalog for tests and single-process embedding
#[derive(Default)]
pub struct InMemoryCatalog {
    products: DashMap<String, ProductRecord>,
    events: DashMap<String, EventStatus>,
}

impl InMemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_product(&self, product_ref: impl Into<String>, record: ProductRecord) {
        self.products.insert(product_ref.into(), record);
    }

    pub fn insert_event(&self, event_ref: impl Into<String>, status: EventStatus) {
        self.events.insert(event_ref.into(), status);
    }

    pub fn set_stock(&self, product_ref: &str, stock: u32) {
        if let Some(mut record) = self.products.get_mut(product_ref) {
            record.stock = stock;
        }
    }

    pub fn set_active(&self, product_ref: &str, is_active: bool) {
        if let Some(mut record) = self.products.get_mut(product_ref) {
            record.is_active = is_active;
        }
    }

    pub fn set_available(&self, product_ref: &str, is_available: bool) {
        if let Some(mut record) = self.products.get_mut(product_ref) {
            record.is_available = is_available;
        }
    }

    pub fn remove_product(&self, product_ref: &str) {
        self.products.remove(product_ref);
    }
}

#[async_trait]
impl Catalog for InMemoryCatalog {
    async fn availability(
        &self,
        product_ref: &str,
        variant: Option<&Variant>,
    ) -> Option<Availability> {
        let record = self.products.get(product_ref)?;
        let stock = match variant {
            Some(v) => match record.variants.get(&v.key()) {
                Some(vr) => vr.stock,
                None => record.stock,
            },
            None => record.stock,
        };
        Some(Availability {
            is_active: record.is_active,
            is_available: record.is_available,
            unlimited: record.unlimited,
            stock,
        })
    }

    async fn price_quote(
        &self,
        product_ref: &str,
        variant: Option<&Variant>,
    ) -> Option<PriceQuote> {
        let record = self.products.get(product_ref)?;
        let unit_price = variant
            .and_then(|v| record.variants.get(&v.key()))
            .and_then(|vr| vr.price)
            .unwrap_or(record.price);
        Some(PriceQuote {
            unit_price,
            unit_original_price: record.original_price.max(unit_price),
            store_ref: record.store_ref.clone(),
        })
    }

    async fn event_status(&self, event_ref: &str) -> Option<EventStatus> {
        self.events.get(event_ref).map(|s| *s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_variant_aware_stock_lookup() {
        let catalog = InMemoryCatalog::new();
        let mut record = ProductRecord::new(100.0, 10);
        record.variants.insert(
            "size=XL".to_string(),
            VariantRecord {
                stock: 2,
                price: Some(120.0),
            },
        );
        catalog.insert_product("p1", record);

        let base = catalog.availability("p1", None).await.unwrap();
        assert_eq!(base.stock, 10);

        let xl = Variant::new("size", "XL");
        let sized = catalog.availability("p1", Some(&xl)).await.unwrap();
        assert_eq!(sized.stock, 2);

        let quote = catalog.price_quote("p1", Some(&xl)).await.unwrap();
        assert_eq!(quote.unit_price, 120.0);

        assert!(catalog.availability("missing", None).await.is_none());
    }
}
