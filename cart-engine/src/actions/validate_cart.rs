//! Checkout validation
//!
//! Re-resolves every product line against the live catalog and classifies it
//! into exactly one issue. Missing, inactive, unavailable, out-of-stock and
//! insufficient-stock block checkout; low stock is a warning returned
//! alongside a still-valid result. The stock figure used here is the hard
//! one: on-hand minus what other carts have reserved.

use std::collections::HashMap;

use shared::cart::{CartItem, ItemIssue, ItemIssueKind, ValidationReport};

use crate::catalog::Availability;
use crate::storage::stock_key;

use super::available_units;

/// Facts the manager gathers per `(product_ref, variant)` before classifying
#[derive(Debug, Clone)]
pub struct StockFact {
    /// `None` when the product no longer resolves
    pub availability: Option<Availability>,
    pub reserved_by_others: u32,
}

/// Classify every product line; service and event lines carry no stock and
/// pass through untouched
pub fn classify_items(
    items: &[CartItem],
    facts: &HashMap<String, StockFact>,
    low_stock_threshold: u32,
) -> ValidationReport {
    let mut issues = Vec::new();
    let mut warnings = Vec::new();

    for item in items {
        if !item.is_product() {
            continue;
        }
        let key = stock_key(&item.product_ref, item.variant.as_ref());
        let fact = facts.get(&key);

        let issue = classify_one(item, fact, low_stock_threshold);
        match issue {
            Some(issue) if issue.issue == ItemIssueKind::LowStock => warnings.push(issue),
            Some(issue) => issues.push(issue),
            None => {}
        }
    }

    ValidationReport {
        is_valid: issues.is_empty(),
        issues,
        warnings,
    }
}

fn classify_one(
    item: &CartItem,
    fact: Option<&StockFact>,
    low_stock_threshold: u32,
) -> Option<ItemIssue> {
    let make = |kind: ItemIssueKind, available: Option<u32>, message: String| ItemIssue {
        product_ref: item.product_ref.clone(),
        variant: item.variant.clone(),
        quantity_requested: item.quantity,
        issue: kind,
        available,
        message,
    };

    let Some(availability) = fact.and_then(|f| f.availability.as_ref()) else {
        return Some(make(
            ItemIssueKind::Missing,
            None,
            format!("Product no longer exists: {}", item.product_ref),
        ));
    };
    if !availability.is_active {
        return Some(make(
            ItemIssueKind::Inactive,
            None,
            format!("Product is inactive: {}", item.product_ref),
        ));
    }
    if !availability.is_available {
        return Some(make(
            ItemIssueKind::Unavailable,
            None,
            format!("Product is unavailable: {}", item.product_ref),
        ));
    }

    let reserved_by_others = fact.map(|f| f.reserved_by_others).unwrap_or(0);
    let Some(available) = available_units(availability, reserved_by_others) else {
        return None;
    };

    if available == 0 {
        return Some(make(
            ItemIssueKind::OutOfStock,
            Some(0),
            format!("Out of stock: {}", item.product_ref),
        ));
    }
    if available < item.quantity {
        return Some(make(
            ItemIssueKind::InsufficientStock,
            Some(available),
            format!(
                "Only {} items remaining for {}",
                available, item.product_ref
            ),
        ));
    }
    if available <= low_stock_threshold {
        return Some(make(
            ItemIssueKind::LowStock,
            Some(available),
            format!("Low stock for {}: {} left", item.product_ref, available),
        ));
    }

    None
}
