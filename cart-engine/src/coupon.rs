//! Coupon validator collaborator
//!
//! The discount algorithm lives outside the engine: the validator is handed
//! the cart contents and answers with a yes/no plus a resolved discount
//! amount. On rejection the engine surfaces the validator's reason verbatim
//! and leaves the cart unchanged.

use async_trait::async_trait;
use dashmap::DashMap;

use shared::cart::DiscountType;

/// One cart line as seen by the validator
#[derive(Debug, Clone)]
pub struct CouponItem {
    pub product_ref: String,
    pub store_ref: Option<String>,
    pub quantity: u32,
    pub unit_price: f64,
}

/// Validation context built from the current cart contents
#[derive(Debug, Clone)]
pub struct CouponContext {
    pub user_ref: String,
    pub items: Vec<CouponItem>,
}

/// Validator verdict
#[derive(Debug, Clone)]
pub struct CouponVerdict {
    pub is_valid: bool,
    pub reason: Option<String>,
    pub discount_amount: Option<f64>,
    pub discount_type: Option<DiscountType>,
    /// Product refs the discount applies to; `None` means cart-wide
    pub applicable_items: Option<Vec<String>>,
}

impl CouponVerdict {
    pub fn rejected(reason: impl Into<String>) -> Self {
        Self {
            is_valid: false,
            reason: Some(reason.into()),
            discount_amount: None,
            discount_type: None,
            applicable_items: None,
        }
    }
}

#[async_trait]
pub trait CouponValidator: Send + Sync {
    async fn validate(&self, code: &str, ctx: &CouponContext) -> CouponVerdict;
}

/// A coupon rule held by the in-memory validator
#[derive(Debug, Clone)]
pub struct CouponRule {
    pub discount_type: DiscountType,
    /// Fixed currency amount, or percentage of the subtotal
    pub amount: f64,
    pub min_subtotal: Option<f64>,
}

/// In-memory coupon validator for tests and single-process embedding
#[derive(Default)]
pub struct InMemoryCoupons {
    coupons: DashMap<String, CouponRule>,
}

impl InMemoryCoupons {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, code: impl Into<String>, rule: CouponRule) {
        self.coupons.insert(code.into(), rule);
    }
}

#[async_trait]
impl CouponValidator for InMemoryCoupons {
    async fn validate(&self, code: &str, ctx: &CouponContext) -> CouponVerdict {
        let Some(rule) = self.coupons.get(code) else {
            return CouponVerdict::rejected(format!("Coupon not found: {}", code));
        };

        let subtotal: f64 = ctx
            .items
            .iter()
            .map(|i| i.unit_price * i.quantity as f64)
            .sum();

        if let Some(min) = rule.min_subtotal
            && subtotal < min
        {
            return CouponVerdict::rejected(format!(
                "Coupon requires a minimum subtotal of {}",
                min
            ));
        }

        let discount_amount = match rule.discount_type {
            DiscountType::Fixed => rule.amount,
            DiscountType::Percentage => subtotal * rule.amount / 100.0,
        };

        CouponVerdict {
            is_valid: true,
            reason: None,
            discount_amount: Some(discount_amount),
            discount_type: Some(rule.discount_type),
            applicable_items: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx(subtotal_item_price: f64) -> CouponContext {
        CouponContext {
            user_ref: "user-1".to_string(),
            items: vec![CouponItem {
                product_ref: "p1".to_string(),
                store_ref: None,
                quantity: 1,
                unit_price: subtotal_item_price,
            }],
        }
    }

    #[tokio::test]
    async fn test_unknown_code_is_rejected_with_reason() {
        let coupons = InMemoryCoupons::new();
        let verdict = coupons.validate("NOPE", &ctx(100.0)).await;
        assert!(!verdict.is_valid);
        assert!(verdict.reason.unwrap().contains("NOPE"));
    }

    #[tokio::test]
    async fn test_percentage_coupon_resolves_amount() {
        let coupons = InMemoryCoupons::new();
        coupons.insert(
            "TEN",
            CouponRule {
                discount_type: DiscountType::Percentage,
                amount: 10.0,
                min_subtotal: None,
            },
        );

        let verdict = coupons.validate("TEN", &ctx(200.0)).await;
        assert!(verdict.is_valid);
        assert_eq!(verdict.discount_amount, Some(20.0));
    }

    #[tokio::test]
    async fn test_min_subtotal_enforced() {
        let coupons = InMemoryCoupons::new();
        coupons.insert(
            "BIG",
            CouponRule {
                discount_type: DiscountType::Fixed,
                amount: 50.0,
                min_subtotal: Some(300.0),
            },
        );

        let verdict = coupons.validate("BIG", &ctx(100.0)).await;
        assert!(!verdict.is_valid);
    }
}
