//! ApplyCoupon action
//!
//! The validator verdict is pre-fetched by the manager (the validator is an
//! external collaborator). On acceptance the coupon is attached; on
//! rejection the cart stays untouched and the validator's reason propagates
//! verbatim.

use shared::cart::{AppliedCoupon, Cart, DiscountType};

use crate::coupon::CouponVerdict;
use crate::manager::{CartError, CartResult};

use super::ActionContext;

/// ApplyCoupon action
#[derive(Debug)]
pub struct ApplyCouponAction {
    pub code: String,
    pub verdict: CouponVerdict,
}

impl ApplyCouponAction {
    pub fn apply(&self, _ctx: &mut ActionContext<'_>, cart: &mut Cart) -> CartResult<()> {
        if cart.items.is_empty() {
            return Err(CartError::EmptyCart);
        }
        if !self.verdict.is_valid {
            let reason = self
                .verdict
                .reason
                .clone()
                .unwrap_or_else(|| "Coupon is not valid".to_string());
            return Err(CartError::CouponRejected(reason));
        }

        cart.coupon = Some(AppliedCoupon {
            code: self.code.clone(),
            discount_type: self.verdict.discount_type.unwrap_or(DiscountType::Fixed),
            applied_amount: self.verdict.discount_amount.unwrap_or(0.0),
        });

        Ok(())
    }
}
