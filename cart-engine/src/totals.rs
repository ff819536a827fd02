//! Totals calculation using rust_decimal for precision
//!
//! Pure, deterministic function over (items, coupon). All arithmetic runs on
//! `Decimal` internally and converts to `f64` only at the edges. Locked items
//! do not contribute to totals; they re-enter the subtotal when moved back to
//! the cart.
//!
//! Payable formula: `total = max(0, subtotal + tax + delivery - discount)`.
//! Cashback is tracked but never subtracted; it is display-only in this
//! platform's semantics.

use rust_decimal::prelude::*;

use shared::cart::{AppliedCoupon, CartItem, CartTotals, LockFeeOption};
use shared::cart::locked::{fee_percentage, PAID_LOCK_DURATION_HOURS};

/// Rounding for monetary values (2 decimal places, half away from zero)
const DECIMAL_PLACES: u32 = 2;

/// Rates consumed by the calculator
#[derive(Debug, Clone, Copy)]
pub struct TotalsParams {
    pub tax_rate: f64,
    pub delivery_fee: f64,
    pub free_delivery_threshold: f64,
    pub cashback_rate: f64,
}

impl From<&crate::config::EngineConfig> for TotalsParams {
    fn from(config: &crate::config::EngineConfig) -> Self {
        Self {
            tax_rate: config.tax_rate,
            delivery_fee: config.delivery_fee,
            free_delivery_threshold: config.free_delivery_threshold,
            cashback_rate: config.cashback_rate,
        }
    }
}

/// Convert f64 to Decimal (non-finite inputs collapse to zero)
pub fn to_decimal(value: f64) -> Decimal {
    Decimal::from_f64(value).unwrap_or_default()
}

/// Convert Decimal back to f64, rounded to 2 decimal places
pub fn to_f64(value: Decimal) -> f64 {
    value
        .round_dp_with_strategy(DECIMAL_PLACES, RoundingStrategy::MidpointAwayFromZero)
        .to_f64()
        .unwrap_or(0.0)
}

/// Recompute cart totals from scratch
pub fn compute_totals(
    items: &[CartItem],
    coupon: Option<&AppliedCoupon>,
    params: &TotalsParams,
) -> CartTotals {
    let mut subtotal = Decimal::ZERO;
    let mut item_savings = Decimal::ZERO;

    for item in items {
        let quantity = Decimal::from(item.quantity);
        subtotal += to_decimal(item.unit_price) * quantity;
        let original = to_decimal(item.unit_original_price);
        let current = to_decimal(item.unit_price);
        if original > current {
            item_savings += (original - current) * quantity;
        }
    }

    let tax = subtotal * to_decimal(params.tax_rate);

    let delivery = if subtotal > Decimal::ZERO && subtotal < to_decimal(params.free_delivery_threshold)
    {
        to_decimal(params.delivery_fee)
    } else {
        Decimal::ZERO
    };

    let discount = match coupon {
        Some(c) => to_decimal(c.applied_amount).min(subtotal).max(Decimal::ZERO),
        None => Decimal::ZERO,
    };

    let cashback = subtotal * to_decimal(params.cashback_rate);

    let total = (subtotal + tax + delivery - discount).max(Decimal::ZERO);

    CartTotals {
        subtotal: to_f64(subtotal),
        tax: to_f64(tax),
        delivery: to_f64(delivery),
        discount: to_f64(discount),
        cashback: to_f64(cashback),
        total: to_f64(total),
        savings: to_f64(item_savings + discount),
    }
}

/// Staleness predicate: a positive subtotal with a zero total means the
/// stored totals were never recomputed after a mutation and must be healed
pub fn is_stale(totals: &CartTotals) -> bool {
    totals.subtotal > 0.0 && totals.total == 0.0
}

/// Paid-lock fee: `ceil(unit_price * quantity * percentage / 100)`
///
/// The ceiling lands on whole currency units, so the platform never
/// undercharges on fractional fees.
pub fn lock_fee(unit_price: f64, quantity: u32, percentage: u32) -> f64 {
    let fee = to_decimal(unit_price) * Decimal::from(quantity) * Decimal::from(percentage)
        / Decimal::ONE_HUNDRED;
    fee.ceil().to_f64().unwrap_or(0.0)
}

/// Fee table for every offered paid-lock duration at the given price/quantity
pub fn lock_fee_options(unit_price: f64, quantity: u32) -> Vec<LockFeeOption> {
    PAID_LOCK_DURATION_HOURS
        .iter()
        .map(|&duration_hours| {
            let percentage = fee_percentage(duration_hours).unwrap_or(0);
            LockFeeOption {
                duration_hours,
                percentage,
                fee: lock_fee(unit_price, quantity, percentage),
            }
        })
        .collect()
}
