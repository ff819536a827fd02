use thiserror::Error;

use shared::cart::{CartRejection, RejectionCode};

use crate::storage::StorageError;
use crate::wallet::WalletError;

/// Engine errors
#[derive(Debug, Error)]
pub enum CartError {
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Invalid input: {0}")]
    Validation(String),

    #[error("Product not found: {0}")]
    ProductNotFound(String),

    #[error("Product is inactive: {0}")]
    ProductInactive(String),

    #[error("Product is unavailable: {0}")]
    ProductUnavailable(String),

    #[error("Out of stock: {0}")]
    OutOfStock(String),

    #[error("Only {available} items remaining for {product_ref}")]
    InsufficientStock { product_ref: String, available: u32 },

    #[error("A booking for this date and time already exists")]
    DuplicateBooking,

    #[error("An active lock already exists for {0}")]
    DuplicateLock(String),

    #[error("No active lock found for {0}")]
    LockNotFound(String),

    #[error("Item not found in cart: {0}")]
    ItemNotFound(String),

    #[error("Cart is empty")]
    EmptyCart,

    #[error("{0}")]
    CouponRejected(String),

    #[error("Invalid lock duration: {0} hours")]
    InvalidLockDuration(u32),

    #[error("Insufficient wallet balance: {balance}")]
    InsufficientFunds { balance: f64 },

    #[error("Event is not published: {0}")]
    EventNotPublished(String),

    #[error("Wallet error: {0}")]
    Wallet(String),
}

impl From<WalletError> for CartError {
    fn from(err: WalletError) -> Self {
        match err {
            WalletError::InsufficientFunds { balance } => CartError::InsufficientFunds { balance },
            WalletError::Unavailable(msg) => CartError::Wallet(msg),
        }
    }
}

/// Map a storage failure to a stable code (clients handle localization)
fn classify_storage_error(e: &StorageError) -> RejectionCode {
    if let StorageError::Serialization(_) = e {
        return RejectionCode::InternalError;
    }

    let err_str = e.to_string().to_lowercase();

    if err_str.contains("no space") || err_str.contains("disk full") || err_str.contains("enospc")
    {
        return RejectionCode::StorageFull;
    }
    if err_str.contains("corrupt") || err_str.contains("invalid database") {
        return RejectionCode::StorageCorrupted;
    }

    RejectionCode::SystemBusy
}

impl From<CartError> for CartRejection {
    fn from(err: CartError) -> Self {
        match err {
            CartError::Storage(e) => {
                let code = classify_storage_error(&e);
                tracing::error!(error = %e, error_code = ?code, "Storage error occurred");
                CartRejection::new(code, e.to_string())
            }
            CartError::Validation(msg) => CartRejection::new(RejectionCode::InvalidInput, msg),
            CartError::ProductNotFound(_) => {
                CartRejection::new(RejectionCode::ProductNotFound, err.to_string())
            }
            CartError::ProductInactive(_) => {
                CartRejection::new(RejectionCode::ProductInactive, err.to_string())
            }
            CartError::ProductUnavailable(_) => {
                CartRejection::new(RejectionCode::ProductUnavailable, err.to_string())
            }
            CartError::OutOfStock(_) => {
                CartRejection::new(RejectionCode::OutOfStock, err.to_string()).with_available(0)
            }
            CartError::InsufficientStock {
                ref product_ref,
                available,
            } => CartRejection::new(
                RejectionCode::InsufficientStock,
                format!("Only {} items remaining for {}", available, product_ref),
            )
            .with_available(available),
            CartError::DuplicateBooking => CartRejection::new(
                RejectionCode::DuplicateBooking,
                "A booking for this date and time already exists",
            ),
            CartError::DuplicateLock(_) => {
                CartRejection::new(RejectionCode::DuplicateLock, err.to_string())
            }
            CartError::LockNotFound(_) => {
                CartRejection::new(RejectionCode::LockNotFound, err.to_string())
            }
            CartError::ItemNotFound(_) => {
                CartRejection::new(RejectionCode::ItemNotFound, err.to_string())
            }
            CartError::EmptyCart => CartRejection::new(RejectionCode::EmptyCart, "Cart is empty"),
            CartError::CouponRejected(msg) => {
                CartRejection::new(RejectionCode::CouponRejected, msg)
            }
            CartError::InvalidLockDuration(hours) => CartRejection::new(
                RejectionCode::InvalidLockDuration,
                format!("Invalid lock duration: {} hours", hours),
            ),
            CartError::InsufficientFunds { balance } => CartRejection::new(
                RejectionCode::InsufficientFunds,
                format!("Insufficient wallet balance: {}", balance),
            ),
            CartError::EventNotPublished(_) => {
                CartRejection::new(RejectionCode::EventNotPublished, err.to_string())
            }
            CartError::Wallet(msg) => CartRejection::new(RejectionCode::WalletFailure, msg),
        }
    }
}

pub type CartResult<T> = Result<T, CartError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insufficient_stock_carries_available_count() {
        let rejection: CartRejection = CartError::InsufficientStock {
            product_ref: "p1".to_string(),
            available: 3,
        }
        .into();
        assert_eq!(rejection.code, RejectionCode::InsufficientStock);
        assert_eq!(rejection.available, Some(3));
        assert!(rejection.message.contains("Only 3 items remaining"));
    }

    #[test]
    fn test_out_of_stock_reports_zero_available() {
        let rejection: CartRejection = CartError::OutOfStock("p1".to_string()).into();
        assert_eq!(rejection.available, Some(0));
    }

    #[test]
    fn test_coupon_rejection_surfaces_reason_verbatim() {
        let rejection: CartRejection =
            CartError::CouponRejected("Coupon expired on Tuesday".to_string()).into();
        assert_eq!(rejection.message, "Coupon expired on Tuesday");
    }
}
