//! Cart consistency, stock-reservation and price-lock engine
//!
//! Library-level core of a multi-merchant commerce platform: keeps a
//! shopper's cart, a store's finite inventory, and a wallet-funded price
//! lock mutually consistent under concurrent access.
//!
//! - **manager**: `CartManager`, the cart aggregate entry point
//! - **storage**: redb persistence for carts and the stock ledger
//! - **reservation**: advisory stock reservations (sole ledger writer)
//! - **totals**: pure totals calculator
//! - **expiry**: passive-expiry predicates and the advisory sweep task
//! - **catalog / wallet / coupon**: external collaborator contracts with
//!   in-memory implementations for tests and embedding
//!
//! # Operation Flow
//!
//! ```text
//! mutation(user, input)
//!     ├─ 1. Pre-fetch collaborator facts (catalog, wallet, coupons)
//!     ├─ 2. Begin write transaction
//!     ├─ 3. Load (or create) the cart, clear if TTL-expired
//!     ├─ 4. Purge expired locks touching the mutated key
//!     ├─ 5. Apply the action (items, locks, advisory reservations)
//!     ├─ 6. Recompute totals
//!     ├─ 7. Persist and commit
//!     └─ 8. Return CartOutcome { cart, warnings } or a typed rejection
//! ```

pub mod actions;
pub mod catalog;
pub mod config;
pub mod coupon;
pub mod expiry;
pub mod logger;
pub mod manager;
pub mod reservation;
pub mod storage;
pub mod totals;
pub mod wallet;

pub use catalog::{Availability, Catalog, EventStatus, InMemoryCatalog, PriceQuote};
pub use config::EngineConfig;
pub use coupon::{CouponContext, CouponValidator, CouponVerdict, InMemoryCoupons};
pub use expiry::SweepWorker;
pub use manager::{CartError, CartManager, CartResult};
pub use reservation::ReservationService;
pub use storage::{CartStorage, StorageError};
pub use wallet::{InMemoryWallet, WalletError, WalletLedger};

// Re-export shared types for convenience
pub use shared::cart::{
    AddItemInput, Cart, CartItem, CartOutcome, CartRejection, CartTotals, ItemKind,
    LockFeeOption, LockPaymentStatus, LockedItem, RejectionCode, ValidationReport, Variant,
};
