//! CartManager - cart aggregate entry point
//!
//! Owns the storage handle and the collaborator handles (catalog, wallet,
//! coupon validator) and exposes every cart operation. Collaborator I/O is
//! pre-fetched before the write transaction opens; the transaction itself
//! only touches the cart row and the stock ledger, so redb's single-writer
//! serialization gives per-cart linearizability for free.
//!
//! # Mutation Flow
//!
//! ```text
//! operation(user, input)
//!     ├─ 1. Pre-fetch collaborator facts (await)
//!     ├─ 2. Begin write transaction
//!     ├─ 3. Load or create the cart; clear it when TTL-expired
//!     ├─ 4. Apply the action
//!     ├─ 5. Recompute totals (never trusted from storage)
//!     ├─ 6. Persist and commit
//!     └─ 7. Return CartOutcome { cart, warnings }
//! ```
//!
//! The paid-lock flow is the one exception: the wallet debit sits between a
//! read-snapshot eligibility check and the write transaction, with a
//! compensating credit when anything after the debit fails.

mod error;
pub use error::*;

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use shared::cart::locked::fee_percentage;
use shared::cart::{
    ActiveLock, AddItemInput, Cart, CartOutcome, CartSummary, LockFeeOption, ValidationReport,
    Variant,
};
use shared::util::now_millis;

use crate::actions::validate_cart::{classify_items, StockFact};
use crate::actions::{
    unlock_item, ActionContext, AddItemAction, ApplyCouponAction, ClearCartAction,
    LockItemAction, LockWithPaymentAction, MoveLockedToCartAction, RemoveItemAction,
    UpdateQuantityAction,
};
use crate::catalog::Catalog;
use crate::config::EngineConfig;
use crate::coupon::{CouponContext, CouponItem, CouponValidator};
use crate::expiry::{clear_expired_cart, purge_expired_locks, SweepWorker};
use crate::reservation::ReservationService;
use crate::storage::{stock_key, CartStorage, StorageError};
use crate::totals::{compute_totals, lock_fee, lock_fee_options, TotalsParams};
use crate::wallet::WalletLedger;

/// Database file name inside the configured data directory
const DB_FILE: &str = "carts.redb";

/// CartManager for cart, reservation and price-lock operations
pub struct CartManager {
    storage: CartStorage,
    reservations: ReservationService,
    catalog: Arc<dyn Catalog>,
    wallet: Arc<dyn WalletLedger>,
    coupons: Arc<dyn CouponValidator>,
    config: EngineConfig,
}

impl std::fmt::Debug for CartManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CartManager")
            .field("storage", &"<CartStorage>")
            .field("config", &self.config)
            .finish()
    }
}

impl CartManager {
    /// Open (or create) the engine store under `config.data_dir`
    pub fn new(
        config: EngineConfig,
        catalog: Arc<dyn Catalog>,
        wallet: Arc<dyn WalletLedger>,
        coupons: Arc<dyn CouponValidator>,
    ) -> CartResult<Self> {
        let path = std::path::Path::new(&config.data_dir).join(DB_FILE);
        let storage = CartStorage::open(path)?;
        tracing::info!(data_dir = %config.data_dir, "CartManager started");
        Ok(Self::with_storage(storage, config, catalog, wallet, coupons))
    }

    /// Create a CartManager over existing storage
    pub fn with_storage(
        storage: CartStorage,
        config: EngineConfig,
        catalog: Arc<dyn Catalog>,
        wallet: Arc<dyn WalletLedger>,
        coupons: Arc<dyn CouponValidator>,
    ) -> Self {
        let reservations = ReservationService::new(storage.clone());
        Self {
            storage,
            reservations,
            catalog,
            wallet,
            coupons,
            config,
        }
    }

    /// Build the advisory cleanup worker for this manager's store
    pub fn sweep_worker(&self, shutdown: CancellationToken) -> SweepWorker {
        SweepWorker::new(
            self.storage.clone(),
            self.reservations.clone(),
            &self.config,
            shutdown,
        )
    }

    // ========== Core mutation plumbing ==========

    /// Load the user's cart inside the transaction, creating it on first
    /// access and soft-clearing it when its TTL has passed
    fn load_cart(&self, ctx: &mut ActionContext<'_>, user_ref: &str) -> CartResult<Cart> {
        match self.storage.get_cart_txn(ctx.txn, user_ref)? {
            Some(mut cart) => {
                if cart.is_expired(ctx.now) {
                    tracing::debug!(user = %user_ref, "Cart TTL expired, clearing");
                    self.reservations.release_all_txn(ctx.txn, user_ref)?;
                    clear_expired_cart(&mut cart, ctx.now, self.config.cart_ttl_ms);
                }
                Ok(cart)
            }
            None => Ok(Cart::new(user_ref, ctx.now, self.config.cart_ttl_ms)),
        }
    }

    /// Run one mutation: load, apply, recompute, persist, commit
    fn mutate<F>(&self, user_ref: &str, f: F) -> CartResult<CartOutcome>
    where
        F: FnOnce(&mut ActionContext<'_>, &mut Cart) -> CartResult<()>,
    {
        let now = now_millis();
        let txn = self.storage.begin_write()?;
        let mut ctx = ActionContext {
            txn: &txn,
            reservations: &self.reservations,
            config: &self.config,
            now,
            warnings: Vec::new(),
        };

        let mut cart = self.load_cart(&mut ctx, user_ref)?;
        f(&mut ctx, &mut cart)?;

        let totals = compute_totals(
            &cart.items,
            cart.coupon.as_ref(),
            &TotalsParams::from(&self.config),
        );
        cart.totals = totals;
        cart.updated_at = now;

        self.storage.store_cart(&txn, &cart)?;
        let warnings = ctx.warnings;
        txn.commit().map_err(StorageError::from)?;

        Ok(CartOutcome { cart, warnings })
    }

    // ========== Cart operations ==========

    /// Get the user's cart, creating it on first access
    ///
    /// Reads heal the cart: TTL expiry clears it, expired locks are purged,
    /// and stale totals (positive subtotal, zero total) are recomputed.
    pub async fn get_cart(&self, user_ref: &str) -> CartResult<CartOutcome> {
        self.mutate(user_ref, |ctx, cart| {
            let purged = purge_expired_locks(cart, ctx.now);
            if purged > 0 {
                tracing::debug!(user = %cart.user_ref, purged = purged, "Expired locks purged");
            }
            if crate::totals::is_stale(&cart.totals) {
                tracing::warn!(user = %cart.user_ref, "Stale totals detected, recomputing");
            }
            Ok(())
        })
    }

    /// Condensed cart view for badges and headers
    ///
    /// Read-only: a missing or expired cart yields the empty summary.
    pub async fn get_cart_summary(&self, user_ref: &str) -> CartResult<CartSummary> {
        let now = now_millis();
        let cart = match self.storage.get_cart(user_ref)? {
            Some(cart) if !cart.is_expired(now) => cart,
            _ => return Ok(CartSummary::default()),
        };
        let store_count = cart
            .items
            .iter()
            .filter_map(|i| i.store_ref.as_deref())
            .collect::<HashSet<_>>()
            .len();
        Ok(CartSummary {
            item_count: cart.items.iter().map(|i| u64::from(i.quantity)).sum(),
            store_count,
            has_items: !cart.items.is_empty(),
            totals: cart.totals.clone(),
            coupon: cart.coupon.clone(),
        })
    }

    /// Live locks with their time remaining
    ///
    /// Read-only: lapsed locks are filtered out of the view but stay stored
    /// until the next mutation or sweep purges them.
    pub async fn get_locked_items(&self, user_ref: &str) -> CartResult<Vec<ActiveLock>> {
        let now = now_millis();
        let cart = match self.storage.get_cart(user_ref)? {
            Some(cart) if !cart.is_expired(now) => cart,
            _ => return Ok(Vec::new()),
        };
        Ok(cart
            .locked_items
            .into_iter()
            .filter(|l| !l.is_expired(now))
            .map(|lock| ActiveLock {
                remaining_ms: lock.expires_at - now,
                lock,
            })
            .collect())
    }

    /// Add a product, service booking, or event ticket
    pub async fn add_item(&self, user_ref: &str, input: AddItemInput) -> CartResult<CartOutcome> {
        let availability = self
            .catalog
            .availability(&input.product_ref, input.variant.as_ref())
            .await;
        let quote = self
            .catalog
            .price_quote(&input.product_ref, input.variant.as_ref())
            .await;
        let event_status = match &input.event_ref {
            Some(event_ref) => self.catalog.event_status(event_ref).await,
            None => None,
        };

        tracing::debug!(user = %user_ref, product = %input.product_ref, quantity = input.quantity, "Adding item");
        let action = AddItemAction {
            input,
            availability,
            quote,
            event_status,
        };
        self.mutate(user_ref, |ctx, cart| action.apply(ctx, cart))
    }

    /// Change a line item's quantity; zero removes it
    pub async fn update_quantity(
        &self,
        user_ref: &str,
        product_ref: &str,
        variant: Option<Variant>,
        quantity: u32,
    ) -> CartResult<CartOutcome> {
        let availability = if quantity > 0 {
            self.catalog.availability(product_ref, variant.as_ref()).await
        } else {
            None
        };

        let action = UpdateQuantityAction {
            product_ref: product_ref.to_string(),
            variant,
            quantity,
            availability,
        };
        self.mutate(user_ref, |ctx, cart| action.apply(ctx, cart))
    }

    /// Remove a line item
    pub async fn remove_item(
        &self,
        user_ref: &str,
        product_ref: &str,
        variant: Option<Variant>,
    ) -> CartResult<CartOutcome> {
        let action = RemoveItemAction {
            product_ref: product_ref.to_string(),
            variant,
        };
        self.mutate(user_ref, |ctx, cart| action.apply(ctx, cart))
    }

    /// Empty the cart, releasing every reservation
    ///
    /// Locked items are dropped without refunding their fees; unlock first
    /// to get a paid lock's fee back.
    pub async fn clear_cart(&self, user_ref: &str) -> CartResult<CartOutcome> {
        self.mutate(user_ref, |ctx, cart| ClearCartAction.apply(ctx, cart))
    }

    /// Validate the coupon against the current cart contents and attach it
    pub async fn apply_coupon(&self, user_ref: &str, code: &str) -> CartResult<CartOutcome> {
        // The validator sees the cart as currently persisted
        let cart = self.storage.get_cart(user_ref)?.ok_or(CartError::EmptyCart)?;
        if cart.items.is_empty() {
            return Err(CartError::EmptyCart);
        }
        let ctx = CouponContext {
            user_ref: user_ref.to_string(),
            items: cart
                .items
                .iter()
                .map(|i| CouponItem {
                    product_ref: i.product_ref.clone(),
                    store_ref: i.store_ref.clone(),
                    quantity: i.quantity,
                    unit_price: i.unit_price,
                })
                .collect(),
        };
        let verdict = self.coupons.validate(code, &ctx).await;

        let action = ApplyCouponAction {
            code: code.to_string(),
            verdict,
        };
        self.mutate(user_ref, |ctx, cart| action.apply(ctx, cart))
    }

    /// Detach the coupon
    pub async fn remove_coupon(&self, user_ref: &str) -> CartResult<CartOutcome> {
        self.mutate(user_ref, |_ctx, cart| {
            cart.coupon = None;
            Ok(())
        })
    }

    /// Re-resolve every product line for checkout
    pub async fn validate_cart(&self, user_ref: &str) -> CartResult<ValidationReport> {
        let now = now_millis();
        let mut cart = self.storage.get_cart(user_ref)?.ok_or(CartError::EmptyCart)?;
        purge_expired_locks(&mut cart, now);

        let mut facts: HashMap<String, StockFact> = HashMap::new();
        for item in cart.items.iter().filter(|i| i.is_product()) {
            let key = stock_key(&item.product_ref, item.variant.as_ref());
            if facts.contains_key(&key) {
                continue;
            }
            let availability = self
                .catalog
                .availability(&item.product_ref, item.variant.as_ref())
                .await;
            let reserved_by_others = self.reservations.reserved_by_others(
                user_ref,
                &item.product_ref,
                item.variant.as_ref(),
            )?;
            facts.insert(
                key,
                StockFact {
                    availability,
                    reserved_by_others,
                },
            );
        }

        Ok(classify_items(
            &cart.items,
            &facts,
            self.config.low_stock_threshold,
        ))
    }

    // ========== Price-lock operations ==========

    /// Freeze the current price without payment (default 24h)
    pub async fn lock_item(
        &self,
        user_ref: &str,
        product_ref: &str,
        variant: Option<Variant>,
        quantity: u32,
        duration_hours: Option<u32>,
    ) -> CartResult<CartOutcome> {
        let availability = self.catalog.availability(product_ref, variant.as_ref()).await;
        let quote = self.catalog.price_quote(product_ref, variant.as_ref()).await;

        let action = LockItemAction {
            product_ref: product_ref.to_string(),
            variant,
            quantity,
            duration_hours,
            availability,
            quote,
        };
        self.mutate(user_ref, |ctx, cart| action.apply(ctx, cart))
    }

    /// Fee table for a paid lock on this item at its current price
    pub async fn get_lock_fee_options(
        &self,
        product_ref: &str,
        variant: Option<&Variant>,
        quantity: u32,
    ) -> CartResult<Vec<LockFeeOption>> {
        let quote = self
            .catalog
            .price_quote(product_ref, variant)
            .await
            .ok_or_else(|| CartError::ProductNotFound(product_ref.to_string()))?;
        Ok(lock_fee_options(quote.unit_price, quantity))
    }

    /// Secure a price lock with an upfront refundable wallet fee
    ///
    /// Debit, audit transaction, and lock creation behave as one logical
    /// unit: nothing is charged when the eligibility check fails, and a
    /// failure after the debit triggers a compensating credit.
    pub async fn lock_item_with_payment(
        &self,
        user_ref: &str,
        product_ref: &str,
        variant: Option<Variant>,
        quantity: u32,
        duration_hours: u32,
    ) -> CartResult<CartOutcome> {
        let percentage =
            fee_percentage(duration_hours).ok_or(CartError::InvalidLockDuration(duration_hours))?;
        let availability = self.catalog.availability(product_ref, variant.as_ref()).await;
        let quote = self
            .catalog
            .price_quote(product_ref, variant.as_ref())
            .await
            .ok_or_else(|| CartError::ProductNotFound(product_ref.to_string()))?;
        let fee = lock_fee(quote.unit_price, quantity, percentage);

        let mut action = LockWithPaymentAction {
            product_ref: product_ref.to_string(),
            variant,
            quantity,
            duration_hours,
            percentage,
            fee,
            availability,
            quote: Some(quote),
            transaction: None,
        };

        // Eligibility on a read snapshot: no side effects before the debit
        let now = now_millis();
        let mut read_copy = self
            .storage
            .get_cart(user_ref)?
            .unwrap_or_else(|| Cart::new(user_ref, now, self.config.cart_ttl_ms));
        if read_copy.is_expired(now) {
            clear_expired_cart(&mut read_copy, now, self.config.cart_ttl_ms);
        }
        let reserved_by_others = self.reservations.reserved_by_others(
            user_ref,
            &action.product_ref,
            action.variant.as_ref(),
        )?;
        action.check(&mut read_copy, now, reserved_by_others)?;

        let transaction = self
            .wallet
            .debit(
                user_ref,
                fee,
                &format!("Price lock fee: {}", action.product_ref),
            )
            .await?;
        tracing::info!(
            user = %user_ref,
            product = %action.product_ref,
            fee = fee,
            reference = %transaction.reference,
            "Lock fee debited"
        );
        action.transaction = Some(transaction);

        match self.mutate(user_ref, |ctx, cart| action.apply(ctx, cart)) {
            Ok(outcome) => Ok(outcome),
            Err(err) => {
                // Post-debit failure: give the fee back
                tracing::warn!(user = %user_ref, error = %err, "Paid lock failed after debit, refunding fee");
                if let Err(credit_err) = self
                    .wallet
                    .credit(
                        user_ref,
                        fee,
                        &format!("Lock fee refund: {}", action.product_ref),
                    )
                    .await
                {
                    tracing::error!(
                        user = %user_ref,
                        fee = fee,
                        error = %credit_err,
                        "Compensating credit failed"
                    );
                }
                Err(err)
            }
        }
    }

    /// Remove a lock, refunding a paid fee exactly once
    pub async fn unlock_item(
        &self,
        user_ref: &str,
        product_ref: &str,
        variant: Option<Variant>,
    ) -> CartResult<CartOutcome> {
        let variant_ref = variant.as_ref();
        let mut warnings = Vec::new();

        // Phase 1: record the refund obligation durably before any money
        // moves, so a retry can never credit twice
        let now = now_millis();
        let txn = self.storage.begin_write()?;
        let mut cart = match self.storage.get_cart_txn(&txn, user_ref)? {
            Some(cart) if !cart.is_expired(now) => cart,
            _ => return Err(CartError::LockNotFound(product_ref.to_string())),
        };
        let due = unlock_item::mark_refunded(&mut cart, product_ref, variant_ref, now)?;
        if due.is_some() {
            self.storage.store_cart(&txn, &cart)?;
            txn.commit().map_err(StorageError::from)?;
        } else {
            drop(txn);
        }

        // Phase 2: the credit itself; non-critical once the status says
        // Refunded
        if let Some(due) = &due {
            match self.wallet.credit(user_ref, due.amount, &due.description).await {
                Ok(refund) => {
                    tracing::info!(
                        user = %user_ref,
                        product = %product_ref,
                        amount = due.amount,
                        reference = %refund.reference,
                        "Lock fee refunded"
                    );
                }
                Err(e) => {
                    warnings.push(format!(
                        "Refund credit failed for {}: {}",
                        product_ref, e
                    ));
                    tracing::warn!(user = %user_ref, error = %e, "Refund credit failed");
                }
            }
        }

        // Phase 3: drop the lock entry
        let mut outcome = self.mutate(user_ref, |_ctx, cart| {
            unlock_item::remove_lock(cart, product_ref, variant_ref);
            Ok(())
        })?;
        outcome.warnings.extend(warnings);
        Ok(outcome)
    }

    /// Convert a non-expired lock back into a cart line at the locked price
    pub async fn move_locked_to_cart(
        &self,
        user_ref: &str,
        product_ref: &str,
        variant: Option<Variant>,
    ) -> CartResult<CartOutcome> {
        let action = MoveLockedToCartAction {
            product_ref: product_ref.to_string(),
            variant,
        };
        self.mutate(user_ref, |ctx, cart| action.apply(ctx, cart))
    }
}

#[cfg(test)]
mod tests;
