//! Passive expiry and the advisory cleanup sweep
//!
//! Expiry is a predicate, not a timer: a lock or cart with
//! `expires_at <= now` is already gone the moment any code path looks at it.
//! The `SweepWorker` only bounds storage growth by reclaiming what lazy
//! evaluation has logically discarded; correctness never depends on it
//! running.

use std::collections::HashSet;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use shared::cart::{Cart, Variant};
use shared::util::now_millis;

use crate::config::EngineConfig;
use crate::reservation::ReservationService;
use crate::storage::{CartStorage, StorageResult};

/// Drop expired locks for one `(product_ref, variant)` key, returning how
/// many were purged
///
/// Write paths call this before a duplicate-lock check so a stale lock never
/// blocks a new one.
pub fn purge_expired_locks_for(
    cart: &mut Cart,
    product_ref: &str,
    variant: Option<&Variant>,
    now: i64,
) -> usize {
    let before = cart.locked_items.len();
    cart.locked_items
        .retain(|l| !(l.matches(product_ref, variant) && l.is_expired(now)));
    before - cart.locked_items.len()
}

/// Drop every expired lock in the cart, returning how many were purged
pub fn purge_expired_locks(cart: &mut Cart, now: i64) -> usize {
    let before = cart.locked_items.len();
    cart.locked_items.retain(|l| !l.is_expired(now));
    before - cart.locked_items.len()
}

/// Soft-expire a cart: clear contents, keep the record, restart the TTL
pub fn clear_expired_cart(cart: &mut Cart, now: i64, ttl_ms: i64) {
    cart.items.clear();
    cart.locked_items.clear();
    cart.coupon = None;
    cart.totals = Default::default();
    cart.updated_at = now;
    cart.expires_at = now + ttl_ms;
}

/// Counters reported by one sweep pass
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SweepStats {
    pub carts_cleared: usize,
    pub locks_purged: usize,
    pub reservations_dropped: usize,
}

/// Periodic advisory cleanup task
///
/// Reclaims TTL-expired carts, expired locked items, and orphaned
/// reservations on a fixed interval until cancelled.
pub struct SweepWorker {
    storage: CartStorage,
    reservations: ReservationService,
    interval: Duration,
    cart_ttl_ms: i64,
    shutdown: CancellationToken,
}

impl SweepWorker {
    pub fn new(
        storage: CartStorage,
        reservations: ReservationService,
        config: &EngineConfig,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            storage,
            reservations,
            interval: Duration::from_secs(config.sweep_interval_secs),
            cart_ttl_ms: config.cart_ttl_ms,
            shutdown,
        }
    }

    /// Run until cancelled
    pub async fn run(self) {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        // First tick fires immediately; skip it so startup is quiet
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = self.shutdown.cancelled() => {
                    tracing::info!("Sweep worker shutting down");
                    break;
                }
                _ = ticker.tick() => {
                    match self.sweep_once() {
                        Ok(stats) if stats != SweepStats::default() => {
                            tracing::info!(
                                carts_cleared = stats.carts_cleared,
                                locks_purged = stats.locks_purged,
                                reservations_dropped = stats.reservations_dropped,
                                "Sweep completed"
                            );
                        }
                        Ok(_) => {}
                        Err(e) => {
                            tracing::warn!(error = %e, "Sweep failed");
                        }
                    }
                }
            }
        }
    }

    /// One idempotent cleanup pass
    pub fn sweep_once(&self) -> StorageResult<SweepStats> {
        let now = now_millis();
        let mut stats = SweepStats::default();
        let mut live_refs: HashSet<String> = HashSet::new();

        let txn = self.storage.begin_write()?;
        for mut cart in self.storage.get_all_carts()? {
            if cart.is_expired(now) {
                if !cart.items.is_empty() || !cart.locked_items.is_empty() {
                    self.reservations.release_all_txn(&txn, &cart.user_ref)?;
                    clear_expired_cart(&mut cart, now, self.cart_ttl_ms);
                    self.storage.store_cart(&txn, &cart)?;
                    stats.carts_cleared += 1;
                }
                continue;
            }

            live_refs.insert(cart.user_ref.clone());
            let purged = purge_expired_locks(&mut cart, now);
            if purged > 0 {
                cart.updated_at = now;
                self.storage.store_cart(&txn, &cart)?;
                stats.locks_purged += purged;
            }
        }

        stats.reservations_dropped = self.reservations.sweep_orphans_txn(&txn, &live_refs)?;
        txn.commit()?;

        Ok(stats)
    }
}
