//! Advisory stock reservations
//!
//! The reservation service is the only writer of the stock ledger. A
//! reservation is a soft hold: it informs the cart-mutation path of likely
//! availability but never blocks a catalog write. The authoritative check is
//! always `on_hand - reserved >= requested` against the live catalog at
//! mutation time.
//!
//! A failed reservation write never fails the surrounding cart mutation.
//! Callers log it as a warning and move on; the hard stock check happens
//! again at checkout validation.

use redb::WriteTransaction;

use shared::cart::Variant;
use shared::util::now_millis;

use crate::storage::{stock_key, CartStorage, StorageResult};

/// Reserve/release operations over the stock ledger
#[derive(Clone)]
pub struct ReservationService {
    storage: CartStorage,
}

impl ReservationService {
    pub fn new(storage: CartStorage) -> Self {
        Self { storage }
    }

    /// Reserve `quantity` units of `(product_ref, variant)` for a cart
    ///
    /// Idempotent per `(cart_ref, product_ref, variant)`: re-reserving the
    /// same key replaces the previous quantity rather than accumulating.
    pub fn reserve_txn(
        &self,
        txn: &WriteTransaction,
        cart_ref: &str,
        product_ref: &str,
        variant: Option<&Variant>,
        quantity: u32,
    ) -> StorageResult<()> {
        let key = stock_key(product_ref, variant);
        let mut entry = self
            .storage
            .get_ledger_entry_txn(txn, &key)?
            .unwrap_or_default();
        entry.reservations.insert(cart_ref.to_string(), quantity);
        entry.last_updated = now_millis();
        self.storage.store_ledger_entry(txn, &key, &entry)?;
        tracing::debug!(
            cart = %cart_ref,
            product = %product_ref,
            quantity = quantity,
            "Stock reserved"
        );
        Ok(())
    }

    /// Release a cart's reservation on `(product_ref, variant)`
    ///
    /// Safe to call when no reservation exists (no-op). Entries whose sum
    /// reaches zero are deleted.
    pub fn release_txn(
        &self,
        txn: &WriteTransaction,
        cart_ref: &str,
        product_ref: &str,
        variant: Option<&Variant>,
    ) -> StorageResult<()> {
        let key = stock_key(product_ref, variant);
        let Some(mut entry) = self.storage.get_ledger_entry_txn(txn, &key)? else {
            return Ok(());
        };
        if entry.reservations.remove(cart_ref).is_none() {
            return Ok(());
        }
        if entry.reservations.is_empty() {
            self.storage.remove_ledger_entry(txn, &key)?;
        } else {
            entry.last_updated = now_millis();
            self.storage.store_ledger_entry(txn, &key, &entry)?;
        }
        tracing::debug!(cart = %cart_ref, product = %product_ref, "Stock reservation released");
        Ok(())
    }

    /// Release every reservation held by a cart (cart clear / expiry)
    pub fn release_all_txn(&self, txn: &WriteTransaction, cart_ref: &str) -> StorageResult<()> {
        for key in self.storage.ledger_keys_txn(txn)? {
            let Some(mut entry) = self.storage.get_ledger_entry_txn(txn, &key)? else {
                continue;
            };
            if entry.reservations.remove(cart_ref).is_none() {
                continue;
            }
            if entry.reservations.is_empty() {
                self.storage.remove_ledger_entry(txn, &key)?;
            } else {
                entry.last_updated = now_millis();
                self.storage.store_ledger_entry(txn, &key, &entry)?;
            }
        }
        Ok(())
    }

    /// Total units reserved on `(product_ref, variant)` across all carts
    /// (within transaction)
    pub fn reserved_total_txn(
        &self,
        txn: &WriteTransaction,
        product_ref: &str,
        variant: Option<&Variant>,
    ) -> StorageResult<u32> {
        let key = stock_key(product_ref, variant);
        Ok(self
            .storage
            .get_ledger_entry_txn(txn, &key)?
            .map(|e| e.total())
            .unwrap_or(0))
    }

    /// Units reserved by carts other than `cart_ref` (within transaction)
    ///
    /// A cart's own reservation never counts against itself when re-checking
    /// stock for a quantity change.
    pub fn reserved_by_others_txn(
        &self,
        txn: &WriteTransaction,
        cart_ref: &str,
        product_ref: &str,
        variant: Option<&Variant>,
    ) -> StorageResult<u32> {
        let key = stock_key(product_ref, variant);
        Ok(self
            .storage
            .get_ledger_entry_txn(txn, &key)?
            .map(|e| {
                e.reservations
                    .iter()
                    .filter(|(c, _)| c.as_str() != cart_ref)
                    .map(|(_, q)| *q)
                    .sum()
            })
            .unwrap_or(0))
    }

    /// Units reserved by carts other than `cart_ref` (read-only)
    pub fn reserved_by_others(
        &self,
        cart_ref: &str,
        product_ref: &str,
        variant: Option<&Variant>,
    ) -> StorageResult<u32> {
        let key = stock_key(product_ref, variant);
        Ok(self
            .storage
            .get_ledger_entry(&key)?
            .map(|e| {
                e.reservations
                    .iter()
                    .filter(|(c, _)| c.as_str() != cart_ref)
                    .map(|(_, q)| *q)
                    .sum()
            })
            .unwrap_or(0))
    }

    /// Total units reserved on `(product_ref, variant)` (read-only)
    pub fn reserved_total(
        &self,
        product_ref: &str,
        variant: Option<&Variant>,
    ) -> StorageResult<u32> {
        let key = stock_key(product_ref, variant);
        Ok(self
            .storage
            .get_ledger_entry(&key)?
            .map(|e| e.total())
            .unwrap_or(0))
    }

    /// Drop reservations held by carts not in `live_cart_refs`, and any
    /// zero-sum entries (advisory sweep)
    pub fn sweep_orphans_txn(
        &self,
        txn: &WriteTransaction,
        live_cart_refs: &std::collections::HashSet<String>,
    ) -> StorageResult<usize> {
        let mut dropped = 0;
        for key in self.storage.ledger_keys_txn(txn)? {
            let Some(mut entry) = self.storage.get_ledger_entry_txn(txn, &key)? else {
                continue;
            };
            let before = entry.reservations.len();
            entry
                .reservations
                .retain(|cart_ref, _| live_cart_refs.contains(cart_ref));
            dropped += before - entry.reservations.len();
            if entry.reservations.is_empty() {
                self.storage.remove_ledger_entry(txn, &key)?;
            } else if entry.reservations.len() != before {
                entry.last_updated = now_millis();
                self.storage.store_ledger_entry(txn, &key, &entry)?;
            }
        }
        Ok(dropped)
    }

    #[cfg(test)]
    pub(crate) fn storage(&self) -> &CartStorage {
        &self.storage
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_service() -> ReservationService {
        ReservationService::new(CartStorage::open_in_memory().unwrap())
    }

    #[test]
    fn test_reserve_is_idempotent_replace() {
        let svc = create_service();

        let txn = svc.storage().begin_write().unwrap();
        svc.reserve_txn(&txn, "cart-a", "p1", None, 3).unwrap();
        svc.reserve_txn(&txn, "cart-a", "p1", None, 5).unwrap();
        txn.commit().unwrap();

        // Replaced, not accumulated
        assert_eq!(svc.reserved_total("p1", None).unwrap(), 5);
    }

    #[test]
    fn test_reservations_sum_across_carts() {
        let svc = create_service();

        let txn = svc.storage().begin_write().unwrap();
        svc.reserve_txn(&txn, "cart-a", "p1", None, 2).unwrap();
        svc.reserve_txn(&txn, "cart-b", "p1", None, 3).unwrap();
        txn.commit().unwrap();

        assert_eq!(svc.reserved_total("p1", None).unwrap(), 5);
        assert_eq!(svc.reserved_by_others("cart-a", "p1", None).unwrap(), 3);
        assert_eq!(svc.reserved_by_others("cart-c", "p1", None).unwrap(), 5);
    }

    #[test]
    fn test_release_missing_reservation_is_noop() {
        let svc = create_service();

        let txn = svc.storage().begin_write().unwrap();
        svc.release_txn(&txn, "cart-a", "p1", None).unwrap();
        txn.commit().unwrap();

        assert_eq!(svc.reserved_total("p1", None).unwrap(), 0);
    }

    #[test]
    fn test_zero_sum_entry_is_garbage_collected() {
        let svc = create_service();
        let key = stock_key("p1", None);

        let txn = svc.storage().begin_write().unwrap();
        svc.reserve_txn(&txn, "cart-a", "p1", None, 2).unwrap();
        svc.release_txn(&txn, "cart-a", "p1", None).unwrap();
        txn.commit().unwrap();

        assert!(svc.storage().get_ledger_entry(&key).unwrap().is_none());
    }

    #[test]
    fn test_release_all_spans_keys() {
        let svc = create_service();
        let variant = Variant::new("size", "XL");

        let txn = svc.storage().begin_write().unwrap();
        svc.reserve_txn(&txn, "cart-a", "p1", None, 1).unwrap();
        svc.reserve_txn(&txn, "cart-a", "p2", Some(&variant), 2).unwrap();
        svc.reserve_txn(&txn, "cart-b", "p1", None, 4).unwrap();
        txn.commit().unwrap();

        let txn = svc.storage().begin_write().unwrap();
        svc.release_all_txn(&txn, "cart-a").unwrap();
        txn.commit().unwrap();

        assert_eq!(svc.reserved_total("p1", None).unwrap(), 4);
        assert_eq!(svc.reserved_total("p2", Some(&variant)).unwrap(), 0);
    }

    #[test]
    fn test_sweep_drops_orphaned_reservations() {
        let svc = create_service();

        let txn = svc.storage().begin_write().unwrap();
        svc.reserve_txn(&txn, "cart-live", "p1", None, 1).unwrap();
        svc.reserve_txn(&txn, "cart-gone", "p1", None, 9).unwrap();
        txn.commit().unwrap();

        let live = std::collections::HashSet::from(["cart-live".to_string()]);
        let txn = svc.storage().begin_write().unwrap();
        let dropped = svc.sweep_orphans_txn(&txn, &live).unwrap();
        txn.commit().unwrap();

        assert_eq!(dropped, 1);
        assert_eq!(svc.reserved_total("p1", None).unwrap(), 1);
    }
}
