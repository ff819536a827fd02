//! redb-based storage layer for carts and the stock ledger
//!
//! # Tables
//!
//! | Table | Key | Value | Purpose |
//! |-------|-----|-------|---------|
//! | `carts` | `user_ref` | `Cart` (JSON) | One cart per user |
//! | `stock_ledger` | stock key | `LedgerEntry` (JSON) | Per-(product, variant) reservations |
//!
//! The stock ledger is keyed by an encoded `(product_ref, variant)` string so
//! a whole key's per-cart reservation map lives in one row; mutating it inside
//! a write transaction is therefore atomic per key. redb serializes write
//! transactions, which also gives per-cart linearizability: two mutations of
//! the same cart can never interleave their read-modify-write cycles.
//!
//! # Durability
//!
//! redb commits with `Durability::Immediate` by default: once `commit()`
//! returns, the cart and ledger state survive power loss together.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use redb::{Database, ReadableDatabase, ReadableTable, TableDefinition, WriteTransaction};
use thiserror::Error;

use shared::cart::{Cart, Variant};

/// Table for carts: key = user_ref, value = JSON-serialized Cart
const CARTS_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("carts");

/// Table for the stock ledger: key = encoded (product_ref, variant),
/// value = JSON-serialized LedgerEntry
const LEDGER_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("stock_ledger");

/// Separator between product_ref and variant in ledger keys; control
/// character so it cannot collide with real refs
const STOCK_KEY_SEP: char = '\u{1}';

/// Encode a `(product_ref, variant)` pair as a single ledger key
pub fn stock_key(product_ref: &str, variant: Option<&Variant>) -> String {
    match variant {
        Some(v) => format!("{}{}{}", product_ref, STOCK_KEY_SEP, v.key()),
        None => product_ref.to_string(),
    }
}

/// One stock-ledger row: reservations per cart for a single
/// `(product_ref, variant)` key
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct LedgerEntry {
    /// cart (user) ref → reserved quantity
    pub reservations: HashMap<String, u32>,
    pub last_updated: i64,
}

impl LedgerEntry {
    /// Sum of reservations across all carts
    pub fn total(&self) -> u32 {
        self.reservations.values().sum()
    }
}

/// Storage errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(#[from] redb::DatabaseError),

    #[error("Transaction error: {0}")]
    Transaction(#[from] redb::TransactionError),

    #[error("Table error: {0}")]
    Table(#[from] redb::TableError),

    #[error("Storage error: {0}")]
    Storage(#[from] redb::StorageError),

    #[error("Commit error: {0}")]
    Commit(#[from] redb::CommitError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type StorageResult<T> = Result<T, StorageError>;

/// Cart and stock-ledger storage backed by redb
#[derive(Clone)]
pub struct CartStorage {
    db: Arc<Database>,
}

impl CartStorage {
    /// Open or create the database at the given path
    pub fn open(path: impl AsRef<Path>) -> StorageResult<Self> {
        let db = Database::create(path)?;
        Self::init(db)
    }

    /// Open an in-memory database (for testing)
    #[cfg(test)]
    pub fn open_in_memory() -> StorageResult<Self> {
        let db = Database::builder().create_with_backend(redb::backends::InMemoryBackend::new())?;
        Self::init(db)
    }

    fn init(db: Database) -> StorageResult<Self> {
        // Create tables if they don't exist
        let write_txn = db.begin_write()?;
        {
            let _ = write_txn.open_table(CARTS_TABLE)?;
            let _ = write_txn.open_table(LEDGER_TABLE)?;
        }
        write_txn.commit()?;

        Ok(Self { db: Arc::new(db) })
    }

    /// Begin a write transaction
    pub fn begin_write(&self) -> StorageResult<WriteTransaction> {
        Ok(self.db.begin_write()?)
    }

    // ========== Cart Operations ==========

    /// Get a cart by user ref (read-only)
    pub fn get_cart(&self, user_ref: &str) -> StorageResult<Option<Cart>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(CARTS_TABLE)?;

        match table.get(user_ref)? {
            Some(value) => {
                let cart: Cart = serde_json::from_slice(value.value())?;
                Ok(Some(cart))
            }
            None => Ok(None),
        }
    }

    /// Get a cart by user ref (within transaction)
    pub fn get_cart_txn(
        &self,
        txn: &WriteTransaction,
        user_ref: &str,
    ) -> StorageResult<Option<Cart>> {
        let table = txn.open_table(CARTS_TABLE)?;

        match table.get(user_ref)? {
            Some(value) => {
                let cart: Cart = serde_json::from_slice(value.value())?;
                Ok(Some(cart))
            }
            None => Ok(None),
        }
    }

    /// Store a cart
    pub fn store_cart(&self, txn: &WriteTransaction, cart: &Cart) -> StorageResult<()> {
        let mut table = txn.open_table(CARTS_TABLE)?;
        let value = serde_json::to_vec(cart)?;
        table.insert(cart.user_ref.as_str(), value.as_slice())?;
        Ok(())
    }

    /// Get all carts (used by the sweep)
    pub fn get_all_carts(&self) -> StorageResult<Vec<Cart>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(CARTS_TABLE)?;

        let mut carts = Vec::new();
        for result in table.iter()? {
            let (_key, value) = result?;
            let cart: Cart = serde_json::from_slice(value.value())?;
            carts.push(cart);
        }

        Ok(carts)
    }

    // ========== Stock Ledger Operations ==========

    /// Get a ledger entry (read-only)
    pub fn get_ledger_entry(&self, key: &str) -> StorageResult<Option<LedgerEntry>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(LEDGER_TABLE)?;

        match table.get(key)? {
            Some(value) => {
                let entry: LedgerEntry = serde_json::from_slice(value.value())?;
                Ok(Some(entry))
            }
            None => Ok(None),
        }
    }

    /// Get a ledger entry (within transaction)
    pub fn get_ledger_entry_txn(
        &self,
        txn: &WriteTransaction,
        key: &str,
    ) -> StorageResult<Option<LedgerEntry>> {
        let table = txn.open_table(LEDGER_TABLE)?;

        match table.get(key)? {
            Some(value) => {
                let entry: LedgerEntry = serde_json::from_slice(value.value())?;
                Ok(Some(entry))
            }
            None => Ok(None),
        }
    }

    /// Store a ledger entry
    pub fn store_ledger_entry(
        &self,
        txn: &WriteTransaction,
        key: &str,
        entry: &LedgerEntry,
    ) -> StorageResult<()> {
        let mut table = txn.open_table(LEDGER_TABLE)?;
        let value = serde_json::to_vec(entry)?;
        table.insert(key, value.as_slice())?;
        Ok(())
    }

    /// Remove a ledger entry (zero-sum garbage collection)
    pub fn remove_ledger_entry(&self, txn: &WriteTransaction, key: &str) -> StorageResult<()> {
        let mut table = txn.open_table(LEDGER_TABLE)?;
        table.remove(key)?;
        Ok(())
    }

    /// All ledger keys (within transaction; used by release-all and the sweep)
    pub fn ledger_keys_txn(&self, txn: &WriteTransaction) -> StorageResult<Vec<String>> {
        let table = txn.open_table(LEDGER_TABLE)?;

        let mut keys = Vec::new();
        for result in table.iter()? {
            let (key, _value) = result?;
            keys.push(key.value().to_string());
        }

        Ok(keys)
    }
}
