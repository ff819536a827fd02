//! Wallet ledger transaction records
//!
//! Every balance-changing wallet operation produces an auditable record with
//! before/after balances. The `reference` is unique per transaction and is
//! what a paid lock stores for idempotent refund matching.

use serde::{Deserialize, Serialize};

/// Direction of a ledger transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionKind {
    Debit,
    Credit,
}

/// Auditable record of a balance-changing operation
///
/// Invariant: `balance_after = balance_before - amount` for debits and
/// `balance_before + amount` for credits, always.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerTransaction {
    /// Unique transaction reference
    pub reference: String,
    pub user_ref: String,
    pub kind: TransactionKind,
    pub amount: f64,
    pub balance_before: f64,
    pub balance_after: f64,
    pub description: String,
    pub created_at: i64,
}
