//! Wallet ledger collaborator
//!
//! External contract for the paid-lock fee flow. A debit or credit either
//! completes fully and returns the auditable transaction record, or fails
//! with no balance change. `InMemoryWallet` backs tests and single-process
//! embedding.

use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::Mutex;
use thiserror::Error;

use shared::util::now_millis;
use shared::wallet::{LedgerTransaction, TransactionKind};

#[derive(Debug, Error)]
pub enum WalletError {
    #[error("Insufficient funds: balance {balance}")]
    InsufficientFunds { balance: f64 },

    #[error("Wallet unavailable: {0}")]
    Unavailable(String),
}

/// Balance-changing wallet operations with audit records
#[async_trait]
pub trait WalletLedger: Send + Sync {
    /// Debit `amount`; fails without side effects when the balance is short
    async fn debit(
        &self,
        user_ref: &str,
        amount: f64,
        description: &str,
    ) -> Result<LedgerTransaction, WalletError>;

    /// Credit `amount` back to the user
    async fn credit(
        &self,
        user_ref: &str,
        amount: f64,
        description: &str,
    ) -> Result<LedgerTransaction, WalletError>;
}

/// In-memory wallet for tests and single-process embedding
#[derive(Default)]
pub struct InMemoryWallet {
    balances: Mutex<HashMap<String, f64>>,
    transactions: Mutex<Vec<LedgerTransaction>>,
}

impl InMemoryWallet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a balance (test helper)
    pub fn deposit(&self, user_ref: &str, amount: f64) {
        *self
            .balances
            .lock()
            .entry(user_ref.to_string())
            .or_insert(0.0) += amount;
    }

    pub fn balance(&self, user_ref: &str) -> f64 {
        self.balances.lock().get(user_ref).copied().unwrap_or(0.0)
    }

    pub fn transactions_for(&self, user_ref: &str) -> Vec<LedgerTransaction> {
        self.transactions
            .lock()
            .iter()
            .filter(|t| t.user_ref == user_ref)
            .cloned()
            .collect()
    }

    fn record(
        &self,
        user_ref: &str,
        kind: TransactionKind,
        amount: f64,
        balance_before: f64,
        balance_after: f64,
        description: &str,
    ) -> LedgerTransaction {
        let transaction = LedgerTransaction {
            reference: uuid::Uuid::new_v4().to_string(),
            user_ref: user_ref.to_string(),
            kind,
            amount,
            balance_before,
            balance_after,
            description: description.to_string(),
            created_at: now_millis(),
        };
        self.transactions.lock().push(transaction.clone());
        transaction
    }
}

#[async_trait]
impl WalletLedger for InMemoryWallet {
    async fn debit(
        &self,
        user_ref: &str,
        amount: f64,
        description: &str,
    ) -> Result<LedgerTransaction, WalletError> {
        let mut balances = self.balances.lock();
        let balance = balances.entry(user_ref.to_string()).or_insert(0.0);
        if *balance < amount {
            return Err(WalletError::InsufficientFunds { balance: *balance });
        }
        let before = *balance;
        *balance -= amount;
        let after = *balance;
        drop(balances);

        tracing::debug!(user = %user_ref, amount = amount, "Wallet debited");
        Ok(self.record(
            user_ref,
            TransactionKind::Debit,
            amount,
            before,
            after,
            description,
        ))
    }

    async fn credit(
        &self,
        user_ref: &str,
        amount: f64,
        description: &str,
    ) -> Result<LedgerTransaction, WalletError> {
        let mut balances = self.balances.lock();
        let balance = balances.entry(user_ref.to_string()).or_insert(0.0);
        let before = *balance;
        *balance += amount;
        let after = *balance;
        drop(balances);

        tracing::debug!(user = %user_ref, amount = amount, "Wallet credited");
        Ok(self.record(
            user_ref,
            TransactionKind::Credit,
            amount,
            before,
            after,
            description,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_debit_writes_audit_fields() {
        let wallet = InMemoryWallet::new();
        wallet.deposit("user-1", 500.0);

        let txn = wallet.debit("user-1", 100.0, "Lock fee").await.unwrap();
        assert_eq!(txn.balance_before, 500.0);
        assert_eq!(txn.balance_after, 400.0);
        assert_eq!(txn.kind, TransactionKind::Debit);
        assert_eq!(wallet.balance("user-1"), 400.0);
    }

    #[tokio::test]
    async fn test_insufficient_funds_leaves_balance_untouched() {
        let wallet = InMemoryWallet::new();
        wallet.deposit("user-1", 50.0);

        let err = wallet.debit("user-1", 100.0, "Lock fee").await.unwrap_err();
        assert!(matches!(err, WalletError::InsufficientFunds { balance } if balance == 50.0));
        assert_eq!(wallet.balance("user-1"), 50.0);
        assert!(wallet.transactions_for("user-1").is_empty());
    }

    #[tokio::test]
    async fn test_credit_after_debit_restores_balance() {
        let wallet = InMemoryWallet::new();
        wallet.deposit("user-1", 500.0);

        wallet.debit("user-1", 100.0, "Lock fee").await.unwrap();
        let refund = wallet
            .credit("user-1", 100.0, "Lock fee refund")
            .await
            .unwrap();

        assert_eq!(refund.balance_after, 500.0);
        assert_eq!(wallet.balance("user-1"), 500.0);
        assert_eq!(wallet.transactions_for("user-1").len(), 2);
    }
}
