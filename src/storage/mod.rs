mod memory;
mod repository;

pub use memory::*;
pub use repository::*;

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::{LedgerEntry, WalletId};

/// SQL migration for the ledger table
pub const MIGRATION_001_INITIAL: &str = include_str!("migrations/001_initial.sql");

/// Append-only persistence for ledger entries.
///
/// This is everything the wallet service needs from storage. Implementations
/// hold no business rules of their own.
#[async_trait]
pub trait LedgerStore: Send + Sync {
    /// Most recently appended entry for `wallet`, or `None` for a fresh wallet.
    /// Reflects every append acknowledged before this call began.
    async fn get_last(&self, wallet: &WalletId) -> Result<Option<LedgerEntry>, StoreError>;

    /// Record `entry` as the new last entry of its wallet.
    /// Must fail with [`StoreError::Conflict`] if `entry.sequence` is not the next free position.
    async fn append(&self, entry: &LedgerEntry) -> Result<(), StoreError>;
}

/// Read-only access to full ledger history, used for export and integrity checks.
#[async_trait]
pub trait LedgerHistory: Send + Sync {
    /// All entries for `wallet`, in sequence order.
    async fn list_entries(&self, wallet: &WalletId) -> Result<Vec<LedgerEntry>, StoreError>;

    /// Every wallet that has at least one entry, sorted by id.
    async fn list_wallets(&self) -> Result<Vec<WalletId>, StoreError>;
}

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Ledger position {sequence} of wallet {wallet} is not the next free position")]
    Conflict { wallet: WalletId, sequence: i64 },

    #[error("Corrupt ledger row: {0}")]
    Corrupt(String),

    #[error("{0}")]
    Backend(String),
}
