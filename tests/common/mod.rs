// Allow dead_code because these helpers are used across different test files
// which are compiled separately
#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use purse::application::{LedgerService, WalletService};
use purse::domain::{Amount, Deposit, LedgerEntry, WalletId};
use purse::storage::{InMemoryStore, LedgerStore, StoreError};
use tempfile::TempDir;

/// Helper to create a test service with a temporary database
pub async fn test_service() -> Result<(LedgerService, TempDir)> {
    let temp_dir = TempDir::new()?;
    let db_path = temp_dir.path().join("test.db");
    let service = LedgerService::init(db_path.to_str().unwrap()).await?;
    Ok((service, temp_dir))
}

/// Helper to create the default wallet on a fresh in-memory ledger
pub fn memory_wallet() -> WalletService<InMemoryStore> {
    LedgerService::new(InMemoryStore::new()).wallet(WalletId::default())
}

/// Fund a wallet with an initial deposit
pub async fn fund<S: LedgerStore>(wallet: &WalletService<S>, amount: Amount) -> Result<()> {
    wallet.deposit_funds(Deposit { amount }).await?;
    Ok(())
}

/// A last entry with the given amount and prior balance, as the store would return it.
pub fn entry_with(amount: Amount, balance_before: Amount) -> LedgerEntry {
    LedgerEntry {
        amount,
        balance_before,
        ..LedgerEntry::next(WalletId::default(), None, amount).unwrap()
    }
}

/// Store double with a fixed last entry that records every call and can fail on demand.
#[derive(Default)]
pub struct ScriptedStore {
    last: Option<LedgerEntry>,
    get_last_failure: Option<String>,
    append_failure: Option<String>,
    get_last_calls: AtomicUsize,
    appended: Mutex<Vec<LedgerEntry>>,
}

impl ScriptedStore {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn with_last(amount: Amount, balance_before: Amount) -> Self {
        Self {
            last: Some(entry_with(amount, balance_before)),
            ..Self::default()
        }
    }

    pub fn failing_get_last(mut self, message: &str) -> Self {
        self.get_last_failure = Some(message.to_string());
        self
    }

    pub fn failing_append(mut self, message: &str) -> Self {
        self.append_failure = Some(message.to_string());
        self
    }

    pub fn get_last_calls(&self) -> usize {
        self.get_last_calls.load(Ordering::SeqCst)
    }

    /// Every entry passed to `append`, including ones whose append failed.
    pub fn append_attempts(&self) -> Vec<LedgerEntry> {
        self.appended.lock().unwrap().clone()
    }
}

#[async_trait]
impl LedgerStore for ScriptedStore {
    async fn get_last(&self, _wallet: &WalletId) -> Result<Option<LedgerEntry>, StoreError> {
        self.get_last_calls.fetch_add(1, Ordering::SeqCst);
        match &self.get_last_failure {
            Some(message) => Err(StoreError::Backend(message.clone())),
            None => Ok(self.last.clone()),
        }
    }

    async fn append(&self, entry: &LedgerEntry) -> Result<(), StoreError> {
        self.appended.lock().unwrap().push(entry.clone());
        match &self.append_failure {
            Some(message) => Err(StoreError::Backend(message.clone())),
            None => Ok(()),
        }
    }
}

/// Wraps a store and pauses after every read, widening the window between
/// reading the last entry and appending the next one.
pub struct SlowReadStore<S> {
    inner: Arc<S>,
    delay: Duration,
    only: Option<WalletId>,
}

impl<S> SlowReadStore<S> {
    pub fn new(inner: Arc<S>, delay: Duration) -> Self {
        Self {
            inner,
            delay,
            only: None,
        }
    }

    /// Slow down reads of `wallet` only; other wallets read at full speed.
    pub fn only_for(mut self, wallet: WalletId) -> Self {
        self.only = Some(wallet);
        self
    }
}

#[async_trait]
impl<S: LedgerStore> LedgerStore for SlowReadStore<S> {
    async fn get_last(&self, wallet: &WalletId) -> Result<Option<LedgerEntry>, StoreError> {
        let last = self.inner.get_last(wallet).await?;
        if self.only.as_ref().is_none_or(|only| only == wallet) {
            tokio::time::sleep(self.delay).await;
        }
        Ok(last)
    }

    async fn append(&self, entry: &LedgerEntry) -> Result<(), StoreError> {
        self.inner.append(entry).await
    }
}
