use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use async_trait::async_trait;

use crate::domain::{LedgerEntry, WalletId};

use super::{LedgerHistory, LedgerStore, StoreError};

/// In-memory ledger for tests, demos and embedding.
/// Readers share the lock; an append holds it only for the push itself.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    wallets: RwLock<HashMap<WalletId, Vec<LedgerEntry>>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of entries recorded for `wallet`.
    pub fn len(&self, wallet: &WalletId) -> usize {
        self.wallets
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(wallet)
            .map_or(0, Vec::len)
    }

    pub fn is_empty(&self, wallet: &WalletId) -> bool {
        self.len(wallet) == 0
    }
}

#[async_trait]
impl LedgerStore for InMemoryStore {
    async fn get_last(&self, wallet: &WalletId) -> Result<Option<LedgerEntry>, StoreError> {
        let wallets = self.wallets.read().unwrap_or_else(PoisonError::into_inner);
        Ok(wallets.get(wallet).and_then(|entries| entries.last().cloned()))
    }

    async fn append(&self, entry: &LedgerEntry) -> Result<(), StoreError> {
        let mut wallets = self.wallets.write().unwrap_or_else(PoisonError::into_inner);
        let entries = wallets.entry(entry.wallet.clone()).or_default();

        let next = entries.last().map_or(1, |last| last.sequence + 1);
        if entry.sequence != next {
            return Err(StoreError::Conflict {
                wallet: entry.wallet.clone(),
                sequence: entry.sequence,
            });
        }

        entries.push(entry.clone());
        Ok(())
    }
}

#[async_trait]
impl LedgerHistory for InMemoryStore {
    async fn list_entries(&self, wallet: &WalletId) -> Result<Vec<LedgerEntry>, StoreError> {
        let wallets = self.wallets.read().unwrap_or_else(PoisonError::into_inner);
        Ok(wallets.get(wallet).cloned().unwrap_or_default())
    }

    async fn list_wallets(&self) -> Result<Vec<WalletId>, StoreError> {
        let wallets = self.wallets.read().unwrap_or_else(PoisonError::into_inner);
        let mut ids: Vec<WalletId> = wallets
            .iter()
            .filter(|(_, entries)| !entries.is_empty())
            .map(|(id, _)| id.clone())
            .collect();
        ids.sort();
        Ok(ids)
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal_macros::dec;

    use super::*;
    use crate::domain::verify_chain;

    #[tokio::test]
    async fn test_empty_wallet_has_no_last_entry() {
        let store = InMemoryStore::new();
        assert_eq!(store.get_last(&WalletId::default()).await.unwrap(), None);
        assert!(store.is_empty(&WalletId::default()));
    }

    #[tokio::test]
    async fn test_append_then_get_last() {
        let store = InMemoryStore::new();
        let wallet = WalletId::default();

        let first = LedgerEntry::next(wallet.clone(), None, dec!(10)).unwrap();
        store.append(&first).await.unwrap();
        let second = LedgerEntry::next(wallet.clone(), Some(&first), dec!(5)).unwrap();
        store.append(&second).await.unwrap();

        assert_eq!(store.get_last(&wallet).await.unwrap(), Some(second));
        assert_eq!(store.len(&wallet), 2);
    }

    #[tokio::test]
    async fn test_append_rejects_taken_position() {
        let store = InMemoryStore::new();
        let wallet = WalletId::default();

        let first = LedgerEntry::next(wallet.clone(), None, dec!(10)).unwrap();
        let rival = LedgerEntry::next(wallet.clone(), None, dec!(20)).unwrap();
        store.append(&first).await.unwrap();

        let err = store.append(&rival).await.unwrap_err();
        assert!(matches!(err, StoreError::Conflict { sequence: 1, .. }));
        assert_eq!(store.len(&wallet), 1);
    }

    #[tokio::test]
    async fn test_append_rejects_skipped_position() {
        let store = InMemoryStore::new();
        let wallet = WalletId::default();

        let first = LedgerEntry::next(wallet.clone(), None, dec!(10)).unwrap();
        let gapped = LedgerEntry {
            sequence: 3,
            ..LedgerEntry::next(wallet.clone(), Some(&first), dec!(5)).unwrap()
        };
        store.append(&first).await.unwrap();

        let err = store.append(&gapped).await.unwrap_err();
        assert!(matches!(err, StoreError::Conflict { sequence: 3, .. }));
        assert!(verify_chain(&store.list_entries(&wallet).await.unwrap()).is_healthy());
    }

    #[tokio::test]
    async fn test_wallets_are_independent() {
        let store = InMemoryStore::new();
        let a = WalletId::new("a").unwrap();
        let b = WalletId::new("b").unwrap();

        store
            .append(&LedgerEntry::next(b.clone(), None, dec!(1)).unwrap())
            .await
            .unwrap();
        store
            .append(&LedgerEntry::next(a.clone(), None, dec!(2)).unwrap())
            .await
            .unwrap();

        assert_eq!(store.list_wallets().await.unwrap(), vec![a.clone(), b]);
        assert_eq!(store.list_entries(&a).await.unwrap().len(), 1);
    }
}
