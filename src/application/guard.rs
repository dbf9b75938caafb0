use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

use crate::domain::WalletId;

/// Per-wallet mutual exclusion for read-decide-append sequences.
///
/// Each wallet gets its own async mutex, created on first use. Unrelated
/// wallets never wait on each other. Slots nobody holds or waits for are
/// dropped the next time any wallet is locked.
#[derive(Debug, Default)]
pub struct WalletLocks {
    slots: Mutex<HashMap<WalletId, Arc<AsyncMutex<()>>>>,
}

/// Held for the duration of one read-decide-append cycle. Releases on drop,
/// including when the owning future is cancelled.
#[derive(Debug)]
pub struct WalletGuard {
    _permit: OwnedMutexGuard<()>,
}

impl WalletLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait until no other cycle is in flight on `wallet`, then claim it.
    pub async fn lock(&self, wallet: &WalletId) -> WalletGuard {
        let slot = {
            let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
            // Only the map references an idle slot, and the map is locked here.
            slots.retain(|_, slot| Arc::strong_count(slot) > 1);
            Arc::clone(slots.entry(wallet.clone()).or_default())
        };

        WalletGuard {
            _permit: slot.lock_owned().await,
        }
    }

    /// Number of wallets with a held or awaited lock.
    #[cfg(test)]
    fn active(&self) -> usize {
        self.slots
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .filter(|slot| Arc::strong_count(slot) > 1)
            .count()
    }
}
