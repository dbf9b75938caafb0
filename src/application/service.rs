use std::sync::Arc;

use tracing::{debug, info, instrument, warn};

use crate::domain::{
    Balance, Deposit, IntegrityReport, LedgerEntry, WalletId, Withdrawal, current_balance,
    WithdrawalError, format_amount, plan_deposit, plan_withdrawal, verify_chain,
};
use crate::storage::{LedgerHistory, LedgerStore, SqliteStore, StoreError};

use super::{WalletError, WalletLocks};

/// Application service owning the ledger store and the per-wallet locks.
/// This is the primary interface for any client (CLI, API, tests, etc.).
pub struct LedgerService<S = SqliteStore> {
    store: Arc<S>,
    locks: Arc<WalletLocks>,
}

/// Balance of one wallet, as listed across the whole ledger
pub struct BalanceEntry {
    pub wallet: WalletId,
    pub balance: Balance,
}

impl<S> Clone for LedgerService<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            locks: Arc::clone(&self.locks),
        }
    }
}

impl LedgerService<SqliteStore> {
    /// Initialize a new database at the given path.
    pub async fn init(database_path: &str) -> Result<Self, StoreError> {
        let db_url = format!("sqlite:{}?mode=rwc", database_path);
        let store = SqliteStore::init(&db_url).await?;
        Ok(Self::new(store))
    }

    /// Connect to an existing database.
    pub async fn connect(database_path: &str) -> Result<Self, StoreError> {
        let db_url = format!("sqlite:{}", database_path);
        let store = SqliteStore::connect(&db_url).await?;
        Ok(Self::new(store))
    }
}

impl<S> LedgerService<S> {
    /// Create a new ledger service with the given store.
    pub fn new(store: S) -> Self {
        Self::from_shared(Arc::new(store))
    }

    /// Create a ledger service over a store the caller keeps a handle to.
    pub fn from_shared(store: Arc<S>) -> Self {
        Self {
            store,
            locks: Arc::new(WalletLocks::new()),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Handle for operating on one wallet. Handles for the same wallet share its lock.
    pub fn wallet(&self, wallet: WalletId) -> WalletService<S> {
        WalletService {
            wallet,
            store: Arc::clone(&self.store),
            locks: Arc::clone(&self.locks),
        }
    }
}

impl<S: LedgerStore + LedgerHistory> LedgerService<S> {
    /// Current balance of every wallet that has entries.
    pub async fn list_balances(&self) -> Result<Vec<BalanceEntry>, WalletError> {
        let mut balances = Vec::new();
        for wallet in self.store.list_wallets().await? {
            let balance = self.wallet(wallet.clone()).get_balance().await?;
            balances.push(BalanceEntry { wallet, balance });
        }
        Ok(balances)
    }

    /// Verify the entry chain of every wallet.
    pub async fn check_integrity(&self) -> Result<Vec<IntegrityReport>, WalletError> {
        let mut reports = Vec::new();
        for wallet in self.store.list_wallets().await? {
            reports.push(self.wallet(wallet).check_integrity().await?);
        }
        Ok(reports)
    }
}

/// Balance, deposit and withdrawal for a single wallet.
///
/// Deposits and withdrawals run their read-decide-append cycle under the
/// wallet's lock, so two concurrent withdrawals can never both spend the
/// same funds. Balance reads take no lock.
pub struct WalletService<S = SqliteStore> {
    wallet: WalletId,
    store: Arc<S>,
    locks: Arc<WalletLocks>,
}

impl<S> Clone for WalletService<S> {
    fn clone(&self) -> Self {
        Self {
            wallet: self.wallet.clone(),
            store: Arc::clone(&self.store),
            locks: Arc::clone(&self.locks),
        }
    }
}

impl<S> WalletService<S> {
    pub fn id(&self) -> &WalletId {
        &self.wallet
    }
}

impl<S: LedgerStore> WalletService<S> {
    /// Current balance: the last entry's resulting balance, or zero for a fresh wallet.
    #[instrument(skip(self), fields(wallet = %self.wallet))]
    pub async fn get_balance(&self) -> Result<Balance, WalletError> {
        let last = self.store.get_last(&self.wallet).await?;
        let balance = current_balance(last.as_ref());
        debug!(balance = %balance.amount, "read balance");
        Ok(balance)
    }

    /// Add funds. A zero deposit is legal and still records an entry.
    #[instrument(skip(self), fields(wallet = %self.wallet, amount = %deposit.amount))]
    pub async fn deposit_funds(&self, deposit: Deposit) -> Result<Balance, WalletError> {
        debug_assert!(
            !deposit.amount.is_sign_negative() || deposit.amount.is_zero(),
            "deposit amount must not be negative"
        );

        let _guard = self.locks.lock(&self.wallet).await;

        let last = self.store.get_last(&self.wallet).await?;
        let entry = plan_deposit(self.wallet.clone(), last.as_ref(), deposit).map_err(|overflow| {
            warn!("rejected deposit: {}", overflow);
            overflow
        })?;
        self.record(&entry).await
    }

    /// Remove funds. Fails with [`WalletError::InsufficientBalance`] and records
    /// nothing when the amount exceeds the current balance.
    #[instrument(skip(self), fields(wallet = %self.wallet, amount = %withdrawal.amount))]
    pub async fn withdraw_funds(&self, withdrawal: Withdrawal) -> Result<Balance, WalletError> {
        debug_assert!(
            !withdrawal.amount.is_sign_negative() || withdrawal.amount.is_zero(),
            "withdrawal amount must not be negative"
        );

        let _guard = self.locks.lock(&self.wallet).await;

        let last = self.store.get_last(&self.wallet).await?;
        let entry = match plan_withdrawal(self.wallet.clone(), last.as_ref(), withdrawal) {
            Ok(entry) => entry,
            Err(WithdrawalError::Overflow(overflow)) => {
                warn!("rejected withdrawal: {}", overflow);
                return Err(overflow.into());
            }
            Err(WithdrawalError::Overdraft(overdraft)) => {
                warn!(
                    balance = %format_amount(overdraft.balance),
                    "rejected withdrawal: insufficient balance"
                );
                return Err(WalletError::overdraft(self.wallet.clone(), overdraft));
            }
        };
        self.record(&entry).await
    }

    async fn record(&self, entry: &LedgerEntry) -> Result<Balance, WalletError> {
        self.store.append(entry).await?;

        let balance = entry.balance_after();
        info!(
            sequence = entry.sequence,
            amount = %entry.amount,
            balance = %balance,
            "appended ledger entry"
        );
        Ok(Balance { amount: balance })
    }
}

impl<S: LedgerHistory> WalletService<S> {
    /// All entries of this wallet, oldest first.
    pub async fn entries(&self) -> Result<Vec<LedgerEntry>, WalletError> {
        Ok(self.store.list_entries(&self.wallet).await?)
    }

    /// Verify this wallet's chain of entries.
    pub async fn check_integrity(&self) -> Result<IntegrityReport, WalletError> {
        let entries = self.store.list_entries(&self.wallet).await?;
        let mut report = verify_chain(&entries);
        report.wallet = Some(self.wallet.clone());
        Ok(report)
    }
}
