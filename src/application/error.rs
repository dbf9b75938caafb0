use thiserror::Error;

use crate::domain::{Amount, BalanceOverflow, OverdraftError, WalletId, format_amount};
use crate::storage::StoreError;

#[derive(Error, Debug)]
pub enum WalletError {
    #[error(
        "Insufficient balance in wallet {wallet}: balance {}, requested {}",
        display(.balance),
        display(.requested)
    )]
    InsufficientBalance {
        wallet: WalletId,
        balance: Amount,
        requested: Amount,
    },

    #[error(transparent)]
    BalanceOverflow(#[from] BalanceOverflow),

    /// Any failure reported by the ledger store, passed through untouched.
    #[error(transparent)]
    Store(#[from] StoreError),
}

fn display(amount: &Amount) -> String {
    format_amount(*amount)
}

impl WalletError {
    pub(crate) fn overdraft(wallet: WalletId, err: OverdraftError) -> Self {
        WalletError::InsufficientBalance {
            wallet,
            balance: err.balance,
            requested: err.requested,
        }
    }

    pub fn is_insufficient_balance(&self) -> bool {
        matches!(self, WalletError::InsufficientBalance { .. })
    }
}
