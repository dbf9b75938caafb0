use rust_decimal::Decimal;
use serde::Serialize;

use super::{
    Amount, Balance, BalanceOverflow, Deposit, LedgerEntry, WalletId, Withdrawal, format_amount,
};

/// Compute the current balance from the most recent entry.
/// A wallet with no entries has a balance of zero.
pub fn current_balance(last: Option<&LedgerEntry>) -> Balance {
    match last {
        Some(entry) => Balance {
            amount: entry.balance_after(),
        },
        None => Balance::zero(),
    }
}

/// Build the entry recording a deposit on top of `last`.
pub fn plan_deposit(
    wallet: WalletId,
    last: Option<&LedgerEntry>,
    deposit: Deposit,
) -> Result<LedgerEntry, BalanceOverflow> {
    LedgerEntry::next(wallet, last, deposit.amount)
}

/// Build the entry recording a withdrawal on top of `last`.
/// Withdrawing exactly the current balance is allowed and leaves zero.
pub fn plan_withdrawal(
    wallet: WalletId,
    last: Option<&LedgerEntry>,
    withdrawal: Withdrawal,
) -> Result<LedgerEntry, WithdrawalError> {
    let balance = current_balance(last).amount;
    if withdrawal.amount > balance {
        return Err(WithdrawalError::Overdraft(OverdraftError {
            balance,
            requested: withdrawal.amount,
        }));
    }
    Ok(LedgerEntry::next(wallet, last, -withdrawal.amount)?)
}

/// Why a withdrawal could not be planned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WithdrawalError {
    Overdraft(OverdraftError),
    Overflow(BalanceOverflow),
}

impl From<BalanceOverflow> for WithdrawalError {
    fn from(err: BalanceOverflow) -> Self {
        WithdrawalError::Overflow(err)
    }
}

impl std::fmt::Display for WithdrawalError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WithdrawalError::Overdraft(err) => err.fmt(f),
            WithdrawalError::Overflow(err) => err.fmt(f),
        }
    }
}

impl std::error::Error for WithdrawalError {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OverdraftError {
    pub balance: Amount,
    pub requested: Amount,
}

impl std::fmt::Display for OverdraftError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Withdrawal of {} exceeds balance of {}",
            format_amount(self.requested),
            format_amount(self.balance)
        )
    }
}

impl std::error::Error for OverdraftError {}

/// Result of verifying one wallet's chain of entries.
#[derive(Debug, Clone, Serialize)]
pub struct IntegrityReport {
    pub wallet: Option<WalletId>,
    pub entry_count: usize,
    pub final_balance: Amount,
    pub issues: Vec<String>,
}

impl IntegrityReport {
    pub fn is_healthy(&self) -> bool {
        self.issues.is_empty()
    }
}

/// Verify a wallet's entries, given in sequence order.
///
/// A healthy chain numbers its entries 1..=n, starts from a zero balance,
/// links every `balance_before` to the previous `balance_after`, and never
/// records a negative resulting balance.
pub fn verify_chain(entries: &[LedgerEntry]) -> IntegrityReport {
    let mut issues = Vec::new();
    let mut expected_before = Decimal::ZERO;

    for (index, entry) in entries.iter().enumerate() {
        let expected_sequence = index as i64 + 1;
        if entry.sequence != expected_sequence {
            issues.push(format!(
                "entry {}: expected sequence {}, found {}",
                entry.id, expected_sequence, entry.sequence
            ));
        }

        if entry.balance_before != expected_before {
            issues.push(format!(
                "entry #{}: balance before is {}, previous balance after is {}",
                entry.sequence,
                format_amount(entry.balance_before),
                format_amount(expected_before)
            ));
        }

        let after = entry.balance_after();
        if after.is_sign_negative() && !after.is_zero() {
            issues.push(format!(
                "entry #{}: resulting balance {} is negative",
                entry.sequence,
                format_amount(after)
            ));
        }

        if let Some(first) = entries.first() {
            if entry.wallet != first.wallet {
                issues.push(format!(
                    "entry #{}: belongs to wallet {}, expected {}",
                    entry.sequence, entry.wallet, first.wallet
                ));
            }
        }

        expected_before = after;
    }

    IntegrityReport {
        wallet: entries.first().map(|e| e.wallet.clone()),
        entry_count: entries.len(),
        final_balance: current_balance(entries.last()).amount,
        issues,
    }
}
