use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{Amount, WalletId};

pub type EntryId = Uuid;

/// One immutable record in a wallet's ledger.
/// Entries are never updated or deleted; the balance always derives from the last one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub id: EntryId,
    /// Wallet this entry belongs to
    pub wallet: WalletId,
    /// Position in the wallet's ledger, starting at 1 with no gaps
    pub sequence: i64,
    /// Positive for deposits, negative for withdrawals
    pub amount: Amount,
    /// Wallet balance immediately before this entry
    pub balance_before: Amount,
    /// When the entry was recorded
    pub event_time: DateTime<Utc>,
}

impl LedgerEntry {
    /// Create the entry that follows `previous` in `wallet`'s ledger.
    ///
    /// Fails when the resulting balance does not fit in an [`Amount`].
    pub fn next(
        wallet: WalletId,
        previous: Option<&LedgerEntry>,
        amount: Amount,
    ) -> Result<Self, BalanceOverflow> {
        let (sequence, balance_before) = match previous {
            Some(last) => (last.sequence + 1, last.balance_after()),
            None => (1, Decimal::ZERO),
        };

        if balance_before.checked_add(amount).is_none() {
            return Err(BalanceOverflow {
                balance: balance_before,
                amount,
            });
        }

        Ok(Self {
            id: Uuid::new_v4(),
            wallet,
            sequence,
            amount,
            balance_before,
            event_time: Utc::now(),
        })
    }

    /// Balance after this entry is applied. Recomputed, never stored.
    ///
    /// Entries built by [`LedgerEntry::next`] always fit; anything else saturates.
    pub fn balance_after(&self) -> Amount {
        self.balance_before.saturating_add(self.amount)
    }

    pub fn is_withdrawal(&self) -> bool {
        self.amount.is_sign_negative() && !self.amount.is_zero()
    }
}

/// The balance an entry would produce is outside the representable range.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BalanceOverflow {
    pub balance: Amount,
    pub amount: Amount,
}

impl std::fmt::Display for BalanceOverflow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Applying {} to balance {} exceeds the largest representable balance",
            self.amount, self.balance
        )
    }
}

impl std::error::Error for BalanceOverflow {}

/// Current net value of a wallet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Balance {
    pub amount: Amount,
}

impl Balance {
    pub fn zero() -> Self {
        Self {
            amount: Decimal::ZERO,
        }
    }
}

/// A request to add funds. The amount is expected to be non-negative.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Deposit {
    pub amount: Amount,
}

/// A request to remove funds. The amount is expected to be non-negative.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Withdrawal {
    pub amount: Amount,
}

#[cfg(test)]
mod tests {
    use rust_decimal_macros::dec;

    use super::*;

    #[test]
    fn test_first_entry_starts_from_zero() {
        let entry = LedgerEntry::next(WalletId::default(), None, dec!(50)).unwrap();

        assert_eq!(entry.sequence, 1);
        assert_eq!(entry.balance_before, dec!(0));
        assert_eq!(entry.balance_after(), dec!(50));
        assert!(!entry.is_withdrawal());
    }

    #[test]
    fn test_next_entry_chains_from_previous() {
        let first = LedgerEntry::next(WalletId::default(), None, dec!(200)).unwrap();
        let second = LedgerEntry::next(WalletId::default(), Some(&first), dec!(-50)).unwrap();

        assert_eq!(second.sequence, 2);
        assert_eq!(second.balance_before, dec!(200));
        assert_eq!(second.balance_after(), dec!(150));
        assert!(second.is_withdrawal());
        assert_ne!(first.id, second.id);
    }

    #[test]
    fn test_balance_after_is_exact() {
        let entry = LedgerEntry {
            balance_before: dec!(0.015),
            ..LedgerEntry::next(WalletId::default(), None, dec!(0.005)).unwrap()
        };
        assert_eq!(entry.balance_after(), dec!(0.02));
    }

    #[test]
    fn test_zero_amount_is_not_a_withdrawal() {
        let entry = LedgerEntry::next(WalletId::default(), None, -dec!(0)).unwrap();
        assert!(!entry.is_withdrawal());
    }

    #[test]
    fn test_next_rejects_overflowing_balance() {
        let full = LedgerEntry::next(WalletId::default(), None, Decimal::MAX).unwrap();
        assert_eq!(full.balance_after(), Decimal::MAX);

        let err = LedgerEntry::next(WalletId::default(), Some(&full), Decimal::ONE).unwrap_err();
        assert_eq!(
            err,
            BalanceOverflow {
                balance: Decimal::MAX,
                amount: Decimal::ONE,
            }
        );
        assert!(err.to_string().contains("exceeds the largest representable balance"));

        let drained = LedgerEntry::next(WalletId::default(), Some(&full), -Decimal::MAX).unwrap();
        assert_eq!(drained.balance_after(), dec!(0));
    }

    #[test]
    fn test_balance_after_saturates_for_hand_built_entries() {
        let entry = LedgerEntry {
            balance_before: Decimal::MAX,
            ..LedgerEntry::next(WalletId::default(), None, Decimal::MAX).unwrap()
        };
        assert_eq!(entry.balance_after(), Decimal::MAX);
    }
}
