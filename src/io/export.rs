use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::io::Write;

use crate::application::LedgerService;
use crate::domain::{Amount, LedgerEntry, WalletId};
use crate::storage::{LedgerHistory, LedgerStore};

/// Ledger snapshot for JSON export
#[derive(Debug, Clone, Serialize)]
pub struct LedgerSnapshot {
    pub version: String,
    pub exported_at: DateTime<Utc>,
    pub wallets: Vec<WalletSnapshot>,
}

#[derive(Debug, Clone, Serialize)]
pub struct WalletSnapshot {
    pub wallet: WalletId,
    pub balance: Amount,
    pub entries: Vec<LedgerEntry>,
}

/// Current balances for JSON export, without entries
#[derive(Debug, Clone, Serialize)]
pub struct BalancesSnapshot {
    pub version: String,
    pub exported_at: DateTime<Utc>,
    pub balances: Vec<WalletBalance>,
}

#[derive(Debug, Clone, Serialize)]
pub struct WalletBalance {
    pub wallet: WalletId,
    pub balance: Amount,
}

/// Exporter for converting ledger data to various formats
pub struct Exporter<'a, S> {
    service: &'a LedgerService<S>,
}

impl<'a, S: LedgerStore + LedgerHistory> Exporter<'a, S> {
    pub fn new(service: &'a LedgerService<S>) -> Self {
        Self { service }
    }

    /// Export entries of one wallet, or of every wallet, to CSV
    pub async fn export_entries_csv<W: Write>(
        &self,
        wallet: Option<&WalletId>,
        writer: W,
    ) -> Result<usize> {
        let mut csv_writer = csv::Writer::from_writer(writer);

        csv_writer.write_record([
            "id",
            "wallet",
            "sequence",
            "event_time",
            "amount",
            "balance_before",
            "balance_after",
        ])?;

        let mut count = 0;
        for wallet in self.wallets(wallet).await? {
            for entry in self.service.wallet(wallet).entries().await? {
                csv_writer.write_record([
                    entry.id.to_string(),
                    entry.wallet.to_string(),
                    entry.sequence.to_string(),
                    entry.event_time.to_rfc3339(),
                    entry.amount.to_string(),
                    entry.balance_before.to_string(),
                    entry.balance_after().to_string(),
                ])?;
                count += 1;
            }
        }

        csv_writer.flush()?;
        Ok(count)
    }

    /// Export current balances to CSV
    pub async fn export_balances_csv<W: Write>(
        &self,
        wallet: Option<&WalletId>,
        writer: W,
    ) -> Result<usize> {
        let mut csv_writer = csv::Writer::from_writer(writer);
        csv_writer.write_record(["wallet", "balance"])?;

        let mut count = 0;
        for wallet in self.wallets(wallet).await? {
            let balance = self.service.wallet(wallet.clone()).get_balance().await?;
            csv_writer.write_record([wallet.to_string(), balance.amount.to_string()])?;
            count += 1;
        }

        csv_writer.flush()?;
        Ok(count)
    }

    /// Export wallets with their balances and entries as a JSON snapshot
    pub async fn export_json<W: Write>(
        &self,
        wallet: Option<&WalletId>,
        mut writer: W,
    ) -> Result<LedgerSnapshot> {
        let mut wallets = Vec::new();
        for wallet in self.wallets(wallet).await? {
            let service = self.service.wallet(wallet.clone());
            let entries = service.entries().await?;
            let balance = service.get_balance().await?.amount;
            wallets.push(WalletSnapshot {
                wallet,
                balance,
                entries,
            });
        }

        let snapshot = LedgerSnapshot {
            version: env!("CARGO_PKG_VERSION").to_string(),
            exported_at: Utc::now(),
            wallets,
        };

        let json = serde_json::to_string_pretty(&snapshot)?;
        writer.write_all(json.as_bytes())?;
        writer.flush()?;

        Ok(snapshot)
    }

    /// Export current balances only as JSON
    pub async fn export_balances_json<W: Write>(
        &self,
        wallet: Option<&WalletId>,
        mut writer: W,
    ) -> Result<BalancesSnapshot> {
        let mut balances = Vec::new();
        for wallet in self.wallets(wallet).await? {
            let balance = self.service.wallet(wallet.clone()).get_balance().await?.amount;
            balances.push(WalletBalance { wallet, balance });
        }

        let snapshot = BalancesSnapshot {
            version: env!("CARGO_PKG_VERSION").to_string(),
            exported_at: Utc::now(),
            balances,
        };

        let json = serde_json::to_string_pretty(&snapshot)?;
        writer.write_all(json.as_bytes())?;
        writer.flush()?;

        Ok(snapshot)
    }

    async fn wallets(&self, wallet: Option<&WalletId>) -> Result<Vec<WalletId>> {
        Ok(match wallet {
            Some(wallet) => vec![wallet.clone()],
            None => self.service.store().list_wallets().await?,
        })
    }
}
