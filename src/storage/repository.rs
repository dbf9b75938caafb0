use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions, SqliteRow};
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use crate::domain::{LedgerEntry, WalletId};

use super::{LedgerHistory, LedgerStore, MIGRATION_001_INITIAL, StoreError};

/// SQLite-backed ledger store.
#[derive(Debug, Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Create a new store with the given SQLite connection pool.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Connect to a SQLite database URL.
    pub async fn connect(database_url: &str) -> Result<Self, StoreError> {
        let options = SqliteConnectOptions::from_str(database_url)?
            .busy_timeout(std::time::Duration::from_secs(5));
        let pool = SqlitePoolOptions::new().connect_with(options).await?;
        Ok(Self::new(pool))
    }

    /// Run database migrations.
    pub async fn migrate(&self) -> Result<(), StoreError> {
        sqlx::query(MIGRATION_001_INITIAL)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Initialize a new database (connect + migrate).
    pub async fn init(database_url: &str) -> Result<Self, StoreError> {
        let store = Self::connect(database_url).await?;
        store.migrate().await?;
        Ok(store)
    }

    fn row_to_entry(row: &SqliteRow) -> Result<LedgerEntry, StoreError> {
        let id_str: String = row.try_get("id")?;
        let wallet_str: String = row.try_get("wallet_id")?;
        let amount_str: String = row.try_get("amount")?;
        let balance_before_str: String = row.try_get("balance_before")?;
        let event_time_str: String = row.try_get("event_time")?;

        let entry = LedgerEntry {
            id: Uuid::parse_str(&id_str)
                .map_err(|e| StoreError::Corrupt(format!("invalid entry id '{id_str}': {e}")))?,
            wallet: WalletId::new(wallet_str.as_str())
                .map_err(|e| StoreError::Corrupt(format!("invalid wallet id '{wallet_str}': {e}")))?,
            sequence: row.try_get("sequence")?,
            amount: parse_decimal(&amount_str, "amount")?,
            balance_before: parse_decimal(&balance_before_str, "balance_before")?,
            event_time: DateTime::parse_from_rfc3339(&event_time_str)
                .map_err(|e| {
                    StoreError::Corrupt(format!("invalid event_time '{event_time_str}': {e}"))
                })?
                .with_timezone(&Utc),
        };

        if entry.balance_before.checked_add(entry.amount).is_none() {
            return Err(StoreError::Corrupt(format!(
                "entry #{} of wallet {}: balance out of range",
                entry.sequence, entry.wallet
            )));
        }
        Ok(entry)
    }
}

fn parse_decimal(value: &str, column: &str) -> Result<Decimal, StoreError> {
    Decimal::from_str(value)
        .map_err(|e| StoreError::Corrupt(format!("invalid {column} '{value}': {e}")))
}

#[async_trait]
impl LedgerStore for SqliteStore {
    async fn get_last(&self, wallet: &WalletId) -> Result<Option<LedgerEntry>, StoreError> {
        let row = sqlx::query(
            r#"
            SELECT id, wallet_id, sequence, amount, balance_before, event_time
            FROM ledger_entries
            WHERE wallet_id = ?
            ORDER BY sequence DESC
            LIMIT 1
            "#,
        )
        .bind(wallet.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(Self::row_to_entry).transpose()
    }

    async fn append(&self, entry: &LedgerEntry) -> Result<(), StoreError> {
        // The primary key on (wallet_id, sequence) turns a lost race into a
        // unique violation; the WHERE clause rejects skipped positions.
        let result = sqlx::query(
            r#"
            INSERT INTO ledger_entries (id, wallet_id, sequence, amount, balance_before, event_time)
            SELECT ?, ?, ?, ?, ?, ?
            WHERE ? = (SELECT COALESCE(MAX(sequence), 0) + 1 FROM ledger_entries WHERE wallet_id = ?)
            "#,
        )
        .bind(entry.id.to_string())
        .bind(entry.wallet.as_str())
        .bind(entry.sequence)
        .bind(entry.amount.to_string())
        .bind(entry.balance_before.to_string())
        .bind(entry.event_time.to_rfc3339())
        .bind(entry.sequence)
        .bind(entry.wallet.as_str())
        .execute(&self.pool)
        .await;

        let conflict = || StoreError::Conflict {
            wallet: entry.wallet.clone(),
            sequence: entry.sequence,
        };

        match result {
            Ok(done) if done.rows_affected() == 1 => Ok(()),
            Ok(_) => Err(conflict()),
            Err(sqlx::Error::Database(db)) if db.is_unique_violation() => Err(conflict()),
            Err(e) => Err(e.into()),
        }
    }
}

#[async_trait]
impl LedgerHistory for SqliteStore {
    async fn list_entries(&self, wallet: &WalletId) -> Result<Vec<LedgerEntry>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT id, wallet_id, sequence, amount, balance_before, event_time
            FROM ledger_entries
            WHERE wallet_id = ?
            ORDER BY sequence
            "#,
        )
        .bind(wallet.as_str())
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(Self::row_to_entry).collect()
    }

    async fn list_wallets(&self) -> Result<Vec<WalletId>, StoreError> {
        let rows = sqlx::query("SELECT DISTINCT wallet_id FROM ledger_entries ORDER BY wallet_id")
            .fetch_all(&self.pool)
            .await?;

        rows.iter()
            .map(|row| {
                let id: String = row.try_get("wallet_id")?;
                WalletId::new(id.as_str())
                    .map_err(|e| StoreError::Corrupt(format!("invalid wallet id '{id}': {e}")))
            })
            .collect()
    }
}
