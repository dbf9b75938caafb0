use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Name of the wallet used when none is given.
pub const DEFAULT_WALLET: &str = "main";

const MAX_WALLET_ID_LEN: usize = 64;

/// Identifies one wallet's ledger. Each wallet has its own independent
/// sequence of entries and its own concurrency guard.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct WalletId(String);

impl WalletId {
    pub fn new(id: impl Into<String>) -> Result<Self, WalletIdError> {
        let id = id.into();
        if id.is_empty() {
            return Err(WalletIdError::Empty);
        }
        if id.len() > MAX_WALLET_ID_LEN {
            return Err(WalletIdError::TooLong(id.len()));
        }
        if let Some(c) = id
            .chars()
            .find(|c| !(c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.')))
        {
            return Err(WalletIdError::InvalidCharacter(c));
        }
        Ok(Self(id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for WalletId {
    fn default() -> Self {
        Self(DEFAULT_WALLET.to_string())
    }
}

impl fmt::Display for WalletId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for WalletId {
    type Err = WalletIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for WalletId {
    type Error = WalletIdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<WalletId> for String {
    fn from(id: WalletId) -> Self {
        id.0
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WalletIdError {
    #[error("wallet id must not be empty")]
    Empty,

    #[error("wallet id is {0} characters long, at most {MAX_WALLET_ID_LEN} allowed")]
    TooLong(usize),

    #[error("wallet id contains invalid character '{0}'")]
    InvalidCharacter(char),
}
