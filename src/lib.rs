pub mod application;
pub mod cli;
pub mod domain;
pub mod io;
pub mod observability;
pub mod storage;

pub use application::{LedgerService, WalletError, WalletService};
pub use domain::*;
pub use storage::{InMemoryStore, LedgerStore, SqliteStore, StoreError};
