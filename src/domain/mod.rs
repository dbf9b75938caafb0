mod entry;
mod ledger;
mod money;
mod wallet;

pub use entry::*;
pub use ledger::*;
pub use money::*;
pub use wallet::*;
