// Application layer: use cases over the ledger store.
// Business rules live in `domain`; this layer serializes them per wallet
// and reports failures.

pub mod error;
mod guard;
mod service;

pub use error::*;
pub use guard::*;
pub use service::*;
