pub mod classifier;
pub mod ledger;
pub mod types;

pub use ledger::DepositLedger;
pub use types::{CustomerType, Deposit};
