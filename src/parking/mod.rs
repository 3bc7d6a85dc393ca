//! Parking-lot core: space registry generation, pricing arithmetic, and the
//! session ledger that coordinates space-status transitions with session
//! creation and completion.

pub mod ledger;
pub mod pricing;
pub mod registry;

pub use ledger::LedgerError;
