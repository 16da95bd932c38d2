//! Capped governance-grant ledger.
//!
//! A mutable set of owner accounts mints bounded grants of vote credits
//! to arbitrary accounts under a fixed global cap, and hands administrator
//! rights among themselves. See [`ledger::Ledger`] for the core state
//! machine and [`owners::OwnerSet`] for the authorization gate.

pub mod ledger;
pub mod owners;

pub use ledger::{AccountId, Amount, Ledger, LedgerError, LedgerEvent, LedgerSnapshot};
pub use owners::{OwnerError, OwnerSet};
