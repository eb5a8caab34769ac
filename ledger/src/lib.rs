//! Transaction validation and chain state for SimChain.

pub mod controller;
pub mod validator;

pub use controller::{Ledger, LedgerError};
pub use validator::{validate_transaction, ValidationError};
