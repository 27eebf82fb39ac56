use thiserror::Error;

use crate::{
    account::{AccountError, AccountNumber},
    store::StoreError,
};

pub mod write_through;

pub use write_through::Ledger;

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error(transparent)]
    AccountErr(#[from] AccountError),
    #[error("Account #{0} not found")]
    UnknownAccount(AccountNumber),
    #[error(transparent)]
    StoreErr(#[from] StoreError),
}

impl LedgerError {
    /// Business outcomes the user can act on, as opposed to infrastructure faults.
    pub fn is_business(&self) -> bool {
        match self {
            Self::AccountErr(_) | Self::UnknownAccount(_) => true,
            Self::StoreErr(e) => !e.is_unavailable(),
        }
    }
}
