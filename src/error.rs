use thiserror::Error;

use crate::{
    account::AccountError, command::CommandError, gate::GateError, ledger::LedgerError,
};

#[derive(Debug, Error)]
pub enum TellerError {
    #[error("Please log in first")]
    NotAuthenticated,
    #[error("Session is closed")]
    SessionClosed,
    #[error("Already logged in")]
    AlreadyAuthenticated,
    #[error(transparent)]
    Command(#[from] CommandError),
    #[error(transparent)]
    Account(#[from] AccountError),
    #[error(transparent)]
    Ledger(#[from] LedgerError),
    #[error(transparent)]
    Gate(#[from] GateError),
}

impl TellerError {
    /// Bad input, declined withdrawals, duplicates and unknown accounts.
    /// These are reported to the user and the session carries on.
    pub fn is_business(&self) -> bool {
        match self {
            Self::Command(_) | Self::Account(_) => true,
            Self::Ledger(e) => e.is_business(),
            Self::NotAuthenticated
            | Self::SessionClosed
            | Self::AlreadyAuthenticated
            | Self::Gate(_) => false,
        }
    }
}
