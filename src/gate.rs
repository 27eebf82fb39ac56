use thiserror::Error;
use tracing::{info, warn};

use crate::{
    account::AccountNumber,
    store::{AccountStore, StoreError},
};

#[derive(Debug, Error)]
pub enum GateError {
    #[error("Authentication failed")]
    Denied,
    #[error("Authentication unavailable, access denied: {0}")]
    Unavailable(#[source] StoreError),
}

/// Who got through the gate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub ssn: String,
    /// First account whose credential matched.
    pub account_number: AccountNumber,
}

/// Checks an SSN and secret against the stored credentials.
///
/// There is no token and no expiry: passing the gate once authenticates the
/// rest of the session. Any store failure denies access.
pub struct SessionGate<'s, S> {
    store: &'s S,
}

impl<'s, S> SessionGate<'s, S>
where
    S: AccountStore,
{
    pub fn new(store: &'s S) -> Self {
        Self { store }
    }

    pub async fn authenticate(&self, ssn: &str, secret: &str) -> Result<Principal, GateError> {
        match self.store.find_credential(ssn, secret).await {
            Ok(Some(row)) => {
                info!(account_number = row.account_number, "login succeeded");
                Ok(Principal {
                    ssn: row.ssn,
                    account_number: row.account_number,
                })
            }
            Ok(None) => {
                warn!("login rejected");
                Err(GateError::Denied)
            }
            Err(e) => {
                warn!(error = %e, "login rejected, account store unavailable");
                Err(GateError::Unavailable(e))
            }
        }
    }

    pub async fn is_authentic(&self, ssn: &str, secret: &str) -> bool {
        self.authenticate(ssn, secret).await.is_ok()
    }
}
