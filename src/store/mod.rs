//! Durable account records.
//!
//! Layout:
//! - `schema.rs`: SQL DDL for the `accounts` table
//! - `sqlite.rs`: [`AccountStore`] backed by a SQLite pool

use rust_decimal::Decimal;
use thiserror::Error;

use crate::{
    account::{Account, AccountNumber},
    identity::{Credential, CredentialError, Depositor, Name},
};

pub mod schema;
pub mod sqlite;

pub use schema::SQLITE_INIT;
pub use sqlite::{SqliteAccountStore, SqlitePool, StoreOptions};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Account #{0} already exists")]
    Conflict(AccountNumber),
    #[error("Account #{0} does not exist")]
    NotFound(AccountNumber),
    #[error("Stored row for account #{account_number} is corrupt: {reason}")]
    Corrupt {
        account_number: i64,
        reason: String,
    },
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl StoreError {
    /// Conflicts and missing rows are answers; everything else means the store could not answer.
    pub fn is_unavailable(&self) -> bool {
        matches!(self, Self::Database(_) | Self::Corrupt { .. })
    }
}

/// One row of the `accounts` table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountRow {
    pub account_number: AccountNumber,
    pub first_name: String,
    pub last_name: String,
    pub ssn: String,
    pub address: String,
    pub phone: String,
    pub email: String,
    /// Encoded [`Credential`], never the plain secret.
    pub password: String,
    pub balance: Decimal,
}

impl From<&Account> for AccountRow {
    fn from(account: &Account) -> Self {
        let depositor = account.depositor();
        Self {
            account_number: account.number(),
            first_name: depositor.name().first_name().to_owned(),
            last_name: depositor.name().last_name().to_owned(),
            ssn: depositor.ssn().to_owned(),
            address: depositor.address().to_owned(),
            phone: depositor.phone().to_owned(),
            email: depositor.email().to_owned(),
            password: depositor.credential().encode(),
            balance: account.balance(),
        }
    }
}

impl TryFrom<AccountRow> for Account {
    type Error = CredentialError;

    fn try_from(row: AccountRow) -> Result<Self, Self::Error> {
        let credential = Credential::decode(&row.password)?;
        let depositor = Depositor::new(
            Name::new(row.first_name, row.last_name),
            row.ssn,
            row.address,
            row.phone,
            row.email,
            credential,
        );
        Ok(Account::restore(row.account_number, depositor, row.balance))
    }
}

/// The system of record for accounts.
///
/// Implementations must bound every call in time and surface a timeout as
/// [`StoreError::Database`] rather than block.
pub trait AccountStore: Send + Sync {
    fn exists(
        &self,
        account_number: AccountNumber,
    ) -> impl Future<Output = Result<bool, StoreError>> + Send;

    /// Inserts a new row. Fails with [`StoreError::Conflict`] if the account number is taken;
    /// the existing row is left untouched.
    fn insert(&self, row: &AccountRow) -> impl Future<Output = Result<(), StoreError>> + Send;

    fn fetch(
        &self,
        account_number: AccountNumber,
    ) -> impl Future<Output = Result<Option<AccountRow>, StoreError>> + Send;

    /// First row owned by `ssn` whose credential accepts `secret`.
    fn find_credential(
        &self,
        ssn: &str,
        secret: &str,
    ) -> impl Future<Output = Result<Option<AccountRow>, StoreError>> + Send;

    fn update_balance(
        &self,
        account_number: AccountNumber,
        balance: Decimal,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    fn update_credential(
        &self,
        account_number: AccountNumber,
        credential: &Credential,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;
}
