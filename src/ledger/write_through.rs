use std::{collections::HashMap, sync::Arc};

use rust_decimal::Decimal;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info};

use crate::{
    account::{Account, AccountEvent, AccountNumber},
    command::{MoneyAction, MoneyCommand},
    identity::Credential,
    store::{AccountRow, AccountStore, StoreError},
};

use super::LedgerError;

/// Accounts loaded from the store, each behind its own lock.
///
/// The store is the source of truth. An account is read from it the first
/// time it is touched and kept afterwards; every accepted change is written
/// to the store while the account lock is held and only then applied here.
/// This process is assumed to be the only writer of the rows it caches.
pub struct Ledger<S> {
    store: Arc<S>,
    accounts: RwLock<HashMap<AccountNumber, Arc<Mutex<Account>>>>,
}

impl<S> Ledger<S>
where
    S: AccountStore,
{
    pub fn new(store: Arc<S>) -> Self {
        Self {
            store,
            accounts: RwLock::default(),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Persists a freshly opened account and starts tracking it.
    pub async fn open(&self, account: Account) -> Result<AccountNumber, LedgerError> {
        let number = account.number();
        self.store.insert(&AccountRow::from(&account)).await?;
        // a task that already loaded the new row may have changed it since
        self.accounts
            .write()
            .await
            .entry(number)
            .or_insert_with(|| Arc::new(Mutex::new(account)));
        info!(account_number = number, "account opened");
        Ok(number)
    }

    pub async fn deposit(
        &self,
        account_number: AccountNumber,
        amount: Decimal,
    ) -> Result<AccountEvent, LedgerError> {
        self.execute(MoneyCommand {
            account_number,
            action: MoneyAction::Deposit,
            amount,
        })
        .await
    }

    pub async fn withdraw(
        &self,
        account_number: AccountNumber,
        amount: Decimal,
    ) -> Result<AccountEvent, LedgerError> {
        self.execute(MoneyCommand {
            account_number,
            action: MoneyAction::Withdraw,
            amount,
        })
        .await
    }

    /// Decide, persist, apply, all under the account's lock.
    pub async fn execute(&self, command: MoneyCommand) -> Result<AccountEvent, LedgerError> {
        let entry = self.entry(command.account_number).await?;
        let mut account = entry.lock().await;
        let evt = account.handle(command)?;
        // a failed write leaves the cached balance untouched
        self.store
            .update_balance(evt.account_number(), evt.balance())
            .await?;
        account.apply(&evt);
        debug!(
            account_number = evt.account_number(),
            amount = %evt.amount(),
            balance = %evt.balance(),
            kind = ?evt.kind(),
            "balance changed"
        );
        Ok(evt)
    }

    pub async fn balance(&self, account_number: AccountNumber) -> Result<Decimal, LedgerError> {
        let entry = self.entry(account_number).await?;
        let balance = entry.lock().await.balance();
        Ok(balance)
    }

    pub async fn change_credential(
        &self,
        account_number: AccountNumber,
        credential: Credential,
    ) -> Result<(), LedgerError> {
        let entry = self.entry(account_number).await?;
        let mut account = entry.lock().await;
        self.store
            .update_credential(account_number, &credential)
            .await?;
        account.depositor_mut().set_credential(credential);
        info!(account_number, "credential changed");
        Ok(())
    }

    async fn entry(
        &self,
        account_number: AccountNumber,
    ) -> Result<Arc<Mutex<Account>>, LedgerError> {
        if let Some(entry) = self.accounts.read().await.get(&account_number) {
            return Ok(Arc::clone(entry));
        }

        let row = self
            .store
            .fetch(account_number)
            .await?
            .ok_or(LedgerError::UnknownAccount(account_number))?;
        let account = Account::try_from(row).map_err(|e| StoreError::Corrupt {
            account_number: i64::from(account_number),
            reason: e.to_string(),
        })?;

        // another task may have loaded it while we were fetching; keep theirs
        let mut accounts = self.accounts.write().await;
        let entry = accounts
            .entry(account_number)
            .or_insert_with(|| Arc::new(Mutex::new(account)));
        Ok(Arc::clone(entry))
    }
}
