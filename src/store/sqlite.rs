use std::{str::FromStr, time::Duration};

use rust_decimal::Decimal;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions, SqliteRow};
use sqlx::{Pool, Row, Sqlite};
use tracing::{debug, warn};

use crate::{
    account::AccountNumber,
    identity::Credential,
    store::{AccountRow, AccountStore, SQLITE_INIT, StoreError},
};

pub type SqlitePool = Pool<Sqlite>;

const SELECT_ROW: &str = r#"SELECT account_number, first_name, last_name, ssn, address,
    phone, email, password, balance FROM accounts"#;

/// Connection limits for [`SqliteAccountStore::connect`].
#[derive(Debug, Clone, Copy)]
pub struct StoreOptions {
    /// Upper bound on waiting for a pooled connection or a database lock.
    pub timeout: Duration,
    pub max_connections: u32,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(5),
            max_connections: 4,
        }
    }
}

#[derive(Clone)]
pub struct SqliteAccountStore {
    pool: SqlitePool,
}

impl SqliteAccountStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Opens (creating if needed) the database at `url` and prepares the schema.
    pub async fn connect(url: &str, options: StoreOptions) -> Result<Self, StoreError> {
        let connect = SqliteConnectOptions::from_str(url)?
            .create_if_missing(true)
            .busy_timeout(options.timeout);
        let pool = SqlitePoolOptions::new()
            .max_connections(options.max_connections)
            .acquire_timeout(options.timeout)
            .connect_with(connect)
            .await?;
        let store = Self::new(pool);
        store.init_schema().await?;
        Ok(store)
    }

    /// Private in-memory database on a single pinned connection.
    pub async fn in_memory() -> Result<Self, StoreError> {
        let connect = SqliteConnectOptions::from_str("sqlite::memory:")?;
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(Option::<Duration>::None)
            .max_lifetime(Option::<Duration>::None)
            .acquire_timeout(StoreOptions::default().timeout)
            .connect_with(connect)
            .await?;
        let store = Self::new(pool);
        store.init_schema().await?;
        Ok(store)
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Initialize the schema by executing the bundled DDL.
    pub async fn init_schema(&self) -> Result<(), StoreError> {
        // sqlx::query runs one statement at a time
        for stmt in SQLITE_INIT.split(';') {
            let s = stmt.trim();
            if s.is_empty() {
                continue;
            }
            sqlx::query(s).execute(&self.pool).await?;
        }
        Ok(())
    }

    fn row_to_model(row: SqliteRow) -> Result<AccountRow, StoreError> {
        let raw_number: i64 = row.try_get("account_number")?;
        let corrupt = |reason: String| StoreError::Corrupt {
            account_number: raw_number,
            reason,
        };
        let account_number =
            AccountNumber::try_from(raw_number).map_err(|e| corrupt(e.to_string()))?;
        let balance_str: String = row.try_get("balance")?;
        let balance = Decimal::from_str(&balance_str)
            .map_err(|e| corrupt(format!("balance `{balance_str}`: {e}")))?;

        Ok(AccountRow {
            account_number,
            first_name: row.try_get("first_name")?,
            last_name: row.try_get("last_name")?,
            ssn: row.try_get("ssn")?,
            address: row.try_get("address")?,
            phone: row.try_get("phone")?,
            email: row.try_get("email")?,
            password: row.try_get("password")?,
            balance,
        })
    }
}

impl AccountStore for SqliteAccountStore {
    async fn exists(&self, account_number: AccountNumber) -> Result<bool, StoreError> {
        let found: Option<(i64,)> =
            sqlx::query_as("SELECT account_number FROM accounts WHERE account_number = ?")
                .bind(i64::from(account_number))
                .fetch_optional(&self.pool)
                .await?;
        Ok(found.is_some())
    }

    async fn insert(&self, row: &AccountRow) -> Result<(), StoreError> {
        if self.exists(row.account_number).await? {
            return Err(StoreError::Conflict(row.account_number));
        }
        let result = sqlx::query(
            r#"
            INSERT INTO accounts (
                account_number, first_name, last_name, ssn, address,
                phone, email, password, balance
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(i64::from(row.account_number))
        .bind(&row.first_name)
        .bind(&row.last_name)
        .bind(&row.ssn)
        .bind(&row.address)
        .bind(&row.phone)
        .bind(&row.email)
        .bind(&row.password)
        .bind(row.balance.to_string())
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => {
                debug!(account_number = row.account_number, "account row inserted");
                Ok(())
            }
            // lost a race with another writer between the check and the insert
            Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
                Err(StoreError::Conflict(row.account_number))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn fetch(&self, account_number: AccountNumber) -> Result<Option<AccountRow>, StoreError> {
        let row = sqlx::query(&format!("{SELECT_ROW} WHERE account_number = ?"))
            .bind(i64::from(account_number))
            .fetch_optional(&self.pool)
            .await?;
        row.map(Self::row_to_model).transpose()
    }

    async fn find_credential(
        &self,
        ssn: &str,
        secret: &str,
    ) -> Result<Option<AccountRow>, StoreError> {
        let rows = sqlx::query(&format!(
            "{SELECT_ROW} WHERE ssn = ? ORDER BY account_number"
        ))
        .bind(ssn)
        .fetch_all(&self.pool)
        .await?;

        for row in rows {
            let row = Self::row_to_model(row)?;
            match Credential::decode(&row.password) {
                Ok(credential) if credential.verify(secret) => return Ok(Some(row)),
                Ok(_) => {}
                Err(e) => {
                    warn!(
                        account_number = row.account_number,
                        error = %e,
                        "skipping account with unreadable credential"
                    );
                }
            }
        }
        Ok(None)
    }

    async fn update_balance(
        &self,
        account_number: AccountNumber,
        balance: Decimal,
    ) -> Result<(), StoreError> {
        let done = sqlx::query("UPDATE accounts SET balance = ? WHERE account_number = ?")
            .bind(balance.to_string())
            .bind(i64::from(account_number))
            .execute(&self.pool)
            .await?;
        if done.rows_affected() == 0 {
            return Err(StoreError::NotFound(account_number));
        }
        Ok(())
    }

    async fn update_credential(
        &self,
        account_number: AccountNumber,
        credential: &Credential,
    ) -> Result<(), StoreError> {
        let done = sqlx::query("UPDATE accounts SET password = ? WHERE account_number = ?")
            .bind(credential.encode())
            .bind(i64::from(account_number))
            .execute(&self.pool)
            .await?;
        if done.rows_affected() == 0 {
            return Err(StoreError::NotFound(account_number));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::{str::FromStr, time::Instant};

    use super::*;

    fn row(account_number: AccountNumber, ssn: &str, secret: &str) -> AccountRow {
        AccountRow {
            account_number,
            first_name: "Alan".to_owned(),
            last_name: "Turing".to_owned(),
            ssn: ssn.to_owned(),
            address: "Bletchley Park".to_owned(),
            phone: "555-0111".to_owned(),
            email: "alan@example.com".to_owned(),
            password: Credential::derive(secret).encode(),
            balance: Decimal::from_str("100.00").unwrap(),
        }
    }

    #[tokio::test]
    async fn insert_and_fetch() {
        let store = SqliteAccountStore::in_memory().await.unwrap();
        assert!(!store.exists(1).await.unwrap());
        assert!(store.fetch(1).await.unwrap().is_none());

        let inserted = row(1, "999-00-1111", "enigma");
        store.insert(&inserted).await.unwrap();
        assert!(store.exists(1).await.unwrap());
        assert_eq!(store.fetch(1).await.unwrap(), Some(inserted));
    }

    #[tokio::test]
    async fn duplicate_insert_never_overwrites() {
        let store = SqliteAccountStore::in_memory().await.unwrap();
        let original = row(5, "999-00-1111", "enigma");
        store.insert(&original).await.unwrap();

        let mut imposter = row(5, "000-00-0000", "other");
        imposter.balance = Decimal::from_str("1000000").unwrap();
        let err = store.insert(&imposter).await.unwrap_err();
        assert!(matches!(err, StoreError::Conflict(5)));
        assert!(!err.is_unavailable());

        assert_eq!(store.fetch(5).await.unwrap(), Some(original));
    }

    #[tokio::test]
    async fn find_credential_checks_secret() {
        let store = SqliteAccountStore::in_memory().await.unwrap();
        store.insert(&row(1, "999-00-1111", "enigma")).await.unwrap();
        store.insert(&row(2, "999-00-1111", "bombe")).await.unwrap();

        let found = store.find_credential("999-00-1111", "bombe").await.unwrap();
        assert_eq!(found.map(|r| r.account_number), Some(2));
        assert!(
            store
                .find_credential("999-00-1111", "Enigma")
                .await
                .unwrap()
                .is_none()
        );
        assert!(
            store
                .find_credential("999-00-1112", "enigma")
                .await
                .unwrap()
                .is_none()
        );
    }

    #[tokio::test]
    async fn updates_require_existing_row() {
        let store = SqliteAccountStore::in_memory().await.unwrap();
        store.insert(&row(3, "1", "a")).await.unwrap();

        let balance = Decimal::from_str("85.50").unwrap();
        store.update_balance(3, balance).await.unwrap();
        assert_eq!(store.fetch(3).await.unwrap().unwrap().balance, balance);

        let credential = Credential::derive("b");
        store.update_credential(3, &credential).await.unwrap();
        assert!(store.find_credential("1", "b").await.unwrap().is_some());
        assert!(store.find_credential("1", "a").await.unwrap().is_none());

        assert!(matches!(
            store.update_balance(4, balance).await.unwrap_err(),
            StoreError::NotFound(4)
        ));
        assert!(matches!(
            store.update_credential(4, &credential).await.unwrap_err(),
            StoreError::NotFound(4)
        ));
    }

    #[tokio::test]
    async fn corrupt_balance_is_reported() {
        let store = SqliteAccountStore::in_memory().await.unwrap();
        store.insert(&row(8, "1", "a")).await.unwrap();
        sqlx::query("UPDATE accounts SET balance = 'lots' WHERE account_number = 8")
            .execute(store.pool())
            .await
            .unwrap();
        let err = store.fetch(8).await.unwrap_err();
        assert!(matches!(err, StoreError::Corrupt { account_number: 8, .. }));
        assert!(err.is_unavailable());
    }

    #[tokio::test]
    async fn closed_pool_is_unavailable() {
        let store = SqliteAccountStore::in_memory().await.unwrap();
        store.pool().close().await;
        let err = store.exists(1).await.unwrap_err();
        assert!(err.is_unavailable());
    }

    #[tokio::test]
    async fn busy_pool_times_out_instead_of_blocking() {
        let dir = tempfile::tempdir().unwrap();
        let url = format!("sqlite://{}", dir.path().join("bank.db").display());
        let timeout = Duration::from_millis(200);
        let store = SqliteAccountStore::connect(
            &url,
            StoreOptions {
                timeout,
                max_connections: 1,
            },
        )
        .await
        .unwrap();

        let held = store.pool().acquire().await.unwrap();
        let started = Instant::now();
        let err = store.exists(1).await.unwrap_err();
        let waited = started.elapsed();

        assert!(matches!(err, StoreError::Database(sqlx::Error::PoolTimedOut)));
        assert!(err.is_unavailable());
        assert!(waited < Duration::from_secs(2));

        drop(held);
        assert!(!store.exists(1).await.unwrap());
    }
}
