//! SQL DDL for the account store.

/// SQLite schema:
/// - `account_number` is the primary key, so duplicate inserts fail at the database too
/// - `password` holds an encoded salted digest
/// - `balance` is a decimal string, never a float
pub const SQLITE_INIT: &str = r#"
CREATE TABLE IF NOT EXISTS accounts (
    account_number INTEGER PRIMARY KEY,
    first_name TEXT NOT NULL,
    last_name TEXT NOT NULL,
    ssn TEXT NOT NULL,
    address TEXT NOT NULL,
    phone TEXT NOT NULL,
    email TEXT NOT NULL,
    password TEXT NOT NULL,
    balance TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_accounts_ssn ON accounts(ssn);
"#;
