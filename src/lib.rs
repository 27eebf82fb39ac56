/// People and their login credentials.
pub mod identity;

/// All logic related to a single account's balance.
/// State is modified using events, which are created by handling commands
pub mod account;

/// Commands accepted by [`account`] and [`teller`], plus parsing of user input.
pub mod command;

/// Durable account rows: the [`store::AccountStore`] interface and its SQLite implementation.
pub mod store;

/// Accounts in use, each behind its own lock, written through to the store.
pub mod ledger;

/// Append-only transaction notes.
pub mod journal;

/// Credential check that opens a session.
pub mod gate;

/// Coordinates gate, ledger, store and journal for one session.
pub mod teller;

pub mod config;
pub mod error;

/// Console dialogue and CSV enrollment used by the binary.
/// It lives here rather than in the binary so integration tests can use it.
pub mod bin_utils;

pub use error::TellerError;
