use std::{fmt, str::FromStr};

use rust_decimal::Decimal;
use thiserror::Error;

use crate::account::AccountNumber;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoneyAction {
    Deposit,
    Withdraw,
}

impl fmt::Display for MoneyAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Deposit => f.write_str("Deposit"),
            Self::Withdraw => f.write_str("Withdraw"),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct MoneyCommand {
    pub account_number: AccountNumber,
    pub action: MoneyAction,
    pub amount: Decimal,
}

/// Everything needed to open an account, as entered by the user.
#[derive(Debug, Clone)]
pub struct OpenAccountCommand {
    pub account_number: AccountNumber,
    pub first_name: String,
    pub last_name: String,
    pub ssn: String,
    pub address: String,
    pub phone: String,
    pub email: String,
    pub secret: String,
    pub opening_balance: Decimal,
}

#[derive(Debug, Clone)]
pub struct ChangeSecretCommand {
    pub account_number: AccountNumber,
    pub secret: String,
}

/// Menu entries accepted once the session is authenticated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Selection {
    NewAccount,
    Deposit,
    Withdraw,
    Balance,
    ChangeSecret,
    Quit,
}

impl Selection {
    pub const ALL: [Self; 6] = [
        Self::NewAccount,
        Self::Deposit,
        Self::Withdraw,
        Self::Balance,
        Self::ChangeSecret,
        Self::Quit,
    ];

    pub fn key(self) -> char {
        match self {
            Self::NewAccount => 'N',
            Self::Deposit => 'D',
            Self::Withdraw => 'W',
            Self::Balance => 'B',
            Self::ChangeSecret => 'P',
            Self::Quit => 'Q',
        }
    }

    pub fn describe(self) -> &'static str {
        match self {
            Self::NewAccount => "Create a new account",
            Self::Deposit => "Deposit funds",
            Self::Withdraw => "Withdraw funds",
            Self::Balance => "Show account balance",
            Self::ChangeSecret => "Change account password",
            Self::Quit => "Quit",
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CommandError {
    #[error("Invalid selection `{0}`")]
    InvalidSelection(String),
    #[error("`{0}` is not a valid amount")]
    InvalidAmount(String),
    #[error("`{0}` is not a valid account number")]
    InvalidAccountNumber(String),
    #[error("{0} must not be empty")]
    MissingField(&'static str),
}

impl FromStr for Selection {
    type Err = CommandError;

    /// A single character, case-insensitive, surrounding whitespace ignored.
    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let trimmed = input.trim();
        let mut chars = trimmed.chars();
        let (Some(c), None) = (chars.next(), chars.next()) else {
            return Err(CommandError::InvalidSelection(trimmed.to_owned()));
        };
        let c = c.to_ascii_uppercase();
        Self::ALL
            .into_iter()
            .find(|selection| selection.key() == c)
            .ok_or_else(|| CommandError::InvalidSelection(trimmed.to_owned()))
    }
}

/// Parses a money amount. Sign and precision are checked by the account itself.
pub fn parse_amount(input: &str) -> Result<Decimal, CommandError> {
    let trimmed = input.trim();
    let trimmed = trimmed.strip_prefix('$').unwrap_or(trimmed);
    Decimal::from_str(trimmed).map_err(|_| CommandError::InvalidAmount(input.trim().to_owned()))
}

pub fn parse_account_number(input: &str) -> Result<AccountNumber, CommandError> {
    let trimmed = input.trim();
    trimmed
        .parse()
        .map_err(|_| CommandError::InvalidAccountNumber(trimmed.to_owned()))
}

/// Rejects blank values for fields that identify a depositor.
pub fn require(field: &'static str, value: &str) -> Result<String, CommandError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        Err(CommandError::MissingField(field))
    } else {
        Ok(trimmed.to_owned())
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case("N", Selection::NewAccount)]
    #[case("n", Selection::NewAccount)]
    #[case(" d \n", Selection::Deposit)]
    #[case("W", Selection::Withdraw)]
    #[case("b", Selection::Balance)]
    #[case("P", Selection::ChangeSecret)]
    #[case("q", Selection::Quit)]
    fn parse_selection(#[case] input: &str, #[case] expected: Selection) {
        assert_eq!(input.parse::<Selection>().unwrap(), expected);
    }

    #[rstest]
    #[case("")]
    #[case("X")]
    #[case("NN")]
    #[case("quit")]
    fn reject_selection(#[case] input: &str) {
        assert!(matches!(
            input.parse::<Selection>().unwrap_err(),
            CommandError::InvalidSelection(_)
        ));
    }

    #[test]
    fn parse_amounts() {
        assert_eq!(parse_amount(" 25.50 ").unwrap(), Decimal::new(2550, 2));
        assert_eq!(parse_amount("$10").unwrap(), Decimal::new(10, 0));
        // negative amounts parse, the account rejects them
        assert_eq!(parse_amount("-5.00").unwrap(), Decimal::new(-500, 2));
        assert_eq!(
            parse_amount("ten").unwrap_err(),
            CommandError::InvalidAmount("ten".to_owned())
        );
    }

    #[test]
    fn parse_account_numbers() {
        assert_eq!(parse_account_number("42\n").unwrap(), 42);
        assert_eq!(
            parse_account_number("-1").unwrap_err().to_string(),
            "`-1` is not a valid account number"
        );
    }

    #[test]
    fn require_non_blank() {
        assert_eq!(require("SSN", " 123 ").unwrap(), "123");
        assert_eq!(
            require("SSN", "  ").unwrap_err().to_string(),
            "SSN must not be empty"
        );
    }
}
