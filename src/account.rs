use rust_decimal::{Decimal, prelude::Zero};
use thiserror::Error;

use crate::{
    command::{MoneyAction, MoneyCommand},
    identity::Depositor,
};

pub type AccountNumber = u32;

/// Largest number of decimal places an amount may carry.
pub const AMOUNT_SCALE: u32 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccountEventKind {
    Deposited,
    Withdrawn,
}

/// An accepted balance change. Produced by [`Account::handle`], consumed by [`Account::apply`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccountEvent {
    account_number: AccountNumber,
    amount: Decimal,
    balance: Decimal,
    kind: AccountEventKind,
}

impl AccountEvent {
    pub fn account_number(&self) -> AccountNumber {
        self.account_number
    }

    pub fn amount(&self) -> Decimal {
        self.amount
    }

    /// Balance once the event is applied.
    pub fn balance(&self) -> Decimal {
        self.balance
    }

    pub fn kind(&self) -> AccountEventKind {
        self.kind
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AccountError {
    #[error("{action} amount must be greater than zero, got {amount}")]
    NonPositiveAmount { action: MoneyAction, amount: Decimal },
    #[error("{action} amount {amount} has more than two decimal places")]
    TooPrecise { action: MoneyAction, amount: Decimal },
    #[error("{action} amount {amount} would take the balance past the largest representable value")]
    AmountTooLarge { action: MoneyAction, amount: Decimal },
    #[error("Opening balance must not be negative, got {0}")]
    NegativeOpeningBalance(Decimal),
    #[error(
        "Insufficient funds for withdrawal of {requested} from account #{account_number} (balance {available})"
    )]
    InsufficientFunds {
        account_number: AccountNumber,
        requested: Decimal,
        available: Decimal,
    },
}

impl AccountError {
    /// True for the declined-withdrawal outcome, as opposed to malformed input.
    pub fn is_declined(&self) -> bool {
        matches!(self, Self::InsufficientFunds { .. })
    }
}

#[derive(Debug, Clone)]
pub struct Account {
    number: AccountNumber,
    depositor: Depositor,
    balance: Decimal,
}

impl Account {
    /// Opens a new account. The opening balance may be zero but not negative.
    pub fn open(
        number: AccountNumber,
        depositor: Depositor,
        opening_balance: Decimal,
    ) -> Result<Self, AccountError> {
        if opening_balance < Decimal::zero() {
            return Err(AccountError::NegativeOpeningBalance(opening_balance));
        }
        if opening_balance.normalize().scale() > AMOUNT_SCALE {
            return Err(AccountError::TooPrecise {
                action: MoneyAction::Deposit,
                amount: opening_balance,
            });
        }
        Ok(Self::restore(number, depositor, opening_balance))
    }

    /// Rebuilds an account from its stored row, trusting the stored balance.
    pub fn restore(number: AccountNumber, depositor: Depositor, balance: Decimal) -> Self {
        Self {
            number,
            depositor,
            balance,
        }
    }

    pub fn number(&self) -> AccountNumber {
        self.number
    }

    pub fn depositor(&self) -> &Depositor {
        &self.depositor
    }

    pub fn depositor_mut(&mut self) -> &mut Depositor {
        &mut self.depositor
    }

    pub fn balance(&self) -> Decimal {
        self.balance
    }

    pub fn apply(&mut self, event: &AccountEvent) {
        self.balance = event.balance;
    }

    /// Decides whether `command` is acceptable against the current balance.
    /// Never mutates; the returned event must be [`applied`](Self::apply).
    pub fn handle(&self, command: MoneyCommand) -> Result<AccountEvent, AccountError> {
        let MoneyCommand { action, amount, .. } = command;
        if amount <= Decimal::zero() {
            return Err(AccountError::NonPositiveAmount { action, amount });
        }
        if amount.normalize().scale() > AMOUNT_SCALE {
            return Err(AccountError::TooPrecise { action, amount });
        }

        match action {
            MoneyAction::Deposit => match self.balance.checked_add(amount) {
                Some(balance) => Ok(AccountEvent {
                    account_number: self.number,
                    amount,
                    balance,
                    kind: AccountEventKind::Deposited,
                }),
                None => Err(AccountError::AmountTooLarge { action, amount }),
            },
            MoneyAction::Withdraw => {
                if amount <= self.balance {
                    Ok(AccountEvent {
                        account_number: self.number,
                        amount,
                        balance: self.balance - amount,
                        kind: AccountEventKind::Withdrawn,
                    })
                } else {
                    Err(AccountError::InsufficientFunds {
                        account_number: self.number,
                        requested: amount,
                        available: self.balance,
                    })
                }
            }
        }
    }
}
