use std::sync::Arc;

use rust_decimal::Decimal;
use tracing::{info, warn};

use crate::{
    account::{Account, AccountEvent, AccountEventKind, AccountNumber},
    command::{ChangeSecretCommand, MoneyAction, MoneyCommand, OpenAccountCommand, require},
    error::TellerError,
    gate::{Principal, SessionGate},
    identity::{Credential, Depositor, Name},
    journal::TransactionLog,
    ledger::Ledger,
    store::AccountStore,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    Unauthenticated,
    Authenticated(Principal),
    Terminated,
}

/// Runs one session: a single login, then any number of account commands until quit.
///
/// Business failures come back as [`TellerError`]s with
/// [`is_business`](TellerError::is_business) set and leave the session open.
pub struct Teller<S> {
    ledger: Ledger<S>,
    journal: TransactionLog,
    state: SessionState,
}

impl<S> Teller<S>
where
    S: AccountStore,
{
    pub fn new(store: Arc<S>, journal: TransactionLog) -> Self {
        Self {
            ledger: Ledger::new(store),
            journal,
            state: SessionState::Unauthenticated,
        }
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn ledger(&self) -> &Ledger<S> {
        &self.ledger
    }

    /// One attempt only: a failed login terminates the session.
    pub async fn login(&mut self, ssn: &str, secret: &str) -> Result<Principal, TellerError> {
        match self.state {
            SessionState::Unauthenticated => {}
            SessionState::Authenticated(_) => return Err(TellerError::AlreadyAuthenticated),
            SessionState::Terminated => return Err(TellerError::SessionClosed),
        }

        let gate = SessionGate::new(self.ledger.store());
        match gate.authenticate(ssn, secret).await {
            Ok(principal) => {
                self.state = SessionState::Authenticated(principal.clone());
                Ok(principal)
            }
            Err(e) => {
                self.state = SessionState::Terminated;
                Err(e.into())
            }
        }
    }

    pub fn quit(&mut self) {
        if self.state != SessionState::Terminated {
            info!("session terminated");
        }
        self.state = SessionState::Terminated;
    }

    fn session(&self) -> Result<&Principal, TellerError> {
        match &self.state {
            SessionState::Authenticated(principal) => Ok(principal),
            SessionState::Unauthenticated => Err(TellerError::NotAuthenticated),
            SessionState::Terminated => Err(TellerError::SessionClosed),
        }
    }

    pub async fn open_account(
        &self,
        command: OpenAccountCommand,
    ) -> Result<AccountNumber, TellerError> {
        self.session()?;
        self.enroll(command).await
    }

    /// Opens an account without a session. Used to seed an empty store.
    pub async fn enroll(&self, command: OpenAccountCommand) -> Result<AccountNumber, TellerError> {
        let ssn = require("SSN", &command.ssn)?;
        let secret = require("Password", &command.secret)?;
        let depositor = Depositor::new(
            Name::new(command.first_name.trim(), command.last_name.trim()),
            ssn,
            command.address.trim(),
            command.phone.trim(),
            command.email.trim(),
            Credential::derive(&secret),
        );
        let account = Account::open(command.account_number, depositor, command.opening_balance)?;
        let number = self.ledger.open(account).await?;
        self.note(format!("Created account #{number}")).await;
        Ok(number)
    }

    pub async fn deposit(
        &self,
        account_number: AccountNumber,
        amount: Decimal,
    ) -> Result<AccountEvent, TellerError> {
        self.move_money(MoneyCommand {
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
    ) -> Result<AccountEvent, TellerError> {
        self.move_money(MoneyCommand {
            account_number,
            action: MoneyAction::Withdraw,
            amount,
        })
        .await
    }

    pub async fn move_money(&self, command: MoneyCommand) -> Result<AccountEvent, TellerError> {
        self.session()?;
        let evt = self.ledger.execute(command).await?;
        let entry = match evt.kind() {
            AccountEventKind::Deposited => format!(
                "Deposited ${:.2} to account #{}, balance ${:.2}",
                evt.amount(),
                evt.account_number(),
                evt.balance()
            ),
            AccountEventKind::Withdrawn => format!(
                "Withdrew ${:.2} from account #{}, balance ${:.2}",
                evt.amount(),
                evt.account_number(),
                evt.balance()
            ),
        };
        self.note(entry).await;
        Ok(evt)
    }

    pub async fn balance(&self, account_number: AccountNumber) -> Result<Decimal, TellerError> {
        self.session()?;
        Ok(self.ledger.balance(account_number).await?)
    }

    pub async fn change_secret(&self, command: ChangeSecretCommand) -> Result<(), TellerError> {
        self.session()?;
        let secret = require("Password", &command.secret)?;
        self.ledger
            .change_credential(command.account_number, Credential::derive(&secret))
            .await?;
        self.note(format!(
            "Changed password for account #{}",
            command.account_number
        ))
        .await;
        Ok(())
    }

    // the log is best effort: a failed write is reported, the command still stands
    async fn note(&self, entry: String) {
        if let Err(e) = self.journal.append(&entry).await {
            warn!(error = %e, entry = %entry, "failed to write transaction log");
        }
    }
}
