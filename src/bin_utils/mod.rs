//! Console front-end and bulk enrollment for [`crate::teller::Teller`].
//! Kept in the library so the integration tests can drive it with canned input.

use std::io::{BufRead, Read, Write};

use anyhow::Result;
use thiserror::Error;
use tracing::error;

use crate::{
    command::{
        ChangeSecretCommand, CommandError, MoneyAction, MoneyCommand, OpenAccountCommand,
        Selection, parse_account_number, parse_amount,
    },
    error::TellerError,
    gate::GateError,
    store::AccountStore,
    teller::Teller,
};
use csv_parser::CsvAccountParser;

pub mod csv_parser;

/// How an interactive session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEnd {
    Quit,
    Denied,
    StoreUnavailable,
}

pub struct Console<'w, R, W: 'w> {
    pub input: R,
    pub output: &'w mut W,
}

impl<'w, R, W> Console<'w, R, W>
where
    R: BufRead,
    W: Write + 'w,
{
    pub async fn run<S>(mut self, teller: &mut Teller<S>) -> Result<SessionEnd>
    where
        S: AccountStore,
    {
        writeln!(self.output, "\n=== Secure Login ===")?;
        let ssn = self.field("Enter SSN: ")?;
        let secret = self.field("Enter Password: ")?;

        match teller.login(&ssn, &secret).await {
            Ok(_) => writeln!(self.output, "Login successful!")?,
            Err(TellerError::Gate(GateError::Unavailable(_))) => {
                writeln!(self.output, "Account store unavailable. Exiting.")?;
                return Ok(SessionEnd::StoreUnavailable);
            }
            Err(_) => {
                writeln!(self.output, "Authentication failed. Exiting.")?;
                return Ok(SessionEnd::Denied);
            }
        }

        loop {
            self.print_menu()?;
            // end of input counts as quitting
            let Some(line) = self.prompt("Enter your selection: ")? else {
                break;
            };
            let selection = match line.parse::<Selection>() {
                Ok(Selection::Quit) => break,
                Ok(selection) => selection,
                Err(e) => {
                    writeln!(self.output, "{e}")?;
                    continue;
                }
            };
            let outcome = self.dispatch(teller, selection).await?;
            self.report(outcome)?;
        }

        teller.quit();
        writeln!(self.output, "Goodbye.")?;
        Ok(SessionEnd::Quit)
    }

    async fn dispatch<S>(
        &mut self,
        teller: &Teller<S>,
        selection: Selection,
    ) -> Result<Result<String, TellerError>>
    where
        S: AccountStore,
    {
        let outcome = match selection {
            Selection::NewAccount => match self.read_open_account()? {
                Ok(command) => teller
                    .open_account(command)
                    .await
                    .map(|n| format!("Account #{n} created successfully!")),
                Err(e) => Err(e.into()),
            },
            Selection::Deposit => match self.read_money(MoneyAction::Deposit)? {
                Ok(command) => teller.move_money(command).await.map(|evt| {
                    format!(
                        "Successfully deposited ${:.2} to account #{}",
                        evt.amount(),
                        evt.account_number()
                    )
                }),
                Err(e) => Err(e.into()),
            },
            Selection::Withdraw => match self.read_money(MoneyAction::Withdraw)? {
                Ok(command) => teller.move_money(command).await.map(|evt| {
                    format!(
                        "Successfully withdrew ${:.2} from account #{}",
                        evt.amount(),
                        evt.account_number()
                    )
                }),
                Err(e) => Err(e.into()),
            },
            Selection::Balance => {
                match parse_account_number(&self.field("Enter Account Number: ")?) {
                    Ok(n) => teller
                        .balance(n)
                        .await
                        .map(|balance| format!("Account balance: ${balance:.2}")),
                    Err(e) => Err(e.into()),
                }
            }
            Selection::ChangeSecret => match self.read_change_secret()? {
                Ok(command) => teller
                    .change_secret(command)
                    .await
                    .map(|()| "Password changed.".to_owned()),
                Err(e) => Err(e.into()),
            },
            Selection::Quit => unreachable!("quit ends the menu loop before dispatch"),
        };
        Ok(outcome)
    }

    fn report(&mut self, outcome: Result<String, TellerError>) -> Result<()> {
        match outcome {
            Ok(message) => writeln!(self.output, "{message}")?,
            Err(e) if e.is_business() => writeln!(self.output, "Error: {e}")?,
            Err(e) => {
                error!(error = %e, "command failed");
                writeln!(self.output, "Error: {e}")?;
            }
        }
        Ok(())
    }

    fn print_menu(&mut self) -> Result<()> {
        writeln!(self.output, "\n=== Bank Account Menu ===")?;
        for selection in Selection::ALL {
            writeln!(self.output, "{}) {}", selection.key(), selection.describe())?;
        }
        Ok(())
    }

    fn prompt(&mut self, label: &str) -> Result<Option<String>> {
        write!(self.output, "{label}")?;
        self.output.flush()?;
        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Ok(None);
        }
        Ok(Some(line.trim_end_matches(['\r', '\n']).to_owned()))
    }

    /// Like [`prompt`](Self::prompt), but a closed input reads as an empty answer.
    fn field(&mut self, label: &str) -> Result<String> {
        Ok(self.prompt(label)?.unwrap_or_default())
    }

    // every prompt is answered before anything is parsed, so a bad field
    // does not leave the remaining answers to be read as menu selections
    fn read_open_account(&mut self) -> Result<Result<OpenAccountCommand, CommandError>> {
        let first_name = self.field("Enter First Name: ")?;
        let last_name = self.field("Enter Last Name: ")?;
        let ssn = self.field("Enter SSN: ")?;
        let address = self.field("Enter Address: ")?;
        let phone = self.field("Enter Phone: ")?;
        let email = self.field("Enter Email: ")?;
        let secret = self.field("Set Password: ")?;
        let account_number = self.field("Enter New Account Number: ")?;
        let opening_balance = self.field("Enter Initial Balance: ")?;

        Ok(parse_account_number(&account_number).and_then(|account_number| {
            Ok(OpenAccountCommand {
                account_number,
                opening_balance: parse_amount(&opening_balance)?,
                first_name,
                last_name,
                ssn,
                address,
                phone,
                email,
                secret,
            })
        }))
    }

    fn read_money(&mut self, action: MoneyAction) -> Result<Result<MoneyCommand, CommandError>> {
        let account_number = self.field("Enter Account Number: ")?;
        let amount = match action {
            MoneyAction::Deposit => self.field("Enter Deposit Amount: ")?,
            MoneyAction::Withdraw => self.field("Enter Withdrawal Amount: ")?,
        };
        Ok(parse_account_number(&account_number).and_then(|account_number| {
            Ok(MoneyCommand {
                account_number,
                action,
                amount: parse_amount(&amount)?,
            })
        }))
    }

    fn read_change_secret(&mut self) -> Result<Result<ChangeSecretCommand, CommandError>> {
        let account_number = self.field("Enter Account Number: ")?;
        let secret = self.field("Set New Password: ")?;
        Ok(
            parse_account_number(&account_number).map(|account_number| ChangeSecretCommand {
                account_number,
                secret,
            }),
        )
    }
}

#[derive(Debug, Error)]
pub enum EnrollError {
    #[error("Malformed account record: {0}")]
    Parse(#[from] csv::Error),
    #[error(transparent)]
    Teller(#[from] TellerError),
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct EnrollSummary {
    pub enrolled: usize,
    pub skipped: usize,
}

/// Opens every account listed in a CSV file, without a login.
///
/// Bad rows and duplicates are handed to `error_printer` and skipped. A store
/// failure stops the run.
pub struct Enrollment<R> {
    pub input: R,
    pub error_printer: Box<dyn FnMut(u64, EnrollError)>,
}

impl<R> Enrollment<R>
where
    R: Read,
{
    pub async fn run<S>(mut self, teller: &Teller<S>) -> Result<EnrollSummary>
    where
        S: AccountStore,
    {
        let mut summary = EnrollSummary::default();
        for (line, row) in CsvAccountParser::new(self.input) {
            let record = match row {
                Ok(record) => record,
                Err(e) => {
                    (self.error_printer)(line, e.into());
                    summary.skipped += 1;
                    continue;
                }
            };
            match teller.enroll(record.into()).await {
                Ok(_) => summary.enrolled += 1,
                Err(e) if e.is_business() => {
                    (self.error_printer)(line, e.into());
                    summary.skipped += 1;
                }
                Err(e) => {
                    anyhow::bail!("Enrollment stopped at line {line}: {e}")
                }
            }
        }
        Ok(summary)
    }
}
