use std::io::Read;

use csv::{DeserializeRecordsIntoIter, Trim};
use rust_decimal::Decimal;
use serde::Deserialize;

use crate::{account::AccountNumber, command::OpenAccountCommand};

#[derive(Debug, Deserialize)]
pub struct AccountRecord {
    pub account_number: AccountNumber,
    pub first_name: String,
    pub last_name: String,
    pub ssn: String,
    pub address: String,
    pub phone: String,
    pub email: String,
    pub password: String,
    pub balance: Decimal,
}

impl From<AccountRecord> for OpenAccountCommand {
    fn from(record: AccountRecord) -> Self {
        Self {
            account_number: record.account_number,
            first_name: record.first_name,
            last_name: record.last_name,
            ssn: record.ssn,
            address: record.address,
            phone: record.phone,
            email: record.email,
            secret: record.password,
            opening_balance: record.balance,
        }
    }
}

/// Parses account records in CSV format, yielding each with its line number.
///
/// An unreadable header row is yielded once, as line 1, and ends the input.
pub struct CsvAccountParser<R> {
    header_error: Option<csv::Error>,
    iter: Option<DeserializeRecordsIntoIter<R, AccountRecord>>,
}

impl<R> CsvAccountParser<R>
where
    R: Read,
{
    pub fn new(source: R) -> Self {
        let mut reader = csv::ReaderBuilder::new()
            .trim(Trim::All)
            .from_reader(source);
        // consume the header line now, so reported positions point at data lines
        let header_error = reader.headers().err();
        let iter = match header_error {
            Some(_) => None,
            None => Some(reader.into_deserialize()),
        };

        Self { header_error, iter }
    }
}

impl<R> Iterator for CsvAccountParser<R>
where
    R: Read,
{
    type Item = (u64, Result<AccountRecord, csv::Error>);

    fn next(&mut self) -> Option<Self::Item> {
        if let Some(e) = self.header_error.take() {
            return Some((1, Err(e)));
        }
        let iter = self.iter.as_mut()?;
        let curr_line = iter.reader().position().line();
        iter.next().map(|row| (curr_line, row))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const INPUT: &str = "\
account_number, first_name, last_name, ssn, address, phone, email, password, balance
1, Ada, Lovelace, 123, London, 555, ada@example.com, pw1, 10.50
two, Bad, Row, 456, Nowhere, 555, bad@example.com, pw2, 1
";

    #[test]
    fn parses_rows_and_reports_bad_ones() {
        let rows: Vec<_> = CsvAccountParser::new(INPUT.as_bytes()).collect();
        assert_eq!(rows.len(), 2);

        let (line, first) = &rows[0];
        let first = first.as_ref().unwrap();
        assert_eq!(*line, 2);
        assert_eq!(first.account_number, 1);
        assert_eq!(first.address, "London");
        assert_eq!(first.balance, Decimal::new(1050, 2));

        assert_eq!(rows[1].0, 3);
        assert!(rows[1].1.is_err());
    }

    #[test]
    fn unreadable_header_is_reported_once() {
        let input = b"account_number, first_\xffname\n1, Ada, Lovelace, 123, London, 555, a@b, pw, 1\n";
        let rows: Vec<_> = CsvAccountParser::new(&input[..]).collect();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].0, 1);
        assert!(rows[0].1.is_err());
    }
}
