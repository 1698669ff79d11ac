use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;
use thiserror::Error;

/// Accounts are only ever identified by their short code.
pub type AccountCode = String;

/// One journal row. `date` is only used for ordering; it is `None` when a
/// lenient read could not make sense of the cell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Transaction {
    pub date: Option<NaiveDate>,
    pub voucher: String,
    pub debit_account: AccountCode,
    pub credit_account: AccountCode,
    pub amount: Decimal,
    pub particulars: String,
    pub cheque: Option<String>,
}

/// Which side of a transaction a ledger entry comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub(crate) enum DrCr {
    #[serde(rename = "DR")]
    Debit,
    #[serde(rename = "CR")]
    Credit,
}

impl DrCr {
    /// Debits pull the running balance down, credits push it up. Debit-normal
    /// accounts therefore carry negative balances.
    pub fn apply(
        self,
        account: &str,
        balance: Decimal,
        amount: Decimal,
    ) -> Result<Decimal, Error> {
        match self {
            DrCr::Debit => balance.checked_sub(amount),
            DrCr::Credit => balance.checked_add(amount),
        }
        .ok_or_else(|| Error::Overflow {
            account: account.to_string(),
        })
    }
}

/// A line of an account ledger; field order is the column order of the
/// ledger table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub(crate) struct LedgerEntry {
    #[serde(rename = "DATE")]
    pub date: Option<NaiveDate>,
    #[serde(rename = "JV NO.")]
    pub voucher: String,
    #[serde(rename = "DR/CR")]
    pub drcr: DrCr,
    #[serde(rename = "ACCOUNT")]
    pub account: AccountCode,
    #[serde(rename = "ACCOUNT FULL NAME")]
    pub full_name: String,
    #[serde(rename = "PARTICULARS")]
    pub particulars: String,
    #[serde(rename = "CHQ NO.")]
    pub cheque: Option<String>,
    #[serde(rename = "DEBIT")]
    pub debit: Option<Decimal>,
    #[serde(rename = "CREDIT")]
    pub credit: Option<Decimal>,
    #[serde(rename = "BALANCE")]
    pub balance: Decimal,
}

/// Net position of one account. At most one of `debit`/`credit` is set, and
/// neither is when the account nets to zero.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub(crate) struct TrialBalanceRow {
    #[serde(rename = "ACCOUNT")]
    pub account: AccountCode,
    #[serde(rename = "ACCOUNT FULL NAME")]
    pub full_name: String,
    #[serde(rename = "DEBIT")]
    pub debit: Option<Decimal>,
    #[serde(rename = "CREDIT")]
    pub credit: Option<Decimal>,
}

impl TrialBalanceRow {
    pub fn new(account: AccountCode, full_name: String, balance: Decimal) -> Self {
        Self {
            account,
            full_name,
            debit: (balance < Decimal::ZERO).then(|| -balance),
            credit: (balance > Decimal::ZERO).then_some(balance),
        }
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Totals {
    pub debit: Decimal,
    pub credit: Decimal,
}

impl Totals {
    pub fn add(self, row: &TrialBalanceRow) -> Result<Self, Error> {
        let overflow = || Error::Overflow {
            account: "TOTAL".to_string(),
        };
        Ok(Self {
            debit: self
                .debit
                .checked_add(row.debit.unwrap_or_default())
                .ok_or_else(overflow)?,
            credit: self
                .credit
                .checked_add(row.credit.unwrap_or_default())
                .ok_or_else(overflow)?,
        })
    }

    pub fn is_balanced(&self) -> bool {
        self.debit == self.credit
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub(crate) struct TrialBalance {
    pub rows: Vec<TrialBalanceRow>,
    pub totals: Totals,
}

/// Journal errors. Line numbers count data rows from 1, header excluded.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum Error {
    #[error("Line {line}: amount {value:?} is not a number")]
    InvalidAmount { line: usize, value: String },
    #[error("Line {line}: amount must not be negative")]
    NegativeAmount { line: usize },
    #[error("Line {line}: date {value:?} doesn't match any configured format")]
    InvalidDate { line: usize, value: String },
    #[error("Line {line}: debit or credit account is blank")]
    MissingAccount { line: usize },
    #[error("Balance of {account} is too large to represent")]
    Overflow { account: AccountCode },
}
