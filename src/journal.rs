use crate::{
    data::{AccountCode, Error, Transaction},
    read::TransactionUser,
};
use rust_decimal::Decimal;
use std::collections::HashMap;

/// The loaded journal: transactions in date order and the account names.
/// A journal is never amended, a new load builds a new one.
#[derive(Debug, Default)]
pub(crate) struct Journal {
    transactions: Vec<Transaction>,
    names: HashMap<AccountCode, String>,
}

impl Journal {
    /// Rows sharing a date keep their journal order.
    pub fn load(mut transactions: Vec<Transaction>, names: HashMap<AccountCode, String>) -> Self {
        transactions.sort_by_key(|tx| tx.date);
        Self {
            transactions,
            names,
        }
    }

    pub fn transactions(&self) -> &[Transaction] {
        &self.transactions
    }

    /// Display name for `code`; codes missing from the name table stand for
    /// themselves.
    pub fn full_name<'a>(&'a self, code: &'a str) -> &'a str {
        self.names.get(code).map_or(code, String::as_str)
    }

    pub fn named_accounts(&self) -> impl Iterator<Item = &AccountCode> {
        self.names.keys()
    }
}

/// Staging area for rows coming out of the reader.
impl TransactionUser for Vec<Transaction> {
    fn use_tx(&mut self, line: usize, tx: Transaction) -> Result<(), Error> {
        if tx.amount < Decimal::ZERO {
            return Err(Error::NegativeAmount { line });
        }
        self.push(tx);
        Ok(())
    }
}
