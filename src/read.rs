use crate::{
    config::{AmountPolicy, ReadOptions},
    data::{AccountCode, Error, Transaction},
};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::{collections::HashMap, str::FromStr};
use tracing::{debug, warn};

/// Trait for doing something with a `Transaction` read from a journal
/// (or received from elsewhere). The journal store collects them; tests use
/// it to check what the reader produced. `line` is the 1-based data row.
pub(crate) trait TransactionUser {
    fn use_tx(&mut self, line: usize, tx: Transaction) -> Result<(), Error>;
}

/// Journal row as found in the file, before any interpretation.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct JournalRow {
    #[serde(rename = "DATE")]
    date: String,
    #[serde(rename = "JV NO.")]
    voucher: String,
    #[serde(rename = "DR ACCOUNT")]
    debit_account: String,
    #[serde(rename = "CR ACCOUNT")]
    credit_account: String,
    #[serde(rename = "PARTICULARS")]
    particulars: String,
    #[serde(rename = "CHQ NO.")]
    cheque: String,
    #[serde(rename = "AMOUNT")]
    amount: String,
}

impl JournalRow {
    fn is_blank(&self) -> bool {
        [
            &self.date,
            &self.voucher,
            &self.debit_account,
            &self.credit_account,
            &self.particulars,
            &self.cheque,
            &self.amount,
        ]
        .iter()
        .all(|cell| cell.is_empty())
    }

    fn decode(self, line: usize, options: &ReadOptions) -> Result<Transaction, Error> {
        if self.debit_account.is_empty() || self.credit_account.is_empty() {
            return Err(Error::MissingAccount { line });
        }
        let lenient = options.amounts == AmountPolicy::Lenient;

        let amount = match parse_amount(&self.amount) {
            Some(amount) => amount,
            None if lenient => {
                warn!(line, value = %self.amount, "Amount is not a number, counting it as zero");
                Decimal::ZERO
            }
            None => {
                return Err(Error::InvalidAmount {
                    line,
                    value: self.amount,
                })
            }
        };
        let date = match parse_date(&self.date, &options.date_formats) {
            Some(date) => Some(date),
            None if lenient => {
                warn!(line, value = %self.date, "Unreadable date, row goes first");
                None
            }
            None => {
                return Err(Error::InvalidDate {
                    line,
                    value: self.date,
                })
            }
        };

        Ok(Transaction {
            date,
            voucher: self.voucher,
            debit_account: self.debit_account,
            credit_account: self.credit_account,
            amount,
            particulars: self.particulars,
            cheque: Some(self.cheque).filter(|c| !c.is_empty()),
        })
    }
}

fn parse_amount(cell: &str) -> Option<Decimal> {
    Decimal::from_str(&cell.replace(',', "")).ok()
}

fn parse_date(cell: &str, formats: &[String]) -> Option<NaiveDate> {
    formats
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(cell, format).ok())
}

/// CSV importer for the journal. Returns the number of rows handed to `user`.
/// Under the strict policy the first bad row aborts the import; under the
/// lenient one bad rows are logged and skipped.
pub(crate) fn read_transactions<R: std::io::Read, U: TransactionUser>(
    reader: R,
    options: &ReadOptions,
    user: &mut U,
) -> Result<usize, anyhow::Error> {
    let mut rdr = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);
    let mut used = 0;
    for (idx, result) in rdr.deserialize().enumerate() {
        let line = idx + 1;
        let row: JournalRow = match result {
            Ok(row) => row,
            Err(e) if options.amounts == AmountPolicy::Lenient => {
                warn!(line, "Skipping unreadable journal row: {e}");
                continue;
            }
            Err(e) => return Err(e.into()),
        };
        if row.is_blank() {
            debug!(line, "Skipping blank row");
            continue;
        }
        match row
            .decode(line, options)
            .and_then(|tx| user.use_tx(line, tx))
        {
            Ok(()) => used += 1,
            Err(e) if options.amounts == AmountPolicy::Lenient => {
                warn!("Skipping journal row: {e}");
            }
            Err(e) => return Err(e.into()),
        }
    }
    Ok(used)
}

#[derive(Debug, Deserialize)]
struct AccountNameRow {
    #[serde(rename = "ACCOUNT")]
    account: AccountCode,
    #[serde(rename = "LEDGER ACCOUNT", default)]
    name: String,
}

/// CSV importer for the code -> full name table. Rows without a code or a
/// name carry no information and are dropped.
pub(crate) fn read_account_names<R: std::io::Read>(
    reader: R,
) -> Result<HashMap<AccountCode, String>, anyhow::Error> {
    let mut rdr = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);
    let mut names = HashMap::new();
    for result in rdr.deserialize() {
        let row: AccountNameRow = result?;
        if row.account.is_empty() || row.name.is_empty() {
            continue;
        }
        names.insert(row.account, row.name);
    }
    Ok(names)
}

#[cfg(test)]
mod tests {
    use crate::{
        config::{AmountPolicy, ReadOptions},
        data::{Error, Transaction},
        read::{read_account_names, read_transactions, TransactionUser},
    };
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    #[derive(Default)]
    struct TxStorage {
        txst: Vec<Transaction>,
    }

    impl TransactionUser for TxStorage {
        fn use_tx(&mut self, _line: usize, tx: Transaction) -> Result<(), Error> {
            self.txst.push(tx);
            Ok(())
        }
    }

    fn lenient() -> ReadOptions {
        ReadOptions {
            amounts: AmountPolicy::Lenient,
            ..ReadOptions::default()
        }
    }

    #[test]
    fn read_tx() {
        let mut storage = TxStorage::default();
        let journal_csv = b"\
DATE,JV NO.,DR ACCOUNT,CR ACCOUNT,PARTICULARS,CHQ NO.,AMOUNT
2021-05-20,JV1,CASH,SALES,Counter sales,,\"1,250.50\"
21/05/2021,JV2,RENT,BANK,May rent,000123,800
";
        let used =
            read_transactions(&journal_csv[..], &ReadOptions::default(), &mut storage).unwrap();
        assert_eq!(used, 2);
        assert_eq!(
            storage.txst,
            [
                Transaction {
                    date: NaiveDate::from_ymd_opt(2021, 5, 20),
                    voucher: "JV1".to_string(),
                    debit_account: "CASH".to_string(),
                    credit_account: "SALES".to_string(),
                    amount: dec!(1250.50),
                    particulars: "Counter sales".to_string(),
                    cheque: None,
                },
                Transaction {
                    date: NaiveDate::from_ymd_opt(2021, 5, 21),
                    voucher: "JV2".to_string(),
                    debit_account: "RENT".to_string(),
                    credit_account: "BANK".to_string(),
                    amount: dec!(800),
                    particulars: "May rent".to_string(),
                    cheque: Some("000123".to_string()),
                },
            ]
        )
    }

    #[test]
    fn strict_rejects_bad_amount() {
        let mut storage = TxStorage::default();
        let journal_csv = b"\
DATE,DR ACCOUNT,CR ACCOUNT,AMOUNT
2021-05-20,CASH,SALES,10
2021-05-21,CASH,SALES,ten
";
        let err = read_transactions(&journal_csv[..], &ReadOptions::default(), &mut storage)
            .unwrap_err();
        assert_eq!(
            err.downcast_ref::<Error>(),
            Some(&Error::InvalidAmount {
                line: 2,
                value: "ten".to_string()
            })
        );
    }

    #[test]
    fn strict_rejects_bad_date() {
        let mut storage = TxStorage::default();
        let journal_csv = b"\
DATE,DR ACCOUNT,CR ACCOUNT,AMOUNT
someday,CASH,SALES,10
";
        let err = read_transactions(&journal_csv[..], &ReadOptions::default(), &mut storage)
            .unwrap_err();
        assert_eq!(
            err.downcast_ref::<Error>(),
            Some(&Error::InvalidDate {
                line: 1,
                value: "someday".to_string()
            })
        );
    }

    #[test]
    fn lenient_coerces_amount_and_date() {
        let mut storage = TxStorage::default();
        let journal_csv = b"\
DATE,DR ACCOUNT,CR ACCOUNT,AMOUNT
,CASH,SALES,n/a
";
        read_transactions(&journal_csv[..], &lenient(), &mut storage).unwrap();
        assert_eq!(storage.txst.len(), 1);
        assert_eq!(storage.txst[0].amount, dec!(0));
        assert_eq!(storage.txst[0].date, None);
    }

    #[test]
    fn lenient_skips_rows_without_account() {
        let mut storage = TxStorage::default();
        let journal_csv = b"\
DATE,DR ACCOUNT,CR ACCOUNT,AMOUNT
2021-05-20,,SALES,10
2021-05-21,CASH,SALES,20
";
        let used = read_transactions(&journal_csv[..], &lenient(), &mut storage).unwrap();
        assert_eq!(used, 1);
        assert_eq!(storage.txst[0].amount, dec!(20));
    }

    #[test]
    fn ragged_rows() {
        let journal_csv = b"\
DATE,DR ACCOUNT,CR ACCOUNT,AMOUNT
2021-05-20,CASH,SALES,10,oops
2021-05-21,CASH,SALES,20
";
        let mut storage = TxStorage::default();
        assert!(
            read_transactions(&journal_csv[..], &ReadOptions::default(), &mut storage).is_err()
        );

        let mut storage = TxStorage::default();
        let used = read_transactions(&journal_csv[..], &lenient(), &mut storage).unwrap();
        assert_eq!(used, 1);
        assert_eq!(storage.txst[0].amount, dec!(20));
    }

    #[test]
    fn blank_rows_are_ignored() {
        let mut storage = TxStorage::default();
        let journal_csv = b"\
DATE,DR ACCOUNT,CR ACCOUNT,AMOUNT
2021-05-20,CASH,SALES,10
,,,
";
        let used =
            read_transactions(&journal_csv[..], &ReadOptions::default(), &mut storage).unwrap();
        assert_eq!(used, 1);
    }

    #[test]
    fn read_names() {
        let names_csv = b"\
ACCOUNT, LEDGER ACCOUNT
CASH,    Cash in hand
SALES,   Sales revenue
BANK,
";
        let names = read_account_names(&names_csv[..]).unwrap();
        assert_eq!(names.len(), 2);
        assert_eq!(names["CASH"], "Cash in hand");
        assert!(!names.contains_key("BANK"));
    }
}
