use crate::data::{LedgerEntry, TrialBalance};

pub(crate) const LEDGER_HEADERS: [&str; 10] = [
    "DATE",
    "JV NO.",
    "DR/CR",
    "ACCOUNT",
    "ACCOUNT FULL NAME",
    "PARTICULARS",
    "CHQ NO.",
    "DEBIT",
    "CREDIT",
    "BALANCE",
];

pub(crate) const TRIAL_BALANCE_HEADERS: [&str; 4] =
    ["ACCOUNT", "ACCOUNT FULL NAME", "DEBIT", "CREDIT"];

pub(crate) const TRIAL_BALANCE_NAME: &str = "Trial Balance";

/// Account codes end up in file and zip entry names; path separators would
/// turn them into directories.
pub(crate) fn ledger_name(account: &str) -> String {
    format!("{} Ledger", account.replace(['/', '\\'], "_"))
}

/// Headers are written by hand so that an empty table still has them.
fn table_writer<W: std::io::Write>(
    writer: W,
    headers: &[&str],
) -> Result<csv::Writer<W>, anyhow::Error> {
    let mut wtr = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(writer);
    wtr.write_record(headers)?;
    Ok(wtr)
}

/// CSV exporter for one account ledger
pub(crate) fn write_ledger<W: std::io::Write>(
    writer: W,
    entries: &[LedgerEntry],
) -> Result<(), anyhow::Error> {
    let mut wtr = table_writer(writer, &LEDGER_HEADERS)?;
    for entry in entries {
        wtr.serialize(entry)?;
    }
    wtr.flush()?;
    Ok(())
}

/// CSV exporter for the trial balance. The data rows are followed by a blank
/// row and a TOTAL row holding spreadsheet sums of the DEBIT and CREDIT
/// columns, so the check stays live if someone edits the sheet.
/// CSV has no formula cells: the `=SUM(...)` text only becomes a formula when
/// the file is opened in a spreadsheet application.
pub(crate) fn write_trial_balance<W: std::io::Write>(
    writer: W,
    trial: &TrialBalance,
) -> Result<(), anyhow::Error> {
    let mut wtr = table_writer(writer, &TRIAL_BALANCE_HEADERS)?;
    for row in &trial.rows {
        wtr.serialize(row)?;
    }
    // Data occupies spreadsheet rows 2..=last, row 1 being the headers.
    let last = trial.rows.len() + 1;
    wtr.write_record(["", "", "", ""])?;
    wtr.write_record([
        "TOTAL".to_string(),
        String::new(),
        format!("=SUM(C2:C{last})"),
        format!("=SUM(D2:D{last})"),
    ])?;
    wtr.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{ledger_name, write_ledger, write_trial_balance};
    use crate::data::{DrCr, LedgerEntry, Totals, TrialBalance, TrialBalanceRow};
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    #[test]
    fn ledger_table() {
        let entries = [
            LedgerEntry {
                date: NaiveDate::from_ymd_opt(2021, 5, 20),
                voucher: "JV1".to_string(),
                drcr: DrCr::Debit,
                account: "CASH".to_string(),
                full_name: "Cash in hand".to_string(),
                particulars: "Counter sales".to_string(),
                cheque: None,
                debit: Some(dec!(100)),
                credit: None,
                balance: dec!(-100),
            },
            LedgerEntry {
                date: NaiveDate::from_ymd_opt(2021, 5, 21),
                voucher: "JV2".to_string(),
                drcr: DrCr::Credit,
                account: "CASH".to_string(),
                full_name: "Cash in hand".to_string(),
                particulars: "Deposit".to_string(),
                cheque: Some("000123".to_string()),
                debit: None,
                credit: Some(dec!(40.50)),
                balance: dec!(-59.50),
            },
        ];
        let mut out = Vec::new();
        write_ledger(&mut out, &entries).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "\
DATE,JV NO.,DR/CR,ACCOUNT,ACCOUNT FULL NAME,PARTICULARS,CHQ NO.,DEBIT,CREDIT,BALANCE
2021-05-20,JV1,DR,CASH,Cash in hand,Counter sales,,100,,-100
2021-05-21,JV2,CR,CASH,Cash in hand,Deposit,000123,,40.50,-59.50
"
        );
    }

    #[test]
    fn ledger_name_has_no_separators() {
        assert_eq!(ledger_name("CASH"), "CASH Ledger");
        assert_eq!(ledger_name("A/R\\2021"), "A_R_2021 Ledger");
    }

    #[test]
    fn empty_ledger_keeps_headers() {
        let mut out = Vec::new();
        write_ledger(&mut out, &[]).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "DATE,JV NO.,DR/CR,ACCOUNT,ACCOUNT FULL NAME,PARTICULARS,CHQ NO.,DEBIT,CREDIT,BALANCE\n"
        );
    }

    #[test]
    fn trial_balance_table() {
        let trial = TrialBalance {
            rows: vec![
                TrialBalanceRow {
                    account: "CASH".to_string(),
                    full_name: "Cash in hand".to_string(),
                    debit: Some(dec!(100)),
                    credit: None,
                },
                TrialBalanceRow {
                    account: "SALES".to_string(),
                    full_name: "SALES".to_string(),
                    debit: None,
                    credit: Some(dec!(100)),
                },
            ],
            totals: Totals {
                debit: dec!(100),
                credit: dec!(100),
            },
        };
        let mut out = Vec::new();
        write_trial_balance(&mut out, &trial).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "\
ACCOUNT,ACCOUNT FULL NAME,DEBIT,CREDIT
CASH,Cash in hand,100,
SALES,SALES,,100
,,,
TOTAL,,=SUM(C2:C3),=SUM(D2:D3)
"
        );
    }
}
