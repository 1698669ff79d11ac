use crate::{
    data::{AccountCode, DrCr, Error, LedgerEntry, Totals, TrialBalance, TrialBalanceRow},
    journal::Journal,
};
use rust_decimal::Decimal;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use tracing::debug;

/// The working session: one loaded journal plus what has been derived from it
/// so far. The account index and the net balances are caches, dropped by
/// `invalidate` whenever the journal changes. Only ever driven from a single
/// thread, so no locking.
#[derive(Debug, Default)]
pub(crate) struct Books {
    journal: Journal,
    accounts: Option<BTreeSet<AccountCode>>,
    balances: HashMap<AccountCode, Decimal>,
}

impl Books {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces (never merges) the current journal.
    pub fn load(&mut self, journal: Journal) {
        self.journal = journal;
        self.invalidate();
    }

    pub fn invalidate(&mut self) {
        self.accounts = None;
        self.balances.clear();
    }

    pub fn journal(&self) -> &Journal {
        &self.journal
    }

    /// Every code used on either side of a transaction, computed on first use.
    pub fn all_accounts(&mut self) -> &BTreeSet<AccountCode> {
        let journal = &self.journal;
        self.accounts.get_or_insert_with(|| {
            journal
                .transactions()
                .iter()
                .flat_map(|tx| [tx.debit_account.clone(), tx.credit_account.clone()])
                .collect()
        })
    }

    /// Ledgers for `codes`, each in journal order with its running balance.
    /// Always derived from the whole journal, so repeated calls give the same
    /// result. Final balances are remembered for the trial balance.
    pub fn build_ledgers(
        &mut self,
        codes: &BTreeSet<AccountCode>,
    ) -> Result<BTreeMap<AccountCode, Vec<LedgerEntry>>, Error> {
        let mut ledgers: BTreeMap<AccountCode, Vec<LedgerEntry>> =
            codes.iter().map(|code| (code.clone(), Vec::new())).collect();
        let journal = &self.journal;
        for tx in journal.transactions() {
            // A transaction between two requested accounts lands in both ledgers.
            for (code, side) in [
                (&tx.debit_account, DrCr::Debit),
                (&tx.credit_account, DrCr::Credit),
            ] {
                let Some(ledger) = ledgers.get_mut(code) else {
                    continue;
                };
                let previous = ledger.last().map_or(Decimal::ZERO, |entry| entry.balance);
                ledger.push(LedgerEntry {
                    date: tx.date,
                    voucher: tx.voucher.clone(),
                    drcr: side,
                    account: code.clone(),
                    full_name: journal.full_name(code).to_string(),
                    particulars: tx.particulars.clone(),
                    cheque: tx.cheque.clone(),
                    debit: (side == DrCr::Debit).then_some(tx.amount),
                    credit: (side == DrCr::Credit).then_some(tx.amount),
                    balance: side.apply(code, previous, tx.amount)?,
                });
            }
        }
        for (code, ledger) in &ledgers {
            let balance = ledger.last().map_or(Decimal::ZERO, |entry| entry.balance);
            debug!(account = %code, entries = ledger.len(), %balance, "Built ledger");
            self.balances.insert(code.clone(), balance);
        }
        Ok(ledgers)
    }

    pub fn build_ledger(&mut self, code: &str) -> Result<Vec<LedgerEntry>, Error> {
        Ok(self
            .build_ledgers(&BTreeSet::from([code.to_string()]))?
            .remove(code)
            .unwrap_or_default())
    }

    /// Net position of every account used in the journal or listed in the
    /// name table, sorted by code. Balances already known from a ledger are
    /// reused, the rest come from one pass over the journal.
    pub fn build_trial_balance(&mut self) -> Result<TrialBalance, Error> {
        let mut accounts = self.all_accounts().clone();
        accounts.extend(self.journal.named_accounts().cloned());

        self.resolve_balances(&accounts)?;

        let rows: Vec<TrialBalanceRow> = accounts
            .into_iter()
            .map(|code| {
                let balance = self.balances.get(&code).copied().unwrap_or_default();
                let full_name = self.journal.full_name(&code).to_string();
                TrialBalanceRow::new(code, full_name, balance)
            })
            .collect();
        let totals = rows
            .iter()
            .try_fold(Totals::default(), |totals, row| totals.add(row))?;
        Ok(TrialBalance { rows, totals })
    }

    /// Fills the balance cache for `accounts` it doesn't know yet, in one
    /// pass over the journal. Nothing is cached if the pass fails.
    fn resolve_balances(&mut self, accounts: &BTreeSet<AccountCode>) -> Result<(), Error> {
        let mut pending: HashMap<&str, Decimal> = accounts
            .iter()
            .filter(|code| !self.balances.contains_key(*code))
            .map(|code| (code.as_str(), Decimal::ZERO))
            .collect();
        debug!(
            accounts = accounts.len(),
            cached = accounts.len() - pending.len(),
            "Building trial balance"
        );
        if !pending.is_empty() {
            for tx in self.journal.transactions() {
                if let Some(balance) = pending.get_mut(tx.debit_account.as_str()) {
                    *balance = DrCr::Debit.apply(&tx.debit_account, *balance, tx.amount)?;
                }
                if let Some(balance) = pending.get_mut(tx.credit_account.as_str()) {
                    *balance = DrCr::Credit.apply(&tx.credit_account, *balance, tx.amount)?;
                }
            }
            self.balances.extend(
                pending
                    .into_iter()
                    .map(|(code, balance)| (code.to_string(), balance)),
            );
        }
        Ok(())
    }
}
