use crate::{
    compute::Books,
    config::ReadOptions,
    data::{AccountCode, LedgerEntry, TrialBalance},
    journal::Journal,
    read::{read_account_names, read_transactions},
    write::{ledger_name, write_ledger, write_trial_balance, TRIAL_BALANCE_NAME},
};
use anyhow::Context;
use crossbeam_channel::{Receiver, Sender};
use std::{
    collections::HashMap,
    io::{Cursor, Write},
    thread::JoinHandle,
};
use tracing::{debug, info, warn};
use zip::{write::SimpleFileOptions, CompressionMethod, ZipWriter};

pub(crate) const ALL_LEDGERS_NAME: &str = "All Ledgers";
pub(crate) const EVERYTHING_NAME: &str = "All Ledgers and Trial Balance";

/// What the host can ask of the worker.
#[derive(Debug)]
pub(crate) enum Request {
    /// Raw journal and (optional) account-name tables, both CSV.
    Load {
        journal: Vec<u8>,
        accounts: Option<Vec<u8>>,
    },
    AllAccounts,
    Ledger(AccountCode),
    TrialBalance,
    AllLedgers,
    /// Every ledger plus the trial balance.
    Everything,
}

impl Request {
    fn kind(&self) -> &'static str {
        match self {
            Request::Load { .. } => "load",
            Request::AllAccounts => "all_accounts",
            Request::Ledger(_) => "ledger",
            Request::TrialBalance => "trial_balance",
            Request::AllLedgers => "all_ledgers",
            Request::Everything => "everything",
        }
    }
}

/// A finished table or zip bundle, ready to be saved under `name`.
#[derive(Debug, PartialEq, Eq)]
pub(crate) struct OutputFile {
    pub name: String,
    pub buffer: Box<[u8]>,
}

/// Exactly one response per request, in request order.
#[derive(Debug, PartialEq, Eq)]
pub(crate) enum Response {
    Loaded { transactions: usize },
    Accounts(Vec<AccountCode>),
    File(OutputFile),
    Failed(String),
}

/// Handle on the background thread owning the `Books`. Requests are served
/// one at a time, to completion. Dropping the handle lets the thread finish
/// the queue and exit.
pub(crate) struct Worker {
    requests: Option<Sender<Request>>,
    responses: Receiver<Response>,
    handle: Option<JoinHandle<()>>,
}

impl Worker {
    pub fn spawn(options: ReadOptions) -> anyhow::Result<Self> {
        let (request_tx, request_rx) = crossbeam_channel::unbounded();
        let (response_tx, response_rx) = crossbeam_channel::unbounded();
        let handle = std::thread::Builder::new()
            .name("ledgers-worker".to_string())
            .spawn(move || run_worker_loop(request_rx, response_tx, options))
            .context("Couldn't start worker thread")?;
        Ok(Self {
            requests: Some(request_tx),
            responses: response_rx,
            handle: Some(handle),
        })
    }

    pub fn dispatch(&self, request: Request) -> anyhow::Result<()> {
        self.requests
            .as_ref()
            .context("Worker is shut down")?
            .send(request)
            .context("Worker has gone away")
    }

    pub fn recv(&self) -> anyhow::Result<Response> {
        self.responses.recv().context("Worker has gone away")
    }

    pub fn call(&self, request: Request) -> anyhow::Result<Response> {
        self.dispatch(request)?;
        self.recv()
    }
}

impl Drop for Worker {
    fn drop(&mut self) {
        self.requests.take();
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                warn!("Worker thread panicked");
            }
        }
    }
}

fn run_worker_loop(rx: Receiver<Request>, tx: Sender<Response>, options: ReadOptions) {
    let mut books = Books::new();
    while let Ok(request) = rx.recv() {
        debug!(request = request.kind(), "Handling request");
        let response = handle_request(&mut books, &options, request).unwrap_or_else(|e| {
            warn!("Request failed: {e:#}");
            Response::Failed(format!("{e:#}"))
        });
        if tx.send(response).is_err() {
            break;
        }
    }
    debug!("Worker exiting");
}

fn handle_request(
    books: &mut Books,
    options: &ReadOptions,
    request: Request,
) -> anyhow::Result<Response> {
    match request {
        Request::Load { journal, accounts } => {
            let mut staged = Vec::new();
            read_transactions(&journal[..], options, &mut staged)
                .context("Couldn't read journal")?;
            let names = match accounts {
                Some(accounts) => {
                    read_account_names(&accounts[..]).context("Couldn't read account names")?
                }
                None => HashMap::new(),
            };
            info!(
                transactions = staged.len(),
                names = names.len(),
                "Journal loaded"
            );
            books.load(Journal::load(staged, names));
            Ok(Response::Loaded {
                transactions: books.journal().transactions().len(),
            })
        }
        Request::AllAccounts => Ok(Response::Accounts(
            books.all_accounts().iter().cloned().collect(),
        )),
        Request::Ledger(code) => {
            let entries = books.build_ledger(&code)?;
            Ok(Response::File(ledger_file(&code, &entries)?))
        }
        Request::TrialBalance => Ok(Response::File(trial_balance_file(
            &books.build_trial_balance()?,
        )?)),
        Request::AllLedgers => Ok(Response::File(archive_file(
            ALL_LEDGERS_NAME,
            ledger_files(books)?,
        )?)),
        Request::Everything => {
            let mut files = ledger_files(books)?;
            files.push(trial_balance_file(&books.build_trial_balance()?)?);
            Ok(Response::File(archive_file(EVERYTHING_NAME, files)?))
        }
    }
}

fn ledger_files(books: &mut Books) -> anyhow::Result<Vec<OutputFile>> {
    let accounts = books.all_accounts().clone();
    books
        .build_ledgers(&accounts)?
        .iter()
        .map(|(code, entries)| ledger_file(code, entries))
        .collect()
}

fn ledger_file(code: &str, entries: &[LedgerEntry]) -> anyhow::Result<OutputFile> {
    let mut buffer = Vec::new();
    write_ledger(&mut buffer, entries)?;
    Ok(OutputFile {
        name: format!("{}.csv", ledger_name(code)),
        buffer: buffer.into_boxed_slice(),
    })
}

/// Packs `files` into a single zip buffer.
fn archive_file(name: &str, files: Vec<OutputFile>) -> anyhow::Result<OutputFile> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
    for file in files {
        writer.start_file(file.name, options)?;
        writer.write_all(&file.buffer)?;
    }
    let buffer = writer.finish()?.into_inner();
    debug!(name, bytes = buffer.len(), "Packed archive");
    Ok(OutputFile {
        name: format!("{name}.zip"),
        buffer: buffer.into_boxed_slice(),
    })
}

fn trial_balance_file(trial: &TrialBalance) -> anyhow::Result<OutputFile> {
    if !trial.totals.is_balanced() {
        warn!(
            debit = %trial.totals.debit,
            credit = %trial.totals.credit,
            "Trial balance doesn't balance"
        );
    }
    let mut buffer = Vec::new();
    write_trial_balance(&mut buffer, trial)?;
    Ok(OutputFile {
        name: format!("{TRIAL_BALANCE_NAME}.csv"),
        buffer: buffer.into_boxed_slice(),
    })
}
