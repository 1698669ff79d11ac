use anyhow::Context;
use clap::{Parser, Subcommand};
use config::{AmountPolicy, Config, TracingConfig};
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::{filter::EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};
use worker::{OutputFile, Request, Response, Worker};

mod compute;
mod config;
mod data;
mod journal;
mod read;
mod worker;
mod write;

/// Per-account ledgers and a trial balance from a double-entry journal.
#[derive(Parser)]
#[clap(version, long_about = None)]
struct Cli {
    #[clap(short, long, env = "LEDGERS_CONFIG", value_name = "FILE")]
    config: Option<PathBuf>,
    /// Where generated tables are saved (default: the configured directory)
    #[clap(short, long, value_name = "DIRECTORY")]
    out: Option<PathBuf>,
    /// Count unreadable amounts as zero instead of refusing the journal
    #[clap(long)]
    lenient: bool,
    /// Account-name table (ACCOUNT, LEDGER ACCOUNT)
    #[clap(short, long, value_name = "FILE")]
    names: Option<PathBuf>,
    /// Journal table (DATE, JV NO., DR ACCOUNT, CR ACCOUNT, PARTICULARS, CHQ NO., AMOUNT)
    journal: PathBuf,
    #[clap(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List every account used in the journal
    Accounts,
    /// Ledger of the given accounts, one file each
    Ledger {
        #[clap(required = true)]
        accounts: Vec<String>,
    },
    TrialBalance,
    AllLedgers,
    /// Every ledger and the trial balance
    All,
}

fn main() -> Result<(), anyhow::Error> {
    let cli = Cli::parse();
    let mut config = Config::load_config(cli.config.as_ref())?;
    if cli.lenient {
        config.read.amounts = AmountPolicy::Lenient;
    }
    if let Some(out) = cli.out {
        config.output.directory = out;
    }
    init_tracing(&config.tracing)?;

    let journal = std::fs::read(&cli.journal)
        .with_context(|| format!("Couldn't read {}", cli.journal.display()))?;
    let accounts = cli
        .names
        .as_ref()
        .map(|path| {
            std::fs::read(path).with_context(|| format!("Couldn't read {}", path.display()))
        })
        .transpose()?;

    let worker = Worker::spawn(config.read.clone())?;
    match worker.call(Request::Load { journal, accounts })? {
        Response::Loaded { transactions } => info!(transactions, "Journal ready"),
        Response::Failed(message) => anyhow::bail!(message),
        other => anyhow::bail!("Unexpected answer to load: {other:?}"),
    }
    let requests = requests(cli.command);
    let pending = requests.len();
    for request in requests {
        worker.dispatch(request)?;
    }
    for _ in 0..pending {
        match worker.recv()? {
            Response::Loaded { .. } => {}
            Response::Accounts(accounts) => {
                for account in accounts {
                    println!("{account}");
                }
            }
            Response::File(file) => save(&config.output.directory, &file)?,
            Response::Failed(message) => anyhow::bail!(message),
        }
    }
    Ok(())
}

fn requests(command: Command) -> Vec<Request> {
    match command {
        Command::Accounts => vec![Request::AllAccounts],
        Command::Ledger { accounts } => accounts.into_iter().map(Request::Ledger).collect(),
        Command::TrialBalance => vec![Request::TrialBalance],
        Command::AllLedgers => vec![Request::AllLedgers],
        Command::All => vec![Request::Everything],
    }
}

fn init_tracing(config: &TracingConfig) -> anyhow::Result<()> {
    let filter_layer =
        EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(&config.filter))?;
    let registry = tracing_subscriber::registry().with(filter_layer);
    if config.json {
        registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .try_init()?;
    } else {
        registry
            .with(fmt::layer().with_writer(std::io::stderr))
            .try_init()?;
    }
    Ok(())
}

fn save(dir: &Path, file: &OutputFile) -> anyhow::Result<()> {
    std::fs::create_dir_all(dir).with_context(|| format!("Couldn't create {}", dir.display()))?;
    let path = dir.join(&file.name);
    std::fs::write(&path, &file.buffer)
        .with_context(|| format!("Couldn't write {}", path.display()))?;
    info!(path = %path.display(), "Saved");
    Ok(())
}
