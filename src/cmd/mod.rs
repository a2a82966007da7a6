pub mod chargeable;
pub mod events;
pub mod holdings;
pub mod report;
pub mod schema;
pub mod summary;
pub mod validate;

use crate::ledger::{self, Ledger, LedgerFile};
use clap::Args;
use std::fs::File;
use std::io::{self, BufReader, Read};
use std::path::{Path, PathBuf};

/// Ledger input shared by every command: a JSON ledger file plus optional CSV
/// streams merged in before validation
#[derive(Args, Debug)]
pub struct LedgerInput {
    /// Ledger file (JSON). Reads from stdin if not specified.
    #[arg(default_value = "-")]
    ledger: PathBuf,

    /// Extra transactions (CSV) merged into the ledger
    #[arg(long)]
    transactions: Option<PathBuf>,

    /// Extra security prices (CSV) merged into the ledger
    #[arg(long)]
    prices: Option<PathBuf>,

    /// Extra exchange rates (CSV) merged into the ledger
    #[arg(long)]
    rates: Option<PathBuf>,
}

impl LedgerInput {
    /// Read the ledger file (or stdin with "-"), merge any CSV streams and
    /// validate the result
    pub fn read(&self) -> anyhow::Result<Ledger> {
        let mut file = if self.ledger.as_os_str() == "-" {
            read_from_stdin()?
        } else {
            read_from_file(&self.ledger)?
        };

        if let Some(path) = &self.transactions {
            file.transactions
                .extend(ledger::read_transactions_csv(open(path)?)?);
        }
        if let Some(path) = &self.prices {
            file.prices.extend(ledger::read_prices_csv(open(path)?)?);
        }
        if let Some(path) = &self.rates {
            file.rates.extend(ledger::read_rates_csv(open(path)?)?);
        }

        let ledger = Ledger::build(file)?;
        Ok(ledger)
    }
}

fn open(path: &Path) -> anyhow::Result<BufReader<File>> {
    let file = File::open(path)?;
    Ok(BufReader::new(file))
}

fn read_from_file(path: &Path) -> anyhow::Result<LedgerFile> {
    ledger::read_ledger_json(open(path)?)
}

fn read_from_stdin() -> anyhow::Result<LedgerFile> {
    let stdin = io::stdin();
    let mut reader = BufReader::new(stdin.lock());

    let mut buffer = Vec::new();
    reader.read_to_end(&mut buffer)?;

    if buffer.is_empty() {
        anyhow::bail!("No input received. Provide a ledger file or pipe data to stdin.");
    }

    ledger::read_ledger_json(io::Cursor::new(buffer))
}
