use clap::{Parser, Subcommand};

mod analysis;
mod cmd;
mod ledger;

use cmd::chargeable::ChargeableCommand;
use cmd::events::EventsCommand;
use cmd::holdings::HoldingsCommand;
use cmd::report::ReportCommand;
use cmd::schema::SchemaCommand;
use cmd::summary::SummaryCommand;
use cmd::validate::ValidateCommand;

#[derive(Parser, Debug)]
#[command(name = "ledan", version, about = "Analyse a personal finance ledger")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Net worth statement at a date
    Report(ReportCommand),
    /// Income and spending over a period
    Summary(SummaryCommand),
    /// Per-holding positions and valuations
    Holdings(HoldingsCommand),
    /// The merged transaction and market-data timeline
    Events(EventsCommand),
    /// Chargeable event gains and their taxation
    Chargeable(ChargeableCommand),
    /// Check the ledger for data quality issues
    Validate(ValidateCommand),
    /// Print expected input formats
    Schema(SchemaCommand),
}

fn main() -> anyhow::Result<()> {
    pretty_env_logger::init();

    let cli = Cli::parse();
    match cli.command {
        Command::Report(cmd) => cmd.exec(),
        Command::Summary(cmd) => cmd.exec(),
        Command::Holdings(cmd) => cmd.exec(),
        Command::Events(cmd) => cmd.exec(),
        Command::Chargeable(cmd) => cmd.exec(),
        Command::Validate(cmd) => cmd.exec(),
        Command::Schema(cmd) => cmd.exec(),
    }
}
