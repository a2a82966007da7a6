//! Events command - the merged transaction and market-data timeline

use crate::analysis::{DateRange, EventView, ViewEntry, ViewEvent};
use crate::cmd::LedgerInput;
use crate::ledger::{Ledger, Transaction};
use chrono::NaiveDate;
use clap::Args;
use rust_decimal::Decimal;
use std::io;
use tabled::{
    settings::{object::Rows, Alignment, Modify, Style},
    Table, Tabled,
};

#[derive(Args, Debug)]
pub struct EventsCommand {
    #[command(flatten)]
    input: LedgerInput,

    /// Start date (YYYY-MM-DD), inclusive
    #[arg(long)]
    from: Option<NaiveDate>,

    /// End date (YYYY-MM-DD), inclusive
    #[arg(long)]
    to: Option<NaiveDate>,

    /// Filter by account, payee or holding on either side
    #[arg(short, long)]
    owner: Option<String>,

    /// Output as CSV instead of formatted table
    #[arg(long)]
    csv: bool,
}

impl EventsCommand {
    pub fn exec(&self) -> anyhow::Result<()> {
        let ledger = self.input.read()?;
        let view = EventView::build(&ledger);
        let range = DateRange {
            start: self.from,
            end: self.to,
        };

        let rows = build_event_rows(&ledger, view.window(&range), self.owner.as_deref());

        if self.csv {
            self.write_csv(&rows)
        } else {
            self.print_table(&rows);
            Ok(())
        }
    }

    fn print_table(&self, rows: &[EventRow]) {
        if rows.is_empty() {
            println!("No events found matching filters");
            return;
        }

        let table = Table::new(rows)
            .with(Style::rounded())
            .with(Modify::new(Rows::new(1..)).with(Alignment::right()))
            .to_string();
        println!("{}", table);
    }

    fn write_csv(&self, rows: &[EventRow]) -> anyhow::Result<()> {
        let mut wtr = csv::Writer::from_writer(io::stdout());
        for row in rows {
            wtr.serialize(row)?;
        }
        wtr.flush()?;
        Ok(())
    }
}

/// Row for the events table output
#[derive(Debug, Clone, Tabled, serde::Serialize)]
pub struct EventRow {
    #[tabled(rename = "#")]
    #[serde(rename = "ref")]
    reference: String,

    #[tabled(rename = "Date")]
    date: String,

    #[tabled(rename = "Event")]
    event: String,

    #[tabled(rename = "Debit")]
    debit: String,

    #[tabled(rename = "Credit")]
    credit: String,

    #[tabled(rename = "Category")]
    category: String,

    #[tabled(rename = "Amount")]
    amount: String,

    #[tabled(rename = "Tax")]
    tax: String,

    #[tabled(rename = "Units")]
    units: String,

    #[tabled(rename = "Description")]
    description: String,
}

fn build_event_rows(
    ledger: &Ledger,
    entries: &[ViewEntry],
    owner_filter: Option<&str>,
) -> Vec<EventRow> {
    let mut rows = Vec::new();

    for entry in entries {
        match &entry.event {
            ViewEvent::Market { prices, rates } => {
                if owner_filter.is_some() {
                    continue;
                }
                for &i in prices {
                    let price = &ledger.prices[i];
                    rows.push(market_row(
                        entry.date,
                        format!("Price {}", price.security),
                        price.price,
                    ));
                }
                for &i in rates {
                    let rate = &ledger.rates[i];
                    rows.push(market_row(
                        entry.date,
                        format!("Rate {}", rate.currency),
                        rate.rate,
                    ));
                }
            }
            ViewEvent::Transaction(i) => {
                let tx = &ledger.transactions[*i];
                if let Some(owner) = owner_filter {
                    if !matches_owner(tx, owner) {
                        continue;
                    }
                }
                rows.push(EventRow {
                    reference: format!("#{}", i),
                    date: entry.date.format("%Y-%m-%d").to_string(),
                    event: "Transaction".to_string(),
                    debit: tx.debit.clone(),
                    credit: tx.credit.clone(),
                    category: tx.category.clone(),
                    amount: format_money(tx.amount),
                    tax: tx.tax_credit.map_or(String::new(), format_money),
                    units: format_tx_units(tx),
                    description: tx.description.clone().unwrap_or_default(),
                });
            }
        }
    }

    rows
}

fn market_row(date: NaiveDate, event: String, value: Decimal) -> EventRow {
    EventRow {
        reference: String::new(),
        date: date.format("%Y-%m-%d").to_string(),
        event,
        debit: String::new(),
        credit: String::new(),
        category: String::new(),
        amount: value.to_string(),
        tax: String::new(),
        units: String::new(),
        description: String::new(),
    }
}

fn matches_owner(tx: &Transaction, owner: &str) -> bool {
    tx.debit.eq_ignore_ascii_case(owner) || tx.credit.eq_ignore_ascii_case(owner)
}

fn format_tx_units(tx: &Transaction) -> String {
    match (tx.debit_units, tx.credit_units) {
        (Some(d), Some(c)) => format!("{} → {}", format_units(d), format_units(c)),
        (Some(d), None) => format_units(d),
        (None, Some(c)) => format_units(c),
        (None, None) => String::new(),
    }
}

fn format_money(amount: Decimal) -> String {
    format!("{:.2}", amount)
}

fn format_units(units: Decimal) -> String {
    let s = format!("{:.6}", units);
    let trimmed = s.trim_end_matches('0').trim_end_matches('.');
    trimmed.to_string()
}
