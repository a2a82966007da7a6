//! Chargeable command - chargeable event gains and their taxation

use crate::analysis::{AnalysisManager, ChargeableEvent, ChargeableEvents, DateRange};
use crate::cmd::LedgerInput;
use chrono::NaiveDate;
use clap::Args;
use rust_decimal::Decimal;
use serde::Serialize;
use tabled::{
    settings::{object::Rows, Alignment, Modify, Style},
    Table, Tabled,
};

#[derive(Args, Debug)]
pub struct ChargeableCommand {
    #[command(flatten)]
    input: LedgerInput,

    /// Start date (YYYY-MM-DD), inclusive
    #[arg(long)]
    from: Option<NaiveDate>,

    /// End date (YYYY-MM-DD), inclusive
    #[arg(long)]
    to: Option<NaiveDate>,

    /// Tax charged on the period's total slices, apportioned across events
    #[arg(short, long)]
    tax: Option<Decimal>,

    /// Output as JSON instead of a formatted table
    #[arg(long)]
    json: bool,
}

impl ChargeableCommand {
    pub fn exec(&self) -> anyhow::Result<()> {
        let manager = AnalysisManager::new(self.input.read()?);
        let range = DateRange {
            start: self.from,
            end: self.to,
        };
        let analysis = manager.analysis(&range)?;

        let mut events = analysis.chargeable().clone();
        if let Some(tax) = self.tax {
            let total_slice = events.total_slice();
            events.apply_tax(tax, total_slice)?;
        }

        if self.json {
            self.print_json(&range, &events)?;
        } else {
            self.print_events(&range, &events);
        }

        Ok(())
    }

    fn print_events(&self, range: &DateRange, events: &ChargeableEvents) {
        if events.is_empty() {
            println!("No chargeable events found ({})", range);
            return;
        }

        println!();
        println!("CHARGEABLE EVENTS ({})", range);
        println!();

        let rows: Vec<ChargeableRow> = events
            .events()
            .iter()
            .map(|e| ChargeableRow {
                reference: format!("#{}", e.transaction()),
                date: e.date().format("%Y-%m-%d").to_string(),
                security: e.security().to_string(),
                gain: format_money(e.gain()),
                years: e.years().to_string(),
                slice: format_money(e.slice()),
                taxation: e.taxation().map_or("-".to_string(), format_money),
                tax_due: e.tax_due().map_or("-".to_string(), format_money),
            })
            .collect();
        let table = Table::new(rows)
            .with(Style::rounded())
            .with(Modify::new(Rows::new(1..)).with(Alignment::right()))
            .to_string();
        println!("{}", table);
        println!();

        println!("  Events:      {}", events.len());
        println!("  Total gains: {}", format_money(events.total_gains()));
        println!("  Total slice: {}", format_money(events.total_slice()));
        if let Some(taxation) = events.total_taxation() {
            println!("  Taxation:    {}", format_money(taxation));
        }
        if let Some(tax_due) = events.total_tax_due() {
            println!("  Tax due:     {}", format_money(tax_due));
        }
    }

    fn print_json(&self, range: &DateRange, events: &ChargeableEvents) -> anyhow::Result<()> {
        let output = JsonChargeable {
            from: range.start.map(|d| d.format("%Y-%m-%d").to_string()),
            to: range.end.map(|d| d.format("%Y-%m-%d").to_string()),
            events: events.events().iter().map(JsonEvent::new).collect(),
            total_gains: format_money(events.total_gains()),
            total_slice: format_money(events.total_slice()),
            total_taxation: events.total_taxation().map(format_money),
            total_tax_due: events.total_tax_due().map(format_money),
        };

        println!("{}", serde_json::to_string_pretty(&output)?);
        Ok(())
    }
}

#[derive(Debug, Tabled)]
struct ChargeableRow {
    #[tabled(rename = "#")]
    reference: String,
    #[tabled(rename = "Date")]
    date: String,
    #[tabled(rename = "Security")]
    security: String,
    #[tabled(rename = "Gain")]
    gain: String,
    #[tabled(rename = "Years")]
    years: String,
    #[tabled(rename = "Slice")]
    slice: String,
    #[tabled(rename = "Taxation")]
    taxation: String,
    #[tabled(rename = "Tax Due")]
    tax_due: String,
}

#[derive(Debug, Serialize)]
struct JsonChargeable {
    #[serde(skip_serializing_if = "Option::is_none")]
    from: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    to: Option<String>,
    events: Vec<JsonEvent>,
    total_gains: String,
    total_slice: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    total_taxation: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    total_tax_due: Option<String>,
}

#[derive(Debug, Serialize)]
struct JsonEvent {
    transaction: usize,
    date: String,
    security: String,
    gain: String,
    years: u32,
    slice: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    taxation: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tax_due: Option<String>,
}

impl JsonEvent {
    fn new(event: &ChargeableEvent) -> JsonEvent {
        JsonEvent {
            transaction: event.transaction(),
            date: event.date().format("%Y-%m-%d").to_string(),
            security: event.security().to_string(),
            gain: format_money(event.gain()),
            years: event.years(),
            slice: format_money(event.slice()),
            taxation: event.taxation().map(format_money),
            tax_due: event.tax_due().map(format_money),
        }
    }
}

fn format_money(amount: Decimal) -> String {
    format!("{:.2}", amount)
}
