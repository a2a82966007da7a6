//! Holdings command - per-holding positions and valuations

use crate::analysis::{holding_value, AnalysisManager, DateRange};
use crate::cmd::LedgerInput;
use chrono::{Local, NaiveDate};
use clap::Args;
use rust_decimal::Decimal;
use serde::Serialize;
use tabled::{
    settings::{object::Rows, Alignment, Modify, Style},
    Table, Tabled,
};

#[derive(Args, Debug)]
pub struct HoldingsCommand {
    #[command(flatten)]
    input: LedgerInput,

    /// Valuation date (YYYY-MM-DD). Defaults to today.
    #[arg(short, long)]
    date: Option<NaiveDate>,

    /// Filter by portfolio account
    #[arg(short, long)]
    portfolio: Option<String>,

    /// Filter by security (e.g. VOD, BT)
    #[arg(short, long)]
    security: Option<String>,

    /// Output as JSON instead of a formatted table
    #[arg(long)]
    json: bool,
}

impl HoldingsCommand {
    pub fn exec(&self) -> anyhow::Result<()> {
        let manager = AnalysisManager::new(self.input.read()?);
        let date = self.date.unwrap_or_else(|| Local::now().date_naive());

        let analysis = manager.analysis(&DateRange::all())?;
        let at = analysis.snapshot_at(date);
        let ledger = manager.ledger();

        let mut holdings = Vec::new();
        for (holding, bucket) in at.holdings() {
            if bucket.history().is_empty() {
                continue;
            }
            if let Some(portfolio) = &self.portfolio {
                if !holding.portfolio.eq_ignore_ascii_case(portfolio) {
                    continue;
                }
            }
            if let Some(security) = &self.security {
                if !holding.security.eq_ignore_ascii_case(security) {
                    continue;
                }
            }
            let security = ledger.security(&holding.security)?;
            let values = bucket.values();
            let value = holding_value(&ledger, security, values.units, date)?;
            holdings.push(HoldingLine {
                portfolio: holding.portfolio.clone(),
                security: holding.security.clone(),
                units: values.units,
                cost: values.cost,
                invested: values.invested,
                gains: values.gains,
                dividends: values.dividend,
                value,
            });
        }

        if self.json {
            self.print_json(date, at.currency(), &holdings)?;
        } else {
            self.print_holdings(date, at.currency(), &holdings);
        }

        Ok(())
    }

    fn print_holdings(&self, date: NaiveDate, currency: &str, holdings: &[HoldingLine]) {
        if holdings.is_empty() {
            println!("No holdings found matching filters");
            return;
        }

        println!();
        println!("HOLDINGS as at {} ({})", date, currency);
        println!();

        let rows: Vec<HoldingRow> = holdings
            .iter()
            .map(|h| HoldingRow {
                portfolio: h.portfolio.clone(),
                security: h.security.clone(),
                units: format_units(h.units),
                cost: format_money(h.cost),
                invested: format_money(h.invested),
                gains: format_money(h.gains),
                dividends: format_money(h.dividends),
                value: format_money(h.value),
            })
            .collect();
        let table = Table::new(rows)
            .with(Style::rounded())
            .with(Modify::new(Rows::new(1..)).with(Alignment::right()))
            .to_string();
        println!("{}", table);
        println!();

        let cost: Decimal = holdings.iter().map(|h| h.cost).sum();
        let value: Decimal = holdings.iter().map(|h| h.value).sum();
        println!("  Cost:  {}", format_money(cost));
        println!("  Value: {}", format_money(value));
    }

    fn print_json(
        &self,
        date: NaiveDate,
        currency: &str,
        holdings: &[HoldingLine],
    ) -> anyhow::Result<()> {
        let output = JsonHoldings {
            date: date.format("%Y-%m-%d").to_string(),
            currency: currency.to_string(),
            holdings: holdings
                .iter()
                .map(|h| JsonHolding {
                    portfolio: h.portfolio.clone(),
                    security: h.security.clone(),
                    units: format_units(h.units),
                    cost: format_money(h.cost),
                    invested: format_money(h.invested),
                    gains: format_money(h.gains),
                    dividends: format_money(h.dividends),
                    value: format_money(h.value),
                })
                .collect(),
            total_cost: format_money(holdings.iter().map(|h| h.cost).sum()),
            total_value: format_money(holdings.iter().map(|h| h.value).sum()),
        };

        println!("{}", serde_json::to_string_pretty(&output)?);
        Ok(())
    }
}

struct HoldingLine {
    portfolio: String,
    security: String,
    units: Decimal,
    cost: Decimal,
    invested: Decimal,
    gains: Decimal,
    dividends: Decimal,
    value: Decimal,
}

#[derive(Debug, Tabled)]
struct HoldingRow {
    #[tabled(rename = "Portfolio")]
    portfolio: String,
    #[tabled(rename = "Security")]
    security: String,
    #[tabled(rename = "Units")]
    units: String,
    #[tabled(rename = "Cost")]
    cost: String,
    #[tabled(rename = "Invested")]
    invested: String,
    #[tabled(rename = "Gains")]
    gains: String,
    #[tabled(rename = "Dividends")]
    dividends: String,
    #[tabled(rename = "Value")]
    value: String,
}

#[derive(Debug, Serialize)]
struct JsonHoldings {
    date: String,
    currency: String,
    holdings: Vec<JsonHolding>,
    total_cost: String,
    total_value: String,
}

#[derive(Debug, Serialize)]
struct JsonHolding {
    portfolio: String,
    security: String,
    units: String,
    cost: String,
    invested: String,
    gains: String,
    dividends: String,
    value: String,
}

fn format_money(amount: Decimal) -> String {
    format!("{:.2}", amount)
}

fn format_units(units: Decimal) -> String {
    let s = format!("{:.6}", units);
    let trimmed = s.trim_end_matches('0').trim_end_matches('.');
    trimmed.to_string()
}
