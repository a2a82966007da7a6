//! Summary command - income and spending over a period

use crate::analysis::{AnalysisManager, DateRange, FlowValues};
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
pub struct SummaryCommand {
    #[command(flatten)]
    input: LedgerInput,

    /// Start date (YYYY-MM-DD), inclusive
    #[arg(long)]
    from: Option<NaiveDate>,

    /// End date (YYYY-MM-DD), inclusive
    #[arg(long)]
    to: Option<NaiveDate>,

    /// Output as JSON instead of formatted tables
    #[arg(long)]
    json: bool,
}

impl SummaryCommand {
    pub fn exec(&self) -> anyhow::Result<()> {
        let manager = AnalysisManager::new(self.input.read()?);
        let range = DateRange {
            start: self.from,
            end: self.to,
        };
        let analysis = manager.analysis(&range)?;

        let categories: Vec<FlowLine> = analysis
            .categories()
            .iter()
            .filter(|(_, bucket)| !bucket.history().is_empty())
            .map(|(name, bucket)| FlowLine::new(name, bucket.delta()))
            .collect();
        let payees: Vec<FlowLine> = analysis
            .payees()
            .iter()
            .filter(|(_, bucket)| !bucket.history().is_empty())
            .map(|(name, bucket)| FlowLine::new(name, bucket.delta()))
            .collect();
        let tax_bases: Vec<BasisLine> = analysis
            .tax_bases()
            .iter()
            .filter(|(_, bucket)| !bucket.history().is_empty())
            .map(|(basis, bucket)| {
                let values = bucket.delta();
                BasisLine {
                    basis: basis.to_string(),
                    gross: values.gross,
                    nett: values.nett,
                }
            })
            .collect();

        let summary = Summary {
            range,
            currency: analysis.currency().to_string(),
            income: categories.iter().map(|c| c.income).sum(),
            expense: categories.iter().map(|c| c.expense).sum(),
            categories,
            payees,
            tax_bases,
        };

        if self.json {
            print_json(&summary)?;
        } else {
            print_summary(&summary);
        }

        Ok(())
    }
}

struct Summary {
    range: DateRange,
    currency: String,
    categories: Vec<FlowLine>,
    payees: Vec<FlowLine>,
    tax_bases: Vec<BasisLine>,
    income: Decimal,
    expense: Decimal,
}

struct FlowLine {
    name: String,
    income: Decimal,
    expense: Decimal,
    net: Decimal,
}

impl FlowLine {
    fn new(name: &str, values: FlowValues) -> FlowLine {
        FlowLine {
            name: name.to_string(),
            income: values.income,
            expense: values.expense,
            net: values.net(),
        }
    }
}

struct BasisLine {
    basis: String,
    gross: Decimal,
    nett: Decimal,
}

fn print_summary(summary: &Summary) {
    println!();
    println!("SUMMARY ({}, {})", summary.range, summary.currency);
    println!();

    println!("CATEGORIES");
    if summary.categories.is_empty() {
        println!("  (none)");
    } else {
        let rows: Vec<CategoryRow> = summary
            .categories
            .iter()
            .map(|l| CategoryRow {
                category: l.name.clone(),
                income: format_money(l.income),
                expense: format_money(l.expense),
                net: format_money(l.net),
            })
            .collect();
        println!("{}", flow_table(rows));
    }
    println!();

    println!("PAYEES");
    if summary.payees.is_empty() {
        println!("  (none)");
    } else {
        let rows: Vec<PayeeRow> = summary
            .payees
            .iter()
            .map(|l| PayeeRow {
                payee: l.name.clone(),
                income: format_money(l.income),
                expense: format_money(l.expense),
                net: format_money(l.net),
            })
            .collect();
        println!("{}", flow_table(rows));
    }
    println!();

    println!("TAX BASES");
    if summary.tax_bases.is_empty() {
        println!("  (none)");
    } else {
        let rows: Vec<BasisRow> = summary
            .tax_bases
            .iter()
            .map(|b| BasisRow {
                basis: b.basis.clone(),
                gross: format_money(b.gross),
                nett: format_money(b.nett),
            })
            .collect();
        println!("{}", flow_table(rows));
    }
    println!();

    println!("  Income:  {}", format_money(summary.income));
    println!("  Expense: {}", format_money(summary.expense));
    println!("  Net:     {}", format_money(summary.income - summary.expense));
}

fn flow_table<R: Tabled>(rows: Vec<R>) -> String {
    Table::new(rows)
        .with(Style::rounded())
        .with(Modify::new(Rows::new(1..)).with(Alignment::right()))
        .to_string()
}

fn print_json(summary: &Summary) -> anyhow::Result<()> {
    let output = JsonSummary {
        from: summary.range.start.map(|d| d.format("%Y-%m-%d").to_string()),
        to: summary.range.end.map(|d| d.format("%Y-%m-%d").to_string()),
        currency: summary.currency.clone(),
        categories: summary.categories.iter().map(JsonFlow::new).collect(),
        payees: summary.payees.iter().map(JsonFlow::new).collect(),
        tax_bases: summary
            .tax_bases
            .iter()
            .map(|b| JsonBasis {
                basis: b.basis.clone(),
                gross: format_money(b.gross),
                nett: format_money(b.nett),
            })
            .collect(),
        income: format_money(summary.income),
        expense: format_money(summary.expense),
        net: format_money(summary.income - summary.expense),
    };

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

#[derive(Debug, Tabled)]
struct CategoryRow {
    #[tabled(rename = "Category")]
    category: String,
    #[tabled(rename = "Income")]
    income: String,
    #[tabled(rename = "Expense")]
    expense: String,
    #[tabled(rename = "Net")]
    net: String,
}

#[derive(Debug, Tabled)]
struct PayeeRow {
    #[tabled(rename = "Payee")]
    payee: String,
    #[tabled(rename = "Income")]
    income: String,
    #[tabled(rename = "Expense")]
    expense: String,
    #[tabled(rename = "Net")]
    net: String,
}

#[derive(Debug, Tabled)]
struct BasisRow {
    #[tabled(rename = "Basis")]
    basis: String,
    #[tabled(rename = "Gross")]
    gross: String,
    #[tabled(rename = "Nett")]
    nett: String,
}

#[derive(Debug, Serialize)]
struct JsonSummary {
    #[serde(skip_serializing_if = "Option::is_none")]
    from: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    to: Option<String>,
    currency: String,
    categories: Vec<JsonFlow>,
    payees: Vec<JsonFlow>,
    tax_bases: Vec<JsonBasis>,
    income: String,
    expense: String,
    net: String,
}

#[derive(Debug, Serialize)]
struct JsonFlow {
    name: String,
    income: String,
    expense: String,
    net: String,
}

impl JsonFlow {
    fn new(line: &FlowLine) -> JsonFlow {
        JsonFlow {
            name: line.name.clone(),
            income: format_money(line.income),
            expense: format_money(line.expense),
            net: format_money(line.net),
        }
    }
}

#[derive(Debug, Serialize)]
struct JsonBasis {
    basis: String,
    gross: String,
    nett: String,
}

fn format_money(amount: Decimal) -> String {
    format!("{:.2}", amount)
}
