//! Report command - net worth statement at a date

use crate::analysis::{holding_value, AnalysisManager, DateRange};
use crate::cmd::LedgerInput;
use crate::ledger::AccountClass;
use chrono::{Local, NaiveDate};
use clap::Args;
use rust_decimal::Decimal;
use serde::Serialize;
use tabled::{
    settings::{object::Rows, Alignment, Modify, Style},
    Table, Tabled,
};

#[derive(Args, Debug)]
pub struct ReportCommand {
    #[command(flatten)]
    input: LedgerInput,

    /// Report date (YYYY-MM-DD). Defaults to today.
    #[arg(short, long)]
    date: Option<NaiveDate>,

    /// Output as JSON instead of formatted tables
    #[arg(long)]
    json: bool,
}

impl ReportCommand {
    pub fn exec(&self) -> anyhow::Result<()> {
        let manager = AnalysisManager::new(self.input.read()?);
        let date = self.date.unwrap_or_else(|| Local::now().date_naive());

        let analysis = manager.analysis(&DateRange::all())?;
        let at = analysis.snapshot_at(date);
        let ledger = manager.ledger();

        let mut accounts = Vec::new();
        for (name, bucket) in at.accounts() {
            if bucket.history().is_empty() {
                continue;
            }
            let account = ledger.account(name)?;
            let values = bucket.values();
            accounts.push(AccountLine {
                name: name.clone(),
                class: account.class,
                balance: values.valuation,
                rate: values.rate,
                maturity: values.maturity,
            });
        }

        let mut portfolios = Vec::new();
        for (name, bucket) in at.portfolios() {
            if bucket.history().is_empty() {
                continue;
            }
            let mut value = Decimal::ZERO;
            for (holding, held) in at.holdings() {
                if holding.portfolio != *name {
                    continue;
                }
                let security = ledger.security(&holding.security)?;
                value += holding_value(&ledger, security, held.values().units, date)?;
            }
            let values = bucket.values();
            portfolios.push(PortfolioLine {
                name: name.clone(),
                cost: values.cost,
                gains: values.gains,
                dividends: values.dividend,
                value,
            });
        }

        let report = Report {
            date,
            currency: at.currency().to_string(),
            account_total: accounts.iter().map(|a| a.balance).sum(),
            portfolio_total: portfolios.iter().map(|p| p.value).sum(),
            accounts,
            portfolios,
        };

        if self.json {
            print_json(&report)?;
        } else {
            print_report(&report);
        }

        Ok(())
    }
}

struct Report {
    date: NaiveDate,
    currency: String,
    accounts: Vec<AccountLine>,
    portfolios: Vec<PortfolioLine>,
    account_total: Decimal,
    portfolio_total: Decimal,
}

impl Report {
    fn net_worth(&self) -> Decimal {
        self.account_total + self.portfolio_total
    }
}

struct AccountLine {
    name: String,
    class: AccountClass,
    balance: Decimal,
    rate: Option<Decimal>,
    maturity: Option<NaiveDate>,
}

struct PortfolioLine {
    name: String,
    cost: Decimal,
    gains: Decimal,
    dividends: Decimal,
    value: Decimal,
}

fn print_report(report: &Report) {
    println!();
    println!("NET WORTH as at {} ({})", report.date, report.currency);
    println!();

    println!("ACCOUNTS");
    if report.accounts.is_empty() {
        println!("  (no accounts)");
    } else {
        let rows: Vec<AccountRow> = report
            .accounts
            .iter()
            .map(|a| AccountRow {
                account: a.name.clone(),
                class: class_name(a.class),
                balance: format_money(a.balance),
                rate: a.rate.map_or(String::new(), format_rate),
                maturity: a
                    .maturity
                    .map_or(String::new(), |d| d.format("%Y-%m-%d").to_string()),
            })
            .collect();
        let table = Table::new(rows)
            .with(Style::rounded())
            .with(Modify::new(Rows::new(1..)).with(Alignment::right()))
            .to_string();
        println!("{}", table);
    }
    println!();

    println!("PORTFOLIOS");
    if report.portfolios.is_empty() {
        println!("  (no portfolios)");
    } else {
        let rows: Vec<PortfolioRow> = report
            .portfolios
            .iter()
            .map(|p| PortfolioRow {
                portfolio: p.name.clone(),
                cost: format_money(p.cost),
                gains: format_money(p.gains),
                dividends: format_money(p.dividends),
                value: format_money(p.value),
            })
            .collect();
        let table = Table::new(rows)
            .with(Style::rounded())
            .with(Modify::new(Rows::new(1..)).with(Alignment::right()))
            .to_string();
        println!("{}", table);
    }
    println!();

    println!("  Accounts:   {}", format_money(report.account_total));
    println!("  Portfolios: {}", format_money(report.portfolio_total));
    println!("  Net worth:  {}", format_money(report.net_worth()));
}

fn print_json(report: &Report) -> anyhow::Result<()> {
    let output = JsonReport {
        date: report.date.format("%Y-%m-%d").to_string(),
        currency: report.currency.clone(),
        accounts: report
            .accounts
            .iter()
            .map(|a| JsonAccount {
                name: a.name.clone(),
                class: class_name(a.class),
                balance: format_money(a.balance),
                rate: a.rate.map(|r| r.to_string()),
                maturity: a.maturity.map(|d| d.format("%Y-%m-%d").to_string()),
            })
            .collect(),
        portfolios: report
            .portfolios
            .iter()
            .map(|p| JsonPortfolio {
                name: p.name.clone(),
                cost: format_money(p.cost),
                gains: format_money(p.gains),
                dividends: format_money(p.dividends),
                value: format_money(p.value),
            })
            .collect(),
        account_total: format_money(report.account_total),
        portfolio_total: format_money(report.portfolio_total),
        net_worth: format_money(report.net_worth()),
    };

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

#[derive(Debug, Tabled)]
struct AccountRow {
    #[tabled(rename = "Account")]
    account: String,
    #[tabled(rename = "Class")]
    class: String,
    #[tabled(rename = "Balance")]
    balance: String,
    #[tabled(rename = "Rate")]
    rate: String,
    #[tabled(rename = "Maturity")]
    maturity: String,
}

#[derive(Debug, Tabled)]
struct PortfolioRow {
    #[tabled(rename = "Portfolio")]
    portfolio: String,
    #[tabled(rename = "Cost")]
    cost: String,
    #[tabled(rename = "Gains")]
    gains: String,
    #[tabled(rename = "Dividends")]
    dividends: String,
    #[tabled(rename = "Value")]
    value: String,
}

#[derive(Debug, Serialize)]
struct JsonReport {
    date: String,
    currency: String,
    accounts: Vec<JsonAccount>,
    portfolios: Vec<JsonPortfolio>,
    account_total: String,
    portfolio_total: String,
    net_worth: String,
}

#[derive(Debug, Serialize)]
struct JsonAccount {
    name: String,
    class: String,
    balance: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    rate: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    maturity: Option<String>,
}

#[derive(Debug, Serialize)]
struct JsonPortfolio {
    name: String,
    cost: String,
    gains: String,
    dividends: String,
    value: String,
}

fn class_name(class: AccountClass) -> String {
    match class {
        AccountClass::Deposit => "Deposit",
        AccountClass::Cash => "Cash",
        AccountClass::Loan => "Loan",
        AccountClass::Portfolio => "Portfolio",
    }
    .to_string()
}

fn format_money(amount: Decimal) -> String {
    format!("{:.2}", amount)
}

fn format_rate(rate: Decimal) -> String {
    format!("{:.2}%", rate * Decimal::ONE_HUNDRED)
}
