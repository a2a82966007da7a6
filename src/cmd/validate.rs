//! Validate command - surface data quality issues without a full report

use crate::cmd::LedgerInput;
use crate::ledger::{Ledger, Owner};
use clap::Args;
use serde::Serialize;
use std::collections::BTreeSet;

#[derive(Args, Debug)]
pub struct ValidateCommand {
    #[command(flatten)]
    input: LedgerInput,

    /// Output as JSON instead of formatted text
    #[arg(long)]
    json: bool,
}

/// A data quality issue for output
#[derive(Debug, Clone, Serialize)]
struct ValidationIssue {
    #[serde(rename = "type")]
    issue_type: String,
    security: String,
    message: String,
}

#[derive(Debug, Serialize)]
struct ValidationOutput {
    issue_count: usize,
    issues: Vec<ValidationIssue>,
}

impl ValidateCommand {
    pub fn exec(&self) -> anyhow::Result<()> {
        let ledger = self.input.read()?;
        let issues = collect_issues(&ledger)?;

        if self.json {
            self.print_json(&issues)?;
        } else {
            self.print_text(&issues);
        }

        // Exit with code 1 if issues found
        if !issues.is_empty() {
            std::process::exit(1);
        }
        Ok(())
    }

    fn print_text(&self, issues: &[ValidationIssue]) {
        println!();
        println!("VALIDATION RESULTS");
        println!();

        if issues.is_empty() {
            println!("\u{2713} No issues found.");
        } else {
            println!("\u{26A0} {} issue(s) found:", issues.len());
            println!();

            for (i, issue) in issues.iter().enumerate() {
                println!("  {}. [{}] {}", i + 1, issue.issue_type, issue.security);
                println!("     {}", issue.message);
                println!();
            }
        }
    }

    fn print_json(&self, issues: &[ValidationIssue]) -> anyhow::Result<()> {
        let output = ValidationOutput {
            issue_count: issues.len(),
            issues: issues.to_vec(),
        };

        println!("{}", serde_json::to_string_pretty(&output)?);
        Ok(())
    }
}

/// Check that every held security can be valued: at least one price, and an
/// exchange rate for securities priced in a foreign currency
fn collect_issues(ledger: &Ledger) -> anyhow::Result<Vec<ValidationIssue>> {
    let mut held = BTreeSet::new();
    for tx in &ledger.transactions {
        for side in [&tx.debit, &tx.credit] {
            if let Owner::Holding(holding) = ledger.resolve_owner(side)? {
                held.insert(holding.security);
            }
        }
    }

    let mut issues = Vec::new();
    for name in &held {
        let security = ledger.security(name)?;
        if !ledger.prices.iter().any(|p| p.security == *name) {
            issues.push(ValidationIssue {
                issue_type: "MissingPrice".to_string(),
                security: name.clone(),
                message: format!("no price recorded for held security {}", name),
            });
        }
        if let Some(currency) = &security.currency {
            if currency != ledger.currency() && !ledger.rates.iter().any(|r| r.currency == *currency)
            {
                issues.push(ValidationIssue {
                    issue_type: "MissingRate".to_string(),
                    security: name.clone(),
                    message: format!(
                        "{} is priced in {} but no exchange rate is recorded",
                        name, currency
                    ),
                });
            }
        }
    }

    Ok(issues)
}
