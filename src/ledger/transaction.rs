use super::CsvField;
use chrono::NaiveDate;
use ledan_derive::CsvSchema;
use rust_decimal::Decimal;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A single double-entry record: money (and possibly units) moving from
/// the debit side to the credit side
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, CsvSchema)]
pub struct Transaction {
    /// Date the transaction occurred (YYYY-MM-DD)
    pub date: NaiveDate,
    /// Source of the money: account name, payee name, or holding as "portfolio:security"
    pub debit: String,
    /// Destination of the money: account name, payee name, or holding as "portfolio:security"
    pub credit: String,
    /// Category name, must exist in the ledger
    pub category: String,
    /// Amount in the reporting currency
    #[schemars(with = "f64")]
    pub amount: Decimal,
    /// Tax already deducted at source (e.g. PAYE on salary)
    #[serde(default)]
    #[schemars(with = "Option<f64>")]
    pub tax_credit: Option<Decimal>,
    /// Units leaving the debit holding
    #[serde(default)]
    #[schemars(with = "Option<f64>")]
    pub debit_units: Option<Decimal>,
    /// Units entering the credit holding
    #[serde(default)]
    #[schemars(with = "Option<f64>")]
    pub credit_units: Option<Decimal>,
    /// Fraction of value retained by the debit holding in a de-merger,
    /// exclusive between 0 and 1
    #[serde(default)]
    #[schemars(with = "Option<f64>")]
    pub dilution: Option<Decimal>,
    /// Complete years the disposed holding was held, for chargeable
    /// event gain slicing
    #[serde(default)]
    pub years: Option<u32>,
    /// Account receiving the cash element of a take-over
    #[serde(default)]
    pub account: Option<String>,
    /// Free-text note
    #[serde(default)]
    pub description: Option<String>,
}

/// A security held inside a portfolio account
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct HoldingRef {
    pub portfolio: String,
    pub security: String,
}

impl HoldingRef {
    pub fn key(&self) -> String {
        format!("{}:{}", self.portfolio, self.security)
    }
}

impl fmt::Display for HoldingRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.portfolio, self.security)
    }
}

/// Resolved debit or credit side of a transaction
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Owner {
    Account(String),
    Payee(String),
    Holding(HoldingRef),
}

impl fmt::Display for Owner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Owner::Account(name) | Owner::Payee(name) => f.write_str(name),
            Owner::Holding(h) => h.fmt(f),
        }
    }
}
