use super::CsvField;
use chrono::NaiveDate;
use ledan_derive::CsvSchema;
use rust_decimal::Decimal;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Quoted price for one unit of a security on a date
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, CsvSchema)]
pub struct SecurityPrice {
    /// Date the price applies from (YYYY-MM-DD)
    pub date: NaiveDate,
    /// Security name, must exist in the ledger
    pub security: String,
    /// Price per unit in the security's own currency
    #[schemars(with = "f64")]
    pub price: Decimal,
}

/// Exchange rate into the reporting currency on a date
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, CsvSchema)]
pub struct ExchangeRate {
    /// Date the rate applies from (YYYY-MM-DD)
    pub date: NaiveDate,
    /// Foreign currency code (e.g. "USD")
    pub currency: String,
    /// Reporting-currency value of one unit of the foreign currency
    #[schemars(with = "f64")]
    pub rate: Decimal,
}
