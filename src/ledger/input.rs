use super::account::{Account, Payee, Security};
use super::category::Category;
use super::market::{ExchangeRate, SecurityPrice};
use super::transaction::Transaction;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::io::Read;

fn default_currency() -> String {
    "GBP".to_string()
}

/// Input root for ledger JSON
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct LedgerFile {
    /// Reporting currency code
    #[serde(default = "default_currency")]
    pub currency: String,
    /// External parties
    #[serde(default)]
    pub payees: Vec<Payee>,
    /// Accounts money is held in
    #[serde(default)]
    pub accounts: Vec<Account>,
    /// Transaction categories
    #[serde(default)]
    pub categories: Vec<Category>,
    /// Tradeable securities
    #[serde(default)]
    pub securities: Vec<Security>,
    /// Double-entry records
    #[serde(default)]
    pub transactions: Vec<Transaction>,
    /// Security prices
    #[serde(default)]
    pub prices: Vec<SecurityPrice>,
    /// Exchange rates into the reporting currency
    #[serde(default)]
    pub rates: Vec<ExchangeRate>,
}

/// Read a complete ledger from JSON
pub fn read_ledger_json<R: Read>(reader: R) -> anyhow::Result<LedgerFile> {
    let file: LedgerFile = serde_json::from_reader(reader)?;
    Ok(file)
}

/// Read transactions from CSV, one record per row
pub fn read_transactions_csv<R: Read>(reader: R) -> anyhow::Result<Vec<Transaction>> {
    let mut rdr = csv::Reader::from_reader(reader);
    let mut transactions = Vec::new();
    for result in rdr.deserialize() {
        let tx: Transaction = result?;
        transactions.push(tx);
    }
    Ok(transactions)
}

/// Read security prices from CSV
pub fn read_prices_csv<R: Read>(reader: R) -> anyhow::Result<Vec<SecurityPrice>> {
    let mut rdr = csv::Reader::from_reader(reader);
    let mut prices = Vec::new();
    for result in rdr.deserialize() {
        let price: SecurityPrice = result?;
        prices.push(price);
    }
    Ok(prices)
}

/// Read exchange rates from CSV
pub fn read_rates_csv<R: Read>(reader: R) -> anyhow::Result<Vec<ExchangeRate>> {
    let mut rdr = csv::Reader::from_reader(reader);
    let mut rates = Vec::new();
    for result in rdr.deserialize() {
        let rate: ExchangeRate = result?;
        rates.push(rate);
    }
    Ok(rates)
}
