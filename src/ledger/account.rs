use chrono::NaiveDate;
use rust_decimal::Decimal;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Behavioural class of an account
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub enum AccountClass {
    /// Bank or building society account holding cash
    #[default]
    Deposit,
    /// Physical cash (wallet, float)
    Cash,
    /// Borrowed money, carries a negative balance
    Loan,
    /// Container for security holdings (ISA, SIPP, dealing account)
    Portfolio,
}

impl AccountClass {
    pub fn is_portfolio(&self) -> bool {
        matches!(self, AccountClass::Portfolio)
    }
}

/// A place money is held
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct Account {
    /// Unique account name
    pub name: String,
    /// Behavioural class
    #[serde(default)]
    pub class: AccountClass,
    /// Institution payee that operates this account
    #[serde(default)]
    pub parent: Option<String>,
    /// Category to book postings against instead of the account balance.
    /// Used for accounts that exist only to route spending (e.g. a joint
    /// household account treated as an expense).
    #[serde(default)]
    pub auto_expense: Option<String>,
    /// Annual interest rate, informational
    #[serde(default)]
    #[schemars(with = "Option<f64>")]
    pub rate: Option<Decimal>,
    /// Maturity date for fixed-term accounts, informational
    #[serde(default)]
    pub maturity: Option<NaiveDate>,
}

/// Distinguished role a payee can play
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub enum PayeeRole {
    /// Ordinary counterparty
    #[default]
    Default,
    /// Bank or provider that operates accounts
    Institution,
    /// Market counterparty for security trades
    Market,
    /// Tax authority, receives tax credits
    TaxMan,
    /// Source of opening balances
    OpeningBalance,
}

/// An external party money flows to or from
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct Payee {
    /// Unique payee name
    pub name: String,
    /// Distinguished role, if any
    #[serde(default)]
    pub role: PayeeRole,
}

/// Class of a tradeable security
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub enum SecurityClass {
    /// Exchange-listed shares
    #[default]
    Shares,
    /// Open-ended fund units
    UnitTrust,
    /// Insurance bond, disposals produce chargeable event gains
    LifeBond,
}

impl SecurityClass {
    pub fn is_life_bond(&self) -> bool {
        matches!(self, SecurityClass::LifeBond)
    }
}

/// A tradeable instrument that can be held inside a portfolio
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct Security {
    /// Unique security name (ticker or fund name)
    pub name: String,
    /// Class of instrument
    #[serde(default)]
    pub class: SecurityClass,
    /// Currency the security is priced in; omit for the ledger's
    /// reporting currency
    #[serde(default)]
    pub currency: Option<String>,
}
