pub mod account;
pub mod category;
pub mod input;
pub mod market;
pub mod transaction;

// Flat public surface for domain types and functions.
pub use account::{Account, AccountClass, Payee, PayeeRole, Security, SecurityClass};
pub use category::{Category, CategoryClass, TaxBasis};
pub use input::{
    read_ledger_json, read_prices_csv, read_rates_csv, read_transactions_csv, LedgerFile,
};
pub use market::{ExchangeRate, SecurityPrice};
pub use transaction::{HoldingRef, Owner, Transaction};

use chrono::NaiveDate;
use rust_decimal::Decimal;
use std::collections::HashMap;

/// One column of a CSV input stream, as reported by `schema csv-fields`.
/// `kind` is the value kind read off the field type: date, decimal,
/// integer or text.
#[derive(Debug, Clone, Copy)]
pub struct CsvField {
    pub name: &'static str,
    pub kind: &'static str,
    pub required: bool,
    pub description: &'static str,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum LedgerError {
    #[error("duplicate name: {0}")]
    DuplicateName(String),
    #[error("unknown account: {0}")]
    UnknownAccount(String),
    #[error("unknown payee: {0}")]
    UnknownPayee(String),
    #[error("unknown category: {0}")]
    UnknownCategory(String),
    #[error("unknown security: {0}")]
    UnknownSecurity(String),
    #[error("debit or credit is neither account, payee nor holding: {0}")]
    UnknownOwner(String),
    #[error("holding owner is not a portfolio account: {0}")]
    NotAPortfolio(String),
    #[error("no payee with role {0:?}")]
    MissingSingularPayee(PayeeRole),
    #[error("more than one payee with role {0:?}")]
    DuplicateSingularPayee(PayeeRole),
    #[error("account has no parent institution: {0}")]
    MissingParent(String),
    #[error("dilution must be between 0 and 1 exclusive, got {dilution}: {date}")]
    InvalidDilution { date: NaiveDate, dilution: Decimal },
    #[error("take-over requires credit units: {0}")]
    MissingTakeOverUnits(NaiveDate),
}

/// Validated ledger: reference data keyed by name, transactions and market
/// data sorted by date
#[derive(Debug)]
pub struct Ledger {
    currency: String,
    accounts: HashMap<String, Account>,
    payees: HashMap<String, Payee>,
    categories: HashMap<String, Category>,
    securities: HashMap<String, Security>,
    pub transactions: Vec<Transaction>,
    pub prices: Vec<SecurityPrice>,
    pub rates: Vec<ExchangeRate>,
}

impl Ledger {
    /// Validate an input file and build the ledger.
    ///
    /// Accounts and payees share one namespace since either can appear as a
    /// transaction's debit or credit. Every reference in every transaction
    /// must resolve.
    pub fn build(file: LedgerFile) -> Result<Self, LedgerError> {
        let mut payees = HashMap::new();
        for payee in file.payees {
            let name = payee.name.clone();
            if payees.insert(name.clone(), payee).is_some() {
                return Err(LedgerError::DuplicateName(name));
            }
        }

        let mut accounts = HashMap::new();
        for account in file.accounts {
            let name = account.name.clone();
            if payees.contains_key(&name) || accounts.insert(name.clone(), account).is_some() {
                return Err(LedgerError::DuplicateName(name));
            }
        }

        let mut categories = HashMap::new();
        for category in file.categories {
            let name = category.name.clone();
            if categories.insert(name.clone(), category).is_some() {
                return Err(LedgerError::DuplicateName(name));
            }
        }

        let mut securities = HashMap::new();
        for security in file.securities {
            let name = security.name.clone();
            if securities.insert(name.clone(), security).is_some() {
                return Err(LedgerError::DuplicateName(name));
            }
        }

        let mut ledger = Ledger {
            currency: file.currency,
            accounts,
            payees,
            categories,
            securities,
            transactions: Vec::new(),
            prices: Vec::new(),
            rates: Vec::new(),
        };

        for account in ledger.accounts.values() {
            if let Some(parent) = &account.parent {
                if !ledger.payees.contains_key(parent) {
                    return Err(LedgerError::UnknownPayee(parent.clone()));
                }
            }
            if let Some(auto_expense) = &account.auto_expense {
                if !ledger.categories.contains_key(auto_expense) {
                    return Err(LedgerError::UnknownCategory(auto_expense.clone()));
                }
            }
        }

        for tx in &file.transactions {
            ledger.resolve_owner(&tx.debit)?;
            ledger.resolve_owner(&tx.credit)?;
            if let Some(account) = &tx.account {
                ledger.account(account)?;
            }
            let category = ledger.category(&tx.category)?;
            match category.class {
                CategoryClass::StockDeMerger => {
                    let dilution = tx.dilution.unwrap_or(Decimal::ZERO);
                    if dilution <= Decimal::ZERO || dilution >= Decimal::ONE {
                        return Err(LedgerError::InvalidDilution {
                            date: tx.date,
                            dilution,
                        });
                    }
                }
                CategoryClass::StockTakeOver => {
                    if tx.credit_units.is_none() {
                        return Err(LedgerError::MissingTakeOverUnits(tx.date));
                    }
                }
                _ => {}
            }
        }

        for price in &file.prices {
            ledger.security(&price.security)?;
        }

        let mut transactions = file.transactions;
        transactions.sort_by_key(|t| t.date);
        ledger.transactions = transactions;

        let mut prices = file.prices;
        prices.sort_by_key(|p| p.date);
        ledger.prices = prices;

        let mut rates = file.rates;
        rates.sort_by_key(|r| r.date);
        ledger.rates = rates;

        Ok(ledger)
    }

    pub fn currency(&self) -> &str {
        &self.currency
    }

    pub fn account(&self, name: &str) -> Result<&Account, LedgerError> {
        self.accounts
            .get(name)
            .ok_or_else(|| LedgerError::UnknownAccount(name.to_string()))
    }

    pub fn payee(&self, name: &str) -> Result<&Payee, LedgerError> {
        self.payees
            .get(name)
            .ok_or_else(|| LedgerError::UnknownPayee(name.to_string()))
    }

    pub fn category(&self, name: &str) -> Result<&Category, LedgerError> {
        self.categories
            .get(name)
            .ok_or_else(|| LedgerError::UnknownCategory(name.to_string()))
    }

    pub fn security(&self, name: &str) -> Result<&Security, LedgerError> {
        self.securities
            .get(name)
            .ok_or_else(|| LedgerError::UnknownSecurity(name.to_string()))
    }

    pub fn accounts(&self) -> &HashMap<String, Account> {
        &self.accounts
    }

    pub fn securities(&self) -> &HashMap<String, Security> {
        &self.securities
    }

    /// Resolve a transaction's debit or credit reference.
    ///
    /// A name containing ':' is a holding reference "portfolio:security";
    /// otherwise accounts are tried before payees.
    pub fn resolve_owner(&self, name: &str) -> Result<Owner, LedgerError> {
        if let Some((portfolio, security)) = name.split_once(':') {
            let account = self.account(portfolio)?;
            if !account.class.is_portfolio() {
                return Err(LedgerError::NotAPortfolio(portfolio.to_string()));
            }
            self.security(security)?;
            return Ok(Owner::Holding(HoldingRef {
                portfolio: portfolio.to_string(),
                security: security.to_string(),
            }));
        }
        if self.accounts.contains_key(name) {
            Ok(Owner::Account(name.to_string()))
        } else if self.payees.contains_key(name) {
            Ok(Owner::Payee(name.to_string()))
        } else {
            Err(LedgerError::UnknownOwner(name.to_string()))
        }
    }

    /// The unique payee carrying a distinguished role
    pub fn singular_payee(&self, role: PayeeRole) -> Result<&Payee, LedgerError> {
        let mut found = None;
        for payee in self.payees.values() {
            if payee.role == role {
                if found.is_some() {
                    return Err(LedgerError::DuplicateSingularPayee(role));
                }
                found = Some(payee);
            }
        }
        found.ok_or(LedgerError::MissingSingularPayee(role))
    }

    /// The institution payee that operates an account
    pub fn parent_payee(&self, account: &Account) -> Result<&Payee, LedgerError> {
        let parent = account
            .parent
            .as_ref()
            .ok_or_else(|| LedgerError::MissingParent(account.name.clone()))?;
        self.payee(parent)
    }

    /// Latest price for a security at or before a date
    pub fn price_on(&self, security: &str, date: NaiveDate) -> Option<(NaiveDate, Decimal)> {
        self.prices
            .iter()
            .filter(|p| p.security == security && p.date <= date)
            .map(|p| (p.date, p.price))
            .last()
    }

    /// Latest exchange rate for a currency at or before a date
    pub fn rate_on(&self, currency: &str, date: NaiveDate) -> Option<(NaiveDate, Decimal)> {
        self.rates
            .iter()
            .filter(|r| r.currency == currency && r.date <= date)
            .map(|r| (r.date, r.rate))
            .last()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn date(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    fn account(name: &str, class: AccountClass) -> Account {
        Account {
            name: name.to_string(),
            class,
            parent: None,
            auto_expense: None,
            rate: None,
            maturity: None,
        }
    }

    fn payee(name: &str, role: PayeeRole) -> Payee {
        Payee {
            name: name.to_string(),
            role,
        }
    }

    fn category(name: &str, class: CategoryClass) -> Category {
        Category {
            name: name.to_string(),
            class,
        }
    }

    fn security(name: &str) -> Security {
        Security {
            name: name.to_string(),
            class: SecurityClass::Shares,
            currency: None,
        }
    }

    fn transaction(date_s: &str, debit: &str, credit: &str, cat: &str, amount: Decimal) -> Transaction {
        Transaction {
            date: date(date_s),
            debit: debit.to_string(),
            credit: credit.to_string(),
            category: cat.to_string(),
            amount,
            tax_credit: None,
            debit_units: None,
            credit_units: None,
            dilution: None,
            years: None,
            account: None,
            description: None,
        }
    }

    fn base_file() -> LedgerFile {
        LedgerFile {
            currency: "GBP".to_string(),
            payees: vec![
                payee("Acme", PayeeRole::Default),
                payee("Barclays", PayeeRole::Institution),
            ],
            accounts: vec![
                account("Current", AccountClass::Deposit),
                account("ISA", AccountClass::Portfolio),
            ],
            categories: vec![
                category("Salary", CategoryClass::Income),
                category("Transfer", CategoryClass::Transfer),
            ],
            securities: vec![security("VOD")],
            transactions: vec![],
            prices: vec![],
            rates: vec![],
        }
    }

    #[test]
    fn build_sorts_transactions_by_date() {
        let mut file = base_file();
        file.transactions = vec![
            transaction("2024-05-01", "Acme", "Current", "Salary", dec!(100)),
            transaction("2024-04-01", "Acme", "Current", "Salary", dec!(200)),
        ];
        let ledger = Ledger::build(file).unwrap();
        assert_eq!(ledger.transactions[0].amount, dec!(200));
        assert_eq!(ledger.transactions[1].amount, dec!(100));
    }

    #[test]
    fn build_rejects_name_shared_by_account_and_payee() {
        let mut file = base_file();
        file.accounts.push(account("Acme", AccountClass::Deposit));
        let err = Ledger::build(file).unwrap_err();
        assert_eq!(err, LedgerError::DuplicateName("Acme".to_string()));
    }

    #[test]
    fn build_rejects_unknown_category() {
        let mut file = base_file();
        file.transactions = vec![transaction(
            "2024-04-01",
            "Acme",
            "Current",
            "Missing",
            dec!(1),
        )];
        let err = Ledger::build(file).unwrap_err();
        assert_eq!(err, LedgerError::UnknownCategory("Missing".to_string()));
    }

    #[test]
    fn build_rejects_demerger_dilution_out_of_range() {
        let mut file = base_file();
        file.categories
            .push(category("DeMerger", CategoryClass::StockDeMerger));
        let mut tx = transaction("2024-04-01", "ISA:VOD", "ISA:VOD", "DeMerger", dec!(0));
        tx.dilution = Some(dec!(1.5));
        file.transactions = vec![tx];
        let err = Ledger::build(file).unwrap_err();
        assert_eq!(
            err,
            LedgerError::InvalidDilution {
                date: date("2024-04-01"),
                dilution: dec!(1.5),
            }
        );
    }

    #[test]
    fn build_rejects_takeover_without_credit_units() {
        let mut file = base_file();
        file.categories
            .push(category("TakeOver", CategoryClass::StockTakeOver));
        file.securities.push(security("BT"));
        file.transactions = vec![transaction(
            "2024-04-01",
            "ISA:VOD",
            "ISA:BT",
            "TakeOver",
            dec!(0),
        )];
        let err = Ledger::build(file).unwrap_err();
        assert_eq!(
            err,
            LedgerError::MissingTakeOverUnits(date("2024-04-01"))
        );
    }

    #[test]
    fn resolve_owner_prefers_account_then_payee() {
        let ledger = Ledger::build(base_file()).unwrap();
        assert_eq!(
            ledger.resolve_owner("Current").unwrap(),
            Owner::Account("Current".to_string())
        );
        assert_eq!(
            ledger.resolve_owner("Acme").unwrap(),
            Owner::Payee("Acme".to_string())
        );
    }

    #[test]
    fn resolve_owner_parses_holding() {
        let ledger = Ledger::build(base_file()).unwrap();
        let owner = ledger.resolve_owner("ISA:VOD").unwrap();
        assert_eq!(
            owner,
            Owner::Holding(HoldingRef {
                portfolio: "ISA".to_string(),
                security: "VOD".to_string(),
            })
        );
    }

    #[test]
    fn resolve_owner_rejects_holding_on_deposit_account() {
        let ledger = Ledger::build(base_file()).unwrap();
        let err = ledger.resolve_owner("Current:VOD").unwrap_err();
        assert_eq!(err, LedgerError::NotAPortfolio("Current".to_string()));
    }

    #[test]
    fn resolve_owner_rejects_unknown_name() {
        let ledger = Ledger::build(base_file()).unwrap();
        let err = ledger.resolve_owner("Nobody").unwrap_err();
        assert_eq!(err, LedgerError::UnknownOwner("Nobody".to_string()));
    }

    #[test]
    fn singular_payee_requires_exactly_one() {
        let mut file = base_file();
        file.payees.push(payee("HMRC", PayeeRole::TaxMan));
        let ledger = Ledger::build(file).unwrap();
        assert_eq!(
            ledger.singular_payee(PayeeRole::TaxMan).unwrap().name,
            "HMRC"
        );
        assert_eq!(
            ledger.singular_payee(PayeeRole::OpeningBalance).unwrap_err(),
            LedgerError::MissingSingularPayee(PayeeRole::OpeningBalance)
        );

        let mut file = base_file();
        file.payees.push(payee("HMRC", PayeeRole::TaxMan));
        file.payees.push(payee("IRS", PayeeRole::TaxMan));
        let ledger = Ledger::build(file).unwrap();
        assert_eq!(
            ledger.singular_payee(PayeeRole::TaxMan).unwrap_err(),
            LedgerError::DuplicateSingularPayee(PayeeRole::TaxMan)
        );
    }

    #[test]
    fn price_on_returns_latest_at_or_before() {
        let mut file = base_file();
        file.prices = vec![
            SecurityPrice {
                date: date("2024-04-01"),
                security: "VOD".to_string(),
                price: dec!(5.50),
            },
            SecurityPrice {
                date: date("2024-05-01"),
                security: "VOD".to_string(),
                price: dec!(5.75),
            },
        ];
        let ledger = Ledger::build(file).unwrap();
        assert_eq!(ledger.price_on("VOD", date("2024-03-31")), None);
        assert_eq!(
            ledger.price_on("VOD", date("2024-04-15")),
            Some((date("2024-04-01"), dec!(5.50)))
        );
        assert_eq!(
            ledger.price_on("VOD", date("2024-05-01")),
            Some((date("2024-05-01"), dec!(5.75)))
        );
    }
}
