pub mod bucket;
pub mod chargeable;
pub mod manager;
pub mod processor;
pub mod view;

// Flat public surface for the engine types and functions.
pub use bucket::{AccountValues, Bucket, FlowValues, SecurityValues, TaxBasisValues};
pub use chargeable::{ChargeableEvent, ChargeableEvents};
pub use manager::AnalysisManager;
pub use processor::analyse;
pub use view::{EventView, ViewEntry, ViewEvent};

use crate::ledger::{HoldingRef, Ledger, LedgerError, Security, TaxBasis};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use std::collections::BTreeMap;
use std::fmt;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum AnalysisError {
    #[error("category {category} cannot be applied to this transaction's owners: {date}")]
    UnhandledCategory { date: NaiveDate, category: String },
    #[error("range start {start} is after its end {end}")]
    InvalidRange { start: NaiveDate, end: NaiveDate },
    #[error("no price for {security} at or before {date}")]
    MissingPrice { security: String, date: NaiveDate },
    #[error("no {currency} exchange rate at or before {date}")]
    MissingRate { currency: String, date: NaiveDate },
    #[error("taxation has already been applied")]
    TaxationApplied,
    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

/// Inclusive reporting period, unbounded on either side
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct DateRange {
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

impl DateRange {
    pub fn all() -> DateRange {
        DateRange {
            start: None,
            end: None,
        }
    }

    pub fn up_to(end: NaiveDate) -> DateRange {
        DateRange {
            start: None,
            end: Some(end),
        }
    }

    pub fn since(start: NaiveDate) -> DateRange {
        DateRange {
            start: Some(start),
            end: None,
        }
    }

    pub fn between(start: NaiveDate, end: NaiveDate) -> DateRange {
        DateRange {
            start: Some(start),
            end: Some(end),
        }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start.map_or(true, |s| date >= s) && self.end.map_or(true, |e| date <= e)
    }
}

impl fmt::Display for DateRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.start, self.end) {
            (None, None) => f.write_str("all dates"),
            (None, Some(e)) => write!(f, "up to {}", e.format("%Y-%m-%d")),
            (Some(s), None) => write!(f, "from {}", s.format("%Y-%m-%d")),
            (Some(s), Some(e)) => {
                write!(f, "{} to {}", s.format("%Y-%m-%d"), e.format("%Y-%m-%d"))
            }
        }
    }
}

/// Bucket registry for one reporting period: one owner-keyed map per owner
/// kind, plus the chargeable-event side ledger.
///
/// Built once by the processor's forward pass; read-only afterwards. Derived
/// periods come from [`Analysis::snapshot_at`] and [`Analysis::range_view`],
/// which never touch the source.
#[derive(Debug, Clone)]
pub struct Analysis {
    currency: String,
    range: DateRange,
    accounts: BTreeMap<String, Bucket<AccountValues>>,
    portfolios: BTreeMap<String, Bucket<SecurityValues>>,
    holdings: BTreeMap<HoldingRef, Bucket<SecurityValues>>,
    payees: BTreeMap<String, Bucket<FlowValues>>,
    categories: BTreeMap<String, Bucket<FlowValues>>,
    tax_bases: BTreeMap<TaxBasis, Bucket<TaxBasisValues>>,
    chargeable: ChargeableEvents,
}

impl Analysis {
    pub(crate) fn new(currency: String, range: DateRange) -> Analysis {
        Analysis {
            currency,
            range,
            accounts: BTreeMap::new(),
            portfolios: BTreeMap::new(),
            holdings: BTreeMap::new(),
            payees: BTreeMap::new(),
            categories: BTreeMap::new(),
            tax_bases: BTreeMap::new(),
            chargeable: ChargeableEvents::default(),
        }
    }

    pub fn currency(&self) -> &str {
        &self.currency
    }

    pub fn range(&self) -> &DateRange {
        &self.range
    }

    pub fn account(&self, name: &str) -> Option<&Bucket<AccountValues>> {
        self.accounts.get(name)
    }

    pub fn accounts(&self) -> &BTreeMap<String, Bucket<AccountValues>> {
        &self.accounts
    }

    pub fn portfolio(&self, name: &str) -> Option<&Bucket<SecurityValues>> {
        self.portfolios.get(name)
    }

    pub fn portfolios(&self) -> &BTreeMap<String, Bucket<SecurityValues>> {
        &self.portfolios
    }

    pub fn holding(&self, holding: &HoldingRef) -> Option<&Bucket<SecurityValues>> {
        self.holdings.get(holding)
    }

    pub fn holdings(&self) -> &BTreeMap<HoldingRef, Bucket<SecurityValues>> {
        &self.holdings
    }

    pub fn payee(&self, name: &str) -> Option<&Bucket<FlowValues>> {
        self.payees.get(name)
    }

    pub fn payees(&self) -> &BTreeMap<String, Bucket<FlowValues>> {
        &self.payees
    }

    pub fn category(&self, name: &str) -> Option<&Bucket<FlowValues>> {
        self.categories.get(name)
    }

    pub fn categories(&self) -> &BTreeMap<String, Bucket<FlowValues>> {
        &self.categories
    }

    pub fn tax_basis(&self, basis: TaxBasis) -> Option<&Bucket<TaxBasisValues>> {
        self.tax_bases.get(&basis)
    }

    pub fn tax_bases(&self) -> &BTreeMap<TaxBasis, Bucket<TaxBasisValues>> {
        &self.tax_bases
    }

    pub fn chargeable(&self) -> &ChargeableEvents {
        &self.chargeable
    }

    // Get-or-create accessors for the processor. A first reference registers
    // a zero-valued bucket; identical owners always share one bucket.

    pub(crate) fn account_mut(&mut self, name: &str) -> &mut Bucket<AccountValues> {
        self.accounts.entry(name.to_string()).or_default()
    }

    pub(crate) fn portfolio_mut(&mut self, name: &str) -> &mut Bucket<SecurityValues> {
        self.portfolios.entry(name.to_string()).or_default()
    }

    pub(crate) fn holding_mut(&mut self, holding: &HoldingRef) -> &mut Bucket<SecurityValues> {
        self.holdings.entry(holding.clone()).or_default()
    }

    pub(crate) fn payee_mut(&mut self, name: &str) -> &mut Bucket<FlowValues> {
        self.payees.entry(name.to_string()).or_default()
    }

    pub(crate) fn category_mut(&mut self, name: &str) -> &mut Bucket<FlowValues> {
        self.categories.entry(name.to_string()).or_default()
    }

    pub(crate) fn tax_basis_mut(&mut self, basis: TaxBasis) -> &mut Bucket<TaxBasisValues> {
        self.tax_bases.entry(basis).or_default()
    }

    pub(crate) fn chargeable_mut(&mut self) -> &mut ChargeableEvents {
        &mut self.chargeable
    }

    /// State as of a cut-off date. Every bucket is re-derived from its own
    /// history; its base is set to the originating bucket's final values so
    /// "movement since the cut-off" remains answerable from the snapshot.
    pub fn snapshot_at(&self, date: NaiveDate) -> Analysis {
        Analysis {
            currency: self.currency.clone(),
            range: DateRange::up_to(date),
            accounts: snapshot_map(&self.accounts, date),
            portfolios: snapshot_map(&self.portfolios, date),
            holdings: snapshot_map(&self.holdings, date),
            payees: snapshot_map(&self.payees, date),
            categories: snapshot_map(&self.categories, date),
            tax_bases: snapshot_map(&self.tax_bases, date),
            chargeable: self.chargeable.truncated(date),
        }
    }

    /// Movement within an inclusive range: values as at the range end, base
    /// as just before the range start, so every bucket's `delta` is the
    /// in-range movement.
    pub fn range_view(&self, range: &DateRange) -> Result<Analysis, AnalysisError> {
        if let (Some(start), Some(end)) = (range.start, range.end) {
            if start > end {
                return Err(AnalysisError::InvalidRange { start, end });
            }
        }
        Ok(Analysis {
            currency: self.currency.clone(),
            range: *range,
            accounts: range_map(&self.accounts, range),
            portfolios: range_map(&self.portfolios, range),
            holdings: range_map(&self.holdings, range),
            payees: range_map(&self.payees, range),
            categories: range_map(&self.categories, range),
            tax_bases: range_map(&self.tax_bases, range),
            chargeable: self.chargeable.ranged(range),
        })
    }
}

fn snapshot_map<K, V>(map: &BTreeMap<K, Bucket<V>>, date: NaiveDate) -> BTreeMap<K, Bucket<V>>
where
    K: Clone + Ord,
    V: Copy + Default + std::ops::Sub<Output = V>,
{
    map.iter()
        .map(|(k, bucket)| (k.clone(), bucket.snapshot_at(date)))
        .collect()
}

fn range_map<K, V>(map: &BTreeMap<K, Bucket<V>>, range: &DateRange) -> BTreeMap<K, Bucket<V>>
where
    K: Clone + Ord,
    V: Copy + Default + std::ops::Sub<Output = V>,
{
    map.iter()
        .map(|(k, bucket)| (k.clone(), bucket.range_view(range.start, range.end)))
        .collect()
}

/// Market value of `units` of a security at `date`, in the ledger's
/// reporting currency. Zero units short-circuit so fully disposed holdings
/// never demand a price.
pub fn holding_value(
    ledger: &Ledger,
    security: &Security,
    units: Decimal,
    date: NaiveDate,
) -> Result<Decimal, AnalysisError> {
    if units.is_zero() {
        return Ok(Decimal::ZERO);
    }
    let (_, price) = ledger
        .price_on(&security.name, date)
        .ok_or_else(|| AnalysisError::MissingPrice {
            security: security.name.clone(),
            date,
        })?;
    let value = units * price;
    match &security.currency {
        Some(currency) if currency != ledger.currency() => {
            let (_, rate) =
                ledger
                    .rate_on(currency, date)
                    .ok_or_else(|| AnalysisError::MissingRate {
                        currency: currency.clone(),
                        date,
                    })?;
            Ok((value * rate).round_dp(2))
        }
        _ => Ok(value.round_dp(2)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::{ExchangeRate, LedgerFile, SecurityClass, SecurityPrice};
    use rust_decimal_macros::dec;

    fn date(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    #[test]
    fn range_contains_respects_bounds() {
        let range = DateRange::between(date("2024-04-06"), date("2025-04-05"));
        assert!(range.contains(date("2024-04-06")));
        assert!(range.contains(date("2025-04-05")));
        assert!(!range.contains(date("2024-04-05")));
        assert!(!range.contains(date("2025-04-06")));
        assert!(DateRange::all().contains(date("1990-01-01")));
    }

    #[test]
    fn range_displays_both_bounds() {
        assert_eq!(DateRange::all().to_string(), "all dates");
        assert_eq!(
            DateRange::up_to(date("2024-04-05")).to_string(),
            "up to 2024-04-05"
        );
        assert_eq!(
            DateRange::between(date("2024-04-06"), date("2025-04-05")).to_string(),
            "2024-04-06 to 2025-04-05"
        );
    }

    #[test]
    fn get_or_create_registers_one_bucket_per_owner() {
        let mut analysis = Analysis::new("GBP".to_string(), DateRange::all());
        analysis
            .account_mut("Current")
            .update(date("2024-04-01"), |v| v.valuation += dec!(100));
        analysis
            .account_mut("Current")
            .update(date("2024-04-02"), |v| v.valuation += dec!(50));

        assert_eq!(analysis.accounts().len(), 1);
        assert_eq!(
            analysis.account("Current").unwrap().values().valuation,
            dec!(150)
        );
        assert!(analysis.account("Savings").is_none());
    }

    #[test]
    fn range_view_rejects_inverted_range() {
        let analysis = Analysis::new("GBP".to_string(), DateRange::all());
        let err = analysis
            .range_view(&DateRange::between(date("2024-05-01"), date("2024-04-01")))
            .unwrap_err();
        assert_eq!(
            err,
            AnalysisError::InvalidRange {
                start: date("2024-05-01"),
                end: date("2024-04-01"),
            }
        );
    }

    #[test]
    fn snapshot_cuts_every_map_at_the_date() {
        let mut analysis = Analysis::new("GBP".to_string(), DateRange::all());
        analysis
            .account_mut("Current")
            .update(date("2024-04-01"), |v| v.valuation += dec!(100));
        analysis
            .account_mut("Current")
            .update(date("2024-04-10"), |v| v.valuation += dec!(50));
        analysis
            .payee_mut("Acme")
            .update(date("2024-04-10"), |v| v.income += dec!(50));

        let snap = analysis.snapshot_at(date("2024-04-05"));
        assert_eq!(snap.range(), &DateRange::up_to(date("2024-04-05")));
        assert_eq!(
            snap.account("Current").unwrap().values().valuation,
            dec!(100)
        );
        // Registered but untouched as of the cut-off
        assert_eq!(snap.payee("Acme").unwrap().values().income, dec!(0));
        // The source is untouched
        assert_eq!(
            analysis.account("Current").unwrap().values().valuation,
            dec!(150)
        );
    }

    #[test]
    fn holding_value_converts_foreign_prices() {
        let file = LedgerFile {
            currency: "GBP".to_string(),
            payees: vec![],
            accounts: vec![],
            categories: vec![],
            securities: vec![Security {
                name: "AAPL".to_string(),
                class: SecurityClass::Shares,
                currency: Some("USD".to_string()),
            }],
            transactions: vec![],
            prices: vec![SecurityPrice {
                date: date("2024-04-01"),
                security: "AAPL".to_string(),
                price: dec!(200),
            }],
            rates: vec![ExchangeRate {
                date: date("2024-04-01"),
                currency: "USD".to_string(),
                rate: dec!(0.80),
            }],
        };
        let ledger = Ledger::build(file).unwrap();
        let security = ledger.security("AAPL").unwrap();

        let value = holding_value(&ledger, security, dec!(10), date("2024-04-02")).unwrap();
        assert_eq!(value, dec!(1600.00));
    }

    #[test]
    fn holding_value_requires_price_and_rate() {
        let file = LedgerFile {
            currency: "GBP".to_string(),
            payees: vec![],
            accounts: vec![],
            categories: vec![],
            securities: vec![Security {
                name: "AAPL".to_string(),
                class: SecurityClass::Shares,
                currency: Some("USD".to_string()),
            }],
            transactions: vec![],
            prices: vec![],
            rates: vec![],
        };
        let ledger = Ledger::build(file).unwrap();
        let security = ledger.security("AAPL").unwrap();

        assert_eq!(
            holding_value(&ledger, security, dec!(10), date("2024-04-02")).unwrap_err(),
            AnalysisError::MissingPrice {
                security: "AAPL".to_string(),
                date: date("2024-04-02"),
            }
        );
        // No price needed when nothing is held
        assert_eq!(
            holding_value(&ledger, security, Decimal::ZERO, date("2024-04-02")).unwrap(),
            Decimal::ZERO
        );
    }
}
