use super::{analyse, Analysis, AnalysisError, DateRange};
use crate::ledger::Ledger;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

/// Hands out completed analyses per reporting range, cached by structural
/// range key. The full-history pass runs at most once per bound ledger;
/// every other range derives from it. Safe to share across threads.
pub struct AnalysisManager {
    state: RwLock<ManagerState>,
}

struct ManagerState {
    ledger: Arc<Ledger>,
    full: Option<Arc<Analysis>>,
    cache: HashMap<DateRange, Arc<Analysis>>,
}

impl AnalysisManager {
    pub fn new(ledger: Ledger) -> AnalysisManager {
        AnalysisManager {
            state: RwLock::new(ManagerState {
                ledger: Arc::new(ledger),
                full: None,
                cache: HashMap::new(),
            }),
        }
    }

    pub fn ledger(&self) -> Arc<Ledger> {
        let state = self.state.read().unwrap_or_else(|e| e.into_inner());
        Arc::clone(&state.ledger)
    }

    /// The analysis for a reporting range.
    ///
    /// A cache hit needs only the read lock; on a miss the write lock is
    /// taken, the cache re-checked, and the range derived from the (lazily
    /// built) full-history analysis.
    pub fn analysis(&self, range: &DateRange) -> Result<Arc<Analysis>, AnalysisError> {
        {
            let state = self.state.read().unwrap_or_else(|e| e.into_inner());
            if let Some(analysis) = state.cache.get(range) {
                return Ok(Arc::clone(analysis));
            }
        }
        let mut state = self.state.write().unwrap_or_else(|e| e.into_inner());
        if let Some(analysis) = state.cache.get(range) {
            return Ok(Arc::clone(analysis));
        }
        let full = match &state.full {
            Some(full) => Arc::clone(full),
            None => {
                log::debug!("building full analysis");
                let full = Arc::new(analyse(&state.ledger)?);
                state.full = Some(Arc::clone(&full));
                full
            }
        };
        let analysis = if *range == DateRange::all() {
            full
        } else {
            Arc::new(full.range_view(range)?)
        };
        state.cache.insert(*range, Arc::clone(&analysis));
        Ok(analysis)
    }

    /// Bind a new ledger, dropping every cached analysis
    pub fn set_new_data(&self, ledger: Ledger) {
        let mut state = self.state.write().unwrap_or_else(|e| e.into_inner());
        state.ledger = Arc::new(ledger);
        state.full = None;
        state.cache.clear();
        log::debug!("ledger replaced, analysis cache cleared");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::{
        Account, AccountClass, Category, CategoryClass, LedgerFile, Payee, PayeeRole,
    };
    use chrono::NaiveDate;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    fn date(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    fn fixture(amount: Decimal) -> Ledger {
        let file = LedgerFile {
            currency: "GBP".to_string(),
            payees: vec![Payee {
                name: "Acme".to_string(),
                role: PayeeRole::Default,
            }],
            accounts: vec![Account {
                name: "Current".to_string(),
                class: AccountClass::Deposit,
                parent: None,
                auto_expense: None,
                rate: None,
                maturity: None,
            }],
            categories: vec![Category {
                name: "Salary".to_string(),
                class: CategoryClass::Income,
            }],
            securities: vec![],
            transactions: vec![crate::ledger::Transaction {
                date: date("2024-04-05"),
                debit: "Acme".to_string(),
                credit: "Current".to_string(),
                category: "Salary".to_string(),
                amount,
                tax_credit: None,
                debit_units: None,
                credit_units: None,
                dilution: None,
                years: None,
                account: None,
                description: None,
            }],
            prices: vec![],
            rates: vec![],
        };
        Ledger::build(file).unwrap()
    }

    #[test]
    fn repeated_requests_share_one_analysis() {
        let manager = AnalysisManager::new(fixture(dec!(100)));
        let range = DateRange::all();
        let first = manager.analysis(&range).unwrap();
        let second = manager.analysis(&range).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(
            first.account("Current").unwrap().values().valuation,
            dec!(100)
        );
    }

    #[test]
    fn ranges_derive_from_one_full_build() {
        let manager = AnalysisManager::new(fixture(dec!(100)));
        let range = DateRange::between(date("2024-04-01"), date("2024-04-30"));
        let view = manager.analysis(&range).unwrap();
        assert_eq!(view.range(), &range);
        assert_eq!(
            view.account("Current").unwrap().delta().valuation,
            dec!(100)
        );

        let before = manager
            .analysis(&DateRange::up_to(date("2024-04-04")))
            .unwrap();
        assert_eq!(
            before.account("Current").unwrap().values().valuation,
            Decimal::ZERO
        );
    }

    #[test]
    fn new_data_invalidates_the_cache() {
        let manager = AnalysisManager::new(fixture(dec!(100)));
        let range = DateRange::all();
        let stale = manager.analysis(&range).unwrap();

        manager.set_new_data(fixture(dec!(250)));
        let fresh = manager.analysis(&range).unwrap();
        assert!(!Arc::ptr_eq(&stale, &fresh));
        assert_eq!(
            fresh.account("Current").unwrap().values().valuation,
            dec!(250)
        );
        // the old generation is untouched
        assert_eq!(
            stale.account("Current").unwrap().values().valuation,
            dec!(100)
        );
    }

    #[test]
    fn inverted_range_propagates_the_error() {
        let manager = AnalysisManager::new(fixture(dec!(100)));
        let err = manager
            .analysis(&DateRange::between(date("2024-05-01"), date("2024-04-01")))
            .unwrap_err();
        assert_eq!(
            err,
            AnalysisError::InvalidRange {
                start: date("2024-05-01"),
                end: date("2024-04-01"),
            }
        );
    }
}
