use super::DateRange;
use crate::ledger::Ledger;
use chrono::NaiveDate;
use std::collections::BTreeMap;

/// One dated entry in the merged event ledger
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewEntry {
    pub date: NaiveDate,
    pub event: ViewEvent,
}

/// Event payload, holding indices into the ledger's backing vectors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewEvent {
    /// Price and rate updates effective from this date, grouped
    Market { prices: Vec<usize>, rates: Vec<usize> },
    /// A single transaction
    Transaction(usize),
}

/// Chronological merge of transactions with grouped market data.
///
/// Frozen after construction: sub-ranges are index windows over the same
/// backing list, never copies.
#[derive(Debug)]
pub struct EventView {
    entries: Vec<ViewEntry>,
}

impl EventView {
    /// One entry per transaction, plus one market entry per date that has
    /// price or rate updates. Market entries sort before transactions on
    /// the same date so the running market state is current when a
    /// transaction is processed.
    pub fn build(ledger: &Ledger) -> EventView {
        let mut market: BTreeMap<NaiveDate, (Vec<usize>, Vec<usize>)> = BTreeMap::new();
        for (i, price) in ledger.prices.iter().enumerate() {
            market.entry(price.date).or_default().0.push(i);
        }
        for (i, rate) in ledger.rates.iter().enumerate() {
            market.entry(rate.date).or_default().1.push(i);
        }

        let mut entries: Vec<ViewEntry> = market
            .into_iter()
            .map(|(date, (prices, rates))| ViewEntry {
                date,
                event: ViewEvent::Market { prices, rates },
            })
            .collect();
        entries.extend(
            ledger
                .transactions
                .iter()
                .enumerate()
                .map(|(i, tx)| ViewEntry {
                    date: tx.date,
                    event: ViewEvent::Transaction(i),
                }),
        );
        // Stable sort keeps market entries ahead of same-date transactions.
        entries.sort_by_key(|e| e.date);

        EventView { entries }
    }

    pub fn entries(&self) -> &[ViewEntry] {
        &self.entries
    }

    /// Index window `[lo, hi)` of entries whose dates fall inside the range
    pub fn window_indices(&self, range: &DateRange) -> (usize, usize) {
        let lo = match range.start {
            Some(d) => self.entries.partition_point(|e| e.date < d),
            None => 0,
        };
        let hi = match range.end {
            Some(d) => self.entries.partition_point(|e| e.date <= d),
            None => self.entries.len(),
        };
        (lo, hi.max(lo))
    }

    pub fn window(&self, range: &DateRange) -> &[ViewEntry] {
        let (lo, hi) = self.window_indices(range);
        &self.entries[lo..hi]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::{
        Account, AccountClass, Category, CategoryClass, ExchangeRate, LedgerFile, Payee, PayeeRole,
        Security, SecurityClass, SecurityPrice, Transaction,
    };
    use rust_decimal_macros::dec;

    fn date(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    fn fixture() -> Ledger {
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
            securities: vec![Security {
                name: "VOD".to_string(),
                class: SecurityClass::Shares,
                currency: Some("USD".to_string()),
            }],
            transactions: vec![
                Transaction {
                    date: date("2024-04-05"),
                    debit: "Acme".to_string(),
                    credit: "Current".to_string(),
                    category: "Salary".to_string(),
                    amount: dec!(100),
                    tax_credit: None,
                    debit_units: None,
                    credit_units: None,
                    dilution: None,
                    years: None,
                    account: None,
                    description: None,
                },
                Transaction {
                    date: date("2024-04-01"),
                    debit: "Acme".to_string(),
                    credit: "Current".to_string(),
                    category: "Salary".to_string(),
                    amount: dec!(50),
                    tax_credit: None,
                    debit_units: None,
                    credit_units: None,
                    dilution: None,
                    years: None,
                    account: None,
                    description: None,
                },
            ],
            prices: vec![SecurityPrice {
                date: date("2024-04-05"),
                security: "VOD".to_string(),
                price: dec!(5.50),
            }],
            rates: vec![ExchangeRate {
                date: date("2024-04-05"),
                currency: "USD".to_string(),
                rate: dec!(0.79),
            }],
        };
        Ledger::build(file).unwrap()
    }

    #[test]
    fn entries_are_date_ordered() {
        let ledger = fixture();
        let view = EventView::build(&ledger);
        let dates: Vec<NaiveDate> = view.entries().iter().map(|e| e.date).collect();
        let mut sorted = dates.clone();
        sorted.sort();
        assert_eq!(dates, sorted);
    }

    #[test]
    fn same_date_price_and_rate_merge_before_transaction() {
        let ledger = fixture();
        let view = EventView::build(&ledger);
        // 2024-04-05 has a price, a rate and a transaction
        let day: Vec<&ViewEntry> = view
            .entries()
            .iter()
            .filter(|e| e.date == date("2024-04-05"))
            .collect();
        assert_eq!(day.len(), 2);
        assert_eq!(
            day[0].event,
            ViewEvent::Market {
                prices: vec![0],
                rates: vec![0],
            }
        );
        assert!(matches!(day[1].event, ViewEvent::Transaction(_)));
    }

    #[test]
    fn window_respects_bounds() {
        let ledger = fixture();
        let view = EventView::build(&ledger);
        let window = view.window(&DateRange::between(date("2024-04-02"), date("2024-04-05")));
        assert!(window
            .iter()
            .all(|e| e.date >= date("2024-04-02") && e.date <= date("2024-04-05")));
        assert_eq!(window.len(), 3);
    }

    #[test]
    fn out_of_range_window_is_empty() {
        let ledger = fixture();
        let view = EventView::build(&ledger);
        assert!(view
            .window(&DateRange::between(date("2025-01-01"), date("2025-12-31")))
            .is_empty());
    }

    #[test]
    fn unbounded_window_is_everything() {
        let ledger = fixture();
        let view = EventView::build(&ledger);
        assert_eq!(view.window(&DateRange::all()).len(), view.entries().len());
    }
}
