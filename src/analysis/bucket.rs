use chrono::NaiveDate;
use rust_decimal::Decimal;
use std::ops::Sub;

/// Balances of a deposit, cash or loan account
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct AccountValues {
    /// Balance in the reporting currency
    pub valuation: Decimal,
    /// Cumulative money paid out of the account
    pub spending: Decimal,
    /// Annual interest rate, carried from the account definition
    pub rate: Option<Decimal>,
    /// Maturity date, carried from the account definition
    pub maturity: Option<NaiveDate>,
}

impl Sub for AccountValues {
    type Output = AccountValues;

    fn sub(self, rhs: AccountValues) -> AccountValues {
        AccountValues {
            valuation: self.valuation - rhs.valuation,
            spending: self.spending - rhs.spending,
            rate: self.rate,
            maturity: self.maturity,
        }
    }
}

/// Position of a security holding (or a portfolio aggregating its holdings)
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SecurityValues {
    /// Units currently held
    pub units: Decimal,
    /// Cost basis of the units held
    pub cost: Decimal,
    /// Net money put in from outside
    pub invested: Decimal,
    /// Realized gains from disposals
    pub gains: Decimal,
    /// Dividends received, gross of tax credit
    pub dividend: Decimal,
}

impl Sub for SecurityValues {
    type Output = SecurityValues;

    fn sub(self, rhs: SecurityValues) -> SecurityValues {
        SecurityValues {
            units: self.units - rhs.units,
            cost: self.cost - rhs.cost,
            invested: self.invested - rhs.invested,
            gains: self.gains - rhs.gains,
            dividend: self.dividend - rhs.dividend,
        }
    }
}

/// Money in and out for a payee or category
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FlowValues {
    pub income: Decimal,
    pub expense: Decimal,
}

impl FlowValues {
    pub fn net(&self) -> Decimal {
        self.income - self.expense
    }
}

impl Sub for FlowValues {
    type Output = FlowValues;

    fn sub(self, rhs: FlowValues) -> FlowValues {
        FlowValues {
            income: self.income - rhs.income,
            expense: self.expense - rhs.expense,
        }
    }
}

/// Amounts accumulated under one tax treatment
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TaxBasisValues {
    /// Amount before tax deducted at source
    pub gross: Decimal,
    /// Amount actually received or paid
    pub nett: Decimal,
}

impl Sub for TaxBasisValues {
    type Output = TaxBasisValues;

    fn sub(self, rhs: TaxBasisValues) -> TaxBasisValues {
        TaxBasisValues {
            gross: self.gross - rhs.gross,
            nett: self.nett - rhs.nett,
        }
    }
}

/// One owner's position: current values, a base for delta queries, and a
/// per-date state history.
///
/// Invariant: when the history is non-empty its last entry equals `values`;
/// an empty history means `values` is still the zero default.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Bucket<V> {
    values: V,
    base: V,
    history: Vec<(NaiveDate, V)>,
}

impl<V: Copy + Default + Sub<Output = V>> Bucket<V> {
    pub fn values(&self) -> V {
        self.values
    }

    pub fn base(&self) -> V {
        self.base
    }

    /// Movement over the bucket's period: `values - base`
    pub fn delta(&self) -> V {
        self.values - self.base
    }

    pub fn history(&self) -> &[(NaiveDate, V)] {
        &self.history
    }

    /// Apply a mutation and record the resulting state against `date`.
    /// Repeated mutations on one date collapse into a single history entry.
    pub(crate) fn update(&mut self, date: NaiveDate, f: impl FnOnce(&mut V)) {
        f(&mut self.values);
        match self.history.last_mut() {
            Some((last, state)) if *last == date => *state = self.values,
            _ => self.history.push((date, self.values)),
        }
    }

    /// State after the last mutation at or before `date`
    pub fn state_at(&self, date: NaiveDate) -> V {
        let idx = self.history.partition_point(|(d, _)| *d <= date);
        if idx == 0 {
            V::default()
        } else {
            self.history[idx - 1].1
        }
    }

    /// Values as of `date`, with this bucket's current values as the base
    /// and the history truncated to the cut-off
    pub(crate) fn snapshot_at(&self, date: NaiveDate) -> Bucket<V> {
        let idx = self.history.partition_point(|(d, _)| *d <= date);
        let values = if idx == 0 {
            V::default()
        } else {
            self.history[idx - 1].1
        };
        Bucket {
            values,
            base: self.values,
            history: self.history[..idx].to_vec(),
        }
    }

    /// Movement restricted to `[start, end]`: values as at the end of the
    /// range, base just before its start, history windowed to match.
    /// Unbounded ends take the bucket's full extent on that side.
    pub(crate) fn range_view(&self, start: Option<NaiveDate>, end: Option<NaiveDate>) -> Bucket<V> {
        let lo = match start {
            Some(d) => self.history.partition_point(|(h, _)| *h < d),
            None => 0,
        };
        let hi = match end {
            Some(d) => self.history.partition_point(|(h, _)| *h <= d),
            None => self.history.len(),
        };
        let hi = hi.max(lo);
        let base = if lo == 0 {
            V::default()
        } else {
            self.history[lo - 1].1
        };
        let values = if hi == 0 {
            V::default()
        } else {
            self.history[hi - 1].1
        };
        Bucket {
            values,
            base,
            history: self.history[lo..hi].to_vec(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn date(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    fn flows(dates_and_income: &[(&str, Decimal)]) -> Bucket<FlowValues> {
        let mut bucket = Bucket::default();
        for (d, income) in dates_and_income {
            bucket.update(date(d), |v: &mut FlowValues| v.income += *income);
        }
        bucket
    }

    #[test]
    fn update_coalesces_same_date_history() {
        let mut bucket = Bucket::default();
        bucket.update(date("2024-04-01"), |v: &mut FlowValues| v.income += dec!(10));
        bucket.update(date("2024-04-01"), |v: &mut FlowValues| v.income += dec!(5));
        bucket.update(date("2024-04-02"), |v: &mut FlowValues| v.income += dec!(1));

        assert_eq!(bucket.history().len(), 2);
        assert_eq!(bucket.history()[0].1.income, dec!(15));
        assert_eq!(bucket.values().income, dec!(16));
    }

    #[test]
    fn state_at_steps_through_history() {
        let bucket = flows(&[
            ("2024-04-01", dec!(10)),
            ("2024-04-05", dec!(20)),
            ("2024-04-10", dec!(30)),
        ]);
        assert_eq!(bucket.state_at(date("2024-03-31")).income, dec!(0));
        assert_eq!(bucket.state_at(date("2024-04-01")).income, dec!(10));
        assert_eq!(bucket.state_at(date("2024-04-07")).income, dec!(30));
        assert_eq!(bucket.state_at(date("2024-04-10")).income, dec!(60));
    }

    #[test]
    fn snapshot_keeps_originating_values_as_base() {
        let bucket = flows(&[("2024-04-01", dec!(10)), ("2024-04-10", dec!(20))]);
        let snap = bucket.snapshot_at(date("2024-04-05"));
        assert_eq!(snap.values().income, dec!(10));
        assert_eq!(snap.base().income, dec!(30));
        assert_eq!(snap.history().len(), 1);
    }

    #[test]
    fn range_view_bases_just_before_start() {
        let bucket = flows(&[
            ("2024-04-01", dec!(10)),
            ("2024-04-05", dec!(20)),
            ("2024-04-10", dec!(30)),
        ]);
        let view = bucket.range_view(Some(date("2024-04-02")), Some(date("2024-04-09")));
        assert_eq!(view.base().income, dec!(10));
        assert_eq!(view.values().income, dec!(30));
        assert_eq!(view.delta().income, dec!(20));
        assert_eq!(view.history().len(), 1);
    }

    #[test]
    fn range_view_unbounded_covers_everything() {
        let bucket = flows(&[("2024-04-01", dec!(10)), ("2024-04-05", dec!(20))]);
        let view = bucket.range_view(None, None);
        assert_eq!(view.base().income, dec!(0));
        assert_eq!(view.values().income, dec!(30));
        assert_eq!(view.delta().income, dec!(30));
    }

    #[test]
    fn range_view_outside_history_is_empty() {
        let bucket = flows(&[("2024-04-05", dec!(20))]);
        let view = bucket.range_view(Some(date("2024-05-01")), Some(date("2024-06-01")));
        assert_eq!(view.delta().income, dec!(0));
        assert!(view.history().is_empty());

        let view = bucket.range_view(Some(date("2024-01-01")), Some(date("2024-02-01")));
        assert_eq!(view.delta().income, dec!(0));
        assert!(view.history().is_empty());
    }

    #[test]
    fn account_delta_keeps_current_rate() {
        let mut bucket: Bucket<AccountValues> = Bucket::default();
        bucket.update(date("2024-04-01"), |v| {
            v.valuation += dec!(100);
            v.rate = Some(dec!(0.04));
        });
        bucket.update(date("2024-04-10"), |v| v.valuation += dec!(50));
        let view = bucket.range_view(Some(date("2024-04-05")), None);
        assert_eq!(view.delta().valuation, dec!(50));
        assert_eq!(view.delta().rate, Some(dec!(0.04)));
    }
}
