use super::{AnalysisError, DateRange};
use chrono::NaiveDate;
use rust_decimal::Decimal;

/// A taxable gain realized by disposing of a life bond, spread over the
/// complete years the bond was held
#[derive(Debug, Clone, PartialEq)]
pub struct ChargeableEvent {
    date: NaiveDate,
    security: String,
    gain: Decimal,
    slice: Decimal,
    years: u32,
    taxation: Option<Decimal>,
    transaction: usize,
}

impl ChargeableEvent {
    /// `years` below 1 is treated as 1 (a bond disposed of within its
    /// first year has a single slice equal to the whole gain).
    pub(crate) fn new(
        date: NaiveDate,
        security: String,
        gain: Decimal,
        years: u32,
        transaction: usize,
    ) -> ChargeableEvent {
        let years = years.max(1);
        let slice = (gain / Decimal::from(years)).round_dp(2);
        ChargeableEvent {
            date,
            security,
            gain,
            slice,
            years,
            taxation: None,
            transaction,
        }
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }

    pub fn security(&self) -> &str {
        &self.security
    }

    pub fn gain(&self) -> Decimal {
        self.gain
    }

    /// The gain divided over the years held, the amount entering a single
    /// year's tax computation
    pub fn slice(&self) -> Decimal {
        self.slice
    }

    pub fn years(&self) -> u32 {
        self.years
    }

    /// Index of the originating transaction in the ledger
    pub fn transaction(&self) -> usize {
        self.transaction
    }

    /// Tax apportioned to this event's slice; `None` until `apply_tax`
    pub fn taxation(&self) -> Option<Decimal> {
        self.taxation
    }

    /// Final liability: the sliced tax scaled back up by the years held
    pub fn tax_due(&self) -> Option<Decimal> {
        self.taxation
            .map(|t| (t * Decimal::from(self.years)).round_dp(2))
    }
}

/// Side ledger of chargeable events, appended during the analysis pass and
/// taxed as a batch afterwards
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChargeableEvents {
    events: Vec<ChargeableEvent>,
}

impl ChargeableEvents {
    pub(crate) fn add(&mut self, event: ChargeableEvent) {
        log::debug!(
            "CHARGEABLE {} {} gain {} slice {} over {}y",
            event.date,
            event.security,
            event.gain,
            event.slice,
            event.years
        );
        self.events.push(event);
    }

    pub fn events(&self) -> &[ChargeableEvent] {
        &self.events
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn total_gains(&self) -> Decimal {
        self.events.iter().map(|e| e.gain).sum()
    }

    pub fn total_slice(&self) -> Decimal {
        self.events.iter().map(|e| e.slice).sum()
    }

    /// Sum of apportioned taxation; `None` until `apply_tax` has run
    pub fn total_taxation(&self) -> Option<Decimal> {
        self.events.iter().map(|e| e.taxation).sum()
    }

    /// Sum of final liabilities; `None` until `apply_tax` has run
    pub fn total_tax_due(&self) -> Option<Decimal> {
        self.events.iter().map(|e| e.tax_due()).sum()
    }

    /// Apportion a year's tax over the events by slice share.
    ///
    /// `total_slice` is the full sliced income the tax was computed on;
    /// when it equals the events' own slice total the apportioned amounts
    /// are adjusted to sum to `tax` exactly. May run once: taxation is
    /// single-assignment.
    pub fn apply_tax(&mut self, tax: Decimal, total_slice: Decimal) -> Result<(), AnalysisError> {
        if self.events.iter().any(|e| e.taxation.is_some()) {
            return Err(AnalysisError::TaxationApplied);
        }
        if self.events.is_empty() {
            return Ok(());
        }
        if total_slice.is_zero() {
            for event in &mut self.events {
                event.taxation = Some(Decimal::ZERO);
            }
            return Ok(());
        }

        let own_total = self.total_slice();
        let last = self.events.len() - 1;
        let mut assigned = Decimal::ZERO;
        for (i, event) in self.events.iter_mut().enumerate() {
            let share = if i == last && total_slice == own_total {
                tax - assigned
            } else {
                (tax * event.slice / total_slice).round_dp(2)
            };
            event.taxation = Some(share);
            assigned += share;
        }
        Ok(())
    }

    /// Events dated at or before the cut-off
    pub(crate) fn truncated(&self, date: NaiveDate) -> ChargeableEvents {
        ChargeableEvents {
            events: self
                .events
                .iter()
                .filter(|e| e.date <= date)
                .cloned()
                .collect(),
        }
    }

    /// Events dated inside the range
    pub(crate) fn ranged(&self, range: &DateRange) -> ChargeableEvents {
        ChargeableEvents {
            events: self
                .events
                .iter()
                .filter(|e| range.contains(e.date))
                .cloned()
                .collect(),
        }
    }
}
