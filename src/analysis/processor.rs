//! The single forward pass that turns a validated ledger into a populated
//! [`Analysis`].
//!
//! Market events keep a running price/rate state; transactions dispatch on
//! their category class and on whether either side is a security holding.

use super::view::{EventView, ViewEntry, ViewEvent};
use super::{Analysis, AnalysisError, ChargeableEvent, DateRange, SecurityValues};
use crate::ledger::{
    Account, CategoryClass, HoldingRef, Ledger, Owner, PayeeRole, TaxBasis, Transaction,
};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::collections::HashMap;

/// Cash at or below this amount always reduces cost directly.
const SMALL_CASH_LIMIT: Decimal = dec!(3000);
/// Above the limit, cash within this share of the stock value still does.
const SMALL_CASH_SHARE: Decimal = dec!(0.05);

/// Run the forward pass over a validated ledger, producing the full-history
/// analysis. Chargeable events come back untaxed; callers invoke
/// [`super::ChargeableEvents::apply_tax`] once they know the tax charge.
pub fn analyse(ledger: &Ledger) -> Result<Analysis, AnalysisError> {
    let view = EventView::build(ledger);
    let mut processor = Processor {
        ledger,
        market: MarketState::default(),
        analysis: Analysis::new(ledger.currency().to_string(), DateRange::all()),
    };
    for entry in view.entries() {
        processor.process(entry)?;
    }
    Ok(processor.analysis)
}

/// Prices and rates as of the pass's current position
#[derive(Default)]
struct MarketState {
    prices: HashMap<String, Decimal>,
    rates: HashMap<String, Decimal>,
}

impl MarketState {
    /// Value of `units` of a security in the reporting currency. Zero
    /// units short-circuit so fully disposed holdings never demand a
    /// price.
    fn stock_value(
        &self,
        ledger: &Ledger,
        security: &str,
        units: Decimal,
        date: NaiveDate,
    ) -> Result<Decimal, AnalysisError> {
        if units.is_zero() {
            return Ok(Decimal::ZERO);
        }
        let price =
            self.prices
                .get(security)
                .copied()
                .ok_or_else(|| AnalysisError::MissingPrice {
                    security: security.to_string(),
                    date,
                })?;
        let value = units * price;
        match &ledger.security(security)?.currency {
            Some(currency) if currency != ledger.currency() => {
                let rate =
                    self.rates
                        .get(currency)
                        .copied()
                        .ok_or_else(|| AnalysisError::MissingRate {
                            currency: currency.clone(),
                            date,
                        })?;
                Ok((value * rate).round_dp(2))
            }
            _ => Ok(value.round_dp(2)),
        }
    }
}

struct Processor<'a> {
    ledger: &'a Ledger,
    market: MarketState,
    analysis: Analysis,
}

impl<'a> Processor<'a> {
    fn process(&mut self, entry: &ViewEntry) -> Result<(), AnalysisError> {
        match &entry.event {
            ViewEvent::Market { prices, rates } => {
                for &i in prices {
                    let price = &self.ledger.prices[i];
                    self.market.prices.insert(price.security.clone(), price.price);
                }
                for &i in rates {
                    let rate = &self.ledger.rates[i];
                    self.market.rates.insert(rate.currency.clone(), rate.rate);
                }
                Ok(())
            }
            ViewEvent::Transaction(index) => self.transaction(*index),
        }
    }

    fn transaction(&mut self, index: usize) -> Result<(), AnalysisError> {
        let tx = &self.ledger.transactions[index];
        let class = self.ledger.category(&tx.category)?.class;
        let debit = self.ledger.resolve_owner(&tx.debit)?;
        let credit = self.ledger.resolve_owner(&tx.credit)?;
        log::debug!(
            "{} {} -> {} [{}] {}",
            tx.date,
            tx.debit,
            tx.credit,
            tx.category,
            tx.amount
        );
        if matches!(debit, Owner::Holding(_)) || matches!(credit, Owner::Holding(_)) {
            self.capital_event(tx, index, class, &debit, &credit)
        } else {
            self.standard(tx, class, debit, credit)
        }
    }

    fn unhandled(&self, tx: &Transaction) -> AnalysisError {
        AnalysisError::UnhandledCategory {
            date: tx.date,
            category: tx.category.clone(),
        }
    }

    /// Money movement between accounts and payees, no holdings involved
    fn standard(
        &mut self,
        tx: &Transaction,
        class: CategoryClass,
        debit: Owner,
        credit: Owner,
    ) -> Result<(), AnalysisError> {
        if class.is_stock_event() {
            return Err(self.unhandled(tx));
        }
        let (debit, credit) = substitute_owners(self.ledger, class, debit, credit)?;
        let gross = tx.amount + tx.tax_credit.unwrap_or_default();

        match &debit {
            Owner::Payee(name) => self.payee_income(tx.date, name, gross),
            Owner::Account(name) => {
                let account = self.ledger.account(name)?;
                if let Some(category) = &account.auto_expense {
                    // money coming back out of an auto-expense account
                    // undoes the assumed spend
                    self.analysis
                        .category_mut(category)
                        .update(tx.date, |v| v.expense -= tx.amount);
                } else {
                    self.debit_account(tx.date, account, tx.amount, class == CategoryClass::Expense);
                }
            }
            Owner::Holding(_) => return Err(self.unhandled(tx)),
        }
        match &credit {
            Owner::Payee(name) => self.payee_expense(tx.date, name, tx.amount),
            Owner::Account(name) => {
                let account = self.ledger.account(name)?;
                if let Some(category) = &account.auto_expense {
                    self.analysis
                        .category_mut(category)
                        .update(tx.date, |v| v.expense += tx.amount);
                } else {
                    self.credit_account(tx.date, account, tx.amount);
                }
            }
            Owner::Holding(_) => return Err(self.unhandled(tx)),
        }
        self.post_flows(tx, class)
    }

    /// Dispatch for transactions with a security holding on either side
    fn capital_event(
        &mut self,
        tx: &Transaction,
        index: usize,
        class: CategoryClass,
        debit: &Owner,
        credit: &Owner,
    ) -> Result<(), AnalysisError> {
        match class {
            CategoryClass::StockSplit => self.stock_split(tx, debit, credit),
            CategoryClass::StockRightsTaken => self.rights_taken(tx, debit, credit),
            CategoryClass::StockRightsWaived => self.rights_waived(tx, debit, credit),
            CategoryClass::StockDeMerger => self.demerger(tx, debit, credit),
            CategoryClass::StockTakeOver => self.take_over(tx, debit, credit),
            CategoryClass::Dividend => self.dividend(tx, class, debit, credit),
            CategoryClass::Transfer
            | CategoryClass::Expense
            | CategoryClass::Inherited
            | CategoryClass::OtherIncome => self.capital_move(tx, index, class, debit, credit),
            _ => Err(self.unhandled(tx)),
        }
    }

    /// Unit adjustment with no money or cost impact
    fn stock_split(
        &mut self,
        tx: &Transaction,
        debit: &Owner,
        credit: &Owner,
    ) -> Result<(), AnalysisError> {
        let holding = match credit {
            Owner::Holding(holding) => holding,
            _ => self.require_holding(tx, debit)?,
        };
        let units = tx.credit_units.unwrap_or_default() - tx.debit_units.unwrap_or_default();
        self.post_holding(
            tx.date,
            holding,
            SecurityValues {
                units,
                ..SecurityValues::default()
            },
        );
        Ok(())
    }

    /// Rights issue taken up: new money into the holding
    fn rights_taken(
        &mut self,
        tx: &Transaction,
        debit: &Owner,
        credit: &Owner,
    ) -> Result<(), AnalysisError> {
        let holding = self.require_holding(tx, credit)?;
        self.post_holding(
            tx.date,
            holding,
            SecurityValues {
                units: tx.credit_units.unwrap_or_default(),
                cost: tx.amount,
                invested: tx.amount,
                ..SecurityValues::default()
            },
        );
        self.capital_debit(tx, debit)
    }

    /// Rights sold back to the market: cash out of the holding against an
    /// allowable slice of its cost
    fn rights_waived(
        &mut self,
        tx: &Transaction,
        debit: &Owner,
        credit: &Owner,
    ) -> Result<(), AnalysisError> {
        let holding = self.require_holding(tx, debit)?;
        let held = self.analysis.holding_mut(holding).values();
        let reduction =
            self.cost_reduction(tx.date, &holding.security, held.units, tx.amount, held.cost)?;
        self.post_holding(
            tx.date,
            holding,
            SecurityValues {
                cost: -reduction,
                invested: -tx.amount,
                gains: tx.amount - reduction,
                ..SecurityValues::default()
            },
        );
        self.capital_receive(tx, credit)
    }

    /// Split one holding's cost across two securities by the dilution
    /// factor: the debit side keeps `dilution`, the rest transfers.
    fn demerger(
        &mut self,
        tx: &Transaction,
        debit: &Owner,
        credit: &Owner,
    ) -> Result<(), AnalysisError> {
        let from = self.require_holding(tx, debit)?;
        let to = self.require_holding(tx, credit)?;
        let dilution = tx.dilution.unwrap_or_default();
        let held = self.analysis.holding_mut(from).values();
        let transferred = (held.cost * (Decimal::ONE - dilution)).round_dp(2);
        self.post_holding(
            tx.date,
            from,
            SecurityValues {
                units: -tx.debit_units.unwrap_or_default(),
                cost: -transferred,
                ..SecurityValues::default()
            },
        );
        self.post_holding(
            tx.date,
            to,
            SecurityValues {
                units: tx.credit_units.unwrap_or_default(),
                cost: transferred,
                ..SecurityValues::default()
            },
        );
        Ok(())
    }

    /// The debit security is absorbed: its cost and units go to zero, the
    /// credit security receives the carried-over cost and new units, and
    /// any cash leg lands in the transaction's named account.
    fn take_over(
        &mut self,
        tx: &Transaction,
        debit: &Owner,
        credit: &Owner,
    ) -> Result<(), AnalysisError> {
        let from = self.require_holding(tx, debit)?;
        let to = self.require_holding(tx, credit)?;
        let held = self.analysis.holding_mut(from).values();
        // a cash leg exists only when a receiving account is named
        let cash = match &tx.account {
            Some(_) => tx.amount,
            None => Decimal::ZERO,
        };
        let new_units = tx.credit_units.unwrap_or_default();
        let (reduction, gain) = if cash.is_zero() {
            (Decimal::ZERO, Decimal::ZERO)
        } else {
            let reduction =
                self.cost_reduction(tx.date, &to.security, new_units, cash, held.cost)?;
            (reduction, cash - reduction)
        };
        self.post_holding(
            tx.date,
            from,
            SecurityValues {
                units: -held.units,
                cost: -held.cost,
                invested: -held.invested,
                gains: gain,
                ..SecurityValues::default()
            },
        );
        self.post_holding(
            tx.date,
            to,
            SecurityValues {
                units: new_units,
                cost: held.cost - reduction,
                invested: held.invested - cash,
                ..SecurityValues::default()
            },
        );
        if let Some(name) = &tx.account {
            let account = self.ledger.account(name)?;
            self.credit_account(tx.date, account, cash);
        }
        Ok(())
    }

    /// Dividend generated by a holding, re-invested or paid away
    fn dividend(
        &mut self,
        tx: &Transaction,
        class: CategoryClass,
        debit: &Owner,
        credit: &Owner,
    ) -> Result<(), AnalysisError> {
        let gross = tx.amount + tx.tax_credit.unwrap_or_default();
        match (debit, credit) {
            (Owner::Holding(from), Owner::Holding(to)) if from == to => {
                self.post_holding(
                    tx.date,
                    to,
                    SecurityValues {
                        units: tx.credit_units.unwrap_or_default(),
                        cost: tx.amount,
                        dividend: gross,
                        ..SecurityValues::default()
                    },
                );
            }
            (Owner::Holding(from), Owner::Holding(to)) => {
                self.post_holding(
                    tx.date,
                    from,
                    SecurityValues {
                        dividend: gross,
                        ..SecurityValues::default()
                    },
                );
                self.post_holding(
                    tx.date,
                    to,
                    SecurityValues {
                        units: tx.credit_units.unwrap_or_default(),
                        cost: tx.amount,
                        ..SecurityValues::default()
                    },
                );
            }
            (Owner::Holding(from), _) => {
                self.post_holding(
                    tx.date,
                    from,
                    SecurityValues {
                        dividend: gross,
                        ..SecurityValues::default()
                    },
                );
                self.capital_receive(tx, credit)?;
            }
            (_, Owner::Holding(to)) => {
                self.post_holding(
                    tx.date,
                    to,
                    SecurityValues {
                        units: tx.credit_units.unwrap_or_default(),
                        cost: tx.amount,
                        dividend: gross,
                        ..SecurityValues::default()
                    },
                );
                self.capital_debit(tx, debit)?;
            }
            _ => return Err(self.unhandled(tx)),
        }
        self.post_flows(tx, class)
    }

    /// Transfers and money-like categories touching a holding: life-bond
    /// debits are chargeable surrenders, other holding debits ordinary
    /// disposals, and a holding on the credit side only is a transfer-in.
    fn capital_move(
        &mut self,
        tx: &Transaction,
        index: usize,
        class: CategoryClass,
        debit: &Owner,
        credit: &Owner,
    ) -> Result<(), AnalysisError> {
        match debit {
            Owner::Holding(from) => {
                if self.ledger.security(&from.security)?.class.is_life_bond() {
                    self.surrender(tx, index, from);
                } else {
                    self.dispose(tx, from);
                }
                self.capital_receive(tx, credit)?;
            }
            _ => {
                let to = self.require_holding(tx, credit)?;
                self.post_holding(
                    tx.date,
                    to,
                    SecurityValues {
                        units: tx.credit_units.unwrap_or_default(),
                        cost: tx.amount,
                        invested: tx.amount,
                        ..SecurityValues::default()
                    },
                );
                self.capital_debit(tx, debit)?;
            }
        }
        self.post_flows(tx, class)
    }

    /// Full or partial surrender of a life bond. The gain is chargeable,
    /// spread over the complete years held.
    fn surrender(&mut self, tx: &Transaction, index: usize, holding: &HoldingRef) {
        let held = self.analysis.holding_mut(holding).values();
        let disposed = tx.debit_units.unwrap_or(held.units).min(held.units);
        let reduction = if disposed >= held.units {
            held.cost
        } else {
            (held.cost * disposed / held.units).round_dp(2)
        };
        let gain = tx.amount - reduction;
        self.post_holding(
            tx.date,
            holding,
            SecurityValues {
                units: -disposed,
                cost: -reduction,
                invested: -tx.amount,
                gains: gain,
                ..SecurityValues::default()
            },
        );
        if gain > Decimal::ZERO {
            self.analysis.chargeable_mut().add(ChargeableEvent::new(
                tx.date,
                holding.security.clone(),
                gain,
                tx.years.unwrap_or(1),
                index,
            ));
            self.analysis
                .tax_basis_mut(TaxBasis::TaxableGains)
                .update(tx.date, |v| {
                    v.gross += gain;
                    v.nett += gain;
                });
        }
    }

    /// Ordinary disposal. With units the cost reduction is proportional to
    /// the units disposed; without, the proceeds reduce cost directly.
    /// Either way the reduction caps at the cost held.
    fn dispose(&mut self, tx: &Transaction, holding: &HoldingRef) {
        let held = self.analysis.holding_mut(holding).values();
        let (disposed, reduction) = match tx.debit_units {
            Some(units) => {
                let disposed = units.min(held.units);
                let reduction = if disposed >= held.units {
                    held.cost
                } else {
                    (held.cost * disposed / held.units).round_dp(2)
                };
                (disposed, reduction)
            }
            None => (Decimal::ZERO, tx.amount.min(held.cost)),
        };
        let gain = tx.amount - reduction;
        self.post_holding(
            tx.date,
            holding,
            SecurityValues {
                units: -disposed,
                cost: -reduction,
                invested: -tx.amount,
                gains: gain,
                ..SecurityValues::default()
            },
        );
        if !gain.is_zero() {
            self.analysis
                .tax_basis_mut(TaxBasis::Capital)
                .update(tx.date, |v| {
                    v.gross += gain;
                    v.nett += gain;
                });
        }
    }

    /// Allowable cost for a cash component taken out of a holding.
    ///
    /// Small cash reduces cost directly, capped at the cost held. Cash
    /// above both the absolute limit and the value-share threshold
    /// apportions cost between the cash and the stock value instead.
    fn cost_reduction(
        &self,
        date: NaiveDate,
        security: &str,
        units: Decimal,
        cash: Decimal,
        cost: Decimal,
    ) -> Result<Decimal, AnalysisError> {
        if cash <= SMALL_CASH_LIMIT {
            return Ok(cash.min(cost));
        }
        let stock_value = self.market.stock_value(self.ledger, security, units, date)?;
        if cash > (stock_value * SMALL_CASH_SHARE).round_dp(2) {
            Ok((cost * cash / (cash + stock_value)).round_dp(2))
        } else {
            Ok(cash.min(cost))
        }
    }

    /// Money leaving a non-holding owner into a capital event
    fn capital_debit(&mut self, tx: &Transaction, owner: &Owner) -> Result<(), AnalysisError> {
        match owner {
            Owner::Account(name) => {
                let account = self.ledger.account(name)?;
                self.debit_account(tx.date, account, tx.amount, false);
                Ok(())
            }
            Owner::Payee(name) => {
                self.payee_income(tx.date, name, tx.amount + tx.tax_credit.unwrap_or_default());
                Ok(())
            }
            Owner::Holding(_) => Err(self.unhandled(tx)),
        }
    }

    /// Proceeds of a capital event arriving at the credit side
    fn capital_receive(&mut self, tx: &Transaction, owner: &Owner) -> Result<(), AnalysisError> {
        match owner {
            Owner::Holding(to) => {
                self.post_holding(
                    tx.date,
                    to,
                    SecurityValues {
                        units: tx.credit_units.unwrap_or_default(),
                        cost: tx.amount,
                        invested: tx.amount,
                        ..SecurityValues::default()
                    },
                );
            }
            Owner::Account(name) => {
                let account = self.ledger.account(name)?;
                self.credit_account(tx.date, account, tx.amount);
            }
            Owner::Payee(name) => self.payee_expense(tx.date, name, tx.amount),
        }
        Ok(())
    }

    fn require_holding<'t>(
        &self,
        tx: &Transaction,
        owner: &'t Owner,
    ) -> Result<&'t HoldingRef, AnalysisError> {
        match owner {
            Owner::Holding(holding) => Ok(holding),
            _ => Err(self.unhandled(tx)),
        }
    }

    /// Category, tax-basis and tax-credit postings shared by both paths.
    /// Transfers skip the category bucket; everything with a tax credit
    /// feeds the tax man's payee bucket and the TaxPaid basis.
    fn post_flows(&mut self, tx: &Transaction, class: CategoryClass) -> Result<(), AnalysisError> {
        let gross = tx.amount + tx.tax_credit.unwrap_or_default();
        if !class.is_transfer() {
            if class.is_income() {
                self.analysis
                    .category_mut(&tx.category)
                    .update(tx.date, |v| v.income += gross);
            } else {
                self.analysis
                    .category_mut(&tx.category)
                    .update(tx.date, |v| v.expense += tx.amount);
            }
        }
        if let Some(basis) = class.tax_basis() {
            self.analysis.tax_basis_mut(basis).update(tx.date, |v| {
                v.gross += gross;
                v.nett += tx.amount;
            });
        }
        if let Some(tax_credit) = tx.tax_credit {
            if !tax_credit.is_zero() {
                let taxman = self.ledger.singular_payee(PayeeRole::TaxMan)?.name.clone();
                self.payee_expense(tx.date, &taxman, tax_credit);
                self.analysis
                    .tax_basis_mut(TaxBasis::TaxPaid)
                    .update(tx.date, |v| {
                        v.gross += tax_credit;
                        v.nett += tax_credit;
                    });
            }
        }
        Ok(())
    }

    fn debit_account(&mut self, date: NaiveDate, account: &Account, amount: Decimal, spending: bool) {
        let bucket = self.analysis.account_mut(&account.name);
        bucket.update(date, |v| {
            v.valuation -= amount;
            if spending {
                v.spending += amount;
            }
            v.rate = account.rate;
            v.maturity = account.maturity;
        });
        log::debug!(
            "Account {} DEBIT: {} on {}. New valuation: {}",
            account.name,
            amount,
            date,
            bucket.values().valuation
        );
    }

    fn credit_account(&mut self, date: NaiveDate, account: &Account, amount: Decimal) {
        let bucket = self.analysis.account_mut(&account.name);
        bucket.update(date, |v| {
            v.valuation += amount;
            v.rate = account.rate;
            v.maturity = account.maturity;
        });
        log::debug!(
            "Account {} CREDIT: {} on {}. New valuation: {}",
            account.name,
            amount,
            date,
            bucket.values().valuation
        );
    }

    fn payee_income(&mut self, date: NaiveDate, payee: &str, amount: Decimal) {
        let bucket = self.analysis.payee_mut(payee);
        bucket.update(date, |v| v.income += amount);
        log::debug!(
            "Payee {} IN: {} on {}. Total in: {}",
            payee,
            amount,
            date,
            bucket.values().income
        );
    }

    fn payee_expense(&mut self, date: NaiveDate, payee: &str, amount: Decimal) {
        let bucket = self.analysis.payee_mut(payee);
        bucket.update(date, |v| v.expense += amount);
        log::debug!(
            "Payee {} OUT: {} on {}. Total out: {}",
            payee,
            amount,
            date,
            bucket.values().expense
        );
    }

    /// Apply a delta to a holding and mirror its money attributes onto the
    /// owning portfolio. Units of different securities do not sum, so the
    /// portfolio carries money attributes only.
    fn post_holding(&mut self, date: NaiveDate, holding: &HoldingRef, delta: SecurityValues) {
        let bucket = self.analysis.holding_mut(holding);
        bucket.update(date, |v| {
            v.units += delta.units;
            v.cost += delta.cost;
            v.invested += delta.invested;
            v.gains += delta.gains;
            v.dividend += delta.dividend;
        });
        let values = bucket.values();
        log::debug!(
            "Holding {} POST: units {}, cost {} on {}. Now: units={}, cost={}, gains={}",
            holding,
            delta.units,
            delta.cost,
            date,
            values.units,
            values.cost,
            values.gains
        );
        self.analysis
            .portfolio_mut(&holding.portfolio)
            .update(date, |v| {
                v.cost += delta.cost;
                v.invested += delta.invested;
                v.gains += delta.gains;
                v.dividend += delta.dividend;
            });
    }
}

/// Reroute a transaction's sides before posting, per category class.
///
/// The ledger records these classes as self-referential entries on the
/// affected account; the substitution redirects one side to the payee
/// behind that account so the flow is attributed to the institution.
fn substitute_owners(
    ledger: &Ledger,
    class: CategoryClass,
    debit: Owner,
    credit: Owner,
) -> Result<(Owner, Owner), AnalysisError> {
    match class {
        // interest is paid by the institution behind the receiving account
        CategoryClass::Interest => {
            if let Owner::Account(name) = &debit {
                let parent = ledger.parent_payee(ledger.account(name)?)?;
                return Ok((Owner::Payee(parent.name.clone()), credit));
            }
            Ok((debit, credit))
        }
        // rent arrives via the agent behind the receiving account
        CategoryClass::RentalIncome => {
            if let Owner::Account(name) = &credit {
                let parent = ledger.parent_payee(ledger.account(name)?)?;
                return Ok((Owner::Payee(parent.name.clone()), credit));
            }
            Ok((debit, credit))
        }
        // the lender behind the account levies the charge
        CategoryClass::WriteOff | CategoryClass::LoanInterestCharged => {
            if let Owner::Account(name) = &credit {
                let parent = ledger.parent_payee(ledger.account(name)?)?;
                return Ok((debit, Owner::Payee(parent.name.clone())));
            }
            Ok((debit, credit))
        }
        _ => Ok((debit, credit)),
    }
}
