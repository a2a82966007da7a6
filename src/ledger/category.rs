use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Behavioural class of a category, drives how the event is processed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub enum CategoryClass {
    /// Initial balance injection at the start of the ledger
    OpeningBalance,
    /// Earned income (salary, pension)
    Income,
    /// Interest received on deposits or charged on loans
    Interest,
    /// Dividend received, cash or reinvested
    Dividend,
    /// Rent received on a let property
    RentalIncome,
    /// Miscellaneous taxable income
    OtherIncome,
    /// Inherited money or assets, not taxable as income
    Inherited,
    /// Movement between own accounts or into/out of holdings
    Transfer,
    /// Ordinary spending
    Expense,
    /// Debt written off by the lender
    WriteOff,
    /// Interest added to a loan balance by the lender
    LoanInterestCharged,
    /// Share split or consolidation, changes units without money moving
    StockSplit,
    /// Rights issue taken up
    StockRightsTaken,
    /// Rights issue sold back to the market
    StockRightsWaived,
    /// Holding split into two securities
    StockDeMerger,
    /// Holding exchanged for another security, possibly with cash
    StockTakeOver,
}

impl CategoryClass {
    pub fn is_transfer(&self) -> bool {
        matches!(self, CategoryClass::Transfer)
    }

    /// Classes credited to the recipient as money coming in
    pub fn is_income(&self) -> bool {
        matches!(
            self,
            CategoryClass::OpeningBalance
                | CategoryClass::Income
                | CategoryClass::Interest
                | CategoryClass::Dividend
                | CategoryClass::RentalIncome
                | CategoryClass::OtherIncome
                | CategoryClass::Inherited
        )
    }

    /// Classes that restructure security holdings rather than move cash
    pub fn is_stock_event(&self) -> bool {
        matches!(
            self,
            CategoryClass::StockSplit
                | CategoryClass::StockRightsTaken
                | CategoryClass::StockRightsWaived
                | CategoryClass::StockDeMerger
                | CategoryClass::StockTakeOver
        )
    }

    /// How amounts in this class count towards a tax return, if at all
    pub fn tax_basis(&self) -> Option<TaxBasis> {
        match self {
            CategoryClass::Income | CategoryClass::OtherIncome => Some(TaxBasis::GrossIncome),
            CategoryClass::Interest => Some(TaxBasis::Interest),
            CategoryClass::Dividend => Some(TaxBasis::Dividend),
            CategoryClass::RentalIncome => Some(TaxBasis::RentalIncome),
            CategoryClass::Inherited | CategoryClass::OpeningBalance => Some(TaxBasis::TaxFree),
            CategoryClass::Expense
            | CategoryClass::WriteOff
            | CategoryClass::LoanInterestCharged => Some(TaxBasis::Expense),
            CategoryClass::Transfer => None,
            CategoryClass::StockSplit
            | CategoryClass::StockRightsTaken
            | CategoryClass::StockRightsWaived
            | CategoryClass::StockDeMerger
            | CategoryClass::StockTakeOver => None,
        }
    }
}

/// A named transaction category
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct Category {
    /// Unique category name
    pub name: String,
    /// Behavioural class
    pub class: CategoryClass,
}

/// Tax treatment bucket an amount accumulates under
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, JsonSchema,
)]
pub enum TaxBasis {
    /// Earned income taxed at marginal rates
    GrossIncome,
    /// Savings interest
    Interest,
    /// Dividend income
    Dividend,
    /// Property income
    RentalIncome,
    /// Money received free of tax
    TaxFree,
    /// Proceeds of capital disposals
    Capital,
    /// Gains chargeable to tax (life bond chargeable events)
    TaxableGains,
    /// Deductible or plain spending
    Expense,
    /// Tax already deducted at source
    TaxPaid,
}

impl fmt::Display for TaxBasis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TaxBasis::GrossIncome => "Gross Income",
            TaxBasis::Interest => "Interest",
            TaxBasis::Dividend => "Dividend",
            TaxBasis::RentalIncome => "Rental Income",
            TaxBasis::TaxFree => "Tax Free",
            TaxBasis::Capital => "Capital",
            TaxBasis::TaxableGains => "Taxable Gains",
            TaxBasis::Expense => "Expense",
            TaxBasis::TaxPaid => "Tax Paid",
        };
        f.write_str(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn income_classes_marked_income() {
        assert!(CategoryClass::Income.is_income());
        assert!(CategoryClass::Interest.is_income());
        assert!(CategoryClass::Inherited.is_income());
        assert!(!CategoryClass::Expense.is_income());
        assert!(!CategoryClass::Transfer.is_income());
        assert!(!CategoryClass::StockSplit.is_income());
    }

    #[test]
    fn transfers_have_no_tax_basis() {
        assert_eq!(CategoryClass::Transfer.tax_basis(), None);
        assert_eq!(CategoryClass::StockSplit.tax_basis(), None);
    }

    #[test]
    fn writeoffs_count_as_expense() {
        assert_eq!(CategoryClass::WriteOff.tax_basis(), Some(TaxBasis::Expense));
        assert_eq!(
            CategoryClass::LoanInterestCharged.tax_basis(),
            Some(TaxBasis::Expense)
        );
    }

    #[test]
    fn income_maps_to_gross() {
        assert_eq!(
            CategoryClass::Income.tax_basis(),
            Some(TaxBasis::GrossIncome)
        );
        assert_eq!(
            CategoryClass::OtherIncome.tax_basis(),
            Some(TaxBasis::GrossIncome)
        );
        assert_eq!(CategoryClass::Inherited.tax_basis(), Some(TaxBasis::TaxFree));
    }
}
