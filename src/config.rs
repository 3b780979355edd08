use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::decimal::{Money, Rate};

/// lending policy thresholds and cycle cadence
///
/// Carried by value into the engines; there is no ambient configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LendingPolicy {
    /// minimum credit score required at origination
    pub min_credit_score: u16,
    /// minimum annual income required at origination
    pub min_annual_income: Money,
    /// per-loan principal cap
    pub max_principal: Money,
    /// minimum annual interest rate
    pub min_annual_rate: Rate,
    /// affordable installment as a share of monthly income
    pub installment_income_share: Decimal,
    /// gap between scheduled installments
    pub installment_interval_days: i64,
    /// minimum days between billing records for one loan
    pub billing_cycle_days: i64,
    /// days between billing date and billing due date
    pub billing_grace_days: i64,
    /// days of interest charged per billing cycle
    pub billing_interest_days: u32,
    /// principal share included in the billing minimum due
    pub min_due_principal_share: Decimal,
}

impl Default for LendingPolicy {
    fn default() -> Self {
        Self {
            min_credit_score: 450,
            min_annual_income: Money::from_major(150_000),
            max_principal: Money::from_major(5_000),
            min_annual_rate: Rate::from_percentage(dec!(12)),
            installment_income_share: dec!(0.20),
            installment_interval_days: 30,
            billing_cycle_days: 30,
            billing_grace_days: 15,
            billing_interest_days: 30,
            min_due_principal_share: dec!(0.03),
        }
    }
}

impl LendingPolicy {
    /// largest installment the policy considers affordable for this income
    pub fn affordable_installment(&self, monthly_income: Money) -> Money {
        monthly_income.apply_rate(self.installment_income_share)
    }
}

/// credit score bounds and step-function parameters
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ScorePolicy {
    pub floor: u16,
    pub ceiling: u16,
    /// balances below this score at the floor
    pub min_balance: Decimal,
    /// balances above this stop earning increments
    pub max_balance: Decimal,
    /// balance step per increment
    pub step: Decimal,
    /// score points per increment
    pub points_per_step: u16,
}

impl Default for ScorePolicy {
    fn default() -> Self {
        Self {
            floor: 300,
            ceiling: 900,
            min_balance: dec!(10_000),
            max_balance: dec!(1_000_000),
            step: dec!(15_000),
            points_per_step: 10,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_affordable_installment() {
        let policy = LendingPolicy::default();
        // 240000 a year is 20000 a month, 20% of which is 4000
        assert_eq!(
            policy.affordable_installment(Money::from_major(20_000)),
            Money::from_major(4_000)
        );
    }

    #[test]
    fn test_default_thresholds() {
        let policy = LendingPolicy::default();
        assert_eq!(policy.min_credit_score, 450);
        assert_eq!(policy.max_principal, Money::from_major(5000));
        assert_eq!(policy.min_annual_rate, Rate::from_percentage(dec!(12)));
    }
}
