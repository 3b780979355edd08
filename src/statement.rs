use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::decimal::Money;
use crate::errors::{LendingError, Result};
use crate::model::LoanUnit;
use crate::store::LendingStore;
use crate::types::LoanId;

/// a settled installment with its amortized principal/interest split
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettledLine {
    pub date: NaiveDate,
    pub principal: Money,
    pub interest: Money,
    pub amount_paid: Money,
}

/// an installment still owed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutstandingLine {
    pub due_date: NaiveDate,
    pub amount_due: Money,
}

/// repayment statement: settled and outstanding views in due-date order
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Statement {
    pub loan_id: LoanId,
    pub settled: Vec<SettledLine>,
    pub outstanding: Vec<OutstandingLine>,
}

/// builds repayment statements from a loan's installment set
///
/// The interest split is a flat amortization approximation: one month of the
/// annual rate applied to the paid amount, not a declining-balance schedule.
/// Fully settled loans are refused; a closed loan has no statement.
#[derive(Debug, Default)]
pub struct StatementBuilder;

impl StatementBuilder {
    pub fn new() -> Self {
        Self
    }

    pub fn build<S: LendingStore>(&self, store: &S, loan_id: LoanId) -> Result<Statement> {
        let unit = store.loan_unit(loan_id)?;
        self.build_from_unit(&unit)
    }

    /// partition one loan unit into settled and outstanding lines
    pub fn build_from_unit(&self, unit: &LoanUnit) -> Result<Statement> {
        let loan_id = unit.loan.loan_id;
        if unit.installments.is_empty() {
            return Err(LendingError::EmptySchedule { id: loan_id });
        }
        if unit.is_closed() {
            return Err(LendingError::LoanClosed { id: loan_id });
        }

        let monthly_rate = unit.loan.annual_rate.monthly();
        let mut settled = Vec::new();
        let mut outstanding = Vec::new();

        for installment in &unit.installments {
            if installment.paid {
                let interest = installment.amount_due.apply_rate(monthly_rate);
                settled.push(SettledLine {
                    date: installment.payment_date.unwrap_or(installment.due_date),
                    principal: installment.amount_due - interest,
                    interest,
                    amount_paid: installment.amount_due,
                });
            } else {
                outstanding.push(OutstandingLine {
                    due_date: installment.due_date,
                    amount_due: installment.amount_due,
                });
            }
        }

        Ok(Statement {
            loan_id,
            settled,
            outstanding,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decimal::Rate;
    use crate::model::{Installment, Loan};
    use crate::store::MemoryStore;
    use crate::types::{BorrowerId, LoanType};
    use chrono::Utc;
    use rust_decimal_macros::dec;

    fn money(s: &str) -> Money {
        Money::from_str_exact(s).unwrap()
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn unit(installments: Vec<Installment>) -> LoanUnit {
        let loan = Loan {
            loan_id: LoanId::new_v4(),
            borrower_id: BorrowerId::new_v4(),
            loan_type: LoanType::Personal,
            principal: Money::from_major(5000),
            annual_rate: Rate::from_percentage(dec!(12)),
            term_months: installments.len() as u32,
            monthly_installment: money("883.33"),
            total_payable: Money::sum(installments.iter().map(|e| e.amount_due)),
            disbursement_date: date(2024, 1, 1),
            approved: true,
            residual_balance: Money::ZERO,
            created_at: Utc::now(),
        };
        let installments = installments
            .into_iter()
            .map(|mut e| {
                e.loan_id = loan.loan_id;
                e
            })
            .collect();
        LoanUnit::new(loan, installments)
    }

    fn paid(due: NaiveDate, amount: &str, paid_on: NaiveDate) -> Installment {
        Installment {
            loan_id: LoanId::nil(),
            due_date: due,
            amount_due: Money::from_str_exact(amount).unwrap(),
            paid: true,
            payment_date: Some(paid_on),
        }
    }

    fn open(due: NaiveDate, amount: &str) -> Installment {
        Installment::scheduled(LoanId::nil(), due, Money::from_str_exact(amount).unwrap())
    }

    #[test]
    fn test_partition_preserves_due_date_order() {
        let unit = unit(vec![
            paid(date(2024, 1, 31), "883.33", date(2024, 1, 31)),
            paid(date(2024, 3, 1), "883.33", date(2024, 2, 28)),
            open(date(2024, 3, 31), "883.33"),
            open(date(2024, 4, 30), "883.35"),
        ]);

        let statement = StatementBuilder::new().build_from_unit(&unit).unwrap();
        assert_eq!(statement.settled.len(), 2);
        assert_eq!(statement.outstanding.len(), 2);
        assert!(statement.settled[0].date < statement.settled[1].date);
        assert!(statement.outstanding[0].due_date < statement.outstanding[1].due_date);
        assert_eq!(statement.outstanding[1].amount_due, money("883.35"));
    }

    #[test]
    fn test_amortized_split() {
        let unit = unit(vec![
            paid(date(2024, 1, 31), "883.33", date(2024, 1, 31)),
            open(date(2024, 3, 1), "883.33"),
        ]);

        let statement = StatementBuilder::new().build_from_unit(&unit).unwrap();
        let line = &statement.settled[0];
        // 12% annual is 1% monthly: 883.33 * 0.01 = 8.8333 -> 8.83
        assert_eq!(line.interest, money("8.83"));
        assert_eq!(line.principal, money("874.50"));
        assert_eq!(line.principal + line.interest, line.amount_paid);
    }

    #[test]
    fn test_closed_loan_refused() {
        let unit = unit(vec![paid(date(2024, 1, 31), "883.33", date(2024, 1, 31))]);
        let err = StatementBuilder::new().build_from_unit(&unit).unwrap_err();
        assert!(matches!(err, LendingError::LoanClosed { .. }));
    }

    #[test]
    fn test_empty_schedule_refused() {
        let unit = unit(Vec::new());
        let err = StatementBuilder::new().build_from_unit(&unit).unwrap_err();
        assert!(matches!(err, LendingError::EmptySchedule { .. }));
    }

    #[test]
    fn test_missing_loan() {
        let store = MemoryStore::new();
        let err = StatementBuilder::new().build(&store, LoanId::new_v4()).unwrap_err();
        assert!(matches!(err, LendingError::LoanNotFound { .. }));
    }

    #[test]
    fn test_statement_serializes() {
        let unit = unit(vec![
            paid(date(2024, 1, 31), "883.33", date(2024, 1, 31)),
            open(date(2024, 3, 1), "883.33"),
        ]);
        let statement = StatementBuilder::new().build_from_unit(&unit).unwrap();

        let json = serde_json::to_string(&statement).unwrap();
        let back: Statement = serde_json::from_str(&json).unwrap();
        assert_eq!(back.settled, statement.settled);
        assert_eq!(back.outstanding, statement.outstanding);
    }
}
