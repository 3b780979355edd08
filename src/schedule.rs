use chrono::{DateTime, Duration, NaiveDate, Utc};
use rust_decimal::Decimal;

use crate::config::LendingPolicy;
use crate::decimal::{Money, Rate};
use crate::errors::{LendingError, Result};
use crate::events::{Event, EventStore};
use crate::model::{Installment, Loan, LoanUnit};
use crate::store::LendingStore;
use crate::types::{BorrowerId, LoanId, LoanType};

/// loan terms requested at origination
#[derive(Debug, Clone)]
pub struct LoanRequest {
    pub borrower_id: BorrowerId,
    pub loan_type: LoanType,
    pub principal: Money,
    pub annual_rate: Rate,
    pub term_months: u32,
    pub disbursement_date: NaiveDate,
}

/// origination result: the created loan and its full schedule
#[derive(Debug, Clone)]
pub struct OriginatedLoan {
    pub loan: Loan,
    pub schedule: Vec<Installment>,
}

/// originates loans and generates their flat-rate EMI schedules
///
/// Interest is flat-rate: computed once on the original principal for the
/// full term, never on a declining balance. The last installment absorbs the
/// rounding residual so the schedule sum equals total payable exactly.
pub struct ScheduleGenerator {
    policy: LendingPolicy,
}

impl Default for ScheduleGenerator {
    fn default() -> Self {
        Self::new(LendingPolicy::default())
    }
}

impl ScheduleGenerator {
    pub fn new(policy: LendingPolicy) -> Self {
        Self { policy }
    }

    /// validate eligibility, build the schedule, and persist loan plus
    /// installments as one atomic unit
    pub fn originate<S: LendingStore>(
        &self,
        store: &S,
        request: LoanRequest,
        now: DateTime<Utc>,
        events: &mut EventStore,
    ) -> Result<OriginatedLoan> {
        let borrower = store.find_borrower(request.borrower_id)?;

        if request.term_months == 0 {
            return Err(LendingError::InvalidTerm);
        }
        if !request.principal.is_positive() {
            return Err(LendingError::InvalidPrincipal {
                amount: request.principal,
            });
        }

        let score = borrower
            .credit_score
            .ok_or(LendingError::ScoreNotAvailable {
                id: borrower.borrower_id,
            })?;
        if score < self.policy.min_credit_score {
            return Err(LendingError::ScoreBelowMinimum {
                score,
                minimum: self.policy.min_credit_score,
            });
        }
        if borrower.annual_income < self.policy.min_annual_income {
            return Err(LendingError::IncomeBelowMinimum {
                income: borrower.annual_income,
                minimum: self.policy.min_annual_income,
            });
        }
        if request.principal > self.policy.max_principal {
            return Err(LendingError::PrincipalAboveCap {
                requested: request.principal,
                cap: self.policy.max_principal,
            });
        }
        if request.annual_rate < self.policy.min_annual_rate {
            return Err(LendingError::RateBelowFloor {
                rate: request.annual_rate,
                floor: self.policy.min_annual_rate,
            });
        }

        // flat-rate interest on the original principal for the full term
        let total_interest = Money::from_decimal(
            request.principal.as_decimal() * request.annual_rate.as_decimal()
                / Decimal::from(12)
                * Decimal::from(request.term_months),
        );
        let total_payable = request.principal + total_interest;
        let base_installment = total_payable.div_round(request.term_months);

        let monthly_income = borrower.monthly_income();
        if base_installment > self.policy.affordable_installment(monthly_income) {
            return Err(LendingError::InstallmentUnaffordable {
                installment: base_installment,
                monthly_income,
            });
        }

        let loan = Loan {
            loan_id: LoanId::new_v4(),
            borrower_id: request.borrower_id,
            loan_type: request.loan_type,
            principal: request.principal,
            annual_rate: request.annual_rate,
            term_months: request.term_months,
            monthly_installment: base_installment,
            total_payable,
            disbursement_date: request.disbursement_date,
            approved: true,
            residual_balance: Money::ZERO,
            created_at: now,
        };

        let amounts = total_payable.allocate(request.term_months);
        let schedule: Vec<Installment> = amounts
            .into_iter()
            .enumerate()
            .map(|(i, amount)| {
                let due_date = request.disbursement_date
                    + Duration::days(self.policy.installment_interval_days * (i as i64 + 1));
                Installment::scheduled(loan.loan_id, due_date, amount)
            })
            .collect();

        // single atomic insert: nothing is visible unless the whole schedule
        // passes the store's consistency checks
        store.create_loan(LoanUnit::new(loan.clone(), schedule.clone()))?;

        events.emit(Event::LoanOriginated {
            loan_id: loan.loan_id,
            borrower_id: loan.borrower_id,
            principal: loan.principal,
            total_payable,
            installments: loan.term_months,
        });

        Ok(OriginatedLoan { loan, schedule })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decimal::Rate;
    use crate::model::Borrower;
    use crate::store::MemoryStore;
    use rust_decimal_macros::dec;

    fn seeded_borrower(store: &MemoryStore, score: Option<u16>, income: i64) -> BorrowerId {
        let mut borrower = Borrower::new("111122223333", Money::from_major(income), Utc::now());
        borrower.credit_score = score;
        let id = borrower.borrower_id;
        store.create_borrower(borrower).unwrap();
        id
    }

    fn request(borrower_id: BorrowerId, principal: i64, rate: Decimal, term: u32) -> LoanRequest {
        LoanRequest {
            borrower_id,
            loan_type: LoanType::Personal,
            principal: Money::from_major(principal),
            annual_rate: Rate::from_percentage(rate),
            term_months: term,
            disbursement_date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
        }
    }

    #[test]
    fn test_worked_example_5000_12_6() {
        let store = MemoryStore::new();
        let borrower_id = seeded_borrower(&store, Some(600), 300_000);
        let mut events = EventStore::new();

        let originated = ScheduleGenerator::default()
            .originate(&store, request(borrower_id, 5000, dec!(12), 6), Utc::now(), &mut events)
            .unwrap();

        // total_interest = 5000 * 0.12 / 12 * 6 = 300
        assert_eq!(originated.loan.total_payable, Money::from_major(5300));
        assert_eq!(
            originated.loan.monthly_installment,
            Money::from_str_exact("883.33").unwrap()
        );

        let amounts: Vec<Money> = originated.schedule.iter().map(|e| e.amount_due).collect();
        assert_eq!(amounts[..5], vec![Money::from_str_exact("883.33").unwrap(); 5]);
        assert_eq!(amounts[5], Money::from_str_exact("883.35").unwrap());
        assert_eq!(Money::sum(amounts), Money::from_major(5300));

        // fixed 30-day periods, not calendar months
        assert_eq!(
            originated.schedule[0].due_date,
            NaiveDate::from_ymd_opt(2024, 1, 31).unwrap()
        );
        assert_eq!(
            originated.schedule[1].due_date,
            NaiveDate::from_ymd_opt(2024, 3, 1).unwrap()
        );
        assert_eq!(
            originated.schedule[5].due_date,
            NaiveDate::from_ymd_opt(2024, 6, 29).unwrap()
        );

        // persisted atomically
        assert_eq!(store.installments(originated.loan.loan_id).unwrap().len(), 6);
        assert!(store.loan(originated.loan.loan_id).unwrap().approved);
    }

    #[test]
    fn test_schedule_sum_never_drifts() {
        let store = MemoryStore::new();
        let borrower_id = seeded_borrower(&store, Some(900), 600_000);
        let generator = ScheduleGenerator::default();
        let mut events = EventStore::new();

        for (principal, rate, term) in [
            (1, dec!(12), 1u32),
            (999, dec!(13.75), 7),
            (4999, dec!(12.01), 11),
            (3333, dec!(18), 36),
            (5000, dec!(99.99), 13),
        ] {
            let originated = generator
                .originate(&store, request(borrower_id, principal, rate, term), Utc::now(), &mut events)
                .unwrap();
            let sum = Money::sum(originated.schedule.iter().map(|e| e.amount_due));
            assert_eq!(sum, originated.loan.total_payable, "drift at {principal}/{rate}/{term}");
            assert_eq!(originated.schedule.len(), term as usize);
        }
    }

    #[test]
    fn test_eligibility_rejections() {
        let store = MemoryStore::new();
        let generator = ScheduleGenerator::default();
        let mut events = EventStore::new();
        let now = Utc::now();

        let no_score = seeded_borrower(&store, None, 300_000);
        assert!(matches!(
            generator.originate(&store, request(no_score, 5000, dec!(12), 6), now, &mut events),
            Err(LendingError::ScoreNotAvailable { .. })
        ));

        let low_score = seeded_borrower(&store, Some(449), 300_000);
        assert!(matches!(
            generator.originate(&store, request(low_score, 5000, dec!(12), 6), now, &mut events),
            Err(LendingError::ScoreBelowMinimum { score: 449, .. })
        ));

        let low_income = seeded_borrower(&store, Some(600), 149_999);
        assert!(matches!(
            generator.originate(&store, request(low_income, 5000, dec!(12), 6), now, &mut events),
            Err(LendingError::IncomeBelowMinimum { .. })
        ));

        let eligible = seeded_borrower(&store, Some(600), 300_000);
        assert!(matches!(
            generator.originate(&store, request(eligible, 5001, dec!(12), 6), now, &mut events),
            Err(LendingError::PrincipalAboveCap { .. })
        ));
        assert!(matches!(
            generator.originate(&store, request(eligible, 5000, dec!(11.99), 6), now, &mut events),
            Err(LendingError::RateBelowFloor { .. })
        ));
        assert!(matches!(
            generator.originate(&store, request(eligible, 5000, dec!(12), 0), now, &mut events),
            Err(LendingError::InvalidTerm)
        ));
    }

    #[test]
    fn test_affordability_rejection() {
        let store = MemoryStore::new();
        // 150000 a year is 12500 a month; 20% of that is 2500
        let borrower_id = seeded_borrower(&store, Some(600), 150_000);
        let mut events = EventStore::new();

        // 5000 at 12% over 2 months: total 5100, installment 2550 > 2500
        let result = ScheduleGenerator::default().originate(
            &store,
            request(borrower_id, 5000, dec!(12), 2),
            Utc::now(),
            &mut events,
        );
        assert!(matches!(
            result,
            Err(LendingError::InstallmentUnaffordable { .. })
        ));

        // a longer term brings the installment under the ceiling
        let ok = ScheduleGenerator::default().originate(
            &store,
            request(borrower_id, 5000, dec!(12), 6),
            Utc::now(),
            &mut events,
        );
        assert!(ok.is_ok());
    }

    #[test]
    fn test_rejected_origination_persists_nothing() {
        let store = MemoryStore::new();
        let borrower_id = seeded_borrower(&store, Some(300), 300_000);
        let mut events = EventStore::new();

        let result = ScheduleGenerator::default().originate(
            &store,
            request(borrower_id, 5000, dec!(12), 6),
            Utc::now(),
            &mut events,
        );
        assert!(result.is_err());
        assert!(store.approved_loan_ids().unwrap().is_empty());
        assert!(events.events().is_empty());
    }
}
