use chrono::{Duration, NaiveDate};
use hourglass_rs::SafeTimeProvider;
use log::{info, warn};
use rust_decimal::Decimal;

use crate::config::LendingPolicy;
use crate::decimal::{Money, Rate};
use crate::errors::Result;
use crate::events::{Event, EventStore};
use crate::model::BillingRecord;
use crate::store::LendingStore;
use crate::types::LoanId;

/// periodically computes advisory minimum-due records for approved loans
///
/// The minimum due is informational and never touches the installment
/// schedule. Billing is idempotent per cycle: a loan billed within the last
/// cycle window is skipped, so re-running within the window creates nothing.
pub struct BillingEngine {
    policy: LendingPolicy,
}

impl Default for BillingEngine {
    fn default() -> Self {
        Self::new(LendingPolicy::default())
    }
}

impl BillingEngine {
    pub fn new(policy: LendingPolicy) -> Self {
        Self { policy }
    }

    /// run one billing pass over all approved loans
    ///
    /// One loan's failure is logged and skipped, never aborting the others.
    /// Returns the number of billing records created.
    pub fn run_cycle<S: LendingStore>(
        &self,
        store: &S,
        time: &SafeTimeProvider,
        events: &mut EventStore,
    ) -> Result<u32> {
        let today = time.now().date_naive();
        let mut billed = 0u32;

        for loan_id in store.approved_loan_ids()? {
            match self.bill_loan(store, loan_id, today, events) {
                Ok(true) => billed += 1,
                Ok(false) => {}
                Err(e) => warn!("billing failed for loan {loan_id}: {e}"),
            }
        }

        info!("billing run completed for {billed} loans on {today}");
        Ok(billed)
    }

    /// bill one loan if its last record is at least a full cycle old
    fn bill_loan<S: LendingStore>(
        &self,
        store: &S,
        loan_id: LoanId,
        today: NaiveDate,
        events: &mut EventStore,
    ) -> Result<bool> {
        store.with_loan(loan_id, |unit| {
            if let Some(last) = unit.last_billing_record() {
                if (today - last.billing_date).num_days() < self.policy.billing_cycle_days {
                    return Ok(false);
                }
            }

            let record = BillingRecord {
                loan_id,
                billing_date: today,
                due_date: today + Duration::days(self.policy.billing_grace_days),
                min_due: self.minimum_due(unit.loan.principal, unit.loan.annual_rate),
            };

            info!(
                "billing loan {loan_id}: min due {} by {}, {} unpaid installments remain",
                record.min_due,
                record.due_date,
                unit.unpaid_count()
            );
            events.emit(Event::BillingRecordCreated {
                loan_id,
                billing_date: record.billing_date,
                due_date: record.due_date,
                min_due: record.min_due,
            });

            unit.billing_records.push(record);
            Ok(true)
        })
    }

    /// principal share plus one cycle of daily interest, half-up at the end
    fn minimum_due(&self, principal: Money, annual_rate: Rate) -> Money {
        let p = principal.as_decimal();
        let interest_due = annual_rate.daily() * Decimal::from(self.policy.billing_interest_days) * p;
        Money::from_decimal(p * self.policy.min_due_principal_share + interest_due)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decimal::Rate;
    use crate::model::{Installment, Loan, LoanUnit};
    use crate::types::{BorrowerId, LoanType};
    use chrono::{TimeZone, Utc};
    use hourglass_rs::TimeSource;
    use rust_decimal_macros::dec;

    use crate::store::MemoryStore;

    fn seeded_loan(store: &MemoryStore, approved: bool) -> LoanId {
        let loan = Loan {
            loan_id: LoanId::new_v4(),
            borrower_id: BorrowerId::new_v4(),
            loan_type: LoanType::Personal,
            principal: Money::from_major(5000),
            annual_rate: Rate::from_percentage(dec!(12)),
            term_months: 2,
            monthly_installment: Money::from_major(2550),
            total_payable: Money::from_major(5100),
            disbursement_date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            approved,
            residual_balance: Money::ZERO,
            created_at: Utc::now(),
        };
        let loan_id = loan.loan_id;
        let installments = vec![
            Installment::scheduled(
                loan_id,
                NaiveDate::from_ymd_opt(2024, 1, 31).unwrap(),
                Money::from_major(2550),
            ),
            Installment::scheduled(
                loan_id,
                NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
                Money::from_major(2550),
            ),
        ];
        store.create_loan(LoanUnit::new(loan, installments)).unwrap();
        loan_id
    }

    fn test_time(y: i32, m: u32, d: u32) -> SafeTimeProvider {
        SafeTimeProvider::new(TimeSource::Test(
            Utc.with_ymd_and_hms(y, m, d, 0, 0, 0).unwrap(),
        ))
    }

    #[test]
    fn test_minimum_due_amount() {
        let store = MemoryStore::new();
        let loan_id = seeded_loan(&store, true);
        let time = test_time(2024, 1, 20);
        let mut events = EventStore::new();

        let billed = BillingEngine::default()
            .run_cycle(&store, &time, &mut events)
            .unwrap();
        assert_eq!(billed, 1);

        let record = store.last_billing_record(loan_id).unwrap().unwrap();
        // 5000 * 0.03 + 0.12/365 * 30 * 5000 = 150 + 49.3151 -> 199.32
        assert_eq!(record.min_due, Money::from_str_exact("199.32").unwrap());
        assert_eq!(record.billing_date, NaiveDate::from_ymd_opt(2024, 1, 20).unwrap());
        assert_eq!(record.due_date, NaiveDate::from_ymd_opt(2024, 2, 4).unwrap());
    }

    #[test]
    fn test_idempotent_within_cycle_window() {
        let store = MemoryStore::new();
        let loan_id = seeded_loan(&store, true);
        let time = test_time(2024, 1, 20);
        let controller = time.test_control().unwrap();
        let engine = BillingEngine::default();
        let mut events = EventStore::new();

        assert_eq!(engine.run_cycle(&store, &time, &mut events).unwrap(), 1);
        assert_eq!(engine.run_cycle(&store, &time, &mut events).unwrap(), 0);

        // still inside the 30-day window
        controller.advance(Duration::days(29));
        assert_eq!(engine.run_cycle(&store, &time, &mut events).unwrap(), 0);

        // window elapsed, a second record is due
        controller.advance(Duration::days(1));
        assert_eq!(engine.run_cycle(&store, &time, &mut events).unwrap(), 1);

        let unit = store.loan_unit(loan_id).unwrap();
        assert_eq!(unit.billing_records.len(), 2);
    }

    #[test]
    fn test_unapproved_loans_skipped() {
        let store = MemoryStore::new();
        let loan_id = seeded_loan(&store, false);
        let time = test_time(2024, 1, 20);
        let mut events = EventStore::new();

        assert_eq!(
            BillingEngine::default()
                .run_cycle(&store, &time, &mut events)
                .unwrap(),
            0
        );
        assert!(store.last_billing_record(loan_id).unwrap().is_none());
    }

    #[test]
    fn test_multiple_loans_billed_independently() {
        let store = MemoryStore::new();
        let first = seeded_loan(&store, true);
        let second = seeded_loan(&store, true);
        let time = test_time(2024, 1, 20);
        let mut events = EventStore::new();

        assert_eq!(
            BillingEngine::default()
                .run_cycle(&store, &time, &mut events)
                .unwrap(),
            2
        );
        assert!(store.last_billing_record(first).unwrap().is_some());
        assert!(store.last_billing_record(second).unwrap().is_some());
        assert_eq!(events.events().len(), 2);
    }
}
