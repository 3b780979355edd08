use chrono::NaiveDate;
use hourglass_rs::SafeTimeProvider;
use log::info;
use uuid::Uuid;

use crate::decimal::Money;
use crate::errors::{DueHint, LendingError, Result};
use crate::events::{Event, EventStore};
use crate::model::Installment;
use crate::store::LendingStore;
use crate::types::LoanId;

/// outcome of a successful payment application
#[derive(Debug, Clone)]
pub struct PaymentReceipt {
    pub loan_id: LoanId,
    /// the installment settled by this payment, with its final amount and date
    pub settled: Installment,
    /// fresh reference for audit correlation
    pub transaction_ref: Uuid,
    /// how many later installments were recalculated
    pub reallocated: u32,
    /// delta absorbed when no installments remained to redistribute onto;
    /// positive means underpaid, negative means overpaid
    pub residual: Option<Money>,
}

fn hint(installment: &Installment) -> DueHint {
    DueHint {
        due_date: installment.due_date,
        amount_due: installment.amount_due,
    }
}

/// applies payments to installments, enforcing strictly sequential settlement
///
/// A payment settles the installment whose due date matches the payment date.
/// Exact payments settle in place; over- and underpayments settle at the paid
/// amount and redistribute the difference evenly across the remaining unpaid
/// installments, last one absorbing the rounding residual. All mutations for
/// one payment commit atomically or not at all.
#[derive(Debug, Default)]
pub struct PaymentEngine;

impl PaymentEngine {
    pub fn new() -> Self {
        Self
    }

    /// apply a payment to a loan; `payment_date` defaults to today
    pub fn apply_payment<S: LendingStore>(
        &self,
        store: &S,
        loan_id: LoanId,
        amount: Money,
        payment_date: Option<NaiveDate>,
        time: &SafeTimeProvider,
        events: &mut EventStore,
    ) -> Result<PaymentReceipt> {
        if !amount.is_positive() {
            return Err(LendingError::InvalidPaymentAmount { amount });
        }
        let date = payment_date.unwrap_or_else(|| time.now().date_naive());

        store.with_loan(loan_id, |unit| {
            let idx = unit
                .installments
                .iter()
                .position(|e| e.due_date == date)
                .ok_or_else(|| LendingError::NoInstallmentDue {
                    date,
                    next_due: unit.next_unpaid().map(hint),
                })?;

            if unit.installments[idx].paid {
                return Err(LendingError::AlreadySettled {
                    date,
                    next_due: unit.next_unpaid_after(date).map(hint),
                });
            }

            // strictly sequential settlement: nothing earlier may be open
            if let Some(outstanding) = unit.last_unpaid_before(date) {
                return Err(LendingError::EarlierInstallmentOutstanding {
                    outstanding: hint(outstanding),
                });
            }

            let original_due = unit.installments[idx].amount_due;
            let transaction_ref = Uuid::new_v4();

            unit.installments[idx].amount_due = amount;
            unit.installments[idx].paid = true;
            unit.installments[idx].payment_date = Some(date);

            let mut reallocated = 0u32;
            let mut residual = None;

            if amount != original_due {
                let later: Vec<usize> = unit
                    .installments
                    .iter()
                    .enumerate()
                    .filter(|(_, e)| !e.paid && e.due_date > date)
                    .map(|(i, _)| i)
                    .collect();
                let remaining_due =
                    Money::sum(later.iter().map(|&i| unit.installments[i].amount_due));

                // what the remaining schedule must still recover
                let delta = remaining_due + original_due - amount;

                if later.is_empty() {
                    unit.loan.residual_balance += delta;
                    residual = Some(delta);
                    events.emit(Event::ResidualRecorded {
                        loan_id,
                        residual: unit.loan.residual_balance,
                    });
                } else {
                    let shares = delta.allocate(later.len() as u32);
                    for (&i, share) in later.iter().zip(shares) {
                        unit.installments[i].amount_due = share;
                    }
                    reallocated = later.len() as u32;
                    events.emit(Event::ScheduleReallocated {
                        loan_id,
                        installments_adjusted: reallocated,
                        redistributed_total: delta,
                    });
                }
            }

            info!("payment of {amount} settled installment due {date} on loan {loan_id}");
            events.emit(Event::InstallmentSettled {
                loan_id,
                due_date: date,
                amount_paid: amount,
                transaction_ref,
            });

            Ok(PaymentReceipt {
                loan_id,
                settled: unit.installments[idx].clone(),
                transaction_ref,
                reallocated,
                residual,
            })
        })
    }
}
