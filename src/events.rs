use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::decimal::Money;
use crate::types::{BorrowerId, LoanId};

/// audit events emitted by the engines during operations
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Event {
    ScoreComputed {
        borrower_id: BorrowerId,
        score: u16,
        balance: rust_decimal::Decimal,
    },
    LedgerRowsSkipped {
        borrower_id: BorrowerId,
        skipped: usize,
    },
    LoanOriginated {
        loan_id: LoanId,
        borrower_id: BorrowerId,
        principal: Money,
        total_payable: Money,
        installments: u32,
    },
    BillingRecordCreated {
        loan_id: LoanId,
        billing_date: NaiveDate,
        due_date: NaiveDate,
        min_due: Money,
    },
    InstallmentSettled {
        loan_id: LoanId,
        due_date: NaiveDate,
        amount_paid: Money,
        transaction_ref: Uuid,
    },
    ScheduleReallocated {
        loan_id: LoanId,
        installments_adjusted: u32,
        redistributed_total: Money,
    },
    ResidualRecorded {
        loan_id: LoanId,
        residual: Money,
    },
}

/// event store for collecting events during operations
#[derive(Debug, Default)]
pub struct EventStore {
    events: Vec<Event>,
}

impl EventStore {
    pub fn new() -> Self {
        Self { events: Vec::new() }
    }

    pub fn emit(&mut self, event: Event) {
        self.events.push(event);
    }

    pub fn take_events(&mut self) -> Vec<Event> {
        std::mem::take(&mut self.events)
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }
}
