use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::decimal::{Money, Rate};
use crate::types::{BorrowerId, LoanId, LoanType, TransactionKind};

/// borrower identity and scoring state
///
/// Created by the surrounding registration flow; the scoring engine is the
/// only component that mutates `credit_score` and `ledger_ingested`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Borrower {
    pub borrower_id: BorrowerId,
    /// external unique reference used to match ledger rows (12-digit id)
    pub external_ref: String,
    pub annual_income: Money,
    /// in [300, 900] once computed, absent until then
    pub credit_score: Option<u16>,
    /// set once the ledger source has been ingested, guards duplicate ingestion
    pub ledger_ingested: bool,
    pub created_at: DateTime<Utc>,
}

impl Borrower {
    pub fn new(external_ref: impl Into<String>, annual_income: Money, now: DateTime<Utc>) -> Self {
        Self {
            borrower_id: BorrowerId::new_v4(),
            external_ref: external_ref.into(),
            annual_income,
            credit_score: None,
            ledger_ingested: false,
            created_at: now,
        }
    }

    pub fn monthly_income(&self) -> Money {
        self.annual_income.div_round(12)
    }
}

/// append-only ledger entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub borrower_id: BorrowerId,
    pub date: NaiveDate,
    pub amount: Money,
    pub kind: TransactionKind,
}

/// loan terms fixed at origination
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Loan {
    pub loan_id: LoanId,
    pub borrower_id: BorrowerId,
    pub loan_type: LoanType,
    pub principal: Money,
    pub annual_rate: Rate,
    pub term_months: u32,
    /// uniform installment amount before any reallocation
    pub monthly_installment: Money,
    /// principal plus flat-rate interest, the exact schedule sum
    pub total_payable: Money,
    pub disbursement_date: NaiveDate,
    pub approved: bool,
    /// over/underpayment left after a final payment with no installments to
    /// reallocate onto; positive means still owed, negative means overpaid
    pub residual_balance: Money,
    pub created_at: DateTime<Utc>,
}

/// one scheduled repayment obligation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Installment {
    pub loan_id: LoanId,
    pub due_date: NaiveDate,
    pub amount_due: Money,
    pub paid: bool,
    pub payment_date: Option<NaiveDate>,
}

impl Installment {
    pub fn scheduled(loan_id: LoanId, due_date: NaiveDate, amount_due: Money) -> Self {
        Self {
            loan_id,
            due_date,
            amount_due,
            paid: false,
            payment_date: None,
        }
    }
}

/// billing-cycle minimum-due snapshot, one per completed cycle per loan
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BillingRecord {
    pub loan_id: LoanId,
    pub billing_date: NaiveDate,
    pub due_date: NaiveDate,
    pub min_due: Money,
}

/// a loan together with the installments and billing records it owns
///
/// This is the unit of isolation: scoped store transactions hand out a
/// mutable `LoanUnit` and commit or discard it as a whole.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoanUnit {
    pub loan: Loan,
    /// ordered by due date, strictly increasing
    pub installments: Vec<Installment>,
    pub billing_records: Vec<BillingRecord>,
}

impl LoanUnit {
    pub fn new(loan: Loan, installments: Vec<Installment>) -> Self {
        Self {
            loan,
            installments,
            billing_records: Vec::new(),
        }
    }

    /// earliest unpaid installment, if any
    pub fn next_unpaid(&self) -> Option<&Installment> {
        self.installments.iter().find(|e| !e.paid)
    }

    /// earliest unpaid installment strictly after the given due date
    pub fn next_unpaid_after(&self, due_date: NaiveDate) -> Option<&Installment> {
        self.installments
            .iter()
            .find(|e| !e.paid && e.due_date > due_date)
    }

    /// latest unpaid installment strictly before the given due date
    pub fn last_unpaid_before(&self, due_date: NaiveDate) -> Option<&Installment> {
        self.installments
            .iter()
            .rev()
            .find(|e| !e.paid && e.due_date < due_date)
    }

    /// sum of unpaid installment amounts
    pub fn outstanding_total(&self) -> Money {
        Money::sum(self.installments.iter().filter(|e| !e.paid).map(|e| e.amount_due))
    }

    pub fn unpaid_count(&self) -> usize {
        self.installments.iter().filter(|e| !e.paid).count()
    }

    pub fn is_closed(&self) -> bool {
        !self.installments.is_empty() && self.installments.iter().all(|e| e.paid)
    }

    /// most recent billing record by billing date
    pub fn last_billing_record(&self) -> Option<&BillingRecord> {
        self.billing_records.iter().max_by_key(|b| b.billing_date)
    }
}
