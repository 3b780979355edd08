use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::decimal::{Money, Rate};
use crate::types::{BorrowerId, LoanId};

/// guidance payload naming the installment a caller should act on next
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DueHint {
    pub due_date: NaiveDate,
    pub amount_due: Money,
}

#[derive(Error, Debug)]
pub enum LendingError {
    #[error("borrower not found: {id}")]
    BorrowerNotFound { id: BorrowerId },

    #[error("loan not found: {id}")]
    LoanNotFound { id: LoanId },

    #[error("no ledger transactions found for borrower reference {reference}")]
    NoTransactions { reference: String },

    #[error("invalid borrower reference: {reference}")]
    InvalidBorrowerReference { reference: String },

    #[error("credit score not available for borrower {id}")]
    ScoreNotAvailable { id: BorrowerId },

    #[error("credit score {score} below eligibility minimum {minimum}")]
    ScoreBelowMinimum { score: u16, minimum: u16 },

    #[error("annual income {income} below minimum threshold {minimum}")]
    IncomeBelowMinimum { income: Money, minimum: Money },

    #[error("principal {requested} exceeds per-loan cap {cap}")]
    PrincipalAboveCap { requested: Money, cap: Money },

    #[error("interest rate {rate} below minimum floor {floor}")]
    RateBelowFloor { rate: Rate, floor: Rate },

    #[error("term must be a positive number of periods")]
    InvalidTerm,

    #[error("principal must be positive, got {amount}")]
    InvalidPrincipal { amount: Money },

    #[error("installment {installment} exceeds affordable share of monthly income {monthly_income}")]
    InstallmentUnaffordable {
        installment: Money,
        monthly_income: Money,
    },

    #[error("invalid payment amount: {amount}")]
    InvalidPaymentAmount { amount: Money },

    #[error("no installment due on {date}")]
    NoInstallmentDue {
        date: NaiveDate,
        next_due: Option<DueHint>,
    },

    #[error("installment on {date} already settled")]
    AlreadySettled {
        date: NaiveDate,
        next_due: Option<DueHint>,
    },

    #[error("earlier installment due {} is still unpaid", .outstanding.due_date)]
    EarlierInstallmentOutstanding { outstanding: DueHint },

    #[error("no installments exist for loan {id}")]
    EmptySchedule { id: LoanId },

    #[error("loan {id} is closed: all installments settled")]
    LoanClosed { id: LoanId },

    #[error("invalid date: {message}")]
    InvalidDate { message: String },

    #[error("schedule inconsistency: {message}")]
    Consistency { message: String },

    #[error("ledger source error: {message}")]
    LedgerSource { message: String },
}

impl LendingError {
    /// the next-installment guidance attached to a sequencing rejection, if any
    pub fn guidance(&self) -> Option<DueHint> {
        match self {
            LendingError::NoInstallmentDue { next_due, .. } => *next_due,
            LendingError::AlreadySettled { next_due, .. } => *next_due,
            LendingError::EarlierInstallmentOutstanding { outstanding } => Some(*outstanding),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, LendingError>;
