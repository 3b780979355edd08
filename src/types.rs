use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// unique identifier for a borrower
pub type BorrowerId = Uuid;

/// unique identifier for a loan
pub type LoanId = Uuid;

/// direction of a ledger transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransactionKind {
    Credit,
    Debit,
}

impl TransactionKind {
    /// parse from a ledger cell, case-insensitive
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "CREDIT" => Some(TransactionKind::Credit),
            "DEBIT" => Some(TransactionKind::Debit),
            _ => None,
        }
    }
}

/// product type requested at origination
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LoanType {
    Personal,
    Auto,
    Education,
    Business,
}
