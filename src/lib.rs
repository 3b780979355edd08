pub mod billing;
pub mod config;
pub mod decimal;
pub mod errors;
pub mod events;
pub mod ledger;
pub mod model;
pub mod payment;
pub mod schedule;
pub mod scoring;
pub mod statement;
pub mod store;
pub mod types;

// re-export key types
pub use billing::BillingEngine;
pub use config::{LendingPolicy, ScorePolicy};
pub use decimal::{Money, Rate};
pub use errors::{DueHint, LendingError, Result};
pub use events::{Event, EventStore};
pub use ledger::{
    parse_ledger, summarize, CsvTransactionSource, LedgerRow, LedgerSummary, ParseFailure,
    ParsedLedger, StaticTransactionSource, TransactionSource,
};
pub use model::{BillingRecord, Borrower, Installment, Loan, LoanUnit, Transaction};
pub use payment::{PaymentEngine, PaymentReceipt};
pub use schedule::{LoanRequest, OriginatedLoan, ScheduleGenerator};
pub use scoring::ScoringEngine;
pub use statement::{OutstandingLine, SettledLine, Statement, StatementBuilder};
pub use store::{LendingStore, MemoryStore};
pub use types::{BorrowerId, LoanId, LoanType, TransactionKind};

// re-export external dependencies that users will need
pub use chrono;
pub use hourglass_rs::{SafeTimeProvider, TimeSource};
pub use rust_decimal::Decimal;
pub use uuid::Uuid;
