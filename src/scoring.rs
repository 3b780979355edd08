use log::{info, warn};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

use crate::config::ScorePolicy;
use crate::decimal::Money;
use crate::errors::{LendingError, Result};
use crate::events::{Event, EventStore};
use crate::ledger::TransactionSource;
use crate::model::Transaction;
use crate::store::LendingStore;
use crate::types::{BorrowerId, TransactionKind};

/// derives a borrower's credit score from their transaction history
///
/// Ledger ingestion is idempotent: rows are persisted once and the borrower
/// is marked ingested, so repeated scoring runs recompute from the stored
/// ledger instead of re-inserting duplicates.
pub struct ScoringEngine {
    policy: ScorePolicy,
}

impl Default for ScoringEngine {
    fn default() -> Self {
        Self::new(ScorePolicy::default())
    }
}

impl ScoringEngine {
    pub fn new(policy: ScorePolicy) -> Self {
        Self { policy }
    }

    /// monotonic step function from net balance to score, always in
    /// [floor, ceiling]
    pub fn score_for_balance(&self, balance: Decimal) -> u16 {
        if balance < self.policy.min_balance {
            return self.policy.floor;
        }
        let effective = balance.min(self.policy.max_balance) - self.policy.min_balance;
        let increments = (effective / self.policy.step)
            .floor()
            .to_u64()
            .unwrap_or(u64::MAX);
        let raw = u64::from(self.policy.floor)
            .saturating_add(increments.saturating_mul(u64::from(self.policy.points_per_step)));
        raw.min(u64::from(self.policy.ceiling)) as u16
    }

    /// ingest the borrower's ledger rows (once), compute the score, and
    /// persist it onto the borrower
    pub fn compute_score<S: LendingStore>(
        &self,
        store: &S,
        source: &impl TransactionSource,
        borrower_id: BorrowerId,
        events: &mut EventStore,
    ) -> Result<u16> {
        let mut borrower = store.find_borrower(borrower_id)?;
        validate_external_ref(&borrower.external_ref)?;

        if !borrower.ledger_ingested {
            let parsed = source.rows_for(&borrower.external_ref)?;
            for failure in &parsed.failures {
                warn!(
                    "skipping ledger row {} for {}: {}",
                    failure.line, borrower.external_ref, failure.message
                );
            }
            if !parsed.failures.is_empty() {
                events.emit(Event::LedgerRowsSkipped {
                    borrower_id,
                    skipped: parsed.failures.len(),
                });
            }
            for row in parsed.rows {
                store.create_transaction(Transaction {
                    borrower_id,
                    date: row.date,
                    amount: row.amount,
                    kind: row.kind,
                })?;
            }
            borrower.ledger_ingested = true;
        }

        let transactions = store.list_transactions(borrower_id)?;
        if transactions.is_empty() {
            return Err(LendingError::NoTransactions {
                reference: borrower.external_ref.clone(),
            });
        }

        let balance = net_balance(&transactions);
        let score = self.score_for_balance(balance);

        borrower.credit_score = Some(score);
        store.save_borrower(borrower)?;

        info!("credit score for borrower {borrower_id}: {score} (balance {balance})");
        events.emit(Event::ScoreComputed {
            borrower_id,
            score,
            balance,
        });
        Ok(score)
    }
}

/// ledger references are 12-digit external ids
pub fn validate_external_ref(reference: &str) -> Result<()> {
    if reference.len() == 12 && reference.bytes().all(|b| b.is_ascii_digit()) {
        Ok(())
    } else {
        Err(LendingError::InvalidBorrowerReference {
            reference: reference.to_string(),
        })
    }
}

/// credits minus debits over the stored ledger
fn net_balance(transactions: &[Transaction]) -> Decimal {
    let mut income = Money::ZERO;
    let mut liabilities = Money::ZERO;
    for tx in transactions {
        match tx.kind {
            TransactionKind::Credit => income += tx.amount,
            TransactionKind::Debit => liabilities += tx.amount,
        }
    }
    (income - liabilities).as_decimal()
}
