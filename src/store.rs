use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use crate::errors::{LendingError, Result};
use crate::model::{BillingRecord, Borrower, Installment, Loan, LoanUnit, Transaction};
use crate::types::{BorrowerId, LoanId};

/// synchronous data-access surface consumed by the engines
///
/// Loans are the unit of isolation: [`LendingStore::with_loan`] runs a block
/// against a mutable view of one loan and its installments and billing
/// records, committing all writes on success and discarding them on any
/// failure. Implementations must serialize concurrent `with_loan` calls for
/// the same loan; cross-loan operations may proceed in parallel.
pub trait LendingStore {
    fn find_borrower(&self, id: BorrowerId) -> Result<Borrower>;
    fn save_borrower(&self, borrower: Borrower) -> Result<()>;

    fn create_transaction(&self, transaction: Transaction) -> Result<()>;
    fn list_transactions(&self, borrower_id: BorrowerId) -> Result<Vec<Transaction>>;

    /// persist a loan together with its full schedule, atomically
    fn create_loan(&self, unit: LoanUnit) -> Result<()>;
    fn loan(&self, id: LoanId) -> Result<Loan>;
    fn approved_loan_ids(&self) -> Result<Vec<LoanId>>;
    fn installments(&self, loan_id: LoanId) -> Result<Vec<Installment>>;
    fn last_billing_record(&self, loan_id: LoanId) -> Result<Option<BillingRecord>>;

    /// read-only snapshot of one loan's unit
    fn loan_unit(&self, loan_id: LoanId) -> Result<LoanUnit>;

    /// run block against one loan; commit on success, roll back on any failure
    fn with_loan<T>(&self, loan_id: LoanId, f: impl FnOnce(&mut LoanUnit) -> Result<T>) -> Result<T>
    where
        Self: Sized;
}

#[derive(Debug, Default)]
struct StoreInner {
    borrowers: HashMap<BorrowerId, Borrower>,
    transactions: HashMap<BorrowerId, Vec<Transaction>>,
    loans: HashMap<LoanId, LoanUnit>,
}

/// in-memory store with per-loan mutual exclusion
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: RwLock<StoreInner>,
    loan_locks: Mutex<HashMap<LoanId, Arc<Mutex<()>>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create_borrower(&self, borrower: Borrower) -> Result<()> {
        let mut inner = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        inner.borrowers.insert(borrower.borrower_id, borrower);
        Ok(())
    }

    fn lock_for(&self, loan_id: LoanId) -> Arc<Mutex<()>> {
        let mut locks = self
            .loan_locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        locks.entry(loan_id).or_default().clone()
    }
}

/// sanity checks applied before a schedule is first persisted
fn check_schedule(unit: &LoanUnit) -> Result<()> {
    if unit.installments.is_empty() {
        return Err(LendingError::Consistency {
            message: format!("loan {} has no installments", unit.loan.loan_id),
        });
    }
    for pair in unit.installments.windows(2) {
        if pair[1].due_date <= pair[0].due_date {
            return Err(LendingError::Consistency {
                message: format!(
                    "installment due dates not strictly increasing: {} then {}",
                    pair[0].due_date, pair[1].due_date
                ),
            });
        }
    }
    let scheduled = crate::decimal::Money::sum(unit.installments.iter().map(|e| e.amount_due));
    if scheduled != unit.loan.total_payable {
        return Err(LendingError::Consistency {
            message: format!(
                "schedule sums to {scheduled}, expected {}",
                unit.loan.total_payable
            ),
        });
    }
    Ok(())
}

impl LendingStore for MemoryStore {
    fn find_borrower(&self, id: BorrowerId) -> Result<Borrower> {
        let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        inner
            .borrowers
            .get(&id)
            .cloned()
            .ok_or(LendingError::BorrowerNotFound { id })
    }

    fn save_borrower(&self, borrower: Borrower) -> Result<()> {
        let mut inner = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        let id = borrower.borrower_id;
        if !inner.borrowers.contains_key(&id) {
            return Err(LendingError::BorrowerNotFound { id });
        }
        inner.borrowers.insert(id, borrower);
        Ok(())
    }

    fn create_transaction(&self, transaction: Transaction) -> Result<()> {
        let mut inner = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        inner
            .transactions
            .entry(transaction.borrower_id)
            .or_default()
            .push(transaction);
        Ok(())
    }

    fn list_transactions(&self, borrower_id: BorrowerId) -> Result<Vec<Transaction>> {
        let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        Ok(inner
            .transactions
            .get(&borrower_id)
            .cloned()
            .unwrap_or_default())
    }

    fn create_loan(&self, unit: LoanUnit) -> Result<()> {
        check_schedule(&unit)?;
        let mut inner = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        inner.loans.insert(unit.loan.loan_id, unit);
        Ok(())
    }

    fn loan(&self, id: LoanId) -> Result<Loan> {
        let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        inner
            .loans
            .get(&id)
            .map(|u| u.loan.clone())
            .ok_or(LendingError::LoanNotFound { id })
    }

    fn approved_loan_ids(&self) -> Result<Vec<LoanId>> {
        let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        let mut ids: Vec<LoanId> = inner
            .loans
            .values()
            .filter(|u| u.loan.approved)
            .map(|u| u.loan.loan_id)
            .collect();
        ids.sort();
        Ok(ids)
    }

    fn installments(&self, loan_id: LoanId) -> Result<Vec<Installment>> {
        Ok(self.loan_unit(loan_id)?.installments)
    }

    fn last_billing_record(&self, loan_id: LoanId) -> Result<Option<BillingRecord>> {
        Ok(self.loan_unit(loan_id)?.last_billing_record().cloned())
    }

    fn loan_unit(&self, loan_id: LoanId) -> Result<LoanUnit> {
        let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        inner
            .loans
            .get(&loan_id)
            .cloned()
            .ok_or(LendingError::LoanNotFound { id: loan_id })
    }

    fn with_loan<T>(&self, loan_id: LoanId, f: impl FnOnce(&mut LoanUnit) -> Result<T>) -> Result<T> {
        let lock = self.lock_for(loan_id);
        let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);

        let mut unit = self.loan_unit(loan_id)?;
        let value = f(&mut unit)?;

        let mut inner = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        inner.loans.insert(loan_id, unit);
        Ok(value)
    }
}
