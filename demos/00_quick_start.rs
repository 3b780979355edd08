/// quick start - score a borrower, originate a loan, pay the first installment
use chrono::{NaiveDate, TimeZone, Utc};
use lending_core_rs::{
    Borrower, EventStore, LedgerRow, LoanRequest, LoanType, MemoryStore, Money, PaymentEngine,
    Rate, SafeTimeProvider, ScheduleGenerator, ScoringEngine, StaticTransactionSource,
    StatementBuilder, TimeSource, TransactionKind,
};
use rust_decimal_macros::dec;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let store = MemoryStore::new();
    let time = SafeTimeProvider::new(TimeSource::Test(
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
    ));
    let mut events = EventStore::new();

    // register a borrower (registration itself lives outside the core)
    let borrower = Borrower::new("111122223333", Money::from_major(300_000), time.now());
    let borrower_id = borrower.borrower_id;
    store.create_borrower(borrower)?;

    // score from the transaction ledger
    let source = StaticTransactionSource::new(vec![LedgerRow {
        external_ref: "111122223333".to_string(),
        date: NaiveDate::from_ymd_opt(2023, 6, 1).unwrap(),
        amount: Money::from_major(40_000),
        kind: TransactionKind::Credit,
    }]);
    let score = ScoringEngine::default().compute_score(&store, &source, borrower_id, &mut events)?;
    println!("credit score: {score}");

    // originate a 5000 loan at 12% over 6 periods
    let originated = ScheduleGenerator::default().originate(
        &store,
        LoanRequest {
            borrower_id,
            loan_type: LoanType::Personal,
            principal: Money::from_major(5_000),
            annual_rate: Rate::from_percentage(dec!(12)),
            term_months: 6,
            disbursement_date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
        },
        time.now(),
        &mut events,
    )?;
    println!("loan {} total payable {}", originated.loan.loan_id, originated.loan.total_payable);
    for installment in &originated.schedule {
        println!("  due {}: {}", installment.due_date, installment.amount_due);
    }

    // pay the first installment exactly on its due date
    let receipt = PaymentEngine::new().apply_payment(
        &store,
        originated.loan.loan_id,
        originated.schedule[0].amount_due,
        Some(originated.schedule[0].due_date),
        &time,
        &mut events,
    )?;
    println!("settled with ref {}", receipt.transaction_ref);

    // statement shows one settled line and five outstanding
    let statement = StatementBuilder::new().build(&store, originated.loan.loan_id)?;
    println!("{}", serde_json::to_string_pretty(&statement)?);

    Ok(())
}
