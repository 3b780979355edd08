/// partial payment - underpay an installment and watch the schedule reallocate
use chrono::{NaiveDate, TimeZone, Utc};
use lending_core_rs::{
    Borrower, EventStore, LoanRequest, LoanType, MemoryStore, Money, PaymentEngine, Rate,
    SafeTimeProvider, ScheduleGenerator, TimeSource,
};
use lending_core_rs::store::LendingStore;
use rust_decimal_macros::dec;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let store = MemoryStore::new();
    let time = SafeTimeProvider::new(TimeSource::Test(
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
    ));
    let mut events = EventStore::new();

    let mut borrower = Borrower::new("111122223333", Money::from_major(300_000), time.now());
    borrower.credit_score = Some(700);
    let borrower_id = borrower.borrower_id;
    store.create_borrower(borrower)?;

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
    let loan_id = originated.loan.loan_id;

    // pay 800 against the 883.33 first installment
    let receipt = PaymentEngine::new().apply_payment(
        &store,
        loan_id,
        Money::from_major(800),
        Some(originated.schedule[0].due_date),
        &time,
        &mut events,
    )?;
    println!(
        "accepted {} against {}, {} installments recalculated",
        receipt.settled.amount_due,
        originated.schedule[0].amount_due,
        receipt.reallocated
    );

    for installment in store.installments(loan_id)? {
        println!(
            "  due {}: {} ({})",
            installment.due_date,
            installment.amount_due,
            if installment.paid { "paid" } else { "open" }
        );
    }

    Ok(())
}
