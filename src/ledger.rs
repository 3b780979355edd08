use std::io::Read;
use std::path::PathBuf;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::decimal::Money;
use crate::errors::{LendingError, Result};
use crate::types::TransactionKind;

/// one successfully parsed ledger row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerRow {
    pub external_ref: String,
    pub date: NaiveDate,
    pub amount: Money,
    pub kind: TransactionKind,
}

/// a row that failed to parse, reported but never fatal to the run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParseFailure {
    pub line: u64,
    pub message: String,
}

/// outcome of one parsing pass: good rows plus per-row failures
#[derive(Debug, Clone, Default)]
pub struct ParsedLedger {
    pub rows: Vec<LedgerRow>,
    pub failures: Vec<ParseFailure>,
}

/// aggregate of a borrower's ledger rows
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LedgerSummary {
    pub income: Money,
    pub liabilities: Money,
}

impl LedgerSummary {
    pub fn balance(&self) -> rust_decimal::Decimal {
        (self.income - self.liabilities).as_decimal()
    }
}

/// raw CSV shape before validation
#[derive(Debug, Deserialize)]
struct RawRow {
    external_ref: String,
    date: String,
    amount: String,
    kind: String,
}

/// parse ledger rows from a CSV reader
///
/// Pure over its input: malformed rows are collected as [`ParseFailure`]s
/// and never abort the pass, so parsing stays independently testable from
/// aggregation.
pub fn parse_ledger<R: Read>(reader: R) -> Result<ParsedLedger> {
    let mut csv_reader = csv::Reader::from_reader(reader);
    let mut parsed = ParsedLedger::default();

    for (idx, record) in csv_reader.deserialize::<RawRow>().enumerate() {
        // header occupies line 1
        let line = idx as u64 + 2;
        let raw = match record {
            Ok(raw) => raw,
            Err(e) => {
                parsed.failures.push(ParseFailure {
                    line,
                    message: e.to_string(),
                });
                continue;
            }
        };
        match validate_row(&raw) {
            Ok(row) => parsed.rows.push(row),
            Err(message) => parsed.failures.push(ParseFailure { line, message }),
        }
    }

    Ok(parsed)
}

fn validate_row(raw: &RawRow) -> std::result::Result<LedgerRow, String> {
    let kind = TransactionKind::parse(&raw.kind)
        .ok_or_else(|| format!("unknown transaction kind: {:?}", raw.kind))?;
    let date = NaiveDate::parse_from_str(raw.date.trim(), "%Y-%m-%d")
        .map_err(|e| format!("bad date {:?}: {e}", raw.date))?;
    let amount = Money::from_str_exact(raw.amount.trim())
        .map_err(|e| format!("bad amount {:?}: {e}", raw.amount))?;
    Ok(LedgerRow {
        external_ref: raw.external_ref.trim().to_string(),
        date,
        amount,
        kind,
    })
}

/// fold rows into income and liability totals
pub fn summarize<'a, I: IntoIterator<Item = &'a LedgerRow>>(rows: I) -> LedgerSummary {
    rows.into_iter().fold(LedgerSummary::default(), |mut acc, row| {
        match row.kind {
            TransactionKind::Credit => acc.income += row.amount,
            TransactionKind::Debit => acc.liabilities += row.amount,
        }
        acc
    })
}

/// a restartable source of ledger rows for one borrower reference
pub trait TransactionSource {
    fn rows_for(&self, external_ref: &str) -> Result<ParsedLedger>;
}

/// CSV-file backed transaction source, re-read on every call
#[derive(Debug, Clone)]
pub struct CsvTransactionSource {
    path: PathBuf,
}

impl CsvTransactionSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl TransactionSource for CsvTransactionSource {
    fn rows_for(&self, external_ref: &str) -> Result<ParsedLedger> {
        let file = std::fs::File::open(&self.path).map_err(|e| LendingError::LedgerSource {
            message: format!("cannot open {}: {e}", self.path.display()),
        })?;
        let mut parsed = parse_ledger(file)?;
        parsed.rows.retain(|r| r.external_ref == external_ref);
        Ok(parsed)
    }
}

/// in-memory transaction source
#[derive(Debug, Clone, Default)]
pub struct StaticTransactionSource {
    rows: Vec<LedgerRow>,
}

impl StaticTransactionSource {
    pub fn new(rows: Vec<LedgerRow>) -> Self {
        Self { rows }
    }
}

impl TransactionSource for StaticTransactionSource {
    fn rows_for(&self, external_ref: &str) -> Result<ParsedLedger> {
        Ok(ParsedLedger {
            rows: self
                .rows
                .iter()
                .filter(|r| r.external_ref == external_ref)
                .cloned()
                .collect(),
            failures: Vec::new(),
        })
    }
}
