// 🔄 Transaction Transformer - raw rows in, normalized transactions out
// Strict YYYY-MM-DD dates, derived month names, absolute amounts

use crate::error::{Error, Result};
use crate::table::Table;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;
use std::path::Path;
use std::str::FromStr;

pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Header of the output sink. Downstream spreadsheets depend on this layout.
pub const OUTPUT_HEADERS: [&str; 8] = [
    "",
    "Month",
    "Date",
    "Description",
    "$",
    "Amount",
    "Category",
    "Subcategory",
];

// ============================================================================
// TRANSACTION
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transaction {
    pub date: NaiveDate,
    pub description: String,
    pub amount: Decimal,
    pub transaction_type: String,

    /// Full month name derived from `date`
    pub month: String,

    /// Assigned by the categorizer, empty until then
    pub category: String,
    pub subcategory: String,
}

impl Transaction {
    /// New, already normalized transaction
    pub fn new(date: NaiveDate, description: &str, amount: Decimal, transaction_type: &str) -> Self {
        let mut tx = Transaction {
            date,
            description: description.to_string(),
            amount,
            transaction_type: transaction_type.to_string(),
            month: String::new(),
            category: String::new(),
            subcategory: String::new(),
        };
        tx.normalize();
        tx
    }

    /// Derive the month and drop the amount's sign. Idempotent.
    pub fn normalize(&mut self) {
        self.month = month_name(self.date);
        self.amount = self.amount.abs();
    }

    pub fn is_categorized(&self) -> bool {
        !self.category.is_empty()
    }
}

pub fn month_name(date: NaiveDate) -> String {
    date.format("%B").to_string()
}

/// Parse a date under the single accepted layout: 4-digit year, 2-digit
/// month, 2-digit day, dash separated.
pub fn parse_date(value: &str) -> Option<NaiveDate> {
    let bytes = value.as_bytes();
    let well_formed = bytes.len() == 10
        && bytes[4] == b'-'
        && bytes[7] == b'-'
        && bytes
            .iter()
            .enumerate()
            .all(|(i, b)| i == 4 || i == 7 || b.is_ascii_digit());

    if !well_formed {
        return None;
    }
    NaiveDate::parse_from_str(value, DATE_FORMAT).ok()
}

// ============================================================================
// SOURCE -> TRANSACTIONS
// ============================================================================

/// Turn a raw transaction table into normalized transactions.
///
/// Columns other than Date, Description, Amount and Type are ignored. A
/// single bad or blank date or amount rejects the whole batch.
pub fn transactions_from_table(table: &Table) -> Result<Vec<Transaction>> {
    // Type is checked first so its absence is reported even when other
    // columns are missing too
    let type_idx = table.require("Type")?;
    let date_idx = table.require("Date")?;
    let description_idx = table.require("Description")?;
    let amount_idx = table.require("Amount")?;

    let mut transactions = Vec::with_capacity(table.len());

    for (line_num, record) in table.rows().enumerate() {
        let row = line_num + 2;

        let raw_date = Table::cell(record, date_idx).trim();
        let date = parse_date(raw_date).ok_or_else(|| Error::Format {
            row,
            value: raw_date.to_string(),
        })?;

        let raw_amount = Table::cell(record, amount_idx).trim();
        if raw_amount.is_empty() {
            return Err(Error::parse(
                table.name(),
                format!("missing amount on row {}", row),
            ));
        }
        let amount = Decimal::from_str(raw_amount).map_err(|e| {
            Error::parse(
                table.name(),
                format!("invalid amount '{}' on row {}: {}", raw_amount, row, e),
            )
        })?;

        transactions.push(Transaction::new(
            date,
            Table::cell(record, description_idx),
            amount,
            Table::cell(record, type_idx),
        ));
    }

    Ok(transactions)
}

/// Read and normalize a transaction CSV file
pub fn load_transactions(path: &Path) -> Result<Vec<Transaction>> {
    let table = Table::from_path(path)?;
    transactions_from_table(&table)
}

// ============================================================================
// TRANSACTIONS -> OUTPUT SINK
// ============================================================================

/// One row of the output sink, in presentation order
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutputRow {
    #[serde(rename = "")]
    pub spacer: String,

    #[serde(rename = "Month")]
    pub month: String,

    #[serde(rename = "Date")]
    pub date: String,

    #[serde(rename = "Description")]
    pub description: String,

    #[serde(rename = "$")]
    pub currency_marker: String,

    #[serde(rename = "Amount")]
    pub amount: String,

    #[serde(rename = "Category")]
    pub category: String,

    #[serde(rename = "Subcategory")]
    pub subcategory: String,
}

impl From<&Transaction> for OutputRow {
    fn from(tx: &Transaction) -> Self {
        OutputRow {
            spacer: String::new(),
            month: tx.month.clone(),
            date: tx.date.format(DATE_FORMAT).to_string(),
            description: tx.description.clone(),
            currency_marker: "$".to_string(),
            amount: tx.amount.to_string(),
            category: tx.category.clone(),
            subcategory: tx.subcategory.clone(),
        }
    }
}

/// Serialize transactions in the output layout
pub fn write_output<W: std::io::Write>(writer: W, transactions: &[Transaction]) -> Result<()> {
    let mut wtr = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(writer);

    // Header written by hand: serde cannot emit one for an empty batch
    wtr.write_record(OUTPUT_HEADERS)?;
    for tx in transactions {
        wtr.serialize(OutputRow::from(tx))?;
    }
    wtr.flush()?;
    Ok(())
}

/// Write the output sink file, replacing any previous content
pub fn save_output(path: &Path, transactions: &[Transaction]) -> Result<()> {
    let file = std::fs::File::create(path)?;
    write_output(file, transactions)
}

// ============================================================================
// TESTS
// ============================================================================
