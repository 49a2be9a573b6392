// ⚖️ Reconciliation - recompute expected categories and compare
// QA pass over already-categorized rows; never mutates its inputs
//
// Text normalization before comparison:
//   category:     lowercase, drop everything but [a-z0-9], trim
//   subcategory:  lowercase, trim
//
// The two fields are deliberately normalized differently; category
// comparison is the more permissive one.

use crate::db;
use crate::error::{Error, Result};
use crate::rules::{KeywordRule, Mapping};
use crate::store::{self, CATEGORY_COLUMN, KEYWORD_COLUMN, SUBCATEGORY_COLUMN};
use crate::table::Table;
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const MATCH_TRUE: &str = "TRUE";
pub const MATCH_FALSE: &str = "FALSE";

pub const RESULT_HEADERS: [&str; 8] = [
    "Transaction Detail",
    "Category",
    "Subcategory",
    "EXPECTED_CATEGORY",
    "EXPECTED_SUBCATEGORY",
    "Keyword",
    "CATEGORY_MATCH",
    "SUBCATEGORY_MATCH",
];

pub fn match_text(matched: bool) -> &'static str {
    if matched {
        MATCH_TRUE
    } else {
        MATCH_FALSE
    }
}

pub fn normalize_category(text: &str) -> String {
    text.to_lowercase()
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .collect::<String>()
        .trim()
        .to_string()
}

pub fn normalize_subcategory(text: &str) -> String {
    text.to_lowercase().trim().to_string()
}

// ============================================================================
// INPUT / OUTPUT ROWS
// ============================================================================

/// Previously categorized transaction under review
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategorizedRow {
    pub detail: String,
    pub category: String,
    pub subcategory: String,
}

impl CategorizedRow {
    pub fn new(detail: &str, category: &str, subcategory: &str) -> Self {
        CategorizedRow {
            detail: detail.to_string(),
            category: category.to_string(),
            subcategory: subcategory.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReconciliationRow {
    pub description: String,
    pub actual_category: String,
    pub actual_subcategory: String,

    /// None when no expected keyword occurs in the description
    pub expected_category: Option<String>,
    pub expected_subcategory: Option<String>,
    pub matched_keyword: Option<String>,

    pub category_match: bool,
    pub subcategory_match: bool,
}

impl ReconciliationRow {
    pub fn category_match_text(&self) -> &'static str {
        match_text(self.category_match)
    }

    pub fn subcategory_match_text(&self) -> &'static str {
        match_text(self.subcategory_match)
    }

    pub fn is_full_match(&self) -> bool {
        self.category_match && self.subcategory_match
    }

    fn record(&self) -> [&str; 8] {
        [
            self.description.as_str(),
            self.actual_category.as_str(),
            self.actual_subcategory.as_str(),
            self.expected_category.as_deref().unwrap_or(""),
            self.expected_subcategory.as_deref().unwrap_or(""),
            self.matched_keyword.as_deref().unwrap_or(""),
            self.category_match_text(),
            self.subcategory_match_text(),
        ]
    }
}

// ============================================================================
// RECONCILIATION REPORT
// ============================================================================

#[derive(Debug, Clone, Serialize)]
pub struct ReconciliationReport {
    pub rows: Vec<ReconciliationRow>,
    pub total: usize,
    pub category_matches: usize,
    pub subcategory_matches: usize,
    pub full_matches: usize,

    /// Rows whose description contains no expected keyword
    pub without_expectation: usize,
}

impl ReconciliationReport {
    pub fn from_rows(rows: Vec<ReconciliationRow>) -> Self {
        ReconciliationReport {
            total: rows.len(),
            category_matches: rows.iter().filter(|r| r.category_match).count(),
            subcategory_matches: rows.iter().filter(|r| r.subcategory_match).count(),
            full_matches: rows.iter().filter(|r| r.is_full_match()).count(),
            without_expectation: rows.iter().filter(|r| r.matched_keyword.is_none()).count(),
            rows,
        }
    }

    pub fn mismatches(&self) -> usize {
        self.total - self.full_matches
    }

    pub fn summary(&self) -> String {
        format!(
            "Reconciliation: {} rows, {} category matches, {} subcategory matches, {} mismatched, {} without expected keyword",
            self.total,
            self.category_matches,
            self.subcategory_matches,
            self.mismatches(),
            self.without_expectation
        )
    }

    /// Write the rows in their sorted order, replacing any previous file
    pub fn save(&self, path: &Path) -> Result<()> {
        let file = std::fs::File::create(path)?;
        self.write(file)
    }

    pub fn write<W: std::io::Write>(&self, writer: W) -> Result<()> {
        let mut wtr = csv::Writer::from_writer(writer);
        wtr.write_record(RESULT_HEADERS)?;
        for row in &self.rows {
            wtr.write_record(row.record())?;
        }
        wtr.flush()?;
        Ok(())
    }
}

// ============================================================================
// COMPARATOR
// ============================================================================

pub struct Comparator {
    expected: Mapping,
}

impl Comparator {
    pub fn new(expected: Mapping) -> Self {
        Comparator { expected }
    }

    pub fn expected(&self) -> &Mapping {
        &self.expected
    }

    /// Recompute the expected categorization of one row and compare
    pub fn compare_row(&self, row: &CategorizedRow) -> ReconciliationRow {
        let expected: Option<&KeywordRule> = self.expected.find_match(&row.detail);

        let category_match = expected.is_some_and(|rule| {
            normalize_category(&row.category) == normalize_category(&rule.category)
        });
        let subcategory_match = expected.is_some_and(|rule| {
            normalize_subcategory(&row.subcategory) == normalize_subcategory(&rule.subcategory)
        });

        ReconciliationRow {
            description: row.detail.clone(),
            actual_category: row.category.clone(),
            actual_subcategory: row.subcategory.clone(),
            expected_category: expected.map(|r| r.category.clone()),
            expected_subcategory: expected.map(|r| r.subcategory.clone()),
            matched_keyword: expected.map(|r| r.keyword.clone()),
            category_match,
            subcategory_match,
        }
    }

    /// Compare every row, then stably sort by the literal text of
    /// CATEGORY_MATCH then SUBCATEGORY_MATCH ("FALSE" < "TRUE").
    pub fn compare(&self, rows: &[CategorizedRow]) -> ReconciliationReport {
        let mut compared: Vec<ReconciliationRow> =
            rows.iter().map(|row| self.compare_row(row)).collect();

        compared.sort_by(|a, b| {
            (a.category_match_text(), a.subcategory_match_text())
                .cmp(&(b.category_match_text(), b.subcategory_match_text()))
        });

        ReconciliationReport::from_rows(compared)
    }
}

// ============================================================================
// SOURCES
// ============================================================================

const DETAIL_COLUMNS: [&str; 2] = ["Transaction Detail", "Description"];
const ACTUAL_SUBCATEGORY_COLUMNS: [&str; 2] = ["Subcategory", "Sub-Category"];

/// Rows to review from a categorized sheet. Headers are matched with
/// spaces removed and case ignored.
pub fn categorized_rows_from_table(table: &Table) -> Result<Vec<CategorizedRow>> {
    let detail_idx = table
        .find_column(&DETAIL_COLUMNS)
        .ok_or_else(|| Error::schema("Transaction Detail", table.name()))?;
    let category_idx = table
        .find_column(&[CATEGORY_COLUMN])
        .ok_or_else(|| Error::schema(CATEGORY_COLUMN, table.name()))?;
    let subcategory_idx = table
        .find_column(&ACTUAL_SUBCATEGORY_COLUMNS)
        .ok_or_else(|| Error::schema(SUBCATEGORY_COLUMN, table.name()))?;

    Ok(table
        .rows()
        .map(|record| {
            CategorizedRow::new(
                Table::cell(record, detail_idx),
                Table::cell(record, category_idx),
                Table::cell(record, subcategory_idx),
            )
        })
        .collect())
}

/// Expected keyword table embedded in the reviewed sheet itself: its
/// Keyword column next to the Category/Subcategory columns.
pub fn embedded_expectations(table: &Table) -> Result<Mapping> {
    let keyword_idx = table
        .find_column(&[KEYWORD_COLUMN])
        .ok_or_else(|| Error::schema(KEYWORD_COLUMN, table.name()))?;
    let category_idx = table
        .find_column(&[CATEGORY_COLUMN])
        .ok_or_else(|| Error::schema(CATEGORY_COLUMN, table.name()))?;
    let subcategory_idx = table
        .find_column(&ACTUAL_SUBCATEGORY_COLUMNS)
        .ok_or_else(|| Error::schema(SUBCATEGORY_COLUMN, table.name()))?;

    Ok(Mapping::from_rules(table.rows().filter_map(|record| {
        KeywordRule::new(
            Table::cell(record, keyword_idx),
            Table::cell(record, category_idx),
            Table::cell(record, subcategory_idx),
        )
    })))
}

/// Load a QA sheet and its expectations: a separate mapping file when
/// given, otherwise the sheet's own Keyword column.
pub fn load_comparison(actual: &Path, expected: Option<&Path>) -> Result<(Vec<CategorizedRow>, Mapping)> {
    let table = Table::from_path(actual)?;
    let rows = categorized_rows_from_table(&table)?;

    let mapping = match expected {
        Some(path) => store::MappingStore::new(path).load()?,
        None => embedded_expectations(&table)?,
    };

    Ok((rows, mapping))
}

/// Load review rows from the `transaction-detail` table and expectations
/// from the `keywords` table. Keywords lacking a category or subcategory
/// are not expectations.
pub fn load_comparison_from_db(conn: &Connection) -> Result<(Vec<CategorizedRow>, Mapping)> {
    let mut stmt = conn.prepare(
        "SELECT \"Transaction Detail\", Category, \"Sub-Category\" FROM \"transaction-detail\"",
    )?;
    let rows = stmt
        .query_map([], |row| {
            Ok(CategorizedRow {
                detail: row.get::<_, Option<String>>(0)?.unwrap_or_default(),
                category: row.get::<_, Option<String>>(1)?.unwrap_or_default(),
                subcategory: row.get::<_, Option<String>>(2)?.unwrap_or_default(),
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    let mut stmt = conn.prepare("SELECT Keyword, Category, Subcategory FROM keywords")?;
    let rules = stmt
        .query_map([], |row| {
            Ok((
                row.get::<_, Option<String>>(0)?.unwrap_or_default(),
                row.get::<_, Option<String>>(1)?.unwrap_or_default(),
                row.get::<_, Option<String>>(2)?.unwrap_or_default(),
            ))
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    let mut mapping = Mapping::from_rules(
        rules
            .iter()
            .filter_map(|(k, c, s)| KeywordRule::new(k, c, s)),
    );
    mapping.retain(|rule| !rule.category.is_empty() && !rule.subcategory.is_empty());

    log::info!(
        "Loaded {} rows and {} expected keywords from database",
        rows.len(),
        mapping.len()
    );
    Ok((rows, mapping))
}

/// Open a comparison database; the connection is released on return
pub fn compare_database(path: &Path) -> Result<ReconciliationReport> {
    if !path.exists() {
        return Err(Error::NotFound(path.display().to_string()));
    }
    let conn = Connection::open(path).map_err(|e| Error::Connection(db::classify_connection_error(&e)))?;
    let (rows, mapping) = load_comparison_from_db(&conn)?;
    Ok(Comparator::new(mapping).compare(&rows))
}

// ============================================================================
// TESTS
// ============================================================================
