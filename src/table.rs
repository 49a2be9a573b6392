// 📄 Tabular resources - CSV with normalized headers
// Every source and store in the system goes through this reader

use crate::error::{Error, Result};
use csv::{ReaderBuilder, StringRecord, Trim};
use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

/// Header row plus data rows of one tabular resource
#[derive(Debug, Clone)]
pub struct Table {
    /// Name used in error messages (usually the file path)
    name: String,
    headers: Vec<String>,
    rows: Vec<StringRecord>,
}

impl Table {
    /// Read a CSV file. Header names are trimmed of surrounding whitespace.
    pub fn from_path(path: &Path) -> Result<Self> {
        let name = path.display().to_string();
        let file = File::open(path).map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => Error::NotFound(name.clone()),
            _ => Error::Io(e),
        })?;
        Self::from_reader(&name, file)
    }

    pub fn from_reader<R: Read>(name: &str, reader: R) -> Result<Self> {
        let mut rdr = ReaderBuilder::new()
            .has_headers(true)
            .trim(Trim::Headers)
            .from_reader(reader);

        let headers = rdr
            .headers()
            .map_err(|e| Error::parse(name, e.to_string()))?
            .iter()
            .map(|h| h.to_string())
            .collect();

        let mut rows = Vec::new();
        for (line_num, result) in rdr.records().enumerate() {
            // +2 because: 1-indexed + header row
            let record = result.map_err(|e| {
                Error::parse(name, format!("line {}: {}", line_num + 2, e))
            })?;
            rows.push(record);
        }

        Ok(Table {
            name: name.to_string(),
            headers,
            rows,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn rows(&self) -> impl Iterator<Item = &StringRecord> {
        self.rows.iter()
    }

    /// Index of a column by exact (trimmed) header name
    pub fn column(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    /// Like `column`, but a missing column is a schema error
    pub fn require(&self, name: &str) -> Result<usize> {
        self.column(name)
            .ok_or_else(|| Error::schema(name, &self.name))
    }

    /// Loose lookup: spaces removed and case ignored on both sides, first
    /// candidate present wins. Used for hand-maintained QA sheets whose
    /// headers drift ("Transaction Detail", "TRANSACTIONDETAIL").
    pub fn find_column(&self, candidates: &[&str]) -> Option<usize> {
        let squash = |s: &str| -> String {
            s.chars()
                .filter(|c| !c.is_whitespace())
                .collect::<String>()
                .to_lowercase()
        };
        candidates.iter().find_map(|candidate| {
            let wanted = squash(candidate);
            self.headers.iter().position(|h| squash(h) == wanted)
        })
    }

    /// Cell text; a short row reads as empty
    pub fn cell<'a>(record: &'a StringRecord, index: usize) -> &'a str {
        record.get(index).unwrap_or("")
    }
}

// ============================================================================
// TESTS
// ============================================================================
