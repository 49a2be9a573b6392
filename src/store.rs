// 🗂️ Mapping Store - load and persist the keyword table
// CSV with columns Keyword, Category, Subcategory; rewritten wholesale

use crate::error::{Error, Result};
use crate::rules::{KeywordRule, Mapping};
use crate::table::Table;
use std::io::Write;
use std::path::{Path, PathBuf};

pub const KEYWORD_COLUMN: &str = "Keyword";
pub const CATEGORY_COLUMN: &str = "Category";
pub const SUBCATEGORY_COLUMN: &str = "Subcategory";

pub struct MappingStore {
    path: PathBuf,
}

impl MappingStore {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        MappingStore {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the mapping
    ///
    /// # Returns
    /// * `Err(Error::NotFound)` - store file is absent
    /// * `Err(Error::Parse)` - CSV is malformed
    /// * `Err(Error::Schema)` - a required column is missing
    pub fn load(&self) -> Result<Mapping> {
        let table = Table::from_path(&self.path)?;
        mapping_from_table(&table)
    }

    /// Load, degrading every failure to "no mapping" after logging it
    pub fn load_or_none(&self) -> Option<Mapping> {
        match self.load() {
            Ok(mapping) => {
                log::info!(
                    "Loaded {} keyword rules from {}",
                    mapping.len(),
                    self.path.display()
                );
                Some(mapping)
            }
            Err(e) => {
                log::error!("{}; transactions will stay uncategorized", e);
                None
            }
        }
    }

    /// Overwrite the store with the full mapping. Rows are written to a
    /// temporary file next to the store, which then replaces it.
    /// Rules without a category or subcategory are never written.
    pub fn save(&self, mapping: &Mapping) -> Result<()> {
        let incomplete = mapping.iter().filter(|r| !r.is_complete()).count();
        if incomplete > 0 {
            log::warn!(
                "Dropping {} rules without category or sub-category from {}",
                incomplete,
                self.path.display()
            );
        }

        self.write_atomically(mapping).map_err(|e| Error::Persist {
            resource: self.path.display().to_string(),
            message: e.to_string(),
        })?;

        log::info!(
            "Mapping file '{}' updated with {} rules",
            self.path.display(),
            mapping.len()
        );
        Ok(())
    }

    fn write_atomically(&self, mapping: &Mapping) -> anyhow::Result<()> {
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };

        let mut tmp = tempfile::NamedTempFile::new_in(&dir)?;
        {
            let mut wtr = csv::Writer::from_writer(tmp.as_file_mut());
            wtr.write_record([KEYWORD_COLUMN, CATEGORY_COLUMN, SUBCATEGORY_COLUMN])?;
            for rule in mapping.iter().filter(|r| r.is_complete()) {
                wtr.write_record([&rule.keyword, &rule.category, &rule.subcategory])?;
            }
            wtr.flush()?;
        }
        tmp.as_file_mut().flush()?;
        tmp.persist(&self.path)?;
        Ok(())
    }
}

/// Build a mapping from any table carrying the three rule columns.
/// Rows with an empty keyword, category or subcategory are skipped.
pub fn mapping_from_table(table: &Table) -> Result<Mapping> {
    let keyword_idx = table.require(KEYWORD_COLUMN)?;
    let category_idx = table.require(CATEGORY_COLUMN)?;
    let subcategory_idx = table.require(SUBCATEGORY_COLUMN)?;

    let mut mapping = Mapping::new();
    let mut skipped = 0;
    let mut incomplete = 0;

    for record in table.rows() {
        let rule = KeywordRule::new(
            Table::cell(record, keyword_idx),
            Table::cell(record, category_idx),
            Table::cell(record, subcategory_idx),
        );
        match rule {
            Some(rule) if rule.is_complete() => {
                mapping.insert(rule);
            }
            Some(_) => incomplete += 1,
            None => skipped += 1,
        }
    }

    if skipped > 0 {
        log::warn!(
            "Skipped {} rows without a keyword in {}",
            skipped,
            table.name()
        );
    }
    if incomplete > 0 {
        log::warn!(
            "Skipped {} rows without category or sub-category in {}",
            incomplete,
            table.name()
        );
    }

    Ok(mapping)
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::fs;

    fn sample_mapping() -> Mapping {
        Mapping::from_rules(vec![
            KeywordRule::new("coffee", "Dining", "Cafe").unwrap(),
            KeywordRule::new("shell", "Auto", "Fuel").unwrap(),
            KeywordRule::new("netflix", "Entertainment, Media", "Streaming").unwrap(),
        ])
    }

    #[test]
    fn test_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = MappingStore::new(dir.path().join("keyword_mapping.csv"));
        let mapping = sample_mapping();

        store.save(&mapping).unwrap();
        let reloaded = store.load().unwrap();

        let as_map = |m: &Mapping| -> HashMap<String, (String, String)> {
            m.iter()
                .map(|r| (r.keyword.clone(), (r.category.clone(), r.subcategory.clone())))
                .collect()
        };
        assert_eq!(as_map(&reloaded), as_map(&mapping));
    }

    #[test]
    fn test_save_overwrites_prior_content() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("keyword_mapping.csv");
        fs::write(&path, "Keyword,Category,Subcategory\nold,Old,Old\nstale,Stale,Stale\n").unwrap();

        let store = MappingStore::new(&path);
        store.save(&sample_mapping()).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        assert!(content.starts_with("Keyword,Category,Subcategory\n"));
        assert!(!content.contains("stale"));
        assert_eq!(store.load().unwrap().len(), 3);
    }

    #[test]
    fn test_load_lowercases_and_skips_blank_keywords() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("keyword_mapping.csv");
        fs::write(
            &path,
            " Keyword , Category ,Subcategory\nSTARBUCKS,Dining,Cafe\n,Orphan,Row\nShell,Auto,Fuel\n",
        )
        .unwrap();

        let mapping = MappingStore::new(&path).load().unwrap();

        assert_eq!(mapping.len(), 2);
        assert_eq!(mapping.get("starbucks").unwrap().category, "Dining");
        assert!(mapping.find_match("SHELL OIL 123").is_some());
    }

    #[test]
    fn test_rows_without_category_never_reach_the_store() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("keyword_mapping.csv");
        fs::write(
            &path,
            "Keyword,Category,Subcategory\nvenmo,,\natm,Cash, \ncoffee,Dining,Cafe\n",
        )
        .unwrap();
        let store = MappingStore::new(&path);

        let mut mapping = store.load().unwrap();
        assert_eq!(mapping.len(), 1);
        assert!(mapping.find_match("VENMO PAYMENT").is_none());

        mapping.insert(KeywordRule::new("shell", "Auto", "Fuel").unwrap());
        store.save(&mapping).unwrap();

        assert_eq!(
            fs::read_to_string(&path).unwrap(),
            "Keyword,Category,Subcategory\ncoffee,Dining,Cafe\nshell,Auto,Fuel\n"
        );
    }

    #[test]
    fn test_save_drops_incomplete_rules() {
        let dir = tempfile::tempdir().unwrap();
        let store = MappingStore::new(dir.path().join("keyword_mapping.csv"));
        let mapping = Mapping::from_rules(vec![
            KeywordRule::new("venmo", "", "").unwrap(),
            KeywordRule::new("shell", "Auto", "Fuel").unwrap(),
        ]);

        store.save(&mapping).unwrap();

        let reloaded = store.load().unwrap();
        assert_eq!(reloaded.len(), 1);
        assert!(reloaded.iter().all(|r| r.is_complete()));
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = MappingStore::new(dir.path().join("absent.csv"));

        assert!(matches!(store.load(), Err(Error::NotFound(_))));
        assert!(store.load_or_none().is_none());
    }

    #[test]
    fn test_load_missing_column() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("keyword_mapping.csv");
        fs::write(&path, "Keyword,Category\ncoffee,Dining\n").unwrap();

        let err = MappingStore::new(&path).load().unwrap_err();
        assert!(matches!(err, Error::Schema { ref column, .. } if column == "Subcategory"));
    }

    #[test]
    fn test_save_into_missing_directory_is_persist_error() {
        let dir = tempfile::tempdir().unwrap();
        let store = MappingStore::new(dir.path().join("nope").join("keyword_mapping.csv"));

        let err = store.save(&sample_mapping()).unwrap_err();
        assert!(matches!(err, Error::Persist { .. }));
    }
}
