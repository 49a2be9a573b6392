// 🚚 Categorize pipeline
// Transformer -> Categorizer -> Persister -> output file -> optional database
//
// Structural failures return Err before anything is written. Mapping and
// database failures are recorded in the RunReport and never undo the
// output file.

use crate::categorizer::{CategorizationReport, Categorizer};
use crate::db::{DatabaseSink, InsertStats};
use crate::error::{Error, Result};
use crate::resolver::UnmatchedResolver;
use crate::store::MappingStore;
use crate::transform::{self, Transaction};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
pub struct CategorizeJob {
    pub input: PathBuf,
    pub output: PathBuf,
    pub mapping_file: PathBuf,
    pub database: Option<PathBuf>,
}

#[derive(Debug)]
pub struct RunReport {
    pub transactions: usize,

    /// None when no mapping could be loaded
    pub categorization: Option<CategorizationReport>,
    pub mapping_saved: bool,
    pub persist_error: Option<Error>,

    pub database: Option<InsertStats>,
    pub database_error: Option<Error>,
}

impl RunReport {
    /// Output was written but a secondary sink failed
    pub fn is_partial(&self) -> bool {
        self.persist_error.is_some() || self.database_error.is_some()
    }
}

pub fn run_categorize<R: UnmatchedResolver>(job: &CategorizeJob, resolver: R) -> Result<RunReport> {
    let mut transactions = transform::load_transactions(&job.input)?;
    log::info!(
        "Loaded {} transactions from {}",
        transactions.len(),
        job.input.display()
    );

    let store = MappingStore::new(&job.mapping_file);
    let mut report = RunReport {
        transactions: transactions.len(),
        categorization: None,
        mapping_saved: false,
        persist_error: None,
        database: None,
        database_error: None,
    };

    if let Some(mut mapping) = store.load_or_none() {
        let mut categorizer = Categorizer::new(resolver);
        let outcome = categorizer.categorize(&mut transactions, &mut mapping)?;

        if outcome.mapping_dirty {
            match store.save(&mapping) {
                Ok(()) => report.mapping_saved = true,
                Err(e) => {
                    log::error!("Error updating mapping file: {}", e);
                    report.persist_error = Some(e);
                }
            }
        }
        report.categorization = Some(outcome);
    }

    transform::save_output(&job.output, &transactions)?;
    log::info!("File successfully modified and saved as '{}'", job.output.display());

    if let Some(db_path) = &job.database {
        match insert_into_database(db_path, &transactions) {
            Ok(stats) => report.database = Some(stats),
            Err(e) => {
                log::error!("Database write failed: {}", e);
                report.database_error = Some(e);
            }
        }
    }

    Ok(report)
}

fn insert_into_database(path: &Path, transactions: &[Transaction]) -> Result<InsertStats> {
    let mut sink = DatabaseSink::open(path)?;
    let stats = sink.insert_transactions(transactions)?;
    sink.close()?;
    Ok(stats)
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolver::{DefaultCategoryResolver, SkipResolver};
    use crate::rules::RuleProposal;
    use std::fs;

    fn job(dir: &Path) -> CategorizeJob {
        CategorizeJob {
            input: dir.join("transactions.csv"),
            output: dir.join("modified_transactions.csv"),
            mapping_file: dir.join("keyword_mapping.csv"),
            database: None,
        }
    }

    #[test]
    fn test_end_to_end() {
        let dir = tempfile::tempdir().unwrap();
        let job = job(dir.path());
        fs::write(
            &job.input,
            "Date,Description,Amount,Type\n2024-03-05,Coffee Shop Purchase,-4.50,debit\n",
        )
        .unwrap();
        fs::write(&job.mapping_file, "Keyword,Category,Subcategory\ncoffee,Dining,Cafe\n").unwrap();

        let report = run_categorize(&job, SkipResolver).unwrap();

        let output = fs::read_to_string(&job.output).unwrap();
        assert_eq!(
            output,
            ",Month,Date,Description,$,Amount,Category,Subcategory\n\
             ,March,2024-03-05,Coffee Shop Purchase,$,4.50,Dining,Cafe\n"
        );
        assert_eq!(report.transactions, 1);
        assert!(!report.mapping_saved);
        assert!(!report.is_partial());
    }

    #[test]
    fn test_missing_date_column_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let job = job(dir.path());
        fs::write(&job.input, "Description,Amount,Type\nCoffee,-4.50,debit\n").unwrap();
        fs::write(&job.mapping_file, "Keyword,Category,Subcategory\ncoffee,Dining,Cafe\n").unwrap();

        let err = run_categorize(&job, SkipResolver).unwrap_err();

        assert!(matches!(err, Error::Schema { ref column, .. } if column == "Date"));
        assert!(!job.output.exists());
    }

    #[test]
    fn test_missing_mapping_leaves_everything_uncategorized() {
        let dir = tempfile::tempdir().unwrap();
        let job = job(dir.path());
        fs::write(
            &job.input,
            "Date,Description,Amount,Type\n2024-03-05,Coffee,-4.50,debit\n",
        )
        .unwrap();

        // Would learn a rule if it were ever consulted
        let resolver = DefaultCategoryResolver::new("Misc", "Misc");
        let report = run_categorize(&job, resolver).unwrap();

        assert!(report.categorization.is_none());
        assert!(!job.mapping_file.exists());
        let output = fs::read_to_string(&job.output).unwrap();
        assert!(output.ends_with(",March,2024-03-05,Coffee,$,4.50,,\n"));
    }

    #[test]
    fn test_learned_rules_are_persisted() {
        let dir = tempfile::tempdir().unwrap();
        let job = job(dir.path());
        fs::write(
            &job.input,
            "Date,Description,Amount,Type\n2024-05-01,Farmers Market,-20,debit\n",
        )
        .unwrap();
        fs::write(&job.mapping_file, "Keyword,Category,Subcategory\ncoffee,Dining,Cafe\n").unwrap();

        let report = run_categorize(&job, DefaultCategoryResolver::new("Groceries", "Market")).unwrap();

        assert!(report.mapping_saved);
        let reloaded = MappingStore::new(&job.mapping_file).load().unwrap();
        assert_eq!(reloaded.len(), 2);
        assert_eq!(reloaded.get("farmers market").unwrap().category, "Groceries");
        assert_eq!(reloaded.iter().next().unwrap().keyword, "coffee");

        // The learning row itself is written uncategorized
        let output = fs::read_to_string(&job.output).unwrap();
        assert!(output.ends_with(",May,2024-05-01,Farmers Market,$,20,,\n"));
        let outcome = report.categorization.unwrap();
        assert_eq!((outcome.matched, outcome.unresolved, outcome.learned), (0, 1, 1));
    }

    /// Removes the mapping directory while answering, so the rewrite fails
    struct VanishingStoreResolver {
        store_dir: PathBuf,
    }

    impl UnmatchedResolver for VanishingStoreResolver {
        fn resolve(&mut self, _description: &str) -> Result<Option<RuleProposal>> {
            fs::remove_dir_all(&self.store_dir).unwrap();
            Ok(Some(RuleProposal::new("market", "Groceries", "Market")))
        }
    }

    #[test]
    fn test_mapping_persist_failure_keeps_file_output() {
        let dir = tempfile::tempdir().unwrap();
        let store_dir = dir.path().join("rules");
        fs::create_dir(&store_dir).unwrap();
        let mut job = job(dir.path());
        job.mapping_file = store_dir.join("keyword_mapping.csv");
        fs::write(
            &job.input,
            "Date,Description,Amount,Type\n\
             2024-05-01,Farmers Market,-20,debit\n\
             2024-05-02,Coffee,-3,debit\n",
        )
        .unwrap();
        fs::write(&job.mapping_file, "Keyword,Category,Subcategory\ncoffee,Dining,Cafe\n").unwrap();

        let report = run_categorize(&job, VanishingStoreResolver { store_dir }).unwrap();

        assert!(report.is_partial());
        assert!(!report.mapping_saved);
        assert!(matches!(report.persist_error, Some(Error::Persist { .. })));
        assert!(report.database_error.is_none());
        let output = fs::read_to_string(&job.output).unwrap();
        assert!(output.contains(",May,2024-05-02,Coffee,$,3,Dining,Cafe\n"));
    }

    #[test]
    fn test_database_failure_keeps_file_output() {
        let dir = tempfile::tempdir().unwrap();
        let mut job = job(dir.path());
        job.database = Some(dir.path().join("missing").join("keywords.sqlite"));
        fs::write(
            &job.input,
            "Date,Description,Amount,Type\n2024-03-05,Coffee,-4.50,debit\n",
        )
        .unwrap();
        fs::write(&job.mapping_file, "Keyword,Category,Subcategory\ncoffee,Dining,Cafe\n").unwrap();

        let report = run_categorize(&job, SkipResolver).unwrap();

        assert!(report.is_partial());
        assert!(matches!(report.database_error, Some(Error::Connection(_))));
        assert!(job.output.exists());
    }

    #[test]
    fn test_database_sink_receives_rows() {
        let dir = tempfile::tempdir().unwrap();
        let mut job = job(dir.path());
        let db_path = dir.path().join("keywords.sqlite");
        job.database = Some(db_path.clone());
        fs::write(
            &job.input,
            "Date,Description,Amount,Type\n2024-03-05,Coffee,-4.50,debit\n2024-03-06,Shell,-40,debit\n",
        )
        .unwrap();
        fs::write(&job.mapping_file, "Keyword,Category,Subcategory\ncoffee,Dining,Cafe\n").unwrap();

        let first = run_categorize(&job, SkipResolver).unwrap();
        let second = run_categorize(&job, SkipResolver).unwrap();

        assert_eq!(first.database, Some(InsertStats { inserted: 2, duplicates: 0 }));
        assert_eq!(second.database, Some(InsertStats { inserted: 0, duplicates: 2 }));
    }
}
