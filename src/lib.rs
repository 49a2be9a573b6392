// Keyword Categorizer - Core Library
// Exposes all modules for use in the CLI and tests

pub mod error;
pub mod table;
pub mod rules;          // Keyword rules and the ordered mapping
pub mod store;          // Mapping store: load + atomic rewrite
pub mod transform;      // Transaction normalization and output layout
pub mod resolver;       // Unmatched-description resolvers
pub mod categorizer;
pub mod db;             // Relational sink
pub mod reconciliation; // QA comparison against expected keywords
pub mod pipeline;
pub mod config;

// Re-export commonly used types
pub use error::{ConnectionError, Error, Result};
pub use table::Table;
pub use rules::{KeywordRule, Mapping, RuleProposal};
pub use store::MappingStore;
pub use transform::{
    load_transactions, save_output, transactions_from_table, OutputRow, Transaction,
    OUTPUT_HEADERS,
};
pub use resolver::{DefaultCategoryResolver, PromptResolver, SkipResolver, UnmatchedResolver};
pub use categorizer::{CategorizationReport, Categorizer};
pub use db::{transaction_hash, DatabaseSink, InsertStats};
pub use reconciliation::{
    CategorizedRow, Comparator, ReconciliationReport, ReconciliationRow,
};
pub use pipeline::{run_categorize, CategorizeJob, RunReport};
pub use config::{Config, ResolverMode};
