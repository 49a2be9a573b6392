use clap::{Parser, Subcommand};
use keyword_categorizer::ResolverMode;
use std::path::PathBuf;

/// Categorize bank transactions by keyword and check the results.
#[derive(Parser, Debug)]
#[command(version)]
pub struct Args {
    /// Config file (default: ./categorizer.toml if present)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Categorize a transaction CSV and write the formatted output file
    Categorize {
        /// Transaction CSV with Date, Description, Amount and Type columns
        input: PathBuf,

        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Keyword mapping CSV (Keyword, Category, Subcategory)
        #[arg(short, long)]
        mapping: Option<PathBuf>,

        /// What to do with descriptions no keyword matches
        #[arg(long, value_enum)]
        resolver: Option<ResolverMode>,

        /// Also insert the categorized rows into this SQLite database
        #[arg(long)]
        database: Option<PathBuf>,
    },

    /// Compare a categorized sheet against expected keyword categories
    Compare {
        /// Sheet with Transaction Detail (or Description), Category, Subcategory
        actual: PathBuf,

        /// Expected keyword mapping; default is the sheet's own Keyword column
        #[arg(long)]
        expected: Option<PathBuf>,

        #[arg(short, long, default_value = "transaction_data_compared.csv")]
        output: PathBuf,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Compare the `transaction-detail` and `keywords` tables of a SQLite database
    CompareDb {
        database: PathBuf,

        #[arg(short, long, default_value = "transaction_data_compared.csv")]
        output: PathBuf,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },
}

pub fn parse() -> Args {
    Args::parse()
}
