mod cli;

use anyhow::{Context, Result};
use std::io::IsTerminal;
use std::path::Path;
use std::process::ExitCode;

use cli::{Args, Command};
use keyword_categorizer::config::{self, Config};
use keyword_categorizer::reconciliation::{self, Comparator, ReconciliationReport};
use keyword_categorizer::{
    run_categorize, CategorizeJob, DefaultCategoryResolver, PromptResolver, ResolverMode,
    SkipResolver, UnmatchedResolver,
};

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp(None)
        .init();

    let args = cli::parse();
    match run(args) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("❌ {:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(args: Args) -> Result<ExitCode> {
    let cfg = config::load_config(args.config.as_deref())?;

    match args.command {
        Command::Categorize {
            input,
            output,
            mapping,
            resolver,
            database,
        } => {
            let job = CategorizeJob {
                input,
                output: output.unwrap_or_else(|| cfg.output_file.clone()),
                mapping_file: mapping.unwrap_or_else(|| cfg.mapping_file.clone()),
                database: database.or_else(|| cfg.database.as_ref().map(|d| d.path.clone())),
            };
            let mode = resolver.unwrap_or(cfg.resolver.mode);
            run_categorize_cmd(&job, build_resolver(mode, &cfg))
        }
        Command::Compare {
            actual,
            expected,
            output,
            json,
        } => {
            let (rows, mapping) = reconciliation::load_comparison(&actual, expected.as_deref())
                .context("Failed to load comparison input")?;
            let report = Comparator::new(mapping).compare(&rows);
            finish_compare(&report, &output, json)
        }
        Command::CompareDb {
            database,
            output,
            json,
        } => {
            let report = reconciliation::compare_database(&database)
                .with_context(|| format!("Failed to compare {}", database.display()))?;
            finish_compare(&report, &output, json)
        }
    }
}

fn build_resolver(mode: ResolverMode, cfg: &Config) -> Box<dyn UnmatchedResolver> {
    match mode {
        ResolverMode::Prompt if !prompt_attended() => {
            log::warn!("No terminal attached; unmatched descriptions will be skipped");
            Box::new(SkipResolver)
        }
        ResolverMode::Prompt => Box::new(PromptResolver::new()),
        ResolverMode::Skip => Box::new(SkipResolver),
        ResolverMode::Default => Box::new(DefaultCategoryResolver::new(
            &cfg.resolver.default_category,
            &cfg.resolver.default_subcategory,
        )),
    }
}

/// Prompts are drawn on stderr and answered on stdin; stdout may be redirected
fn prompt_attended() -> bool {
    can_prompt(console::user_attended_stderr(), std::io::stdin().is_terminal())
}

fn can_prompt(stderr_is_terminal: bool, stdin_is_terminal: bool) -> bool {
    stderr_is_terminal && stdin_is_terminal
}

fn run_categorize_cmd(job: &CategorizeJob, resolver: Box<dyn UnmatchedResolver>) -> Result<ExitCode> {
    println!("📂 Categorizing {}", job.input.display());

    let report = run_categorize(job, resolver).context("Categorization aborted, no output written")?;

    println!("✓ Transactions: {}", report.transactions);
    match &report.categorization {
        Some(outcome) => println!("✓ {}", outcome.summary()),
        None => println!("⚠️  No mapping loaded from {}; nothing categorized", job.mapping_file.display()),
    }
    if report.mapping_saved {
        println!("✓ Mapping file '{}' updated successfully", job.mapping_file.display());
    }
    println!("✓ Output saved as '{}'", job.output.display());
    if let Some(stats) = &report.database {
        println!("✓ Database: {} inserted, {} duplicates skipped", stats.inserted, stats.duplicates);
    }

    if let Some(e) = &report.persist_error {
        eprintln!("❌ Mapping not saved: {}", e);
    }
    if let Some(e) = &report.database_error {
        eprintln!("❌ Database not updated: {}", e);
    }

    Ok(if report.is_partial() {
        ExitCode::from(2)
    } else {
        ExitCode::SUCCESS
    })
}

fn finish_compare(report: &ReconciliationReport, output: &Path, json: bool) -> Result<ExitCode> {
    report
        .save(output)
        .with_context(|| format!("Failed to write {}", output.display()))?;

    if json {
        println!("{}", serde_json::to_string_pretty(report)?);
    } else {
        println!("✓ {}", report.summary());
        println!("✓ Results saved as '{}'", output.display());
    }
    Ok(ExitCode::SUCCESS)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompt_needs_stderr_and_stdin() {
        assert!(can_prompt(true, true));
        assert!(!can_prompt(true, false));
        assert!(!can_prompt(false, true));
    }
}
