// 🧭 Categorizer - first-match keyword classification with rule learning
//
// For each transaction, in order:
//   1. first rule (insertion order) whose keyword is in the description wins
//   2. no match -> ask the resolver, learn the answer if it is complete
//
// Learned rules are visible to every later transaction of the same batch,
// never to the transaction that triggered them.

use crate::error::Result;
use crate::resolver::UnmatchedResolver;
use crate::rules::Mapping;
use crate::transform::Transaction;
use serde::Serialize;

// ============================================================================
// CATEGORIZATION REPORT
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CategorizationReport {
    /// Transactions categorized by a mapping rule
    pub matched: usize,

    /// Rules added to the mapping during this pass
    pub learned: usize,

    /// Transactions left without a category
    pub unresolved: usize,

    /// Mapping changed and must be persisted
    pub mapping_dirty: bool,
}

impl CategorizationReport {
    pub fn summary(&self) -> String {
        format!(
            "{} categorized, {} uncategorized, {} new keyword rules",
            self.matched, self.unresolved, self.learned
        )
    }
}

// ============================================================================
// CATEGORIZER
// ============================================================================

pub struct Categorizer<R: UnmatchedResolver> {
    resolver: R,
}

impl<R: UnmatchedResolver> Categorizer<R> {
    pub fn new(resolver: R) -> Self {
        Categorizer { resolver }
    }

    pub fn resolver(&self) -> &R {
        &self.resolver
    }

    pub fn into_resolver(self) -> R {
        self.resolver
    }

    /// Assign category/subcategory to every transaction, mutating the
    /// mapping in place when the resolver supplies new rules.
    pub fn categorize(
        &mut self,
        transactions: &mut [Transaction],
        mapping: &mut Mapping,
    ) -> Result<CategorizationReport> {
        let mut report = CategorizationReport::default();

        for tx in transactions.iter_mut() {
            tx.category.clear();
            tx.subcategory.clear();

            if let Some(rule) = mapping.find_match(&tx.description) {
                tx.category = rule.category.clone();
                tx.subcategory = rule.subcategory.clone();
                report.matched += 1;
                continue;
            }

            let Some(proposal) = self.resolver.resolve(&tx.description)? else {
                report.unresolved += 1;
                continue;
            };
            let Some(rule) = proposal.into_rule() else {
                log::warn!(
                    "Mapping not updated for '{}': keyword, category and sub-category are all required",
                    tx.description
                );
                report.unresolved += 1;
                continue;
            };

            // The row that prompted the rule stays blank
            report.unresolved += 1;

            log::info!(
                "Mapping updated: '{}' -> {} / {}",
                rule.keyword,
                rule.category,
                rule.subcategory
            );
            mapping.insert(rule);
            report.learned += 1;
            report.mapping_dirty = true;
        }

        Ok(report)
    }
}

// ============================================================================
// TESTS
// ============================================================================
