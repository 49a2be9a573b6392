// 🏷️ Keyword Rules - Rules as Data
// Ordered keyword -> (category, subcategory) table with substring matching

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

// ============================================================================
// RULE DEFINITION
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeywordRule {
    /// Lowercase, non-empty substring searched for in descriptions
    pub keyword: String,

    pub category: String,

    pub subcategory: String,
}

impl KeywordRule {
    /// Build a rule from store values. The keyword is trimmed and
    /// lowercased; `None` when nothing is left of it.
    pub fn new(keyword: &str, category: &str, subcategory: &str) -> Option<Self> {
        let keyword = keyword.trim().to_lowercase();
        if keyword.is_empty() {
            return None;
        }

        Some(KeywordRule {
            keyword,
            category: category.to_string(),
            subcategory: subcategory.to_string(),
        })
    }

    /// Both category and subcategory carry text
    pub fn is_complete(&self) -> bool {
        !self.category.trim().is_empty() && !self.subcategory.trim().is_empty()
    }

    /// Check if keyword occurs in the given text, ignoring case
    pub fn matches(&self, text: &str) -> bool {
        text.to_lowercase().contains(&self.keyword)
    }
}

/// Raw answer from an unmatched-description resolver, not yet validated
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RuleProposal {
    pub keyword: String,
    pub category: String,
    pub subcategory: String,
}

impl RuleProposal {
    pub fn new(keyword: &str, category: &str, subcategory: &str) -> Self {
        RuleProposal {
            keyword: keyword.to_string(),
            category: category.to_string(),
            subcategory: subcategory.to_string(),
        }
    }

    /// Accept only if all three fields are non-empty after trimming
    pub fn into_rule(self) -> Option<KeywordRule> {
        let category = self.category.trim();
        let subcategory = self.subcategory.trim();
        if category.is_empty() || subcategory.is_empty() {
            return None;
        }
        KeywordRule::new(&self.keyword, category, subcategory)
    }
}

// ============================================================================
// MAPPING
// ============================================================================

/// Insertion order is match priority: the first keyword registered wins
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Mapping {
    rules: Vec<KeywordRule>,
    positions: HashMap<String, usize>,
}

impl Mapping {
    pub fn new() -> Self {
        Mapping::default()
    }

    pub fn from_rules(rules: impl IntoIterator<Item = KeywordRule>) -> Self {
        let mut mapping = Mapping::new();
        for rule in rules {
            mapping.insert(rule);
        }
        mapping
    }

    /// Add a rule at the lowest priority. An existing keyword keeps its
    /// position and takes the new category/subcategory. Returns true when
    /// the keyword was not known before.
    pub fn insert(&mut self, rule: KeywordRule) -> bool {
        match self.positions.get(&rule.keyword) {
            Some(&index) => {
                self.rules[index] = rule;
                false
            }
            None => {
                self.positions.insert(rule.keyword.clone(), self.rules.len());
                self.rules.push(rule);
                true
            }
        }
    }

    /// First rule (in insertion order) whose keyword occurs in the description
    pub fn find_match(&self, description: &str) -> Option<&KeywordRule> {
        let description = description.to_lowercase();
        self.rules
            .iter()
            .find(|rule| description.contains(&rule.keyword))
    }

    pub fn get(&self, keyword: &str) -> Option<&KeywordRule> {
        self.positions
            .get(&keyword.to_lowercase())
            .map(|&index| &self.rules[index])
    }

    pub fn iter(&self) -> impl Iterator<Item = &KeywordRule> {
        self.rules.iter()
    }

    /// Keep only rules satisfying the predicate, preserving order
    pub fn retain(&mut self, keep: impl Fn(&KeywordRule) -> bool) {
        let rules = std::mem::take(&mut self.rules);
        *self = Mapping::from_rules(rules.into_iter().filter(|r| keep(r)));
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

// ============================================================================
// TESTS
// ============================================================================
