// 🙋 Unmatched-description resolvers
// What the categorizer asks when no keyword matches a description

use crate::error::{Error, Result};
use crate::rules::RuleProposal;
use dialoguer::{theme::ColorfulTheme, Input};

/// Capability consulted once per unmatched description.
///
/// `Ok(None)` leaves the transaction uncategorized. A proposal is only
/// learned if all of its fields survive trimming (see `RuleProposal::into_rule`).
pub trait UnmatchedResolver {
    fn resolve(&mut self, description: &str) -> Result<Option<RuleProposal>>;
}

impl<R: UnmatchedResolver + ?Sized> UnmatchedResolver for Box<R> {
    fn resolve(&mut self, description: &str) -> Result<Option<RuleProposal>> {
        (**self).resolve(description)
    }
}

impl<R: UnmatchedResolver + ?Sized> UnmatchedResolver for &mut R {
    fn resolve(&mut self, description: &str) -> Result<Option<RuleProposal>> {
        (**self).resolve(description)
    }
}

// ============================================================================
// INTERACTIVE
// ============================================================================

/// Blocks on three terminal prompts: keyword, category, subcategory
pub struct PromptResolver {
    theme: ColorfulTheme,
}

impl PromptResolver {
    pub fn new() -> Self {
        PromptResolver {
            theme: ColorfulTheme::default(),
        }
    }

    fn ask(&self, prompt: &str) -> Result<String> {
        Input::<String>::with_theme(&self.theme)
            .with_prompt(prompt)
            .allow_empty(true)
            .interact_text()
            .map_err(|e| Error::Prompt(e.to_string()))
    }
}

impl Default for PromptResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl UnmatchedResolver for PromptResolver {
    fn resolve(&mut self, description: &str) -> Result<Option<RuleProposal>> {
        println!("\nNo category found for description: '{}'", description);

        let keyword = self.ask("Enter keyword to associate with this description")?;
        let category = self.ask("Enter category for this keyword")?;
        let subcategory = self.ask("Enter sub-category for this keyword")?;

        Ok(Some(RuleProposal {
            keyword,
            category,
            subcategory,
        }))
    }
}

// ============================================================================
// NON-INTERACTIVE
// ============================================================================

/// Batch mode: unmatched transactions stay uncategorized
#[derive(Debug, Default, Clone, Copy)]
pub struct SkipResolver;

impl UnmatchedResolver for SkipResolver {
    fn resolve(&mut self, description: &str) -> Result<Option<RuleProposal>> {
        log::debug!("Skipping unmatched description: '{}'", description);
        Ok(None)
    }
}

/// Learns the whole description as a keyword under a fixed category
#[derive(Debug, Clone)]
pub struct DefaultCategoryResolver {
    pub category: String,
    pub subcategory: String,
}

impl DefaultCategoryResolver {
    pub fn new(category: &str, subcategory: &str) -> Self {
        DefaultCategoryResolver {
            category: category.to_string(),
            subcategory: subcategory.to_string(),
        }
    }
}

impl UnmatchedResolver for DefaultCategoryResolver {
    fn resolve(&mut self, description: &str) -> Result<Option<RuleProposal>> {
        Ok(Some(RuleProposal::new(
            description,
            &self.category,
            &self.subcategory,
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_skip_never_proposes() {
        let mut resolver = SkipResolver;
        assert_eq!(resolver.resolve("ANYTHING").unwrap(), None);
    }

    #[test]
    fn test_default_category_keys_on_description() {
        let mut resolver = DefaultCategoryResolver::new("Uncategorized", "Review");
        let rule = resolver
            .resolve("  Corner Kiosk 42 ")
            .unwrap()
            .and_then(RuleProposal::into_rule)
            .unwrap();

        assert_eq!(rule.keyword, "corner kiosk 42");
        assert_eq!(rule.category, "Uncategorized");
        assert_eq!(rule.subcategory, "Review");
    }

    #[test]
    fn test_boxed_resolver_delegates() {
        let mut boxed: Box<dyn UnmatchedResolver> = Box::new(SkipResolver);
        assert!(boxed.resolve("x").unwrap().is_none());
    }
}
