use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Looked up in the working directory when `--config` is not given
pub const DEFAULT_CONFIG_FILE: &str = "categorizer.toml";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub mapping_file: PathBuf,
    pub output_file: PathBuf,
    pub resolver: ResolverSection,

    /// Relational sink; absent means file output only
    pub database: Option<DatabaseSection>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ResolverSection {
    pub mode: ResolverMode,

    /// For mode = "default": category given to unmatched descriptions
    pub default_category: String,
    pub default_subcategory: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DatabaseSection {
    pub path: PathBuf,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ResolverMode {
    /// Ask on the terminal for every unmatched description
    Prompt,
    /// Leave unmatched descriptions uncategorized
    Skip,
    /// Learn unmatched descriptions under the default category
    Default,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            mapping_file: PathBuf::from("keyword_mapping.csv"),
            output_file: PathBuf::from("modified_transactions.csv"),
            resolver: ResolverSection::default(),
            database: None,
        }
    }
}

impl Default for ResolverSection {
    fn default() -> Self {
        Self {
            mode: ResolverMode::Prompt,
            default_category: "Uncategorized".to_string(),
            default_subcategory: "Uncategorized".to_string(),
        }
    }
}

pub fn parse_config(s: &str) -> Result<Config> {
    toml::from_str(s).context("parse config")
}

/// An explicit path must exist; the implicit one is optional
pub fn load_config(explicit: Option<&Path>) -> Result<Config> {
    let (path, required) = match explicit {
        Some(p) => (p.to_path_buf(), true),
        None => (PathBuf::from(DEFAULT_CONFIG_FILE), false),
    };

    if !path.exists() {
        if required {
            anyhow::bail!("Config file not found: {}", path.display());
        }
        return Ok(Config::default());
    }

    let s = fs::read_to_string(&path).with_context(|| format!("read {}", path.display()))?;
    let cfg = parse_config(&s).with_context(|| format!("in {}", path.display()))?;
    log::debug!("Loaded config from {}", path.display());
    Ok(cfg)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config_is_default() {
        assert_eq!(parse_config("").unwrap(), Config::default());
    }

    #[test]
    fn test_partial_config() {
        let cfg = parse_config(
            r#"
            mapping_file = "rules/keywords.csv"

            [resolver]
            mode = "default"
            default_category = "Misc"

            [database]
            path = "keywords.sqlite"
            "#,
        )
        .unwrap();

        assert_eq!(cfg.mapping_file, PathBuf::from("rules/keywords.csv"));
        assert_eq!(cfg.output_file, PathBuf::from("modified_transactions.csv"));
        assert_eq!(cfg.resolver.mode, ResolverMode::Default);
        assert_eq!(cfg.resolver.default_category, "Misc");
        assert_eq!(cfg.resolver.default_subcategory, "Uncategorized");
        assert_eq!(cfg.database.unwrap().path, PathBuf::from("keywords.sqlite"));
    }

    #[test]
    fn test_unknown_mode_rejected() {
        assert!(parse_config("[resolver]\nmode = \"guess\"\n").is_err());
    }

    #[test]
    fn test_explicit_missing_config_fails() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load_config(Some(&dir.path().join("absent.toml"))).is_err());
    }

    #[test]
    fn test_explicit_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("categorizer.toml");
        fs::write(&path, "output_file = \"out.csv\"\n[resolver]\nmode = \"skip\"\n").unwrap();

        let cfg = load_config(Some(&path)).unwrap();
        assert_eq!(cfg.output_file, PathBuf::from("out.csv"));
        assert_eq!(cfg.resolver.mode, ResolverMode::Skip);
    }
}
