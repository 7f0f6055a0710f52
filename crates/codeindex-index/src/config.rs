//! Configuration surface (`spec.md` §6).
//!
//! `Config` is a plain struct built directly by the CLI from `clap` flags;
//! file-loading/merging is left to an external collaborator and is not
//! implemented here. `serde::Deserialize` is kept so an embedding caller may
//! still load one from TOML/JSON of their own accord.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use codeindex_core::LanguageTag;

fn default_include() -> Vec<String> {
    vec!["**/*".to_string()]
}

fn default_exclude() -> Vec<String> {
    Vec::new()
}

fn default_max_nested_struct_depth() -> u32 {
    3
}

fn default_batch_interval_minutes() -> u64 {
    10
}

fn default_min_change_lines() -> u32 {
    5
}

fn default_debounce_ms() -> u64 {
    500
}

/// Every option `spec.md` §6 recognizes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub root_dir: PathBuf,
    pub db_path: PathBuf,

    #[serde(default = "all_languages")]
    pub languages: Vec<LanguageTag>,

    #[serde(default = "default_include")]
    pub include: Vec<String>,

    #[serde(default = "default_exclude")]
    pub exclude: Vec<String>,

    #[serde(default = "default_max_nested_struct_depth")]
    pub max_nested_struct_depth: u32,

    #[serde(default = "default_batch_interval_minutes")]
    pub batch_interval_minutes: u64,

    #[serde(default = "default_min_change_lines")]
    pub min_change_lines: u32,

    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,
}

fn all_languages() -> Vec<LanguageTag> {
    codeindex_core::supported_languages().to_vec()
}

impl Config {
    pub fn new(root_dir: PathBuf, db_path: PathBuf) -> Self {
        Self {
            root_dir,
            db_path,
            languages: all_languages(),
            include: default_include(),
            exclude: default_exclude(),
            max_nested_struct_depth: default_max_nested_struct_depth(),
            batch_interval_minutes: default_batch_interval_minutes(),
            min_change_lines: default_min_change_lines(),
            debounce_ms: default_debounce_ms(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_spec() {
        let config = Config::new(PathBuf::from("."), PathBuf::from("index.db"));
        assert_eq!(config.max_nested_struct_depth, 3);
        assert_eq!(config.batch_interval_minutes, 10);
        assert_eq!(config.min_change_lines, 5);
        assert_eq!(config.debounce_ms, 500);
        assert_eq!(config.include, vec!["**/*".to_string()]);
        assert!(config.exclude.is_empty());
    }
}
