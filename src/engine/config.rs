//! Engine and index layout configuration types

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::engine::constants::{
    DEFAULT_CLOSING_POSITIONS, DEFAULT_MAX_REWRITE_PASSES, DEFAULT_MAX_TERM_EXPANSIONS, FIELD_LEMMA,
    FIELD_LENGTH, FIELD_POS, FIELD_TAGS, FIELD_WORD, INSENSITIVE_SUFFIX,
};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Sensitivity used by leaves that do not set one
    pub default_sensitive: bool,
    pub max_term_expansions: usize,
    pub max_rewrite_passes: usize,
    /// Run segments in parallel
    pub parallel: bool,
    pub index: IndexLayoutConfig,
}

/// How annotations, tags and document lengths are laid out in a tantivy index
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexLayoutConfig {
    pub token_fields: Vec<String>,
    pub tag_field: String,
    pub length_field: String,
    pub insensitive_suffix: String,
    /// Extra positions stored after the last token of every document
    pub closing_positions: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            default_sensitive: false,
            max_term_expansions: DEFAULT_MAX_TERM_EXPANSIONS,
            max_rewrite_passes: DEFAULT_MAX_REWRITE_PASSES,
            parallel: true,
            index: IndexLayoutConfig::default(),
        }
    }
}

impl Default for IndexLayoutConfig {
    fn default() -> Self {
        Self {
            token_fields: vec![FIELD_WORD.to_string(), FIELD_LEMMA.to_string(), FIELD_POS.to_string()],
            tag_field: FIELD_TAGS.to_string(),
            length_field: FIELD_LENGTH.to_string(),
            insensitive_suffix: INSENSITIVE_SUFFIX.to_string(),
            closing_positions: DEFAULT_CLOSING_POSITIONS,
        }
    }
}

impl IndexLayoutConfig {
    /// Name of the insensitive alternative of a token field
    pub fn insensitive_field(&self, field: &str) -> String {
        format!("{}{}", field, self.insensitive_suffix)
    }
}

impl EngineConfig {
    pub fn from_yaml(text: &str) -> Result<Self> {
        let config: EngineConfig =
            serde_yaml::from_str(text).map_err(|e| anyhow!("Failed to parse engine config: {}", e))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.max_rewrite_passes == 0 {
            return Err(anyhow!("max_rewrite_passes must be at least 1"));
        }
        if self.index.token_fields.is_empty() {
            return Err(anyhow!("At least one token field must be configured"));
        }
        if self.max_term_expansions == 0 {
            log::warn!("max_term_expansions is 0: regex, prefix and wildcard terms will match nothing");
        }
        Ok(())
    }
}

/// Load an engine configuration from a YAML file
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<EngineConfig> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path)
        .map_err(|e| anyhow!("Failed to read config file {}: {}", path.display(), e))?;
    let config = EngineConfig::from_yaml(&text)?;
    log::debug!("Loaded engine config from {}: {:?}", path.display(), config);
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_yaml_uses_defaults() {
        let config = EngineConfig::from_yaml("default_sensitive: true\nindex:\n  closing_positions: 1\n").unwrap();
        assert!(config.default_sensitive);
        assert_eq!(config.max_term_expansions, DEFAULT_MAX_TERM_EXPANSIONS);
        assert_eq!(config.index.closing_positions, 1);
        assert_eq!(config.index.tag_field, FIELD_TAGS);
        assert_eq!(config.index.insensitive_field("word"), "word_i");
    }

    #[test]
    fn test_rejects_zero_rewrite_passes() {
        assert!(EngineConfig::from_yaml("max_rewrite_passes: 0").is_err());
    }

    #[test]
    fn test_load_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("engine.yaml");
        std::fs::write(&path, "parallel: false\nmax_term_expansions: 10\n").unwrap();
        let config = load_config(&path).unwrap();
        assert!(!config.parallel);
        assert_eq!(config.max_term_expansions, 10);
        assert!(load_config(dir.path().join("nope.yaml")).is_err());
    }
}
