//! System prompt catalog.
//!
//! Prompts are keyed by prompt type. Unknown types resolve to the catalog's
//! default type, which must exist when the catalog is built.

use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;

use crate::ConfigError;

const BUILTIN_PROMPTS: &str = include_str!("../prompts/prompts.json");

#[derive(Debug, Deserialize)]
struct PromptFile {
    #[serde(rename = "systemPrompts")]
    system_prompts: HashMap<String, PromptEntry>,
}

#[derive(Debug, Deserialize)]
struct PromptEntry {
    content: String,
}

/// Maps prompt types to system prompt text.
#[derive(Debug, Clone)]
pub struct PromptCatalog {
    prompts: HashMap<String, String>,
    default_type: String,
}

impl PromptCatalog {
    /// Build a catalog from explicit entries.
    pub fn new(
        prompts: HashMap<String, String>,
        default_type: impl Into<String>,
    ) -> Result<Self, ConfigError> {
        let default_type = default_type.into();
        if !prompts.contains_key(&default_type) {
            return Err(ConfigError::ValidationError(format!(
                "prompt catalog has no entry for default prompt type '{default_type}'"
            )));
        }
        Ok(Self {
            prompts,
            default_type,
        })
    }

    /// The catalog compiled into the binary.
    pub fn builtin(default_type: &str) -> Result<Self, ConfigError> {
        Self::from_json(BUILTIN_PROMPTS, default_type).map_err(|e| match e {
            ConfigError::ParseError { reason, .. } => ConfigError::ValidationError(format!(
                "built-in prompt catalog is invalid: {reason}"
            )),
            other => other,
        })
    }

    /// Load a `{"systemPrompts": {...}}` document from disk.
    pub fn load_from(path: &Path, default_type: &str) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        Self::from_json(&content, default_type).map_err(|e| match e {
            ConfigError::ParseError { reason, .. } => ConfigError::ParseError {
                path: path.to_path_buf(),
                reason,
            },
            other => other,
        })
    }

    fn from_json(content: &str, default_type: &str) -> Result<Self, ConfigError> {
        let file: PromptFile =
            serde_json::from_str(content).map_err(|e| ConfigError::ParseError {
                path: Default::default(),
                reason: e.to_string(),
            })?;

        let prompts = file
            .system_prompts
            .into_iter()
            .map(|(key, entry)| (key, entry.content))
            .collect();

        let catalog = Self::new(prompts, default_type)?;
        tracing::debug!(
            count = catalog.prompts.len(),
            default_type = %catalog.default_type,
            "Loaded prompt catalog"
        );
        Ok(catalog)
    }

    /// Prompt text for `prompt_type`, falling back to the default type.
    ///
    /// An entry with empty text counts as missing.
    pub fn resolve(&self, prompt_type: &str) -> &str {
        self.prompts
            .get(prompt_type)
            .filter(|text| !text.is_empty())
            .or_else(|| self.prompts.get(&self.default_type))
            .map(String::as_str)
            .unwrap_or_default()
    }

    pub fn default_type(&self) -> &str {
        &self.default_type
    }

    pub fn contains(&self, prompt_type: &str) -> bool {
        self.prompts.contains_key(prompt_type)
    }
}
