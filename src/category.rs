//! Enhancement categories loaded from the prompts document
//!
//! The document maps each category key to a description and an ordered list
//! of guidelines:
//!
//! ```json
//! { "prompts": { "image": { "description": "...", "guidelines": ["..."] } } }
//! ```

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use serde::Deserialize;
use serde_json::{Map, Value};
use thiserror::Error;

/// Label placed between the description and the guideline list
const GUIDELINES_LABEL: &str = "Guidelines:";

/// Closing instruction of every system prompt
const CLOSING_INSTRUCTION: &str = "Transform the following user prompt:";

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("failed to read prompts file: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid prompts JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("the prompts document is empty or has no 'prompts' key")]
    MissingPrompts,

    #[error("invalid definition for category '{key}': {source}")]
    InvalidCategory {
        key: String,
        #[source]
        source: serde_json::Error,
    },
}

/// One enhancement category
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryDefinition {
    key: String,
    description: String,
    guidelines: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct CategoryBody {
    #[serde(default)]
    description: String,
    #[serde(default)]
    guidelines: Vec<String>,
}

impl CategoryDefinition {
    pub fn new(
        key: impl Into<String>,
        description: impl Into<String>,
        guidelines: Vec<String>,
    ) -> Self {
        Self {
            key: key.into(),
            description: description.into(),
            guidelines,
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn guidelines(&self) -> &[String] {
        &self.guidelines
    }

    /// System instruction sent ahead of the user prompt
    pub fn system_prompt(&self) -> String {
        let guidelines = self
            .guidelines
            .iter()
            .map(|line| format!("- {}", line))
            .collect::<Vec<_>>()
            .join("\n");

        format!(
            "{}\n\n{}\n{}\n\n{}",
            self.description, GUIDELINES_LABEL, guidelines, CLOSING_INSTRUCTION
        )
    }
}

/// Ordered, non-empty set of categories
#[derive(Debug, Clone)]
pub struct CategoryCatalog {
    categories: Vec<CategoryDefinition>,
    index: HashMap<String, usize>,
}

#[derive(Debug, Deserialize)]
struct PromptsDocument {
    #[serde(default)]
    prompts: Map<String, Value>,
}

impl CategoryCatalog {
    /// Build a catalog; an empty list is rejected
    pub fn new(categories: Vec<CategoryDefinition>) -> Result<Self, CatalogError> {
        if categories.is_empty() {
            return Err(CatalogError::MissingPrompts);
        }
        let index = categories
            .iter()
            .enumerate()
            .map(|(i, c)| (c.key.clone(), i))
            .collect();
        Ok(Self { categories, index })
    }

    /// Load the prompts document from disk
    pub fn load(path: &Path) -> Result<Self, CatalogError> {
        let content = fs::read_to_string(path)?;
        Self::from_json_str(&content)
    }

    /// Parse a prompts document, keeping category order
    pub fn from_json_str(json: &str) -> Result<Self, CatalogError> {
        let document: PromptsDocument = serde_json::from_str(json)?;

        let mut categories = Vec::with_capacity(document.prompts.len());
        for (key, value) in document.prompts {
            let body: CategoryBody = serde_json::from_value(value).map_err(|source| {
                CatalogError::InvalidCategory {
                    key: key.clone(),
                    source,
                }
            })?;
            categories.push(CategoryDefinition::new(key, body.description, body.guidelines));
        }

        Self::new(categories)
    }

    pub fn get(&self, key: &str) -> Option<&CategoryDefinition> {
        self.index.get(key).map(|&i| &self.categories[i])
    }

    pub fn contains(&self, key: &str) -> bool {
        self.index.contains_key(key)
    }

    /// Default selection (first category in document order)
    pub fn first(&self) -> &CategoryDefinition {
        &self.categories[0]
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.categories.iter().map(|c| c.key.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = &CategoryDefinition> {
        self.categories.iter()
    }

    pub fn len(&self) -> usize {
        self.categories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_system_prompt_layout() {
        let category = CategoryDefinition::new(
            "image",
            "You improve image prompts.",
            vec!["Be vivid".to_string(), "Mention lighting".to_string()],
        );
        assert_eq!(
            category.system_prompt(),
            "You improve image prompts.\n\nGuidelines:\n- Be vivid\n- Mention lighting\n\nTransform the following user prompt:"
        );
    }

    #[test]
    fn test_empty_catalog_rejected() {
        assert!(matches!(
            CategoryCatalog::new(Vec::new()),
            Err(CatalogError::MissingPrompts)
        ));
    }
}
