use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::error::Result;
use crate::query::types::FieldSearchStrategy;
use crate::registry::{EntityTypeDescriptor, IdKind, TypeRegistry};

/// Default bound on highlight snippets built from source fields
pub const MAX_HIGHLIGHT_LENGTH: usize = 100;

/// Default result window of unpaged requests
pub const MAX_RESULT_WINDOW: usize = 10_000;

/// A field matched against the free-text query
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchableField {
    pub name: String,
    #[serde(default = "default_strategy")]
    pub strategy: FieldSearchStrategy,
}

fn default_strategy() -> FieldSearchStrategy {
    FieldSearchStrategy::Default
}

impl SearchableField {
    pub fn new(name: impl Into<String>, strategy: FieldSearchStrategy) -> Self {
        Self {
            name: name.into(),
            strategy,
        }
    }
}

/// Search settings shared by every builder of a service
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchSettings {
    /// Ordered free-text fields; order fixes clause and highlight order
    pub searchable_fields: Vec<SearchableField>,
    pub max_highlight_length: usize,
    pub max_result_window: usize,
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            searchable_fields: vec![
                SearchableField::new("textid", FieldSearchStrategy::WildcardPhrase),
                SearchableField::new("text", FieldSearchStrategy::Default),
            ],
            max_highlight_length: MAX_HIGHLIGHT_LENGTH,
            max_result_window: MAX_RESULT_WINDOW,
        }
    }
}

impl SearchSettings {
    /// Load settings from a JSON file; missing keys take their defaults
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let raw = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    pub fn with_searchable_fields(mut self, fields: Vec<SearchableField>) -> Self {
        self.searchable_fields = fields;
        self
    }

    pub fn with_max_highlight_length(mut self, length: usize) -> Self {
        self.max_highlight_length = length;
        self
    }

    pub fn with_max_result_window(mut self, window: usize) -> Self {
        self.max_result_window = window;
        self
    }

    /// Names of the searchable fields, in order
    pub fn field_names(&self) -> Vec<String> {
        field_names(&self.searchable_fields)
    }
}

pub(crate) fn field_names(fields: &[SearchableField]) -> Vec<String> {
    fields.iter().map(|f| f.name.clone()).collect()
}

/// Registration of one indexed type as read from a config file
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeConfig {
    pub name: String,
    /// Defaults to the lowercased type name
    #[serde(default)]
    pub index: Option<String>,
    #[serde(default = "default_id_field")]
    pub id_field: String,
    #[serde(default)]
    pub id_kind: IdKind,
    #[serde(default)]
    pub supertypes: Vec<String>,
    #[serde(default)]
    pub fields: Vec<String>,
}

fn default_id_field() -> String {
    "id".to_string()
}

/// File form of a [`TypeRegistry`]
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryConfig {
    pub types: Vec<TypeConfig>,
}

impl RegistryConfig {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let raw = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    pub fn into_registry(self) -> TypeRegistry {
        let mut registry = TypeRegistry::new();
        for config in self.types {
            let mut descriptor = EntityTypeDescriptor::new(config.name)
                .with_id_field(config.id_field)
                .with_id_kind(config.id_kind)
                .with_fields(config.fields);
            if let Some(index) = config.index {
                descriptor = descriptor.with_index(index);
            }
            for supertype in config.supertypes {
                descriptor = descriptor.with_supertype(supertype);
            }
            registry.register(descriptor);
        }
        registry
    }
}
