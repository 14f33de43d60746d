//! Entity type metadata
//!
//! The index stores identifiers as strings. To load entities back after a search the
//! builder needs, per concrete type, the identifier field name and a function turning
//! the stored string back into the native identifier. Types register both explicitly.

mod entity_info;

pub use entity_info::{EntityInfoCache, SearchableEntityInfo};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

use crate::error::{FilterQlError, Result};

/// Converts a stored document id back into the native identifier
pub type IdConverter = Arc<dyn Fn(&str) -> Result<EntityId> + Send + Sync>;

/// Native entity identifier
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EntityId {
    Long(i64),
    Text(String),
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityId::Long(v) => write!(f, "{}", v),
            EntityId::Text(s) => f.write_str(s),
        }
    }
}

impl From<i64> for EntityId {
    fn from(v: i64) -> Self {
        EntityId::Long(v)
    }
}

impl From<&str> for EntityId {
    fn from(s: &str) -> Self {
        EntityId::Text(s.to_string())
    }
}

/// How the stored id of a type is decoded
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IdKind {
    #[default]
    Long,
    String,
    /// Stored form cannot be decoded; entities of the type are never loaded
    Opaque,
}

impl IdKind {
    pub fn converter(&self) -> Option<IdConverter> {
        match self {
            IdKind::Long => Some(Arc::new(|raw: &str| {
                raw.parse::<i64>().map(EntityId::Long).map_err(|e| {
                    FilterQlError::InvalidQuery(format!("invalid numeric id '{}': {}", raw, e))
                })
            })),
            IdKind::String => Some(Arc::new(|raw: &str| Ok(EntityId::Text(raw.to_string())))),
            IdKind::Opaque => None,
        }
    }
}

/// What a search can target
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum SearchScope {
    /// Every indexed type
    Global,
    /// One type and its concrete subtypes
    Type(String),
}

impl SearchScope {
    pub fn of(type_name: impl Into<String>) -> Self {
        SearchScope::Type(type_name.into())
    }

    pub fn is_global(&self) -> bool {
        matches!(self, SearchScope::Global)
    }

    /// Name used in messages
    pub fn name(&self) -> &str {
        match self {
            SearchScope::Global => "*",
            SearchScope::Type(name) => name,
        }
    }
}

/// Metadata about indexed entity types
pub trait TypeMetadata: Send + Sync {
    /// Identifier field of a concrete type, `None` for unknown types
    fn id_field(&self, type_name: &str) -> Option<String>;

    /// Stored-id decoder of a concrete type, `None` if it cannot be decoded
    fn id_converter(&self, type_name: &str) -> Option<IdConverter>;

    /// Indexed concrete types assignable to `type_name`, itself included if indexed
    fn concrete_subtypes(&self, type_name: &str) -> Vec<String>;

    /// Every indexed concrete type
    fn all_types(&self) -> Vec<String>;

    /// Index backing a concrete type
    fn index_name(&self, type_name: &str) -> Option<String>;

    /// Whether a concrete type indexes `field`
    fn has_field(&self, type_name: &str, field: &str) -> bool;

    /// Concrete types covered by a scope
    fn types_in_scope(&self, scope: &SearchScope) -> Vec<String> {
        match scope {
            SearchScope::Global => self.all_types(),
            SearchScope::Type(name) => self.concrete_subtypes(name),
        }
    }
}

/// Registration of one indexed concrete type
#[derive(Clone)]
pub struct EntityTypeDescriptor {
    pub name: String,
    pub index: String,
    pub id_field: String,
    pub id_converter: Option<IdConverter>,
    /// Abstract types this type can be searched as
    pub supertypes: Vec<String>,
    /// Indexed field names
    pub fields: Vec<String>,
}

impl EntityTypeDescriptor {
    /// Type with a numeric `id` stored in an index named after it
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            index: name.to_lowercase(),
            name,
            id_field: "id".to_string(),
            id_converter: IdKind::Long.converter(),
            supertypes: Vec::new(),
            fields: Vec::new(),
        }
    }

    pub fn with_index(mut self, index: impl Into<String>) -> Self {
        self.index = index.into();
        self
    }

    pub fn with_id_field(mut self, field: impl Into<String>) -> Self {
        self.id_field = field.into();
        self
    }

    pub fn with_id_kind(mut self, kind: IdKind) -> Self {
        self.id_converter = kind.converter();
        self
    }

    pub fn with_id_converter<F>(mut self, converter: F) -> Self
    where
        F: Fn(&str) -> Result<EntityId> + Send + Sync + 'static,
    {
        self.id_converter = Some(Arc::new(converter));
        self
    }

    pub fn with_supertype(mut self, supertype: impl Into<String>) -> Self {
        self.supertypes.push(supertype.into());
        self
    }

    pub fn with_fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.fields.extend(fields.into_iter().map(Into::into));
        self
    }
}

impl fmt::Debug for EntityTypeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntityTypeDescriptor")
            .field("name", &self.name)
            .field("index", &self.index)
            .field("id_field", &self.id_field)
            .field("decodable_id", &self.id_converter.is_some())
            .field("supertypes", &self.supertypes)
            .field("fields", &self.fields)
            .finish()
    }
}

/// Explicit registry of indexed types, in registration order
#[derive(Clone, Debug, Default)]
pub struct TypeRegistry {
    types: IndexMap<String, EntityTypeDescriptor>,
}

impl TypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a type; registering a name again replaces it
    pub fn register(&mut self, descriptor: EntityTypeDescriptor) -> &mut Self {
        self.types.insert(descriptor.name.clone(), descriptor);
        self
    }

    pub fn with_type(mut self, descriptor: EntityTypeDescriptor) -> Self {
        self.register(descriptor);
        self
    }

    pub fn get(&self, type_name: &str) -> Option<&EntityTypeDescriptor> {
        self.types.get(type_name)
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}

impl TypeMetadata for TypeRegistry {
    fn id_field(&self, type_name: &str) -> Option<String> {
        self.types.get(type_name).map(|d| d.id_field.clone())
    }

    fn id_converter(&self, type_name: &str) -> Option<IdConverter> {
        self.types.get(type_name).and_then(|d| d.id_converter.clone())
    }

    fn concrete_subtypes(&self, type_name: &str) -> Vec<String> {
        self.types
            .values()
            .filter(|d| d.name == type_name || d.supertypes.iter().any(|s| s == type_name))
            .map(|d| d.name.clone())
            .collect()
    }

    fn all_types(&self) -> Vec<String> {
        self.types.keys().cloned().collect()
    }

    fn index_name(&self, type_name: &str) -> Option<String> {
        self.types.get(type_name).map(|d| d.index.clone())
    }

    fn has_field(&self, type_name: &str, field: &str) -> bool {
        self.types
            .get(type_name)
            .map(|d| d.fields.iter().any(|f| f == field))
            .unwrap_or(false)
    }
}
