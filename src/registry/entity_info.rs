//! Per-type identifier information, computed once and shared

use dashmap::DashMap;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};

use super::{IdConverter, TypeMetadata};
use crate::error::{FilterQlError, Result};

/// What the highlighter needs to load entities of one type
#[derive(Clone)]
pub struct SearchableEntityInfo {
    pub type_name: String,
    pub id_field: String,
    /// `None` when stored ids of this type cannot be decoded
    pub id_converter: Option<IdConverter>,
}

impl fmt::Debug for SearchableEntityInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SearchableEntityInfo")
            .field("type_name", &self.type_name)
            .field("id_field", &self.id_field)
            .field("decodable_id", &self.id_converter.is_some())
            .finish()
    }
}

/// Lazily populated cache of [`SearchableEntityInfo`] keyed by type name
///
/// Entries are immutable once built and never invalidated. Two callers racing on the
/// same missing key may both compute it; the later insert wins.
#[derive(Debug, Default)]
pub struct EntityInfoCache {
    entries: DashMap<String, Arc<SearchableEntityInfo>>,
}

impl EntityInfoCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached info for `type_name`, computing it from `metadata` on first use
    pub fn load(
        &self,
        metadata: &dyn TypeMetadata,
        type_name: &str,
    ) -> Result<Arc<SearchableEntityInfo>> {
        if let Some(entry) = self.entries.get(type_name) {
            return Ok(entry.value().clone());
        }

        let id_field = metadata.id_field(type_name).ok_or_else(|| {
            FilterQlError::Config(format!("entity type not indexed: {}", type_name))
        })?;
        let id_converter = metadata.id_converter(type_name);
        if id_converter.is_none() {
            warn!(
                entity_type = type_name,
                "Cannot convert id for entity type; its entities won't be fetched"
            );
        }

        let info = Arc::new(SearchableEntityInfo {
            type_name: type_name.to_string(),
            id_field,
            id_converter,
        });
        debug!(entity_type = type_name, "Cached searchable entity info");
        self.entries.insert(type_name.to_string(), info.clone());
        Ok(info)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
