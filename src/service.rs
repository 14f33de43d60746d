//! Search service - owns the collaborators every builder talks to
//!
//! A [`SearchService`] is created once and shared (typically behind an `Arc`). Builders
//! borrow it for the duration of one search.

use serde_json::Value;
use std::sync::Arc;

use crate::config::SearchSettings;
use crate::error::Result;
use crate::metrics::SearchMetrics;
use crate::models::Sortable;
use crate::query::types::SortOrder;
use crate::registry::{
    EntityId, EntityInfoCache, SearchScope, SearchableEntityInfo, TypeMetadata,
};

/// One ordering criterion handed to a [`ResultCursor`]
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SortDirective {
    Field { field: String, order: SortOrder },
    /// Relevance score, highest first
    Score,
}

impl SortDirective {
    /// Explicit sort fields followed by a score tiebreaker; empty when unsorted
    pub fn from_sortable(sortable: &Sortable) -> Vec<SortDirective> {
        if sortable.is_empty() {
            return Vec::new();
        }
        let mut directives: Vec<SortDirective> = sortable
            .sort
            .iter()
            .map(|s| SortDirective::Field {
                field: s.field.clone(),
                order: s.order,
            })
            .collect();
        directives.push(SortDirective::Score);
        directives
    }
}

/// Lazily paginated results of a submitted query
pub trait ResultCursor<E> {
    /// Total number of matches
    fn total(&self) -> u64;

    /// Order applied by subsequent fetches
    fn set_sort(&mut self, sort: Vec<SortDirective>);

    /// Matches `offset..offset + limit`
    fn fetch(&mut self, offset: usize, limit: usize) -> Result<Vec<E>>;
}

/// Submits compiled query documents to the index and returns entity results
pub trait QuerySubmitter<E>: Send + Sync {
    fn submit<'a>(
        &'a self,
        query: &Value,
        scope: &SearchScope,
    ) -> Result<Box<dyn ResultCursor<E> + 'a>>;
}

/// Low-level client performing raw HTTP requests against the index
pub trait RawTransport: Send + Sync {
    fn perform_request(
        &self,
        method: &str,
        path: &str,
        headers: &[(String, String)],
        body: &[u8],
    ) -> Result<Vec<u8>>;
}

/// Loads entities by identifier
pub trait EntityFetcher<E>: Send + Sync {
    /// Every entity of `type_name` whose `id_field` is in `ids`, in any order
    fn fetch_by_ids(&self, type_name: &str, id_field: &str, ids: &[EntityId]) -> Result<Vec<E>>;

    /// Identifier of a loaded entity
    fn identifier(&self, entity: &E) -> Option<EntityId>;
}

/// Shared entry point for building searches
pub struct SearchService<E> {
    pub(crate) metadata: Arc<dyn TypeMetadata>,
    pub(crate) submitter: Arc<dyn QuerySubmitter<E>>,
    pub(crate) transport: Arc<dyn RawTransport>,
    pub(crate) fetcher: Arc<dyn EntityFetcher<E>>,
    pub(crate) settings: SearchSettings,
    pub(crate) metrics: Option<Arc<SearchMetrics>>,
    entity_info: EntityInfoCache,
}

impl<E> SearchService<E> {
    pub fn new(
        metadata: Arc<dyn TypeMetadata>,
        submitter: Arc<dyn QuerySubmitter<E>>,
        transport: Arc<dyn RawTransport>,
        fetcher: Arc<dyn EntityFetcher<E>>,
    ) -> Self {
        Self {
            metadata,
            submitter,
            transport,
            fetcher,
            settings: SearchSettings::default(),
            metrics: None,
            entity_info: EntityInfoCache::new(),
        }
    }

    /// Service whose collaborators are all one backend
    pub fn from_backend<B>(backend: Arc<B>) -> Self
    where
        B: TypeMetadata + QuerySubmitter<E> + RawTransport + EntityFetcher<E> + 'static,
    {
        Self::new(backend.clone(), backend.clone(), backend.clone(), backend)
    }

    pub fn with_settings(mut self, settings: SearchSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn with_metrics(mut self, metrics: Arc<SearchMetrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn settings(&self) -> &SearchSettings {
        &self.settings
    }

    pub fn metadata(&self) -> &dyn TypeMetadata {
        self.metadata.as_ref()
    }

    pub fn metrics(&self) -> Option<&SearchMetrics> {
        self.metrics.as_deref()
    }

    /// Cached identifier info of `type_name`
    pub fn entity_info(&self, type_name: &str) -> Result<Arc<SearchableEntityInfo>> {
        self.entity_info.load(self.metadata.as_ref(), type_name)
    }

    /// Index names backing a scope, deduplicated in registration order
    pub fn indices_for(&self, scope: &SearchScope) -> Vec<String> {
        let mut indices: Vec<String> = Vec::new();
        for type_name in self.metadata.types_in_scope(scope) {
            if let Some(index) = self.metadata.index_name(&type_name) {
                if !indices.contains(&index) {
                    indices.push(index);
                }
            }
        }
        indices
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SortField;

    #[test]
    fn test_sort_directives() {
        assert!(SortDirective::from_sortable(&Sortable::unsorted()).is_empty());

        let sortable = Sortable::unsorted()
            .by(SortField::desc("createdAt"))
            .by(SortField::asc("name"));
        let directives = SortDirective::from_sortable(&sortable);
        assert_eq!(directives.len(), 3);
        assert_eq!(
            directives[0],
            SortDirective::Field {
                field: "createdAt".to_string(),
                order: SortOrder::Desc
            }
        );
        assert_eq!(directives[2], SortDirective::Score);
    }
}
