//! Highlighted search
//!
//! Highlighting bypasses the query submitter: the builder encodes highlight, sort and
//! paging directives into the root document itself and posts it through the
//! [`RawTransport`](crate::service::RawTransport). Hits are then turned into
//! [`HighlightedResult`]s and reconciled with their entities, one bulk fetch per
//! concrete type.
//!
//! Stages run in order:
//!
//! ```text
//! Compiling -> Requesting -> ParsingHits -> ReconcilingIds -> FetchingEntities -> Done
//! ```
//!
//! A failure while requesting, parsing or fetching aborts the call with
//! [`FilterQlError::HighlightExecutionFailed`] naming the stage. Types whose ids cannot
//! be converted only lose their entities.

pub mod response;
pub mod snippet;

use indexmap::IndexMap;
use serde_json::Value;
use std::fmt;
use std::time::Instant;
use tracing::{debug, trace, warn};

use crate::error::{FilterQlError, Result};
use crate::models::{HighlightedResult, Page, Pageable, Sortable};
use crate::query::bool_query::BoolQuery;
use crate::query::builder::FilterQueryBuilder;
use crate::query::component::QueryComponent;
use crate::query::root::PageWindow;
use crate::registry::{EntityId, SearchScope};
use response::{Hit, SearchResponse};

/// Endpoint appended to the index scope of a highlight request
pub const SEARCH_ENDPOINT: &str = "_search";

/// Step of the highlight pipeline
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum HighlightStage {
    Compiling,
    Requesting,
    ParsingHits,
    ReconcilingIds,
    FetchingEntities,
    Done,
}

impl fmt::Display for HighlightStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            HighlightStage::Compiling => "compiling",
            HighlightStage::Requesting => "requesting",
            HighlightStage::ParsingHits => "parsing hits",
            HighlightStage::ReconcilingIds => "reconciling ids",
            HighlightStage::FetchingEntities => "fetching entities",
            HighlightStage::Done => "done",
        };
        f.write_str(name)
    }
}

impl<'s, E: Clone> FilterQueryBuilder<'s, E> {
    /// Run a highlighted search.
    ///
    /// Unpaged requests ask for `max_result_window` hits. Reported totals are the
    /// index's hit count, not the page length.
    pub fn highlight(
        mut self,
        pageable: Pageable,
        sortable: &Sortable,
    ) -> Result<Page<HighlightedResult<E>>> {
        let started = Instant::now();
        let result = self.run_highlight(pageable, sortable);
        if let Some(metrics) = self.service.metrics() {
            metrics.record_search("highlight");
            metrics.record_highlight(started.elapsed().as_secs_f64());
            match &result {
                Ok(page) => {
                    let unreconciled = page.data.iter().filter(|r| !r.is_reconciled()).count();
                    metrics.record_unreconciled(unreconciled);
                }
                Err(e) if e.is_fatal() => metrics.record_search_error(),
                Err(_) => {}
            }
        }
        result
    }

    /// Every hit up to the result window, in relevance order
    pub fn highlight_all(self) -> Result<Page<HighlightedResult<E>>> {
        self.highlight(Pageable::Unpaged, &Sortable::unsorted())
    }

    pub fn highlight_page(self, pageable: Pageable) -> Result<Page<HighlightedResult<E>>> {
        self.highlight(pageable, &Sortable::unsorted())
    }

    pub fn highlight_sorted(self, sortable: &Sortable) -> Result<Page<HighlightedResult<E>>> {
        self.highlight(Pageable::Unpaged, sortable)
    }

    fn run_highlight(
        &mut self,
        pageable: Pageable,
        sortable: &Sortable,
    ) -> Result<Page<HighlightedResult<E>>> {
        debug!(stage = %HighlightStage::Compiling, scope = self.scope().name());
        let indices = self.prepare_highlight(pageable, sortable)?;

        debug!(stage = %HighlightStage::Requesting, indices = indices.len());
        let body = self.context.to_root().to_json_string();
        let path = format!("/{}/{}", indices.join(","), SEARCH_ENDPOINT);
        trace!(path = path.as_str(), body = body.as_str(), "Highlight request");
        let headers = vec![("Content-Type".to_string(), "application/json".to_string())];
        let raw = self
            .service
            .transport
            .perform_request("POST", &path, &headers, body.as_bytes())
            .map_err(|e| FilterQlError::highlight(HighlightStage::Requesting, e))?;
        let json: Value = serde_json::from_slice(&raw)
            .map_err(|e| FilterQlError::highlight(HighlightStage::Requesting, e))?;

        debug!(stage = %HighlightStage::ParsingHits);
        let response: SearchResponse = serde_json::from_value(json)
            .map_err(|e| FilterQlError::highlight(HighlightStage::ParsingHits, e))?;
        let total = response.total();
        let mut results = self.parse_hits(response.hits.hits);

        self.reconcile(&mut results)?;

        debug!(stage = %HighlightStage::Done, total, returned = results.len());
        Ok(Page::new(&pageable, total, results))
    }

    /// Encode highlight, sort, paging and type restriction into the root document.
    /// Returns the indices to search.
    fn prepare_highlight(&mut self, pageable: Pageable, sortable: &Sortable) -> Result<Vec<String>> {
        let fields = self.field_names();
        let (from, size) = pageable.window(self.service.settings().max_result_window)?;

        let root = self.context.root_mut();
        root.highlight = Some(fields);
        for sort in &sortable.sort {
            root.add_sort(sort.field.clone(), sort.order);
        }
        root.page = Some(PageWindow { from, size });

        let scope = self.context.scope().clone();
        if let SearchScope::Type(type_name) = &scope {
            let concrete = self.service.metadata().concrete_subtypes(type_name);
            let restriction = match concrete.as_slice() {
                [] => {
                    return Err(FilterQlError::Config(format!(
                        "entity type not indexed: {}",
                        type_name
                    )))
                }
                [single] => QueryComponent::type_of(single),
                many => {
                    let mut any_of = BoolQuery::new();
                    for name in many {
                        any_of.add_should(QueryComponent::type_of(name));
                    }
                    QueryComponent::Bool(any_of)
                }
            };
            self.context.current_frame_mut().add_must(restriction);
        }

        let indices = self.service.indices_for(&scope);
        if indices.is_empty() {
            return Err(FilterQlError::Config(format!(
                "no index registered for: {}",
                scope.name()
            )));
        }
        Ok(indices)
    }

    fn parse_hits(&self, hits: Vec<Hit>) -> Vec<HighlightedResult<E>> {
        let fields = self.field_names();
        hits.into_iter()
            .map(|hit| {
                let snippet = match &hit.highlight {
                    Some(fragments) if !fragments.is_empty() => snippet::from_fragments(fragments),
                    _ => hit
                        .source
                        .as_ref()
                        .map(|source| {
                            snippet::from_source(source, &fields, self.max_highlight_length)
                        })
                        .unwrap_or_default(),
                };
                HighlightedResult::new(hit.id, hit.type_name, hit.score.unwrap_or(0.0), snippet)
            })
            .collect()
    }

    /// Attach entities to results, one bulk fetch per concrete type
    fn reconcile(&self, results: &mut [HighlightedResult<E>]) -> Result<()> {
        debug!(stage = %HighlightStage::ReconcilingIds, results = results.len());
        let mut by_type: IndexMap<String, Vec<usize>> = IndexMap::new();
        for (position, result) in results.iter().enumerate() {
            by_type
                .entry(result.type_name.clone())
                .or_default()
                .push(position);
        }

        for (type_name, positions) in by_type {
            let info = match self.service.entity_info(&type_name) {
                Ok(info) => info,
                Err(e) => {
                    warn!(entity_type = type_name.as_str(), error = %e, "Unknown entity type in hits");
                    continue;
                }
            };
            let Some(converter) = info.id_converter.as_ref() else {
                let skipped = FilterQlError::IdConversionUnavailable {
                    entity_type: type_name.clone(),
                };
                warn!(error = %skipped, "Leaving results without entities");
                continue;
            };

            let mut by_id: IndexMap<EntityId, Vec<usize>> = IndexMap::new();
            for position in positions {
                let raw = &results[position].id;
                match converter(raw) {
                    Ok(id) => by_id.entry(id).or_default().push(position),
                    Err(e) => warn!(
                        entity_type = type_name.as_str(),
                        id = raw.as_str(),
                        error = %e,
                        "Cannot convert document id"
                    ),
                }
            }
            if by_id.is_empty() {
                continue;
            }

            debug!(
                stage = %HighlightStage::FetchingEntities,
                entity_type = type_name.as_str(),
                ids = by_id.len()
            );
            let ids: Vec<EntityId> = by_id.keys().cloned().collect();
            let entities = self
                .service
                .fetcher
                .fetch_by_ids(&type_name, &info.id_field, &ids)
                .map_err(|e| FilterQlError::highlight(HighlightStage::FetchingEntities, e))?;
            if let Some(metrics) = self.service.metrics() {
                metrics.record_fetch(&type_name);
            }

            for entity in entities {
                let Some(id) = self.service.fetcher.identifier(&entity) else {
                    continue;
                };
                if let Some(positions) = by_id.get(&id) {
                    for &position in positions {
                        results[position].entity = Some(entity.clone());
                    }
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_names() {
        assert_eq!(HighlightStage::Requesting.to_string(), "requesting");
        assert_eq!(HighlightStage::FetchingEntities.to_string(), "fetching entities");
    }
}
