//! Query execution
//!
//! Serializes the builder's root document and runs it through the
//! [`QuerySubmitter`](crate::service::QuerySubmitter). The submitter ignores any sort or
//! paging embedded in the document, so both are applied to the returned cursor.

use serde_json::Value;
use tracing::debug;

use super::builder::FilterQueryBuilder;
use crate::error::{FilterQlError, Result};
use crate::models::{Page, Pageable, Sortable};
use crate::registry::SearchScope;
use crate::service::SortDirective;

/// A compiled query document and the scope it targets
#[derive(Clone, Debug, PartialEq)]
pub struct CompiledQuery {
    pub document: Value,
    pub scope: SearchScope,
}

impl CompiledQuery {
    pub fn to_json_string(&self) -> String {
        self.document.to_string()
    }
}

impl<'s, E> FilterQueryBuilder<'s, E> {
    /// Compile the root document
    pub fn build(&self) -> Result<CompiledQuery> {
        let document = self.context.to_root().to_json();
        debug!(scope = self.context.scope().name(), query = %document, "Compiled query");
        if let Some(metrics) = self.service.metrics() {
            metrics.record_compile();
        }
        Ok(CompiledQuery {
            document,
            scope: self.context.scope().clone(),
        })
    }

    /// Run the query and fetch one page of entities.
    ///
    /// Unpaged requests fetch up to the configured result window. Explicit sort fields
    /// are followed by relevance as the final tiebreaker.
    pub fn list(&self, pageable: Pageable, sortable: &Sortable) -> Result<Page<E>> {
        let result = self.run_list(pageable, sortable);
        if let Some(metrics) = self.service.metrics() {
            metrics.record_search("list");
            if result.as_ref().is_err_and(FilterQlError::is_fatal) {
                metrics.record_search_error();
            }
        }
        result
    }

    /// Every match, unsorted
    pub fn list_all(&self) -> Result<Page<E>> {
        self.list(Pageable::Unpaged, &Sortable::unsorted())
    }

    fn run_list(&self, pageable: Pageable, sortable: &Sortable) -> Result<Page<E>> {
        let compiled = self.build()?;
        let mut cursor = self
            .service
            .submitter
            .submit(&compiled.document, &compiled.scope)?;

        let directives = SortDirective::from_sortable(sortable);
        if !directives.is_empty() {
            cursor.set_sort(directives);
        }

        let (offset, limit) = pageable.window(self.service.settings().max_result_window)?;
        let data = cursor.fetch(offset, limit)?;
        Ok(Page::new(&pageable, cursor.total(), data))
    }
}
