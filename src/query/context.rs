//! Query builder context
//!
//! Holds the state of one search under construction: the free-text query, the target
//! scope, the top-level Bool and a stack of Bool frames filters are added to.
//!
//! `frames[0]` is the filter frame. Scoped `and`/`or` blocks push a frame on top of it
//! and fold it back into the frame below when they end. When the document is built the
//! filter frame becomes a `filter` clause of the top-level Bool:
//!
//! ```json
//! { "bool": {
//!     "must":   [ { "bool": { "should": [ <free-text clauses> ] } } ],
//!     "filter": [ { "bool": { <filter frame> } } ]
//! } }
//! ```

use tracing::debug;

use super::bool_query::BoolQuery;
use super::component::QueryComponent;
use super::root::QueryRoot;
use super::types::FieldSearchStrategy;
use crate::config::SearchableField;
use crate::error::{FilterQlError, Result};
use crate::registry::{SearchScope, TypeMetadata};

/// Query that matches every document instead of matching fields
pub const MATCH_ALL_QUERY: &str = "*";

#[derive(Clone, Debug)]
pub struct QueryBuilderContext {
    query: Option<String>,
    scope: SearchScope,
    root: QueryRoot,
    bool_query: BoolQuery,
    frames: Vec<BoolQuery>,
}

impl QueryBuilderContext {
    /// Blank queries are treated as no query
    pub fn new(scope: SearchScope, query: Option<&str>) -> Self {
        let query = query
            .map(str::trim)
            .filter(|q| !q.is_empty())
            .map(str::to_string);
        Self {
            query,
            scope,
            root: QueryRoot::new(),
            bool_query: BoolQuery::new(),
            frames: Vec::new(),
        }
    }

    pub fn query(&self) -> Option<&str> {
        self.query.as_deref()
    }

    pub fn scope(&self) -> &SearchScope {
        &self.scope
    }

    pub fn root_mut(&mut self) -> &mut QueryRoot {
        &mut self.root
    }

    /// Top-level Bool, without the filter frame
    pub fn bool_query(&self) -> &BoolQuery {
        &self.bool_query
    }

    /// Add the free-text clauses for `fields`.
    ///
    /// `*` matches everything. Any other query becomes one `should` clause per field
    /// indexed by a type in scope, grouped in a Bool under the top-level `must`. Fails
    /// when a query was given but no field matched.
    pub fn apply_free_text(
        &mut self,
        fields: &[SearchableField],
        metadata: &dyn TypeMetadata,
    ) -> Result<()> {
        let Some(query) = self.query.clone() else {
            return Ok(());
        };

        if query == MATCH_ALL_QUERY {
            self.bool_query.add_must(QueryComponent::MatchAll);
            return Ok(());
        }

        let types = metadata.types_in_scope(&self.scope);
        let mut matching = BoolQuery::new();
        for field in fields {
            if !types.iter().any(|t| metadata.has_field(t, &field.name)) {
                continue;
            }
            let clause = match field.strategy {
                FieldSearchStrategy::Default => QueryComponent::fuzzy_match(&field.name, &query),
                FieldSearchStrategy::WildcardPhrase => {
                    QueryComponent::phrase_prefix(&field.name, &query)
                }
            };
            matching.add_should(clause);
        }

        if matching.is_empty() {
            return Err(FilterQlError::NoSearchableFieldsFound {
                entity_type: self.scope.name().to_string(),
            });
        }
        self.bool_query.add_must(matching);
        Ok(())
    }

    /// Frame filters are currently added to, created on first use
    pub fn current_frame_mut(&mut self) -> &mut BoolQuery {
        if self.frames.is_empty() {
            self.frames.push(BoolQuery::new());
        }
        let top = self.frames.len() - 1;
        &mut self.frames[top]
    }

    /// Open a scoped frame above the filter frame
    pub fn push_frame(&mut self) {
        if self.frames.is_empty() {
            self.frames.push(BoolQuery::new());
        }
        self.frames.push(BoolQuery::new());
        debug!(depth = self.frames.len(), "Pushed query frame");
    }

    /// Close the innermost scoped frame; the filter frame is never popped
    pub fn pop_frame(&mut self) -> Option<BoolQuery> {
        if self.frames.len() <= 1 {
            return None;
        }
        let frame = self.frames.pop();
        debug!(depth = self.frames.len(), "Popped query frame");
        frame
    }

    /// Number of frames, filter frame included
    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    pub fn filter_frame(&self) -> Option<&BoolQuery> {
        self.frames.first()
    }

    /// Consume the context, keeping only what filters added
    pub fn into_filter_frame(mut self) -> BoolQuery {
        if self.frames.is_empty() {
            return BoolQuery::new();
        }
        self.frames.swap_remove(0)
    }

    /// Root document with the filter frame folded into the top-level Bool
    pub fn to_root(&self) -> QueryRoot {
        let mut top = self.bool_query.clone();
        if let Some(frame) = self.frames.first() {
            if !frame.is_empty() {
                top.add_filter(frame.clone());
            }
        }
        let mut root = self.root.clone();
        root.query = Some(QueryComponent::Bool(top));
        root
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SearchSettings;
    use crate::registry::{EntityTypeDescriptor, TypeRegistry};
    use serde_json::json;

    fn registry() -> TypeRegistry {
        TypeRegistry::new()
            .with_type(
                EntityTypeDescriptor::new("Invoice")
                    .with_supertype("Document")
                    .with_fields(["text", "textid"]),
            )
            .with_type(EntityTypeDescriptor::new("Note").with_fields(["text"]))
            .with_type(EntityTypeDescriptor::new("Blob"))
    }

    #[test]
    fn test_match_all_query() {
        let mut ctx = QueryBuilderContext::new(SearchScope::Global, Some("*"));
        ctx.apply_free_text(&SearchSettings::default().searchable_fields, &registry())
            .unwrap();
        assert_eq!(
            ctx.to_root().to_json(),
            json!({ "query": { "bool": { "must": [ { "match_all": {} } ] } } })
        );
    }

    #[test]
    fn test_free_text_fields_in_scope() {
        let mut ctx = QueryBuilderContext::new(SearchScope::of("Note"), Some("nowhere"));
        ctx.apply_free_text(&SearchSettings::default().searchable_fields, &registry())
            .unwrap();
        assert_eq!(
            ctx.to_root().to_json()["query"],
            json!({ "bool": { "must": [ { "bool": { "should": [
                { "match": { "text": { "query": "nowhere", "fuzziness": "AUTO" } } }
            ] } } ] } })
        );
    }

    #[test]
    fn test_free_text_field_order() {
        let mut ctx = QueryBuilderContext::new(SearchScope::of("Document"), Some("FV/1"));
        ctx.apply_free_text(&SearchSettings::default().searchable_fields, &registry())
            .unwrap();
        let json = ctx.to_root().to_json();
        let should = &json["query"]["bool"]["must"][0]["bool"]["should"];
        assert!(should[0].get("match_phrase_prefix").is_some());
        assert!(should[1].get("match").is_some());
    }

    #[test]
    fn test_no_searchable_fields() {
        let mut ctx = QueryBuilderContext::new(SearchScope::of("Blob"), Some("x"));
        let err = ctx
            .apply_free_text(&SearchSettings::default().searchable_fields, &registry())
            .unwrap_err();
        assert_eq!(err.to_string(), "No fulltext fields found for: Blob");
    }

    #[test]
    fn test_blank_query_is_no_query() {
        let mut ctx = QueryBuilderContext::new(SearchScope::of("Blob"), Some("  "));
        assert!(ctx.query().is_none());
        ctx.apply_free_text(&SearchSettings::default().searchable_fields, &registry())
            .unwrap();
        assert_eq!(ctx.to_root().to_json(), json!({ "query": { "bool": {} } }));
    }

    #[test]
    fn test_frame_stack() {
        let mut ctx = QueryBuilderContext::new(SearchScope::Global, None);
        assert_eq!(ctx.depth(), 0);
        assert!(ctx.pop_frame().is_none());

        ctx.push_frame();
        assert_eq!(ctx.depth(), 2);
        ctx.current_frame_mut()
            .add_must(QueryComponent::term("a", 1));
        let frame = ctx.pop_frame().unwrap();
        assert_eq!(frame.must.len(), 1);
        assert_eq!(ctx.depth(), 1);
        assert!(ctx.pop_frame().is_none());
        assert!(ctx.filter_frame().unwrap().is_empty());
    }

    #[test]
    fn test_filter_frame_materialized() {
        let mut ctx = QueryBuilderContext::new(SearchScope::Global, None);
        ctx.current_frame_mut()
            .add_must_not(QueryComponent::exists("deletedAt"));
        assert_eq!(
            ctx.to_root().to_json()["query"],
            json!({ "bool": { "filter": [
                { "bool": { "must_not": [ { "exists": { "field": "deletedAt" } } ] } }
            ] } })
        );
        assert_eq!(ctx.into_filter_frame().must_not.len(), 1);
    }
}
