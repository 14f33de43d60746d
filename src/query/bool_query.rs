//! Boolean accumulator - combines clauses with AND, OR, NOT semantics

use serde_json::{Map, Value};

use super::component::QueryComponent;

/// Boolean query accumulating four ordered clause lists
///
/// - `must`: All clauses must match (AND). Contributes to score.
/// - `should`: At least one clause should match (OR) when no `must`/`filter` is present.
/// - `must_not`: No clause must match (NOT).
/// - `filter`: All clauses must match (AND), no scoring.
///
/// # Example
///
/// ```json
/// {
///   "bool": {
///     "must": [ { "term": { "status": "open" } } ],
///     "must_not": [ { "exists": { "field": "deletedAt" } } ]
///   }
/// }
/// ```
#[derive(Clone, Debug, Default, PartialEq)]
pub struct BoolQuery {
    pub must: Vec<QueryComponent>,
    pub should: Vec<QueryComponent>,
    pub must_not: Vec<QueryComponent>,
    pub filter: Vec<QueryComponent>,
}

impl BoolQuery {
    /// Create a new empty boolean query
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a must clause
    pub fn with_must(mut self, component: impl Into<QueryComponent>) -> Self {
        self.must.push(component.into());
        self
    }

    /// Add a should clause
    pub fn with_should(mut self, component: impl Into<QueryComponent>) -> Self {
        self.should.push(component.into());
        self
    }

    /// Add a must_not clause
    pub fn with_must_not(mut self, component: impl Into<QueryComponent>) -> Self {
        self.must_not.push(component.into());
        self
    }

    /// Add a filter clause
    pub fn with_filter(mut self, component: impl Into<QueryComponent>) -> Self {
        self.filter.push(component.into());
        self
    }

    pub fn add_must(&mut self, component: impl Into<QueryComponent>) -> &mut Self {
        self.must.push(component.into());
        self
    }

    pub fn add_should(&mut self, component: impl Into<QueryComponent>) -> &mut Self {
        self.should.push(component.into());
        self
    }

    pub fn add_must_not(&mut self, component: impl Into<QueryComponent>) -> &mut Self {
        self.must_not.push(component.into());
        self
    }

    pub fn add_filter(&mut self, component: impl Into<QueryComponent>) -> &mut Self {
        self.filter.push(component.into());
        self
    }

    /// Check if this is an empty query
    pub fn is_empty(&self) -> bool {
        self.must.is_empty()
            && self.should.is_empty()
            && self.must_not.is_empty()
            && self.filter.is_empty()
    }

    /// Get total number of clauses
    pub fn clause_count(&self) -> usize {
        self.must.len() + self.should.len() + self.must_not.len() + self.filter.len()
    }

    /// Fold `source` into `self` as alternatives of an OR.
    ///
    /// `must` and `should` clauses of the source both become `should` clauses here, and
    /// every `must_not` clause becomes `should(bool(must_not: clause))`. Source `filter`
    /// clauses are treated like `must`.
    pub fn merge_or(&mut self, source: BoolQuery) -> &mut Self {
        let BoolQuery {
            must,
            should,
            must_not,
            filter,
        } = source;
        self.should.extend(must);
        self.should.extend(filter);
        self.should.extend(should);
        for clause in must_not {
            self.should
                .push(QueryComponent::Bool(BoolQuery::new().with_must_not(clause)));
        }
        self
    }

    /// A fresh Bool holding `source` folded by [`BoolQuery::merge_or`]
    pub fn or_of(source: BoolQuery) -> BoolQuery {
        let mut merged = BoolQuery::new();
        merged.merge_or(source);
        merged
    }

    /// Clause lists as a JSON object, omitting empty lists
    pub fn to_json(&self) -> Value {
        let mut map = Map::new();
        let lists = [
            ("must", &self.must),
            ("should", &self.should),
            ("must_not", &self.must_not),
            ("filter", &self.filter),
        ];
        for (key, clauses) in lists {
            let items: Vec<Value> = clauses
                .iter()
                .filter(|c| !c.is_empty())
                .map(QueryComponent::to_json)
                .collect();
            if !items.is_empty() {
                map.insert(key.to_string(), Value::Array(items));
            }
        }
        Value::Object(map)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::types::{FieldValue, RangeBounds};
    use serde_json::json;

    #[test]
    fn test_bool_query_creation() {
        let query = BoolQuery::new()
            .with_must(QueryComponent::term("status", "open"))
            .with_should(QueryComponent::term("tags", "urgent"))
            .with_must_not(QueryComponent::exists("deletedAt"))
            .with_filter(QueryComponent::range(
                "year",
                RangeBounds {
                    gte: Some(FieldValue::Long(2024)),
                    ..Default::default()
                },
            ));

        assert_eq!(query.must.len(), 1);
        assert_eq!(query.should.len(), 1);
        assert_eq!(query.must_not.len(), 1);
        assert_eq!(query.filter.len(), 1);
        assert_eq!(query.clause_count(), 4);
        assert!(!query.is_empty());
    }

    #[test]
    fn test_empty_bool_serializes_without_clauses() {
        assert!(BoolQuery::new().is_empty());
        assert_eq!(BoolQuery::new().to_json(), json!({}));
    }

    #[test]
    fn test_nested_empty_bool_is_omitted() {
        let query = BoolQuery::new()
            .with_must(BoolQuery::new())
            .with_must(QueryComponent::term("a", 1));
        assert_eq!(query.to_json(), json!({ "must": [ { "term": { "a": 1 } } ] }));
    }

    #[test]
    fn test_merge_or_rule() {
        let source = BoolQuery::new()
            .with_must(QueryComponent::term("a", 1))
            .with_should(QueryComponent::term("b", 2))
            .with_must_not(QueryComponent::term("c", 3));

        let merged = BoolQuery::or_of(source);

        assert!(merged.must.is_empty());
        assert!(merged.must_not.is_empty());
        assert_eq!(merged.should.len(), 3);
        assert_eq!(merged.should[0], QueryComponent::term("a", 1));
        assert_eq!(merged.should[1], QueryComponent::term("b", 2));
        assert_eq!(
            merged.should[2],
            QueryComponent::Bool(BoolQuery::new().with_must_not(QueryComponent::term("c", 3)))
        );
    }
}
