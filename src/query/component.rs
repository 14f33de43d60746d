//! Query components - the closed set of DSL nodes a compiled query is made of
//!
//! Every component serializes to the canonical Elasticsearch JSON shape:
//!
//! ```json
//! { "term": { "status": "open" } }
//! { "range": { "amount": { "gte": 10, "lte": 20 } } }
//! { "exists": { "field": "closedAt" } }
//! { "match": { "text": { "query": "in the middle", "fuzziness": "AUTO" } } }
//! { "match_phrase_prefix": { "textid": { "query": "FV/2016" } } }
//! { "type": { "value": "Invoice" } }
//! { "bool": { "must": [...], "should": [...], "must_not": [...], "filter": [...] } }
//! ```

use serde_json::{json, Map, Value};

use super::bool_query::BoolQuery;
use super::types::{FieldValue, RangeBounds};

/// One node of the query tree
#[derive(Clone, Debug, PartialEq)]
pub enum QueryComponent {
    /// Exact value on a keyword field
    Term { field: String, value: FieldValue },
    /// Bounded value on a numeric or date field
    Range { field: String, bounds: RangeBounds },
    /// Field has a non-null value
    Exists { field: String },
    /// Analyzed full-text match
    Match {
        field: String,
        text: String,
        auto_fuzzy: bool,
    },
    /// Phrase match where the last term is a prefix
    MatchPhrasePrefix { field: String, text: String },
    /// Restricts hits to one mapping type
    Type { type_name: String },
    /// Matches every document
    MatchAll,
    /// Boolean composition
    Bool(BoolQuery),
}

impl QueryComponent {
    pub fn term(field: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        QueryComponent::Term {
            field: field.into(),
            value: value.into(),
        }
    }

    pub fn range(field: impl Into<String>, bounds: RangeBounds) -> Self {
        QueryComponent::Range {
            field: field.into(),
            bounds,
        }
    }

    pub fn exists(field: impl Into<String>) -> Self {
        QueryComponent::Exists {
            field: field.into(),
        }
    }

    /// Match query with `"fuzziness": "AUTO"`
    pub fn fuzzy_match(field: impl Into<String>, text: impl Into<String>) -> Self {
        QueryComponent::Match {
            field: field.into(),
            text: text.into(),
            auto_fuzzy: true,
        }
    }

    pub fn phrase_prefix(field: impl Into<String>, text: impl Into<String>) -> Self {
        QueryComponent::MatchPhrasePrefix {
            field: field.into(),
            text: text.into(),
        }
    }

    pub fn type_of(type_name: impl Into<String>) -> Self {
        QueryComponent::Type {
            type_name: type_name.into(),
        }
    }

    /// Get the query type name for debugging and logging
    pub fn query_type(&self) -> &'static str {
        match self {
            QueryComponent::Term { .. } => "term",
            QueryComponent::Range { .. } => "range",
            QueryComponent::Exists { .. } => "exists",
            QueryComponent::Match { .. } => "match",
            QueryComponent::MatchPhrasePrefix { .. } => "match_phrase_prefix",
            QueryComponent::Type { .. } => "type",
            QueryComponent::MatchAll => "match_all",
            QueryComponent::Bool(_) => "bool",
        }
    }

    /// Whether this component contributes nothing to a query
    pub fn is_empty(&self) -> bool {
        matches!(self, QueryComponent::Bool(b) if b.is_empty())
    }

    /// Serialize to the canonical JSON shape
    pub fn to_json(&self) -> Value {
        match self {
            QueryComponent::Term { field, value } => {
                json!({ "term": single(field, value.to_json()) })
            }
            QueryComponent::Range { field, bounds } => {
                let mut spec = Map::new();
                let pairs = [
                    ("gt", &bounds.gt),
                    ("gte", &bounds.gte),
                    ("lt", &bounds.lt),
                    ("lte", &bounds.lte),
                ];
                for (key, bound) in pairs {
                    if let Some(v) = bound {
                        spec.insert(key.to_string(), v.to_json());
                    }
                }
                json!({ "range": single(field, Value::Object(spec)) })
            }
            QueryComponent::Exists { field } => json!({ "exists": { "field": field } }),
            QueryComponent::Match {
                field,
                text,
                auto_fuzzy,
            } => {
                let mut spec = Map::new();
                spec.insert("query".to_string(), Value::String(text.clone()));
                if *auto_fuzzy {
                    spec.insert("fuzziness".to_string(), Value::String("AUTO".to_string()));
                }
                json!({ "match": single(field, Value::Object(spec)) })
            }
            QueryComponent::MatchPhrasePrefix { field, text } => {
                json!({ "match_phrase_prefix": single(field, json!({ "query": text })) })
            }
            QueryComponent::Type { type_name } => json!({ "type": { "value": type_name } }),
            QueryComponent::MatchAll => json!({ "match_all": {} }),
            QueryComponent::Bool(bool_query) => json!({ "bool": bool_query.to_json() }),
        }
    }
}

impl From<BoolQuery> for QueryComponent {
    fn from(bool_query: BoolQuery) -> Self {
        QueryComponent::Bool(bool_query)
    }
}

fn single(key: &str, value: Value) -> Value {
    let mut map = Map::new();
    map.insert(key.to_string(), value);
    Value::Object(map)
}
