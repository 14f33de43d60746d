//! Query DSL parser
//!
//! Reads compiled query documents back into [`QueryComponent`] trees. Accepts the
//! shapes this crate produces plus the common shorthands (`{"term": {"f": v}}` and
//! `{"term": {"f": {"value": v}}}`, `{"match": {"f": "text"}}`).

use serde_json::{Map, Value};

use super::bool_query::BoolQuery;
use super::component::QueryComponent;
use super::root::{PageWindow, QueryRoot};
use super::types::{FieldValue, RangeBounds, SortOrder};
use crate::error::{FilterQlError, Result};

/// Query parser for JSON DSL
pub struct QueryParser;

impl QueryParser {
    /// Parse a JSON query into a component tree
    ///
    /// # Example
    ///
    /// ```json
    /// {
    ///   "bool": {
    ///     "must": [ { "match": { "text": { "query": "nowhere", "fuzziness": "AUTO" } } } ],
    ///     "filter": [ { "bool": { "must": [ { "term": { "status": "open" } } ] } } ]
    ///   }
    /// }
    /// ```
    pub fn parse(json: &Value) -> Result<QueryComponent> {
        match json {
            Value::Object(map) => Self::parse_query_object(map),
            _ => Err(invalid("Query must be a JSON object")),
        }
    }

    /// Parse a JSON string into a component tree
    pub fn parse_str(json_str: &str) -> Result<QueryComponent> {
        let value: Value = serde_json::from_str(json_str)
            .map_err(|e| FilterQlError::InvalidQuery(format!("Invalid JSON: {}", e)))?;
        Self::parse(&value)
    }

    /// Parse a full request document (`query`, `sort`, `highlight`, `from`, `size`)
    pub fn parse_root(json: &Value) -> Result<QueryRoot> {
        let map = json
            .as_object()
            .ok_or_else(|| invalid("Request must be a JSON object"))?;

        let mut root = QueryRoot::new();
        if let Some(query) = map.get("query") {
            root.query = Some(Self::parse(query)?);
        }

        if let Some(sort) = map.get("sort") {
            let entries = sort
                .as_array()
                .ok_or_else(|| invalid("sort must be an array"))?;
            for entry in entries {
                let (field, order) = Self::parse_sort_entry(entry)?;
                root.add_sort(field, order);
            }
        }

        if let Some(highlight) = map.get("highlight") {
            let fields = highlight
                .get("fields")
                .and_then(Value::as_object)
                .ok_or_else(|| invalid("highlight must list its fields"))?;
            root.highlight = Some(fields.keys().cloned().collect());
        }

        let from = map.get("from").and_then(Value::as_u64);
        let size = map.get("size").and_then(Value::as_u64);
        if from.is_some() || size.is_some() {
            root.page = Some(PageWindow {
                from: from.unwrap_or(0) as usize,
                size: size.unwrap_or(10) as usize,
            });
        }
        Ok(root)
    }

    fn parse_query_object(map: &Map<String, Value>) -> Result<QueryComponent> {
        // Handle wrapped query: { "query": { ... } }
        if let Some(query) = map.get("query") {
            return Self::parse(query);
        }

        let (kind, body) = map
            .iter()
            .next()
            .ok_or_else(|| invalid("Empty query object"))?;
        match kind.as_str() {
            "bool" => Self::parse_bool(body),
            "term" => Self::parse_term(body),
            "range" => Self::parse_range(body),
            "exists" => Self::parse_exists(body),
            "match" => Self::parse_match(body),
            "match_phrase_prefix" => Self::parse_phrase_prefix(body),
            "type" => Self::parse_type(body),
            "match_all" => Ok(QueryComponent::MatchAll),
            other => Err(FilterQlError::InvalidQuery(format!(
                "Unknown query type. Expected one of: bool, term, range, exists, match, match_phrase_prefix, type, match_all. Got: {}",
                other
            ))),
        }
    }

    /// Parse a bool query
    fn parse_bool(value: &Value) -> Result<QueryComponent> {
        let map = value
            .as_object()
            .ok_or_else(|| invalid("bool query must be an object"))?;

        let mut query = BoolQuery::new();
        if let Some(must) = map.get("must") {
            query.must = Self::parse_clause_array(must)?;
        }
        if let Some(should) = map.get("should") {
            query.should = Self::parse_clause_array(should)?;
        }
        if let Some(must_not) = map.get("must_not") {
            query.must_not = Self::parse_clause_array(must_not)?;
        }
        if let Some(filter) = map.get("filter") {
            query.filter = Self::parse_clause_array(filter)?;
        }
        Ok(QueryComponent::Bool(query))
    }

    /// Parse an array of query clauses
    fn parse_clause_array(value: &Value) -> Result<Vec<QueryComponent>> {
        match value {
            Value::Array(arr) => arr.iter().map(Self::parse).collect(),
            // Single clause can be provided without array wrapper
            obj @ Value::Object(_) => Ok(vec![Self::parse(obj)?]),
            _ => Err(invalid("Clause must be an array or object")),
        }
    }

    fn parse_term(value: &Value) -> Result<QueryComponent> {
        let (field, spec) = single_field(value, "term")?;
        let raw = match spec {
            Value::Object(inner) => inner
                .get("value")
                .ok_or_else(|| invalid("term query must have 'value' field"))?,
            other => other,
        };
        let value = FieldValue::from_json(raw)
            .ok_or_else(|| invalid("term value must be a string, number or boolean"))?;
        Ok(QueryComponent::Term {
            field: field.clone(),
            value,
        })
    }

    fn parse_range(value: &Value) -> Result<QueryComponent> {
        let (field, spec) = single_field(value, "range")?;
        let spec = spec
            .as_object()
            .ok_or_else(|| invalid("range query must be an object"))?;
        let bound = |key: &str| spec.get(key).and_then(FieldValue::from_json);
        let bounds = RangeBounds {
            gt: bound("gt"),
            gte: bound("gte"),
            lt: bound("lt"),
            lte: bound("lte"),
        };
        Ok(QueryComponent::range(field.clone(), bounds))
    }

    fn parse_exists(value: &Value) -> Result<QueryComponent> {
        let field = value
            .get("field")
            .and_then(Value::as_str)
            .ok_or_else(|| invalid("exists query must name a field"))?;
        Ok(QueryComponent::exists(field))
    }

    fn parse_match(value: &Value) -> Result<QueryComponent> {
        let (field, spec) = single_field(value, "match")?;
        match spec {
            Value::String(text) => Ok(QueryComponent::Match {
                field: field.clone(),
                text: text.clone(),
                auto_fuzzy: false,
            }),
            Value::Object(inner) => {
                let text = inner
                    .get("query")
                    .and_then(Value::as_str)
                    .ok_or_else(|| invalid("match query must have 'query' field"))?;
                let auto_fuzzy = inner.get("fuzziness").and_then(Value::as_str) == Some("AUTO");
                Ok(QueryComponent::Match {
                    field: field.clone(),
                    text: text.to_string(),
                    auto_fuzzy,
                })
            }
            _ => Err(invalid("match query value must be a string or object")),
        }
    }

    fn parse_phrase_prefix(value: &Value) -> Result<QueryComponent> {
        let (field, spec) = single_field(value, "match_phrase_prefix")?;
        let text = match spec {
            Value::String(text) => text.as_str(),
            Value::Object(inner) => inner
                .get("query")
                .and_then(Value::as_str)
                .ok_or_else(|| invalid("match_phrase_prefix query must have 'query' field"))?,
            _ => return Err(invalid("match_phrase_prefix value must be a string or object")),
        };
        Ok(QueryComponent::phrase_prefix(field.clone(), text))
    }

    fn parse_type(value: &Value) -> Result<QueryComponent> {
        let name = value
            .get("value")
            .and_then(Value::as_str)
            .ok_or_else(|| invalid("type query must have a 'value'"))?;
        Ok(QueryComponent::type_of(name))
    }

    fn parse_sort_entry(entry: &Value) -> Result<(String, SortOrder)> {
        match entry {
            Value::String(field) => Ok((field.clone(), SortOrder::Asc)),
            Value::Object(map) => {
                let (field, spec) = map
                    .iter()
                    .next()
                    .ok_or_else(|| invalid("Empty sort entry"))?;
                let order = match spec.get("order").and_then(Value::as_str).or(spec.as_str()) {
                    Some("desc") => SortOrder::Desc,
                    Some("asc") | None => SortOrder::Asc,
                    Some(other) => {
                        return Err(FilterQlError::InvalidQuery(format!(
                            "Unknown sort order: {}",
                            other
                        )))
                    }
                };
                Ok((field.clone(), order))
            }
            _ => Err(invalid("sort entry must be a string or object")),
        }
    }
}

fn single_field<'a>(value: &'a Value, kind: &str) -> Result<(&'a String, &'a Value)> {
    value
        .as_object()
        .and_then(|map| map.iter().next())
        .ok_or_else(|| FilterQlError::InvalidQuery(format!("{} query must specify a field", kind)))
}

fn invalid(message: &str) -> FilterQlError {
    FilterQlError::InvalidQuery(message.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_term() {
        let q = QueryParser::parse(&json!({ "term": { "status": "open" } })).unwrap();
        assert_eq!(q, QueryComponent::term("status", "open"));

        let q = QueryParser::parse(&json!({ "term": { "count": { "value": 3 } } })).unwrap();
        assert_eq!(q, QueryComponent::term("count", 3));
    }

    #[test]
    fn test_parse_range() {
        let q = QueryParser::parse(&json!({ "range": { "amount": { "gte": 1, "lt": 5 } } }))
            .unwrap();
        match q {
            QueryComponent::Range { field, bounds } => {
                assert_eq!(field, "amount");
                assert_eq!(bounds.gte, Some(FieldValue::Long(1)));
                assert_eq!(bounds.lt, Some(FieldValue::Long(5)));
                assert!(bounds.gt.is_none());
            }
            other => panic!("Expected range, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_match_variants() {
        let q = QueryParser::parse(&json!({
            "match": { "text": { "query": "middle", "fuzziness": "AUTO" } }
        }))
        .unwrap();
        assert_eq!(q, QueryComponent::fuzzy_match("text", "middle"));

        let q = QueryParser::parse(&json!({ "match": { "text": "middle" } })).unwrap();
        assert!(matches!(q, QueryComponent::Match { auto_fuzzy: false, .. }));

        let q = QueryParser::parse(&json!({
            "match_phrase_prefix": { "textid": { "query": "FV/1" } }
        }))
        .unwrap();
        assert_eq!(q, QueryComponent::phrase_prefix("textid", "FV/1"));
    }

    #[test]
    fn test_parse_bool_query() {
        let json = json!({
            "bool": {
                "must": [ { "match_all": {} } ],
                "must_not": { "exists": { "field": "deletedAt" } },
                "filter": [ { "type": { "value": "Invoice" } } ]
            }
        });
        let q = QueryParser::parse(&json).unwrap();
        let expected = BoolQuery::new()
            .with_must(QueryComponent::MatchAll)
            .with_must_not(QueryComponent::exists("deletedAt"))
            .with_filter(QueryComponent::type_of("Invoice"));
        assert_eq!(q, QueryComponent::Bool(expected));
    }

    #[test]
    fn test_component_json_reads_back() {
        let component = QueryComponent::Bool(
            BoolQuery::new()
                .with_must(QueryComponent::fuzzy_match("text", "x"))
                .with_should(QueryComponent::term("a", true)),
        );
        assert_eq!(QueryParser::parse(&component.to_json()).unwrap(), component);
    }

    #[test]
    fn test_parse_root() {
        let root = QueryParser::parse_root(&json!({
            "query": { "match_all": {} },
            "sort": [ { "createdAt": { "order": "desc" } }, "name" ],
            "highlight": { "fields": { "textid": {}, "text": {} } },
            "from": 20,
            "size": 20
        }))
        .unwrap();
        assert_eq!(root.query, Some(QueryComponent::MatchAll));
        assert_eq!(
            root.sort,
            vec![
                ("createdAt".to_string(), SortOrder::Desc),
                ("name".to_string(), SortOrder::Asc)
            ]
        );
        assert_eq!(
            root.highlight,
            Some(vec!["textid".to_string(), "text".to_string()])
        );
        assert_eq!(root.page, Some(PageWindow { from: 20, size: 20 }));
    }

    #[test]
    fn test_unknown_query_type() {
        let err = QueryParser::parse(&json!({ "wildcard": { "a": "b*" } })).unwrap_err();
        assert!(matches!(err, FilterQlError::InvalidQuery(_)));
        assert!(QueryParser::parse(&json!([1, 2])).is_err());
        assert!(QueryParser::parse_str("{ not json").is_err());
    }
}
