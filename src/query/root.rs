//! Top-level search request document

use serde_json::{json, Map, Value};

use super::component::QueryComponent;
use super::types::SortOrder;

/// Root of a compiled search request
///
/// ```json
/// {
///   "query": { "bool": { ... } },
///   "sort": [ { "createdAt": { "order": "desc" } } ],
///   "highlight": { "fields": { "text": {}, "textid": {} } },
///   "from": 0,
///   "size": 20
/// }
/// ```
#[derive(Clone, Debug, Default, PartialEq)]
pub struct QueryRoot {
    pub query: Option<QueryComponent>,
    /// Ordered sort fields; setting an existing field again replaces its order
    pub sort: Vec<(String, SortOrder)>,
    pub highlight: Option<Vec<String>>,
    pub page: Option<PageWindow>,
}

/// `from` / `size` pair of a request
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PageWindow {
    pub from: usize,
    pub size: usize,
}

impl QueryRoot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_query(mut self, query: impl Into<QueryComponent>) -> Self {
        self.query = Some(query.into());
        self
    }

    pub fn with_sort(mut self, field: impl Into<String>, order: SortOrder) -> Self {
        self.add_sort(field, order);
        self
    }

    pub fn add_sort(&mut self, field: impl Into<String>, order: SortOrder) -> &mut Self {
        let field = field.into();
        match self.sort.iter_mut().find(|(f, _)| *f == field) {
            Some(existing) => existing.1 = order,
            None => self.sort.push((field, order)),
        }
        self
    }

    pub fn with_highlight<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.highlight = Some(fields.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_page(mut self, from: usize, size: usize) -> Self {
        self.page = Some(PageWindow { from, size });
        self
    }

    /// Serialize to the request body
    pub fn to_json(&self) -> Value {
        let mut map = Map::new();
        if let Some(query) = &self.query {
            map.insert("query".to_string(), query.to_json());
        }
        if !self.sort.is_empty() {
            let sort: Vec<Value> = self
                .sort
                .iter()
                .map(|(field, order)| {
                    let mut entry = Map::new();
                    entry.insert(field.clone(), json!({ "order": order.as_str() }));
                    Value::Object(entry)
                })
                .collect();
            map.insert("sort".to_string(), Value::Array(sort));
        }
        if let Some(fields) = &self.highlight {
            let mut spec = Map::new();
            for field in fields {
                spec.insert(field.clone(), json!({}));
            }
            map.insert("highlight".to_string(), json!({ "fields": spec }));
        }
        if let Some(page) = self.page {
            map.insert("from".to_string(), Value::from(page.from));
            map.insert("size".to_string(), Value::from(page.size));
        }
        Value::Object(map)
    }

    pub fn to_json_string(&self) -> String {
        self.to_json().to_string()
    }
}
