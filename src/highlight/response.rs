//! Search response body returned by the index

use serde::Deserialize;
use serde_json::{Map, Value};

#[derive(Clone, Debug, Deserialize)]
pub struct SearchResponse {
    pub hits: HitsEnvelope,
}

#[derive(Clone, Debug, Deserialize)]
pub struct HitsEnvelope {
    pub total: TotalHits,
    #[serde(default)]
    pub hits: Vec<Hit>,
}

/// `hits.total`, either a bare count or `{ "value": n, "relation": "eq" }`
#[derive(Clone, Copy, Debug, Deserialize)]
#[serde(untagged)]
pub enum TotalHits {
    Count(u64),
    Object { value: u64 },
}

impl TotalHits {
    pub fn value(&self) -> u64 {
        match self {
            TotalHits::Count(n) => *n,
            TotalHits::Object { value } => *value,
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct Hit {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(rename = "_type")]
    pub type_name: String,
    /// Null when results are sorted by field
    #[serde(rename = "_score", default)]
    pub score: Option<f64>,
    #[serde(rename = "_source", default)]
    pub source: Option<Value>,
    /// Fragments per field; kept loose so one odd field cannot fail the hit
    #[serde(default)]
    pub highlight: Option<Map<String, Value>>,
}

impl SearchResponse {
    pub fn total(&self) -> u64 {
        self.hits.total.value()
    }
}
