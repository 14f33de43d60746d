//! Query compilation
//!
//! This module turns filter criteria and a free-text query into an Elasticsearch
//! request document:
//! - Query components and the Bool accumulator (must, should, must_not, filter)
//! - The builder context with its stack of filter frames
//! - The filter dispatcher and `and`/`or` grouping blocks
//! - Execution through the query submitter
//!
//! # Example
//!
//! ```json
//! {
//!   "query": {
//!     "bool": {
//!       "must": [
//!         { "bool": { "should": [
//!           { "match_phrase_prefix": { "textid": { "query": "nowhere" } } },
//!           { "match": { "text": { "query": "nowhere", "fuzziness": "AUTO" } } }
//!         ] } }
//!       ],
//!       "filter": [
//!         { "bool": { "must": [ { "term": { "status": "open" } } ] } }
//!       ]
//!     }
//!   }
//! }
//! ```

pub mod bool_query;
pub mod builder;
pub mod component;
pub mod context;
pub mod executor;
pub mod parser;
pub mod root;
pub mod types;

pub use bool_query::BoolQuery;
pub use builder::FilterQueryBuilder;
pub use component::QueryComponent;
pub use context::QueryBuilderContext;
pub use executor::CompiledQuery;
pub use parser::QueryParser;
pub use root::{PageWindow, QueryRoot};
pub use types::*;
