//! In-memory index implementing every collaborator of a
//! [`SearchService`](crate::service::SearchService)

use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::cmp::Ordering;
use std::sync::atomic::{AtomicBool, Ordering as AtomicOrdering};

use super::evaluator::{self, DocumentView};
use crate::error::{FilterQlError, Result};
use crate::highlight::SEARCH_ENDPOINT;
use crate::query::component::QueryComponent;
use crate::query::parser::QueryParser;
use crate::query::types::{FieldValue, SortOrder};
use crate::registry::{EntityId, IdConverter, SearchScope, TypeMetadata, TypeRegistry};
use crate::service::{
    EntityFetcher, QuerySubmitter, RawTransport, ResultCursor, SortDirective,
};

/// Entity stored in the in-memory index; its source is also its indexed document
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MemoryEntity {
    pub type_name: String,
    pub id: EntityId,
    pub source: Value,
}

impl MemoryEntity {
    /// Entity with a numeric id
    pub fn new(type_name: impl Into<String>, id: i64, source: Value) -> Self {
        Self::with_id(type_name, EntityId::Long(id), source)
    }

    pub fn with_id(type_name: impl Into<String>, id: EntityId, source: Value) -> Self {
        Self {
            type_name: type_name.into(),
            id,
            source,
        }
    }

    fn view(&self) -> DocumentView<'_> {
        DocumentView {
            type_name: &self.type_name,
            source: &self.source,
        }
    }
}

/// One bulk entity lookup
#[derive(Clone, Debug, PartialEq)]
pub struct FetchCall {
    pub type_name: String,
    pub id_field: String,
    pub ids: Vec<EntityId>,
}

/// One raw request received by the transport
#[derive(Clone, Debug, PartialEq)]
pub struct RecordedRequest {
    pub method: String,
    pub path: String,
    pub body: Value,
}

/// In-memory search backend
pub struct InMemoryBackend {
    registry: TypeRegistry,
    entities: RwLock<Vec<MemoryEntity>>,
    fetch_calls: Mutex<Vec<FetchCall>>,
    requests: Mutex<Vec<RecordedRequest>>,
    submitted: Mutex<Vec<Value>>,
    fail_requests: AtomicBool,
    fail_fetches: AtomicBool,
}

impl InMemoryBackend {
    pub fn new(registry: TypeRegistry) -> Self {
        Self {
            registry,
            entities: RwLock::new(Vec::new()),
            fetch_calls: Mutex::new(Vec::new()),
            requests: Mutex::new(Vec::new()),
            submitted: Mutex::new(Vec::new()),
            fail_requests: AtomicBool::new(false),
            fail_fetches: AtomicBool::new(false),
        }
    }

    pub fn with_entities<I>(self, entities: I) -> Self
    where
        I: IntoIterator<Item = MemoryEntity>,
    {
        self.entities.write().extend(entities);
        self
    }

    pub fn insert(&self, entity: MemoryEntity) {
        self.entities.write().push(entity);
    }

    pub fn len(&self) -> usize {
        self.entities.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.read().is_empty()
    }

    pub fn registry(&self) -> &TypeRegistry {
        &self.registry
    }

    /// Make every raw request fail with a transport error
    pub fn fail_requests(&self, fail: bool) {
        self.fail_requests.store(fail, AtomicOrdering::SeqCst);
    }

    /// Make every bulk entity fetch fail with a backend error
    pub fn fail_fetches(&self, fail: bool) {
        self.fail_fetches.store(fail, AtomicOrdering::SeqCst);
    }

    pub fn fetch_calls(&self) -> Vec<FetchCall> {
        self.fetch_calls.lock().clone()
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().clone()
    }

    /// Query documents handed to the submitter
    pub fn submitted(&self) -> Vec<Value> {
        self.submitted.lock().clone()
    }

    /// Matching entities of `types` with their scores, best first
    fn search(&self, query: Option<&QueryComponent>, types: &[String]) -> Vec<(MemoryEntity, f64)> {
        let entities = self.entities.read();
        let mut hits: Vec<(MemoryEntity, f64)> = entities
            .iter()
            .filter(|e| types.contains(&e.type_name))
            .filter(|e| query.map_or(true, |q| evaluator::matches(q, e.view())))
            .map(|e| {
                let score = query.map_or(1.0, |q| evaluator::score(q, e.view()));
                (e.clone(), score)
            })
            .collect();
        hits.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal));
        hits
    }

    fn types_for_indices(&self, indices: &[&str]) -> Vec<String> {
        self.registry
            .all_types()
            .into_iter()
            .filter(|t| {
                self.registry
                    .index_name(t)
                    .map_or(false, |index| indices.contains(&index.as_str()))
            })
            .collect()
    }
}

fn sort_hits(hits: &mut [(MemoryEntity, f64)], directives: &[SortDirective]) {
    if directives.is_empty() {
        return;
    }
    hits.sort_by(|a, b| {
        for directive in directives {
            let ordering = match directive {
                SortDirective::Score => b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal),
                SortDirective::Field { field, order } => {
                    let ordering = compare_field(&a.0.source, &b.0.source, field);
                    match order {
                        SortOrder::Asc => ordering,
                        SortOrder::Desc => ordering.reverse(),
                    }
                }
            };
            if ordering != Ordering::Equal {
                return ordering;
            }
        }
        Ordering::Equal
    });
}

/// Missing values sort last
fn compare_field(a: &Value, b: &Value, field: &str) -> Ordering {
    let first = |source: &Value| source.get(field).and_then(FieldValue::from_json);
    match (first(a), first(b)) {
        (Some(x), Some(y)) => x.compare(&y).unwrap_or(Ordering::Equal),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// Cursor over a finished in-memory search
pub struct MemoryCursor {
    hits: Vec<(MemoryEntity, f64)>,
    sort: Vec<SortDirective>,
}

impl ResultCursor<MemoryEntity> for MemoryCursor {
    fn total(&self) -> u64 {
        self.hits.len() as u64
    }

    fn set_sort(&mut self, sort: Vec<SortDirective>) {
        self.sort = sort;
    }

    fn fetch(&mut self, offset: usize, limit: usize) -> Result<Vec<MemoryEntity>> {
        sort_hits(&mut self.hits, &self.sort);
        Ok(self
            .hits
            .iter()
            .skip(offset)
            .take(limit)
            .map(|(entity, _)| entity.clone())
            .collect())
    }
}

impl QuerySubmitter<MemoryEntity> for InMemoryBackend {
    fn submit<'a>(
        &'a self,
        query: &Value,
        scope: &SearchScope,
    ) -> Result<Box<dyn ResultCursor<MemoryEntity> + 'a>> {
        self.submitted.lock().push(query.clone());
        // sort and paging in the document are ignored
        let root = QueryParser::parse_root(query)?;
        let types = self.registry.types_in_scope(scope);
        Ok(Box::new(MemoryCursor {
            hits: self.search(root.query.as_ref(), &types),
            sort: Vec::new(),
        }))
    }
}

impl RawTransport for InMemoryBackend {
    fn perform_request(
        &self,
        method: &str,
        path: &str,
        _headers: &[(String, String)],
        body: &[u8],
    ) -> Result<Vec<u8>> {
        let body: Value = serde_json::from_slice(body)?;
        self.requests.lock().push(RecordedRequest {
            method: method.to_string(),
            path: path.to_string(),
            body: body.clone(),
        });
        if self.fail_requests.load(AtomicOrdering::SeqCst) {
            return Err(FilterQlError::Transport("connection refused".to_string()));
        }
        if method != "POST" {
            return Err(FilterQlError::Transport(format!("unsupported method {}", method)));
        }

        let mut segments = path.trim_start_matches('/').split('/');
        let (Some(indices), Some(endpoint), None) = (segments.next(), segments.next(), segments.next())
        else {
            return Err(FilterQlError::Transport(format!("unsupported path {}", path)));
        };
        if endpoint != SEARCH_ENDPOINT {
            return Err(FilterQlError::Transport(format!("unsupported path {}", path)));
        }
        let indices: Vec<&str> = indices.split(',').collect();
        let types = self.types_for_indices(&indices);

        let root = QueryParser::parse_root(&body)?;
        let mut hits = self.search(root.query.as_ref(), &types);
        let sorted = !root.sort.is_empty();
        let directives: Vec<SortDirective> = root
            .sort
            .iter()
            .map(|(field, order)| SortDirective::Field {
                field: field.clone(),
                order: *order,
            })
            .collect();
        sort_hits(&mut hits, &directives);

        let (from, size) = root.page.map_or((0, 10), |p| (p.from, p.size));
        let highlight_fields = root.highlight.clone().unwrap_or_default();
        let page: Vec<Value> = hits
            .iter()
            .skip(from)
            .take(size)
            .map(|(entity, score)| {
                let mut hit = json!({
                    "_index": self.registry.index_name(&entity.type_name),
                    "_type": entity.type_name,
                    "_id": entity.id.to_string(),
                    "_score": if sorted { Value::Null } else { json!(score) },
                    "_source": entity.source,
                });
                if let Some(query) = &root.query {
                    let fragments = evaluator::highlight(query, entity.view(), &highlight_fields);
                    if !fragments.is_empty() {
                        hit["highlight"] = Value::Object(fragments);
                    }
                }
                hit
            })
            .collect();

        let response = json!({
            "took": 1,
            "timed_out": false,
            "hits": { "total": hits.len(), "hits": page }
        });
        Ok(serde_json::to_vec(&response)?)
    }
}

impl EntityFetcher<MemoryEntity> for InMemoryBackend {
    fn fetch_by_ids(
        &self,
        type_name: &str,
        id_field: &str,
        ids: &[EntityId],
    ) -> Result<Vec<MemoryEntity>> {
        self.fetch_calls.lock().push(FetchCall {
            type_name: type_name.to_string(),
            id_field: id_field.to_string(),
            ids: ids.to_vec(),
        });
        if self.fail_fetches.load(AtomicOrdering::SeqCst) {
            return Err(FilterQlError::Backend(format!(
                "entity store unavailable for {}",
                type_name
            )));
        }
        Ok(self
            .entities
            .read()
            .iter()
            .filter(|e| e.type_name == type_name && ids.contains(&e.id))
            .cloned()
            .collect())
    }

    fn identifier(&self, entity: &MemoryEntity) -> Option<EntityId> {
        Some(entity.id.clone())
    }
}

impl TypeMetadata for InMemoryBackend {
    fn id_field(&self, type_name: &str) -> Option<String> {
        self.registry.id_field(type_name)
    }

    fn id_converter(&self, type_name: &str) -> Option<IdConverter> {
        self.registry.id_converter(type_name)
    }

    fn concrete_subtypes(&self, type_name: &str) -> Vec<String> {
        self.registry.concrete_subtypes(type_name)
    }

    fn all_types(&self) -> Vec<String> {
        self.registry.all_types()
    }

    fn index_name(&self, type_name: &str) -> Option<String> {
        self.registry.index_name(type_name)
    }

    fn has_field(&self, type_name: &str, field: &str) -> bool {
        self.registry.has_field(type_name, field)
    }
}
