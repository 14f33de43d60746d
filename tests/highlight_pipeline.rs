//! Integration tests for highlighted search
//!
//! Runs the full pipeline against the in-memory backend: request encoding, hit
//! parsing, snippet extraction and entity reconciliation.

use filterql::prelude::*;
use filterql::testing::{InMemoryBackend, MemoryEntity};
use filterql::{HighlightStage, SearchMetrics};
use serde_json::json;
use std::sync::Arc;

fn registry() -> TypeRegistry {
    TypeRegistry::new()
        .with_type(
            EntityTypeDescriptor::new("Invoice")
                .with_supertype("Document")
                .with_fields(["text", "textid", "n"]),
        )
        .with_type(
            EntityTypeDescriptor::new("Receipt")
                .with_supertype("Document")
                .with_fields(["text", "n"]),
        )
        .with_type(
            EntityTypeDescriptor::new("Note")
                .with_id_kind(IdKind::Opaque)
                .with_fields(["text"]),
        )
}

fn setup(entities: Vec<MemoryEntity>) -> (Arc<InMemoryBackend>, SearchService<MemoryEntity>) {
    let backend = Arc::new(InMemoryBackend::new(registry()).with_entities(entities));
    let service = SearchService::from_backend(backend.clone());
    (backend, service)
}

fn documents() -> Vec<MemoryEntity> {
    vec![
        MemoryEntity::new("Invoice", 1, json!({ "textid": "FV/2016/01", "text": "lost in nowhere", "n": 3 })),
        MemoryEntity::new("Invoice", 2, json!({ "textid": "FV/2016/02", "text": "nowhere again", "n": 1 })),
        MemoryEntity::new("Receipt", 3, json!({ "text": "paid nowhere", "n": 2 })),
        MemoryEntity::new("Note", 4, json!({ "text": "shopping list" })),
    ]
}

#[test]
fn test_global_search_fetches_once_per_type() {
    let (backend, service) = setup(documents());

    let page = FilterQueryBuilder::global(&service, Some("nowhere"))
        .unwrap()
        .highlight_all()
        .unwrap();

    assert_eq!(page.count, 3);
    assert_eq!(page.data.len(), 3);
    for result in &page.data {
        let entity = result.entity.as_ref().expect("result should be reconciled");
        assert_eq!(entity.id.to_string(), result.id);
        assert_eq!(entity.type_name, result.type_name);
    }

    let calls = backend.fetch_calls();
    assert_eq!(calls.len(), 2);
    assert_eq!(calls[0].type_name, "Invoice");
    assert_eq!(calls[0].ids, vec![EntityId::Long(1), EntityId::Long(2)]);
    assert_eq!(calls[1].type_name, "Receipt");
    assert_eq!(calls[1].id_field, "id");

    let requests = backend.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].method, "POST");
    assert_eq!(requests[0].path, "/invoice,receipt,note/_search");
    assert_eq!(requests[0].body["from"], 0);
    assert_eq!(requests[0].body["size"], 10_000);
    assert_eq!(
        requests[0].body["highlight"],
        json!({ "fields": { "textid": {}, "text": {} } })
    );
}

#[test]
fn test_fragments_become_the_snippet() {
    let (_backend, service) = setup(vec![MemoryEntity::new(
        "Receipt",
        7,
        json!({ "text": "in the middle of nowhere" }),
    )]);

    let page = FilterQueryBuilder::new(
        &service,
        SearchScope::of("Receipt"),
        Some("in the middle of nowhere"),
    )
    .unwrap()
    .highlight_all()
    .unwrap();

    assert_eq!(page.data.len(), 1);
    assert_eq!(
        page.data[0].highlight,
        "<em>in</em> <em>the</em> <em>middle</em> <em>of</em> <em>nowhere</em>"
    );
    assert!(page.data[0].score > 0.0);
}

#[test]
fn test_identifier_prefix_is_highlighted() {
    let (_backend, service) = setup(documents());

    let page = FilterQueryBuilder::new(&service, SearchScope::of("Invoice"), Some("FV/2016/0"))
        .unwrap()
        .highlight_all()
        .unwrap();

    assert_eq!(page.count, 2);
    assert_eq!(page.data[0].highlight, "<em>FV</em>/<em>2016</em>/<em>01</em>");
}

#[test]
fn test_match_all_snippet_is_truncated_source() {
    let (_backend, service) = setup(vec![MemoryEntity::new(
        "Receipt",
        7,
        json!({ "text": "in the middle of nowhere" }),
    )]);

    let page = FilterQueryBuilder::new(&service, SearchScope::of("Receipt"), Some("*"))
        .unwrap()
        .with_max_highlight_length(10)
        .highlight_all()
        .unwrap();

    assert_eq!(page.data[0].highlight, "in the mid");
    assert!(page.data[0].is_reconciled());
}

#[test]
fn test_request_failure_names_the_stage() {
    let (backend, service) = setup(documents());
    backend.fail_requests(true);

    let err = FilterQueryBuilder::global(&service, Some("nowhere"))
        .unwrap()
        .highlight_all()
        .unwrap_err();

    assert!(matches!(
        err,
        FilterQlError::HighlightExecutionFailed {
            stage: HighlightStage::Requesting,
            ..
        }
    ));
    assert!(backend.fetch_calls().is_empty());
}

/// Answers every search with a body that carries no hits
struct TruncatedResponse;

impl RawTransport for TruncatedResponse {
    fn perform_request(
        &self,
        _method: &str,
        _path: &str,
        _headers: &[(String, String)],
        _body: &[u8],
    ) -> filterql::Result<Vec<u8>> {
        Ok(br#"{"took":1}"#.to_vec())
    }
}

#[test]
fn test_malformed_response_fails_while_parsing_hits() {
    let backend = Arc::new(InMemoryBackend::new(registry()).with_entities(documents()));
    let service = SearchService::new(
        Arc::new(registry()),
        backend.clone(),
        Arc::new(TruncatedResponse),
        backend.clone(),
    );

    let err = FilterQueryBuilder::global(&service, Some("nowhere"))
        .unwrap()
        .highlight_all()
        .unwrap_err();

    assert!(matches!(
        err,
        FilterQlError::HighlightExecutionFailed {
            stage: HighlightStage::ParsingHits,
            ..
        }
    ));
    assert!(err.to_string().contains("parsing hits"));
    assert!(backend.fetch_calls().is_empty());
}

#[test]
fn test_fetch_failure_names_the_stage() {
    let (backend, service) = setup(documents());
    backend.fail_fetches(true);

    let err = FilterQueryBuilder::global(&service, Some("nowhere"))
        .unwrap()
        .highlight_all()
        .unwrap_err();

    assert!(matches!(
        err,
        FilterQlError::HighlightExecutionFailed {
            stage: HighlightStage::FetchingEntities,
            ..
        }
    ));
    let source = std::error::Error::source(&err).unwrap();
    assert!(source.to_string().contains("entity store unavailable"));
    assert_eq!(backend.fetch_calls().len(), 1);
}

#[test]
fn test_opaque_ids_leave_results_unreconciled() {
    let (backend, service) = setup(documents());

    let page = FilterQueryBuilder::new(&service, SearchScope::of("Note"), Some("shopping"))
        .unwrap()
        .highlight_all()
        .unwrap();

    assert_eq!(page.data.len(), 1);
    assert_eq!(page.data[0].id, "4");
    assert!(page.data[0].entity.is_none());
    assert!(backend.fetch_calls().is_empty());
}

#[test]
fn test_abstract_scope_restricts_types() {
    let (backend, service) = setup(documents());

    let page = FilterQueryBuilder::new(&service, SearchScope::of("Document"), Some("nowhere"))
        .unwrap()
        .highlight_all()
        .unwrap();
    assert_eq!(page.count, 3);

    let request = &backend.requests()[0];
    assert_eq!(request.path, "/invoice,receipt/_search");
    assert_eq!(
        request.body["query"]["bool"]["filter"][0]["bool"]["must"][0],
        json!({ "bool": { "should": [
            { "type": { "value": "Invoice" } },
            { "type": { "value": "Receipt" } }
        ] } })
    );
}

#[test]
fn test_concrete_scope_adds_type_filter() {
    let (backend, service) = setup(documents());

    let mut builder =
        FilterQueryBuilder::new(&service, SearchScope::of("Receipt"), Some("nowhere")).unwrap();
    builder
        .add("n", &SingleValueFilter::new(Condition::Ge, 2).into())
        .unwrap();
    let page = builder.highlight_all().unwrap();

    assert_eq!(page.count, 1);
    assert_eq!(page.data[0].id, "3");
    let request = &backend.requests()[0];
    assert_eq!(request.path, "/receipt/_search");
    assert_eq!(
        request.body["query"]["bool"]["filter"][0]["bool"]["must"],
        json!([
            { "range": { "n": { "gte": 2 } } },
            { "type": { "value": "Receipt" } }
        ])
    );
}

#[test]
fn test_unknown_scope_is_rejected() {
    let (backend, service) = setup(documents());

    let result = FilterQueryBuilder::new(&service, SearchScope::of("Ledger"), None)
        .unwrap()
        .highlight_all();

    assert!(matches!(result, Err(FilterQlError::Config(_))));
    assert!(backend.requests().is_empty());
}

#[test]
fn test_sorted_highlight_orders_by_field() {
    let (backend, service) = setup(documents());

    let page = FilterQueryBuilder::new(&service, SearchScope::of("Document"), Some("nowhere"))
        .unwrap()
        .highlight_sorted(&Sortable::unsorted().by(SortField::desc("n")))
        .unwrap();

    let ids: Vec<&str> = page.data.iter().map(|r| r.id.as_str()).collect();
    assert_eq!(ids, vec!["1", "3", "2"]);
    assert!(page.data.iter().all(|r| r.score == 0.0));
    assert_eq!(backend.requests()[0].body["sort"], json!([{ "n": { "order": "desc" } }]));
}

#[test]
fn test_metrics_are_recorded() {
    let backend = Arc::new(InMemoryBackend::new(registry()).with_entities(documents()));
    let metrics = Arc::new(SearchMetrics::new().unwrap());
    let service = SearchService::from_backend(backend).with_metrics(metrics.clone());

    FilterQueryBuilder::global(&service, Some("shopping"))
        .unwrap()
        .highlight_all()
        .unwrap();

    assert_eq!(
        metrics.searches_total.with_label_values(&["highlight"]).get(),
        1.0
    );
    assert_eq!(metrics.unreconciled_results.get(), 1.0);
    assert_eq!(metrics.highlight_latency.get_sample_count(), 1);
    assert!(metrics.gather().contains("filterql_highlight_latency_seconds"));
}

#[test]
fn test_failed_search_counts_one_error() {
    let backend = Arc::new(InMemoryBackend::new(registry()).with_entities(documents()));
    let metrics = Arc::new(SearchMetrics::new().unwrap());
    let service = SearchService::from_backend(backend.clone()).with_metrics(metrics.clone());
    backend.fail_requests(true);

    let builder = FilterQueryBuilder::global(&service, Some("nowhere")).unwrap();
    assert!(builder.highlight_all().is_err());

    assert_eq!(metrics.search_errors.get(), 1.0);
    assert_eq!(
        metrics.searches_total.with_label_values(&["highlight"]).get(),
        1.0
    );
}
