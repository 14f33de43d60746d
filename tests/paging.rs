//! Paging and result-window behaviour of listed and highlighted searches

use filterql::prelude::*;
use filterql::testing::{InMemoryBackend, MemoryEntity};
use serde_json::json;
use std::sync::Arc;

const DOCS: i64 = 101;

fn backend() -> Arc<InMemoryBackend> {
    let registry = TypeRegistry::new()
        .with_type(EntityTypeDescriptor::new("Invoice").with_fields(["text", "amount"]));
    let entities = (0..DOCS).map(|i| {
        MemoryEntity::new(
            "Invoice",
            i,
            json!({ "text": format!("nowhere entry {}", i), "amount": i }),
        )
    });
    Arc::new(InMemoryBackend::new(registry).with_entities(entities))
}

fn setup() -> (Arc<InMemoryBackend>, SearchService<MemoryEntity>) {
    let backend = backend();
    let service = SearchService::from_backend(backend.clone());
    (backend, service)
}

#[test]
fn test_unpaged_list_returns_everything() {
    let (_backend, service) = setup();
    let page = FilterQueryBuilder::new(&service, SearchScope::of("Invoice"), Some("nowhere"))
        .unwrap()
        .list_all()
        .unwrap();

    assert_eq!(page.count, DOCS as u64);
    assert_eq!(page.data.len(), DOCS as usize);
    assert_eq!(page.page_size, DOCS as usize);
    assert_eq!(page.page, 0);
}

#[test]
fn test_paged_list() {
    let (_backend, service) = setup();
    let builder =
        FilterQueryBuilder::new(&service, SearchScope::of("Invoice"), Some("nowhere")).unwrap();

    let first = builder.list(Pageable::of(0, 20), &Sortable::unsorted()).unwrap();
    assert_eq!(first.data.len(), 20);
    assert_eq!(first.count, DOCS as u64);
    assert_eq!(first.page_count(), 6);

    let last = builder.list(Pageable::of(5, 20), &Sortable::unsorted()).unwrap();
    assert_eq!(last.data.len(), 1);
    assert_eq!(last.page, 5);
}

#[test]
fn test_sorted_list_pages() {
    let (_backend, service) = setup();
    let builder = FilterQueryBuilder::new(&service, SearchScope::of("Invoice"), None).unwrap();

    let page = builder
        .list(
            Pageable::of(1, 3),
            &Sortable::unsorted().by(SortField::desc("amount")),
        )
        .unwrap();
    let ids: Vec<EntityId> = page.data.into_iter().map(|e| e.id).collect();
    assert_eq!(ids, vec![EntityId::Long(97), EntityId::Long(96), EntityId::Long(95)]);
}

#[test]
fn test_highlight_pages_match_list_totals() {
    let (backend, service) = setup();
    let query = Some("nowhere");

    let first = FilterQueryBuilder::new(&service, SearchScope::of("Invoice"), query)
        .unwrap()
        .highlight_page(Pageable::of(0, 20))
        .unwrap();
    assert_eq!(first.count, DOCS as u64);
    assert_eq!(first.data.len(), 20);
    assert_eq!(first.page_size, 20);

    let last = FilterQueryBuilder::new(&service, SearchScope::of("Invoice"), query)
        .unwrap()
        .highlight_page(Pageable::of(5, 20))
        .unwrap();
    assert_eq!(last.count, DOCS as u64);
    assert_eq!(last.data.len(), 1);

    let requests = backend.requests();
    assert_eq!((&requests[0].body["from"], &requests[0].body["size"]), (&json!(0), &json!(20)));
    assert_eq!((&requests[1].body["from"], &requests[1].body["size"]), (&json!(100), &json!(20)));
}

#[test]
fn test_result_window_caps_unpaged_searches() {
    let backend = backend();
    let service = SearchService::from_backend(backend.clone())
        .with_settings(SearchSettings::default().with_max_result_window(50));

    let listed = FilterQueryBuilder::new(&service, SearchScope::of("Invoice"), None)
        .unwrap()
        .list_all()
        .unwrap();
    assert_eq!(listed.count, DOCS as u64);
    assert_eq!(listed.data.len(), 50);

    let highlighted = FilterQueryBuilder::new(&service, SearchScope::of("Invoice"), Some("*"))
        .unwrap()
        .highlight_all()
        .unwrap();
    assert_eq!(highlighted.count, DOCS as u64);
    assert_eq!(highlighted.data.len(), 50);
    assert_eq!(backend.requests()[0].body["size"], 50);
}

#[test]
fn test_out_of_range_page_is_rejected() {
    let (backend, service) = setup();
    let far = Pageable::of(usize::MAX / 2, 20);

    let listed = FilterQueryBuilder::new(&service, SearchScope::of("Invoice"), None)
        .unwrap()
        .list(far, &Sortable::unsorted());
    assert!(matches!(listed, Err(FilterQlError::InvalidQuery(_))));

    let highlighted = FilterQueryBuilder::new(&service, SearchScope::of("Invoice"), Some("nowhere"))
        .unwrap()
        .highlight_page(far);
    assert!(matches!(highlighted, Err(FilterQlError::InvalidQuery(_))));
    assert!(backend.requests().is_empty());
}
