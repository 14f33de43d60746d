//! Testing infrastructure
//!
//! This module provides:
//! - An in-memory backend implementing every search collaborator
//! - A reference evaluator applying compiled queries to JSON documents
//! - Word segmentation and fuzzy term matching used by both
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use filterql::prelude::*;
//! use filterql::testing::{InMemoryBackend, MemoryEntity};
//!
//! let registry = TypeRegistry::new()
//!     .with_type(EntityTypeDescriptor::new("Invoice").with_fields(["text"]));
//! let backend = Arc::new(InMemoryBackend::new(registry).with_entities([
//!     MemoryEntity::new("Invoice", 1, json!({ "text": "in the middle of nowhere" })),
//! ]));
//! let service = SearchService::from_backend(backend.clone());
//!
//! let page = FilterQueryBuilder::global(&service, Some("nowhere"))?.highlight_all()?;
//! assert_eq!(backend.fetch_calls().len(), 1);
//! ```

pub mod analyzer;
pub mod evaluator;
pub mod memory;

pub use evaluator::DocumentView;
pub use memory::{FetchCall, InMemoryBackend, MemoryCursor, MemoryEntity, RecordedRequest};
