pub mod config;
pub mod error;
pub mod highlight;
pub mod metrics;
pub mod models;
pub mod query;
pub mod registry;
pub mod service;
pub mod testing;
pub mod transport;

pub use config::{RegistryConfig, SearchSettings, SearchableField, TypeConfig};
pub use error::{FilterQlError, Result};
pub use highlight::HighlightStage;
pub use metrics::SearchMetrics;
pub use models::*;
pub use query::{CompiledQuery, FilterQueryBuilder, QueryBuilderContext};
pub use registry::{
    EntityId, EntityTypeDescriptor, IdKind, SearchScope, TypeMetadata, TypeRegistry,
};
pub use service::SearchService;
pub use transport::HttpTransport;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Everything needed to build and run searches
pub mod prelude {
    pub use crate::config::{SearchSettings, SearchableField};
    pub use crate::error::{FilterQlError, Result};
    pub use crate::models::*;
    pub use crate::query::types::{FieldSearchStrategy, FieldValue, SortOrder};
    pub use crate::query::{CompiledQuery, FilterQueryBuilder};
    pub use crate::registry::{
        EntityId, EntityTypeDescriptor, IdKind, SearchScope, TypeMetadata, TypeRegistry,
    };
    pub use crate::service::{
        EntityFetcher, QuerySubmitter, RawTransport, ResultCursor, SearchService, SortDirective,
    };
}
