pub mod filter;
pub mod highlight;
pub mod page;

pub use filter::{
    Condition, Conjunction, DatePeriod, DateRangeFilter, EntityFilter, ListFilter, QueryFilter,
    SingleValueFilter, ValueRangeFilter, NULL_ID,
};
pub use highlight::HighlightedResult;
pub use page::{Page, Pageable, SortField, Sortable};
