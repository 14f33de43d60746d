//! Filter dispatcher
//!
//! [`FilterQueryBuilder`] turns filter criteria into clauses of the current frame of
//! its [`QueryBuilderContext`]:
//!
//! | filter            | clause                                   |
//! |-------------------|------------------------------------------|
//! | `eq`              | `must: term`                             |
//! | `ne`              | `must_not: term`                         |
//! | `gt/ge/lt/le`     | `must: range`                            |
//! | `isNull`          | `must_not: exists`                       |
//! | `notNull`         | `must: exists`                           |
//! | value range       | `must: range { gte, lte }`               |
//! | date range        | `must: range { gte, lt }`                |
//! | list `and`        | `must: bool { <nested filters> }`        |
//! | list `or`         | `must: bool { should: <merged options> }`|
//!
//! # Example
//!
//! ```no_run
//! # use filterql::prelude::*;
//! # fn run<E>(service: &SearchService<E>) -> filterql::Result<()> {
//! let mut builder = FilterQueryBuilder::new(service, SearchScope::of("Invoice"), None)?;
//! builder
//!     .add("status", &SingleValueFilter::eq("open").into())?
//!     .or(|b| {
//!         b.add("amount", &SingleValueFilter::new(Condition::Gt, 100).into())?;
//!         b.add("priority", &SingleValueFilter::eq("high").into())?;
//!         Ok(())
//!     })?;
//! let compiled = builder.build()?;
//! # Ok(())
//! # }
//! ```

use tracing::debug;

use super::bool_query::BoolQuery;
use super::component::QueryComponent;
use super::context::QueryBuilderContext;
use super::types::{FieldValue, RangeBounds};
use crate::config::{self, SearchableField};
use crate::error::{FilterQlError, Result};
use crate::models::{
    Condition, Conjunction, DateRangeFilter, EntityFilter, ListFilter, QueryFilter,
    SingleValueFilter, ValueRangeFilter,
};
use crate::registry::SearchScope;
use crate::service::SearchService;

/// Date format of date-range bounds
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Builds one search against a [`SearchService`]
pub struct FilterQueryBuilder<'s, E> {
    pub(crate) service: &'s SearchService<E>,
    pub(crate) context: QueryBuilderContext,
    pub(crate) searchable_fields: Vec<SearchableField>,
    pub(crate) max_highlight_length: usize,
}

impl<'s, E> FilterQueryBuilder<'s, E> {
    /// Builder over the service's configured searchable fields.
    ///
    /// Fails with [`FilterQlError::NoSearchableFieldsFound`] when `query` is given but no
    /// searchable field is indexed by any type in `scope`.
    pub fn new(service: &'s SearchService<E>, scope: SearchScope, query: Option<&str>) -> Result<Self> {
        let fields = service.settings().searchable_fields.clone();
        Self::with_fields(service, scope, query, fields)
    }

    /// Builder searching every indexed type
    pub fn global(service: &'s SearchService<E>, query: Option<&str>) -> Result<Self> {
        Self::new(service, SearchScope::Global, query)
    }

    /// Builder matching `query` against `fields` instead of the configured ones
    pub fn with_fields(
        service: &'s SearchService<E>,
        scope: SearchScope,
        query: Option<&str>,
        fields: Vec<SearchableField>,
    ) -> Result<Self> {
        let mut context = QueryBuilderContext::new(scope, query);
        context.apply_free_text(&fields, service.metadata())?;
        Ok(Self {
            service,
            context,
            searchable_fields: fields,
            max_highlight_length: service.settings().max_highlight_length,
        })
    }

    /// Bound on snippets built from source fields
    pub fn with_max_highlight_length(mut self, length: usize) -> Self {
        self.max_highlight_length = length;
        self
    }

    pub fn context(&self) -> &QueryBuilderContext {
        &self.context
    }

    pub fn scope(&self) -> &SearchScope {
        self.context.scope()
    }

    pub fn searchable_fields(&self) -> &[SearchableField] {
        &self.searchable_fields
    }

    /// Names of this builder's searchable fields, in order
    pub fn field_names(&self) -> Vec<String> {
        config::field_names(&self.searchable_fields)
    }

    /// Add any filter on `field`
    pub fn add(&mut self, field: &str, filter: &QueryFilter) -> Result<&mut Self> {
        match filter {
            QueryFilter::Single(f) => self.add_single(field, f),
            QueryFilter::ValueRange(f) => Ok(self.add_value_range(field, f)),
            QueryFilter::DateRange(f) => self.add_date_range(field, f),
            QueryFilter::List(f) => self.add_list(field, f),
            QueryFilter::Entity(f) => self.add_entity(field, f),
        }
    }

    /// Add a comparison against one value
    pub fn add_single(&mut self, field: &str, filter: &SingleValueFilter) -> Result<&mut Self> {
        let condition = filter.condition;
        let value = || {
            filter.value.clone().ok_or_else(|| {
                FilterQlError::InvalidQuery(format!(
                    "condition {} on field {} requires a value",
                    condition, field
                ))
            })
        };

        match condition {
            Condition::Eq => {
                let term = QueryComponent::term(field, value()?);
                self.context.current_frame_mut().add_must(term);
            }
            Condition::Ne => {
                let term = QueryComponent::term(field, value()?);
                self.context.current_frame_mut().add_must_not(term);
            }
            Condition::Gt | Condition::Ge | Condition::Lt | Condition::Le => {
                let v = Some(value()?);
                let bounds = match condition {
                    Condition::Gt => RangeBounds { gt: v, ..Default::default() },
                    Condition::Ge => RangeBounds { gte: v, ..Default::default() },
                    Condition::Lt => RangeBounds { lt: v, ..Default::default() },
                    _ => RangeBounds { lte: v, ..Default::default() },
                };
                self.context
                    .current_frame_mut()
                    .add_must(QueryComponent::range(field, bounds));
            }
            Condition::IsNull => {
                self.context
                    .current_frame_mut()
                    .add_must_not(QueryComponent::exists(field));
            }
            Condition::NotNull => {
                self.context
                    .current_frame_mut()
                    .add_must(QueryComponent::exists(field));
            }
        }
        Ok(self)
    }

    /// Add a numeric range, inclusive on both ends
    pub fn add_value_range(&mut self, field: &str, filter: &ValueRangeFilter) -> &mut Self {
        self.add_range(field, filter.from.clone(), filter.to.clone(), true)
    }

    /// Add a calendar range; the computed upper bound is exclusive.
    ///
    /// Fails with [`FilterQlError::InvalidQuery`] when a bound falls outside the
    /// supported calendar.
    pub fn add_date_range(&mut self, field: &str, filter: &DateRangeFilter) -> Result<&mut Self> {
        let format = |d: chrono::NaiveDate| FieldValue::String(d.format(DATE_FORMAT).to_string());
        let from = filter.calculate_from()?.map(format);
        let to = filter.calculate_to()?.map(format);
        Ok(self.add_range(field, from, to, false))
    }

    fn add_range(
        &mut self,
        field: &str,
        from: Option<FieldValue>,
        to: Option<FieldValue>,
        inclusive_upper: bool,
    ) -> &mut Self {
        let mut bounds = RangeBounds {
            gte: from,
            ..Default::default()
        };
        if inclusive_upper {
            bounds.lte = to;
        } else {
            bounds.lt = to;
        }
        if bounds.is_unbounded() {
            debug!(field, "Skipping unbounded range filter");
            return self;
        }
        self.context
            .current_frame_mut()
            .add_must(QueryComponent::range(field, bounds));
        self
    }

    /// Add a group of filters on `field` joined by the list's conjunction
    pub fn add_list(&mut self, field: &str, filter: &ListFilter) -> Result<&mut Self> {
        if filter.filters.is_empty() {
            return Ok(self);
        }

        let mut sub = FilterQueryBuilder {
            service: self.service,
            context: QueryBuilderContext::new(
                self.context.scope().clone(),
                self.context.query(),
            ),
            searchable_fields: self.searchable_fields.clone(),
            max_highlight_length: self.max_highlight_length,
        };
        for nested in &filter.filters {
            sub.add(field, nested)?;
        }
        let frame = sub.context.into_filter_frame();
        self.fold(frame, filter.conjunction);
        Ok(self)
    }

    /// Add an entity reference, matched by its encoded identifier
    pub fn add_entity(&mut self, field: &str, filter: &EntityFilter) -> Result<&mut Self> {
        self.add_single(field, &filter.as_single_value())
    }

    /// Run `block` on a fresh frame and AND its filters into the current one
    pub fn and<F>(&mut self, block: F) -> Result<&mut Self>
    where
        F: FnOnce(&mut Self) -> Result<()>,
    {
        self.scoped(Conjunction::And, block)
    }

    /// Run `block` on a fresh frame and OR its filters into the current one
    pub fn or<F>(&mut self, block: F) -> Result<&mut Self>
    where
        F: FnOnce(&mut Self) -> Result<()>,
    {
        self.scoped(Conjunction::Or, block)
    }

    fn scoped<F>(&mut self, conjunction: Conjunction, block: F) -> Result<&mut Self>
    where
        F: FnOnce(&mut Self) -> Result<()>,
    {
        self.context.push_frame();
        let outcome = block(self);
        let frame = self.context.pop_frame().unwrap_or_default();
        outcome?;
        self.fold(frame, conjunction);
        Ok(self)
    }

    /// Fold a finished frame into the current one
    fn fold(&mut self, frame: BoolQuery, conjunction: Conjunction) {
        if frame.is_empty() {
            return;
        }
        let nested = match conjunction {
            Conjunction::And => frame,
            Conjunction::Or => BoolQuery::or_of(frame),
        };
        self.context.current_frame_mut().add_must(nested);
    }
}
