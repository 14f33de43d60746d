use serde::{Deserialize, Serialize};

use crate::error::{FilterQlError, Result};
use crate::query::types::SortOrder;

/// Requested page of results
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Pageable {
    /// Everything, up to the configured result window
    #[default]
    Unpaged,
    /// Zero-based page index and page size
    Paged { page: usize, page_size: usize },
}

impl Pageable {
    pub fn of(page: usize, page_size: usize) -> Self {
        Pageable::Paged { page, page_size }
    }

    pub fn is_paged(&self) -> bool {
        matches!(self, Pageable::Paged { .. })
    }

    pub fn page(&self) -> usize {
        match self {
            Pageable::Unpaged => 0,
            Pageable::Paged { page, .. } => *page,
        }
    }

    /// Offset and size of the window to fetch; unpaged requests use `max_window`
    pub fn window(&self, max_window: usize) -> Result<(usize, usize)> {
        match self {
            Pageable::Unpaged => Ok((0, max_window)),
            Pageable::Paged { page, page_size } => {
                let offset = page.checked_mul(*page_size).ok_or_else(|| {
                    FilterQlError::InvalidQuery(format!(
                        "page {} of size {} is out of range",
                        page, page_size
                    ))
                })?;
                Ok((offset, *page_size))
            }
        }
    }
}

/// One sort criterion
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortField {
    pub field: String,
    #[serde(default)]
    pub order: SortOrder,
}

impl SortField {
    pub fn asc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            order: SortOrder::Asc,
        }
    }

    pub fn desc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            order: SortOrder::Desc,
        }
    }
}

/// Ordered sort criteria of a request
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sortable {
    #[serde(default)]
    pub sort: Vec<SortField>,
}

impl Sortable {
    pub fn unsorted() -> Self {
        Self::default()
    }

    pub fn by(mut self, field: SortField) -> Self {
        self.sort.push(field);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.sort.is_empty()
    }
}

/// A page of results with the total number of matches
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Page<T> {
    pub page_size: usize,
    pub page: usize,
    pub count: u64,
    pub data: Vec<T>,
}

impl<T> Page<T> {
    /// Wrap fetched data; an unpaged page reports its own length as page size
    pub fn new(pageable: &Pageable, count: u64, data: Vec<T>) -> Self {
        let page_size = match pageable {
            Pageable::Unpaged => data.len(),
            Pageable::Paged { page_size, .. } => *page_size,
        };
        Self {
            page_size,
            page: pageable.page(),
            count,
            data,
        }
    }

    pub fn map<U, F: FnMut(T) -> U>(self, f: F) -> Page<U> {
        Page {
            page_size: self.page_size,
            page: self.page,
            count: self.count,
            data: self.data.into_iter().map(f).collect(),
        }
    }

    /// Number of pages needed to show every match
    pub fn page_count(&self) -> u64 {
        if self.page_size == 0 {
            return 0;
        }
        self.count.div_ceil(self.page_size as u64)
    }
}
