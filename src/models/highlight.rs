use serde::{Deserialize, Serialize};

/// One highlighted search hit, optionally reconciled with its entity
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct HighlightedResult<E> {
    /// Document id as returned by the index
    pub id: String,
    /// Concrete entity type of the hit
    pub type_name: String,
    pub score: f64,
    pub highlight: String,
    /// Reconciled entity, absent when its id could not be resolved
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entity: Option<E>,
}

impl<E> HighlightedResult<E> {
    pub fn new(
        id: impl Into<String>,
        type_name: impl Into<String>,
        score: f64,
        highlight: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            type_name: type_name.into(),
            score,
            highlight: highlight.into(),
            entity: None,
        }
    }

    pub fn with_entity(mut self, entity: E) -> Self {
        self.entity = Some(entity);
        self
    }

    pub fn is_reconciled(&self) -> bool {
        self.entity.is_some()
    }
}
