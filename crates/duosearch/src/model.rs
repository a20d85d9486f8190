//! The canonical product entity shared by both search backends.

use serde::{Deserialize, Serialize};

/// A product record.
///
/// The relational store is the source of truth for `id` and for record
/// existence; the ranked index holds a denormalized copy keyed by the same id
/// in its decimal text form. `id` is `None` until the relational store
/// assigns one (or when reconciliation forces it back to unset).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: Option<u64>,
    name: String,
    // Kept equal to `name` at all times so the ranked index can match on the
    // non-analyzed form without re-deriving it at query time.
    name_exact: String,
    pub description: String,
    pub category: String,
    pub price: f64,
}

impl Product {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        category: impl Into<String>,
        price: f64,
    ) -> Self {
        let name = name.into();
        Self {
            id: None,
            name_exact: name.clone(),
            name,
            description: description.into(),
            category: category.into(),
            price,
        }
    }

    #[must_use]
    pub fn with_id(mut self, id: u64) -> Self {
        self.id = Some(id);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The exact-match-only duplicate of `name`.
    pub fn name_exact(&self) -> &str {
        &self.name_exact
    }

    /// Rename the product, keeping the exact-match duplicate in sync.
    pub fn set_name(&mut self, name: impl Into<String>) {
        let name = name.into();
        self.name_exact = name.clone();
        self.name = name;
    }
}
