//! Category model
//!
//! Categories group posts and gate their visibility: posts in an
//! unpublished category disappear from all public listings.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Category entity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Category {
    /// Unique identifier
    pub id: i64,
    /// Category title
    pub title: String,
    /// Free-form description shown on the category page
    pub description: String,
    /// URL-friendly slug (unique)
    pub slug: String,
    /// Whether the category (and thus its posts) is publicly visible
    pub is_published: bool,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
}

/// Input for creating a category
#[derive(Debug, Clone)]
pub struct NewCategory {
    pub title: String,
    pub description: String,
    pub slug: String,
    pub is_published: bool,
}

impl NewCategory {
    pub fn new(
        title: impl Into<String>,
        description: impl Into<String>,
        slug: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            slug: slug.into(),
            is_published: true,
        }
    }

    pub fn unpublished(mut self) -> Self {
        self.is_published = false;
        self
    }
}
