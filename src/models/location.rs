//! Location model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Location entity, an optional attribute of a post
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Location {
    /// Unique identifier
    pub id: i64,
    /// Place name
    pub name: String,
    /// Whether the location is shown in public contexts
    pub is_published: bool,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
}

/// Input for creating a location
#[derive(Debug, Clone)]
pub struct NewLocation {
    pub name: String,
    pub is_published: bool,
}

impl NewLocation {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            is_published: true,
        }
    }
}
