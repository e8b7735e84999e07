//! Comment model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Comment entity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Comment {
    /// Unique identifier
    pub id: i64,
    /// Comment text
    pub text: String,
    /// Post the comment belongs to
    pub post_id: i64,
    /// Author user ID
    pub author_id: i64,
    /// Moderation flag; kept in the schema but not filtered on display
    pub is_published: bool,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
}

/// Input for creating a comment. Post and author are stamped server-side.
#[derive(Debug, Clone)]
pub struct NewComment {
    pub text: String,
    pub post_id: i64,
    pub author_id: i64,
}

/// A comment joined with its author's username, as the detail page
/// renders it. Ordered by creation time ascending.
#[derive(Debug, Clone, Serialize)]
pub struct CommentView {
    #[serde(flatten)]
    pub comment: Comment,
    pub author_username: String,
}
