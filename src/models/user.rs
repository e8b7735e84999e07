//! User model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// User entity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    /// Unique identifier
    pub id: i64,
    /// Login name (unique)
    pub username: String,
    /// Email address
    pub email: String,
    /// Given name, optional free text
    pub first_name: String,
    /// Family name, optional free text
    pub last_name: String,
    /// Argon2id password hash; never rendered
    #[serde(skip_serializing)]
    pub password_hash: String,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
}

impl User {
    /// Create a new user with empty display names
    pub fn new(
        username: impl Into<String>,
        email: impl Into<String>,
        password_hash: impl Into<String>,
    ) -> Self {
        Self {
            id: 0, // Set by the database
            username: username.into(),
            email: email.into(),
            first_name: String::new(),
            last_name: String::new(),
            password_hash: password_hash.into(),
            created_at: Utc::now(),
        }
    }
}

/// The fixed editable subset of profile fields.
///
/// Profile editing always operates on the authenticated principal and
/// touches exactly these four fields.
#[derive(Debug, Clone)]
pub struct ProfileUpdate {
    pub first_name: String,
    pub last_name: String,
    pub username: String,
    pub email: String,
}
