//! Session model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Login session backed by an HttpOnly cookie
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    /// Session token (UUID string)
    pub id: String,
    /// Owning user
    pub user_id: i64,
    /// Expiry timestamp; expired sessions validate to nothing
    pub expires_at: DateTime<Utc>,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
}

impl Session {
    /// Check whether the session has expired
    pub fn is_expired(&self) -> bool {
        self.expires_at <= Utc::now()
    }
}
