//! User repository

use crate::config::DatabaseDriver;
use crate::db::DynDatabasePool;
use crate::models::{ProfileUpdate, User};
use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::{MySqlPool, Row, SqlitePool};
use std::sync::Arc;

/// User repository trait
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Create a new user
    async fn create(&self, user: &User) -> Result<User>;

    /// Get user by ID
    async fn get_by_id(&self, id: i64) -> Result<Option<User>>;

    /// Get user by username
    async fn get_by_username(&self, username: &str) -> Result<Option<User>>;

    /// Get user by email
    async fn get_by_email(&self, email: &str) -> Result<Option<User>>;

    /// Apply the fixed editable profile field subset to a user
    async fn update_profile(&self, id: i64, update: &ProfileUpdate) -> Result<User>;

    /// Count all users
    async fn count(&self) -> Result<i64>;
}

/// SQLx-based user repository implementation
pub struct SqlxUserRepository {
    pool: DynDatabasePool,
}

impl SqlxUserRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn UserRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl UserRepository for SqlxUserRepository {
    async fn create(&self, user: &User) -> Result<User> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => create_user_sqlite(self.pool.as_sqlite().unwrap(), user).await,
            DatabaseDriver::Mysql => create_user_mysql(self.pool.as_mysql().unwrap(), user).await,
        }
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<User>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                get_user_by_id_sqlite(self.pool.as_sqlite().unwrap(), id).await
            }
            DatabaseDriver::Mysql => get_user_by_id_mysql(self.pool.as_mysql().unwrap(), id).await,
        }
    }

    async fn get_by_username(&self, username: &str) -> Result<Option<User>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                get_user_by_username_sqlite(self.pool.as_sqlite().unwrap(), username).await
            }
            DatabaseDriver::Mysql => {
                get_user_by_username_mysql(self.pool.as_mysql().unwrap(), username).await
            }
        }
    }

    async fn get_by_email(&self, email: &str) -> Result<Option<User>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                get_user_by_email_sqlite(self.pool.as_sqlite().unwrap(), email).await
            }
            DatabaseDriver::Mysql => {
                get_user_by_email_mysql(self.pool.as_mysql().unwrap(), email).await
            }
        }
    }

    async fn update_profile(&self, id: i64, update: &ProfileUpdate) -> Result<User> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                update_profile_sqlite(self.pool.as_sqlite().unwrap(), id, update).await
            }
            DatabaseDriver::Mysql => {
                update_profile_mysql(self.pool.as_mysql().unwrap(), id, update).await
            }
        }
    }

    async fn count(&self) -> Result<i64> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => count_users_sqlite(self.pool.as_sqlite().unwrap()).await,
            DatabaseDriver::Mysql => count_users_mysql(self.pool.as_mysql().unwrap()).await,
        }
    }
}

const USER_COLUMNS: &str =
    "id, username, email, first_name, last_name, password_hash, created_at";

// ============================================================================
// SQLite implementations
// ============================================================================

async fn create_user_sqlite(pool: &SqlitePool, user: &User) -> Result<User> {
    let result = sqlx::query(
        "INSERT INTO users (username, email, first_name, last_name, password_hash, created_at) VALUES (?, ?, ?, ?, ?, ?)",
    )
    .bind(&user.username)
    .bind(&user.email)
    .bind(&user.first_name)
    .bind(&user.last_name)
    .bind(&user.password_hash)
    .bind(user.created_at)
    .execute(pool)
    .await
    .context("Failed to create user")?;

    Ok(User {
        id: result.last_insert_rowid(),
        ..user.clone()
    })
}

async fn get_user_by_id_sqlite(pool: &SqlitePool, id: i64) -> Result<Option<User>> {
    let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?");
    let row = sqlx::query(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("Failed to get user by ID")?;

    row.map(|row| row_to_user_sqlite(&row)).transpose()
}

async fn get_user_by_username_sqlite(pool: &SqlitePool, username: &str) -> Result<Option<User>> {
    let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE username = ?");
    let row = sqlx::query(&sql)
        .bind(username)
        .fetch_optional(pool)
        .await
        .context("Failed to get user by username")?;

    row.map(|row| row_to_user_sqlite(&row)).transpose()
}

async fn get_user_by_email_sqlite(pool: &SqlitePool, email: &str) -> Result<Option<User>> {
    let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE email = ?");
    let row = sqlx::query(&sql)
        .bind(email)
        .fetch_optional(pool)
        .await
        .context("Failed to get user by email")?;

    row.map(|row| row_to_user_sqlite(&row)).transpose()
}

async fn update_profile_sqlite(
    pool: &SqlitePool,
    id: i64,
    update: &ProfileUpdate,
) -> Result<User> {
    sqlx::query(
        "UPDATE users SET first_name = ?, last_name = ?, username = ?, email = ? WHERE id = ?",
    )
    .bind(&update.first_name)
    .bind(&update.last_name)
    .bind(&update.username)
    .bind(&update.email)
    .bind(id)
    .execute(pool)
    .await
    .context("Failed to update profile")?;

    get_user_by_id_sqlite(pool, id)
        .await?
        .ok_or_else(|| anyhow::anyhow!("User not found after update"))
}

async fn count_users_sqlite(pool: &SqlitePool) -> Result<i64> {
    let row = sqlx::query("SELECT COUNT(*) as count FROM users")
        .fetch_one(pool)
        .await
        .context("Failed to count users")?;

    Ok(row.get("count"))
}

fn row_to_user_sqlite(row: &sqlx::sqlite::SqliteRow) -> Result<User> {
    Ok(User {
        id: row.get("id"),
        username: row.get("username"),
        email: row.get("email"),
        first_name: row.get("first_name"),
        last_name: row.get("last_name"),
        password_hash: row.get("password_hash"),
        created_at: row.get("created_at"),
    })
}

// ============================================================================
// MySQL implementations
// ============================================================================

async fn create_user_mysql(pool: &MySqlPool, user: &User) -> Result<User> {
    let result = sqlx::query(
        "INSERT INTO users (username, email, first_name, last_name, password_hash, created_at) VALUES (?, ?, ?, ?, ?, ?)",
    )
    .bind(&user.username)
    .bind(&user.email)
    .bind(&user.first_name)
    .bind(&user.last_name)
    .bind(&user.password_hash)
    .bind(user.created_at)
    .execute(pool)
    .await
    .context("Failed to create user")?;

    Ok(User {
        id: result.last_insert_id() as i64,
        ..user.clone()
    })
}

async fn get_user_by_id_mysql(pool: &MySqlPool, id: i64) -> Result<Option<User>> {
    let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?");
    let row = sqlx::query(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("Failed to get user by ID")?;

    row.map(|row| row_to_user_mysql(&row)).transpose()
}

async fn get_user_by_username_mysql(pool: &MySqlPool, username: &str) -> Result<Option<User>> {
    let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE username = ?");
    let row = sqlx::query(&sql)
        .bind(username)
        .fetch_optional(pool)
        .await
        .context("Failed to get user by username")?;

    row.map(|row| row_to_user_mysql(&row)).transpose()
}

async fn get_user_by_email_mysql(pool: &MySqlPool, email: &str) -> Result<Option<User>> {
    let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE email = ?");
    let row = sqlx::query(&sql)
        .bind(email)
        .fetch_optional(pool)
        .await
        .context("Failed to get user by email")?;

    row.map(|row| row_to_user_mysql(&row)).transpose()
}

async fn update_profile_mysql(pool: &MySqlPool, id: i64, update: &ProfileUpdate) -> Result<User> {
    sqlx::query(
        "UPDATE users SET first_name = ?, last_name = ?, username = ?, email = ? WHERE id = ?",
    )
    .bind(&update.first_name)
    .bind(&update.last_name)
    .bind(&update.username)
    .bind(&update.email)
    .bind(id)
    .execute(pool)
    .await
    .context("Failed to update profile")?;

    get_user_by_id_mysql(pool, id)
        .await?
        .ok_or_else(|| anyhow::anyhow!("User not found after update"))
}

async fn count_users_mysql(pool: &MySqlPool) -> Result<i64> {
    let row = sqlx::query("SELECT COUNT(*) as count FROM users")
        .fetch_one(pool)
        .await
        .context("Failed to count users")?;

    Ok(row.get("count"))
}

fn row_to_user_mysql(row: &sqlx::mysql::MySqlRow) -> Result<User> {
    Ok(User {
        id: row.get("id"),
        username: row.get("username"),
        email: row.get("email"),
        first_name: row.get("first_name"),
        last_name: row.get("last_name"),
        password_hash: row.get("password_hash"),
        created_at: row.get("created_at"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{create_test_pool, migrations};

    async fn setup_test_repo() -> SqlxUserRepository {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");
        SqlxUserRepository::new(pool)
    }

    #[tokio::test]
    async fn test_create_and_lookup() {
        let repo = setup_test_repo().await;

        let user = User::new("alice", "alice@example.com", "hash");
        let created = repo.create(&user).await.expect("Failed to create");
        assert!(created.id > 0);

        let by_id = repo
            .get_by_id(created.id)
            .await
            .expect("Query failed")
            .expect("User not found");
        assert_eq!(by_id.username, "alice");

        let by_name = repo
            .get_by_username("alice")
            .await
            .expect("Query failed")
            .expect("User not found");
        assert_eq!(by_name.id, created.id);

        let by_email = repo
            .get_by_email("alice@example.com")
            .await
            .expect("Query failed")
            .expect("User not found");
        assert_eq!(by_email.id, created.id);
    }

    #[tokio::test]
    async fn test_lookup_missing_returns_none() {
        let repo = setup_test_repo().await;

        assert!(repo.get_by_id(999).await.expect("Query failed").is_none());
        assert!(repo
            .get_by_username("ghost")
            .await
            .expect("Query failed")
            .is_none());
    }

    #[tokio::test]
    async fn test_duplicate_username_rejected() {
        let repo = setup_test_repo().await;

        repo.create(&User::new("bob", "bob@example.com", "hash"))
            .await
            .expect("Failed to create");
        let result = repo.create(&User::new("bob", "other@example.com", "hash")).await;

        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_update_profile_applies_fixed_fields() {
        let repo = setup_test_repo().await;

        let created = repo
            .create(&User::new("carol", "carol@example.com", "hash"))
            .await
            .expect("Failed to create");

        let update = ProfileUpdate {
            first_name: "Carol".to_string(),
            last_name: "Jones".to_string(),
            username: "carolj".to_string(),
            email: "cj@example.com".to_string(),
        };
        let updated = repo
            .update_profile(created.id, &update)
            .await
            .expect("Update failed");

        assert_eq!(updated.first_name, "Carol");
        assert_eq!(updated.last_name, "Jones");
        assert_eq!(updated.username, "carolj");
        assert_eq!(updated.email, "cj@example.com");
        // The password hash is untouched
        assert_eq!(updated.password_hash, "hash");
    }

    #[tokio::test]
    async fn test_count() {
        let repo = setup_test_repo().await;

        assert_eq!(repo.count().await.expect("Count failed"), 0);
        repo.create(&User::new("dave", "dave@example.com", "hash"))
            .await
            .expect("Failed to create");
        assert_eq!(repo.count().await.expect("Count failed"), 1);
    }
}
