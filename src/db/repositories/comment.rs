//! Comment repository

use crate::config::DatabaseDriver;
use crate::db::DynDatabasePool;
use crate::models::{Comment, CommentView, NewComment};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{MySqlPool, Row, SqlitePool};
use std::sync::Arc;

/// Comment repository trait
#[async_trait]
pub trait CommentRepository: Send + Sync {
    /// Create a new comment
    async fn create(&self, input: &NewComment) -> Result<Comment>;

    /// Get comment by ID
    async fn get_by_id(&self, id: i64) -> Result<Option<Comment>>;

    /// Replace a comment's text
    async fn update_text(&self, id: i64, text: &str) -> Result<Comment>;

    /// Delete a comment
    async fn delete(&self, id: i64) -> Result<()>;

    /// List a post's comments with their authors, oldest first
    async fn list_by_post(&self, post_id: i64) -> Result<Vec<CommentView>>;

    /// Count a post's comments
    async fn count_by_post(&self, post_id: i64) -> Result<i64>;
}

/// SQLx-based comment repository implementation
pub struct SqlxCommentRepository {
    pool: DynDatabasePool,
}

impl SqlxCommentRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn CommentRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl CommentRepository for SqlxCommentRepository {
    async fn create(&self, input: &NewComment) -> Result<Comment> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                create_comment_sqlite(self.pool.as_sqlite().unwrap(), input).await
            }
            DatabaseDriver::Mysql => {
                create_comment_mysql(self.pool.as_mysql().unwrap(), input).await
            }
        }
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<Comment>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                get_comment_by_id_sqlite(self.pool.as_sqlite().unwrap(), id).await
            }
            DatabaseDriver::Mysql => {
                get_comment_by_id_mysql(self.pool.as_mysql().unwrap(), id).await
            }
        }
    }

    async fn update_text(&self, id: i64, text: &str) -> Result<Comment> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                update_comment_text_sqlite(self.pool.as_sqlite().unwrap(), id, text).await
            }
            DatabaseDriver::Mysql => {
                update_comment_text_mysql(self.pool.as_mysql().unwrap(), id, text).await
            }
        }
    }

    async fn delete(&self, id: i64) -> Result<()> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => delete_comment_sqlite(self.pool.as_sqlite().unwrap(), id).await,
            DatabaseDriver::Mysql => delete_comment_mysql(self.pool.as_mysql().unwrap(), id).await,
        }
    }

    async fn list_by_post(&self, post_id: i64) -> Result<Vec<CommentView>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                list_comments_by_post_sqlite(self.pool.as_sqlite().unwrap(), post_id).await
            }
            DatabaseDriver::Mysql => {
                list_comments_by_post_mysql(self.pool.as_mysql().unwrap(), post_id).await
            }
        }
    }

    async fn count_by_post(&self, post_id: i64) -> Result<i64> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                count_comments_by_post_sqlite(self.pool.as_sqlite().unwrap(), post_id).await
            }
            DatabaseDriver::Mysql => {
                count_comments_by_post_mysql(self.pool.as_mysql().unwrap(), post_id).await
            }
        }
    }
}

const COMMENT_COLUMNS: &str = "id, text, post_id, author_id, is_published, created_at";

// Comments are listed oldest-first with their author joined in
const COMMENT_VIEW_SQL: &str = "\
    SELECT c.id, c.text, c.post_id, c.author_id, c.is_published, c.created_at, \
           u.username AS author_username \
    FROM comments c \
    JOIN users u ON u.id = c.author_id \
    WHERE c.post_id = ? \
    ORDER BY c.created_at ASC, c.id ASC";

// ============================================================================
// SQLite implementations
// ============================================================================

async fn create_comment_sqlite(pool: &SqlitePool, input: &NewComment) -> Result<Comment> {
    let now = Utc::now();

    let result = sqlx::query(
        "INSERT INTO comments (text, post_id, author_id, is_published, created_at) VALUES (?, ?, ?, ?, ?)",
    )
    .bind(&input.text)
    .bind(input.post_id)
    .bind(input.author_id)
    .bind(true)
    .bind(now)
    .execute(pool)
    .await
    .context("Failed to create comment")?;

    Ok(Comment {
        id: result.last_insert_rowid(),
        text: input.text.clone(),
        post_id: input.post_id,
        author_id: input.author_id,
        is_published: true,
        created_at: now,
    })
}

async fn get_comment_by_id_sqlite(pool: &SqlitePool, id: i64) -> Result<Option<Comment>> {
    let sql = format!("SELECT {COMMENT_COLUMNS} FROM comments WHERE id = ?");
    let row = sqlx::query(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("Failed to get comment by ID")?;

    row.map(|row| row_to_comment_sqlite(&row)).transpose()
}

async fn update_comment_text_sqlite(pool: &SqlitePool, id: i64, text: &str) -> Result<Comment> {
    sqlx::query("UPDATE comments SET text = ? WHERE id = ?")
        .bind(text)
        .bind(id)
        .execute(pool)
        .await
        .context("Failed to update comment")?;

    get_comment_by_id_sqlite(pool, id)
        .await?
        .ok_or_else(|| anyhow::anyhow!("Comment not found after update"))
}

async fn delete_comment_sqlite(pool: &SqlitePool, id: i64) -> Result<()> {
    sqlx::query("DELETE FROM comments WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await
        .context("Failed to delete comment")?;
    Ok(())
}

async fn list_comments_by_post_sqlite(pool: &SqlitePool, post_id: i64) -> Result<Vec<CommentView>> {
    let rows = sqlx::query(COMMENT_VIEW_SQL)
        .bind(post_id)
        .fetch_all(pool)
        .await
        .context("Failed to list comments")?;

    rows.iter()
        .map(|row| {
            Ok(CommentView {
                comment: row_to_comment_sqlite(row)?,
                author_username: row.get("author_username"),
            })
        })
        .collect()
}

async fn count_comments_by_post_sqlite(pool: &SqlitePool, post_id: i64) -> Result<i64> {
    let row = sqlx::query("SELECT COUNT(*) as count FROM comments WHERE post_id = ?")
        .bind(post_id)
        .fetch_one(pool)
        .await
        .context("Failed to count comments")?;

    Ok(row.get("count"))
}

fn row_to_comment_sqlite(row: &sqlx::sqlite::SqliteRow) -> Result<Comment> {
    Ok(Comment {
        id: row.get("id"),
        text: row.get("text"),
        post_id: row.get("post_id"),
        author_id: row.get("author_id"),
        is_published: row.get("is_published"),
        created_at: row.get("created_at"),
    })
}

// ============================================================================
// MySQL implementations
// ============================================================================

async fn create_comment_mysql(pool: &MySqlPool, input: &NewComment) -> Result<Comment> {
    let now = Utc::now();

    let result = sqlx::query(
        "INSERT INTO comments (text, post_id, author_id, is_published, created_at) VALUES (?, ?, ?, ?, ?)",
    )
    .bind(&input.text)
    .bind(input.post_id)
    .bind(input.author_id)
    .bind(true)
    .bind(now)
    .execute(pool)
    .await
    .context("Failed to create comment")?;

    Ok(Comment {
        id: result.last_insert_id() as i64,
        text: input.text.clone(),
        post_id: input.post_id,
        author_id: input.author_id,
        is_published: true,
        created_at: now,
    })
}

async fn get_comment_by_id_mysql(pool: &MySqlPool, id: i64) -> Result<Option<Comment>> {
    let sql = format!("SELECT {COMMENT_COLUMNS} FROM comments WHERE id = ?");
    let row = sqlx::query(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("Failed to get comment by ID")?;

    row.map(|row| row_to_comment_mysql(&row)).transpose()
}

async fn update_comment_text_mysql(pool: &MySqlPool, id: i64, text: &str) -> Result<Comment> {
    sqlx::query("UPDATE comments SET text = ? WHERE id = ?")
        .bind(text)
        .bind(id)
        .execute(pool)
        .await
        .context("Failed to update comment")?;

    get_comment_by_id_mysql(pool, id)
        .await?
        .ok_or_else(|| anyhow::anyhow!("Comment not found after update"))
}

async fn delete_comment_mysql(pool: &MySqlPool, id: i64) -> Result<()> {
    sqlx::query("DELETE FROM comments WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await
        .context("Failed to delete comment")?;
    Ok(())
}

async fn list_comments_by_post_mysql(pool: &MySqlPool, post_id: i64) -> Result<Vec<CommentView>> {
    let rows = sqlx::query(COMMENT_VIEW_SQL)
        .bind(post_id)
        .fetch_all(pool)
        .await
        .context("Failed to list comments")?;

    rows.iter()
        .map(|row| {
            Ok(CommentView {
                comment: row_to_comment_mysql(row)?,
                author_username: row.get("author_username"),
            })
        })
        .collect()
}

async fn count_comments_by_post_mysql(pool: &MySqlPool, post_id: i64) -> Result<i64> {
    let row = sqlx::query("SELECT COUNT(*) as count FROM comments WHERE post_id = ?")
        .bind(post_id)
        .fetch_one(pool)
        .await
        .context("Failed to count comments")?;

    Ok(row.get("count"))
}

fn row_to_comment_mysql(row: &sqlx::mysql::MySqlRow) -> Result<Comment> {
    Ok(Comment {
        id: row.get("id"),
        text: row.get("text"),
        post_id: row.get("post_id"),
        author_id: row.get("author_id"),
        is_published: row.get("is_published"),
        created_at: row.get("created_at"),
    })
}
