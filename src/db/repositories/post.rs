//! Post repository
//!
//! Feed queries share one SELECT (author/category/location joined, comment
//! count annotated) and one visibility predicate: published, category
//! published or absent, publication date not in the future. Listings are
//! ordered newest publication date first.

use crate::config::DatabaseDriver;
use crate::db::DynDatabasePool;
use crate::models::{FeedEntry, Post, PostInput};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{MySqlPool, Row, SqlitePool};
use std::sync::Arc;

/// Post repository trait
#[async_trait]
pub trait PostRepository: Send + Sync {
    /// Create a new post authored by `author_id`
    async fn create(&self, input: &PostInput, author_id: i64) -> Result<Post>;

    /// Get post by ID, regardless of visibility
    async fn get_by_id(&self, id: i64) -> Result<Option<Post>>;

    /// Get a single post joined for rendering, regardless of visibility
    async fn get_entry(&self, id: i64) -> Result<Option<FeedEntry>>;

    /// Replace a post's editable fields (the author never changes)
    async fn update(&self, id: i64, input: &PostInput) -> Result<Post>;

    /// Delete a post; its comments cascade
    async fn delete(&self, id: i64) -> Result<()>;

    /// List publicly visible posts at `now`
    async fn list_visible(&self, now: DateTime<Utc>, offset: i64, limit: i64)
        -> Result<Vec<FeedEntry>>;

    /// Count publicly visible posts at `now`
    async fn count_visible(&self, now: DateTime<Utc>) -> Result<i64>;

    /// List publicly visible posts of one category at `now`
    async fn list_visible_by_category(
        &self,
        category_id: i64,
        now: DateTime<Utc>,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<FeedEntry>>;

    /// Count publicly visible posts of one category at `now`
    async fn count_visible_by_category(&self, category_id: i64, now: DateTime<Utc>)
        -> Result<i64>;

    /// List ALL of an author's posts, drafts and scheduled ones included
    async fn list_by_author(&self, author_id: i64, offset: i64, limit: i64)
        -> Result<Vec<FeedEntry>>;

    /// Count ALL of an author's posts
    async fn count_by_author(&self, author_id: i64) -> Result<i64>;

    /// List an author's publicly visible posts at `now`
    async fn list_visible_by_author(
        &self,
        author_id: i64,
        now: DateTime<Utc>,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<FeedEntry>>;

    /// Count an author's publicly visible posts at `now`
    async fn count_visible_by_author(&self, author_id: i64, now: DateTime<Utc>) -> Result<i64>;
}

/// SQLx-based post repository implementation
pub struct SqlxPostRepository {
    pool: DynDatabasePool,
}

impl SqlxPostRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn PostRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl PostRepository for SqlxPostRepository {
    async fn create(&self, input: &PostInput, author_id: i64) -> Result<Post> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                create_post_sqlite(self.pool.as_sqlite().unwrap(), input, author_id).await
            }
            DatabaseDriver::Mysql => {
                create_post_mysql(self.pool.as_mysql().unwrap(), input, author_id).await
            }
        }
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<Post>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => get_post_by_id_sqlite(self.pool.as_sqlite().unwrap(), id).await,
            DatabaseDriver::Mysql => get_post_by_id_mysql(self.pool.as_mysql().unwrap(), id).await,
        }
    }

    async fn get_entry(&self, id: i64) -> Result<Option<FeedEntry>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => get_entry_sqlite(self.pool.as_sqlite().unwrap(), id).await,
            DatabaseDriver::Mysql => get_entry_mysql(self.pool.as_mysql().unwrap(), id).await,
        }
    }

    async fn update(&self, id: i64, input: &PostInput) -> Result<Post> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                update_post_sqlite(self.pool.as_sqlite().unwrap(), id, input).await
            }
            DatabaseDriver::Mysql => {
                update_post_mysql(self.pool.as_mysql().unwrap(), id, input).await
            }
        }
    }

    async fn delete(&self, id: i64) -> Result<()> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => delete_post_sqlite(self.pool.as_sqlite().unwrap(), id).await,
            DatabaseDriver::Mysql => delete_post_mysql(self.pool.as_mysql().unwrap(), id).await,
        }
    }

    async fn list_visible(
        &self,
        now: DateTime<Utc>,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<FeedEntry>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                list_visible_sqlite(self.pool.as_sqlite().unwrap(), now, offset, limit).await
            }
            DatabaseDriver::Mysql => {
                list_visible_mysql(self.pool.as_mysql().unwrap(), now, offset, limit).await
            }
        }
    }

    async fn count_visible(&self, now: DateTime<Utc>) -> Result<i64> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                count_visible_sqlite(self.pool.as_sqlite().unwrap(), now).await
            }
            DatabaseDriver::Mysql => count_visible_mysql(self.pool.as_mysql().unwrap(), now).await,
        }
    }

    async fn list_visible_by_category(
        &self,
        category_id: i64,
        now: DateTime<Utc>,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<FeedEntry>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                list_visible_by_category_sqlite(
                    self.pool.as_sqlite().unwrap(),
                    category_id,
                    now,
                    offset,
                    limit,
                )
                .await
            }
            DatabaseDriver::Mysql => {
                list_visible_by_category_mysql(
                    self.pool.as_mysql().unwrap(),
                    category_id,
                    now,
                    offset,
                    limit,
                )
                .await
            }
        }
    }

    async fn count_visible_by_category(
        &self,
        category_id: i64,
        now: DateTime<Utc>,
    ) -> Result<i64> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                count_visible_by_category_sqlite(self.pool.as_sqlite().unwrap(), category_id, now)
                    .await
            }
            DatabaseDriver::Mysql => {
                count_visible_by_category_mysql(self.pool.as_mysql().unwrap(), category_id, now)
                    .await
            }
        }
    }

    async fn list_by_author(
        &self,
        author_id: i64,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<FeedEntry>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                list_by_author_sqlite(self.pool.as_sqlite().unwrap(), author_id, offset, limit)
                    .await
            }
            DatabaseDriver::Mysql => {
                list_by_author_mysql(self.pool.as_mysql().unwrap(), author_id, offset, limit).await
            }
        }
    }

    async fn count_by_author(&self, author_id: i64) -> Result<i64> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                count_by_author_sqlite(self.pool.as_sqlite().unwrap(), author_id).await
            }
            DatabaseDriver::Mysql => {
                count_by_author_mysql(self.pool.as_mysql().unwrap(), author_id).await
            }
        }
    }

    async fn list_visible_by_author(
        &self,
        author_id: i64,
        now: DateTime<Utc>,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<FeedEntry>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                list_visible_by_author_sqlite(
                    self.pool.as_sqlite().unwrap(),
                    author_id,
                    now,
                    offset,
                    limit,
                )
                .await
            }
            DatabaseDriver::Mysql => {
                list_visible_by_author_mysql(
                    self.pool.as_mysql().unwrap(),
                    author_id,
                    now,
                    offset,
                    limit,
                )
                .await
            }
        }
    }

    async fn count_visible_by_author(&self, author_id: i64, now: DateTime<Utc>) -> Result<i64> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                count_visible_by_author_sqlite(self.pool.as_sqlite().unwrap(), author_id, now).await
            }
            DatabaseDriver::Mysql => {
                count_visible_by_author_mysql(self.pool.as_mysql().unwrap(), author_id, now).await
            }
        }
    }
}

// ============================================================================
// Shared SQL fragments
// ============================================================================

const POST_COLUMNS: &str = "id, title, text, pub_date, author_id, location_id, category_id, image, is_published, created_at";

const ENTRY_SELECT: &str = "\
    SELECT p.id, p.title, p.text, p.pub_date, p.author_id, p.location_id, p.category_id, \
           p.image, p.is_published, p.created_at, \
           u.username AS author_username, \
           c.title AS category_title, c.slug AS category_slug, \
           l.name AS location_name, \
           (SELECT COUNT(*) FROM comments cm WHERE cm.post_id = p.id) AS comment_count \
    FROM posts p \
    JOIN users u ON u.id = p.author_id \
    LEFT JOIN categories c ON c.id = p.category_id \
    LEFT JOIN locations l ON l.id = p.location_id";

const ENTRY_COUNT: &str = "\
    SELECT COUNT(*) as count \
    FROM posts p \
    LEFT JOIN categories c ON c.id = p.category_id";

// The public-visibility invariant; binds one parameter, the `now` cutoff.
const VISIBLE: &str =
    "p.is_published = 1 AND (p.category_id IS NULL OR c.is_published = 1) AND p.pub_date <= ?";

const FEED_ORDER: &str = "ORDER BY p.pub_date DESC, p.id DESC";

// ============================================================================
// SQLite implementations
// ============================================================================

async fn create_post_sqlite(pool: &SqlitePool, input: &PostInput, author_id: i64) -> Result<Post> {
    let now = Utc::now();
    let pub_date = input.pub_date.unwrap_or(now);

    let result = sqlx::query(
        "INSERT INTO posts (title, text, pub_date, author_id, location_id, category_id, image, is_published, created_at) \
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(&input.title)
    .bind(&input.text)
    .bind(pub_date)
    .bind(author_id)
    .bind(input.location_id)
    .bind(input.category_id)
    .bind(&input.image)
    .bind(input.is_published)
    .bind(now)
    .execute(pool)
    .await
    .context("Failed to create post")?;

    Ok(Post {
        id: result.last_insert_rowid(),
        title: input.title.clone(),
        text: input.text.clone(),
        pub_date,
        author_id,
        location_id: input.location_id,
        category_id: input.category_id,
        image: input.image.clone(),
        is_published: input.is_published,
        created_at: now,
    })
}

async fn get_post_by_id_sqlite(pool: &SqlitePool, id: i64) -> Result<Option<Post>> {
    let sql = format!("SELECT {POST_COLUMNS} FROM posts WHERE id = ?");
    let row = sqlx::query(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("Failed to get post by ID")?;

    row.map(|row| row_to_post_sqlite(&row)).transpose()
}

async fn get_entry_sqlite(pool: &SqlitePool, id: i64) -> Result<Option<FeedEntry>> {
    let sql = format!("{ENTRY_SELECT} WHERE p.id = ?");
    let row = sqlx::query(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("Failed to get post entry")?;

    row.map(|row| row_to_entry_sqlite(&row)).transpose()
}

async fn update_post_sqlite(pool: &SqlitePool, id: i64, input: &PostInput) -> Result<Post> {
    let existing = get_post_by_id_sqlite(pool, id)
        .await?
        .ok_or_else(|| anyhow::anyhow!("Post not found"))?;

    let pub_date = input.pub_date.unwrap_or(existing.pub_date);

    sqlx::query(
        "UPDATE posts SET title = ?, text = ?, pub_date = ?, location_id = ?, category_id = ?, image = ?, is_published = ? \
         WHERE id = ?",
    )
    .bind(&input.title)
    .bind(&input.text)
    .bind(pub_date)
    .bind(input.location_id)
    .bind(input.category_id)
    .bind(&input.image)
    .bind(input.is_published)
    .bind(id)
    .execute(pool)
    .await
    .context("Failed to update post")?;

    get_post_by_id_sqlite(pool, id)
        .await?
        .ok_or_else(|| anyhow::anyhow!("Post not found after update"))
}

async fn delete_post_sqlite(pool: &SqlitePool, id: i64) -> Result<()> {
    // Comments go with the post via ON DELETE CASCADE
    sqlx::query("DELETE FROM posts WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await
        .context("Failed to delete post")?;
    Ok(())
}

async fn list_visible_sqlite(
    pool: &SqlitePool,
    now: DateTime<Utc>,
    offset: i64,
    limit: i64,
) -> Result<Vec<FeedEntry>> {
    let sql = format!("{ENTRY_SELECT} WHERE {VISIBLE} {FEED_ORDER} LIMIT ? OFFSET ?");
    let rows = sqlx::query(&sql)
        .bind(now)
        .bind(limit)
        .bind(offset)
        .fetch_all(pool)
        .await
        .context("Failed to list visible posts")?;

    rows.iter().map(row_to_entry_sqlite).collect()
}

async fn count_visible_sqlite(pool: &SqlitePool, now: DateTime<Utc>) -> Result<i64> {
    let sql = format!("{ENTRY_COUNT} WHERE {VISIBLE}");
    let row = sqlx::query(&sql)
        .bind(now)
        .fetch_one(pool)
        .await
        .context("Failed to count visible posts")?;

    Ok(row.get("count"))
}

async fn list_visible_by_category_sqlite(
    pool: &SqlitePool,
    category_id: i64,
    now: DateTime<Utc>,
    offset: i64,
    limit: i64,
) -> Result<Vec<FeedEntry>> {
    let sql =
        format!("{ENTRY_SELECT} WHERE {VISIBLE} AND p.category_id = ? {FEED_ORDER} LIMIT ? OFFSET ?");
    let rows = sqlx::query(&sql)
        .bind(now)
        .bind(category_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(pool)
        .await
        .context("Failed to list posts by category")?;

    rows.iter().map(row_to_entry_sqlite).collect()
}

async fn count_visible_by_category_sqlite(
    pool: &SqlitePool,
    category_id: i64,
    now: DateTime<Utc>,
) -> Result<i64> {
    let sql = format!("{ENTRY_COUNT} WHERE {VISIBLE} AND p.category_id = ?");
    let row = sqlx::query(&sql)
        .bind(now)
        .bind(category_id)
        .fetch_one(pool)
        .await
        .context("Failed to count posts by category")?;

    Ok(row.get("count"))
}

async fn list_by_author_sqlite(
    pool: &SqlitePool,
    author_id: i64,
    offset: i64,
    limit: i64,
) -> Result<Vec<FeedEntry>> {
    let sql = format!("{ENTRY_SELECT} WHERE p.author_id = ? {FEED_ORDER} LIMIT ? OFFSET ?");
    let rows = sqlx::query(&sql)
        .bind(author_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(pool)
        .await
        .context("Failed to list posts by author")?;

    rows.iter().map(row_to_entry_sqlite).collect()
}

async fn count_by_author_sqlite(pool: &SqlitePool, author_id: i64) -> Result<i64> {
    let row = sqlx::query("SELECT COUNT(*) as count FROM posts p WHERE p.author_id = ?")
        .bind(author_id)
        .fetch_one(pool)
        .await
        .context("Failed to count posts by author")?;

    Ok(row.get("count"))
}

async fn list_visible_by_author_sqlite(
    pool: &SqlitePool,
    author_id: i64,
    now: DateTime<Utc>,
    offset: i64,
    limit: i64,
) -> Result<Vec<FeedEntry>> {
    let sql =
        format!("{ENTRY_SELECT} WHERE {VISIBLE} AND p.author_id = ? {FEED_ORDER} LIMIT ? OFFSET ?");
    let rows = sqlx::query(&sql)
        .bind(now)
        .bind(author_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(pool)
        .await
        .context("Failed to list visible posts by author")?;

    rows.iter().map(row_to_entry_sqlite).collect()
}

async fn count_visible_by_author_sqlite(
    pool: &SqlitePool,
    author_id: i64,
    now: DateTime<Utc>,
) -> Result<i64> {
    let sql = format!("{ENTRY_COUNT} WHERE {VISIBLE} AND p.author_id = ?");
    let row = sqlx::query(&sql)
        .bind(now)
        .bind(author_id)
        .fetch_one(pool)
        .await
        .context("Failed to count visible posts by author")?;

    Ok(row.get("count"))
}

fn row_to_post_sqlite(row: &sqlx::sqlite::SqliteRow) -> Result<Post> {
    Ok(Post {
        id: row.get("id"),
        title: row.get("title"),
        text: row.get("text"),
        pub_date: row.get("pub_date"),
        author_id: row.get("author_id"),
        location_id: row.get("location_id"),
        category_id: row.get("category_id"),
        image: row.get("image"),
        is_published: row.get("is_published"),
        created_at: row.get("created_at"),
    })
}

fn row_to_entry_sqlite(row: &sqlx::sqlite::SqliteRow) -> Result<FeedEntry> {
    Ok(FeedEntry {
        post: row_to_post_sqlite(row)?,
        author_username: row.get("author_username"),
        category_title: row.get("category_title"),
        category_slug: row.get("category_slug"),
        location_name: row.get("location_name"),
        comment_count: row.get("comment_count"),
    })
}

// ============================================================================
// MySQL implementations
// ============================================================================

async fn create_post_mysql(pool: &MySqlPool, input: &PostInput, author_id: i64) -> Result<Post> {
    let now = Utc::now();
    let pub_date = input.pub_date.unwrap_or(now);

    let result = sqlx::query(
        "INSERT INTO posts (title, text, pub_date, author_id, location_id, category_id, image, is_published, created_at) \
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(&input.title)
    .bind(&input.text)
    .bind(pub_date)
    .bind(author_id)
    .bind(input.location_id)
    .bind(input.category_id)
    .bind(&input.image)
    .bind(input.is_published)
    .bind(now)
    .execute(pool)
    .await
    .context("Failed to create post")?;

    Ok(Post {
        id: result.last_insert_id() as i64,
        title: input.title.clone(),
        text: input.text.clone(),
        pub_date,
        author_id,
        location_id: input.location_id,
        category_id: input.category_id,
        image: input.image.clone(),
        is_published: input.is_published,
        created_at: now,
    })
}

async fn get_post_by_id_mysql(pool: &MySqlPool, id: i64) -> Result<Option<Post>> {
    let sql = format!("SELECT {POST_COLUMNS} FROM posts WHERE id = ?");
    let row = sqlx::query(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("Failed to get post by ID")?;

    row.map(|row| row_to_post_mysql(&row)).transpose()
}

async fn get_entry_mysql(pool: &MySqlPool, id: i64) -> Result<Option<FeedEntry>> {
    let sql = format!("{ENTRY_SELECT} WHERE p.id = ?");
    let row = sqlx::query(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("Failed to get post entry")?;

    row.map(|row| row_to_entry_mysql(&row)).transpose()
}

async fn update_post_mysql(pool: &MySqlPool, id: i64, input: &PostInput) -> Result<Post> {
    let existing = get_post_by_id_mysql(pool, id)
        .await?
        .ok_or_else(|| anyhow::anyhow!("Post not found"))?;

    let pub_date = input.pub_date.unwrap_or(existing.pub_date);

    sqlx::query(
        "UPDATE posts SET title = ?, text = ?, pub_date = ?, location_id = ?, category_id = ?, image = ?, is_published = ? \
         WHERE id = ?",
    )
    .bind(&input.title)
    .bind(&input.text)
    .bind(pub_date)
    .bind(input.location_id)
    .bind(input.category_id)
    .bind(&input.image)
    .bind(input.is_published)
    .bind(id)
    .execute(pool)
    .await
    .context("Failed to update post")?;

    get_post_by_id_mysql(pool, id)
        .await?
        .ok_or_else(|| anyhow::anyhow!("Post not found after update"))
}

async fn delete_post_mysql(pool: &MySqlPool, id: i64) -> Result<()> {
    // Comments go with the post via ON DELETE CASCADE
    sqlx::query("DELETE FROM posts WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await
        .context("Failed to delete post")?;
    Ok(())
}

async fn list_visible_mysql(
    pool: &MySqlPool,
    now: DateTime<Utc>,
    offset: i64,
    limit: i64,
) -> Result<Vec<FeedEntry>> {
    let sql = format!("{ENTRY_SELECT} WHERE {VISIBLE} {FEED_ORDER} LIMIT ? OFFSET ?");
    let rows = sqlx::query(&sql)
        .bind(now)
        .bind(limit)
        .bind(offset)
        .fetch_all(pool)
        .await
        .context("Failed to list visible posts")?;

    rows.iter().map(row_to_entry_mysql).collect()
}

async fn count_visible_mysql(pool: &MySqlPool, now: DateTime<Utc>) -> Result<i64> {
    let sql = format!("{ENTRY_COUNT} WHERE {VISIBLE}");
    let row = sqlx::query(&sql)
        .bind(now)
        .fetch_one(pool)
        .await
        .context("Failed to count visible posts")?;

    Ok(row.get("count"))
}

async fn list_visible_by_category_mysql(
    pool: &MySqlPool,
    category_id: i64,
    now: DateTime<Utc>,
    offset: i64,
    limit: i64,
) -> Result<Vec<FeedEntry>> {
    let sql =
        format!("{ENTRY_SELECT} WHERE {VISIBLE} AND p.category_id = ? {FEED_ORDER} LIMIT ? OFFSET ?");
    let rows = sqlx::query(&sql)
        .bind(now)
        .bind(category_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(pool)
        .await
        .context("Failed to list posts by category")?;

    rows.iter().map(row_to_entry_mysql).collect()
}

async fn count_visible_by_category_mysql(
    pool: &MySqlPool,
    category_id: i64,
    now: DateTime<Utc>,
) -> Result<i64> {
    let sql = format!("{ENTRY_COUNT} WHERE {VISIBLE} AND p.category_id = ?");
    let row = sqlx::query(&sql)
        .bind(now)
        .bind(category_id)
        .fetch_one(pool)
        .await
        .context("Failed to count posts by category")?;

    Ok(row.get("count"))
}

async fn list_by_author_mysql(
    pool: &MySqlPool,
    author_id: i64,
    offset: i64,
    limit: i64,
) -> Result<Vec<FeedEntry>> {
    let sql = format!("{ENTRY_SELECT} WHERE p.author_id = ? {FEED_ORDER} LIMIT ? OFFSET ?");
    let rows = sqlx::query(&sql)
        .bind(author_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(pool)
        .await
        .context("Failed to list posts by author")?;

    rows.iter().map(row_to_entry_mysql).collect()
}

async fn count_by_author_mysql(pool: &MySqlPool, author_id: i64) -> Result<i64> {
    let row = sqlx::query("SELECT COUNT(*) as count FROM posts p WHERE p.author_id = ?")
        .bind(author_id)
        .fetch_one(pool)
        .await
        .context("Failed to count posts by author")?;

    Ok(row.get("count"))
}

async fn list_visible_by_author_mysql(
    pool: &MySqlPool,
    author_id: i64,
    now: DateTime<Utc>,
    offset: i64,
    limit: i64,
) -> Result<Vec<FeedEntry>> {
    let sql =
        format!("{ENTRY_SELECT} WHERE {VISIBLE} AND p.author_id = ? {FEED_ORDER} LIMIT ? OFFSET ?");
    let rows = sqlx::query(&sql)
        .bind(now)
        .bind(author_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(pool)
        .await
        .context("Failed to list visible posts by author")?;

    rows.iter().map(row_to_entry_mysql).collect()
}

async fn count_visible_by_author_mysql(
    pool: &MySqlPool,
    author_id: i64,
    now: DateTime<Utc>,
) -> Result<i64> {
    let sql = format!("{ENTRY_COUNT} WHERE {VISIBLE} AND p.author_id = ?");
    let row = sqlx::query(&sql)
        .bind(now)
        .bind(author_id)
        .fetch_one(pool)
        .await
        .context("Failed to count visible posts by author")?;

    Ok(row.get("count"))
}

fn row_to_post_mysql(row: &sqlx::mysql::MySqlRow) -> Result<Post> {
    Ok(Post {
        id: row.get("id"),
        title: row.get("title"),
        text: row.get("text"),
        pub_date: row.get("pub_date"),
        author_id: row.get("author_id"),
        location_id: row.get("location_id"),
        category_id: row.get("category_id"),
        image: row.get("image"),
        is_published: row.get("is_published"),
        created_at: row.get("created_at"),
    })
}

fn row_to_entry_mysql(row: &sqlx::mysql::MySqlRow) -> Result<FeedEntry> {
    Ok(FeedEntry {
        post: row_to_post_mysql(row)?,
        author_username: row.get("author_username"),
        category_title: row.get("category_title"),
        category_slug: row.get("category_slug"),
        location_name: row.get("location_name"),
        comment_count: row.get("comment_count"),
    })
}

#[cfg(test)]
mod tests {
    use super::super::{
        CategoryRepository, CommentRepository, LocationRepository, SqlxCategoryRepository,
        SqlxCommentRepository, SqlxLocationRepository, SqlxUserRepository, UserRepository,
    };
    use super::*;
    use crate::db::{create_test_pool, migrations, DynDatabasePool};
    use crate::models::{NewCategory, NewComment, NewLocation, User};
    use chrono::Duration;

    struct Fixture {
        pool: DynDatabasePool,
        repo: SqlxPostRepository,
        author_id: i64,
    }

    async fn setup() -> Fixture {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");

        let user_repo = SqlxUserRepository::new(pool.clone());
        let author = user_repo
            .create(&User::new("author", "author@example.com", "hash"))
            .await
            .expect("Failed to create user");

        Fixture {
            pool: pool.clone(),
            repo: SqlxPostRepository::new(pool),
            author_id: author.id,
        }
    }

    fn past_post(title: &str, days_ago: i64) -> PostInput {
        PostInput::new(title, format!("Body of {}", title))
            .with_pub_date(Utc::now() - Duration::days(days_ago))
    }

    #[tokio::test]
    async fn test_create_and_get() {
        let fx = setup().await;

        let created = fx
            .repo
            .create(&past_post("Hello", 1), fx.author_id)
            .await
            .expect("Failed to create");

        assert!(created.id > 0);
        assert_eq!(created.author_id, fx.author_id);

        let found = fx
            .repo
            .get_by_id(created.id)
            .await
            .expect("Query failed")
            .expect("Post not found");
        assert_eq!(found.title, "Hello");
    }

    #[tokio::test]
    async fn test_get_entry_joins_everything() {
        let fx = setup().await;

        let cat_repo = SqlxCategoryRepository::new(fx.pool.clone());
        let category = cat_repo
            .create(&NewCategory::new("Travel", "desc", "travel"))
            .await
            .expect("Failed to create category");

        let loc_repo = SqlxLocationRepository::new(fx.pool.clone());
        let location = loc_repo
            .create(&NewLocation::new("Oslo"))
            .await
            .expect("Failed to create location");

        let input = past_post("Joined", 1)
            .with_category(category.id)
            .with_location(location.id);
        let created = fx
            .repo
            .create(&input, fx.author_id)
            .await
            .expect("Failed to create");

        let comment_repo = SqlxCommentRepository::new(fx.pool.clone());
        comment_repo
            .create(&NewComment {
                text: "hi".to_string(),
                post_id: created.id,
                author_id: fx.author_id,
            })
            .await
            .expect("Failed to create comment");

        let entry = fx
            .repo
            .get_entry(created.id)
            .await
            .expect("Query failed")
            .expect("Entry not found");

        assert_eq!(entry.author_username, "author");
        assert_eq!(entry.category_title.as_deref(), Some("Travel"));
        assert_eq!(entry.category_slug.as_deref(), Some("travel"));
        assert_eq!(entry.location_name.as_deref(), Some("Oslo"));
        assert_eq!(entry.comment_count, 1);
    }

    #[tokio::test]
    async fn test_visible_excludes_drafts_and_scheduled() {
        let fx = setup().await;
        let now = Utc::now();

        fx.repo
            .create(&past_post("Visible", 1), fx.author_id)
            .await
            .expect("create");
        fx.repo
            .create(&past_post("Draft", 1).unpublished(), fx.author_id)
            .await
            .expect("create");
        fx.repo
            .create(
                &PostInput::new("Scheduled", "later")
                    .with_pub_date(now + Duration::days(1)),
                fx.author_id,
            )
            .await
            .expect("create");

        let visible = fx
            .repo
            .list_visible(now, 0, 10)
            .await
            .expect("Query failed");
        assert_eq!(visible.len(), 1);
        assert_eq!(visible[0].post.title, "Visible");
        assert_eq!(fx.repo.count_visible(now).await.expect("count"), 1);
    }

    #[tokio::test]
    async fn test_visible_respects_category_publish_flag() {
        let fx = setup().await;
        let now = Utc::now();

        let cat_repo = SqlxCategoryRepository::new(fx.pool.clone());
        let hidden_cat = cat_repo
            .create(&NewCategory::new("Hidden", "d", "hidden").unpublished())
            .await
            .expect("create category");
        let open_cat = cat_repo
            .create(&NewCategory::new("Open", "d", "open"))
            .await
            .expect("create category");

        fx.repo
            .create(&past_post("In hidden", 1).with_category(hidden_cat.id), fx.author_id)
            .await
            .expect("create");
        fx.repo
            .create(&past_post("In open", 2).with_category(open_cat.id), fx.author_id)
            .await
            .expect("create");
        // No category at all still shows
        fx.repo
            .create(&past_post("No category", 3), fx.author_id)
            .await
            .expect("create");

        let visible = fx
            .repo
            .list_visible(now, 0, 10)
            .await
            .expect("Query failed");
        let titles: Vec<_> = visible.iter().map(|e| e.post.title.as_str()).collect();
        assert_eq!(titles, vec!["In open", "No category"]);
    }

    #[tokio::test]
    async fn test_feed_is_newest_first_and_paginated() {
        let fx = setup().await;
        let now = Utc::now();

        for i in 1..=15 {
            fx.repo
                .create(&past_post(&format!("Post {}", i), i), fx.author_id)
                .await
                .expect("create");
        }

        let page1 = fx.repo.list_visible(now, 0, 10).await.expect("Query failed");
        assert_eq!(page1.len(), 10);
        // Newest pub_date first: "Post 1" was published most recently
        assert_eq!(page1[0].post.title, "Post 1");
        for window in page1.windows(2) {
            assert!(window[0].post.pub_date >= window[1].post.pub_date);
        }

        let page2 = fx.repo.list_visible(now, 10, 10).await.expect("Query failed");
        assert_eq!(page2.len(), 5);
        assert_eq!(fx.repo.count_visible(now).await.expect("count"), 15);
    }

    #[tokio::test]
    async fn test_category_listing_filters_on_category() {
        let fx = setup().await;
        let now = Utc::now();

        let cat_repo = SqlxCategoryRepository::new(fx.pool.clone());
        let cat_a = cat_repo
            .create(&NewCategory::new("A", "d", "a"))
            .await
            .expect("create category");
        let cat_b = cat_repo
            .create(&NewCategory::new("B", "d", "b"))
            .await
            .expect("create category");

        fx.repo
            .create(&past_post("In A", 1).with_category(cat_a.id), fx.author_id)
            .await
            .expect("create");
        fx.repo
            .create(&past_post("In B", 1).with_category(cat_b.id), fx.author_id)
            .await
            .expect("create");
        fx.repo
            .create(
                &past_post("Draft in A", 1).with_category(cat_a.id).unpublished(),
                fx.author_id,
            )
            .await
            .expect("create");

        let in_a = fx
            .repo
            .list_visible_by_category(cat_a.id, now, 0, 10)
            .await
            .expect("Query failed");
        assert_eq!(in_a.len(), 1);
        assert_eq!(in_a[0].post.title, "In A");
        assert_eq!(
            fx.repo
                .count_visible_by_category(cat_a.id, now)
                .await
                .expect("count"),
            1
        );
    }

    #[tokio::test]
    async fn test_author_listing_is_superset_of_public_listing() {
        let fx = setup().await;
        let now = Utc::now();

        fx.repo
            .create(&past_post("Public", 1), fx.author_id)
            .await
            .expect("create");
        fx.repo
            .create(&past_post("Draft", 2).unpublished(), fx.author_id)
            .await
            .expect("create");
        fx.repo
            .create(
                &PostInput::new("Scheduled", "x").with_pub_date(now + Duration::days(2)),
                fx.author_id,
            )
            .await
            .expect("create");

        let all = fx
            .repo
            .list_by_author(fx.author_id, 0, 10)
            .await
            .expect("Query failed");
        let public = fx
            .repo
            .list_visible_by_author(fx.author_id, now, 0, 10)
            .await
            .expect("Query failed");

        assert_eq!(all.len(), 3);
        assert_eq!(public.len(), 1);
        assert_eq!(public[0].post.title, "Public");

        let all_ids: Vec<i64> = all.iter().map(|e| e.post.id).collect();
        for entry in &public {
            assert!(all_ids.contains(&entry.post.id));
        }

        assert_eq!(fx.repo.count_by_author(fx.author_id).await.expect("count"), 3);
        assert_eq!(
            fx.repo
                .count_visible_by_author(fx.author_id, now)
                .await
                .expect("count"),
            1
        );
    }

    #[tokio::test]
    async fn test_update_replaces_editable_fields_only() {
        let fx = setup().await;

        let created = fx
            .repo
            .create(&past_post("Before", 1), fx.author_id)
            .await
            .expect("create");

        let new_date = Utc::now() - Duration::days(10);
        let update = PostInput::new("After", "new body")
            .with_pub_date(new_date)
            .unpublished();
        let updated = fx
            .repo
            .update(created.id, &update)
            .await
            .expect("Update failed");

        assert_eq!(updated.title, "After");
        assert_eq!(updated.text, "new body");
        assert!(!updated.is_published);
        // The author never changes on update
        assert_eq!(updated.author_id, fx.author_id);
    }

    #[tokio::test]
    async fn test_update_missing_post_fails() {
        let fx = setup().await;

        let result = fx.repo.update(9999, &past_post("X", 1)).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_delete() {
        let fx = setup().await;

        let created = fx
            .repo
            .create(&past_post("Doomed", 1), fx.author_id)
            .await
            .expect("create");
        fx.repo.delete(created.id).await.expect("Delete failed");

        assert!(fx
            .repo
            .get_by_id(created.id)
            .await
            .expect("Query failed")
            .is_none());
    }

    #[tokio::test]
    async fn test_category_delete_nulls_post_category() {
        let fx = setup().await;
        let now = Utc::now();

        let cat_repo = SqlxCategoryRepository::new(fx.pool.clone());
        let category = cat_repo
            .create(&NewCategory::new("Doomed", "d", "doomed"))
            .await
            .expect("create category");

        let created = fx
            .repo
            .create(&past_post("Orphan", 1).with_category(category.id), fx.author_id)
            .await
            .expect("create");

        sqlx::query("DELETE FROM categories WHERE id = ?")
            .bind(category.id)
            .execute(fx.pool.as_sqlite().unwrap())
            .await
            .expect("Delete category failed");

        let post = fx
            .repo
            .get_by_id(created.id)
            .await
            .expect("Query failed")
            .expect("Post vanished");
        assert_eq!(post.category_id, None);

        // An orphaned post keeps publishing
        let visible = fx.repo.list_visible(now, 0, 10).await.expect("Query failed");
        assert_eq!(visible.len(), 1);
    }
}
