//! Category repository
//!
//! Categories are authored out-of-band (there is no in-app authoring
//! surface), so the write side is limited to `create`; the read side is
//! what the category page and post forms need.

use crate::config::DatabaseDriver;
use crate::db::DynDatabasePool;
use crate::models::{Category, NewCategory};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{MySqlPool, Row, SqlitePool};
use std::sync::Arc;

/// Category repository trait
#[async_trait]
pub trait CategoryRepository: Send + Sync {
    /// Create a new category
    async fn create(&self, input: &NewCategory) -> Result<Category>;

    /// Get category by ID
    async fn get_by_id(&self, id: i64) -> Result<Option<Category>>;

    /// Get category by slug
    async fn get_by_slug(&self, slug: &str) -> Result<Option<Category>>;

    /// List published categories, ordered by title
    async fn list_published(&self) -> Result<Vec<Category>>;
}

/// SQLx-based category repository implementation
pub struct SqlxCategoryRepository {
    pool: DynDatabasePool,
}

impl SqlxCategoryRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn CategoryRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl CategoryRepository for SqlxCategoryRepository {
    async fn create(&self, input: &NewCategory) -> Result<Category> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                create_category_sqlite(self.pool.as_sqlite().unwrap(), input).await
            }
            DatabaseDriver::Mysql => {
                create_category_mysql(self.pool.as_mysql().unwrap(), input).await
            }
        }
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<Category>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                get_category_by_id_sqlite(self.pool.as_sqlite().unwrap(), id).await
            }
            DatabaseDriver::Mysql => {
                get_category_by_id_mysql(self.pool.as_mysql().unwrap(), id).await
            }
        }
    }

    async fn get_by_slug(&self, slug: &str) -> Result<Option<Category>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                get_category_by_slug_sqlite(self.pool.as_sqlite().unwrap(), slug).await
            }
            DatabaseDriver::Mysql => {
                get_category_by_slug_mysql(self.pool.as_mysql().unwrap(), slug).await
            }
        }
    }

    async fn list_published(&self) -> Result<Vec<Category>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                list_published_categories_sqlite(self.pool.as_sqlite().unwrap()).await
            }
            DatabaseDriver::Mysql => {
                list_published_categories_mysql(self.pool.as_mysql().unwrap()).await
            }
        }
    }
}

const CATEGORY_COLUMNS: &str = "id, title, description, slug, is_published, created_at";

// ============================================================================
// SQLite implementations
// ============================================================================

async fn create_category_sqlite(pool: &SqlitePool, input: &NewCategory) -> Result<Category> {
    let now = Utc::now();

    let result = sqlx::query(
        "INSERT INTO categories (title, description, slug, is_published, created_at) VALUES (?, ?, ?, ?, ?)",
    )
    .bind(&input.title)
    .bind(&input.description)
    .bind(&input.slug)
    .bind(input.is_published)
    .bind(now)
    .execute(pool)
    .await
    .context("Failed to create category")?;

    Ok(Category {
        id: result.last_insert_rowid(),
        title: input.title.clone(),
        description: input.description.clone(),
        slug: input.slug.clone(),
        is_published: input.is_published,
        created_at: now,
    })
}

async fn get_category_by_id_sqlite(pool: &SqlitePool, id: i64) -> Result<Option<Category>> {
    let sql = format!("SELECT {CATEGORY_COLUMNS} FROM categories WHERE id = ?");
    let row = sqlx::query(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("Failed to get category by ID")?;

    row.map(|row| row_to_category_sqlite(&row)).transpose()
}

async fn get_category_by_slug_sqlite(pool: &SqlitePool, slug: &str) -> Result<Option<Category>> {
    let sql = format!("SELECT {CATEGORY_COLUMNS} FROM categories WHERE slug = ?");
    let row = sqlx::query(&sql)
        .bind(slug)
        .fetch_optional(pool)
        .await
        .context("Failed to get category by slug")?;

    row.map(|row| row_to_category_sqlite(&row)).transpose()
}

async fn list_published_categories_sqlite(pool: &SqlitePool) -> Result<Vec<Category>> {
    let sql =
        format!("SELECT {CATEGORY_COLUMNS} FROM categories WHERE is_published = 1 ORDER BY title");
    let rows = sqlx::query(&sql)
        .fetch_all(pool)
        .await
        .context("Failed to list published categories")?;

    rows.iter().map(row_to_category_sqlite).collect()
}

fn row_to_category_sqlite(row: &sqlx::sqlite::SqliteRow) -> Result<Category> {
    Ok(Category {
        id: row.get("id"),
        title: row.get("title"),
        description: row.get("description"),
        slug: row.get("slug"),
        is_published: row.get("is_published"),
        created_at: row.get("created_at"),
    })
}

// ============================================================================
// MySQL implementations
// ============================================================================

async fn create_category_mysql(pool: &MySqlPool, input: &NewCategory) -> Result<Category> {
    let now = Utc::now();

    let result = sqlx::query(
        "INSERT INTO categories (title, description, slug, is_published, created_at) VALUES (?, ?, ?, ?, ?)",
    )
    .bind(&input.title)
    .bind(&input.description)
    .bind(&input.slug)
    .bind(input.is_published)
    .bind(now)
    .execute(pool)
    .await
    .context("Failed to create category")?;

    Ok(Category {
        id: result.last_insert_id() as i64,
        title: input.title.clone(),
        description: input.description.clone(),
        slug: input.slug.clone(),
        is_published: input.is_published,
        created_at: now,
    })
}

async fn get_category_by_id_mysql(pool: &MySqlPool, id: i64) -> Result<Option<Category>> {
    let sql = format!("SELECT {CATEGORY_COLUMNS} FROM categories WHERE id = ?");
    let row = sqlx::query(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("Failed to get category by ID")?;

    row.map(|row| row_to_category_mysql(&row)).transpose()
}

async fn get_category_by_slug_mysql(pool: &MySqlPool, slug: &str) -> Result<Option<Category>> {
    let sql = format!("SELECT {CATEGORY_COLUMNS} FROM categories WHERE slug = ?");
    let row = sqlx::query(&sql)
        .bind(slug)
        .fetch_optional(pool)
        .await
        .context("Failed to get category by slug")?;

    row.map(|row| row_to_category_mysql(&row)).transpose()
}

async fn list_published_categories_mysql(pool: &MySqlPool) -> Result<Vec<Category>> {
    let sql =
        format!("SELECT {CATEGORY_COLUMNS} FROM categories WHERE is_published = 1 ORDER BY title");
    let rows = sqlx::query(&sql)
        .fetch_all(pool)
        .await
        .context("Failed to list published categories")?;

    rows.iter().map(row_to_category_mysql).collect()
}

fn row_to_category_mysql(row: &sqlx::mysql::MySqlRow) -> Result<Category> {
    Ok(Category {
        id: row.get("id"),
        title: row.get("title"),
        description: row.get("description"),
        slug: row.get("slug"),
        is_published: row.get("is_published"),
        created_at: row.get("created_at"),
    })
}
