//! Location repository

use crate::config::DatabaseDriver;
use crate::db::DynDatabasePool;
use crate::models::{Location, NewLocation};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{MySqlPool, Row, SqlitePool};
use std::sync::Arc;

/// Location repository trait
#[async_trait]
pub trait LocationRepository: Send + Sync {
    /// Create a new location
    async fn create(&self, input: &NewLocation) -> Result<Location>;

    /// Get location by ID
    async fn get_by_id(&self, id: i64) -> Result<Option<Location>>;

    /// Delete a location (posts keep publishing; FK is set-null)
    async fn delete(&self, id: i64) -> Result<()>;

    /// List published locations, ordered by name
    async fn list_published(&self) -> Result<Vec<Location>>;
}

/// SQLx-based location repository implementation
pub struct SqlxLocationRepository {
    pool: DynDatabasePool,
}

impl SqlxLocationRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn LocationRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl LocationRepository for SqlxLocationRepository {
    async fn create(&self, input: &NewLocation) -> Result<Location> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                create_location_sqlite(self.pool.as_sqlite().unwrap(), input).await
            }
            DatabaseDriver::Mysql => {
                create_location_mysql(self.pool.as_mysql().unwrap(), input).await
            }
        }
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<Location>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                get_location_by_id_sqlite(self.pool.as_sqlite().unwrap(), id).await
            }
            DatabaseDriver::Mysql => {
                get_location_by_id_mysql(self.pool.as_mysql().unwrap(), id).await
            }
        }
    }

    async fn delete(&self, id: i64) -> Result<()> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                delete_location_sqlite(self.pool.as_sqlite().unwrap(), id).await
            }
            DatabaseDriver::Mysql => delete_location_mysql(self.pool.as_mysql().unwrap(), id).await,
        }
    }

    async fn list_published(&self) -> Result<Vec<Location>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                list_published_locations_sqlite(self.pool.as_sqlite().unwrap()).await
            }
            DatabaseDriver::Mysql => {
                list_published_locations_mysql(self.pool.as_mysql().unwrap()).await
            }
        }
    }
}

const LOCATION_COLUMNS: &str = "id, name, is_published, created_at";

// ============================================================================
// SQLite implementations
// ============================================================================

async fn create_location_sqlite(pool: &SqlitePool, input: &NewLocation) -> Result<Location> {
    let now = Utc::now();

    let result =
        sqlx::query("INSERT INTO locations (name, is_published, created_at) VALUES (?, ?, ?)")
            .bind(&input.name)
            .bind(input.is_published)
            .bind(now)
            .execute(pool)
            .await
            .context("Failed to create location")?;

    Ok(Location {
        id: result.last_insert_rowid(),
        name: input.name.clone(),
        is_published: input.is_published,
        created_at: now,
    })
}

async fn get_location_by_id_sqlite(pool: &SqlitePool, id: i64) -> Result<Option<Location>> {
    let sql = format!("SELECT {LOCATION_COLUMNS} FROM locations WHERE id = ?");
    let row = sqlx::query(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("Failed to get location by ID")?;

    row.map(|row| row_to_location_sqlite(&row)).transpose()
}

async fn delete_location_sqlite(pool: &SqlitePool, id: i64) -> Result<()> {
    sqlx::query("DELETE FROM locations WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await
        .context("Failed to delete location")?;
    Ok(())
}

async fn list_published_locations_sqlite(pool: &SqlitePool) -> Result<Vec<Location>> {
    let sql =
        format!("SELECT {LOCATION_COLUMNS} FROM locations WHERE is_published = 1 ORDER BY name");
    let rows = sqlx::query(&sql)
        .fetch_all(pool)
        .await
        .context("Failed to list published locations")?;

    rows.iter().map(row_to_location_sqlite).collect()
}

fn row_to_location_sqlite(row: &sqlx::sqlite::SqliteRow) -> Result<Location> {
    Ok(Location {
        id: row.get("id"),
        name: row.get("name"),
        is_published: row.get("is_published"),
        created_at: row.get("created_at"),
    })
}

// ============================================================================
// MySQL implementations
// ============================================================================

async fn create_location_mysql(pool: &MySqlPool, input: &NewLocation) -> Result<Location> {
    let now = Utc::now();

    let result =
        sqlx::query("INSERT INTO locations (name, is_published, created_at) VALUES (?, ?, ?)")
            .bind(&input.name)
            .bind(input.is_published)
            .bind(now)
            .execute(pool)
            .await
            .context("Failed to create location")?;

    Ok(Location {
        id: result.last_insert_id() as i64,
        name: input.name.clone(),
        is_published: input.is_published,
        created_at: now,
    })
}

async fn get_location_by_id_mysql(pool: &MySqlPool, id: i64) -> Result<Option<Location>> {
    let sql = format!("SELECT {LOCATION_COLUMNS} FROM locations WHERE id = ?");
    let row = sqlx::query(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("Failed to get location by ID")?;

    row.map(|row| row_to_location_mysql(&row)).transpose()
}

async fn delete_location_mysql(pool: &MySqlPool, id: i64) -> Result<()> {
    sqlx::query("DELETE FROM locations WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await
        .context("Failed to delete location")?;
    Ok(())
}

async fn list_published_locations_mysql(pool: &MySqlPool) -> Result<Vec<Location>> {
    let sql =
        format!("SELECT {LOCATION_COLUMNS} FROM locations WHERE is_published = 1 ORDER BY name");
    let rows = sqlx::query(&sql)
        .fetch_all(pool)
        .await
        .context("Failed to list published locations")?;

    rows.iter().map(row_to_location_mysql).collect()
}

fn row_to_location_mysql(row: &sqlx::mysql::MySqlRow) -> Result<Location> {
    Ok(Location {
        id: row.get("id"),
        name: row.get("name"),
        is_published: row.get("is_published"),
        created_at: row.get("created_at"),
    })
}
