use std::path::Path;

use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};

use super::models::KeyValueRecord;
use super::StorageError;
use crate::core::preferences::KeyValueStore;

/// Durable stand-in for browser storage: one row per key.
#[derive(Debug, Clone)]
pub struct SqliteKeyValueStore {
    pool: SqlitePool,
}

impl SqliteKeyValueStore {
    pub async fn connect(database_url: &str) -> Result<Self, StorageError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect(database_url)
            .await?;
        sqlx::migrate!("./migrations").run(&pool).await?;
        Ok(Self { pool })
    }

    pub async fn get_record(&self, key: &str) -> Result<Option<KeyValueRecord>, StorageError> {
        let row = sqlx::query_as::<_, KeyValueRecord>(
            r#"
            SELECT key, value, updated_at
            FROM key_value
            WHERE key = ?1
            "#,
        )
        .bind(key)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    pub async fn put(&self, key: &str, value: &str) -> Result<(), StorageError> {
        sqlx::query(
            r#"
            INSERT INTO key_value (key, value)
            VALUES (?1, ?2)
            ON CONFLICT(key) DO UPDATE SET
              value = excluded.value,
              updated_at = CURRENT_TIMESTAMP
            "#,
        )
        .bind(key)
        .bind(value)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn delete(&self, key: &str) -> Result<u64, StorageError> {
        let affected = sqlx::query("DELETE FROM key_value WHERE key = ?1")
            .bind(key)
            .execute(&self.pool)
            .await?
            .rows_affected();
        Ok(affected)
    }
}

impl KeyValueStore for SqliteKeyValueStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.get_record(key).await?.map(|record| record.value))
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.put(key, value).await
    }

    async fn ping(&self) -> Result<(), StorageError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

pub fn to_sqlite_url(path: impl AsRef<Path>) -> String {
    format!("sqlite://{}?mode=rwc", path.as_ref().to_string_lossy())
}
