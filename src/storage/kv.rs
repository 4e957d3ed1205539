use anyhow::{Error, Result};
use rusqlite::OptionalExtension;
use tokio_rusqlite::Connection;

use crate::core::db::{async_db, memory_db};

/// String-keyed, string-valued store backed by the `kv_store` table.
#[derive(Clone)]
pub struct KvStore {
    db: Connection,
}

impl KvStore {
    pub fn new(db: Connection) -> Self {
        Self { db }
    }

    pub async fn open(path: &str) -> Result<Self, Error> {
        Ok(Self::new(async_db(path).await?))
    }

    pub async fn open_in_memory() -> Result<Self, Error> {
        Ok(Self::new(memory_db().await?))
    }

    pub async fn get(&self, key: &str) -> Result<Option<String>, Error> {
        let key = key.to_owned();
        let value = self
            .db
            .call(move |conn| {
                let value = conn
                    .query_row("SELECT value FROM kv_store WHERE key = ?1", [key], |row| {
                        row.get::<_, String>(0)
                    })
                    .optional()?;
                Ok(value)
            })
            .await?;
        Ok(value)
    }

    /// Insert or overwrite the value stored under `key`.
    pub async fn set(&self, key: &str, value: &str) -> Result<(), Error> {
        let key = key.to_owned();
        let value = value.to_owned();
        self.db
            .call(move |conn| {
                conn.execute(
                    "INSERT INTO kv_store (key, value) VALUES (?1, ?2)
                     ON CONFLICT(key) DO UPDATE SET value = excluded.value",
                    [key, value],
                )?;
                Ok(())
            })
            .await?;
        Ok(())
    }

    pub async fn remove(&self, key: &str) -> Result<(), Error> {
        let key = key.to_owned();
        self.db
            .call(move |conn| {
                conn.execute("DELETE FROM kv_store WHERE key = ?1", [key])?;
                Ok(())
            })
            .await?;
        Ok(())
    }
}
