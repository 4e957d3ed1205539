use anyhow::{Error, Result};
use rusqlite::Connection as SyncConnection;
use tokio_rusqlite::Connection;

/// Open the database at `path`, creating the file if needed, and
/// make sure the schema exists.
pub async fn async_db(path: &str) -> Result<Connection, Error> {
    let db = Connection::open(path).await?;
    migrate(&db).await?;
    Ok(db)
}

/// In-memory database with the schema applied. Nothing is written to
/// disk so every call gets a fresh, empty store.
pub async fn memory_db() -> Result<Connection, Error> {
    let db = Connection::open_in_memory().await?;
    migrate(&db).await?;
    Ok(db)
}

async fn migrate(db: &Connection) -> Result<(), Error> {
    db.call(|conn| {
        initialize_db(conn)?;
        Ok(())
    })
    .await?;
    Ok(())
}

pub fn initialize_db(conn: &SyncConnection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS kv_store (
            key TEXT PRIMARY KEY NOT NULL,
            value TEXT NOT NULL
        );",
    )
}
