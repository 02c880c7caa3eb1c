use anyhow::{Context, Result, anyhow};
use rusqlite::Connection;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use crate::config::Config;

/// Shared handle to the single SQLite connection.
pub type Db = Arc<Mutex<Connection>>;

pub fn conn(config: &Config) -> Result<Db> {
    if let Some(parent) = Path::new(&config.database_url).parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
    }

    let conn = Connection::open(&config.database_url)?;
    prepare(conn, config.store_timeout_secs)
}

pub fn in_memory() -> Result<Db> {
    let conn = Connection::open_in_memory()?;
    prepare(conn, Config::default().store_timeout_secs)
}

fn prepare(conn: Connection, timeout_secs: u64) -> Result<Db> {
    // Store calls give up after this instead of waiting on a locked database.
    conn.busy_timeout(Duration::from_secs(timeout_secs))?;
    crate::database::create_tables(&conn)?;
    Ok(Arc::new(Mutex::new(conn)))
}

pub fn lock(db: &Db) -> Result<MutexGuard<'_, Connection>> {
    db.lock().map_err(|_| anyhow!("database connection lock poisoned"))
}
