use deadpool::managed::{self, Pool, RecycleResult};
use libsql::{Connection, Database, Error as LibsqlError};

/// Milliseconds a local connection waits on a locked database before failing.
pub const DEFAULT_BUSY_TIMEOUT_MS: u32 = 5_000;

pub struct LibsqlManager {
    database: Database,
    busy_timeout_ms: Option<u32>,
}

impl LibsqlManager {
    pub fn new(database: Database) -> Self {
        Self { database, busy_timeout_ms: None }
    }

    /// Set `PRAGMA busy_timeout` on every new connection (local files only).
    pub fn with_busy_timeout(mut self, millis: u32) -> Self {
        self.busy_timeout_ms = Some(millis);
        self
    }
}

impl managed::Manager for LibsqlManager {
    type Type = Connection;
    type Error = LibsqlError;

    async fn create(&self) -> Result<Self::Type, Self::Error> {
        let conn = self.database.connect()?;
        if let Some(millis) = self.busy_timeout_ms {
            // Concurrent monitors share the file; wait for the write lock instead of failing.
            conn.query(&format!("PRAGMA busy_timeout = {millis}"), ()).await?;
        }
        Ok(conn)
    }

    async fn recycle(
        &self,
        conn: &mut Self::Type,
        _: &managed::Metrics,
    ) -> RecycleResult<Self::Error> {
        conn.query("SELECT 1", ())
            .await?
            .next()
            .await?
            .ok_or(LibsqlError::QueryReturnedNoRows)?;
        Ok(())
    }
}

pub type LibsqlPool = Pool<LibsqlManager>;
