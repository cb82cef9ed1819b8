/// Result sinks - persist the terminal outcome of every check cycle
///
/// Two backends exist: a database table (local libsql file or remote
/// libsql server) and an append-only JSON Lines file. The backend is
/// chosen once from configuration; there is no fallback between them.
pub mod database;
pub mod file;
pub mod schema;

use std::sync::Arc;

use async_trait::async_trait;
use tracing::info;

pub use database::DatabaseSink;
pub use file::{FileSink, read_records};

use crate::config::StorageConfig;
use crate::error::SinkError;
use crate::monitoring::ResultRecord;

/// Destination for terminal check outcomes.
///
/// Shared by every site monitor, so `record` must be safe to call
/// concurrently and must never interleave two records.
#[async_trait]
pub trait ResultSink: Send + Sync {
    /// Table name or file path, copied into every record
    fn target_name(&self) -> &str;

    async fn record(&self, record: &ResultRecord) -> Result<(), SinkError>;

    /// Flush and release the backend. Called once after all monitors stop.
    async fn close(&self) -> Result<(), SinkError> {
        Ok(())
    }
}

/// Open the sink selected by `storage`.
pub async fn open_sink(storage: &StorageConfig) -> Result<Arc<dyn ResultSink>, SinkError> {
    let sink: Arc<dyn ResultSink> = match storage {
        StorageConfig::Database(target) => Arc::new(DatabaseSink::open(target).await?),
        StorageConfig::File(target) => Arc::new(FileSink::open(&target.path).await?),
    };

    info!(target_name = sink.target_name(), "result sink ready");
    Ok(sink)
}
