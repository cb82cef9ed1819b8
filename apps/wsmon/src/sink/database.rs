use async_trait::async_trait;
use chrono::{DateTime, Utc};
use deadpool::managed::{Object, PoolConfig};
use libsql::{Builder, Value, params};
use tracing::info;

use super::ResultSink;
use super::schema::{create_results_table, ensure_identifier, insert_result_sql};
use crate::config::{DatabaseLocation, DatabaseTarget};
use crate::error::SinkError;
use crate::monitoring::ResultRecord;
use crate::pool::{DEFAULT_BUSY_TIMEOUT_MS, LibsqlManager, LibsqlPool};

/// Writes each terminal outcome as one row of a libsql table.
pub struct DatabaseSink {
    pool: LibsqlPool,
    table_name: String,
    insert_sql: String,
}

impl DatabaseSink {
    /// Connect to the target and make sure the results table exists.
    pub async fn open(target: &DatabaseTarget) -> Result<Self, SinkError> {
        ensure_identifier(&target.table_name)?;

        let manager = match target.location().map_err(SinkError::InvalidTarget)? {
            DatabaseLocation::Local(path) => {
                info!(path = %path.display(), table = %target.table_name, "opening local database");
                let db = Builder::new_local(path).build().await?;
                LibsqlManager::new(db).with_busy_timeout(DEFAULT_BUSY_TIMEOUT_MS)
            }
            DatabaseLocation::Remote { url, auth_token } => {
                info!(url, table = %target.table_name, "opening remote database");
                let db = Builder::new_remote(url.to_string(), auth_token.to_string()).build().await?;
                LibsqlManager::new(db)
            }
        };

        let pool = LibsqlPool::builder(manager)
            .config(PoolConfig::default())
            .build()
            .map_err(|e| SinkError::Pool(e.to_string()))?;

        let sink = Self {
            pool,
            table_name: target.table_name.clone(),
            insert_sql: insert_result_sql(&target.table_name),
        };

        let conn = sink.get_conn().await?;
        create_results_table(&conn, &sink.table_name).await?;

        Ok(sink)
    }

    async fn get_conn(&self) -> Result<Object<LibsqlManager>, SinkError> {
        self.pool.get().await.map_err(|e| SinkError::Pool(e.to_string()))
    }

    /// Read back every stored row, oldest first.
    pub async fn fetch_records(&self) -> Result<Vec<ResultRecord>, SinkError> {
        let conn = self.get_conn().await?;
        let mut rows = conn
            .query(
                &format!(
                    "SELECT url, timestamp, succeeded, status_code, latency_ms, pattern_matched, \
                     error_detail, retries_used FROM {} ORDER BY id",
                    self.table_name
                ),
                (),
            )
            .await?;

        let mut records = Vec::new();
        while let Some(row) = rows.next().await? {
            let timestamp: String = row.get(1)?;
            let timestamp = DateTime::parse_from_rfc3339(&timestamp)
                .map_err(|e| self.malformed(format!("bad timestamp '{timestamp}': {e}")))?
                .with_timezone(&Utc);

            let status_code = row
                .get::<Option<i64>>(3)?
                .map(u16::try_from)
                .transpose()
                .map_err(|e| self.malformed(format!("bad status code: {e}")))?;
            let latency_ms = u64::try_from(row.get::<i64>(4)?)
                .map_err(|e| self.malformed(format!("bad latency: {e}")))?;
            let retries_used = u32::try_from(row.get::<i64>(7)?)
                .map_err(|e| self.malformed(format!("bad retry count: {e}")))?;

            records.push(ResultRecord {
                target_name: self.table_name.clone(),
                url: row.get(0)?,
                timestamp,
                succeeded: row.get::<i64>(2)? != 0,
                status_code,
                latency_ms,
                pattern_matched: row.get::<Option<i64>>(5)?.map(|v| v != 0),
                error_detail: row.get(6)?,
                retries_used,
            });
        }

        Ok(records)
    }

    fn malformed(&self, reason: String) -> SinkError {
        SinkError::MalformedRow { table: self.table_name.clone(), reason }
    }
}

fn optional<T: Into<Value>>(value: Option<T>) -> Value {
    value.map_or(Value::Null, Into::into)
}

#[async_trait]
impl ResultSink for DatabaseSink {
    fn target_name(&self) -> &str {
        &self.table_name
    }

    async fn record(&self, record: &ResultRecord) -> Result<(), SinkError> {
        let conn = self.get_conn().await?;
        conn.execute(
            &self.insert_sql,
            params![
                record.url.as_str(),
                record.timestamp.to_rfc3339(),
                i64::from(record.succeeded),
                optional(record.status_code.map(i64::from)),
                i64::try_from(record.latency_ms).unwrap_or(i64::MAX),
                optional(record.pattern_matched.map(i64::from)),
                optional(record.error_detail.clone()),
                i64::from(record.retries_used),
            ],
        )
        .await?;

        Ok(())
    }

    async fn close(&self) -> Result<(), SinkError> {
        self.pool.close();
        Ok(())
    }
}
