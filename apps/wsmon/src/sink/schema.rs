use libsql::Connection;

use crate::error::SinkError;
use crate::validation::validate_table_name;

/// Create the results table and its lookup index if they do not exist.
///
/// The table name is interpolated, so it is checked here as well as in
/// configuration.
pub async fn create_results_table(conn: &Connection, table: &str) -> Result<(), SinkError> {
    ensure_identifier(table)?;

    conn.execute(
        &format!(
            "CREATE TABLE IF NOT EXISTS {table} (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                url TEXT NOT NULL,
                timestamp TEXT NOT NULL,
                succeeded INTEGER NOT NULL,
                status_code INTEGER,
                latency_ms INTEGER NOT NULL,
                pattern_matched INTEGER,
                error_detail TEXT,
                retries_used INTEGER NOT NULL DEFAULT 0
            )"
        ),
        (),
    )
    .await?;

    conn.execute(
        &format!("CREATE INDEX IF NOT EXISTS idx_{table}_url_timestamp ON {table}(url, timestamp)"),
        (),
    )
    .await?;

    tracing::debug!(table, "results table ready");
    Ok(())
}

pub fn insert_result_sql(table: &str) -> String {
    format!(
        "INSERT INTO {table} (url, timestamp, succeeded, status_code, latency_ms, \
         pattern_matched, error_detail, retries_used) VALUES (?, ?, ?, ?, ?, ?, ?, ?)"
    )
}

pub(crate) fn ensure_identifier(table: &str) -> Result<(), SinkError> {
    validate_table_name(table)
        .to_result()
        .map_err(|_| SinkError::InvalidTableName(table.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_sql_names_every_column() {
        let sql = insert_result_sql("site_checks");
        assert!(sql.starts_with("INSERT INTO site_checks ("));
        assert_eq!(sql.matches('?').count(), 8);
    }

    #[tokio::test]
    async fn rejects_unsafe_table_name() {
        let db = libsql::Builder::new_local(":memory:").build().await.unwrap();
        let conn = db.connect().unwrap();

        let result = create_results_table(&conn, "x; DROP TABLE y").await;
        assert!(matches!(result, Err(SinkError::InvalidTableName(_))));
    }

    #[tokio::test]
    async fn create_is_idempotent() {
        let db = libsql::Builder::new_local(":memory:").build().await.unwrap();
        let conn = db.connect().unwrap();

        create_results_table(&conn, "results").await.unwrap();
        create_results_table(&conn, "results").await.unwrap();

        let mut rows = conn
            .query("SELECT name FROM sqlite_master WHERE type = 'table' AND name = 'results'", ())
            .await
            .unwrap();
        assert!(rows.next().await.unwrap().is_some());
    }
}
