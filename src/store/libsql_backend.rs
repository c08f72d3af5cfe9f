//! libSQL backend for `CurationStore`.
//!
//! Supports local file and in-memory databases. Records are keyed by the
//! origin message id; list columns are stored as JSON text.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use libsql::{Connection, Database as LibSqlDatabase, params};
use tracing::{debug, info};

use crate::curator::record::CurationRecord;
use crate::error::DatabaseError;
use crate::store::migrations;
use crate::store::traits::CurationStore;

/// libSQL database backend.
///
/// Stores a single connection that is reused for all operations.
/// `libsql::Connection` is `Send + Sync` and safe for concurrent async use.
pub struct LibSqlBackend {
    #[allow(dead_code)]
    db: Arc<LibSqlDatabase>,
    conn: Connection,
}

impl LibSqlBackend {
    /// Open (or create) a local database file and run migrations.
    pub async fn new_local(path: &Path) -> Result<Self, DatabaseError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                DatabaseError::Pool(format!("Failed to create database directory: {e}"))
            })?;
        }

        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(|e| DatabaseError::Pool(format!("Failed to open libSQL database: {e}")))?;

        let conn = db
            .connect()
            .map_err(|e| DatabaseError::Pool(format!("Failed to create connection: {e}")))?;

        let backend = Self {
            db: Arc::new(db),
            conn,
        };
        backend.run_migrations().await?;
        info!(path = %path.display(), "Database opened");
        Ok(backend)
    }

    /// Create an in-memory database (for tests).
    pub async fn new_memory() -> Result<Self, DatabaseError> {
        let db = libsql::Builder::new_local(":memory:")
            .build()
            .await
            .map_err(|e| {
                DatabaseError::Pool(format!("Failed to create in-memory database: {e}"))
            })?;

        let conn = db
            .connect()
            .map_err(|e| DatabaseError::Pool(format!("Failed to create connection: {e}")))?;

        let backend = Self {
            db: Arc::new(db),
            conn,
        };
        backend.run_migrations().await?;
        Ok(backend)
    }

    fn conn(&self) -> &Connection {
        &self.conn
    }
}

// ── Helper functions ────────────────────────────────────────────────

const RECORD_COLUMNS: &str = "message_id, author_id, suggestion_url, suggestion_title, suggestion_timestamp, suggestion_content, tags, agrees, neutrals, disagrees, is_alpha, positive_voter_ids";

fn to_json_list(values: &[String]) -> Result<String, DatabaseError> {
    serde_json::to_string(values).map_err(|e| DatabaseError::Serialization(e.to_string()))
}

fn from_json_list(column: &str, raw: &str) -> Result<Vec<String>, DatabaseError> {
    serde_json::from_str(raw)
        .map_err(|e| DatabaseError::Serialization(format!("{column}: {e}")))
}

fn count_from_db(column: &str, value: i64) -> Result<u32, DatabaseError> {
    u32::try_from(value)
        .map_err(|_| DatabaseError::Serialization(format!("{column}: count out of range: {value}")))
}

/// Map a libsql Row to a CurationRecord. Column order matches RECORD_COLUMNS.
fn row_to_record(row: &libsql::Row) -> Result<CurationRecord, DatabaseError> {
    let parse_err = |e: libsql::Error| DatabaseError::Query(format!("row parse: {e}"));
    let tags: String = row.get(6).map_err(parse_err)?;
    let voters: String = row.get(11).map_err(parse_err)?;
    let is_alpha: i64 = row.get(10).map_err(parse_err)?;

    Ok(CurationRecord {
        message_id: row.get(0).map_err(parse_err)?,
        author_id: row.get(1).map_err(parse_err)?,
        suggestion_url: row.get(2).map_err(parse_err)?,
        suggestion_title: row.get(3).map_err(parse_err)?,
        suggestion_timestamp_millis: row.get(4).map_err(parse_err)?,
        suggestion_content: row.get(5).map_err(parse_err)?,
        tags: from_json_list("tags", &tags)?,
        agrees: count_from_db("agrees", row.get(7).map_err(parse_err)?)?,
        neutrals: count_from_db("neutrals", row.get(8).map_err(parse_err)?)?,
        disagrees: count_from_db("disagrees", row.get(9).map_err(parse_err)?)?,
        is_alpha_channel: is_alpha != 0,
        positive_voter_ids: from_json_list("positive_voter_ids", &voters)?,
    })
}

// ── Trait implementation ────────────────────────────────────────────

#[async_trait]
impl CurationStore for LibSqlBackend {
    async fn run_migrations(&self) -> Result<(), DatabaseError> {
        migrations::run_migrations(self.conn()).await
    }

    async fn is_connected(&self) -> bool {
        match self.conn().query("SELECT 1", ()).await {
            Ok(mut rows) => rows.next().await.is_ok(),
            Err(e) => {
                debug!(error = %e, "Database connectivity probe failed");
                false
            }
        }
    }

    async fn upsert_curation_record(&self, record: &CurationRecord) -> Result<(), DatabaseError> {
        let conn = self.conn();
        let now = Utc::now().to_rfc3339();
        let tags = to_json_list(&record.tags)?;
        let voters = to_json_list(&record.positive_voter_ids)?;

        conn.execute(
            "INSERT INTO curation_records (message_id, author_id, suggestion_url, suggestion_title, suggestion_timestamp, suggestion_content, tags, agrees, neutrals, disagrees, is_alpha, positive_voter_ids, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)
             ON CONFLICT (message_id) DO UPDATE SET
                author_id = ?2, suggestion_url = ?3, suggestion_title = ?4,
                suggestion_timestamp = ?5, suggestion_content = ?6, tags = ?7,
                agrees = ?8, neutrals = ?9, disagrees = ?10, is_alpha = ?11,
                positive_voter_ids = ?12, updated_at = ?13",
            params![
                record.message_id.clone(),
                record.author_id.clone(),
                record.suggestion_url.clone(),
                record.suggestion_title.clone(),
                record.suggestion_timestamp_millis,
                record.suggestion_content.clone(),
                tags,
                i64::from(record.agrees),
                i64::from(record.neutrals),
                i64::from(record.disagrees),
                i64::from(record.is_alpha_channel),
                voters,
                now
            ],
        )
        .await
        .map_err(|e| DatabaseError::Query(format!("upsert_curation_record: {e}")))?;

        debug!(message_id = %record.message_id, "Upserted curation record");
        Ok(())
    }

    async fn get_curation_record(
        &self,
        message_id: &str,
    ) -> Result<Option<CurationRecord>, DatabaseError> {
        let conn = self.conn();
        let mut rows = conn
            .query(
                &format!("SELECT {RECORD_COLUMNS} FROM curation_records WHERE message_id = ?1"),
                params![message_id],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("get_curation_record: {e}")))?;

        match rows.next().await {
            Ok(Some(row)) => Ok(Some(row_to_record(&row)?)),
            Ok(None) => Ok(None),
            Err(e) => Err(DatabaseError::Query(format!("get_curation_record: {e}"))),
        }
    }

    async fn list_curation_records(&self) -> Result<Vec<CurationRecord>, DatabaseError> {
        let conn = self.conn();
        let mut rows = conn
            .query(
                &format!(
                    "SELECT {RECORD_COLUMNS} FROM curation_records ORDER BY suggestion_timestamp DESC"
                ),
                (),
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("list_curation_records: {e}")))?;

        let mut records = Vec::new();
        while let Some(row) = rows
            .next()
            .await
            .map_err(|e| DatabaseError::Query(format!("list_curation_records: {e}")))?
        {
            records.push(row_to_record(&row)?);
        }
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn test_db() -> LibSqlBackend {
        LibSqlBackend::new_memory().await.unwrap()
    }

    fn make_record(message_id: &str, timestamp: i64) -> CurationRecord {
        CurationRecord {
            message_id: message_id.to_string(),
            author_id: "42".into(),
            suggestion_url: format!("https://discord.com/channels/1/2/{message_id}"),
            suggestion_title: "Add more pets".into(),
            suggestion_timestamp_millis: timestamp,
            suggestion_content: "Pets please".into(),
            tags: vec!["Greenlit".into()],
            agrees: 10,
            neutrals: 2,
            disagrees: 1,
            is_alpha_channel: false,
            positive_voter_ids: vec!["u1".into(), "u2".into()],
        }
    }

    #[tokio::test]
    async fn memory_db_is_connected() {
        let db = test_db().await;
        assert!(db.is_connected().await);
    }

    #[tokio::test]
    async fn upsert_and_get() {
        let db = test_db().await;
        let record = make_record("100", 1_700_000_000_000);

        db.upsert_curation_record(&record).await.unwrap();

        let fetched = db.get_curation_record("100").await.unwrap().unwrap();
        assert_eq!(fetched, record);
    }

    #[tokio::test]
    async fn get_missing_returns_none() {
        let db = test_db().await;
        assert!(db.get_curation_record("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn upsert_overwrites_by_message_id() {
        let db = test_db().await;
        let mut record = make_record("100", 1_700_000_000_000);
        db.upsert_curation_record(&record).await.unwrap();

        record.agrees = 25;
        record.tags = vec!["Greenlit".into(), "Docced".into()];
        record.is_alpha_channel = true;
        db.upsert_curation_record(&record).await.unwrap();

        let all = db.list_curation_records().await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].agrees, 25);
        assert_eq!(all[0].tags, vec!["Greenlit", "Docced"]);
        assert!(all[0].is_alpha_channel);
    }

    #[tokio::test]
    async fn list_orders_newest_first() {
        let db = test_db().await;
        db.upsert_curation_record(&make_record("1", 1_000)).await.unwrap();
        db.upsert_curation_record(&make_record("2", 3_000)).await.unwrap();
        db.upsert_curation_record(&make_record("3", 2_000)).await.unwrap();

        let ids: Vec<String> = db
            .list_curation_records()
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.message_id)
            .collect();
        assert_eq!(ids, vec!["2", "3", "1"]);
    }

    async fn insert_raw(db: &LibSqlBackend, message_id: &str, tags: &str, agrees: i64) {
        db.conn()
            .execute(
                "INSERT INTO curation_records (message_id, author_id, suggestion_url, suggestion_title, suggestion_timestamp, suggestion_content, tags, agrees, updated_at)
                 VALUES (?1, '42', 'url', 'title', 0, 'content', ?2, ?3, 'now')",
                params![message_id, tags, agrees],
            )
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn corrupt_tag_list_is_a_serialization_error() {
        let db = test_db().await;
        insert_raw(&db, "100", "not json", 1).await;

        let err = db.get_curation_record("100").await.unwrap_err();
        assert!(matches!(err, DatabaseError::Serialization(ref m) if m.starts_with("tags")));
    }

    #[tokio::test]
    async fn negative_count_is_a_serialization_error() {
        let db = test_db().await;
        insert_raw(&db, "100", "[]", -3).await;

        let err = db.list_curation_records().await.unwrap_err();
        assert!(matches!(err, DatabaseError::Serialization(ref m) if m.starts_with("agrees")));
    }

    #[tokio::test]
    async fn open_local_creates_directory() {
        let tmp = tempfile::tempdir().unwrap();
        let db_path = tmp.path().join("nested").join("dir").join("curator.db");
        let db = LibSqlBackend::new_local(&db_path).await.unwrap();
        assert!(db_path.exists());
        assert!(db.is_connected().await);
    }
}
