//! Async interface for curation persistence.

use async_trait::async_trait;

use crate::curator::record::CurationRecord;
use crate::error::DatabaseError;

/// Backend-agnostic store for curation records.
#[async_trait]
pub trait CurationStore: Send + Sync {
    /// Run all pending schema migrations.
    async fn run_migrations(&self) -> Result<(), DatabaseError>;

    /// Whether the backing database currently answers queries.
    async fn is_connected(&self) -> bool;

    /// Insert or replace the record keyed by its `message_id`.
    async fn upsert_curation_record(&self, record: &CurationRecord) -> Result<(), DatabaseError>;

    /// Get a record by origin message id.
    async fn get_curation_record(
        &self,
        message_id: &str,
    ) -> Result<Option<CurationRecord>, DatabaseError>;

    /// All records, most recent suggestion first.
    async fn list_curation_records(&self) -> Result<Vec<CurationRecord>, DatabaseError>;
}
