//! Store contracts consumed by the escalation engine.
//!
//! The engine talks to the knowledge base and the help-request ledger
//! through these two traits. Adapters are constructed by the caller and
//! passed in explicitly; there is no ambient store handle anywhere.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use frontdesk_shared::{HelpRequest, KnowledgeEntry, NewHelpRequest, RequestId, RequestStatus, Result};
use frontdesk_storage::Storage;

/// Read-only lookup against the curated (query, answer) collection.
#[async_trait]
pub trait KnowledgeStore: Send + Sync {
    /// At most one entry whose `query` equals `query_text` exactly
    /// (case-sensitive). Index-backed; this is the primary path.
    async fn find_exact(&self, query_text: &str) -> Result<Option<KnowledgeEntry>>;

    /// Every entry, in insertion order. Used only as the fallback scan.
    async fn list_all(&self) -> Result<Vec<KnowledgeEntry>>;
}

/// Create/query/update operations on the help-request ledger.
#[async_trait]
pub trait RequestStore: Send + Sync {
    /// Persist a new request with status forced to pending and `created_at`
    /// assigned by the store at write time. Returns the generated id.
    async fn create(&self, request: &NewHelpRequest) -> Result<RequestId>;

    /// Every request with `status = pending` and `created_at < threshold`,
    /// as a single filtered query.
    async fn find_pending_older_than(&self, threshold: DateTime<Utc>) -> Result<Vec<HelpRequest>>;

    /// Update the status of each named request as one batch. Returns the
    /// number of rows actually transitioned.
    async fn batch_update_status(
        &self,
        ids: &[RequestId],
        new_status: RequestStatus,
    ) -> Result<u64>;
}

#[async_trait]
impl KnowledgeStore for Storage {
    async fn find_exact(&self, query_text: &str) -> Result<Option<KnowledgeEntry>> {
        Storage::find_exact(self, query_text).await
    }

    async fn list_all(&self) -> Result<Vec<KnowledgeEntry>> {
        self.list_knowledge().await
    }
}

#[async_trait]
impl RequestStore for Storage {
    async fn create(&self, request: &NewHelpRequest) -> Result<RequestId> {
        self.create_request(request).await
    }

    async fn find_pending_older_than(&self, threshold: DateTime<Utc>) -> Result<Vec<HelpRequest>> {
        Storage::find_pending_older_than(self, threshold).await
    }

    async fn batch_update_status(
        &self,
        ids: &[RequestId],
        new_status: RequestStatus,
    ) -> Result<u64> {
        Storage::batch_update_status(self, ids, new_status).await
    }
}
