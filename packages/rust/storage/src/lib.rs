//! libSQL storage layer for Frontdesk.
//!
//! The [`Storage`] struct wraps a libSQL database holding the two collections
//! the agent works against: the curated `knowledge_base` and the
//! `help_requests` ledger.
//!
//! **Write policy:**
//! - Help requests are created only with status `pending`; `created_at` is
//!   assigned here, at write time.
//! - Status updates are guarded by `status = 'pending'` so a request never
//!   leaves a terminal state, regardless of what the caller asks for.

mod migrations;

use std::path::Path;

use chrono::{DateTime, SecondsFormat, Utc};
use frontdesk_shared::{
    FrontdeskError, HelpRequest, KnowledgeEntry, NewHelpRequest, RequestId, RequestStatus, Result,
};
use libsql::{Connection, Database, params};
use uuid::Uuid;

/// Primary storage handle wrapping a libSQL database.
pub struct Storage {
    #[allow(dead_code)]
    db: Database,
    conn: Connection,
    readonly: bool,
}

impl Storage {
    /// Open or create a database at `path` in read-write mode.
    ///
    /// Failure here means the store is unreachable or misconfigured, which is
    /// fatal at startup.
    pub async fn open(path: &Path) -> Result<Self> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| FrontdeskError::io(parent, e))?;
        }

        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(|e| FrontdeskError::StoreConnection(e.to_string()))?;

        let conn = db
            .connect()
            .map_err(|e| FrontdeskError::StoreConnection(e.to_string()))?;

        let storage = Self {
            db,
            conn,
            readonly: false,
        };
        storage.run_migrations().await?;
        Ok(storage)
    }

    /// Open a database at `path` in read-only mode.
    pub async fn open_readonly(path: &Path) -> Result<Self> {
        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(|e| FrontdeskError::StoreConnection(e.to_string()))?;

        let conn = db
            .connect()
            .map_err(|e| FrontdeskError::StoreConnection(e.to_string()))?;

        Ok(Self {
            db,
            conn,
            readonly: true,
        })
    }

    /// Run pending schema migrations.
    async fn run_migrations(&self) -> Result<()> {
        let current_version = self.get_schema_version().await;

        for migration in migrations::all_migrations() {
            if migration.version > current_version {
                tracing::info!(
                    version = migration.version,
                    description = migration.description,
                    "applying migration"
                );
                self.conn.execute_batch(migration.sql).await.map_err(|e| {
                    FrontdeskError::StoreConnection(format!(
                        "migration v{} failed: {e}",
                        migration.version
                    ))
                })?;
            }
        }
        Ok(())
    }

    /// Get the current schema version, or 0 if no migrations have been applied.
    async fn get_schema_version(&self) -> u32 {
        let result = self
            .conn
            .query("SELECT MAX(version) FROM schema_migrations", params![])
            .await;

        match result {
            Ok(mut rows) => {
                if let Ok(Some(row)) = rows.next().await {
                    row.get::<u32>(0).unwrap_or(0)
                } else {
                    0
                }
            }
            Err(_) => 0, // Table doesn't exist yet
        }
    }

    /// Ensure we're in read-write mode before writing.
    fn check_writable(&self) -> Result<()> {
        if self.readonly {
            return Err(FrontdeskError::StoreWrite(
                "database is opened in read-only mode".into(),
            ));
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Knowledge operations
    // -----------------------------------------------------------------------

    /// Insert a curated knowledge entry.
    pub async fn insert_knowledge(&self, query: &str, answer: &str) -> Result<()> {
        self.check_writable()?;
        let id = Uuid::now_v7().to_string();
        let now = format_timestamp(Utc::now());
        self.conn
            .execute(
                "INSERT INTO knowledge_base (id, query, answer, created_at)
                 VALUES (?1, ?2, ?3, ?4)",
                params![id.as_str(), query, answer, now.as_str()],
            )
            .await
            .map_err(|e| FrontdeskError::StoreWrite(e.to_string()))?;
        Ok(())
    }

    /// Find at most one entry whose `query` equals `query_text` exactly
    /// (case-sensitive). Index-backed; this is the primary lookup path.
    /// Duplicates resolve first-match-wins in insertion order.
    pub async fn find_exact(&self, query_text: &str) -> Result<Option<KnowledgeEntry>> {
        let mut rows = self
            .conn
            .query(
                "SELECT query, answer FROM knowledge_base
                 WHERE query = ?1 ORDER BY rowid LIMIT 1",
                params![query_text],
            )
            .await
            .map_err(|e| FrontdeskError::StoreQuery(e.to_string()))?;

        match rows.next().await {
            Ok(Some(row)) => Ok(Some(row_to_knowledge_entry(&row)?)),
            Ok(None) => Ok(None),
            Err(e) => Err(FrontdeskError::StoreQuery(e.to_string())),
        }
    }

    /// List every knowledge entry in insertion order. Used only as the
    /// fallback scan for case-insensitive matching.
    pub async fn list_knowledge(&self) -> Result<Vec<KnowledgeEntry>> {
        let mut rows = self
            .conn
            .query(
                "SELECT query, answer FROM knowledge_base ORDER BY rowid",
                params![],
            )
            .await
            .map_err(|e| FrontdeskError::StoreQuery(e.to_string()))?;

        let mut results = Vec::new();
        while let Ok(Some(row)) = rows.next().await {
            results.push(row_to_knowledge_entry(&row)?);
        }
        Ok(results)
    }

    // -----------------------------------------------------------------------
    // Help request operations
    // -----------------------------------------------------------------------

    /// Persist a new help request and return its generated id.
    ///
    /// Status is forced to `pending` and `created_at` is assigned here, at
    /// write time. The resolution fields start empty.
    pub async fn create_request(&self, request: &NewHelpRequest) -> Result<RequestId> {
        self.check_writable()?;
        let id = RequestId::new();
        let now = format_timestamp(Utc::now());
        self.conn
            .execute(
                "INSERT INTO help_requests
                   (id, customer_id, customer_query, status, created_at,
                    supervisor_response, resolved_at, notified_customer)
                 VALUES (?1, ?2, ?3, ?4, ?5, NULL, NULL, 0)",
                params![
                    id.to_string(),
                    request.customer_id.as_str(),
                    request.customer_query.as_str(),
                    RequestStatus::Pending.as_str(),
                    now.as_str(),
                ],
            )
            .await
            .map_err(|e| FrontdeskError::StoreWrite(e.to_string()))?;
        Ok(id)
    }

    /// Get a help request by id.
    pub async fn get_request(&self, id: RequestId) -> Result<Option<HelpRequest>> {
        let mut rows = self
            .conn
            .query(
                "SELECT id, customer_id, customer_query, status, created_at,
                        supervisor_response, resolved_at, notified_customer
                 FROM help_requests WHERE id = ?1",
                params![id.to_string()],
            )
            .await
            .map_err(|e| FrontdeskError::StoreQuery(e.to_string()))?;

        match rows.next().await {
            Ok(Some(row)) => Ok(Some(row_to_request(&row)?)),
            Ok(None) => Ok(None),
            Err(e) => Err(FrontdeskError::StoreQuery(e.to_string())),
        }
    }

    /// Every request with `status = pending` and `created_at` strictly before
    /// `threshold`, oldest first.
    ///
    /// The conjunctive filter must be index-backed; a database without the
    /// composite index (created externally, or with migrations skipped) gets
    /// the distinct [`FrontdeskError::QueryIndex`] error instead of a slow
    /// scan, so the operator knows what to fix.
    pub async fn find_pending_older_than(
        &self,
        threshold: DateTime<Utc>,
    ) -> Result<Vec<HelpRequest>> {
        self.ensure_sweep_index().await?;

        let mut rows = self
            .conn
            .query(
                "SELECT id, customer_id, customer_query, status, created_at,
                        supervisor_response, resolved_at, notified_customer
                 FROM help_requests
                 WHERE status = 'pending' AND created_at < ?1
                 ORDER BY created_at",
                params![format_timestamp(threshold)],
            )
            .await
            .map_err(|e| FrontdeskError::StoreQuery(e.to_string()))?;

        let mut results = Vec::new();
        while let Ok(Some(row)) = rows.next().await {
            results.push(row_to_request(&row)?);
        }
        Ok(results)
    }

    /// Update the status of each named request in one batch.
    ///
    /// Only rows still `pending` are touched; a request that reached a
    /// terminal state between a caller's read and this write is skipped, not
    /// overwritten. Returns the number of rows actually transitioned.
    pub async fn batch_update_status(
        &self,
        ids: &[RequestId],
        new_status: RequestStatus,
    ) -> Result<u64> {
        self.check_writable()?;
        let mut changed: u64 = 0;
        for id in ids {
            changed += self
                .conn
                .execute(
                    "UPDATE help_requests SET status = ?1
                     WHERE id = ?2 AND status = 'pending'",
                    params![new_status.as_str(), id.to_string()],
                )
                .await
                .map_err(|e| {
                    FrontdeskError::StoreWrite(format!("batch update failed at {id}: {e}"))
                })?;
        }
        Ok(changed)
    }

    /// Resolve a pending request with a supervisor response.
    ///
    /// This is the write the supervisor workflow performs; it lives here so
    /// the pending-only guard is enforced in one place. `supervisor_response`
    /// and `resolved_at` are set together. Returns false if the request was
    /// not pending (already resolved or timed out).
    pub async fn resolve_request(&self, id: RequestId, response: &str) -> Result<bool> {
        self.check_writable()?;
        let now = format_timestamp(Utc::now());
        let changed = self
            .conn
            .execute(
                "UPDATE help_requests
                 SET status = ?1, supervisor_response = ?2, resolved_at = ?3
                 WHERE id = ?4 AND status = 'pending'",
                params![
                    RequestStatus::Resolved.as_str(),
                    response,
                    now.as_str(),
                    id.to_string(),
                ],
            )
            .await
            .map_err(|e| FrontdeskError::StoreWrite(e.to_string()))?;
        Ok(changed > 0)
    }

    /// Verify the composite sweep index exists.
    async fn ensure_sweep_index(&self) -> Result<()> {
        let mut rows = self
            .conn
            .query(
                "SELECT name FROM sqlite_master WHERE type = 'index' AND name = ?1",
                params![migrations::SWEEP_INDEX_NAME],
            )
            .await
            .map_err(|e| FrontdeskError::StoreQuery(e.to_string()))?;

        match rows.next().await {
            Ok(Some(_)) => Ok(()),
            Ok(None) => Err(FrontdeskError::query_index(format!(
                "composite index {} on help_requests(status, created_at) is missing; \
                 reopen the database read-write so migrations can recreate it",
                migrations::SWEEP_INDEX_NAME
            ))),
            Err(e) => Err(FrontdeskError::StoreQuery(e.to_string())),
        }
    }
}

// ---------------------------------------------------------------------------
// Row decoding
// ---------------------------------------------------------------------------

/// Convert a database row to a [`KnowledgeEntry`].
fn row_to_knowledge_entry(row: &libsql::Row) -> Result<KnowledgeEntry> {
    Ok(KnowledgeEntry {
        query: row
            .get::<String>(0)
            .map_err(|e| FrontdeskError::StoreQuery(e.to_string()))?,
        answer: row
            .get::<String>(1)
            .map_err(|e| FrontdeskError::StoreQuery(e.to_string()))?,
    })
}

/// Convert a database row to a [`HelpRequest`].
fn row_to_request(row: &libsql::Row) -> Result<HelpRequest> {
    let id: String = row
        .get(0)
        .map_err(|e| FrontdeskError::StoreQuery(e.to_string()))?;
    let status: String = row
        .get(3)
        .map_err(|e| FrontdeskError::StoreQuery(e.to_string()))?;
    let created_at: String = row
        .get(4)
        .map_err(|e| FrontdeskError::StoreQuery(e.to_string()))?;

    Ok(HelpRequest {
        id: id
            .parse()
            .map_err(|e| FrontdeskError::StoreQuery(format!("invalid request id: {e}")))?,
        customer_id: row
            .get::<String>(1)
            .map_err(|e| FrontdeskError::StoreQuery(e.to_string()))?,
        customer_query: row
            .get::<String>(2)
            .map_err(|e| FrontdeskError::StoreQuery(e.to_string()))?,
        status: status
            .parse()
            .map_err(|e| FrontdeskError::StoreQuery(format!("bad status column: {e}")))?,
        created_at: parse_timestamp(&created_at)?,
        supervisor_response: row.get::<String>(5).ok(),
        resolved_at: match row.get::<String>(6).ok() {
            Some(s) => Some(parse_timestamp(&s)?),
            None => None,
        },
        notified_customer: row.get::<i64>(7).unwrap_or(0) != 0,
    })
}

/// Format a timestamp for storage.
///
/// Fixed-width UTC (microsecond precision, `Z` suffix) so the `created_at`
/// range filter works as a plain string comparison.
fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Parse a stored timestamp.
fn parse_timestamp(s: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| FrontdeskError::StoreQuery(format!("invalid timestamp '{s}': {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    /// Create a temp file storage for testing.
    async fn test_storage() -> Storage {
        let tmp = std::env::temp_dir().join(format!("fd_test_{}.db", Uuid::now_v7()));
        Storage::open(&tmp).await.expect("open test db")
    }

    fn new_request(query: &str) -> NewHelpRequest {
        NewHelpRequest {
            customer_id: "cust_123".into(),
            customer_query: query.into(),
        }
    }

    #[tokio::test]
    async fn open_and_migrate() {
        let storage = test_storage().await;
        let version = storage.get_schema_version().await;
        assert_eq!(version, 1);
    }

    #[tokio::test]
    async fn idempotent_migration() {
        let tmp = std::env::temp_dir().join(format!("fd_test_{}.db", Uuid::now_v7()));
        let _s1 = Storage::open(&tmp).await.expect("first open");
        drop(_s1);
        let s2 = Storage::open(&tmp).await.expect("second open");
        assert_eq!(s2.get_schema_version().await, 1);
    }

    #[tokio::test]
    async fn exact_lookup_is_case_sensitive() {
        let storage = test_storage().await;
        storage
            .insert_knowledge("What are your hours?", "9-5 Mon-Fri")
            .await
            .expect("insert knowledge");

        let hit = storage
            .find_exact("What are your hours?")
            .await
            .expect("lookup");
        assert_eq!(hit.unwrap().answer, "9-5 Mon-Fri");

        let miss = storage
            .find_exact("WHAT ARE YOUR HOURS?")
            .await
            .expect("lookup");
        assert!(miss.is_none());
    }

    #[tokio::test]
    async fn duplicate_queries_resolve_first_match_wins() {
        let storage = test_storage().await;
        storage
            .insert_knowledge("Do you ship?", "Yes, worldwide")
            .await
            .unwrap();
        storage
            .insert_knowledge("Do you ship?", "Only domestically")
            .await
            .unwrap();

        let hit = storage.find_exact("Do you ship?").await.unwrap().unwrap();
        assert_eq!(hit.answer, "Yes, worldwide");

        let all = storage.list_knowledge().await.unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].answer, "Yes, worldwide");
    }

    #[tokio::test]
    async fn create_request_forces_pending_and_assigns_created_at() {
        let storage = test_storage().await;
        let before = Utc::now() - Duration::seconds(1);
        let id = storage
            .create_request(&new_request("Do you deliver on Sundays?"))
            .await
            .expect("create request");
        let after = Utc::now() + Duration::seconds(1);

        let request = storage.get_request(id).await.unwrap().expect("stored");
        assert_eq!(request.status, RequestStatus::Pending);
        assert_eq!(request.customer_query, "Do you deliver on Sundays?");
        assert!(request.created_at > before && request.created_at < after);
        assert!(request.supervisor_response.is_none());
        assert!(request.resolved_at.is_none());
        assert!(!request.notified_customer);
    }

    #[tokio::test]
    async fn pending_older_than_respects_threshold() {
        let storage = test_storage().await;
        storage.create_request(&new_request("q")).await.unwrap();

        let stale = storage
            .find_pending_older_than(Utc::now() - Duration::hours(1))
            .await
            .expect("query past threshold");
        assert!(stale.is_empty());

        let stale = storage
            .find_pending_older_than(Utc::now() + Duration::hours(1))
            .await
            .expect("query future threshold");
        assert_eq!(stale.len(), 1);
    }

    #[tokio::test]
    async fn pending_older_than_excludes_terminal_states() {
        let storage = test_storage().await;
        let resolved = storage.create_request(&new_request("a")).await.unwrap();
        let pending = storage.create_request(&new_request("b")).await.unwrap();
        assert!(
            storage
                .resolve_request(resolved, "answered out of band")
                .await
                .unwrap()
        );

        let stale = storage
            .find_pending_older_than(Utc::now() + Duration::hours(1))
            .await
            .unwrap();
        assert_eq!(stale.len(), 1);
        assert_eq!(stale[0].id, pending);
    }

    #[tokio::test]
    async fn missing_sweep_index_is_a_distinct_error() {
        let storage = test_storage().await;
        storage
            .conn
            .execute("DROP INDEX idx_help_requests_pending_age", params![])
            .await
            .expect("drop index");

        let err = storage
            .find_pending_older_than(Utc::now())
            .await
            .unwrap_err();
        assert!(matches!(err, FrontdeskError::QueryIndex { .. }));
        assert!(err.to_string().contains("idx_help_requests_pending_age"));
    }

    #[tokio::test]
    async fn batch_update_skips_non_pending_rows() {
        let storage = test_storage().await;
        let a = storage.create_request(&new_request("a")).await.unwrap();
        let b = storage.create_request(&new_request("b")).await.unwrap();
        assert!(storage.resolve_request(a, "handled").await.unwrap());

        let changed = storage
            .batch_update_status(&[a, b], RequestStatus::UnresolvedTimeout)
            .await
            .expect("batch update");
        assert_eq!(changed, 1);

        // The resolved request keeps its terminal state.
        let a = storage.get_request(a).await.unwrap().unwrap();
        assert_eq!(a.status, RequestStatus::Resolved);
        let b = storage.get_request(b).await.unwrap().unwrap();
        assert_eq!(b.status, RequestStatus::UnresolvedTimeout);
    }

    #[tokio::test]
    async fn resolve_sets_response_and_timestamp_together() {
        let storage = test_storage().await;
        let id = storage.create_request(&new_request("q")).await.unwrap();

        assert!(storage.resolve_request(id, "here you go").await.unwrap());
        let request = storage.get_request(id).await.unwrap().unwrap();
        assert_eq!(request.status, RequestStatus::Resolved);
        assert_eq!(request.supervisor_response.as_deref(), Some("here you go"));
        assert!(request.resolved_at.is_some());

        // Second resolution attempt is a no-op on a terminal request.
        assert!(!storage.resolve_request(id, "again").await.unwrap());
    }

    #[tokio::test]
    async fn readonly_rejects_writes() {
        let tmp = std::env::temp_dir().join(format!("fd_test_{}.db", Uuid::now_v7()));
        let rw = Storage::open(&tmp).await.unwrap();
        rw.insert_knowledge("q", "a").await.unwrap();
        drop(rw);

        let ro = Storage::open_readonly(&tmp).await.unwrap();
        let result = ro.create_request(&new_request("q")).await;
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("read-only"));
    }

    #[test]
    fn timestamps_are_fixed_width_and_ordered() {
        let earlier = format_timestamp(Utc::now());
        let later = format_timestamp(Utc::now() + Duration::seconds(5));
        assert_eq!(earlier.len(), later.len());
        assert!(earlier < later);
        parse_timestamp(&earlier).expect("roundtrip");
    }
}
