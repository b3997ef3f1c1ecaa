//! Lookup-or-escalate decisions and the pending-request timeout sweep.
//!
//! The lookup policy is two-phase: an index-backed exact match first, then a
//! case-insensitive scan over the full knowledge set, first match wins. A
//! question neither phase answers is acknowledged to the customer and
//! escalated as a new pending help request.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use frontdesk_shared::{NewHelpRequest, RequestId, RequestStatus, Result};
use tracing::{debug, info, instrument, warn};

use crate::store::{KnowledgeStore, RequestStore};

/// Reply sent when no knowledge entry matches and the question is escalated.
pub const ESCALATION_ACK: &str =
    "That's a great question. Let me check with my supervisor and get back to you shortly.";

/// Reply of last resort, sent by the session layer when the engine itself
/// fails. A session always has something to send back.
pub const APOLOGY: &str =
    "I'm sorry, something went wrong on my end. Please try again in a moment.";

// ---------------------------------------------------------------------------
// Reply
// ---------------------------------------------------------------------------

/// The decision produced for one inbound question.
#[derive(Debug, Clone)]
pub enum Reply {
    /// The knowledge base had an answer; no state was mutated.
    Answered { answer: String },
    /// No match; a help request was escalated to a supervisor. The id is
    /// `None` when the create failed (the acknowledgment is sent regardless).
    Escalated { request_id: Option<RequestId> },
}

impl Reply {
    /// The customer-facing response text.
    pub fn text(&self) -> String {
        match self {
            Self::Answered { answer } => {
                format!("I found the answer for you! Here it is: {answer}")
            }
            Self::Escalated { .. } => ESCALATION_ACK.to_string(),
        }
    }

    /// Whether this reply escalated the question.
    pub fn is_escalation(&self) -> bool {
        matches!(self, Self::Escalated { .. })
    }
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

/// Orchestrates lookup-or-escalate decisions and timeout sweeps.
pub struct Engine<S> {
    store: Arc<S>,
}

impl<S> Engine<S>
where
    S: KnowledgeStore + RequestStore,
{
    /// Create an engine over an explicitly constructed store.
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Answer `query_text` from the knowledge base, or escalate it.
    ///
    /// The escalation reply is decided before the create is attempted; a
    /// failed write is logged but never takes the acknowledgment away from
    /// the customer.
    #[instrument(skip_all, fields(customer_id = %customer_id))]
    pub async fn answer_or_escalate(&self, query_text: &str, customer_id: &str) -> Result<Reply> {
        if let Some(entry) = self.store.find_exact(query_text).await? {
            debug!("knowledge found via exact match");
            return Ok(Reply::Answered {
                answer: entry.answer,
            });
        }

        // Fallback: case-insensitive scan, first match wins.
        let wanted = query_text.to_lowercase();
        for entry in self.store.list_all().await? {
            if entry.query.to_lowercase() == wanted {
                debug!(matched = %entry.query, "knowledge found via case-insensitive fallback");
                return Ok(Reply::Answered {
                    answer: entry.answer,
                });
            }
        }

        info!(query = query_text, "no knowledge match, escalating to supervisor");
        let request = NewHelpRequest {
            customer_id: customer_id.to_string(),
            customer_query: query_text.to_string(),
        };
        let request_id = match self.store.create(&request).await {
            Ok(id) => {
                info!(request_id = %id, "help request created");
                Some(id)
            }
            Err(e) => {
                warn!(error = %e, "failed to persist help request");
                None
            }
        };

        Ok(Reply::Escalated { request_id })
    }

    /// Transition every pending request older than `timeout` (relative to
    /// `now`) to `unresolved_timeout`. Returns how many were transitioned.
    ///
    /// An empty match set performs no writes. A failed read or batch write
    /// aborts this invocation without partial bookkeeping; the next sweep
    /// naturally retries since time advances and the requests stay pending.
    #[instrument(skip_all, fields(timeout_secs = timeout.num_seconds()))]
    pub async fn sweep_timeouts(
        &self,
        now: DateTime<Utc>,
        timeout: chrono::Duration,
    ) -> Result<u64> {
        let threshold = now - timeout;
        let stale = self.store.find_pending_older_than(threshold).await?;

        if stale.is_empty() {
            debug!("no timed-out requests");
            return Ok(0);
        }

        let ids: Vec<RequestId> = stale.iter().map(|r| r.id).collect();
        let count = self
            .store
            .batch_update_status(&ids, RequestStatus::UnresolvedTimeout)
            .await?;

        info!(count, "marked requests unresolved_timeout");
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::Duration;
    use frontdesk_shared::{FrontdeskError, HelpRequest, KnowledgeEntry};
    use frontdesk_storage::Storage;
    use uuid::Uuid;

    async fn test_storage() -> Arc<Storage> {
        let tmp = std::env::temp_dir().join(format!("fd_engine_test_{}.db", Uuid::now_v7()));
        Arc::new(Storage::open(&tmp).await.expect("open test db"))
    }

    async fn hours_storage() -> Arc<Storage> {
        let storage = test_storage().await;
        storage
            .insert_knowledge("What are your hours?", "9-5 Mon-Fri")
            .await
            .expect("seed knowledge");
        storage
    }

    #[tokio::test]
    async fn answers_exact_match_without_escalating() {
        let storage = hours_storage().await;
        let engine = Engine::new(Arc::clone(&storage));

        let reply = engine
            .answer_or_escalate("What are your hours?", "cust_123")
            .await
            .expect("decision");

        assert_eq!(
            reply.text(),
            "I found the answer for you! Here it is: 9-5 Mon-Fri"
        );
        assert!(!reply.is_escalation());

        // The fast path mutates nothing.
        let pending = storage
            .find_pending_older_than(Utc::now() + Duration::hours(1))
            .await
            .unwrap();
        assert!(pending.is_empty());
    }

    #[tokio::test]
    async fn answers_casing_variant_via_fallback() {
        let storage = hours_storage().await;
        let engine = Engine::new(Arc::clone(&storage));

        let reply = engine
            .answer_or_escalate("WHAT ARE YOUR HOURS?", "cust_123")
            .await
            .expect("decision");

        assert_eq!(
            reply.text(),
            "I found the answer for you! Here it is: 9-5 Mon-Fri"
        );
    }

    #[tokio::test]
    async fn escalates_unknown_question_as_pending_request() {
        let storage = test_storage().await;
        let engine = Engine::new(Arc::clone(&storage));

        let reply = engine
            .answer_or_escalate("Do you deliver on Sundays?", "cust_42")
            .await
            .expect("decision");

        assert_eq!(reply.text(), ESCALATION_ACK);
        let Reply::Escalated {
            request_id: Some(id),
        } = reply
        else {
            panic!("expected an escalation with a created request");
        };

        let request = storage.get_request(id).await.unwrap().expect("stored");
        assert_eq!(request.status, RequestStatus::Pending);
        assert_eq!(request.customer_query, "Do you deliver on Sundays?");
        assert_eq!(request.customer_id, "cust_42");
    }

    #[tokio::test]
    async fn sweep_marks_stale_request_and_is_idempotent() {
        let storage = test_storage().await;
        let engine = Engine::new(Arc::clone(&storage));
        let timeout = Duration::minutes(2);

        let Reply::Escalated {
            request_id: Some(id),
        } = engine
            .answer_or_escalate("unanswerable", "cust_123")
            .await
            .unwrap()
        else {
            panic!("expected escalation");
        };

        // One second past the timeout window.
        let later = Utc::now() + timeout + Duration::seconds(1);
        let count = engine.sweep_timeouts(later, timeout).await.expect("sweep");
        assert_eq!(count, 1);

        let request = storage.get_request(id).await.unwrap().unwrap();
        assert_eq!(request.status, RequestStatus::UnresolvedTimeout);

        // Re-running with the same clock finds nothing still pending.
        let count = engine.sweep_timeouts(later, timeout).await.expect("sweep");
        assert_eq!(count, 0);
        let request = storage.get_request(id).await.unwrap().unwrap();
        assert_eq!(request.status, RequestStatus::UnresolvedTimeout);
    }

    #[tokio::test]
    async fn sweep_leaves_resolved_requests_alone() {
        let storage = test_storage().await;
        let engine = Engine::new(Arc::clone(&storage));
        let timeout = Duration::minutes(2);

        let Reply::Escalated {
            request_id: Some(id),
        } = engine
            .answer_or_escalate("unanswerable", "cust_123")
            .await
            .unwrap()
        else {
            panic!("expected escalation");
        };

        // A supervisor resolves the request before the sweep runs.
        assert!(storage.resolve_request(id, "we open at 9").await.unwrap());

        let later = Utc::now() + timeout + Duration::seconds(1);
        let count = engine.sweep_timeouts(later, timeout).await.expect("sweep");
        assert_eq!(count, 0);

        let request = storage.get_request(id).await.unwrap().unwrap();
        assert_eq!(request.status, RequestStatus::Resolved);
        assert_eq!(request.supervisor_response.as_deref(), Some("we open at 9"));
    }

    #[tokio::test]
    async fn sweep_performs_no_writes_on_empty_match() {
        let storage = test_storage().await;
        let engine = Engine::new(storage);

        let count = engine
            .sweep_timeouts(Utc::now(), Duration::minutes(2))
            .await
            .expect("sweep");
        assert_eq!(count, 0);
    }

    // -----------------------------------------------------------------------
    // Write-failure behavior
    // -----------------------------------------------------------------------

    /// Store whose writes always fail; lookups find nothing.
    struct BrokenStore;

    #[async_trait]
    impl KnowledgeStore for BrokenStore {
        async fn find_exact(&self, _query_text: &str) -> frontdesk_shared::Result<Option<KnowledgeEntry>> {
            Ok(None)
        }

        async fn list_all(&self) -> frontdesk_shared::Result<Vec<KnowledgeEntry>> {
            Ok(Vec::new())
        }
    }

    #[async_trait]
    impl RequestStore for BrokenStore {
        async fn create(
            &self,
            _request: &NewHelpRequest,
        ) -> frontdesk_shared::Result<RequestId> {
            Err(FrontdeskError::StoreWrite("simulated outage".into()))
        }

        async fn find_pending_older_than(
            &self,
            _threshold: DateTime<Utc>,
        ) -> frontdesk_shared::Result<Vec<HelpRequest>> {
            Ok(Vec::new())
        }

        async fn batch_update_status(
            &self,
            _ids: &[RequestId],
            _new_status: RequestStatus,
        ) -> frontdesk_shared::Result<u64> {
            Err(FrontdeskError::StoreWrite("simulated outage".into()))
        }
    }

    #[tokio::test]
    async fn escalation_reply_survives_create_failure() {
        let engine = Engine::new(Arc::new(BrokenStore));

        let reply = engine
            .answer_or_escalate("anything", "cust_123")
            .await
            .expect("the reply was decided before the write");

        assert_eq!(reply.text(), ESCALATION_ACK);
        assert!(matches!(
            reply,
            Reply::Escalated { request_id: None }
        ));
    }
}
