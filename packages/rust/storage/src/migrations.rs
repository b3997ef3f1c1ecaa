//! SQL migration definitions for the Frontdesk database.
//!
//! Migrations are applied in order on database open. Each migration has a
//! version number and a set of SQL statements executed as a batch.

/// A database migration with a version and SQL statements.
pub(crate) struct Migration {
    pub version: u32,
    pub description: &'static str,
    pub sql: &'static str,
}

/// Name of the composite index backing the pending-older-than sweep query.
pub(crate) const SWEEP_INDEX_NAME: &str = "idx_help_requests_pending_age";

/// All migrations, in ascending version order.
pub(crate) fn all_migrations() -> Vec<Migration> {
    vec![Migration {
        version: 1,
        description: "Initial schema: knowledge_base, help_requests",
        sql: r#"
-- Schema version tracking
CREATE TABLE IF NOT EXISTS schema_migrations (
    version   INTEGER PRIMARY KEY,
    applied_at TEXT NOT NULL DEFAULT (datetime('now'))
);

-- Curated question/answer pairs, read-only to the agent
CREATE TABLE IF NOT EXISTS knowledge_base (
    id         TEXT PRIMARY KEY,
    query      TEXT NOT NULL,
    answer     TEXT NOT NULL,
    created_at TEXT NOT NULL
);

-- Backs the exact-match lookup fast path. Non-unique: duplicate queries
-- are allowed and resolved first-match-wins in insertion order.
CREATE INDEX IF NOT EXISTS idx_knowledge_query ON knowledge_base(query);

-- Escalated help requests
CREATE TABLE IF NOT EXISTS help_requests (
    id                  TEXT PRIMARY KEY,
    customer_id         TEXT NOT NULL,
    customer_query      TEXT NOT NULL,
    status              TEXT NOT NULL,
    created_at          TEXT NOT NULL,
    supervisor_response TEXT,
    resolved_at         TEXT,
    notified_customer   INTEGER NOT NULL DEFAULT 0
);

-- Backs the sweep's conjunctive filter (status equality + created_at range)
CREATE INDEX IF NOT EXISTS idx_help_requests_pending_age
    ON help_requests(status, created_at);

INSERT INTO schema_migrations (version) VALUES (1);
"#,
    }]
}
