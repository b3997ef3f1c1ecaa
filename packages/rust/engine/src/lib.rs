//! Escalation engine for Frontdesk.
//!
//! Decides answer-or-escalate for each inbound question and sweeps pending
//! help requests past their timeout. All store access goes through the
//! contracts in [`store`]; `frontdesk-storage` provides the production
//! implementation.

pub mod escalation;
pub mod store;

pub use escalation::{APOLOGY, ESCALATION_ACK, Engine, Reply};
pub use store::{KnowledgeStore, RequestStore};
