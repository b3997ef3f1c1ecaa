//! Wire events for the line-delimited JSON transport.

use serde::{Deserialize, Serialize};

/// One inbound question from a customer session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuestionEvent {
    /// Free-form question text.
    pub query: String,
    /// Customer identity, when the transport carries one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub customer_id: Option<String>,
}

/// One outbound reply to a customer session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReplyEvent {
    /// Customer-facing response text.
    pub reply: String,
    /// Whether the question was escalated to a supervisor.
    pub escalated: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn question_without_customer_id_parses() {
        let event: QuestionEvent =
            serde_json::from_str(r#"{"query": "What are your hours?"}"#).expect("parse");
        assert_eq!(event.query, "What are your hours?");
        assert!(event.customer_id.is_none());
    }

    #[test]
    fn reply_roundtrip() {
        let event = ReplyEvent {
            reply: "9-5 Mon-Fri".into(),
            escalated: false,
        };
        let json = serde_json::to_string(&event).expect("serialize");
        let parsed: ReplyEvent = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(parsed.reply, "9-5 Mon-Fri");
        assert!(!parsed.escalated);
    }
}
