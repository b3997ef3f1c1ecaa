//! Per-connection session handling.
//!
//! Each line on the socket is one question event; each question gets exactly
//! one reply line before the next is read. The session always has a reply to
//! send: an answer, the escalation acknowledgment, or the apology when the
//! engine itself fails or the event cannot be decoded.

use std::sync::Arc;

use frontdesk_engine::{APOLOGY, Engine, KnowledgeStore, RequestStore};
use frontdesk_shared::{FrontdeskError, Result};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tracing::{debug, error, warn};

use crate::wire::{QuestionEvent, ReplyEvent};

/// Serve one connection until the peer closes it.
pub async fn handle_session<S>(
    stream: TcpStream,
    engine: Arc<Engine<S>>,
    default_customer_id: String,
) -> Result<()>
where
    S: KnowledgeStore + RequestStore,
{
    let (reader, mut writer) = stream.into_split();
    let mut reader = BufReader::new(reader);
    let mut line = String::new();

    loop {
        line.clear();
        let bytes_read = reader
            .read_line(&mut line)
            .await
            .map_err(|e| FrontdeskError::Transport(format!("read failed: {e}")))?;

        if bytes_read == 0 {
            // Connection closed
            break;
        }

        let reply = match serde_json::from_str::<QuestionEvent>(&line) {
            Ok(event) => answer(&engine, event, &default_customer_id).await,
            Err(e) => {
                warn!(error = %e, "malformed question event");
                ReplyEvent {
                    reply: APOLOGY.to_string(),
                    escalated: false,
                }
            }
        };

        let mut payload = serde_json::to_string(&reply)
            .map_err(|e| FrontdeskError::Transport(format!("encode failed: {e}")))?;
        payload.push('\n');
        writer
            .write_all(payload.as_bytes())
            .await
            .map_err(|e| FrontdeskError::Transport(format!("write failed: {e}")))?;
    }

    Ok(())
}

/// Run one question through the engine. The session is not advanced until
/// the decision and any store write have completed.
async fn answer<S>(
    engine: &Engine<S>,
    event: QuestionEvent,
    default_customer_id: &str,
) -> ReplyEvent
where
    S: KnowledgeStore + RequestStore,
{
    let customer_id = match event.customer_id {
        Some(id) => id,
        None => {
            debug!("event carries no customer id, using configured default");
            default_customer_id.to_string()
        }
    };

    match engine.answer_or_escalate(&event.query, &customer_id).await {
        Ok(reply) => ReplyEvent {
            reply: reply.text(),
            escalated: reply.is_escalation(),
        },
        Err(e) => {
            error!(error = %e, "engine failed, sending apology");
            ReplyEvent {
                reply: APOLOGY.to_string(),
                escalated: false,
            }
        }
    }
}
