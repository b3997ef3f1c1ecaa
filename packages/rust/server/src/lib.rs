//! Session transport and serve loop for Frontdesk.
//!
//! One inbound question event, one outbound reply, framed as line-delimited
//! JSON over TCP. The serve loop runs a catch-up timeout sweep before
//! accepting sessions, then accepts until interrupted, draining in-flight
//! sessions on shutdown.

pub mod serve;
pub mod session;
pub mod wire;

pub use serve::{ServeConfig, Server};
pub use wire::{QuestionEvent, ReplyEvent};
