//! Shared types, error model, and configuration for Frontdesk.
//!
//! This crate is the foundation depended on by all other Frontdesk crates.
//! It provides:
//! - [`FrontdeskError`] — the unified error type
//! - Domain types ([`HelpRequest`], [`KnowledgeEntry`], [`RequestStatus`], [`RequestId`])
//! - Configuration ([`AppConfig`], config loading)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AgentConfig, AppConfig, ServerConfig, StoreConfig, config_dir, config_file_path, init_config,
    load_config, load_config_from,
};
pub use error::{FrontdeskError, Result};
pub use types::{
    HelpRequest, KnowledgeEntry, NewHelpRequest, RequestId, RequestStatus, UnknownStatus,
};
