//! Long-running serve loop.
//!
//! Startup order: run the catch-up timeout sweep, bind the listener, then
//! accept sessions until interrupted. Each session is an independent spawned
//! task; shutdown stops accepting and drains in-flight sessions rather than
//! aborting them mid-write.

use std::net::SocketAddr;
use std::sync::Arc;

use chrono::Utc;
use frontdesk_engine::{Engine, KnowledgeStore, RequestStore};
use frontdesk_shared::{FrontdeskError, Result};
use tokio::net::TcpListener;
use tokio::task::JoinSet;
use tracing::{error, info, warn};

use crate::session;

/// Runtime settings for the serve loop.
#[derive(Debug, Clone)]
pub struct ServeConfig {
    /// Address to bind the session listener to.
    pub listen: String,
    /// Age after which a pending request is swept to `unresolved_timeout`.
    pub timeout: chrono::Duration,
    /// Customer identity used when an event does not carry one.
    pub default_customer_id: String,
    /// Period of the recurring sweep, or `None` to only sweep at startup.
    pub sweep_interval: Option<std::time::Duration>,
}

/// A bound session server, ready to accept.
pub struct Server<S> {
    listener: TcpListener,
    engine: Arc<Engine<S>>,
    config: ServeConfig,
}

impl<S> Server<S>
where
    S: KnowledgeStore + RequestStore + 'static,
{
    /// Run the catch-up sweep and bind the listener.
    ///
    /// Sweep failures are reported but do not prevent serving: a missing
    /// index or failed batch write is an operational problem for the sweep
    /// path, not for answering sessions.
    pub async fn bind(config: ServeConfig, store: Arc<S>) -> Result<Self> {
        let engine = Arc::new(Engine::new(store));

        match engine.sweep_timeouts(Utc::now(), config.timeout).await {
            Ok(count) => info!(count, "catch-up sweep complete"),
            Err(e) => error!(error = %e, "catch-up sweep failed"),
        }

        let listener = TcpListener::bind(&config.listen).await.map_err(|e| {
            FrontdeskError::Transport(format!("failed to bind {}: {e}", config.listen))
        })?;

        Ok(Self {
            listener,
            engine,
            config,
        })
    }

    /// The address the listener is bound to.
    pub fn local_addr(&self) -> Result<SocketAddr> {
        self.listener
            .local_addr()
            .map_err(|e| FrontdeskError::Transport(e.to_string()))
    }

    /// Accept sessions until interrupted, then drain in-flight sessions.
    pub async fn run(self) -> Result<()> {
        let mut sessions = JoinSet::new();
        let mut sweeper = self
            .config
            .sweep_interval
            .map(|period| tokio::time::interval_at(tokio::time::Instant::now() + period, period));

        info!(listen = %self.config.listen, "accepting sessions");

        loop {
            tokio::select! {
                accepted = self.listener.accept() => match accepted {
                    Ok((stream, peer)) => {
                        info!(%peer, "session opened");
                        let engine = Arc::clone(&self.engine);
                        let default_customer_id = self.config.default_customer_id.clone();
                        sessions.spawn(async move {
                            if let Err(e) =
                                session::handle_session(stream, engine, default_customer_id).await
                            {
                                warn!(error = %e, "session ended with transport error");
                            }
                        });
                    }
                    Err(e) => warn!(error = %e, "failed to accept connection"),
                },
                _ = tick_or_pending(sweeper.as_mut()) => {
                    match self.engine.sweep_timeouts(Utc::now(), self.config.timeout).await {
                        Ok(count) if count > 0 => info!(count, "recurring sweep complete"),
                        Ok(_) => {}
                        Err(e) => error!(error = %e, "recurring sweep failed"),
                    }
                }
                _ = tokio::signal::ctrl_c() => {
                    info!("interrupt received, draining sessions");
                    break;
                }
            }
        }

        // Stop accepting; let in-flight sessions run to completion so no
        // half-created request is left behind.
        drop(self.listener);
        while sessions.join_next().await.is_some() {}
        info!("shutdown complete");

        Ok(())
    }
}

/// Await the next tick, or forever when the recurring sweep is disabled.
async fn tick_or_pending(interval: Option<&mut tokio::time::Interval>) {
    match interval {
        Some(interval) => {
            interval.tick().await;
        }
        None => std::future::pending().await,
    }
}
