//! Monitor engine - session registry and control surface
//!
//! ## Responsibilities
//!
//! - Resolve stream references and spawn one session per stream
//! - Keep the session map consistent: one running session per stream id
//! - Idempotent stop, status reporting, orderly shutdown

use crate::error::{Error, Result};
use crate::models::{SessionStatus, StreamRef};
use crate::resolver::StreamResolver;
use crate::session::{self, SessionDeps, SessionHandle};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// MonitorEngine instance
pub struct MonitorEngine {
    deps: Arc<SessionDeps>,
    resolver: Arc<dyn StreamResolver>,
    sessions: RwLock<HashMap<String, SessionHandle>>,
}

impl MonitorEngine {
    pub fn new(deps: Arc<SessionDeps>, resolver: Arc<dyn StreamResolver>) -> Self {
        Self {
            deps,
            resolver,
            sessions: RwLock::new(HashMap::new()),
        }
    }

    /// Start monitoring a stream; a second start for the same stream is a no-op
    ///
    /// The write lock is held across check, resolve and insert so two
    /// concurrent starts for one stream cannot both spawn: a replaced
    /// handle would leak its running task.
    pub async fn start_monitoring(&self, stream: &StreamRef) -> Result<()> {
        let stream_id = stream.room_url().to_string();

        let mut sessions = self.sessions.write().await;
        if let Some(handle) = sessions.get(&stream_id) {
            if handle.status().await.running {
                tracing::warn!(stream_id = %stream_id, "Already monitoring, ignoring start");
                return Ok(());
            }
        }

        let address = self.resolver.resolve_address(stream).await?;
        let meta = self
            .resolver
            .lookup_meta(stream, &address)
            .await
            .ok_or_else(|| {
                Error::Resolve(format!("no metadata for stream {stream_id}, not starting"))
            })?;

        let handle = session::spawn(self.deps.clone(), stream_id.clone(), address, meta);

        // Only a finished session can still be in the slot here
        sessions.insert(stream_id, handle);
        Ok(())
    }

    /// Stop monitoring; unknown stream ids are a no-op
    pub async fn stop_monitoring(&self, stream_id: &str) {
        let handle = self.sessions.write().await.remove(stream_id);
        match handle {
            Some(handle) => {
                handle.stop().await;
                tracing::info!(stream_id = %stream_id, "Stop requested, session ended");
            }
            None => {
                tracing::debug!(stream_id = %stream_id, "Stop for unknown stream, ignoring");
            }
        }
    }

    /// Status of every known session
    pub async fn status(&self) -> Vec<SessionStatus> {
        let sessions = self.sessions.read().await;
        let mut out = Vec::with_capacity(sessions.len());
        for handle in sessions.values() {
            out.push(handle.status().await);
        }
        out
    }

    /// Stop all sessions
    pub async fn shutdown(&self) {
        let handles: Vec<SessionHandle> = {
            let mut sessions = self.sessions.write().await;
            sessions.drain().map(|(_, h)| h).collect()
        };
        for handle in handles {
            handle.stop().await;
        }
        tracing::info!("Engine shut down");
    }
}
