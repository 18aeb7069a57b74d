//! Stream monitoring session
//!
//! ## Responsibilities
//!
//! - Own one stream's lifecycle: connect, pump media, reconnect on stalls
//! - Route demuxed packets into the video and audio pipelines
//! - Run admitted alerts through dedup, correlation, persistence and
//!   notification
//! - Stop only on explicit cancellation or a confirmed-offline stream

use crate::audio_pipeline::AudioPipeline;
use crate::config::EngineConfig;
use crate::connection::{ConnectionManager, MediaConnection, MediaPacket};
use crate::correlator::EventCorrelator;
use crate::dedup::AlertGate;
use crate::error::Error;
use crate::inference::ModelRegistry;
use crate::models::{
    AlertEvent, AlertPayload, SessionStatus, StopReason, StoredEvent, StreamMeta,
};
use crate::sink::dispatch::{Notification, NotificationDispatcher};
use crate::sink::EventStore;
use crate::video_pipeline::VideoPipeline;
use crate::watchlist::WatchlistCache;
use std::sync::Arc;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Shared services every session runs against
pub struct SessionDeps {
    pub config: EngineConfig,
    pub registry: ModelRegistry,
    pub watchlist: Arc<WatchlistCache>,
    pub connections: Arc<ConnectionManager>,
    pub store: Arc<dyn EventStore>,
    pub dispatcher: NotificationDispatcher,
}

/// Handle to a running session
pub struct SessionHandle {
    stream_id: String,
    cancel: CancellationToken,
    task: JoinHandle<()>,
    status: Arc<RwLock<SessionStatus>>,
}

impl SessionHandle {
    pub fn stream_id(&self) -> &str {
        &self.stream_id
    }

    pub async fn status(&self) -> SessionStatus {
        self.status.read().await.clone()
    }

    /// Cancel and wait for the session task to finish
    pub async fn stop(self) {
        self.cancel.cancel();
        let _ = self.task.await;
    }
}

enum PumpExit {
    Cancelled,
    /// Source ended or transiently failed; reconnect after the delay
    Stalled,
    /// Source is confirmed unusable; the session ends
    Unreachable,
}

/// One monitoring session
struct StreamSession {
    deps: Arc<SessionDeps>,
    stream_id: String,
    address: String,
    cancel: CancellationToken,
    status: Arc<RwLock<SessionStatus>>,
    gate: AlertGate,
    correlator: EventCorrelator,
    video: Option<VideoPipeline>,
    audio: Option<AudioPipeline>,
    platform: String,
    streamer_name: String,
}

/// Spawn a session task for a resolved stream
pub fn spawn(
    deps: Arc<SessionDeps>,
    stream_id: String,
    address: String,
    meta: StreamMeta,
) -> SessionHandle {
    let cancel = CancellationToken::new();
    let mut warnings = Vec::new();

    let video = deps.registry.detector.clone().map(|detector| {
        VideoPipeline::new(detector, stream_id.clone())
    });
    if video.is_none() {
        warnings.push("object detection disabled".to_string());
    }

    let audio = deps.registry.transcriber.clone().map(|transcriber| {
        AudioPipeline::new(
            transcriber,
            deps.registry.sentiment.clone(),
            stream_id.clone(),
            deps.config.window_secs,
        )
    });
    if audio.is_none() {
        warnings.push("transcription disabled".to_string());
    }

    let status = Arc::new(RwLock::new(SessionStatus {
        stream_id: stream_id.clone(),
        platform: meta.platform.clone(),
        streamer_name: meta.streamer_name.clone(),
        running: true,
        stop_reason: None,
        warnings,
    }));

    let session = StreamSession {
        gate: AlertGate::new(deps.config.cooldown, deps.config.audio_quota),
        correlator: EventCorrelator::new(deps.config.correlation_window),
        deps,
        stream_id: stream_id.clone(),
        address,
        cancel: cancel.clone(),
        status: status.clone(),
        video,
        audio,
        platform: meta.platform,
        streamer_name: meta.streamer_name,
    };

    let task = tokio::spawn(session.run());

    SessionHandle {
        stream_id,
        cancel,
        task,
        status,
    }
}

impl StreamSession {
    async fn run(mut self) {
        tracing::info!(
            stream_id = %self.stream_id,
            platform = %self.platform,
            streamer = %self.streamer_name,
            "Monitoring started"
        );

        let reason = self.monitor_loop().await;

        {
            let mut status = self.status.write().await;
            status.running = false;
            status.stop_reason = Some(reason);
        }

        tracing::info!(
            stream_id = %self.stream_id,
            reason = ?reason,
            "Monitoring stopped"
        );
    }

    async fn monitor_loop(&mut self) -> StopReason {
        loop {
            if self.cancel.is_cancelled() {
                return StopReason::Cancelled;
            }

            let conn = match self.deps.connections.open(&self.address).await {
                Ok(conn) => conn,
                Err(Error::Unreachable(msg)) => {
                    tracing::warn!(stream_id = %self.stream_id, reason = %msg, "Stream offline");
                    return StopReason::Offline;
                }
                Err(e) => {
                    tracing::warn!(stream_id = %self.stream_id, error = %e, "Connect failed, retrying");
                    if self.wait_reconnect().await {
                        return StopReason::Cancelled;
                    }
                    continue;
                }
            };

            match self.pump(conn).await {
                PumpExit::Cancelled => return StopReason::Cancelled,
                PumpExit::Unreachable => return StopReason::Offline,
                PumpExit::Stalled => {
                    tracing::info!(stream_id = %self.stream_id, "Stream stalled, reconnecting");
                    if self.wait_reconnect().await {
                        return StopReason::Cancelled;
                    }
                }
            }
        }
    }

    /// Sleep the reconnect delay; true when cancelled meanwhile
    async fn wait_reconnect(&self) -> bool {
        tokio::select! {
            _ = self.cancel.cancelled() => true,
            _ = tokio::time::sleep(self.deps.config.reconnect_delay) => false,
        }
    }

    async fn pump(&mut self, mut conn: Box<dyn MediaConnection>) -> PumpExit {
        loop {
            let packet = tokio::select! {
                _ = self.cancel.cancelled() => {
                    conn.close().await;
                    return PumpExit::Cancelled;
                }
                packet = conn.next_packet() => packet,
            };

            match packet {
                Ok(Some(MediaPacket::VideoFrame(frame))) => self.handle_frame(&frame).await,
                Ok(Some(MediaPacket::AudioChunk(chunk))) => self.handle_audio(&chunk).await,
                Ok(None) => {
                    conn.close().await;
                    return PumpExit::Stalled;
                }
                Err(Error::Unreachable(msg)) => {
                    tracing::warn!(stream_id = %self.stream_id, reason = %msg, "Source unusable");
                    conn.close().await;
                    return PumpExit::Unreachable;
                }
                Err(Error::DecodeFailure(e)) => {
                    tracing::warn!(stream_id = %self.stream_id, error = %e, "Packet dropped");
                }
                Err(e) => {
                    tracing::warn!(stream_id = %self.stream_id, error = %e, "Read failed");
                    conn.close().await;
                    return PumpExit::Stalled;
                }
            }
        }
    }

    async fn handle_frame(&mut self, frame: &[u8]) {
        let Some(video) = &self.video else {
            return;
        };

        let watchlist = self.deps.watchlist.snapshot().await;
        let alert = match video.on_frame(frame, &watchlist).await {
            Ok(Some(alert)) => alert,
            Ok(None) => return,
            Err(e) => {
                tracing::warn!(stream_id = %self.stream_id, error = %e, "Frame detection failed");
                return;
            }
        };

        if !self.gate.admit(&alert) {
            return;
        }

        match self
            .deps
            .store
            .record(StoredEvent::from_alert(&alert, None))
            .await
        {
            Ok(event_id) => {
                self.correlator.note_visual(event_id, alert.timestamp);
                self.notify(event_id, &alert);
            }
            Err(e) => {
                tracing::error!(stream_id = %self.stream_id, error = %e, "Event record failed");
            }
        }
    }

    async fn handle_audio(&mut self, chunk: &[u8]) {
        let Some(audio) = &mut self.audio else {
            return;
        };

        let watchlist = self.deps.watchlist.snapshot().await;
        let alert = match audio.on_chunk(chunk, &watchlist).await {
            Ok(Some(alert)) => alert,
            Ok(None) => return,
            Err(e) => {
                tracing::warn!(stream_id = %self.stream_id, error = %e, "Audio window failed");
                return;
            }
        };

        if !self.gate.admit(&alert) {
            return;
        }

        let transcript = alert.payload.transcript().unwrap_or_default().to_string();
        let merged = self
            .correlator
            .try_merge(
                self.deps.store.as_ref(),
                &self.stream_id,
                &transcript,
                &alert.matched,
                alert.timestamp,
            )
            .await;
        if merged {
            return;
        }

        match self
            .deps
            .store
            .record(StoredEvent::from_alert(&alert, None))
            .await
        {
            Ok(event_id) => self.notify(event_id, &alert),
            Err(e) => {
                tracing::error!(stream_id = %self.stream_id, error = %e, "Event record failed");
            }
        }
    }

    fn notify(&self, event_id: u64, alert: &AlertEvent) {
        let (image, transcript) = match &alert.payload {
            AlertPayload::Image(bytes) => (Some(bytes.clone()), None),
            AlertPayload::Transcript { text, .. } => (None, Some(text.clone())),
        };

        self.deps.dispatcher.dispatch(Notification {
            event_id,
            stream_id: self.stream_id.clone(),
            platform: self.platform.clone(),
            streamer_name: self.streamer_name.clone(),
            signal: alert.signal,
            matched: alert.matched.clone(),
            image,
            transcript,
        });
    }
}
