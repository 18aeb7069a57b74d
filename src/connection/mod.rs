//! Connection manager - stream liveness and media access
//!
//! ## Responsibilities
//!
//! - Probe a stream address before any media work is attempted
//! - Open a demuxed media connection (video frames + raw audio)
//! - Report `Unreachable` for dead addresses so the session can mark
//!   the stream offline instead of retrying forever

pub mod ffmpeg;

use crate::error::{Error, Result};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

/// One demuxed unit of media
#[derive(Debug, Clone, PartialEq)]
pub enum MediaPacket {
    /// One JPEG-encoded video frame
    VideoFrame(Vec<u8>),
    /// Raw s16le 16 kHz audio bytes (channel count per the source)
    AudioChunk(Vec<u8>),
}

/// An open media connection to a live stream
#[async_trait]
pub trait MediaConnection: Send {
    /// Next packet; `Ok(None)` means the source ended cleanly
    async fn next_packet(&mut self) -> Result<Option<MediaPacket>>;

    /// Tear down the underlying transport
    async fn close(&mut self);
}

/// Opens demuxed connections to stream addresses
#[async_trait]
pub trait Demuxer: Send + Sync {
    async fn open(&self, address: &str) -> Result<Box<dyn MediaConnection>>;
}

/// ConnectionManager - liveness probe plus demuxer front-end
pub struct ConnectionManager {
    client: reqwest::Client,
    demuxer: Arc<dyn Demuxer>,
}

impl ConnectionManager {
    pub fn new(demuxer: Arc<dyn Demuxer>, probe_timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(probe_timeout)
            .redirect(reqwest::redirect::Policy::limited(3))
            .build()?;
        Ok(Self { client, demuxer })
    }

    /// Lightweight liveness check
    ///
    /// HEAD first; some stream origins reject HEAD, so fall back to GET.
    /// Any 2xx/3xx counts as live.
    pub async fn is_live(&self, address: &str) -> bool {
        if let Ok(resp) = self.client.head(address).send().await {
            if resp.status().is_success() || resp.status().is_redirection() {
                return true;
            }
        }
        match self.client.get(address).send().await {
            Ok(resp) => resp.status().is_success() || resp.status().is_redirection(),
            Err(_) => false,
        }
    }

    /// Probe then open; a failed probe is terminal for the caller
    pub async fn open(&self, address: &str) -> Result<Box<dyn MediaConnection>> {
        if !self.is_live(address).await {
            return Err(Error::Unreachable(format!(
                "liveness probe failed for {address}"
            )));
        }
        tracing::debug!(address = %address, "Stream probe passed, opening demuxer");
        self.demuxer.open(address).await
    }
}
