//! Stream resolution seam
//!
//! Turns a stream reference into a playable media address plus the identity
//! metadata a session needs. Platform-specific resolvers live behind this
//! trait; the engine only sees addresses.

use crate::error::Result;
use crate::models::{StreamMeta, StreamRef};
use async_trait::async_trait;

/// Resolution seam
#[async_trait]
pub trait StreamResolver: Send + Sync {
    /// Playable media address for the referenced stream
    async fn resolve_address(&self, stream: &StreamRef) -> Result<String>;

    /// Identity metadata; `None` means the stream cannot be monitored
    async fn lookup_meta(&self, stream: &StreamRef, address: &str) -> Option<StreamMeta>;
}

/// Resolver for streams addressed by a direct media URL
pub struct DirectResolver;

#[async_trait]
impl StreamResolver for DirectResolver {
    async fn resolve_address(&self, stream: &StreamRef) -> Result<String> {
        Ok(stream.room_url().to_string())
    }

    async fn lookup_meta(&self, stream: &StreamRef, _address: &str) -> Option<StreamMeta> {
        match stream {
            StreamRef::Generic { room_url } => Some(StreamMeta {
                platform: "generic".to_string(),
                streamer_name: room_url.clone(),
            }),
            StreamRef::Platform {
                platform, streamer, ..
            } => Some(StreamMeta {
                platform: platform.clone(),
                streamer_name: streamer.clone(),
            }),
        }
    }
}
