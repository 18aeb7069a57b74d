//! Domain types shared across the engine

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Reference to a monitored stream
///
/// Platform-specific rooms carry their platform tag and streamer name;
/// generic rooms are addressed by URL alone.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StreamRef {
    Generic {
        room_url: String,
    },
    Platform {
        platform: String,
        room_url: String,
        streamer: String,
    },
}

impl StreamRef {
    pub fn room_url(&self) -> &str {
        match self {
            StreamRef::Generic { room_url } => room_url,
            StreamRef::Platform { room_url, .. } => room_url,
        }
    }

    pub fn platform_tag(&self) -> &str {
        match self {
            StreamRef::Generic { .. } => "generic",
            StreamRef::Platform { platform, .. } => platform,
        }
    }
}

/// Stream identity required before a session may start
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StreamMeta {
    pub platform: String,
    pub streamer_name: String,
}

/// Signal type of an alert
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SignalType {
    Visual,
    Audio,
}

impl SignalType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SignalType::Visual => "visual",
            SignalType::Audio => "audio",
        }
    }
}

/// One matched object in one frame
///
/// Bounding box is `[x, y, width, height]` in pixel units. Ephemeral:
/// exists only within a frame-processing cycle.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Detection {
    pub label: String,
    pub confidence: f32,
    pub bbox: [u32; 4],
}

/// Snapshot payload attached to an alert
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum AlertPayload {
    /// Annotated JPEG bytes (visual alerts)
    Image(Vec<u8>),
    /// Transcript text with sentiment score (audio alerts)
    Transcript { text: String, sentiment: f32 },
}

impl AlertPayload {
    /// Transcript text if this is an audio payload
    pub fn transcript(&self) -> Option<&str> {
        match self {
            AlertPayload::Transcript { text, .. } => Some(text),
            AlertPayload::Image(_) => None,
        }
    }
}

/// Candidate alert handed to deduplication
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct AlertEvent {
    pub stream_id: String,
    pub signal: SignalType,
    /// Matched object labels (visual) or keywords (audio)
    pub matched: BTreeSet<String>,
    pub payload: AlertPayload,
    pub timestamp: DateTime<Utc>,
}

/// Audio content merged into an earlier visual event
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct MergedAudio {
    pub transcript: String,
    pub keywords: BTreeSet<String>,
    pub merged_at: DateTime<Utc>,
}

/// Persisted event record
///
/// `event_id` is assigned by the store on `record`.
#[derive(Debug, Clone, Serialize)]
pub struct StoredEvent {
    pub event_id: u64,
    pub stream_id: String,
    pub signal: SignalType,
    pub matched: BTreeSet<String>,
    pub payload: AlertPayload,
    pub timestamp: DateTime<Utc>,
    pub correlated_event_id: Option<u64>,
    pub merged_audio: Option<MergedAudio>,
    pub created_at: DateTime<Utc>,
}

impl StoredEvent {
    /// Build a persistable record from an admitted alert
    pub fn from_alert(alert: &AlertEvent, correlated_event_id: Option<u64>) -> Self {
        Self {
            event_id: 0, // assigned by the store
            stream_id: alert.stream_id.clone(),
            signal: alert.signal,
            matched: alert.matched.clone(),
            payload: alert.payload.clone(),
            timestamp: alert.timestamp,
            correlated_event_id,
            merged_audio: None,
            created_at: Utc::now(),
        }
    }
}

/// Why a session stopped
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    /// Explicit cancellation via the control surface
    Cancelled,
    /// Stream confirmed offline by the liveness probe
    Offline,
}

/// Session status surfaced through the control surface
#[derive(Debug, Clone, Serialize)]
pub struct SessionStatus {
    pub stream_id: String,
    pub platform: String,
    pub streamer_name: String,
    pub running: bool,
    pub stop_reason: Option<StopReason>,
    /// Modality-disabled states and similar non-fatal conditions
    pub warnings: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stream_ref_platform_tag() {
        let generic = StreamRef::Generic {
            room_url: "https://example.com/live/abc".to_string(),
        };
        assert_eq!(generic.platform_tag(), "generic");

        let platform = StreamRef::Platform {
            platform: "chaturbate".to_string(),
            room_url: "https://example.com/room/xyz".to_string(),
            streamer: "xyz".to_string(),
        };
        assert_eq!(platform.platform_tag(), "chaturbate");
        assert_eq!(platform.room_url(), "https://example.com/room/xyz");
    }

    #[test]
    fn test_signal_type_serialization() {
        let json = serde_json::to_string(&SignalType::Visual).unwrap();
        assert_eq!(json, "\"visual\"");
    }

    #[test]
    fn test_stored_event_from_alert() {
        let alert = AlertEvent {
            stream_id: "room-1".to_string(),
            signal: SignalType::Audio,
            matched: BTreeSet::from(["help".to_string()]),
            payload: AlertPayload::Transcript {
                text: "please help".to_string(),
                sentiment: -0.5,
            },
            timestamp: Utc::now(),
        };

        let stored = StoredEvent::from_alert(&alert, Some(7));
        assert_eq!(stored.event_id, 0);
        assert_eq!(stored.correlated_event_id, Some(7));
        assert_eq!(stored.payload.transcript(), Some("please help"));
    }
}
