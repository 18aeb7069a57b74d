//! Event persistence seam
//!
//! ## Responsibilities
//!
//! - Define the store seam every admitted alert flows through
//! - Provide the in-memory ring-buffer store used by default
//! - House the notification dispatcher and webhook notifier

pub mod dispatch;
pub mod webhook;

use crate::error::Result;
use crate::models::{MergedAudio, StoredEvent};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::BTreeSet;
use std::collections::VecDeque;
use tokio::sync::RwLock;

/// Persistence seam for admitted alerts
#[async_trait]
pub trait EventStore: Send + Sync {
    /// Persist an event and return its assigned id
    async fn record(&self, event: StoredEvent) -> Result<u64>;

    /// Fold audio content into an existing visual event
    ///
    /// Returns false when the event is gone, is not visual, or already
    /// carries merged audio.
    async fn merge_audio(&self, event_id: u64, transcript: &str, keywords: &BTreeSet<String>)
        -> bool;
}

/// In-memory ring-buffer store
///
/// Oldest events are evicted once `capacity` is reached.
pub struct MemoryEventStore {
    events: RwLock<VecDeque<StoredEvent>>,
    capacity: usize,
    next_id: RwLock<u64>,
}

impl MemoryEventStore {
    pub fn new(capacity: usize) -> Self {
        Self {
            events: RwLock::new(VecDeque::with_capacity(capacity)),
            capacity,
            next_id: RwLock::new(1),
        }
    }

    /// Fetch one event by id
    pub async fn get(&self, event_id: u64) -> Option<StoredEvent> {
        self.events
            .read()
            .await
            .iter()
            .find(|e| e.event_id == event_id)
            .cloned()
    }

    /// Most recent events, newest first
    pub async fn recent(&self, limit: usize) -> Vec<StoredEvent> {
        self.events
            .read()
            .await
            .iter()
            .rev()
            .take(limit)
            .cloned()
            .collect()
    }

    pub async fn len(&self) -> usize {
        self.events.read().await.len()
    }
}

#[async_trait]
impl EventStore for MemoryEventStore {
    async fn record(&self, mut event: StoredEvent) -> Result<u64> {
        let id = {
            let mut next = self.next_id.write().await;
            let id = *next;
            *next += 1;
            id
        };
        event.event_id = id;

        let mut events = self.events.write().await;
        if events.len() >= self.capacity {
            events.pop_front();
        }
        events.push_back(event);

        tracing::debug!(event_id = id, "Event recorded");
        Ok(id)
    }

    async fn merge_audio(
        &self,
        event_id: u64,
        transcript: &str,
        keywords: &BTreeSet<String>,
    ) -> bool {
        use crate::models::SignalType;

        let mut events = self.events.write().await;
        let Some(event) = events.iter_mut().find(|e| e.event_id == event_id) else {
            return false;
        };
        if event.signal != SignalType::Visual || event.merged_audio.is_some() {
            return false;
        }

        event.merged_audio = Some(MergedAudio {
            transcript: transcript.to_string(),
            keywords: keywords.clone(),
            merged_at: Utc::now(),
        });
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AlertEvent, AlertPayload, SignalType};

    fn alert(signal: SignalType) -> AlertEvent {
        AlertEvent {
            stream_id: "room-1".to_string(),
            signal,
            matched: BTreeSet::from(["person".to_string()]),
            payload: match signal {
                SignalType::Visual => AlertPayload::Image(vec![0xFF, 0xD8]),
                SignalType::Audio => AlertPayload::Transcript {
                    text: "help".to_string(),
                    sentiment: -1.0,
                },
            },
            timestamp: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_record_assigns_increasing_ids() {
        let store = MemoryEventStore::new(8);
        let a = store
            .record(StoredEvent::from_alert(&alert(SignalType::Visual), None))
            .await
            .unwrap();
        let b = store
            .record(StoredEvent::from_alert(&alert(SignalType::Audio), None))
            .await
            .unwrap();
        assert!(b > a);
        assert_eq!(store.len().await, 2);
    }

    #[tokio::test]
    async fn test_ring_buffer_evicts_oldest() {
        let store = MemoryEventStore::new(2);
        let first = store
            .record(StoredEvent::from_alert(&alert(SignalType::Visual), None))
            .await
            .unwrap();
        for _ in 0..2 {
            store
                .record(StoredEvent::from_alert(&alert(SignalType::Visual), None))
                .await
                .unwrap();
        }
        assert_eq!(store.len().await, 2);
        assert!(store.get(first).await.is_none());
    }

    #[tokio::test]
    async fn test_merge_only_into_visual_without_existing_audio() {
        let store = MemoryEventStore::new(8);
        let visual = store
            .record(StoredEvent::from_alert(&alert(SignalType::Visual), None))
            .await
            .unwrap();
        let audio = store
            .record(StoredEvent::from_alert(&alert(SignalType::Audio), None))
            .await
            .unwrap();

        let kw = BTreeSet::from(["help".to_string()]);
        assert!(!store.merge_audio(audio, "text", &kw).await);
        assert!(store.merge_audio(visual, "text", &kw).await);
        assert!(!store.merge_audio(visual, "again", &kw).await);
        assert!(!store.merge_audio(9999, "text", &kw).await);
    }

    #[tokio::test]
    async fn test_recent_newest_first() {
        let store = MemoryEventStore::new(8);
        let a = store
            .record(StoredEvent::from_alert(&alert(SignalType::Visual), None))
            .await
            .unwrap();
        let b = store
            .record(StoredEvent::from_alert(&alert(SignalType::Audio), None))
            .await
            .unwrap();

        let recent = store.recent(10).await;
        assert_eq!(recent[0].event_id, b);
        assert_eq!(recent[1].event_id, a);
    }
}
