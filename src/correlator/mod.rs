//! Event correlator
//!
//! Folds an admitted audio alert into the stream's most recent visual
//! event when the two landed within the correlation window, so operators
//! see one combined record instead of two.

use crate::sink::EventStore;
use chrono::{DateTime, Duration, Utc};
use std::collections::BTreeSet;

/// Per-session correlator tracking the last recorded visual event
pub struct EventCorrelator {
    window: Duration,
    last_visual: Option<(u64, DateTime<Utc>)>,
}

impl EventCorrelator {
    pub fn new(window: std::time::Duration) -> Self {
        Self {
            window: Duration::from_std(window).unwrap_or_else(|_| Duration::seconds(5)),
            last_visual: None,
        }
    }

    /// Remember a freshly recorded visual event
    pub fn note_visual(&mut self, event_id: u64, at: DateTime<Utc>) {
        self.last_visual = Some((event_id, at));
    }

    /// Try to merge an audio alert into the recent visual event
    ///
    /// Returns true when the store accepted the merge; the caller then skips
    /// recording the audio alert as its own event.
    pub async fn try_merge(
        &self,
        store: &dyn EventStore,
        stream_id: &str,
        transcript: &str,
        keywords: &BTreeSet<String>,
        at: DateTime<Utc>,
    ) -> bool {
        let Some((event_id, visual_at)) = self.last_visual else {
            return false;
        };
        if at - visual_at > self.window || at < visual_at {
            return false;
        }

        let merged = store.merge_audio(event_id, transcript, keywords).await;
        if merged {
            tracing::info!(
                stream_id = %stream_id,
                event_id = event_id,
                "Audio alert merged into recent visual event"
            );
        }
        merged
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AlertEvent, AlertPayload, SignalType, StoredEvent};
    use crate::sink::MemoryEventStore;
    use chrono::TimeZone;
    use std::time::Duration as StdDuration;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
    }

    async fn record_visual(store: &MemoryEventStore, secs: i64) -> u64 {
        let alert = AlertEvent {
            stream_id: "room-1".to_string(),
            signal: SignalType::Visual,
            matched: BTreeSet::from(["person".to_string()]),
            payload: AlertPayload::Image(vec![0xFF, 0xD8]),
            timestamp: at(secs),
        };
        store
            .record(StoredEvent::from_alert(&alert, None))
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_merge_within_window() {
        let store = MemoryEventStore::new(16);
        let mut correlator = EventCorrelator::new(StdDuration::from_secs(5));

        let id = record_visual(&store, 0).await;
        correlator.note_visual(id, at(0));

        let keywords = BTreeSet::from(["help".to_string()]);
        assert!(
            correlator
                .try_merge(&store, "room-1", "please help", &keywords, at(3))
                .await
        );

        let event = store.get(id).await.unwrap();
        let merged = event.merged_audio.unwrap();
        assert_eq!(merged.transcript, "please help");
        assert_eq!(merged.keywords, keywords);
    }

    #[tokio::test]
    async fn test_no_merge_outside_window() {
        let store = MemoryEventStore::new(16);
        let mut correlator = EventCorrelator::new(StdDuration::from_secs(5));

        let id = record_visual(&store, 0).await;
        correlator.note_visual(id, at(0));

        let keywords = BTreeSet::from(["help".to_string()]);
        assert!(
            !correlator
                .try_merge(&store, "room-1", "please help", &keywords, at(10))
                .await
        );
        assert!(store.get(id).await.unwrap().merged_audio.is_none());
    }

    #[tokio::test]
    async fn test_no_merge_without_prior_visual() {
        let store = MemoryEventStore::new(16);
        let correlator = EventCorrelator::new(StdDuration::from_secs(5));

        let keywords = BTreeSet::from(["help".to_string()]);
        assert!(
            !correlator
                .try_merge(&store, "room-1", "please help", &keywords, at(0))
                .await
        );
    }

    #[tokio::test]
    async fn test_second_merge_rejected_by_store() {
        let store = MemoryEventStore::new(16);
        let mut correlator = EventCorrelator::new(StdDuration::from_secs(5));

        let id = record_visual(&store, 0).await;
        correlator.note_visual(id, at(0));

        let keywords = BTreeSet::from(["help".to_string()]);
        assert!(
            correlator
                .try_merge(&store, "room-1", "first", &keywords, at(1))
                .await
        );
        // The slot is taken; a later audio alert becomes its own event
        assert!(
            !correlator
                .try_merge(&store, "room-1", "second", &keywords, at(2))
                .await
        );
        assert_eq!(
            store.get(id).await.unwrap().merged_audio.unwrap().transcript,
            "first"
        );
    }
}
