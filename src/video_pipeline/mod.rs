//! Video detection pipeline
//!
//! ## Responsibilities
//!
//! - Run object detection on each sampled frame
//! - Filter detections against the watch-list (confidence at or above the
//!   per-label threshold matches)
//! - Annotate matched frames and emit at most one alert per frame carrying
//!   the full matched set

pub mod annotate;

use crate::error::Result;
use crate::inference::ObjectDetector;
use crate::models::{AlertEvent, AlertPayload, Detection, SignalType};
use crate::watchlist::WatchlistSnapshot;
use chrono::Utc;
use std::collections::BTreeSet;
use std::sync::Arc;

/// Per-session video pipeline
pub struct VideoPipeline {
    detector: Arc<dyn ObjectDetector>,
    stream_id: String,
}

impl VideoPipeline {
    pub fn new(detector: Arc<dyn ObjectDetector>, stream_id: String) -> Self {
        Self {
            detector,
            stream_id,
        }
    }

    /// Process one JPEG frame; `None` when nothing on the watch-list matched
    pub async fn on_frame(
        &self,
        jpeg: &[u8],
        watchlist: &WatchlistSnapshot,
    ) -> Result<Option<AlertEvent>> {
        let detections = self.detector.detect(jpeg).await?;
        let matched = filter_matches(&detections, watchlist);

        if matched.is_empty() {
            return Ok(None);
        }

        let labels: BTreeSet<String> =
            matched.iter().map(|d| d.label.to_lowercase()).collect();

        tracing::info!(
            stream_id = %self.stream_id,
            matched = ?labels,
            "Flagged objects detected"
        );

        // Annotation failure must not lose the alert; fall back to the raw frame
        let image = match annotate::draw_detections(jpeg, &matched) {
            Ok(annotated) => annotated,
            Err(e) => {
                tracing::warn!(stream_id = %self.stream_id, error = %e, "Annotation failed, using raw frame");
                jpeg.to_vec()
            }
        };

        Ok(Some(AlertEvent {
            stream_id: self.stream_id.clone(),
            signal: SignalType::Visual,
            matched: labels,
            payload: AlertPayload::Image(image),
            timestamp: Utc::now(),
        }))
    }
}

/// Detections whose label is watched and whose confidence meets its threshold
fn filter_matches<'a>(
    detections: &'a [Detection],
    watchlist: &WatchlistSnapshot,
) -> Vec<&'a Detection> {
    detections
        .iter()
        .filter(|d| {
            watchlist
                .object_threshold(&d.label)
                .map(|t| d.confidence >= t)
                .unwrap_or(false)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::watchlist::{ObjectRule, StaticWatchlist, WatchlistCache};
    use async_trait::async_trait;

    struct FixedDetector(Vec<Detection>);

    #[async_trait]
    impl ObjectDetector for FixedDetector {
        async fn detect(&self, _jpeg: &[u8]) -> Result<Vec<Detection>> {
            Ok(self.0.clone())
        }
    }

    async fn snapshot(rules: Vec<ObjectRule>) -> Arc<WatchlistSnapshot> {
        let cache = WatchlistCache::new(Arc::new(StaticWatchlist::new(rules, vec![])));
        cache.refresh().await.unwrap();
        cache.snapshot().await
    }

    fn det(label: &str, confidence: f32) -> Detection {
        Detection {
            label: label.to_string(),
            confidence,
            bbox: [4, 4, 8, 8],
        }
    }

    fn rule(label: &str, threshold: f32) -> ObjectRule {
        ObjectRule {
            label: label.to_string(),
            threshold,
        }
    }

    fn test_jpeg() -> Vec<u8> {
        annotate::tests::encode_blank_jpeg(32, 32)
    }

    #[tokio::test]
    async fn test_one_event_carries_full_matched_set() {
        let pipeline = VideoPipeline::new(
            Arc::new(FixedDetector(vec![
                det("person", 0.9),
                det("knife", 0.75),
                det("car", 0.99),
            ])),
            "room-1".to_string(),
        );
        let snap = snapshot(vec![rule("person", 0.8), rule("knife", 0.6)]).await;

        let event = pipeline.on_frame(&test_jpeg(), &snap).await.unwrap().unwrap();
        assert_eq!(event.signal, SignalType::Visual);
        assert_eq!(
            event.matched,
            BTreeSet::from(["person".to_string(), "knife".to_string()])
        );
    }

    #[tokio::test]
    async fn test_confidence_at_threshold_matches() {
        let pipeline = VideoPipeline::new(
            Arc::new(FixedDetector(vec![det("person", 0.8)])),
            "room-1".to_string(),
        );
        let snap = snapshot(vec![rule("person", 0.8)]).await;

        let event = pipeline.on_frame(&test_jpeg(), &snap).await.unwrap();
        assert!(event.is_some());
    }

    #[tokio::test]
    async fn test_below_threshold_no_event() {
        let pipeline = VideoPipeline::new(
            Arc::new(FixedDetector(vec![det("person", 0.79)])),
            "room-1".to_string(),
        );
        let snap = snapshot(vec![rule("person", 0.8)]).await;

        assert!(pipeline.on_frame(&test_jpeg(), &snap).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_unwatched_labels_ignored() {
        let pipeline = VideoPipeline::new(
            Arc::new(FixedDetector(vec![det("car", 0.99)])),
            "room-1".to_string(),
        );
        let snap = snapshot(vec![rule("person", 0.8)]).await;

        assert!(pipeline.on_frame(&test_jpeg(), &snap).await.unwrap().is_none());
    }
}
