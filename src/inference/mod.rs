//! Inference model seams
//!
//! ## Responsibilities
//!
//! - Define the detector, transcriber and sentiment seams the pipelines
//!   call into
//! - Hold the per-process `ModelRegistry` built once at startup; a model
//!   that fails to initialize leaves its modality disabled rather than
//!   failing the engine

pub mod http;
pub mod sentiment;

use crate::error::Result;
use crate::models::Detection;
use async_trait::async_trait;
use std::sync::Arc;

/// Object detection over one JPEG frame
#[async_trait]
pub trait ObjectDetector: Send + Sync {
    /// All detections in the frame, unfiltered
    async fn detect(&self, jpeg: &[u8]) -> Result<Vec<Detection>>;
}

/// Speech recognition over one fixed-length mono f32 window
#[async_trait]
pub trait Transcriber: Send + Sync {
    /// Transcribe `samples` (mono, 16 kHz, padded/trimmed to `input_samples`)
    async fn transcribe(&self, samples: &[f32]) -> Result<String>;

    /// Fixed model input length in samples
    fn input_samples(&self) -> usize {
        16_000 * 30
    }
}

/// Polarity score for a transcript, in [-1.0, 1.0]
pub trait SentimentScorer: Send + Sync {
    fn score(&self, text: &str) -> f32;
}

/// Models shared by every session
///
/// Built once at startup. `None` means the modality is disabled for the
/// whole process.
#[derive(Clone)]
pub struct ModelRegistry {
    pub detector: Option<Arc<dyn ObjectDetector>>,
    pub transcriber: Option<Arc<dyn Transcriber>>,
    pub sentiment: Arc<dyn SentimentScorer>,
}

impl ModelRegistry {
    pub fn new(
        detector: Option<Arc<dyn ObjectDetector>>,
        transcriber: Option<Arc<dyn Transcriber>>,
        sentiment: Arc<dyn SentimentScorer>,
    ) -> Self {
        if detector.is_none() {
            tracing::warn!("Object detection disabled: no detector configured");
        }
        if transcriber.is_none() {
            tracing::warn!("Transcription disabled: no transcriber configured");
        }
        Self {
            detector,
            transcriber,
            sentiment,
        }
    }
}
