//! HTTP model adapters
//!
//! Both inference services speak multipart over HTTP. The detector takes a
//! JPEG and returns labeled boxes; the transcriber takes a raw f32le sample
//! window and returns text.

use crate::error::{Error, Result};
use crate::models::Detection;
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use std::time::Duration;

use super::{ObjectDetector, Transcriber};

/// Detection response from the detector service
#[derive(Debug, Deserialize)]
struct DetectResponse {
    #[serde(default)]
    detections: Vec<DetectionWire>,
}

#[derive(Debug, Deserialize)]
struct DetectionWire {
    label: String,
    confidence: f32,
    /// `[x, y, width, height]` in pixels
    #[serde(default)]
    bbox: [u32; 4],
}

/// Object detector backed by an HTTP inference service
pub struct HttpDetector {
    client: reqwest::Client,
    base_url: String,
}

impl HttpDetector {
    pub fn new(base_url: String, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { client, base_url })
    }

    /// Check the service is up before enabling the modality
    pub async fn health_check(&self) -> bool {
        let url = format!("{}/healthz", self.base_url);
        match self.client.get(&url).send().await {
            Ok(resp) => resp.status().is_success(),
            Err(_) => false,
        }
    }
}

#[async_trait]
impl ObjectDetector for HttpDetector {
    async fn detect(&self, jpeg: &[u8]) -> Result<Vec<Detection>> {
        let url = format!("{}/v1/detect", self.base_url);

        let form = Form::new().part(
            "frame",
            Part::bytes(jpeg.to_vec())
                .file_name("frame.jpg")
                .mime_str("image/jpeg")?,
        );

        let resp = self.client.post(&url).multipart(form).send().await?;

        if !resp.status().is_success() {
            return Err(Error::ModelUnavailable(format!(
                "detector returned {}",
                resp.status()
            )));
        }

        let result: DetectResponse = resp.json().await?;
        Ok(result
            .detections
            .into_iter()
            .map(|d| Detection {
                label: d.label,
                confidence: d.confidence,
                bbox: d.bbox,
            })
            .collect())
    }
}

/// Transcription response from the speech service
#[derive(Debug, Deserialize)]
struct TranscribeResponse {
    #[serde(default)]
    text: String,
}

/// Transcriber backed by an HTTP speech-recognition service
///
/// The request pins decoding to deterministic settings so the same window
/// always yields the same transcript.
pub struct HttpTranscriber {
    client: reqwest::Client,
    base_url: String,
    input_samples: usize,
}

impl HttpTranscriber {
    pub fn new(base_url: String, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url,
            input_samples: 16_000 * 30,
        })
    }

    pub async fn health_check(&self) -> bool {
        let url = format!("{}/healthz", self.base_url);
        match self.client.get(&url).send().await {
            Ok(resp) => resp.status().is_success(),
            Err(_) => false,
        }
    }
}

#[async_trait]
impl Transcriber for HttpTranscriber {
    async fn transcribe(&self, samples: &[f32]) -> Result<String> {
        let url = format!("{}/v1/transcribe", self.base_url);

        let mut bytes = Vec::with_capacity(samples.len() * 4);
        for s in samples {
            bytes.extend_from_slice(&s.to_le_bytes());
        }

        let form = Form::new()
            .part(
                "audio",
                Part::bytes(bytes)
                    .file_name("window.f32le")
                    .mime_str("application/octet-stream")?,
            )
            .text("sample_rate", "16000")
            .text("temperature", "0.0")
            .text("timestamps", "false");

        let resp = self.client.post(&url).multipart(form).send().await?;

        if !resp.status().is_success() {
            return Err(Error::ModelUnavailable(format!(
                "transcriber returned {}",
                resp.status()
            )));
        }

        let result: TranscribeResponse = resp.json().await?;
        Ok(result.text.trim().to_string())
    }

    fn input_samples(&self) -> usize {
        self.input_samples
    }
}
