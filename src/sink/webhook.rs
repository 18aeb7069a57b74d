//! Webhook notifier
//!
//! Posts one JSON document per alert. Visual alerts carry the annotated
//! snapshot base64-encoded; if delivery with the image fails, a text-only
//! retry is attempted so the operator still hears about the alert.

use async_trait::async_trait;
use base64::Engine;
use serde::Serialize;
use std::time::Duration;

use super::dispatch::{Notification, Notifier};
use crate::error::Result;

#[derive(Serialize)]
struct WebhookBody<'a> {
    event_id: u64,
    stream_id: &'a str,
    platform: &'a str,
    streamer_name: &'a str,
    signal: &'a str,
    matched: Vec<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    transcript: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    image_base64: Option<String>,
}

/// WebhookNotifier instance
pub struct WebhookNotifier {
    client: reqwest::Client,
    url: String,
}

impl WebhookNotifier {
    pub fn new(url: String, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { client, url })
    }

    fn body<'a>(&self, n: &'a Notification, with_image: bool) -> WebhookBody<'a> {
        WebhookBody {
            event_id: n.event_id,
            stream_id: &n.stream_id,
            platform: &n.platform,
            streamer_name: &n.streamer_name,
            signal: n.signal.as_str(),
            matched: n.matched.iter().map(|s| s.as_str()).collect(),
            transcript: n.transcript.as_deref(),
            image_base64: if with_image {
                n.image
                    .as_ref()
                    .map(|img| base64::engine::general_purpose::STANDARD.encode(img))
            } else {
                None
            },
        }
    }

    async fn post(&self, body: &WebhookBody<'_>) -> std::result::Result<(), String> {
        let resp = self
            .client
            .post(&self.url)
            .json(body)
            .send()
            .await
            .map_err(|e| e.to_string())?;
        if resp.status().is_success() {
            Ok(())
        } else {
            Err(format!("webhook returned {}", resp.status()))
        }
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    async fn notify(&self, n: &Notification) {
        if self.post(&self.body(n, true)).await.is_ok() {
            return;
        }

        if n.image.is_some() {
            // Image payloads are the usual failure cause; retry without
            match self.post(&self.body(n, false)).await {
                Ok(()) => {
                    tracing::warn!(
                        event_id = n.event_id,
                        stream_id = %n.stream_id,
                        "Webhook delivered without image after failed attempt"
                    );
                    return;
                }
                Err(e) => {
                    tracing::error!(
                        event_id = n.event_id,
                        stream_id = %n.stream_id,
                        error = %e,
                        "Webhook delivery failed"
                    );
                    return;
                }
            }
        }

        tracing::error!(
            event_id = n.event_id,
            stream_id = %n.stream_id,
            "Webhook delivery failed"
        );
    }
}
