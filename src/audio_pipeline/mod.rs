//! Audio transcription pipeline
//!
//! ## Responsibilities
//!
//! - Accumulate raw s16le audio until a full window is buffered
//! - Convert, resample and pad the window to the transcriber's fixed input
//! - Transcribe, score sentiment, and match watched keywords
//! - Clear the buffer every time a window is consumed, even when
//!   transcription fails, so one bad window never snowballs

pub mod resample;

use crate::error::Result;
use crate::inference::{SentimentScorer, Transcriber};
use crate::models::{AlertEvent, AlertPayload, SignalType};
use crate::watchlist::WatchlistSnapshot;
use chrono::Utc;
use std::sync::Arc;

const TARGET_RATE: u32 = 16_000;

/// Per-session audio pipeline
pub struct AudioPipeline {
    transcriber: Arc<dyn Transcriber>,
    sentiment: Arc<dyn SentimentScorer>,
    stream_id: String,
    source_rate: u32,
    channels: u16,
    window_bytes: usize,
    buffer: Vec<u8>,
}

impl AudioPipeline {
    /// `window_secs` is the accumulation window; source format defaults to
    /// the demuxer's 16 kHz mono output
    pub fn new(
        transcriber: Arc<dyn Transcriber>,
        sentiment: Arc<dyn SentimentScorer>,
        stream_id: String,
        window_secs: u32,
    ) -> Self {
        Self::with_source_format(transcriber, sentiment, stream_id, window_secs, TARGET_RATE, 1)
    }

    pub fn with_source_format(
        transcriber: Arc<dyn Transcriber>,
        sentiment: Arc<dyn SentimentScorer>,
        stream_id: String,
        window_secs: u32,
        source_rate: u32,
        channels: u16,
    ) -> Self {
        let window_bytes =
            window_secs as usize * source_rate as usize * channels as usize * 2;
        Self {
            transcriber,
            sentiment,
            stream_id,
            source_rate,
            channels,
            window_bytes,
            buffer: Vec::with_capacity(window_bytes),
        }
    }

    /// Feed one raw chunk; returns an alert when a completed window matched
    /// watched keywords
    pub async fn on_chunk(
        &mut self,
        chunk: &[u8],
        watchlist: &WatchlistSnapshot,
    ) -> Result<Option<AlertEvent>> {
        self.buffer.extend_from_slice(chunk);
        if self.buffer.len() < self.window_bytes {
            return Ok(None);
        }

        // Take the window up front so the buffer is empty on every exit path
        let window = std::mem::take(&mut self.buffer);
        self.process_window(&window, watchlist).await
    }

    async fn process_window(
        &self,
        window: &[u8],
        watchlist: &WatchlistSnapshot,
    ) -> Result<Option<AlertEvent>> {
        let mut samples = to_f32(window);
        if self.channels > 1 {
            samples = downmix(&samples, self.channels as usize);
        }
        if self.source_rate != TARGET_RATE {
            samples = resample::resample(&samples, self.source_rate, TARGET_RATE)?;
        }
        pad_or_trim(&mut samples, self.transcriber.input_samples());

        let text = self.transcriber.transcribe(&samples).await?;
        if text.is_empty() {
            return Ok(None);
        }

        let matched = watchlist.matched_keywords(&text);
        if matched.is_empty() {
            tracing::debug!(stream_id = %self.stream_id, "Transcript had no watched keywords");
            return Ok(None);
        }

        let sentiment = self.sentiment.score(&text);
        tracing::info!(
            stream_id = %self.stream_id,
            matched = ?matched,
            sentiment = sentiment,
            "Flagged keywords heard"
        );

        Ok(Some(AlertEvent {
            stream_id: self.stream_id.clone(),
            signal: SignalType::Audio,
            matched,
            payload: AlertPayload::Transcript { text, sentiment },
            timestamp: Utc::now(),
        }))
    }

    #[cfg(test)]
    fn buffered_bytes(&self) -> usize {
        self.buffer.len()
    }
}

/// s16le bytes to normalized f32 samples
fn to_f32(bytes: &[u8]) -> Vec<f32> {
    bytes
        .chunks_exact(2)
        .map(|b| i16::from_le_bytes([b[0], b[1]]) as f32 / 32768.0)
        .collect()
}

/// Average interleaved channels down to mono
fn downmix(samples: &[f32], channels: usize) -> Vec<f32> {
    samples
        .chunks(channels)
        .map(|frame| frame.iter().sum::<f32>() / frame.len() as f32)
        .collect()
}

/// Zero-pad or truncate to the model's fixed input length
fn pad_or_trim(samples: &mut Vec<f32>, len: usize) {
    samples.resize(len, 0.0);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::inference::sentiment::LexiconSentiment;
    use crate::watchlist::{StaticWatchlist, WatchlistCache};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingTranscriber {
        text: String,
        calls: AtomicUsize,
        fail: bool,
    }

    impl CountingTranscriber {
        fn returning(text: &str) -> Arc<Self> {
            Arc::new(Self {
                text: text.to_string(),
                calls: AtomicUsize::new(0),
                fail: false,
            })
        }

        fn failing() -> Arc<Self> {
            Arc::new(Self {
                text: String::new(),
                calls: AtomicUsize::new(0),
                fail: true,
            })
        }
    }

    #[async_trait]
    impl Transcriber for CountingTranscriber {
        async fn transcribe(&self, samples: &[f32]) -> Result<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            assert_eq!(samples.len(), self.input_samples());
            if self.fail {
                return Err(Error::ModelUnavailable("down".to_string()));
            }
            Ok(self.text.clone())
        }
    }

    async fn keywords(words: &[&str]) -> Arc<WatchlistSnapshot> {
        let list = StaticWatchlist::new(
            vec![],
            words.iter().map(|w| w.to_string()).collect(),
        );
        let cache = WatchlistCache::new(Arc::new(list));
        cache.refresh().await.unwrap();
        cache.snapshot().await
    }

    fn pipeline(transcriber: Arc<CountingTranscriber>) -> AudioPipeline {
        AudioPipeline::new(
            transcriber,
            Arc::new(LexiconSentiment),
            "room-1".to_string(),
            5,
        )
    }

    // 5 s window at 16 kHz mono s16le
    const WINDOW_BYTES: usize = 5 * 16_000 * 2;

    #[tokio::test]
    async fn test_window_triggers_exactly_one_transcription() {
        let transcriber = CountingTranscriber::returning("please help me");
        let mut pipeline = pipeline(transcriber.clone());
        let snap = keywords(&["help"]).await;

        // Partial chunk: buffered, no call
        let half = vec![0u8; WINDOW_BYTES / 2];
        assert!(pipeline.on_chunk(&half, &snap).await.unwrap().is_none());
        assert_eq!(transcriber.calls.load(Ordering::SeqCst), 0);

        // Completing chunk: one call, one alert
        let event = pipeline.on_chunk(&half, &snap).await.unwrap().unwrap();
        assert_eq!(transcriber.calls.load(Ordering::SeqCst), 1);
        assert_eq!(event.signal, SignalType::Audio);
        assert_eq!(event.matched, std::collections::BTreeSet::from(["help".to_string()]));
        assert_eq!(pipeline.buffered_bytes(), 0);
    }

    #[tokio::test]
    async fn test_buffer_cleared_on_transcription_failure() {
        let transcriber = CountingTranscriber::failing();
        let mut pipeline = pipeline(transcriber);
        let snap = keywords(&["help"]).await;

        let window = vec![0u8; WINDOW_BYTES];
        assert!(pipeline.on_chunk(&window, &snap).await.is_err());
        assert_eq!(pipeline.buffered_bytes(), 0);
    }

    #[tokio::test]
    async fn test_no_keyword_no_alert() {
        let transcriber = CountingTranscriber::returning("lovely weather today");
        let mut pipeline = pipeline(transcriber);
        let snap = keywords(&["help"]).await;

        let window = vec![0u8; WINDOW_BYTES];
        assert!(pipeline.on_chunk(&window, &snap).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_empty_transcript_short_circuits() {
        let transcriber = CountingTranscriber::returning("");
        let mut pipeline = pipeline(transcriber);
        let snap = keywords(&["help"]).await;

        let window = vec![0u8; WINDOW_BYTES];
        assert!(pipeline.on_chunk(&window, &snap).await.unwrap().is_none());
    }

    #[test]
    fn test_to_f32_normalization() {
        let bytes = i16::MAX.to_le_bytes();
        let samples = to_f32(&bytes);
        assert!((samples[0] - 0.99997).abs() < 0.001);

        let bytes = i16::MIN.to_le_bytes();
        assert_eq!(to_f32(&bytes)[0], -1.0);
    }

    #[test]
    fn test_downmix_stereo() {
        let mono = downmix(&[1.0, 0.0, 0.5, 0.5], 2);
        assert_eq!(mono, vec![0.5, 0.5]);
    }

    #[test]
    fn test_pad_or_trim() {
        let mut short = vec![0.5; 10];
        pad_or_trim(&mut short, 16);
        assert_eq!(short.len(), 16);
        assert_eq!(short[15], 0.0);

        let mut long = vec![0.5; 32];
        pad_or_trim(&mut long, 16);
        assert_eq!(long.len(), 16);
    }
}
