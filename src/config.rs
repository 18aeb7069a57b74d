//! Engine configuration
//!
//! All knobs are env-var driven with sensible defaults so the binary can
//! start from a plain `.env` file.

use std::time::Duration;

/// Engine configuration
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Timeout for the liveness probe before opening a stream
    pub probe_timeout: Duration,
    /// Fixed delay between a mid-stream failure and the next re-open attempt
    pub reconnect_delay: Duration,
    /// Audio accumulation window duration in seconds (5-10)
    pub window_secs: u32,
    /// Dedup cooldown for audio alerts
    pub cooldown: Duration,
    /// Max admitted audio alerts per stream per cooldown period
    pub audio_quota: usize,
    /// Recency window for merging an audio alert into a visual event
    pub correlation_window: Duration,
    /// Bounded notification queue capacity
    pub notify_queue_size: usize,
    /// Notification worker count (sized independently from stream count)
    pub notify_workers: usize,
    /// Video sampling rate for the demuxer (frames per second)
    pub video_fps: u32,
    /// Object-detection service URL (modality disabled when unset)
    pub detector_url: Option<String>,
    /// Speech-recognition service URL (modality disabled when unset)
    pub transcriber_url: Option<String>,
    /// Notification webhook URL (log-only notifier when unset)
    pub webhook_url: Option<String>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            probe_timeout: Duration::from_secs(env_u64("PROBE_TIMEOUT_SECS", 10)),
            reconnect_delay: Duration::from_secs(env_u64("RECONNECT_DELAY_SECS", 5)),
            window_secs: env_u64("AUDIO_WINDOW_SECS", 5) as u32,
            cooldown: Duration::from_secs(env_u64("ALERT_COOLDOWN_SECS", 60)),
            audio_quota: env_u64("AUDIO_ALERT_QUOTA", 1) as usize,
            correlation_window: Duration::from_secs(env_u64("CORRELATION_WINDOW_SECS", 5)),
            notify_queue_size: env_u64("NOTIFY_QUEUE_SIZE", 64) as usize,
            notify_workers: env_u64("NOTIFY_WORKERS", 2) as usize,
            video_fps: env_u64("VIDEO_FPS", 1) as u32,
            detector_url: std::env::var("DETECTOR_URL").ok(),
            transcriber_url: std::env::var("TRANSCRIBER_URL").ok(),
            webhook_url: std::env::var("WEBHOOK_URL").ok(),
        }
    }
}

fn env_u64(key: &str, default: u64) -> u64 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
