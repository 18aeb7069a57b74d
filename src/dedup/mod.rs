//! Alert deduplication and rate limiting
//!
//! ## Responsibilities
//!
//! - Suppress visual alerts whose matched set equals the previous frame's
//! - Suppress audio alerts repeating the previous transcript within the
//!   cooldown period
//! - Cap admitted audio alerts per stream per cooldown period
//!
//! One gate per session; state resets when the session restarts.

use crate::models::{AlertEvent, SignalType};
use chrono::{DateTime, Duration, Utc};
use std::collections::{BTreeSet, VecDeque};

/// Per-session admission gate
pub struct AlertGate {
    cooldown: Duration,
    audio_quota: usize,
    last_visual: Option<BTreeSet<String>>,
    last_audio: Option<(String, DateTime<Utc>)>,
    recent_audio: VecDeque<DateTime<Utc>>,
}

impl AlertGate {
    pub fn new(cooldown: std::time::Duration, audio_quota: usize) -> Self {
        Self {
            cooldown: Duration::from_std(cooldown).unwrap_or_else(|_| Duration::seconds(60)),
            audio_quota,
            last_visual: None,
            last_audio: None,
            recent_audio: VecDeque::new(),
        }
    }

    /// Admit or suppress; state advances only on admission
    pub fn admit(&mut self, event: &AlertEvent) -> bool {
        match event.signal {
            SignalType::Visual => self.admit_visual(event),
            SignalType::Audio => self.admit_audio(event),
        }
    }

    fn admit_visual(&mut self, event: &AlertEvent) -> bool {
        if self.last_visual.as_ref() == Some(&event.matched) {
            tracing::debug!(stream_id = %event.stream_id, "Visual alert suppressed: unchanged matched set");
            return false;
        }
        self.last_visual = Some(event.matched.clone());
        true
    }

    fn admit_audio(&mut self, event: &AlertEvent) -> bool {
        let text = event.payload.transcript().unwrap_or_default();
        let now = event.timestamp;

        if let Some((last_text, last_at)) = &self.last_audio {
            if last_text == text && now - *last_at < self.cooldown {
                tracing::debug!(stream_id = %event.stream_id, "Audio alert suppressed: repeated transcript");
                return false;
            }
        }

        self.recent_audio
            .retain(|t| now - *t < self.cooldown);
        if self.recent_audio.len() >= self.audio_quota {
            tracing::debug!(stream_id = %event.stream_id, "Audio alert suppressed: quota exhausted");
            return false;
        }

        self.last_audio = Some((text.to_string(), now));
        self.recent_audio.push_back(now);
        true
    }
}
