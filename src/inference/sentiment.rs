//! Lexicon sentiment scorer
//!
//! Lightweight word-polarity scoring for transcripts. The score only
//! annotates alert payloads; it never gates keyword matching.

use super::SentimentScorer;

const NEGATIVE: &[&str] = &[
    "help", "hurt", "scared", "afraid", "stop", "no", "pain", "blood", "kill", "die", "hate",
    "angry", "fight", "attack", "danger", "emergency", "police", "fire", "gun", "knife", "threat",
    "crying", "scream",
];

const POSITIVE: &[&str] = &[
    "love", "happy", "great", "thanks", "thank", "good", "nice", "fun", "laugh", "wonderful",
    "amazing", "beautiful", "safe", "calm", "enjoy", "smile",
];

/// Word-count polarity scorer over fixed lexicons
#[derive(Default)]
pub struct LexiconSentiment;

impl SentimentScorer for LexiconSentiment {
    /// Score in [-1.0, 1.0]; 0.0 for neutral or empty text
    fn score(&self, text: &str) -> f32 {
        let mut pos = 0u32;
        let mut neg = 0u32;

        for word in text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
        {
            let lower = word.to_lowercase();
            if NEGATIVE.contains(&lower.as_str()) {
                neg += 1;
            } else if POSITIVE.contains(&lower.as_str()) {
                pos += 1;
            }
        }

        let total = pos + neg;
        if total == 0 {
            return 0.0;
        }
        (pos as f32 - neg as f32) / total as f32
    }
}
