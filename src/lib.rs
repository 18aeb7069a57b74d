//! streamwarden - live-stream detection engine
//!
//! Watches live broadcasts for flagged visual objects and spoken keywords.
//! One session per stream runs the demuxer, the detection pipelines, alert
//! dedup, correlation, persistence and notification.
//!
//! ## Modules
//!
//! - `engine` - session registry and control surface
//! - `session` - per-stream monitor loop
//! - `connection` - liveness probe and media demuxing
//! - `video_pipeline` / `audio_pipeline` - detection pipelines
//! - `watchlist` - watched objects and keywords
//! - `inference` - model seams and HTTP adapters
//! - `dedup` - alert admission gate
//! - `correlator` - visual/audio event merging
//! - `sink` - event store, dispatcher, webhook notifier
//! - `resolver` - stream reference to media address

pub mod audio_pipeline;
pub mod config;
pub mod connection;
pub mod correlator;
pub mod dedup;
pub mod engine;
pub mod error;
pub mod inference;
pub mod models;
pub mod resolver;
pub mod session;
pub mod sink;
pub mod video_pipeline;
pub mod watchlist;

pub use error::{Error, Result};
