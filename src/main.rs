//! streamwarden binary
//!
//! Wires the engine together from environment configuration and monitors
//! the streams listed in `STREAM_ROOMS` until interrupted.

use anyhow::Context;
use std::sync::Arc;
use std::time::Duration;
use streamwarden::config::EngineConfig;
use streamwarden::connection::{ffmpeg::FfmpegDemuxer, ConnectionManager};
use streamwarden::engine::MonitorEngine;
use streamwarden::inference::http::{HttpDetector, HttpTranscriber};
use streamwarden::inference::sentiment::LexiconSentiment;
use streamwarden::inference::{ModelRegistry, ObjectDetector, Transcriber};
use streamwarden::models::StreamRef;
use streamwarden::resolver::DirectResolver;
use streamwarden::session::SessionDeps;
use streamwarden::sink::dispatch::{LogNotifier, NotificationDispatcher, Notifier};
use streamwarden::sink::webhook::WebhookNotifier;
use streamwarden::sink::{EventStore, MemoryEventStore};
use streamwarden::watchlist::{StaticWatchlist, WatchlistCache};
use tracing_subscriber::EnvFilter;

const MODEL_TIMEOUT: Duration = Duration::from_secs(30);
const EVENT_CAPACITY: usize = 1000;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = EngineConfig::default();
    tracing::info!(
        reconnect_delay_secs = config.reconnect_delay.as_secs(),
        window_secs = config.window_secs,
        "streamwarden starting"
    );

    let registry = build_registry(&config).await;

    let watchlist = Arc::new(WatchlistCache::new(Arc::new(StaticWatchlist::from_spec(
        &std::env::var("WATCH_OBJECTS").unwrap_or_default(),
        &std::env::var("WATCH_KEYWORDS").unwrap_or_default(),
    ))));
    watchlist.refresh().await.context("load watch-list")?;

    let notifier: Arc<dyn Notifier> = match &config.webhook_url {
        Some(url) => Arc::new(WebhookNotifier::new(url.clone(), MODEL_TIMEOUT)?),
        None => {
            tracing::info!("No webhook configured, notifications go to the log");
            Arc::new(LogNotifier)
        }
    };
    let dispatcher = NotificationDispatcher::start(
        notifier,
        config.notify_queue_size,
        config.notify_workers,
    );

    let store: Arc<dyn EventStore> = Arc::new(MemoryEventStore::new(EVENT_CAPACITY));
    let connections = Arc::new(ConnectionManager::new(
        Arc::new(FfmpegDemuxer::new(config.video_fps)),
        config.probe_timeout,
    )?);

    let deps = Arc::new(SessionDeps {
        config,
        registry,
        watchlist,
        connections,
        store,
        dispatcher,
    });
    let engine = MonitorEngine::new(deps, Arc::new(DirectResolver));

    let rooms = std::env::var("STREAM_ROOMS").unwrap_or_default();
    for room in rooms.split(',').map(str::trim).filter(|r| !r.is_empty()) {
        let stream = StreamRef::Generic {
            room_url: room.to_string(),
        };
        if let Err(e) = engine.start_monitoring(&stream).await {
            tracing::error!(room = %room, error = %e, "Failed to start monitoring");
        }
    }

    tokio::signal::ctrl_c().await?;
    tracing::info!("Shutdown signal received");
    engine.shutdown().await;
    Ok(())
}

/// Build the model registry, disabling a modality when its service is
/// unconfigured or unhealthy
async fn build_registry(config: &EngineConfig) -> ModelRegistry {
    let detector: Option<Arc<dyn ObjectDetector>> = match &config.detector_url {
        Some(url) => match HttpDetector::new(url.clone(), MODEL_TIMEOUT) {
            Ok(d) if d.health_check().await => Some(Arc::new(d)),
            Ok(_) => {
                tracing::warn!(url = %url, "Detector unhealthy");
                None
            }
            Err(e) => {
                tracing::warn!(url = %url, error = %e, "Detector init failed");
                None
            }
        },
        None => None,
    };

    let transcriber: Option<Arc<dyn Transcriber>> = match &config.transcriber_url {
        Some(url) => match HttpTranscriber::new(url.clone(), MODEL_TIMEOUT) {
            Ok(t) if t.health_check().await => Some(Arc::new(t)),
            Ok(_) => {
                tracing::warn!(url = %url, "Transcriber unhealthy");
                None
            }
            Err(e) => {
                tracing::warn!(url = %url, error = %e, "Transcriber init failed");
                None
            }
        },
        None => None,
    };

    ModelRegistry::new(detector, transcriber, Arc::new(LexiconSentiment))
}
