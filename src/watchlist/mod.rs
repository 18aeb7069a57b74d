//! Watch-list snapshot cache
//!
//! ## Responsibilities
//!
//! - Load flagged object classes (with per-label thresholds) and keywords
//!   from the external configuration store
//! - Hand out immutable snapshots for one detection cycle
//! - Hot-reload via guarded Arc swap: a refresh never exposes a
//!   half-updated list to a concurrent cycle

use crate::error::Result;
use async_trait::async_trait;
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use tokio::sync::RwLock;

/// One watched object class with its confidence threshold
#[derive(Debug, Clone, PartialEq)]
pub struct ObjectRule {
    pub label: String,
    pub threshold: f32,
}

/// External configuration store seam (polled, never pushed)
#[async_trait]
pub trait WatchlistProvider: Send + Sync {
    async fn watched_objects(&self) -> Result<Vec<ObjectRule>>;
    async fn watched_keywords(&self) -> Result<Vec<String>>;
}

/// Immutable per-cycle view of the watch-list
#[derive(Debug, Default)]
pub struct WatchlistSnapshot {
    objects: HashMap<String, f32>,
    keywords: Vec<String>,
}

impl WatchlistSnapshot {
    fn new(objects: Vec<ObjectRule>, keywords: Vec<String>) -> Self {
        Self {
            objects: objects
                .into_iter()
                .map(|r| (r.label.to_lowercase(), r.threshold))
                .collect(),
            keywords: keywords.into_iter().map(|k| k.to_lowercase()).collect(),
        }
    }

    /// Threshold for a label, if watched (label compared case-insensitively)
    pub fn object_threshold(&self, label: &str) -> Option<f32> {
        self.objects.get(&label.to_lowercase()).copied()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty() && self.keywords.is_empty()
    }

    /// Case-insensitive substring match of watched keywords in `text`
    pub fn matched_keywords(&self, text: &str) -> BTreeSet<String> {
        let lower = text.to_lowercase();
        self.keywords
            .iter()
            .filter(|k| lower.contains(k.as_str()))
            .cloned()
            .collect()
    }
}

/// WatchlistCache instance
pub struct WatchlistCache {
    provider: Arc<dyn WatchlistProvider>,
    current: RwLock<Arc<WatchlistSnapshot>>,
}

impl WatchlistCache {
    /// Create an empty cache; call `refresh` before first use
    pub fn new(provider: Arc<dyn WatchlistProvider>) -> Self {
        Self {
            provider,
            current: RwLock::new(Arc::new(WatchlistSnapshot::default())),
        }
    }

    /// Reload from the provider and swap the snapshot atomically
    pub async fn refresh(&self) -> Result<()> {
        let objects = self.provider.watched_objects().await?;
        let keywords = self.provider.watched_keywords().await?;
        let snapshot = Arc::new(WatchlistSnapshot::new(objects, keywords));

        let object_count = snapshot.objects.len();
        let keyword_count = snapshot.keywords.len();

        *self.current.write().await = snapshot;

        tracing::debug!(
            objects = object_count,
            keywords = keyword_count,
            "Watch-list refreshed"
        );
        Ok(())
    }

    /// Current snapshot for one detection cycle
    pub async fn snapshot(&self) -> Arc<WatchlistSnapshot> {
        self.current.read().await.clone()
    }
}

/// Fixed watch-list, for env-configured deployments and tests
pub struct StaticWatchlist {
    objects: Vec<ObjectRule>,
    keywords: Vec<String>,
}

impl StaticWatchlist {
    pub fn new(objects: Vec<ObjectRule>, keywords: Vec<String>) -> Self {
        Self { objects, keywords }
    }

    /// Parse `label:threshold,label:threshold` pairs (threshold defaults to 0.8)
    pub fn from_spec(objects: &str, keywords: &str) -> Self {
        let objects = objects
            .split(',')
            .filter(|s| !s.trim().is_empty())
            .map(|pair| {
                let mut parts = pair.splitn(2, ':');
                let label = parts.next().unwrap_or_default().trim().to_string();
                let threshold = parts
                    .next()
                    .and_then(|t| t.trim().parse().ok())
                    .unwrap_or(0.8);
                ObjectRule { label, threshold }
            })
            .collect();
        let keywords = keywords
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();
        Self { objects, keywords }
    }
}

#[async_trait]
impl WatchlistProvider for StaticWatchlist {
    async fn watched_objects(&self) -> Result<Vec<ObjectRule>> {
        Ok(self.objects.clone())
    }

    async fn watched_keywords(&self) -> Result<Vec<String>> {
        Ok(self.keywords.clone())
    }
}
