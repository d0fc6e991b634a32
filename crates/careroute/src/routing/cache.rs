//! Route cache shared across requests
//!
//! Entries never expire. Concurrent misses on the same key may compute the route
//! twice; the last write wins.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::RoadRoute;
use crate::geo::Coordinate;

/// Key for a directed origin -> destination pair, 6 decimal places per component
pub fn cache_key(origin: Coordinate, destination: Coordinate) -> String {
    format!(
        "{:.6}_{:.6}_to_{:.6}_{:.6}",
        origin.lat, origin.lon, destination.lat, destination.lon
    )
}

/// Thread-safe key/value store for computed routes
#[async_trait]
pub trait RouteCache: Send + Sync {
    async fn get(&self, key: &str) -> Option<RoadRoute>;

    async fn put(&self, key: &str, route: &RoadRoute);
}

/// Process-local cache
#[derive(Debug, Clone, Default)]
pub struct InMemoryRouteCache {
    entries: Arc<RwLock<HashMap<String, RoadRoute>>>,
}

impl InMemoryRouteCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

#[async_trait]
impl RouteCache for InMemoryRouteCache {
    async fn get(&self, key: &str) -> Option<RoadRoute> {
        self.entries.read().await.get(key).cloned()
    }

    async fn put(&self, key: &str, route: &RoadRoute) {
        self.entries
            .write()
            .await
            .insert(key.to_string(), route.clone());
    }
}

/// One JSON file per route under a directory
///
/// Read and write failures are logged and treated as misses.
#[derive(Debug, Clone)]
pub struct FileRouteCache {
    dir: PathBuf,
}

impl FileRouteCache {
    /// Use `dir`, creating it if needed
    pub async fn open(dir: impl Into<PathBuf>) -> std::io::Result<Self> {
        let dir = dir.into();
        tokio::fs::create_dir_all(&dir).await?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("route_{key}.json"))
    }
}

#[async_trait]
impl RouteCache for FileRouteCache {
    async fn get(&self, key: &str) -> Option<RoadRoute> {
        let path = self.path_for(key);
        let content = match tokio::fs::read(&path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
            Err(e) => {
                tracing::warn!("Route cache read error for {}: {}", path.display(), e);
                return None;
            }
        };

        match serde_json::from_slice(&content) {
            Ok(route) => {
                tracing::debug!("Route cache hit: {}", key);
                Some(route)
            }
            Err(e) => {
                tracing::warn!("Corrupt route cache entry {}: {}", path.display(), e);
                None
            }
        }
    }

    async fn put(&self, key: &str, route: &RoadRoute) {
        let path = self.path_for(key);
        let content = match serde_json::to_vec(route) {
            Ok(content) => content,
            Err(e) => {
                tracing::warn!("Failed to serialize route for cache: {}", e);
                return;
            }
        };
        if let Err(e) = tokio::fs::write(&path, content).await {
            tracing::warn!("Route cache write error for {}: {}", path.display(), e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key() -> String {
        cache_key(Coordinate::new(-12.05, -77.04), Coordinate::new(-12.0, -77.1234567))
    }

    #[test]
    fn test_cache_key_format() {
        assert_eq!(key(), "-12.050000_-77.040000_to_-12.000000_-77.123457");
    }

    #[test]
    fn test_cache_key_is_directed() {
        let a = Coordinate::new(1.0, 2.0);
        let b = Coordinate::new(3.0, 4.0);
        assert_ne!(cache_key(a, b), cache_key(b, a));
    }

    #[tokio::test]
    async fn test_in_memory_round_trip() {
        let cache = InMemoryRouteCache::new();
        assert!(cache.get(&key()).await.is_none());

        cache.put(&key(), &RoadRoute::new(4.2, 9.0)).await;
        assert_eq!(cache.get(&key()).await, Some(RoadRoute::new(4.2, 9.0)));
        assert_eq!(cache.len().await, 1);
    }

    #[tokio::test]
    async fn test_file_cache_persists_across_instances() {
        let dir = tempfile::tempdir().unwrap();
        let route = RoadRoute {
            distance_km: 7.5,
            duration_min: 12.25,
            geometry: vec![[-77.04, -12.05], [-77.1, -12.0]],
        };

        let cache = FileRouteCache::open(dir.path().join("routes")).await.unwrap();
        cache.put(&key(), &route).await;

        let reopened = FileRouteCache::open(dir.path().join("routes")).await.unwrap();
        assert_eq!(reopened.get(&key()).await, Some(route));
        assert!(reopened.dir().join(format!("route_{}.json", key())).exists());
    }

    #[tokio::test]
    async fn test_file_cache_corrupt_entry_is_miss() {
        let dir = tempfile::tempdir().unwrap();
        let cache = FileRouteCache::open(dir.path()).await.unwrap();
        std::fs::write(dir.path().join(format!("route_{}.json", key())), "not json").unwrap();

        assert!(cache.get(&key()).await.is_none());
    }
}
