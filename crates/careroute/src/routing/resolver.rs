//! Road distance with cache and straight-line fallback

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::cache::{cache_key, RouteCache};
use super::{RoadRoute, RouteProvider};
use crate::geo::{round_km, Coordinate};

/// Where a resolved distance came from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "source", rename_all = "snake_case")]
pub enum DistanceSource {
    /// Provider route, fresh or cached
    Road { cached: bool },
    /// Haversine distance used because the provider failed
    StraightLine { reason: String },
}

/// A distance that is always available
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoadDistance {
    pub distance_km: f64,
    /// Only known for road routes
    pub duration_min: Option<f64>,
    #[serde(flatten)]
    pub source: DistanceSource,
}

impl RoadDistance {
    pub fn is_road(&self) -> bool {
        matches!(self.source, DistanceSource::Road { .. })
    }

    fn road(route: &RoadRoute, cached: bool) -> Self {
        Self {
            distance_km: route.distance_km,
            duration_min: Some(route.duration_min),
            source: DistanceSource::Road { cached },
        }
    }
}

/// Composes a provider and a cache; never fails
#[derive(Clone)]
pub struct RoadDistanceResolver {
    provider: Arc<dyn RouteProvider>,
    cache: Arc<dyn RouteCache>,
}

impl RoadDistanceResolver {
    pub fn new(provider: Arc<dyn RouteProvider>, cache: Arc<dyn RouteCache>) -> Self {
        Self { provider, cache }
    }

    pub async fn resolve(&self, origin: Coordinate, destination: Coordinate) -> RoadDistance {
        let key = cache_key(origin, destination);

        if let Some(route) = self.cache.get(&key).await {
            return RoadDistance::road(&route, true);
        }

        match self.provider.compute_route(origin, destination).await {
            Ok(route) => {
                self.cache.put(&key, &route).await;
                RoadDistance::road(&route, false)
            }
            Err(e) => {
                tracing::warn!("Road route unavailable ({}), using straight-line distance", e);
                RoadDistance {
                    distance_km: round_km(origin.distance_km(&destination)),
                    duration_min: None,
                    source: DistanceSource::StraightLine {
                        reason: e.to_string(),
                    },
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;

    use super::*;
    use crate::routing::cache::InMemoryRouteCache;
    use crate::routing::RoutingError;

    struct MockProvider {
        outcome: Result<RoadRoute, RoutingError>,
        calls: AtomicUsize,
    }

    impl MockProvider {
        fn new(outcome: Result<RoadRoute, RoutingError>) -> Arc<Self> {
            Arc::new(Self {
                outcome,
                calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl RouteProvider for MockProvider {
        async fn compute_route(&self, _: Coordinate, _: Coordinate) -> Result<RoadRoute, RoutingError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.outcome.clone()
        }
    }

    fn endpoints() -> (Coordinate, Coordinate) {
        (Coordinate::new(-12.0464, -77.0428), Coordinate::new(-12.1, -77.0))
    }

    #[tokio::test]
    async fn test_road_route_is_cached() {
        let provider = MockProvider::new(Ok(RoadRoute::new(9.8, 21.0)));
        let resolver = RoadDistanceResolver::new(provider.clone(), Arc::new(InMemoryRouteCache::new()));
        let (from, to) = endpoints();

        let first = resolver.resolve(from, to).await;
        assert_eq!(first.distance_km, 9.8);
        assert_eq!(first.source, DistanceSource::Road { cached: false });

        let second = resolver.resolve(from, to).await;
        assert_eq!(second.source, DistanceSource::Road { cached: true });
        assert_eq!(second.duration_min, Some(21.0));
        assert_eq!(provider.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_failure_falls_back_to_haversine() {
        let provider = MockProvider::new(Err(RoutingError::Timeout));
        let cache = Arc::new(InMemoryRouteCache::new());
        let resolver = RoadDistanceResolver::new(provider, cache.clone());
        let (from, to) = endpoints();

        let distance = resolver.resolve(from, to).await;
        assert!(!distance.is_road());
        assert_eq!(distance.distance_km, round_km(from.distance_km(&to)));
        assert_eq!(distance.duration_min, None);
        match distance.source {
            DistanceSource::StraightLine { reason } => assert!(reason.contains("timed out")),
            other => panic!("unexpected source {other:?}"),
        }
        // Failures are not cached
        assert!(cache.is_empty().await);
    }

    #[test]
    fn test_serialized_shape() {
        let distance = RoadDistance {
            distance_km: 3.0,
            duration_min: None,
            source: DistanceSource::StraightLine {
                reason: "Routing request timed out".to_string(),
            },
        };
        let value = serde_json::to_value(&distance).unwrap();
        assert_eq!(value["source"], "straight_line");
        assert_eq!(value["distanceKm"], 3.0);
        assert_eq!(value["reason"], "Routing request timed out");
    }

    #[test]
    fn test_resolve_blocking() {
        let provider = MockProvider::new(Ok(RoadRoute::new(1.5, 3.0)));
        let resolver = RoadDistanceResolver::new(provider, Arc::new(InMemoryRouteCache::new()));
        let (from, to) = endpoints();

        let distance = tokio_test::block_on(resolver.resolve(from, to));
        assert!(distance.is_road());
    }
}
