//! Road routing collaborator
//!
//! A [`RouteProvider`] computes driving routes; [`resolver::RoadDistanceResolver`]
//! puts a cache in front of it and falls back to the straight-line distance.

pub mod cache;
pub mod ors;
pub mod resolver;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::geo::Coordinate;

/// A driving route between two coordinates
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoadRoute {
    pub distance_km: f64,
    pub duration_min: f64,
    /// Route polyline as `[lon, lat]` pairs, when the provider returns one
    #[serde(default)]
    pub geometry: Vec<[f64; 2]>,
}

impl RoadRoute {
    pub fn new(distance_km: f64, duration_min: f64) -> Self {
        Self {
            distance_km,
            duration_min,
            geometry: Vec::new(),
        }
    }
}

/// Why a route could not be computed
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RoutingError {
    #[error("Routing request timed out")]
    Timeout,

    #[error("Routing provider rate limit exceeded")]
    RateLimited,

    #[error("Routing API error ({status}): {body}")]
    Api { status: u16, body: String },

    #[error("Invalid routing response: {0}")]
    InvalidResponse(String),

    #[error("Routing transport error: {0}")]
    Transport(String),

    #[error("Routing failed after {attempts} attempts: {last}")]
    RetriesExhausted { attempts: u32, last: String },
}

impl RoutingError {
    /// Whether another attempt may succeed
    pub fn is_retryable(&self) -> bool {
        match self {
            RoutingError::Timeout | RoutingError::RateLimited | RoutingError::Transport(_) => true,
            RoutingError::Api { status, .. } => *status >= 500,
            RoutingError::InvalidResponse(_) | RoutingError::RetriesExhausted { .. } => false,
        }
    }
}

/// Source of road distances
#[async_trait]
pub trait RouteProvider: Send + Sync {
    async fn compute_route(
        &self,
        origin: Coordinate,
        destination: Coordinate,
    ) -> Result<RoadRoute, RoutingError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_errors() {
        assert!(RoutingError::Timeout.is_retryable());
        assert!(RoutingError::RateLimited.is_retryable());
        assert!(RoutingError::Api {
            status: 503,
            body: String::new()
        }
        .is_retryable());
        assert!(!RoutingError::Api {
            status: 400,
            body: String::new()
        }
        .is_retryable());
        assert!(!RoutingError::InvalidResponse("no segments".to_string()).is_retryable());
    }

    #[test]
    fn test_route_serializes_camel_case() {
        let value = serde_json::to_value(RoadRoute::new(12.5, 20.0)).unwrap();
        assert_eq!(value["distanceKm"], 12.5);
        assert_eq!(value["durationMin"], 20.0);
    }
}
