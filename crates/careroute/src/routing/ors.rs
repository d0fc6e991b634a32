//! OpenRouteService driving directions client

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;

use super::{RoadRoute, RouteProvider, RoutingError};
use crate::config::RoutingConfig;
use crate::geo::{round_km, Coordinate};

/// Snap radius in meters for both route endpoints
const SNAP_RADIUS_M: u32 = 1000;

#[derive(Debug, Deserialize)]
struct DirectionsResponse {
    #[serde(default)]
    features: Vec<Feature>,
}

#[derive(Debug, Deserialize)]
struct Feature {
    #[serde(default)]
    geometry: Option<Geometry>,
    properties: Properties,
}

#[derive(Debug, Deserialize)]
struct Geometry {
    #[serde(default)]
    coordinates: Vec<[f64; 2]>,
}

#[derive(Debug, Deserialize)]
struct Properties {
    #[serde(default)]
    segments: Vec<Segment>,
}

#[derive(Debug, Deserialize)]
struct Segment {
    /// Meters
    #[serde(default)]
    distance: f64,
    /// Seconds
    #[serde(default)]
    duration: f64,
}

impl DirectionsResponse {
    fn into_route(self) -> Result<RoadRoute, RoutingError> {
        let feature = self
            .features
            .into_iter()
            .next()
            .ok_or_else(|| RoutingError::InvalidResponse("no features in response".to_string()))?;

        let segment = feature
            .properties
            .segments
            .first()
            .ok_or_else(|| RoutingError::InvalidResponse("no segments in response".to_string()))?;

        Ok(RoadRoute {
            distance_km: round_km(segment.distance / 1000.0),
            duration_min: round_km(segment.duration / 60.0),
            geometry: feature.geometry.map(|g| g.coordinates).unwrap_or_default(),
        })
    }
}

/// HTTP client for the OpenRouteService `driving-car` profile
#[derive(Debug, Clone)]
pub struct OrsClient {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
    max_retries: u32,
    initial_backoff: Duration,
}

impl OrsClient {
    pub fn new(api_key: impl Into<String>, config: &RoutingConfig) -> Result<Self, RoutingError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| RoutingError::Transport(e.to_string()))?;

        Ok(Self {
            client,
            endpoint: format!(
                "{}/v2/directions/driving-car/geojson",
                config.base_url.trim_end_matches('/')
            ),
            api_key: api_key.into(),
            max_retries: config.max_retries.max(1),
            initial_backoff: Duration::from_millis(config.initial_backoff_ms),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Delay before `attempt` (2-based): initial, then doubling, saturating
    fn backoff_delay(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(2));
        self.initial_backoff.saturating_mul(factor)
    }

    /// One request, no retries
    async fn request_once(
        &self,
        origin: Coordinate,
        destination: Coordinate,
    ) -> Result<RoadRoute, RoutingError> {
        let body = serde_json::json!({
            "coordinates": [[origin.lon, origin.lat], [destination.lon, destination.lat]],
            "radiuses": [SNAP_RADIUS_M, SNAP_RADIUS_M],
        });

        let response = self
            .client
            .post(&self.endpoint)
            .header("Authorization", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    RoutingError::Timeout
                } else {
                    RoutingError::Transport(e.to_string())
                }
            })?;

        let status = response.status();
        if status.is_success() {
            let parsed: DirectionsResponse = response
                .json()
                .await
                .map_err(|e| RoutingError::InvalidResponse(e.to_string()))?;
            return parsed.into_route();
        }

        if status.as_u16() == 429 {
            return Err(RoutingError::RateLimited);
        }

        let body = response.text().await.unwrap_or_default();
        Err(RoutingError::Api {
            status: status.as_u16(),
            body: body.chars().take(200).collect(),
        })
    }
}

#[async_trait]
impl RouteProvider for OrsClient {
    /// Retries timeouts, 429 and 5xx with exponential backoff; other failures return at once
    async fn compute_route(
        &self,
        origin: Coordinate,
        destination: Coordinate,
    ) -> Result<RoadRoute, RoutingError> {
        let mut last_error = None;

        for attempt in 1..=self.max_retries {
            if attempt > 1 {
                let delay = self.backoff_delay(attempt);
                tracing::info!(
                    "[ORS] Retrying in {:?} (attempt {}/{})",
                    delay,
                    attempt,
                    self.max_retries
                );
                tokio::time::sleep(delay).await;
            }

            match self.request_once(origin, destination).await {
                Ok(route) => {
                    tracing::debug!(
                        "[ORS] Route ({:.4}, {:.4}) -> ({:.4}, {:.4}): {} km",
                        origin.lat,
                        origin.lon,
                        destination.lat,
                        destination.lon,
                        route.distance_km
                    );
                    return Ok(route);
                }
                Err(e) if e.is_retryable() => {
                    tracing::warn!("[ORS] Retryable error: {}", e);
                    last_error = Some(e);
                }
                Err(e) => {
                    tracing::error!("[ORS] Request failed: {}", e);
                    return Err(e);
                }
            }
        }

        Err(RoutingError::RetriesExhausted {
            attempts: self.max_retries,
            last: last_error.map(|e| e.to_string()).unwrap_or_default(),
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    use super::*;

    const ROUTE_JSON: &str = r#"{
        "type": "FeatureCollection",
        "features": [{
            "type": "Feature",
            "geometry": {"type": "LineString", "coordinates": [[-77.04, -12.05], [-77.03, -12.06]]},
            "properties": {"segments": [{"distance": 2345.6, "duration": 390.0}]}
        }]
    }"#;

    #[test]
    fn test_parse_route() {
        let parsed: DirectionsResponse = serde_json::from_str(ROUTE_JSON).unwrap();
        let route = parsed.into_route().unwrap();
        assert_eq!(route.distance_km, 2.35);
        assert_eq!(route.duration_min, 6.5);
        assert_eq!(route.geometry.len(), 2);
    }

    #[test]
    fn test_parse_route_without_segments() {
        let json = r#"{"features": [{"properties": {"segments": []}}]}"#;
        let parsed: DirectionsResponse = serde_json::from_str(json).unwrap();
        assert!(matches!(parsed.into_route(), Err(RoutingError::InvalidResponse(_))));

        let empty: DirectionsResponse = serde_json::from_str("{}").unwrap();
        assert!(matches!(empty.into_route(), Err(RoutingError::InvalidResponse(_))));
    }

    /// Serve canned responses in order, one per connection
    async fn serve(responses: Vec<(u16, &'static str)>) -> (String, Arc<AtomicUsize>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = hits.clone();

        tokio::spawn(async move {
            for (status, body) in responses {
                let Ok((mut socket, _)) = listener.accept().await else {
                    return;
                };
                counter.fetch_add(1, Ordering::SeqCst);
                read_request(&mut socket).await;
                let reply = format!(
                    "HTTP/1.1 {status} Status\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                    body.len()
                );
                let _ = socket.write_all(reply.as_bytes()).await;
                let _ = socket.shutdown().await;
            }
        });

        (format!("http://{addr}"), hits)
    }

    async fn read_request(socket: &mut tokio::net::TcpStream) {
        let mut data = Vec::new();
        let mut buf = [0u8; 4096];
        loop {
            let Ok(n) = socket.read(&mut buf).await else { return };
            if n == 0 {
                return;
            }
            data.extend_from_slice(&buf[..n]);
            let text = String::from_utf8_lossy(&data);
            if let Some(end) = text.find("\r\n\r\n") {
                let length = text[..end]
                    .lines()
                    .find_map(|l| {
                        let (name, value) = l.split_once(':')?;
                        name.eq_ignore_ascii_case("content-length")
                            .then(|| value.trim().parse::<usize>().ok())
                            .flatten()
                    })
                    .unwrap_or(0);
                if data.len() >= end + 4 + length {
                    return;
                }
            }
        }
    }

    fn client(base_url: String) -> OrsClient {
        let config = RoutingConfig {
            base_url,
            timeout_secs: 5,
            max_retries: 3,
            initial_backoff_ms: 1,
            ..RoutingConfig::default()
        };
        OrsClient::new("test-key", &config).unwrap()
    }

    fn lima() -> (Coordinate, Coordinate) {
        (Coordinate::new(-12.05, -77.04), Coordinate::new(-12.06, -77.03))
    }

    #[test]
    fn test_endpoint() {
        let c = client("https://ors.example/".to_string());
        assert_eq!(c.endpoint(), "https://ors.example/v2/directions/driving-car/geojson");
    }

    #[test]
    fn test_backoff_doubles_and_saturates() {
        let mut c = client("http://localhost".to_string());
        c.initial_backoff = Duration::from_millis(100);
        assert_eq!(c.backoff_delay(2), Duration::from_millis(100));
        assert_eq!(c.backoff_delay(3), Duration::from_millis(200));
        assert_eq!(c.backoff_delay(5), Duration::from_millis(800));
        // Large retry counts saturate instead of overflowing
        assert_eq!(c.backoff_delay(40), Duration::from_millis(100) * u32::MAX);
        assert_eq!(c.backoff_delay(40), c.backoff_delay(34));
    }

    #[tokio::test]
    async fn test_retries_server_errors_then_succeeds() {
        let (url, hits) = serve(vec![(503, "{}"), (429, "{}"), (200, ROUTE_JSON)]).await;
        let (from, to) = lima();

        let route = client(url).compute_route(from, to).await.unwrap();
        assert_eq!(route.distance_km, 2.35);
        assert_eq!(hits.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_client_error_fails_fast() {
        let (url, hits) = serve(vec![(400, r#"{"error":"bad coordinates"}"#), (200, ROUTE_JSON)]).await;
        let (from, to) = lima();

        let err = client(url).compute_route(from, to).await.unwrap_err();
        assert!(matches!(err, RoutingError::Api { status: 400, .. }));
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_retries_exhausted() {
        let (url, _) = serve(vec![(500, "{}"), (502, "{}"), (503, "{}")]).await;
        let (from, to) = lima();

        let err = client(url).compute_route(from, to).await.unwrap_err();
        assert!(matches!(err, RoutingError::RetriesExhausted { attempts: 3, .. }));
    }
}
