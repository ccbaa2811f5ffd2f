//! Health check endpoints for Kubernetes probes

use std::time::Instant;

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde::Serialize;
use tracing::warn;

use crate::domain::storage::RecordStore;
use crate::infrastructure::cache::CacheHealth;

use super::state::AppState;

/// Detailed health response with component status
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: HealthStatus,
    pub version: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub checks: Option<Vec<HealthCheck>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latency_ms: Option<u64>,
}

#[derive(Debug, Serialize, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Degraded,
    Unhealthy,
}

/// Individual component health check
#[derive(Debug, Serialize)]
pub struct HealthCheck {
    pub name: String,
    pub status: HealthStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latency_ms: Option<u64>,
}

pub async fn health_check() -> impl IntoResponse {
    let response = HealthResponse {
        status: HealthStatus::Healthy,
        version: env!("CARGO_PKG_VERSION").to_string(),
        checks: None,
        latency_ms: None,
    };

    (StatusCode::OK, Json(response))
}

/// Readiness: the store must answer; a slow or missing cache only degrades
pub async fn ready_check(State(state): State<AppState>) -> impl IntoResponse {
    let start = Instant::now();

    let checks = vec![check_store(&state).await, check_cache(&state).await];
    let overall_status = checks
        .iter()
        .map(|check| check.status)
        .max()
        .unwrap_or(HealthStatus::Healthy);

    if overall_status != HealthStatus::Healthy {
        warn!(status = ?overall_status, "Readiness check not healthy");
    }

    let response = HealthResponse {
        status: overall_status,
        version: env!("CARGO_PKG_VERSION").to_string(),
        checks: Some(checks),
        latency_ms: Some(start.elapsed().as_millis() as u64),
    };

    let status_code = match overall_status {
        HealthStatus::Healthy | HealthStatus::Degraded => StatusCode::OK,
        HealthStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
    };

    (status_code, Json(response))
}

pub async fn live_check() -> impl IntoResponse {
    StatusCode::OK
}

async fn check_store(state: &AppState) -> HealthCheck {
    let start = Instant::now();
    let result = state.store.ping().await;

    HealthCheck {
        name: "store".to_string(),
        status: if result.is_ok() {
            HealthStatus::Healthy
        } else {
            HealthStatus::Unhealthy
        },
        message: result.err().map(|e| e.to_string()),
        latency_ms: Some(start.elapsed().as_millis() as u64),
    }
}

async fn check_cache(state: &AppState) -> HealthCheck {
    let start = Instant::now();
    let health = state.cache.ping().await;

    let (status, message) = match health {
        CacheHealth::Healthy => (HealthStatus::Healthy, None),
        CacheHealth::Degraded => (HealthStatus::Degraded, Some("slow responses")),
        // Reads fall back to the store
        CacheHealth::Unavailable => (HealthStatus::Degraded, Some("unreachable")),
    };

    HealthCheck {
        name: "cache".to_string(),
        status,
        message: message.map(str::to_string),
        latency_ms: Some(start.elapsed().as_millis() as u64),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::cache::MockCache;
    use crate::domain::storage::mock::UnavailableStore;
    use crate::infrastructure::cache::CacheStore;
    use crate::infrastructure::services::ServiceContext;
    use crate::infrastructure::storage::InMemoryRecordStore;
    use axum::body::to_bytes;
    use axum::response::Response;
    use std::sync::Arc;
    use std::time::Duration;

    fn state(store: Arc<dyn RecordStore>, cache: MockCache) -> AppState {
        let cache = CacheStore::new(Arc::new(cache)).with_timeout(Duration::from_millis(100));
        AppState::new(store.clone(), ServiceContext::new(store, cache))
    }

    async fn body(response: Response) -> serde_json::Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_ready_when_everything_answers() {
        let state = state(Arc::new(InMemoryRecordStore::new()), MockCache::new());

        let response = ready_check(State(state)).await.into_response();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body(response).await["status"], "healthy");
    }

    #[tokio::test]
    async fn test_cache_outage_only_degrades() {
        let state = state(Arc::new(InMemoryRecordStore::new()), MockCache::failing());

        let response = ready_check(State(state)).await.into_response();
        assert_eq!(response.status(), StatusCode::OK);

        let json = body(response).await;
        assert_eq!(json["status"], "degraded");
        assert_eq!(json["checks"][1]["name"], "cache");
        assert_eq!(json["checks"][1]["message"], "unreachable");
    }

    #[tokio::test]
    async fn test_slow_cache_is_degraded() {
        let cache = MockCache::new().with_latency(Duration::from_millis(70));
        let state = state(Arc::new(InMemoryRecordStore::new()), cache);

        let response = ready_check(State(state)).await.into_response();
        let json = body(response).await;
        assert_eq!(json["checks"][1]["status"], "degraded");
    }

    #[tokio::test]
    async fn test_store_outage_is_unhealthy() {
        let state = state(Arc::new(UnavailableStore), MockCache::new());

        let response = ready_check(State(state)).await.into_response();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body(response).await["status"], "unhealthy");
    }

    #[test]
    fn test_health_status_serialization() {
        assert_eq!(
            serde_json::to_string(&HealthStatus::Degraded).unwrap(),
            "\"degraded\""
        );
        assert!(HealthStatus::Unhealthy > HealthStatus::Degraded);
    }

    #[tokio::test]
    async fn test_liveness_needs_no_state() {
        assert_eq!(live_check().await.into_response().status(), StatusCode::OK);
        assert_eq!(health_check().await.into_response().status(), StatusCode::OK);
    }
}
