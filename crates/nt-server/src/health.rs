//! Health checks
//!
//! Liveness answers as long as the process serves requests; readiness also
//! pings the database when one is configured.

use std::time::Instant;

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use nt_db::Database;
use serde::Serialize;
use tracing::warn;

/// Health check status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Unhealthy,
}

/// Storage backend health
#[derive(Debug, Clone, Serialize)]
pub struct StorageHealth {
    pub backend: &'static str,
    pub status: HealthStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub response_time_ms: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct HealthReport {
    pub status: HealthStatus,
    pub version: &'static str,
    pub storage: StorageHealth,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

impl HealthReport {
    pub fn http_status(&self) -> StatusCode {
        match self.status {
            HealthStatus::Healthy => StatusCode::OK,
            HealthStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

/// Health routes state
#[derive(Clone, Default)]
pub struct HealthState {
    pub db: Option<Database>,
}

impl HealthState {
    pub async fn check(&self) -> HealthReport {
        let start = Instant::now();
        let storage = match &self.db {
            None => StorageHealth {
                backend: "memory",
                status: HealthStatus::Healthy,
                message: None,
                response_time_ms: 0,
            },
            Some(db) => {
                let result = db.ping().await;
                let elapsed = start.elapsed().as_millis() as u64;
                match result {
                    Ok(()) => StorageHealth {
                        backend: "postgres",
                        status: HealthStatus::Healthy,
                        message: Some(format!("{} connections, {} idle", db.stats().size, db.stats().idle)),
                        response_time_ms: elapsed,
                    },
                    Err(e) => {
                        warn!(error = %e, "database health check failed");
                        StorageHealth {
                            backend: "postgres",
                            status: HealthStatus::Unhealthy,
                            message: Some(e.to_string()),
                            response_time_ms: elapsed,
                        }
                    }
                }
            }
        };

        HealthReport {
            status: storage.status,
            version: env!("CARGO_PKG_VERSION"),
            storage,
            timestamp: chrono::Utc::now(),
        }
    }
}

/// GET /health/live
pub async fn liveness() -> &'static str {
    "OK"
}

/// GET /health/ready
pub async fn readiness(State(state): State<HealthState>) -> (StatusCode, Json<HealthReport>) {
    let report = state.check().await;
    (report.http_status(), Json(report))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_backend_is_healthy() {
        let report = HealthState::default().check().await;
        assert_eq!(report.status, HealthStatus::Healthy);
        assert_eq!(report.storage.backend, "memory");
        assert_eq!(report.http_status(), StatusCode::OK);
    }
}
