//! Typed responses emitted by the boundary layer.

use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use std::time::Duration;

use crate::policy::ThrottlePolicy;
use crate::throttle::unix_now;

#[derive(Debug, Serialize)]
pub struct ThrottledBody {
    pub error: String,
    pub retry_after: u64,
}

#[derive(Debug, Serialize)]
pub struct HealthBody {
    pub status: String,
    pub timestamp: u64,
    pub version: String,
    pub backend: String,
    pub policy: ThrottlePolicy,
}

/// 429 with a `Retry-After` hint equal to the policy timeout.
pub fn too_many_requests(retry_after: Duration) -> Response {
    let secs = retry_after.as_secs();
    let body = ThrottledBody {
        error: "rate limit exceeded".to_string(),
        retry_after: secs,
    };

    (
        StatusCode::TOO_MANY_REQUESTS,
        [(header::RETRY_AFTER, secs.to_string())],
        Json(body),
    )
        .into_response()
}

/// Terminal response for blocked clients and detected bots.
pub fn deterrent() -> Response {
    (StatusCode::FORBIDDEN, "Forbidden\n").into_response()
}

pub fn health(backend: &str, reachable: bool, policy: &ThrottlePolicy) -> Response {
    let status = if reachable { "healthy" } else { "degraded" };
    let body = HealthBody {
        status: status.to_string(),
        timestamp: unix_now(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        backend: backend.to_string(),
        policy: policy.clone(),
    };

    Json(body).into_response()
}
