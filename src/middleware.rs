use axum::extract::{ConnectInfo, Request, State};
use axum::middleware::Next;
use axum::response::Response;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::detector::BotDetector;
use crate::identity;
use crate::response;
use crate::storage::Storage;
use crate::throttle::{Decision, RequestContext, ThrottleGuard};

/// Shared application state.
#[derive(Clone)]
pub struct GuardState {
    pub guard: Arc<ThrottleGuard>,
    pub detector: Arc<BotDetector>,
    pub storage: Arc<dyn Storage>,
}

/// Screens every request before it reaches a handler: bot user agents and
/// already-blocked clients get the deterrent, throttled clients get a 429
/// with a retry hint, everything else passes through.
pub async fn guard_middleware(
    State(state): State<GuardState>,
    request: Request,
    next: Next,
) -> Response {
    let peer = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|info| info.0);
    let identifier = identity::client_identifier(request.headers(), peer);
    let user_agent = identity::user_agent(request.headers());

    if state.detector.is_bot(&user_agent) {
        warn!(
            client_ip = %identifier,
            user_agent = %user_agent,
            "suspicious user agent"
        );
        return response::deterrent();
    }

    if state.guard.is_blocked(&identifier).await {
        warn!(client_ip = %identifier, "blocked client");
        return response::deterrent();
    }

    let ctx = RequestContext::now(identifier, user_agent);
    match state.guard.check(&ctx).await {
        Decision::Normal => next.run(request).await,
        Decision::Throttled { retry_after } => {
            warn!(
                client_ip = %ctx.identifier,
                retry_after_secs = retry_after.as_secs(),
                "rate limit exceeded"
            );
            response::too_many_requests(retry_after)
        }
        Decision::Blocked => {
            warn!(client_ip = %ctx.identifier, "client escalated to blocked");
            response::deterrent()
        }
    }
}

/// Request/response logging with a per-request id.
pub async fn logging_middleware(request: Request, next: Next) -> Response {
    let request_id = Uuid::new_v4();
    let method = request.method().clone();
    let uri = request.uri().clone();
    let peer = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|info| info.0);
    let client_ip = identity::client_identifier(request.headers(), peer);

    info!(
        target: "trafficguard::middleware",
        request_id = %request_id,
        method = %method,
        uri = %uri,
        client_ip = %client_ip,
        "Incoming request"
    );

    let response = next.run(request).await;

    info!(
        target: "trafficguard::middleware",
        request_id = %request_id,
        method = %method,
        uri = %uri,
        status = %response.status(),
        "Request completed"
    );

    response
}
