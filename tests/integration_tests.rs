use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use http_body_util::BodyExt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;
use uuid::Uuid;

use trafficguard::{
    create_app, BotDetector, FileStorage, GuardState, ThrottleGuard, ThrottlePolicy,
};

const BROWSER_UA: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 Chrome/120.0.0.0 Safari/537.36";

async fn test_state(policy: ThrottlePolicy) -> GuardState {
    let dir: PathBuf =
        std::env::temp_dir().join(format!("trafficguard-itest-{}", Uuid::new_v4()));
    let storage: Arc<dyn trafficguard::Storage> =
        Arc::new(FileStorage::new(&dir).await.unwrap());

    GuardState {
        guard: Arc::new(ThrottleGuard::new(storage.clone(), policy).unwrap()),
        detector: Arc::new(BotDetector::new()),
        storage,
    }
}

fn request(ip: &str, user_agent: &str) -> Request<Body> {
    Request::builder()
        .uri("/")
        .header("x-forwarded-for", ip)
        .header("user-agent", user_agent)
        .body(Body::empty())
        .unwrap()
}

#[tokio::test]
async fn test_normal_request_passes_through() {
    let app = create_app(test_state(ThrottlePolicy::default()).await);

    let response = app
        .oneshot(request("203.0.113.1", BROWSER_UA))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = response.into_body().collect().await.unwrap().to_bytes();
    assert_eq!(&body[..], b"Welcome!");
}

#[tokio::test]
async fn test_bot_user_agent_gets_deterrent() {
    let app = create_app(test_state(ThrottlePolicy::default()).await);

    let response = app
        .oneshot(request("203.0.113.2", "curl/8.4.0"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_allowlisted_crawler_passes() {
    let app = create_app(test_state(ThrottlePolicy::default()).await);

    let response = app
        .oneshot(request(
            "203.0.113.3",
            "Mozilla/5.0 (compatible; Googlebot/2.1; +http://www.google.com/bot.html)",
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_burst_gets_throttled_with_retry_hint() {
    let mut policy = ThrottlePolicy::default();
    policy.limit_per_second = 3;
    policy.timeout = Duration::from_secs(7);
    let app = create_app(test_state(policy).await);

    // hammer until the limit trips; the window is one second, so a handful
    // of in-process requests is plenty
    let mut throttled = None;
    for _ in 0..50 {
        let response = app
            .clone()
            .oneshot(request("203.0.113.4", BROWSER_UA))
            .await
            .unwrap();
        if response.status() == StatusCode::TOO_MANY_REQUESTS {
            throttled = Some(response);
            break;
        }
        assert_eq!(response.status(), StatusCode::OK);
    }

    let response = throttled.expect("burst never tripped the rate limit");
    assert_eq!(
        response.headers().get(header::RETRY_AFTER).unwrap(),
        "7"
    );

    let body = response.into_body().collect().await.unwrap().to_bytes();
    let body: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(body["retry_after"], 7);
}

#[tokio::test]
async fn test_repeat_offender_escalates_to_blocked() {
    let mut policy = ThrottlePolicy::default();
    policy.limit_per_second = 2;
    policy.max_violations = 3;
    let state = test_state(policy).await;
    let app = create_app(state.clone());

    let mut saw_throttled = false;
    let mut saw_blocked = false;
    for _ in 0..100 {
        let response = app
            .clone()
            .oneshot(request("203.0.113.5", BROWSER_UA))
            .await
            .unwrap();
        match response.status() {
            StatusCode::TOO_MANY_REQUESTS => saw_throttled = true,
            StatusCode::FORBIDDEN => {
                saw_blocked = true;
                break;
            }
            status => assert_eq!(status, StatusCode::OK),
        }
    }

    assert!(saw_throttled);
    assert!(saw_blocked);
    assert!(state.guard.is_blocked("203.0.113.5").await);

    // once blocked, a lone polite request is still refused
    let response = app
        .oneshot(request("203.0.113.5", BROWSER_UA))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_unidentifiable_client_fails_open() {
    let mut policy = ThrottlePolicy::default();
    policy.limit_per_second = 1;
    let app = create_app(test_state(policy).await);

    // no forwarded-for header and no peer address: every request passes
    for _ in 0..10 {
        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .uri("/")
                    .header("user-agent", BROWSER_UA)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
}

#[tokio::test]
async fn test_health_endpoint_reports_backend_and_policy() {
    let app = create_app(test_state(ThrottlePolicy::default()).await);

    let response = app
        .oneshot(
            Request::builder()
                .uri("/health")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = response.into_body().collect().await.unwrap().to_bytes();
    let body: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["backend"], "file");
    assert_eq!(body["policy"]["limit_per_second"], 10);
}

#[tokio::test]
async fn test_health_endpoint_is_not_throttled() {
    let mut policy = ThrottlePolicy::default();
    policy.limit_per_second = 1;
    let app = create_app(test_state(policy).await);

    for _ in 0..10 {
        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .uri("/health")
                    .header("x-forwarded-for", "203.0.113.6")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
}
