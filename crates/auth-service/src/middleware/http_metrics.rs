//! HTTP request metrics middleware.
//!
//! Applied as the outermost layer so responses generated before a handler
//! runs (404, 405, 415, JSON rejections) are counted too.

use axum::{extract::Request, middleware::Next, response::Response};
use std::time::Instant;

use crate::observability::metrics::record_http_request;

/// Record method, normalized path, status and duration for every response.
pub async fn http_metrics_middleware(request: Request, next: Next) -> Response {
    let start = Instant::now();
    let method = request.method().to_string();
    let path = request.uri().path().to_string();

    let response = next.run(request).await;

    record_http_request(
        &method,
        &path,
        response.status().as_u16(),
        start.elapsed(),
    );

    response
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use axum::{
        body::Body,
        http::{Request as HttpRequest, StatusCode},
        middleware,
        routing::post,
        Json, Router,
    };
    use metrics_util::debugging::{DebugValue, DebuggingRecorder};
    use tower::ServiceExt;

    async fn echo(Json(body): Json<serde_json::Value>) -> Json<serde_json::Value> {
        Json(body)
    }

    fn test_app() -> Router {
        Router::new()
            .route("/api/v1/auth/login", post(echo))
            .layer(middleware::from_fn(http_metrics_middleware))
    }

    fn request(method: &str, uri: &str, body: &str) -> HttpRequest<Body> {
        HttpRequest::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .expect("request builder should succeed")
    }

    #[tokio::test]
    async fn test_passes_responses_through() {
        let ok = test_app()
            .oneshot(request("POST", "/api/v1/auth/login", "{}"))
            .await
            .unwrap();
        assert_eq!(ok.status(), StatusCode::OK);

        let rejected = test_app()
            .oneshot(request("POST", "/api/v1/auth/login", "not json"))
            .await
            .unwrap();
        assert_eq!(rejected.status(), StatusCode::BAD_REQUEST);

        let not_found = test_app()
            .oneshot(request("GET", "/secret/path", ""))
            .await
            .unwrap();
        assert_eq!(not_found.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_unknown_paths_are_normalized() {
        let recorder = DebuggingRecorder::new();
        let snapshotter = recorder.snapshotter();

        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();

        metrics::with_local_recorder(&recorder, || {
            runtime.block_on(async {
                test_app()
                    .oneshot(request("GET", "/users/12345", ""))
                    .await
                    .unwrap();
            });
        });

        let snapshot = snapshotter.snapshot().into_vec();
        let paths: Vec<String> = snapshot
            .iter()
            .filter(|(key, _, _, _)| key.key().name() == "auth_http_requests_total")
            .filter(|(_, _, _, value)| matches!(value, DebugValue::Counter(1)))
            .flat_map(|(key, _, _, _)| {
                key.key()
                    .labels()
                    .filter(|l| l.key() == "path")
                    .map(|l| l.value().to_string())
                    .collect::<Vec<_>>()
            })
            .collect();

        assert_eq!(paths, vec!["/other".to_string()]);
    }
}
