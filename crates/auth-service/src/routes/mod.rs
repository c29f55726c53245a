//! HTTP routes for the auth service.

use crate::config::Config;
use crate::handlers;
use crate::middleware::{http_metrics_middleware, require_principal};
use crate::repositories::{RevocationStore, UserStore};
use crate::services::TokenService;
use axum::{
    http::{header, HeaderValue, Method},
    middleware,
    routing::{get, post},
    Router,
};
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;
use std::time::Duration;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub token_service: Arc<TokenService>,

    /// Probed by `/ready`.
    pub users: Arc<dyn UserStore>,

    /// Probed by `/ready`.
    pub revocations: Arc<dyn RevocationStore>,

    pub config: Config,
}

/// CORS policy for the configured browser origins.
fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(target: "auth.routes", origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
        .allow_credentials(true)
}

/// Build the application routes.
///
/// - `/health`, `/ready`, `/metrics`: public, unversioned
/// - `/api/v1/auth/{register,login,refresh,logout}`: public
/// - `/api/v1/auth/{me,organization}`: bearer access token required
pub fn build_routes(state: Arc<AppState>, metrics_handle: PrometheusHandle) -> Router {
    let cors = cors_layer(&state.config.allowed_origins);

    let public_routes = Router::new()
        .route("/health", get(handlers::health_check))
        .route("/ready", get(handlers::readiness_check))
        .route("/api/v1/auth/register", post(handlers::handle_register))
        .route("/api/v1/auth/login", post(handlers::handle_login))
        .route("/api/v1/auth/refresh", post(handlers::handle_refresh))
        .route("/api/v1/auth/logout", post(handlers::handle_logout))
        .with_state(state.clone());

    let metrics_routes = Router::new()
        .route("/metrics", get(handlers::metrics_handler))
        .with_state(metrics_handle);

    let protected_routes = Router::new()
        .route("/api/v1/auth/me", get(handlers::handle_me))
        .route("/api/v1/auth/organization", get(handlers::handle_organization))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            require_principal,
        ))
        .with_state(state);

    // Layer order, innermost first: CORS, trace, timeout, metrics.
    // Metrics sits outermost so framework rejections are counted.
    public_routes
        .merge(metrics_routes)
        .merge(protected_routes)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(Duration::from_secs(30)))
        .layer(middleware::from_fn(http_metrics_middleware))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::crypto::HmacSigner;
    use crate::repositories::{InMemoryRevocationStore, InMemoryUserStore};
    use crate::services::TokenSettings;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use http_body_util::BodyExt;
    use metrics_exporter_prometheus::PrometheusBuilder;
    use std::collections::HashMap;
    use tower::ServiceExt;

    #[test]
    fn test_app_state_is_clone() {
        fn assert_clone<T: Clone>() {}
        assert_clone::<AppState>();
    }

    fn test_config() -> Config {
        let vars = HashMap::from([
            (
                "DATABASE_URL".to_string(),
                "postgresql://localhost/auth_test".to_string(),
            ),
            (
                "JWT_SECRET_KEY".to_string(),
                "BwcHBwcHBwcHBwcHBwcHBwcHBwcHBwcHBwcHBwcHBwc=".to_string(),
            ),
        ]);
        Config::from_vars(&vars).unwrap()
    }

    fn test_app() -> Router {
        let config = test_config();
        let users = Arc::new(InMemoryUserStore::new());
        let revocations = Arc::new(InMemoryRevocationStore::new());
        let signer = Arc::new(HmacSigner::new(&[7u8; 32]).unwrap());
        let token_service = Arc::new(TokenService::new(
            users.clone(),
            revocations.clone(),
            signer,
            TokenSettings::from_config(&config),
        ));
        let state = Arc::new(AppState {
            token_service,
            users,
            revocations,
            config,
        });
        let handle = PrometheusBuilder::new().build_recorder().handle();
        build_routes(state, handle)
    }

    #[tokio::test]
    async fn test_health_returns_ok() {
        let response = test_app()
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(body.as_ref(), b"OK");
    }

    fn post_json(uri: &str, body: &'static str) -> Request<Body> {
        Request::post(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body))
            .unwrap()
    }

    #[tokio::test]
    async fn test_malformed_body_uses_error_envelope() {
        for uri in [
            "/api/v1/auth/refresh",
            "/api/v1/auth/login",
            "/api/v1/auth/register",
        ] {
            let response = test_app().oneshot(post_json(uri, "{}")).await.unwrap();
            assert_eq!(response.status(), StatusCode::BAD_REQUEST, "uri: {uri}");

            let body = response.into_body().collect().await.unwrap().to_bytes();
            let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
            assert_eq!(json["error"]["code"], "VALIDATION_ERROR");
        }
    }

    #[tokio::test]
    async fn test_logout_without_token_is_no_content() {
        for body in ["{}", "not json"] {
            let response = test_app()
                .oneshot(post_json("/api/v1/auth/logout", body))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::NO_CONTENT, "body: {body}");
        }
    }

    #[tokio::test]
    async fn test_protected_route_requires_bearer() {
        let response = test_app()
            .oneshot(Request::get("/api/v1/auth/me").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            response.headers().get(header::WWW_AUTHENTICATE).unwrap(),
            "Bearer"
        );
    }

    #[tokio::test]
    async fn test_cors_preflight_allows_configured_origin() {
        let request = Request::builder()
            .method(Method::OPTIONS)
            .uri("/api/v1/auth/login")
            .header(header::ORIGIN, "http://localhost:5173")
            .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
            .body(Body::empty())
            .unwrap();

        let response = test_app().oneshot(request).await.unwrap();

        assert_eq!(
            response
                .headers()
                .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
                .unwrap(),
            "http://localhost:5173"
        );
    }

    #[tokio::test]
    async fn test_cors_rejects_unknown_origin() {
        let request = Request::builder()
            .method(Method::OPTIONS)
            .uri("/api/v1/auth/login")
            .header(header::ORIGIN, "https://evil.example")
            .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
            .body(Body::empty())
            .unwrap();

        let response = test_app().oneshot(request).await.unwrap();

        assert!(response
            .headers()
            .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
            .is_none());
    }
}
