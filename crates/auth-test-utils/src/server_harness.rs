//! Test server harness for end-to-end tests
//!
//! Spawns the real router on a random port, backed by in-memory stores, so
//! HTTP tests need neither Postgres nor Redis.

use crate::crypto_fixtures::test_hmac_secret_base64;
use auth_service::config::Config;
use auth_service::crypto::signer_from_config;
use auth_service::models::{RegistrationResponse, TokenResponse};
use auth_service::observability::metrics::init_metrics_recorder;
use auth_service::repositories::{InMemoryRevocationStore, InMemoryUserStore};
use auth_service::routes::{self, AppState};
use auth_service::services::{TokenService, TokenSettings};
use serde_json::json;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::task::JoinHandle;

/// Bcrypt cost used by the harness (the minimum, to keep tests fast).
pub const TEST_BCRYPT_COST: &str = "10";

/// Minimum password length used by the harness, so short fixtures pass.
pub const TEST_PASSWORD_MIN_LENGTH: &str = "5";

/// Environment-style variables for a test configuration.
pub fn test_config_vars() -> HashMap<String, String> {
    HashMap::from([
        (
            "DATABASE_URL".to_string(),
            "postgresql://unused/auth_test".to_string(),
        ),
        ("BIND_ADDRESS".to_string(), "127.0.0.1:0".to_string()),
        ("JWT_SECRET_KEY".to_string(), test_hmac_secret_base64()),
        ("BCRYPT_COST".to_string(), TEST_BCRYPT_COST.to_string()),
        (
            "PASSWORD_MIN_LENGTH".to_string(),
            TEST_PASSWORD_MIN_LENGTH.to_string(),
        ),
    ])
}

/// Test harness for spawning the auth service in E2E tests
///
/// # Example
/// ```rust,ignore
/// #[tokio::test]
/// async fn test_login_e2e() -> anyhow::Result<()> {
///     let server = TestAuthServer::spawn().await?;
///     server.register("Acme", "a@acme.com", "pw123").await?;
///
///     let response = server.login("a@acme.com", "pw123").await?;
///     assert_eq!(response.status(), 200);
///     Ok(())
/// }
/// ```
pub struct TestAuthServer {
    addr: SocketAddr,
    config: Config,
    users: Arc<InMemoryUserStore>,
    revocations: Arc<InMemoryRevocationStore>,
    client: reqwest::Client,
    handle: JoinHandle<()>,
}

impl TestAuthServer {
    /// Spawn with the default test configuration.
    pub async fn spawn() -> Result<Self, anyhow::Error> {
        Self::spawn_with_vars(test_config_vars()).await
    }

    /// Spawn with extra or overriding configuration variables.
    pub async fn spawn_with(overrides: &[(&str, &str)]) -> Result<Self, anyhow::Error> {
        let mut vars = test_config_vars();
        for (key, value) in overrides {
            vars.insert((*key).to_string(), (*value).to_string());
        }
        Self::spawn_with_vars(vars).await
    }

    async fn spawn_with_vars(vars: HashMap<String, String>) -> Result<Self, anyhow::Error> {
        let config = Config::from_vars(&vars)?;

        let users = Arc::new(InMemoryUserStore::new());
        let revocations = Arc::new(InMemoryRevocationStore::new());
        let signer = signer_from_config(&config)?;

        let token_service = Arc::new(TokenService::new(
            users.clone(),
            revocations.clone(),
            signer,
            TokenSettings::from_config(&config),
        ));

        let state = Arc::new(AppState {
            token_service,
            users: users.clone(),
            revocations: revocations.clone(),
            config: config.clone(),
        });

        // A recorder can only be installed once per process; later servers
        // get a standalone one.
        let metrics_handle = match init_metrics_recorder() {
            Ok(handle) => handle,
            Err(_) => {
                use metrics_exporter_prometheus::PrometheusBuilder;
                PrometheusBuilder::new().build_recorder().handle()
            }
        };

        let app = routes::build_routes(state, metrics_handle);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .map_err(|e| anyhow::anyhow!("Failed to bind test server: {}", e))?;

        let addr = listener
            .local_addr()
            .map_err(|e| anyhow::anyhow!("Failed to get local address: {}", e))?;

        let handle = tokio::spawn(async move {
            let make_service = app.into_make_service_with_connect_info::<SocketAddr>();
            if let Err(e) = axum::serve(listener, make_service).await {
                eprintln!("Test server error: {}", e);
            }
        });

        Ok(Self {
            addr,
            config,
            users,
            revocations,
            client: reqwest::Client::new(),
            handle,
        })
    }

    /// Base URL of the test server
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn client(&self) -> &reqwest::Client {
        &self.client
    }

    pub fn users(&self) -> &InMemoryUserStore {
        &self.users
    }

    pub fn revocations(&self) -> &InMemoryRevocationStore {
        &self.revocations
    }

    /// POST a JSON body to an `/api/v1/auth/*` endpoint.
    pub async fn post_auth(
        &self,
        endpoint: &str,
        body: &serde_json::Value,
    ) -> Result<reqwest::Response, anyhow::Error> {
        Ok(self
            .client
            .post(format!("{}/api/v1/auth/{}", self.url(), endpoint))
            .json(body)
            .send()
            .await?)
    }

    /// GET an `/api/v1/auth/*` endpoint with a bearer token.
    pub async fn get_with_token(
        &self,
        endpoint: &str,
        access_token: &str,
    ) -> Result<reqwest::Response, anyhow::Error> {
        Ok(self
            .client
            .get(format!("{}/api/v1/auth/{}", self.url(), endpoint))
            .bearer_auth(access_token)
            .send()
            .await?)
    }

    /// Register an organization and return the parsed 201 body.
    pub async fn register(
        &self,
        organization_name: &str,
        email: &str,
        password: &str,
    ) -> Result<RegistrationResponse, anyhow::Error> {
        let response = self
            .post_auth(
                "register",
                &json!({
                    "organization_name": organization_name,
                    "first_name": "Test",
                    "last_name": "Admin",
                    "email": email,
                    "password": password,
                }),
            )
            .await?;

        if response.status() != reqwest::StatusCode::CREATED {
            anyhow::bail!(
                "Registration failed with {}: {}",
                response.status(),
                response.text().await.unwrap_or_default()
            );
        }
        Ok(response.json().await?)
    }

    pub async fn login(
        &self,
        email: &str,
        password: &str,
    ) -> Result<reqwest::Response, anyhow::Error> {
        self.post_auth("login", &json!({ "email": email, "password": password }))
            .await
    }

    /// Login and parse the token pair, failing on a non-200 status.
    pub async fn login_tokens(
        &self,
        email: &str,
        password: &str,
    ) -> Result<TokenResponse, anyhow::Error> {
        let response = self.login(email, password).await?;
        if response.status() != reqwest::StatusCode::OK {
            anyhow::bail!("Login failed with {}", response.status());
        }
        Ok(response.json().await?)
    }

    pub async fn refresh(&self, refresh_token: &str) -> Result<reqwest::Response, anyhow::Error> {
        self.post_auth("refresh", &json!({ "refresh_token": refresh_token }))
            .await
    }

    pub async fn logout(&self, refresh_token: &str) -> Result<reqwest::Response, anyhow::Error> {
        self.post_auth("logout", &json!({ "refresh_token": refresh_token }))
            .await
    }
}

impl Drop for TestAuthServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
