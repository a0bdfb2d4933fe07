//! Test application setup utilities
//!
//! Spins up the full router against an in-memory SQLite database, a mocked
//! identity provider, and a mocked studio service. Requests are driven with
//! `tower::ServiceExt::oneshot`; client addresses come from
//! `MockConnectInfo` so the rate limiter sees a real peer.

use std::net::SocketAddr;

use axum::{
    body::Body,
    extract::connect_info::MockConnectInfo,
    http::{Request, StatusCode},
    Router,
};
use chrono::Utc;
use jsonwebtoken::{encode, EncodingKey, Header};
use serde::{Deserialize, Serialize};
use tower::ServiceExt;
use uuid::Uuid;
use wiremock::{
    matchers::{header, method, path},
    Mock, MockServer, ResponseTemplate,
};

use console_gateway::{
    api,
    config::{
        AppConfig, CacheConfig, DatabaseConfig, IdentityConfig, InviteConfig, LoggingConfig,
        RateLimitConfig, ServerConfig, StudioConfig,
    },
    db, AppState,
};

pub const TEST_PROXY_SECRET: &str = "test-proxy-secret-0123456789abcdef";

/// Test application wrapper for integration testing
pub struct TestApp {
    pub router: Router,
    pub state: AppState,
    pub identity_server: MockServer,
    pub studio_server: MockServer,
}

/// Minimal claims for structurally valid test JWTs
#[derive(Debug, Serialize, Deserialize)]
struct TestClaims {
    sub: String,
    exp: i64,
}

impl TestApp {
    /// Create a new test application with default (generous) rate limits
    pub async fn new() -> Self {
        let identity_server = MockServer::start().await;
        let studio_server = MockServer::start().await;
        let config = test_config(&identity_server.uri(), &studio_server.uri());
        Self::with_servers(config, identity_server, studio_server).await
    }

    /// Create a test application with a customized configuration
    pub async fn with_config(
        mutate: impl FnOnce(&mut AppConfig),
    ) -> Self {
        let identity_server = MockServer::start().await;
        let studio_server = MockServer::start().await;
        let mut config = test_config(&identity_server.uri(), &studio_server.uri());
        mutate(&mut config);
        Self::with_servers(config, identity_server, studio_server).await
    }

    async fn with_servers(
        config: AppConfig,
        identity_server: MockServer,
        studio_server: MockServer,
    ) -> Self {
        let pool = db::init_pool(&config.database)
            .await
            .expect("Failed to initialize test database");

        let state = AppState::new(config, pool, None).expect("Failed to build test state");

        let router = api::router(state.clone())
            .layer(MockConnectInfo(SocketAddr::from(([127, 0, 0, 1], 9999))));

        Self {
            router,
            state,
            identity_server,
            studio_server,
        }
    }

    /// Mint a structurally valid JWT for a user id
    pub fn mint_token(user_id: Uuid) -> String {
        let claims = TestClaims {
            sub: user_id.to_string(),
            exp: (Utc::now() + chrono::Duration::hours(1)).timestamp(),
        };
        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(b"test-signing-secret"),
        )
        .unwrap()
    }

    /// Register an identity-provider mock accepting `token` for this user
    pub async fn mock_identity_user(
        &self,
        token: &str,
        user_id: Uuid,
        email: &str,
        display_name: Option<&str>,
    ) {
        Mock::given(method("GET"))
            .and(path("/v1/user"))
            .and(header("authorization", format!("Bearer {}", token)))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": user_id,
                "email": email,
                "display_name": display_name,
            })))
            .mount(&self.identity_server)
            .await;
    }

    /// Register an identity-provider mock rejecting `token`
    pub async fn mock_identity_reject(&self, token: &str) {
        Mock::given(method("GET"))
            .and(path("/v1/user"))
            .and(header("authorization", format!("Bearer {}", token)))
            .respond_with(ResponseTemplate::new(401))
            .mount(&self.identity_server)
            .await;
    }

    /// Register an identity-provider mock failing with a server error
    pub async fn mock_identity_outage(&self) {
        Mock::given(method("GET"))
            .and(path("/v1/user"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&self.identity_server)
            .await;
    }

    /// Shorthand: mint a token and teach the identity mock to accept it
    pub async fn authenticated_user(&self, user_id: Uuid, email: &str) -> String {
        let token = Self::mint_token(user_id);
        self.mock_identity_user(&token, user_id, email, Some("Test User"))
            .await;
        token
    }

    pub async fn get(&self, uri: &str, token: Option<&str>) -> TestResponse {
        self.request("GET", uri, token, None).await
    }

    pub async fn post_json(
        &self,
        uri: &str,
        token: Option<&str>,
        body: serde_json::Value,
    ) -> TestResponse {
        self.request("POST", uri, token, Some(body)).await
    }

    pub async fn delete(&self, uri: &str, token: Option<&str>) -> TestResponse {
        self.request("DELETE", uri, token, None).await
    }

    async fn request(
        &self,
        method: &str,
        uri: &str,
        token: Option<&str>,
        body: Option<serde_json::Value>,
    ) -> TestResponse {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header("Authorization", format!("Bearer {}", token));
        }
        let request = match body {
            Some(json) => builder
                .header("Content-Type", "application/json")
                .body(Body::from(serde_json::to_vec(&json).unwrap()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();

        TestResponse {
            status,
            headers,
            body: bytes.to_vec(),
        }
    }
}

/// Captured response for assertions
pub struct TestResponse {
    pub status: StatusCode,
    pub headers: axum::http::HeaderMap,
    pub body: Vec<u8>,
}

impl TestResponse {
    pub fn json(&self) -> serde_json::Value {
        serde_json::from_slice(&self.body).expect("Response body is not JSON")
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).to_string()
    }
}

fn test_config(identity_url: &str, studio_url: &str) -> AppConfig {
    AppConfig {
        server: ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
        },
        identity: IdentityConfig {
            url: identity_url.to_string(),
            api_key: None,
            timeout_secs: 2,
        },
        studio: StudioConfig {
            url: studio_url.to_string(),
            proxy_secret: TEST_PROXY_SECRET.to_string(),
            connect_timeout_secs: 1,
            timeout_secs: 5,
            stream_suffix: "/stream".to_string(),
        },
        database: DatabaseConfig {
            url: "sqlite::memory:".to_string(),
            max_connections: 5,
            connect_timeout_secs: 5,
        },
        rate_limit: generous_rate_limits(),
        invites: InviteConfig::default(),
        cache: CacheConfig {
            rbac_ttl_secs: 60,
            max_entries: 1000,
            sweep_interval_secs: 60,
        },
        logging: LoggingConfig::default(),
        email: None,
    }
}

fn generous_rate_limits() -> RateLimitConfig {
    use console_gateway::config::WindowLimit;
    let generous = WindowLimit {
        window_secs: 60,
        max: 10_000,
    };
    RateLimitConfig {
        api: generous,
        session: generous,
        invite_create: generous,
        invite_validate: generous,
        sweep_interval_secs: 60,
    }
}
