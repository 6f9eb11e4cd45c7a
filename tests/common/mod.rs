#![allow(dead_code)]

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use chunk_auth::auth::jwt::JwtManager;
use chunk_auth::config::Config;
use chunk_auth::routes::create_router;
use chunk_auth::AppState;
use http_body_util::BodyExt;
use migration::MigratorTrait;
use sea_orm::{ConnectOptions, Database};
use tower::ServiceExt;

pub const JWT_SECRET: &str = "test-secret-0123456789abcdef-0123456789abcdef";

// ─── TestResponse ────────────────────────────────────────────────────────────

pub struct TestResponse {
    pub status: StatusCode,
    body_bytes: Vec<u8>,
}

impl TestResponse {
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body_bytes).to_string()
    }

    pub fn json<T: serde::de::DeserializeOwned>(&self) -> T {
        serde_json::from_slice(&self.body_bytes).unwrap_or_else(|e| {
            panic!(
                "Failed to deserialize response as {}: {e}\nBody: {}",
                std::any::type_name::<T>(),
                self.text()
            )
        })
    }

    pub fn assert_status(&self, expected: StatusCode) {
        assert_eq!(
            self.status, expected,
            "Expected status {expected}, got {}. Body: {}",
            self.status,
            self.text()
        );
    }

    pub fn assert_error(&self, expected: StatusCode, error_code: &str) {
        self.assert_status(expected);
        let json: serde_json::Value = self.json();
        assert_eq!(
            json["error"].as_str().unwrap_or_default(),
            error_code,
            "Body: {}",
            self.text()
        );
    }
}

// ─── CreatedClient ───────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct CreatedClient {
    pub id: String,
    pub client_id: String,
    pub client_secret: String,
}

// ─── TestApp ─────────────────────────────────────────────────────────────────

pub struct TestApp {
    router: Router,
    pub state: AppState,
}

impl TestApp {
    pub async fn new() -> Self {
        let config = Config {
            database_url: "sqlite::memory:".to_string(),
            jwt_secret: JWT_SECRET.to_string(),
            jwt_issuer: "chunk-auth-test".to_string(),
            session_token_expiry_secs: 3600,
            server_host: "127.0.0.1".to_string(),
            server_port: 0,
            cors_allowed_origins: String::new(),
        };

        // A single pooled connection keeps the in-memory database alive and
        // shared for the whole test.
        let mut options = ConnectOptions::new(config.database_url.clone());
        options.max_connections(1).min_connections(1);

        let db = Database::connect(options)
            .await
            .expect("Failed to connect to in-memory SQLite");

        migration::Migrator::up(&db, None)
            .await
            .expect("Failed to run migrations");

        let jwt = JwtManager::new(&config).expect("Failed to init JwtManager");

        let state = AppState { db, jwt, config };

        let router = create_router(state.clone());

        Self { router, state }
    }

    pub async fn request(&self, req: Request<Body>) -> TestResponse {
        let resp = self
            .router
            .clone()
            .oneshot(req)
            .await
            .expect("oneshot failed");

        let status = resp.status();
        let body_bytes = resp
            .into_body()
            .collect()
            .await
            .expect("failed to read body")
            .to_bytes()
            .to_vec();

        TestResponse { status, body_bytes }
    }

    pub async fn get(&self, uri: &str, token: Option<&str>) -> TestResponse {
        let mut builder = Request::builder().method("GET").uri(uri);
        if let Some(token) = token {
            builder = builder.header("Authorization", format!("Bearer {token}"));
        }
        self.request(builder.body(Body::empty()).unwrap()).await
    }

    pub async fn post_json(
        &self,
        uri: &str,
        token: Option<&str>,
        body: &serde_json::Value,
    ) -> TestResponse {
        self.send_json("POST", uri, token, body).await
    }

    pub async fn patch_json(
        &self,
        uri: &str,
        token: Option<&str>,
        body: &serde_json::Value,
    ) -> TestResponse {
        self.send_json("PATCH", uri, token, body).await
    }

    pub async fn delete(&self, uri: &str, token: Option<&str>) -> TestResponse {
        let mut builder = Request::builder().method("DELETE").uri(uri);
        if let Some(token) = token {
            builder = builder.header("Authorization", format!("Bearer {token}"));
        }
        self.request(builder.body(Body::empty()).unwrap()).await
    }

    async fn send_json(
        &self,
        method: &str,
        uri: &str,
        token: Option<&str>,
        body: &serde_json::Value,
    ) -> TestResponse {
        let mut builder = Request::builder()
            .method(method)
            .uri(uri)
            .header("Content-Type", "application/json");
        if let Some(token) = token {
            builder = builder.header("Authorization", format!("Bearer {token}"));
        }
        self.request(
            builder
                .body(Body::from(serde_json::to_vec(body).unwrap()))
                .unwrap(),
        )
        .await
    }

    // ── User / session helpers ──────────────────────────────────────────

    /// Registers a user and returns a session token for them.
    pub async fn session_token(&self, username: &str) -> String {
        let body = serde_json::json!({
            "username": username,
            "email": format!("{username}@test.com"),
            "password": "Password1!",
        });
        let resp = self.post_json("/auth/register", None, &body).await;
        resp.assert_status(StatusCode::OK);
        let json: serde_json::Value = resp.json();
        json["access_token"].as_str().unwrap().to_string()
    }

    // ── Client helpers ──────────────────────────────────────────────────

    pub async fn create_client(
        &self,
        token: &str,
        name: &str,
        uris: &[&str],
        scopes: &[&str],
    ) -> CreatedClient {
        let body = serde_json::json!({
            "name": name,
            "redirect_uris": uris,
            "scopes": scopes,
        });

        let resp = self.post_json("/oauth/register", Some(token), &body).await;
        resp.assert_status(StatusCode::CREATED);
        let json: serde_json::Value = resp.json();

        CreatedClient {
            id: json["id"].as_str().unwrap().to_string(),
            client_id: json["client_id"].as_str().unwrap().to_string(),
            client_secret: json["client_secret"].as_str().unwrap().to_string(),
        }
    }

    // ── OAuth flow helpers ──────────────────────────────────────────────

    /// Walks the consent flow with `consent=allow` and returns the raw
    /// authorization code carried on the redirect.
    pub async fn obtain_code(
        &self,
        token: &str,
        client: &CreatedClient,
        redirect_uri: &str,
        scope: Option<&str>,
    ) -> String {
        let mut body = serde_json::json!({
            "client_id": client.client_id,
            "redirect_uri": redirect_uri,
            "consent": "allow",
        });
        if let Some(scope) = scope {
            body["scope"] = serde_json::Value::String(scope.to_string());
        }

        let resp = self.post_json("/oauth/authorize", Some(token), &body).await;
        resp.assert_status(StatusCode::OK);
        let json: serde_json::Value = resp.json();
        let redirect = json["redirect_uri"].as_str().unwrap();

        extract_query_param(redirect, "code").expect("redirect did not carry a code")
    }
}

/// Pulls a query parameter's (decoded) value out of a redirect URI.
pub fn extract_query_param(uri: &str, name: &str) -> Option<String> {
    let query = uri.split_once('?')?.1;
    for pair in query.split('&') {
        let (key, value) = pair.split_once('=')?;
        if key == name {
            return Some(
                urlencoding::decode(value)
                    .map(|v| v.into_owned())
                    .unwrap_or_else(|_| value.to_string()),
            );
        }
    }
    None
}
