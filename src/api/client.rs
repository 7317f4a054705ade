//! API client for the HomeHeaven REST API.
//!
//! `ApiClient` performs requests on behalf of the stored session: it adds
//! the bearer token when the caller didn't supply an Authorization header,
//! and turns a 401 into [`FetchOutcome::SessionExpired`] after clearing
//! the session.

use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::header::{self, HeaderMap, HeaderName, HeaderValue};
use reqwest::{Client, Method, Response, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::auth::SessionStore;
use crate::config::{Config, DEFAULT_REQUEST_TIMEOUT_SECS};
use crate::storage::KeyValueStore;

use super::ApiError;

// ============================================================================
// Constants
// ============================================================================

/// Login endpoint, relative to the base URL
const LOGIN_PATH: &str = "/api/auth/login";

/// Logout endpoint. The server only acknowledges; the token is dropped client-side.
const LOGOUT_PATH: &str = "/api/auth/logout";

fn default_token_type() -> String {
    "Bearer".to_string()
}

/// Body returned by the login endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthResponse {
    pub token: String,
    #[serde(rename = "type", default = "default_token_type")]
    pub token_type: String,
    pub username: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
}

#[derive(Debug, Serialize)]
struct LoginRequest<'a> {
    username: &'a str,
    password: &'a str,
}

/// Request payload. A request carries at most one.
#[derive(Debug, Clone, PartialEq)]
pub enum RequestBody {
    /// Serialized as JSON; sets `Content-Type: application/json` unless the
    /// caller supplied one
    Json(serde_json::Value),
    Text(String),
}

/// Per-request options for [`ApiClient::fetch`].
#[derive(Debug, Clone, Default)]
pub struct FetchOptions {
    pub method: Method,
    pub headers: HeaderMap,
    pub body: Option<RequestBody>,
}

impl FetchOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn method(mut self, method: Method) -> Self {
        self.method = method;
        self
    }

    pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Replaces any body set earlier
    pub fn json(mut self, body: serde_json::Value) -> Self {
        self.body = Some(RequestBody::Json(body));
        self
    }

    /// Replaces any body set earlier
    pub fn body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(RequestBody::Text(body.into()));
        self
    }
}

/// Result of an authenticated request.
#[derive(Debug)]
pub enum FetchOutcome {
    /// Any status other than 401, returned untouched
    Response(Response),
    /// The server answered 401; the session has already been cleared
    SessionExpired,
}

impl FetchOutcome {
    pub fn into_response(self) -> Option<Response> {
        match self {
            FetchOutcome::Response(response) => Some(response),
            FetchOutcome::SessionExpired => None,
        }
    }

    pub fn is_session_expired(&self) -> bool {
        matches!(self, FetchOutcome::SessionExpired)
    }
}

/// API client bound to a session store.
/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Clone)]
pub struct ApiClient<S> {
    client: Client,
    base_url: String,
    session: SessionStore<S>,
}

impl<S: KeyValueStore> ApiClient<S> {
    /// Create a client with the default request timeout
    pub fn new(base_url: impl Into<String>, session: SessionStore<S>) -> Result<Self> {
        Self::with_timeout(
            base_url,
            session,
            Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
        )
    }

    pub fn from_config(config: &Config, session: SessionStore<S>) -> Result<Self> {
        Self::with_timeout(
            config.base_url.clone(),
            session,
            Duration::from_secs(config.request_timeout_secs),
        )
    }

    pub fn with_timeout(
        base_url: impl Into<String>,
        session: SessionStore<S>,
        timeout: Duration,
    ) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            base_url: base_url.into(),
            session,
        })
    }

    pub fn session(&self) -> &SessionStore<S> {
        &self.session
    }

    /// Resolve a path against the base URL. Absolute URLs pass through.
    pub fn url(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            return path.to_string();
        }
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    /// Add `Authorization: Bearer <token>` unless the caller already set a
    /// non-empty Authorization header or no token is stored.
    fn authorize(&self, headers: &mut HeaderMap) -> Result<()> {
        if headers
            .get(header::AUTHORIZATION)
            .is_some_and(|value| !value.is_empty())
        {
            debug!("Caller supplied Authorization header");
            return Ok(());
        }
        if let Some(token) = self.session.token().filter(|t| !t.is_empty()) {
            let value = HeaderValue::from_str(&format!("Bearer {}", token))
                .context("Stored token cannot be sent as a header")?;
            headers.insert(header::AUTHORIZATION, value);
            debug!("Attached bearer token");
        }
        Ok(())
    }

    /// Send a request with the session's credentials.
    ///
    /// Transport failures are returned as errors. Only 401 is special:
    /// the session is cleared and `SessionExpired` is returned. Every
    /// other status comes back as `FetchOutcome::Response`. No retries.
    pub async fn fetch(&self, url: &str, options: FetchOptions) -> Result<FetchOutcome> {
        let FetchOptions {
            method,
            mut headers,
            body,
        } = options;

        self.authorize(&mut headers)?;

        let url = self.url(url);
        let mut request = self.client.request(method.clone(), &url).headers(headers);
        match body {
            Some(RequestBody::Json(json)) => request = request.json(&json),
            Some(RequestBody::Text(text)) => request = request.body(text),
            None => {}
        }

        let response = request
            .send()
            .await
            .with_context(|| format!("Failed to send {} request to {}", method, url))?;

        if response.status() == StatusCode::UNAUTHORIZED {
            warn!(url = %url, "Unauthorized response, clearing session");
            if let Err(e) = self.session.logout() {
                warn!(error = %e, "Session only partially cleared");
            }
            return Ok(FetchOutcome::SessionExpired);
        }

        debug!(url = %url, status = %response.status(), "Request complete");
        Ok(FetchOutcome::Response(response))
    }

    /// Authenticate and store the returned session
    pub async fn login(&self, username: &str, password: &str) -> Result<AuthResponse> {
        let url = self.url(LOGIN_PATH);

        let response = self
            .client
            .post(&url)
            .json(&LoginRequest { username, password })
            .send()
            .await
            .context("Failed to send login request")?;

        let response = Self::check_response(response).await?;

        let auth: AuthResponse = response
            .json()
            .await
            .context("Failed to parse login response")?;

        self.session.save(&auth)?;
        info!(username = %auth.username, "Logged in");
        Ok(auth)
    }

    /// Tell the server the user logged out. Does not touch the local session.
    pub async fn logout_remote(&self) -> Result<()> {
        let url = self.url(LOGOUT_PATH);

        let response = self
            .client
            .post(&url)
            .headers(self.session.headers()?)
            .send()
            .await
            .context("Failed to send logout request")?;

        Self::check_response(response).await?;
        Ok(())
    }

    /// Check if response is successful, returning an error with body if not.
    async fn check_response(response: Response) -> Result<Response> {
        if response.status().is_success() {
            Ok(response)
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            Err(ApiError::from_status(status, &body).into())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::memory::StuckKeyStore;
    use crate::storage::MemoryStore;
    use axum::response::IntoResponse;
    use axum::routing::{get, post};
    use axum::{Json, Router};
    use serde_json::json;

    async fn echo_authorization(headers: HeaderMap) -> String {
        headers
            .get(header::AUTHORIZATION)
            .map(|v| v.to_str().unwrap_or_default().to_string())
            .unwrap_or_else(|| "<none>".to_string())
    }

    async fn login_handler(Json(body): Json<serde_json::Value>) -> axum::response::Response {
        if body["password"] == "secret" {
            Json(json!({
                "token": "jwt-token",
                "type": "Bearer",
                "username": body["username"],
                "email": "alice@example.com",
                "role": "USER",
            }))
            .into_response()
        } else {
            (StatusCode::UNAUTHORIZED, "Invalid username or password").into_response()
        }
    }

    async fn spawn_server() -> String {
        let app = Router::new()
            .route("/api/data", get(echo_authorization))
            .route("/api/expired", get(|| async { StatusCode::UNAUTHORIZED }))
            .route(
                "/api/broken",
                get(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "boom") }),
            )
            .route("/api/echo", post(|body: String| async move { body }))
            .route("/api/auth/login", post(login_handler))
            .route(
                "/api/auth/logout",
                post(|| async { "Logged out successfully" }),
            );

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}", addr)
    }

    fn client_with(base_url: &str, entries: &[(&str, &str)]) -> (ApiClient<MemoryStore>, MemoryStore) {
        let store = MemoryStore::with_entries(entries.iter().copied());
        let client = ApiClient::new(base_url, SessionStore::new(store.clone())).unwrap();
        (client, store)
    }

    async fn body_of(outcome: FetchOutcome) -> String {
        outcome
            .into_response()
            .expect("expected a response")
            .text()
            .await
            .unwrap()
    }

    #[test]
    fn test_url_resolution() {
        let (client, _) = client_with("http://localhost:8080/", &[]);
        assert_eq!(client.url("/api/data"), "http://localhost:8080/api/data");
        assert_eq!(client.url("api/data"), "http://localhost:8080/api/data");
        assert_eq!(
            client.url("https://other.example/x"),
            "https://other.example/x"
        );
    }

    #[tokio::test]
    async fn test_fetch_without_token_sends_no_authorization() {
        let base = spawn_server().await;
        let (client, _) = client_with(&base, &[]);

        let outcome = client.fetch("/api/data", FetchOptions::new()).await.unwrap();
        let response = outcome.into_response().unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.text().await.unwrap(), "<none>");
    }

    #[tokio::test]
    async fn test_fetch_injects_bearer_token() {
        let base = spawn_server().await;
        let (client, _) = client_with(&base, &[("token", "abc")]);

        let outcome = client.fetch("/api/data", FetchOptions::new()).await.unwrap();
        assert_eq!(body_of(outcome).await, "Bearer abc");
    }

    #[tokio::test]
    async fn test_fetch_keeps_caller_authorization() {
        let base = spawn_server().await;
        let (client, _) = client_with(&base, &[("token", "abc")]);

        let options = FetchOptions::new().header(
            header::AUTHORIZATION,
            HeaderValue::from_static("Basic dXNlcjpwYXNz"),
        );
        let outcome = client.fetch("/api/data", options).await.unwrap();
        assert_eq!(body_of(outcome).await, "Basic dXNlcjpwYXNz");
    }

    #[tokio::test]
    async fn test_fetch_fills_empty_caller_authorization() {
        let base = spawn_server().await;
        let (client, _) = client_with(&base, &[("token", "abc")]);

        let options =
            FetchOptions::new().header(header::AUTHORIZATION, HeaderValue::from_static(""));
        let outcome = client.fetch("/api/data", options).await.unwrap();
        assert_eq!(body_of(outcome).await, "Bearer abc");
    }

    #[tokio::test]
    async fn test_fetch_401_clears_session() {
        let base = spawn_server().await;
        let (client, store) = client_with(
            &base,
            &[
                ("token", "abc"),
                ("username", "alice"),
                ("email", "alice@example.com"),
            ],
        );

        let outcome = client
            .fetch("/api/expired", FetchOptions::new())
            .await
            .unwrap();
        assert!(outcome.is_session_expired());
        assert!(store.is_empty());
        assert!(!client.session().is_authenticated());
    }

    #[tokio::test]
    async fn test_fetch_other_errors_pass_through() {
        let base = spawn_server().await;
        let (client, _) = client_with(&base, &[("token", "abc")]);

        let outcome = client.fetch("/api/broken", FetchOptions::new()).await.unwrap();
        let response = outcome.into_response().unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(response.text().await.unwrap(), "boom");
        assert!(client.session().is_authenticated());
    }

    #[tokio::test]
    async fn test_fetch_sends_body() {
        let base = spawn_server().await;
        let (client, _) = client_with(&base, &[]);

        let options = FetchOptions::new()
            .method(Method::POST)
            .json(json!({"title": "Cottage"}));
        let outcome = client.fetch("/api/echo", options).await.unwrap();
        assert_eq!(body_of(outcome).await, r#"{"title":"Cottage"}"#);
    }

    #[tokio::test]
    async fn test_later_body_replaces_earlier() {
        let base = spawn_server().await;
        let (client, _) = client_with(&base, &[]);

        let options = FetchOptions::new()
            .method(Method::POST)
            .json(json!({"title": "Cottage"}))
            .body("plain text");
        assert_eq!(options.body, Some(RequestBody::Text("plain text".to_string())));

        let outcome = client.fetch("/api/echo", options).await.unwrap();
        assert_eq!(body_of(outcome).await, "plain text");
    }

    #[tokio::test]
    async fn test_fetch_401_expires_even_if_clear_fails() {
        let base = spawn_server().await;
        let inner = MemoryStore::with_entries([
            ("token", "abc"),
            ("username", "alice"),
            ("email", "alice@example.com"),
        ]);
        let session = SessionStore::new(StuckKeyStore::new(inner.clone(), "token"));
        let client = ApiClient::new(base, session).unwrap();

        let outcome = client
            .fetch("/api/expired", FetchOptions::new())
            .await
            .unwrap();
        assert!(outcome.is_session_expired());
        assert!(!inner.contains("username"));
        assert!(!inner.contains("email"));
    }

    #[tokio::test]
    async fn test_fetch_network_failure_is_error() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let base = format!("http://{}", listener.local_addr().unwrap());
        drop(listener);

        let (client, store) = client_with(&base, &[("token", "abc")]);
        let result = client.fetch("/api/data", FetchOptions::new()).await;
        assert!(result.is_err());
        assert!(store.contains("token"));
    }

    #[tokio::test]
    async fn test_login_saves_session() {
        let base = spawn_server().await;
        let (client, _) = client_with(&base, &[]);

        let auth = client.login("alice", "secret").await.unwrap();
        assert_eq!(auth.token, "jwt-token");
        assert_eq!(auth.token_type, "Bearer");
        assert_eq!(auth.role.as_deref(), Some("USER"));

        let session = client.session().snapshot();
        assert_eq!(session.token.as_deref(), Some("jwt-token"));
        assert_eq!(session.username.as_deref(), Some("alice"));
        assert_eq!(session.email.as_deref(), Some("alice@example.com"));
    }

    #[tokio::test]
    async fn test_login_rejected() {
        let base = spawn_server().await;
        let (client, store) = client_with(&base, &[]);

        let err = client.login("alice", "wrong").await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ApiError>(),
            Some(ApiError::Unauthorized)
        ));
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_logout_remote() {
        let base = spawn_server().await;
        let (client, store) = client_with(&base, &[("token", "abc")]);

        client.logout_remote().await.unwrap();
        assert!(store.contains("token"));
    }

    #[test]
    fn test_auth_response_defaults() {
        let auth: AuthResponse =
            serde_json::from_str(r#"{"token": "t", "username": "bob"}"#).unwrap();
        assert_eq!(auth.token_type, "Bearer");
        assert!(auth.email.is_none());
        assert!(auth.role.is_none());
    }
}
