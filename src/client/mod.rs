//! # HTTP client core
//!
//! [`ApiClient`] is the single dispatch point for every backend call. On top
//! of plain `reqwest` it adds:
//!
//! - **Auth header injection.** Each dispatch attaches
//!   `Authorization: Bearer <access_token>` when a token is stored.
//! - **Request observation.** A process-wide [`RequestObserver`] can be set and
//!   cleared at runtime; it receives a [`RequestLog`] for every completed
//!   dispatch and never influences control flow.
//! - **Single-flight token refresh.** A 401 on a request that has not been
//!   retried yet goes through [`refresh::RefreshCoordinator`]:
//!
//! ```text
//!  401 ──┬─ request is /auth/refresh ──> clear tokens, session_expired, reject
//!        └─ coordinator.join()
//!             ├─ Rotated(token)  ──> replay once with the stored token
//!             ├─ Follower        ──> await shared outcome ─┬─ ok  ──> replay once
//!             │                                            └─ err ──> reject
//!             └─ Leader          ──> no refresh token ──> clear access token,
//!                                    │                    session_expired, release waiters, reject
//!                                    └─ POST /auth/refresh ─┬─ ok  ──> store pair,
//!                                                           │   release waiters, replay once
//!                                                           └─ err ──> clear tokens, session_expired,
//!                                                               release waiters, reject
//! ```
//!
//! Replays are dispatched directly, so no request is retried more than once.
//! Every other failure status propagates unchanged as [`ApiError::Status`].
//!
//! ```no_run
//! use std::sync::Arc;
//! use parts_scout::client::{ApiClient, ApiRequest};
//! use parts_scout::tokens::MemoryTokenStore;
//!
//! # async fn demo() -> Result<(), parts_scout::error::ApiError> {
//! let client = ApiClient::builder("http://localhost:8000/api")
//!     .token_store(Arc::new(MemoryTokenStore::new()))
//!     .build()?;
//! let filters: serde_json::Value = client.request(ApiRequest::get("/products/filters/all")).await?;
//! # Ok(()) }
//! ```

pub mod observer;
pub mod refresh;

use reqwest::{Method, multipart};
use serde::{Serialize, de::DeserializeOwned};
use serde_json::{Value, json};
use std::{
    sync::{Arc, PoisonError, RwLock},
    time::Duration,
};
use tracing::{debug, error, info, warn};

use crate::{
    error::ApiError,
    models::{AuthTokens, RefreshRequest},
    tokens::{MemoryTokenStore, TokenStore},
};

use self::{
    observer::{LogSessionObserver, RequestLog, RequestLogError, RequestObserver, SessionObserver},
    refresh::{RefreshCoordinator, RefreshOutcome, RefreshTicket},
};

/// Path of the token refresh endpoint, relative to the API base.
pub const REFRESH_PATH: &str = "/auth/refresh";

/// Default per-request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// A file sent as one field of a multipart form.
#[derive(Debug, Clone, PartialEq)]
pub struct FilePart {
    pub field: String,
    pub file_name: String,
    pub mime: String,
    pub bytes: Vec<u8>,
}

impl FilePart {
    fn to_form(&self) -> Result<multipart::Form, ApiError> {
        let part = multipart::Part::bytes(self.bytes.clone())
            .file_name(self.file_name.clone())
            .mime_str(&self.mime)?;
        Ok(multipart::Form::new().part(self.field.clone(), part))
    }

    fn describe(&self) -> Value {
        json!({
            "field": self.field,
            "fileName": self.file_name,
            "mime": self.mime,
            "size": self.bytes.len(),
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub enum RequestBody {
    #[default]
    Empty,
    Json(Value),
    Multipart(FilePart),
}

/// A replayable description of one backend call.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    pub method: Method,
    /// Path relative to the API base, e.g. `/products/42`.
    pub path: String,
    pub query: Vec<(String, String)>,
    pub body: RequestBody,
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            body: RequestBody::Empty,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    pub fn put(path: impl Into<String>) -> Self {
        Self::new(Method::PUT, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    pub fn query(mut self, key: &str, value: impl ToString) -> Self {
        self.query.push((key.to_string(), value.to_string()));
        self
    }

    /// Attach a JSON body.
    pub fn json<T: Serialize + ?Sized>(mut self, body: &T) -> Result<Self, ApiError> {
        self.body = RequestBody::Json(serde_json::to_value(body)?);
        Ok(self)
    }

    pub fn multipart(mut self, part: FilePart) -> Self {
        self.body = RequestBody::Multipart(part);
        self
    }

    fn is_refresh(&self) -> bool {
        self.path.contains(REFRESH_PATH)
    }

    fn logged_body(&self) -> Option<Value> {
        match &self.body {
            RequestBody::Empty => None,
            RequestBody::Json(value) => Some(value.clone()),
            RequestBody::Multipart(part) => Some(part.describe()),
        }
    }
}

/// Builder for [`ApiClient`].
pub struct ApiClientBuilder {
    base_url: String,
    timeout: Duration,
    tokens: Option<Arc<dyn TokenStore>>,
    session_observer: Option<Arc<dyn SessionObserver>>,
    request_observer: Option<Arc<dyn RequestObserver>>,
}

impl ApiClientBuilder {
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn token_store(mut self, tokens: Arc<dyn TokenStore>) -> Self {
        self.tokens = Some(tokens);
        self
    }

    pub fn session_observer(mut self, observer: Arc<dyn SessionObserver>) -> Self {
        self.session_observer = Some(observer);
        self
    }

    pub fn request_observer(mut self, observer: Arc<dyn RequestObserver>) -> Self {
        self.request_observer = Some(observer);
        self
    }

    pub fn build(self) -> Result<ApiClient, ApiError> {
        let http = reqwest::Client::builder().timeout(self.timeout).build()?;
        debug!(base_url = %self.base_url, timeout = ?self.timeout, "HTTP client created");

        Ok(ApiClient {
            inner: Arc::new(Inner {
                http,
                base_url: self.base_url.trim_end_matches('/').to_string(),
                tokens: self
                    .tokens
                    .unwrap_or_else(|| Arc::new(MemoryTokenStore::new())),
                refresh: RefreshCoordinator::new(),
                request_observer: RwLock::new(self.request_observer),
                session_observer: self
                    .session_observer
                    .unwrap_or_else(|| Arc::new(LogSessionObserver)),
            }),
        })
    }
}

struct Inner {
    http: reqwest::Client,
    base_url: String,
    tokens: Arc<dyn TokenStore>,
    refresh: RefreshCoordinator,
    request_observer: RwLock<Option<Arc<dyn RequestObserver>>>,
    session_observer: Arc<dyn SessionObserver>,
}

/// Shared handle to the HTTP client core. Clones share all state.
#[derive(Clone)]
pub struct ApiClient {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.inner.base_url)
            .finish_non_exhaustive()
    }
}

impl ApiClient {
    pub fn builder(base_url: impl Into<String>) -> ApiClientBuilder {
        ApiClientBuilder {
            base_url: base_url.into(),
            timeout: DEFAULT_TIMEOUT,
            tokens: None,
            session_observer: None,
            request_observer: None,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.inner.base_url
    }

    /// The shared token storage.
    pub fn tokens(&self) -> &Arc<dyn TokenStore> {
        &self.inner.tokens
    }

    pub fn set_request_observer(&self, observer: Arc<dyn RequestObserver>) {
        *self
            .inner
            .request_observer
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Some(observer);
    }

    pub fn clear_request_observer(&self) {
        *self
            .inner
            .request_observer
            .write()
            .unwrap_or_else(PoisonError::into_inner) = None;
    }

    /// Dispatch `request` and decode the response body into `T`.
    pub async fn request<T: DeserializeOwned>(&self, request: ApiRequest) -> Result<T, ApiError> {
        let body = self.send(request).await?;
        Ok(serde_json::from_value(body)?)
    }

    /// Dispatch `request` with the 401 refresh protocol and return the raw body.
    pub async fn send(&self, request: ApiRequest) -> Result<Value, ApiError> {
        let token = self.inner.tokens.access_token();
        match self.dispatch(&request, token.as_deref()).await {
            Err(err) if err.is_unauthorized() => {
                self.recover_unauthorized(&request, token.as_deref(), err)
                    .await
            }
            other => other,
        }
    }

    async fn recover_unauthorized(
        &self,
        request: &ApiRequest,
        stale_token: Option<&str>,
        err: ApiError,
    ) -> Result<Value, ApiError> {
        if request.is_refresh() {
            info!("Refresh token rejected, clearing tokens");
            self.end_session(true);
            return Err(err);
        }

        let lease = match self.inner.refresh.join(stale_token, self.inner.tokens.as_ref()) {
            RefreshTicket::Rotated(token) => {
                debug!(path = %request.path, "Access token rotated meanwhile, replaying");
                return self.dispatch(request, Some(&token)).await;
            }
            RefreshTicket::Follower(waiter) => {
                return match waiter.wait().await {
                    RefreshOutcome::Refreshed(token) => self.dispatch(request, Some(&token)).await,
                    RefreshOutcome::Failed(reason) => Err(ApiError::RefreshFailed(reason)),
                };
            }
            RefreshTicket::Leader(lease) => lease,
        };

        let Some(refresh_token) = self.inner.tokens.refresh_token() else {
            info!("No refresh token available");
            self.end_session(false);
            lease.settle(RefreshOutcome::Failed("no refresh token available".to_string()));
            return Err(err);
        };

        info!("Attempting to refresh access token");
        match self.refresh_tokens(&refresh_token).await {
            Ok(tokens) => {
                if let Err(store_err) = self
                    .inner
                    .tokens
                    .set_tokens(&tokens.access_token, &tokens.refresh_token)
                {
                    error!("Could not persist refreshed tokens: {}", store_err);
                }
                let released =
                    lease.settle(RefreshOutcome::Refreshed(tokens.access_token.clone()));
                info!(released, "Token refreshed successfully");
                self.dispatch(request, Some(&tokens.access_token)).await
            }
            Err(refresh_err) => {
                error!("Token refresh failed: {}", refresh_err);
                let reason = refresh_err.user_message("token refresh failed");
                // Tokens must be gone before the coordinator returns to idle.
                self.end_session(true);
                lease.settle(RefreshOutcome::Failed(reason.clone()));
                Err(ApiError::RefreshFailed(reason))
            }
        }
    }

    async fn refresh_tokens(&self, refresh_token: &str) -> Result<AuthTokens, ApiError> {
        let request = ApiRequest::post(REFRESH_PATH).json(&RefreshRequest {
            refresh_token: refresh_token.to_string(),
        })?;
        let body = self.dispatch(&request, None).await?;
        Ok(serde_json::from_value(body)?)
    }

    /// Clear stored tokens and tell the session observer.
    fn end_session(&self, clear_refresh_token: bool) {
        let cleared = if clear_refresh_token {
            self.inner.tokens.clear()
        } else {
            self.inner.tokens.clear_access_token()
        };
        if let Err(err) = cleared {
            error!("Could not clear stored tokens: {}", err);
        }
        self.inner.session_observer.session_expired();
    }

    fn url(&self, path: &str) -> String {
        if path.starts_with('/') {
            format!("{}{}", self.inner.base_url, path)
        } else {
            format!("{}/{}", self.inner.base_url, path)
        }
    }

    /// One network round trip, no retry logic.
    async fn dispatch(&self, request: &ApiRequest, token: Option<&str>) -> Result<Value, ApiError> {
        let url = self.url(&request.path);
        let mut builder = self.inner.http.request(request.method.clone(), &url);
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        if let Some(token) = token {
            builder = builder.bearer_auth(token);
        }
        builder = match &request.body {
            RequestBody::Empty => builder,
            RequestBody::Json(value) => builder.json(value),
            RequestBody::Multipart(part) => builder.multipart(part.to_form()?),
        };

        debug!(method = %request.method, %url, "Dispatching request");

        let outcome = async {
            let response = builder.send().await?;
            let status = response.status();
            let bytes = response.bytes().await?;
            Ok::<_, reqwest::Error>((status, bytes))
        }
        .await;

        let (status, bytes) = match outcome {
            Ok(received) => received,
            Err(err) => {
                warn!(method = %request.method, %url, "Request failed: {}", err);
                self.observe(RequestLog {
                    method: request.method.to_string(),
                    url,
                    status: None,
                    request_data: request.logged_body(),
                    response_data: None,
                    error: Some(RequestLogError {
                        message: err.to_string(),
                        code: transport_code(&err),
                        response: None,
                    }),
                });
                return Err(err.into());
            }
        };

        let body = decode_body(&bytes);
        debug!(method = %request.method, %url, status = status.as_u16(), "Response received");

        if status.is_success() {
            self.observe(RequestLog {
                method: request.method.to_string(),
                url,
                status: Some(status.as_u16()),
                request_data: request.logged_body(),
                response_data: Some(body.clone()),
                error: None,
            });
            Ok(body)
        } else {
            self.observe(RequestLog {
                method: request.method.to_string(),
                url: url.clone(),
                status: Some(status.as_u16()),
                request_data: request.logged_body(),
                response_data: Some(body.clone()),
                error: Some(RequestLogError {
                    message: format!("Request failed with status code {}", status.as_u16()),
                    code: Some(status.to_string()),
                    response: Some(body.clone()),
                }),
            });
            Err(ApiError::Status { status, url, body })
        }
    }

    fn observe(&self, record: RequestLog) {
        let observer = self
            .inner
            .request_observer
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        if let Some(observer) = observer {
            observer.on_request_complete(&record);
        }
    }
}

fn transport_code(err: &reqwest::Error) -> Option<String> {
    if err.is_timeout() {
        Some("ETIMEDOUT".to_string())
    } else if err.is_connect() {
        Some("ECONNREFUSED".to_string())
    } else {
        None
    }
}

/// Empty bodies decode as `null`, non-JSON bodies as a JSON string.
fn decode_body(bytes: &[u8]) -> Value {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Value::Null;
    }
    serde_json::from_slice(bytes)
        .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(bytes).into_owned()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{CountingSessionObserver, setup};
    use httpmock::prelude::*;
    use observer::DebugLog;
    use reqwest::StatusCode;

    fn client_for(
        server: &MockServer,
        tokens: Arc<dyn TokenStore>,
        session: Arc<CountingSessionObserver>,
    ) -> ApiClient {
        ApiClient::builder(server.url("/api"))
            .token_store(tokens)
            .session_observer(session)
            .build()
            .unwrap()
    }

    #[test]
    fn test_decode_body_variants() {
        assert_eq!(decode_body(b""), Value::Null);
        assert_eq!(decode_body(b"  \n"), Value::Null);
        assert_eq!(decode_body(br#"{"ok":true}"#), json!({ "ok": true }));
        assert_eq!(decode_body(b"Bad Gateway"), json!("Bad Gateway"));
    }

    #[tokio::test]
    async fn test_attaches_bearer_token() {
        setup();
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(GET)
                    .path("/api/profile")
                    .header("Authorization", "Bearer a1");
                then.status(200).json_body(json!({ "email": "me@example.com" }));
            })
            .await;

        let tokens: Arc<dyn TokenStore> = Arc::new(MemoryTokenStore::with_tokens("a1", "r1"));
        let client = client_for(&server, tokens, Arc::new(CountingSessionObserver::default()));

        let body = client.send(ApiRequest::get("/profile")).await.unwrap();
        assert_eq!(body["email"], "me@example.com");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_non_401_errors_propagate_without_retry() {
        setup();
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(GET).path("/api/products/9");
                then.status(404).json_body(json!({ "detail": "Product not found" }));
            })
            .await;

        let session = Arc::new(CountingSessionObserver::default());
        let tokens: Arc<dyn TokenStore> = Arc::new(MemoryTokenStore::with_tokens("a1", "r1"));
        let client = client_for(&server, tokens.clone(), session.clone());

        let err = client.send(ApiRequest::get("/products/9")).await.unwrap_err();
        assert_eq!(err.status(), Some(StatusCode::NOT_FOUND));
        assert_eq!(err.user_message("Failed"), "Product not found");
        assert_eq!(mock.calls_async().await, 1);
        assert_eq!(session.count(), 0);
        assert_eq!(tokens.access_token().as_deref(), Some("a1"));
    }

    #[tokio::test]
    async fn test_401_refreshes_and_replays_once() {
        setup();
        let server = MockServer::start_async().await;
        let stale = server
            .mock_async(|when, then| {
                when.method(GET)
                    .path("/api/profile")
                    .header("Authorization", "Bearer stale");
                then.status(401).json_body(json!({ "detail": "expired" }));
            })
            .await;
        let fresh = server
            .mock_async(|when, then| {
                when.method(GET)
                    .path("/api/profile")
                    .header("Authorization", "Bearer fresh");
                then.status(200).json_body(json!({ "fullName": "Ada" }));
            })
            .await;
        let refresh = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/api/auth/refresh")
                    .json_body(json!({ "refreshToken": "r1" }));
                then.status(200)
                    .json_body(json!({ "accessToken": "fresh", "refreshToken": "r2" }));
            })
            .await;

        let tokens: Arc<dyn TokenStore> = Arc::new(MemoryTokenStore::with_tokens("stale", "r1"));
        let client = client_for(&server, tokens.clone(), Arc::new(CountingSessionObserver::default()));

        let body = client.send(ApiRequest::get("/profile")).await.unwrap();
        assert_eq!(body["fullName"], "Ada");
        assert_eq!(stale.calls_async().await, 1);
        assert_eq!(fresh.calls_async().await, 1);
        assert_eq!(refresh.calls_async().await, 1);
        assert_eq!(tokens.access_token().as_deref(), Some("fresh"));
        assert_eq!(tokens.refresh_token().as_deref(), Some("r2"));
    }

    #[tokio::test]
    async fn test_replayed_401_is_not_retried_again() {
        setup();
        let server = MockServer::start_async().await;
        let profile = server
            .mock_async(|when, then| {
                when.method(GET).path("/api/profile");
                then.status(401);
            })
            .await;
        let refresh = server
            .mock_async(|when, then| {
                when.method(POST).path("/api/auth/refresh");
                then.status(200)
                    .json_body(json!({ "accessToken": "fresh", "refreshToken": "r2" }));
            })
            .await;

        let tokens: Arc<dyn TokenStore> = Arc::new(MemoryTokenStore::with_tokens("stale", "r1"));
        let client = client_for(&server, tokens, Arc::new(CountingSessionObserver::default()));

        let err = client.send(ApiRequest::get("/profile")).await.unwrap_err();
        assert!(err.is_unauthorized());
        assert_eq!(profile.calls_async().await, 2);
        assert_eq!(refresh.calls_async().await, 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_401s_share_one_refresh() {
        setup();
        let server = MockServer::start_async().await;
        let stale = server
            .mock_async(|when, then| {
                when.method(GET)
                    .path("/api/profile")
                    .header("Authorization", "Bearer stale");
                then.status(401);
            })
            .await;
        let fresh = server
            .mock_async(|when, then| {
                when.method(GET)
                    .path("/api/profile")
                    .header("Authorization", "Bearer fresh");
                then.status(200).json_body(json!({ "ok": true }));
            })
            .await;
        let refresh = server
            .mock_async(|when, then| {
                when.method(POST).path("/api/auth/refresh");
                then.status(200)
                    .delay(Duration::from_millis(300))
                    .json_body(json!({ "accessToken": "fresh", "refreshToken": "r2" }));
            })
            .await;

        let tokens: Arc<dyn TokenStore> = Arc::new(MemoryTokenStore::with_tokens("stale", "r1"));
        let client = client_for(&server, tokens, Arc::new(CountingSessionObserver::default()));

        let calls = (0..5).map(|_| {
            let client = client.clone();
            async move { client.send(ApiRequest::get("/profile")).await }
        });
        let results = futures::future::join_all(calls).await;

        assert!(results.iter().all(Result::is_ok));
        assert_eq!(refresh.calls_async().await, 1);
        assert_eq!(stale.calls_async().await, 5);
        assert_eq!(fresh.calls_async().await, 5);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_refresh_failure_clears_tokens_and_signals_once() {
        setup();
        let server = MockServer::start_async().await;
        let stale = server
            .mock_async(|when, then| {
                when.method(GET).path("/api/profile");
                then.status(401);
            })
            .await;
        let refresh = server
            .mock_async(|when, then| {
                when.method(POST).path("/api/auth/refresh");
                then.status(401)
                    .delay(Duration::from_millis(300))
                    .json_body(json!({ "detail": "refresh token expired" }));
            })
            .await;

        let session = Arc::new(CountingSessionObserver::default());
        let tokens: Arc<dyn TokenStore> = Arc::new(MemoryTokenStore::with_tokens("stale", "r1"));
        let client = client_for(&server, tokens.clone(), session.clone());

        let calls = (0..4).map(|_| {
            let client = client.clone();
            async move { client.send(ApiRequest::get("/profile")).await }
        });
        let results = futures::future::join_all(calls).await;

        for result in &results {
            match result {
                Err(ApiError::RefreshFailed(reason)) => assert_eq!(reason, "refresh token expired"),
                other => panic!("expected refresh failure, got {other:?}"),
            }
        }
        assert_eq!(refresh.calls_async().await, 1);
        assert_eq!(stale.calls_async().await, 4);
        assert_eq!(session.count(), 1);
        assert!(tokens.access_token().is_none());
        assert!(tokens.refresh_token().is_none());
    }

    /// Records whether the refresh was still in flight when the session ended.
    #[derive(Default)]
    struct RefreshStateObserver {
        client: once_cell::sync::OnceCell<ApiClient>,
        refreshing_at_expiry: std::sync::Mutex<Vec<bool>>,
    }

    impl SessionObserver for RefreshStateObserver {
        fn session_expired(&self) {
            let refreshing = self
                .client
                .get()
                .is_some_and(|client| client.inner.refresh.is_refreshing());
            self.refreshing_at_expiry.lock().unwrap().push(refreshing);
        }
    }

    #[tokio::test]
    async fn test_failed_refresh_clears_tokens_before_releasing_waiters() {
        setup();
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/api/profile");
                then.status(401);
            })
            .await;
        let refresh = server
            .mock_async(|when, then| {
                when.method(POST).path("/api/auth/refresh");
                then.status(500)
                    .delay(Duration::from_millis(200))
                    .json_body(json!({ "detail": "refresh unavailable" }));
            })
            .await;

        let observer = Arc::new(RefreshStateObserver::default());
        let tokens: Arc<dyn TokenStore> = Arc::new(MemoryTokenStore::with_tokens("stale", "r1"));
        let client = ApiClient::builder(server.url("/api"))
            .token_store(tokens.clone())
            .session_observer(observer.clone())
            .build()
            .unwrap();
        observer.client.set(client.clone()).unwrap();

        let calls = (0..3).map(|_| {
            let client = client.clone();
            async move { client.send(ApiRequest::get("/profile")).await }
        });
        for result in futures::future::join_all(calls).await {
            assert!(matches!(result, Err(ApiError::RefreshFailed(_))));
        }

        assert_eq!(refresh.calls_async().await, 1);
        assert_eq!(*observer.refreshing_at_expiry.lock().unwrap(), vec![true]);
        assert!(!client.inner.refresh.is_refreshing());
        assert!(tokens.refresh_token().is_none());
    }

    #[tokio::test]
    async fn test_missing_refresh_token_ends_session() {
        setup();
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/api/profile");
                then.status(401);
            })
            .await;
        let refresh = server
            .mock_async(|when, then| {
                when.method(POST).path("/api/auth/refresh");
                then.status(200);
            })
            .await;

        let session = Arc::new(CountingSessionObserver::default());
        let tokens: Arc<dyn TokenStore> = Arc::new(MemoryTokenStore::new());
        let client = client_for(&server, tokens.clone(), session.clone());

        let err = client.send(ApiRequest::get("/profile")).await.unwrap_err();
        assert!(err.is_unauthorized());
        assert_eq!(refresh.calls_async().await, 0);
        assert_eq!(session.count(), 1);
    }

    #[tokio::test]
    async fn test_401_on_refresh_endpoint_clears_tokens() {
        setup();
        let server = MockServer::start_async().await;
        let refresh = server
            .mock_async(|when, then| {
                when.method(POST).path("/api/auth/refresh");
                then.status(401);
            })
            .await;

        let session = Arc::new(CountingSessionObserver::default());
        let tokens: Arc<dyn TokenStore> = Arc::new(MemoryTokenStore::with_tokens("a1", "r1"));
        let client = client_for(&server, tokens.clone(), session.clone());

        let request = ApiRequest::post(REFRESH_PATH)
            .json(&json!({ "refreshToken": "r1" }))
            .unwrap();
        let err = client.send(request).await.unwrap_err();

        assert!(err.is_unauthorized());
        assert_eq!(refresh.calls_async().await, 1);
        assert_eq!(session.count(), 1);
        assert!(tokens.access_token().is_none());
        assert!(tokens.refresh_token().is_none());
    }

    #[tokio::test]
    async fn test_request_observer_sees_success_and_failure() {
        setup();
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/api/products/search");
                then.status(200).json_body(json!({ "products": [] }));
            })
            .await;
        server
            .mock_async(|when, then| {
                when.method(DELETE).path("/api/products/3");
                then.status(500).json_body(json!({ "message": "boom" }));
            })
            .await;

        let log = Arc::new(DebugLog::new());
        let tokens: Arc<dyn TokenStore> = Arc::new(MemoryTokenStore::new());
        let client = client_for(&server, tokens, Arc::new(CountingSessionObserver::default()));
        client.set_request_observer(log.clone());

        let search = ApiRequest::post("/products/search")
            .json(&json!({ "query": "brake" }))
            .unwrap();
        client.send(search).await.unwrap();
        client.send(ApiRequest::delete("/products/3")).await.unwrap_err();

        let entries = log.entries();
        assert_eq!(entries.len(), 2);

        let failed = &entries[0].record;
        assert_eq!(failed.method, "DELETE");
        assert_eq!(failed.status, Some(500));
        assert_eq!(failed.response_data, Some(json!({ "message": "boom" })));
        assert!(failed.error.is_some());

        let ok = &entries[1].record;
        assert_eq!(ok.method, "POST");
        assert!(ok.url.ends_with("/api/products/search"));
        assert_eq!(ok.request_data, Some(json!({ "query": "brake" })));
        assert!(ok.error.is_none());

        client.clear_request_observer();
        client.send(ApiRequest::delete("/products/3")).await.unwrap_err();
        assert_eq!(log.len(), 2);
    }

    #[tokio::test]
    async fn test_query_parameters_are_sent() {
        setup();
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(GET)
                    .path("/api/chat/conversations")
                    .query_param("skip", "20")
                    .query_param("limit", "10");
                then.status(200).json_body(json!({ "conversations": [] }));
            })
            .await;

        let tokens: Arc<dyn TokenStore> = Arc::new(MemoryTokenStore::new());
        let client = client_for(&server, tokens, Arc::new(CountingSessionObserver::default()));
        let request = ApiRequest::get("/chat/conversations")
            .query("skip", 20)
            .query("limit", 10);
        client.send(request).await.unwrap();
        mock.assert_async().await;
    }
}
