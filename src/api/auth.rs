//! Account endpoints. These, together with the 401 protocol in
//! [`crate::client`], are the only writers of token storage.

use tracing::{info, warn};

use crate::{
    client::{ApiClient, ApiRequest, REFRESH_PATH},
    error::ApiError,
    models::{AuthResponse, AuthTokens, LoginRequest, RefreshRequest, RegisterRequest},
    validation::{validate_email, validate_full_name, validate_password},
};

#[derive(Debug, Clone)]
pub struct AuthApi {
    client: ApiClient,
}

impl AuthApi {
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<AuthResponse, ApiError> {
        let body = LoginRequest {
            email: validate_email(email)?,
            password: password.to_string(),
        };
        let response: AuthResponse = self
            .client
            .request(ApiRequest::post("/auth/login").json(&body)?)
            .await?;
        self.store(&response.tokens)?;
        info!(email = %body.email, "Logged in");
        Ok(response)
    }

    pub async fn register(
        &self,
        email: &str,
        password: &str,
        full_name: &str,
    ) -> Result<AuthResponse, ApiError> {
        validate_password(password)?;
        let body = RegisterRequest {
            email: validate_email(email)?,
            password: password.to_string(),
            full_name: validate_full_name(full_name)?,
        };
        let response: AuthResponse = self
            .client
            .request(ApiRequest::post("/auth/register").json(&body)?)
            .await?;
        self.store(&response.tokens)?;
        info!(email = %body.email, "Registered");
        Ok(response)
    }

    /// Tell the backend to end the session, then forget the local tokens even
    /// if the call failed.
    pub async fn logout(&self) -> Result<(), ApiError> {
        let result = self.client.send(ApiRequest::post("/auth/logout")).await;
        if let Err(err) = &result {
            warn!("Logout request failed: {}", err);
        }
        self.client.tokens().clear()?;
        info!("Logged out");
        result.map(|_| ())
    }

    /// Exchange the stored refresh token for a new pair and persist it.
    pub async fn refresh(&self) -> Result<AuthTokens, ApiError> {
        let refresh_token = self
            .client
            .tokens()
            .refresh_token()
            .ok_or(ApiError::Unauthenticated)?;
        let tokens: AuthTokens = self
            .client
            .request(ApiRequest::post(REFRESH_PATH).json(&RefreshRequest { refresh_token })?)
            .await?;
        self.store(&tokens)?;
        Ok(tokens)
    }

    pub fn is_authenticated(&self) -> bool {
        self.client.tokens().access_token().is_some()
    }

    fn store(&self, tokens: &AuthTokens) -> Result<(), ApiError> {
        self.client
            .tokens()
            .set_tokens(&tokens.access_token, &tokens.refresh_token)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        test_support::setup,
        tokens::{MemoryTokenStore, TokenStore},
        validation::ValidationError,
    };
    use httpmock::prelude::*;
    use serde_json::json;
    use std::sync::Arc;

    fn api_for(server: &MockServer, tokens: Arc<MemoryTokenStore>) -> AuthApi {
        AuthApi::new(
            ApiClient::builder(server.url("/api"))
                .token_store(tokens)
                .build()
                .unwrap(),
        )
    }

    #[tokio::test]
    async fn test_login_stores_tokens() {
        setup();
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/api/auth/login")
                    .json_body(json!({ "email": "ana@example.com", "password": "hunter22" }));
                then.status(200).json_body(json!({
                    "accessToken": "a1",
                    "refreshToken": "r1",
                    "user": { "id": 1, "email": "ana@example.com", "fullName": "Ana" }
                }));
            })
            .await;

        let tokens = Arc::new(MemoryTokenStore::new());
        let auth = api_for(&server, tokens.clone());
        let response = auth.login(" ana@example.com ", "hunter22").await.unwrap();

        mock.assert_async().await;
        assert_eq!(response.user.and_then(|u| u.full_name).as_deref(), Some("Ana"));
        assert_eq!(tokens.access_token().as_deref(), Some("a1"));
        assert_eq!(tokens.refresh_token().as_deref(), Some("r1"));
        assert!(auth.is_authenticated());
    }

    #[tokio::test]
    async fn test_register_validates_before_sending() {
        setup();
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.any_request();
                then.status(200);
            })
            .await;

        let auth = api_for(&server, Arc::new(MemoryTokenStore::new()));
        let err = auth
            .register("ana@example.com", "123", "Ana")
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            ApiError::Validation(ValidationError::PasswordTooShort)
        ));
        assert_eq!(mock.calls_async().await, 0);
    }

    #[tokio::test]
    async fn test_logout_clears_tokens_even_on_failure() {
        setup();
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/api/auth/logout");
                then.status(500).json_body(json!({ "detail": "boom" }));
            })
            .await;

        let tokens = Arc::new(MemoryTokenStore::with_tokens("a1", "r1"));
        let auth = api_for(&server, tokens.clone());

        assert!(auth.logout().await.is_err());
        assert_eq!(tokens.access_token(), None);
        assert_eq!(tokens.refresh_token(), None);
        assert!(!auth.is_authenticated());
    }

    #[tokio::test]
    async fn test_refresh_persists_new_pair() {
        setup();
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/api/auth/refresh")
                    .json_body(json!({ "refreshToken": "r1" }));
                then.status(200)
                    .json_body(json!({ "accessToken": "a2", "refreshToken": "r2" }));
            })
            .await;

        let tokens = Arc::new(MemoryTokenStore::with_tokens("a1", "r1"));
        let refreshed = api_for(&server, tokens.clone()).refresh().await.unwrap();

        assert_eq!(refreshed.access_token, "a2");
        assert_eq!(tokens.refresh_token().as_deref(), Some("r2"));
    }

    #[tokio::test]
    async fn test_refresh_without_token_is_unauthenticated() {
        setup();
        let server = MockServer::start_async().await;
        let err = api_for(&server, Arc::new(MemoryTokenStore::new()))
            .refresh()
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Unauthenticated));
    }
}
