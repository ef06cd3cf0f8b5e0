//! # Endpoint bindings
//!
//! Typed wrappers over the backend REST surface (base path `/api`), grouped
//! the way the backend groups them:
//!
//! | Group | Endpoints |
//! |-------|-----------|
//! | [`ChatApi`] | `POST /chat/message`, `GET/POST /chat/conversations`, `GET/DELETE /chat/conversations/{id}` |
//! | [`ProductsApi`] | `GET /products`, `POST /products/search`, `GET/PUT/DELETE /products/{id}`, `POST /products`, `GET /products/filters/all` |
//! | [`AuthApi`] | `POST /auth/login`, `/auth/register`, `/auth/logout`, `/auth/refresh` |
//! | [`ProfileApi`] | `GET/PUT /profile`, `POST /profile/avatar` |
//!
//! All groups share one [`ApiClient`], so they share token storage, the
//! refresh protocol and the request observer.
//!
//! ```no_run
//! use parts_scout::{api::ApiService, client::ApiClient, models::SearchParams};
//!
//! # async fn demo() -> Result<(), parts_scout::error::ApiError> {
//! let api = ApiService::new(ApiClient::builder("http://localhost:8000/api").build()?);
//! let page = api.products.search(&SearchParams::new("brake pads")).await?;
//! println!("{} products", page.products.len());
//! # Ok(()) }
//! ```

pub mod auth;
pub mod chat;
pub mod products;
pub mod profile;

pub use auth::AuthApi;
pub use chat::ChatApi;
pub use products::ProductsApi;
pub use profile::ProfileApi;

use crate::client::ApiClient;

#[derive(Debug, Clone)]
pub struct ApiService {
    pub chat: ChatApi,
    pub products: ProductsApi,
    pub auth: AuthApi,
    pub profile: ProfileApi,
    client: ApiClient,
}

impl ApiService {
    pub fn new(client: ApiClient) -> Self {
        Self {
            chat: ChatApi::new(client.clone()),
            products: ProductsApi::new(client.clone()),
            auth: AuthApi::new(client.clone()),
            profile: ProfileApi::new(client.clone()),
            client,
        }
    }

    pub fn client(&self) -> &ApiClient {
        &self.client
    }
}
