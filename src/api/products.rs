//! Product catalog endpoints.

use futures::future::join_all;
use tracing::{debug, warn};

use crate::{
    client::{ApiClient, ApiRequest},
    error::ApiError,
    models::{FilterOptions, Product, ProductDraft, ProductPage, ProductPatch, SearchParams},
};

#[derive(Debug, Clone)]
pub struct ProductsApi {
    client: ApiClient,
}

impl ProductsApi {
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }

    /// One page of the catalog. Pages start at 1.
    pub async fn list(&self, page: u32, limit: u32) -> Result<ProductPage, ApiError> {
        let request = ApiRequest::get("/products")
            .query("page", page)
            .query("limit", limit);
        self.client.request(request).await
    }

    pub async fn search(&self, params: &SearchParams) -> Result<ProductPage, ApiError> {
        self.client
            .request(ApiRequest::post("/products/search").json(params)?)
            .await
    }

    pub async fn get_by_id(&self, product_id: i64) -> Result<Product, ApiError> {
        self.client
            .request(ApiRequest::get(format!("/products/{product_id}")))
            .await
    }

    /// Fetch several products in parallel.
    ///
    /// An empty id list returns immediately without touching the network.
    /// Individual failures are logged and skipped: the result holds every
    /// product that could be fetched, in the order of `product_ids`.
    pub async fn get_by_ids(&self, product_ids: &[i64]) -> Vec<Product> {
        if product_ids.is_empty() {
            return Vec::new();
        }

        let results = join_all(product_ids.iter().map(|&id| self.get_by_id(id))).await;

        let mut products = Vec::with_capacity(results.len());
        for (id, result) in product_ids.iter().zip(results) {
            match result {
                Ok(product) => products.push(product),
                Err(err) => warn!(product_id = id, "Error fetching product: {}", err),
            }
        }
        debug!(requested = product_ids.len(), fetched = products.len(), "Fetched products by id");
        products
    }

    pub async fn create(&self, draft: &ProductDraft) -> Result<Product, ApiError> {
        self.client
            .request(ApiRequest::post("/products").json(draft)?)
            .await
    }

    pub async fn update(&self, product_id: i64, patch: &ProductPatch) -> Result<Product, ApiError> {
        self.client
            .request(ApiRequest::put(format!("/products/{product_id}")).json(patch)?)
            .await
    }

    pub async fn delete(&self, product_id: i64) -> Result<(), ApiError> {
        self.client
            .send(ApiRequest::delete(format!("/products/{product_id}")))
            .await?;
        Ok(())
    }

    /// Values accepted by the search filters.
    pub async fn filter_options(&self) -> Result<FilterOptions, ApiError> {
        self.client
            .request(ApiRequest::get("/products/filters/all"))
            .await
    }
}
