//! # Product store
//!
//! [`ProductStore`] holds the product panel's result list. Searches and
//! listings replace it, creates prepend, updates replace the matching entry in
//! place and deletes remove it. Every mutation reports its outcome through the
//! store's [`Notifier`].
//!
//! [`ProductSort`] and [`ProductFilter`] reorder and narrow a result slice
//! locally, without another round trip.

use clap::ValueEnum;
use std::{cmp::Ordering, sync::Arc};
use tracing::{debug, error};

use crate::{
    api::ApiService,
    error::ApiError,
    models::{
        Availability, FilterOptions, Product, ProductDraft, ProductPage, ProductPatch,
        SearchParams,
    },
    notify::{Notification, Notifier},
};

pub struct ProductStore {
    api: ApiService,
    notifier: Arc<dyn Notifier>,
    products: Vec<Product>,
    is_loading: bool,
    is_searching: bool,
}

impl ProductStore {
    pub fn new(api: ApiService, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            api,
            notifier,
            products: Vec::new(),
            is_loading: false,
            is_searching: false,
        }
    }

    pub fn products(&self) -> &[Product] {
        &self.products
    }

    pub fn is_loading(&self) -> bool {
        self.is_loading
    }

    pub fn is_searching(&self) -> bool {
        self.is_searching
    }

    pub async fn search(&mut self, params: &SearchParams) -> Result<&[Product], ApiError> {
        self.is_searching = true;
        let result = self.api.products.search(params).await;
        self.is_searching = false;
        let page = result.inspect_err(|err| self.report("Search Error", "Failed to search products", err))?;
        debug!(query = %params.query, found = page.products.len(), "Search finished");
        self.products = page.products;
        Ok(&self.products)
    }

    /// Load one catalog page into the store.
    pub async fn list(&mut self, page: u32, limit: u32) -> Result<ProductPage, ApiError> {
        self.is_loading = true;
        let result = self.api.products.list(page, limit).await;
        self.is_loading = false;
        let page = result.inspect_err(|err| self.report("Error", "Failed to load products", err))?;
        self.products = page.products.clone();
        Ok(page)
    }

    pub async fn get(&mut self, product_id: i64) -> Result<Product, ApiError> {
        self.is_loading = true;
        let result = self.api.products.get_by_id(product_id).await;
        self.is_loading = false;
        result.inspect_err(|err| self.report("Error", "Failed to get product", err))
    }

    /// Fetch several products in parallel. Failures are dropped, so the
    /// result may be shorter than `product_ids`.
    pub async fn get_by_ids(&self, product_ids: &[i64]) -> Vec<Product> {
        self.api.products.get_by_ids(product_ids).await
    }

    pub async fn create(&mut self, draft: &ProductDraft) -> Result<Product, ApiError> {
        self.is_loading = true;
        let result = self.api.products.create(draft).await;
        self.is_loading = false;
        let product = result.inspect_err(|err| self.report("Error", "Failed to create product", err))?;
        self.products.insert(0, product.clone());
        self.succeed("Product created successfully");
        Ok(product)
    }

    pub async fn update(&mut self, product_id: i64, patch: &ProductPatch) -> Result<Product, ApiError> {
        self.is_loading = true;
        let result = self.api.products.update(product_id, patch).await;
        self.is_loading = false;
        let product = result.inspect_err(|err| self.report("Error", "Failed to update product", err))?;
        for entry in self.products.iter_mut().filter(|p| p.id == product_id) {
            *entry = product.clone();
        }
        self.succeed("Product updated successfully");
        Ok(product)
    }

    pub async fn delete(&mut self, product_id: i64) -> Result<(), ApiError> {
        self.is_loading = true;
        let result = self.api.products.delete(product_id).await;
        self.is_loading = false;
        result.inspect_err(|err| self.report("Error", "Failed to delete product", err))?;
        self.products.retain(|p| p.id != product_id);
        self.succeed("Product deleted successfully");
        Ok(())
    }

    pub async fn filter_options(&self) -> Result<FilterOptions, ApiError> {
        self.api
            .products
            .filter_options()
            .await
            .inspect_err(|err| self.report("Error", "Failed to load filter options", err))
    }

    fn succeed(&self, description: &str) {
        self.notifier.notify(Notification::success("Success", description));
    }

    fn report(&self, title: &str, fallback: &str, err: &ApiError) {
        error!("{}: {}", title, err);
        self.notifier
            .notify(Notification::error(title, err.user_message(fallback)));
    }
}

/// Order of the results panel.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum ProductSort {
    /// Keep the server's order.
    #[default]
    Relevance,
    PriceAsc,
    PriceDesc,
    Name,
    Newest,
}

impl ProductSort {
    /// Value the search endpoint expects in `sortBy`, if any.
    pub fn as_param(self) -> Option<&'static str> {
        match self {
            ProductSort::Relevance => None,
            ProductSort::PriceAsc => Some("price_asc"),
            ProductSort::PriceDesc => Some("price_desc"),
            ProductSort::Name => Some("name"),
            ProductSort::Newest => Some("newest"),
        }
    }

    /// Stable sort in place.
    pub fn apply(self, products: &mut [Product]) {
        match self {
            ProductSort::Relevance => {}
            ProductSort::PriceAsc => products.sort_by(|a, b| cmp_price(a, b)),
            ProductSort::PriceDesc => products.sort_by(|a, b| cmp_price(b, a)),
            ProductSort::Name => {
                products.sort_by_key(|p| p.name.to_lowercase());
            }
            ProductSort::Newest => products.sort_by(|a, b| b.created_at.cmp(&a.created_at)),
        }
    }
}

fn cmp_price(a: &Product, b: &Product) -> Ordering {
    a.price.total_cmp(&b.price)
}

/// Local narrowing of a result list. Unset criteria match everything.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProductFilter {
    pub availability: Option<Availability>,
    /// Case-insensitive brand match.
    pub brand: Option<String>,
    pub validated_only: bool,
}

impl ProductFilter {
    pub fn matches(&self, product: &Product) -> bool {
        if self.availability.is_some_and(|a| a != product.availability) {
            return false;
        }
        if self
            .brand
            .as_deref()
            .is_some_and(|brand| !product.brand.eq_ignore_ascii_case(brand))
        {
            return false;
        }
        !self.validated_only || product.validated_by_manufacturer
    }

    pub fn apply<'a>(&self, products: &'a [Product]) -> Vec<&'a Product> {
        products.iter().filter(|p| self.matches(p)).collect()
    }
}
