use async_trait::async_trait;

use super::errors::CatalogError;
use super::model::{CatalogQuery, Product};

/// Service port for the live product catalog (`GET /products`).
#[async_trait]
pub trait CatalogService: Send + Sync {
    async fn fetch_products(&self, query: &CatalogQuery) -> Result<Vec<Product>, CatalogError>;
}
