use async_trait::async_trait;

use business::domain::catalog::errors::CatalogError;
use business::domain::catalog::model::{CatalogQuery, Product};
use business::domain::catalog::services::CatalogService;

use crate::client::ApiClient;
use crate::dto::{ProductDto, product_list};

pub struct CatalogServiceHttp {
    client: ApiClient,
}

impl CatalogServiceHttp {
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl CatalogService for CatalogServiceHttp {
    async fn fetch_products(&self, query: &CatalogQuery) -> Result<Vec<Product>, CatalogError> {
        let mut params: Vec<(&str, String)> = Vec::new();
        if let Some(category) = &query.category {
            params.push(("category", category.clone()));
        }
        if let Some(limit) = query.limit {
            params.push(("limit", limit.to_string()));
        }

        let response = self
            .client
            .client
            .get(self.client.products_url())
            .query(&params)
            .send()
            .await
            .map_err(|e| {
                tracing::warn!(error = %e, "catalog request failed");
                CatalogError::Unavailable
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(CatalogError::Rejected {
                status: status.as_u16(),
            });
        }

        let body: serde_json::Value = response
            .json()
            .await
            .map_err(|_| CatalogError::InvalidResponse)?;
        let items = product_list(body).ok_or(CatalogError::InvalidResponse)?;

        let total = items.len();
        let products: Vec<Product> = items
            .into_iter()
            .filter_map(|item| serde_json::from_value::<ProductDto>(item).ok())
            .map(ProductDto::into_domain)
            .collect();
        if products.len() < total {
            tracing::warn!(skipped = total - products.len(), "ignored malformed catalog records");
        }

        Ok(products)
    }
}
