use reqwest::Client;

use crate::config::ApiConfig;

/// Shared HTTP client for the storefront backend.
#[derive(Clone)]
pub struct ApiClient {
    pub client: Client,
    pub base_url: String,
}

impl ApiClient {
    pub fn new(config: &ApiConfig) -> Self {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .unwrap_or_default();

        Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Absolute URL for a path relative to the API root.
    pub fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    pub fn products_url(&self) -> String {
        self.url("products")
    }

    pub fn orders_url(&self) -> String {
        self.url("orders")
    }

    pub fn mpesa_initiate_url(&self) -> String {
        self.url("payments/mpesa/initiate")
    }

    pub fn mpesa_status_url(&self, checkout_request_id: &str) -> String {
        self.url(&format!("payments/mpesa/status/{}", checkout_request_id))
    }
}

/// Pulls a human-readable message out of an error body, if there is one.
pub(crate) fn error_message(body: &str) -> Option<String> {
    let parsed: serde_json::Value = serde_json::from_str(body).ok()?;
    ["message", "error", "errorMessage"]
        .iter()
        .find_map(|key| parsed.get(*key).and_then(|v| v.as_str()))
        .map(str::trim)
        .filter(|m| !m.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn should_join_paths_without_double_slashes() {
        let client = ApiClient::new(&ApiConfig::new("http://shop.test/api/", Duration::from_secs(1)));

        assert_eq!(client.products_url(), "http://shop.test/api/products");
        assert_eq!(
            client.mpesa_status_url("ws_CO_1"),
            "http://shop.test/api/payments/mpesa/status/ws_CO_1"
        );
    }

    #[test]
    fn should_read_message_from_error_body() {
        assert_eq!(
            error_message(r#"{"message": "Insufficient funds"}"#).as_deref(),
            Some("Insufficient funds")
        );
        assert_eq!(error_message("<html>bad gateway</html>"), None);
    }
}
