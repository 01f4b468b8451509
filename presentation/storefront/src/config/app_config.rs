use business::application::catalog::sync::CatalogSyncConfig;
use business::domain::cart::model::{CartConfig, DEFAULT_SHIPPING_FEE};
use business::domain::checkout::model::CheckoutConfig;
use business::domain::payment::model::PaymentConfig;
use business::domain::retry::RetryPolicy;
use std::time::Duration;
use storefront_api::config::{ApiConfig, DEFAULT_BASE_URL, DEFAULT_TIMEOUT};

use super::env::{
    EnvSource, ProcessEnv, flag_or, millis_or, parse_or, positive_secs_or, secs_or, string_or,
};
use super::storage_config::StorageConfig;

pub const DEFAULT_SYNC_INTERVAL: Duration = Duration::from_secs(60);

#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub api: ApiConfig,
    pub storage: StorageConfig,
    pub cart: CartConfig,
    pub catalog: CatalogSyncConfig,
    pub sync_interval: Duration,
    pub payment: PaymentConfig,
    pub retry: RetryPolicy,
    pub checkout: CheckoutConfig,
}

impl AppConfig {
    /// Loads `.env` if present, then reads the process environment.
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_source(&ProcessEnv)
    }

    /// Environment variables:
    /// - STOREFRONT_API_URL (default: "http://localhost:5000/api")
    /// - STOREFRONT_API_TIMEOUT_SECS (default: 15)
    /// - STOREFRONT_STORAGE_DIR (see [`StorageConfig`])
    /// - CART_SHIPPING_FEE in minor units (default: 20000)
    /// - CATALOG_STALENESS_SECS (default: 300), CATALOG_SYNC_INTERVAL_SECS (default: 60)
    /// - PAYMENT_TIMEOUT_SECS (60), PAYMENT_FIRST_POLL_DELAY_SECS (10), PAYMENT_POLL_INTERVAL_SECS (5)
    /// - RETRY_MAX_ATTEMPTS (3), RETRY_INITIAL_DELAY_MS (500), RETRY_MAX_DELAY_MS (4000)
    /// - CHECKOUT_BLOCK_UNMATCHED_ITEMS (default: true)
    ///
    /// The API timeout, sync interval, payment timeout and poll interval must
    /// be greater than zero.
    pub fn from_source(env: &dyn EnvSource) -> anyhow::Result<Self> {
        let api = ApiConfig::new(
            string_or(env, "STOREFRONT_API_URL", DEFAULT_BASE_URL),
            positive_secs_or(env, "STOREFRONT_API_TIMEOUT_SECS", DEFAULT_TIMEOUT)?,
        );

        let retry_defaults = RetryPolicy::default();
        let retry = RetryPolicy {
            max_attempts: parse_or(env, "RETRY_MAX_ATTEMPTS", retry_defaults.max_attempts)?.max(1),
            initial_delay: millis_or(env, "RETRY_INITIAL_DELAY_MS", retry_defaults.initial_delay)?,
            max_delay: millis_or(env, "RETRY_MAX_DELAY_MS", retry_defaults.max_delay)?,
        };

        let catalog_defaults = CatalogSyncConfig::default();
        let catalog = CatalogSyncConfig {
            staleness: secs_or(env, "CATALOG_STALENESS_SECS", catalog_defaults.staleness)?,
            retry: retry.clone(),
        };

        let payment_defaults = PaymentConfig::default();
        let payment = PaymentConfig {
            timeout: positive_secs_or(env, "PAYMENT_TIMEOUT_SECS", payment_defaults.timeout)?,
            first_poll_delay: secs_or(
                env,
                "PAYMENT_FIRST_POLL_DELAY_SECS",
                payment_defaults.first_poll_delay,
            )?,
            poll_interval: positive_secs_or(env, "PAYMENT_POLL_INTERVAL_SECS", payment_defaults.poll_interval)?,
        };

        Ok(Self {
            api,
            storage: StorageConfig::from_source(env),
            cart: CartConfig {
                shipping_fee: parse_or(env, "CART_SHIPPING_FEE", DEFAULT_SHIPPING_FEE)?,
            },
            catalog,
            sync_interval: positive_secs_or(env, "CATALOG_SYNC_INTERVAL_SECS", DEFAULT_SYNC_INTERVAL)?,
            payment,
            retry,
            checkout: CheckoutConfig {
                block_unmatched_items: flag_or(env, "CHECKOUT_BLOCK_UNMATCHED_ITEMS", true)?,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn should_fall_back_to_defaults() {
        let config = AppConfig::from_source(&vars(&[])).unwrap();

        assert_eq!(config.api, ApiConfig::default());
        assert_eq!(config.cart, CartConfig::default());
        assert_eq!(config.payment, PaymentConfig::default());
        assert_eq!(config.retry, RetryPolicy::default());
        assert_eq!(config.catalog, CatalogSyncConfig::default());
        assert_eq!(config.sync_interval, DEFAULT_SYNC_INTERVAL);
        assert!(config.checkout.block_unmatched_items);
    }

    #[test]
    fn should_read_overrides() {
        let config = AppConfig::from_source(&vars(&[
            ("STOREFRONT_API_URL", "https://shop.example/api"),
            ("STOREFRONT_STORAGE_DIR", "memory"),
            ("CART_SHIPPING_FEE", "0"),
            ("PAYMENT_TIMEOUT_SECS", "90"),
            ("RETRY_MAX_ATTEMPTS", "5"),
            ("CHECKOUT_BLOCK_UNMATCHED_ITEMS", "false"),
        ]))
        .unwrap();

        assert_eq!(config.api.base_url, "https://shop.example/api");
        assert_eq!(config.storage, StorageConfig::Memory);
        assert_eq!(config.cart.shipping_fee, 0);
        assert_eq!(config.payment.timeout, Duration::from_secs(90));
        assert_eq!(config.catalog.retry.max_attempts, 5);
        assert!(!config.checkout.block_unmatched_items);
    }

    #[test]
    fn should_reject_zero_periods_and_timeouts() {
        for key in [
            "STOREFRONT_API_TIMEOUT_SECS",
            "CATALOG_SYNC_INTERVAL_SECS",
            "PAYMENT_TIMEOUT_SECS",
            "PAYMENT_POLL_INTERVAL_SECS",
        ] {
            let result = AppConfig::from_source(&vars(&[(key, "0")]));

            assert!(result.is_err(), "{} = 0 should be rejected", key);
        }
    }

    #[test]
    fn should_accept_zero_first_poll_delay_and_staleness() {
        let config = AppConfig::from_source(&vars(&[
            ("PAYMENT_FIRST_POLL_DELAY_SECS", "0"),
            ("CATALOG_STALENESS_SECS", "0"),
        ]))
        .unwrap();

        assert_eq!(config.payment.first_poll_delay, Duration::ZERO);
        assert_eq!(config.catalog.staleness, Duration::ZERO);
    }

    #[test]
    fn should_fail_on_invalid_values() {
        let result = AppConfig::from_source(&vars(&[("CART_SHIPPING_FEE", "two hundred")]));

        assert!(result.is_err());
    }
}
