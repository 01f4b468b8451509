use once_cell::sync::OnceCell;

use super::dependency_injection::StorefrontContainer;
use crate::config::app_config::AppConfig;

static STOREFRONT: OnceCell<StorefrontContainer> = OnceCell::new();

/// Builds the process-wide container on first call and returns it on every
/// later call. Hosts that wire their own container never need this.
pub fn init_global(config: AppConfig) -> anyhow::Result<&'static StorefrontContainer> {
    STOREFRONT.get_or_try_init(|| StorefrontContainer::new(config))
}

/// The process-wide container, if [`init_global`] has run.
pub fn global() -> Option<&'static StorefrontContainer> {
    STOREFRONT.get()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::storage_config::StorageConfig;
    use std::collections::HashMap;

    #[test]
    fn should_initialize_once() {
        let mut config = AppConfig::from_source(&HashMap::<String, String>::new()).unwrap();
        config.storage = StorageConfig::Memory;

        let first = init_global(config.clone()).unwrap();
        let second = init_global(config).unwrap();

        assert!(std::ptr::eq(first, second));
        assert!(global().is_some());
    }
}
