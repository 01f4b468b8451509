//! Composition root for the storefront checkout core.
//!
//! - config/: environment-driven configuration
//! - setup/: tracing, dependency wiring and the optional process-wide instance
//! - notifications: domain events and errors rendered for the shopper
//! - session: sign-in state shared with checkout

pub mod notifications;
pub mod session;

pub mod config {
    pub mod app_config;
    pub mod env;
    pub mod storage_config;
}

pub mod setup {
    pub mod dependency_injection;
    pub mod global;
    pub mod tracing;
}

pub use config::app_config::AppConfig;
pub use setup::dependency_injection::StorefrontContainer;
