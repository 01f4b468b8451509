pub mod catalog;
pub mod client;
pub mod config;
mod dto;
pub mod mpesa;
pub mod orders;

pub use catalog::CatalogServiceHttp;
pub use client::ApiClient;
pub use config::ApiConfig;
pub use mpesa::MpesaGatewayHttp;
pub use orders::OrderServiceHttp;
