//! Shopify adapter - image publishing through the Files API.

mod files_adapter;

pub use files_adapter::{ShopifyFilesAdapter, ShopifyFilesConfig};
