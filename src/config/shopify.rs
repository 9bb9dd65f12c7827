//! Shopify Files configuration

use serde::Deserialize;

use super::error::ValidationError;

/// Shopify Files upload configuration
///
/// Uploads are optional: when no store URL is configured, generated images
/// fall back to inline data URLs. Auth is either a long-lived Admin access
/// token or a client id/secret pair exchanged lazily for a token.
#[derive(Debug, Clone, Deserialize)]
pub struct ShopifyConfig {
    /// Store URL, e.g. `https://my-store.myshopify.com`
    pub store_url: Option<String>,

    /// Admin API version segment
    #[serde(default = "default_api_version")]
    pub api_version: String,

    /// Long-lived Admin API access token
    pub access_token: Option<String>,

    /// OAuth client id (client-credentials grant)
    pub client_id: Option<String>,

    /// OAuth client secret (client-credentials grant)
    pub client_secret: Option<String>,
}

impl ShopifyConfig {
    /// Check if uploads are configured
    pub fn is_configured(&self) -> bool {
        self.store_url.as_ref().is_some_and(|u| !u.is_empty())
    }

    fn has_token(&self) -> bool {
        self.access_token.as_ref().is_some_and(|t| !t.is_empty())
    }

    fn has_client_pair(&self) -> bool {
        self.client_id.as_ref().is_some_and(|c| !c.is_empty())
            && self.client_secret.as_ref().is_some_and(|s| !s.is_empty())
    }

    /// Validate Shopify configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        let Some(url) = self.store_url.as_ref().filter(|u| !u.is_empty()) else {
            // Not configured at all; nothing to check
            return Ok(());
        };

        if !url.starts_with("https://") {
            return Err(ValidationError::ShopifyStoreMustBeHttps);
        }
        if !self.has_token() && !self.has_client_pair() {
            return Err(ValidationError::ShopifyCredentialsIncomplete);
        }
        Ok(())
    }
}

impl Default for ShopifyConfig {
    fn default() -> Self {
        Self {
            store_url: None,
            api_version: default_api_version(),
            access_token: None,
            client_id: None,
            client_secret: None,
        }
    }
}

fn default_api_version() -> String {
    "2024-01".to_string()
}
