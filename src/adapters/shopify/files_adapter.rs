//! Shopify Files adapter - publishes generated images via staged uploads.
//!
//! Implements the `FileStore` trait over the Shopify Admin GraphQL API.
//! An upload is a three-step sequence, any failure of which fails the
//! whole operation:
//!
//! 1. `stagedUploadsCreate` reserves a cloud-storage target
//! 2. a multipart POST transfers the bytes to that target
//! 3. `fileCreate` registers the staged blob as a Shopify file
//!
//! # Authentication
//!
//! Requests carry `X-Shopify-Access-Token`: either a configured long-lived
//! Admin token, or a token obtained lazily through the OAuth
//! client-credentials grant and cached for the process lifetime (no
//! expiry refresh).
//!
//! # Configuration
//!
//! ```ignore
//! let config = ShopifyFilesConfig::with_access_token(
//!     "https://demo.myshopify.com",
//!     "2024-01",
//!     token,
//! );
//! let store = ShopifyFilesAdapter::new(config);
//! ```

use async_trait::async_trait;
use secrecy::{ExposeSecret, Secret};
use serde::Deserialize;
use tokio::sync::RwLock;

use crate::ports::{FileStore, StoredFile, UploadError, UploadRequest};

const STAGED_UPLOADS_CREATE: &str = r#"
mutation stagedUploadsCreate($input: [StagedUploadInput!]!) {
  stagedUploadsCreate(input: $input) {
    stagedTargets { url resourceUrl parameters { name value } }
    userErrors { field message }
  }
}
"#;

const FILE_CREATE: &str = r#"
mutation fileCreate($files: [FileCreateInput!]!) {
  fileCreate(files: $files) {
    files { id ... on MediaImage { image { url } } }
    userErrors { field message }
  }
}
"#;

/// Credentials for the Admin API.
#[derive(Clone)]
enum ShopifyCredentials {
    /// Long-lived Admin API access token.
    AccessToken(Secret<String>),
    /// Client id/secret pair for the OAuth client-credentials grant.
    ClientPair {
        client_id: String,
        client_secret: Secret<String>,
    },
}

/// Shopify Files API configuration.
#[derive(Clone)]
pub struct ShopifyFilesConfig {
    /// Store base URL (https://<store>.myshopify.com), no trailing slash.
    store_url: String,
    /// Admin API version segment.
    api_version: String,
    credentials: ShopifyCredentials,
}

impl ShopifyFilesConfig {
    /// Configuration using a long-lived access token.
    pub fn with_access_token(
        store_url: impl Into<String>,
        api_version: impl Into<String>,
        access_token: impl Into<String>,
    ) -> Self {
        Self {
            store_url: normalize_store_url(store_url),
            api_version: api_version.into(),
            credentials: ShopifyCredentials::AccessToken(Secret::new(access_token.into())),
        }
    }

    /// Configuration using the OAuth client-credentials grant.
    pub fn with_client_credentials(
        store_url: impl Into<String>,
        api_version: impl Into<String>,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
    ) -> Self {
        Self {
            store_url: normalize_store_url(store_url),
            api_version: api_version.into(),
            credentials: ShopifyCredentials::ClientPair {
                client_id: client_id.into(),
                client_secret: Secret::new(client_secret.into()),
            },
        }
    }

    /// Builds a configuration from the loaded settings section.
    ///
    /// Returns `None` when the store is not configured; generated images
    /// then ship inline as `data:` URLs instead of being uploaded.
    pub fn from_settings(settings: &crate::config::ShopifyConfig) -> Option<Self> {
        let store_url = settings.store_url.as_ref().filter(|url| !url.is_empty())?;

        if let Some(token) = settings.access_token.as_ref().filter(|t| !t.is_empty()) {
            return Some(Self::with_access_token(
                store_url.clone(),
                settings.api_version.clone(),
                token.clone(),
            ));
        }

        match (settings.client_id.as_ref(), settings.client_secret.as_ref()) {
            (Some(id), Some(secret)) if !id.is_empty() && !secret.is_empty() => {
                Some(Self::with_client_credentials(
                    store_url.clone(),
                    settings.api_version.clone(),
                    id.clone(),
                    secret.clone(),
                ))
            }
            _ => None,
        }
    }
}

fn normalize_store_url(url: impl Into<String>) -> String {
    url.into().trim_end_matches('/').to_string()
}

/// Shopify Files implementation of the file store port.
pub struct ShopifyFilesAdapter {
    config: ShopifyFilesConfig,
    client: reqwest::Client,
    /// Token from the client-credentials grant, fetched on first use.
    cached_token: RwLock<Option<String>>,
}

impl ShopifyFilesAdapter {
    /// Creates a new adapter with the given configuration.
    pub fn new(config: ShopifyFilesConfig) -> Self {
        Self {
            config,
            client: reqwest::Client::new(),
            cached_token: RwLock::new(None),
        }
    }

    fn graphql_url(&self) -> String {
        format!(
            "{}/admin/api/{}/graphql.json",
            self.config.store_url, self.config.api_version
        )
    }

    /// Resolves the Admin token, exchanging client credentials on first use.
    async fn access_token(&self) -> Result<String, UploadError> {
        match &self.config.credentials {
            ShopifyCredentials::AccessToken(token) => Ok(token.expose_secret().clone()),
            ShopifyCredentials::ClientPair {
                client_id,
                client_secret,
            } => {
                if let Some(token) = self.cached_token.read().await.as_ref() {
                    return Ok(token.clone());
                }

                let mut cached = self.cached_token.write().await;
                // Another task may have won the exchange while we waited
                if let Some(token) = cached.as_ref() {
                    return Ok(token.clone());
                }

                let token = self
                    .request_oauth_token(client_id, client_secret.expose_secret())
                    .await?;
                *cached = Some(token.clone());
                Ok(token)
            }
        }
    }

    async fn request_oauth_token(
        &self,
        client_id: &str,
        client_secret: &str,
    ) -> Result<String, UploadError> {
        let url = format!("{}/admin/oauth/access_token", self.config.store_url);

        let response = self
            .client
            .post(&url)
            .json(&serde_json::json!({
                "client_id": client_id,
                "client_secret": client_secret,
                "grant_type": "client_credentials",
            }))
            .send()
            .await
            .map_err(|e| UploadError::network(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            tracing::error!(status = %status, body = %body, "OAuth token exchange failed");
            return Err(UploadError::authentication_failed(format!(
                "OAuth token exchange returned {status}"
            )));
        }

        let token: AccessTokenResponse = response
            .json()
            .await
            .map_err(|e| UploadError::network(format!("Failed to parse token response: {e}")))?;
        Ok(token.access_token)
    }

    /// Posts a GraphQL mutation; transport and auth failures are mapped
    /// here, mutation-level errors by the caller.
    async fn post_graphql<T: serde::de::DeserializeOwned>(
        &self,
        query: &'static str,
        variables: serde_json::Value,
    ) -> Result<GraphQlResponse<T>, UploadError> {
        let token = self.access_token().await?;

        let response = self
            .client
            .post(self.graphql_url())
            .header("X-Shopify-Access-Token", token)
            .json(&serde_json::json!({ "query": query, "variables": variables }))
            .send()
            .await
            .map_err(|e| UploadError::network(e.to_string()))?;

        let status = response.status();
        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
            return Err(UploadError::authentication_failed(format!(
                "GraphQL endpoint returned {status}"
            )));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(UploadError::network(format!(
                "GraphQL endpoint returned {status}: {body}"
            )));
        }

        response
            .json()
            .await
            .map_err(|e| UploadError::network(format!("Failed to parse GraphQL response: {e}")))
    }

    /// Step 1: reserve a staged upload target.
    async fn stage_upload(&self, request: &UploadRequest) -> Result<StagedTarget, UploadError> {
        let variables = serde_json::json!({
            "input": [{
                "resource": "IMAGE",
                "filename": request.filename,
                "mimeType": request.mime_type,
                "httpMethod": "POST",
            }]
        });

        let envelope: GraphQlResponse<StagedUploadsCreateData> =
            self.post_graphql(STAGED_UPLOADS_CREATE, variables).await?;
        extract_staged_target(envelope)
    }

    /// Step 2: transfer the bytes to the staged target.
    ///
    /// The target's parameters must precede the file part in the multipart
    /// body; cloud storage backends answer 201 or 204 on success.
    async fn transfer_to_staged_target(
        &self,
        target: &StagedTarget,
        request: &UploadRequest,
    ) -> Result<(), UploadError> {
        let mut form = reqwest::multipart::Form::new();
        for parameter in &target.parameters {
            form = form.text(parameter.name.clone(), parameter.value.clone());
        }
        let part = reqwest::multipart::Part::bytes(request.bytes.clone())
            .file_name(request.filename.clone())
            .mime_str(&request.mime_type)
            .map_err(|e| UploadError::upload_failed(format!("invalid MIME type: {e}")))?;
        form = form.part("file", part);

        let response = self
            .client
            .post(&target.url)
            .multipart(form)
            .send()
            .await
            .map_err(|e| UploadError::network(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(UploadError::upload_failed(format!(
                "staged target returned {status}: {body}"
            )));
        }
        Ok(())
    }

    /// Step 3: register the staged blob as a Shopify file.
    async fn create_file_record(
        &self,
        resource_url: &str,
        request: &UploadRequest,
    ) -> Result<CreatedFile, UploadError> {
        let alt = request
            .alt
            .clone()
            .unwrap_or_else(|| request.filename.clone());
        let variables = serde_json::json!({
            "files": [{
                "alt": alt,
                "contentType": "IMAGE",
                "originalSource": resource_url,
            }]
        });

        let envelope: GraphQlResponse<FileCreateData> =
            self.post_graphql(FILE_CREATE, variables).await?;
        extract_created_file(envelope)
    }
}

#[async_trait]
impl FileStore for ShopifyFilesAdapter {
    async fn upload_image(&self, request: UploadRequest) -> Result<StoredFile, UploadError> {
        let target = self.stage_upload(&request).await?;
        self.transfer_to_staged_target(&target, &request).await?;
        let created = self.create_file_record(&target.resource_url, &request).await?;

        let url = final_url(&created, &target.resource_url);
        tracing::info!(file_id = %created.id, "uploaded image to Shopify Files");

        Ok(StoredFile {
            url,
            file_id: Some(created.id),
        })
    }
}

/// CDN processing lags `fileCreate`; when the file record has no image URL
/// yet the staged resource URL is served instead.
fn final_url(created: &CreatedFile, resource_url: &str) -> String {
    created
        .image
        .as_ref()
        .and_then(|image| image.url.as_deref())
        .filter(|url| !url.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| resource_url.to_string())
}

fn extract_staged_target(
    envelope: GraphQlResponse<StagedUploadsCreateData>,
) -> Result<StagedTarget, UploadError> {
    if let Some(error) = envelope.errors.first() {
        return Err(UploadError::staging_failed(format!(
            "GraphQL error: {}",
            error.message
        )));
    }
    let payload = envelope
        .data
        .ok_or_else(|| UploadError::staging_failed("response missing data"))?
        .payload;
    if let Some(error) = payload.user_errors.first() {
        return Err(UploadError::staging_failed(error.message.clone()));
    }
    payload
        .staged_targets
        .into_iter()
        .next()
        .ok_or_else(|| UploadError::staging_failed("no staged target returned"))
}

fn extract_created_file(
    envelope: GraphQlResponse<FileCreateData>,
) -> Result<CreatedFile, UploadError> {
    if let Some(error) = envelope.errors.first() {
        return Err(UploadError::file_record_failed(format!(
            "GraphQL error: {}",
            error.message
        )));
    }
    let payload = envelope
        .data
        .ok_or_else(|| UploadError::file_record_failed("response missing data"))?
        .payload;
    if let Some(error) = payload.user_errors.first() {
        return Err(UploadError::file_record_failed(error.message.clone()));
    }
    payload
        .files
        .into_iter()
        .next()
        .ok_or_else(|| UploadError::file_record_failed("no file record returned"))
}

// Wire format types for the Admin GraphQL API

#[derive(Debug, Deserialize)]
struct GraphQlResponse<T> {
    data: Option<T>,
    #[serde(default)]
    errors: Vec<GraphQlError>,
}

#[derive(Debug, Deserialize)]
struct GraphQlError {
    message: String,
}

#[derive(Debug, Deserialize)]
struct StagedUploadsCreateData {
    #[serde(rename = "stagedUploadsCreate")]
    payload: StagedUploadsPayload,
}

#[derive(Debug, Deserialize)]
struct StagedUploadsPayload {
    #[serde(rename = "stagedTargets", default)]
    staged_targets: Vec<StagedTarget>,
    #[serde(rename = "userErrors", default)]
    user_errors: Vec<UserError>,
}

#[derive(Debug, Clone, Deserialize)]
struct StagedTarget {
    url: String,
    #[serde(rename = "resourceUrl")]
    resource_url: String,
    #[serde(default)]
    parameters: Vec<StagedParameter>,
}

#[derive(Debug, Clone, Deserialize)]
struct StagedParameter {
    name: String,
    value: String,
}

#[derive(Debug, Deserialize)]
struct UserError {
    message: String,
}

#[derive(Debug, Deserialize)]
struct FileCreateData {
    #[serde(rename = "fileCreate")]
    payload: FileCreatePayload,
}

#[derive(Debug, Deserialize)]
struct FileCreatePayload {
    #[serde(default)]
    files: Vec<CreatedFile>,
    #[serde(rename = "userErrors", default)]
    user_errors: Vec<UserError>,
}

#[derive(Debug, Deserialize)]
struct CreatedFile {
    id: String,
    #[serde(default)]
    image: Option<CreatedFileImage>,
}

#[derive(Debug, Deserialize)]
struct CreatedFileImage {
    url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AccessTokenResponse {
    access_token: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ShopifyConfig;

    fn token_config() -> ShopifyFilesConfig {
        ShopifyFilesConfig::with_access_token(
            "https://demo.myshopify.com",
            "2024-01",
            "shpat_test_token",
        )
    }

    #[test]
    fn graphql_url_includes_api_version() {
        let adapter = ShopifyFilesAdapter::new(token_config());
        assert_eq!(
            adapter.graphql_url(),
            "https://demo.myshopify.com/admin/api/2024-01/graphql.json"
        );
    }

    #[test]
    fn store_url_trailing_slash_is_stripped() {
        let config = ShopifyFilesConfig::with_access_token(
            "https://demo.myshopify.com/",
            "2024-01",
            "shpat_test_token",
        );
        let adapter = ShopifyFilesAdapter::new(config);
        assert_eq!(
            adapter.graphql_url(),
            "https://demo.myshopify.com/admin/api/2024-01/graphql.json"
        );
    }

    #[test]
    fn from_settings_requires_a_store_url() {
        let settings = ShopifyConfig::default();
        assert!(ShopifyFilesConfig::from_settings(&settings).is_none());
    }

    #[test]
    fn from_settings_prefers_the_access_token() {
        let settings = ShopifyConfig {
            store_url: Some("https://demo.myshopify.com".to_string()),
            access_token: Some("shpat_token".to_string()),
            client_id: Some("id".to_string()),
            client_secret: Some("secret".to_string()),
            ..Default::default()
        };
        let config = ShopifyFilesConfig::from_settings(&settings).unwrap();
        assert!(matches!(
            config.credentials,
            ShopifyCredentials::AccessToken(_)
        ));
    }

    #[test]
    fn from_settings_accepts_a_client_pair() {
        let settings = ShopifyConfig {
            store_url: Some("https://demo.myshopify.com".to_string()),
            client_id: Some("id".to_string()),
            client_secret: Some("secret".to_string()),
            ..Default::default()
        };
        let config = ShopifyFilesConfig::from_settings(&settings).unwrap();
        assert!(matches!(
            config.credentials,
            ShopifyCredentials::ClientPair { .. }
        ));
    }

    #[test]
    fn from_settings_rejects_an_incomplete_pair() {
        let settings = ShopifyConfig {
            store_url: Some("https://demo.myshopify.com".to_string()),
            client_id: Some("id".to_string()),
            ..Default::default()
        };
        assert!(ShopifyFilesConfig::from_settings(&settings).is_none());
    }

    #[test]
    fn parses_staged_uploads_response() {
        let json = r#"{
            "data": {
                "stagedUploadsCreate": {
                    "stagedTargets": [{
                        "url": "https://shopify-staged-uploads.storage.googleapis.com/",
                        "resourceUrl": "https://shopify-staged-uploads.storage.googleapis.com/tmp/1/files/abc.png",
                        "parameters": [
                            {"name": "key", "value": "tmp/1/files/abc.png"},
                            {"name": "policy", "value": "base64policy"}
                        ]
                    }],
                    "userErrors": []
                }
            }
        }"#;
        let envelope: GraphQlResponse<StagedUploadsCreateData> =
            serde_json::from_str(json).unwrap();
        let target = extract_staged_target(envelope).unwrap();

        assert_eq!(
            target.url,
            "https://shopify-staged-uploads.storage.googleapis.com/"
        );
        assert_eq!(target.parameters.len(), 2);
        assert_eq!(target.parameters[0].name, "key");
    }

    #[test]
    fn staging_user_errors_fail_the_step() {
        let json = r#"{
            "data": {
                "stagedUploadsCreate": {
                    "stagedTargets": [],
                    "userErrors": [{"field": ["input"], "message": "Filename is invalid"}]
                }
            }
        }"#;
        let envelope: GraphQlResponse<StagedUploadsCreateData> =
            serde_json::from_str(json).unwrap();
        let error = extract_staged_target(envelope).unwrap_err();
        assert!(matches!(error, UploadError::StagingFailed(ref m) if m.contains("Filename")));
    }

    #[test]
    fn top_level_graphql_errors_fail_the_step() {
        let json = r#"{
            "data": null,
            "errors": [{"message": "Throttled"}]
        }"#;
        let envelope: GraphQlResponse<StagedUploadsCreateData> =
            serde_json::from_str(json).unwrap();
        let error = extract_staged_target(envelope).unwrap_err();
        assert!(matches!(error, UploadError::StagingFailed(ref m) if m.contains("Throttled")));
    }

    #[test]
    fn parses_file_create_response() {
        let json = r#"{
            "data": {
                "fileCreate": {
                    "files": [{
                        "id": "gid://shopify/MediaImage/123",
                        "image": {"url": "https://cdn.shopify.com/s/files/1/abc.png"}
                    }],
                    "userErrors": []
                }
            }
        }"#;
        let envelope: GraphQlResponse<FileCreateData> = serde_json::from_str(json).unwrap();
        let created = extract_created_file(envelope).unwrap();

        assert_eq!(created.id, "gid://shopify/MediaImage/123");
        assert_eq!(
            final_url(&created, "https://staged.example.com/abc.png"),
            "https://cdn.shopify.com/s/files/1/abc.png"
        );
    }

    #[test]
    fn pending_cdn_url_falls_back_to_the_staged_resource() {
        let json = r#"{
            "data": {
                "fileCreate": {
                    "files": [{"id": "gid://shopify/MediaImage/123", "image": null}],
                    "userErrors": []
                }
            }
        }"#;
        let envelope: GraphQlResponse<FileCreateData> = serde_json::from_str(json).unwrap();
        let created = extract_created_file(envelope).unwrap();

        assert_eq!(
            final_url(&created, "https://staged.example.com/abc.png"),
            "https://staged.example.com/abc.png"
        );
    }

    #[test]
    fn file_create_user_errors_fail_the_step() {
        let json = r#"{
            "data": {
                "fileCreate": {
                    "files": [],
                    "userErrors": [{"field": null, "message": "Original source is invalid"}]
                }
            }
        }"#;
        let envelope: GraphQlResponse<FileCreateData> = serde_json::from_str(json).unwrap();
        let error = extract_created_file(envelope).unwrap_err();
        assert!(matches!(error, UploadError::FileRecordFailed(_)));
    }

    #[test]
    fn missing_staged_target_fails_the_step() {
        let json = r#"{
            "data": {
                "stagedUploadsCreate": {"stagedTargets": [], "userErrors": []}
            }
        }"#;
        let envelope: GraphQlResponse<StagedUploadsCreateData> =
            serde_json::from_str(json).unwrap();
        assert!(extract_staged_target(envelope).is_err());
    }
}
