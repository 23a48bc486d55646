//! Dremio client and the generic catalog protocol.
//!
//! Kind-specific constructors, getters and updaters live next to their types
//! (`source`, `space`, `folder`, `dataset`, `reflection`, `collaboration`) and
//! are built on the operations here.

use crate::auth::{AuthState, Authenticator};
use crate::config::{ClientConfig, ClientConfigBuilder};
use crate::entity::{
    CatalogEntity, CatalogEntitySummary, CatalogKind, Enrich, ListResponse, TypedEntity,
};
use crate::error::{ClientError, Result};
use crate::transport::{decode, ApiPath, Body, Transport};
use reqwest::header::HeaderValue;
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;

/// Dremio REST client.
///
/// Every operation issues its HTTP calls in sequence and returns once they
/// complete; failures are returned as-is and never retried.
pub struct DremioClient {
    transport: Transport,
    auth: Authenticator,
    api_root: ApiPath,
    base_url: String,
}

impl DremioClient {
    /// Create a new client builder with the given base URL.
    pub fn builder(base_url: impl Into<String>) -> ClientConfigBuilder {
        ClientConfigBuilder::new(base_url)
    }

    /// Create a new client with the given configuration.
    pub fn new(config: ClientConfig) -> Result<Self> {
        config.validate()?;

        let transport = Transport::new(&config)?;
        let auth = Authenticator::new(&config);

        if let Some(header) = auth.static_header() {
            HeaderValue::from_str(&header)
                .map_err(|_| ClientError::Config("Invalid API key format".to_string()))?;
        }

        Ok(Self {
            transport,
            auth,
            api_root: ApiPath::new(&config.api_prefix),
            base_url: config.base_url,
        })
    }

    /// Get the base URL.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Whether a token is currently held.
    pub async fn auth_state(&self) -> AuthState {
        self.auth.state().await
    }

    /// Forget a session token obtained by login; the next request logs in again.
    pub async fn invalidate_session(&self) {
        self.auth.invalidate().await;
    }

    // =========================================================================
    // Catalog Operations
    // =========================================================================

    /// List the root of the catalog.
    pub async fn list_catalog(&self) -> Result<Vec<CatalogEntitySummary>> {
        let mut response: ListResponse<CatalogEntitySummary> =
            self.get_json(&self.catalog_path()).await?;
        response.data.enrich();
        Ok(response.data)
    }

    /// Get any catalog entity by id.
    pub async fn get_by_id(&self, id: &str) -> Result<CatalogEntity> {
        self.get_entity(id).await
    }

    /// Get any catalog entity by its hierarchical path.
    pub async fn get_by_path<S: AsRef<str>>(&self, segments: &[S]) -> Result<CatalogEntity> {
        self.get_entity_by_path(segments).await
    }

    /// Get a catalog entity by id, checking that it is of kind `T`.
    pub async fn get_entity<T: CatalogKind>(&self, id: &str) -> Result<T> {
        let mut entity: T = self
            .read(Method::GET, &self.catalog_item_path(id), None)
            .await?;
        entity.enrich();
        Ok(entity)
    }

    /// Get a catalog entity by path, checking that it is of kind `T`.
    pub async fn get_entity_by_path<T, S>(&self, segments: &[S]) -> Result<T>
    where
        T: CatalogKind,
        S: AsRef<str>,
    {
        let path = self.catalog_path().push("by-path").extend(segments);
        let mut entity: T = self.read(Method::GET, &path, None).await?;
        entity.enrich();
        Ok(entity)
    }

    /// Create a catalog entity. The server assigns id and tag.
    pub async fn create_entity<T: CatalogKind>(&self, payload: &T) -> Result<T> {
        self.write_entity(Method::POST, &self.catalog_path(), payload)
            .await
    }

    /// Replace a catalog entity. `payload` must be the full representation
    /// carrying the current tag; a stale tag fails with a conflict status.
    pub async fn update_entity<T: CatalogKind>(&self, id: &str, payload: &T) -> Result<T> {
        self.write_entity(Method::PUT, &self.catalog_item_path(id), payload)
            .await
    }

    /// Delete a catalog entity.
    pub async fn delete_catalog_item(&self, id: &str) -> Result<()> {
        self.execute(Method::DELETE, &self.catalog_item_path(id), None)
            .await?;
        Ok(())
    }

    // =========================================================================
    // Shared Protocol
    // =========================================================================

    pub(crate) fn catalog_path(&self) -> ApiPath {
        self.api_root.clone().push("catalog")
    }

    pub(crate) fn catalog_item_path(&self, id: &str) -> ApiPath {
        self.catalog_path().push(id)
    }

    pub(crate) fn reflection_path(&self) -> ApiPath {
        self.api_root.clone().push("reflection")
    }

    pub(crate) fn reflection_item_path(&self, id: &str) -> ApiPath {
        self.reflection_path().push(id)
    }

    /// POST or PUT a catalog entity and enrich the result.
    pub(crate) async fn write_entity<T: CatalogKind>(
        &self,
        method: Method,
        path: &ApiPath,
        payload: &T,
    ) -> Result<T> {
        let mut entity: T = self
            .read(method, path, Some(Body::json(payload)?))
            .await?;
        entity.enrich();
        Ok(entity)
    }

    /// Read-modify-write of a catalog entity.
    ///
    /// Fetches the current representation (kind-checked, not enriched), lets
    /// `apply` overwrite the mutable fields, and PUTs the result. Id, tag,
    /// discriminators, path and unmodelled fields are carried forward as the
    /// server sent them. A failed read aborts before any write.
    pub(crate) async fn modify_entity<T, F>(&self, id: &str, apply: F) -> Result<T>
    where
        T: CatalogKind,
        F: FnOnce(&mut T),
    {
        let mut entity: T = self.modify(&self.catalog_item_path(id), apply).await?;
        entity.enrich();
        Ok(entity)
    }

    /// Read-modify-write at an arbitrary item path.
    pub(crate) async fn modify<T, F>(&self, path: &ApiPath, apply: F) -> Result<T>
    where
        T: TypedEntity,
        F: FnOnce(&mut T),
    {
        let mut current: T = self.read(Method::GET, path, None).await?;
        apply(&mut current);
        tracing::debug!(path = %path, "Replacing entity with modified representation");
        self.read(Method::PUT, path, Some(Body::json(&current)?))
            .await
    }

    /// Send a request and decode a kind-checked response.
    pub(crate) async fn read<T: TypedEntity>(
        &self,
        method: Method,
        path: &ApiPath,
        body: Option<Body>,
    ) -> Result<T> {
        let bytes = self.execute(method, path, body).await?;
        let value: Value = decode(&bytes)?;
        T::check_kind(&value)?;
        serde_json::from_value(value).map_err(|source| ClientError::Decode {
            source,
            body: String::from_utf8_lossy(&bytes).into_owned(),
        })
    }

    /// GET and decode a response that carries no discriminator.
    pub(crate) async fn get_json<T: DeserializeOwned>(&self, path: &ApiPath) -> Result<T> {
        let bytes = self.execute(Method::GET, path, None).await?;
        decode(&bytes)
    }

    /// POST a JSON payload and decode a response that carries no discriminator.
    pub(crate) async fn post_json<T, B>(&self, path: &ApiPath, payload: &B) -> Result<T>
    where
        T: DeserializeOwned,
        B: serde::Serialize,
    {
        let bytes = self
            .execute(Method::POST, path, Some(Body::json(payload)?))
            .await?;
        decode(&bytes)
    }

    /// Authenticate if needed and send one request.
    pub(crate) async fn execute(
        &self,
        method: Method,
        path: &ApiPath,
        body: Option<Body>,
    ) -> Result<Vec<u8>> {
        path.validate()?;
        let authorization = self.auth.authorization(&self.transport).await?;
        self.transport
            .send(method, path, body, authorization.as_deref())
            .await
    }
}

/// Arc-wrapped client for shared ownership.
pub type SharedClient = Arc<DremioClient>;

#[cfg(test)]
mod tests {
    use super::*;

    fn client(base_url: &str) -> DremioClient {
        DremioClient::new(ClientConfig::builder(base_url).build().unwrap()).unwrap()
    }

    #[test]
    fn test_catalog_paths() {
        let client = client("http://localhost:9047");
        assert_eq!(client.catalog_path().to_string(), "/api/v3/catalog");
        assert_eq!(
            client.catalog_item_path("dremio:/a/b").to_string(),
            "/api/v3/catalog/dremio%3A%2Fa%2Fb"
        );
        assert_eq!(
            client.reflection_item_path("r 1").to_string(),
            "/api/v3/reflection/r%201"
        );
    }

    #[test]
    fn test_invalid_api_key_rejected() {
        let config = ClientConfig::builder("http://localhost:9047")
            .api_key("bad\nkey")
            .build()
            .unwrap();
        assert!(matches!(
            DremioClient::new(config),
            Err(ClientError::Config(_))
        ));
    }

    #[test]
    fn test_base_url_kept() {
        let client = client("http://localhost:9047/prefix");
        assert_eq!(client.base_url(), "http://localhost:9047/prefix");
    }
}
