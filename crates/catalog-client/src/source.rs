//! Sources: connections to external storage or databases.
//!
//! A source's `config` is connector-specific and kept as raw JSON; only the
//! server validates it.

use crate::client::DremioClient;
use crate::entity::{catalog_kind, CatalogEntityCore, EntityType};
use crate::error::{ClientError, Result};
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// How dataset metadata is refreshed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DatasetUpdateMode {
    Prefetch,
    PrefetchQueried,
    Inline,
    /// Value this client does not model, kept verbatim
    #[serde(untagged)]
    Other(String),
}

/// Metadata refresh policy of a source.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetadataPolicy {
    #[serde(rename = "authTTLMs", skip_serializing_if = "Option::is_none")]
    pub auth_ttl_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub names_refresh_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dataset_refresh_after_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dataset_expire_after_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dataset_update_mode: Option<DatasetUpdateMode>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delete_unavailable_datasets: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auto_promote_datasets: Option<bool>,
}

impl MetadataPolicy {
    /// Datasets must not expire before they are due for refresh.
    pub fn validate(&self) -> Result<()> {
        if let (Some(refresh), Some(expire)) =
            (self.dataset_refresh_after_ms, self.dataset_expire_after_ms)
        {
            if refresh > expire {
                return Err(ClientError::Validation(format!(
                    "datasetRefreshAfterMs ({}) must be <= datasetExpireAfterMs ({})",
                    refresh, expire
                )));
            }
        }
        Ok(())
    }
}

/// Default reflection refresh settings for datasets in a source.
///
/// The never-refresh and never-expire flags exclude the matching period.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccelerationSettings {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub acceleration_refresh_period_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub acceleration_grace_period_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub acceleration_never_expire: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub acceleration_never_refresh: Option<bool>,
}

impl AccelerationSettings {
    /// Reject a never flag combined with its periodic value.
    pub fn validate(&self) -> Result<()> {
        if self.acceleration_never_refresh == Some(true)
            && self.acceleration_refresh_period_ms.is_some()
        {
            return Err(ClientError::Validation(
                "accelerationNeverRefresh cannot be combined with accelerationRefreshPeriodMs"
                    .to_string(),
            ));
        }
        if self.acceleration_never_expire == Some(true)
            && self.acceleration_grace_period_ms.is_some()
        {
            return Err(ClientError::Validation(
                "accelerationNeverExpire cannot be combined with accelerationGracePeriodMs"
                    .to_string(),
            ));
        }
        Ok(())
    }
}

/// A source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Source {
    #[serde(flatten)]
    pub base: CatalogEntityCore,
    /// Connector kind, e.g. "S3" or "POSTGRES"
    #[serde(rename = "type", default, skip_serializing_if = "String::is_empty")]
    pub source_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Connector-specific configuration
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub config: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata_policy: Option<MetadataPolicy>,
    #[serde(flatten)]
    pub acceleration: AccelerationSettings,
    #[serde(default, skip_serializing, deserialize_with = "crate::entity::lenient_timestamp")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

catalog_kind!(Source, EntityType::Source);

impl Source {
    /// Decode the connector configuration into a caller-defined shape.
    pub fn config_as<T: DeserializeOwned>(&self) -> Result<T> {
        Ok(serde_json::from_value(self.config.clone())?)
    }

    /// Replace the connector configuration.
    pub fn set_config<T: Serialize>(&mut self, config: &T) -> Result<()> {
        self.config = serde_json::to_value(config)?;
        Ok(())
    }
}

/// Parameters for creating a source.
#[derive(Debug, Clone, Default)]
pub struct NewSourceSpec {
    pub name: String,
    pub source_type: String,
    pub description: Option<String>,
    pub config: Value,
    pub metadata_policy: Option<MetadataPolicy>,
    pub acceleration: AccelerationSettings,
}

/// Mutable fields of a source. `None` keeps the current value.
#[derive(Debug, Clone, Default)]
pub struct UpdateSourceSpec {
    pub description: Option<String>,
    pub config: Option<Value>,
    pub metadata_policy: Option<MetadataPolicy>,
    pub acceleration: Option<AccelerationSettings>,
}

impl UpdateSourceSpec {
    fn validate(&self) -> Result<()> {
        if let Some(ref policy) = self.metadata_policy {
            policy.validate()?;
        }
        if let Some(ref acceleration) = self.acceleration {
            acceleration.validate()?;
        }
        Ok(())
    }

    fn apply(self, source: &mut Source) {
        if let Some(description) = self.description {
            source.description = Some(description);
        }
        if let Some(config) = self.config {
            source.config = config;
        }
        if let Some(policy) = self.metadata_policy {
            source.metadata_policy = Some(policy);
        }
        if let Some(acceleration) = self.acceleration {
            source.acceleration = acceleration;
        }
    }
}

impl DremioClient {
    /// Get a source by id.
    pub async fn get_source(&self, id: &str) -> Result<Source> {
        self.get_entity(id).await
    }

    /// Get a source by path. A source sits at the root, so its path is `[name]`.
    pub async fn get_source_by_path<S: AsRef<str>>(&self, segments: &[S]) -> Result<Source> {
        self.get_entity_by_path(segments).await
    }

    /// Get a source by name.
    pub async fn get_source_by_name(&self, name: &str) -> Result<Source> {
        self.get_source_by_path(&[name]).await
    }

    /// Create a source.
    pub async fn new_source(&self, spec: &NewSourceSpec) -> Result<Source> {
        if spec.name.is_empty() {
            return Err(ClientError::Validation(
                "source name cannot be empty".to_string(),
            ));
        }
        if spec.source_type.is_empty() {
            return Err(ClientError::Validation(
                "source type cannot be empty".to_string(),
            ));
        }
        if let Some(ref policy) = spec.metadata_policy {
            policy.validate()?;
        }
        spec.acceleration.validate()?;

        let source = Source {
            base: CatalogEntityCore::with_name(EntityType::Source, spec.name.clone()),
            source_type: spec.source_type.clone(),
            description: spec.description.clone(),
            config: spec.config.clone(),
            metadata_policy: spec.metadata_policy.clone(),
            acceleration: spec.acceleration.clone(),
            created_at: None,
            extra: Map::new(),
        };
        self.create_entity(&source).await
    }

    /// Update a source's description, config, metadata policy or
    /// acceleration settings, keeping everything else as stored.
    pub async fn update_source(&self, id: &str, spec: UpdateSourceSpec) -> Result<Source> {
        spec.validate()?;
        self.modify_entity(id, |source: &mut Source| spec.apply(source))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::Enrich;
    use serde_json::json;

    fn stored_source() -> Source {
        serde_json::from_value(json!({
            "entityType": "source",
            "id": "src-1",
            "tag": "7",
            "name": "lake",
            "type": "S3",
            "description": "raw zone",
            "config": {"bucketWhitelist": ["raw"], "secure": true},
            "metadataPolicy": {"authTTLMs": 86400000, "datasetUpdateMode": "PREFETCH_QUERIED"},
            "accelerationRefreshPeriodMs": 3600000,
            "accelerationGracePeriodMs": 10800000,
            "createdAt": "2024-01-01T00:00:00Z",
            "children": [{"id": "f", "path": ["lake", "events"], "type": "CONTAINER", "containerType": "FOLDER"}],
            "permissions": ["READ"]
        }))
        .unwrap()
    }

    #[test]
    fn test_source_decodes_flattened_fields() {
        let source = stored_source();
        assert_eq!(source.source_type, "S3");
        assert_eq!(source.acceleration.acceleration_refresh_period_ms, Some(3600000));
        assert_eq!(
            source.metadata_policy.as_ref().unwrap().dataset_update_mode,
            Some(DatasetUpdateMode::PrefetchQueried)
        );
        assert!(source.extra.contains_key("permissions"));
        assert!(!source.extra.contains_key("accelerationRefreshPeriodMs"));
        assert!(!source.extra.contains_key("entityType"));
    }

    #[test]
    fn test_unmodelled_update_mode_kept() {
        let policy: MetadataPolicy =
            serde_json::from_value(json!({"datasetUpdateMode": "PREFETCH_ALL"})).unwrap();
        assert_eq!(
            policy.dataset_update_mode,
            Some(DatasetUpdateMode::Other("PREFETCH_ALL".to_string()))
        );
        let json = serde_json::to_value(&policy).unwrap();
        assert_eq!(json["datasetUpdateMode"], "PREFETCH_ALL");
    }

    #[test]
    fn test_source_enrichment() {
        let mut source = stored_source();
        source.enrich();
        assert_eq!(source.base.path, vec!["lake"]);
        assert_eq!(source.base.children[0].name, "events");
    }

    #[test]
    fn test_update_spec_keeps_unset_fields() {
        let mut source = stored_source();
        UpdateSourceSpec {
            description: Some("curated zone".to_string()),
            ..Default::default()
        }
        .apply(&mut source);

        assert_eq!(source.description.as_deref(), Some("curated zone"));
        assert_eq!(source.config["secure"], json!(true));
        assert_eq!(source.base.tag, "7");
        assert_eq!(source.source_type, "S3");
    }

    #[test]
    fn test_written_payload_omits_read_only_fields() {
        let json = serde_json::to_value(stored_source()).unwrap();
        assert!(json.get("children").is_none());
        assert!(json.get("createdAt").is_none());
        assert_eq!(json["metadataPolicy"]["authTTLMs"], json!(86400000));
        assert_eq!(json["permissions"], json!(["READ"]));
        assert_eq!(json["accelerationGracePeriodMs"], json!(10800000));
    }

    #[test]
    fn test_acceleration_flags_exclusive() {
        let settings = AccelerationSettings {
            acceleration_never_refresh: Some(true),
            acceleration_refresh_period_ms: Some(1000),
            ..Default::default()
        };
        assert!(matches!(settings.validate(), Err(ClientError::Validation(_))));

        let settings = AccelerationSettings {
            acceleration_never_expire: Some(true),
            acceleration_grace_period_ms: Some(1000),
            ..Default::default()
        };
        assert!(settings.validate().is_err());

        let settings = AccelerationSettings {
            acceleration_never_expire: Some(true),
            acceleration_refresh_period_ms: Some(1000),
            ..Default::default()
        };
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_metadata_policy_expiry_after_refresh() {
        let policy = MetadataPolicy {
            dataset_refresh_after_ms: Some(2000),
            dataset_expire_after_ms: Some(1000),
            ..Default::default()
        };
        assert!(policy.validate().is_err());
    }

    #[test]
    fn test_config_pass_through() {
        #[derive(Debug, Serialize, Deserialize, PartialEq)]
        #[serde(rename_all = "camelCase")]
        struct S3Config {
            bucket_whitelist: Vec<String>,
            secure: bool,
        }

        let mut source = stored_source();
        let config: S3Config = source.config_as().unwrap();
        assert_eq!(config.bucket_whitelist, vec!["raw"]);

        source
            .set_config(&S3Config {
                bucket_whitelist: vec!["curated".to_string()],
                secure: false,
            })
            .unwrap();
        assert_eq!(source.config["bucketWhitelist"], json!(["curated"]));
    }
}
