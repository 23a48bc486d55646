//! Reflections: materializations attached to a dataset.
//!
//! Reflections live under `/reflection`, not the catalog. They follow the same
//! create / read / read-modify-write / delete protocol and are discriminated
//! by `type` (`RAW` or `AGGREGATION`). Status, sizes and timestamps are
//! computed by the server and never sent back.

use crate::client::DremioClient;
use crate::entity::{expect_discriminator, ListResponse, TypedEntity, MISSING};
use crate::error::{ClientError, Result};
use crate::transport::Body;
use chrono::{DateTime, Utc};
use reqwest::Method;
use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Reflection discriminator (`type` on the wire).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReflectionType {
    Raw,
    Aggregation,
}

impl ReflectionType {
    /// Wire value of the discriminator.
    pub fn as_str(&self) -> &'static str {
        match self {
            ReflectionType::Raw => "RAW",
            ReflectionType::Aggregation => "AGGREGATION",
        }
    }
}

impl fmt::Display for ReflectionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PartitionDistributionStrategy {
    Consolidated,
    Striped,
    /// Value this client does not model, kept verbatim
    #[serde(untagged)]
    Other(String),
}

/// Granularity of a dimension column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Granularity {
    Date,
    Normal,
    /// Value this client does not model, kept verbatim
    #[serde(untagged)]
    Other(String),
}

/// Aggregate computed for a measure column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MeasureType {
    Min,
    Max,
    Sum,
    Count,
    ApproxCountDistinct,
    /// Value this client does not model, kept verbatim
    #[serde(untagged)]
    Other(String),
}

/// A column referenced by a reflection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReflectionField {
    pub name: String,
}

impl From<&str> for ReflectionField {
    fn from(name: &str) -> Self {
        Self {
            name: name.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DimensionField {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub granularity: Option<Granularity>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MeasureField {
    pub name: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub measure_type_list: Vec<MeasureType>,
}

/// Server-computed state of a reflection.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReflectionStatus {
    pub config: Option<String>,
    pub refresh: Option<String>,
    pub availability: Option<String>,
    #[serde(default)]
    pub failure_count: u32,
    #[serde(default, deserialize_with = "crate::entity::lenient_timestamp")]
    pub last_refresh: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "crate::entity::lenient_timestamp")]
    pub expires_at: Option<DateTime<Utc>>,
}

fn reflection_entity_type() -> String {
    "reflection".to_string()
}

/// Fields shared by raw and aggregation reflections.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReflectionCore {
    #[serde(default = "reflection_entity_type")]
    pub entity_type: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub tag: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub enabled: bool,
    #[serde(rename = "type")]
    pub reflection_type: ReflectionType,
    #[serde(default)]
    pub dataset_id: String,
    #[serde(default, skip_serializing, deserialize_with = "crate::entity::lenient_timestamp")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing, deserialize_with = "crate::entity::lenient_timestamp")]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing)]
    pub current_size_bytes: Option<u64>,
    #[serde(default, skip_serializing)]
    pub total_size_bytes: Option<u64>,
    #[serde(default, skip_serializing)]
    pub status: Option<ReflectionStatus>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub distribution_fields: Vec<ReflectionField>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub partition_fields: Vec<ReflectionField>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sort_fields: Vec<ReflectionField>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub partition_distribution_strategy: Option<PartitionDistributionStrategy>,
}

impl ReflectionCore {
    fn new(reflection_type: ReflectionType, dataset_id: &str) -> Self {
        Self {
            entity_type: reflection_entity_type(),
            id: String::new(),
            tag: String::new(),
            name: String::new(),
            enabled: false,
            reflection_type,
            dataset_id: dataset_id.to_string(),
            created_at: None,
            updated_at: None,
            current_size_bytes: None,
            total_size_bytes: None,
            status: None,
            distribution_fields: Vec::new(),
            partition_fields: Vec::new(),
            sort_fields: Vec::new(),
            partition_distribution_strategy: None,
        }
    }
}

/// A raw reflection: a materialized column subset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawReflection {
    #[serde(flatten)]
    pub base: ReflectionCore,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub display_fields: Vec<ReflectionField>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// An aggregation reflection: a pre-aggregated rollup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregationReflection {
    #[serde(flatten)]
    pub base: ReflectionCore,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dimension_fields: Vec<DimensionField>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub measure_fields: Vec<MeasureField>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl TypedEntity for RawReflection {
    fn check_kind(value: &Value) -> Result<()> {
        expect_discriminator(value, "type", ReflectionType::Raw.as_str())
    }
}

impl TypedEntity for AggregationReflection {
    fn check_kind(value: &Value) -> Result<()> {
        expect_discriminator(value, "type", ReflectionType::Aggregation.as_str())
    }
}

/// Either kind of reflection, dispatched on `type`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Reflection {
    Raw(RawReflection),
    Aggregation(AggregationReflection),
}

impl Reflection {
    /// Shared reflection fields.
    pub fn core(&self) -> &ReflectionCore {
        match self {
            Reflection::Raw(r) => &r.base,
            Reflection::Aggregation(r) => &r.base,
        }
    }

    pub fn reflection_type(&self) -> ReflectionType {
        self.core().reflection_type
    }

    pub fn id(&self) -> &str {
        &self.core().id
    }

    pub fn dataset_id(&self) -> &str {
        &self.core().dataset_id
    }
}

impl<'de> Deserialize<'de> for Reflection {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;
        let reflection_type = value
            .get("type")
            .cloned()
            .ok_or_else(|| <D::Error as de::Error>::missing_field("type"))?;
        let reflection_type: ReflectionType =
            serde_json::from_value(reflection_type).map_err(<D::Error as de::Error>::custom)?;
        let reflection = match reflection_type {
            ReflectionType::Raw => serde_json::from_value(value).map(Reflection::Raw),
            ReflectionType::Aggregation => serde_json::from_value(value).map(Reflection::Aggregation),
        };
        reflection.map_err(de::Error::custom)
    }
}

impl TypedEntity for Reflection {
    fn check_kind(value: &Value) -> Result<()> {
        match value.get("type").and_then(Value::as_str) {
            Some("RAW") | Some("AGGREGATION") => Ok(()),
            actual => Err(ClientError::WrongKind {
                expected: "RAW or AGGREGATION".to_string(),
                actual: actual.unwrap_or(MISSING).to_string(),
            }),
        }
    }
}

/// Parameters of a raw reflection, used for both create and update.
#[derive(Debug, Clone, Default)]
pub struct RawReflectionSpec {
    pub name: String,
    pub enabled: bool,
    pub display_fields: Vec<ReflectionField>,
    pub distribution_fields: Vec<ReflectionField>,
    pub partition_fields: Vec<ReflectionField>,
    pub sort_fields: Vec<ReflectionField>,
    pub partition_distribution_strategy: Option<PartitionDistributionStrategy>,
}

impl RawReflectionSpec {
    fn validate(&self) -> Result<()> {
        validate_name(&self.name)?;
        if self.display_fields.is_empty() {
            return Err(ClientError::Validation(
                "raw reflection requires at least one display field".to_string(),
            ));
        }
        Ok(())
    }

    fn apply(self, reflection: &mut RawReflection) {
        let base = &mut reflection.base;
        base.name = self.name;
        base.enabled = self.enabled;
        base.distribution_fields = self.distribution_fields;
        base.partition_fields = self.partition_fields;
        base.sort_fields = self.sort_fields;
        base.partition_distribution_strategy = self.partition_distribution_strategy;
        reflection.display_fields = self.display_fields;
    }
}

/// Parameters of an aggregation reflection, used for both create and update.
#[derive(Debug, Clone, Default)]
pub struct AggregationReflectionSpec {
    pub name: String,
    pub enabled: bool,
    pub dimension_fields: Vec<DimensionField>,
    pub measure_fields: Vec<MeasureField>,
    pub distribution_fields: Vec<ReflectionField>,
    pub partition_fields: Vec<ReflectionField>,
    pub sort_fields: Vec<ReflectionField>,
    pub partition_distribution_strategy: Option<PartitionDistributionStrategy>,
}

impl AggregationReflectionSpec {
    fn validate(&self) -> Result<()> {
        validate_name(&self.name)?;
        if self.dimension_fields.is_empty() && self.measure_fields.is_empty() {
            return Err(ClientError::Validation(
                "aggregation reflection requires dimension or measure fields".to_string(),
            ));
        }
        Ok(())
    }

    fn apply(self, reflection: &mut AggregationReflection) {
        let base = &mut reflection.base;
        base.name = self.name;
        base.enabled = self.enabled;
        base.distribution_fields = self.distribution_fields;
        base.partition_fields = self.partition_fields;
        base.sort_fields = self.sort_fields;
        base.partition_distribution_strategy = self.partition_distribution_strategy;
        reflection.dimension_fields = self.dimension_fields;
        reflection.measure_fields = self.measure_fields;
    }
}

fn validate_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(ClientError::Validation(
            "reflection name cannot be empty".to_string(),
        ));
    }
    Ok(())
}

fn validate_dataset_id(dataset_id: &str) -> Result<()> {
    if dataset_id.is_empty() {
        return Err(ClientError::Validation(
            "reflection dataset id cannot be empty".to_string(),
        ));
    }
    Ok(())
}

impl DremioClient {
    /// List all reflections.
    pub async fn list_reflections(&self) -> Result<Vec<Reflection>> {
        let response: ListResponse<Reflection> = self.get_json(&self.reflection_path()).await?;
        Ok(response.data)
    }

    /// Get a reflection of either kind by id.
    pub async fn get_reflection(&self, id: &str) -> Result<Reflection> {
        self.read(Method::GET, &self.reflection_item_path(id), None)
            .await
    }

    /// Get a raw reflection by id.
    pub async fn get_raw_reflection(&self, id: &str) -> Result<RawReflection> {
        self.read(Method::GET, &self.reflection_item_path(id), None)
            .await
    }

    /// Get an aggregation reflection by id.
    pub async fn get_aggregation_reflection(&self, id: &str) -> Result<AggregationReflection> {
        self.read(Method::GET, &self.reflection_item_path(id), None)
            .await
    }

    /// Create a raw reflection on a dataset.
    pub async fn new_raw_reflection(
        &self,
        dataset_id: &str,
        spec: RawReflectionSpec,
    ) -> Result<RawReflection> {
        validate_dataset_id(dataset_id)?;
        spec.validate()?;

        let mut reflection = RawReflection {
            base: ReflectionCore::new(ReflectionType::Raw, dataset_id),
            display_fields: Vec::new(),
            extra: Map::new(),
        };
        spec.apply(&mut reflection);
        self.send_reflection(Method::POST, &reflection).await
    }

    /// Create an aggregation reflection on a dataset.
    pub async fn new_aggregation_reflection(
        &self,
        dataset_id: &str,
        spec: AggregationReflectionSpec,
    ) -> Result<AggregationReflection> {
        validate_dataset_id(dataset_id)?;
        spec.validate()?;

        let mut reflection = AggregationReflection {
            base: ReflectionCore::new(ReflectionType::Aggregation, dataset_id),
            dimension_fields: Vec::new(),
            measure_fields: Vec::new(),
            extra: Map::new(),
        };
        spec.apply(&mut reflection);
        self.send_reflection(Method::POST, &reflection).await
    }

    /// Replace a raw reflection's mutable fields; id, tag, type and dataset are kept.
    pub async fn update_raw_reflection(
        &self,
        id: &str,
        spec: RawReflectionSpec,
    ) -> Result<RawReflection> {
        spec.validate()?;
        self.modify(&self.reflection_item_path(id), |reflection: &mut RawReflection| {
            spec.apply(reflection)
        })
        .await
    }

    /// Replace an aggregation reflection's mutable fields; id, tag, type and dataset are kept.
    pub async fn update_aggregation_reflection(
        &self,
        id: &str,
        spec: AggregationReflectionSpec,
    ) -> Result<AggregationReflection> {
        spec.validate()?;
        self.modify(
            &self.reflection_item_path(id),
            |reflection: &mut AggregationReflection| spec.apply(reflection),
        )
        .await
    }

    /// Delete a reflection.
    pub async fn delete_reflection(&self, id: &str) -> Result<()> {
        self.execute(Method::DELETE, &self.reflection_item_path(id), None)
            .await?;
        Ok(())
    }

    async fn send_reflection<T: TypedEntity>(&self, method: Method, payload: &T) -> Result<T> {
        let body = Body::json(payload)?;
        self.read(method, &self.reflection_path(), Some(body)).await
    }
}
