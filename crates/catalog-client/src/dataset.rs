//! Virtual and physical datasets.
//!
//! Both kinds share `entityType = "dataset"` and are told apart by `type`.

use crate::client::DremioClient;
use crate::entity::{
    expect_discriminator, expect_entity_type, CatalogEntityCore, CatalogKind, Enrich,
    EntityType, TypedEntity, MISSING,
};
use crate::error::{ClientError, Result};
use chrono::{DateTime, Utc};
use reqwest::Method;
use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Dataset discriminator (`type` on the wire).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DatasetType {
    VirtualDataset,
    PhysicalDataset,
}

impl DatasetType {
    /// Wire value of the discriminator.
    pub fn as_str(&self) -> &'static str {
        match self {
            DatasetType::VirtualDataset => "VIRTUAL_DATASET",
            DatasetType::PhysicalDataset => "PHYSICAL_DATASET",
        }
    }
}

impl fmt::Display for DatasetType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A column of a dataset schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatasetField {
    pub name: String,
    #[serde(rename = "type")]
    pub field_type: DatasetFieldType,
}

/// Type of a schema column; struct and list types carry a sub-schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DatasetFieldType {
    pub name: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sub_schema: Vec<DatasetField>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub precision: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scale: Option<u32>,
}

/// How a physical dataset's reflections are refreshed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RefreshMethod {
    Full,
    Incremental,
    /// Value this client does not model, kept verbatim
    #[serde(untagged)]
    Other(String),
}

/// Reflection refresh policy of a physical dataset.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshPolicy {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_period_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grace_period_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method: Option<RefreshMethod>,
    /// Column driving incremental refresh
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_field: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub never_expire: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub never_refresh: Option<bool>,
}

impl RefreshPolicy {
    /// Check flag exclusivity and the refresh field/method pairing.
    pub fn validate(&self) -> Result<()> {
        if self.never_refresh == Some(true) && self.refresh_period_ms.is_some() {
            return Err(ClientError::Validation(
                "neverRefresh cannot be combined with refreshPeriodMs".to_string(),
            ));
        }
        if self.never_expire == Some(true) && self.grace_period_ms.is_some() {
            return Err(ClientError::Validation(
                "neverExpire cannot be combined with gracePeriodMs".to_string(),
            ));
        }
        match (self.method.as_ref(), self.refresh_field.as_deref()) {
            (Some(RefreshMethod::Incremental), None | Some("")) => Err(ClientError::Validation(
                "INCREMENTAL refresh requires refreshField".to_string(),
            )),
            (Some(RefreshMethod::Full), Some(_)) => Err(ClientError::Validation(
                "refreshField is only valid with INCREMENTAL refresh".to_string(),
            )),
            _ => Ok(()),
        }
    }
}

/// File format of a physical dataset backed by files.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PhysicalDatasetFormat {
    /// Format name, e.g. "Text", "JSON", "Parquet", "Excel"
    #[serde(rename = "type")]
    pub format_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field_delimiter: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line_delimiter: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quote: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub escape: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skip_first_line: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extract_header: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trim_header: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auto_generate_column_names: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sheet_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub has_merged_cells: Option<bool>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl PhysicalDatasetFormat {
    /// Delimited text with a header row.
    pub fn text(field_delimiter: impl Into<String>) -> Self {
        Self {
            format_type: "Text".to_string(),
            field_delimiter: Some(field_delimiter.into()),
            line_delimiter: Some("\n".to_string()),
            quote: Some("\"".to_string()),
            escape: Some("\"".to_string()),
            extract_header: Some(true),
            ..Default::default()
        }
    }

    /// Parquet files.
    pub fn parquet() -> Self {
        Self {
            format_type: "Parquet".to_string(),
            ..Default::default()
        }
    }

    /// JSON files.
    pub fn json() -> Self {
        Self {
            format_type: "JSON".to_string(),
            ..Default::default()
        }
    }
}

/// A virtual dataset (view) defined by SQL.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VirtualDataset {
    #[serde(flatten)]
    pub base: CatalogEntityCore,
    #[serde(rename = "type")]
    pub dataset_type: DatasetType,
    /// Schema computed by the server (read-only)
    #[serde(default, skip_serializing)]
    pub fields: Vec<DatasetField>,
    #[serde(default)]
    pub sql: String,
    /// Name-resolution search path for `sql`
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sql_context: Vec<String>,
    #[serde(default, skip_serializing, deserialize_with = "crate::entity::lenient_timestamp")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A physical dataset: a table of a source or a promoted file/folder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PhysicalDataset {
    #[serde(flatten)]
    pub base: CatalogEntityCore,
    #[serde(rename = "type")]
    pub dataset_type: DatasetType,
    /// Schema computed by the server (read-only)
    #[serde(default, skip_serializing)]
    pub fields: Vec<DatasetField>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<PhysicalDatasetFormat>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub acceleration_refresh_policy: Option<RefreshPolicy>,
    #[serde(default, skip_serializing, deserialize_with = "crate::entity::lenient_timestamp")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Enrich for VirtualDataset {
    fn enrich(&mut self) {
        self.base.enrich();
    }
}

impl TypedEntity for VirtualDataset {
    fn check_kind(value: &Value) -> Result<()> {
        expect_entity_type(value, EntityType::Dataset)?;
        expect_discriminator(value, "type", DatasetType::VirtualDataset.as_str())
    }
}

impl CatalogKind for VirtualDataset {
    fn core(&self) -> &CatalogEntityCore {
        &self.base
    }
}

impl Enrich for PhysicalDataset {
    fn enrich(&mut self) {
        self.base.enrich();
    }
}

impl TypedEntity for PhysicalDataset {
    fn check_kind(value: &Value) -> Result<()> {
        expect_entity_type(value, EntityType::Dataset)?;
        expect_discriminator(value, "type", DatasetType::PhysicalDataset.as_str())
    }
}

impl CatalogKind for PhysicalDataset {
    fn core(&self) -> &CatalogEntityCore {
        &self.base
    }
}

/// Either kind of dataset, dispatched on `type`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Dataset {
    Virtual(VirtualDataset),
    Physical(PhysicalDataset),
}

impl Dataset {
    /// Shared entity fields.
    pub fn core(&self) -> &CatalogEntityCore {
        match self {
            Dataset::Virtual(d) => &d.base,
            Dataset::Physical(d) => &d.base,
        }
    }

    /// Dataset discriminator.
    pub fn dataset_type(&self) -> DatasetType {
        match self {
            Dataset::Virtual(_) => DatasetType::VirtualDataset,
            Dataset::Physical(_) => DatasetType::PhysicalDataset,
        }
    }

    /// Schema computed by the server.
    pub fn fields(&self) -> &[DatasetField] {
        match self {
            Dataset::Virtual(d) => &d.fields,
            Dataset::Physical(d) => &d.fields,
        }
    }
}

impl<'de> Deserialize<'de> for Dataset {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;
        let dataset_type = value
            .get("type")
            .cloned()
            .ok_or_else(|| <D::Error as de::Error>::missing_field("type"))?;
        let dataset_type: DatasetType =
            serde_json::from_value(dataset_type).map_err(<D::Error as de::Error>::custom)?;
        let dataset = match dataset_type {
            DatasetType::VirtualDataset => serde_json::from_value(value).map(Dataset::Virtual),
            DatasetType::PhysicalDataset => serde_json::from_value(value).map(Dataset::Physical),
        };
        dataset.map_err(de::Error::custom)
    }
}

impl Enrich for Dataset {
    fn enrich(&mut self) {
        match self {
            Dataset::Virtual(d) => d.enrich(),
            Dataset::Physical(d) => d.enrich(),
        }
    }
}

impl TypedEntity for Dataset {
    fn check_kind(value: &Value) -> Result<()> {
        expect_entity_type(value, EntityType::Dataset)?;
        match value.get("type").and_then(Value::as_str) {
            Some("VIRTUAL_DATASET") | Some("PHYSICAL_DATASET") => Ok(()),
            actual => Err(ClientError::WrongKind {
                expected: "VIRTUAL_DATASET or PHYSICAL_DATASET".to_string(),
                actual: actual.unwrap_or(MISSING).to_string(),
            }),
        }
    }
}

impl CatalogKind for Dataset {
    fn core(&self) -> &CatalogEntityCore {
        Dataset::core(self)
    }
}

/// Parameters for creating a virtual dataset.
#[derive(Debug, Clone, Default)]
pub struct NewVirtualDatasetSpec {
    /// Full path including the dataset's own name
    pub path: Vec<String>,
    pub sql: String,
    pub sql_context: Vec<String>,
}

/// Mutable fields of a virtual dataset. `None` keeps the current value.
#[derive(Debug, Clone, Default)]
pub struct UpdateVirtualDatasetSpec {
    pub sql: Option<String>,
    pub sql_context: Option<Vec<String>>,
}

/// Parameters for promoting a file or folder to a physical dataset.
#[derive(Debug, Clone, Default)]
pub struct NewPhysicalDatasetSpec {
    /// Path of the file or folder being promoted
    pub path: Vec<String>,
    pub format: PhysicalDatasetFormat,
    pub acceleration_refresh_policy: Option<RefreshPolicy>,
}

/// Mutable fields of a physical dataset. `None` keeps the current value.
#[derive(Debug, Clone, Default)]
pub struct UpdatePhysicalDatasetSpec {
    pub format: Option<PhysicalDatasetFormat>,
    pub acceleration_refresh_policy: Option<RefreshPolicy>,
}

impl DremioClient {
    /// Get a dataset of either kind by id.
    pub async fn get_dataset(&self, id: &str) -> Result<Dataset> {
        self.get_entity(id).await
    }

    /// Get a dataset of either kind by path.
    pub async fn get_dataset_by_path<S: AsRef<str>>(&self, segments: &[S]) -> Result<Dataset> {
        self.get_entity_by_path(segments).await
    }

    /// Get a virtual dataset by id.
    pub async fn get_virtual_dataset(&self, id: &str) -> Result<VirtualDataset> {
        self.get_entity(id).await
    }

    /// Get a physical dataset by id.
    pub async fn get_physical_dataset(&self, id: &str) -> Result<PhysicalDataset> {
        self.get_entity(id).await
    }

    /// Create a virtual dataset.
    pub async fn new_virtual_dataset(&self, spec: &NewVirtualDatasetSpec) -> Result<VirtualDataset> {
        if spec.path.is_empty() {
            return Err(ClientError::Validation(
                "dataset path cannot be empty".to_string(),
            ));
        }
        if spec.sql.trim().is_empty() {
            return Err(ClientError::Validation(
                "dataset sql cannot be empty".to_string(),
            ));
        }

        let dataset = VirtualDataset {
            base: CatalogEntityCore::with_path(EntityType::Dataset, spec.path.clone()),
            dataset_type: DatasetType::VirtualDataset,
            fields: Vec::new(),
            sql: spec.sql.clone(),
            sql_context: spec.sql_context.clone(),
            created_at: None,
            extra: Map::new(),
        };
        self.create_entity(&dataset).await
    }

    /// Update a virtual dataset's SQL and/or SQL context.
    pub async fn update_virtual_dataset(
        &self,
        id: &str,
        spec: UpdateVirtualDatasetSpec,
    ) -> Result<VirtualDataset> {
        if spec.sql.as_deref().is_some_and(|sql| sql.trim().is_empty()) {
            return Err(ClientError::Validation(
                "dataset sql cannot be empty".to_string(),
            ));
        }

        self.modify_entity(id, |dataset: &mut VirtualDataset| {
            if let Some(sql) = spec.sql {
                dataset.sql = sql;
            }
            if let Some(sql_context) = spec.sql_context {
                dataset.sql_context = sql_context;
            }
        })
        .await
    }

    /// Promote the file or folder with catalog id `file_id` to a physical dataset.
    pub async fn new_physical_dataset(
        &self,
        file_id: &str,
        spec: &NewPhysicalDatasetSpec,
    ) -> Result<PhysicalDataset> {
        if spec.path.is_empty() {
            return Err(ClientError::Validation(
                "dataset path cannot be empty".to_string(),
            ));
        }
        if let Some(ref policy) = spec.acceleration_refresh_policy {
            policy.validate()?;
        }

        let dataset = PhysicalDataset {
            base: CatalogEntityCore {
                id: file_id.to_string(),
                ..CatalogEntityCore::with_path(EntityType::Dataset, spec.path.clone())
            },
            dataset_type: DatasetType::PhysicalDataset,
            fields: Vec::new(),
            format: Some(spec.format.clone()),
            acceleration_refresh_policy: spec.acceleration_refresh_policy.clone(),
            created_at: None,
            extra: Map::new(),
        };
        self.write_entity(Method::POST, &self.catalog_item_path(file_id), &dataset)
            .await
    }

    /// Update a physical dataset's format and/or refresh policy.
    pub async fn update_physical_dataset(
        &self,
        id: &str,
        spec: UpdatePhysicalDatasetSpec,
    ) -> Result<PhysicalDataset> {
        if let Some(ref policy) = spec.acceleration_refresh_policy {
            policy.validate()?;
        }

        self.modify_entity(id, |dataset: &mut PhysicalDataset| {
            if let Some(format) = spec.format {
                dataset.format = Some(format);
            }
            if let Some(policy) = spec.acceleration_refresh_policy {
                dataset.acceleration_refresh_policy = Some(policy);
            }
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn virtual_json() -> Value {
        json!({
            "entityType": "dataset",
            "id": "d-1",
            "tag": "T0",
            "type": "VIRTUAL_DATASET",
            "path": ["Sales", "Top"],
            "sql": "SELECT 1",
            "sqlContext": ["Sales"],
            "fields": [
                {"name": "amount", "type": {"name": "DECIMAL", "precision": 38, "scale": 2}},
                {"name": "address", "type": {"name": "STRUCT", "subSchema": [
                    {"name": "city", "type": {"name": "VARCHAR"}}
                ]}}
            ],
            "createdAt": "2024-02-01T08:00:00.000Z",
            "owner": {"ownerId": "u-1", "ownerType": "USER"}
        })
    }

    #[test]
    fn test_virtual_dataset_decode() {
        let dataset: VirtualDataset = serde_json::from_value(virtual_json()).unwrap();
        assert_eq!(dataset.dataset_type, DatasetType::VirtualDataset);
        assert_eq!(dataset.fields[0].field_type.precision, Some(38));
        assert_eq!(dataset.fields[1].field_type.sub_schema[0].name, "city");
        assert!(dataset.extra.contains_key("owner"));
    }

    #[test]
    fn test_dataset_dispatch_on_type() {
        let dataset: Dataset = serde_json::from_value(virtual_json()).unwrap();
        assert_eq!(dataset.dataset_type(), DatasetType::VirtualDataset);
        assert_eq!(dataset.core().id, "d-1");
        assert_eq!(dataset.fields().len(), 2);

        let physical: Dataset = serde_json::from_value(json!({
            "entityType": "dataset",
            "id": "p-1",
            "type": "PHYSICAL_DATASET",
            "path": ["lake", "events.csv"],
            "format": {"type": "Text", "fieldDelimiter": ",", "autoGenerateColumnNames": false}
        }))
        .unwrap();
        match physical {
            Dataset::Physical(d) => {
                let format = d.format.unwrap();
                assert_eq!(format.format_type, "Text");
                assert_eq!(format.field_delimiter.as_deref(), Some(","));
            }
            other => panic!("Expected physical dataset, got: {:?}", other),
        }
    }

    #[test]
    fn test_kind_guards() {
        let value = virtual_json();
        assert!(Dataset::check_kind(&value).is_ok());
        assert!(VirtualDataset::check_kind(&value).is_ok());

        match PhysicalDataset::check_kind(&value).unwrap_err() {
            ClientError::WrongKind { expected, actual } => {
                assert_eq!(expected, "PHYSICAL_DATASET");
                assert_eq!(actual, "VIRTUAL_DATASET");
            }
            other => panic!("Expected WrongKind, got: {:?}", other),
        }

        match Dataset::check_kind(&json!({"entityType": "folder"})).unwrap_err() {
            ClientError::WrongKind { expected, actual } => {
                assert_eq!(expected, "dataset");
                assert_eq!(actual, "folder");
            }
            other => panic!("Expected WrongKind, got: {:?}", other),
        }
    }

    #[test]
    fn test_write_payload_keeps_immutables_and_drops_read_only() {
        let dataset: VirtualDataset = serde_json::from_value(virtual_json()).unwrap();
        let json = serde_json::to_value(&dataset).unwrap();

        assert_eq!(json["id"], "d-1");
        assert_eq!(json["tag"], "T0");
        assert_eq!(json["entityType"], "dataset");
        assert_eq!(json["type"], "VIRTUAL_DATASET");
        assert_eq!(json["path"], json!(["Sales", "Top"]));
        assert_eq!(json["owner"]["ownerId"], "u-1");
        assert!(json.get("fields").is_none());
        assert!(json.get("createdAt").is_none());
    }

    #[test]
    fn test_name_enriched_from_path() {
        let mut dataset: Dataset = serde_json::from_value(virtual_json()).unwrap();
        dataset.enrich();
        assert_eq!(dataset.core().name, "Top");
    }

    #[test]
    fn test_refresh_policy_validation() {
        let incremental_without_field = RefreshPolicy {
            method: Some(RefreshMethod::Incremental),
            ..Default::default()
        };
        assert!(incremental_without_field.validate().is_err());

        let full_with_field = RefreshPolicy {
            method: Some(RefreshMethod::Full),
            refresh_field: Some("updated_at".to_string()),
            ..Default::default()
        };
        assert!(full_with_field.validate().is_err());

        let never_refresh_with_period = RefreshPolicy {
            never_refresh: Some(true),
            refresh_period_ms: Some(60_000),
            ..Default::default()
        };
        assert!(never_refresh_with_period.validate().is_err());

        let valid = RefreshPolicy {
            refresh_period_ms: Some(3_600_000),
            grace_period_ms: Some(10_800_000),
            method: Some(RefreshMethod::Incremental),
            refresh_field: Some("updated_at".to_string()),
            ..Default::default()
        };
        assert!(valid.validate().is_ok());
    }

    #[test]
    fn test_unmodelled_refresh_method_kept() {
        let policy: RefreshPolicy =
            serde_json::from_value(json!({"method": "AUTO", "refreshPeriodMs": 3600000})).unwrap();
        assert_eq!(policy.method, Some(RefreshMethod::Other("AUTO".to_string())));
        assert!(policy.validate().is_ok());

        let json = serde_json::to_value(&policy).unwrap();
        assert_eq!(json["method"], "AUTO");

        let full: RefreshPolicy = serde_json::from_value(json!({"method": "FULL"})).unwrap();
        assert_eq!(full.method, Some(RefreshMethod::Full));
    }

    #[test]
    fn test_text_format_helper() {
        let json = serde_json::to_value(PhysicalDatasetFormat::text(",")).unwrap();
        assert_eq!(json["type"], "Text");
        assert_eq!(json["fieldDelimiter"], ",");
        assert_eq!(json["extractHeader"], true);
        assert!(json.get("sheetName").is_none());
    }
}
