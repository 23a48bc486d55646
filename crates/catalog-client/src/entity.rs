//! Catalog entity model shared by every kind.
//!
//! Concrete kinds compose a [`CatalogEntityCore`] (flattened on the wire) with
//! their own fields. Responses are discriminated by `entityType` and, for
//! datasets, by `type`; typed accessors verify those discriminators before
//! decoding and fail with [`ClientError::WrongKind`] on a mismatch.
//!
//! Enrichment fills a missing `name` from the last `path` element, or a
//! missing `path` from `name`. It never overwrites a field that is already set
//! and is idempotent.

use crate::dataset::Dataset;
use crate::error::{ClientError, Result};
use crate::folder::{File, Folder, Home};
use crate::source::Source;
use crate::space::Space;
use chrono::{DateTime, Utc};
use serde::de::{self, DeserializeOwned, Deserializer};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Placeholder used in [`ClientError::WrongKind`] when a discriminator is absent.
pub(crate) const MISSING: &str = "<missing>";

/// Discriminator of a catalog entity (`entityType` on the wire).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityType {
    Source,
    Space,
    Folder,
    Home,
    File,
    Dataset,
}

impl EntityType {
    /// Wire value of the discriminator.
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityType::Source => "source",
            EntityType::Space => "space",
            EntityType::Folder => "folder",
            EntityType::Home => "home",
            EntityType::File => "file",
            EntityType::Dataset => "dataset",
        }
    }

    /// Parse a wire value; `None` for anything outside the family.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "source" => Some(EntityType::Source),
            "space" => Some(EntityType::Space),
            "folder" => Some(EntityType::Folder),
            "home" => Some(EntityType::Home),
            "file" => Some(EntityType::File),
            "dataset" => Some(EntityType::Dataset),
            _ => None,
        }
    }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Fields every catalog entity carries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogEntityCore {
    /// Kind discriminator
    pub entity_type: EntityType,
    /// Server-assigned id (empty before creation)
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id: String,
    /// Optimistic-concurrency version token (empty before creation)
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub tag: String,
    /// Hierarchical path, root first
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub path: Vec<String>,
    /// Display name
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,
    /// Listing of contained entities (read-only)
    #[serde(default, skip_serializing)]
    pub children: Vec<CatalogEntitySummary>,
}

impl CatalogEntityCore {
    /// Empty core for a new entity of the given kind.
    pub fn new(entity_type: EntityType) -> Self {
        Self {
            entity_type,
            id: String::new(),
            tag: String::new(),
            path: Vec::new(),
            name: String::new(),
            children: Vec::new(),
        }
    }

    /// Core for a new entity addressed by path.
    pub fn with_path(entity_type: EntityType, path: Vec<String>) -> Self {
        Self {
            path,
            ..Self::new(entity_type)
        }
    }

    /// Core for a new entity addressed by name.
    pub fn with_name(entity_type: EntityType, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::new(entity_type)
        }
    }
}

/// Top-level kind of a listed entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SummaryType {
    Container,
    Dataset,
    File,
    #[serde(other)]
    Unknown,
}

/// Container subtype of a listed entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ContainerType {
    Space,
    Source,
    Folder,
    Home,
    #[serde(other)]
    Unknown,
}

/// Dataset subtype of a listed entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SummaryDatasetType {
    Virtual,
    Promoted,
    Direct,
    #[serde(other)]
    Unknown,
}

/// Listing projection of a catalog entity (root listing and `children`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogEntitySummary {
    #[serde(default)]
    pub id: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub tag: String,
    #[serde(default)]
    pub path: Vec<String>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,
    #[serde(rename = "type")]
    pub kind: Option<SummaryType>,
    pub dataset_type: Option<SummaryDatasetType>,
    pub container_type: Option<ContainerType>,
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub created_at: Option<DateTime<Utc>>,
}

/// Decode a server-computed timestamp given as RFC 3339 text or epoch
/// milliseconds. Anything else reads as `None`.
pub(crate) fn lenient_timestamp<'de, D>(
    deserializer: D,
) -> std::result::Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let timestamp = match Option::<Value>::deserialize(deserializer)? {
        Some(Value::String(text)) => match DateTime::parse_from_rfc3339(&text) {
            Ok(parsed) => Some(parsed.with_timezone(&Utc)),
            Err(_) => text.parse().ok().and_then(DateTime::<Utc>::from_timestamp_millis),
        },
        Some(Value::Number(millis)) => millis
            .as_i64()
            .and_then(DateTime::<Utc>::from_timestamp_millis),
        _ => None,
    };
    Ok(timestamp)
}

/// Fill gaps between a name and a path.
pub fn derive_name_and_path(name: &mut String, path: &mut Vec<String>) {
    if name.is_empty() {
        if let Some(last) = path.last() {
            *name = last.clone();
        }
    } else if path.is_empty() {
        *path = vec![name.clone()];
    }
}

/// Post-read normalization.
pub trait Enrich {
    /// Fill derivable gaps in place. Never fails and is idempotent.
    fn enrich(&mut self);
}

impl Enrich for CatalogEntitySummary {
    fn enrich(&mut self) {
        derive_name_and_path(&mut self.name, &mut self.path);
    }
}

impl Enrich for CatalogEntityCore {
    fn enrich(&mut self) {
        derive_name_and_path(&mut self.name, &mut self.path);
        for child in &mut self.children {
            child.enrich();
        }
    }
}

impl<T: Enrich> Enrich for Vec<T> {
    fn enrich(&mut self) {
        for item in self {
            item.enrich();
        }
    }
}

/// A response shape guarded by its discriminators.
pub trait TypedEntity: Serialize + DeserializeOwned {
    /// Fails with [`ClientError::WrongKind`] unless the raw response carries
    /// this shape's discriminators.
    fn check_kind(value: &Value) -> Result<()>;
}

/// A catalog entity kind served under `/catalog`.
pub trait CatalogKind: TypedEntity + Enrich {
    /// Shared entity fields.
    fn core(&self) -> &CatalogEntityCore;
}

/// Compare one string discriminator against the expected value.
pub(crate) fn expect_discriminator(value: &Value, field: &str, expected: &str) -> Result<()> {
    match value.get(field).and_then(Value::as_str) {
        Some(actual) if actual == expected => Ok(()),
        actual => Err(ClientError::WrongKind {
            expected: expected.to_string(),
            actual: actual.unwrap_or(MISSING).to_string(),
        }),
    }
}

pub(crate) fn expect_entity_type(value: &Value, expected: EntityType) -> Result<()> {
    expect_discriminator(value, "entityType", expected.as_str())
}

/// Implements [`Enrich`], [`TypedEntity`] and [`CatalogKind`] for a kind whose
/// only discriminator is `entityType` and whose core lives in `base`.
macro_rules! catalog_kind {
    ($ty:ty, $entity_type:expr) => {
        impl $crate::entity::Enrich for $ty {
            fn enrich(&mut self) {
                self.base.enrich();
            }
        }

        impl $crate::entity::TypedEntity for $ty {
            fn check_kind(value: &serde_json::Value) -> $crate::error::Result<()> {
                $crate::entity::expect_entity_type(value, $entity_type)
            }
        }

        impl $crate::entity::CatalogKind for $ty {
            fn core(&self) -> &$crate::entity::CatalogEntityCore {
                &self.base
            }
        }
    };
}
pub(crate) use catalog_kind;

/// Any catalog entity, dispatched on `entityType`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum CatalogEntity {
    Source(Source),
    Space(Space),
    Folder(Folder),
    Home(Home),
    File(File),
    Dataset(Dataset),
}

impl CatalogEntity {
    /// Shared entity fields.
    pub fn core(&self) -> &CatalogEntityCore {
        match self {
            CatalogEntity::Source(e) => &e.base,
            CatalogEntity::Space(e) => &e.base,
            CatalogEntity::Folder(e) => &e.base,
            CatalogEntity::Home(e) => &e.base,
            CatalogEntity::File(e) => &e.base,
            CatalogEntity::Dataset(e) => e.core(),
        }
    }

    /// Kind discriminator.
    pub fn entity_type(&self) -> EntityType {
        self.core().entity_type
    }

    /// Server-assigned id.
    pub fn id(&self) -> &str {
        &self.core().id
    }

    /// Current version tag.
    pub fn tag(&self) -> &str {
        &self.core().tag
    }
}

impl<'de> Deserialize<'de> for CatalogEntity {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;
        let entity_type = value
            .get("entityType")
            .and_then(Value::as_str)
            .ok_or_else(|| <D::Error as de::Error>::missing_field("entityType"))?;

        let entity = match EntityType::parse(entity_type) {
            Some(EntityType::Source) => serde_json::from_value(value).map(CatalogEntity::Source),
            Some(EntityType::Space) => serde_json::from_value(value).map(CatalogEntity::Space),
            Some(EntityType::Folder) => serde_json::from_value(value).map(CatalogEntity::Folder),
            Some(EntityType::Home) => serde_json::from_value(value).map(CatalogEntity::Home),
            Some(EntityType::File) => serde_json::from_value(value).map(CatalogEntity::File),
            Some(EntityType::Dataset) => serde_json::from_value(value).map(CatalogEntity::Dataset),
            None => {
                return Err(de::Error::unknown_variant(
                    entity_type,
                    &["source", "space", "folder", "home", "file", "dataset"],
                ))
            }
        };
        entity.map_err(de::Error::custom)
    }
}

impl Enrich for CatalogEntity {
    fn enrich(&mut self) {
        match self {
            CatalogEntity::Source(e) => e.enrich(),
            CatalogEntity::Space(e) => e.enrich(),
            CatalogEntity::Folder(e) => e.enrich(),
            CatalogEntity::Home(e) => e.enrich(),
            CatalogEntity::File(e) => e.enrich(),
            CatalogEntity::Dataset(e) => e.enrich(),
        }
    }
}

impl TypedEntity for CatalogEntity {
    fn check_kind(value: &Value) -> Result<()> {
        let actual = value.get("entityType").and_then(Value::as_str);
        match actual.and_then(EntityType::parse) {
            Some(EntityType::Dataset) => Dataset::check_kind(value),
            Some(_) => Ok(()),
            None => Err(ClientError::WrongKind {
                expected: "catalog entity".to_string(),
                actual: actual.unwrap_or(MISSING).to_string(),
            }),
        }
    }
}

impl CatalogKind for CatalogEntity {
    fn core(&self) -> &CatalogEntityCore {
        CatalogEntity::core(self)
    }
}

/// Root listing response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct ListResponse<T> {
    #[serde(default = "Vec::new")]
    pub data: Vec<T>,
}
