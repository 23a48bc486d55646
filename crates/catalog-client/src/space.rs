//! Spaces: top-level containers created by name.

use crate::client::DremioClient;
use crate::entity::{catalog_kind, CatalogEntityCore, EntityType};
use crate::error::{ClientError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A space. Its path is always the single element `[name]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Space {
    #[serde(flatten)]
    pub base: CatalogEntityCore,
    #[serde(default, skip_serializing, deserialize_with = "crate::entity::lenient_timestamp")]
    pub created_at: Option<DateTime<Utc>>,
    /// Fields this client does not model, carried through updates
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

catalog_kind!(Space, EntityType::Space);

/// Parameters for creating a space.
#[derive(Debug, Clone, Default)]
pub struct NewSpaceSpec {
    pub name: String,
}

impl DremioClient {
    /// Get a space by id.
    pub async fn get_space(&self, id: &str) -> Result<Space> {
        self.get_entity(id).await
    }

    /// Get a space by path. A space sits at the root, so its path is `[name]`.
    pub async fn get_space_by_path<S: AsRef<str>>(&self, segments: &[S]) -> Result<Space> {
        self.get_entity_by_path(segments).await
    }

    /// Get a space by name.
    pub async fn get_space_by_name(&self, name: &str) -> Result<Space> {
        self.get_space_by_path(&[name]).await
    }

    /// Create a space. Spaces are created by name only; no path is sent.
    pub async fn new_space(&self, spec: &NewSpaceSpec) -> Result<Space> {
        if spec.name.is_empty() {
            return Err(ClientError::Validation(
                "space name cannot be empty".to_string(),
            ));
        }

        let space = Space {
            base: CatalogEntityCore::with_name(EntityType::Space, spec.name.clone()),
            created_at: None,
            extra: Map::new(),
        };
        self.create_entity(&space).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::Enrich;
    use serde_json::json;

    #[test]
    fn test_new_space_payload_has_no_path() {
        let space = Space {
            base: CatalogEntityCore::with_name(EntityType::Space, "Sales"),
            created_at: None,
            extra: Map::new(),
        };
        let json = serde_json::to_value(&space).unwrap();
        assert_eq!(json, json!({"entityType": "space", "name": "Sales"}));
    }

    #[test]
    fn test_space_response_enriched() {
        let mut space: Space = serde_json::from_value(json!({
            "entityType": "space",
            "id": "s-1",
            "tag": "0",
            "name": "Sales",
            "createdAt": "2024-03-01T12:00:00.000Z",
            "children": []
        }))
        .unwrap();

        space.enrich();

        assert_eq!(space.base.path, vec!["Sales"]);
        assert!(space.created_at.is_some());
        assert!(space.extra.is_empty());
    }

    #[test]
    fn test_unknown_fields_preserved() {
        let space: Space = serde_json::from_value(json!({
            "entityType": "space",
            "id": "s-1",
            "tag": "4",
            "name": "Sales",
            "accessControlList": {"users": []}
        }))
        .unwrap();

        assert!(space.extra.contains_key("accessControlList"));
        let json = serde_json::to_value(&space).unwrap();
        assert_eq!(json["accessControlList"], json!({"users": []}));
        assert_eq!(json["tag"], "4");
    }
}
