//! Folders, home spaces and files.
//!
//! Home spaces and files are read-only here; they are reachable through the
//! generic getters and files are the target of physical dataset promotion.

use crate::client::DremioClient;
use crate::entity::{catalog_kind, CatalogEntityCore, EntityType};
use crate::error::{ClientError, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A folder inside a space, source or home.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Folder {
    #[serde(flatten)]
    pub base: CatalogEntityCore,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

catalog_kind!(Folder, EntityType::Folder);

/// A user's home space.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Home {
    #[serde(flatten)]
    pub base: CatalogEntityCore,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

catalog_kind!(Home, EntityType::Home);

/// A file inside a source or home that has not been promoted to a dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct File {
    #[serde(flatten)]
    pub base: CatalogEntityCore,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

catalog_kind!(File, EntityType::File);

/// Parameters for creating a folder.
#[derive(Debug, Clone, Default)]
pub struct NewFolderSpec {
    /// Full path including the new folder's own name
    pub path: Vec<String>,
}

impl DremioClient {
    /// Get a folder by id.
    pub async fn get_folder(&self, id: &str) -> Result<Folder> {
        self.get_entity(id).await
    }

    /// Get a folder by path.
    pub async fn get_folder_by_path<S: AsRef<str>>(&self, segments: &[S]) -> Result<Folder> {
        self.get_entity_by_path(segments).await
    }

    /// Create a folder.
    pub async fn new_folder(&self, spec: &NewFolderSpec) -> Result<Folder> {
        if spec.path.is_empty() {
            return Err(ClientError::Validation(
                "folder path cannot be empty".to_string(),
            ));
        }

        let folder = Folder {
            base: CatalogEntityCore::with_path(EntityType::Folder, spec.path.clone()),
            extra: Map::new(),
        };
        self.create_entity(&folder).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::{CatalogKind, Enrich, TypedEntity};
    use serde_json::json;

    #[test]
    fn test_new_folder_payload() {
        let folder = Folder {
            base: CatalogEntityCore::with_path(
                EntityType::Folder,
                vec!["Sales".to_string(), "Archive".to_string()],
            ),
            extra: Map::new(),
        };
        let json = serde_json::to_value(&folder).unwrap();
        assert_eq!(
            json,
            json!({"entityType": "folder", "path": ["Sales", "Archive"]})
        );
    }

    #[test]
    fn test_folder_name_from_path() {
        let mut folder: Folder = serde_json::from_value(json!({
            "entityType": "folder",
            "id": "f-1",
            "tag": "1",
            "path": ["Sales", "Archive"],
            "children": [
                {"id": "d-9", "path": ["Sales", "Archive", "old"], "type": "DATASET", "datasetType": "VIRTUAL"}
            ]
        }))
        .unwrap();

        folder.enrich();

        assert_eq!(folder.core().name, "Archive");
        assert_eq!(folder.base.children[0].name, "old");
    }

    #[test]
    fn test_folder_kind_guard() {
        assert!(Folder::check_kind(&json!({"entityType": "folder"})).is_ok());
        assert!(Folder::check_kind(&json!({"entityType": "space"})).is_err());
        assert!(Home::check_kind(&json!({"entityType": "home"})).is_ok());
        assert!(File::check_kind(&json!({"entityType": "file"})).is_ok());
    }
}
