//! Tags and wiki attached to catalog entities.

use crate::client::DremioClient;
use crate::error::Result;
use crate::transport::ApiPath;
use serde::{Deserialize, Serialize};

/// Tags of a catalog entity. `version` is the concurrency token of the tag set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tags {
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

/// Wiki text of a catalog entity.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Wiki {
    #[serde(default)]
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<i64>,
}

impl DremioClient {
    fn collaboration_path(&self, id: &str, kind: &str) -> ApiPath {
        self.catalog_item_path(id).push("collaboration").push(kind)
    }

    /// Get the tags of an entity.
    pub async fn get_tags(&self, id: &str) -> Result<Tags> {
        self.get_json(&self.collaboration_path(id, "tag")).await
    }

    /// Replace the tags of an entity. Pass the current `version` when tags
    /// already exist; the server rejects stale versions.
    pub async fn set_tags(
        &self,
        id: &str,
        tags: Vec<String>,
        version: Option<String>,
    ) -> Result<Tags> {
        let payload = Tags { tags, version };
        self.post_json(&self.collaboration_path(id, "tag"), &payload)
            .await
    }

    /// Get the wiki of an entity.
    pub async fn get_wiki(&self, id: &str) -> Result<Wiki> {
        self.get_json(&self.collaboration_path(id, "wiki")).await
    }

    /// Replace the wiki text of an entity.
    pub async fn set_wiki(
        &self,
        id: &str,
        text: impl Into<String>,
        version: Option<i64>,
    ) -> Result<Wiki> {
        let payload = Wiki {
            text: text.into(),
            version,
        };
        self.post_json(&self.collaboration_path(id, "wiki"), &payload)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ClientConfig;
    use serde_json::json;

    #[test]
    fn test_collaboration_path() {
        let client =
            DremioClient::new(ClientConfig::builder("http://localhost:9047").build().unwrap())
                .unwrap();
        assert_eq!(
            client.collaboration_path("d 1", "tag").to_string(),
            "/api/v3/catalog/d%201/collaboration/tag"
        );
    }

    #[test]
    fn test_new_tags_omit_version() {
        let tags = Tags {
            tags: vec!["pii".to_string()],
            version: None,
        };
        assert_eq!(serde_json::to_value(&tags).unwrap(), json!({"tags": ["pii"]}));
    }

    #[test]
    fn test_wiki_decode() {
        let wiki: Wiki = serde_json::from_value(json!({"text": "# Sales", "version": 3})).unwrap();
        assert_eq!(wiki.text, "# Sales");
        assert_eq!(wiki.version, Some(3));
    }
}
