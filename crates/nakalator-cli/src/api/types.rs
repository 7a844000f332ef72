//! API request and response types
//!
//! Field names follow the Nakala JSON API.

use crate::job::{CollectionStatus, DataStatus, MetadataValue};
use serde::{Deserialize, Serialize};

/// A file accepted by `POST /datas/uploads`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadedFile {
    /// Original (local) file name
    pub name: String,

    /// Content hash computed by the repository
    pub sha1: String,
}

/// Body returned by the upload endpoint
#[derive(Debug, Clone, Deserialize)]
pub struct UploadResponse {
    #[serde(default)]
    pub name: Option<String>,

    #[serde(default)]
    pub sha1: Option<String>,
}

/// One metadata statement sent to the repository
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Meta {
    pub property_uri: String,

    pub value: MetadataValue,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub lang: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub type_uri: Option<String>,
}

/// Request body for `POST /datas`
#[derive(Debug, Clone, Serialize)]
pub struct CreateDataRequest {
    pub status: DataStatus,

    pub files: Vec<UploadedFile>,

    pub metas: Vec<Meta>,

    #[serde(rename = "collectionsIds", skip_serializing_if = "Vec::is_empty")]
    pub collections_ids: Vec<String>,
}

/// Request body for `POST /collections`
#[derive(Debug, Clone, Serialize)]
pub struct CreateCollectionRequest {
    pub status: CollectionStatus,

    pub metas: Vec<Meta>,

    pub datas: Vec<String>,

    pub rights: Vec<serde_json::Value>,
}

/// Response of the create endpoints (HTTP 201)
#[derive(Debug, Clone, Deserialize)]
pub struct CreatedResponse {
    pub payload: CreatedPayload,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreatedPayload {
    pub id: String,
}

/// Subset of `GET /collections/{id}`
#[derive(Debug, Clone, Deserialize)]
pub struct CollectionResponse {
    #[serde(default)]
    pub metas: Vec<RemoteMeta>,
}

/// Metadata statement as returned by the repository
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteMeta {
    pub value: serde_json::Value,

    #[serde(default)]
    pub property_uri: Option<String>,
}

impl RemoteMeta {
    /// Value as display text
    pub fn text(&self) -> String {
        match &self.value {
            serde_json::Value::String(s) => s.clone(),
            other => other.to_string(),
        }
    }
}

/// Subset of `GET /datas/{id}`
#[derive(Debug, Clone, Deserialize)]
pub struct DataResponse {
    #[serde(default)]
    pub files: Vec<RemoteFile>,
}

/// A file attached to a data resource on the repository
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteFile {
    pub name: String,

    #[serde(default)]
    pub sha1: Option<String>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_create_data_request_omits_empty_collections() {
        let request = CreateDataRequest {
            status: DataStatus::Pending,
            files: vec![UploadedFile {
                name: "f001.tif".to_string(),
                sha1: "abc".to_string(),
            }],
            metas: vec![],
            collections_ids: vec![],
        };

        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["status"], "pending");
        assert_eq!(json["files"][0]["sha1"], "abc");
        assert!(json.get("collectionsIds").is_none());
    }

    #[test]
    fn test_meta_serialization() {
        let meta = Meta {
            property_uri: "http://nakala.fr/terms#title".to_string(),
            value: MetadataValue::Literal("Titre".to_string()),
            lang: Some("fr".to_string()),
            type_uri: None,
        };

        let json = serde_json::to_value(&meta).unwrap();
        assert_eq!(json["propertyUri"], "http://nakala.fr/terms#title");
        assert_eq!(json["value"], "Titre");
        assert_eq!(json["lang"], "fr");
        assert!(json.get("typeUri").is_none());
    }

    #[test]
    fn test_remote_file_without_sha1() {
        let data: DataResponse =
            serde_json::from_str(r#"{"files":[{"name":"a.tif"},{"name":"b.tif","sha1":"x"}]}"#)
                .unwrap();
        assert_eq!(data.files[0].sha1, None);
        assert_eq!(data.files[1].sha1.as_deref(), Some("x"));
    }
}
