//! HTTP API client for Nakala
//!
//! Every call carries the `X-API-KEY` and `accept: application/json`
//! headers. A 401 on any call ends the run with [`CliError::Unauthorized`].

use crate::api::payload::TITLE_URI;
use crate::api::{endpoints, payload, types::*};
use crate::error::{CliError, Result};
use crate::job::CollectionStatus;
use crate::retry::{retry_transient, Backoff};
use nakalator_common::naming::file_name;
use reqwest::header::ACCEPT;
use reqwest::multipart::{Form, Part};
use reqwest::{Body, Client, RequestBuilder, Response, StatusCode};
use std::path::Path;
use std::time::Duration;
use tokio_util::io::ReaderStream;
use tracing::{debug, warn};

// ============================================================================
// API Client Constants
// ============================================================================

/// Default timeout for API requests in seconds.
/// Can be overridden via NAKALATOR_API_TIMEOUT_SECS environment variable.
/// Large scans take a while to upload, hence the generous default.
pub const DEFAULT_API_TIMEOUT_SECS: u64 = 300;

/// Header carrying the API key.
pub const API_KEY_HEADER: &str = "X-API-KEY";

/// API client for one Nakala instance
#[derive(Debug, Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    api_key: String,
    backoff: Backoff,
}

impl ApiClient {
    /// Create a new API client
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Result<Self> {
        let timeout_secs = std::env::var("NAKALATOR_API_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(DEFAULT_API_TIMEOUT_SECS);

        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            backoff: Backoff::default(),
        })
    }

    /// Replace the transport retry policy
    pub fn with_backoff(mut self, backoff: Backoff) -> Self {
        self.backoff = backoff;
        self
    }

    /// Get the base URL
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .header(API_KEY_HEADER, &self.api_key)
            .header(ACCEPT, "application/json")
    }

    /// Upload one file, retrying transport errors within the backoff budget.
    ///
    /// Returns `None` when the repository answered without a checksum.
    pub async fn upload_file(&self, path: &Path) -> Result<Option<UploadedFile>> {
        retry_transient(&self.backoff, "upload", || self.try_upload_file(path)).await
    }

    /// Upload one file with a single HTTP attempt
    pub async fn try_upload_file(&self, path: &Path) -> Result<Option<UploadedFile>> {
        let url = endpoints::uploads_url(&self.base_url);
        let name = file_name(path);

        // Streamed from disk; batch uploads keep many files in flight
        let file = tokio::fs::File::open(path).await?;
        let length = file.metadata().await?.len();
        let body = Body::wrap_stream(ReaderStream::new(file));
        let form = Form::new().part("file", Part::stream_with_length(body, length).file_name(name.clone()));

        let response = self
            .authorized(self.client.post(&url))
            .multipart(form)
            .send()
            .await?;
        let response = reject_unauthorized(response)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(file = %name, status = status.as_u16(), body = %body, "Upload rejected");
            return Ok(None);
        }

        let uploaded: UploadResponse = match response.json().await {
            Ok(uploaded) => uploaded,
            Err(e) => {
                warn!(file = %name, error = %e, "Upload answer is not readable");
                return Ok(None);
            },
        };

        match uploaded.sha1.filter(|sha1| !sha1.is_empty()) {
            Some(sha1) => {
                debug!(file = %name, sha1 = %sha1, "Uploaded");
                Ok(Some(UploadedFile { name, sha1 }))
            },
            None => {
                warn!(file = %name, "Upload answered without a checksum");
                Ok(None)
            },
        }
    }

    /// Create a data resource and return its identifier
    pub async fn create_data(&self, request: &CreateDataRequest) -> Result<String> {
        let url = endpoints::datas_url(&self.base_url);
        let url = url.as_str();

        retry_transient(&self.backoff, "create data", || async move {
            let response = self
                .authorized(self.client.post(url))
                .json(request)
                .send()
                .await?;
            created_id(response, "data").await
        })
        .await
    }

    /// Create a collection and return `(title, identifier)`
    pub async fn create_collection(
        &self,
        title: &str,
        description: &str,
        status: CollectionStatus,
    ) -> Result<(String, String)> {
        let url = endpoints::collections_url(&self.base_url);
        let request = CreateCollectionRequest {
            status,
            metas: payload::collection_metas(title, description),
            datas: Vec::new(),
            rights: Vec::new(),
        };

        let (url, request) = (url.as_str(), &request);

        let id = retry_transient(&self.backoff, "create collection", || async move {
            let response = self
                .authorized(self.client.post(url))
                .json(request)
                .send()
                .await?;
            created_id(response, "collection").await
        })
        .await?;

        Ok((title.to_string(), id))
    }

    /// Fetch the title of an existing collection
    pub async fn get_collection(&self, collection_id: &str) -> Result<String> {
        let url = endpoints::collection_url(&self.base_url, collection_id);

        let response = self.authorized(self.client.get(&url)).send().await?;
        let response = reject_unauthorized(response)?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(CliError::CollectionNotFound(collection_id.to_string()));
        }
        if !status.is_success() {
            return Err(CliError::LookupFailed {
                id: collection_id.to_string(),
                status: status.as_u16(),
                body: response.text().await.unwrap_or_default(),
            });
        }

        let collection: CollectionResponse = response.json().await?;
        collection
            .metas
            .iter()
            .find(|meta| meta.property_uri.as_deref() == Some(TITLE_URI))
            .or_else(|| collection.metas.first())
            .map(RemoteMeta::text)
            .ok_or_else(|| {
                CliError::api(format!("collection '{}' has no metadata", collection_id))
            })
    }

    /// Files attached to a data resource.
    ///
    /// An empty list means the repository cannot be read back yet.
    pub async fn get_data_files(&self, data_id: &str) -> Result<Vec<RemoteFile>> {
        let url = endpoints::data_url(&self.base_url, data_id);

        let response = match self.authorized(self.client.get(&url)).send().await {
            Ok(response) => reject_unauthorized(response)?,
            Err(e) => {
                warn!(data = %data_id, error = %e, "Cannot read data back");
                return Ok(Vec::new());
            },
        };

        if !response.status().is_success() {
            warn!(data = %data_id, status = response.status().as_u16(), "Cannot read data back");
            return Ok(Vec::new());
        }

        match response.json::<DataResponse>().await {
            Ok(data) => Ok(data.files),
            Err(e) => {
                warn!(data = %data_id, error = %e, "Data answer is not readable");
                Ok(Vec::new())
            },
        }
    }
}

fn reject_unauthorized(response: Response) -> Result<Response> {
    if response.status() == StatusCode::UNAUTHORIZED {
        return Err(CliError::Unauthorized);
    }
    Ok(response)
}

async fn created_id(response: Response, resource: &'static str) -> Result<String> {
    let response = reject_unauthorized(response)?;
    let status = response.status();

    if status != StatusCode::CREATED {
        return Err(CliError::CreateFailed {
            resource,
            status: status.as_u16(),
            body: response.text().await.unwrap_or_default(),
        });
    }

    let created: CreatedResponse = response.json().await?;
    debug!(resource, id = %created.payload.id, "Created");
    Ok(created.payload.id)
}
