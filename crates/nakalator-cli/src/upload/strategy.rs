//! Upload strategies
//!
//! Three ways to push a job's files to `POST /datas/uploads`, all behind the
//! [`Uploader`] trait so the workflow does not care which one runs.

use crate::api::{ApiClient, UploadedFile};
use crate::error::Result;
use async_trait::async_trait;
use futures::stream::{self, StreamExt, TryStreamExt};
use indicatif::ProgressBar;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, warn};

/// Concurrent uploads in batch mode
pub const BATCH_CONCURRENCY: usize = 20;

/// Attempts per file in batch mode
pub const BATCH_ATTEMPTS: u32 = 10;

/// Delay unit of the batch-mode linear backoff
pub const BATCH_BACKOFF_STEP: Duration = Duration::from_secs(2);

/// Upload strategy selected on the command line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum UploadMethod {
    /// One file at a time
    #[value(alias = "soft")]
    Sequential,

    /// One worker per CPU
    #[value(alias = "hard")]
    Parallel,

    /// Many concurrent uploads with per-file retries
    #[default]
    Batch,
}

impl std::fmt::Display for UploadMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UploadMethod::Sequential => write!(f, "sequential"),
            UploadMethod::Parallel => write!(f, "parallel"),
            UploadMethod::Batch => write!(f, "batch"),
        }
    }
}

/// Outcome for one offered file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadAttempt {
    pub path: PathBuf,

    /// `None` when the repository returned no checksum
    pub record: Option<UploadedFile>,
}

/// Sends a set of files and reports one attempt per file
#[async_trait]
pub trait Uploader: Send + Sync {
    fn name(&self) -> &'static str;

    async fn upload_batch(&self, files: &[PathBuf], progress: &ProgressBar) -> Result<Vec<UploadAttempt>>;
}

/// Build the uploader for a method
pub fn uploader_for(method: UploadMethod, client: ApiClient) -> Box<dyn Uploader> {
    match method {
        UploadMethod::Sequential => Box::new(SequentialUploader::new(client)),
        UploadMethod::Parallel => Box::new(PooledUploader::new(client)),
        UploadMethod::Batch => Box::new(BatchUploader::new(client)),
    }
}

/// Upload through the client's transport backoff; a transport error that
/// outlives the backoff counts as a missing checksum, not a fatal error.
async fn upload_one(client: &ApiClient, path: &Path, progress: &ProgressBar) -> Result<UploadAttempt> {
    let record = match client.upload_file(path).await {
        Ok(record) => record,
        Err(e) if e.is_transient() => {
            warn!(file = %path.display(), error = %e, "Upload gave up on transport errors");
            None
        },
        Err(e) => return Err(e),
    };

    if record.is_some() {
        progress.inc(1);
    }

    Ok(UploadAttempt {
        path: path.to_path_buf(),
        record,
    })
}

/// One call at a time, results in input order
pub struct SequentialUploader {
    client: ApiClient,
}

impl SequentialUploader {
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Uploader for SequentialUploader {
    fn name(&self) -> &'static str {
        "sequential"
    }

    async fn upload_batch(&self, files: &[PathBuf], progress: &ProgressBar) -> Result<Vec<UploadAttempt>> {
        let mut attempts = Vec::with_capacity(files.len());
        for path in files {
            attempts.push(upload_one(&self.client, path, progress).await?);
        }
        Ok(attempts)
    }
}

/// Worker pool sized to the CPUs, results in completion order
pub struct PooledUploader {
    client: ApiClient,
    workers: usize,
}

impl PooledUploader {
    pub fn new(client: ApiClient) -> Self {
        let workers = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(4);
        Self { client, workers }
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }
}

#[async_trait]
impl Uploader for PooledUploader {
    fn name(&self) -> &'static str {
        "parallel"
    }

    async fn upload_batch(&self, files: &[PathBuf], progress: &ProgressBar) -> Result<Vec<UploadAttempt>> {
        debug!(workers = self.workers, files = files.len(), "Starting upload pool");

        let uploads: Vec<_> = files
            .iter()
            .map(|path| upload_one(&self.client, path, progress))
            .collect();

        stream::iter(uploads)
            .buffer_unordered(self.workers)
            .try_collect()
            .await
    }
}

/// High-throughput uploads: bounded concurrency, each file retried with a
/// linear backoff, results returned together in input order.
pub struct BatchUploader {
    client: ApiClient,
    concurrency: usize,
    attempts: u32,
    backoff_step: Duration,
}

impl BatchUploader {
    pub fn new(client: ApiClient) -> Self {
        Self {
            client,
            concurrency: BATCH_CONCURRENCY,
            attempts: BATCH_ATTEMPTS,
            backoff_step: BATCH_BACKOFF_STEP,
        }
    }

    /// Change the per-file retry schedule
    pub fn with_retries(mut self, attempts: u32, backoff_step: Duration) -> Self {
        self.attempts = attempts.max(1);
        self.backoff_step = backoff_step;
        self
    }

    async fn upload_with_retries(&self, path: &Path, progress: &ProgressBar) -> Result<UploadAttempt> {
        let mut attempt = 1;
        let record = loop {
            match self.client.try_upload_file(path).await {
                Ok(record) => break record,
                Err(e) if e.is_transient() && attempt < self.attempts => {
                    let delay = self.backoff_step * attempt;
                    warn!(
                        file = %path.display(),
                        attempt,
                        backoff_ms = delay.as_millis() as u64,
                        error = %e,
                        "Upload failed, retrying..."
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                },
                Err(e) if e.is_transient() => {
                    warn!(file = %path.display(), attempts = attempt, error = %e, "Upload gave up");
                    break None;
                },
                Err(e) => return Err(e),
            }
        };

        if record.is_some() {
            progress.inc(1);
        }

        Ok(UploadAttempt {
            path: path.to_path_buf(),
            record,
        })
    }
}

#[async_trait]
impl Uploader for BatchUploader {
    fn name(&self) -> &'static str {
        "batch"
    }

    async fn upload_batch(&self, files: &[PathBuf], progress: &ProgressBar) -> Result<Vec<UploadAttempt>> {
        let uploads: Vec<_> = files
            .iter()
            .map(|path| self.upload_with_retries(path, progress))
            .collect();

        stream::iter(uploads)
            .buffered(self.concurrency)
            .try_collect()
            .await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::error::CliError;
    use crate::retry::Backoff;
    use serde_json::json;
    use tempfile::TempDir;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn files(dir: &TempDir, names: &[&str]) -> Vec<PathBuf> {
        names
            .iter()
            .map(|name| {
                let path = dir.path().join(name);
                std::fs::write(&path, name.as_bytes()).unwrap();
                path
            })
            .collect()
    }

    async fn server_answering(status: u16) -> MockServer {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/datas/uploads"))
            .respond_with(ResponseTemplate::new(status).set_body_json(json!({"sha1": "abc", "name": "x"})))
            .mount(&server)
            .await;
        server
    }

    fn client(server: &MockServer) -> ApiClient {
        ApiClient::new(server.uri(), "k").unwrap().with_backoff(Backoff::none())
    }

    fn names(attempts: &[UploadAttempt]) -> Vec<String> {
        attempts
            .iter()
            .map(|a| a.record.as_ref().map(|r| r.name.clone()).unwrap_or_default())
            .collect()
    }

    #[tokio::test]
    async fn test_sequential_keeps_input_order() {
        let server = server_answering(200).await;
        let dir = TempDir::new().unwrap();
        let files = files(&dir, &["prev.tif", "a.tif", "b.tif"]);

        let attempts = SequentialUploader::new(client(&server))
            .upload_batch(&files, &ProgressBar::hidden())
            .await
            .unwrap();
        assert_eq!(names(&attempts), vec!["prev.tif", "a.tif", "b.tif"]);
    }

    #[tokio::test]
    async fn test_batch_keeps_input_order() {
        let server = server_answering(200).await;
        let dir = TempDir::new().unwrap();
        let names_in: Vec<String> = (0..30).map(|i| format!("f{:03}.tif", i)).collect();
        let refs: Vec<&str> = names_in.iter().map(String::as_str).collect();
        let files = files(&dir, &refs);

        let progress = ProgressBar::hidden();
        let attempts = BatchUploader::new(client(&server))
            .upload_batch(&files, &progress)
            .await
            .unwrap();
        assert_eq!(names(&attempts), names_in);
        assert_eq!(progress.position(), 30);
    }

    #[tokio::test]
    async fn test_pool_returns_every_file() {
        let server = server_answering(200).await;
        let dir = TempDir::new().unwrap();
        let files = files(&dir, &["a.tif", "b.tif", "c.tif", "d.tif"]);

        let attempts = PooledUploader::new(client(&server))
            .with_workers(2)
            .upload_batch(&files, &ProgressBar::hidden())
            .await
            .unwrap();

        let mut got = names(&attempts);
        got.sort();
        assert_eq!(got, vec!["a.tif", "b.tif", "c.tif", "d.tif"]);
    }

    #[tokio::test]
    async fn test_rejected_upload_has_no_record() {
        let server = server_answering(500).await;
        let dir = TempDir::new().unwrap();
        let files = files(&dir, &["a.tif"]);

        let attempts = SequentialUploader::new(client(&server))
            .upload_batch(&files, &ProgressBar::hidden())
            .await
            .unwrap();
        assert_eq!(attempts.len(), 1);
        assert_eq!(attempts[0].record, None);
    }

    #[tokio::test]
    async fn test_batch_gives_up_on_unreachable_server() {
        let client = ApiClient::new("http://127.0.0.1:9", "k").unwrap();
        let dir = TempDir::new().unwrap();
        let files = files(&dir, &["a.tif"]);

        let attempts = BatchUploader::new(client)
            .with_retries(2, Duration::from_millis(5))
            .upload_batch(&files, &ProgressBar::hidden())
            .await
            .unwrap();
        assert_eq!(attempts[0].record, None);
    }

    #[tokio::test]
    async fn test_unauthorized_stops_the_batch() {
        let server = server_answering(401).await;
        let dir = TempDir::new().unwrap();
        let files = files(&dir, &["a.tif", "b.tif"]);

        let result = BatchUploader::new(client(&server))
            .upload_batch(&files, &ProgressBar::hidden())
            .await;
        assert!(matches!(result, Err(CliError::Unauthorized)));
    }

    #[test]
    fn test_method_names() {
        use clap::ValueEnum;
        assert_eq!(UploadMethod::default(), UploadMethod::Batch);
        assert_eq!(UploadMethod::from_str("soft", true).unwrap(), UploadMethod::Sequential);
        assert_eq!(UploadMethod::from_str("hard", true).unwrap(), UploadMethod::Parallel);
        assert_eq!(UploadMethod::Parallel.to_string(), "parallel");
    }
}
