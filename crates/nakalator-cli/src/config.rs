//! Run configuration for the Nakalator CLI
//!
//! Environments, credentials, workspace layout and pacing. Everything here is
//! built once at startup and carried by the run context; nothing is global.

use crate::error::Result;
use crate::upload::UploadMethod;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, warn};

// ============================================================================
// Workspace Constants
// ============================================================================

/// Directory created by `nakalator init`.
pub const WORKSPACE_DIR_NAME: &str = "nakalator_workspace";

/// Directory holding the files to send.
pub const DATA_DIR: &str = "data";

/// Directory holding the job (metadata) files.
pub const METADATAS_DIR: &str = "metadatas";

/// Directory receiving the mapping reports.
pub const OUTPUT_DIR: &str = "output";

/// Credentials file name.
pub const CREDENTIALS_FILE: &str = "credentials.yml";

/// Nakala instance targeted by a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Test,
    Production,
}

impl Environment {
    /// All environments, in prompt order
    pub const ALL: [Environment; 2] = [Environment::Test, Environment::Production];

    /// Base URL of the JSON API
    pub fn api_url(self) -> &'static str {
        match self {
            Environment::Test => "https://apitest.nakala.fr",
            Environment::Production => "https://api.nakala.fr",
        }
    }

    /// Base URL of the web front end
    pub fn web_url(self) -> &'static str {
        match self {
            Environment::Test => "https://test.nakala.fr",
            Environment::Production => "https://nakala.fr",
        }
    }

    /// Web page of a data resource or collection
    pub fn page_url(self, id: &str) -> String {
        format!("{}/{}", self.web_url(), id)
    }
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Test => write!(f, "test"),
            Environment::Production => write!(f, "production"),
        }
    }
}

impl std::str::FromStr for Environment {
    type Err = crate::error::CliError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "test" => Ok(Environment::Test),
            "production" | "prod" => Ok(Environment::Production),
            other => Err(crate::error::CliError::config(format!(
                "Unknown environment '{}', expected 'test' or 'production'",
                other
            ))),
        }
    }
}

/// API keys read from `credentials.yml`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Credentials {
    #[serde(rename = "API_NAKALA_KEY_TEST", default)]
    pub test_key: String,

    #[serde(rename = "API_NAKALA_KEY_PROD", default)]
    pub production_key: String,
}

impl Credentials {
    /// Load credentials, degrading to empty keys when the file is missing
    /// or unreadable. Calls made with an empty key fail with 401 later on.
    pub fn load(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Credentials file not readable, using empty API keys");
                return Self::default();
            },
        };

        match serde_yaml::from_str::<Credentials>(&content) {
            Ok(credentials) => {
                debug!(path = %path.display(), "Loaded credentials");
                credentials
            },
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Credentials file not parseable, using empty API keys");
                Self::default()
            },
        }
    }

    /// API key for an environment
    pub fn key_for(&self, environment: Environment) -> &str {
        match environment {
            Environment::Test => &self.test_key,
            Environment::Production => &self.production_key,
        }
    }
}

/// Layout of a Nakalator workspace directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Workspace {
    root: PathBuf,
}

impl Workspace {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn data_dir(&self) -> PathBuf {
        self.root.join(DATA_DIR)
    }

    pub fn metadatas_dir(&self) -> PathBuf {
        self.root.join(METADATAS_DIR)
    }

    pub fn output_dir(&self) -> PathBuf {
        self.root.join(OUTPUT_DIR)
    }

    pub fn credentials_path(&self) -> PathBuf {
        self.root.join(CREDENTIALS_FILE)
    }

    /// Resolve a path from a job file against the workspace root.
    pub fn resolve(&self, path: impl AsRef<Path>) -> PathBuf {
        let path = path.as_ref();
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root.join(path)
        }
    }
}

/// Fixed pauses between remote operations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pacing {
    /// Pause between two jobs
    pub between_jobs: Duration,

    /// Pause before creating or looking up a collection
    pub before_collection_call: Duration,
}

impl Default for Pacing {
    fn default() -> Self {
        Self {
            between_jobs: Duration::from_secs(2),
            before_collection_call: Duration::from_secs(1),
        }
    }
}

impl Pacing {
    /// No pauses at all
    pub fn none() -> Self {
        Self {
            between_jobs: Duration::ZERO,
            before_collection_call: Duration::ZERO,
        }
    }
}

/// Sleep for a pacing delay, skipping the timer for zero durations.
pub async fn pause(delay: Duration) {
    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }
}

/// Choices made for one run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunOptions {
    /// Process every job file of a metadata directory
    pub batch: bool,

    /// Reconcile collections before creating data
    pub attach_collections: bool,

    /// Attach every job of the batch to the first job's collection
    pub same_collection: bool,

    /// Upload strategy
    pub method: UploadMethod,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            batch: false,
            attach_collections: true,
            same_collection: false,
            method: UploadMethod::Batch,
        }
    }
}
