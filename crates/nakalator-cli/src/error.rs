//! Error types for the Nakalator CLI
//!
//! Every variant carries a message meant for the person running the upload:
//! what went wrong and, where possible, what to change before rerunning.

use thiserror::Error;

/// Result type alias for CLI operations
pub type Result<T> = std::result::Result<T, CliError>;

/// Comprehensive error type for CLI operations
#[derive(Error, Debug)]
pub enum CliError {
    /// The repository rejected the API key (HTTP 401)
    #[error("Unauthorized. Check the API key for this environment in credentials.yml.")]
    Unauthorized,

    /// A create call did not answer 201
    #[error("Error when creating {resource}: {status} - {body}. Check and try again.")]
    CreateFailed {
        resource: &'static str,
        status: u16,
        body: String,
    },

    /// Collection lookup answered 404
    #[error("Collection with id '{0}' not found on Nakala. Fix 'collectionIds' in the metadata file.")]
    CollectionNotFound(String),

    /// Collection lookup answered another non-success status
    #[error("Cannot read collection '{id}': {status} - {body}")]
    LookupFailed { id: String, status: u16, body: String },

    /// Unexpected response shape from the repository
    #[error("Unexpected response from Nakala: {0}")]
    Api(String),

    /// Creating a collection needs a title and a description
    #[error("'collectionTitle' or 'collectionDescription' fields are empty in {0}. Fill them to create a new collection, or set 'collectionIds', then restart.")]
    MissingCollectionFields(String),

    /// Job file content failed validation
    #[error("Invalid metadata file '{path}': {reason}")]
    InvalidJob { path: String, reason: String },

    /// Files to send are not where the workspace expects them
    #[error("Invalid data directory '{0}'. Files to send must be in a directory under the workspace 'data' directory.")]
    DataDirectory(String),

    /// Some files never received a checksum
    #[error("{} file(s) never received a checksum from Nakala: {}. No data was created for this job; rerun it later.", .0.len(), .0.join(", "))]
    UploadIncomplete(Vec<String>),

    /// Required file is missing
    #[error("File not found: '{0}'. Verify the file path exists and you have read permissions.")]
    FileNotFound(String),

    /// Workspace already scaffolded
    #[error("Workspace already initialized: {0}. Use --force to rewrite the template files.")]
    AlreadyInitialized(String),

    /// Configuration is missing or invalid
    #[error("Configuration error: {0}")]
    Config(String),

    /// Interactive prompt failed or was interrupted
    #[error("Prompt failed: {0}")]
    Prompt(#[from] inquire::InquireError),

    /// File system operation failed
    #[error("File operation failed: {0}. Check file permissions and disk space.")]
    Io(#[from] std::io::Error),

    /// HTTP request failed
    #[error("Network request failed: {0}. Check your internet connection.")]
    Http(#[from] reqwest::Error),

    /// YAML parsing failed
    #[error("Failed to parse YAML: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    /// CSV report could not be written or read
    #[error("Report error: {0}")]
    Csv(#[from] csv::Error),

    /// Shared helper failure
    #[error(transparent)]
    Common(#[from] nakalator_common::CommonError),
}

impl CliError {
    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create an API error
    pub fn api(msg: impl Into<String>) -> Self {
        Self::Api(msg.into())
    }

    /// Create an invalid job error
    pub fn invalid_job(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidJob {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Whether the failure happened in transport (connection, timeout) and
    /// may succeed when retried.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Http(e) => e.is_connect() || e.is_timeout(),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upload_incomplete_lists_files() {
        let err = CliError::UploadIncomplete(vec!["a.tif".to_string(), "b.tif".to_string()]);
        let msg = err.to_string();
        assert!(msg.starts_with("2 file(s)"));
        assert!(msg.contains("a.tif, b.tif"));
    }

    #[test]
    fn test_non_http_errors_are_not_transient() {
        assert!(!CliError::Unauthorized.is_transient());
        assert!(!CliError::config("x").is_transient());
    }
}
