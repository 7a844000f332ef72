//! File upload
//!
//! Sends every file of a job through an [`Uploader`] and re-sends, in later
//! rounds, the files that came back without a checksum. Rounds are bounded by
//! a [`RetryPolicy`]; whatever is still missing afterwards is reported.

pub mod strategy;

pub use strategy::{
    uploader_for, BatchUploader, PooledUploader, SequentialUploader, UploadAttempt, UploadMethod,
    Uploader,
};

use crate::api::UploadedFile;
use crate::config::pause;
use crate::error::Result;
use crate::progress::create_upload_progress;
use crate::retry::RetryPolicy;
use std::path::PathBuf;
use std::time::Instant;
use tracing::{info, warn};

/// Result of uploading one job's files
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UploadOutcome {
    /// Accepted files: first-round successes, then retried ones
    pub uploaded: Vec<UploadedFile>,

    /// Files that never received a checksum
    pub failed: Vec<PathBuf>,

    /// Retry rounds run after the first one
    pub rounds: u32,
}

impl UploadOutcome {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Upload `files` in the order given, retrying missing checksums in rounds.
pub async fn upload_all(
    uploader: &dyn Uploader,
    files: &[PathBuf],
    policy: &RetryPolicy,
) -> Result<UploadOutcome> {
    let started = Instant::now();
    let progress = create_upload_progress(
        files.len() as u64,
        &format!("Uploading {} file(s) ({})", files.len(), uploader.name()),
    );

    let mut outcome = UploadOutcome::default();
    let mut pending: Vec<PathBuf> = files.to_vec();

    while !pending.is_empty() {
        let attempts = match uploader.upload_batch(&pending, &progress).await {
            Ok(attempts) => attempts,
            Err(e) => {
                progress.abandon();
                return Err(e);
            },
        };

        pending = Vec::new();
        for attempt in attempts {
            match attempt.record {
                Some(record) => outcome.uploaded.push(record),
                None => pending.push(attempt.path),
            }
        }

        if pending.is_empty() {
            break;
        }
        if outcome.rounds >= policy.max_rounds || started.elapsed() >= policy.max_elapsed {
            warn!(
                missing = pending.len(),
                rounds = outcome.rounds,
                "Giving up on files without checksum"
            );
            break;
        }

        outcome.rounds += 1;
        warn!(
            missing = pending.len(),
            round = outcome.rounds,
            "Some files got no checksum, sending them again"
        );
        pause(policy.round_delay).await;
    }

    progress.finish_and_clear();
    outcome.failed = pending;

    info!(
        uploaded = outcome.uploaded.len(),
        failed = outcome.failed.len(),
        rounds = outcome.rounds,
        "Upload finished"
    );
    Ok(outcome)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use indicatif::ProgressBar;
    use nakalator_common::naming::file_name;
    use std::collections::HashMap;
    use std::sync::Mutex;
    use std::time::Duration;

    /// Answers without a checksum for the first `misses` offers of a file
    struct FlakyUploader {
        misses: HashMap<String, u32>,
        offered: Mutex<Vec<Vec<String>>>,
    }

    impl FlakyUploader {
        fn new(misses: &[(&str, u32)]) -> Self {
            Self {
                misses: misses.iter().map(|(n, m)| (n.to_string(), *m)).collect(),
                offered: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl Uploader for FlakyUploader {
        fn name(&self) -> &'static str {
            "flaky"
        }

        async fn upload_batch(&self, files: &[PathBuf], _progress: &ProgressBar) -> Result<Vec<UploadAttempt>> {
            let mut offered = self.offered.lock().unwrap();
            let round = offered.len() as u32;
            offered.push(files.iter().map(|p| file_name(p)).collect());

            Ok(files
                .iter()
                .map(|path| {
                    let name = file_name(path);
                    let misses = self.misses.get(&name).copied().unwrap_or(0);
                    UploadAttempt {
                        path: path.clone(),
                        record: (round >= misses).then(|| UploadedFile {
                            name: name.clone(),
                            sha1: format!("sha-{}", name),
                        }),
                    }
                })
                .collect())
        }
    }

    fn policy(max_rounds: u32) -> RetryPolicy {
        RetryPolicy {
            max_rounds,
            max_elapsed: Duration::from_secs(60),
            round_delay: Duration::ZERO,
        }
    }

    fn paths(names: &[&str]) -> Vec<PathBuf> {
        names.iter().map(|n| PathBuf::from("/data/p").join(n)).collect()
    }

    #[tokio::test]
    async fn test_retried_files_appended_after_first_round() {
        let uploader = FlakyUploader::new(&[("a.tif", 1)]);
        let outcome = upload_all(&uploader, &paths(&["a.tif", "b.tif", "c.tif"]), &policy(10))
            .await
            .unwrap();

        let names: Vec<&str> = outcome.uploaded.iter().map(|u| u.name.as_str()).collect();
        assert_eq!(names, vec!["b.tif", "c.tif", "a.tif"]);
        assert_eq!(outcome.rounds, 1);
        assert!(outcome.is_complete());

        let offered = uploader.offered.lock().unwrap();
        assert_eq!(offered[1], vec!["a.tif".to_string()]);
    }

    #[tokio::test]
    async fn test_rounds_are_bounded() {
        let uploader = FlakyUploader::new(&[("a.tif", u32::MAX)]);
        let outcome = upload_all(&uploader, &paths(&["a.tif", "b.tif"]), &policy(3))
            .await
            .unwrap();

        assert_eq!(outcome.rounds, 3);
        assert_eq!(outcome.failed, paths(&["a.tif"]));
        assert_eq!(outcome.uploaded.len(), 1);
        assert_eq!(uploader.offered.lock().unwrap().len(), 4);
    }

    #[tokio::test]
    async fn test_no_files_no_calls() {
        let uploader = FlakyUploader::new(&[]);
        let outcome = upload_all(&uploader, &[], &policy(3)).await.unwrap();
        assert!(outcome.uploaded.is_empty());
        assert!(uploader.offered.lock().unwrap().is_empty());
    }
}
