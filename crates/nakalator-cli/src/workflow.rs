//! Run workflow
//!
//! Drives the jobs of a run in order: collections first, then for each job
//! the upload, the data creation, the mapping report and the read-back
//! checks. Any fatal error stops the run and is returned to the caller.

use crate::api::payload::data_metas;
use crate::api::CreateDataRequest;
use crate::collection::{reconcile, ResolvedCollection};
use crate::config::{pause, Workspace, DATA_DIR};
use crate::context::RunContext;
use crate::error::{CliError, Result};
use crate::job::JobConfig;
use crate::progress::format_elapsed;
use crate::report::{build_rows, merge_reports, report_file_name, write_report};
use crate::upload::{upload_all, uploader_for};
use crate::verify::{verify, VerificationReport};
use chrono::Local;
use nakalator_common::naming::{file_name, list_sorted_files, sort_archival};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{error, info};

/// A job file and its parsed content
#[derive(Debug, Clone)]
pub struct LoadedJob {
    pub path: PathBuf,
    pub config: JobConfig,
}

/// What one job produced
#[derive(Debug, Clone)]
pub struct JobSummary {
    pub job: PathBuf,
    pub data_id: String,
    /// Page of the data on the Nakala web front end
    pub page_url: String,
    pub collection: Option<ResolvedCollection>,
    pub uploaded: usize,
    pub report: Option<PathBuf>,
    pub verification: VerificationReport,
}

/// Load the jobs of a run.
///
/// `selection` is relative to the workspace `metadatas` directory: a job
/// file in single mode, a directory of `*.yml` job files in batch mode.
/// Batch jobs run in reverse archival order of their file names.
pub fn load_jobs(workspace: &Workspace, selection: &str, batch: bool) -> Result<Vec<LoadedJob>> {
    let target = workspace.metadatas_dir().join(selection);

    if !batch {
        let config = JobConfig::load(&target)?;
        return Ok(vec![LoadedJob { path: target, config }]);
    }

    let mut paths: Vec<PathBuf> = list_sorted_files(&target)?
        .into_iter()
        .filter(|p| p.extension().is_some_and(|ext| ext == "yml"))
        .collect();
    if paths.is_empty() {
        return Err(CliError::config(format!(
            "No '.yml' job file in {}",
            target.display()
        )));
    }
    sort_archival(&mut paths);
    paths.reverse();

    paths
        .into_iter()
        .map(|path| {
            let config = JobConfig::load(&path)?;
            Ok(LoadedJob { path, config })
        })
        .collect()
}

/// Directory holding a job's files; it must exist and sit under a `data`
/// directory.
pub fn data_directory(workspace: &Workspace, job: &JobConfig) -> Result<PathBuf> {
    let dir = workspace.resolve(&job.data.path);
    let under_data = dir.components().any(|c| c.as_os_str() == DATA_DIR);

    if !under_data || !dir.is_dir() {
        return Err(CliError::DataDirectory(job.data.path.clone()));
    }
    Ok(dir)
}

/// Run every job in order.
pub async fn run(ctx: &mut RunContext, jobs: &mut [LoadedJob]) -> Result<Vec<JobSummary>> {
    let started = Instant::now();
    info!(
        environment = %ctx.environment,
        api = %ctx.client.base_url(),
        jobs = jobs.len(),
        "Starting run"
    );

    let data_dirs = jobs
        .iter()
        .map(|job| data_directory(&ctx.workspace, &job.config))
        .collect::<Result<Vec<_>>>()?;

    let mut collections: Vec<Option<ResolvedCollection>> = Vec::with_capacity(jobs.len());
    for (i, job) in jobs.iter_mut().enumerate() {
        let collection = if ctx.options.attach_collections {
            Some(reconcile(ctx, &mut job.config, &job.path, i == 0).await?)
        } else {
            // No lookup and no creation; an id already in the job file is still linked
            job.config.collection_id.clone().map(ResolvedCollection::unverified)
        };
        collections.push(collection);
    }

    let total = jobs.len();
    let mut summaries = Vec::with_capacity(total);
    let mut reports = Vec::new();
    let mut last_output_dir = ctx.workspace.output_dir();

    for (i, ((job, dir), collection)) in jobs.iter().zip(&data_dirs).zip(collections).enumerate() {
        info!(
            "{}/{} Processing job {} > Nakala data",
            i + 1,
            total,
            file_name(&job.path)
        );

        let output_dir = ctx.workspace.output_dir().join(job.config.project_name());
        let summary = run_job(ctx, i + 1, job, dir, collection, &output_dir).await?;
        if let Some(report) = &summary.report {
            reports.push(report.clone());
        }
        last_output_dir = output_dir;
        summaries.push(summary);

        if i + 1 < total {
            pause(ctx.pacing.between_jobs).await;
        }
    }

    if ctx.options.same_collection && reports.len() > 1 {
        if let Some(collection) = summaries.first().and_then(|s| s.collection.as_ref()) {
            if let Err(e) = merge_reports(&last_output_dir, &reports, &collection.id) {
                error!(error = %e, "Cannot merge the reports");
            }
        }
    }

    info!(elapsed = %format_elapsed(started.elapsed()), jobs = total, "All jobs done");
    Ok(summaries)
}

async fn run_job(
    ctx: &RunContext,
    position: usize,
    job: &LoadedJob,
    dir: &Path,
    collection: Option<ResolvedCollection>,
    output_dir: &Path,
) -> Result<JobSummary> {
    let files = list_sorted_files(dir)?;
    if files.is_empty() {
        return Err(CliError::DataDirectory(job.config.data.path.clone()));
    }

    let upload_started = Instant::now();
    let uploader = uploader_for(ctx.options.method, ctx.client.clone());
    let outcome = upload_all(uploader.as_ref(), &files, &ctx.retry).await?;
    info!(
        elapsed = %format_elapsed(upload_started.elapsed()),
        files = files.len(),
        "Files processed on Nakala"
    );

    if !outcome.is_complete() {
        return Err(CliError::UploadIncomplete(
            outcome.failed.iter().map(|p| file_name(p)).collect(),
        ));
    }

    let collection_id = collection.as_ref().map(|c| c.id.as_str());
    let request = CreateDataRequest {
        status: job.config.data.status,
        files: outcome.uploaded.clone(),
        metas: data_metas(&job.config.metadata, Local::now().date_naive()),
        collections_ids: collection_id.map(str::to_string).into_iter().collect(),
    };
    let data_id = ctx.client.create_data(&request).await?;

    let rows = build_rows(&outcome.uploaded, collection_id, &data_id);
    let name = report_file_name(position, collection_id, &data_id, Local::now());
    let report = match write_report(output_dir, &name, &rows) {
        Ok(path) => Some(path),
        Err(e) => {
            error!(error = %e, "Error when saving report");
            None
        },
    };

    let remote = ctx.client.get_data_files(&data_id).await?;
    let offered: Vec<String> = files.iter().map(|p| file_name(p)).collect();
    let verification = verify(&remote, &offered, outcome.uploaded.len(), report.as_deref());
    verification.log();

    info!(
        data = %data_id,
        report = %report.as_deref().map(|p| p.display().to_string()).unwrap_or_default(),
        "Data created on Nakala"
    );

    Ok(JobSummary {
        job: job.path.clone(),
        page_url: ctx.environment.page_url(&data_id),
        data_id,
        collection,
        uploaded: outcome.uploaded.len(),
        report,
        verification,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn workspace_with_jobs(names: &[&str]) -> (TempDir, Workspace) {
        let dir = TempDir::new().unwrap();
        let ws = Workspace::new(dir.path());
        let batch = ws.metadatas_dir().join("batch");
        std::fs::create_dir_all(&batch).unwrap();
        for name in names {
            std::fs::write(batch.join(name), "data:\n  path: data/p\n").unwrap();
        }
        (dir, ws)
    }

    #[test]
    fn test_batch_jobs_in_reverse_archival_order() {
        let (_dir, ws) = workspace_with_jobs(&["b.yml", "a.yml", "prev.yml", "notes.txt"]);
        let jobs = load_jobs(&ws, "batch", true).unwrap();
        let names: Vec<String> = jobs.iter().map(|j| file_name(&j.path)).collect();
        assert_eq!(names, vec!["b.yml", "a.yml", "prev.yml"]);
    }

    #[test]
    fn test_single_job() {
        let (_dir, ws) = workspace_with_jobs(&["a.yml"]);
        let jobs = load_jobs(&ws, "batch/a.yml", false).unwrap();
        assert_eq!(jobs.len(), 1);
        assert!(load_jobs(&ws, "batch/missing.yml", false).is_err());
    }

    #[test]
    fn test_empty_batch_is_an_error() {
        let (_dir, ws) = workspace_with_jobs(&[]);
        assert!(matches!(load_jobs(&ws, "batch", true), Err(CliError::Config(_))));
    }

    #[test]
    fn test_data_directory_rules() {
        let dir = TempDir::new().unwrap();
        let ws = Workspace::new(dir.path());
        std::fs::create_dir_all(dir.path().join("data/p")).unwrap();
        std::fs::create_dir_all(dir.path().join("elsewhere/p")).unwrap();

        let job = |path: &str| -> JobConfig {
            serde_yaml::from_str(&format!("data:\n  path: {}\n", path)).unwrap()
        };

        assert_eq!(data_directory(&ws, &job("data/p")).unwrap(), dir.path().join("data/p"));
        assert!(matches!(
            data_directory(&ws, &job("elsewhere/p")),
            Err(CliError::DataDirectory(_))
        ));
        assert!(matches!(
            data_directory(&ws, &job("data/missing")),
            Err(CliError::DataDirectory(_))
        ));
    }
}
