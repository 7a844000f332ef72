//! Collection reconciliation
//!
//! Decides, for each job, which collection its data joins: an existing one
//! named in the job file, one created now, or one already resolved earlier in
//! the same run. The job file is rewritten after every resolution, so a
//! rerun never creates the collection twice.

use crate::config::pause;
use crate::context::RunContext;
use crate::error::{CliError, Result};
use crate::job::{CollectionStatus, JobConfig};
use crate::progress::create_spinner;
use std::collections::HashMap;
use std::path::Path;
use tracing::{debug, info};

/// How a job's collection was resolved
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// Id from the job file, title read from the repository or the cache
    AttachedExisting,
    /// Created on the repository by this job
    CreatedNew,
    /// Taken from an earlier job of the run, no remote call
    ReusedThisRun,
    /// Id from the job file linked as is, attachment turned off for the run
    Unverified,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedCollection {
    pub id: String,
    pub title: String,
    pub kind: Resolution,
}

impl ResolvedCollection {
    /// Collection named in a job file, not looked up on the repository
    pub fn unverified(id: String) -> Self {
        Self {
            id,
            title: String::new(),
            kind: Resolution::Unverified,
        }
    }
}

/// Collections resolved during one run
#[derive(Debug, Clone, Default)]
pub struct CollectionCache {
    /// title → id, for every collection resolved this run
    seen: HashMap<String, String>,

    /// id → title, for ids confirmed to exist
    verified: HashMap<String, String>,

    /// First job's collection, for same-collection batches
    first: Option<ResolvedCollection>,
}

impl CollectionCache {
    pub fn id_for_title(&self, title: &str) -> Option<&str> {
        self.seen.get(title).map(String::as_str)
    }

    pub fn title_for_id(&self, id: &str) -> Option<&str> {
        self.verified.get(id).map(String::as_str)
    }

    pub fn first(&self) -> Option<&ResolvedCollection> {
        self.first.as_ref()
    }

    fn remember(&mut self, id: &str, title: &str) {
        self.seen.insert(title.to_string(), id.to_string());
        self.verified.insert(id.to_string(), title.to_string());
    }
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

/// Resolve the collection of one job and persist the result in its file.
pub async fn reconcile(
    ctx: &mut RunContext,
    job: &mut JobConfig,
    job_path: &Path,
    is_first: bool,
) -> Result<ResolvedCollection> {
    if ctx.options.same_collection && !is_first {
        if let Some(first) = ctx.collections.first().cloned() {
            debug!(job = %job_path.display(), collection = %first.id, "Attaching to the batch collection");
            job.collection_id = Some(first.id.clone());
            job.save_collection_fields(job_path)?;
            return Ok(ResolvedCollection {
                kind: Resolution::ReusedThisRun,
                ..first
            });
        }
    }

    let resolved = match job.collection_id.clone() {
        None => resolve_new(ctx, job, job_path).await?,
        Some(id) => {
            let resolved = resolve_existing(ctx, &id).await?;
            job.save_collection_fields(job_path)?;
            resolved
        },
    };

    info!(
        job = %job_path.display(),
        collection = %resolved.id,
        title = %resolved.title,
        resolution = ?resolved.kind,
        "Collection resolved"
    );

    if ctx.collections.first.is_none() {
        ctx.collections.first = Some(resolved.clone());
    }
    Ok(resolved)
}

async fn resolve_new(
    ctx: &mut RunContext,
    job: &mut JobConfig,
    job_path: &Path,
) -> Result<ResolvedCollection> {
    let (title, description) = match (
        non_blank(&job.collection_title),
        non_blank(&job.collection_description),
    ) {
        (Some(title), Some(description)) => (title.to_string(), description.to_string()),
        _ => return Err(CliError::MissingCollectionFields(job_path.display().to_string())),
    };

    if let Some(id) = ctx.collections.id_for_title(&title).map(str::to_string) {
        let question = format!(
            "A collection titled '{}' was already resolved in this run ({}). Attach this data to it?",
            title, id
        );
        if ctx.prompter.confirm(&question, true)? {
            job.collection_id = Some(id.clone());
            job.save_collection_fields(job_path)?;
            return Ok(ResolvedCollection {
                id,
                title,
                kind: Resolution::ReusedThisRun,
            });
        }
        info!(title = %title, "Creating another collection with the same title");
    }

    let status = match job.collection_status {
        Some(status) => status,
        None => {
            info!(
                job = %job_path.display(),
                "No collectionStatus given, the collection will be private"
            );
            CollectionStatus::Private
        },
    };

    pause(ctx.pacing.before_collection_call).await;
    let spinner = create_spinner(&format!("Creating collection '{}'...", title));
    let created = ctx.client.create_collection(&title, &description, status).await;
    spinner.finish_and_clear();
    let (title, id) = created?;

    job.collection_status = Some(status);
    job.collection_id = Some(id.clone());
    job.save_collection_fields(job_path)?;
    ctx.collections.remember(&id, &title);

    Ok(ResolvedCollection {
        id,
        title,
        kind: Resolution::CreatedNew,
    })
}

async fn resolve_existing(ctx: &mut RunContext, id: &str) -> Result<ResolvedCollection> {
    if let Some(title) = ctx.collections.title_for_id(id) {
        debug!(collection = %id, "Collection already verified in this run");
        return Ok(ResolvedCollection {
            id: id.to_string(),
            title: title.to_string(),
            kind: Resolution::AttachedExisting,
        });
    }

    pause(ctx.pacing.before_collection_call).await;
    let title = ctx.client.get_collection(id).await?;
    ctx.collections.remember(id, &title);

    Ok(ResolvedCollection {
        id: id.to_string(),
        title,
        kind: Resolution::AttachedExisting,
    })
}
