//! `nakalator main` command implementation
//!
//! Collects the run choices (from flags, or interactively), loads the job
//! files and hands them to the workflow.

use crate::api::ApiClient;
use crate::config::{Credentials, Environment, RunOptions, Workspace};
use crate::context::RunContext;
use crate::error::{CliError, Result};
use crate::prompt::{AutoPrompter, InquirePrompter, Prompter};
use crate::upload::UploadMethod;
use crate::verify::VerificationReport;
use crate::workflow::{self, JobSummary};
use clap::Args;
use colored::Colorize;
use nakalator_common::naming::{archival_cmp, file_name};
use std::path::Path;
use tracing::warn;

/// Options of the `main` command
#[derive(Args, Debug, Clone, Default)]
pub struct MainArgs {
    /// Nakala instance to send to
    #[arg(short, long, value_enum)]
    pub env: Option<Environment>,

    /// Job file, or with --batch a directory of job files, inside metadatas/
    #[arg(short, long)]
    pub metadata: Option<String>,

    /// Process every job file of a metadatas/ sub-directory
    #[arg(short, long)]
    pub batch: bool,

    /// Upload strategy
    #[arg(long, value_enum)]
    pub method: Option<UploadMethod>,

    /// Attach the data to collections (create or reuse them)
    #[arg(long, num_args = 0..=1, default_missing_value = "true")]
    pub attach_collections: Option<bool>,

    /// Put every job of the batch in the first job's collection
    #[arg(long)]
    pub same_collection: bool,

    /// Do not ask anything; missing choices take their default
    #[arg(short, long)]
    pub yes: bool,
}

/// Run the `main` command
pub async fn run(workspace_root: &Path, api_url: Option<String>, args: MainArgs) -> Result<()> {
    let workspace = Workspace::new(workspace_root);
    if !workspace.metadatas_dir().is_dir() {
        return Err(CliError::config(format!(
            "'{}' is not a Nakalator workspace (no metadatas/ directory). Run 'nakalator init' first or pass --workspace.",
            workspace_root.display()
        )));
    }

    let prompter: Box<dyn Prompter> = if args.yes {
        Box::new(AutoPrompter::yes())
    } else {
        Box::new(InquirePrompter)
    };

    let environment = match args.env {
        Some(env) => env,
        None if args.yes => Environment::Test,
        None => ask_environment(prompter.as_ref())?,
    };

    let batch = args.batch
        || (!args.yes && prompter.confirm("Send a batch of job files (a metadatas/ sub-directory)?", false)?);

    let selection = match args.metadata.clone() {
        Some(selection) => selection,
        None if args.yes => {
            return Err(CliError::config("--metadata is required with --yes"));
        },
        None => ask_selection(prompter.as_ref(), &workspace, batch)?,
    };

    let attach_collections = match args.attach_collections {
        Some(attach) => attach,
        None if args.yes => true,
        None => prompter.confirm("Attach the data to collections?", true)?,
    };

    let same_collection = args.same_collection
        || (batch
            && attach_collections
            && !args.yes
            && prompter.confirm("Put every job of the batch in the first job's collection?", false)?);

    let options = RunOptions {
        batch,
        attach_collections,
        same_collection,
        method: args.method.unwrap_or_default(),
    };

    let mut jobs = workflow::load_jobs(&workspace, &selection, options.batch)?;
    let base_url = api_url.unwrap_or_else(|| environment.api_url().to_string());

    println!();
    println!("  Environment:  {} ({})", environment.to_string().cyan(), base_url);
    println!("  Jobs:         {}", jobs.len());
    println!("  Method:       {}", options.method);
    println!("  Collections:  {}", collection_mode(&options));
    println!();

    if !prompter.confirm(&format!("Send {} job(s) to Nakala {}?", jobs.len(), environment), true)? {
        println!("Cancelled.");
        return Ok(());
    }

    let credentials = Credentials::load(workspace.credentials_path());
    let api_key = credentials.key_for(environment);
    if api_key.trim().is_empty() {
        warn!(environment = %environment, "No API key configured for this environment");
    }

    let client = ApiClient::new(base_url, api_key)?;
    let mut ctx = RunContext::new(environment, client, workspace, options, prompter);

    let summaries = workflow::run(&mut ctx, &mut jobs).await?;
    print_summaries(&summaries);

    Ok(())
}

fn ask_environment(prompter: &dyn Prompter) -> Result<Environment> {
    let options = Environment::ALL.iter().map(|e| e.to_string()).collect();
    prompter.select("Nakala environment:", options, 0)?.parse()
}

/// Offer the job files (single mode) or job directories (batch mode) found
/// in metadatas/.
fn ask_selection(prompter: &dyn Prompter, workspace: &Workspace, batch: bool) -> Result<String> {
    let mut candidates = Vec::new();
    for entry in std::fs::read_dir(workspace.metadatas_dir())? {
        let path = entry?.path();
        let name = file_name(&path);
        let wanted = if batch {
            path.is_dir()
        } else {
            path.is_file() && name.ends_with(".yml")
        };
        if wanted {
            candidates.push(name);
        }
    }
    candidates.sort_by(|a, b| archival_cmp(a, b));

    if candidates.is_empty() {
        return Err(CliError::config(format!(
            "No {} in {}",
            if batch { "job directory" } else { "job file" },
            workspace.metadatas_dir().display()
        )));
    }

    let message = if batch { "Job directory:" } else { "Job file:" };
    prompter.select(message, candidates, 0)
}

fn collection_mode(options: &RunOptions) -> &'static str {
    match (options.attach_collections, options.same_collection) {
        (false, _) => "none",
        (true, true) => "one for the whole batch",
        (true, false) => "per job",
    }
}

fn print_summaries(summaries: &[JobSummary]) {
    println!();
    for summary in summaries {
        let status = match &summary.verification {
            VerificationReport::Unavailable => "not verified yet".yellow(),
            report if report.has_failures() => "verification failed".red(),
            _ => "verified".green(),
        };
        println!(
            "{} {} ({} file(s), {}) {}",
            "✓".green(),
            summary.data_id.bold(),
            summary.uploaded,
            status,
            summary.page_url
        );
        if let Some(report) = &summary.report {
            println!("    report: {}", report.display());
        }
    }
}
