//! Run context
//!
//! Everything a run needs, built once by the `main` command and passed down
//! explicitly: target environment, API client, workspace, user choices,
//! pacing, the prompt source, and the collections resolved so far.

use crate::api::ApiClient;
use crate::collection::CollectionCache;
use crate::config::{Environment, Pacing, RunOptions, Workspace};
use crate::prompt::Prompter;
use crate::retry::RetryPolicy;

pub struct RunContext {
    pub environment: Environment,
    pub client: ApiClient,
    pub workspace: Workspace,
    pub options: RunOptions,
    pub pacing: Pacing,
    pub retry: RetryPolicy,
    pub prompter: Box<dyn Prompter>,
    pub collections: CollectionCache,
}

impl RunContext {
    /// Context with default pacing and retry bounds
    pub fn new(
        environment: Environment,
        client: ApiClient,
        workspace: Workspace,
        options: RunOptions,
        prompter: Box<dyn Prompter>,
    ) -> Self {
        Self {
            environment,
            client,
            workspace,
            options,
            pacing: Pacing::default(),
            retry: RetryPolicy::default(),
            prompter,
            collections: CollectionCache::default(),
        }
    }

    pub fn with_pacing(mut self, pacing: Pacing) -> Self {
        self.pacing = pacing;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }
}
