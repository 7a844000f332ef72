//! Interactive questions
//!
//! Every question asked during a run goes through [`Prompter`], so that
//! `--yes` and tests can answer without a terminal.

use crate::error::{CliError, Result};
use inquire::{Confirm, Select};

/// Source of answers to yes/no and pick-one questions
pub trait Prompter: Send + Sync {
    /// Ask a yes/no question
    fn confirm(&self, message: &str, default: bool) -> Result<bool>;

    /// Pick one option; `default` is the index preselected
    fn select(&self, message: &str, options: Vec<String>, default: usize) -> Result<String>;
}

/// Terminal prompts
#[derive(Debug, Default, Clone, Copy)]
pub struct InquirePrompter;

impl Prompter for InquirePrompter {
    fn confirm(&self, message: &str, default: bool) -> Result<bool> {
        Ok(Confirm::new(message).with_default(default).prompt()?)
    }

    fn select(&self, message: &str, options: Vec<String>, default: usize) -> Result<String> {
        if options.is_empty() {
            return Err(CliError::config(format!("nothing to choose for '{}'", message)));
        }
        let default = default.min(options.len() - 1);
        Ok(Select::new(message, options)
            .with_starting_cursor(default)
            .with_page_size(15)
            .prompt()?)
    }
}

/// Answers every question without asking.
///
/// Confirmations get `answer`; selections get their default option.
#[derive(Debug, Clone, Copy)]
pub struct AutoPrompter {
    pub answer: bool,
}

impl AutoPrompter {
    pub fn yes() -> Self {
        Self { answer: true }
    }

    pub fn no() -> Self {
        Self { answer: false }
    }
}

impl Prompter for AutoPrompter {
    fn confirm(&self, message: &str, _default: bool) -> Result<bool> {
        tracing::debug!(question = message, answer = self.answer, "Answered automatically");
        Ok(self.answer)
    }

    fn select(&self, message: &str, options: Vec<String>, default: usize) -> Result<String> {
        let picked = options
            .get(default)
            .or_else(|| options.first())
            .cloned()
            .ok_or_else(|| CliError::config(format!("nothing to choose for '{}'", message)))?;
        tracing::debug!(question = message, answer = %picked, "Answered automatically");
        Ok(picked)
    }
}
