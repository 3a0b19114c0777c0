//! Operator Confirmation
//!
//! Yes/no questions asked during a run (currently only before registering
//! a domain). Prompts are shown even in silent mode.

use dialoguer::Confirm;

use crate::error::{DeployError, DeployResult};

/// Asks the operator to confirm an action
pub trait Prompt: Send + Sync {
    fn confirm(&self, question: &str) -> DeployResult<bool>;
}

/// Interactive terminal prompt, defaulting to "no"
#[derive(Debug, Default)]
pub struct TerminalPrompt;

impl Prompt for TerminalPrompt {
    fn confirm(&self, question: &str) -> DeployResult<bool> {
        // Blocks the calling thread; the deploy runs on a current-thread
        // runtime with nothing else scheduled while it waits for an answer
        Confirm::new()
            .with_prompt(question)
            .default(false)
            .interact()
            .map_err(|e| DeployError::Prompt(e.to_string()))
    }
}

/// Always gives the same answer (non-interactive runs and tests)
#[derive(Debug, Clone, Copy)]
pub struct FixedAnswer(pub bool);

impl Prompt for FixedAnswer {
    fn confirm(&self, _question: &str) -> DeployResult<bool> {
        Ok(self.0)
    }
}
