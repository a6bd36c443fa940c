//! Console-backed confirmation provider.

use std::io::{self, Write};

use async_trait::async_trait;
use colored::Colorize;
use strata_core::{ConfirmationProvider, Result, StrataError};

/// Prompts on stdout, reads answers from stdin.
///
/// Reads happen on a blocking thread so the runtime keeps ticking while the
/// operator types.
pub struct ConsolePrompt;

#[async_trait]
impl ConfirmationProvider for ConsolePrompt {
    async fn confirm(&self, prompt: &str) -> Result<bool> {
        let line = read_line(format!("{} {} [y/N]", "?".cyan().bold(), prompt)).await?;
        Ok(matches!(line.trim().to_ascii_lowercase().as_str(), "y" | "yes"))
    }

    async fn prompt_value(&self, prompt: &str) -> Result<String> {
        let line = read_line(format!("{} {}", "?".cyan().bold(), prompt)).await?;
        Ok(line.trim().to_string())
    }
}

async fn read_line(prompt: String) -> Result<String> {
    tokio::task::spawn_blocking(move || {
        print!("{} ", prompt);
        io::stdout().flush()?;
        let mut input = String::new();
        io::stdin().read_line(&mut input)?;
        Ok::<_, io::Error>(input)
    })
    .await
    .map_err(|e| StrataError::PromptFailed { reason: e.to_string() })?
    .map_err(|e| StrataError::PromptFailed { reason: e.to_string() })
}
