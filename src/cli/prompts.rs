//! Interactive prompts using dialoguer

use std::path::Path;

use anyhow::Result;
use dialoguer::Confirm;

/// Prompt user to confirm proceeding with an action
pub fn confirm_step(message: &str) -> Result<bool> {
    let confirmed = Confirm::new()
        .with_prompt(message)
        .default(true)
        .interact()?;
    Ok(confirmed)
}

/// Whether a directory exists and already holds at least one entry
pub fn is_non_empty_dir(path: &Path) -> bool {
    std::fs::read_dir(path)
        .map(|mut entries| entries.next().is_some())
        .unwrap_or(false)
}

/// Ask before writing into an output directory that already has content.
/// Returns `true` straight away when there is nothing to overwrite.
pub fn confirm_overwrite(output_dir: &Path) -> Result<bool> {
    if !is_non_empty_dir(output_dir) {
        return Ok(true);
    }
    let message = format!(
        "Output directory {} is not empty. Overwrite existing results?",
        output_dir.display()
    );
    confirm_step(&message)
}
