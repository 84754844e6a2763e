//! Resource monitor snapshot via an external command.

use anyhow::Context;
use std::process::Stdio;
use tokio::process::Command;

use crate::error::{ApiError, Result};

/// Run `command_line` (whitespace separated, no shell) and return its stdout.
///
/// A non-zero exit maps to `CommandFailed` carrying stderr, or the exit
/// status when stderr is empty.
pub async fn snapshot(command_line: &str) -> Result<String> {
    let mut parts = command_line.split_whitespace();
    let program = parts
        .next()
        .ok_or_else(|| ApiError::CommandSpawn("empty command".to_string()))?;

    tracing::debug!("Running resource monitor: {}", command_line);

    let child = Command::new(program)
        .args(parts)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|e| ApiError::CommandSpawn(format!("{}: {}", program, e)))?;

    let output = child
        .wait_with_output()
        .await
        .context("Failed to collect resource monitor output")?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        let message = if stderr.is_empty() {
            format!("{} produced no error output", program)
        } else {
            stderr
        };
        return Err(ApiError::CommandFailed {
            status: output.status.to_string(),
            message,
        });
    }

    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}
