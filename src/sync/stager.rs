// Copyright 2025 Lablup Inc. and Jeongkyu Shin
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Staging of protected files for non-administrative accounts.
//!
//! A regular account cannot read the node's config directory over SFTP, so
//! the files are copied with `sudo` into a directory the account owns and
//! handed over with `chown`. Every command is attempted even when an earlier
//! one fails; the retrieval that follows reports whatever is still missing.

use crate::utils::sanitize::{sanitize_username, shell_quote};

use super::paths::RemotePaths;
use super::session::RemoteSession;
use super::error::error_chain;
use super::SyncError;

/// What happened to one staging command.
#[derive(Debug)]
pub struct CommandOutcome {
    pub command: String,
    pub result: Result<(), SyncError>,
}

impl CommandOutcome {
    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }
}

/// Result of staging on one host.
#[derive(Debug)]
pub struct StagingReport {
    /// Where the staged copies live.
    pub staged: RemotePaths,
    pub outcomes: Vec<CommandOutcome>,
}

impl StagingReport {
    pub fn failures(&self) -> impl Iterator<Item = &CommandOutcome> {
        self.outcomes.iter().filter(|o| !o.is_success())
    }

    pub fn all_succeeded(&self) -> bool {
        self.outcomes.iter().all(CommandOutcome::is_success)
    }
}

/// The five commands, in the order they run.
pub fn staging_commands(
    source: &RemotePaths,
    staged: &RemotePaths,
    staging_dir: &str,
    user: &str,
) -> Vec<String> {
    let owner = format!("{user}:{user}");
    vec![
        format!("mkdir -p {}", shell_quote(staging_dir)),
        format!(
            "sudo cp {} {}",
            shell_quote(&source.keys_file),
            shell_quote(&staged.keys_file)
        ),
        format!(
            "sudo cp {} {}",
            shell_quote(&source.config_file),
            shell_quote(&staged.config_file)
        ),
        format!(
            "sudo chown {} {}",
            shell_quote(&owner),
            shell_quote(&staged.keys_file)
        ),
        format!(
            "sudo chown {} {}",
            shell_quote(&owner),
            shell_quote(&staged.config_file)
        ),
    ]
}

/// Copy `source` into `staging_dir` and give the copies to `user`.
///
/// Fails up front only when `user` cannot be passed to the shell; once commands
/// start, failures are recorded in the report and never stop the sequence.
pub async fn stage(
    session: &dyn RemoteSession,
    source: &RemotePaths,
    staging_dir: &str,
    user: &str,
) -> Result<StagingReport, SyncError> {
    let user = sanitize_username(user).map_err(|e| SyncError::UnsafeValue(e.to_string()))?;
    let staged = RemotePaths::in_dir(staging_dir);

    let mut outcomes = Vec::with_capacity(5);
    for command in staging_commands(source, &staged, staging_dir, &user) {
        let result = match session.execute(&command).await {
            Ok(output) if output.is_success() => Ok(()),
            Ok(output) => Err(SyncError::RemoteCommand {
                command: command.clone(),
                exit_status: output.exit_status,
                stderr: output.stderr.trim().to_string(),
            }),
            Err(source) => Err(SyncError::RemoteCommandFailed {
                command: command.clone(),
                source,
            }),
        };

        match &result {
            Ok(()) => tracing::debug!("Staging command succeeded: {}", command),
            Err(e) => tracing::warn!("Error executing staging command: {}", error_chain(e)),
        }
        outcomes.push(CommandOutcome { command, result });
    }

    Ok(StagingReport { staged, outcomes })
}
