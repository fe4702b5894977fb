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

//! Per-host failure taxonomy.

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

use crate::inventory::InventoryError;
use crate::ssh::tokio_client;

/// Everything that can go wrong while syncing the fleet.
///
/// Only [`SyncError::Inventory`] aborts a run; every other variant is scoped
/// to the host being processed.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error(transparent)]
    Inventory(#[from] InventoryError),

    #[error("connection timed out after {} seconds", .timeout.as_secs())]
    ConnectionTimeout { timeout: Duration },

    #[error("authentication failed")]
    Authentication(#[source] tokio_client::Error),

    #[error("transport error")]
    Transport(#[source] tokio_client::Error),

    #[error("remote command '{command}' failed with exit status {exit_status}: {stderr}")]
    RemoteCommand {
        command: String,
        exit_status: u32,
        stderr: String,
    },

    #[error("failed to run remote command '{command}'")]
    RemoteCommandFailed {
        command: String,
        #[source]
        source: tokio_client::Error,
    },

    #[error("failed to copy '{remote_path}'")]
    Copy {
        remote_path: String,
        #[source]
        source: tokio_client::Error,
    },

    #[error("failed to create local directory {path:?}")]
    LocalDirectory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("host record is missing required field '{field}'")]
    MissingField { field: &'static str },

    #[error("host record has invalid {field} '{value}'")]
    InvalidField { field: &'static str, value: String },

    #[error("invalid value for remote command: {0}")]
    UnsafeValue(String),
}

/// Render an error followed by each of its causes, joined with ": ".
pub fn error_chain(err: &dyn std::error::Error) -> String {
    let mut rendered = err.to_string();
    let mut cause = err.source();
    while let Some(inner) = cause {
        rendered.push_str(": ");
        rendered.push_str(&inner.to_string());
        cause = inner.source();
    }
    rendered
}

impl SyncError {
    /// Classify a failure from the connect-and-authenticate step.
    pub fn from_connect(err: tokio_client::Error) -> Self {
        if err.is_authentication_failure() {
            SyncError::Authentication(err)
        } else {
            SyncError::Transport(err)
        }
    }

    /// Whether this failure belongs to the session-establishment family
    /// (timeout, authentication, transport).
    pub fn is_session_failure(&self) -> bool {
        matches!(
            self,
            SyncError::ConnectionTimeout { .. }
                | SyncError::Authentication(_)
                | SyncError::Transport(_)
        )
    }
}
