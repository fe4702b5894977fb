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

//! Append-only diagnostics file for connection-level failures.

use std::error::Error as _;
use std::path::{Path, PathBuf};
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;

use super::SyncError;

#[derive(Debug, Clone)]
pub struct TransportLog {
    path: PathBuf,
}

impl TransportLog {
    /// `path` is used as given; callers expand `~` beforehand.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Format one entry: timestamp, host, then the error and its causes.
    pub fn format_entry(timestamp: &str, host: &str, error: &SyncError) -> String {
        let mut entry = format!("[{timestamp}] {host}: {error}\n");
        let mut cause = error.source();
        while let Some(err) = cause {
            entry.push_str(&format!("    caused by: {err}\n"));
            cause = err.source();
        }
        entry
    }

    /// Append an entry. Failing to write the log never fails the host.
    pub async fn record(&self, host: &str, error: &SyncError) {
        let timestamp = chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Secs, true);
        let entry = Self::format_entry(&timestamp, host, error);

        if let Err(e) = self.append(entry.as_bytes()).await {
            tracing::warn!("Failed to write transport log {:?}: {}", self.path, e);
        }
    }

    async fn append(&self, bytes: &[u8]) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        file.write_all(bytes).await?;
        file.flush().await
    }
}
