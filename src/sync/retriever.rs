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

use std::path::{Path, PathBuf};

use super::paths::RemotePaths;
use super::session::RemoteSession;
use super::SyncError;

/// Create `local_dir` and any missing parents; existing directories are fine.
pub async fn ensure_local_dir(local_dir: &Path) -> Result<(), SyncError> {
    tokio::fs::create_dir_all(local_dir)
        .await
        .map_err(|source| SyncError::LocalDirectory {
            path: local_dir.to_path_buf(),
            source,
        })
}

/// Pull the keys file, then the config file, into `local_dir`.
pub async fn retrieve(
    session: &dyn RemoteSession,
    remote: &RemotePaths,
    local_dir: &Path,
) -> Result<Vec<PathBuf>, SyncError> {
    ensure_local_dir(local_dir).await?;

    let mut written = Vec::with_capacity(2);
    for remote_path in [&remote.keys_file, &remote.config_file] {
        let local_path = session
            .fetch(remote_path, local_dir, true)
            .await
            .map_err(|source| SyncError::Copy {
                remote_path: remote_path.clone(),
                source,
            })?;
        tracing::debug!("Copied {} to {:?}", remote_path, local_path);
        written.push(local_path);
    }
    Ok(written)
}
