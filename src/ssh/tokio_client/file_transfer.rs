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

//! SFTP file retrieval.
//!
//! Remote paths are always placed *inside* the given local directory under
//! their own base name, the way `scp -r host:path dir/` behaves.
//! Some sshd_config does not enable sftp by default; a line like
//! `Subsystem sftp internal-sftp` is needed on the remote machine.

use russh_sftp::{client::SftpSession, protocol::OpenFlags};
use std::path::{Path, PathBuf};
use tokio::io::{AsyncReadExt, AsyncWriteExt};

use super::connection::Client;

/// Last component of a POSIX remote path, ignoring trailing slashes.
pub fn remote_base_name(remote_path: &str) -> Option<&str> {
    remote_path
        .trim_end_matches('/')
        .rsplit('/')
        .next()
        .filter(|name| !name.is_empty() && *name != "." && *name != "..")
}

impl Client {
    /// Open an SFTP session over a fresh channel.
    async fn open_sftp(&self) -> Result<SftpSession, super::Error> {
        let channel = self.get_channel().await?;
        channel.request_subsystem(true, "sftp").await?;
        Ok(SftpSession::new(channel.into_stream()).await?)
    }

    /// Fetch `remote_path` into `local_dir`.
    ///
    /// A remote file lands at `local_dir/<name>`. A remote directory is mirrored
    /// under `local_dir/<name>` when `recursive` is set and rejected otherwise.
    /// `local_dir` must already exist. Returns the local path written.
    pub async fn fetch<T: AsRef<Path>>(
        &self,
        remote_path: &str,
        local_dir: T,
        recursive: bool,
    ) -> Result<PathBuf, super::Error> {
        let name = remote_base_name(remote_path).ok_or_else(|| {
            super::Error::IoError(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                format!("Remote path has no file name: {remote_path}"),
            ))
        })?;
        let local_path = local_dir.as_ref().join(name);

        let sftp = self.open_sftp().await?;
        let metadata = sftp.metadata(remote_path).await?;

        if metadata.file_type().is_dir() {
            if !recursive {
                return Err(super::Error::IoError(std::io::Error::new(
                    std::io::ErrorKind::InvalidInput,
                    format!("{remote_path} is a directory and recursive fetch is disabled"),
                )));
            }
            tokio::fs::create_dir_all(&local_path).await?;
            download_dir_recursive(&sftp, remote_path.trim_end_matches('/'), &local_path)
                .await?;
        } else {
            download_single(&sftp, remote_path, &local_path).await?;
        }

        tracing::debug!("Fetched {} into {:?}", remote_path, local_path);
        if let Err(e) = sftp.close().await {
            tracing::debug!("Error while closing SFTP session: {}", e);
        }
        Ok(local_path)
    }
}

async fn download_single(
    sftp: &SftpSession,
    remote_path: &str,
    local_path: &Path,
) -> Result<(), super::Error> {
    let mut remote_file = sftp.open_with_flags(remote_path, OpenFlags::READ).await?;
    let mut contents = Vec::new();
    remote_file.read_to_end(&mut contents).await?;

    let mut local_file = tokio::fs::File::create(local_path).await?;
    local_file.write_all(&contents).await?;
    local_file.flush().await?;
    Ok(())
}

fn download_dir_recursive<'a>(
    sftp: &'a SftpSession,
    remote_dir: &'a str,
    local_dir: &'a Path,
) -> std::pin::Pin<Box<dyn std::future::Future<Output = Result<(), super::Error>> + Send + 'a>> {
    Box::pin(async move {
        for entry in sftp.read_dir(remote_dir).await? {
            let name = entry.file_name();
            if name == "." || name == ".." {
                continue;
            }

            let remote_path = format!("{remote_dir}/{name}");
            let local_path = local_dir.join(&name);
            let metadata = entry.metadata();

            if metadata.file_type().is_dir() {
                tokio::fs::create_dir_all(&local_path).await?;
                download_dir_recursive(sftp, &remote_path, &local_path).await?;
            } else if metadata.file_type().is_file() {
                download_single(sftp, &remote_path, &local_path).await?;
            }
            // symlinks and special files are skipped
        }
        Ok(())
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remote_base_name() {
        assert_eq!(remote_base_name("/root/.config/keys.yml"), Some("keys.yml"));
        assert_eq!(remote_base_name("/root/.config/"), Some(".config"));
        assert_eq!(remote_base_name("config.yml"), Some("config.yml"));
        assert_eq!(remote_base_name("/"), None);
        assert_eq!(remote_base_name(""), None);
        assert_eq!(remote_base_name("/tmp/.."), None);
    }
}
