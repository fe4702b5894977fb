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

//! Session capabilities consumed by the stager, retriever and orchestrator.
//!
//! The traits keep the sync logic independent of the wire protocol; the SSH
//! implementation lives here as well, on top of [`tokio_client::Client`].

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::config::SyncConfig;
use crate::inventory::HostRecord;
use crate::ssh::known_hosts::get_check_method;
use crate::ssh::tokio_client::{self, Client, CommandExecutedResult, ServerCheckMethod};

use super::SyncError;

/// An open, authenticated remote session.
#[async_trait]
pub trait RemoteSession: Send + Sync {
    /// Run a command and collect its exit status and output.
    async fn execute(&self, command: &str) -> Result<CommandExecutedResult, tokio_client::Error>;

    /// Copy `remote_path` into `local_dir`, returning the local path written.
    async fn fetch(
        &self,
        remote_path: &str,
        local_dir: &Path,
        recursive: bool,
    ) -> Result<PathBuf, tokio_client::Error>;

    /// Release the connection.
    async fn close(&self) -> Result<(), tokio_client::Error>;
}

/// Opens one session per host.
#[async_trait]
pub trait SessionFactory: Send + Sync {
    /// Fails only with [`SyncError::ConnectionTimeout`],
    /// [`SyncError::Authentication`] or [`SyncError::Transport`].
    async fn open(&self, host: &HostRecord) -> Result<Box<dyn RemoteSession>, SyncError>;
}

#[async_trait]
impl RemoteSession for Client {
    async fn execute(&self, command: &str) -> Result<CommandExecutedResult, tokio_client::Error> {
        Client::execute(self, command).await
    }

    async fn fetch(
        &self,
        remote_path: &str,
        local_dir: &Path,
        recursive: bool,
    ) -> Result<PathBuf, tokio_client::Error> {
        Client::fetch(self, remote_path, local_dir, recursive).await
    }

    async fn close(&self) -> Result<(), tokio_client::Error> {
        self.disconnect().await
    }
}

/// Opens real SSH sessions.
#[derive(Debug, Clone)]
pub struct SshSessionFactory {
    connect_timeout: Duration,
    server_check: ServerCheckMethod,
}

impl SshSessionFactory {
    pub fn new(connect_timeout: Duration, server_check: ServerCheckMethod) -> Self {
        Self {
            connect_timeout,
            server_check,
        }
    }

    pub fn from_config(config: &SyncConfig) -> Self {
        let server_check = get_check_method(
            config.strict_host_key_checking,
            config.known_hosts_path().as_deref(),
        );
        Self::new(config.connect_timeout(), server_check)
    }
}

#[async_trait]
impl SessionFactory for SshSessionFactory {
    async fn open(&self, host: &HostRecord) -> Result<Box<dyn RemoteSession>, SyncError> {
        match tokio::time::timeout(
            self.connect_timeout,
            Client::connect(
                &host.hostname,
                host.port,
                &host.user,
                host.credential.to_auth_method(),
                self.server_check.clone(),
            ),
        )
        .await
        {
            Ok(Ok(client)) => {
                tracing::debug!("Connected to {} ({})", host, client.get_connection_address());
                Ok(Box::new(client))
            }
            Ok(Err(e)) => Err(SyncError::from_connect(e)),
            Err(_) => Err(SyncError::ConnectionTimeout {
                timeout: self.connect_timeout,
            }),
        }
    }
}
