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

//! Drives the per-host backup sequence across the fleet.
//!
//! Hosts are processed strictly one after another. Each host goes through
//! connect, optional staging, retrieval and close; any failure is recorded
//! on that host's [`HostOutcome`] and the run moves on to the next host.
//! Only failures to open a session are appended to the transport log.

use owo_colors::OwoColorize;
use std::path::{Path, PathBuf};

use crate::config::SyncConfig;
use crate::inventory::{HostRecord, RawHostRecord};

use super::paths::{local_destination, node_number, staging_dir, RemotePaths};
use super::report::{HostOutcome, HostPhase, SyncReport};
use super::retriever::retrieve;
use super::session::{RemoteSession, SessionFactory};
use super::stager::stage;
use super::transport_log::TransportLog;
use super::{error_chain, SyncError};

/// Backs up node files from every host in an inventory.
pub struct FleetSync<F> {
    config: SyncConfig,
    factory: F,
    transport_log: TransportLog,
    progress: bool,
}

impl<F: SessionFactory> FleetSync<F> {
    pub fn new(config: SyncConfig, factory: F) -> Self {
        let transport_log = TransportLog::new(config.transport_log_path());
        Self {
            config,
            factory,
            transport_log,
            progress: true,
        }
    }

    /// Toggle the per-host console lines (the summary is printed by the caller).
    pub fn with_progress(mut self, progress: bool) -> Self {
        self.progress = progress;
        self
    }

    /// Process `hosts` in order, skipping the first `start_index` entries.
    pub async fn run(&self, hosts: &[RawHostRecord], start_index: usize) -> SyncReport {
        let mut report = SyncReport::default();

        if start_index > 0 {
            tracing::info!(
                "Skipping the first {} of {} host(s)",
                start_index.min(hosts.len()),
                hosts.len()
            );
        }

        for (position, raw) in hosts.iter().skip(start_index).enumerate() {
            let outcome = self
                .sync_host(raw, node_number(position, start_index))
                .await;
            if self.progress {
                outcome.print_summary();
            }
            report.hosts.push(outcome);
        }

        report
    }

    async fn sync_host(&self, raw: &RawHostRecord, node_number: usize) -> HostOutcome {
        let local_dir = local_destination(&self.config.local_dir_template, node_number);
        let mut outcome = HostOutcome::new(node_number, raw.display_name(), local_dir);

        let host = match raw.resolve() {
            Ok(host) => host,
            Err(e) => {
                tracing::error!(
                    "Skipping host #{} ({}): {}",
                    node_number,
                    raw.display_name(),
                    e
                );
                outcome.error = Some(e);
                return outcome;
            }
        };

        outcome.phase = HostPhase::Connecting;
        if self.progress {
            println!("{} {} {}", "▶".cyan(), "Connecting to".cyan(), host.hostname);
        }

        let session = match self.factory.open(&host).await {
            Ok(session) => session,
            Err(e) => {
                tracing::warn!("Failed to connect the server {}: {}", host, error_chain(&e));
                self.transport_log.record(&host.to_string(), &e).await;
                outcome.error = Some(e);
                return outcome;
            }
        };

        let local_dir = outcome.local_dir.clone();
        let result = self
            .transfer(session.as_ref(), &host, &local_dir, &mut outcome)
            .await;

        if let Err(e) = session.close().await {
            tracing::debug!("Error while closing session to {}: {}", host, error_chain(&e));
        }

        match result {
            Ok(files) => {
                tracing::info!("Files copied to {:?} from {}", outcome.local_dir, host);
                outcome.files = files;
                outcome.phase = HostPhase::Done;
            }
            Err(e) => {
                tracing::error!("Failed to transfer from {}: {}", host, error_chain(&e));
                outcome.error = Some(e);
            }
        }

        outcome
    }

    async fn transfer(
        &self,
        session: &dyn RemoteSession,
        host: &HostRecord,
        local_dir: &Path,
        outcome: &mut HostOutcome,
    ) -> Result<Vec<PathBuf>, SyncError> {
        let source = RemotePaths::in_dir(&self.config.remote_config_dir);

        let remote = if host.user == self.config.admin_user {
            outcome.phase = HostPhase::AdminPath;
            source
        } else {
            outcome.phase = HostPhase::Staging;
            let staging_dir = staging_dir(&self.config.staging_dir_template, &host.user);
            tracing::debug!("Staging files for {} in {}", host, staging_dir);

            let report = stage(session, &source, &staging_dir, &host.user).await?;
            let staged = report.staged.clone();
            outcome.staging = Some(report);
            outcome.phase = HostPhase::Staged;
            staged
        };

        outcome.phase = HostPhase::Retrieving;
        retrieve(session, &remote, local_dir).await
    }
}
