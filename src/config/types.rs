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

//! Configuration type definitions.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use super::utils::expand_tilde;
use crate::ssh::StrictHostKeyChecking;
use crate::sync::paths::{NODE_PLACEHOLDER, USER_PLACEHOLDER};

/// Default remote directory holding `keys.yml` and `config.yml`.
pub const DEFAULT_REMOTE_CONFIG_DIR: &str = "/root/ceremonyclient/node/.config/";

/// Default staging directory for non-administrative accounts.
pub const DEFAULT_STAGING_DIR_TEMPLATE: &str = "/home/{user}/temp_ceremonyclient_config/";

/// Default local backup directory, one per node number.
pub const DEFAULT_LOCAL_DIR_TEMPLATE: &str = "backups/Q{n}_backup";

// 30 seconds accommodates slow networks and SSH negotiation.
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 30;

/// Settings for a fleet sync run.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct SyncConfig {
    /// JSON inventory of hosts.
    pub hosts_file: PathBuf,

    /// Remote directory containing the files to back up.
    pub remote_config_dir: String,

    /// Remote staging directory; `{user}` is replaced by the login name.
    pub staging_dir_template: String,

    /// Local destination; `{n}` is replaced by the 1-based node number.
    pub local_dir_template: String,

    /// Account that can read `remote_config_dir` directly.
    pub admin_user: String,

    /// Seconds allowed for connection and authentication.
    pub connect_timeout: u64,

    pub strict_host_key_checking: StrictHostKeyChecking,

    /// Overrides `~/.ssh/known_hosts`.
    pub known_hosts_file: Option<PathBuf>,

    /// Diagnostics for connection-level failures are appended here.
    pub transport_log: PathBuf,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            hosts_file: PathBuf::from("hosts.json"),
            remote_config_dir: DEFAULT_REMOTE_CONFIG_DIR.to_string(),
            staging_dir_template: DEFAULT_STAGING_DIR_TEMPLATE.to_string(),
            local_dir_template: DEFAULT_LOCAL_DIR_TEMPLATE.to_string(),
            admin_user: "root".to_string(),
            connect_timeout: DEFAULT_CONNECT_TIMEOUT_SECS,
            strict_host_key_checking: StrictHostKeyChecking::default(),
            known_hosts_file: None,
            transport_log: PathBuf::from("fleetsync-transport.log"),
        }
    }
}

impl SyncConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout)
    }

    pub fn hosts_path(&self) -> PathBuf {
        expand_tilde(&self.hosts_file)
    }

    pub fn transport_log_path(&self) -> PathBuf {
        expand_tilde(&self.transport_log)
    }

    pub fn known_hosts_path(&self) -> Option<PathBuf> {
        self.known_hosts_file.as_deref().map(expand_tilde)
    }

    /// Reject settings that would make every host fail the same way.
    pub fn validate(&self) -> anyhow::Result<()> {
        if !self.local_dir_template.contains(NODE_PLACEHOLDER) {
            anyhow::bail!(
                "local_dir_template '{}' must contain {NODE_PLACEHOLDER} so each node gets its own directory",
                self.local_dir_template
            );
        }
        if !self.staging_dir_template.contains(USER_PLACEHOLDER) {
            anyhow::bail!(
                "staging_dir_template '{}' must contain {USER_PLACEHOLDER}",
                self.staging_dir_template
            );
        }
        if self.remote_config_dir.trim().is_empty() {
            anyhow::bail!("remote_config_dir must not be empty");
        }
        if self.admin_user.trim().is_empty() {
            anyhow::bail!("admin_user must not be empty");
        }
        if self.connect_timeout == 0 {
            anyhow::bail!("connect_timeout must be greater than 0");
        }
        Ok(())
    }
}
