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

use clap::Parser;
use std::path::PathBuf;

use crate::config::SyncConfig;
use crate::ssh::StrictHostKeyChecking;

#[derive(Parser, Debug)]
#[command(
    name = "fleetsync",
    version,
    about = "Back up node keys and config from every host in an inventory",
    long_about = "fleetsync connects to each host listed in a JSON inventory over SSH and copies\nkeys.yml and config.yml from the node config directory into a numbered local\nbackup directory. Non-root accounts get the files staged with sudo into their\nhome directory first. Hosts are processed one at a time and a failing host never\nstops the batch.",
    after_help = "EXAMPLES:\n  Back up every host:            fleetsync\n  Resume from the fifth host:    fleetsync 4\n  Use another inventory:         fleetsync --hosts ./staging.json\n  Strict host key checking:      fleetsync --strict-host-key-checking yes"
)]
pub struct Cli {
    #[arg(
        default_value_t = 0,
        help = "Zero-based index of the first host to process\nHosts before it are skipped; node numbering continues from it"
    )]
    pub start_index: usize,

    #[arg(
        short = 'c',
        long,
        help = "Configuration file path\nConfig loading priority:\n  1. This flag's value\n  2. Current directory (./fleetsync.yaml)\n  3. User config (~/.config/fleetsync/config.yaml)\n  4. Built-in defaults"
    )]
    pub config: Option<PathBuf>,

    #[arg(short = 'H', long, help = "Host inventory file [default: hosts.json]")]
    pub hosts: Option<PathBuf>,

    #[arg(
        long,
        help = "Host key checking mode (yes/no/accept-new) [default: accept-new]\n  yes        - Strict checking against known_hosts\n  no         - Accept all host keys (insecure, testing only)\n  accept-new - Accept new hosts, reject changed keys"
    )]
    pub strict_host_key_checking: Option<StrictHostKeyChecking>,

    #[arg(
        long,
        help = "Seconds allowed for connecting and authenticating [default: 30]"
    )]
    pub connect_timeout: Option<u64>,

    #[arg(
        short = 'v',
        long,
        action = clap::ArgAction::Count,
        help = "Increase verbosity (-v, -vv, -vvv)"
    )]
    pub verbose: u8,
}

impl Cli {
    /// Apply command line overrides on top of file settings.
    pub fn apply_overrides(&self, config: &mut SyncConfig) {
        if let Some(hosts) = &self.hosts {
            config.hosts_file = hosts.clone();
        }
        if let Some(mode) = self.strict_host_key_checking {
            config.strict_host_key_checking = mode;
        }
        if let Some(timeout) = self.connect_timeout {
            config.connect_timeout = timeout;
        }
    }
}
