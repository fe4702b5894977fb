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

//! Remote and local path derivation.

use std::path::PathBuf;

use crate::config::expand_tilde;

pub const KEYS_FILE_NAME: &str = "keys.yml";
pub const CONFIG_FILE_NAME: &str = "config.yml";

/// Placeholder for the 1-based node number in the local directory template.
pub const NODE_PLACEHOLDER: &str = "{n}";
/// Placeholder for the login name in the staging directory template.
pub const USER_PLACEHOLDER: &str = "{user}";

/// The two files backed up from every node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemotePaths {
    pub keys_file: String,
    pub config_file: String,
}

impl RemotePaths {
    pub fn in_dir(base_dir: &str) -> Self {
        Self {
            keys_file: join_remote(base_dir, KEYS_FILE_NAME),
            config_file: join_remote(base_dir, CONFIG_FILE_NAME),
        }
    }
}

/// Join a POSIX directory and a file name with exactly one separator.
pub fn join_remote(base_dir: &str, name: &str) -> String {
    if base_dir.is_empty() {
        return name.to_string();
    }
    format!("{}/{}", base_dir.trim_end_matches('/'), name)
}

/// Node number used in local directory names: position among the processed
/// hosts plus the number of skipped hosts, 1-based.
pub fn node_number(position: usize, start_index: usize) -> usize {
    position + start_index + 1
}

/// Local backup directory for a node number.
pub fn local_destination(template: &str, node_number: usize) -> PathBuf {
    let rendered = template.replace(NODE_PLACEHOLDER, &node_number.to_string());
    expand_tilde(&PathBuf::from(rendered))
}

/// Remote staging directory for a login name.
pub fn staging_dir(template: &str, user: &str) -> String {
    template.replace(USER_PLACEHOLDER, user)
}
