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

//! Host inventory loading.
//!
//! The inventory is a JSON array of connection records. Records are kept raw
//! until a host is processed so that one malformed entry only fails that host.

use serde::Deserialize;
use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;
use zeroize::Zeroizing;

use crate::config::expand_tilde;
use crate::ssh::tokio_client::AuthMethod;
use crate::sync::SyncError;

const DEFAULT_SSH_PORT: u16 = 22;

/// Errors that abort the whole run before any host is contacted.
#[derive(Debug, Error)]
pub enum InventoryError {
    #[error("inventory file not found: {}", .path.display())]
    NotFound { path: PathBuf },

    #[error("failed to read inventory file '{}'", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("inventory file '{}' is not a JSON list of host records", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Port as written in the inventory: a number or a numeric string.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum PortField {
    Number(i64),
    Text(String),
}

/// One inventory entry exactly as found in the file.
#[derive(Clone, Default, Deserialize)]
pub struct RawHostRecord {
    #[serde(default)]
    pub hostname: Option<String>,
    #[serde(default)]
    pub port: Option<PortField>,
    #[serde(default)]
    pub user: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub identity_file: Option<PathBuf>,
    #[serde(default)]
    pub passphrase: Option<String>,
}

impl fmt::Debug for RawHostRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RawHostRecord")
            .field("hostname", &self.hostname)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("identity_file", &self.identity_file)
            .finish()
    }
}

/// How a host authenticates.
#[derive(Clone, PartialEq, Eq)]
pub enum Credential {
    Password(Zeroizing<String>),
    KeyFile {
        path: PathBuf,
        passphrase: Option<Zeroizing<String>>,
    },
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Credential::Password(_) => f.write_str("Password(<redacted>)"),
            Credential::KeyFile { path, .. } => {
                f.debug_struct("KeyFile").field("path", path).finish()
            }
        }
    }
}

impl Credential {
    pub fn to_auth_method(&self) -> AuthMethod {
        match self {
            Credential::Password(password) => AuthMethod::with_password(password),
            Credential::KeyFile { path, passphrase } => {
                AuthMethod::with_key_file(path, passphrase.as_ref().map(|p| p.as_str()))
            }
        }
    }
}

/// A fully-specified connection record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostRecord {
    pub hostname: String,
    pub port: u16,
    pub user: String,
    pub credential: Credential,
}

impl fmt::Display for HostRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}:{}", self.user, self.hostname, self.port)
    }
}

impl RawHostRecord {
    /// Hostname for log lines, even when the record is incomplete.
    pub fn display_name(&self) -> &str {
        self.hostname.as_deref().unwrap_or("<unknown host>")
    }

    /// Turn the raw entry into a usable record.
    ///
    /// A password takes precedence over `identity_file` when both are present.
    pub fn resolve(&self) -> Result<HostRecord, SyncError> {
        let hostname = required(&self.hostname, "hostname")?;
        let user = required(&self.user, "user")?;
        let port = match &self.port {
            None => DEFAULT_SSH_PORT,
            Some(port) => parse_port(port)?,
        };

        let credential = match (&self.password, &self.identity_file) {
            (Some(password), _) => Credential::Password(Zeroizing::new(password.clone())),
            (None, Some(path)) => Credential::KeyFile {
                path: expand_tilde(path),
                passphrase: self.passphrase.clone().map(Zeroizing::new),
            },
            (None, None) => return Err(SyncError::MissingField { field: "password" }),
        };

        Ok(HostRecord {
            hostname,
            port,
            user,
            credential,
        })
    }
}

fn required(value: &Option<String>, field: &'static str) -> Result<String, SyncError> {
    match value.as_deref().map(str::trim) {
        Some(v) if !v.is_empty() => Ok(v.to_string()),
        _ => Err(SyncError::MissingField { field }),
    }
}

fn parse_port(port: &PortField) -> Result<u16, SyncError> {
    let invalid = |value: String| SyncError::InvalidField {
        field: "port",
        value,
    };
    match port {
        PortField::Number(n) => u16::try_from(*n)
            .ok()
            .filter(|p| *p != 0)
            .ok_or_else(|| invalid(n.to_string())),
        PortField::Text(s) => s
            .trim()
            .parse::<u16>()
            .ok()
            .filter(|p| *p != 0)
            .ok_or_else(|| invalid(s.clone())),
    }
}

/// Parse inventory JSON text.
pub fn parse_inventory(content: &str, path: &Path) -> Result<Vec<RawHostRecord>, InventoryError> {
    serde_json::from_str(content).map_err(|source| InventoryError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// Load the ordered host list from a JSON file.
pub async fn load_inventory(path: &Path) -> Result<Vec<RawHostRecord>, InventoryError> {
    let expanded = expand_tilde(path);

    let content = match tokio::fs::read_to_string(&expanded).await {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(InventoryError::NotFound { path: expanded });
        }
        Err(source) => {
            return Err(InventoryError::Read {
                path: expanded,
                source,
            })
        }
    };

    let hosts = parse_inventory(&content, &expanded)?;
    tracing::debug!("Loaded {} host record(s) from {:?}", hosts.len(), expanded);
    Ok(hosts)
}
