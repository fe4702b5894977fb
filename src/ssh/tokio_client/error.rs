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

use std::io;
use thiserror::Error;

/// Errors raised by the SSH client layer.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    #[error("Password authentication failed")]
    PasswordWrong,
    #[error("Key authentication failed")]
    KeyAuthFailed,
    #[error("Unable to load key, bad passphrase or format: {0}")]
    KeyInvalid(russh::keys::Error),
    #[error("Host key verification failed")]
    ServerCheckFailed,
    #[error("Host key for {host}:{port} does not match the known_hosts entry on line {line}")]
    HostKeyChanged { host: String, port: u16, line: usize },
    #[error("Unable to resolve address: {0}")]
    AddressInvalid(io::Error),
    #[error("The executed command didn't send an exit code")]
    CommandDidntExit,
    #[error("SSH protocol error")]
    SshError(#[from] russh::Error),
    #[error("SFTP error")]
    SftpError(#[from] russh_sftp::client::error::Error),
    #[error("I/O error")]
    IoError(#[from] io::Error),
}

impl Error {
    /// Whether the server rejected the offered credential.
    pub fn is_authentication_failure(&self) -> bool {
        matches!(
            self,
            Error::PasswordWrong | Error::KeyAuthFailed | Error::KeyInvalid(_)
        )
    }
}
