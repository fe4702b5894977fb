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

//! SSH authentication methods and server verification.
//!
//! Fleet inventories carry either a password or a private key file per host,
//! so only those two methods are offered here.

use russh::client::{Handle, Handler};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use zeroize::Zeroizing;

/// An authentication token used when opening a [`super::Client`].
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum AuthMethod {
    Password(Zeroizing<String>),
    PrivateKeyFile {
        key_file_path: PathBuf,
        key_pass: Option<Zeroizing<String>>,
    },
}

impl AuthMethod {
    /// Convenience method to create a [`AuthMethod`] from a string literal.
    pub fn with_password(password: &str) -> Self {
        Self::Password(Zeroizing::new(password.to_string()))
    }

    pub fn with_key_file<T: AsRef<Path>>(key_file_path: T, passphrase: Option<&str>) -> Self {
        Self::PrivateKeyFile {
            key_file_path: key_file_path.as_ref().to_path_buf(),
            key_pass: passphrase.map(|p| Zeroizing::new(p.to_string())),
        }
    }
}

/// Server host key verification methods.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum ServerCheckMethod {
    /// Accept any host key without recording it
    NoCheck,
    /// Only accept keys already present in the given known_hosts file
    KnownHostsFile(PathBuf),
    /// Accept keys present in the known_hosts file and append unknown ones to it.
    /// A key that differs from a recorded one is still rejected.
    TrustOnFirstUse(PathBuf),
}

/// Performs authentication on a freshly connected handle.
pub(super) async fn authenticate<H: Handler>(
    handle: &mut Handle<H>,
    username: &str,
    auth: AuthMethod,
) -> Result<(), super::Error> {
    match auth {
        AuthMethod::Password(password) => {
            let result = handle.authenticate_password(username, &**password).await?;
            if !result.success() {
                return Err(super::Error::PasswordWrong);
            }
        }
        AuthMethod::PrivateKeyFile {
            key_file_path,
            key_pass,
        } => {
            let private_key =
                russh::keys::load_secret_key(key_file_path, key_pass.as_ref().map(|p| &***p))
                    .map_err(super::Error::KeyInvalid)?;
            let result = handle
                .authenticate_publickey(
                    username,
                    russh::keys::PrivateKeyWithHashAlg::new(
                        Arc::new(private_key),
                        handle.best_supported_rsa_hash().await?.flatten(),
                    ),
                )
                .await?;
            if !result.success() {
                return Err(super::Error::KeyAuthFailed);
            }
        }
    };
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_with_password() {
        let auth = AuthMethod::with_password("hunter2");
        match auth {
            AuthMethod::Password(p) => assert_eq!(p.as_str(), "hunter2"),
            _ => panic!("Expected Password auth method"),
        }
    }

    #[test]
    fn test_with_key_file_keeps_passphrase() {
        let auth = AuthMethod::with_key_file("/tmp/id_ed25519", Some("secret"));
        match auth {
            AuthMethod::PrivateKeyFile {
                key_file_path,
                key_pass,
            } => {
                assert_eq!(key_file_path, PathBuf::from("/tmp/id_ed25519"));
                assert_eq!(key_pass.as_deref().map(String::as_str), Some("secret"));
            }
            _ => panic!("Expected PrivateKeyFile auth method"),
        }
    }
}
