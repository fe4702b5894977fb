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

//! SSH connection management and establishment.
//!
//! This module handles the low-level SSH connection establishment,
//! including address resolution, connection attempts, and initial handshake.

use russh::client::{Config, Handle, Handler};
use std::net::SocketAddr;
use std::sync::Arc;
use std::{fmt::Debug, io};

use super::authentication::{AuthMethod, ServerCheckMethod};

/// A ssh connection to a remote server.
///
/// After creating a `Client` by [`connect`]ing to a remote host,
/// use [`execute`] to send commands and [`fetch`] to pull files.
///
/// [`connect`]: Client::connect
/// [`execute`]: Client::execute
/// [`fetch`]: Client::fetch
///
/// # Examples
///
/// ```no_run
/// use fleetsync::ssh::tokio_client::{Client, AuthMethod, ServerCheckMethod};
/// #[tokio::main]
/// async fn main() -> Result<(), fleetsync::ssh::tokio_client::Error> {
///     let client = Client::connect(
///         "10.10.10.2",
///         22,
///         "root",
///         AuthMethod::with_password("root"),
///         ServerCheckMethod::NoCheck,
///     ).await?;
///
///     let result = client.execute("echo Hello SSH").await?;
///     assert_eq!(result.stdout, "Hello SSH\n");
///     assert_eq!(result.exit_status, 0);
///
///     client.disconnect().await?;
///     Ok(())
/// }
/// ```
pub struct Client {
    pub(super) connection_handle: Arc<Handle<ClientHandler>>,
    pub(super) username: String,
    pub(super) address: SocketAddr,
}

impl Client {
    /// Open a ssh connection to a remote host.
    ///
    /// `host` may resolve to multiple addresses; each one is tried in turn until
    /// a connection succeeds. Authentication is attempted on the first successful
    /// connection and the whole process aborted if it fails.
    pub async fn connect(
        host: &str,
        port: u16,
        username: &str,
        auth: AuthMethod,
        server_check: ServerCheckMethod,
    ) -> Result<Self, super::Error> {
        Self::connect_with_config(host, port, username, auth, server_check, Config::default())
            .await
    }

    /// Same as `connect`, but with the option to specify a non default
    /// [`russh::client::Config`].
    pub async fn connect_with_config(
        host: &str,
        port: u16,
        username: &str,
        auth: AuthMethod,
        server_check: ServerCheckMethod,
        config: Config,
    ) -> Result<Self, super::Error> {
        let config = Arc::new(config);

        let socket_addrs: Vec<SocketAddr> = tokio::net::lookup_host((host, port))
            .await
            .map_err(super::Error::AddressInvalid)?
            .collect();

        let mut connect_res = Err(super::Error::AddressInvalid(io::Error::new(
            io::ErrorKind::InvalidInput,
            "could not resolve to any addresses",
        )));
        for socket_addr in socket_addrs {
            let handler = ClientHandler::new(host.to_string(), port, server_check.clone());
            match russh::client::connect(config.clone(), socket_addr, handler).await {
                Ok(h) => {
                    connect_res = Ok((socket_addr, h));
                    break;
                }
                Err(e) => {
                    tracing::debug!("Connection attempt to {} failed: {:?}", socket_addr, e);
                    connect_res = Err(e);
                }
            }
        }
        let (address, mut handle) = connect_res?;

        super::authentication::authenticate(&mut handle, username, auth).await?;

        Ok(Self {
            connection_handle: Arc::new(handle),
            username: username.to_string(),
            address,
        })
    }

    /// The address this client is connected to.
    pub fn get_connection_address(&self) -> &SocketAddr {
        &self.address
    }

    /// Disconnect from the remote host.
    pub async fn disconnect(&self) -> Result<(), super::Error> {
        self.connection_handle
            .disconnect(russh::Disconnect::ByApplication, "", "")
            .await
            .map_err(super::Error::SshError)
    }
}

impl Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("username", &self.username)
            .field("address", &self.address)
            .field("connection_handle", &"Handle<ClientHandler>")
            .finish()
    }
}

/// SSH client handler for managing server key verification.
#[derive(Debug, Clone)]
pub struct ClientHandler {
    hostname: String,
    port: u16,
    server_check: ServerCheckMethod,
}

impl ClientHandler {
    /// Create a new client handler.
    pub fn new(hostname: String, port: u16, server_check: ServerCheckMethod) -> Self {
        Self {
            hostname,
            port,
            server_check,
        }
    }

    fn check_known_hosts(
        &self,
        server_public_key: &russh::keys::PublicKey,
        known_hosts_path: &std::path::Path,
    ) -> Result<bool, super::Error> {
        match russh::keys::check_known_hosts_path(
            &self.hostname,
            self.port,
            server_public_key,
            known_hosts_path,
        ) {
            Ok(found) => Ok(found),
            Err(russh::keys::Error::KeyChanged { line }) => Err(super::Error::HostKeyChanged {
                host: self.hostname.clone(),
                port: self.port,
                line,
            }),
            Err(e) => {
                tracing::debug!("known_hosts lookup failed: {}", e);
                Err(super::Error::ServerCheckFailed)
            }
        }
    }
}

impl Handler for ClientHandler {
    type Error = super::Error;

    async fn check_server_key(
        &mut self,
        server_public_key: &russh::keys::PublicKey,
    ) -> Result<bool, Self::Error> {
        match &self.server_check {
            ServerCheckMethod::NoCheck => Ok(true),
            ServerCheckMethod::KnownHostsFile(path) => {
                self.check_known_hosts(server_public_key, path)
            }
            ServerCheckMethod::TrustOnFirstUse(path) => {
                if self.check_known_hosts(server_public_key, path)? {
                    return Ok(true);
                }
                tracing::info!(
                    "Trusting new host key for {}:{} and recording it in {:?}",
                    self.hostname,
                    self.port,
                    path
                );
                // The key stays trusted for this session even if it cannot be persisted.
                if let Err(e) = russh::keys::known_hosts::learn_known_hosts_path(
                    &self.hostname,
                    self.port,
                    server_public_key,
                    path,
                ) {
                    tracing::warn!("Failed to record host key in {:?}: {}", path, e);
                }
                Ok(true)
            }
        }
    }
}
