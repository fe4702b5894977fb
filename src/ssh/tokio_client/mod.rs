//! An asynchronous SSH client for the tokio runtime, built on russh.
//!
//! The heart of this module is [`Client`]. Use it for connection,
//! authentication, command execution and SFTP retrieval.

pub mod authentication;
pub mod channel_manager;
pub mod connection;
pub mod error;
pub mod file_transfer;

pub use authentication::{AuthMethod, ServerCheckMethod};
pub use channel_manager::CommandExecutedResult;
pub use connection::{Client, ClientHandler};
pub use error::Error;

pub use russh::client::Config;
