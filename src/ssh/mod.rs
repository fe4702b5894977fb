pub mod known_hosts;
pub mod tokio_client;

pub use known_hosts::StrictHostKeyChecking;
