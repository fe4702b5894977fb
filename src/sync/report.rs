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

//! Per-host and per-run results.

use owo_colors::OwoColorize;
use std::fmt;
use std::path::PathBuf;

use super::stager::StagingReport;
use super::{error_chain, SyncError};

/// How far a host got before finishing or failing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostPhase {
    Start,
    Connecting,
    AdminPath,
    Staging,
    Staged,
    Retrieving,
    Done,
}

impl fmt::Display for HostPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            HostPhase::Start => "start",
            HostPhase::Connecting => "connecting",
            HostPhase::AdminPath => "admin path",
            HostPhase::Staging => "staging",
            HostPhase::Staged => "staged",
            HostPhase::Retrieving => "retrieving",
            HostPhase::Done => "done",
        };
        f.write_str(s)
    }
}

/// Result of syncing a single host.
#[derive(Debug)]
pub struct HostOutcome {
    /// 1-based number used for the local directory.
    pub node_number: usize,
    pub hostname: String,
    pub local_dir: PathBuf,
    /// Last phase entered; with `error` set, the phase that failed.
    pub phase: HostPhase,
    pub staging: Option<StagingReport>,
    pub files: Vec<PathBuf>,
    pub error: Option<SyncError>,
}

impl HostOutcome {
    pub fn new(node_number: usize, hostname: impl Into<String>, local_dir: PathBuf) -> Self {
        Self {
            node_number,
            hostname: hostname.into(),
            local_dir,
            phase: HostPhase::Start,
            staging: None,
            files: Vec::new(),
            error: None,
        }
    }

    pub fn is_success(&self) -> bool {
        self.error.is_none() && self.phase == HostPhase::Done
    }

    pub fn print_summary(&self) {
        match &self.error {
            None => {
                println!(
                    "{} {}: {} {}",
                    "●".green(),
                    self.hostname.bold(),
                    "Files copied to".green(),
                    self.local_dir.display()
                );
                if let Some(staging) = &self.staging {
                    for failed in staging.failures() {
                        if let Err(e) = &failed.result {
                            println!("    {} {}", "staging:".yellow(), error_chain(e).dimmed());
                        }
                    }
                }
            }
            Some(e) => {
                let headline = if e.is_session_failure() {
                    "Failed to connect to the server"
                } else {
                    "Failed to transfer"
                };
                println!(
                    "{} {}: {} ({})",
                    "●".red(),
                    self.hostname.bold(),
                    headline.red(),
                    self.phase
                );
                println!("    {}", e.to_string().dimmed());
                let mut cause = std::error::Error::source(e);
                while let Some(err) = cause {
                    println!("    {} {}", "caused by:".dimmed(), err.to_string().dimmed());
                    cause = err.source();
                }
            }
        }
    }
}

/// Results of a whole run, in processing order.
#[derive(Debug, Default)]
pub struct SyncReport {
    pub hosts: Vec<HostOutcome>,
}

impl SyncReport {
    pub fn attempted(&self) -> usize {
        self.hosts.len()
    }

    pub fn succeeded(&self) -> usize {
        self.hosts.iter().filter(|h| h.is_success()).count()
    }

    pub fn failed(&self) -> usize {
        self.attempted() - self.succeeded()
    }

    pub fn print_summary(&self) {
        let summary = format!(
            "{} host(s): {} succeeded, {} failed",
            self.attempted(),
            self.succeeded(),
            self.failed()
        );
        if self.failed() == 0 {
            println!("\n{} {}", "▶".cyan(), summary.green());
        } else {
            println!("\n{} {}", "▶".cyan(), summary.yellow());
            for host in self.hosts.iter().filter(|h| !h.is_success()) {
                println!(
                    "  {} #{} {}",
                    "•".dimmed(),
                    host.node_number,
                    host.hostname.red()
                );
            }
        }
    }
}
