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

use anyhow::{Context, Result};
use clap::Parser;
use owo_colors::OwoColorize;
use std::time::{Duration, Instant};

use fleetsync::{
    cli::Cli,
    config::SyncConfig,
    inventory::load_inventory,
    sync::{FleetSync, SshSessionFactory},
    utils::init_logging,
};

/// Format a Duration into a human-readable string
fn format_duration(duration: Duration) -> String {
    let total_seconds = duration.as_secs_f64();

    if total_seconds < 60.0 {
        format!("{total_seconds:.2} s")
    } else {
        let minutes = duration.as_secs() / 60;
        let seconds = duration.as_secs() % 60;
        if seconds == 0 {
            format!("{minutes}m")
        } else {
            format!("{minutes}m {seconds}s")
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let mut config = SyncConfig::load_with_priority(cli.config.as_deref())
        .await
        .context("Failed to load configuration")?;
    cli.apply_overrides(&mut config);
    config.validate().context("Invalid command line settings")?;

    let hosts_file = config.hosts_path();
    let hosts = load_inventory(&hosts_file)
        .await
        .with_context(|| format!("Failed to load host inventory {}", hosts_file.display()))?;

    tracing::info!(
        "Loaded {} host(s) from {:?}, starting at index {}",
        hosts.len(),
        hosts_file,
        cli.start_index
    );
    if cli.start_index >= hosts.len() {
        tracing::warn!(
            "Start index {} is past the end of the inventory ({} host(s)); nothing to do",
            cli.start_index,
            hosts.len()
        );
    }

    let factory = SshSessionFactory::from_config(&config);
    let sync = FleetSync::new(config, factory);

    let started = Instant::now();
    let report = sync.run(&hosts, cli.start_index).await;

    report.print_summary();
    println!(
        "{} {}",
        "Elapsed:".dimmed(),
        format_duration(started.elapsed()).dimmed()
    );

    Ok(())
}
