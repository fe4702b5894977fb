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

//! Configuration loading and priority management.

use anyhow::{Context, Result};
use directories::ProjectDirs;
use std::env;
use std::path::{Path, PathBuf};
use tokio::fs;

use super::types::SyncConfig;
use super::utils::expand_tilde;

/// File name looked up in the current directory.
pub const LOCAL_CONFIG_FILE: &str = "fleetsync.yaml";

impl SyncConfig {
    /// Load configuration from a YAML file.
    pub async fn load(path: &Path) -> Result<Self> {
        let expanded_path = expand_tilde(path);

        let content = fs::read_to_string(&expanded_path)
            .await
            .with_context(|| format!("Failed to read configuration file at {}. Please check file permissions and ensure the file is accessible.", expanded_path.display()))?;

        let config: SyncConfig = serde_yaml::from_str(&content).with_context(|| {
            format!(
                "Failed to parse YAML configuration file at {}. Please check the YAML syntax is valid.",
                expanded_path.display()
            )
        })?;

        config
            .validate()
            .with_context(|| format!("Invalid configuration in {}", expanded_path.display()))?;

        Ok(config)
    }

    /// Load configuration with priority order:
    /// 1. Explicit `--config` path (must exist)
    /// 2. `./fleetsync.yaml`
    /// 3. `$XDG_CONFIG_HOME/fleetsync/config.yaml` (or the platform config dir)
    /// 4. Built-in defaults
    pub async fn load_with_priority(cli_config_path: Option<&Path>) -> Result<Self> {
        if let Some(path) = cli_config_path {
            let expanded = expand_tilde(path);
            if !expanded.exists() {
                anyhow::bail!("Config file not found: {:?}", expanded);
            }
            tracing::debug!("Using explicitly specified config file: {:?}", expanded);
            return Self::load(&expanded).await;
        }

        for candidate in Self::standard_locations() {
            if candidate.exists() {
                tracing::debug!("Found config at {:?}", candidate);
                return Self::load(&candidate).await;
            }
        }

        tracing::debug!("No config file found, using built-in defaults");
        Ok(Self::default())
    }

    fn standard_locations() -> Vec<PathBuf> {
        let mut locations = vec![PathBuf::from(LOCAL_CONFIG_FILE)];

        if let Ok(xdg_config_home) = env::var("XDG_CONFIG_HOME") {
            locations.push(
                PathBuf::from(xdg_config_home)
                    .join("fleetsync")
                    .join("config.yaml"),
            );
        } else if let Some(proj_dirs) = ProjectDirs::from("", "", "fleetsync") {
            locations.push(proj_dirs.config_dir().join("config.yaml"));
        }

        locations
    }
}
