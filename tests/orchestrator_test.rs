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

//! End-to-end runs of the fleet orchestrator against in-memory sessions.

use async_trait::async_trait;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;

use fleetsync::config::SyncConfig;
use fleetsync::inventory::{parse_inventory, HostRecord, PortField, RawHostRecord};
use fleetsync::ssh::tokio_client::{self, CommandExecutedResult};
use fleetsync::sync::{FleetSync, HostPhase, RemoteSession, SessionFactory, SyncError};

#[derive(Debug, Clone, PartialEq, Eq)]
enum Event {
    Open(String),
    Exec(String, String),
    Fetch(String, String),
    Close(String),
}

type EventLog = Arc<Mutex<Vec<Event>>>;

#[derive(Clone, Default)]
struct FakeFactory {
    events: EventLog,
    unreachable: HashSet<String>,
    wrong_password: HashSet<String>,
    failing_commands: Vec<String>,
    broken_channel_commands: Vec<String>,
    missing_remote: HashSet<String>,
}

impl FakeFactory {
    fn unreachable(mut self, host: &str) -> Self {
        self.unreachable.insert(host.to_string());
        self
    }

    fn wrong_password(mut self, host: &str) -> Self {
        self.wrong_password.insert(host.to_string());
        self
    }

    fn failing_command(mut self, fragment: &str) -> Self {
        self.failing_commands.push(fragment.to_string());
        self
    }

    fn broken_channel(mut self, fragment: &str) -> Self {
        self.broken_channel_commands.push(fragment.to_string());
        self
    }

    fn missing_remote(mut self, path: &str) -> Self {
        self.missing_remote.insert(path.to_string());
        self
    }

    fn events(&self) -> Vec<Event> {
        self.events.lock().unwrap().clone()
    }

    fn events_for(&self, host: &str) -> Vec<Event> {
        self.events()
            .into_iter()
            .filter(|e| match e {
                Event::Open(h) | Event::Close(h) => h == host,
                Event::Exec(h, _) | Event::Fetch(h, _) => h == host,
            })
            .collect()
    }

    fn commands_for(&self, host: &str) -> Vec<String> {
        self.events_for(host)
            .into_iter()
            .filter_map(|e| match e {
                Event::Exec(_, command) => Some(command),
                _ => None,
            })
            .collect()
    }

    fn fetches_for(&self, host: &str) -> Vec<String> {
        self.events_for(host)
            .into_iter()
            .filter_map(|e| match e {
                Event::Fetch(_, path) => Some(path),
                _ => None,
            })
            .collect()
    }
}

#[async_trait]
impl SessionFactory for FakeFactory {
    async fn open(&self, host: &HostRecord) -> Result<Box<dyn RemoteSession>, SyncError> {
        self.events
            .lock()
            .unwrap()
            .push(Event::Open(host.hostname.clone()));

        if self.unreachable.contains(&host.hostname) {
            return Err(SyncError::ConnectionTimeout {
                timeout: Duration::from_secs(30),
            });
        }
        if self.wrong_password.contains(&host.hostname) {
            return Err(SyncError::from_connect(tokio_client::Error::PasswordWrong));
        }

        Ok(Box::new(FakeSession {
            host: host.hostname.clone(),
            events: Arc::clone(&self.events),
            failing_commands: self.failing_commands.clone(),
            broken_channel_commands: self.broken_channel_commands.clone(),
            missing_remote: self.missing_remote.clone(),
        }))
    }
}

struct FakeSession {
    host: String,
    events: EventLog,
    failing_commands: Vec<String>,
    broken_channel_commands: Vec<String>,
    missing_remote: HashSet<String>,
}

#[async_trait]
impl RemoteSession for FakeSession {
    async fn execute(&self, command: &str) -> Result<CommandExecutedResult, tokio_client::Error> {
        self.events
            .lock()
            .unwrap()
            .push(Event::Exec(self.host.clone(), command.to_string()));

        if self
            .broken_channel_commands
            .iter()
            .any(|f| command.contains(f))
        {
            return Err(tokio_client::Error::CommandDidntExit);
        }

        let fails = self.failing_commands.iter().any(|f| command.contains(f));
        Ok(CommandExecutedResult {
            stdout: String::new(),
            stderr: if fails {
                "Permission denied".to_string()
            } else {
                String::new()
            },
            exit_status: if fails { 1 } else { 0 },
        })
    }

    async fn fetch(
        &self,
        remote_path: &str,
        local_dir: &Path,
        _recursive: bool,
    ) -> Result<PathBuf, tokio_client::Error> {
        self.events
            .lock()
            .unwrap()
            .push(Event::Fetch(self.host.clone(), remote_path.to_string()));

        if self.missing_remote.contains(remote_path) {
            return Err(tokio_client::Error::IoError(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                "no such file",
            )));
        }

        let name = remote_path.rsplit('/').next().unwrap_or(remote_path);
        let local_path = local_dir.join(name);
        std::fs::write(&local_path, format!("{}:{}", self.host, remote_path))?;
        Ok(local_path)
    }

    async fn close(&self) -> Result<(), tokio_client::Error> {
        self.events
            .lock()
            .unwrap()
            .push(Event::Close(self.host.clone()));
        Ok(())
    }
}

fn host(hostname: &str, user: &str) -> RawHostRecord {
    RawHostRecord {
        hostname: Some(hostname.to_string()),
        port: Some(PortField::Number(22)),
        user: Some(user.to_string()),
        password: Some("secret".to_string()),
        ..Default::default()
    }
}

fn test_config(temp_dir: &TempDir) -> SyncConfig {
    SyncConfig {
        local_dir_template: temp_dir
            .path()
            .join("backups")
            .join("Q{n}_backup")
            .to_string_lossy()
            .into_owned(),
        transport_log: temp_dir.path().join("transport.log"),
        ..SyncConfig::default()
    }
}

fn backup_dir(temp_dir: &TempDir, n: usize) -> PathBuf {
    temp_dir.path().join("backups").join(format!("Q{n}_backup"))
}

#[tokio::test]
async fn test_root_and_regular_user_scenario() {
    let temp_dir = TempDir::new().unwrap();
    let factory = FakeFactory::default();
    let sync = FleetSync::new(test_config(&temp_dir), factory.clone()).with_progress(false);

    let hosts = vec![host("h1", "root"), host("h2", "alice")];
    let report = sync.run(&hosts, 0).await;

    assert_eq!(report.attempted(), 2);
    assert_eq!(report.succeeded(), 2);

    // root reads the node directory directly
    assert!(factory.commands_for("h1").is_empty());
    assert_eq!(
        factory.fetches_for("h1"),
        vec![
            "/root/ceremonyclient/node/.config/keys.yml".to_string(),
            "/root/ceremonyclient/node/.config/config.yml".to_string(),
        ]
    );
    let q1 = backup_dir(&temp_dir, 1);
    assert_eq!(
        std::fs::read_to_string(q1.join("keys.yml")).unwrap(),
        "h1:/root/ceremonyclient/node/.config/keys.yml"
    );
    assert!(q1.join("config.yml").is_file());

    // alice goes through the staging directory
    let commands = factory.commands_for("h2");
    assert_eq!(commands.len(), 5);
    assert_eq!(
        commands[0],
        "mkdir -p '/home/alice/temp_ceremonyclient_config/'"
    );
    assert!(commands[1].starts_with("sudo cp '/root/ceremonyclient/node/.config/keys.yml'"));
    assert!(commands[3].starts_with("sudo chown 'alice:alice'"));
    assert_eq!(
        factory.fetches_for("h2"),
        vec![
            "/home/alice/temp_ceremonyclient_config/keys.yml".to_string(),
            "/home/alice/temp_ceremonyclient_config/config.yml".to_string(),
        ]
    );
    let q2 = backup_dir(&temp_dir, 2);
    assert!(q2.join("keys.yml").is_file());
    assert!(q2.join("config.yml").is_file());

    let h2 = &report.hosts[1];
    assert_eq!(h2.phase, HostPhase::Done);
    assert!(h2.staging.as_ref().unwrap().all_succeeded());
}

#[tokio::test]
async fn test_start_index_skips_and_numbers() {
    let temp_dir = TempDir::new().unwrap();
    let factory = FakeFactory::default();
    let sync = FleetSync::new(test_config(&temp_dir), factory.clone()).with_progress(false);

    let hosts = vec![
        host("h1", "root"),
        host("h2", "root"),
        host("h3", "root"),
        host("h4", "root"),
    ];
    let report = sync.run(&hosts, 2).await;

    assert_eq!(report.attempted(), 2);
    let opened: Vec<Event> = factory
        .events()
        .into_iter()
        .filter(|e| matches!(e, Event::Open(_)))
        .collect();
    assert_eq!(
        opened,
        vec![Event::Open("h3".to_string()), Event::Open("h4".to_string())]
    );

    assert_eq!(report.hosts[0].node_number, 3);
    assert_eq!(report.hosts[1].node_number, 4);
    assert!(backup_dir(&temp_dir, 3).join("keys.yml").is_file());
    assert!(backup_dir(&temp_dir, 4).join("keys.yml").is_file());
    assert!(!backup_dir(&temp_dir, 1).exists());
    assert!(!backup_dir(&temp_dir, 2).exists());
}

#[tokio::test]
async fn test_start_index_past_end_attempts_nothing() {
    let temp_dir = TempDir::new().unwrap();
    let factory = FakeFactory::default();
    let sync = FleetSync::new(test_config(&temp_dir), factory.clone()).with_progress(false);

    let report = sync.run(&[host("h1", "root")], 5).await;

    assert_eq!(report.attempted(), 0);
    assert!(factory.events().is_empty());
}

#[tokio::test]
async fn test_connect_failure_is_isolated() {
    let temp_dir = TempDir::new().unwrap();
    let factory = FakeFactory::default()
        .unreachable("h1")
        .wrong_password("h2");
    let sync = FleetSync::new(test_config(&temp_dir), factory.clone()).with_progress(false);

    let hosts = vec![host("h1", "root"), host("h2", "alice"), host("h3", "root")];
    let report = sync.run(&hosts, 0).await;

    assert_eq!(report.attempted(), 3);
    assert_eq!(report.succeeded(), 1);

    assert!(matches!(
        report.hosts[0].error,
        Some(SyncError::ConnectionTimeout { .. })
    ));
    assert!(matches!(
        report.hosts[1].error,
        Some(SyncError::Authentication(_))
    ));
    assert_eq!(report.hosts[0].phase, HostPhase::Connecting);

    // no session, no commands, no fetch and no local directory
    assert_eq!(factory.events_for("h1"), vec![Event::Open("h1".to_string())]);
    assert_eq!(factory.events_for("h2"), vec![Event::Open("h2".to_string())]);
    assert!(!backup_dir(&temp_dir, 1).exists());
    assert!(!backup_dir(&temp_dir, 2).exists());

    assert!(report.hosts[2].is_success());
    assert!(backup_dir(&temp_dir, 3).join("config.yml").is_file());

    let log = std::fs::read_to_string(temp_dir.path().join("transport.log")).unwrap();
    assert!(log.contains("root@h1:22: connection timed out after 30 seconds"));
    assert!(log.contains("alice@h2:22: authentication failed"));
}

#[tokio::test]
async fn test_staging_failures_do_not_stop_commands() {
    let temp_dir = TempDir::new().unwrap();
    let factory = FakeFactory::default().failing_command("sudo cp");
    let sync = FleetSync::new(test_config(&temp_dir), factory.clone()).with_progress(false);

    let report = sync.run(&[host("h1", "alice")], 0).await;

    let commands = factory.commands_for("h1");
    assert_eq!(commands.len(), 5);
    assert!(commands[3].starts_with("sudo chown"));
    assert!(commands[4].starts_with("sudo chown"));

    let outcome = &report.hosts[0];
    let staging = outcome.staging.as_ref().unwrap();
    assert_eq!(staging.failures().count(), 2);
    for failed in staging.failures() {
        assert!(matches!(
            failed.result,
            Err(SyncError::RemoteCommand { exit_status: 1, .. })
        ));
    }

    // retrieval still runs once staging is done
    assert_eq!(factory.fetches_for("h1").len(), 2);
    assert!(outcome.is_success());
}

#[tokio::test]
async fn test_copy_failure_closes_session_and_continues() {
    let temp_dir = TempDir::new().unwrap();
    let factory = FakeFactory::default()
        .missing_remote("/home/alice/temp_ceremonyclient_config/keys.yml");
    let sync = FleetSync::new(test_config(&temp_dir), factory.clone()).with_progress(false);

    let hosts = vec![host("h1", "alice"), host("h2", "root")];
    let report = sync.run(&hosts, 0).await;

    let first = &report.hosts[0];
    assert_eq!(first.phase, HostPhase::Retrieving);
    assert!(matches!(first.error, Some(SyncError::Copy { .. })));
    // the local directory was created before the copy failed
    assert!(backup_dir(&temp_dir, 1).is_dir());
    // keys failed, so config was never attempted
    assert_eq!(factory.fetches_for("h1").len(), 1);
    assert_eq!(
        factory.events_for("h1").last(),
        Some(&Event::Close("h1".to_string()))
    );

    assert!(report.hosts[1].is_success());

    // copy failures are not connection problems
    assert!(!temp_dir.path().join("transport.log").exists());
}

#[tokio::test]
async fn test_rerun_overwrites_existing_backup() {
    let temp_dir = TempDir::new().unwrap();
    let q1 = backup_dir(&temp_dir, 1);
    std::fs::create_dir_all(&q1).unwrap();
    std::fs::write(q1.join("keys.yml"), "stale").unwrap();

    let factory = FakeFactory::default();
    let sync = FleetSync::new(test_config(&temp_dir), factory).with_progress(false);
    let report = sync.run(&[host("h1", "root")], 0).await;

    assert!(report.hosts[0].is_success());
    assert_eq!(
        std::fs::read_to_string(q1.join("keys.yml")).unwrap(),
        "h1:/root/ceremonyclient/node/.config/keys.yml"
    );
}

#[tokio::test]
async fn test_malformed_record_fails_only_that_host() {
    let temp_dir = TempDir::new().unwrap();
    let inventory = r#"[
        {"hostname": "h1", "user": "root", "password": "pw"},
        {"hostname": "h2", "password": "pw"},
        {"hostname": "h3", "port": "not-a-port", "user": "root", "password": "pw"},
        {"hostname": "h4", "port": "2222", "user": "root", "password": "pw"}
    ]"#;
    let hosts = parse_inventory(inventory, Path::new("hosts.json")).unwrap();

    let factory = FakeFactory::default();
    let sync = FleetSync::new(test_config(&temp_dir), factory.clone()).with_progress(false);
    let report = sync.run(&hosts, 0).await;

    assert_eq!(report.attempted(), 4);
    assert!(report.hosts[0].is_success());
    assert!(matches!(
        report.hosts[1].error,
        Some(SyncError::MissingField { field: "user" })
    ));
    assert!(matches!(
        report.hosts[2].error,
        Some(SyncError::InvalidField { field: "port", .. })
    ));
    assert!(report.hosts[3].is_success());

    assert!(factory.events_for("h2").is_empty());
    assert!(factory.events_for("h3").is_empty());
    assert!(!backup_dir(&temp_dir, 2).exists());
    assert!(backup_dir(&temp_dir, 4).join("keys.yml").is_file());
}

#[tokio::test]
async fn test_directory_account_is_staged_and_quoted() {
    let temp_dir = TempDir::new().unwrap();
    let factory = FakeFactory::default();
    let sync = FleetSync::new(test_config(&temp_dir), factory.clone()).with_progress(false);

    let report = sync.run(&[host("h1", "svc@corp.example")], 0).await;

    let commands = factory.commands_for("h1");
    assert_eq!(commands.len(), 5);
    assert_eq!(
        commands[0],
        "mkdir -p '/home/svc@corp.example/temp_ceremonyclient_config/'"
    );
    assert_eq!(
        commands[4],
        "sudo chown 'svc@corp.example:svc@corp.example' '/home/svc@corp.example/temp_ceremonyclient_config/config.yml'"
    );
    assert_eq!(factory.fetches_for("h1").len(), 2);
    assert!(report.hosts[0].is_success());
}

#[tokio::test]
async fn test_control_characters_in_username_skip_staging() {
    let temp_dir = TempDir::new().unwrap();
    let factory = FakeFactory::default();
    let sync = FleetSync::new(test_config(&temp_dir), factory.clone()).with_progress(false);

    let report = sync.run(&[host("h1", "bob\nrm -rf /")], 0).await;

    assert!(matches!(
        report.hosts[0].error,
        Some(SyncError::UnsafeValue(_))
    ));
    assert!(factory.commands_for("h1").is_empty());
    assert!(factory.fetches_for("h1").is_empty());
    assert_eq!(
        factory.events_for("h1").last(),
        Some(&Event::Close("h1".to_string()))
    );
}

#[tokio::test]
async fn test_channel_failure_during_staging_is_command_scoped() {
    let temp_dir = TempDir::new().unwrap();
    let factory = FakeFactory::default().broken_channel("sudo cp");
    let sync = FleetSync::new(test_config(&temp_dir), factory.clone()).with_progress(false);

    let report = sync.run(&[host("h1", "alice")], 0).await;

    assert_eq!(factory.commands_for("h1").len(), 5);

    let outcome = &report.hosts[0];
    let staging = outcome.staging.as_ref().unwrap();
    assert_eq!(staging.failures().count(), 2);
    for failed in staging.failures() {
        let err = failed.result.as_ref().unwrap_err();
        assert!(matches!(err, SyncError::RemoteCommandFailed { .. }));
        assert!(!err.is_session_failure());
    }

    assert_eq!(factory.fetches_for("h1").len(), 2);
    assert!(outcome.is_success());
    assert!(!temp_dir.path().join("transport.log").exists());
}
