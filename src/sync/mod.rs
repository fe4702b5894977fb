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

//! Fleet config backup: staging, retrieval and orchestration.

mod error;
pub mod orchestrator;
pub mod paths;
pub mod report;
pub mod retriever;
pub mod session;
pub mod stager;
pub mod transport_log;

pub use error::{error_chain, SyncError};
pub use orchestrator::FleetSync;
pub use paths::RemotePaths;
pub use report::{HostOutcome, HostPhase, SyncReport};
pub use session::{RemoteSession, SessionFactory, SshSessionFactory};
pub use stager::{CommandOutcome, StagingReport};
