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

use anyhow::{bail, Result};

/// Validate a login name before it is templated into remote commands.
///
/// Every use is shell-quoted, so only values that quoting cannot carry are
/// rejected: empty names and control characters such as NUL or newline.
pub fn sanitize_username(username: &str) -> Result<String> {
    if username.trim().is_empty() {
        bail!("Empty username not allowed");
    }

    if username.chars().any(char::is_control) {
        bail!("Control characters in username: {:?}", username);
    }

    Ok(username.to_string())
}

/// Quote a value as a single POSIX shell word.
pub fn shell_quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', r"'\''"))
}
